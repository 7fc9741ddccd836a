//! Grounded on the teacher's `benches/benchmarks.rs`: a single
//! `criterion_group!`/`criterion_main!` pair, `without_plots()` plus a short
//! measurement window since these benchmarks exercise filesystem I/O.

criterion::criterion_main!(benches);
criterion::criterion_group! {
    name = benches;
    config = criterion::Criterion::default()
        .without_plots()
        .noise_threshold(3.0)
        .significance_level(0.01)
        .sample_size(10)
        .measurement_time(std::time::Duration::from_secs(1));
    targets =
        uniquing_a_large_alignment,
        ranking_column_entropy,
        decomposing_a_two_cluster_alignment,
}

fn write_alignment(path: &std::path::Path, records: &[(String, String)]) {
    use std::io::Write;
    let mut file = std::fs::File::create(path).unwrap();
    for (id, seq) in records {
        writeln!(file, ">{id}").unwrap();
        writeln!(file, "{seq}").unwrap();
    }
}

fn two_cluster_alignment(dir: &std::path::Path, per_cluster: usize) -> std::path::PathBuf {
    let path = dir.join("bench.fa");
    let mut records: Vec<(String, String)> = (0..per_cluster)
        .map(|i| (format!("a_{i}"), "A".repeat(50)))
        .collect();
    records.extend((0..per_cluster).map(|i| (format!("b_{i}"), format!("{}{}", "T".repeat(5), "A".repeat(45)))));
    write_alignment(&path, &records);
    path
}

fn uniquing_a_large_alignment(c: &mut criterion::Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = two_cluster_alignment(dir.path(), 2_000);
    let alignment = decompose::align::Alignment::open(&path).unwrap();
    c.bench_function("uniquify a 4000-read alignment", |b| {
        b.iter(|| decompose::unique::collect(&alignment).unwrap())
    });
}

fn ranking_column_entropy(c: &mut criterion::Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let path = two_cluster_alignment(dir.path(), 2_000);
    let alignment = decompose::align::Alignment::open(&path).unwrap();
    c.bench_function("rank column entropy over a 4000-read alignment", |b| {
        b.iter(|| decompose::entropy::rank(&decompose::entropy::column_entropies(&alignment, None).unwrap()))
    });
}

fn decomposing_a_two_cluster_alignment(c: &mut criterion::Criterion) {
    c.bench_function("decompose a 4000-read, two-cluster alignment", |b| {
        b.iter(|| {
            let dir = tempfile::tempdir().unwrap();
            let path = two_cluster_alignment(dir.path(), 2_000);
            let cli = decompose::config::Cli {
                alignment: path,
                min_entropy: 0.2,
                number_of_discriminants: 3,
                min_actual_abundance: 0,
                min_substantive_abundance: 4,
                output_directory: Some(dir.path().join("out")),
                project: Some("bench".to_string()),
                dataset_name_separator: '_',
                skip_removing_outliers: false,
                relocate_outliers: false,
                generate_frequency_curves: false,
                debug: false,
            };
            let config = decompose::config::Config::resolve(cli).unwrap();
            let mut decomposer = decompose::decompose::Decomposer::new(config).unwrap();
            decomposer.decompose().unwrap();
        })
    });
}
