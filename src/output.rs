//! Tabular and serialized outputs written once a decomposition finishes:
//! TOPOLOGY, ENVIRONMENT, the abundance matrices, and RUNINFO.
//!
//! Grounded on the original `_store_topology_text` / `_generate_ENVIRONMENT_file`
//! (tab-separated writers) for the text formats, and on the teacher's
//! `serde_json` dependency for the two `.cPickle` files — spec.md leaves the
//! serialization format unspecified, so JSON stands in for the original's
//! Python pickle while keeping the filenames callers already expect.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::decompose::Decomposer;
use crate::error::DecomposeError;
use crate::error::Result;
use crate::node::Node;
use crate::read::sample_name;

#[derive(Serialize)]
struct RunInfo<'a> {
    project: &'a str,
    run_date_unix: u64,
    version: &'a str,
    root_alignment: String,
    total_seq: usize,
    min_actual_abundance: usize,
    min_substantive_abundance: u32,
    min_entropy: f32,
    number_of_discriminants: usize,
    output_directory: String,
    nodes_directory: String,
    cmd_line: String,
    num_sequences_after_qc: usize,
    num_outliers_after_raw_topology: usize,
    num_outliers_after_refine_nodes: usize,
    num_final_nodes: usize,
    num_relocated: usize,
}

/// Writes every file named in spec.md §6's output layout under
/// `decomposer.config.output_directory`. `NODES/` is already populated by
/// the decomposer itself; this only writes the summary artifacts.
pub fn write_all(decomposer: &Decomposer) -> Result<()> {
    write_runinfo(decomposer)?;
    write_topology(decomposer)?;
    write_environment_and_matrices(decomposer)?;
    Ok(())
}

fn write_runinfo(decomposer: &Decomposer) -> Result<()> {
    let config = &decomposer.config;
    let stats = &decomposer.stats;
    let root_size = decomposer.topology.get("root").map(|n| n.size).unwrap_or(0);
    let run_date_unix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let cmd_line = std::env::args().collect::<Vec<_>>().join(" ");

    let info = RunInfo {
        project: &config.project,
        run_date_unix,
        version: env!("CARGO_PKG_VERSION"),
        root_alignment: config.alignment.display().to_string(),
        total_seq: root_size,
        min_actual_abundance: config.min_actual_abundance,
        min_substantive_abundance: config.min_substantive_abundance,
        min_entropy: config.min_entropy,
        number_of_discriminants: config.number_of_discriminants,
        output_directory: config.output_directory.display().to_string(),
        nodes_directory: config.nodes_directory().display().to_string(),
        cmd_line,
        num_sequences_after_qc: stats.num_sequences_after_qc,
        num_outliers_after_raw_topology: decomposer
            .outliers
            .values()
            .filter(|o| o.from.is_none())
            .map(|o| o.ids.len())
            .sum(),
        num_outliers_after_refine_nodes: stats.num_outliers_after_refine_nodes,
        num_final_nodes: stats.num_final_nodes,
        num_relocated: stats.num_relocated,
    };

    let text_path = config.destination("RUNINFO");
    let mut text = create(&text_path)?;
    writeln!(text, "project\t{}", info.project).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "run_date_unix\t{}", info.run_date_unix).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "version\t{}", info.version).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "root_alignment\t{}", info.root_alignment).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "total_seq\t{}", info.total_seq).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "min_actual_abundance\t{}", info.min_actual_abundance)
        .map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "min_substantive_abundance\t{}", info.min_substantive_abundance)
        .map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "min_entropy\t{}", info.min_entropy).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "number_of_discriminants\t{}", info.number_of_discriminants)
        .map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "output_directory\t{}", info.output_directory)
        .map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "nodes_directory\t{}", info.nodes_directory).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "cmd_line\t{}", info.cmd_line).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "num_sequences_after_qc\t{}", info.num_sequences_after_qc)
        .map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(
        text,
        "num_outliers_after_raw_topology\t{}",
        info.num_outliers_after_raw_topology
    )
    .map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(
        text,
        "num_outliers_after_refine_nodes\t{}",
        info.num_outliers_after_refine_nodes
    )
    .map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "num_final_nodes\t{}", info.num_final_nodes).map_err(|e| DecomposeError::io(&text_path, e))?;
    writeln!(text, "num_relocated\t{}", info.num_relocated).map_err(|e| DecomposeError::io(&text_path, e))?;

    let pickle_path = config.destination("RUNINFO.cPickle");
    let pickle = create(&pickle_path)?;
    serde_json::to_writer_pretty(pickle, &info).map_err(|e| DecomposeError::Format(e.to_string()))?;
    Ok(())
}

/// Text columns follow spec.md §4.G literally: `node_id, size,
/// parent_or_empty, level, children_csv`, one line per alive (non-killed)
/// node — internal split nodes included, not just finals.
fn write_topology(decomposer: &Decomposer) -> Result<()> {
    let config = &decomposer.config;
    let alive = decomposer.topology.alive();

    let text_path = config.destination("TOPOLOGY.txt");
    let mut text = create(&text_path)?;
    writeln!(text, "node_id\tsize\tparent_or_empty\tlevel\tchildren_csv")
        .map_err(|e| DecomposeError::io(&text_path, e))?;
    for node in &alive {
        writeln!(
            text,
            "{}\t{}\t{}\t{}\t{}",
            node.node_id,
            node.size,
            node.parent.as_deref().unwrap_or(""),
            node.level,
            node.children.join(","),
        )
        .map_err(|e| DecomposeError::io(&text_path, e))?;
    }

    let all_nodes: Vec<&Node> = decomposer.topology.iter().collect();
    let pickle_path = config.destination("TOPOLOGY.cPickle");
    let pickle = create(&pickle_path)?;
    serde_json::to_writer_pretty(pickle, &all_nodes).map_err(|e| DecomposeError::Format(e.to_string()))?;
    Ok(())
}

fn write_environment_and_matrices(decomposer: &Decomposer) -> Result<()> {
    let config = &decomposer.config;
    let finals = decomposer.topology.finals();

    // sample -> node_id -> count
    let mut matrix: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    for node in &finals {
        for id in &node.read_ids {
            let sample = sample_name(id, config.dataset_name_separator);
            *matrix
                .entry(sample)
                .or_default()
                .entry(node.node_id.clone())
                .or_insert(0) += 1;
        }
    }

    let node_ids: Vec<String> = {
        let mut ids: Vec<String> = finals.iter().map(|n| n.node_id.clone()).collect();
        ids.sort();
        ids
    };

    let environment_path = config.destination("ENVIRONMENT.txt");
    let mut environment = create(&environment_path)?;
    for (sample, nodes) in &matrix {
        for (node_id, count) in nodes {
            writeln!(environment, "{node_id}\t{sample}\t{count}")
                .map_err(|e| DecomposeError::io(&environment_path, e))?;
        }
    }

    let count_path = config.destination("MATRIX-COUNT.txt");
    let mut count_file = create(&count_path)?;
    let percent_path = config.destination("MATRIX-PERCENT.txt");
    let mut percent_file = create(&percent_path)?;

    let header = format!("sample\t{}", node_ids.join("\t"));
    writeln!(count_file, "{header}").map_err(|e| DecomposeError::io(&count_path, e))?;
    writeln!(percent_file, "{header}").map_err(|e| DecomposeError::io(&percent_path, e))?;

    for (sample, nodes) in &matrix {
        let total: u32 = nodes.values().sum();
        let counts: Vec<String> = node_ids
            .iter()
            .map(|id| nodes.get(id).copied().unwrap_or(0).to_string())
            .collect();
        writeln!(count_file, "{sample}\t{}", counts.join("\t")).map_err(|e| DecomposeError::io(&count_path, e))?;

        let percents: Vec<String> = node_ids
            .iter()
            .map(|id| {
                let count = nodes.get(id).copied().unwrap_or(0);
                let percent = if total == 0 {
                    0.0
                } else {
                    100.0 * count as f32 / total as f32
                };
                format!("{percent:.4}")
            })
            .collect();
        writeln!(percent_file, "{sample}\t{}", percents.join("\t"))
            .map_err(|e| DecomposeError::io(&percent_path, e))?;
    }

    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(
        File::create(path).map_err(|e| DecomposeError::io(path, e))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignmentWriter;
    use crate::config::Cli;
    use crate::config::Config;
    use crate::decompose::Decomposer;

    fn write_alignment(path: &std::path::Path, records: &[(&str, &str)]) {
        let mut writer = AlignmentWriter::create(path).unwrap();
        for (id, seq) in records {
            writer.append(id, seq.as_bytes()).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn writes_every_named_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let alignment_path = dir.path().join("input.fa");
        let records: Vec<(String, &str)> =
            (0..10).map(|i| (format!("SAMPLE_A_{i}"), "AAAAA"))
                .chain((0..10).map(|i| (format!("SAMPLE_B_{i}"), "TTTTT")))
                .collect();
        let records: Vec<(&str, &str)> = records.iter().map(|(a, b)| (a.as_str(), *b)).collect();
        write_alignment(&alignment_path, &records);

        let cli = Cli {
            alignment: alignment_path,
            min_entropy: 0.2,
            number_of_discriminants: 3,
            min_actual_abundance: 0,
            min_substantive_abundance: 4,
            output_directory: Some(dir.path().join("out")),
            project: Some("test".to_string()),
            dataset_name_separator: '_',
            skip_removing_outliers: false,
            relocate_outliers: false,
            generate_frequency_curves: false,
            debug: false,
        };
        let config = Config::resolve(cli).unwrap();
        let mut decomposer = Decomposer::new(config).unwrap();
        decomposer.decompose().unwrap();
        write_all(&decomposer).unwrap();

        let output_directory = decomposer.config.output_directory.clone();
        for name in [
            "RUNINFO",
            "RUNINFO.cPickle",
            "TOPOLOGY.txt",
            "TOPOLOGY.cPickle",
            "ENVIRONMENT.txt",
            "MATRIX-COUNT.txt",
            "MATRIX-PERCENT.txt",
        ] {
            assert!(output_directory.join(name).is_file(), "missing {name}");
        }
    }

    /// S1 (spec.md §8): a single-sample, single-cluster run writes exactly
    /// one ENVIRONMENT.txt line, columns `node_id, sample, count`.
    #[test]
    fn environment_columns_are_node_id_then_sample_then_count() {
        let dir = tempfile::tempdir().unwrap();
        let alignment_path = dir.path().join("input.fa");
        let records: Vec<(String, &str)> = (0..100).map(|i| (format!("SAMPLE_A_{i}"), "AAAAAAAAAAAAAAAAAAAA")).collect();
        let records: Vec<(&str, &str)> = records.iter().map(|(a, b)| (a.as_str(), *b)).collect();
        write_alignment(&alignment_path, &records);

        let cli = Cli {
            alignment: alignment_path,
            min_entropy: 0.2,
            number_of_discriminants: 3,
            min_actual_abundance: 0,
            min_substantive_abundance: 4,
            output_directory: Some(dir.path().join("out")),
            project: Some("test".to_string()),
            dataset_name_separator: '_',
            skip_removing_outliers: false,
            relocate_outliers: false,
            generate_frequency_curves: false,
            debug: false,
        };
        let config = Config::resolve(cli).unwrap();
        let mut decomposer = Decomposer::new(config).unwrap();
        decomposer.decompose().unwrap();
        write_all(&decomposer).unwrap();

        let node_id = decomposer.topology.finals()[0].node_id.clone();
        let contents = std::fs::read_to_string(decomposer.config.destination("ENVIRONMENT.txt")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], format!("{node_id}\tSAMPLE_A\t100"));
    }
}
