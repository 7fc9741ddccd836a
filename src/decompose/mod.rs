//! The main iterative driver: split, finalize, outlier removal, relocation.

mod outliers;
mod raw;
mod relocate;

use std::collections::HashMap;

use crate::align::Alignment;
use crate::align::AlignmentSource;
use crate::config::Config;
use crate::error::DecomposeError;
use crate::error::Result;
use crate::node::Node;
use crate::node::NodeId;
use crate::report::Reporter;
use crate::topology::Topology;

/// One expelled sequence: where it came from (`None` means killed during
/// raw topology, `Some(id)` means expelled during leaf refinement) and
/// where relocation, if enabled, suggests it be moved.
#[derive(Debug, Clone)]
pub struct Outlier {
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
    pub ids: Vec<String>,
}

/// Summary statistics reported into RUNINFO, accumulated as the
/// decomposition proceeds rather than recomputed at the end.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub num_sequences_after_qc: usize,
    pub num_outliers_after_raw_topology: usize,
    pub num_outliers_after_refine_nodes: usize,
    pub num_final_nodes: usize,
    pub num_relocated: usize,
}

pub struct Decomposer {
    pub config: Config,
    pub topology: Topology,
    pub outliers: HashMap<Vec<u8>, Outlier>,
    pub alignment_length: usize,
    pub average_read_length: f32,
    pub max_variation_allowed: usize,
    pub decomposition_depth: i64,
    pub stats: RunStats,
}

impl Decomposer {
    pub fn new(config: Config) -> Result<Self> {
        let alignment = Alignment::open(&config.alignment)?;
        let root_size = alignment.total()?;
        if root_size <= config.min_actual_abundance {
            return Err(DecomposeError::Config(format!(
                "the number of reads in the alignment ({root_size}) is not greater than --min-actual-abundance ({})",
                config.min_actual_abundance
            )));
        }

        let mut total_unaligned = 0usize;
        let mut alignment_length = 0usize;
        for read in alignment.iter()? {
            let read = read?;
            alignment_length = read.sequence.len();
            total_unaligned += read.unaligned_len();
        }
        let average_read_length = total_unaligned as f32 / root_size.max(1) as f32;

        config.prepare_output_directory()?;
        let root_path = config.nodes_directory().join("root.fa");
        std::fs::copy(&config.alignment, &root_path).map_err(|e| DecomposeError::io(&root_path, e))?;
        let mut root = Node::root(root_path);
        root.size = root_size;

        Ok(Self {
            config,
            topology: Topology::new(root),
            outliers: HashMap::new(),
            alignment_length,
            average_read_length,
            max_variation_allowed: ((average_read_length / 100.0).round() as usize).max(1),
            decomposition_depth: -1,
            stats: RunStats::default(),
        })
    }

    /// Runs the full pipeline: raw topology, outlier removal, optional
    /// relocation, final refresh. Returns the resolved [`RunStats`].
    pub fn decompose(&mut self) -> Result<RunStats> {
        raw::generate_raw_topology(self)?;

        let mut refreshed = false;
        if !self.config.skip_removing_outliers {
            outliers::remove_outliers(self)?;
            refreshed = true;
        }
        if self.config.relocate_outliers {
            relocate::relocate_outliers(self)?;
            refreshed = true;
        }
        if refreshed {
            self.refresh_final_nodes()?;
        }

        self.stats.num_final_nodes = self.topology.finals().len();
        self.stats.num_sequences_after_qc = self.topology.finals().iter().map(|n| n.size).sum();
        Ok(self.stats.clone())
    }

    fn refresh_final_nodes(&mut self) -> Result<()> {
        let reporter = Reporter::phase("refreshing final nodes");
        let ids: Vec<NodeId> = self.topology.finals().iter().map(|n| n.node_id.clone()).collect();
        for (i, id) in ids.iter().enumerate() {
            reporter.update(format!("{} ({} of {})", id, i + 1, ids.len()));
            self.topology.get_mut(id).expect("final node exists").refresh()?;
        }
        reporter.finish();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignmentWriter;
    use std::path::PathBuf;

    fn write_alignment(path: &PathBuf, records: &[(&str, &str)]) {
        let mut writer = AlignmentWriter::create(path).unwrap();
        for (id, seq) in records {
            writer.append(id, seq.as_bytes()).unwrap();
        }
        writer.close().unwrap();
    }

    fn base_cli(alignment: PathBuf, output_directory: PathBuf) -> crate::config::Cli {
        crate::config::Cli {
            alignment,
            min_entropy: 0.2,
            number_of_discriminants: 3,
            min_actual_abundance: 0,
            min_substantive_abundance: 4,
            output_directory: Some(output_directory),
            project: Some("test".to_string()),
            dataset_name_separator: '_',
            skip_removing_outliers: false,
            relocate_outliers: false,
            generate_frequency_curves: false,
            debug: false,
        }
    }

    /// S1: a single cluster of identical reads decomposes to one final node.
    #[test]
    fn s1_single_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let alignment_path = dir.path().join("input.fa");
        let records: Vec<(String, &str)> =
            (0..100).map(|i| (format!("SAMPLE_A_{i}"), "AAAAAAAAAAAAAAAAAAAA")).collect();
        let records: Vec<(&str, &str)> = records.iter().map(|(a, b)| (a.as_str(), *b)).collect();
        write_alignment(&alignment_path, &records);

        let cli = base_cli(alignment_path, dir.path().join("out"));
        let config = Config::resolve(cli).unwrap();
        let mut decomposer = Decomposer::new(config).unwrap();
        let stats = decomposer.decompose().unwrap();

        assert_eq!(stats.num_final_nodes, 1);
        let finals = decomposer.topology.finals();
        assert_eq!(finals[0].size, 100);
        assert_eq!(finals[0].density, 1.0);
        assert_eq!(finals[0].competing_unique_sequences_ratio, 0.0);
        assert!(decomposer.outliers.is_empty());
    }

    /// S2: two-way split on the one variable column, both children final.
    #[test]
    fn s2_two_way_split() {
        let dir = tempfile::tempdir().unwrap();
        let alignment_path = dir.path().join("input.fa");
        let mut records: Vec<(String, &str)> = (0..50).map(|i| (format!("S_x_{i}"), "AAAAA")).collect();
        records.extend((50..100).map(|i| (format!("S_x_{i}"), "AATAA")));
        let records: Vec<(&str, &str)> = records.iter().map(|(a, b)| (a.as_str(), *b)).collect();
        write_alignment(&alignment_path, &records);

        let cli = base_cli(alignment_path, dir.path().join("out"));
        let config = Config::resolve(cli).unwrap();
        let mut decomposer = Decomposer::new(config).unwrap();
        decomposer.decompose().unwrap();

        let finals = decomposer.topology.finals();
        assert_eq!(finals.len(), 2);
        assert_eq!(finals.iter().map(|n| n.size).sum::<usize>(), 100);
        for node in &finals {
            assert_eq!(node.size, 50);
        }
        let root = decomposer.topology.get("root").unwrap();
        assert_eq!(root.discriminants, vec![2]);
    }

    /// S3: three singleton unique sequences all fail the substantive-abundance
    /// kill rule; every sequence ends up in outliers with from=None.
    #[test]
    fn s3_substantive_abundance_kill() {
        let dir = tempfile::tempdir().unwrap();
        let alignment_path = dir.path().join("input.fa");
        let records = vec![("r1", "AAAAA"), ("r2", "TTTTT"), ("r3", "GGGGG")];
        write_alignment(&alignment_path, &records);

        let cli = base_cli(alignment_path, dir.path().join("out"));
        let config = Config::resolve(cli).unwrap();
        let mut decomposer = Decomposer::new(config).unwrap();
        let stats = decomposer.decompose().unwrap();

        assert_eq!(stats.num_final_nodes, 0);
        assert_eq!(decomposer.outliers.len(), 3);
        for outlier in decomposer.outliers.values() {
            assert!(outlier.from.is_none());
        }
    }

    /// S4: a node 95/5 skewed finalizes on density even though its one
    /// variable column has positive entropy.
    #[test]
    fn s4_purity_shortcut() {
        let dir = tempfile::tempdir().unwrap();
        let alignment_path = dir.path().join("input.fa");
        let mut records: Vec<(String, &str)> = (0..95).map(|i| (format!("r{i}"), "AAAAA")).collect();
        records.extend((0..5).map(|i| (format!("x{i}"), "AATAA")));
        let records: Vec<(&str, &str)> = records.iter().map(|(a, b)| (a.as_str(), *b)).collect();
        write_alignment(&alignment_path, &records);

        let cli = base_cli(alignment_path, dir.path().join("out"));
        let config = Config::resolve(cli).unwrap();
        let mut decomposer = Decomposer::new(config).unwrap();
        let stats = decomposer.decompose().unwrap();

        assert_eq!(stats.num_final_nodes, 1);
        let finals = decomposer.topology.finals();
        assert_eq!(finals[0].size, 100);
        assert!(finals[0].density > 0.85);
    }
}
