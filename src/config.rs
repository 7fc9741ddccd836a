//! Decomposer configuration: CLI definition, defaults, and derived paths.

use std::path::Path;
use std::path::PathBuf;

use clap::Parser;

use crate::error::DecomposeError;
use crate::error::Result;

/// Entropy-driven hierarchical decomposition of aligned reads into oligotypes.
#[derive(Parser, Debug, Clone)]
#[command(name = "decompose", version, about)]
pub struct Cli {
    /// path to the input alignment (equal-length aligned FASTA reads)
    #[arg(long)]
    pub alignment: PathBuf,

    /// minimum entropy a column must exceed to be a discriminant candidate
    #[arg(long, default_value_t = 0.2)]
    pub min_entropy: f32,

    /// number of high-entropy columns considered per split
    #[arg(long, default_value_t = 3)]
    pub number_of_discriminants: usize,

    /// finalize (don't kill) a node whose total size is at or below this
    #[arg(long, default_value_t = 0)]
    pub min_actual_abundance: usize,

    /// kill a node whose most abundant unique sequence is below this count
    #[arg(long, default_value_t = 4)]
    pub min_substantive_abundance: u32,

    /// directory outputs are written under (default: derived from project)
    #[arg(long)]
    pub output_directory: Option<PathBuf>,

    /// project name (default: alignment file's stem)
    #[arg(long)]
    pub project: Option<String>,

    /// separator used to strip the replicate suffix off a sample name
    #[arg(long, default_value_t = '_')]
    pub dataset_name_separator: char,

    /// skip the outlier-removal refinement pass
    #[arg(long, default_value_t = false)]
    pub skip_removing_outliers: bool,

    /// record relocation suggestions for expelled outliers
    #[arg(long, default_value_t = false)]
    pub relocate_outliers: bool,

    /// accepted for CLI compatibility; visualization is out of scope here
    #[arg(long, default_value_t = false)]
    pub generate_frequency_curves: bool,

    /// verbose logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

/// Resolved, validated configuration the decomposer actually runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub alignment: PathBuf,
    pub min_entropy: f32,
    pub number_of_discriminants: usize,
    pub min_actual_abundance: usize,
    pub min_substantive_abundance: u32,
    pub output_directory: PathBuf,
    pub project: String,
    pub dataset_name_separator: char,
    pub skip_removing_outliers: bool,
    pub relocate_outliers: bool,
    pub generate_frequency_curves: bool,
    pub debug: bool,
}

impl Config {
    /// Validates `cli` and fills in the `--project` / `--output-directory`
    /// defaults the original derives from the alignment path (see
    /// SPEC_FULL.md §4.F).
    pub fn resolve(cli: Cli) -> Result<Self> {
        if !cli.alignment.is_file() {
            return Err(DecomposeError::Config(format!(
                "alignment file is not accessible: {}",
                cli.alignment.display()
            )));
        }
        let project = cli.project.clone().unwrap_or_else(|| {
            cli.alignment
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "project".to_string())
        });
        let prefix = format!(
            "m{:.2}-A{}-d{}",
            cli.min_entropy, cli.min_actual_abundance, cli.number_of_discriminants
        );
        let output_directory = cli.output_directory.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_default()
                .join(format!("{}-{}", project.replace(' ', "_"), prefix))
        });

        Ok(Self {
            alignment: cli.alignment,
            min_entropy: cli.min_entropy,
            number_of_discriminants: cli.number_of_discriminants,
            min_actual_abundance: cli.min_actual_abundance,
            min_substantive_abundance: cli.min_substantive_abundance,
            output_directory,
            project,
            dataset_name_separator: cli.dataset_name_separator,
            skip_removing_outliers: cli.skip_removing_outliers,
            relocate_outliers: cli.relocate_outliers,
            generate_frequency_curves: cli.generate_frequency_curves,
            debug: cli.debug,
        })
    }

    pub fn nodes_directory(&self) -> PathBuf {
        self.output_directory.join("NODES")
    }

    pub fn destination(&self, name: &str) -> PathBuf {
        self.output_directory.join(name)
    }

    /// Creates `output_directory` and a fresh, empty `NODES/` under it.
    pub fn prepare_output_directory(&self) -> Result<()> {
        let dir = &self.output_directory;
        std::fs::create_dir_all(dir).map_err(|e| DecomposeError::io(dir, e))?;
        ensure_writable(dir)?;
        let nodes = self.nodes_directory();
        if nodes.exists() {
            std::fs::remove_dir_all(&nodes).map_err(|e| DecomposeError::io(&nodes, e))?;
        }
        std::fs::create_dir_all(&nodes).map_err(|e| DecomposeError::io(&nodes, e))?;
        Ok(())
    }
}

fn ensure_writable(dir: &Path) -> Result<()> {
    let probe = dir.join(".decompose-write-check");
    std::fs::write(&probe, b"").map_err(|e| {
        DecomposeError::Config(format!(
            "no write permission for output directory {}: {e}",
            dir.display()
        ))
    })?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}
