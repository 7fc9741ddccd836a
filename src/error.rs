use std::path::PathBuf;

/// Errors surfaced by the decomposition engine.
///
/// `Config` aborts before any file under the output directory is created.
/// `Io` / `Format` can occur mid-decomposition and abort the run, leaving
/// whatever partial `NODES/` directory already exists on disk intact.
#[derive(thiserror::Error, Debug)]
pub enum DecomposeError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("alignment format error: {0}")]
    Format(String),
}

impl DecomposeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DecomposeError>;
