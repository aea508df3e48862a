use std::path::PathBuf;
use thiserror::Error;
use geogrounder_toolkit::splits::SplitError;
use geogrounder_worddist::WordDistError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("Missing required option {0}")]
    Missing(&'static str),
    #[error("{0}")]
    Incompatible(String),
    #[error("Failed to read the config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Failures while reading or writing one of the tables.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("The article data file {0} has no header row")]
    MissingHeader(PathBuf),
}

#[derive(Debug, Error)]
pub enum KmlError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error("The region distribution for {0:?} is not normalized")]
    NotNormalized(String),
}

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum GeotagError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Kml(#[from] KmlError),
    #[error(transparent)]
    WordDist(#[from] WordDistError),
    #[error(transparent)]
    Split(#[from] SplitError),
}
