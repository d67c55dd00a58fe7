//! Run configuration from environment variables.
//!
//! | Variable              | Default      | Meaning                                   |
//! |-----------------------|--------------|-------------------------------------------|
//! | `STAGELOAD_DATA_DIR`  | `data`       | directory holding the three source files  |
//! | `STAGELOAD_DATABASE`  | `staging.db` | main SQLite database of the SQLite sink   |
//! | `STAGELOAD_CSV_OUT`   | unset        | when set, write CSV files here instead    |
//! | `STAGELOAD_NAMESPACE` | `stg_data`   | destination namespace                     |
//!
//! Command-line flags override the environment through the `with_*` methods.

use std::path::PathBuf;

use crate::error::{ConfigError, PipelineResult};
use crate::sink::{validate_identifier, CsvDirSink, SqliteSink, StagingSink};
use crate::transform::pipeline::SourceKind;

pub const ENV_DATA_DIR: &str = "STAGELOAD_DATA_DIR";
pub const ENV_DATABASE: &str = "STAGELOAD_DATABASE";
pub const ENV_CSV_OUT: &str = "STAGELOAD_CSV_OUT";
pub const ENV_NAMESPACE: &str = "STAGELOAD_NAMESPACE";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_DATABASE: &str = "staging.db";
pub const DEFAULT_NAMESPACE: &str = "stg_data";

/// Where cleaned tables go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Main SQLite database file; namespaces are attached beside it.
    Sqlite(PathBuf),
    /// Root directory of per-namespace CSV folders.
    CsvDir(PathBuf),
}

impl SinkTarget {
    /// Open the sink this target describes.
    pub fn open(&self) -> PipelineResult<Box<dyn StagingSink>> {
        Ok(match self {
            SinkTarget::Sqlite(path) => Box::new(SqliteSink::open(path)?),
            SinkTarget::CsvDir(root) => Box::new(CsvDirSink::new(root.clone())),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub data_dir: PathBuf,
    pub namespace: String,
    pub sink: SinkTarget,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            namespace: DEFAULT_NAMESPACE.to_string(),
            sink: SinkTarget::Sqlite(PathBuf::from(DEFAULT_DATABASE)),
        }
    }
}

impl IngestConfig {
    /// Read the process environment. Call `dotenvy::dotenv()` first to honor `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(namespace) = get(ENV_NAMESPACE) {
            config = config.with_namespace(namespace)?;
        }
        if let Some(db) = get(ENV_DATABASE) {
            config.sink = SinkTarget::Sqlite(PathBuf::from(db));
        }
        if let Some(out) = get(ENV_CSV_OUT) {
            config.sink = SinkTarget::CsvDir(PathBuf::from(out));
        }

        Ok(config)
    }

    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Result<Self, ConfigError> {
        let namespace = namespace.into();
        validate_identifier(&namespace).map_err(|e| ConfigError::InvalidValue {
            key: ENV_NAMESPACE.to_string(),
            message: e.to_string(),
        })?;
        self.namespace = namespace;
        Ok(self)
    }

    #[must_use]
    pub fn with_sink(mut self, sink: SinkTarget) -> Self {
        self.sink = sink;
        self
    }

    /// Expected location of a source file.
    pub fn source_path(&self, kind: SourceKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }
}
