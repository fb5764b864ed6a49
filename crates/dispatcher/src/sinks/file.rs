//! FileSink - writes each published path as a JSON file
//!
//! Layout: `<base_path>/<robot>/<topic>/<seq>.json`, where the namespaced
//! topic already starts with the robot name.

use contracts::{ContractError, PathSink, PublishedPath};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));
        let pretty = params
            .get("pretty")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        Self { base_path, pretty }
    }
}

/// Sink that writes paths to disk
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    created_dirs: HashSet<PathBuf>,
}

impl FileSink {
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            created_dirs: HashSet::new(),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    /// Target file for `path`
    pub fn file_for(&self, path: &PublishedPath) -> PathBuf {
        self.config
            .base_path
            .join(&path.topic)
            .join(format!("{}.json", path.seq))
    }

    fn write_path_to_disk(&mut self, path: &PublishedPath) -> std::io::Result<()> {
        let target = self.file_for(path);
        if let Some(dir) = target.parent() {
            if !self.created_dirs.contains(dir) {
                fs::create_dir_all(dir)?;
                self.created_dirs.insert(dir.to_path_buf());
            }
        }

        let writer = BufWriter::new(File::create(&target)?);
        let result = if self.config.pretty {
            serde_json::to_writer_pretty(writer, path)
        } else {
            serde_json::to_writer(writer, path)
        };
        result.map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn persist_path(&mut self, path: &PublishedPath) -> Result<(), ContractError> {
        self.write_path_to_disk(path).map_err(|e| {
            error!(sink = %self.name, topic = %path.topic, seq = path.seq, error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }
}

impl PathSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, path),
        fields(sink = %self.name, topic = %path.topic, seq = path.seq)
    )]
    async fn write(&mut self, path: &PublishedPath) -> Result<(), ContractError> {
        self.persist_path(path)
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, dirs = self.created_dirs.len(), "FileSink closed");
        Ok(())
    }
}
