//! LogSink - logs published path summaries via tracing

use contracts::{ContractError, PathSink, PublishedPath};
use tracing::{info, instrument};

/// Sink that logs path summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_path_summary(&self, path: &PublishedPath) {
        let last = path.poses.last();
        info!(
            sink = %self.name,
            topic = %path.topic,
            seq = path.seq,
            frame_id = %path.frame_id,
            poses = path.poses.len(),
            end_x = last.map(|p| p.x),
            end_y = last.map(|p| p.y),
            "path published"
        );
    }
}

impl PathSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, path),
        fields(sink = %self.name, seq = path.seq)
    )]
    async fn write(&mut self, path: &PublishedPath) -> Result<(), ContractError> {
        self.log_path_summary(path);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
