//! Server configuration from command-line arguments and environment

use clap::Parser;
use lex_pipeline::defaults::CorpusFetcher;
use lex_pipeline::{Collaborators, Pipeline, PipelineConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "lex-server", version, about = "Claim-grounded legal document service")]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    #[arg(long, env = "LEX_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// Pipeline configuration file (TOML); defaults apply when absent
    #[arg(long, env = "LEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Offline corpus of official documents (JSON); the bundled corpus when absent
    #[arg(long, env = "LEX_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LEX_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Transport budget per request in seconds
    #[arg(long, env = "LEX_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Transport budget per request
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load the pipeline configuration
    ///
    /// # Errors
    /// Fails if the configured file cannot be read or is invalid.
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if config.pipeline_timeout() >= self.request_timeout() {
            tracing::warn!(
                pipeline_timeout_ms = config.pipeline_timeout_ms,
                request_timeout_secs = self.request_timeout_secs,
                "pipeline deadline is not below the transport budget; partial responses may be cut off"
            );
        }
        Ok(config)
    }

    /// Assemble the pipeline with the offline collaborators
    ///
    /// # Errors
    /// Fails on invalid configuration or an unreadable corpus.
    pub fn build_pipeline(&self) -> anyhow::Result<Pipeline> {
        let corpus = match &self.corpus {
            Some(path) => CorpusFetcher::load(path)?,
            None => CorpusFetcher::builtin()?,
        };
        tracing::info!(documentos = corpus.len(), "corpus loaded");
        let pipeline = Pipeline::new(self.pipeline_config()?, Collaborators::offline(Arc::new(corpus)))?;
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::parse_from(["lex-server"]);
        assert_eq!(config.listen, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert!(config.config.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn default_deadline_sits_below_transport_budget() {
        let config = ServerConfig::parse_from(["lex-server"]);
        let pipeline = config.pipeline_config().unwrap();
        assert!(pipeline.pipeline_timeout() < config.request_timeout());
    }

    #[test]
    fn flags_override() {
        let config = ServerConfig::parse_from([
            "lex-server",
            "--listen",
            "0.0.0.0:9000",
            "--log-json",
            "--request-timeout-secs",
            "90",
        ]);
        assert_eq!(config.listen.port(), 9000);
        assert!(config.log_json);
        assert_eq!(config.request_timeout_secs, 90);
    }

    #[test]
    fn builtin_pipeline_builds() {
        assert!(ServerConfig::parse_from(["lex-server"]).build_pipeline().is_ok());
    }
}
