use svcd::{ConfigError, DaemonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("Invalid service configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Daemon error: {0}")]
    Daemon(#[from] DaemonError),
}
