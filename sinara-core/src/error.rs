pub use anyhow::bail;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinaraError {
    Config(String),
    Runtime(String),
    Registry(String),
    Network(String),
    Io(#[from] std::io::Error),
    Serialization(String),
    Internal(String),
    DaemonUnreachable,
    Other(#[from] anyhow::Error),
}

impl Display for SinaraError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SinaraError::Config(s) => write!(f, "Configuration error: {}", s),
            SinaraError::Runtime(s) => write!(f, "Container runtime error: {}", s),
            SinaraError::Registry(s) => write!(f, "Registry error: {}", s),
            SinaraError::Network(s) => write!(f, "Network error: {}", s),
            SinaraError::Io(e) => write!(f, "I/O error: {}", e),
            SinaraError::Serialization(s) => write!(f, "Serialization error: {}", s),
            SinaraError::Internal(s) => write!(f, "Internal error: {}", s),
            SinaraError::DaemonUnreachable => {
                write!(f, "Cannot connect to the docker daemon\n\n")?;
                write!(f, "Fix:\n")?;
                write!(f, "  • Start Docker Desktop, or\n")?;
                write!(f, "  • Run: sudo systemctl start docker\n")?;
                write!(f, "  • Verify: docker ps")
            }
            SinaraError::Other(e) => write!(f, "Other error: {}", e),
        }
    }
}

impl From<serde_json::Error> for SinaraError {
    fn from(err: serde_json::Error) -> Self {
        SinaraError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SinaraError>;
