//! Transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid listen address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
