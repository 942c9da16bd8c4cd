//! Error types for transaction construction and signing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxForgeError {
    #[error("Malformed encoding: {0}")]
    Format(String),

    #[error("Checksum mismatch: {0}")]
    Checksum(String),

    #[error("Script parse failed: {0}")]
    ScriptParse(String),

    #[error("Unrecognized locking script: {0}")]
    UnsupportedScript(String),

    #[error("Digest computation failed: {0}")]
    DigestComputation(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, TxForgeError>;
