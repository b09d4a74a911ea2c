//! Error types for arpdump
//!
//! # NIST 800-53 Rev 5 Control Mappings
//! - SI-11: Error Handling - Structured error types with contextual information
//! - SI-10: Information Input Validation - Decode errors carry the failing offset

use thiserror::Error;

/// Errors that can occur while dumping the ARP table
///
/// Only snapshot acquisition and decoding failures propagate. Interface and
/// hostname lookup misses are absorbed by the formatter and never show up here.
///
/// # NIST Controls
/// - SI-11(a): Generate error messages providing information necessary for corrective actions
#[derive(Debug, Error)]
pub enum ArpdumpError {
    /// The size-estimation sysctl failed
    #[error("route-sysctl-estimate: {0}")]
    SnapshotSize(#[source] std::io::Error),

    /// The fill sysctl failed for a reason other than a short buffer
    #[error("actual retrieval of routing table: {0}")]
    SnapshotFetch(#[source] std::io::Error),

    /// The snapshot buffer could not be grown
    #[error("could not reallocate memory ({bytes} bytes)")]
    SnapshotAllocation { bytes: usize },

    /// A route message does not fit the buffer or its own declared length
    /// NIST: SI-10 - Kernel data validated before use
    #[error("malformed route message at offset {offset}: {reason}")]
    Decode { offset: usize, reason: String },

    /// A host named on the command line has no IPv4 address
    #[error("{0}: host not found")]
    HostNotFound(String),

    /// Configuration error
    /// NIST: CM-6 (Configuration Settings) - Configuration validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArpdumpError {
    pub(crate) fn decode(offset: usize, reason: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            reason: reason.into(),
        }
    }
}

/// Result type alias for arpdump operations
pub type Result<T> = std::result::Result<T, ArpdumpError>;
