//! Error types for the allocation core.
//!
//! Every failure here is recoverable by the operator: the caller shows the
//! message and the registry stays as it was before the attempt.

use crate::ip::registry::SubnetId;

/// Result alias used throughout the allocation core
pub type Result<T> = std::result::Result<T, AllocError>;

/// Errors raised while parsing, validating or importing subnets
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("Invalid IP address or subnet '{input}': {reason}")]
    InvalidAddressFormat { input: String, reason: String },

    #[error("Subnet {range} is not within the summary address range {summary}")]
    OutOfSummaryBounds { range: String, summary: String },

    #[error("Subnet {range} overlaps with existing subnet: {label}")]
    OverlapConflict { label: String, range: String },

    #[error("Summary cannot be applied: subnet {label} ({range}) would fall outside it")]
    IncompatibleSummary { label: String, range: String },

    #[error("Import failed at row {row}: {message}")]
    ImportError { row: usize, message: String },

    #[error("Cannot resize {range} to /{prefix_len}: its base is not aligned to that block size")]
    MisalignedResize { range: String, prefix_len: u8 },

    #[error("No subnet with handle {0}")]
    UnknownSubnet(SubnetId),
}

impl AllocError {
    /// Label of the conflicting entry for overlap failures
    pub fn conflicting_label(&self) -> Option<&str> {
        match self {
            AllocError::OverlapConflict { label, .. } => Some(label),
            _ => None,
        }
    }

    /// Wrap any error as an import failure at the given 1-based row
    pub(crate) fn at_row(row: usize, err: AllocError) -> AllocError {
        match err {
            AllocError::ImportError { .. } => err,
            other => AllocError::ImportError { row, message: other.to_string() },
        }
    }
}
