//! Error types shared across the core data model.

use thiserror::Error;

use crate::Output;

/// Failures in the core data model: malformed spaces, bad configuration,
/// and byte-layout decode problems.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A range add whose arithmetic progression is empty or runs away from
    /// its end value.
    #[error("invalid range {start} -> {end} (step {step})")]
    InvalidRange {
        start: Output,
        end: Output,
        step: Output,
    },

    /// Discount rate outside `[0, 1)`.
    #[error("discount rate must lie in [0, 1), got {0}")]
    DiscountRate(f32),

    /// Negative payoff threshold.
    #[error("payoff threshold must be non-negative, got {0}")]
    Threshold(f32),

    /// A decode ran off the end of its buffer.
    #[error("record truncated: needed {needed} bytes, had {available}")]
    Truncated { needed: usize, available: usize },

    /// A record's declared `total_size` disagrees with its action and link
    /// counts.
    #[error("record size mismatch: header declares {declared} bytes, counts require {required}")]
    SizeMismatch { declared: usize, required: usize },

    /// A record too large for the 16-bit `total_size` field.
    #[error("state record of {required} bytes exceeds the {max}-byte encoding limit")]
    RecordTooLarge { required: usize, max: usize },
}
