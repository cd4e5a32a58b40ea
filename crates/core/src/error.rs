//! Error types for fibertrace.

use thiserror::Error;

/// Errors produced while configuring or running a tracking job.
///
/// Ordinary path termination (no candidate, length cap, stop/trap
/// transitions) is never an error; these variants cover misconfiguration
/// and unrecoverable runtime failures only.
#[derive(Debug, Error)]
pub enum TrackError {
    /// A configuration value was out of its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sample lacked an attribute channel established by the first sample of its curve.
    #[error("sample {index} is missing attribute channel '{channel}'")]
    MissingChannel { channel: String, index: usize },

    /// A sample carried an attribute channel the first sample of its curve did not have.
    #[error("sample {index} carries unexpected attribute channel '{channel}'")]
    UnexpectedChannel { channel: String, index: usize },

    /// A post-filter changed the number of curves while placeholders were required.
    #[error("post-filter changed curve count from {expected} to {got} while emitting empty curves")]
    FilterCardinality { expected: usize, got: usize },

    /// A worker thread panicked before finishing its batch.
    #[error("tracking worker for batch {batch} failed")]
    WorkerFailed { batch: usize },

    /// A voxel grid had a zero dimension or non-positive voxel size.
    #[error("invalid dimensions: grid dimensions and voxel size must be positive")]
    InvalidDimensions,

    /// Grid data length did not match its declared dimensions.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A field preset name was not recognized.
    #[error("unknown field: {0}")]
    UnknownField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_includes_message() {
        let err = TrackError::InvalidConfig("step must be positive".into());
        let msg = format!("{err}");
        assert!(msg.contains("step must be positive"), "got: {msg}");
    }

    #[test]
    fn missing_channel_names_channel_and_index() {
        let err = TrackError::MissingChannel {
            channel: "frac".into(),
            index: 7,
        };
        let msg = format!("{err}");
        assert!(msg.contains("frac"), "missing channel in: {msg}");
        assert!(msg.contains('7'), "missing index in: {msg}");
    }

    #[test]
    fn unexpected_channel_names_channel() {
        let err = TrackError::UnexpectedChannel {
            channel: "fa".into(),
            index: 2,
        };
        assert!(err.to_string().contains("fa"));
    }

    #[test]
    fn filter_cardinality_includes_counts() {
        let err = TrackError::FilterCardinality {
            expected: 12,
            got: 9,
        };
        let msg = format!("{err}");
        assert!(msg.contains("12"), "missing expected in: {msg}");
        assert!(msg.contains('9'), "missing got in: {msg}");
    }

    #[test]
    fn worker_failed_includes_batch() {
        let err = TrackError::WorkerFailed { batch: 3 };
        assert!(err.to_string().contains('3'));
    }

    #[test]
    fn dimension_mismatch_includes_lengths() {
        let err = TrackError::DimensionMismatch {
            expected: 64,
            got: 60,
        };
        let msg = format!("{err}");
        assert!(msg.contains("64") && msg.contains("60"), "got: {msg}");
    }

    #[test]
    fn track_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TrackError>();
    }

    #[test]
    fn track_error_implements_std_error() {
        fn assert_std_error<T: std::error::Error>() {}
        assert_std_error::<TrackError>();
    }
}
