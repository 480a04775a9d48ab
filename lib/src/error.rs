//! Error type shared by every analysis, transform and I/O operation

use thiserror::Error;

/// Errors reported by the library
#[derive(Error, Debug)]
pub enum AudioError {
    /// The buffer is shorter than one analysis window
    #[error("insufficient samples: need at least {required}, got {available}")]
    InsufficientSamples { required: usize, available: usize },

    /// A speed factor, semitone count or configuration value was rejected
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The decoder rejected the input; the symphonia error is kept as-is
    #[error("decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// The WAV writer failed; the hound error is kept as-is
    #[error("encode error: {0}")]
    Encode(#[from] hound::Error),

    /// A NaN or infinity escaped a calculation
    #[error("non-finite result in {0}")]
    NonFiniteResult(&'static str),

    #[error("FFT error: {0}")]
    Fft(String),

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AudioError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        AudioError::InvalidParameter(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AudioError::InsufficientSamples {
            required: 2048,
            available: 100,
        };
        assert_eq!(
            err.to_string(),
            "insufficient samples: need at least 2048, got 100"
        );

        let err = AudioError::invalid("speed factor must be greater than 0, got -1");
        assert!(err.to_string().starts_with("invalid parameter"));
    }
}
