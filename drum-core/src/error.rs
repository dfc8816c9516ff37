//! Construction-time errors.
//!
//! Only misconfiguration is fatal. Inconclusive analysis windows are reported
//! as `None` by the estimators and never reach this type.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must not be zero")]
    ZeroSize { name: &'static str },

    #[error("{name} must be a power of two (got {value})")]
    NotPowerOfTwo { name: &'static str, value: usize },

    #[error("coarse window ({coarse}) must not exceed refine window ({refine})")]
    CoarseExceedsRefine { coarse: usize, refine: usize },

    #[error("sample rate must be positive")]
    InvalidSampleRate,

    #[error("invalid frequency band [{min_hz}, {max_hz}] Hz at sample rate {sample_rate} Hz")]
    InvalidBand {
        min_hz: f32,
        max_hz: f32,
        sample_rate: u32,
    },

    #[error("maxPeaks must be at least 1")]
    NoPeaks,
}

/// Checks that `value` is a positive power of two.
pub(crate) fn require_power_of_two(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroSize { name });
    }
    if !value.is_power_of_two() {
        return Err(ConfigError::NotPowerOfTwo { name, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_of_two_check() {
        assert!(require_power_of_two("size", 1).is_ok());
        assert!(require_power_of_two("size", 4096).is_ok());
        assert_eq!(
            require_power_of_two("size", 0),
            Err(ConfigError::ZeroSize { name: "size" })
        );
        assert_eq!(
            require_power_of_two("size", 3000),
            Err(ConfigError::NotPowerOfTwo { name: "size", value: 3000 })
        );
    }

    #[test]
    fn messages_name_the_field() {
        let err = ConfigError::NotPowerOfTwo { name: "coarseSize", value: 1000 };
        assert_eq!(err.to_string(), "coarseSize must be a power of two (got 1000)");
    }
}
