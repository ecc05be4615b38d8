//! Macros for the document pipeline.
//!
//! This module provides utility macros to reduce duplication across the
//! pipeline, particularly for configuration validation.

/// Implements [`ConfigValidator`](crate::core::config::ConfigValidator) for a
/// config struct from a compact field/constraint listing.
///
/// Supported constraints:
/// - `range(lo, hi)` - field must lie in the inclusive range
/// - `min(lo)` - field must be at least `lo`
/// - `positive` - field must be strictly greater than zero
/// - `required` - `Option` field must be `Some`
///
/// # Usage
///
/// ```rust,no_run
/// // impl_config_validator!(MatchingConfig {
/// //     min_coarse_score: range(0.0, 1.0),
/// //     top_n: min(1),
/// // });
/// ```
#[macro_export]
macro_rules! impl_config_validator {
    ($Config:ident { $( $field:ident : $check:ident $( ( $($arg:expr),* ) )? ),* $(,)? }) => {
        impl $crate::core::config::ConfigValidator for $Config {
            fn validate(&self) -> Result<(), $crate::core::config::ConfigError> {
                $(
                    $crate::impl_config_validator!(@check self, $field, $check $( ( $($arg),* ) )?);
                )*
                Ok(())
            }
        }
    };

    (@check $self:ident, $field:ident, range($lo:expr, $hi:expr)) => {
        if $self.$field < $lo || $self.$field > $hi {
            return Err($crate::core::config::ConfigError::invalid_value(
                stringify!($field),
                format!("value in [{}, {}]", $lo, $hi),
                $self.$field,
            ));
        }
    };

    (@check $self:ident, $field:ident, min($lo:expr)) => {
        if $self.$field < $lo {
            return Err($crate::core::config::ConfigError::invalid_value(
                stringify!($field),
                format!("value >= {}", $lo),
                $self.$field,
            ));
        }
    };

    (@check $self:ident, $field:ident, positive) => {
        if !($self.$field > Default::default()) {
            return Err($crate::core::config::ConfigError::invalid_value(
                stringify!($field),
                "value > 0",
                $self.$field,
            ));
        }
    };

    (@check $self:ident, $field:ident, required) => {
        if $self.$field.is_none() {
            return Err($crate::core::config::ConfigError::missing_field(
                stringify!($field),
            ));
        }
    };
}
