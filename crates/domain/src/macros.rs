//! Macro for implementing Display and FromStr for status enums
//!
//! Status values reported by external tools arrive as free text. This macro
//! maps each enum variant to the exact text the tool prints, giving a single
//! definition for both directions of the conversion.
//!
//! # Example
//!
//! ```rust
//! use notaryflow_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum StapleState {
//!     Stapled,
//!     Failed,
//! }
//!
//! impl_domain_status_conversions!(StapleState {
//!     Stapled => "stapled",
//!     Failed => "failed",
//! });
//!
//! assert_eq!("STAPLED".parse::<StapleState>(), Ok(StapleState::Stapled));
//! ```

/// Implements Display and FromStr traits for status enums
///
/// - Display writes the mapped text verbatim
/// - FromStr trims the input and matches case-insensitively
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:literal),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum SampleStatus {
        InProgress,
        Done,
    }

    impl_domain_status_conversions!(SampleStatus {
        InProgress => "in progress",
        Done => "done",
    });

    #[test]
    fn test_display_uses_tool_text() {
        assert_eq!(SampleStatus::InProgress.to_string(), "in progress");
        assert_eq!(SampleStatus::Done.to_string(), "done");
    }

    #[test]
    fn test_fromstr_ignores_case_and_padding() {
        assert_eq!(SampleStatus::from_str("  In Progress "), Ok(SampleStatus::InProgress));
        assert_eq!(SampleStatus::from_str("DONE"), Ok(SampleStatus::Done));
    }

    #[test]
    fn test_fromstr_invalid() {
        let result = SampleStatus::from_str("queued");
        assert_eq!(result, Err("Invalid SampleStatus: queued".to_string()));
        assert!(SampleStatus::from_str("").is_err());
    }
}
