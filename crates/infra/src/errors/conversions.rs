//! Conversions from external infrastructure errors into domain errors.

use notaryflow_domain::NotaryError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub NotaryError);

impl From<InfraError> for NotaryError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<NotaryError> for InfraError {
    fn from(value: NotaryError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoNotaryError {
    fn into_notary(self) -> NotaryError;
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → NotaryError */
/* -------------------------------------------------------------------------- */

impl IntoNotaryError for std::io::Error {
    fn into_notary(self) -> NotaryError {
        use std::io::ErrorKind;

        match self.kind() {
            ErrorKind::NotFound => NotaryError::NotFound(self.to_string()),
            ErrorKind::InvalidData => NotaryError::InvalidInput(self.to_string()),
            _ => NotaryError::Io(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        InfraError(value.into_notary())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → NotaryError */
/* -------------------------------------------------------------------------- */

impl IntoNotaryError for HttpError {
    fn into_notary(self) -> NotaryError {
        if self.is_timeout() {
            return NotaryError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return NotaryError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                404 => NotaryError::NotFound(message),
                400..=499 if code != 429 => NotaryError::InvalidInput(message),
                _ => NotaryError::Network(message),
            };
        }

        NotaryError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_notary())
    }
}

/* -------------------------------------------------------------------------- */
/* toml / serde_json → NotaryError */
/* -------------------------------------------------------------------------- */

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(NotaryError::Config(format!("Invalid TOML format: {value}")))
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(NotaryError::Config(format!("Invalid JSON format: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
