use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to call {method} {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response to {operation}: status {status}, body [ {body} ]")]
    UnexpectedStatus {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} rejected: {message}")]
    Rejected { operation: String, message: String },

    #[error("timed out after {}s waiting for {description}", waited.as_secs())]
    Timeout {
        description: String,
        waited: Duration,
    },

    #[error("{0}")]
    IdentityResolution(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("deployment values error: {0}")]
    Template(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn unexpected(operation: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Error::UnexpectedStatus {
            operation: operation.into(),
            status,
            body: body.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Error::Template(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_status_names_operation_and_code() {
        // Arrange
        let err = Error::unexpected("delete cluster", 500, "boom");

        // Act
        let message = err.to_string();

        // Assert
        assert!(message.contains("delete cluster"));
        assert!(message.contains("500"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn timeout_reports_waited_seconds() {
        let err = Error::Timeout {
            description: "cluster demo".to_string(),
            waited: Duration::from_secs(7200),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 7200s waiting for cluster demo"
        );
    }
}
