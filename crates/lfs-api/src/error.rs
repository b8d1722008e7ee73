//! Error types.

use std::path::PathBuf;

/// Errors from the API client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The endpoint could not be derived or parsed.
    #[error("invalid endpoint {url:?}: {reason}")]
    Endpoint { url: String, reason: &'static str },

    /// The request never produced a usable response.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A local object could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The transfer runtime could not be started.
    #[error("failed to start transfer runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl ApiError {
    /// HTTP status code, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// An error recorded by the upload queue for one object.
///
/// Fatal errors mean the transfer machinery itself is broken (unreachable
/// server, bad credentials, server faults) and nothing built on the queue can
/// be trusted. Object errors are the server declining one object and leave
/// the rest of the batch usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("fatal transfer error for {oid}: {message}")]
    Fatal { oid: String, message: String },

    #[error("object {oid} rejected with code {code}: {message}")]
    Object {
        oid: String,
        code: u16,
        message: String,
    },
}

impl TransferError {
    /// Classify a client error raised while transferring `oid`.
    ///
    /// Authentication failures, missing API routes and server faults are
    /// fatal; any other 4xx status is an object-level rejection.
    pub fn from_api(oid: &str, err: ApiError) -> Self {
        match err.status() {
            Some(code @ 400..=499) if !matches!(code, 401 | 403 | 404) => Self::Object {
                oid: oid.to_string(),
                code,
                message: err.to_string(),
            },
            _ => Self::Fatal {
                oid: oid.to_string(),
                message: err.to_string(),
            },
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    pub fn oid(&self) -> &str {
        match self {
            Self::Fatal { oid, .. } | Self::Object { oid, .. } => oid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ApiError {
        ApiError::Status {
            status: code,
            message: "nope".into(),
        }
    }

    #[test]
    fn test_client_errors_are_object_level() {
        let err = TransferError::from_api("abc", status(422));
        assert!(!err.is_fatal());
        assert_eq!(err.oid(), "abc");

        let err = TransferError::from_api("abc", status(409));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_auth_and_server_errors_are_fatal() {
        for code in [401, 403, 404, 500, 503] {
            let err = TransferError::from_api("abc", status(code));
            assert!(err.is_fatal(), "status {code} should be fatal");
        }
    }

    #[test]
    fn test_local_io_is_fatal() {
        let err = TransferError::from_api(
            "abc",
            ApiError::Io {
                path: PathBuf::from("/nonexistent"),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            },
        );
        assert!(err.is_fatal());
    }
}
