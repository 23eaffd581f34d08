use thiserror::Error;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error kinds surfaced by the repository and task layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Transient(String),
    #[error("invalid: {0}")]
    Invalid(String),
    #[error("fatal: {0}")]
    Fatal(String),
}

impl RepoError {
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound(message)
            | Self::PermissionDenied(message)
            | Self::Conflict(message)
            | Self::Unavailable(message)
            | Self::Transient(message)
            | Self::Invalid(message)
            | Self::Fatal(message) => message,
        }
    }

    /// Missing optional APIs (metrics-server, Istio) degrade instead of failing.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unavailable(_))
    }

    pub fn timed_out(operation: &str) -> Self {
        Self::Transient(format!("{operation} timed out"))
    }

    fn from_status(code: u16, message: String) -> Self {
        match code {
            404 => Self::NotFound(message),
            401 | 403 => Self::PermissionDenied(message),
            409 => Self::Conflict(message),
            502 | 503 => Self::Unavailable(message),
            400 | 422 => Self::Invalid(message),
            _ => Self::Transient(message),
        }
    }
}

impl From<kube::Error> for RepoError {
    fn from(error: kube::Error) -> Self {
        match error {
            kube::Error::Api(response) => {
                let message = if response.message.trim().is_empty() {
                    format!("api error {}", response.code)
                } else {
                    response.message.clone()
                };
                Self::from_status(response.code, message)
            }
            other => Self::Transient(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(error: serde_json::Error) -> Self {
        Self::Invalid(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::RepoError;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(
            RepoError::from_status(404, "gone".to_string()),
            RepoError::NotFound("gone".to_string())
        );
        assert_eq!(
            RepoError::from_status(403, "nope".to_string()),
            RepoError::PermissionDenied("nope".to_string())
        );
        assert_eq!(
            RepoError::from_status(409, "busy".to_string()),
            RepoError::Conflict("busy".to_string())
        );
        assert_eq!(
            RepoError::from_status(503, "metrics".to_string()),
            RepoError::Unavailable("metrics".to_string())
        );
        assert_eq!(
            RepoError::from_status(500, "boom".to_string()),
            RepoError::Transient("boom".to_string())
        );
    }

    #[test]
    fn soft_errors_are_not_found_or_unavailable() {
        assert!(RepoError::Unavailable("x".to_string()).is_soft());
        assert!(RepoError::NotFound("x".to_string()).is_soft());
        assert!(!RepoError::Conflict("x".to_string()).is_soft());
    }

    #[test]
    fn display_keeps_message() {
        let error = RepoError::Conflict("object was modified".to_string());
        assert_eq!(error.to_string(), "conflict: object was modified");
        assert_eq!(error.message(), "object was modified");
    }
}
