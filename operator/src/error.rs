use thiserror::Error;

/// Errors surfaced by any reconciler or ambient service in this crate.
///
/// The Kubernetes-classification helpers below let callers branch on the
/// *kind* of failure (transient vs. terminal vs. RBAC) without re-deriving
/// status-code logic at every call site.
#[derive(Error, Debug)]
pub enum Error {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid stream definition: {0}")]
    InvalidDefinition(String),

    #[error("job configurator rejected input: {0}")]
    BuilderError(String),

    #[error("referenced job template not found: {0}")]
    MissingTemplate(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("finalizer error: {0}")]
    Finalizer(#[from] Box<kube::runtime::finalizer::Error<Error>>),
}

impl Error {
    /// The object the reconciler was looking for no longer exists. Treat as
    /// "deleted"; succeed with no write.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// Stale resource version on a status/update patch. Transient, safe to retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 409)
    }

    /// RBAC denied the call, or the CRD for a declared StreamClass's target
    /// Kind isn't installed yet (listing an unknown Kind also surfaces as 404).
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 403)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> Error {
        Error::Kube(kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "boom".into(),
            reason: reason.into(),
            code,
        }))
    }

    #[test]
    fn classifies_not_found() {
        assert!(api_error(404, "NotFound").is_not_found());
        assert!(!api_error(409, "Conflict").is_not_found());
    }

    #[test]
    fn classifies_conflict() {
        assert!(api_error(409, "Conflict").is_conflict());
        assert!(!api_error(404, "NotFound").is_conflict());
    }

    #[test]
    fn classifies_forbidden() {
        assert!(api_error(403, "Forbidden").is_forbidden());
    }
}
