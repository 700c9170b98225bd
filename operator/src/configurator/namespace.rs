use super::JobConfigurator;
use crate::error::Error;
use k8s_openapi::api::batch::v1::Job;

pub struct NamespaceConfigurator {
    pub namespace: String,
}

impl JobConfigurator for NamespaceConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        if self.namespace.is_empty() {
            return Err(Error::BuilderError("job namespace must not be empty".into()));
        }
        job.metadata.namespace = Some(self.namespace.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_job_namespace() {
        let mut job = Job::default();
        NamespaceConfigurator { namespace: "payments".into() }.configure(&mut job).unwrap();
        assert_eq!(job.metadata.namespace.as_deref(), Some("payments"));
    }

    #[test]
    fn rejects_empty_namespace() {
        let mut job = Job::default();
        assert!(NamespaceConfigurator { namespace: String::new() }.configure(&mut job).is_err());
    }
}
