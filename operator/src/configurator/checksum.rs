use super::JobConfigurator;
use crate::error::Error;
use crate::streaming_job::CONFIGURATION_HASH_ANNOTATION;
use k8s_openapi::api::batch::v1::Job;

pub struct ConfigurationChecksumConfigurator {
    pub hash: String,
}

impl JobConfigurator for ConfigurationChecksumConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        if self.hash.is_empty() {
            return Err(Error::BuilderError("configuration hash must not be empty".into()));
        }
        job.metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert(CONFIGURATION_HASH_ANNOTATION.to_string(), self.hash.clone());
        Ok(())
    }
}
