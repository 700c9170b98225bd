use super::JobConfigurator;
use crate::error::Error;
use k8s_openapi::api::batch::v1::Job;

pub struct NameConfigurator {
    pub name: String,
}

impl JobConfigurator for NameConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        if self.name.is_empty() {
            return Err(Error::BuilderError("job name must not be empty".into()));
        }
        job.metadata.name = Some(self.name.clone());
        Ok(())
    }
}
