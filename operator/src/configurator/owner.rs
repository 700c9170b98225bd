use super::JobConfigurator;
use crate::error::Error;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

/// Appends a controller owner reference pointing back at the Stream, so the
/// Job is garbage-collected by the API server when the Stream is deleted.
pub struct OwnerConfigurator {
    pub owner_ref: OwnerReference,
}

impl JobConfigurator for OwnerConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        job.metadata
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(self.owner_ref.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner_ref(name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "example.com/v1".into(),
            kind: "Widget".into(),
            name: name.into(),
            uid: "uid-1".into(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    #[test]
    fn appends_owner_reference() {
        let mut job = Job::default();
        OwnerConfigurator { owner_ref: owner_ref("widget-a") }.configure(&mut job).unwrap();
        let refs = job.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "widget-a");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn preserves_existing_owner_references() {
        let mut job = Job::default();
        job.metadata.owner_references = Some(vec![owner_ref("widget-a")]);
        OwnerConfigurator { owner_ref: owner_ref("widget-b") }.configure(&mut job).unwrap();
        assert_eq!(job.metadata.owner_references.unwrap().len(), 2);
    }
}
