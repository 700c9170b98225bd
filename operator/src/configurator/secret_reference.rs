use super::JobConfigurator;
use crate::error::Error;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{EnvFromSource, SecretEnvSource};

/// Appends `envFrom.secretRef: <name>` to every container, used for the
/// secret fields a StreamClass declares on the Stream spec.
pub struct SecretReferenceConfigurator {
    pub secret_name: String,
}

impl JobConfigurator for SecretReferenceConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        if self.secret_name.is_empty() {
            return Err(Error::BuilderError("secret reference name must not be empty".into()));
        }

        let containers = &mut job
            .spec
            .get_or_insert_with(Default::default)
            .template
            .spec
            .get_or_insert_with(Default::default)
            .containers;

        for container in containers.iter_mut() {
            container.env_from.get_or_insert_with(Vec::new).push(EnvFromSource {
                secret_ref: Some(SecretEnvSource {
                    name: self.secret_name.clone(),
                    optional: Some(false),
                }),
                ..Default::default()
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobSpec;
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};

    fn job_with_containers(n: usize) -> Job {
        Job {
            spec: Some(JobSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: (0..n).map(|i| Container { name: format!("c{i}"), ..Default::default() }).collect(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn adds_secret_ref_to_every_container() {
        let mut job = job_with_containers(2);
        SecretReferenceConfigurator { secret_name: "kafka-creds".into() }.configure(&mut job).unwrap();
        let containers = &job.spec.unwrap().template.spec.unwrap().containers;
        for container in containers {
            let env_from = container.env_from.as_ref().unwrap();
            assert_eq!(env_from[0].secret_ref.as_ref().unwrap().name, "kafka-creds");
        }
    }

    #[test]
    fn rejects_empty_secret_name() {
        let mut job = job_with_containers(1);
        assert!(SecretReferenceConfigurator { secret_name: String::new() }.configure(&mut job).is_err());
    }
}
