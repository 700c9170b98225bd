use super::{JobConfigurator, stream_context_key, upsert_env};
use crate::error::Error;
use k8s_openapi::api::batch::v1::Job;
use serde_json::Value;

/// Serializes `value` as JSON and sets `STREAMCONTEXT__<KEY>` on every
/// container. Used for the per-StreamClass secret-reference field values and
/// any other ad-hoc stream-context entries a job builder invocation wants to
/// inject.
pub struct EnvironmentConfigurator {
    pub key: String,
    pub value: Value,
}

impl JobConfigurator for EnvironmentConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        let serialized = match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        upsert_env(job, &stream_context_key(&self.key), serialized, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobSpec;
    use k8s_openapi::api::core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec};

    fn job_with_container() -> Job {
        Job {
            spec: Some(JobSpec {
                template: PodTemplateSpec {
                    spec: Some(PodSpec {
                        containers: vec![Container { name: "main".into(), ..Default::default() }],
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
    fn writes_string_value_unquoted() {
        let mut job = job_with_container();
        EnvironmentConfigurator { key: "topic".into(), value: Value::String("orders".into()) }.configure(&mut job).unwrap();
        let env = job.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap();
        assert_eq!(env[0].name, "STREAMCONTEXT__TOPIC");
        assert_eq!(env[0].value.as_deref(), Some("orders"));
    }

    #[test]
    fn writes_non_string_value_as_json() {
        let mut job = job_with_container();
        EnvironmentConfigurator { key: "partitions".into(), value: Value::from(12) }.configure(&mut job).unwrap();
        let env = job.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap();
        assert_eq!(env[0].value.as_deref(), Some("12"));
    }

    #[test]
    fn overwrites_existing_value() {
        let mut job = job_with_container();
        job.spec.as_mut().unwrap().template.spec.as_mut().unwrap().containers[0].env =
            Some(vec![EnvVar { name: "STREAMCONTEXT__TOPIC".into(), value: Some("old".into()), ..Default::default() }]);
        EnvironmentConfigurator { key: "topic".into(), value: Value::String("new".into()) }.configure(&mut job).unwrap();
        let env = job.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].value.as_deref(), Some("new"));
    }
}
