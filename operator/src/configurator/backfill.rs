use super::{JobConfigurator, stream_context_key, upsert_env};
use crate::error::Error;
use crate::streaming_job::BACKFILLING_LABEL;
use k8s_openapi::api::batch::v1::Job;

/// Sets `arcane/backfilling=<b>` and `STREAMCONTEXT__BACKFILL=<b>`,
/// overwriting any value a seed template or earlier configurator set. This
/// is the one place last-write-wins is load-bearing: a streaming-job
/// template cloned for a backfill run must end up labeled as a backfill.
pub struct BackfillConfigurator {
    pub backfilling: bool,
}

impl JobConfigurator for BackfillConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        let value = self.backfilling.to_string();
        job.metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert(BACKFILLING_LABEL.to_string(), value.clone());
        upsert_env(job, &stream_context_key("backfill"), value, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobSpec;
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};

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
    fn labels_and_envs_true_when_backfilling() {
        let mut job = job_with_container();
        BackfillConfigurator { backfilling: true }.configure(&mut job).unwrap();
        assert_eq!(job.metadata.labels.as_ref().unwrap().get(BACKFILLING_LABEL).map(String::as_str), Some("true"));
        let env = job.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap();
        assert_eq!(env[0].value.as_deref(), Some("true"));
    }

    #[test]
    fn overwrites_a_template_declared_value() {
        let mut job = job_with_container();
        BackfillConfigurator { backfilling: true }.configure(&mut job).unwrap();
        BackfillConfigurator { backfilling: false }.configure(&mut job).unwrap();
        assert_eq!(job.metadata.labels.as_ref().unwrap().get(BACKFILLING_LABEL).map(String::as_str), Some("false"));
    }
}
