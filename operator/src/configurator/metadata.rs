use super::{JobConfigurator, stream_context_key, upsert_env};
use crate::error::Error;
use crate::streaming_job::{STREAM_ID_LABEL, STREAM_KIND_LABEL};
use k8s_openapi::api::batch::v1::Job;

/// Sets the `arcane/stream-id` / `arcane/stream-kind` labels and the
/// matching `STREAMCONTEXT__*` env vars. Rejects a template that already
/// declares either variable, since silently overriding an author's own
/// stream-identity var would hide a template bug.
pub struct MetadataConfigurator {
    pub stream_id: String,
    pub stream_kind: String,
}

impl JobConfigurator for MetadataConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error> {
        let labels = job.metadata.labels.get_or_insert_with(Default::default);
        labels.insert(STREAM_ID_LABEL.to_string(), self.stream_id.clone());
        labels.insert(STREAM_KIND_LABEL.to_string(), self.stream_kind.clone());

        upsert_env(job, &stream_context_key("stream_id"), self.stream_id.clone(), false)?;
        upsert_env(job, &stream_context_key("stream_kind"), self.stream_kind.clone(), false)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
    use k8s_openapi::api::batch::v1::JobSpec;

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
    fn sets_labels_and_env() {
        let mut job = job_with_container();
        MetadataConfigurator { stream_id: "orders".into(), stream_kind: "KafkaTopic".into() }
            .configure(&mut job)
            .unwrap();

        let labels = job.metadata.labels.unwrap();
        assert_eq!(labels.get(STREAM_ID_LABEL).map(String::as_str), Some("orders"));
        assert_eq!(labels.get(STREAM_KIND_LABEL).map(String::as_str), Some("KafkaTopic"));

        let env = &job.spec.unwrap().template.spec.unwrap().containers[0].env.clone().unwrap();
        assert!(env.iter().any(|e| e.name == "STREAMCONTEXT__STREAM_ID" && e.value.as_deref() == Some("orders")));
    }

    #[test]
    fn rejects_template_declaring_stream_id_already() {
        let mut job = job_with_container();
        job.spec.as_mut().unwrap().template.spec.as_mut().unwrap().containers[0].env = Some(vec![
            k8s_openapi::api::core::v1::EnvVar { name: "STREAMCONTEXT__STREAM_ID".into(), value: Some("stale".into()), ..Default::default() },
        ]);
        let result = MetadataConfigurator { stream_id: "orders".into(), stream_kind: "KafkaTopic".into() }.configure(&mut job);
        assert!(result.is_err());
    }
}
