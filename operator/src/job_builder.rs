use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Api, Client};
use serde_json::Value;

use crate::configurator::{
    BackfillConfigurator, ConfigurationChecksumConfigurator, EnvironmentConfigurator, JobConfigurator,
    MetadataConfigurator, NameConfigurator, NamespaceConfigurator, OwnerConfigurator, SecretReferenceConfigurator,
    apply_chain,
};
use crate::error::Error;
use crate::stream_definition::JobTemplateRef;
use arcane_types::StreamingJobTemplate;

/// Everything the builder needs to turn a template into a ready-to-create Job,
/// beyond the template reference itself.
pub struct JobBuildRequest {
    pub job_name: String,
    pub job_namespace: String,
    pub stream_id: String,
    pub stream_kind: String,
    pub owner_ref: OwnerReference,
    pub secret_refs: Vec<(String, String)>,
    pub desired_hash: String,
    pub backfilling: bool,
    /// The driving BackfillRequest, serialized, set only for a backfill job;
    /// injected as `STREAMCONTEXT__OVERRIDE` so the worker can read back what
    /// requested it.
    pub override_definition: Option<Value>,
}

/// Fetches `template_ref` and applies the standard configurator chain,
/// returning a Job ready to be created with `Api::create`.
pub async fn build_job(
    client: &Client,
    default_namespace: &str,
    template_ref: &JobTemplateRef,
    request: JobBuildRequest,
) -> Result<Job, Error> {
    let template_namespace = template_ref.namespace.as_deref().unwrap_or(default_namespace);
    let api: Api<StreamingJobTemplate> = Api::namespaced(client.clone(), template_namespace);
    let template = api.get(&template_ref.name).await.map_err(|err| {
        if matches!(&err, kube::Error::Api(e) if e.code == 404) {
            Error::MissingTemplate(format!("{template_namespace}/{}", template_ref.name))
        } else {
            Error::Kube(err)
        }
    })?;

    let mut job = template.spec.job;

    let mut chain: Vec<Box<dyn JobConfigurator>> = vec![
        Box::new(NameConfigurator { name: request.job_name }),
        Box::new(NamespaceConfigurator {
            namespace: request.job_namespace,
        }),
        Box::new(OwnerConfigurator {
            owner_ref: request.owner_ref,
        }),
        Box::new(MetadataConfigurator {
            stream_id: request.stream_id,
            stream_kind: request.stream_kind,
        }),
    ];

    for (_, secret_name) in request.secret_refs {
        chain.push(Box::new(SecretReferenceConfigurator { secret_name }));
    }

    chain.push(Box::new(BackfillConfigurator {
        backfilling: request.backfilling,
    }));

    if let Some(value) = request.override_definition {
        chain.push(Box::new(EnvironmentConfigurator {
            key: "override".to_string(),
            value,
        }));
    }

    chain.push(Box::new(ConfigurationChecksumConfigurator {
        hash: request.desired_hash,
    }));

    apply_chain(&mut job, &chain)?;
    Ok(job)
}
