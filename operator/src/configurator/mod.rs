mod backfill;
mod checksum;
mod environment;
mod metadata;
mod name;
mod namespace;
mod owner;
mod secret_reference;

pub use backfill::BackfillConfigurator;
pub use checksum::ConfigurationChecksumConfigurator;
pub use environment::EnvironmentConfigurator;
pub use metadata::MetadataConfigurator;
pub use name::NameConfigurator;
pub use namespace::NamespaceConfigurator;
pub use owner::OwnerConfigurator;
pub use secret_reference::SecretReferenceConfigurator;

use crate::error::Error;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Container, EnvVar};

/// An ordered, composable mutator applied to a Job spec by the job builder.
/// Elements are applied in sequence over a single shared `Job`; the first
/// error aborts the chain and propagates.
pub trait JobConfigurator {
    fn configure(&self, job: &mut Job) -> Result<(), Error>;
}

/// Applies `chain` to `job` in order, stopping at the first error.
pub fn apply_chain(job: &mut Job, chain: &[Box<dyn JobConfigurator>]) -> Result<(), Error> {
    for configurator in chain {
        configurator.configure(job)?;
    }
    Ok(())
}

fn containers_mut(job: &mut Job) -> &mut Vec<Container> {
    &mut job
        .spec
        .get_or_insert_with(Default::default)
        .template
        .spec
        .get_or_insert_with(Default::default)
        .containers
}

/// Sets `name=value` on every container's env list. When `overwrite` is
/// false, a pre-existing var with the same name is rejected as an error
/// (used by `MetadataConfigurator`, which must not silently clobber a
/// template author's own variable); when true, the existing entry is
/// replaced in place (used by `BackfillConfigurator`/`EnvironmentConfigurator`,
/// where last-write-wins is intentional).
fn upsert_env(job: &mut Job, name: &str, value: String, overwrite: bool) -> Result<(), Error> {
    for container in containers_mut(job) {
        let env = container.env.get_or_insert_with(Vec::new);
        match env.iter_mut().find(|e| e.name == name) {
            Some(existing) if overwrite => {
                existing.value = Some(value.clone());
                existing.value_from = None;
            }
            Some(_) => {
                return Err(Error::BuilderError(format!(
                    "container '{}' already declares env '{name}'",
                    container.name
                )));
            }
            None => env.push(EnvVar {
                name: name.to_string(),
                value: Some(value.clone()),
                ..Default::default()
            }),
        }
    }
    Ok(())
}

const STREAM_CONTEXT_PREFIX: &str = "STREAMCONTEXT__";

fn stream_context_key(suffix: &str) -> String {
    format!("{STREAM_CONTEXT_PREFIX}{}", suffix.to_ascii_uppercase())
}
