use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::core::{ApiResource, DynamicObject};
use kube::runtime::controller::Action;
use kube::runtime::events::{Recorder, Reporter};
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Error;
use crate::events::{emit_normal, emit_warning, reason};
use crate::hashing::hash_spec;
use crate::job_builder::{JobBuildRequest, build_job};
use crate::stream_controller::fsm::{Action as FsmAction, FsmInput, decide};
use crate::stream_definition::{JobTemplateRef, StreamDefinitionView, StreamPhase, condition_for_phase, status_patch};
use crate::streaming_job::StreamingJobView;
use arcane_types::{BackfillRequest, BackfillRequestSpec};

pub const PROBE_INTERVAL: Duration = Duration::from_secs(30);

/// Context shared across every reconcile call of one Stream controller
/// instance; one of these is constructed per StreamClass by the unmanaged
/// controller factory.
pub struct ReconcilerContext {
    pub client: Client,
    pub api_resource: ApiResource,
    pub stream_class_name: String,
    pub secret_ref_fields: Vec<String>,
    pub target_namespace: Option<String>,
    pub reporter: Reporter,
}

async fn get_opt<K>(api: &Api<K>, name: &str) -> Result<Option<K>, Error>
where
    K: Clone + serde::de::DeserializeOwned + std::fmt::Debug,
{
    match api.get(name).await {
        Ok(obj) => Ok(Some(obj)),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub async fn reconcile(stream: Arc<DynamicObject>, ctx: Arc<ReconcilerContext>) -> Result<Action, Error> {
    let view = StreamDefinitionView::new(&stream);
    let name = view.name();
    let namespace = view
        .namespace()
        .ok_or_else(|| Error::InvalidDefinition("Stream resources must be namespaced".into()))?;

    let job_namespace = ctx.target_namespace.clone().unwrap_or_else(|| namespace.clone());
    let jobs: Api<Job> = Api::namespaced(ctx.client.clone(), &job_namespace);
    let job = get_opt(&jobs, &name).await?;

    let bfrs: Api<BackfillRequest> = Api::namespaced(ctx.client.clone(), &namespace);
    let bfr = bfrs
        .list(&ListParams::default())
        .await?
        .items
        .into_iter()
        .find(|b| b.is_outstanding() && b.matches(&ctx.stream_class_name, &name));

    let phase = view.phase();
    let suspended = view.suspended();

    let fsm_input = FsmInput {
        phase,
        suspended,
        job_exists: job.is_some(),
        job_failed: job.as_ref().is_some_and(|j| StreamingJobView::new(j).is_failed()),
        job_completed: job.as_ref().is_some_and(|j| StreamingJobView::new(j).is_completed()),
        bfr_exists: bfr.is_some(),
    };
    let decision = decide(fsm_input);

    let bfr_spec_value = bfr.as_ref().map(|b| serde_json::to_value(&b.spec).unwrap_or(Value::Null));
    let desired_hash = hash_spec(&view.spec_value(), bfr_spec_value.as_ref());

    let recorder = Recorder::new(ctx.client.clone(), ctx.reporter.clone());
    let object_ref = stream.object_ref(&ctx.api_resource);

    match decision.action {
        FsmAction::None => {}
        FsmAction::DeleteJob => {
            delete_job(&jobs, &name).await?;
        }
        FsmAction::DeleteJobAndCompleteBackfill => {
            delete_job(&jobs, &name).await?;
            if let Some(b) = &bfr {
                complete_backfill(&bfrs, b).await?;
                emit_normal(&recorder, &object_ref, reason::BACKFILL_COMPLETED, format!("Backfill '{}' completed", b.name_any()), "Reconciling").await;
            }
        }
        FsmAction::CreateInitialBackfillRequest => {
            create_initial_backfill_request(&bfrs, &ctx.stream_class_name, &name).await?;
            emit_normal(&recorder, &object_ref, reason::BACKFILL_REQUESTED, format!("Requested initial backfill for '{name}'"), "Reconciling").await;
        }
        FsmAction::ReconcileStreamingJob => {
            let result = reconcile_job(&ctx, &stream, &view, &jobs, &name, &job_namespace, &desired_hash, false, None).await;
            if let Err(err) = &result {
                emit_warning(&recorder, &object_ref, reason::FAILED_CREATE_JOB, format!("Failed to build streaming job for '{name}': {err}"), "Reconciling").await;
            }
            result?;
        }
        FsmAction::ReconcileBackfillJob => {
            let outcome = reconcile_job(&ctx, &stream, &view, &jobs, &name, &job_namespace, &desired_hash, true, bfr.as_ref()).await;
            if let Err(err) = &outcome {
                emit_warning(&recorder, &object_ref, reason::FAILED_CREATE_JOB, format!("Failed to build backfill job for '{name}': {err}"), "Reconciling").await;
            }
            if outcome? == JobOutcome::Created {
                emit_normal(&recorder, &object_ref, reason::BACKFILL_STARTED, format!("Started backfill job for '{name}'"), "Reconciling").await;
            }
        }
    }

    if decision.next_phase != phase {
        write_status(&ctx, &namespace, &name, decision.next_phase, &desired_hash).await?;
        emit_normal(&recorder, &object_ref, reason_for_transition(phase, decision.next_phase), format!("Stream '{name}' transitioned {phase} -> {}", decision.next_phase), "Reconciling").await;
    }

    Ok(Action::requeue(PROBE_INTERVAL))
}

pub fn error_policy(stream: Arc<DynamicObject>, error: &Error, _ctx: Arc<ReconcilerContext>) -> Action {
    warn!(stream = %stream.name_any(), error = %error, "stream reconcile failed");
    Action::requeue(Duration::from_secs(5))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Created,
    Unchanged,
}

async fn reconcile_job(
    ctx: &ReconcilerContext,
    stream: &DynamicObject,
    view: &StreamDefinitionView<'_>,
    jobs: &Api<Job>,
    name: &str,
    job_namespace: &str,
    desired_hash: &str,
    backfilling: bool,
    bfr: Option<&BackfillRequest>,
) -> Result<JobOutcome, Error> {
    let existing = get_opt(jobs, name).await?;

    if let Some(job) = &existing {
        let job_view = StreamingJobView::new(job);
        let current_hash = job_view.configuration_hash();
        if current_hash == Some(desired_hash) && job_view.is_backfilling() == backfilling {
            return Ok(JobOutcome::Unchanged);
        }
        delete_job(jobs, name).await?;
    }

    let template_ref: JobTemplateRef = if backfilling {
        view.backfill_job_template_ref()?
    } else {
        view.job_template_ref()?
    };

    let owner_ref: OwnerReference = stream
        .controller_owner_ref(&ctx.api_resource)
        .ok_or_else(|| Error::InvalidDefinition("Stream is missing a name/uid to build an owner reference".into()))?;

    let secret_refs = view.secret_fields(&ctx.secret_ref_fields);

    let override_definition = bfr.map(|b| serde_json::to_value(b).unwrap_or(Value::Null));

    let request = JobBuildRequest {
        job_name: name.to_string(),
        job_namespace: job_namespace.to_string(),
        stream_id: name.to_string(),
        stream_kind: ctx.api_resource.kind.clone(),
        owner_ref,
        secret_refs,
        desired_hash: desired_hash.to_string(),
        backfilling,
        override_definition,
    };

    let job = build_job(&ctx.client, job_namespace, &template_ref, request).await.inspect_err(|err| {
        warn!(name, error = %err, "job builder rejected stream definition");
    })?;

    jobs.create(&PostParams::default(), &job).await?;
    Ok(JobOutcome::Created)
}

async fn delete_job(jobs: &Api<Job>, name: &str) -> Result<(), Error> {
    match jobs.delete(name, &DeleteParams::background()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn complete_backfill(bfrs: &Api<BackfillRequest>, bfr: &BackfillRequest) -> Result<(), Error> {
    let patch = Patch::Merge(serde_json::json!({ "spec": { "completed": true } }));
    bfrs.patch(&bfr.name_any(), &PatchParams::default(), &patch).await?;
    Ok(())
}

async fn create_initial_backfill_request(bfrs: &Api<BackfillRequest>, stream_class: &str, stream_name: &str) -> Result<(), Error> {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let name = format!("{stream_name}-initial-backfill-{}", &suffix[..5]);
    let spec = BackfillRequestSpec {
        stream_class: stream_class.to_string(),
        stream_id: stream_name.to_string(),
        completed: false,
    };
    let request = BackfillRequest::new(&name, spec);
    bfrs.create(&PostParams::default(), &request).await?;
    Ok(())
}

async fn write_status(ctx: &ReconcilerContext, namespace: &str, name: &str, next_phase: StreamPhase, desired_hash: &str) -> Result<(), Error> {
    let api: Api<DynamicObject> = Api::namespaced_with(ctx.client.clone(), namespace, &ctx.api_resource);
    let conditions = condition_for_phase(next_phase, None).into_iter().collect();
    let patch = Patch::Merge(status_patch(next_phase, desired_hash, conditions));
    api.patch_status(name, &PatchParams::default(), &patch).await?;
    info!(name, namespace, phase = %next_phase, "wrote stream status");
    Ok(())
}

fn reason_for_transition(prev_phase: StreamPhase, next_phase: StreamPhase) -> &'static str {
    match (prev_phase, next_phase) {
        (StreamPhase::Suspended, StreamPhase::Pending) => reason::STREAM_RESUMED,
        (_, StreamPhase::Pending) => reason::STREAM_CREATED,
        (_, StreamPhase::New) => reason::STREAM_CREATED,
        (_, StreamPhase::Running) => reason::STREAMING_CONTINUED,
        (_, StreamPhase::Backfilling) => reason::BACKFILL_IN_PROGRESS,
        (_, StreamPhase::Suspended) => reason::STREAM_SUSPENDED,
        (_, StreamPhase::Failed) => reason::STREAMING_JOB_FAILED,
    }
}
