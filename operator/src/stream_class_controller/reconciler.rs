use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::StreamExt;
use kube::api::{Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::events::{Recorder, Reporter};
use kube::runtime::finalizer::{Event as FinalizerEvent, finalizer};
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::Error;
use crate::events::{emit_normal, emit_warning, reason};
use crate::metrics_reporter::MetricsReporter;
use crate::stream_class_controller::registry::ControllerRegistry;
use crate::stream_controller::{self, ControllerExit};
use arcane_types::{Phase, StreamClass};

const FINALIZER: &str = "streamclasses.streaming.sneaksanddata.com/cleanup";
const RETRY_DELAY: Duration = Duration::from_secs(10);
const RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

pub struct StreamClassContext {
    pub client: Client,
    pub registry: Arc<ControllerRegistry>,
    pub metrics: Arc<MetricsReporter>,
    pub reporter: Reporter,
}

/// Builds and runs the top-level StreamClass controller until `shutdown` fires.
pub async fn run(client: Client, ctx: Arc<StreamClassContext>, shutdown: CancellationToken) {
    let classes: Api<StreamClass> = Api::all(client);

    Controller::new(classes, watcher::Config::default())
        .graceful_shutdown_on(shutdown.cancelled_owned())
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            if let Err(err) = result {
                warn!(error = %err, "stream class reconcile failed");
            }
        })
        .await;
}

pub async fn reconcile(class: Arc<StreamClass>, ctx: Arc<StreamClassContext>) -> Result<Action, Error> {
    let classes: Api<StreamClass> = Api::all(ctx.client.clone());

    let outcome = finalizer(&classes, FINALIZER, class.clone(), |event| async {
        match event {
            FinalizerEvent::Apply(class) => reconcile_apply(&class, &ctx).await,
            FinalizerEvent::Cleanup(class) => reconcile_cleanup(&class, &ctx).await,
        }
    })
    .await;

    outcome.map_err(|err| Error::Finalizer(Box::new(err)))
}

async fn reconcile_apply(class: &StreamClass, ctx: &StreamClassContext) -> Result<Action, Error> {
    let name = class.name_any();
    let recorder = Recorder::new(ctx.client.clone(), ctx.reporter.clone());
    let object_ref = class.object_ref(&());
    let status = class.status.clone().unwrap_or_default();
    let now = Utc::now();

    match class.phase() {
        Phase::New => {
            write_phase(&ctx.client, &name, Phase::Pending, None).await?;
            emit_normal(&recorder, &object_ref, reason::STREAM_CLASS_CREATED, format!("StreamClass '{name}' observed"), "Reconciling").await;
            Ok(Action::requeue(Duration::ZERO))
        }
        Phase::Pending => {
            ensure_started(class, ctx).await?;
            write_phase(&ctx.client, &name, Phase::Ready, None).await?;
            emit_normal(&recorder, &object_ref, reason::STREAM_CLASS_READY, format!("StreamClass '{name}' is ready"), "Reconciling").await;
            Ok(Action::requeue(RECONCILE_INTERVAL))
        }
        Phase::Ready => {
            ensure_started(class, ctx).await?;
            Ok(Action::requeue(RECONCILE_INTERVAL))
        }
        Phase::Failed => match status.reconcile_after {
            None => Ok(Action::await_change()),
            Some(at) if at > now => Ok(Action::requeue((at - now).to_std().unwrap_or(RETRY_DELAY))),
            Some(_) => {
                ensure_started(class, ctx).await?;
                write_phase(&ctx.client, &name, Phase::Ready, None).await?;
                emit_normal(&recorder, &object_ref, reason::STREAM_CLASS_RECOVERED, format!("StreamClass '{name}' recovered"), "Reconciling").await;
                Ok(Action::requeue(RECONCILE_INTERVAL))
            }
        },
        Phase::Stopped => Ok(Action::await_change()),
    }
}

async fn reconcile_cleanup(class: &StreamClass, ctx: &StreamClassContext) -> Result<Action, Error> {
    let name = class.name_any();
    ctx.registry.unregister(&name).await;
    ctx.metrics.remove_stream_class(&name).await;
    info!(name, "stream class deleted, child controller stopped");
    Ok(Action::await_change())
}

/// Starts the child Stream controller if it isn't already running.
async fn ensure_started(class: &StreamClass, ctx: &StreamClassContext) -> Result<(), Error> {
    let name = class.name_any();
    if ctx.registry.is_started(&name).await {
        return Ok(());
    }

    let controller = stream_controller::build(ctx.client.clone(), class);
    let gvk = controller.gvk.clone();
    let cancel = CancellationToken::new();
    ctx.registry.register(&name, cancel.clone()).await;
    ctx.metrics.add_stream_class(&name, &gvk).await;

    let client = ctx.client.clone();
    let registry = ctx.registry.clone();
    let reporter = ctx.reporter.clone();
    let class_name = name.clone();
    let object_ref = class.object_ref(&());

    tokio::spawn(async move {
        let exit = controller.run(cancel).await;
        registry.unregister(&class_name).await;

        let recorder = Recorder::new(client.clone(), reporter);
        match exit {
            ControllerExit::Cancelled => {}
            ControllerExit::Forbidden => {
                let retry_at = Utc::now() + chrono::Duration::from_std(RETRY_DELAY).expect("constant fits");
                if let Err(err) = write_phase(&client, &class_name, Phase::Failed, Some(retry_at)).await {
                    warn!(name = class_name, error = %err, "failed to record stream class retry state");
                }
                emit_warning(
                    &recorder,
                    &object_ref,
                    reason::STREAM_CONTROLLER_ERROR,
                    format!("Stream controller for '{class_name}' stopped (forbidden); retrying at {retry_at}"),
                    "Reconciling",
                )
                .await;
            }
            ControllerExit::Other => {
                if let Err(err) = write_phase(&client, &class_name, Phase::Failed, None).await {
                    warn!(name = class_name, error = %err, "failed to record stream class failure");
                }
                emit_warning(
                    &recorder,
                    &object_ref,
                    reason::STREAM_CONTROLLER_ERROR,
                    format!("Stream controller for '{class_name}' stopped unexpectedly"),
                    "Reconciling",
                )
                .await;
            }
        }
    });

    Ok(())
}

async fn write_phase(client: &Client, name: &str, phase: Phase, reconcile_after: Option<chrono::DateTime<Utc>>) -> Result<(), Error> {
    let classes: Api<StreamClass> = Api::all(client.clone());
    let patch = Patch::Merge(serde_json::json!({
        "status": {
            "phase": phase.to_string(),
            "reconcileAfter": reconcile_after,
        }
    }));
    classes.patch_status(name, &PatchParams::default(), &patch).await?;
    Ok(())
}

pub fn error_policy(class: Arc<StreamClass>, error: &Error, _ctx: Arc<StreamClassContext>) -> Action {
    warn!(stream_class = %class.name_any(), error = %error, "stream class reconcile failed");
    Action::requeue(Duration::from_secs(5))
}
