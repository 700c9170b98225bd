use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::runtime::controller::Error as ControllerError;
use kube::runtime::events::Reporter;
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher::{self, Error as WatcherError};
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::stream_controller::reconciler::{ReconcilerContext, error_policy, reconcile};
use arcane_types::{BackfillRequest, StreamClass};

/// How a Stream controller's run loop ended, used by the StreamClass
/// controller to decide whether to schedule a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerExit {
    Cancelled,
    /// The watch returned a forbidden-class error (RBAC, or the CRD for the
    /// watched Kind isn't installed yet).
    Forbidden,
    Other,
}

/// A Stream controller built for one StreamClass, not yet started. Starting
/// it runs the reconcile loop until cancelled or until the watch fails.
pub struct UnmanagedController {
    pub gvk: GroupVersionKind,
    future: Pin<Box<dyn Future<Output = ControllerExit> + Send>>,
}

impl UnmanagedController {
    pub async fn run(self, shutdown: CancellationToken) -> ControllerExit {
        tokio::select! {
            _ = shutdown.cancelled() => ControllerExit::Cancelled,
            exit = self.future => exit,
        }
    }
}

fn classify(error: &ControllerError<Error, WatcherError>) -> ControllerExit {
    match error {
        ControllerError::ReconcilerFailed(err, _) if err.is_forbidden() => ControllerExit::Forbidden,
        _ => ControllerExit::Other,
    }
}

/// Builds (but does not start) the Stream controller for `class`. The
/// returned controller watches the dynamic Kind declared by the StreamClass
/// and the Jobs it owns.
pub fn build(client: Client, class: &StreamClass) -> UnmanagedController {
    let gvk = class.target_gvk();
    let api_resource = ApiResource::from_gvk_with_plural(&gvk, &class.spec.plural_name);

    let streams: Api<DynamicObject> = Api::all_with(client.clone(), &api_resource);

    let ctx = Arc::new(ReconcilerContext {
        client: client.clone(),
        api_resource: api_resource.clone(),
        stream_class_name: class.name_any(),
        secret_ref_fields: class.spec.secret_refs.clone(),
        target_namespace: class.spec.target_namespace.clone(),
        reporter: Reporter::from(format!("arcane-operator/{}", class.name_any())),
    });

    let jobs: Api<Job> = Api::all(client.clone());
    let backfill_requests: Api<BackfillRequest> = Api::all(client);

    let stream_class_name = class.name_any();
    let watch_dyntype = api_resource.clone();

    let future = Box::pin(async move {
        let results = Controller::new_with(streams, watcher::Config::default(), api_resource)
            .owns(jobs, watcher::Config::default())
            .watches(backfill_requests, watcher::Config::default(), move |bfr: BackfillRequest| {
                if !bfr.is_outstanding() || bfr.spec.stream_class != stream_class_name {
                    return None;
                }
                let mut obj_ref = ObjectRef::new_with(&bfr.spec.stream_id, watch_dyntype.clone());
                if let Some(namespace) = bfr.namespace() {
                    obj_ref = obj_ref.within(&namespace);
                }
                Some(obj_ref)
            })
            .run(reconcile, error_policy, ctx);
        futures::pin_mut!(results);

        let mut exit = ControllerExit::Other;
        while let Some(result) = results.next().await {
            if let Err(err) = &result {
                exit = classify(err);
                if exit == ControllerExit::Forbidden {
                    break;
                }
            }
        }
        exit
    });

    UnmanagedController { gvk, future }
}
