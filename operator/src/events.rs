use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder};
use tracing::warn;

/// Reason vocabulary emitted on Streams and StreamClasses. Kept as named
/// constants so reconcilers don't scatter string literals.
pub mod reason {
    pub const STREAM_CLASS_CREATED: &str = "StreamClassCreated";
    pub const STREAM_CLASS_READY: &str = "StreamClassReady";
    pub const STREAM_CLASS_RECOVERED: &str = "StreamClassRecovered";
    pub const STREAM_CLASS_RECONCILED: &str = "StreamClassReconciled";
    pub const STREAM_CONTROLLER_ERROR: &str = "StreamControllerError";
    pub const STREAM_CREATED: &str = "StreamCreated";
    pub const BACKFILL_REQUESTED: &str = "BackfillRequested";
    pub const BACKFILL_STARTED: &str = "BackfillStarted";
    pub const BACKFILL_IN_PROGRESS: &str = "BackfillInProgress";
    pub const BACKFILL_COMPLETED: &str = "BackfillCompleted";
    pub const STREAM_SUSPENDED: &str = "StreamSuspended";
    pub const STREAM_RESUMED: &str = "StreamResumed";
    pub const STREAMING_CONTINUED: &str = "StreamingContinued";
    pub const STREAMING_JOB_FAILED: &str = "StreamingJobFailed";
    pub const FAILED_CREATE_JOB: &str = "FailedCreateJob";
}

/// Publishes a Normal event, swallowing the error. Events are a side channel:
/// reconciliation must succeed even when the event sink is unreachable.
pub async fn emit_normal(recorder: &Recorder, reference: &ObjectReference, reason: &str, note: String, action: &str) {
    emit(recorder, reference, EventType::Normal, reason, note, action).await;
}

/// Publishes a Warning event, swallowing the error.
pub async fn emit_warning(recorder: &Recorder, reference: &ObjectReference, reason: &str, note: String, action: &str) {
    emit(recorder, reference, EventType::Warning, reason, note, action).await;
}

async fn emit(recorder: &Recorder, reference: &ObjectReference, type_: EventType, reason: &str, note: String, action: &str) {
    let result = recorder
        .publish(
            &Event {
                type_,
                reason: reason.to_string(),
                note: Some(note),
                action: action.to_string(),
                secondary: None,
            },
            reference,
        )
        .await;

    if let Err(err) = result {
        warn!(error = %err, reason, "failed to publish event, continuing");
    }
}
