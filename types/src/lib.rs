use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle phase shared by [`StreamClass`] and [`BackfillRequest`]. The
/// Stream Kind itself carries a richer phase, defined in `arcane-operator`'s
/// `stream_definition` module, since it drives a longer-lived FSM.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq, JsonSchema)]
pub enum Phase {
    #[default]
    #[serde(rename = "")]
    New,
    Pending,
    Ready,
    Failed,
    Stopped,
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(Phase::New),
            "Pending" => Ok(Phase::Pending),
            "Ready" => Ok(Phase::Ready),
            "Failed" => Ok(Phase::Failed),
            "Stopped" => Ok(Phase::Stopped),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::New => write!(f, ""),
            Phase::Pending => write!(f, "Pending"),
            Phase::Ready => write!(f, "Ready"),
            Phase::Failed => write!(f, "Failed"),
            Phase::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Declares a Kind the operator should watch and reconcile as a Stream.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "streaming.sneaksanddata.com",
    version = "v1",
    kind = "StreamClass",
    plural = "streamclasses",
    shortname = "sc",
    derive = "PartialEq",
    status = "StreamClassStatus"
)]
#[kube(derive = "Default")]
#[kube(printcolumn = r#"{"jsonPath": ".spec.apiGroupRef", "name": "ApiGroupRef", "type": "string"}"#)]
#[kube(printcolumn = r#"{"jsonPath": ".spec.apiVersion", "name": "ApiVersion", "type": "string"}"#)]
#[kube(printcolumn = r#"{"jsonPath": ".spec.kindRef", "name": "KindRef", "type": "string"}"#)]
#[kube(printcolumn = r#"{"jsonPath": ".spec.pluralName", "name": "PluralName", "type": "string"}"#)]
#[kube(printcolumn = r#"{"jsonPath": ".status.phase", "name": "Phase", "type": "string"}"#)]
pub struct StreamClassSpec {
    /// API group of the Kind to watch for, e.g. `mock.sneaksanddata.com`.
    #[serde(rename = "apiGroupRef")]
    pub api_group_ref: String,

    /// API version of the Kind to watch for, e.g. `v1`.
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// The Kind to watch for, e.g. `MockStreamDefinition`.
    #[serde(rename = "kindRef")]
    pub kind_ref: String,

    /// Plural resource name for the Kind, used to build the dynamic `ApiResource`.
    #[serde(rename = "pluralName")]
    pub plural_name: String,

    /// Namespace Jobs created for this StreamClass's Streams will live in.
    /// When unset, Jobs are created in the same namespace as their Stream.
    #[serde(default, rename = "targetNamespace", skip_serializing_if = "Option::is_none")]
    pub target_namespace: Option<String>,

    /// Field names on the Stream spec that hold references to Secrets; each
    /// becomes an `envFrom.secretRef` entry on the streaming Job.
    #[serde(default, rename = "secretRefs")]
    pub secret_refs: Vec<String>,
}

/// Status object for the [`StreamClass`] resource.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct StreamClassStatus {
    #[serde(default)]
    pub phase: Phase,

    /// Set when the StreamClass entered `Failed` due to a forbidden-Kind
    /// error; the meta-controller retries starting the child controller only
    /// after this instant has passed.
    #[serde(default, rename = "reconcileAfter", skip_serializing_if = "Option::is_none")]
    pub reconcile_after: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl StreamClass {
    /// GVK of the Kind this StreamClass watches, used to build the dynamic
    /// `ApiResource` the Stream controller is constructed against.
    pub fn target_gvk(&self) -> kube::core::GroupVersionKind {
        kube::core::GroupVersionKind::gvk(
            &self.spec.api_group_ref,
            &self.spec.api_version,
            &self.spec.kind_ref,
        )
    }

    pub fn phase(&self) -> Phase {
        self.status.as_ref().map(|s| s.phase).unwrap_or_default()
    }
}

/// A reusable batch Job shape an administrator authors once per distinct job
/// intent (streaming vs. backfill); Streams reference one by name.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "streaming.sneaksanddata.com",
    version = "v1",
    kind = "StreamingJobTemplate",
    plural = "streamingjobtemplates",
    shortname = "sjt",
    derive = "PartialEq",
    status = "StreamingJobTemplateStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(printcolumn = r#"{"jsonPath": ".spec.job.spec.template.spec.containers[0].image", "name": "Image", "type": "string"}"#)]
pub struct StreamingJobTemplateSpec {
    /// The Job this template clones as a starting point; the job builder
    /// overwrites its name, namespace and owner references, then injects
    /// stream-context environment before creating it.
    pub job: Job,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct StreamingJobTemplateStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A request to run a bounded backfill Job for a Stream before it resumes
/// normal streaming.
#[derive(CustomResource, Serialize, Deserialize, Default, Debug, PartialEq, Clone, JsonSchema)]
#[kube(
    group = "streaming.sneaksanddata.com",
    version = "v1",
    kind = "BackfillRequest",
    plural = "backfillrequests",
    shortname = "bfr",
    derive = "PartialEq",
    status = "BackfillRequestStatus",
    namespaced
)]
#[kube(derive = "Default")]
#[kube(printcolumn = r#"{"jsonPath": ".spec.streamClass", "name": "StreamClass", "type": "string"}"#)]
#[kube(printcolumn = r#"{"jsonPath": ".spec.streamId", "name": "StreamId", "type": "string"}"#)]
#[kube(printcolumn = r#"{"jsonPath": ".spec.completed", "name": "Completed", "type": "boolean"}"#)]
pub struct BackfillRequestSpec {
    /// Name of the StreamClass this backfill is scoped to.
    #[serde(rename = "streamClass")]
    pub stream_class: String,

    /// Name of the Stream (in this BackfillRequest's namespace) to backfill.
    #[serde(rename = "streamId")]
    pub stream_id: String,

    /// Terminal once set; the operator never clears it back to `false`.
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct BackfillRequestStatus {
    #[serde(default)]
    pub phase: Phase,

    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl BackfillRequest {
    pub fn is_outstanding(&self) -> bool {
        !self.spec.completed
    }

    /// Whether this request belongs to the given StreamClass and targets the
    /// given Stream name; used to find the single outstanding backfill for a
    /// Stream during reconciliation.
    pub fn matches(&self, stream_class: &str, stream_name: &str) -> bool {
        self.spec.stream_class == stream_class && self.spec.stream_id == stream_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_round_trips_through_empty_string() {
        let json = serde_json::to_string(&Phase::New).unwrap();
        assert_eq!(json, "\"\"");
        let back: Phase = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Phase::New);
        assert_eq!(Phase::from_str("").unwrap(), Phase::New);
        assert_eq!(Phase::from_str("Ready").unwrap(), Phase::Ready);
        assert!(Phase::from_str("bogus").is_err());
    }

    #[test]
    fn backfill_request_matches_only_same_class_and_stream() {
        let mut bfr = BackfillRequest::new(
            "s1-initial-backfill-abcde",
            BackfillRequestSpec {
                stream_class: "mock-streams".into(),
                stream_id: "s1".into(),
                completed: false,
            },
        );
        assert!(bfr.matches("mock-streams", "s1"));
        assert!(!bfr.matches("mock-streams", "s2"));
        assert!(!bfr.matches("other-class", "s1"));
        assert!(bfr.is_outstanding());
        bfr.spec.completed = true;
        assert!(!bfr.is_outstanding());
    }

    #[test]
    fn target_gvk_reads_streamclass_spec() {
        let sc = StreamClass::new(
            "mock-streams",
            StreamClassSpec {
                api_group_ref: "mock.sneaksanddata.com".into(),
                api_version: "v1".into(),
                kind_ref: "MockStreamDefinition".into(),
                plural_name: "mockstreamdefinitions".into(),
                target_namespace: None,
                secret_refs: vec![],
            },
        );
        let gvk = sc.target_gvk();
        assert_eq!(gvk.group, "mock.sneaksanddata.com");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "MockStreamDefinition");
    }
}
