use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::ResourceExt;
use kube::core::DynamicObject;
use serde_json::Value;
use std::{fmt, str::FromStr};

use crate::error::Error;

/// Lifecycle phase of a Stream. The empty string denotes a Stream that has
/// never been reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamPhase {
    #[default]
    New,
    Pending,
    Running,
    Backfilling,
    Suspended,
    Failed,
}

impl FromStr for StreamPhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(StreamPhase::New),
            "Pending" => Ok(StreamPhase::Pending),
            "Running" => Ok(StreamPhase::Running),
            "Backfilling" => Ok(StreamPhase::Backfilling),
            "Suspended" => Ok(StreamPhase::Suspended),
            "Failed" => Ok(StreamPhase::Failed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamPhase::New => write!(f, ""),
            StreamPhase::Pending => write!(f, "Pending"),
            StreamPhase::Running => write!(f, "Running"),
            StreamPhase::Backfilling => write!(f, "Backfilling"),
            StreamPhase::Suspended => write!(f, "Suspended"),
            StreamPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// A reference to a `StreamingJobTemplate`, read from either
/// `spec.jobTemplateRef` or `spec.backfillJobTemplateRef`.
#[derive(Debug, Clone)]
pub struct JobTemplateRef {
    pub name: String,
    pub namespace: Option<String>,
}

/// Read-mostly view over a Stream, which is a dynamically-typed resource:
/// the operator never generates per-Kind Rust structs for it, since the Kind
/// is declared at runtime by a StreamClass.
pub struct StreamDefinitionView<'a> {
    object: &'a DynamicObject,
}

impl<'a> StreamDefinitionView<'a> {
    pub fn new(object: &'a DynamicObject) -> Self {
        Self { object }
    }

    pub fn name(&self) -> String {
        self.object.name_any()
    }

    pub fn namespace(&self) -> Option<String> {
        self.object.namespace()
    }

    fn spec(&self) -> Option<&Value> {
        self.object.data.get("spec")
    }

    fn status(&self) -> Option<&Value> {
        self.object.data.get("status")
    }

    pub fn suspended(&self) -> bool {
        self.spec()
            .and_then(|s| s.get("suspended"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn phase(&self) -> StreamPhase {
        self.status()
            .and_then(|s| s.get("phase"))
            .and_then(Value::as_str)
            .and_then(|p| StreamPhase::from_str(p).ok())
            .unwrap_or_default()
    }

    pub fn configuration_hash(&self) -> Option<String> {
        self.status()
            .and_then(|s| s.get("configurationHash"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    fn template_ref(&self, field: &str) -> Result<JobTemplateRef, Error> {
        let value = self
            .spec()
            .and_then(|s| s.get(field))
            .ok_or_else(|| Error::InvalidDefinition(format!("spec.{field} is required")))?;

        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidDefinition(format!("spec.{field}.name is required")))?
            .to_string();

        let namespace = value.get("namespace").and_then(Value::as_str).map(str::to_owned);

        Ok(JobTemplateRef { name, namespace })
    }

    pub fn job_template_ref(&self) -> Result<JobTemplateRef, Error> {
        self.template_ref("jobTemplateRef")
    }

    pub fn backfill_job_template_ref(&self) -> Result<JobTemplateRef, Error> {
        self.template_ref("backfillJobTemplateRef")
    }

    /// Reads a user-declared secret-reference field by name, as listed in the
    /// owning StreamClass's `secretRefs`.
    pub fn secret_field(&self, field: &str) -> Option<String> {
        self.spec()
            .and_then(|s| s.get(field))
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    pub fn secret_fields(&self, fields: &[String]) -> Vec<(String, String)> {
        fields
            .iter()
            .filter_map(|f| self.secret_field(f).map(|v| (f.clone(), v)))
            .collect()
    }

    /// The raw spec, used as the input to configuration-hash computation.
    pub fn spec_value(&self) -> Value {
        self.spec().cloned().unwrap_or(Value::Null)
    }
}

/// Builds the JSON merge patch applied to a Stream's status subresource.
pub fn status_patch(phase: StreamPhase, configuration_hash: &str, conditions: Vec<Condition>) -> Value {
    serde_json::json!({
        "status": {
            "phase": phase.to_string(),
            "configurationHash": configuration_hash,
            "conditions": conditions,
        }
    })
}

/// Builds the single condition appropriate for `phase`, following the
/// one-of contract in the component design (`StreamPending`, `StreamRunning`,
/// `StreamBackfilling`, `StreamSuspended`, `StreamFailed`).
pub fn condition_for_phase(phase: StreamPhase, observed_generation: Option<i64>) -> Option<Condition> {
    let (type_, message) = match phase {
        StreamPhase::New => return None,
        StreamPhase::Pending => ("StreamPending", "Stream is waiting to be scheduled"),
        StreamPhase::Running => ("StreamRunning", "Stream is running its streaming Job"),
        StreamPhase::Backfilling => ("StreamBackfilling", "Stream is running its backfill Job"),
        StreamPhase::Suspended => ("StreamSuspended", "Stream is suspended"),
        StreamPhase::Failed => ("StreamFailed", "Stream's Job failed"),
    };

    Some(Condition {
        type_: type_.to_string(),
        status: "True".to_string(),
        reason: type_.to_string(),
        message: message.to_string(),
        observed_generation,
        last_transition_time: k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(chrono::Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use serde_json::json;

    fn stream(spec: Value, status: Value) -> DynamicObject {
        DynamicObject {
            types: None,
            metadata: ObjectMeta {
                name: Some("s1".into()),
                namespace: Some("ns".into()),
                ..Default::default()
            },
            data: json!({ "spec": spec, "status": status }),
        }
    }

    #[test]
    fn defaults_to_new_phase_and_unsuspended() {
        let obj = stream(json!({}), json!({}));
        let view = StreamDefinitionView::new(&obj);
        assert_eq!(view.phase(), StreamPhase::New);
        assert!(!view.suspended());
        assert_eq!(view.configuration_hash(), None);
    }

    #[test]
    fn reads_suspended_and_phase() {
        let obj = stream(json!({"suspended": true}), json!({"phase": "Running"}));
        let view = StreamDefinitionView::new(&obj);
        assert!(view.suspended());
        assert_eq!(view.phase(), StreamPhase::Running);
    }

    #[test]
    fn job_template_ref_requires_name() {
        let obj = stream(json!({"jobTemplateRef": {}}), json!({}));
        let view = StreamDefinitionView::new(&obj);
        assert!(view.job_template_ref().is_err());
    }

    #[test]
    fn job_template_ref_reads_name_and_namespace() {
        let obj = stream(
            json!({"jobTemplateRef": {"name": "tpl", "namespace": "jobs"}}),
            json!({}),
        );
        let view = StreamDefinitionView::new(&obj);
        let r = view.job_template_ref().unwrap();
        assert_eq!(r.name, "tpl");
        assert_eq!(r.namespace.as_deref(), Some("jobs"));
    }

    #[test]
    fn secret_fields_skips_missing() {
        let obj = stream(json!({"apiKey": "s-1"}), json!({}));
        let view = StreamDefinitionView::new(&obj);
        let fields = vec!["apiKey".to_string(), "missing".to_string()];
        assert_eq!(view.secret_fields(&fields), vec![("apiKey".to_string(), "s-1".to_string())]);
    }
}
