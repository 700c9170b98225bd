use k8s_openapi::api::batch::v1::Job;

pub const BACKFILLING_LABEL: &str = "arcane/backfilling";
pub const STREAM_ID_LABEL: &str = "arcane/stream-id";
pub const STREAM_KIND_LABEL: &str = "arcane/stream-kind";
pub const CONFIGURATION_HASH_ANNOTATION: &str = "configuration-hash";

/// Read-mostly view over the batch Job the operator owns for a Stream.
pub struct StreamingJobView<'a> {
    job: &'a Job,
}

impl<'a> StreamingJobView<'a> {
    pub fn new(job: &'a Job) -> Self {
        Self { job }
    }

    /// A Job is Completed iff at least one pod succeeded.
    pub fn is_completed(&self) -> bool {
        self.job
            .status
            .as_ref()
            .and_then(|s| s.succeeded)
            .is_some_and(|succeeded| succeeded > 0)
    }

    /// A Job is Failed iff it exhausted its configured backoff limit.
    pub fn is_failed(&self) -> bool {
        let Some(status) = self.job.status.as_ref() else {
            return false;
        };
        let Some(failed) = status.failed else {
            return false;
        };
        let backoff_limit = self
            .job
            .spec
            .as_ref()
            .and_then(|s| s.backoff_limit)
            .unwrap_or(6);
        failed >= backoff_limit
    }

    pub fn configuration_hash(&self) -> Option<&str> {
        self.job
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(CONFIGURATION_HASH_ANNOTATION))
            .map(String::as_str)
    }

    pub fn is_backfilling(&self) -> bool {
        self.job
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(BACKFILLING_LABEL))
            .is_some_and(|v| v == "true")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::batch::v1::JobStatus;
    use std::collections::BTreeMap;

    fn job_with(succeeded: Option<i32>, failed: Option<i32>, backoff_limit: Option<i32>) -> Job {
        Job {
            spec: Some(k8s_openapi::api::batch::v1::JobSpec {
                backoff_limit,
                ..Default::default()
            }),
            status: Some(JobStatus {
                succeeded,
                failed,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn completed_when_succeeded_positive() {
        let job = job_with(Some(1), None, None);
        assert!(StreamingJobView::new(&job).is_completed());
    }

    #[test]
    fn not_completed_when_no_status() {
        let job = Job::default();
        assert!(!StreamingJobView::new(&job).is_completed());
    }

    #[test]
    fn failed_exactly_at_backoff_limit() {
        let job = job_with(None, Some(3), Some(3));
        assert!(StreamingJobView::new(&job).is_failed());
    }

    #[test]
    fn not_failed_below_backoff_limit() {
        let job = job_with(None, Some(2), Some(3));
        assert!(!StreamingJobView::new(&job).is_failed());
    }

    #[test]
    fn reads_backfilling_label() {
        let mut job = Job::default();
        let mut labels = BTreeMap::new();
        labels.insert(BACKFILLING_LABEL.to_string(), "true".to_string());
        job.metadata.labels = Some(labels);
        assert!(StreamingJobView::new(&job).is_backfilling());
    }
}
