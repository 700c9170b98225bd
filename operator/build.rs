use arcane_types::*;
use kube::CustomResourceExt;
use std::fs;

fn main() {
    let _ = fs::create_dir("../crds");
    fs::write(
        "../crds/streaming.sneaksanddata.com_streamclasses.yaml",
        serde_yaml::to_string(&StreamClass::crd()).unwrap(),
    )
    .unwrap();
    fs::write(
        "../crds/streaming.sneaksanddata.com_streamingjobtemplates.yaml",
        serde_yaml::to_string(&StreamingJobTemplate::crd()).unwrap(),
    )
    .unwrap();
    fs::write(
        "../crds/streaming.sneaksanddata.com_backfillrequests.yaml",
        serde_yaml::to_string(&BackfillRequest::crd()).unwrap(),
    )
    .unwrap();
}
