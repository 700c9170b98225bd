use std::process::Command;
use std::sync::Arc;

use arcane_common::health::ProbeTimeouts;
use clap::Parser;
use kube::config::{Kubeconfig, KubeConfigOptions};
use kube::{Client, Config};
use kube::runtime::events::Reporter;
use owo_colors::OwoColorize;
use tracing::info;

mod config;
mod configurator;
mod error;
mod events;
mod hashing;
mod job_builder;
mod metrics_reporter;
mod stream_class_controller;
mod stream_controller;
mod stream_definition;
mod streaming_job;

use crate::config::AppConfig;
use crate::metrics_reporter::MetricsReporter;
use crate::stream_class_controller::StreamClassContext;

/// Kubernetes operator that reconciles declared Kinds into streaming or
/// backfill Jobs, per their StreamClass.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Shell command to run for a kubeconfig when in-cluster config can't be
    /// inferred, e.g. `aws eks get-token ...`. Its stdout is parsed as YAML.
    #[arg(long, env = "KUBECONFIG_CMD")]
    kubeconfig_cmd: Option<String>,
}

async fn build_client(cli: &Cli) -> anyhow::Result<Client> {
    match Config::infer().await {
        Ok(config) => Ok(Client::try_from(config)?),
        Err(err) => {
            let Some(cmd) = &cli.kubeconfig_cmd else {
                return Err(err.into());
            };
            info!(error = %err, "in-cluster config unavailable, falling back to --kubeconfig-cmd");
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;
            if !output.status.success() {
                anyhow::bail!("kubeconfig command exited with {}: {}", output.status, String::from_utf8_lossy(&output.stderr));
            }
            let kubeconfig: Kubeconfig = serde_yaml::from_slice(&output.stdout)?;
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
            Ok(Client::try_from(config)?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app_config = AppConfig::load()?;
    arcane_common::logging::init_with_level(&app_config.logging.log_level);

    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    info!(cluster = %app_config.logging.cluster_name, "{}", "starting arcane-operator".green());

    let client = build_client(&cli).await?;
    let shutdown = arcane_common::shutdown::listen();

    let health_state = arcane_common::health::HealthState::new();
    let probe_timeouts = ProbeTimeouts {
        read_timeout: app_config.probes.read_timeout,
        write_timeout: app_config.probes.write_timeout,
        shutdown_timeout: app_config.probes.shutdown_timeout,
    };
    let health_task = tokio::spawn(arcane_common::health::serve(
        app_config.probes.addr,
        health_state.clone(),
        shutdown.clone(),
        probe_timeouts,
    ));

    let metrics = MetricsReporter::new();
    prometheus::default_registry()
        .register(Box::new(metrics.registry_collector()))
        .expect("metric is only registered once per process");
    let metrics_task = tokio::spawn(metrics.clone().run(
        app_config.periodic_metrics_reporter.initial_delay,
        app_config.periodic_metrics_reporter.report_interval,
        shutdown.clone(),
    ));

    let class_ctx = Arc::new(StreamClassContext {
        client: client.clone(),
        registry: stream_class_controller::registry::ControllerRegistry::new(),
        metrics: metrics.clone(),
        reporter: Reporter::from("arcane-operator".to_string()),
    });

    health_state.mark_ready();
    info!("arcane-operator is ready");

    stream_class_controller::run(client, class_ctx, shutdown.clone()).await;

    shutdown.cancel();
    let _ = tokio::join!(health_task, metrics_task);
    info!("arcane-operator shut down cleanly");

    Ok(())
}
