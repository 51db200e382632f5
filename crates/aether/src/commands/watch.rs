//! Live gauge view

use anyhow::{bail, Result};
use colored::Colorize;
use tokio::sync::broadcast;

use super::users::signed_in_user;
use super::App;
use crate::output::{
    color_prediction, color_status, format_gib, gauge_line, print_info, print_warning,
    OutputFormat,
};
use aether_lib::collector::SystemSampler;
use aether_lib::pipeline::{GaugeSession, PipelineRunner, TickOutcome, TickReport};
use aether_lib::predictor::Predictor;
use aether_lib::GaugeKind;
use tracing::{info, warn};

/// Options for one gauge view
pub struct WatchOptions {
    pub gauge: GaugeKind,
    pub ticks: Option<u64>,
    pub email: Option<String>,
    pub dump_metrics: bool,
}

/// Open a gauge view and render ticks until Ctrl-C or the tick limit
pub async fn watch(app: &App, options: WatchOptions) -> Result<()> {
    match (&options.email, app.config.require_sign_in) {
        (Some(email), _) => {
            let user = signed_in_user(app, email)?;
            if app.format == OutputFormat::Table {
                print_info(&format!("Signed in as {}", user.full_name()));
            }
        }
        (None, true) => bail!("Sign in required: pass --email with a registered address"),
        (None, false) => {}
    }

    let predictor = app.load_predictor().await;
    let pipeline = app.config.pipeline();
    let threshold = pipeline.thresholds.threshold_for(options.gauge);

    if app.format == OutputFormat::Table {
        let header = format!("{} usage", options.gauge).bold();
        match app.config.icon() {
            Some(icon) => println!("{} ({})", header, icon.display()),
            None => println!("{}", header),
        }
        if predictor.is_degraded() {
            print_warning("No model artifact loaded, predictions come from the stand-in");
        }
    }

    let session = GaugeSession::open(
        options.gauge,
        SystemSampler::new(),
        predictor,
        &pipeline,
    );
    let (mut runner, mut reports) = PipelineRunner::new(session, pipeline.tick_interval);
    runner = runner.with_health(app.health.clone());
    if let Some(ticks) = options.ticks {
        runner = runner.with_max_ticks(ticks);
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let runner_handle = tokio::spawn(runner.run(shutdown_rx));
    app.health.set_ready(true).await;

    let mut interrupted = false;
    loop {
        tokio::select! {
            report = reports.recv() => match report {
                Some(report) => render(&report, threshold, app.format),
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                info!("Interrupt received, closing gauge view");
                interrupted = true;
                let _ = shutdown_tx.send(());
            }
        }
    }

    let session = runner_handle.await?;
    info!(gauge = %session.gauge(), ticks = session.ticks_run(), "Gauge pipeline finished");
    drop(session);

    let health = app.health.health().await;
    for (component, message) in health.problems() {
        warn!(component, message, "Component not healthy");
    }
    let readiness = app.health.readiness().await;
    if app.format == OutputFormat::Table {
        match &readiness.reason {
            None => println!("Status: {}", color_status(&health.status.to_string())),
            Some(reason) => println!(
                "Status: {} (not ready: {})",
                color_status(&health.status.to_string()),
                reason
            ),
        }
    }

    if options.dump_metrics {
        print!("{}", app.metrics.render());
    }
    Ok(())
}

fn render(report: &TickReport, threshold: f64, format: OutputFormat) {
    if format == OutputFormat::Json {
        if let Ok(line) = serde_json::to_string(report) {
            println!("{}", line);
        }
        return;
    }

    match &report.outcome {
        TickOutcome::Completed {
            sample,
            adjusted,
            degraded,
            fallback,
            warning,
            ..
        } => {
            let (reading, predicted) = match report.gauge {
                GaugeKind::Cpu => (sample.cpu_percent, adjusted.predicted_cpu),
                GaugeKind::Ram => (sample.ram_percent, adjusted.predicted_ram),
            };
            let detail = match report.gauge {
                GaugeKind::Cpu => String::new(),
                GaugeKind::Ram => format!(
                    "  {} / {}",
                    format_gib(sample.used_memory_bytes),
                    format_gib(sample.total_memory_bytes)
                ),
            };
            // Degraded views already carry a banner; flag only model failures
            let source = if *fallback && !*degraded {
                " (fallback)".dimmed().to_string()
            } else {
                String::new()
            };
            println!(
                "{}  predicted {}{}{}",
                gauge_line(report.gauge, reading),
                color_prediction(predicted, threshold),
                source,
                detail
            );
            if let Some(w) = warning {
                print_warning(&w.message.yellow().bold().to_string());
            }
        }
        TickOutcome::Skipped { stage, reason } => {
            println!(
                "{} {}",
                format!("tick {} skipped at {}:", report.seq, stage).dimmed(),
                reason
            );
        }
    }
}
