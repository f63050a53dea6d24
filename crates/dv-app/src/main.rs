//! Main application entry point

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use geo_types::{coord, Rect};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use dv_core::{
    Coordinator, DeliveryReport, LinkedView, MetricPair, MetricSlot, RefreshReport,
    SelectionBroadcaster,
};
use dv_data::{load_dataset, DatasetConfig};
use dv_views::{
    HistogramConfig, HistogramView, MapView, MapViewConfig, ScatterConfig, ScatterView,
};

mod commands;

use commands::Command;

/// Linked county health views driven from stdin
#[derive(Parser, Debug)]
#[command(name = "healthvis")]
#[command(about = "Linked maps, histograms and scatter plot over county health metrics")]
struct Args {
    /// Dataset configuration file; defaults apply when it does not exist
    #[arg(default_value = "healthvis.json", value_hint = clap::ValueHint::FilePath)]
    config: PathBuf,
}

/// Main application state
struct HealthVisApp {
    coordinator: Coordinator,
    primary_map: Arc<MapView>,
    secondary_map: Arc<MapView>,
    scatter: Arc<ScatterView>,
}

impl HealthVisApp {
    fn new(config: &DatasetConfig) -> Result<Self> {
        let dataset = load_dataset(config).context("Failed to load dataset")?;

        let coordinator = Coordinator::new(
            Arc::new(dataset.geometry),
            Arc::new(dataset.table),
            Arc::new(dataset.catalog),
            Arc::new(SelectionBroadcaster::new()),
            config.initial_pair(),
        )
        .context("Failed to join the initial metric pair")?;

        let primary_map = MapView::create("Primary map", MapViewConfig::default(), &coordinator)?;
        let secondary_map = MapView::create(
            "Secondary map",
            MapViewConfig {
                metric: MetricSlot::Secondary,
                ..MapViewConfig::default()
            },
            &coordinator,
        )?;
        // The coordinator keeps the histograms alive
        HistogramView::create("Primary histogram", HistogramConfig::default(), &coordinator)?;
        HistogramView::create(
            "Secondary histogram",
            HistogramConfig {
                metric: MetricSlot::Secondary,
                ..HistogramConfig::default()
            },
            &coordinator,
        )?;
        let scatter = ScatterView::create("Scatter", ScatterConfig::default(), &coordinator)?;

        info!("{} views ready", coordinator.views().len());

        Ok(Self {
            coordinator,
            primary_map,
            secondary_map,
            scatter,
        })
    }

    /// Run one command. Returns `false` when the session should end.
    fn handle(&self, command: Command, out: &mut impl Write) -> Result<bool> {
        match command {
            Command::Primary(metric) => {
                let report = self.coordinator.select_primary(&metric)?;
                print_refresh(out, &report)?;
            }
            Command::Secondary(metric) => {
                let report = self.coordinator.select_secondary(&metric)?;
                print_refresh(out, &report)?;
            }
            Command::Pair(primary, secondary) => {
                let report = self
                    .coordinator
                    .set_metric_pair(MetricPair::new(primary, secondary))?;
                print_refresh(out, &report)?;
            }
            Command::BrushMap([x0, y0, x1, y1]) => {
                let bounds = Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 });
                let report = self.primary_map.brush(bounds)?;
                print_delivery(out, &report)?;
            }
            Command::BrushScatter([x0, y0, x1, y1]) => {
                let report = self.scatter.brush(x0, y0, x1, y1)?;
                print_delivery(out, &report)?;
            }
            Command::Clear => {
                // Every other view listens on the scatter channel
                let report = self.scatter.clear_brush()?;
                print_delivery(out, &report)?;
            }
            Command::Status => self.print_status(out)?,
            Command::Metrics => {
                for descriptor in self.coordinator.catalog().iter() {
                    writeln!(out, "{:<40} {}", descriptor.metric_id, descriptor.display_name)?;
                }
            }
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn print_status(&self, out: &mut impl Write) -> Result<()> {
        let records = self.coordinator.records();
        writeln!(
            out,
            "pair {} | phase {:?} | {} counties",
            records.pair(),
            self.coordinator.phase(),
            records.len()
        )?;

        match self.coordinator.broadcaster().active_selection() {
            Some(active) => writeln!(
                out,
                "active selection #{} on '{}': {} counties",
                active.sequence,
                active.channel,
                active.selection.len()
            )?,
            None => writeln!(out, "no selection yet")?,
        }

        for view in self.coordinator.views() {
            writeln!(
                out,
                "  {:<20} {:<14} {} highlighted",
                view.title(),
                view.view_type(),
                view.highlighted().len()
            )?;
        }

        if let Some(legend) = self.secondary_map.legend() {
            writeln!(out, "secondary legend: {} [{}, {}]", legend.title, legend.min, legend.max)?;
        }
        Ok(())
    }
}

fn print_refresh(out: &mut impl Write, report: &RefreshReport) -> Result<()> {
    writeln!(out, "now showing {} ({} views refreshed)", report.pair, report.refreshed)?;
    for failure in &report.failures {
        writeln!(out, "  view '{}' failed: {}", failure.title, failure.message)?;
    }
    Ok(())
}

fn print_delivery(out: &mut impl Write, report: &DeliveryReport) -> Result<()> {
    writeln!(
        out,
        "selection #{} on '{}' delivered to {} views",
        report.sequence, report.channel, report.delivered
    )?;
    for failure in &report.failures {
        writeln!(out, "  subscriber {:?} failed: {}", failure.subscription, failure.message)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config_path = args.config;

    let config = if config_path.exists() {
        DatasetConfig::load(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?
    } else {
        warn!("{} not found, using default dataset paths", config_path.display());
        DatasetConfig::default()
    };

    info!("Starting county health views");
    let app = match HealthVisApp::new(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return Err(e);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read command")?;
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                writeln!(stdout, "error: {}", e)?;
                continue;
            }
        };

        match app.handle(command, &mut stdout) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => writeln!(stdout, "error: {:#}", e)?,
        }
        stdout.flush()?;
    }

    info!("Goodbye");
    Ok(())
}
