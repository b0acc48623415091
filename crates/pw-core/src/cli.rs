//! Command-line interface for the replay engine.
//!
//! Provides `replay`, `inspect`, `classify`, `scenarios` and `config`
//! subcommands. Every command supports `--format json`, which prints one
//! envelope object (or, for `replay`, one event object per line).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use pw_common::{Error, ReplaySeries, SeriesId, SCHEMA_VERSION};
use pw_config::{resolve_config, EngineConfig, ResolvedConfig};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::engine::{PlayOutcome, ReplayEngine};
use crate::events::{EngineEvent, StopReason};
use crate::exit_codes::ExitCode;
use crate::loader::{read_series_file, ScenarioLoader};
use crate::logging::LogFormat;
use crate::replay::scenarios;
use crate::report::{ReportDigest, ReportSnapshot, ReportTicket, TemplateReportRequester};
use crate::tier::{classify, TierKey};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "pyrowatch", version, about = "Replay wildfire risk series frame by frame")]
pub struct Cli {
    /// Engine config file (.toml or .json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Human, global = true)]
    pub log_format: LogFormat,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a replay series to the end, printing events as they happen
    Replay(ReplayArgs),
    /// Validate a replay document and summarise it
    Inspect {
        /// Replay document (JSON)
        file: PathBuf,
    },
    /// Show the display category for an alert tier label
    Classify {
        /// Tier label, e.g. `warning`
        label: String,
    },
    /// List the built-in scenarios
    Scenarios,
    /// Show the effective engine configuration
    Config,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Replay document to play instead of a built-in scenario
    #[arg(long, conflicts_with = "scenario")]
    pub file: Option<PathBuf>,

    /// Built-in scenario name
    #[arg(long)]
    pub scenario: Option<String>,

    /// Speed multiplier (must be one of the configured speeds)
    #[arg(long)]
    pub speed: Option<u32>,

    /// Start position as a fraction of the series (0.0-1.0)
    #[arg(long, value_name = "FRACTION")]
    pub start: Option<f64>,

    /// Fetch situation reports for the alert frame and the final frame
    #[arg(long)]
    pub with_reports: bool,
}

/// Run the parsed command.
pub async fn run(cli: &Cli) -> ExitCode {
    let resolved = match resolve_config(cli.config.as_deref()) {
        Ok(resolved) => resolved,
        Err(e) => {
            return report_error(cli.format, "config", &Error::Config(e.to_string()));
        }
    };

    match &cli.command {
        Commands::Replay(args) => run_replay(cli.format, resolved.config, args).await,
        Commands::Inspect { file } => run_inspect(cli.format, file).await,
        Commands::Classify { label } => run_classify(cli.format, label),
        Commands::Scenarios => run_scenarios(cli.format),
        Commands::Config => run_config(cli.format, &resolved),
    }
}

fn envelope(command: &str, body: serde_json::Value) -> serde_json::Value {
    let mut output = json!({
        "schema_version": SCHEMA_VERSION,
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "command": command,
    });
    if let (Some(out), serde_json::Value::Object(fields)) = (output.as_object_mut(), body) {
        out.extend(fields);
    }
    output
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("error: failed to render JSON: {e}"),
    }
}

fn report_error(format: OutputFormat, command: &str, err: &Error) -> ExitCode {
    let code = ExitCode::from(err);
    match format {
        OutputFormat::Json => print_json(
            &envelope(
                command,
                json!({
                    "error": {
                        "code": err.code(),
                        "message": err.to_string(),
                        "retryable": err.is_retryable(),
                    },
                    "exit_code": code.as_i32(),
                }),
            ),
            true,
        ),
        OutputFormat::Human => eprintln!("error: {err}"),
    }
    code
}

// ----------------------------------------------------------------------
// replay
// ----------------------------------------------------------------------

async fn run_replay(format: OutputFormat, config: EngineConfig, args: &ReplayArgs) -> ExitCode {
    let engine = match ReplayEngine::new(config, Arc::new(TemplateReportRequester)) {
        Ok(engine) => engine,
        Err(e) => return report_error(format, "replay", &e),
    };
    let mut events = engine.subscribe();

    let loaded = match &args.file {
        Some(path) => match read_series_file(path).await {
            Ok(series) => engine.load(series),
            Err(e) => Err(e),
        },
        None => {
            let name = args.scenario.as_deref().unwrap_or(scenarios::SCENARIO_NAMES[0]);
            engine.load_from(&ScenarioLoader, &SeriesId::new(name)).await
        }
    };
    if let Err(e) = loaded {
        return report_error(format, "replay", &e);
    }
    let Some(series) = engine.series() else {
        return report_error(
            format,
            "replay",
            &Error::InvalidSeries("no series after load".to_string()),
        );
    };

    if let Some(speed) = args.speed {
        if let Err(e) = engine.set_speed(speed) {
            return report_error(format, "replay", &e);
        }
    }
    if let Some(fraction) = args.start {
        engine.seek_by_fraction(fraction);
    }

    let mut session = ReplaySession {
        format,
        series: &series,
        with_reports: args.with_reports,
        alert_reached: false,
        tickets: Vec::new(),
    };

    // Everything emitted while loading and seeking is already buffered.
    while let Ok(event) = events.try_recv() {
        session.handle(&engine, &event);
    }

    let mut finished = engine.play() != PlayOutcome::Started;
    while !finished {
        match events.recv().await {
            Ok(event) => {
                session.handle(&engine, &event);
                finished = matches!(
                    event,
                    EngineEvent::PlaybackStopped {
                        reason: StopReason::EndOfSeries,
                        ..
                    }
                );
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged; some frames were not printed");
            }
            Err(RecvError::Closed) => {
                return report_error(
                    format,
                    "replay",
                    &Error::Transport("event stream closed before the end of the series".into()),
                );
            }
        }
    }

    if args.with_reports {
        if let Some(ticket) = engine.ensure_active_report() {
            session.tickets.push(ticket);
        }
    }
    let tickets = std::mem::take(&mut session.tickets);
    for ticket in tickets {
        session.print_report(&ticket.settled().await);
    }
    engine.shutdown();

    if session.alert_reached {
        ExitCode::AlertReached
    } else {
        ExitCode::Clean
    }
}

struct ReplaySession<'a> {
    format: OutputFormat,
    series: &'a ReplaySeries,
    with_reports: bool,
    alert_reached: bool,
    tickets: Vec<ReportTicket>,
}

impl ReplaySession<'_> {
    fn handle(&mut self, engine: &ReplayEngine, event: &EngineEvent) {
        if let EngineEvent::AlertFired { index, .. } = event {
            self.alert_reached = true;
            if self.with_reports {
                if let Some(ticket) = engine.ensure_report(*index) {
                    self.tickets.push(ticket);
                }
            }
        }
        match self.format {
            OutputFormat::Json => print_json(event, false),
            OutputFormat::Human => {
                if let Some(line) = self.describe(event) {
                    println!("{line}");
                }
            }
        }
    }

    fn describe(&self, event: &EngineEvent) -> Option<String> {
        let last = self.series.last_index();
        Some(match event {
            EngineEvent::SeriesLoaded {
                series_id, frames, alert_frame,
            } => match alert_frame {
                Some(alert) => format!(
                    "# {} ({series_id}): {frames} frames, alert at frame {alert}",
                    self.series.name()
                ),
                None => format!("# {} ({series_id}): {frames} frames, no alert", self.series.name()),
            },
            EngineEvent::FrameChanged { to, .. } => {
                let frame = self.series.frame(*to)?;
                let tier = classify(&frame.alert_tier);
                format!(
                    "[{to:>3}/{last}] {:<20} risk {:.2} {:<9} {:>4} px  {}",
                    frame.timestamp,
                    frame.risk_score,
                    tier.display_text,
                    frame.fire_pixel_count,
                    frame.hour_label,
                )
            }
            EngineEvent::PlaybackStarted { speed, interval_ms } => {
                format!("> playing at {speed}x ({interval_ms} ms/frame)")
            }
            EngineEvent::PlaybackStopped { reason, index } => {
                format!("# stopped ({reason:?}) at frame {}", index.unwrap_or(0))
            }
            EngineEvent::SpeedChanged { from, to } => format!("# speed {from}x -> {to}x"),
            EngineEvent::AlertFired { index, .. } => {
                format!("!!! ALERT: frame {index} reached the alert threshold")
            }
            EngineEvent::AlertRearmed { index, .. } => format!("# alert re-armed at frame {index}"),
            EngineEvent::SeriesUnloaded | EngineEvent::ReportSettled { .. } => return None,
        })
    }

    fn print_report(&self, snapshot: &ReportSnapshot) {
        match self.format {
            OutputFormat::Json => print_json(&json!({ "event": "report", "report": snapshot }), false),
            OutputFormat::Human => {
                println!();
                println!("## Situation report, frame {} ({:?})", snapshot.frame_index, snapshot.status);
                match (&snapshot.payload, &snapshot.last_error) {
                    (Some(payload), _) => {
                        for line in ReportDigest::from_report(&payload.report).lines() {
                            println!("  {line}");
                        }
                    }
                    (None, Some(err)) => println!("  unavailable: {err}"),
                    (None, None) => println!("  unavailable"),
                }
            }
        }
    }
}

// ----------------------------------------------------------------------
// inspect
// ----------------------------------------------------------------------

/// Summary of a replay series.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub id: String,
    pub name: String,
    pub frames: usize,
    pub alert_frame: Option<usize>,
    pub first_timestamp: String,
    pub last_timestamp: String,
    pub max_risk: f64,
    pub max_fire_pixels: u64,
    /// Frame count per display tier, least severe first.
    pub tiers: Vec<(TierKey, usize)>,
}

impl SeriesSummary {
    pub fn of(series: &ReplaySeries) -> Self {
        let frames = series.frames();
        let tiers = TierKey::ALL
            .iter()
            .map(|&key| {
                let n = frames
                    .iter()
                    .filter(|f| classify(&f.alert_tier).key == key)
                    .count();
                (key, n)
            })
            .collect();
        Self {
            id: series.id().to_string(),
            name: series.name().to_string(),
            frames: series.len(),
            alert_frame: series.alert_frame_index(),
            first_timestamp: frames.first().map(|f| f.timestamp.clone()).unwrap_or_default(),
            last_timestamp: frames.last().map(|f| f.timestamp.clone()).unwrap_or_default(),
            max_risk: frames.iter().map(|f| f.risk_score).fold(0.0, f64::max),
            max_fire_pixels: frames.iter().map(|f| f.fire_pixel_count).max().unwrap_or(0),
            tiers,
        }
    }
}

async fn run_inspect(format: OutputFormat, file: &Path) -> ExitCode {
    let series = match read_series_file(file).await {
        Ok(series) => series,
        Err(e) => return report_error(format, "inspect", &e),
    };
    let summary = SeriesSummary::of(&series);

    match format {
        OutputFormat::Json => print_json(&envelope("inspect", json!({ "series": summary })), true),
        OutputFormat::Human => {
            println!("# {} ({})", summary.name, summary.id);
            println!("  frames:      {}", summary.frames);
            println!(
                "  alert frame: {}",
                summary
                    .alert_frame
                    .map_or_else(|| "none".to_string(), |i| i.to_string())
            );
            println!("  span:        {} .. {}", summary.first_timestamp, summary.last_timestamp);
            println!("  max risk:    {:.2}", summary.max_risk);
            println!("  max pixels:  {}", summary.max_fire_pixels);
            for (key, count) in &summary.tiers {
                println!("  {:<10} {count}", key.display().display_text);
            }
        }
    }
    ExitCode::Clean
}

// ----------------------------------------------------------------------
// classify / scenarios / config
// ----------------------------------------------------------------------

fn run_classify(format: OutputFormat, label: &str) -> ExitCode {
    let display = classify(label);
    match format {
        OutputFormat::Json => print_json(
            &envelope("classify", json!({ "label": label, "tier": display })),
            true,
        ),
        OutputFormat::Human => println!(
            "{label:?} -> {} ({}, {})",
            display.key, display.display_text, display.display_color
        ),
    }
    ExitCode::Clean
}

fn run_scenarios(format: OutputFormat) -> ExitCode {
    let summaries: Vec<SeriesSummary> = scenarios::SCENARIO_NAMES
        .iter()
        .filter_map(|name| scenarios::by_name(name))
        .map(|series| SeriesSummary::of(&series))
        .collect();
    match format {
        OutputFormat::Json => print_json(
            &envelope(
                "scenarios",
                json!({ "scenarios": summaries, "count": summaries.len() }),
            ),
            true,
        ),
        OutputFormat::Human => {
            println!("# Scenarios ({} total)", summaries.len());
            for s in &summaries {
                println!(
                    "  {:<12} {:<12} {:>3} frames  alert={}",
                    s.id,
                    s.name,
                    s.frames,
                    s.alert_frame.map_or_else(|| "-".to_string(), |i| i.to_string())
                );
            }
        }
    }
    ExitCode::Clean
}

fn run_config(format: OutputFormat, resolved: &ResolvedConfig) -> ExitCode {
    match format {
        OutputFormat::Json => print_json(
            &envelope(
                "config",
                json!({
                    "source": resolved.source.to_string(),
                    "config": resolved.config,
                }),
            ),
            true,
        ),
        OutputFormat::Human => {
            println!("# source: {}", resolved.source);
            match serde_json::to_string_pretty(&resolved.config) {
                Ok(text) => println!("{text}"),
                Err(e) => return report_error(format, "config", &Error::Json(e)),
            }
        }
    }
    ExitCode::Clean
}
