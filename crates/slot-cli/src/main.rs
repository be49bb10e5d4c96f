//! `slot` CLI: run the scheduling engine over JSON files from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Place an event (stdin → stdout)
//! slot schedule < request.json
//!
//! # Same, with engine settings and a human-readable answer
//! slot --config slot.toml --format text schedule -i request.json
//!
//! # List free slots in a window
//! slot free -i free.json -o slots.json
//!
//! # Expand a recurrence rule and render it as an RRULE
//! slot expand -i rule.json
//!
//! # Merge several calendars into one busy/free view
//! slot availability -i streams.json
//!
//! # Debug logging (or set SLOT_LOG=slot_engine=trace)
//! slot -v schedule -i request.json
//! ```

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::{self, Read};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use slot_engine::availability::{self, BusyStream, PrivacyLevel, UnifiedAvailability};
use slot_engine::decision::fmt_slot;
use slot_engine::{
    busy, expand_in, rfc5545, BusyPeriod, EngineConfig, EventRequest, RecurrenceRule, SchedulingEngine,
    TimeInterval, Window,
};

#[derive(Parser)]
#[command(name = "slot", version, about = "Free-slot search and recurring-event scheduling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine settings as a TOML file (defaults are used if omitted)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Json, global = true)]
    format: Format,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Args)]
struct Io {
    /// Input JSON file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide where an event request goes, given busy periods
    Schedule(Io),
    /// List free slots of a given length in a window
    Free(Io),
    /// Expand a recurrence rule into occurrences
    Expand(Io),
    /// Merge busy periods from several calendars
    Availability(Io),
}

#[derive(Deserialize)]
struct ScheduleInput {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
    request: EventRequest,
}

#[derive(Deserialize)]
struct FreeInput {
    #[serde(default)]
    busy: Vec<BusyPeriod>,
    window: Window,
    duration_minutes: i64,
    #[serde(default = "default_max_results")]
    max_results: usize,
    #[serde(default)]
    after: Option<DateTime<Utc>>,
}

fn default_max_results() -> usize {
    10
}

#[derive(Serialize)]
struct FreeOutput {
    slots: Vec<TimeInterval>,
}

#[derive(Deserialize)]
struct ExpandInput {
    rule: RecurrenceRule,
    start: DateTime<Utc>,
    duration_minutes: i64,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ExpandOutput {
    rrule: String,
    occurrences: Vec<TimeInterval>,
}

#[derive(Deserialize)]
struct AvailabilityInput {
    streams: Vec<BusyStream>,
    window: Window,
    #[serde(default)]
    privacy: PrivacyLevel,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let engine = SchedulingEngine::new(config).context("Invalid engine configuration")?;
    let tz = engine.timezone();

    let (io, rendered) = match &cli.command {
        Commands::Schedule(io) => (io, schedule(&engine, io, cli.format)?),
        Commands::Free(io) => (io, free(&engine, io, cli.format)?),
        Commands::Expand(io) => (io, expand(&engine, io, cli.format)?),
        Commands::Availability(io) => (io, merge(io, tz, cli.format)?),
    };

    write_output(io.output.as_deref(), &rendered)
}

fn schedule(engine: &SchedulingEngine, io: &Io, format: Format) -> Result<String> {
    let input: ScheduleInput = parse_input(io)?;
    let tz = engine.timezone();

    let busy = match engine.lookahead(&input.request) {
        Some(lookahead) => busy::normalize(&input.busy, &lookahead, tz),
        None => Default::default(),
    };
    let decision = engine.schedule(&input.request, &busy);
    info!(title = %input.request.title, status = decision.status(), "scheduled");

    match format {
        Format::Json => to_json(&decision),
        Format::Text => Ok(decision.summary(tz)),
    }
}

fn free(engine: &SchedulingEngine, io: &Io, format: Format) -> Result<String> {
    let input: FreeInput = parse_input(io)?;
    let tz = engine.timezone();

    let window = input.window.to_interval()?;
    let duration = positive_minutes(input.duration_minutes)?;
    let busy = busy::normalize(&input.busy, &window, tz);
    let after = input.after.unwrap_or(window.start());

    let slots = engine
        .finder()
        .find_all_after(&busy, &window, duration, after, input.max_results);
    debug!(found = slots.len(), %window, "free slots");

    match format {
        Format::Json => to_json(&FreeOutput { slots }),
        Format::Text => {
            if slots.is_empty() {
                return Ok("No free slots\n".to_string());
            }
            let mut out = String::new();
            for slot in &slots {
                writeln!(out, "{}", fmt_slot(slot, tz))?;
            }
            Ok(out)
        }
    }
}

fn expand(engine: &SchedulingEngine, io: &Io, format: Format) -> Result<String> {
    let input: ExpandInput = parse_input(io)?;
    let tz = engine.timezone();
    let config = engine.config();

    let anchor = TimeInterval::starting_at(input.start, positive_minutes(input.duration_minutes)?)?;
    let limit = input.limit.unwrap_or(config.max_occurrences);
    let occurrences: Vec<TimeInterval> =
        expand_in(&input.rule, anchor, limit, tz, config.dst_policy)?.collect();
    let rrule = rfc5545::to_rrule(&input.rule, &anchor.start().with_timezone(&tz));

    match format {
        Format::Json => to_json(&ExpandOutput { rrule, occurrences }),
        Format::Text => {
            let mut out = format!("RRULE:{}\n", rrule);
            for occurrence in &occurrences {
                writeln!(out, "{}", fmt_slot(occurrence, tz))?;
            }
            Ok(out)
        }
    }
}

fn merge(io: &Io, tz: Tz, format: Format) -> Result<String> {
    let input: AvailabilityInput = parse_input(io)?;
    let window = input.window.to_interval()?;
    let view = availability::merge_availability(&input.streams, &window, tz, input.privacy);

    match format {
        Format::Json => to_json(&view),
        Format::Text => render_availability(&view, tz),
    }
}

fn render_availability(view: &UnifiedAvailability, tz: Tz) -> Result<String> {
    let mut out = String::from("Busy:\n");
    for block in &view.busy {
        let interval = TimeInterval::new(block.start, block.end)?;
        match view.privacy {
            PrivacyLevel::Full => writeln!(out, "  - {} ({} calendar(s))", fmt_slot(&interval, tz), block.source_count)?,
            PrivacyLevel::Opaque => writeln!(out, "  - {}", fmt_slot(&interval, tz))?,
        }
    }
    out.push_str("Free:\n");
    for slot in &view.free {
        let interval = TimeInterval::new(slot.start, slot.end)?;
        writeln!(out, "  - {} ({} min)", fmt_slot(&interval, tz), slot.duration_minutes)?;
    }
    Ok(out)
}

fn positive_minutes(minutes: i64) -> Result<Duration> {
    if minutes <= 0 {
        bail!("duration_minutes must be positive, got {}", minutes);
    }
    Duration::try_minutes(minutes).with_context(|| format!("duration_minutes out of range: {}", minutes))
}

/// Log to stderr. `SLOT_LOG` overrides the default filter.
fn init_logger(verbose: bool) {
    let default = if verbose { "slot_engine=debug,slot=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_env("SLOT_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {}", path))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config: {}", path))
}

fn parse_input<T: serde::de::DeserializeOwned>(io: &Io) -> Result<T> {
    let text = read_input(io.input.as_deref())?;
    serde_json::from_str(&text).context("Failed to parse input JSON")
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
