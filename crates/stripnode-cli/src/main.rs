use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::{Parser, Subcommand};
use glob::glob;
use serde::Serialize;
use stripnode_core::{
    CaptureWindow, ConfigError, DatagramSource, LogIndicator, Node, NodeConfig, NodeSummary,
    PcapReplaySource, Pixel, Protocol, Received, Signal, SourceError, StatusIndicator, UdpSource,
};
use tracing_subscriber::EnvFilter;

mod output;
mod serial;

use output::OutputSpec;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("STRIPNODE_BUILD_COMMIT"),
    " ",
    env!("STRIPNODE_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "stripnode")]
#[command(version = VERSION)]
#[command(
    about = "Art-Net / sACN receiver that drives an addressable LED strip.",
    long_about = None,
    after_help = "Examples:\n  stripnode --config node.json run --output serial:/dev/ttyUSB0\n  stripnode replay show.pcapng --output jsonl:frames.jsonl --stdout\n  stripnode test-pattern --color ff0000"
)]
struct Cli {
    /// Node configuration (JSON); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen for live traffic and drive the strip until Ctrl-C.
    Run {
        #[command(flatten)]
        network: NetworkArgs,

        /// Frame sink: null, jsonl:PATH or serial:PORT[@BAUD]
        #[arg(long, default_value = "null")]
        output: OutputSpec,

        /// Leave the last frame lit on exit instead of clearing the strip
        #[arg(long)]
        keep_lit: bool,
    },
    /// Feed a PCAP/PCAPNG capture through the node on its own clock.
    #[command(
        after_help = "Examples:\n  stripnode replay show.pcapng -o summary.json\n  stripnode replay 'captures/*.pcap' --stdout --pretty"
    )]
    Replay {
        /// Path (or glob matching one file) to a .pcap or .pcapng capture
        input: PathBuf,

        #[command(flatten)]
        network: NetworkArgs,

        /// Frame sink: null, jsonl:PATH or serial:PORT[@BAUD]
        #[arg(long, default_value = "null")]
        output: OutputSpec,

        /// Summary output path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        summary: Option<PathBuf>,

        /// Write the JSON summary to stdout
        #[arg(long, conflicts_with = "summary")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,
    },
    /// Fill the strip with one color and exit.
    TestPattern {
        /// Hex color, RRGGBB
        #[arg(long, default_value = "ff0000", value_parser = parse_color)]
        color: Pixel,

        /// Frame sink: null, jsonl:PATH or serial:PORT[@BAUD]
        #[arg(long, default_value = "null")]
        output: OutputSpec,
    },
    /// Validate the configuration and print it with defaults filled in.
    CheckConfig,
}

#[derive(clap::Args, Debug)]
struct NetworkArgs {
    /// Override the configured protocol
    #[arg(long, value_parser = parse_protocol)]
    protocol: Option<Protocol>,

    /// Override the UDP port
    #[arg(long)]
    port: Option<u16>,
}

impl NetworkArgs {
    fn apply(&self, config: &mut NodeConfig) {
        if let Some(protocol) = self.protocol {
            config.network.protocol = protocol;
        }
        if self.port.is_some() {
            config.network.port = self.port;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let result = load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Run {
            network,
            output,
            keep_lit,
        } => cmd_run(config, &network, &output, keep_lit),
        Commands::Replay {
            input,
            network,
            output,
            summary,
            stdout,
            pretty,
            compact,
            quiet,
        } => cmd_replay(
            config,
            &input,
            &network,
            &output,
            summary,
            SummaryFormat {
                stdout,
                pretty,
                compact,
                quiet,
            },
        ),
        Commands::TestPattern { color, output } => cmd_test_pattern(config, color, &output),
        Commands::CheckConfig => cmd_check_config(&config),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn config_error(err: ConfigError) -> CliError {
    let hint = match err {
        ConfigError::Io(_) => "check the --config path",
        ConfigError::Json(_) => {
            "expected a JSON object with strip, render, network and status sections"
        }
        ConfigError::EmptyStrip
        | ConfigError::PixelsPerUniverse { .. }
        | ConfigError::TooManyUniverses { .. }
        | ConfigError::UniverseOverflow { .. } => {
            "check strip.pixel_count, strip.pixels_per_universe and strip.start_universe"
        }
        ConfigError::StalenessBelowInterval { .. } => {
            "raise render.max_staleness_ms above render.min_interval_ms, or set it to null"
        }
        ConfigError::ZeroPollTimeout => "set network.poll_timeout_ms to a positive value",
    };
    CliError::new(format!("invalid configuration: {err}"), Some(hint.to_string()))
}

fn load_config(path: Option<&Path>) -> Result<NodeConfig, CliError> {
    let Some(path) = path else {
        return Ok(NodeConfig::default());
    };
    if !path.exists() {
        return Err(CliError::new(
            format!("config file not found: {}", path.display()),
            Some("pass an existing JSON file with --config, or omit it for defaults".to_string()),
        ));
    }
    NodeConfig::load(path).map_err(config_error)
}

fn install_shutdown_handler() -> Arc<AtomicBool> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %err, "could not install Ctrl-C handler");
    }
    shutdown
}

fn cmd_run(
    mut config: NodeConfig,
    network: &NetworkArgs,
    output: &OutputSpec,
    keep_lit: bool,
) -> Result<(), CliError> {
    network.apply(&mut config);
    let (layout, _) = config.validate().map_err(config_error)?;

    let mut indicator = LogIndicator::new(config.status);
    let source = match UdpSource::bind(&config.network, &layout) {
        Ok(source) => source,
        Err(err) => {
            indicator.fail(Signal::NetworkLink);
            return Err(network_error(&err));
        }
    };
    let driver = output.open(config.strip.color_order)?;
    let mut node = Node::new(&config, source, driver, indicator)
        .context("node startup failed")?;

    let shutdown = install_shutdown_handler();
    node.run(&shutdown).context("receive loop failed")?;
    let summary = node.finish(!keep_lit).context("shutdown failed")?;

    if !output.writes_stdout() {
        let json = serde_json::to_string_pretty(&summary).context("JSON serialization failed")?;
        println!("{json}");
    }
    Ok(())
}

fn network_error(err: &SourceError) -> CliError {
    let hint = match err {
        SourceError::Bind { .. } => "check network.mode and that no other receiver holds the port",
        SourceError::Multicast { .. } => {
            "check the interface supports multicast, or set network.multicast to false"
        }
        _ => "check the host network configuration",
    };
    CliError::new(format!("network bring-up failed: {err}"), Some(hint.to_string()))
}

struct SummaryFormat {
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
}

#[derive(Debug, Serialize)]
struct ToolInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct InputInfo {
    path: String,
    bytes: u64,
}

#[derive(Debug, Serialize)]
struct ReplaySummary {
    tool: ToolInfo,
    input: InputInfo,
    capture: CaptureWindow,
    node: NodeSummary,
}

fn cmd_replay(
    mut config: NodeConfig,
    input: &Path,
    network: &NetworkArgs,
    output: &OutputSpec,
    summary_path: Option<PathBuf>,
    format: SummaryFormat,
) -> Result<(), CliError> {
    network.apply(&mut config);
    let resolved_input = resolve_input_path(input)?;
    validate_input_file(&resolved_input)?;
    if format.stdout && output.writes_stdout() {
        return Err(CliError::new(
            "frames and summary cannot both go to stdout",
            Some("write frames to a file with --output jsonl:PATH".to_string()),
        ));
    }
    let summary_path = if format.stdout {
        None
    } else {
        Some(summary_path.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--summary or --stdout".to_string()),
            )
        })?)
    };
    config.validate().map_err(config_error)?;

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("failed to read input file: {}", resolved_input.display()))?;
    let source = PcapReplaySource::open(&resolved_input, config.network.port())
        .map_err(|err| {
            CliError::new(
                format!("cannot open capture {}: {err}", resolved_input.display()),
                Some("use a readable .pcap or .pcapng file".to_string()),
            )
        })?;
    let driver = output.open(config.strip.color_order)?;
    let indicator = LogIndicator::new(config.status);
    let mut node = Node::new(&config, source, driver, indicator).context("node startup failed")?;

    let shutdown = install_shutdown_handler();
    node.run(&shutdown).context("replay failed")?;
    let capture = node.source().capture_window();
    let node_summary = node.finish(false).context("shutdown failed")?;

    let summary = ReplaySummary {
        tool: ToolInfo {
            name: "stripnode",
            version: env!("CARGO_PKG_VERSION"),
        },
        input: InputInfo {
            path: resolved_input.display().to_string(),
            bytes: meta.len(),
        },
        capture,
        node: node_summary,
    };
    let json = serialize_summary(&summary, format.pretty, format.compact)?;

    let Some(summary_path) = summary_path else {
        println!("{json}");
        return Ok(());
    };
    if let Some(parent) = summary_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory: {}", parent.display()))?;
    }
    fs::write(&summary_path, json)
        .with_context(|| format!("failed to write summary: {}", summary_path.display()))?;
    if !format.quiet {
        eprintln!("OK: summary written -> {}", summary_path.display());
    }
    Ok(())
}

fn serialize_summary<T: Serialize>(
    value: &T,
    pretty: bool,
    compact: bool,
) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("JSON serialization failed").map_err(Into::into)
}

/// Source for commands that never listen.
struct Offline;

impl DatagramSource for Offline {
    fn recv(&mut self, _buf: &mut [u8]) -> Result<Received, SourceError> {
        Ok(Received::Closed)
    }
}

fn cmd_test_pattern(config: NodeConfig, color: Pixel, output: &OutputSpec) -> Result<(), CliError> {
    let driver = output.open(config.strip.color_order)?;
    let indicator = LogIndicator::new(config.status);
    let mut node = Node::new(&config, Offline, driver, indicator).map_err(|err| match err {
        stripnode_core::NodeError::Config(err) => config_error(err),
        other => CliError::new(format!("node startup failed: {other}"), None),
    })?;
    node.show_solid(color).context("test pattern write failed")?;
    node.finish(false).context("shutdown failed")?;
    tracing::info!(r = color.r, g = color.g, b = color.b, "test pattern shown");
    Ok(())
}

fn cmd_check_config(config: &NodeConfig) -> Result<(), CliError> {
    let (layout, timing) = config.validate().map_err(config_error)?;
    let json = serde_json::to_string_pretty(config).context("JSON serialization failed")?;
    println!("{json}");
    eprintln!(
        "OK: {} pixels over {} universe(s) starting at {}, min interval {} ms",
        layout.pixel_count(),
        layout.universe_count(),
        layout.start_universe(),
        timing.min_interval().as_millis()
    );
    Ok(())
}

fn parse_color(value: &str) -> Result<Pixel, String> {
    let hex = value.trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("expected RRGGBB hex, got '{value}'"));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|err| err.to_string())
    };
    Ok(Pixel::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn parse_protocol(value: &str) -> Result<Protocol, String> {
    match value.to_ascii_lowercase().as_str() {
        "artnet" | "art-net" => Ok(Protocol::ArtNet),
        "sacn" | "e131" | "e1.31" => Ok(Protocol::Sacn),
        _ => Err(format!("unknown protocol '{value}' (expected artnet or sacn)")),
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
