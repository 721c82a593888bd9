mod config;
mod output;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, EnvFilter};

use iptv_core::{
    CheckOptions, CheckerConfig, PlaylistChecker, PlaylistInput, ProbeOutcome, Report,
    StreamRequest, StreamStatus,
};

use crate::config::AppConfig;

static VERSION: LazyLock<String> = LazyLock::new(|| {
    let version = env!("CARGO_PKG_VERSION");
    match env!("GIT_HASH") {
        "" => version.to_string(),
        hash => format!("{version} ({hash})"),
    }
});

/// IPTV playlist checker: find out which channels still answer.
#[derive(Parser)]
#[command(name = "iptv-checker", version = VERSION.as_str(), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every entry of a playlist (URL, file path, or raw text).
    Check {
        input: String,

        /// Number of entries probed at the same time.
        #[arg(short, long)]
        parallel: Option<usize>,

        /// Directory for online.m3u, offline.m3u and duplicates.m3u.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full report as JSON instead of a summary.
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        checker: CheckerArgs,
    },
    /// Check a single stream URL and print its status as JSON.
    Stream {
        url: String,

        #[command(flatten)]
        checker: CheckerArgs,
    },
    /// Start the HTTP API server.
    Serve {
        /// Listen address (e.g. 0.0.0.0:8080). Overrides config file.
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Path to TOML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Flags shared by the one-shot commands. They override the config file.
#[derive(Args)]
struct CheckerArgs {
    /// Per-endpoint timeout in milliseconds.
    #[arg(short, long)]
    timeout: Option<u64>,

    #[arg(long)]
    user_agent: Option<String>,

    #[arg(long)]
    http_referer: Option<String>,

    /// Accept invalid TLS certificates.
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Path to TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl CheckerArgs {
    fn apply(&self, mut c: CheckerConfig) -> CheckerConfig {
        if let Some(ms) = self.timeout {
            c = c.with_timeout(ms);
        }
        if let Some(ref ua) = self.user_agent {
            c = c.with_user_agent(ua);
        }
        if let Some(ref referer) = self.http_referer {
            c = c.with_http_referer(referer);
        }
        if self.insecure {
            c = c.with_insecure(true);
        }
        c
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            input,
            parallel,
            output,
            json,
            checker,
        } => {
            let app_config = load_config(checker.config.as_deref(), "warn");
            let mut config = checker.apply(app_config.checker.to_checker_config());
            if let Some(p) = parallel {
                config = config.with_parallel(p);
            }
            run_check(&input, config, output.as_deref(), json).await;
        }
        Commands::Stream { url, checker } => {
            let app_config = load_config(checker.config.as_deref(), "warn");
            let config = checker.apply(app_config.checker.to_checker_config());
            run_stream(url, config).await;
        }
        Commands::Serve { listen, config } => {
            let app_config = load_config(config.as_deref(), "info");
            run_serve(listen, app_config).await;
        }
    }
}

/// Loads the config file if one was given and installs the tracing subscriber.
/// Exits the process on a bad config.
fn load_config(path: Option<&Path>, default_level: &str) -> AppConfig {
    let Some(path) = path else {
        init_tracing("pretty", default_level);
        return AppConfig::default();
    };

    match AppConfig::load(path) {
        Ok(c) => {
            init_tracing(&c.server.log_format, default_level);
            tracing::info!(path = %path.display(), "Loaded config file");
            c
        }
        Err(e) => {
            init_tracing("pretty", default_level);
            tracing::error!("{}", e);
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn run_check(input: &str, config: CheckerConfig, output: Option<&Path>, json: bool) {
    let parallel = config.parallel;
    let timeout_ms = config.timeout.as_millis();
    let checker = PlaylistChecker::new(config);
    let input = PlaylistInput::detect(input);

    let entries = match checker.load_entries(&input).await {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(1);
        }
    };

    if !json {
        eprintln!(
            "{} {}",
            style("iptv-checker").bold(),
            style(VERSION.as_str()).dim()
        );
        eprintln!("  {} {}", style("input:   ").dim(), style(describe(&input)).bold());
        eprintln!("  {} {}", style("entries: ").dim(), entries.len());
        eprintln!("  {} {}", style("parallel:").dim(), parallel);
        eprintln!("  {} {}ms", style("timeout: ").dim(), timeout_ms);
        eprintln!();
    }

    let bar = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(entries.len() as u64)
    };
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> "),
    );

    let progress = |_: usize, status: &StreamStatus| {
        if !status.ok() {
            bar.set_message(format!("{}", style(failure_label(status)).red()));
        }
        bar.inc(1);
    };

    let report = checker
        .check_entries(entries, CheckOptions::default(), Some(&progress))
        .await;
    bar.finish_and_clear();

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("{} {}", style("error:").red().bold(), e);
                std::process::exit(1);
            }
        }
    } else {
        print_summary(&report);
    }

    if let Some(dir) = output {
        match output::write_report(dir, &report) {
            Ok(paths) => {
                if !json {
                    for p in paths {
                        eprintln!("  {} {}", style("wrote").dim(), p.display());
                    }
                }
            }
            Err(e) => {
                eprintln!(
                    "{} could not write playlists to {}: {}",
                    style("error:").red().bold(),
                    dir.display(),
                    e
                );
                std::process::exit(1);
            }
        }
    }
}

async fn run_stream(url: String, config: CheckerConfig) {
    let checker = PlaylistChecker::new(config);
    let status = checker.check_stream(StreamRequest::new(url)).await;

    match serde_json::to_string_pretty(&status) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(2);
        }
    }

    if !status.ok() {
        std::process::exit(1);
    }
}

async fn run_serve(listen_override: Option<SocketAddr>, app_config: AppConfig) {
    let listen = listen_override.unwrap_or(app_config.server.listen);
    let state = iptv_api::state::AppState::new(app_config.checker.to_checker_config())
        .with_local_paths(app_config.server.allow_local_paths)
        .with_max_finished_jobs(app_config.server.max_finished_jobs);

    if let Err(e) =
        iptv_api::serve_with_state(listen, state, iptv_api::shutdown_signal()).await
    {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    tracing::info!("Shutdown complete");
}

fn describe(input: &PlaylistInput) -> String {
    match input {
        PlaylistInput::Url(url) => url.clone(),
        PlaylistInput::Path(path) => path.display().to_string(),
        PlaylistInput::Text(text) => format!("inline text ({} bytes)", text.len()),
        PlaylistInput::Bytes(bytes) => format!("raw bytes ({} bytes)", bytes.len()),
    }
}

/// Short reason for an offline entry: its status code, or the last transport error.
fn failure_label(status: &StreamStatus) -> String {
    if let Some(code) = status.code() {
        return code.to_string();
    }
    let last = status.requests().and_then(|r| r.last());
    match last.map(|a| &a.outcome) {
        Some(ProbeOutcome::TransportFailure { kind, reason }) => match reason {
            Some(reason) => format!("{} ({})", kind, reason),
            None => kind.to_string(),
        },
        Some(ProbeOutcome::Success { status, .. }) => format!("HTTP {}", status),
        None => "offline".to_string(),
    }
}

fn print_summary(report: &Report) {
    let summary = report.summary();

    for item in report.offline() {
        println!(
            "  {}  {:<40} {}",
            style("OFFLINE").red().bold(),
            item.entry.label(),
            style(failure_label(&item.status)).dim()
        );
    }
    if summary.offline > 0 {
        println!();
    }

    println!(
        "  {} {}",
        style(format!("{:<11}", "online")).green(),
        summary.online
    );
    println!(
        "  {} {}",
        style(format!("{:<11}", "offline")).red(),
        summary.offline
    );
    println!(
        "  {} {}",
        style(format!("{:<11}", "duplicates")).yellow(),
        summary.duplicates
    );
    println!(
        "  {} {}/{} in {:.1}s",
        style(format!("{:<11}", "total")).bold(),
        summary.online,
        summary.total,
        report.duration_ms as f64 / 1000.0
    );
}

fn init_tracing(log_format: &str, default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match log_format {
        "json" => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .init();
        }
        _ => {
            fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}
