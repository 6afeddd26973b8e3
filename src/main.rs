use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use facewatch::{CaptureSource, FacewatchConfig, FacewatchOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "facewatch")]
#[command(about = "Face-presence security pipeline with evidence capture and audit trail")]
#[command(version)]
#[command(long_about = "Continuously samples frames from a video source, detects face \
presence per frame, and converts detector output into discrete security events: \
acquired/lost transitions, rate-limited evidence snapshots, an append-only audit trail, \
and an optional best-effort sync to a SQLite event registry.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "facewatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the pipeline")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't process frames
    #[arg(long, help = "Perform dry run - initialize components but don't process frames")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // Initialize logging
    init_logging(&args)?;

    info!("Starting Facewatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Load and validate configuration
    let config = match FacewatchConfig::load_from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Configuration validation failed: {}", e);
        e
    })?;

    // Assemble the pipeline; a capture device that fails to bind is
    // fatal before any frame is processed
    let source_config = config.clone();
    let mut orchestrator = match FacewatchOrchestrator::new(config, move || {
        bind_source(&source_config)
    }) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Failed to start pipeline: {}", e);
            std::process::exit(1);
        }
    };

    if args.dry_run {
        info!("Dry run mode - components initialized, no frames processed");
        println!("✓ Dry run completed successfully - all components initialized");
        return Ok(());
    }

    orchestrator.install_signal_handlers();

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("Pipeline error during execution: {}", e);
        e
    })?;

    info!("Facewatch exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

/// Bind the configured capture source. GStreamer capture needs the
/// `camera` feature on Linux; other builds fall back to a synthetic
/// demonstration stream.
#[cfg(all(target_os = "linux", feature = "camera"))]
fn bind_source(config: &FacewatchConfig) -> facewatch::Result<Box<dyn CaptureSource>> {
    let source = facewatch::GstCameraSource::open(config.camera.clone())?;
    Ok(Box::new(source))
}

#[cfg(not(all(target_os = "linux", feature = "camera")))]
fn bind_source(config: &FacewatchConfig) -> facewatch::Result<Box<dyn CaptureSource>> {
    tracing::warn!("Built without the 'camera' feature; using a synthetic demonstration stream");

    // Short scripted sequence: quiet, a visit, quiet again
    let mut script = vec![false; 5];
    script.extend(vec![true; 20]);
    script.extend(vec![false; 10]);

    let (width, height) = config.camera.resolution;
    Ok(Box::new(facewatch::SyntheticSource::new(
        width, height, script,
    )))
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("facewatch={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Facewatch Configuration File");
    println!("# This is the default configuration with all available options");
    println!();
    println!("{}", toml::to_string_pretty(&FacewatchConfig::default())?);
    println!("# Optional registry sink (disabled unless a database path is set)");
    println!("# [registry]");
    println!("# database = \"facewatch_events.db\"");
    Ok(())
}
