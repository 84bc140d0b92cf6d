//! Status Scanner CLI
//!
//! Lists cameras and scans a teacher's QR code against a status
//! directory. Without the `camera` feature (or with `--mock`) it runs
//! against a simulated camera that "sees" a configurable payload.

use clap::{Parser, Subcommand, ValueEnum};
use status_scanner::{
    camera::{CameraBackend, CameraSessionManager, FacingHint, MockBackend},
    decode::{FixedDecoder, SymbolDecoder},
    metrics::{MetricsRegistry, MetricsSnapshot},
    payload::{Availability, DirectoryVerifier, StructuredPayload, TeacherStatus},
    ScanController, ScanResult, ScannerConfig, ScannerState,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "status-scanner", version, about = "Scan a teacher's QR code and show their status")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available cameras
    Devices {
        /// Use the simulated camera
        #[arg(long)]
        mock: bool,
    },
    /// Scan until a teacher code is verified or Ctrl-C is pressed
    Scan(ScanArgs),
    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Camera id to open
    #[arg(long)]
    device: Option<String>,

    /// Preferred camera facing when no id is given
    #[arg(long, value_enum)]
    facing: Option<Facing>,

    /// Status directory file (TOML, `[[teacher]]` tables)
    #[arg(long)]
    directory: Option<PathBuf>,

    /// Use the simulated camera
    #[arg(long)]
    mock: bool,

    /// Text the simulated camera decodes
    #[arg(long)]
    mock_payload: Option<String>,

    /// Frames the simulated camera misses before the code appears
    #[arg(long, default_value_t = 15)]
    mock_delay: u64,

    /// Serve Prometheus metrics on this port (0 disables)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Print the metrics exposition when the scan ends
    #[arg(long)]
    print_metrics: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Facing {
    Front,
    Back,
}

impl From<Facing> for FacingHint {
    fn from(facing: Facing) -> Self {
        match facing {
            Facing::Front => FacingHint::Front,
            Facing::Back => FacingHint::Back,
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ScannerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Invalid configuration {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => ScannerConfig::default(),
    };

    match cli.command {
        Command::Devices { mock } => list_devices(mock),
        Command::CheckConfig => check_config(&config),
        Command::Scan(args) => {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    eprintln!("Failed to start runtime: {}", e);
                    return ExitCode::FAILURE;
                }
            };
            runtime.block_on(scan(config, args))
        }
    }
}

fn list_devices(mock: bool) -> ExitCode {
    #[cfg(feature = "camera")]
    {
        if !mock {
            return print_devices(status_scanner::camera::NativeBackend::new());
        }
    }
    #[cfg(not(feature = "camera"))]
    {
        if !mock {
            info!("Built without the `camera` feature, listing simulated devices");
        }
    }
    print_devices(MockBackend::new())
}

fn print_devices<B: CameraBackend>(backend: B) -> ExitCode {
    let mut manager = CameraSessionManager::new(backend);
    match manager.list_devices() {
        Ok(devices) => {
            for device in devices {
                let label = if device.label.is_empty() {
                    "(no label)"
                } else {
                    device.label.as_str()
                };
                println!("{:<24} {:<8} {}", device.id, device.facing, label);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn check_config(config: &ScannerConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::FAILURE;
    }

    match toml::to_string_pretty(config) {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("Failed to render configuration: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if let Some(path) = &config.output.directory {
        match DirectoryVerifier::from_file(path) {
            Ok(directory) => println!("# directory: {} teachers", directory.len()),
            Err(e) => {
                eprintln!("Invalid directory {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}

fn sample_directory() -> DirectoryVerifier {
    DirectoryVerifier::new([
        TeacherStatus {
            teacher_id: "T-1001".to_string(),
            name: "Ada Lovelace".to_string(),
            availability: Availability::Available,
            note: Some("Room 204".to_string()),
            updated_at: Some(chrono::Utc::now()),
        },
        TeacherStatus {
            teacher_id: "T-1002".to_string(),
            name: "Alan Turing".to_string(),
            availability: Availability::InClass,
            note: None,
            updated_at: None,
        },
    ])
}

async fn scan(mut config: ScannerConfig, args: ScanArgs) -> ExitCode {
    if let Some(device) = &args.device {
        config.camera.device_id = Some(device.clone());
    }
    if let Some(facing) = args.facing {
        config.camera.facing = Some(facing.into());
    }
    if let Some(port) = args.metrics_port {
        config.output.metrics_port = port;
    }
    if let Some(path) = &args.directory {
        config.output.directory = Some(path.clone());
    }

    let directory = match &config.output.directory {
        Some(path) => match DirectoryVerifier::from_file(path) {
            Ok(directory) => directory,
            Err(e) => {
                eprintln!("Invalid directory {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("No directory given, using the built-in sample directory");
            sample_directory()
        }
    };

    #[cfg(feature = "camera")]
    {
        if !args.mock {
            let decoder = status_scanner::QrDecoder::with_max_dimension(
                config.sampling.max_decode_dimension,
            );
            return run_scan(
                status_scanner::camera::NativeBackend::new(),
                decoder,
                directory,
                config,
                &args,
            )
            .await;
        }
    }
    #[cfg(not(feature = "camera"))]
    {
        if !args.mock {
            info!("Built without the `camera` feature, using the simulated camera");
        }
    }

    let payload = args
        .mock_payload
        .clone()
        .unwrap_or_else(|| StructuredPayload::new("T-1001").with_name("Ada Lovelace").encode());
    let decoder = FixedDecoder::new(payload).after(args.mock_delay);
    run_scan(MockBackend::new(), decoder, directory, config, &args).await
}

enum Exporter {
    Local(MetricsRegistry),
    #[cfg(feature = "metrics")]
    Http(std::sync::Arc<tokio::sync::RwLock<status_scanner::metrics::MetricsState>>),
}

impl Exporter {
    fn new(registry: MetricsRegistry, port: u16) -> Self {
        #[cfg(feature = "metrics")]
        {
            if port != 0 {
                use status_scanner::metrics::{MetricsServer, MetricsServerConfig};

                let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
                let state = server.state();
                tokio::spawn(async move {
                    if let Err(e) = server.run().await {
                        warn!(error = %e, "Metrics server stopped");
                    }
                });
                return Exporter::Http(state);
            }
        }
        #[cfg(not(feature = "metrics"))]
        {
            if port != 0 {
                warn!(port, "Built without the `metrics` feature, not serving metrics");
            }
        }
        Exporter::Local(registry)
    }

    async fn update(&self, snapshot: MetricsSnapshot) {
        match self {
            Exporter::Local(registry) => registry.update(&snapshot),
            #[cfg(feature = "metrics")]
            Exporter::Http(state) => state.write().await.update(&snapshot),
        }
    }

    fn print(&self) {
        match self {
            Exporter::Local(registry) => match registry.encode() {
                Ok(text) => print!("{}", text),
                Err(e) => warn!(error = %e, "Failed to encode metrics"),
            },
            #[cfg(feature = "metrics")]
            Exporter::Http(_) => info!("Metrics are served over HTTP"),
        }
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

async fn run_scan<B, D>(
    backend: B,
    decoder: D,
    directory: DirectoryVerifier,
    config: ScannerConfig,
    args: &ScanArgs,
) -> ExitCode
where
    B: CameraBackend,
    D: SymbolDecoder,
{
    let registry = match MetricsRegistry::new() {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let exporter = Exporter::new(registry, config.output.metrics_port);

    let (shutdown_tx, mut shutdown) = tokio::sync::mpsc::unbounded_channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = shutdown_tx.send(());
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    info!("Status Scanner v{}", status_scanner::VERSION);
    info!(directory_size = directory.len(), "Point the camera at a teacher code");

    let mut scanner = ScanController::builder(backend, decoder, directory)
        .config(config)
        .on_state_change(|state| tracing::debug!(?state, "State changed"))
        .on_detected(|_| println!("[{}] *beep* code detected", timestamp()))
        .on_verified(|status| println!("[{}] {}", timestamp(), status))
        .on_error(|kind, reason| {
            eprintln!("[{}] {} ({})", timestamp(), kind.message(), reason);
        })
        .build();

    if scanner.start().is_err() {
        exporter
            .update(MetricsSnapshot::new(scanner.state(), scanner.stats()))
            .await;
        if args.print_metrics {
            exporter.print();
        }
        return ExitCode::FAILURE;
    }

    loop {
        let event = tokio::select! {
            _ = shutdown.recv() => None,
            result = scanner.next_result() => Some(result),
        };

        match event {
            None => {
                info!("Interrupted, releasing camera");
                scanner.stop();
                break;
            }
            Some(None) => break,
            Some(Some(ScanResult::Invalid(reason))) => {
                info!(reason = %reason, "Ignoring code that is not a teacher code");
            }
            Some(Some(_)) => {}
        }

        exporter
            .update(MetricsSnapshot::new(scanner.state(), scanner.stats()))
            .await;
    }

    let state = scanner.state();
    let stats = scanner.stats();
    exporter.update(MetricsSnapshot::new(state, stats)).await;
    info!(
        attempts = stats.attempts,
        frames = stats.frames_sampled,
        verifications = stats.verifications,
        "Scan finished"
    );
    drop(scanner);

    if args.print_metrics {
        exporter.print();
    }

    match state {
        ScannerState::Success => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
