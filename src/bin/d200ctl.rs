//! Command-line entry point: runs the driver daemon, or manages autostart.

use clap::{Parser, Subcommand};
use d200ctl::{autostart, config, device::DeviceController, probe, settings::SettingsStore, supervisor::Supervisor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "d200ctl", version, about = "Host-side driver for the Ulanzi D200 macro pad")]
struct Cli {
    #[command(subcommand)]
    command: Option<DriverCommand>,
}

#[derive(Subcommand)]
enum DriverCommand {
    /// Run the driver daemon in the foreground (default when no subcommand is given).
    Run,
    /// Manage launching the daemon automatically on login.
    Autostart {
        #[command(subcommand)]
        action: AutostartAction,
    },
}

#[derive(Subcommand)]
enum AutostartAction {
    Enable,
    Disable,
    Status,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(DriverCommand::Run) {
        DriverCommand::Run => run_daemon(),
        DriverCommand::Autostart { action } => run_autostart(action),
    }
}

fn run_autostart(action: AutostartAction) -> anyhow::Result<()> {
    match action {
        AutostartAction::Enable => {
            autostart::enable()?;
            println!("autostart enabled");
        }
        AutostartAction::Disable => {
            autostart::disable()?;
            println!("autostart disabled");
        }
        AutostartAction::Status => {
            println!("autostart: {}", if autostart::is_enabled() { "enabled" } else { "disabled" });
        }
    }
    Ok(())
}

fn run_daemon() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    let icons_dir = config::icons_dir();
    std::fs::create_dir_all(&icons_dir)?;

    let mut settings = SettingsStore::new(config::settings_path(), icons_dir.clone());
    settings.reload_if_changed()?;

    let (device, events) = DeviceController::new(icons_dir)?;
    let _reader = device.spawn_reader();
    spawn_telemetry(device.clone());

    let app_changed = probe::app::spawn();

    let supervisor = Supervisor::new(device, settings, app_changed, events.refresh, events.key_pressed);

    tokio::select! {
        _ = supervisor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    Ok(())
}

fn spawn_telemetry(device: DeviceController) {
    use tracing::Instrument;

    tokio::spawn(
        async move {
            let mut metrics = probe::metrics::MetricsProbe::new();
            let mut interval =
                tokio::time::interval(std::time::Duration::from_millis(config::TELEMETRY_PUSH_INTERVAL_MS));
            loop {
                interval.tick().await;
                if !device.is_connected() {
                    continue;
                }
                let sample = metrics.sample();
                let data = d200ctl::types::SmallWindowData {
                    mode: device.small_window_mode(),
                    cpu: sample.cpu_percent,
                    mem: sample.mem_percent,
                    gpu: sample.gpu_percent,
                    time: chrono::Local::now().format("%H:%M:%S").to_string(),
                };
                device.set_small_window_data(data, false).await;
            }
        }
        .instrument(tracing::info_span!("telemetry")),
    );
}
