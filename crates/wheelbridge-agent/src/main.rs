//! wheelbridge: real-time remote-control bridge for a two-wheel robot.
//!
//! Loads settings, enables actuator torque, serves the `WebSocket` and HTTP
//! command channels, and parks the robot on SIGINT/SIGTERM.

#![deny(unsafe_code)]

mod logging;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use tracing::{error, info, warn};
use wheelbridge_core::{KeywordClassifier, MotionProfile, RateLimiter};
use wheelbridge_drive::{
    ActuatorDriver, Dispatcher, LifecycleManager, MotionController, ShellDriver, ShellDriverConfig,
};
use wheelbridge_server::{BridgeServer, ServerConfig};
use wheelbridge_settings::BridgeSettings;

/// Command-line arguments. Flags override the settings file and environment.
#[derive(Parser, Debug)]
#[command(name = "wheelbridge", about = "Remote-control bridge for a differential-drive robot")]
struct Cli {
    /// Settings file (default `~/.wheelbridge/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind.
    #[arg(long)]
    port: Option<u16>,

    /// Minimum interval between actuated commands, in milliseconds.
    #[arg(long)]
    cooldown_ms: Option<u64>,

    /// Wheel speed magnitude for forward/backward.
    #[arg(long)]
    drive_power: Option<i32>,

    /// Wheel speed magnitude for turning in place.
    #[arg(long)]
    turn_power: Option<i32>,

    /// Bound on a single actuator call, in milliseconds.
    #[arg(long)]
    dispatch_timeout_ms: Option<u64>,
}

impl Cli {
    /// Load the layered settings and apply flags on top.
    fn load_settings(&self) -> Result<BridgeSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(wheelbridge_settings::settings_path);
        let mut settings = wheelbridge_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply(&mut settings);
        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    fn apply(&self, settings: &mut BridgeSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ms) = self.cooldown_ms {
            settings.drive.cooldown_ms = ms;
        }
        if let Some(power) = self.drive_power {
            settings.drive.drive_power = power;
        }
        if let Some(power) = self.turn_power {
            settings.drive.turn_power = power;
        }
        if let Some(ms) = self.dispatch_timeout_ms {
            settings.drive.dispatch_timeout_ms = ms;
        }
    }
}

/// The assembled service: HTTP/WS front end plus actuator lifecycle.
struct Bridge {
    server: BridgeServer,
    lifecycle: Arc<LifecycleManager>,
}

impl Bridge {
    fn assemble(settings: &BridgeSettings, driver: Arc<dyn ActuatorDriver>) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(driver, settings.drive.dispatch_timeout()));
        let profile = MotionProfile {
            drive_power: settings.drive.drive_power,
            turn_power: settings.drive.turn_power,
        };
        let controller = Arc::new(MotionController::new(
            profile,
            RateLimiter::new(settings.drive.cooldown()),
            Arc::clone(&dispatcher),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            dispatcher,
            settings.actuator.joints.clone(),
        ));
        let server = BridgeServer::new(
            ServerConfig::from(&settings.server),
            controller,
            Arc::new(KeywordClassifier::default()),
        );
        Self { server, lifecycle }
    }

    /// Enable torque, serve until `stop` resolves, then park the actuator and
    /// close every session.
    ///
    /// The actuator is parked on every exit path, including a panic while
    /// serving. A listener that dies on its own is reported as an error.
    async fn run(self, stop: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let lifecycle = Arc::clone(&self.lifecycle);
        let coordinator = Arc::clone(self.server.shutdown());

        match tokio::spawn(self.serve(stop)).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "serve task aborted, parking actuator");
                coordinator.close_sessions();
                let _ = lifecycle.shutdown().await;
                Err(anyhow!("serve task aborted: {e}"))
            }
        }
    }

    async fn serve(self, stop: impl Future<Output = ()>) -> Result<()> {
        let Self { server, lifecycle } = self;

        let startup = lifecycle.startup().await;
        if let Some(e) = startup.error() {
            warn!(error = %e, "continuing with degraded actuator");
        }

        let (addr, mut handle) = match server.listen().await {
            Ok(bound) => bound,
            Err(e) => {
                let _ = lifecycle.shutdown().await;
                let cfg = server.config();
                return Err(e).context(format!("Failed to bind {}:{}", cfg.host, cfg.port));
            }
        };
        info!("wheelbridge listening on http://{addr} (ws://{addr}/ws)");

        let listener_died = tokio::select! {
            () = stop => false,
            _ = &mut handle => {
                warn!("listener exited unexpectedly");
                true
            }
        };

        info!("shutting down");
        let coordinator = Arc::clone(server.shutdown());
        coordinator.stop_accepting();
        if let Some(report) = lifecycle.shutdown().await {
            if !report.stopped || report.torque_failures > 0 {
                warn!(
                    stopped = report.stopped,
                    torque_failures = report.torque_failures,
                    "actuator not fully parked"
                );
            }
        }
        let handles = if listener_died { Vec::new() } else { vec![handle] };
        coordinator
            .graceful_shutdown(handles, Some(server.config().shutdown_timeout()))
            .await;
        if listener_died {
            bail!("listener exited unexpectedly");
        }
        info!("shutdown complete");
        Ok(())
    }
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                let _ = sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.load_settings()?;
    logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let driver = ShellDriver::new(ShellDriverConfig {
        command: settings.actuator.command.clone(),
        left_wheel: settings.actuator.left_wheel,
        right_wheel: settings.actuator.right_wheel,
        timeout: settings.drive.dispatch_timeout(),
    })
    .context("Failed to configure actuator driver")?;

    let mut bridge = Bridge::assemble(&settings, Arc::new(driver));
    match wheelbridge_server::metrics::install_recorder() {
        Ok(handle) => bridge.server = bridge.server.with_metrics(handle),
        Err(e) => warn!(error = %e, "metrics disabled"),
    }

    bridge.run(shutdown_signal()).await
}
