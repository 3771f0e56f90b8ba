use super::{AppContext, PreconditionFailed};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use list_sync_config::parse_interval;
use owo_colors::OwoColorize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

pub const DEFAULT_UNIT_PATH: &str = "/etc/systemd/system/trakt-sync.service";

pub struct ServiceOptions {
    pub path: PathBuf,
    pub user: Option<String>,
    pub interval: Option<String>,
    pub binary: Option<PathBuf>,
    /// Explicit config path to bake into the unit
    pub config: Option<PathBuf>,
}

/// Everything that ends up in the unit file.
#[derive(Debug, PartialEq, Eq)]
pub struct UnitSpec {
    pub binary: PathBuf,
    pub interval: String,
    pub user: Option<String>,
    pub config: Option<PathBuf>,
}

fn quote(path: &Path) -> String {
    let raw = path.display().to_string();
    if raw.contains(char::is_whitespace) {
        format!("\"{}\"", raw)
    } else {
        raw
    }
}

pub fn render_unit(spec: &UnitSpec) -> String {
    let mut exec = format!("{} daemon --interval {}", quote(&spec.binary), spec.interval);
    if let Some(config) = &spec.config {
        exec.push_str(&format!(" --config {}", quote(config)));
    }

    let mut unit = String::new();
    unit.push_str("[Unit]\n");
    unit.push_str("Description=trakt-sync list synchronization\n");
    unit.push_str("Wants=network-online.target\n");
    unit.push_str("After=network-online.target\n\n");
    unit.push_str("[Service]\n");
    unit.push_str("Type=simple\n");
    unit.push_str(&format!("ExecStart={}\n", exec));
    if let Some(user) = &spec.user {
        unit.push_str(&format!("User={}\n", user));
    }
    unit.push_str("Restart=on-failure\n");
    unit.push_str("RestartSec=30\n");
    unit.push_str("KillSignal=SIGTERM\n\n");
    unit.push_str("[Install]\n");
    unit.push_str("WantedBy=multi-user.target\n");
    unit
}

pub fn run_install(ctx: &AppContext, options: ServiceOptions, output: &Output) -> Result<ExitCode> {
    let interval = options
        .interval
        .unwrap_or_else(|| ctx.config.daemon.interval.clone());
    parse_interval(&interval)
        .map_err(|e| PreconditionFailed::new(format!("Invalid service interval: {}", e)))?;

    let binary = match options.binary {
        Some(binary) => binary,
        None => std::env::current_exe()
            .map_err(|e| eyre!("Failed to determine the trakt-sync binary path: {}", e))?,
    };

    let spec = UnitSpec {
        binary,
        interval,
        user: options.user,
        config: options.config,
    };
    let unit = render_unit(&spec);

    if let Some(parent) = options.path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| eyre!("Failed to create {}: {}", parent.display(), e))?;
    }
    std::fs::write(&options.path, unit)
        .map_err(|e| eyre!("Failed to write unit file {}: {}", options.path.display(), e))?;
    info!(operation = "install_service", path = %options.path.display(), "Wrote systemd unit");

    let unit_name = options
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trakt-sync.service".to_string());

    output.success(format!("Wrote {}", options.path.display()));
    if output.is_human() {
        output.info("Enable and start it with:");
        output.info(format!("  {}", "sudo systemctl daemon-reload".bright_white()));
        output.info(format!("  {}", format!("sudo systemctl enable --now {}", unit_name).bright_white()));
    }
    output.json(&json!({
        "unit_file": options.path.display().to_string(),
        "unit": unit_name,
        "interval": spec.interval,
    }));
    Ok(ExitCode::SUCCESS)
}
