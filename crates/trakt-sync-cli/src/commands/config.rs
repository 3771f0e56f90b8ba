use super::{auth, prompts, AppContext, PreconditionFailed};
use crate::output::{check_mark, styled_table, Output};
use crate::ConfigCommands;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color, Table};
use list_sync_models::Category;
use owo_colors::OwoColorize;
use serde_json::json;
use std::process::ExitCode;

pub async fn run_config(ctx: &mut AppContext, cmd: ConfigCommands, output: &Output) -> Result<ExitCode> {
    match cmd {
        ConfigCommands::Validate => validate_config(ctx, output),
        ConfigCommands::Show { full } => show_config(ctx, full, output),
        ConfigCommands::Trakt {
            client_id,
            client_secret,
            username,
        } => configure_trakt(ctx, client_id, client_secret, username, output).await,
    }
}

fn validate_config(ctx: &AppContext, output: &Output) -> Result<ExitCode> {
    ctx.require_valid_config()?;
    output.success(format!("Configuration is valid: {}", ctx.config_path.display()));
    output.json(&json!({
        "config_file": ctx.config_path.display().to_string(),
        "valid": true,
    }));
    Ok(ExitCode::SUCCESS)
}

fn section(title: &str) -> Table {
    let mut table = styled_table();
    table.set_header(vec![
        Cell::new(title).fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);
    table
}

fn show_config(ctx: &AppContext, full: bool, output: &Output) -> Result<ExitCode> {
    let config = &ctx.config;
    let secret = |value: &str| if full { value.to_string() } else { mask_string(value) };
    let sources = config
        .sync
        .sources
        .iter()
        .map(Category::label)
        .collect::<Vec<_>>()
        .join(", ");

    if !output.is_human() {
        output.json(&json!({
            "config_file": ctx.config_path.display().to_string(),
            "trakt": {
                "client_id": secret(&config.trakt.client_id),
                "client_secret": secret(&config.trakt.client_secret),
                "username": config.trakt.username,
            },
            "sync": config.sync,
            "daemon": config.daemon,
            "logging": config.logging,
        }));
        return Ok(ExitCode::SUCCESS);
    }

    let mut trakt = section("Trakt");
    trakt.add_row(vec![Cell::new("Client ID"), Cell::new(secret(&config.trakt.client_id))]);
    trakt.add_row(vec![Cell::new("Client Secret"), Cell::new(secret(&config.trakt.client_secret))]);
    trakt.add_row(vec![Cell::new("Username"), Cell::new(&config.trakt.username)]);

    let mut sync = section("Sync");
    sync.add_row(vec![Cell::new("Limit"), Cell::new(config.sync.limit)]);
    sync.add_row(vec![Cell::new("Min Rating"), Cell::new(config.sync.min_rating)]);
    sync.add_row(vec![Cell::new("List Privacy"), Cell::new(config.sync.list_privacy)]);
    sync.add_row(vec![
        Cell::new("Full Refresh Every"),
        Cell::new(format!("{} days", config.sync.full_refresh_days)),
    ]);
    sync.add_row(vec![Cell::new("Sources"), Cell::new(sources)]);
    sync.add_row(vec![Cell::new("Movies List"), Cell::new(check_mark(config.sync.lists.movies))]);
    sync.add_row(vec![Cell::new("Shows List"), Cell::new(check_mark(config.sync.lists.shows))]);

    let mut other = section("Daemon & Logging");
    other.add_row(vec![Cell::new("Interval"), Cell::new(&config.daemon.interval)]);
    other.add_row(vec![Cell::new("Log Level"), Cell::new(&config.logging.level)]);
    other.add_row(vec![
        Cell::new("Log Format"),
        Cell::new(config.logging.format.as_deref().unwrap_or("auto")),
    ]);
    other.add_row(vec![
        Cell::new("Log File"),
        Cell::new(
            config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stderr".to_string()),
        ),
    ]);

    output.blank();
    output.info(format!("{} {}", "Config file:".bold(), ctx.config_path.display()));
    for table in [&trakt, &sync, &other] {
        output.blank();
        output.table(table);
    }
    output.blank();
    Ok(ExitCode::SUCCESS)
}

async fn configure_trakt(
    ctx: &mut AppContext,
    client_id_arg: Option<String>,
    client_secret_arg: Option<String>,
    username_arg: Option<String>,
    output: &Output,
) -> Result<ExitCode> {
    if output.is_human() {
        print_section_header("Trakt API Setup", output);
        output.info("Follow the instructions to set up your Trakt API application:");
        for (idx, item) in [
            "Log in to Trakt and open your API apps page: https://trakt.tv/oauth/applications",
            "Create a new API application named 'trakt-sync'",
            "Use 'urn:ietf:wg:oauth:2.0:oob' as the Redirect URI",
        ]
        .iter()
        .enumerate()
        {
            output.info(format!("  {}. {}", idx + 1, item));
        }
        output.blank();
    }

    let current = ctx.config.trakt.clone();
    let client_id = match client_id_arg {
        Some(id) => id,
        None => prompts::prompt_validated("Trakt Client ID", Some(&current.client_id), validate_client_id)?,
    };
    let client_secret = match client_secret_arg {
        Some(secret) => secret,
        None => prompts::prompt_secret("Trakt Client Secret", current.client_secret.is_empty())?,
    };
    let username = match username_arg {
        Some(name) => name,
        None => prompts::prompt_validated("Trakt Username", Some(&current.username), validate_username)?,
    };

    let invalid = |field: &str, e: &str| PreconditionFailed::new(format!("Invalid {}: {}", field, e));
    validate_client_id(&client_id).map_err(|e| invalid("client_id", e))?;
    validate_client_secret(&client_secret).map_err(|e| invalid("client_secret", e))?;
    validate_username(&username).map_err(|e| invalid("username", e))?;

    // new app credentials invalidate any stored tokens
    if client_id != current.client_id {
        ctx.credentials.clear_trakt_tokens();
    }
    ctx.config.trakt.client_id = client_id;
    ctx.config.trakt.client_secret = client_secret;
    ctx.config.trakt.username = username;
    ctx.config
        .save_to_file(&ctx.config_path)
        .map_err(|e| eyre!("Failed to save config to {}: {}", ctx.config_path.display(), e))?;
    output.success(format!("Saved Trakt settings to {}", ctx.config_path.display()));

    auth::run_auth(ctx, output).await
}

/// Show the first and last two characters of a secret.
fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

fn validate_client_id(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("Client ID cannot be empty");
    }
    if input.len() < 10 {
        return Err("Client ID seems too short. Please verify it's correct.");
    }
    Ok(())
}

fn validate_client_secret(input: &str) -> Result<(), &'static str> {
    if input.trim().is_empty() {
        return Err("Client Secret cannot be empty");
    }
    Ok(())
}

fn validate_username(input: &str) -> Result<(), &'static str> {
    if input.is_empty() {
        return Err("Username cannot be empty");
    }
    if input.contains(char::is_whitespace) || input.contains('/') {
        return Err("Username must be the Trakt profile slug, without spaces or slashes");
    }
    Ok(())
}

fn print_section_header(title: &str, output: &Output) {
    output.blank();
    output.info(format!("{}", title.bold().bright_cyan()));
    output.info(format!("{}", "─".repeat(title.len()).bright_cyan()));
}
