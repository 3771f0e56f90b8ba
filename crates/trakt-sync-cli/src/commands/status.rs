use super::AppContext;
use crate::output::{check_mark, styled_table, Output};
use chrono::{DateTime, Utc};
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color};
use list_sync_core::{effective_refresh_days, should_full_refresh};
use list_sync_models::{ManagedList, MediaKind};
use owo_colors::OwoColorize;
use serde_json::json;
use std::process::ExitCode;

fn format_timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "never".to_string())
}

pub fn run_status(ctx: &AppContext, output: &Output) -> Result<ExitCode> {
    let config = &ctx.config;
    let credentials = &ctx.credentials;
    let now = Utc::now();
    let state = ctx.sync_state();
    let refresh_days = effective_refresh_days(config.sync.full_refresh_days);
    let config_problem = config.validate().err().map(|e| e.to_string());

    let lists: Vec<(ManagedList, bool)> = [MediaKind::Movie, MediaKind::Show]
        .into_iter()
        .map(|kind| {
            (
                ManagedList::for_kind(kind, &config.sync.sources, config.sync.limit),
                config.sync.lists.is_enabled(kind),
            )
        })
        .collect();

    if !output.is_human() {
        let lists_json: Vec<_> = lists
            .iter()
            .map(|(list, enabled)| {
                let last = state.last_full_refresh(list.kind);
                json!({
                    "slug": list.slug,
                    "kind": list.kind,
                    "enabled": enabled,
                    "last_full_refresh": last.map(|at| at.to_rfc3339()),
                    "full_refresh_due": should_full_refresh(last, refresh_days, now),
                })
            })
            .collect();

        output.json(&json!({
            "config_file": ctx.config_path.display().to_string(),
            "config_valid": config_problem.is_none(),
            "config_error": config_problem,
            "username": config.trakt.username,
            "authenticated": credentials.is_authenticated(),
            "token_expires_at": credentials.get_trakt_token_expires().map(|at| at.to_rfc3339()),
            "needs_refresh": credentials.needs_refresh(now),
            "limit": config.sync.limit,
            "min_rating": config.sync.min_rating,
            "privacy": config.sync.list_privacy,
            "sources": config.sync.sources,
            "full_refresh_days": refresh_days,
            "lists": lists_json,
        }));
        return Ok(ExitCode::SUCCESS);
    }

    let mut general = styled_table();
    general.set_header(vec![
        Cell::new("trakt-sync status").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);
    general.add_row(vec![Cell::new("Config File"), Cell::new(ctx.config_path.display())]);
    general.add_row(vec![
        Cell::new("Config Valid"),
        Cell::new(match &config_problem {
            None => check_mark(true),
            Some(problem) => format!("{} {}", check_mark(false), problem),
        }),
    ]);
    general.add_row(vec![
        Cell::new("Username"),
        Cell::new(if config.trakt.username.is_empty() {
            "<not set>".bright_black().to_string()
        } else {
            config.trakt.username.clone()
        }),
    ]);
    general.add_row(vec![Cell::new("Authenticated"), Cell::new(check_mark(credentials.is_authenticated()))]);
    general.add_row(vec![
        Cell::new("Token Expires"),
        Cell::new(format_timestamp(credentials.get_trakt_token_expires())),
    ]);
    general.add_row(vec![Cell::new("Needs Refresh"), Cell::new(check_mark(credentials.needs_refresh(now)))]);
    general.add_row(vec![Cell::new("Limit"), Cell::new(config.sync.limit)]);
    general.add_row(vec![Cell::new("Min Rating"), Cell::new(config.sync.min_rating)]);
    general.add_row(vec![Cell::new("Privacy"), Cell::new(config.sync.list_privacy)]);
    general.add_row(vec![
        Cell::new("Full Refresh Every"),
        Cell::new(format!("{} days", refresh_days)),
    ]);
    output.blank();
    output.table(&general);

    let mut lists_table = styled_table();
    lists_table.set_header(vec![
        Cell::new("List").add_attribute(Attribute::Bold),
        Cell::new("Enabled").add_attribute(Attribute::Bold),
        Cell::new("Last Full Refresh").add_attribute(Attribute::Bold),
        Cell::new("Due").add_attribute(Attribute::Bold),
    ]);
    for (list, enabled) in &lists {
        let last = state.last_full_refresh(list.kind);
        lists_table.add_row(vec![
            Cell::new(&list.slug).fg(Color::Cyan),
            Cell::new(check_mark(*enabled)),
            Cell::new(format_timestamp(last)),
            Cell::new(check_mark(should_full_refresh(last, refresh_days, now))),
        ]);
    }
    output.blank();
    output.table(&lists_table);
    output.blank();

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_timestamp(Some(at)), "2025-01-02 03:04 UTC");
        assert_eq!(format_timestamp(None), "never");
    }
}
