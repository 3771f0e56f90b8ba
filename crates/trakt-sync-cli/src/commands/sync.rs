use super::{AppContext, PreconditionFailed};
use crate::output::{styled_table, Output};
use color_eyre::Result;
use comfy_table::{Attribute, Cell, Color};
use list_sync_config::Config;
use list_sync_core::{ListSyncer, SyncMode, SyncOutcome, SyncReport, SyncSettings};
use list_sync_models::ManagedList;
use serde_json::json;
use std::process::ExitCode;
use tracing::{debug, info};

/// What a single pass should do beyond the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct PassOptions {
    /// Restrict the pass to these slugs
    pub lists: Option<Vec<String>>,
    pub full_refresh: bool,
    pub dry_run: bool,
}

/// Managed lists enabled in `config`, optionally narrowed to `filter`.
pub fn select_lists(config: &Config, filter: Option<&[String]>) -> Result<Vec<ManagedList>, String> {
    let enabled: Vec<ManagedList> = config
        .sync
        .lists
        .enabled_kinds()
        .into_iter()
        .map(|kind| ManagedList::for_kind(kind, &config.sync.sources, config.sync.limit))
        .collect();

    let Some(filter) = filter else {
        return Ok(enabled);
    };

    for slug in filter {
        if !enabled.iter().any(|list| &list.slug == slug) {
            let known = [ManagedList::MOVIES_SLUG, ManagedList::SHOWS_SLUG];
            return Err(if known.contains(&slug.as_str()) {
                format!("List '{}' is disabled in the config", slug)
            } else {
                format!("Unknown list '{}' (expected one of: {})", slug, known.join(", "))
            });
        }
    }
    Ok(enabled
        .into_iter()
        .filter(|list| filter.contains(&list.slug))
        .collect())
}

pub fn sync_settings(config: &Config, options: &PassOptions) -> SyncSettings {
    SyncSettings {
        owner: config.trakt.username.clone(),
        limit: config.sync.limit,
        min_rating: config.sync.min_rating,
        privacy: config.sync.list_privacy,
        full_refresh_days: config.sync.full_refresh_days,
        categories: config.sync.sources.clone(),
        dry_run: options.dry_run,
        force_full_refresh: options.full_refresh,
    }
}

/// One full pass: authenticate, reconcile every selected list, persist the
/// refresh stamps.
pub async fn run_pass(ctx: &mut AppContext, options: &PassOptions) -> Result<SyncReport> {
    ctx.require_valid_config()?;
    let lists = select_lists(&ctx.config, options.lists.as_deref()).map_err(PreconditionFailed::new)?;
    let client = ctx.authenticated_client().await?;
    let settings = sync_settings(&ctx.config, options);
    debug!(?settings, "Sync settings");

    let report = ListSyncer::new(&client, &settings)
        .sync_all(&lists, ctx.sync_state())
        .await;

    if report.state_changed {
        info!(operation = "persist_state", "Saving full refresh timestamps");
        ctx.store_sync_state(&report.state);
    }
    Ok(report)
}

pub async fn run_sync(ctx: &mut AppContext, options: &PassOptions, output: &Output) -> Result<ExitCode> {
    let report = run_pass(ctx, options).await?;
    print_report(&report, options.dry_run, output);
    Ok(ExitCode::from(report.outcome().exit_code()))
}

fn mode_label(mode: SyncMode) -> &'static str {
    match mode {
        SyncMode::Incremental => "incremental",
        SyncMode::FullRefresh => "full refresh",
    }
}

pub fn report_json(report: &SyncReport, dry_run: bool) -> serde_json::Value {
    let failures: Vec<_> = report
        .failures
        .iter()
        .map(|failure| {
            json!({
                "slug": failure.slug,
                "kind": failure.kind,
                "error": failure.error.to_string(),
            })
        })
        .collect();

    json!({
        "outcome": report.outcome(),
        "dry_run": dry_run,
        "successful": report.lists.len(),
        "failed": report.failures.len(),
        "total": report.total(),
        "duration_ms": report.duration.as_millis() as u64,
        "lists": report.lists,
        "failures": failures,
    })
}

pub fn print_report(report: &SyncReport, dry_run: bool, output: &Output) {
    if !output.is_human() {
        output.json(&report_json(report, dry_run));
        return;
    }

    if report.outcome() == SyncOutcome::NoOp {
        output.warn("No lists enabled. Enable sync.lists.movies or sync.lists.shows in the config.");
        return;
    }

    if !report.lists.is_empty() {
        let mut table = styled_table();
        table.set_header(vec![
            Cell::new("List").add_attribute(Attribute::Bold),
            Cell::new("Mode").add_attribute(Attribute::Bold),
            Cell::new("Added").add_attribute(Attribute::Bold),
            Cell::new("Removed").add_attribute(Attribute::Bold),
            Cell::new("Unchanged").add_attribute(Attribute::Bold),
            Cell::new("Duration").add_attribute(Attribute::Bold),
        ]);
        for list in &report.lists {
            table.add_row(vec![
                Cell::new(&list.slug).fg(Color::Cyan),
                Cell::new(mode_label(list.mode)),
                Cell::new(list.added).fg(Color::Green),
                Cell::new(list.removed).fg(Color::Red),
                Cell::new(list.unchanged),
                Cell::new(format!("{:.1}s", list.duration.as_secs_f64())),
            ]);
        }
        output.table(&table);
    }

    for failure in &report.failures {
        output.error(format!("{}: {}", failure.slug, failure.error));
    }

    let summary = format!(
        "{} of {} lists synced in {:.1}s{}",
        report.lists.len(),
        report.total(),
        report.duration.as_secs_f64(),
        if dry_run { " (dry run, nothing written)" } else { "" }
    );
    match report.outcome() {
        SyncOutcome::Success => output.success(summary),
        SyncOutcome::PartialFailure => output.warn(summary),
        _ => output.error(summary),
    }
}
