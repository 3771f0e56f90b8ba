use crate::diff::{compute_diff, SyncMode};
use crate::refresh::{should_full_refresh, SyncState};
use crate::targets::fetch_target_set;
use chrono::{DateTime, Utc};
use list_sync_models::{Category, ListItem, ListPrivacy, ManagedList, MediaKind};
use list_sync_sources::{ApiError, ListService};
use serde::Serialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

/// Settings shared by every list in a pass.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// Trakt user owning the managed lists
    pub owner: String,
    pub limit: u32,
    pub min_rating: u8,
    pub privacy: ListPrivacy,
    pub full_refresh_days: i64,
    pub categories: Vec<Category>,
    /// Compute and report without writing to Trakt or stamping state
    pub dry_run: bool,
    /// Treat every list as due for a full refresh
    pub force_full_refresh: bool,
}

/// Step at which a list sync stopped.
#[derive(Debug, Error)]
pub enum ListSyncError {
    #[error("failed to ensure list exists: {0}")]
    EnsureList(#[source] ApiError),

    #[error("failed to fetch {category} items: {source}")]
    FetchTarget {
        category: Category,
        #[source]
        source: ApiError,
    },

    #[error("failed to get current list items: {0}")]
    FetchCurrent(#[source] ApiError),

    #[error("failed to remove items: {0}")]
    Remove(#[source] ApiError),

    #[error("failed to add items: {0}")]
    Add(#[source] ApiError),
}

impl ListSyncError {
    pub fn api_error(&self) -> &ApiError {
        match self {
            ListSyncError::EnsureList(e)
            | ListSyncError::FetchCurrent(e)
            | ListSyncError::Remove(e)
            | ListSyncError::Add(e) => e,
            ListSyncError::FetchTarget { source, .. } => source,
        }
    }
}

/// Counts for one successfully synced list.
#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    pub slug: String,
    pub kind: MediaKind,
    pub mode: SyncMode,
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct ListFailure {
    pub slug: String,
    pub kind: MediaKind,
    pub error: ListSyncError,
}

/// Overall classification of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// No list was enabled
    NoOp,
    Success,
    PartialFailure,
    TotalFailure,
}

impl SyncOutcome {
    pub fn classify(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (0, 0) => SyncOutcome::NoOp,
            (_, 0) => SyncOutcome::Success,
            (0, _) => SyncOutcome::TotalFailure,
            _ => SyncOutcome::PartialFailure,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            SyncOutcome::NoOp | SyncOutcome::Success => 0,
            SyncOutcome::PartialFailure => 1,
            SyncOutcome::TotalFailure => 2,
        }
    }
}

/// Result of syncing every enabled list.
#[derive(Debug)]
pub struct SyncReport {
    pub lists: Vec<ListReport>,
    pub failures: Vec<ListFailure>,
    /// Full-refresh stamps after the pass
    pub state: SyncState,
    /// `state` differs from what was passed in and should be persisted
    pub state_changed: bool,
    pub duration: Duration,
}

impl SyncReport {
    pub fn total(&self) -> usize {
        self.lists.len() + self.failures.len()
    }

    pub fn outcome(&self) -> SyncOutcome {
        SyncOutcome::classify(self.lists.len(), self.failures.len())
    }
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Reconciles managed lists against Trakt's rankings, one list at a time.
pub struct ListSyncer<'a, S: ListService + ?Sized> {
    service: &'a S,
    settings: &'a SyncSettings,
}

impl<'a, S: ListService + ?Sized> ListSyncer<'a, S> {
    pub fn new(service: &'a S, settings: &'a SyncSettings) -> Self {
        Self { service, settings }
    }

    /// Sync every list in order. A failing list is recorded and the rest
    /// still run.
    #[instrument(skip_all, fields(lists = lists.len(), dry_run = self.settings.dry_run))]
    pub async fn sync_all(&self, lists: &[ManagedList], mut state: SyncState) -> SyncReport {
        let start = Instant::now();
        let initial_state = state;
        let mut reports = Vec::new();
        let mut failures = Vec::new();

        if lists.is_empty() {
            warn!("No lists enabled for sync");
        } else {
            info!(operation = "sync_start", lists = lists.len(), "Starting sync");
        }

        for list in lists {
            match self.sync_list(list, &mut state, Utc::now()).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(
                        operation = "list_sync",
                        list = %list.slug,
                        status = "error",
                        error = %e,
                        "Failed to sync list"
                    );
                    failures.push(ListFailure {
                        slug: list.slug.clone(),
                        kind: list.kind,
                        error: e,
                    });
                }
            }
        }

        let report = SyncReport {
            lists: reports,
            failures,
            state,
            state_changed: state != initial_state,
            duration: start.elapsed(),
        };

        if report.total() > 0 {
            info!(
                operation = "sync_complete",
                successful = report.lists.len(),
                failed = report.failures.len(),
                total = report.total(),
                duration_ms = report.duration.as_millis() as u64,
                "Sync complete"
            );
        }
        report
    }

    /// Ensure, fetch, diff, then remove before add.
    #[instrument(skip(self, list, state, now), fields(list = %list.slug))]
    pub async fn sync_list(
        &self,
        list: &ManagedList,
        state: &mut SyncState,
        now: DateTime<Utc>,
    ) -> Result<ListReport, ListSyncError> {
        let start = Instant::now();
        let settings = self.settings;
        info!("Starting list sync");

        if !settings.dry_run {
            self.service
                .ensure_list_exists(&settings.owner, list, settings.privacy)
                .await
                .map_err(ListSyncError::EnsureList)?;
        }

        let target = fetch_target_set(
            self.service,
            &settings.categories,
            list.kind,
            settings.limit,
            settings.min_rating,
        )
        .await
        .map_err(|(category, source)| ListSyncError::FetchTarget { category, source })?;
        info!(count = target.len(), "Fetched items from API");

        let current = self.current_items(list).await?;

        let mode = if settings.force_full_refresh
            || should_full_refresh(state.last_full_refresh(list.kind), settings.full_refresh_days, now)
        {
            SyncMode::FullRefresh
        } else {
            SyncMode::Incremental
        };
        let diff = compute_diff(&current, &target, mode);
        debug!(mode = ?mode, current = current.len(), "Computed list diff");

        if !settings.dry_run {
            if !diff.to_remove.is_empty() {
                self.service
                    .remove_items(&settings.owner, &list.slug, &diff.to_remove, list.kind)
                    .await
                    .map_err(ListSyncError::Remove)?;
            }
            if !diff.to_add.is_empty() {
                self.service
                    .add_items(&settings.owner, &list.slug, &diff.to_add, list.kind)
                    .await
                    .map_err(ListSyncError::Add)?;
            }
            if mode == SyncMode::FullRefresh {
                state.mark_full_refresh(list.kind, now);
            }
        }

        let report = ListReport {
            slug: list.slug.clone(),
            kind: list.kind,
            mode,
            added: diff.to_add.len(),
            removed: diff.to_remove.len(),
            unchanged: diff.unchanged,
            duration: start.elapsed(),
            dry_run: settings.dry_run,
        };

        info!(
            full_refresh = mode == SyncMode::FullRefresh,
            added = report.added,
            removed = report.removed,
            unchanged = report.unchanged,
            duration_ms = report.duration.as_millis() as u64,
            dry_run = settings.dry_run,
            "List sync complete"
        );
        Ok(report)
    }

    async fn current_items(&self, list: &ManagedList) -> Result<Vec<ListItem>, ListSyncError> {
        match self.service.get_all_items(&self.settings.owner, &list.slug).await {
            Ok(items) => Ok(items),
            // a dry run does not create the list, so it may not exist yet
            Err(e) if self.settings.dry_run && e.is_not_found() => Ok(Vec::new()),
            Err(e) => Err(ListSyncError::FetchCurrent(e)),
        }
    }
}
