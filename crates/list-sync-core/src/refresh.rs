use chrono::{DateTime, Duration, Utc};
use list_sync_models::MediaKind;

/// Cadence used when the configured one is zero or negative.
pub const DEFAULT_FULL_REFRESH_DAYS: i64 = 7;

pub fn effective_refresh_days(configured: i64) -> i64 {
    if configured <= 0 {
        DEFAULT_FULL_REFRESH_DAYS
    } else {
        configured
    }
}

/// Whether a list kind is due for a full refresh.
pub fn should_full_refresh(last: Option<DateTime<Utc>>, interval_days: i64, now: DateTime<Utc>) -> bool {
    let Some(last) = last else {
        return true;
    };
    match Duration::try_days(effective_refresh_days(interval_days)) {
        Some(interval) => now.signed_duration_since(last) >= interval,
        None => false,
    }
}

/// Last full refresh per list kind. The caller loads and persists it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    pub movies: Option<DateTime<Utc>>,
    pub shows: Option<DateTime<Utc>>,
}

impl SyncState {
    pub fn last_full_refresh(&self, kind: MediaKind) -> Option<DateTime<Utc>> {
        match kind {
            MediaKind::Movie => self.movies,
            MediaKind::Show => self.shows,
        }
    }

    pub fn mark_full_refresh(&mut self, kind: MediaKind, at: DateTime<Utc>) {
        match kind {
            MediaKind::Movie => self.movies = Some(at),
            MediaKind::Show => self.shows = Some(at),
        }
    }
}
