pub mod diff;
pub mod refresh;
pub mod sync;
pub mod targets;

#[cfg(test)]
mod fake;

pub use diff::{calculate_diff, compute_diff, full_refresh_diff, ListDiff, SyncMode};
pub use refresh::{effective_refresh_days, should_full_refresh, SyncState, DEFAULT_FULL_REFRESH_DAYS};
pub use sync::{
    ListFailure, ListReport, ListSyncError, ListSyncer, SyncOutcome, SyncReport, SyncSettings,
};
pub use targets::fetch_target_set;
