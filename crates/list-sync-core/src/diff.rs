// Diff computation between a list's current items and its target set

use list_sync_models::{unique_ids, ListItem, MediaIds};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// How a list is reconciled in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Only touch items that entered or left the target set
    Incremental,
    /// Remove everything, then add the whole target set
    FullRefresh,
}

/// Changes needed to turn the current list into the target set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListDiff {
    /// Target order
    pub to_add: Vec<MediaIds>,
    /// Current list order
    pub to_remove: Vec<MediaIds>,
    pub unchanged: usize,
}

impl ListDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// IDs of every current item we can identify, duplicates dropped.
fn current_ids(current: &[ListItem]) -> Vec<MediaIds> {
    unique_ids(current.iter().filter_map(ListItem::ids).cloned())
}

/// Incremental diff keyed on the Trakt ID.
///
/// Entries without an identity (episodes, seasons, people) are ignored and
/// never removed.
pub fn calculate_diff(current: &[ListItem], target: &[MediaIds]) -> ListDiff {
    let current = current_ids(current);
    let current_set: HashSet<u64> = current.iter().map(|ids| ids.trakt).collect();
    let target_set: HashSet<u64> = target.iter().map(|ids| ids.trakt).collect();

    let to_add: Vec<MediaIds> = unique_ids(
        target
            .iter()
            .filter(|ids| !current_set.contains(&ids.trakt))
            .cloned(),
    );
    let to_remove: Vec<MediaIds> = current
        .iter()
        .filter(|ids| !target_set.contains(&ids.trakt))
        .cloned()
        .collect();
    let unchanged = current_set.intersection(&target_set).count();

    debug!(
        current = current_set.len(),
        target = target_set.len(),
        to_add = to_add.len(),
        to_remove = to_remove.len(),
        unchanged,
        "Calculated incremental diff"
    );

    ListDiff {
        to_add,
        to_remove,
        unchanged,
    }
}

/// Remove-all/add-all diff used to correct drift.
pub fn full_refresh_diff(current: &[ListItem], target: &[MediaIds]) -> ListDiff {
    ListDiff {
        to_add: unique_ids(target.iter().cloned()),
        to_remove: current_ids(current),
        unchanged: 0,
    }
}

pub fn compute_diff(current: &[ListItem], target: &[MediaIds], mode: SyncMode) -> ListDiff {
    match mode {
        SyncMode::Incremental => calculate_diff(current, target),
        SyncMode::FullRefresh => full_refresh_diff(current, target),
    }
}

#[cfg(test)]
mod tests;
