use super::*;
use list_sync_models::{ListEntry, Media};

fn ids(trakt: u64) -> MediaIds {
    MediaIds::new(trakt, format!("item-{}", trakt))
}

fn movie(trakt: u64) -> ListItem {
    ListItem::movie(Media {
        title: format!("Movie {}", trakt),
        year: Some(2024),
        ids: ids(trakt),
    })
}

fn unsupported() -> ListItem {
    ListItem {
        rank: Some(99),
        listed_at: None,
        entry: ListEntry::Unsupported,
    }
}

fn trakt_ids(items: &[MediaIds]) -> Vec<u64> {
    items.iter().map(|ids| ids.trakt).collect()
}

/// Apply a diff to the current list the way Trakt would.
fn apply(current: &[ListItem], diff: &ListDiff) -> Vec<ListItem> {
    let mut result: Vec<ListItem> = current
        .iter()
        .filter(|item| match item.ids() {
            Some(item_ids) => !diff.to_remove.contains(item_ids),
            None => true,
        })
        .cloned()
        .collect();
    result.extend(diff.to_add.iter().map(|ids| movie(ids.trakt)));
    result
}

#[test]
fn test_calculate_diff_basic() {
    let current = vec![movie(1), movie(2)];
    let target = vec![ids(2), ids(3)];

    let diff = calculate_diff(&current, &target);
    assert_eq!(trakt_ids(&diff.to_add), vec![3]);
    assert_eq!(trakt_ids(&diff.to_remove), vec![1]);
    assert_eq!(diff.unchanged, 1);
}

#[test]
fn test_calculate_diff_empty_target_removes_everything() {
    let current = vec![movie(10)];

    let diff = calculate_diff(&current, &[]);
    assert!(diff.to_add.is_empty());
    assert_eq!(trakt_ids(&diff.to_remove), vec![10]);
    assert_eq!(diff.unchanged, 0);
}

#[test]
fn test_calculate_diff_empty_current_adds_in_target_order() {
    let target = vec![ids(5), ids(3), ids(9)];

    let diff = calculate_diff(&[], &target);
    assert_eq!(trakt_ids(&diff.to_add), vec![5, 3, 9]);
    assert!(diff.to_remove.is_empty());
}

#[test]
fn test_calculate_diff_keeps_current_order_for_removals() {
    let current = vec![movie(7), movie(4), movie(1), movie(2)];
    let target = vec![ids(1)];

    let diff = calculate_diff(&current, &target);
    assert_eq!(trakt_ids(&diff.to_remove), vec![7, 4, 2]);
}

#[test]
fn test_calculate_diff_ignores_unidentifiable_items() {
    let current = vec![unsupported(), movie(1)];
    let target = vec![ids(1)];

    let diff = calculate_diff(&current, &target);
    assert!(diff.is_empty());
    assert_eq!(diff.unchanged, 1);
}

#[test]
fn test_calculate_diff_duplicates_in_current_counted_once() {
    let current = vec![movie(1), movie(1), movie(2)];
    let target = vec![ids(1), ids(3)];

    let diff = calculate_diff(&current, &target);
    assert_eq!(diff.unchanged, 1);
    assert_eq!(trakt_ids(&diff.to_remove), vec![2]);
    assert_eq!(trakt_ids(&diff.to_add), vec![3]);
}

#[test]
fn test_calculate_diff_sets_are_disjoint() {
    let current = vec![movie(1), movie(2), movie(3), movie(4)];
    let target = vec![ids(3), ids(4), ids(5), ids(6)];

    let diff = calculate_diff(&current, &target);
    let current_ids: Vec<u64> = current.iter().filter_map(|i| i.ids()).map(|i| i.trakt).collect();
    let target_ids = trakt_ids(&target);

    assert!(diff.to_add.iter().all(|ids| !current_ids.contains(&ids.trakt)));
    assert!(diff.to_remove.iter().all(|ids| !target_ids.contains(&ids.trakt)));
}

#[test]
fn test_calculate_diff_is_idempotent() {
    let current = vec![movie(1), movie(2), movie(8)];
    let target = vec![ids(2), ids(3), ids(4)];

    let first = calculate_diff(&current, &target);
    let applied = apply(&current, &first);
    let second = calculate_diff(&applied, &target);

    assert!(second.is_empty());
    assert_eq!(second.unchanged, 3);
}

#[test]
fn test_full_refresh_replaces_everything() {
    let current = vec![movie(1), movie(2), unsupported()];
    let target = vec![ids(2), ids(3), ids(2)];

    let diff = full_refresh_diff(&current, &target);
    assert_eq!(trakt_ids(&diff.to_remove), vec![1, 2]);
    assert_eq!(trakt_ids(&diff.to_add), vec![2, 3]);
    assert_eq!(diff.unchanged, 0);
}

#[test]
fn test_compute_diff_dispatches_on_mode() {
    let current = vec![movie(1)];
    let target = vec![ids(1)];

    assert!(compute_diff(&current, &target, SyncMode::Incremental).is_empty());
    let full = compute_diff(&current, &target, SyncMode::FullRefresh);
    assert_eq!(trakt_ids(&full.to_remove), vec![1]);
    assert_eq!(trakt_ids(&full.to_add), vec![1]);
}
