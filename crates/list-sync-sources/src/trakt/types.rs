//! Wire types for the Trakt endpoints this crate talks to.

use list_sync_models::{Media, MediaIds, MediaKind};
use serde::{Deserialize, Serialize};

/// Entry of a ranked endpoint.
///
/// Trending and most-watched wrap the media next to a metric (`watchers`,
/// `watcher_count`, ...). Popular returns the media itself.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RankedEntry {
    Movie { movie: Media },
    Show { show: Media },
    Bare(Media),
}

impl RankedEntry {
    pub(crate) fn into_media(self) -> Media {
        match self {
            RankedEntry::Movie { movie } => movie,
            RankedEntry::Show { show } => show,
            RankedEntry::Bare(media) => media,
        }
    }
}

/// List metadata as returned by `GET /users/{owner}/lists/{slug}`.
#[derive(Debug, Clone, Deserialize)]
pub struct TraktList {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub privacy: Option<String>,
    #[serde(default)]
    pub item_count: u32,
    pub ids: TraktListIds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraktListIds {
    pub trakt: u64,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateListRequest<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub description: &'a str,
    pub privacy: &'a str,
    pub display_numbers: bool,
    pub allow_comments: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct IdsEntry<'a> {
    pub ids: &'a MediaIds,
}

/// Body of the add and remove item calls.
#[derive(Debug, Default, Serialize)]
pub(crate) struct ListItemsRequest<'a> {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub movies: Vec<IdsEntry<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shows: Vec<IdsEntry<'a>>,
}

impl<'a> ListItemsRequest<'a> {
    pub(crate) fn new(ids: &'a [MediaIds], kind: MediaKind) -> Self {
        let entries = ids.iter().map(|ids| IdsEntry { ids }).collect();
        match kind {
            MediaKind::Movie => Self {
                movies: entries,
                ..Self::default()
            },
            MediaKind::Show => Self {
                shows: entries,
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ItemCounts {
    #[serde(default)]
    pub movies: u32,
    #[serde(default)]
    pub shows: u32,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct NotFound {
    #[serde(default)]
    pub movies: Vec<serde_json::Value>,
    #[serde(default)]
    pub shows: Vec<serde_json::Value>,
}

/// Response of the add and remove item calls.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListItemsResponse {
    #[serde(default)]
    pub added: ItemCounts,
    #[serde(default)]
    pub deleted: ItemCounts,
    #[serde(default)]
    pub existing: ItemCounts,
    #[serde(default)]
    pub not_found: NotFound,
}

impl ListItemsResponse {
    pub(crate) fn not_found_count(&self) -> usize {
        self.not_found.movies.len() + self.not_found.shows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ranked_entry_variants() {
        let trending: RankedEntry = serde_json::from_value(json!({
            "watchers": 120,
            "movie": {"title": "Anora", "year": 2024, "ids": {"trakt": 1, "slug": "anora-2024"}}
        }))
        .unwrap();
        let watched: RankedEntry = serde_json::from_value(json!({
            "watcher_count": 9, "play_count": 14, "collected_count": 2,
            "show": {"title": "The Bear", "year": 2022, "ids": {"trakt": 2, "slug": "the-bear"}}
        }))
        .unwrap();
        let popular: RankedEntry = serde_json::from_value(json!({
            "title": "Heat", "year": 1995, "ids": {"trakt": 3, "slug": "heat-1995"}
        }))
        .unwrap();

        assert_eq!(trending.into_media().ids.trakt, 1);
        assert_eq!(watched.into_media().title, "The Bear");
        assert_eq!(popular.into_media().ids.trakt, 3);
    }

    #[test]
    fn test_items_request_partitions_by_kind() {
        let ids = vec![MediaIds::new(5, "five"), MediaIds::new(6, "six")];
        let body = serde_json::to_value(ListItemsRequest::new(&ids, MediaKind::Show)).unwrap();

        assert_eq!(
            body,
            json!({"shows": [{"ids": {"trakt": 5, "slug": "five"}}, {"ids": {"trakt": 6, "slug": "six"}}]})
        );
    }

    #[test]
    fn test_items_response_tolerates_partial_body() {
        let response: ListItemsResponse = serde_json::from_value(json!({
            "added": {"movies": 2},
            "not_found": {"movies": [{"ids": {"trakt": 99}}]}
        }))
        .unwrap();

        assert_eq!(response.added.movies, 2);
        assert_eq!(response.added.shows, 0);
        assert_eq!(response.not_found_count(), 1);
    }
}
