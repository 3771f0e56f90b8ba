use async_trait::async_trait;
use list_sync_models::{Category, ListItem, ListPrivacy, ManagedList, MediaIds, MediaKind};

use crate::error::ApiError;

/// Remote operations the list syncer needs from Trakt.
#[async_trait]
pub trait ListService: Send + Sync {
    /// Ranked IDs for one category, in server order
    async fn fetch_ranked(
        &self,
        category: Category,
        kind: MediaKind,
        limit: u32,
        min_rating: u8,
    ) -> Result<Vec<MediaIds>, ApiError>;

    /// Create the list if it does not exist yet. Calling it twice is harmless.
    async fn ensure_list_exists(
        &self,
        owner: &str,
        list: &ManagedList,
        privacy: ListPrivacy,
    ) -> Result<(), ApiError>;

    async fn get_all_items(&self, owner: &str, slug: &str) -> Result<Vec<ListItem>, ApiError>;

    // Callers never pass an empty slice to the two calls below.
    async fn add_items(
        &self,
        owner: &str,
        slug: &str,
        ids: &[MediaIds],
        kind: MediaKind,
    ) -> Result<(), ApiError>;

    async fn remove_items(
        &self,
        owner: &str,
        slug: &str,
        ids: &[MediaIds],
        kind: MediaKind,
    ) -> Result<(), ApiError>;
}
