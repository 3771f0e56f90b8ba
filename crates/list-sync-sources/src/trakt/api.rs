use crate::error::ApiError;
use crate::trakt::client::TraktClient;
use crate::trakt::types::{CreateListRequest, ListItemsRequest, ListItemsResponse, RankedEntry, TraktList};
use list_sync_models::{Category, ListItem, ListPrivacy, ManagedList, MediaIds, MediaKind};
use tracing::{debug, info, warn};

/// Page size used when reading list items.
pub const ITEMS_PAGE_LIMIT: u32 = 100;

/// Path of a ranked endpoint with its query string.
pub fn ranked_path(category: Category, kind: MediaKind, limit: u32, min_rating: u8) -> String {
    let mut path = format!("/{}/{}?limit={}", kind.plural(), category.path_segment(), limit);
    if min_rating > 0 {
        path.push_str(&format!("&ratings={}-100", min_rating));
    }
    path
}

fn list_path(owner: &str, slug: &str) -> String {
    format!(
        "/users/{}/lists/{}",
        urlencoding::encode(owner),
        urlencoding::encode(slug)
    )
}

impl TraktClient {
    /// Top-ranked movies or shows for one category, in server rank order.
    pub async fn fetch_ranked(
        &self,
        category: Category,
        kind: MediaKind,
        limit: u32,
        min_rating: u8,
    ) -> Result<Vec<MediaIds>, ApiError> {
        let path = ranked_path(category, kind, limit, min_rating);
        let entries: Vec<RankedEntry> = self.get_json(&path).await?;

        debug!(
            category = %category,
            kind = %kind,
            count = entries.len(),
            "Fetched ranked {}",
            kind.plural()
        );

        Ok(entries
            .into_iter()
            .map(|entry| entry.into_media().ids)
            .collect())
    }

    pub async fn get_list(&self, owner: &str, slug: &str) -> Result<TraktList, ApiError> {
        self.get_json(&list_path(owner, slug)).await
    }

    /// Create the list unless it already exists. Only a 404 triggers creation.
    pub async fn ensure_list_exists(
        &self,
        owner: &str,
        list: &ManagedList,
        privacy: ListPrivacy,
    ) -> Result<(), ApiError> {
        match self.get_list(owner, &list.slug).await {
            Ok(existing) => {
                debug!(
                    list = %list.slug,
                    items = existing.item_count,
                    "List already exists"
                );
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                let request = CreateListRequest {
                    name: &list.name,
                    description: &list.description,
                    privacy: privacy.as_str(),
                    display_numbers: true,
                    allow_comments: false,
                };
                let path = format!("/users/{}/lists", urlencoding::encode(owner));
                self.post(&path, &request).await?;
                info!(list = %list.slug, privacy = %privacy, "Created list");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Every item of a list, following `X-Pagination-Page-Count`.
    pub async fn get_all_items(&self, owner: &str, slug: &str) -> Result<Vec<ListItem>, ApiError> {
        let base = format!("{}/items", list_path(owner, slug));
        let mut all_items = Vec::new();
        let mut page = 1;

        loop {
            let path = format!("{}?page={}&limit={}", base, page, ITEMS_PAGE_LIMIT);
            let response = self.get(&path).await?;
            let items: Vec<ListItem> = response.json()?;
            let total_pages = response.page_count();

            debug!(
                list = slug,
                page,
                total_pages = total_pages.unwrap_or(0),
                items_on_page = items.len(),
                "Fetched list page"
            );
            all_items.extend(items);

            match total_pages {
                Some(total) if page < total => page += 1,
                _ => break,
            }
        }

        Ok(all_items)
    }

    pub async fn add_items(
        &self,
        owner: &str,
        slug: &str,
        ids: &[MediaIds],
        kind: MediaKind,
    ) -> Result<(), ApiError> {
        let path = format!("{}/items", list_path(owner, slug));
        let response: ListItemsResponse = self
            .post(&path, &ListItemsRequest::new(ids, kind))
            .await?
            .json()
            .unwrap_or_default();

        let added = match kind {
            MediaKind::Movie => response.added.movies,
            MediaKind::Show => response.added.shows,
        };
        let existing = match kind {
            MediaKind::Movie => response.existing.movies,
            MediaKind::Show => response.existing.shows,
        };
        debug!(list = slug, submitted = ids.len(), added, existing, "Added list items");
        if response.not_found_count() > 0 {
            warn!(
                list = slug,
                not_found = response.not_found_count(),
                "Trakt did not recognize some submitted items"
            );
        }
        Ok(())
    }

    pub async fn remove_items(
        &self,
        owner: &str,
        slug: &str,
        ids: &[MediaIds],
        kind: MediaKind,
    ) -> Result<(), ApiError> {
        let path = format!("{}/items/remove", list_path(owner, slug));
        let response: ListItemsResponse = self
            .post(&path, &ListItemsRequest::new(ids, kind))
            .await?
            .json()
            .unwrap_or_default();

        let deleted = match kind {
            MediaKind::Movie => response.deleted.movies,
            MediaKind::Show => response.deleted.shows,
        };
        debug!(list = slug, submitted = ids.len(), deleted, "Removed list items");
        Ok(())
    }
}
