use list_sync_models::{unique_ids, Category, MediaIds, MediaKind};
use list_sync_sources::{ApiError, ListService};
use tracing::debug;

/// Fetch every category for `kind` and merge them in category order,
/// keeping the first occurrence of each Trakt ID.
pub async fn fetch_target_set<S>(
    service: &S,
    categories: &[Category],
    kind: MediaKind,
    limit: u32,
    min_rating: u8,
) -> Result<Vec<MediaIds>, (Category, ApiError)>
where
    S: ListService + ?Sized,
{
    let mut combined = Vec::new();
    for category in categories {
        let ids = service
            .fetch_ranked(*category, kind, limit, min_rating)
            .await
            .map_err(|e| (*category, e))?;
        debug!(category = %category, kind = %kind, count = ids.len(), "Fetched ranked items");
        combined.extend(ids);
    }
    Ok(unique_ids(combined))
}
