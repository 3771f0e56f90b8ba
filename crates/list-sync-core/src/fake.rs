//! In-memory `ListService` for syncer tests.

use async_trait::async_trait;
use list_sync_models::{Category, ListItem, ListPrivacy, ManagedList, Media, MediaIds, MediaKind};
use list_sync_sources::{ApiError, HttpFailure, ListService};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Add(String, Vec<u64>),
    Remove(String, Vec<u64>),
}

#[derive(Default)]
struct State {
    lists: HashMap<String, Vec<ListItem>>,
    created: Vec<String>,
    writes: Vec<Call>,
}

#[derive(Default)]
pub struct FakeListService {
    ranked: HashMap<(Category, MediaKind), Vec<MediaIds>>,
    fail_ranked: HashMap<Category, ApiError>,
    fail_kind: HashMap<MediaKind, ApiError>,
    fail_ensure: Option<ApiError>,
    fail_remove: Option<ApiError>,
    state: Mutex<State>,
}

fn media_ids(trakt: u64) -> MediaIds {
    MediaIds::new(trakt, format!("title-{}", trakt))
}

fn item(kind: MediaKind, ids: MediaIds) -> ListItem {
    let media = Media {
        title: ids.slug.clone(),
        year: None,
        ids,
    };
    match kind {
        MediaKind::Movie => ListItem::movie(media),
        MediaKind::Show => ListItem::show(media),
    }
}

// ApiError is not Clone, so injected failures are rebuilt from their status.
fn replay(err: &ApiError) -> ApiError {
    ApiError::from_failure(HttpFailure::new(err.status().unwrap_or(500)))
}

impl FakeListService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ranked(mut self, category: Category, kind: MediaKind, trakt: &[u64]) -> Self {
        self.ranked
            .insert((category, kind), trakt.iter().copied().map(media_ids).collect());
        self
    }

    pub fn with_items(self, slug: &str, kind: MediaKind, trakt: &[u64]) -> Self {
        let items = trakt.iter().copied().map(|t| item(kind, media_ids(t))).collect();
        self.lock().lists.insert(slug.to_string(), items);
        self
    }

    pub fn fail_ranked(mut self, category: Category, err: ApiError) -> Self {
        self.fail_ranked.insert(category, err);
        self
    }

    pub fn fail_ranked_for(mut self, kind: MediaKind, err: ApiError) -> Self {
        self.fail_kind.insert(kind, err);
        self
    }

    pub fn fail_ensure(mut self, err: ApiError) -> Self {
        self.fail_ensure = Some(err);
        self
    }

    pub fn fail_remove(mut self, err: ApiError) -> Self {
        self.fail_remove = Some(err);
        self
    }

    pub fn writes(&self) -> Vec<Call> {
        self.lock().writes.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.lock().created.clone()
    }

    /// Trakt IDs currently on a list, in list order
    pub fn items(&self, slug: &str) -> Vec<u64> {
        self.lock()
            .lists
            .get(slug)
            .map(|items| items.iter().filter_map(|i| i.ids()).map(|i| i.trakt).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ListService for FakeListService {
    async fn fetch_ranked(
        &self,
        category: Category,
        kind: MediaKind,
        limit: u32,
        _min_rating: u8,
    ) -> Result<Vec<MediaIds>, ApiError> {
        if let Some(err) = self.fail_ranked.get(&category).or_else(|| self.fail_kind.get(&kind)) {
            return Err(replay(err));
        }
        let mut ids = self.ranked.get(&(category, kind)).cloned().unwrap_or_default();
        ids.truncate(limit as usize);
        Ok(ids)
    }

    async fn ensure_list_exists(
        &self,
        _owner: &str,
        list: &ManagedList,
        _privacy: ListPrivacy,
    ) -> Result<(), ApiError> {
        if let Some(err) = &self.fail_ensure {
            return Err(replay(err));
        }
        let mut state = self.lock();
        if !state.lists.contains_key(&list.slug) {
            state.lists.insert(list.slug.clone(), Vec::new());
            state.created.push(list.slug.clone());
        }
        Ok(())
    }

    async fn get_all_items(&self, _owner: &str, slug: &str) -> Result<Vec<ListItem>, ApiError> {
        self.lock()
            .lists
            .get(slug)
            .cloned()
            .ok_or_else(|| ApiError::from_failure(HttpFailure::new(404)))
    }

    async fn add_items(
        &self,
        _owner: &str,
        slug: &str,
        ids: &[MediaIds],
        kind: MediaKind,
    ) -> Result<(), ApiError> {
        let mut state = self.lock();
        state
            .writes
            .push(Call::Add(slug.to_string(), ids.iter().map(|i| i.trakt).collect()));
        let list = state.lists.entry(slug.to_string()).or_default();
        list.extend(ids.iter().cloned().map(|i| item(kind, i)));
        Ok(())
    }

    async fn remove_items(
        &self,
        _owner: &str,
        slug: &str,
        ids: &[MediaIds],
        _kind: MediaKind,
    ) -> Result<(), ApiError> {
        if let Some(err) = &self.fail_remove {
            return Err(replay(err));
        }
        let mut state = self.lock();
        state
            .writes
            .push(Call::Remove(slug.to_string(), ids.iter().map(|i| i.trakt).collect()));
        let removed: HashSet<u64> = ids.iter().map(|i| i.trakt).collect();
        if let Some(list) = state.lists.get_mut(slug) {
            list.retain(|item| item.ids().map_or(true, |i| !removed.contains(&i.trakt)));
        }
        Ok(())
    }
}
