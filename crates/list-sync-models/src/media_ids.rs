use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Identifiers Trakt attaches to a movie or show.
///
/// Only `trakt` takes part in equality and hashing. The remaining fields are
/// informational and are echoed back when items are added to or removed from
/// a list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MediaIds {
    pub trakt: u64,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imdb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmdb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tvdb: Option<u64>,
}

impl MediaIds {
    pub fn new(trakt: u64, slug: impl Into<String>) -> Self {
        Self {
            trakt,
            slug: slug.into(),
            ..Self::default()
        }
    }

    pub fn with_imdb(mut self, imdb: impl Into<String>) -> Self {
        self.imdb = Some(imdb.into());
        self
    }
}

impl PartialEq for MediaIds {
    fn eq(&self, other: &Self) -> bool {
        self.trakt == other.trakt
    }
}

impl Eq for MediaIds {}

impl Hash for MediaIds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trakt.hash(state);
    }
}

/// Drop repeated Trakt IDs, keeping the first occurrence and the input order.
pub fn unique_ids<I>(ids: I) -> Vec<MediaIds>
where
    I: IntoIterator<Item = MediaIds>,
{
    let mut seen = HashSet::new();
    ids.into_iter().filter(|ids| seen.insert(ids.trakt)).collect()
}
