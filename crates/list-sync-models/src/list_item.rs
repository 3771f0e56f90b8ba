use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Media, MediaIds, MediaKind};

/// One entry of a Trakt list as returned by the items endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListItem {
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub listed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub entry: ListEntry,
}

/// The media a list entry points at, keyed by the wire `type` field.
///
/// Lists can also hold seasons, episodes and people. Those deserialize as
/// `Unsupported` and carry no identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ListEntry {
    Movie { movie: Media },
    Show { show: Media },
    #[serde(other)]
    Unsupported,
}

impl ListItem {
    pub fn movie(media: Media) -> Self {
        Self {
            rank: None,
            listed_at: None,
            entry: ListEntry::Movie { movie: media },
        }
    }

    pub fn show(media: Media) -> Self {
        Self {
            rank: None,
            listed_at: None,
            entry: ListEntry::Show { show: media },
        }
    }

    pub fn kind(&self) -> Option<MediaKind> {
        match &self.entry {
            ListEntry::Movie { .. } => Some(MediaKind::Movie),
            ListEntry::Show { .. } => Some(MediaKind::Show),
            ListEntry::Unsupported => None,
        }
    }

    pub fn media(&self) -> Option<&Media> {
        match &self.entry {
            ListEntry::Movie { movie } => Some(movie),
            ListEntry::Show { show } => Some(show),
            ListEntry::Unsupported => None,
        }
    }

    /// Identity used for diffing, `None` for entries we cannot manage.
    pub fn ids(&self) -> Option<&MediaIds> {
        self.media().map(|media| &media.ids)
    }
}
