use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::MediaKind;

/// Ranked endpoint a managed list draws its members from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Trending,
    Popular,
    MostWatched,
}

impl Category {
    /// Path suffix after `/movies` or `/shows`
    pub fn path_segment(&self) -> &'static str {
        match self {
            Category::Trending => "trending",
            Category::Popular => "popular",
            Category::MostWatched => "watched/weekly",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Trending => "trending",
            Category::Popular => "popular",
            Category::MostWatched => "most watched",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListPrivacy {
    #[default]
    Private,
    Friends,
    Public,
}

impl ListPrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListPrivacy::Private => "private",
            ListPrivacy::Friends => "friends",
            ListPrivacy::Public => "public",
        }
    }
}

impl fmt::Display for ListPrivacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListPrivacy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "private" => Ok(ListPrivacy::Private),
            "friends" => Ok(ListPrivacy::Friends),
            "public" => Ok(ListPrivacy::Public),
            other => Err(format!("unknown list privacy '{}'", other)),
        }
    }
}

/// A Trakt list whose membership this tool owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedList {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub kind: MediaKind,
}

impl ManagedList {
    pub const MOVIES_SLUG: &'static str = "trakt-sync-filme";
    pub const SHOWS_SLUG: &'static str = "trakt-sync-serien";

    /// The managed list for `kind`, described from the categories feeding it.
    pub fn for_kind(kind: MediaKind, categories: &[Category], limit: u32) -> Self {
        let sources = categories
            .iter()
            .map(Category::label)
            .collect::<Vec<_>>()
            .join(" + ");
        let (slug, name, noun) = match kind {
            MediaKind::Movie => (Self::MOVIES_SLUG, "Trakt Sync Filme", "movies"),
            MediaKind::Show => (Self::SHOWS_SLUG, "Trakt Sync Serien", "shows"),
        };

        Self {
            slug: slug.to_string(),
            name: name.to_string(),
            description: format!(
                "Top {} {} per source ({}), maintained by trakt-sync",
                limit, noun, sources
            ),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_paths() {
        assert_eq!(Category::Trending.path_segment(), "trending");
        assert_eq!(Category::MostWatched.path_segment(), "watched/weekly");
        let parsed: Category = serde_json::from_str("\"most_watched\"").unwrap();
        assert_eq!(parsed, Category::MostWatched);
    }

    #[test]
    fn test_privacy_parse_defaults_to_private() {
        assert_eq!("".parse::<ListPrivacy>().unwrap(), ListPrivacy::Private);
        assert_eq!("Public".parse::<ListPrivacy>().unwrap(), ListPrivacy::Public);
        assert!("secret".parse::<ListPrivacy>().is_err());
    }

    #[test]
    fn test_managed_list_for_kind() {
        let list = ManagedList::for_kind(
            MediaKind::Show,
            &[Category::Trending, Category::MostWatched],
            30,
        );
        assert_eq!(list.slug, "trakt-sync-serien");
        assert_eq!(list.kind, MediaKind::Show);
        assert!(list.description.contains("trending + most watched"));
        assert!(list.description.contains("Top 30 shows"));
    }
}
