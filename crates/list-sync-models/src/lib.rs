pub mod list;
pub mod list_item;
pub mod media;
pub mod media_ids;

pub use list::{Category, ListPrivacy, ManagedList};
pub use list_item::{ListEntry, ListItem};
pub use media::{Media, MediaKind};
pub use media_ids::{unique_ids, MediaIds};
