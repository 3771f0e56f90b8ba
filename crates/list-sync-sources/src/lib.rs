pub mod error;
pub mod traits;
pub mod trakt;

pub use error::{ApiError, AuthError, HttpFailure};
pub use traits::ListService;
pub use trakt::{TokenSet, TraktClient, TraktCredentials};
