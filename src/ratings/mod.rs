//! Entry lifecycle: creating, rating, dropping and querying entries.

pub mod book;
pub mod identity;
pub mod service;

pub use book::{RatingBook, MAX_SUGGESTIONS};
pub use identity::{IdentityProvider, StaticIdentity};
pub use service::{AccessPolicy, Created, RatingService};
