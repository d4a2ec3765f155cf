//! Bluesky platform adapter
//!
//! Everything that talks to, or models, the upstream AT Protocol API.

pub mod adapter;
pub mod facets;
pub mod image;
pub mod records;
pub mod session;
pub mod uri;

pub use adapter::{BskyAdapter, PostOptions, ThreadFailure};
pub use session::Session;
