//! alumni-forum/crates/af-core/src/lib.rs
//!
//! Domain models, repository ports and shared plumbing for the alumni forum.

pub mod error;
pub mod models;
pub mod route;
pub mod session;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use route::*;
pub use session::*;
pub use store::*;
pub use traits::*;
