//! Forum routes as seen by the enclosing application's router.

use crate::error::{ForumError, Result};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const FORUM_ROOT: &str = "/forum";

/// The two forum locations: the thread list and a single thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    ForumRoot,
    Thread(Uuid),
}

impl Route {
    pub fn thread_id(&self) -> Option<Uuid> {
        match self {
            Route::ForumRoot => None,
            Route::Thread(id) => Some(*id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::ForumRoot => f.write_str(FORUM_ROOT),
            Route::Thread(id) => write!(f, "{FORUM_ROOT}/{id}"),
        }
    }
}

impl FromStr for Route {
    type Err = ForumError;

    /// Accepts `/forum`, `/forum/` and `/forum/<uuid>`.
    fn from_str(path: &str) -> Result<Self> {
        let rest = path
            .strip_prefix(FORUM_ROOT)
            .ok_or_else(|| ForumError::Validation(format!("not a forum path: {path}")))?;

        match rest.trim_matches('/') {
            "" if rest.is_empty() || rest.starts_with('/') => Ok(Route::ForumRoot),
            segment if rest.starts_with('/') && !segment.contains('/') => Uuid::parse_str(segment)
                .map(Route::Thread)
                .map_err(|_| ForumError::NotFound("Thread".into(), segment.to_string())),
            _ => Err(ForumError::Validation(format!("not a forum path: {path}"))),
        }
    }
}
