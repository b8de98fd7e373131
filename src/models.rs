//! Domain model shared by the stores, the feed engine and the API.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
        )]
        #[serde(transparent)]
        #[sqlx(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    Error::invalid_argument(format!(
                        "invalid {} '{}': {}",
                        stringify!($name),
                        s,
                        e
                    ))
                })
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Identity of an externally managed user
    UserId
);
uuid_id!(
    /// Identity of an authored post
    PostId
);
uuid_id!(
    /// Identity of a single recorded swipe
    SwipeId
);

/// A user as seen by the core. Credentials live with the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// An authored post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: PostId,
    pub author_id: UserId,
    pub title: String,
    pub description: String,
    /// Technology-stack tag
    pub stack: String,
    pub category: Option<String>,
    /// Image reference, e.g. `/uploads/<name>`
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a post. The author comes from the caller's identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stack: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewPost {
    /// Trim fields, fold blank optionals to `None`, reject a blank title.
    pub fn normalized(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(Error::invalid_argument("post title must not be blank"));
        }

        Ok(Self {
            title,
            description: self.description.trim().to_string(),
            stack: self.stack.trim().to_string(),
            category: non_blank(self.category),
            image: non_blank(self.image),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Swipe direction: LEFT rejects, RIGHT accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeDirection::Left => "LEFT",
            SwipeDirection::Right => "RIGHT",
        }
    }
}

impl fmt::Display for SwipeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SwipeDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(SwipeDirection::Left),
            "right" => Ok(SwipeDirection::Right),
            other => Err(Error::invalid_argument(format!(
                "unknown swipe direction '{}', expected LEFT or RIGHT",
                other
            ))),
        }
    }
}

/// One recorded swipe. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeRecord {
    pub id: SwipeId,
    pub user_id: UserId,
    pub post_id: PostId,
    pub direction: SwipeDirection,
    pub swiped_at: DateTime<Utc>,
}

/// A swipe about to be appended to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSwipe {
    pub user_id: UserId,
    pub post_id: PostId,
    pub direction: SwipeDirection,
    pub swiped_at: DateTime<Utc>,
}

/// Parse a client-supplied swipe time.
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00Z`, `...+02:00`) and naive ISO
/// local date-times (`2024-05-01T10:00:00`, optional fraction), the latter
/// read as UTC. Anything else yields `None`.
pub fn parse_swipe_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// A right-swiped post together with when the user accepted it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEntry {
    pub post: Post,
    pub swiped_at: DateTime<Utc>,
}
