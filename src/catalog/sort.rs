// src/catalog/sort.rs
//! Orderings applied by callers before filtering. The filter engine itself
//! never reorders, so every sort here is stable.

use serde::{Deserialize, Serialize};

use crate::models::{Guide, Post, Scholarship};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScholarshipSort {
    /// Source order.
    #[default]
    None,
    /// Featured first, then soonest deadline.
    Featured,
    Deadline,
    Title,
    Newest,
}

impl ScholarshipSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("featured") => Self::Featured,
            Some("deadline") => Self::Deadline,
            Some("title") => Self::Title,
            Some("newest") | Some("most_recent") => Self::Newest,
            _ => Self::None,
        }
    }

    pub fn apply(&self, items: &mut [Scholarship]) {
        match self {
            Self::None => {}
            Self::Featured => items.sort_by(|a, b| b.featured.cmp(&a.featured).then(a.deadline.cmp(&b.deadline))),
            Self::Deadline => items.sort_by_key(|s| s.deadline),
            Self::Title => items.sort_by_cached_key(|s| s.title.to_lowercase()),
            Self::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideSort {
    #[default]
    None,
    Title,
    Newest,
}

impl GuideSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("title") => Self::Title,
            Some("newest") | Some("most_recent") => Self::Newest,
            _ => Self::None,
        }
    }

    pub fn apply(&self, items: &mut [Guide]) {
        match self {
            Self::None => {}
            Self::Title => items.sort_by_cached_key(|g| g.title.to_lowercase()),
            Self::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostSort {
    #[default]
    MostRecent,
    MostLiked,
}

impl PostSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("most_liked") | Some("liked") => Self::MostLiked,
            _ => Self::MostRecent,
        }
    }

    /// SQL ORDER BY clause for the posts query.
    pub fn order_by(&self) -> &'static str {
        match self {
            Self::MostRecent => "p.created_at DESC, p.id ASC",
            Self::MostLiked => "p.likes_count DESC, p.created_at DESC, p.id ASC",
        }
    }

    pub fn apply(&self, posts: &mut [Post]) {
        match self {
            Self::MostRecent => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::MostLiked => posts.sort_by(|a, b| {
                b.likes_count.cmp(&a.likes_count).then(b.created_at.cmp(&a.created_at))
            }),
        }
    }
}
