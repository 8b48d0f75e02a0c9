use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

impl Tag {
    pub fn new(title: String, slug: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            slug,
        }
    }

    pub fn absolute_url(&self) -> String {
        format!("/tag/{}/", self.slug)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Sidebar entry: a tag ranked by the summed views of its published posts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TagWithViews {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub tag: Tag,
    pub total_views: i64,
}
