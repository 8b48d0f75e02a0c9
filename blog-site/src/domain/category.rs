use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

impl Category {
    pub fn new(title: String, slug: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            slug,
        }
    }

    pub fn absolute_url(&self) -> String {
        format!("/category/{}/", self.slug)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Menu entry: a category with the number of its published posts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub post_count: i64,
}
