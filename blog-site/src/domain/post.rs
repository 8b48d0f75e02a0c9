use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use crate::domain::comment::CommentEntry;
use crate::domain::tag::Tag;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub photo: Option<String>,
    pub views: i64,
    pub category_id: Uuid,
    pub is_published: bool,
    pub on_main: bool,
}

impl Post {
    pub fn new(author_id: Uuid, draft: NewPost, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            slug,
            author_id,
            content: draft.content,
            created_at: now,
            updated_at: now,
            photo: None,
            views: 0,
            category_id: draft.category_id,
            is_published: draft.is_published,
            on_main: false,
        }
    }

    pub fn absolute_url(&self) -> String {
        format!("/post/{}/", self.slug)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// A post joined with the names its pages display.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PostEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: Post,
    pub author_username: String,
    pub category_title: String,
    pub category_slug: String,
}

/// Validated input of the "add post" form.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub is_published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_published: Option<bool>,
    pub on_main: Option<bool>,
    pub photo: Option<String>,
}

/// Detail page payload, with the view counter already bumped.
#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostEntry,
    pub tags: Vec<Tag>,
    pub comments: Vec<CommentEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub published: Option<bool>,
    pub on_main: Option<bool>,
    pub category_slug: Option<String>,
    pub tag_slug: Option<String>,
    pub search: Option<String>,
}

impl PostFilter {
    pub fn published() -> Self {
        Self {
            published: Some(true),
            ..Self::default()
        }
    }

    pub fn on_main(mut self, on_main: bool) -> Self {
        self.on_main = Some(on_main);
        self
    }

    pub fn category(mut self, slug: impl Into<String>) -> Self {
        self.category_slug = Some(slug.into());
        self
    }

    pub fn tag(mut self, slug: impl Into<String>) -> Self {
        self.tag_slug = Some(slug.into());
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// In-process evaluation, used by the memory store.
    pub fn matches(&self, post: &Post, category_slug: &str, tag_slugs: &[&str]) -> bool {
        if self.published.is_some_and(|p| p != post.is_published) {
            return false;
        }
        if self.on_main.is_some_and(|m| m != post.on_main) {
            return false;
        }
        if self
            .category_slug
            .as_deref()
            .is_some_and(|slug| slug != category_slug)
        {
            return false;
        }
        if self
            .tag_slug
            .as_deref()
            .is_some_and(|slug| !tag_slugs.contains(&slug))
        {
            return false;
        }
        if let Some(term) = self.search.as_deref() {
            let term = term.to_lowercase();
            if !post.title.to_lowercase().contains(&term)
                && !post.content.to_lowercase().contains(&term)
            {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    #[default]
    Newest,
    MostViewed,
}
