use std::sync::Arc;

use serde::Serialize;

use crate::data::Repositories;
use crate::data::category_repository::CategoryRepository;
use crate::data::post_repository::PostRepository;
use crate::data::tag_repository::TagRepository;
use crate::domain::category::CategoryWithCount;
use crate::domain::error::DomainError;
use crate::domain::post::{PostEntry, PostFilter, PostOrder};
use crate::domain::tag::TagWithViews;

#[derive(Debug, Clone, Serialize)]
pub struct Sidebar {
    pub recent: Vec<PostEntry>,
    pub popular: Vec<PostEntry>,
    pub tags: Vec<TagWithViews>,
}

/// Data shown around every page: the category menu, featured posts and
/// the sidebar blocks.
#[derive(Clone)]
pub struct SidebarService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    size: u64,
}

impl SidebarService {
    pub fn new(repos: &Repositories, size: u64) -> Self {
        Self {
            posts: Arc::clone(&repos.posts),
            categories: Arc::clone(&repos.categories),
            tags: Arc::clone(&repos.tags),
            size,
        }
    }

    /// Categories having published posts, by title.
    pub async fn menu(&self) -> Result<Vec<CategoryWithCount>, DomainError> {
        self.categories.list_with_post_counts().await
    }

    pub async fn featured(&self) -> Result<Vec<PostEntry>, DomainError> {
        let filter = PostFilter::published().on_main(true);
        let total = self.posts.count(&filter).await?;
        if total == 0 {
            return Ok(Vec::new());
        }
        self.posts.list(&filter, PostOrder::Newest, total, 0).await
    }

    pub async fn sidebar(&self) -> Result<Sidebar, DomainError> {
        let published = PostFilter::published();
        let recent = self
            .posts
            .list(&published, PostOrder::Newest, self.size, 0)
            .await?;
        let popular = self
            .posts
            .list(&published, PostOrder::MostViewed, self.size, 0)
            .await?;
        let tags = self.tags.list_by_views().await?;
        Ok(Sidebar {
            recent,
            popular,
            tags,
        })
    }
}
