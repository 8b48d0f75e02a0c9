use std::sync::Arc;

use tracing::instrument;

use crate::data::Repositories;
use crate::data::category_repository::CategoryRepository;
use crate::data::tag_repository::TagRepository;
use crate::domain::category::Category;
use crate::domain::error::DomainError;
use crate::domain::slug::slugify;
use crate::domain::tag::Tag;
use crate::domain::validation::{FormErrors, TAG_TITLE_MAX_LEN, TITLE_MAX_LEN, validate_title};

/// Staff management of categories and tags.
#[derive(Clone)]
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
}

fn title_and_slug(
    title: &str,
    slug: Option<&str>,
    max_len: usize,
) -> Result<(String, String), DomainError> {
    let title = validate_title(title, max_len)
        .map_err(|message| DomainError::Validation(FormErrors::single("title", message)))?;
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => slugify(explicit),
        None => slugify(&title),
    };
    Ok((title, slug))
}

impl CatalogService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            categories: Arc::clone(&repos.categories),
            tags: Arc::clone(&repos.tags),
        }
    }

    pub async fn categories(&self) -> Result<Vec<Category>, DomainError> {
        self.categories.list().await
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        title: &str,
        slug: Option<&str>,
    ) -> Result<Category, DomainError> {
        let (title, slug) = title_and_slug(title, slug, TITLE_MAX_LEN)?;
        self.categories.create(Category::new(title, slug)).await
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, slug: &str) -> Result<(), DomainError> {
        let category = self
            .categories
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::CategoryNotFound(slug.to_string()))?;
        self.categories.delete(category.id).await
    }

    pub async fn tags(&self) -> Result<Vec<Tag>, DomainError> {
        self.tags.list().await
    }

    #[instrument(skip(self))]
    pub async fn create_tag(&self, title: &str, slug: Option<&str>) -> Result<Tag, DomainError> {
        let (title, slug) = title_and_slug(title, slug, TAG_TITLE_MAX_LEN)?;
        self.tags.create(Tag::new(title, slug)).await
    }

    /// Posts keep existing; only their link to the tag goes away.
    #[instrument(skip(self))]
    pub async fn delete_tag(&self, slug: &str) -> Result<(), DomainError> {
        let tag = self
            .tags
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::TagNotFound(slug.to_string()))?;
        self.tags.delete(tag.id).await
    }
}
