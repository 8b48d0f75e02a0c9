use crate::data::{fk_violation, unique_violation};
use crate::domain::category::{Category, CategoryWithCount};
use crate::domain::error::DomainError;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: Category) -> Result<Category, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError>;
    /// All categories ordered by title.
    async fn list(&self) -> Result<Vec<Category>, DomainError>;
    /// Categories that have at least one published post, ordered by title.
    async fn list_with_post_counts(&self) -> Result<Vec<CategoryWithCount>, DomainError>;
    /// Refused while any post belongs to the category.
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

#[derive(Clone)]
pub struct PostgresCategoryRepository {
    pool: PgPool,
}

impl PostgresCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn create(&self, category: Category) -> Result<Category, DomainError> {
        sqlx::query("INSERT INTO categories (id, title, slug) VALUES ($1, $2, $3)")
            .bind(category.id)
            .bind(&category.title)
            .bind(&category.slug)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e, "categories_slug") {
                    DomainError::SlugTaken(category.slug.clone())
                } else {
                    error!("failed to create category: {}", e);
                    DomainError::Internal(format!("database error: {}", e))
                }
            })?;

        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        sqlx::query_as::<_, Category>("SELECT id, title, slug FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("db error find category {}: {}", id, e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        sqlx::query_as::<_, Category>("SELECT id, title, slug FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("db error find category {}: {}", slug, e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn list(&self) -> Result<Vec<Category>, DomainError> {
        sqlx::query_as::<_, Category>("SELECT id, title, slug FROM categories ORDER BY title, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("db error while listing categories: {}", e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn list_with_post_counts(&self) -> Result<Vec<CategoryWithCount>, DomainError> {
        sqlx::query_as::<_, CategoryWithCount>(
            r#"
            SELECT c.id, c.title, c.slug, COUNT(p.id) AS post_count
            FROM categories c
            JOIN posts p ON p.category_id = c.id AND p.is_published
            GROUP BY c.id, c.title, c.slug
            HAVING COUNT(p.id) > 0
            ORDER BY c.title, c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while counting category posts: {}", e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE category_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::Internal(e.to_string()))?;

        if referenced {
            return Err(DomainError::Protected {
                resource: "category",
                referenced_by: "posts",
            });
        }

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if fk_violation(&e) {
                    DomainError::Protected {
                        resource: "category",
                        referenced_by: "posts",
                    }
                } else {
                    DomainError::Internal(e.to_string())
                }
            })?;

        if deleted.rows_affected() == 0 {
            return Err(DomainError::CategoryNotFound(id.to_string()));
        }

        info!(category_id = %id, "category deleted");
        Ok(())
    }
}
