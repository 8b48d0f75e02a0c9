use crate::data::unique_violation;
use crate::domain::error::DomainError;
use crate::domain::tag::{Tag, TagWithViews};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait TagRepository: Send + Sync {
    async fn create(&self, tag: Tag) -> Result<Tag, DomainError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>, DomainError>;
    async fn list(&self) -> Result<Vec<Tag>, DomainError>;
    /// Every tag with the summed views of its published posts, most viewed first.
    async fn list_by_views(&self) -> Result<Vec<TagWithViews>, DomainError>;
    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>, DomainError>;
    /// Drops the tag and its post associations; posts are kept.
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

#[derive(Clone)]
pub struct PostgresTagRepository {
    pool: PgPool,
}

impl PostgresTagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TagRepository for PostgresTagRepository {
    async fn create(&self, tag: Tag) -> Result<Tag, DomainError> {
        sqlx::query("INSERT INTO tags (id, title, slug) VALUES ($1, $2, $3)")
            .bind(tag.id)
            .bind(&tag.title)
            .bind(&tag.slug)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if unique_violation(&e, "tags_slug") {
                    DomainError::SlugTaken(tag.slug.clone())
                } else {
                    error!("failed to create tag: {}", e);
                    DomainError::Internal(format!("database error: {}", e))
                }
            })?;

        info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
        Ok(tag)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError> {
        sqlx::query_as::<_, Tag>("SELECT id, title, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("db error find tag {}: {}", slug, e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>, DomainError> {
        sqlx::query_as::<_, Tag>(
            "SELECT id, title, slug FROM tags WHERE id = ANY($1) ORDER BY title, id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error find tags by ids: {}", e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn list(&self) -> Result<Vec<Tag>, DomainError> {
        sqlx::query_as::<_, Tag>("SELECT id, title, slug FROM tags ORDER BY title, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("db error while listing tags: {}", e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn list_by_views(&self) -> Result<Vec<TagWithViews>, DomainError> {
        sqlx::query_as::<_, TagWithViews>(
            r#"
            SELECT t.id, t.title, t.slug,
                   COALESCE(SUM(p.views), 0)::BIGINT AS total_views
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            LEFT JOIN posts p ON p.id = pt.post_id AND p.is_published
            GROUP BY t.id, t.title, t.slug
            ORDER BY total_views DESC, t.title, t.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error while ranking tags: {}", e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>, DomainError> {
        sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.title, t.slug
            FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.title, t.id
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("db error tags for post {}: {}", post_id, e);
            DomainError::Internal(e.to_string())
        })
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let deleted = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if deleted.rows_affected() == 0 {
            return Err(DomainError::TagNotFound(id.to_string()));
        }

        info!(tag_id = %id, "tag deleted");
        Ok(())
    }
}
