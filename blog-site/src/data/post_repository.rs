use crate::data::{fk_violation, unique_violation};
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostEntry, PostFilter, PostOrder, PostUpdate};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Fails with [`DomainError::SlugTaken`] when the slug is already used.
    async fn create(&self, post: Post, tag_ids: &[Uuid]) -> Result<Post, DomainError>;
    /// Slugs equal to `base` or starting with `base-`.
    async fn slugs_with_prefix(&self, base: &str) -> Result<Vec<String>, DomainError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostEntry>, DomainError>;
    async fn count(&self, filter: &PostFilter) -> Result<u64, DomainError>;
    async fn list(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostEntry>, DomainError>;
    /// Adds one view in a single atomic step and returns the new count.
    async fn increment_views(&self, id: Uuid) -> Result<Option<i64>, DomainError>;
    async fn update(&self, id: Uuid, update: PostUpdate) -> Result<Option<Post>, DomainError>;
    async fn set_tags(&self, id: Uuid, tag_ids: &[Uuid]) -> Result<(), DomainError>;
    /// Refused while comments reference the post.
    async fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}

const ENTRY_SELECT: &str = r#"
    SELECT p.id, p.title, p.slug, p.author_id, p.content, p.created_at, p.updated_at,
           p.photo, p.views, p.category_id, p.is_published, p.on_main,
           u.username AS author_username, c.title AS category_title, c.slug AS category_slug
    FROM posts p
    JOIN users u ON u.id = p.author_id
    JOIN categories c ON c.id = p.category_id
"#;

const POST_COLUMNS: &str = "id, title, slug, author_id, content, created_at, updated_at, \
     photo, views, category_id, is_published, on_main";

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    builder.push(" WHERE TRUE");
    if let Some(published) = filter.published {
        builder.push(" AND p.is_published = ").push_bind(published);
    }
    if let Some(on_main) = filter.on_main {
        builder.push(" AND p.on_main = ").push_bind(on_main);
    }
    if let Some(slug) = &filter.category_slug {
        builder.push(" AND c.slug = ").push_bind(slug.clone());
    }
    if let Some(slug) = &filter.tag_slug {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM post_tags pt JOIN tags t ON t.id = pt.tag_id \
                 WHERE pt.post_id = p.id AND t.slug = ",
            )
            .push_bind(slug.clone())
            .push(")");
    }
    if let Some(term) = &filter.search {
        let pattern = format!("%{}%", escape_like(term));
        builder
            .push(" AND (p.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR p.content ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post, tag_ids: &[Uuid]) -> Result<Post, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("failed to open transaction: {}", e);
            DomainError::Internal(e.to_string())
        })?;

        sqlx::query(
            r#"
            INSERT INTO posts (id, title, slug, author_id, content, created_at, updated_at,
                               photo, views, category_id, is_published, on_main)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(post.author_id)
        .bind(&post.content)
        .bind(post.created_at)
        .bind(&post.photo)
        .bind(post.views)
        .bind(post.category_id)
        .bind(post.is_published)
        .bind(post.on_main)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if unique_violation(&e, "posts_slug") {
                DomainError::SlugTaken(post.slug.clone())
            } else if fk_violation(&e) {
                DomainError::CategoryNotFound(post.category_id.to_string())
            } else {
                error!("failed to create post: {}", e);
                DomainError::Internal(format!("database error: {}", e))
            }
        })?;

        for tag_id in tag_ids {
            sqlx::query("INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2)")
                .bind(post.id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| DomainError::Internal(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        info!(post_id = %post.id, author_id = %post.author_id, slug = %post.slug, "post created");
        Ok(post)
    }

    async fn slugs_with_prefix(&self, base: &str) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar("SELECT slug FROM posts WHERE slug = $1 OR slug LIKE $2 ESCAPE '\\'")
            .bind(base)
            .bind(format!("{}-%", escape_like(base)))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("db error while reading slugs for {}: {}", base, e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostEntry>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        builder.push(" WHERE p.slug = ").push_bind(slug.to_string());
        builder
            .build_query_as::<PostEntry>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("db error find_by_slug {}: {}", slug, e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM posts p JOIN categories c ON c.id = p.category_id",
        );
        push_filter(&mut builder, filter);
        let row = builder.build().fetch_one(&self.pool).await.map_err(|e| {
            error!("db error while counting posts: {}", e);
            DomainError::Internal(e.to_string())
        })?;
        let count: i64 = row
            .try_get(0)
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(count.max(0) as u64)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostEntry>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(ENTRY_SELECT);
        push_filter(&mut builder, filter);
        builder.push(match order {
            PostOrder::Newest => " ORDER BY p.created_at DESC, p.id DESC",
            PostOrder::MostViewed => " ORDER BY p.views DESC, p.created_at DESC, p.id DESC",
        });
        builder
            .push(" LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        builder
            .build_query_as::<PostEntry>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("db error while fetching posts: {}", e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn increment_views(&self, id: Uuid) -> Result<Option<i64>, DomainError> {
        sqlx::query_scalar("UPDATE posts SET views = views + 1 WHERE id = $1 RETURNING views")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("failed to count view of post {}: {}", id, e);
                DomainError::Internal(e.to_string())
            })
    }

    async fn update(&self, id: Uuid, update: PostUpdate) -> Result<Option<Post>, DomainError> {
        let now = Utc::now();
        let query = format!(
            r#"
            UPDATE posts
            SET
                title = COALESCE($1, title),
                content = COALESCE($2, content),
                category_id = COALESCE($3, category_id),
                is_published = COALESCE($4, is_published),
                on_main = COALESCE($5, on_main),
                photo = COALESCE($6, photo),
                updated_at = $7
            WHERE id = $8
            RETURNING {POST_COLUMNS}
            "#
        );
        let category_id = update.category_id;
        let post = sqlx::query_as::<_, Post>(&query)
            .bind(update.title)
            .bind(update.content)
            .bind(update.category_id)
            .bind(update.is_published)
            .bind(update.on_main)
            .bind(update.photo)
            .bind(now)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if fk_violation(&e) {
                    DomainError::CategoryNotFound(
                        category_id.map(|c| c.to_string()).unwrap_or_default(),
                    )
                } else {
                    error!("failed to update post {}: {}", id, e);
                    DomainError::Internal(e.to_string())
                }
            })?;

        if post.is_some() {
            info!(post_id = %id, "post updated");
        }

        Ok(post)
    }

    async fn set_tags(&self, id: Uuid, tag_ids: &[Uuid]) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if fk_violation(&e) {
                    DomainError::TagNotFound(tag_id.to_string())
                } else {
                    DomainError::Internal(e.to_string())
                }
            })?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        info!(post_id = %id, tags = tag_ids.len(), "post tags replaced");
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let referenced: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM comments WHERE post_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DomainError::Internal(e.to_string()))?;

        if referenced {
            return Err(DomainError::Protected {
                resource: "post",
                referenced_by: "comments",
            });
        }

        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if fk_violation(&e) {
                    DomainError::Protected {
                        resource: "post",
                        referenced_by: "comments",
                    }
                } else {
                    DomainError::Internal(e.to_string())
                }
            })?;

        if deleted.rows_affected() == 0 {
            return Err(DomainError::PostNotFound(id.to_string()));
        }

        info!(post_id = %id, "post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("100%_off\\"), "100\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn filter_builds_expected_sql() {
        let filter = PostFilter::published()
            .on_main(false)
            .category("news")
            .tag("rust")
            .search("async");
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM posts p");
        push_filter(&mut builder, &filter);
        let sql = builder.sql();
        assert!(sql.contains("p.is_published = $1"));
        assert!(sql.contains("p.on_main = $2"));
        assert!(sql.contains("c.slug = $3"));
        assert!(sql.contains("t.slug = $4"));
        assert!(sql.contains("p.title ILIKE $5"));
        assert!(sql.contains("p.content ILIKE $6"));
    }
}
