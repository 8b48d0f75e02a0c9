pub mod category_repository;
pub mod comment_repository;
pub mod memory;
pub mod post_repository;
pub mod tag_repository;
pub mod user_repository;

use std::sync::Arc;

use sqlx::PgPool;

use category_repository::{CategoryRepository, PostgresCategoryRepository};
use comment_repository::{CommentRepository, PostgresCommentRepository};
use memory::MemoryStore;
use post_repository::{PostRepository, PostgresPostRepository};
use tag_repository::{PostgresTagRepository, TagRepository};
use user_repository::{PostgresUserRepository, UserRepository};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// One handle per table, all backed by the same storage.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub tags: Arc<dyn TagRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(pool.clone())),
            tags: Arc::new(PostgresTagRepository::new(pool.clone())),
            posts: Arc::new(PostgresPostRepository::new(pool.clone())),
            comments: Arc::new(PostgresCommentRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = MemoryStore::new();
        Self {
            users: Arc::new(store.clone()),
            categories: Arc::new(store.clone()),
            tags: Arc::new(store.clone()),
            posts: Arc::new(store.clone()),
            comments: Arc::new(store),
        }
    }
}

pub(crate) fn unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    e.as_database_error().is_some_and(|db| {
        db.code().as_deref() == Some(UNIQUE_VIOLATION)
            && db.constraint().is_some_and(|c| c.contains(constraint))
    })
}

pub(crate) fn fk_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION))
}
