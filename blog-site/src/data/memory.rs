//! Process-local storage backend.
//!
//! All five repositories share one [`MemoryStore`] so the protect-on-delete
//! checks see every table, the same way the foreign keys do in PostgreSQL.
//! Every operation holds the lock for its whole duration, which makes
//! `increment_views` atomic.

use std::cmp::Reverse;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::data::category_repository::CategoryRepository;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::data::tag_repository::TagRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::category::{Category, CategoryWithCount};
use crate::domain::comment::{Comment, CommentEntry};
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostEntry, PostFilter, PostOrder, PostUpdate};
use crate::domain::tag::{Tag, TagWithViews};
use crate::domain::user::User;

#[derive(Default)]
struct State {
    users: Vec<User>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    posts: Vec<Post>,
    post_tags: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
}

impl State {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn category(&self, id: Uuid) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn tag_slugs(&self, post_id: Uuid) -> Vec<&str> {
        self.post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, t)| self.tags.iter().find(|tag| tag.id == *t))
            .map(|tag| tag.slug.as_str())
            .collect()
    }

    fn entry(&self, post: &Post) -> Option<PostEntry> {
        let author = self.user(post.author_id)?;
        let category = self.category(post.category_id)?;
        Some(PostEntry {
            post: post.clone(),
            author_username: author.username.clone(),
            category_title: category.title.clone(),
            category_slug: category.slug.clone(),
        })
    }

    fn matching(&self, filter: &PostFilter) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|post| {
                let category_slug = self
                    .category(post.category_id)
                    .map(|c| c.slug.as_str())
                    .unwrap_or_default();
                filter.matches(post, category_slug, &self.tag_slugs(post.id))
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut state = self.state.write().await;
        if state
            .users
            .iter()
            .any(|u| u.username.to_lowercase() == user.username.to_lowercase())
        {
            return Err(DomainError::UserAlreadyExists(user.username));
        }
        state.users.push(user.clone());
        info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;
        let username = username.to_lowercase();
        Ok(state
            .users
            .iter()
            .find(|u| u.username.to_lowercase() == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.state.read().await.user(id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.posts.iter().any(|p| p.author_id == id) {
            return Err(DomainError::Protected {
                resource: "user",
                referenced_by: "posts",
            });
        }
        if state.comments.iter().any(|c| c.author_id == id) {
            return Err(DomainError::Protected {
                resource: "user",
                referenced_by: "comments",
            });
        }
        let before = state.users.len();
        state.users.retain(|u| u.id != id);
        if state.users.len() == before {
            return Err(DomainError::UserNotFound(id));
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn create(&self, category: Category) -> Result<Category, DomainError> {
        let mut state = self.state.write().await;
        if state.categories.iter().any(|c| c.slug == category.slug) {
            return Err(DomainError::SlugTaken(category.slug));
        }
        state.categories.push(category.clone());
        info!(category_id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, DomainError> {
        Ok(self.state.read().await.category(id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Category>, DomainError> {
        let mut categories = self.state.read().await.categories.clone();
        categories.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn list_with_post_counts(&self) -> Result<Vec<CategoryWithCount>, DomainError> {
        let state = self.state.read().await;
        let mut counted: Vec<CategoryWithCount> = state
            .categories
            .iter()
            .map(|category| CategoryWithCount {
                category: category.clone(),
                post_count: state
                    .posts
                    .iter()
                    .filter(|p| p.category_id == category.id && p.is_published)
                    .count() as i64,
            })
            .filter(|c| c.post_count > 0)
            .collect();
        counted.sort_by(|a, b| {
            a.category
                .title
                .cmp(&b.category.title)
                .then(a.category.id.cmp(&b.category.id))
        });
        Ok(counted)
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.posts.iter().any(|p| p.category_id == id) {
            return Err(DomainError::Protected {
                resource: "category",
                referenced_by: "posts",
            });
        }
        let before = state.categories.len();
        state.categories.retain(|c| c.id != id);
        if state.categories.len() == before {
            return Err(DomainError::CategoryNotFound(id.to_string()));
        }
        info!(category_id = %id, "category deleted");
        Ok(())
    }
}

#[async_trait]
impl TagRepository for MemoryStore {
    async fn create(&self, tag: Tag) -> Result<Tag, DomainError> {
        let mut state = self.state.write().await;
        if state.tags.iter().any(|t| t.slug == tag.slug) {
            return Err(DomainError::SlugTaken(tag.slug));
        }
        state.tags.push(tag.clone());
        info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
        Ok(tag)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError> {
        let state = self.state.read().await;
        Ok(state.tags.iter().find(|t| t.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>, DomainError> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn list(&self) -> Result<Vec<Tag>, DomainError> {
        let mut tags = self.state.read().await.tags.clone();
        tags.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn list_by_views(&self) -> Result<Vec<TagWithViews>, DomainError> {
        let state = self.state.read().await;
        let mut ranked: Vec<TagWithViews> = state
            .tags
            .iter()
            .map(|tag| {
                let total_views = state
                    .post_tags
                    .iter()
                    .filter(|(_, t)| *t == tag.id)
                    .filter_map(|(p, _)| state.posts.iter().find(|post| post.id == *p))
                    .filter(|post| post.is_published)
                    .map(|post| post.views)
                    .sum();
                TagWithViews {
                    tag: tag.clone(),
                    total_views,
                }
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.total_views
                .cmp(&a.total_views)
                .then_with(|| a.tag.title.cmp(&b.tag.title))
                .then(a.tag.id.cmp(&b.tag.id))
        });
        Ok(ranked)
    }

    async fn tags_for_post(&self, post_id: Uuid) -> Result<Vec<Tag>, DomainError> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state
            .post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, t)| state.tags.iter().find(|tag| tag.id == *t))
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(tags)
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let before = state.tags.len();
        state.tags.retain(|t| t.id != id);
        if state.tags.len() == before {
            return Err(DomainError::TagNotFound(id.to_string()));
        }
        state.post_tags.retain(|(_, t)| *t != id);
        info!(tag_id = %id, "tag deleted");
        Ok(())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(&self, post: Post, tag_ids: &[Uuid]) -> Result<Post, DomainError> {
        let mut state = self.state.write().await;
        if state.posts.iter().any(|p| p.slug == post.slug) {
            return Err(DomainError::SlugTaken(post.slug));
        }
        if state.category(post.category_id).is_none() {
            return Err(DomainError::CategoryNotFound(post.category_id.to_string()));
        }
        if state.user(post.author_id).is_none() {
            return Err(DomainError::UserNotFound(post.author_id));
        }
        if let Some(missing) = tag_ids
            .iter()
            .find(|id| !state.tags.iter().any(|t| t.id == **id))
        {
            return Err(DomainError::TagNotFound(missing.to_string()));
        }
        for tag_id in tag_ids {
            if !state.post_tags.contains(&(post.id, *tag_id)) {
                state.post_tags.push((post.id, *tag_id));
            }
        }
        state.posts.push(post.clone());
        info!(post_id = %post.id, author_id = %post.author_id, slug = %post.slug, "post created");
        Ok(post)
    }

    async fn slugs_with_prefix(&self, base: &str) -> Result<Vec<String>, DomainError> {
        let prefix = format!("{base}-");
        Ok(self
            .state
            .read()
            .await
            .posts
            .iter()
            .filter(|p| p.slug == base || p.slug.starts_with(&prefix))
            .map(|p| p.slug.clone())
            .collect())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostEntry>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .and_then(|p| state.entry(p)))
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, DomainError> {
        Ok(self.state.read().await.matching(filter).len() as u64)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        order: PostOrder,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostEntry>, DomainError> {
        let state = self.state.read().await;
        let mut posts = state.matching(filter);
        match order {
            PostOrder::Newest => posts.sort_by_key(|p| Reverse((p.created_at, p.id))),
            PostOrder::MostViewed => {
                posts.sort_by_key(|p| Reverse((p.views, p.created_at, p.id)))
            }
        }
        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .filter_map(|p| state.entry(p))
            .collect())
    }

    async fn increment_views(&self, id: Uuid) -> Result<Option<i64>, DomainError> {
        let mut state = self.state.write().await;
        Ok(state.posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.views += 1;
            post.views
        }))
    }

    async fn update(&self, id: Uuid, update: PostUpdate) -> Result<Option<Post>, DomainError> {
        let mut state = self.state.write().await;
        if let Some(category_id) = update.category_id {
            if state.category(category_id).is_none() {
                return Err(DomainError::CategoryNotFound(category_id.to_string()));
            }
        }
        let Some(post) = state.posts.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            post.title = title;
        }
        if let Some(content) = update.content {
            post.content = content;
        }
        if let Some(category_id) = update.category_id {
            post.category_id = category_id;
        }
        if let Some(is_published) = update.is_published {
            post.is_published = is_published;
        }
        if let Some(on_main) = update.on_main {
            post.on_main = on_main;
        }
        if let Some(photo) = update.photo {
            post.photo = Some(photo);
        }
        post.updated_at = Utc::now();
        info!(post_id = %id, "post updated");
        Ok(Some(post.clone()))
    }

    async fn set_tags(&self, id: Uuid, tag_ids: &[Uuid]) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if !state.posts.iter().any(|p| p.id == id) {
            return Err(DomainError::PostNotFound(id.to_string()));
        }
        if let Some(missing) = tag_ids
            .iter()
            .find(|tag_id| !state.tags.iter().any(|t| t.id == **tag_id))
        {
            return Err(DomainError::TagNotFound(missing.to_string()));
        }
        state.post_tags.retain(|(p, _)| *p != id);
        for tag_id in tag_ids {
            if !state.post_tags.contains(&(id, *tag_id)) {
                state.post_tags.push((id, *tag_id));
            }
        }
        info!(post_id = %id, tags = tag_ids.len(), "post tags replaced");
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state.comments.iter().any(|c| c.post_id == id) {
            return Err(DomainError::Protected {
                resource: "post",
                referenced_by: "comments",
            });
        }
        let before = state.posts.len();
        state.posts.retain(|p| p.id != id);
        if state.posts.len() == before {
            return Err(DomainError::PostNotFound(id.to_string()));
        }
        state.post_tags.retain(|(p, _)| *p != id);
        info!(post_id = %id, "post deleted");
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(&self, comment: Comment) -> Result<Comment, DomainError> {
        let mut state = self.state.write().await;
        if !state.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(DomainError::PostNotFound(comment.post_id.to_string()));
        }
        if state.user(comment.author_id).is_none() {
            return Err(DomainError::UserNotFound(comment.author_id));
        }
        state.comments.push(comment.clone());
        info!(comment_id = %comment.id, post_id = %comment.post_id, "comment created");
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentEntry>, DomainError> {
        let state = self.state.read().await;
        let mut comments: Vec<CommentEntry> = state
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                state.user(c.author_id).map(|author| CommentEntry {
                    comment: c.clone(),
                    author_username: author.username.clone(),
                })
            })
            .collect();
        comments.sort_by_key(|c| Reverse((c.comment.created_at, c.comment.id)));
        Ok(comments)
    }

    async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        let before = state.comments.len();
        state.comments.retain(|c| c.id != id);
        if state.comments.len() == before {
            return Err(DomainError::CommentNotFound(id));
        }
        info!(comment_id = %id, "comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Repositories;
    use crate::domain::post::NewPost;

    struct Fixture {
        repos: Repositories,
        user: User,
        category: Category,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let user = repos
            .users
            .create(User::new("test_user".into(), "t@test.com".into(), "hash".into()))
            .await
            .unwrap();
        let category = repos
            .categories
            .create(Category::new("Test category".into(), "test-category".into()))
            .await
            .unwrap();
        Fixture {
            repos,
            user,
            category,
        }
    }

    async fn add_post(f: &Fixture, slug: &str, published: bool) -> Post {
        let draft = NewPost {
            title: slug.into(),
            content: format!("content of {slug}"),
            category_id: f.category.id,
            is_published: published,
        };
        f.repos
            .posts
            .create(Post::new(f.user.id, draft, slug.into()), &[])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn category_with_posts_cannot_be_deleted() {
        let f = fixture().await;
        add_post(&f, "first", true).await;

        let err = f.repos.categories.delete(f.category.id).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Protected {
                resource: "category",
                ..
            }
        ));
        assert!(
            f.repos
                .categories
                .find_by_id(f.category.id)
                .await
                .unwrap()
                .is_some()
        );
        assert_eq!(f.repos.posts.count(&PostFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn commented_post_and_its_author_are_protected() {
        let f = fixture().await;
        let post = add_post(&f, "commented", true).await;
        f.repos
            .comments
            .create(Comment::new(post.id, f.user.id, "hi".into()))
            .await
            .unwrap();

        assert!(matches!(
            f.repos.posts.delete(post.id).await,
            Err(DomainError::Protected { resource: "post", .. })
        ));
        assert!(matches!(
            f.repos.users.delete(f.user.id).await,
            Err(DomainError::Protected { resource: "user", .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_slugs_are_refused() {
        let f = fixture().await;
        add_post(&f, "same", true).await;
        let draft = NewPost {
            title: "same".into(),
            content: String::new(),
            category_id: f.category.id,
            is_published: true,
        };
        let err = f
            .repos
            .posts
            .create(Post::new(f.user.id, draft, "same".into()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SlugTaken(slug) if slug == "same"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_view_increments_are_not_lost() {
        let f = fixture().await;
        let post_id = add_post(&f, "popular", true).await.id;

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let posts = Arc::clone(&f.repos.posts);
                tokio::spawn(async move { posts.increment_views(post_id).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = f.repos.posts.find_by_slug("popular").await.unwrap().unwrap();
        assert_eq!(stored.post.views, 50);
    }

    #[tokio::test]
    async fn tag_removal_keeps_posts() {
        let f = fixture().await;
        let tag = f
            .repos
            .tags
            .create(Tag::new("Rust".into(), "rust".into()))
            .await
            .unwrap();
        let post = add_post(&f, "tagged", true).await;
        f.repos.posts.set_tags(post.id, &[tag.id]).await.unwrap();
        assert_eq!(
            f.repos
                .posts
                .count(&PostFilter::published().tag("rust"))
                .await
                .unwrap(),
            1
        );

        f.repos.tags.delete(tag.id).await.unwrap();
        assert!(f.repos.tags.tags_for_post(post.id).await.unwrap().is_empty());
        assert!(f.repos.posts.find_by_slug("tagged").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn tags_rank_by_published_views() {
        let f = fixture().await;
        let quiet = f
            .repos
            .tags
            .create(Tag::new("Quiet".into(), "quiet".into()))
            .await
            .unwrap();
        let loud = f
            .repos
            .tags
            .create(Tag::new("Loud".into(), "loud".into()))
            .await
            .unwrap();
        let empty = f
            .repos
            .tags
            .create(Tag::new("Empty".into(), "empty".into()))
            .await
            .unwrap();
        let seen = add_post(&f, "seen", true).await;
        let draft = add_post(&f, "draft", false).await;
        f.repos.posts.set_tags(seen.id, &[loud.id]).await.unwrap();
        f.repos.posts.set_tags(draft.id, &[quiet.id]).await.unwrap();
        for _ in 0..3 {
            f.repos.posts.increment_views(seen.id).await.unwrap();
            f.repos.posts.increment_views(draft.id).await.unwrap();
        }

        let ranked = f.repos.tags.list_by_views().await.unwrap();
        let order: Vec<&str> = ranked.iter().map(|t| t.tag.slug.as_str()).collect();
        assert_eq!(order, ["loud", "empty", "quiet"]);
        assert_eq!(ranked[0].total_views, 3);
        assert_eq!(ranked[1].total_views, 0);
        assert_eq!(empty.slug, "empty");
    }

    #[tokio::test]
    async fn menu_counts_only_published_posts() {
        let f = fixture().await;
        let idle = f
            .repos
            .categories
            .create(Category::new("Idle".into(), "idle".into()))
            .await
            .unwrap();
        add_post(&f, "one", true).await;
        add_post(&f, "two", false).await;

        let menu = f.repos.categories.list_with_post_counts().await.unwrap();
        assert_eq!(menu.len(), 1);
        assert_eq!(menu[0].category.slug, "test-category");
        assert_eq!(menu[0].post_count, 1);
        assert!(menu.iter().all(|c| c.category.id != idle.id));
    }
}
