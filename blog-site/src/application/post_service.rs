use std::sync::Arc;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::data::Repositories;
use crate::data::category_repository::CategoryRepository;
use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::data::tag_repository::TagRepository;
use crate::domain::category::Category;
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::pagination::{PAGE_SIZE, Page, Paginator};
use crate::domain::post::{NewPost, Post, PostDetail, PostEntry, PostFilter, PostOrder, PostUpdate};
use crate::domain::slug::{next_free, slugify};
use crate::domain::tag::Tag;
use crate::domain::validation::{FormErrors, REQUIRED, validate_post_title};
use crate::presentation::utils::AuthenticatedUser;

// inserts lost to a concurrent post taking the same slug
const MAX_SLUG_RETRIES: u32 = 5;
pub const SLUG_UNAVAILABLE: &str = "Could not derive a free address for this title. Please try again.";
pub const INVALID_CATEGORY: &str =
    "Select a valid choice. That choice is not one of the available choices.";

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    tags: Arc<dyn TagRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            posts: Arc::clone(&repos.posts),
            categories: Arc::clone(&repos.categories),
            tags: Arc::clone(&repos.tags),
            comments: Arc::clone(&repos.comments),
        }
    }

    /// Published posts that are not featured; may be empty.
    pub async fn home(&self, page: Option<&str>) -> Result<Page<PostEntry>, DomainError> {
        self.paginate(&PostFilter::published().on_main(false), page, true)
            .await
    }

    pub async fn by_category(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<(Category, Page<PostEntry>), DomainError> {
        let category = self
            .categories
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::CategoryNotFound(slug.to_string()))?;
        let posts = self
            .paginate(&PostFilter::published().category(slug), page, false)
            .await?;
        Ok((category, posts))
    }

    pub async fn by_tag(
        &self,
        slug: &str,
        page: Option<&str>,
    ) -> Result<(Tag, Page<PostEntry>), DomainError> {
        let tag = self
            .tags
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::TagNotFound(slug.to_string()))?;
        let posts = self
            .paginate(&PostFilter::published().tag(slug), page, false)
            .await?;
        Ok((tag, posts))
    }

    /// Case-insensitive match on title or content. A blank term finds nothing.
    pub async fn search(
        &self,
        term: &str,
        page: Option<&str>,
    ) -> Result<Page<PostEntry>, DomainError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Page::empty());
        }
        self.paginate(&PostFilter::published().search(term), page, true)
            .await
    }

    async fn paginate(
        &self,
        filter: &PostFilter,
        page: Option<&str>,
        allow_empty: bool,
    ) -> Result<Page<PostEntry>, DomainError> {
        let total = self.posts.count(filter).await?;
        if total == 0 && !allow_empty {
            return Err(DomainError::EmptyListing);
        }
        let paginator = Paginator::new(total, PAGE_SIZE);
        let number = paginator.resolve(page)?;
        let items = self
            .posts
            .list(
                filter,
                PostOrder::Newest,
                paginator.per_page(),
                paginator.offset(number),
            )
            .await?;
        debug!(total, page = number, "listing paginated");
        Ok(Page::new(items, number, &paginator))
    }

    /// Looks a post up for display. Drafts are only shown to their author
    /// and to staff.
    async fn visible_post(
        &self,
        slug: &str,
        viewer: Option<&AuthenticatedUser>,
    ) -> Result<PostEntry, DomainError> {
        let entry = self
            .posts
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(slug.to_string()))?;
        let visible = entry.post.is_published
            || viewer.is_some_and(|v| v.is_staff || v.id == entry.post.author_id);
        if !visible {
            return Err(DomainError::PostNotFound(slug.to_string()));
        }
        Ok(entry)
    }

    /// Detail page data. Every call counts one view.
    #[instrument(skip(self, viewer))]
    pub async fn open_post(
        &self,
        slug: &str,
        viewer: Option<&AuthenticatedUser>,
    ) -> Result<PostDetail, DomainError> {
        let mut entry = self.visible_post(slug, viewer).await?;
        entry.post.views = self
            .posts
            .increment_views(entry.post.id)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(slug.to_string()))?;
        let tags = self.tags.tags_for_post(entry.post.id).await?;
        let comments = self.comments.list_for_post(entry.post.id).await?;
        Ok(PostDetail {
            post: entry,
            tags,
            comments,
        })
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create_post(&self, author_id: Uuid, draft: NewPost) -> Result<Post, DomainError> {
        if self
            .categories
            .find_by_id(draft.category_id)
            .await?
            .is_none()
        {
            return Err(DomainError::Validation(FormErrors::single(
                "category",
                INVALID_CATEGORY,
            )));
        }

        let base = slugify(&draft.title);
        for _ in 0..MAX_SLUG_RETRIES {
            let taken = self.posts.slugs_with_prefix(&base).await?;
            let slug = next_free(&base, &taken);
            match self
                .posts
                .create(Post::new(author_id, draft.clone(), slug), &[])
                .await
            {
                Err(DomainError::SlugTaken(slug)) => {
                    debug!(%slug, "slug taken concurrently, retrying");
                }
                other => return other,
            }
        }
        warn!(%base, "no free slug after {} attempts", MAX_SLUG_RETRIES);
        Err(DomainError::Validation(FormErrors::single(
            "title",
            SLUG_UNAVAILABLE,
        )))
    }

    #[instrument(skip(self, author, content), fields(author = %author.username))]
    pub async fn add_comment(
        &self,
        slug: &str,
        author: &AuthenticatedUser,
        content: &str,
    ) -> Result<Comment, DomainError> {
        let entry = self.visible_post(slug, Some(author)).await?;
        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::Validation(FormErrors::single(
                "content", REQUIRED,
            )));
        }
        self.comments
            .create(Comment::new(entry.post.id, author.id, content.to_string()))
            .await
    }

    /// Staff edit. The slug stays fixed; `tag_ids`, when given, replaces
    /// the post's tags.
    #[instrument(skip(self, update, tag_ids))]
    pub async fn update_post(
        &self,
        slug: &str,
        mut update: PostUpdate,
        tag_ids: Option<Vec<Uuid>>,
    ) -> Result<PostEntry, DomainError> {
        let entry = self
            .posts
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(slug.to_string()))?;

        let mut errors = FormErrors::new();
        if let Some(title) = update.title.as_deref() {
            match validate_post_title(title) {
                Ok(title) => update.title = Some(title),
                Err(message) => errors.add("title", message),
            }
        }
        if let Some(ids) = tag_ids.as_deref() {
            let found = self.tags.find_by_ids(ids).await?;
            if let Some(missing) = ids.iter().find(|id| !found.iter().any(|t| t.id == **id)) {
                errors.add("tag_ids", format!("Unknown tag: {missing}"));
            }
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let id = entry.post.id;
        self.posts
            .update(id, update)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(slug.to_string()))?;
        if let Some(ids) = tag_ids {
            self.posts.set_tags(id, &ids).await?;
        }
        self.posts
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(slug.to_string()))
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, slug: &str) -> Result<(), DomainError> {
        let entry = self
            .posts
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::PostNotFound(slug.to_string()))?;
        self.posts.delete(entry.post.id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_comment(&self, id: Uuid) -> Result<(), DomainError> {
        self.comments.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::User;

    struct Fixture {
        repos: Repositories,
        service: PostService,
        author: User,
        category: Category,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let author = repos
            .users
            .create(User::new("test_user".into(), "t@example.com".into(), "x".into()))
            .await
            .unwrap();
        let category = repos
            .categories
            .create(Category::new("News".into(), "news".into()))
            .await
            .unwrap();
        Fixture {
            service: PostService::new(&repos),
            repos,
            author,
            category,
        }
    }

    fn draft(f: &Fixture, title: &str, published: bool) -> NewPost {
        NewPost {
            title: title.into(),
            content: "Test content".into(),
            category_id: f.category.id,
            is_published: published,
        }
    }

    fn viewer(user: &User) -> AuthenticatedUser {
        AuthenticatedUser {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }

    #[tokio::test]
    async fn same_title_gets_suffixed_slugs() {
        let f = fixture().await;
        let first = f.service.create_post(f.author.id, draft(&f, "Test post", true)).await.unwrap();
        let second = f.service.create_post(f.author.id, draft(&f, "Test post", true)).await.unwrap();
        let third = f.service.create_post(f.author.id, draft(&f, "Test post", true)).await.unwrap();
        assert_eq!(first.slug, "test-post");
        assert_eq!(second.slug, "test-post-2");
        assert_eq!(third.slug, "test-post-3");
    }

    #[tokio::test]
    async fn a_hundred_and_one_posts_share_a_title() {
        let f = fixture().await;
        let mut last = None;
        for _ in 0..101 {
            last = Some(f.service.create_post(f.author.id, draft(&f, "Same", true)).await.unwrap());
        }
        assert_eq!(last.unwrap().slug, "same-101");
        let total = f.repos.posts.count(&PostFilter::published()).await.unwrap();
        assert_eq!(total, 101);
    }

    #[tokio::test]
    async fn unknown_category_is_a_form_error() {
        let f = fixture().await;
        let mut bad = draft(&f, "Test post", true);
        bad.category_id = Uuid::new_v4();
        match f.service.create_post(f.author.id, bad).await {
            Err(DomainError::Validation(errors)) => assert!(errors.has("category")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn home_paginates_by_four() {
        let f = fixture().await;
        for i in 0..5 {
            f.service
                .create_post(f.author.id, draft(&f, &format!("Post {i}"), true))
                .await
                .unwrap();
        }
        f.service.create_post(f.author.id, draft(&f, "Draft", false)).await.unwrap();

        let first = f.service.home(None).await.unwrap();
        assert_eq!(first.len(), 4);
        assert!(first.is_paginated);
        assert_eq!(first.total, 5);
        let second = f.service.home(Some("2")).await.unwrap();
        assert_eq!(second.len(), 1);
        assert!(matches!(
            f.service.home(Some("3")).await,
            Err(DomainError::InvalidPage(_))
        ));
    }

    #[tokio::test]
    async fn featured_posts_are_kept_off_the_home_list() {
        let f = fixture().await;
        let post = f.service.create_post(f.author.id, draft(&f, "Big news", true)).await.unwrap();
        f.service
            .update_post(
                &post.slug,
                PostUpdate {
                    on_main: Some(true),
                    ..PostUpdate::default()
                },
                None,
            )
            .await
            .unwrap();
        assert!(f.service.home(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_category_and_unknown_tag_are_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.service.by_category("news", None).await,
            Err(DomainError::EmptyListing)
        ));
        assert!(matches!(
            f.service.by_category("missing", None).await,
            Err(DomainError::CategoryNotFound(_))
        ));
        assert!(matches!(
            f.service.by_tag("missing", None).await,
            Err(DomainError::TagNotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_covers_content_and_skips_drafts() {
        let f = fixture().await;
        let mut hidden = draft(&f, "Weekly notes", true);
        hidden.content = "All about Ownership".into();
        f.service.create_post(f.author.id, hidden).await.unwrap();
        let mut unpublished = draft(&f, "Ownership draft", false);
        unpublished.content = "ownership".into();
        f.service.create_post(f.author.id, unpublished).await.unwrap();

        let found = f.service.search("OWNERSHIP", None).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.items[0].post.title, "Weekly notes");
        assert!(f.service.search("   ", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn each_open_counts_a_view() {
        let f = fixture().await;
        let post = f.service.create_post(f.author.id, draft(&f, "Counted", true)).await.unwrap();
        for expected in 1..=3 {
            let detail = f.service.open_post(&post.slug, None).await.unwrap();
            assert_eq!(detail.post.post.views, expected);
        }
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_other_readers() {
        let f = fixture().await;
        let post = f.service.create_post(f.author.id, draft(&f, "Secret", false)).await.unwrap();
        let stranger = f
            .repos
            .users
            .create(User::new("other".into(), "o@example.com".into(), "x".into()))
            .await
            .unwrap();

        assert!(f.service.open_post(&post.slug, None).await.unwrap_err().is_not_found());
        assert!(f
            .service
            .open_post(&post.slug, Some(&viewer(&stranger)))
            .await
            .is_err());
        assert!(f.service.open_post(&post.slug, Some(&viewer(&f.author))).await.is_ok());
    }

    #[tokio::test]
    async fn comments_need_content_and_come_newest_first() {
        let f = fixture().await;
        let post = f.service.create_post(f.author.id, draft(&f, "Discussed", true)).await.unwrap();
        let author = viewer(&f.author);

        assert!(matches!(
            f.service.add_comment(&post.slug, &author, "  ").await,
            Err(DomainError::Validation(_))
        ));
        f.service.add_comment(&post.slug, &author, "first").await.unwrap();
        f.service.add_comment(&post.slug, &author, "second").await.unwrap();

        let detail = f.service.open_post(&post.slug, None).await.unwrap();
        let contents: Vec<&str> = detail
            .comments
            .iter()
            .map(|c| c.comment.content.as_str())
            .collect();
        assert_eq!(contents, ["second", "first"]);
    }

    #[tokio::test]
    async fn staff_update_keeps_slug_and_checks_title() {
        let f = fixture().await;
        let post = f.service.create_post(f.author.id, draft(&f, "Original", true)).await.unwrap();

        let bad = PostUpdate {
            title: Some("1st edition".into()),
            ..PostUpdate::default()
        };
        assert!(matches!(
            f.service.update_post(&post.slug, bad, None).await,
            Err(DomainError::Validation(_))
        ));

        let good = PostUpdate {
            title: Some("Renamed".into()),
            ..PostUpdate::default()
        };
        let updated = f.service.update_post(&post.slug, good, Some(vec![])).await.unwrap();
        assert_eq!(updated.post.title, "Renamed");
        assert_eq!(updated.post.slug, "original");
        assert!(updated.post.updated_at >= post.updated_at);
    }

    #[tokio::test]
    async fn commented_post_cannot_be_deleted() {
        let f = fixture().await;
        let post = f.service.create_post(f.author.id, draft(&f, "Busy", true)).await.unwrap();
        let comment = f
            .service
            .add_comment(&post.slug, &viewer(&f.author), "hi")
            .await
            .unwrap();

        assert!(matches!(
            f.service.delete_post(&post.slug).await,
            Err(DomainError::Protected { .. })
        ));
        f.service.delete_comment(comment.id).await.unwrap();
        f.service.delete_post(&post.slug).await.unwrap();
    }
}
