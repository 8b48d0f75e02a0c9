use serde::Serialize;

use crate::application::sidebar_service::{Sidebar, SidebarService};
use crate::domain::category::{Category, CategoryWithCount};
use crate::domain::comment::CommentEntry;
use crate::domain::error::DomainError;
use crate::domain::pagination::Page;
use crate::domain::post::{PostDetail, PostEntry};
use crate::domain::tag::Tag;
use crate::presentation::forms::{CommentForm, FormState};
use crate::presentation::utils::AuthenticatedUser;

/// Context shared by every page: title, current user, menu and sidebar.
#[derive(Debug, Serialize)]
pub struct Layout {
    pub title: String,
    pub user: Option<AuthenticatedUser>,
    pub menu: Vec<CategoryWithCount>,
    pub sidebar: Sidebar,
    /// Current search term, echoed into the search box.
    pub s: String,
}

impl Layout {
    pub async fn load(
        sidebar: &SidebarService,
        title: impl Into<String>,
        user: Option<AuthenticatedUser>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            title: title.into(),
            user,
            menu: sidebar.menu().await?,
            sidebar: sidebar.sidebar().await?,
            s: String::new(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListingPage {
    #[serde(flatten)]
    pub layout: Layout,
    pub posts: Page<PostEntry>,
    pub is_paginated: bool,
    pub featured: Vec<PostEntry>,
}

impl ListingPage {
    pub fn new(layout: Layout, posts: Page<PostEntry>) -> Self {
        Self {
            layout,
            is_paginated: posts.is_paginated,
            posts,
            featured: Vec::new(),
        }
    }

    pub fn with_featured(mut self, featured: Vec<PostEntry>) -> Self {
        self.featured = featured;
        self
    }

    /// Echoes the term into the search box and the pagination links.
    pub fn with_search(mut self, term: &str) -> Self {
        self.layout.s = term.to_string();
        self
    }
}

#[derive(Debug, Serialize)]
pub struct DetailPage {
    #[serde(flatten)]
    pub layout: Layout,
    pub post_item: PostEntry,
    pub tags: Vec<Tag>,
    pub comments: Vec<CommentEntry>,
    pub form: FormState<CommentForm>,
}

impl DetailPage {
    pub fn new(layout: Layout, detail: PostDetail, form: FormState<CommentForm>) -> Self {
        Self {
            layout,
            post_item: detail.post,
            tags: detail.tags,
            comments: detail.comments,
            form,
        }
    }
}

/// Account and post-creation forms.
#[derive(Debug, Serialize)]
pub struct FormPage<T: Serialize> {
    #[serde(flatten)]
    pub layout: Layout,
    pub form: FormState<T>,
    pub action: &'static str,
    pub mode: &'static str,
    pub categories: Vec<Category>,
}

impl<T: Serialize> FormPage<T> {
    pub fn new(layout: Layout, form: FormState<T>, action: &'static str, mode: &'static str) -> Self {
        Self {
            layout,
            form,
            action,
            mode,
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }
}
