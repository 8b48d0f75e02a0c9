use std::error::Error as _;
use std::sync::Arc;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::error;

use crate::domain::error::DomainError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("pagination.html", include_str!("../../templates/pagination.html")),
    ("post_list.html", include_str!("../../templates/post_list.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("category.html", include_str!("../../templates/category.html")),
    ("search.html", include_str!("../../templates/search.html")),
    ("single.html", include_str!("../../templates/single.html")),
    ("registration.html", include_str!("../../templates/registration.html")),
    ("add_post.html", include_str!("../../templates/add_post.html")),
];

/// Server-side page rendering over the templates compiled into the binary.
#[derive(Clone)]
pub struct Renderer {
    tera: Arc<Tera>,
}

impl Renderer {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        Ok(Self {
            tera: Arc::new(tera),
        })
    }

    pub fn render<C: Serialize>(&self, template: &str, context: &C) -> Result<String, DomainError> {
        let context = Context::from_serialize(context)
            .map_err(|e| DomainError::Internal(format!("template context: {e}")))?;
        self.tera.render(template, &context).map_err(|e| {
            let cause = e.source().map(ToString::to_string).unwrap_or_default();
            error!(template, "failed to render template: {} {}", e, cause);
            DomainError::Internal(format!("template error: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layout() -> serde_json::Value {
        json!({
            "title": "Home",
            "user": null,
            "menu": [{"id": "1", "title": "News", "slug": "news", "post_count": 2}],
            "sidebar": {"recent": [], "popular": [], "tags": []},
            "s": "",
        })
    }

    #[test]
    fn all_templates_compile() {
        let renderer = Renderer::new().unwrap();
        let names: Vec<&str> = renderer.tera.get_template_names().collect();
        assert_eq!(names.len(), TEMPLATES.len());
    }

    #[test]
    fn listing_renders_and_escapes() {
        let renderer = Renderer::new().unwrap();
        let mut context = layout();
        context["posts"] = json!({
            "items": [{
                "title": "<script>alert(1)</script>",
                "slug": "xss",
                "content": "body",
                "created_at": "2024-01-02T03:04:05Z",
                "views": 7,
                "photo": null,
                "author_username": "test_user",
                "category_title": "News",
                "category_slug": "news",
            }],
            "number": 1, "num_pages": 2, "total": 5, "per_page": 4,
            "has_next": true, "has_previous": false,
            "next_page_number": 2, "previous_page_number": null,
            "is_paginated": true,
        });
        context["is_paginated"] = json!(true);
        context["featured"] = json!([]);

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("href=\"/post/xss/\""));
        assert!(html.contains("?page=2"));
        assert!(html.contains("/category/news/"));
    }

    #[test]
    fn unknown_template_is_an_internal_error() {
        let renderer = Renderer::new().unwrap();
        let err = renderer.render("missing.html", &layout()).unwrap_err();
        assert!(matches!(err, DomainError::Internal(_)));
    }
}
