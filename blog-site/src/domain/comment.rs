use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

const DISPLAY_LEN: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post_id: Uuid, author_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.content.chars().take(DISPLAY_LEN).collect();
        f.write_str(head.trim_end())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommentEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub comment: Comment,
    pub author_username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_first_fifty_chars() {
        let comment = Comment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Test comment content 1, test comment content 2 and (not_visible)".into(),
        );
        assert_eq!(
            comment.to_string(),
            "Test comment content 1, test comment content 2 and"
        );
    }
}
