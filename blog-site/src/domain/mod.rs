pub mod category;
pub mod comment;
pub mod error;
pub mod pagination;
pub mod post;
pub mod slug;
pub mod tag;
pub mod user;
pub mod validation;
