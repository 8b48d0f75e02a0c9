pub mod auth_service;
pub mod catalog_service;
pub mod post_service;
pub mod sidebar_service;
