pub mod context;
pub mod dto;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod utils;
