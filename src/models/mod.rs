pub mod content;
pub mod role;
pub mod user;
