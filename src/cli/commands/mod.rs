pub mod avatar;
pub mod cache;

pub use avatar::handle_avatar_command;
pub use cache::handle_cache_command;
