pub mod args;
pub mod commands;
pub mod root;
pub mod ui;

pub use args::{Args, AvatarAction, AvatarTarget, Commands};
pub use root::RootCommand;
