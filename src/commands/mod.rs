//! CLI commands

pub mod init;
pub mod list;
pub mod render;
pub mod sanitize;
