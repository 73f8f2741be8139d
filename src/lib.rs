//! submind: the blog and admin content core of the Mastering Subconscious site
//!
//! Article content pasted from rich-text editors is sanitized, split into
//! paragraph blocks and rendered with its images interleaved. Around that sit
//! the public blog, the admin panel and the appointment notification function,
//! all backed by a managed database, auth and storage service.

pub mod admin;
pub mod auth;
pub mod backend;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod helpers;
pub mod newsletter;
pub mod notify;
pub mod records;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// The main application
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Database, auth, storage and mail collaborators
    pub backend: backend::Backend,
}

impl Site {
    /// Create a site from a directory, reading `site.yml` and the environment
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config = config::SiteConfig::load_dir(&base_dir)?;
        let backend = backend::Backend::from_config(&config);
        Ok(Self {
            config,
            base_dir,
            backend,
        })
    }

    /// Serve the site until interrupted
    pub async fn serve(&self, ip: &str, port: u16) -> Result<()> {
        server::start(self, ip, port).await
    }
}
