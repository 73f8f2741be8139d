//! Site configuration (site.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the configuration file in the site directory
pub const CONFIG_FILE: &str = "site.yml";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,

    // Date format for article pages (chrono strftime)
    pub date_format: String,

    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Mastering Subconscious".to_string(),
            description: "PSYCH-K® sessions and articles on subconscious change".to_string(),
            author: "N.L. Bhattarai".to_string(),
            language: "en".to_string(),

            url: "http://localhost:4000".to_string(),

            date_format: "%B %-d, %Y".to_string(),

            server: ServerConfig::default(),
            backend: BackendConfig::default(),
            mail: MailConfig::default(),
            uploads: UploadConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load `site.yml` from a directory if present, then apply environment overrides
    pub fn load_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let path = base_dir.as_ref().join(CONFIG_FILE);
        let mut config = if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            Self::load(&path)?
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Override secrets from the environment
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 5] = [
            ("SUPABASE_URL", &mut self.backend.url),
            ("SUPABASE_ANON_KEY", &mut self.backend.anon_key),
            ("SUPABASE_SERVICE_ROLE_KEY", &mut self.backend.service_role_key),
            ("MAILJET_API_KEY", &mut self.mail.api_key),
            ("MAILJET_SECRET_KEY", &mut self.mail.secret_key),
        ];
        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                tracing::debug!("Using {} from the environment", key);
                *target = value;
            }
        }
    }

    /// Whether the hosted backend is configured
    pub fn has_remote_backend(&self) -> bool {
        !self.backend.url.trim().is_empty()
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
        }
    }
}

/// Hosted backend endpoint and keys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL. Empty selects the in-memory backend.
    pub url: String,
    pub anon_key: String,
    pub service_role_key: String,
}

/// Outbound notification mail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Send API base URL. Empty means the public Mailjet endpoint.
    pub api_url: String,
    pub api_key: String,
    pub secret_key: String,
    pub sender_email: String,
    pub sender_name: String,
    pub recipient_email: String,
    pub recipient_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            secret_key: String::new(),
            sender_email: "noreply@submindmastery.com".to_string(),
            sender_name: "Mastering Subconscious".to_string(),
            recipient_email: String::new(),
            recipient_name: "N.L BHATTARAI".to_string(),
        }
    }
}

/// Image upload limits and buckets
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
    pub article_bucket: String,
    pub facilitator_bucket: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            article_bucket: "blog_images".to_string(),
            facilitator_bucket: "facilitator-images".to_string(),
        }
    }
}
