//! Initialize a new site directory

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# Mastering Subconscious site configuration

# Site
title: Mastering Subconscious
description: PSYCH-K® sessions and articles on subconscious change
author: N.L. Bhattarai
language: en

# URL
url: http://localhost:4000
date_format: '%B %-d, %Y'

# Server
server:
  host: 127.0.0.1
  port: 4000

# Managed backend. Leave the url empty to run against the in-memory backend.
# SUPABASE_URL, SUPABASE_ANON_KEY and SUPABASE_SERVICE_ROLE_KEY override these.
backend:
  url: ''
  anon_key: ''
  service_role_key: ''

# Appointment notifications.
# MAILJET_API_KEY and MAILJET_SECRET_KEY override the credentials.
mail:
  api_key: ''
  secret_key: ''
  sender_email: noreply@submindmastery.com
  sender_name: Mastering Subconscious
  recipient_email: ''
  recipient_name: N.L BHATTARAI

# Image uploads
uploads:
  max_bytes: 5242880
  article_bucket: blog_images
  facilitator_bucket: facilitator-images
"#;

/// Initialize a new site in the given directory
///
/// An existing configuration file is left untouched.
pub fn init_site(target_dir: &Path) -> Result<bool> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        tracing::warn!("{:?} already exists, leaving it unchanged", config_path);
        return Ok(false);
    }
    fs::write(&config_path, DEFAULT_CONFIG)?;
    tracing::debug!("Wrote {:?}", config_path);
    Ok(true)
}
