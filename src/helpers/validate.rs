//! Input validation helpers

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, SiteError};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^\S+@\S+\.\S+$").unwrap();
}

/// Loose email check: something@something.something without whitespace
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Fail with a validation error when the value is blank
pub fn require(field: &str, value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(SiteError::validation(field, message))
    } else {
        Ok(())
    }
}
