//! Sanitize pasted HTML from the command line

use anyhow::Result;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::content::ContentDocument;

/// Read HTML from a file, or stdin when no file is given
pub fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => Ok(fs::read_to_string(path)?),
        None => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

/// Print the sanitized HTML, or its paragraph blocks as JSON
pub fn run(file: Option<&Path>, blocks: bool) -> Result<()> {
    let document = ContentDocument::from_paste(read_input(file)?);
    if blocks {
        println!("{}", serde_json::to_string_pretty(document.blocks())?);
    } else {
        println!("{}", document.sanitized());
    }
    tracing::debug!(
        "Sanitized {} bytes into {} blocks",
        document.raw().len(),
        document.blocks().len()
    );
    Ok(())
}
