//! Plain text generation from HTML bodies.

use crate::{Error, Result};

/// Derives a plain text body from an HTML body.
pub trait TextExtractor: Send + Sync {
    /// Returns the text content of `html`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TextGeneration`] if the HTML cannot be converted.
    fn extract(&self, html: &str) -> Result<String>;
}

/// Converts HTML to Markdown-flavoured plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlText;

impl TextExtractor for HtmlText {
    fn extract(&self, html: &str) -> Result<String> {
        let converter = htmd::HtmlToMarkdown::builder()
            .skip_tags(vec!["head", "script", "style"])
            .build();

        converter
            .convert(html)
            .map(|text| text.trim().to_owned())
            .map_err(|e| Error::TextGeneration(e.to_string()))
    }
}
