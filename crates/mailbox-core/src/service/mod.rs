//! External collaborators used by the email workflows.
//!
//! This module provides the production implementations of text extraction
//! and message transmission.

pub mod smtp;
pub mod text;

pub use smtp::{Security, SmtpConfig, SmtpTransmitter};
pub use text::{HtmlText, TextExtractor};
