//! Email record model types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::index::{PartitionKey, time_format};
use crate::Error;

/// Lifecycle state of an email record.
///
/// The only transition is `Draft` to `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailType {
    /// Stored but not yet transmitted.
    Draft,
    /// Transmitted and keyed by the identifier the transmission service returned.
    Sent,
}

impl EmailType {
    /// Stored representation of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
        }
    }
}

impl fmt::Display for EmailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            _ => Err(Error::InvalidInput(format!("unknown email type: {s:?}"))),
        }
    }
}

/// When and how to derive the plain text body from the HTML body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerateText {
    /// Keep the supplied text, even when empty.
    #[default]
    Off,
    /// Generate only when the supplied text is empty.
    Auto,
    /// Always generate, replacing the supplied text.
    On,
}

impl FromStr for GenerateText {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "auto" => Ok(Self::Auto),
            "on" => Ok(Self::On),
            _ => Err(Error::InvalidInput(format!(
                "unknown text generation mode: {s:?}"
            ))),
        }
    }
}

/// Email content supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailInput {
    /// Subject line.
    pub subject: String,
    /// Sender addresses.
    pub from: Vec<String>,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses.
    pub bcc: Vec<String>,
    /// Reply-To addresses.
    pub reply_to: Vec<String>,
    /// Plain text body.
    pub text: String,
    /// HTML body.
    pub html: String,
}

/// Input to the create workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInput {
    /// Email content.
    #[serde(flatten)]
    pub email: EmailInput,
    /// Text generation mode.
    #[serde(default)]
    pub generate_text: GenerateText,
    /// Whether to send the email after storing the draft.
    #[serde(default)]
    pub send: bool,
}

/// The projection stored in the month index and returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeIndex {
    /// Record identifier.
    pub message_id: String,
    /// Record type.
    #[serde(rename = "type")]
    pub email_type: EmailType,
    /// Time of the last workflow operation, whole seconds, UTC.
    #[serde(with = "time_format")]
    pub time_updated: DateTime<Utc>,
}

impl TimeIndex {
    /// Partition this entry belongs to, derived from type and time.
    #[must_use]
    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::for_time(self.email_type, &self.time_updated)
    }
}

/// A stored email, either a draft or a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    /// Identifier, type and update time.
    #[serde(flatten)]
    pub index: TimeIndex,
    /// Subject line.
    pub subject: String,
    /// Sender addresses.
    pub from: Vec<String>,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// CC addresses.
    pub cc: Vec<String>,
    /// BCC addresses.
    pub bcc: Vec<String>,
    /// Reply-To addresses.
    pub reply_to: Vec<String>,
    /// Plain text body.
    pub text: String,
    /// HTML body.
    pub html: String,
}

impl EmailRecord {
    /// Creates a draft record from caller content.
    #[must_use]
    pub fn draft(message_id: String, time_updated: DateTime<Utc>, input: EmailInput) -> Self {
        Self {
            index: TimeIndex {
                message_id,
                email_type: EmailType::Draft,
                time_updated,
            },
            subject: input.subject,
            from: input.from,
            to: input.to,
            cc: input.cc,
            bcc: input.bcc,
            reply_to: input.reply_to,
            text: input.text,
            html: input.html,
        }
    }

    /// Turns this record into its sent counterpart under the external identifier.
    #[must_use]
    pub fn into_sent(self, message_id: String, time_updated: DateTime<Utc>) -> Self {
        Self {
            index: TimeIndex {
                message_id,
                email_type: EmailType::Sent,
                time_updated,
            },
            ..self
        }
    }

    /// Record identifier.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.index.message_id
    }

    /// Record type.
    #[must_use]
    pub const fn email_type(&self) -> EmailType {
        self.index.email_type
    }

    /// Returns true if the record has not been sent.
    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.index.email_type == EmailType::Draft
    }

    /// Partition this record is listed under.
    #[must_use]
    pub fn partition_key(&self) -> PartitionKey {
        self.index.partition_key()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_input() -> EmailInput {
        EmailInput {
            subject: "subject".into(),
            from: vec!["from@example.com".into()],
            to: vec!["to@example.com".into()],
            text: "text".into(),
            html: "<p>html</p>".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_email_type_parse() {
        assert_eq!("draft".parse::<EmailType>().unwrap(), EmailType::Draft);
        assert_eq!("Sent".parse::<EmailType>().unwrap(), EmailType::Sent);
        assert!(matches!(
            "inbox".parse::<EmailType>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_generate_text_parse() {
        assert_eq!("auto".parse::<GenerateText>().unwrap(), GenerateText::Auto);
        assert_eq!("ON".parse::<GenerateText>().unwrap(), GenerateText::On);
        assert!("sometimes".parse::<GenerateText>().is_err());
        assert_eq!(GenerateText::default(), GenerateText::Off);
    }

    #[test]
    fn test_into_sent_keeps_content() {
        let time = Utc.with_ymd_and_hms(2022, 3, 16, 16, 55, 45).unwrap();
        let draft = EmailRecord::draft("draft-1".into(), time, sample_input());
        assert!(draft.is_draft());

        let sent = draft.clone().into_sent("sent-1".into(), time);
        assert_eq!(sent.message_id(), "sent-1");
        assert_eq!(sent.email_type(), EmailType::Sent);
        assert_eq!(sent.subject, draft.subject);
        assert_eq!(sent.to, draft.to);
        assert_eq!(sent.html, draft.html);
        assert_eq!(sent.partition_key().to_string(), "sent#2022-03");
    }

    #[test]
    fn test_record_json_shape() {
        let time = Utc.with_ymd_and_hms(2022, 3, 16, 16, 55, 45).unwrap();
        let draft = EmailRecord::draft("draft-1".into(), time, sample_input());
        let json = serde_json::to_value(&draft).unwrap();

        assert_eq!(json["messageId"], "draft-1");
        assert_eq!(json["type"], "draft");
        assert_eq!(json["timeUpdated"], "2022-03-16T16:55:45Z");
        assert_eq!(json["replyTo"], serde_json::json!([]));
    }
}
