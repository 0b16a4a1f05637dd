//! Create workflow: store a draft, optionally send it and replace it with the
//! sent record.
//!
//! The draft is always stored before anything is transmitted, and the
//! transition to the sent record happens only after the relay accepted the
//! message. No step is retried here.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::api::{GetEmailApi, PutEmailApi, SendEmailApi, TransitionApi};
use super::model::{CreateInput, EmailRecord, GenerateText};
use crate::providers::Providers;
use crate::service::text::TextExtractor;
use crate::{Error, Result};

/// Prefix of locally generated draft identifiers.
pub const DRAFT_ID_PREFIX: &str = "draft-";

/// Creates a draft and, if requested, sends it.
///
/// Returns the stored draft, or the sent record when `input.send` is set.
///
/// # Errors
///
/// - [`Error::TextGeneration`] if the text body cannot be generated; nothing is stored.
/// - The store's error if the draft cannot be stored; nothing is sent.
/// - The transmitter's error if sending fails; the draft stays stored.
/// - [`Error::TransitionFailed`] if the message was sent but the draft could
///   not be replaced.
pub async fn create<S, T>(
    store: &S,
    transmitter: &T,
    providers: &Providers,
    input: CreateInput,
) -> Result<EmailRecord>
where
    S: PutEmailApi + TransitionApi,
    T: SendEmailApi,
{
    let CreateInput {
        mut email,
        generate_text,
        send,
    } = input;

    email.text = resolve_text(providers.text(), generate_text, email.text, &email.html)?;

    let message_id = format!("{DRAFT_ID_PREFIX}{}", providers.random_hex());
    let draft = EmailRecord::draft(message_id, providers.now(), email);

    store.put_email(&draft).await?;
    debug!(message_id = %draft.message_id(), "Draft stored");

    if !send {
        return Ok(draft);
    }

    let time_updated = draft.index.time_updated;
    send_and_transition(store, transmitter, draft, time_updated).await
}

/// Sends a stored draft and replaces it with the sent record.
///
/// This is the retry path for drafts left behind by a failed send or a
/// failed transition.
///
/// # Errors
///
/// - [`Error::NotFound`] if no record is stored under `message_id`.
/// - [`Error::InvalidInput`] if the record was already sent.
/// - The transmitter's error, or [`Error::TransitionFailed`], as for [`create`].
pub async fn send_draft<S, T>(
    store: &S,
    transmitter: &T,
    providers: &Providers,
    message_id: &str,
) -> Result<EmailRecord>
where
    S: GetEmailApi + TransitionApi,
    T: SendEmailApi,
{
    let draft = store
        .get_email(message_id)
        .await?
        .ok_or_else(|| Error::NotFound(message_id.to_owned()))?;

    if !draft.is_draft() {
        return Err(Error::InvalidInput(format!(
            "{message_id} has already been sent"
        )));
    }

    send_and_transition(store, transmitter, draft, providers.now()).await
}

async fn send_and_transition<S, T>(
    store: &S,
    transmitter: &T,
    draft: EmailRecord,
    time_updated: DateTime<Utc>,
) -> Result<EmailRecord>
where
    S: TransitionApi,
    T: SendEmailApi,
{
    let sent_id = transmitter
        .send_email(&draft)
        .await
        .inspect_err(|e| warn!(message_id = %draft.message_id(), error = %e, "Send failed, draft kept"))?;

    let draft_id = draft.message_id().to_owned();
    let sent = draft.into_sent(sent_id, time_updated);

    if let Err(source) = store.transition(&draft_id, &sent).await {
        warn!(
            draft_id = %draft_id,
            sent_id = %sent.message_id(),
            error = %source,
            "Email sent but draft was not replaced"
        );
        return Err(Error::TransitionFailed {
            draft_id,
            sent_id: sent.index.message_id,
            source: Box::new(source),
        });
    }

    info!(draft_id = %draft_id, sent_id = %sent.message_id(), "Email sent");
    Ok(sent)
}

fn resolve_text(
    extractor: &dyn TextExtractor,
    mode: GenerateText,
    text: String,
    html: &str,
) -> Result<String> {
    match mode {
        GenerateText::Off => Ok(text),
        GenerateText::Auto if !text.is_empty() => Ok(text),
        GenerateText::Auto | GenerateText::On => extractor.extract(html),
    }
}
