//! End-to-end checks of the create and listing workflows against an
//! in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mailbox_core::email::SendEmailApi;
use mailbox_core::{
    Clock, CreateInput, Cursor, EmailInput, EmailRecord, EmailType, Error, GenerateText, ListQuery,
    Providers, SqliteEmailStore, create, delete, get, list_by_year_month, send_draft,
};

/// Hands out `relay-1`, `relay-2`, ... and can be told to refuse.
#[derive(Default)]
struct Relay {
    sent: Mutex<Vec<String>>,
    refuse: bool,
}

impl SendEmailApi for Relay {
    async fn send_email(&self, email: &EmailRecord) -> mailbox_core::Result<String> {
        if self.refuse {
            return Err(Error::SendFailed("connection refused".into()));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.message_id().to_owned());
        Ok(format!("relay-{}", sent.len()))
    }
}

/// A clock that advances one minute per reading.
struct Ticking(Mutex<DateTime<Utc>>);

impl Clock for Ticking {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.0.lock().unwrap();
        let current = *now;
        *now += Duration::minutes(1);
        current
    }
}

fn providers_from(start: DateTime<Utc>) -> Providers {
    Providers::default().with_clock(Ticking(Mutex::new(start)))
}

fn input(subject: &str, send: bool) -> CreateInput {
    CreateInput {
        email: EmailInput {
            subject: subject.into(),
            from: vec!["me@example.com".into()],
            to: vec!["you@example.com".into()],
            html: format!("<p>{subject}</p>"),
            ..Default::default()
        },
        generate_text: GenerateText::Auto,
        send,
    }
}

async fn list_all(store: &SqliteEmailStore, email_type: EmailType, month: &str) -> Vec<String> {
    let mut ids = Vec::new();
    let mut token = None;
    loop {
        let query = ListQuery::parse(email_type, "2022", month, token.as_deref()).unwrap();
        let page = list_by_year_month(store, &query).await.unwrap();
        token = page.next_cursor.as_ref().map(Cursor::encode);
        ids.extend(page.into_iter().map(|item| item.message_id));
        if token.is_none() {
            return ids;
        }
    }
}

#[tokio::test]
async fn create_send_and_list() {
    let store = SqliteEmailStore::in_memory().await.unwrap().with_page_size(2);
    let relay = Relay::default();
    let providers = providers_from(Utc.with_ymd_and_hms(2022, 3, 31, 23, 57, 0).unwrap());

    let kept = create(&store, &relay, &providers, input("first", false))
        .await
        .unwrap();
    let sent_one = create(&store, &relay, &providers, input("second", true))
        .await
        .unwrap();
    let sent_two = create(&store, &relay, &providers, input("third", true))
        .await
        .unwrap();
    // Crosses into April.
    let april = create(&store, &relay, &providers, input("fourth", false))
        .await
        .unwrap();

    assert_eq!(kept.text, "first");
    assert_eq!(sent_one.message_id(), "relay-1");
    assert_eq!(sent_two.message_id(), "relay-2");
    assert_eq!(relay.sent.lock().unwrap().len(), 2);

    assert_eq!(
        list_all(&store, EmailType::Sent, "03").await,
        ["relay-2", "relay-1"]
    );
    assert_eq!(
        list_all(&store, EmailType::Draft, "03").await,
        [kept.message_id()]
    );
    assert_eq!(
        list_all(&store, EmailType::Draft, "04").await,
        [april.message_id()]
    );

    let loaded = get(&store, "relay-1").await.unwrap();
    assert_eq!(loaded, sent_one);
    assert_eq!(loaded.email_type(), EmailType::Sent);
}

#[tokio::test]
async fn failed_send_can_be_retried() {
    let store = SqliteEmailStore::in_memory().await.unwrap();
    let providers = providers_from(Utc.with_ymd_and_hms(2022, 3, 10, 8, 0, 0).unwrap());

    let refusing = Relay {
        refuse: true,
        ..Default::default()
    };
    let err = create(&store, &refusing, &providers, input("retry me", true))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::SendFailed(_)));

    let drafts = list_all(&store, EmailType::Draft, "03").await;
    assert_eq!(drafts.len(), 1);

    let relay = Relay::default();
    let sent = send_draft(&store, &relay, &providers, &drafts[0])
        .await
        .unwrap();
    assert_eq!(sent.message_id(), "relay-1");
    assert!(list_all(&store, EmailType::Draft, "03").await.is_empty());

    let err = send_draft(&store, &relay, &providers, "relay-1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn delete_removes_from_listing() {
    let store = SqliteEmailStore::in_memory().await.unwrap();
    let relay = Relay::default();
    let providers = providers_from(Utc.with_ymd_and_hms(2022, 3, 10, 8, 0, 0).unwrap());

    let draft = create(&store, &relay, &providers, input("gone", false))
        .await
        .unwrap();
    delete(&store, draft.message_id()).await.unwrap();

    assert!(list_all(&store, EmailType::Draft, "03").await.is_empty());
    assert!(matches!(
        get(&store, draft.message_id()).await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        delete(&store, draft.message_id()).await.unwrap_err(),
        Error::NotFound(_)
    ));
}
