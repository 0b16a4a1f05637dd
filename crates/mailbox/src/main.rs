//! Mailbox - store, send and list draft and sent email from the command line.

#![forbid(unsafe_code)]

mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mailbox_core::email::SendEmailApi;
use mailbox_core::{
    CreateInput, EmailInput, EmailRecord, EmailType, Error, GenerateText, ListQuery, Providers,
    SmtpTransmitter, SqliteEmailStore,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;

#[derive(Parser)]
#[command(name = "mailbox", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file [default: <config dir>/mailbox/config.json]
    #[arg(long, global = true, value_name = "PATH", env = "MAILBOX_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a draft, optionally sending it
    Create(CreateArgs),
    /// List one month of drafts or sent email, newest first
    List {
        /// Record type (draft or sent)
        #[arg(long = "type", value_name = "TYPE")]
        email_type: EmailType,
        /// Four digit year
        #[arg(long)]
        year: String,
        /// Two digit month, 01 to 12
        #[arg(long)]
        month: String,
        /// Continuation token from the previous page
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Show a stored record
    Get { id: String },
    /// Delete a stored record
    Delete { id: String },
    /// Send a stored draft
    Send { id: String },
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration
    Init,
    /// Print the effective configuration
    Show,
}

#[derive(clap::Args)]
struct CreateArgs {
    #[arg(long, default_value = "")]
    subject: String,
    #[arg(long)]
    from: Vec<String>,
    #[arg(long)]
    to: Vec<String>,
    #[arg(long)]
    cc: Vec<String>,
    #[arg(long)]
    bcc: Vec<String>,
    #[arg(long)]
    reply_to: Vec<String>,
    /// Plain text body
    #[arg(long, default_value = "")]
    text: String,
    /// HTML body
    #[arg(long, default_value = "")]
    html: String,
    /// Derive the text body from the HTML body (off, auto, on)
    #[arg(long, default_value = "off")]
    generate_text: GenerateText,
    /// Send after storing the draft
    #[arg(long)]
    send: bool,
}

impl From<CreateArgs> for CreateInput {
    fn from(args: CreateArgs) -> Self {
        Self {
            email: EmailInput {
                subject: args.subject,
                from: args.from,
                to: args.to,
                cc: args.cc,
                bcc: args.bcc,
                reply_to: args.reply_to,
                text: args.text,
                html: args.html,
            },
            generate_text: args.generate_text,
            send: args.send,
        }
    }
}

/// Relay used by the workflows.
///
/// A missing or invalid SMTP section only fails at send time, after the
/// draft has been stored.
enum Transmitter {
    Unconfigured(String),
    Smtp(SmtpTransmitter),
}

impl Transmitter {
    fn from_config(config: &Config) -> Self {
        match SmtpTransmitter::new(&config.smtp) {
            Ok(smtp) => Self::Smtp(smtp),
            Err(e) => {
                debug!(error = %e, "SMTP unavailable");
                Self::Unconfigured(e.to_string())
            }
        }
    }
}

impl SendEmailApi for Transmitter {
    async fn send_email(&self, email: &EmailRecord) -> mailbox_core::Result<String> {
        match self {
            Self::Unconfigured(reason) => Err(Error::SendFailed(reason.clone())),
            Self::Smtp(smtp) => smtp.send_email(email).await,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailbox=info,mailbox_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_path);

    if let Commands::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => {
                if config_path.exists() {
                    anyhow::bail!("{} already exists", config_path.display());
                }
                Config::default().save(&config_path).await
            }
            ConfigAction::Show => print_json(&Config::load(&config_path).await?),
        };
    }

    let config = Config::load(&config_path).await?;
    let store = open_store(&config).await?;
    let providers = Providers::default();
    let transmitter = Transmitter::from_config(&config);

    match cli.command {
        Commands::Create(args) => {
            let record =
                mailbox_core::create(&store, &transmitter, &providers, args.into()).await?;
            print_json(&record)
        }
        Commands::List {
            email_type,
            year,
            month,
            cursor,
        } => {
            let query = ListQuery::parse(email_type, &year, &month, cursor.as_deref())?;
            print_json(&mailbox_core::list_by_year_month(&store, &query).await?)
        }
        Commands::Get { id } => print_json(&mailbox_core::get(&store, &id).await?),
        Commands::Delete { id } => {
            mailbox_core::delete(&store, &id).await?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Commands::Send { id } => {
            let record = mailbox_core::send_draft(&store, &transmitter, &providers, &id).await?;
            print_json(&record)
        }
        Commands::Config { .. } => Ok(()),
    }
}

async fn open_store(config: &Config) -> anyhow::Result<SqliteEmailStore> {
    if let Some(dir) = config.database_path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let path = config.database_path.to_string_lossy();
    info!("Opening database at {}", path);
    let store = SqliteEmailStore::new(&path)
        .await
        .with_context(|| format!("opening {path}"))?;
    Ok(store.with_page_size(config.page_size))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::parse_from([
            "mailbox",
            "create",
            "--subject",
            "hi",
            "--to",
            "a@example.com",
            "--to",
            "b@example.com",
            "--html",
            "<p>hi</p>",
            "--generate-text",
            "auto",
            "--send",
        ]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        let input = CreateInput::from(args);
        assert_eq!(input.email.to, ["a@example.com", "b@example.com"]);
        assert_eq!(input.generate_text, GenerateText::Auto);
        assert!(input.send);
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::parse_from([
            "mailbox", "list", "--type", "sent", "--year", "2022", "--month", "03",
        ]);
        let Commands::List {
            email_type, cursor, ..
        } = cli.command
        else {
            panic!("expected list");
        };
        assert_eq!(email_type, EmailType::Sent);
        assert!(cursor.is_none());

        assert!(Cli::try_parse_from(["mailbox", "list", "--type", "spam"]).is_err());
    }

    #[tokio::test]
    async fn test_create_with_send_keeps_draft_without_smtp() {
        use mailbox_core::{FixedClock, YearMonth};

        let store = SqliteEmailStore::in_memory().await.unwrap();
        let transmitter = Transmitter::from_config(&Config::default());
        assert!(matches!(transmitter, Transmitter::Unconfigured(_)));

        let now = Providers::default().now();
        let providers = Providers::default().with_clock(FixedClock(now));
        let cli = Cli::parse_from([
            "mailbox", "create", "--subject", "kept", "--text", "hi", "--send",
        ]);
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };

        let err = mailbox_core::create(&store, &transmitter, &providers, args.into())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SendFailed(_)));

        let query = ListQuery {
            email_type: EmailType::Draft,
            year_month: YearMonth::from_time(&now),
            cursor: None,
        };
        let drafts = mailbox_core::list_by_year_month(&store, &query).await.unwrap();
        assert_eq!(drafts.items.len(), 1);

        let draft = mailbox_core::get(&store, &drafts.items[0].message_id)
            .await
            .unwrap();
        assert_eq!(draft.subject, "kept");
        assert_eq!(draft.text, "hi");
    }
}
