use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use rs_mail_archiver::app::{build_archiver, build_http_client};
use rs_mail_archiver::archive::OutcomeSource;
use rs_mail_archiver::auth::token_store;
use rs_mail_archiver::config::{Config, load_config, resolve_db_path};
use rs_mail_archiver::daemon::{DaemonConfig, run_daemon};
use rs_mail_archiver::http::fixture;
use rs_mail_archiver::ipc::{self, Request};
use rs_mail_archiver::logging::{self, ComponentLogger};
use rs_mail_archiver::store::memory::MemoryStore;
use rs_mail_archiver::store::repo::{KeyValueStore, load_archived};
use rs_mail_archiver::store::sqlite::SqliteStore;

#[derive(Parser)]
#[command(name = "rs_mail_archiver")]
#[command(about = "Archive unread Gmail messages on a schedule", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon: hourly archiving plus manual triggers
    Daemon {
        /// Answer Gmail calls from built-in fixtures
        #[arg(long)]
        mock: bool,

        /// Override interval_minutes from the config
        #[arg(long)]
        interval_minutes: Option<u64>,
    },

    /// Ask the running daemon to archive right now
    ArchiveNow,

    /// Run a single archive pass in this process
    RunOnce {
        #[arg(long)]
        mock: bool,

        /// Keep results in memory instead of the database
        #[arg(long)]
        ephemeral: bool,
    },

    /// Print the message references stored by the last pass
    Show,

    /// Check whether Gmail calls are being answered by fixtures
    MockStatus {
        #[arg(long)]
        mock: bool,
    },

    /// Store the OAuth client secret in keyring
    SetClientSecret {
        #[arg(long)]
        client_id: String,
    },
}

fn config() -> Result<Config> {
    load_config().map_err(|e| anyhow!("Configuration error: {e}"))
}

fn open_store(cfg: &Config) -> Result<Arc<dyn KeyValueStore>> {
    Ok(Arc::new(SqliteStore::open(&resolve_db_path(cfg)?)?))
}

fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::SetClientSecret { client_id } => {
            eprintln!("Paste client secret (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut secret)?;
            token_store::save_client_secret(&client_id, secret.trim())?;
            println!("Saved client secret for client_id {}", client_id);
            Ok(())
        }

        Command::Daemon {
            mock,
            interval_minutes,
        } => {
            let mut cfg = config()?;
            if let Some(m) = interval_minutes {
                cfg.interval_minutes = m;
                cfg.validate()?;
            }
            let http = build_http_client(&cfg, mock || cfg.mock)?;
            let archiver = build_archiver(&cfg, http, open_store(&cfg)?);

            run_daemon(
                Arc::new(archiver),
                DaemonConfig {
                    interval: cfg.interval(),
                    socket_path: ipc::socket_path()?,
                },
                ComponentLogger::new("Background"),
            )
        }

        Command::ArchiveNow => {
            let log = ComponentLogger::new("Popup");
            log.info("Archive button clicked", &[]);
            let resp = ipc::send(&Request::ArchiveNow)?;
            log.info(
                "Received response from background",
                &[("status", &resp.status), ("count", &resp.count)],
            );
            println!("{} ({} messages)", resp.status, resp.count);
            Ok(())
        }

        Command::RunOnce { mock, ephemeral } => {
            let cfg = config()?;
            let http = build_http_client(&cfg, mock || cfg.mock)?;
            let store: Arc<dyn KeyValueStore> = if ephemeral {
                Arc::new(MemoryStore::new())
            } else {
                open_store(&cfg)?
            };
            let outcome = build_archiver(&cfg, http, store).run_pass()?;

            for m in &outcome.messages {
                println!("{}", m.id);
            }
            if outcome.source == OutcomeSource::Degraded {
                eprintln!("Gmail unreachable; reported fallback record");
            }
            // let the delayed fallback write land before the process exits
            if let Some(pending) = outcome.deferred_write {
                pending.wait()?;
            }
            Ok(())
        }

        Command::Show => {
            let cfg = config()?;
            let store = open_store(&cfg)?;
            let items = load_archived(store.as_ref())?;
            if items.is_empty() {
                println!("Nothing archived yet.");
            }
            for m in items {
                println!(
                    "{}\t{}\t{}",
                    m.id,
                    m.thread_id.unwrap_or_default(),
                    m.subject.unwrap_or_default()
                );
            }
            Ok(())
        }

        Command::MockStatus { mock } => {
            let cfg = config()?;
            let http = build_http_client(&cfg, mock || cfg.mock)?;
            let status = fixture::check_mock_status(http.as_ref(), &cfg.api_base, &ComponentLogger::new("Popup"));
            println!("{status}");
            Ok(())
        }
    }
}
