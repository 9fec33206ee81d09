use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use campaign_console::api::{HttpCampaignApi, Role};
use campaign_console::config;
use campaign_console::console::{Confirm, SendConsole};
use campaign_console::export::CsvKind;
use campaign_console::model::{Campaign, CampaignId, CampaignStatus};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "M-UI campaign manager: create campaigns, upload recipients, send, and export data"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List campaigns, newest first
    List,
    /// Create a campaign container; content is written in C-UI
    Create { name: String },
    /// Show status, content and reply count
    Show {
        #[arg(long)]
        campaign: String,
    },
    /// Upload a file with one recipient email per line
    Upload {
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Send a ready campaign to its uploaded recipients
    Send {
        #[arg(long)]
        campaign: String,
    },
    /// Upload a recipient CSV and send immediately
    UploadAndSend {
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        file: PathBuf,
    },
    /// Download replies or the email/token map as CSV
    Export {
        #[arg(long)]
        campaign: String,
        #[arg(long, value_enum)]
        kind: CsvKind,
        /// Directory to write into (defaults to app.download_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete ALL campaigns, recipients and replies on the server
    ClearAll,
}

/// Reads confirmations from the terminal.
struct StdinConfirm;

impl StdinConfirm {
    fn ask(&self, prompt: &str) -> Option<String> {
        print!("{prompt} ");
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        self.ask(&format!("{prompt} [y/N]"))
            .is_some_and(|answer| matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
    }

    fn phrase(&mut self, prompt: &str) -> Option<String> {
        self.ask(&format!("{prompt}:"))
    }
}

fn print_campaign(c: &Campaign) {
    println!("{}  {} - {}", c.id, c.name, c.status);
}

fn select(console: &SendConsole, campaign: String) -> Result<Campaign> {
    let id = CampaignId::new(campaign);
    console.select(Some(id.clone()));
    match console.store().selected() {
        Some(c) => Ok(c),
        None => bail!("campaign {} not found", id),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;
    let api = Arc::new(HttpCampaignApi::from_config(&cfg, Role::Manager)?);
    let console = SendConsole::new(api, cfg.poll_interval());
    console.refresh().await?;

    match args.command {
        Command::List => {
            for c in console.store().campaigns() {
                print_campaign(&c);
            }
        }
        Command::Create { name } => {
            let created = console.create(&name).await?;
            print_campaign(&created);
        }
        Command::Show { campaign } => {
            let c = select(&console, campaign)?;
            let replies = console.store().refresh_reply_count().await;
            println!("Status: {}", c.status);
            println!("Subject: {}", c.subject.as_deref().unwrap_or("-"));
            println!("Body:\n{}", c.body.as_deref().unwrap_or("-"));
            println!("Replies: {replies}");
            if c.status != CampaignStatus::Ready {
                println!("Campaign must be marked ready in C-UI before sending.");
            }
        }
        Command::Upload { campaign, file } => {
            select(&console, campaign)?;
            let outcome = console.upload_recipients(&file).await?;
            println!("Uploaded: {}", outcome.uploaded);
        }
        Command::Send { campaign } => {
            select(&console, campaign)?;
            if !console.can_send() {
                bail!("Campaign must be marked ready in C-UI before sending.");
            }
            let outcome = console.send_now().await?;
            println!("Sent: {}\nFailed: {}", outcome.sent, outcome.failed);
        }
        Command::UploadAndSend { campaign, file } => {
            select(&console, campaign)?;
            if !console.can_send() {
                bail!("Campaign must be marked ready in C-UI before sending.");
            }
            let outcome = console.upload_and_send(&file).await?;
            println!("Sent: {}\nFailed: {}", outcome.sent, outcome.failed);
        }
        Command::Export {
            campaign,
            kind,
            out,
        } => {
            select(&console, campaign)?;
            let dir = out.unwrap_or_else(|| PathBuf::from(&cfg.app.download_dir));
            let path = console.export(kind, &dir).await?;
            println!("{}", path.display());
        }
        Command::ClearAll => {
            console.clear_all_data(&mut StdinConfirm).await?;
            println!("All data cleared");
        }
    }

    Ok(())
}
