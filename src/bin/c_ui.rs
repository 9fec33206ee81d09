use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use campaign_console::api::{HttpCampaignApi, Role};
use campaign_console::config;
use campaign_console::editor::ContentEditor;
use campaign_console::model::{Campaign, CampaignId};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "C-UI campaign editor: edit campaign content and view replies"
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
    /// Create a campaign shell; content is added later
    Create { name: String },
    /// Show a campaign's content and reply count
    Show {
        #[arg(long)]
        campaign: String,
    },
    /// Replace a campaign's subject and body and mark it ready
    Edit {
        #[arg(long)]
        campaign: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the body from a file
        #[arg(long)]
        body_file: Option<PathBuf>,
    },
    /// Download the replies CSV
    Replies {
        #[arg(long)]
        campaign: String,
        /// Directory to write into (defaults to app.download_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn print_campaign(c: &Campaign) {
    println!("{}  {} - {}", c.id, c.name, c.status);
}

fn select(editor: &mut ContentEditor, campaign: String) -> Result<Campaign> {
    let id = CampaignId::new(campaign);
    editor.select(Some(id.clone()));
    match editor.store().selected() {
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
    let api = Arc::new(HttpCampaignApi::from_config(&cfg, Role::Content)?);
    let mut editor = ContentEditor::new(api, cfg.poll_interval());
    editor.refresh().await?;

    match args.command {
        Command::List => {
            for c in editor.store().campaigns() {
                print_campaign(&c);
            }
        }
        Command::Create { name } => {
            let created = editor.create(&name).await?;
            print_campaign(&created);
        }
        Command::Show { campaign } => {
            let c = select(&mut editor, campaign)?;
            let replies = editor.store().refresh_reply_count().await;
            print_campaign(&c);
            if c.status.is_terminal() {
                println!("This campaign has already been sent.");
            }
            println!("Subject: {}", editor.subject());
            println!("Body:\n{}", editor.body());
            println!("Replies received: {replies}");
        }
        Command::Edit {
            campaign,
            subject,
            body,
            body_file,
        } => {
            select(&mut editor, campaign)?;
            if !editor.can_edit() {
                bail!("This campaign has already been sent.");
            }
            if let Some(subject) = subject {
                editor.set_subject(subject);
            }
            if let Some(path) = body_file {
                editor.set_body(tokio::fs::read_to_string(&path).await?);
            } else if let Some(body) = body {
                editor.set_body(body);
            }
            editor.save().await?;
            println!("Campaign content saved");
        }
        Command::Replies { campaign, out } => {
            select(&mut editor, campaign)?;
            editor.store().refresh_reply_count().await;
            if !editor.can_download_replies() {
                println!("No replies yet.");
                return Ok(());
            }
            let dir = out.unwrap_or_else(|| PathBuf::from(&cfg.app.download_dir));
            let path = editor.export_replies(&dir).await?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
