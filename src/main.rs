use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use campaign_console::api::{CampaignApi, HttpCampaignApi, Role};
use campaign_console::config;
use campaign_console::model::CampaignId;
use campaign_console::poller::ReplyPoller;
use campaign_console::store::CampaignStore;

#[derive(Debug, Parser)]
#[command(author, version, about = "Watch the reply count of a campaign until interrupted")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Campaign to watch
    #[arg(long)]
    campaign: String,

    /// Role whose API key is used
    #[arg(long, value_enum, default_value_t = Role::Manager)]
    role: Role,
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

    let api: Arc<dyn CampaignApi> = Arc::new(HttpCampaignApi::from_config(&cfg, args.role)?);
    let store = Arc::new(CampaignStore::new(api));
    store.refresh().await?;

    let id = CampaignId::new(args.campaign);
    let token = store.select(Some(id.clone()));
    match store.selected() {
        Some(c) => info!(campaign_id = %id, name = %c.name, status = %c.status, "watching campaign"),
        None => bail!("campaign {} not found", id),
    }

    let poller = ReplyPoller::new(Arc::clone(&store), cfg.poll_interval());
    poller.start(token);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(cfg.poll_interval());
    let mut last = None;
    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(err) = res {
                    warn!(?err, "failed to listen for ctrl-c");
                }
                break;
            }
            _ = ticker.tick() => {
                let count = store.reply_count();
                if last != Some(count) {
                    info!(campaign_id = %id, replies = count, "reply count");
                    last = Some(count);
                }
            }
        }
    }

    poller.stop();
    info!("stopped watching");
    Ok(())
}
