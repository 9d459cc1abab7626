use std::sync::Arc;

use anyhow::bail;
use tracing::{info, warn};

use super::{DataArgs, SubmitterArgs, build_submitter, init_index, load_settings, shutdown_token};
use crate::github::GitHubClient;
use crate::release::ReleaseProcessor;
use crate::watch::{WatchConfig, Watcher};
use crate::webhook::{self, WebhookState};

pub async fn run_watch(data: DataArgs, submitter: SubmitterArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&data)?;
    submitter.apply(&mut settings);

    let index = Arc::new(init_index(&settings)?);
    let processor = Arc::new(ReleaseProcessor::new(index, build_submitter(&settings)?));

    let github = &settings.github;
    if github.token.is_none() {
        warn!("GITHUB_TOKEN is not set; unauthenticated requests have a much smaller quota");
    }
    let source = Arc::new(GitHubClient::new(&github.api_url, github.token.as_deref())?);

    info!(submitter = %settings.submitter, "starting watcher");
    let watcher = Watcher::new(source, processor, WatchConfig::from(&settings.watch));
    let stats = watcher.stats();
    let result = watcher.run(shutdown_token()).await;
    info!(
        polls = stats.polls(),
        pages_all_new = stats.pages_all_new(),
        tick_backlogs = stats.tick_backlogs(),
        dropped_batches = stats.dropped_batches(),
        "watcher stopped"
    );
    result?;
    Ok(())
}

pub async fn run_listen(
    host: Option<String>,
    port: Option<u16>,
    data: DataArgs,
    submitter: SubmitterArgs,
) -> anyhow::Result<()> {
    let mut settings = load_settings(&data)?;
    submitter.apply(&mut settings);
    if let Some(host) = host {
        settings.webhook.host = host;
    }
    if let Some(port) = port {
        settings.webhook.port = port;
    }

    let Some(secret) = settings.webhook.secret.clone() else {
        bail!("DEPFRESH_WEBHOOK_SECRET must be set to verify webhook deliveries");
    };

    let index = Arc::new(init_index(&settings)?);
    let state = Arc::new(WebhookState {
        processor: Arc::new(ReleaseProcessor::new(index, build_submitter(&settings)?)),
        secret: secret.into_bytes(),
    });

    let addr = settings.webhook.socket_addr()?;
    info!("Starting webhook listener on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    webhook::serve(listener, state, shutdown_token()).await?;
    Ok(())
}
