use std::sync::Arc;

use anyhow::Context;
use artifact_verifier::{ArtifactVerifier, PlatformApiClient, PodClient, VerifierConfig};
use dotenv::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = VerifierConfig::from_env().context("loading configuration")?;
    let api = PlatformApiClient::new(config.api_server_url.clone(), config.http_timeout)
        .context("building platform API client")?;
    let kube_client = kube::Client::try_default()
        .await
        .context("building cluster client")?;
    let cluster = Arc::new(PodClient::new(
        kube_client,
        &config.namespace,
        config.exec_timeout,
    ));

    let verifier = ArtifactVerifier::new(config, api, cluster);
    let report = verifier.run().await.context("running verification scenario")?;

    println!(
        "Verified {} artifact(s) from run {}",
        report.outcomes.len(),
        report.run_id
    );
    for outcome in &report.outcomes {
        let status = if outcome.succeeded { "ok" } else { "FAILED" };
        println!("  {:6} {}", status, outcome.artifact_id);
        if let Some(message) = &outcome.message {
            println!("         {}", message);
        }
    }

    report.ensure_passed().context("artifact verification failed")?;
    Ok(())
}
