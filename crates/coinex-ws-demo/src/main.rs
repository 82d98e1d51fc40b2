/*
[INPUT]:  Optional coinex-demo.yaml, COINEX_* environment, OS shutdown signals
[OUTPUT]: Three demonstration sessions against the CoinEx WebSocket feed
[POS]:    Binary entry point
[UPDATE]: When changing startup flow, scenario order, or shutdown handling
*/

use anyhow::{Context, Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coinex_ws_demo::{DemoConfig, Scenario, run_scenario};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = DemoConfig::load().context("load demo configuration")?;
    info!(
        ws_url = %config.ws_url,
        markets = ?config.markets(),
        authenticated = config.credentials().is_some(),
        "starting coinex-ws-demo"
    );

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    for scenario in Scenario::ALL {
        if shutdown.is_cancelled() {
            info!(scenario = scenario.name(), "shutdown requested; not starting scenario");
            continue;
        }

        match run_scenario(scenario, &config, &shutdown).await {
            Ok(report) => info!(
                scenario = scenario.name(),
                stop = ?report.stop,
                handled = report.handled,
                "scenario complete"
            ),
            Err(err) => error!(scenario = scenario.name(), error = %format!("{err:#}"), "scenario failed"),
        }
    }

    info!("all scenarios finished");
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
