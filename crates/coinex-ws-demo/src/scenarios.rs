/*
[INPUT]:  DemoConfig, shutdown CancellationToken
[OUTPUT]: Three timed demonstration sessions and their reports
[POS]:    Scenario layer - connect, authenticate, subscribe, read
[UPDATE]: When adding scenarios or changing their subscription sets
*/

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use coinex_ws_adapter::ws::dispatch;
use coinex_ws_adapter::{CoinexWebSocket, MessageHandler, PriceAlert, ServerMessage};
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DemoConfig;
use crate::console::{ConsoleHandler, ConsoleStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    PublicData,
    Authenticated,
    PingKeepAlive,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::PublicData,
        Scenario::Authenticated,
        Scenario::PingKeepAlive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::PublicData => "public-data",
            Scenario::Authenticated => "authenticated",
            Scenario::PingKeepAlive => "ping-keep-alive",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Scenario::PublicData => "Example 1: Public Market Data (No Authentication)",
            Scenario::Authenticated => "Example 2: Authenticated Connection (Account Data)",
            Scenario::PingKeepAlive => "Example 3: Long-running Connection with Ping",
        }
    }
}

/// Why a read session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Elapsed,
    Cancelled,
    ConnectionClosed,
    /// Scenario did not run (missing credentials)
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub stop: StopReason,
    pub handled: usize,
    pub dropped: usize,
    pub pings_sent: usize,
    pub stats: ConsoleStats,
}

impl ScenarioReport {
    fn skipped(scenario: Scenario) -> Self {
        Self {
            scenario,
            stop: StopReason::Skipped,
            handled: 0,
            dropped: 0,
            pings_sent: 0,
            stats: ConsoleStats::default(),
        }
    }
}

#[derive(Debug, Default)]
struct SessionOutcome {
    handled: usize,
    dropped: usize,
    pings_sent: usize,
}

/// Run one scenario with console output to stdout.
pub async fn run_scenario(
    scenario: Scenario,
    config: &DemoConfig,
    shutdown: &CancellationToken,
) -> Result<ScenarioReport> {
    let handler = with_configured_alert(config, ConsoleHandler::stdout());
    run_scenario_with(scenario, config, shutdown, handler).await
}

/// Run one scenario, printing through `handler`.
pub async fn run_scenario_with<W: Write>(
    scenario: Scenario,
    config: &DemoConfig,
    shutdown: &CancellationToken,
    mut handler: ConsoleHandler<W>,
) -> Result<ScenarioReport> {
    handler.banner(scenario.title());

    let credentials = config.credentials();
    if scenario == Scenario::Authenticated && credentials.is_none() {
        handler.line("Set COINEX_ACCESS_ID and COINEX_SECRET_KEY to run this example; skipping.");
        info!(scenario = scenario.name(), "no credentials configured; scenario skipped");
        return Ok(ScenarioReport::skipped(scenario));
    }

    let mut ws = CoinexWebSocket::with_url(config.ws_url.as_str());
    if let Some(credentials) = credentials {
        ws = ws.with_credentials(credentials);
    }
    let mut rx = ws
        .take_receiver()
        .context("message receiver already taken")?;

    handler.line("Connecting to CoinEx WebSocket...");
    ws.connect()
        .await
        .with_context(|| format!("connect to {}", config.ws_url))?;
    handler.line("Connected.");

    let result = drive(scenario, config, shutdown, &ws, &mut rx, &mut handler).await;
    ws.close().await;

    let (session, stop) = result?;
    handler.line(&format!(
        "{} finished: {} messages, {} pings",
        scenario.name(),
        session.handled,
        session.pings_sent
    ));
    info!(
        scenario = scenario.name(),
        ?stop,
        handled = session.handled,
        dropped = session.dropped,
        pings_sent = session.pings_sent,
        "scenario finished"
    );

    Ok(ScenarioReport {
        scenario,
        stop,
        handled: session.handled,
        dropped: session.dropped,
        pings_sent: session.pings_sent,
        stats: handler.stats(),
    })
}

fn with_configured_alert<W: Write>(
    config: &DemoConfig,
    handler: ConsoleHandler<W>,
) -> ConsoleHandler<W> {
    match (config.alert_low, config.alert_high) {
        (Some(low), Some(high)) => handler.with_alert(PriceAlert::new(low, high)),
        _ => handler,
    }
}

async fn drive<W: Write>(
    scenario: Scenario,
    config: &DemoConfig,
    shutdown: &CancellationToken,
    ws: &CoinexWebSocket,
    rx: &mut mpsc::Receiver<ServerMessage>,
    handler: &mut ConsoleHandler<W>,
) -> Result<(SessionOutcome, StopReason)> {
    let primary = config.primary_market();

    let (duration, ping_every) = match scenario {
        Scenario::PublicData => {
            for market in config.markets() {
                handler.line(&format!("Subscribing to ticker, depth and trades for {market}..."));
                ws.subscribe_ticker(&market)
                    .await
                    .with_context(|| format!("subscribe ticker {market}"))?;
                ws.subscribe_depth(&market, config.depth_limit, &config.depth_interval)
                    .await
                    .with_context(|| format!("subscribe depth {market}"))?;
                ws.subscribe_trades(&market)
                    .await
                    .with_context(|| format!("subscribe trades {market}"))?;
            }
            (config.public_duration(), None)
        }
        Scenario::Authenticated => {
            handler.line("Authenticating...");
            ws.authenticate().await.context("authenticate")?;
            handler.line("Authentication successful.");

            ws.subscribe_balance().await.context("subscribe balance")?;
            ws.subscribe_user_order()
                .await
                .context("subscribe user orders")?;
            ws.subscribe_user_deals()
                .await
                .context("subscribe user deals")?;
            ws.subscribe_ticker(&primary)
                .await
                .with_context(|| format!("subscribe ticker {primary}"))?;
            (config.private_duration(), None)
        }
        Scenario::PingKeepAlive => {
            ws.subscribe_ticker(&primary)
                .await
                .with_context(|| format!("subscribe ticker {primary}"))?;
            (config.ping_duration(), Some(config.ping_interval()))
        }
    };

    handler.line(&format!(
        "\nListening for updates ({} seconds)...\n",
        duration.as_secs()
    ));
    info!(
        scenario = scenario.name(),
        duration_secs = duration.as_secs(),
        ping_interval_secs = ping_every.map(|every| every.as_secs()),
        "scenario listening"
    );

    Ok(read_session(ws, rx, handler, duration, ping_every, shutdown).await)
}

/// Dispatch messages until `duration` elapses, the token fires or the
/// connection ends; pings every `ping_every` when set.
async fn read_session<H: MessageHandler + ?Sized>(
    ws: &CoinexWebSocket,
    rx: &mut mpsc::Receiver<ServerMessage>,
    handler: &mut H,
    duration: Duration,
    ping_every: Option<Duration>,
    shutdown: &CancellationToken,
) -> (SessionOutcome, StopReason) {
    let deadline = Instant::now() + duration;
    let mut pinging = ping_every.is_some();
    let period = ping_every.unwrap_or(duration).max(Duration::from_millis(1));
    let mut ping_timer = interval_at(Instant::now() + period, period);
    let mut state = ws.watch_state();
    let mut outcome = SessionOutcome::default();

    let stop = loop {
        tokio::select! {
            _ = shutdown.cancelled() => break StopReason::Cancelled,
            _ = sleep_until(deadline) => break StopReason::Elapsed,
            _ = ping_timer.tick(), if pinging => {
                match ws.ping().await {
                    Ok(id) => {
                        outcome.pings_sent += 1;
                        info!(request_id = id, "-> ping sent");
                    }
                    Err(err) => {
                        warn!(error = %err, "ping failed; no further pings this session");
                        pinging = false;
                    }
                }
            }
            message = rx.recv() => {
                match message {
                    Some(message) => {
                        if dispatch(message, handler) {
                            outcome.handled += 1;
                        } else {
                            outcome.dropped += 1;
                        }
                    }
                    None => break StopReason::ConnectionClosed,
                }
            }
            changed = state.changed() => {
                if changed.is_err() || !state.borrow_and_update().is_connected() {
                    drain(rx, handler, &mut outcome);
                    break StopReason::ConnectionClosed;
                }
            }
        }
    };

    (outcome, stop)
}

fn drain<H: MessageHandler + ?Sized>(
    rx: &mut mpsc::Receiver<ServerMessage>,
    handler: &mut H,
    outcome: &mut SessionOutcome,
) {
    while let Ok(message) = rx.try_recv() {
        if dispatch(message, handler) {
            outcome.handled += 1;
        } else {
            outcome.dropped += 1;
        }
    }
}
