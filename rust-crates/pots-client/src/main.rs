use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use itertools::Itertools;
use prudent_pots_client::{
    config::ClientConfig,
    countdown::{
        Clock,
        Countdown,
        round_ended,
    },
    messages::{
        DEFAULT_DISPLAY_DECIMALS,
        display_amount,
        pot_name,
    },
    metadata::HttpMetadataClient,
    store::GameStore,
    sync::{
        GameSync,
        Poller,
    },
    wallet::WatchOnlyWallet,
};
use tracing::{
    info,
    warn,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = ClientConfig::parse();

    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .init();

    config.validate().wrap_err("invalid configuration")?;
    info!(
        query = %config.query_endpoint(),
        contract = %config.contract,
        "starting pots-watch"
    );

    let wallet = WatchOnlyWallet::new(config.address.clone(), config.query_endpoint());
    let metadata = config
        .nft_base_url()
        .map(HttpMetadataClient::new)
        .transpose()
        .wrap_err("failed to build metadata client")?;
    let sync = GameSync::new(wallet, metadata, config.sync_settings());
    let poller = Poller::spawn(sync, config.poll_interval());
    let mut snapshots = poller.subscribe();

    let clock = Clock::start();
    let mut ticks = clock.subscribe();
    let mut prev_ms = clock.now_ms();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("poller stopped unexpectedly");
                    break;
                }
                let store = snapshots.borrow_and_update().clone();
                println!("{}", status_line(&store, clock.now_ms()));
            }
            changed = ticks.changed() => {
                if changed.is_err() {
                    break;
                }
                let now_ms = *ticks.borrow_and_update();
                let state = snapshots.borrow().game_state().copied();
                if let Some(state) = state
                    && round_ended(&state, prev_ms, now_ms)
                {
                    info!(round = state.round_count, "round ended, refreshing game state");
                    poller.fetch_now(true);
                }
                prev_ms = now_ms;
            }
            _ = &mut interrupted => {
                info!("interrupted, shutting down");
                break;
            }
        }
    }

    poller
        .shutdown()
        .await
        .wrap_err("poller task failed")?;
    Ok(())
}

fn status_line(store: &GameStore, now_ms: i64) -> String {
    let round = store
        .game_state()
        .map(|state| {
            let countdown = Countdown::derive(state, now_ms);
            let label = if countdown.is_counting_down_to_start() {
                "starts in"
            } else {
                "ends in"
            };
            format!("round {} {label} {}", state.round_count, countdown.human())
        })
        .unwrap_or_else(|| "round unknown".to_string());
    let pots = store
        .pots()
        .iter()
        .map(|pot| {
            format!(
                "{}={}",
                pot_name(pot.pot_id),
                display_amount(pot.amount, DEFAULT_DISPLAY_DECIMALS)
            )
        })
        .join(" ");
    let winning = store
        .winning_pots()
        .iter()
        .map(|id| pot_name(*id))
        .join(",");
    let bids = match (store.min_bid(), store.max_bid()) {
        (Some(min), Some(max)) => format!(
            "{}..{}",
            display_amount(min, DEFAULT_DISPLAY_DECIMALS),
            display_amount(max, DEFAULT_DISPLAY_DECIMALS)
        ),
        _ => "-".to_string(),
    };
    let mut line = format!("{round} | {pots} | winning: {winning} | bid: {bids}");
    if let Some(balance) = store.user_balance_display() {
        line.push_str(&format!(" | balance: {balance}"));
    }
    line
}
