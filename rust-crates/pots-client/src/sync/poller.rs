use super::GameSync;
use crate::{
    metadata::MetadataSource,
    store::GameStore,
    types::GameState,
    wallet::WalletProvider,
};
use std::time::Duration;
use tokio::{
    sync::{
        mpsc,
        watch,
    },
    task::{
        JoinError,
        JoinHandle,
    },
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    info,
    warn,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollCommand {
    /// Run a cycle right away. `game_ended` reports a round end: round timing is then
    /// refetched on every cycle until the next round shows up.
    FetchNow { game_ended: bool },
    Shutdown,
}

/// Owner side of a running poller.
pub struct PollHandle {
    commands: mpsc::UnboundedSender<PollCommand>,
    snapshots: watch::Receiver<GameStore>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn subscribe(&self) -> watch::Receiver<GameStore> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> GameStore {
        self.snapshots.borrow().clone()
    }

    /// Returns false once the poller has stopped.
    pub fn fetch_now(&self, game_ended: bool) -> bool {
        self.commands
            .send(PollCommand::FetchNow { game_ended })
            .is_ok()
    }

    pub async fn shutdown(self) -> Result<(), JoinError> {
        let _ = self.commands.send(PollCommand::Shutdown);
        self.task.await
    }
}

/// Drives a [`GameSync`] from a single task: the initial fetch, then one cycle per tick or
/// per command. Cycles never overlap; a late tick is delayed rather than doubled up.
pub struct Poller;

impl Poller {
    pub fn spawn<W, M>(sync: GameSync<W, M>, period: Duration) -> PollHandle
    where
        W: WalletProvider + 'static,
        W::Signer: 'static,
        W::Querier: 'static,
        M: MetadataSource + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(sync.store().clone());
        let task = tokio::spawn(run(sync, period, command_rx, snapshot_tx));
        PollHandle {
            commands,
            snapshots,
            task,
        }
    }
}

async fn run<W, M>(
    mut sync: GameSync<W, M>,
    period: Duration,
    mut commands: mpsc::UnboundedReceiver<PollCommand>,
    snapshots: watch::Sender<GameStore>,
) where
    W: WalletProvider,
    M: MetadataSource,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut loaded = false;
    let mut round_end: Option<PendingRoundEnd> = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            cmd = commands.recv() => {
                match cmd {
                    Some(PollCommand::FetchNow { game_ended }) => {
                        if game_ended && round_end.is_none() {
                            round_end = Some(PendingRoundEnd {
                                stale: sync.store().game_state().copied(),
                            });
                        }
                    }
                    Some(PollCommand::Shutdown) | None => break,
                }
            }
        }
        let game_ended = round_end.is_some();
        let refreshed = cycle(&mut sync, &mut loaded, game_ended, &snapshots).await;
        if refreshed
            && let Some(pending) = round_end.as_ref()
            && pending.stale != sync.store().game_state().copied()
        {
            debug!(
                round = ?sync.store().game_state().map(|s| s.round_count),
                "next round picked up"
            );
            round_end = None;
        }
    }
    info!("game poller stopped");
}

/// A reported round end. Round timing keeps being refetched until the stored state differs
/// from `stale`, since the contract only rolls over once someone ends the game.
struct PendingRoundEnd {
    stale: Option<GameState>,
}

/// Returns true when the interval fetch went through.
async fn cycle<W, M>(
    sync: &mut GameSync<W, M>,
    loaded: &mut bool,
    game_ended: bool,
    snapshots: &watch::Sender<GameStore>,
) -> bool
where
    W: WalletProvider,
    M: MetadataSource,
{
    // the initial fetch is retried every cycle until it goes through once
    if !*loaded {
        match sync.fetch_once().await {
            Ok(()) => *loaded = true,
            Err(err) => warn!(%err, "initial game fetch failed"),
        }
    }
    let refreshed = if *loaded {
        match sync.fetch_interval(game_ended).await {
            Ok(()) => true,
            Err(err) => {
                warn!(%err, game_ended, "poll cycle failed");
                false
            }
        }
    } else {
        false
    };
    let latest = sync.store().clone();
    snapshots.send_if_modified(|current| {
        if *current == latest {
            return false;
        }
        *current = latest;
        true
    });
    refreshed
}
