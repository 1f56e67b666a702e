//! Player threads.
//!
//! A [`Player`] is the part shared with the host and the arbiter: identity, score, and the
//! entry of its click queue. The [`PlayerAgent`] is the thread-owned part driving the
//! collect / claim / verdict cycle. Computer players get a second thread pushing random clicks
//! whenever the agent is ready to use them.

use std::{
    io,
    sync::{
        atomic::{AtomicU32, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use rand::Rng;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::board::Board;
use crate::configuration::Configuration;
use crate::signal::{Gate, Termination, WAKE_INTERVAL};
use crate::user_interface::UserInterface;
use crate::{PlayerId, Slot};

/// Outcome of a claim, decided by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The player no longer had a full group of markers when the claim was serviced.
    EmptyClaim,
    /// The marked cards form a set. They have been removed from the table.
    ValidSet,
    /// The marked cards do not form a set.
    InvalidSet,
}

/// A player as seen from outside its thread.
#[derive(Debug)]
pub struct Player {
    /// Id of the player, starting from 0.
    pub id: PlayerId,
    human: bool,
    score: AtomicU32,
    clicks: SyncSender<Slot>,
    /// Open while the agent is collecting markers, closed while it waits for a verdict or is
    /// frozen.
    ready: Gate,
}

impl Player {
    /// Queue a click on `slot`.
    ///
    /// Never blocks: the click is dropped if the queue is full or the player has terminated.
    pub fn key_pressed(&self, slot: Slot) {
        match self.clicks.try_send(slot) {
            Ok(()) => trace!(player = self.id, slot, "click"),
            Err(TrySendError::Full(_)) => trace!(player = self.id, slot, "click dropped"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Current score.
    pub fn score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }

    /// True if clicks come from the host rather than from a computer thread.
    pub fn is_human(&self) -> bool {
        self.human
    }
}

/// The thread-owned side of a player.
pub(crate) struct PlayerAgent {
    player: Arc<Player>,
    clicks: Receiver<Slot>,
    verdicts: Receiver<Verdict>,
    claims: SyncSender<PlayerId>,
    board: Arc<Board>,
    ui: Arc<dyn UserInterface>,
    termination: Termination,
    config: Configuration,
}

impl PlayerAgent {
    /// Create the agent and the sender the arbiter will deliver its verdicts on.
    pub fn new(
        id: PlayerId,
        human: bool,
        config: Configuration,
        board: Arc<Board>,
        ui: Arc<dyn UserInterface>,
        claims: SyncSender<PlayerId>,
        termination: Termination,
    ) -> (PlayerAgent, Sender<Verdict>) {
        let (click_tx, click_rx) = mpsc::sync_channel(config.feature_size);
        let (verdict_tx, verdict_rx) = mpsc::channel();
        let player = Arc::new(Player {
            id,
            human,
            score: AtomicU32::new(0),
            clicks: click_tx,
            ready: Gate::new(true),
        });
        let agent = PlayerAgent {
            player,
            clicks: click_rx,
            verdicts: verdict_rx,
            claims,
            board,
            ui,
            termination,
            config,
        };
        (agent, verdict_tx)
    }

    pub fn player(&self) -> &Arc<Player> {
        &self.player
    }

    #[cfg(test)]
    pub(crate) fn try_verdict(&self) -> Option<Verdict> {
        self.verdicts.try_recv().ok()
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("player-{}", self.player.id))
            .spawn(move || self.run())
    }

    #[instrument(skip_all, fields(player = self.player.id))]
    fn run(self) {
        info!("thread starting");
        let computer = if self.player.human {
            None
        } else {
            match spawn_computer(
                self.player.clone(),
                self.termination.clone(),
                self.config.table_size,
            ) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!("could not start computer thread: {e}");
                    None
                }
            }
        };

        self.play();

        // dropping the click receiver unblocks the computer thread
        drop(self);
        if let Some(computer) = computer {
            if computer.join().is_err() {
                error!("computer thread panicked");
            }
        }
        info!("thread terminated");
    }

    fn play(&self) {
        while !self.termination.is_requested() {
            let slot = match self.clicks.recv_timeout(WAKE_INTERVAL) {
                Ok(slot) => slot,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            if !self.on_click(slot) {
                continue;
            }
            match self.claim() {
                Some(verdict) => self.apply(verdict),
                None => break,
            }
        }
    }

    /// Toggle the marker on `slot`. Returns true once the player holds a full group.
    fn on_click(&self, slot: Slot) -> bool {
        let id = self.player.id;
        if slot >= self.config.table_size {
            warn!(slot, "click outside of the table");
            return false;
        }
        let mut board = self.board.lock();
        if board.has_token(id, slot) {
            board.remove_token(id, slot);
            return false;
        }
        board.place_token(id, slot, self.config.feature_size)
            && board.token_count(id) == self.config.feature_size
    }

    /// Submit the current markers and wait for the verdict. `None` means the game is over.
    fn claim(&self) -> Option<Verdict> {
        let id = self.player.id;
        self.player.ready.close();
        trace!("claiming");
        if self.claims.send(id).is_err() {
            return None;
        }
        loop {
            match self.verdicts.recv_timeout(WAKE_INTERVAL) {
                Ok(verdict) => return Some(verdict),
                Err(RecvTimeoutError::Timeout) => {
                    if self.termination.is_requested() {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    fn apply(&self, verdict: Verdict) {
        self.board.clear_tokens(self.player.id);
        match verdict {
            Verdict::EmptyClaim => debug!("empty claim"),
            Verdict::ValidSet => self.point(),
            Verdict::InvalidSet => self.penalty(),
        }
        let dropped = self.clicks.try_iter().count();
        if dropped > 0 {
            trace!(dropped, "clicks ignored while frozen");
        }
        self.player.ready.open();
    }

    /// Award a point and freeze.
    fn point(&self) {
        let score = self.player.score.fetch_add(1, Ordering::SeqCst) + 1;
        info!(score, "valid set");
        self.ui.set_score(self.player.id, score);
        self.freeze(self.config.point_freeze);
    }

    fn penalty(&self) {
        debug!("invalid set");
        self.freeze(self.config.penalty_freeze);
    }

    /// Sleep through `duration`, refreshing the display every second.
    fn freeze(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let mut shown = None;
        while !self.termination.is_requested() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let seconds = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            if shown != Some(seconds) {
                self.ui.set_freeze(self.player.id, remaining);
                shown = Some(seconds);
            }
            thread::sleep(remaining.min(WAKE_INTERVAL));
        }
        self.ui.set_freeze(self.player.id, Duration::ZERO);
    }
}

fn spawn_computer(
    player: Arc<Player>,
    termination: Termination,
    table_size: usize,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("computer-{}", player.id))
        .spawn(move || {
            info!(player = player.id, "computer thread starting");
            let mut rng = rand::thread_rng();
            while !termination.is_requested() {
                if !player.ready.wait_open(WAKE_INTERVAL) {
                    continue;
                }
                let slot = rng.gen_range(0..table_size);
                // blocks while the queue is full
                if player.clicks.send(slot).is_err() {
                    break;
                }
            }
            info!(player = player.id, "computer thread terminated");
        })
}
