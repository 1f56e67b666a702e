//! The arbiter thread: owns the deck, deals rounds, services claims and ends the game.
//!
//! Each round shuffles the deck, fills the table and then waits on the claim queue until the
//! countdown runs out, at which point every card goes back into the deck. The game ends once
//! no set can be made out of the remaining cards, or when termination is requested.

use std::{
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{bail, Context};
use rand::seq::SliceRandom;
use tracing::{debug, error, info, instrument, trace};

use crate::board::{Board, BoardGuard};
use crate::configuration::Configuration;
use crate::player::{Player, PlayerAgent, Verdict};
use crate::set_validator::SetValidator;
use crate::signal::Termination;
use crate::user_interface::UserInterface;
use crate::{Card, PlayerId};

/// Countdown refresh while far from the timeout.
const DISPLAY_TICK: Duration = Duration::from_millis(250);
/// Countdown refresh once under the warning threshold.
const WARNING_TICK: Duration = Duration::from_millis(10);

pub(crate) struct Arbiter {
    config: Configuration,
    board: Arc<Board>,
    players: Vec<Arc<Player>>,
    /// Agents not started yet. Emptied by [`Arbiter::run`].
    agents: Vec<PlayerAgent>,
    verdicts: Vec<Sender<Verdict>>,
    claims: Receiver<PlayerId>,
    deck: Vec<Card>,
    /// Cards taken out of the game by valid sets.
    matched: Vec<Card>,
    validator: Arc<dyn SetValidator>,
    ui: Arc<dyn UserInterface>,
    termination: Termination,
    reshuffle_at: Instant,
}

impl Arbiter {
    pub fn new(
        config: Configuration,
        ui: Arc<dyn UserInterface>,
        validator: Arc<dyn SetValidator>,
        termination: Termination,
    ) -> Arbiter {
        let board = Arc::new(Board::new(
            config.table_size,
            config.deck_size(),
            config.players(),
            ui.clone(),
        ));
        let (claim_tx, claim_rx) = mpsc::sync_channel(config.players());

        let mut players = vec![];
        let mut agents = vec![];
        let mut verdicts = vec![];
        for id in 0..config.players() {
            let human = id < config.human_players;
            let (agent, verdict_tx) = PlayerAgent::new(
                id,
                human,
                config,
                board.clone(),
                ui.clone(),
                claim_tx.clone(),
                termination.clone(),
            );
            players.push(agent.player().clone());
            agents.push(agent);
            verdicts.push(verdict_tx);
        }

        Arbiter {
            config,
            board,
            players,
            agents,
            verdicts,
            claims: claim_rx,
            deck: (0..config.deck_size()).collect(),
            matched: vec![],
            validator,
            ui,
            termination,
            reshuffle_at: Instant::now() + config.turn_timeout,
        }
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn players(&self) -> &[Arc<Player>] {
        &self.players
    }

    pub fn spawn(self) -> anyhow::Result<JoinHandle<anyhow::Result<Vec<PlayerId>>>> {
        thread::Builder::new()
            .name("arbiter".to_owned())
            .spawn(move || self.run())
            .context("could not start arbiter thread")
    }

    /// Play the whole game on the current thread and return the winners.
    #[instrument(skip_all)]
    pub fn run(mut self) -> anyhow::Result<Vec<PlayerId>> {
        info!("thread starting");
        let handles = match self.spawn_players() {
            Ok(handles) => handles,
            Err(e) => {
                self.termination.request();
                return Err(e);
            }
        };

        while !self.should_finish() {
            self.deck.shuffle(&mut rand::thread_rng());
            debug!(deck = self.deck.len(), "dealing");
            self.place_cards_on_table();
            if self.config.hints {
                self.board.hints(self.validator.as_ref());
            }
            self.timer_loop();
            self.update_timer_display(false);
            self.remove_all_cards_from_table();
        }

        self.termination.request();
        let mut panicked = 0;
        for handle in handles.into_iter().rev() {
            if handle.join().is_err() {
                panicked += 1;
            }
        }
        let winners = self.announce_winners();
        info!("thread terminated");
        if panicked > 0 {
            error!(panicked, "player threads panicked");
            bail!("{panicked} player thread(s) panicked");
        }
        Ok(winners)
    }

    fn spawn_players(&mut self) -> anyhow::Result<Vec<JoinHandle<()>>> {
        std::mem::take(&mut self.agents)
            .into_iter()
            .map(|agent| agent.spawn().context("could not start player thread"))
            .collect()
    }

    /// Run the countdown of the current round, servicing claims as they come.
    fn timer_loop(&mut self) {
        while !self.termination.is_requested() && Instant::now() < self.reshuffle_at {
            let verdict = self.sleep_until_woken_or_timeout();
            self.update_timer_display(false);
            self.place_cards_on_table();
            if verdict == Some(Verdict::ValidSet) && !self.any_set_left() {
                debug!("no set left");
                break;
            }
        }
    }

    fn sleep_until_woken_or_timeout(&mut self) -> Option<Verdict> {
        let remaining = self.reshuffle_at.saturating_duration_since(Instant::now());
        let tick = if remaining <= self.config.turn_timeout_warning {
            WARNING_TICK
        } else {
            DISPLAY_TICK
        };
        let timeout = remaining.min(tick);
        match self.claims.recv_timeout(timeout) {
            Ok(player) => Some(self.service_claim(player)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                None
            }
        }
    }

    /// Judge the markers of `player` and deliver the verdict once the board is unlocked.
    #[instrument(skip(self))]
    pub(crate) fn service_claim(&mut self, player: PlayerId) -> Verdict {
        let feature_size = self.config.feature_size;
        let (verdict, refilled) = {
            let mut board = self.board.lock();
            let markers = board.snapshot_markers(player);
            let cards = markers
                .iter()
                .map(|&slot| board.card_at(slot))
                .collect::<Option<Vec<_>>>();
            match cards {
                Some(cards) if cards.len() == feature_size => {
                    if self.validator.is_valid_set(&cards) {
                        for &slot in &markers {
                            if let Some(card) = board.remove_card(slot) {
                                self.matched.push(card);
                            }
                        }
                        let refilled = fill_empty_slots(&mut board, &mut self.deck);
                        (Verdict::ValidSet, refilled)
                    } else {
                        (Verdict::InvalidSet, 0)
                    }
                }
                _ => (Verdict::EmptyClaim, 0),
            }
        };
        debug!(?verdict, refilled);
        if refilled > 0 {
            self.update_timer_display(true);
        }

        if self.verdicts[player].send(verdict).is_err() {
            trace!("player already terminated");
        }
        verdict
    }

    /// Fill every empty slot from the deck.
    fn place_cards_on_table(&mut self) {
        let placed = fill_empty_slots(&mut self.board.lock(), &mut self.deck);
        if placed > 0 {
            self.update_timer_display(true);
        }
    }

    /// Return every card of the table to the deck.
    fn remove_all_cards_from_table(&mut self) {
        let mut board = self.board.lock();
        for slot in 0..self.config.table_size {
            if let Some(card) = board.remove_card(slot) {
                self.deck.push(card);
            }
        }
    }

    fn update_timer_display(&mut self, reset: bool) {
        if reset {
            self.reshuffle_at = Instant::now() + self.config.turn_timeout;
        }
        let remaining = self.reshuffle_at.saturating_duration_since(Instant::now());
        self.ui
            .set_countdown(remaining, remaining <= self.config.turn_timeout_warning);
    }

    fn remaining_cards(&self) -> Vec<Card> {
        let mut cards = self.board.cards();
        cards.extend_from_slice(&self.deck);
        cards
    }

    fn any_set_left(&self) -> bool {
        self.validator.exists_valid_set(&self.remaining_cards())
    }

    fn should_finish(&self) -> bool {
        self.termination.is_requested() || !self.any_set_left()
    }

    fn announce_winners(&self) -> Vec<PlayerId> {
        let scores = self.players.iter().map(|p| p.score()).collect::<Vec<_>>();
        let winners = winners(&scores);
        info!(?scores, ?winners, matched = self.matched.len(), "game over");
        self.ui.announce_winner(&winners);
        winners
    }
}

fn fill_empty_slots(board: &mut BoardGuard<'_>, deck: &mut Vec<Card>) -> usize {
    let mut placed = 0;
    for slot in board.empty_slots() {
        match deck.pop() {
            Some(card) => {
                board.place_card(card, slot);
                placed += 1;
            }
            None => break,
        }
    }
    placed
}

/// Every player holding the highest score, in id order.
///
/// ```
/// assert_eq!(set_table::winners(&[3, 5, 5, 2]), vec![1, 2]);
/// ```
pub fn winners(scores: &[u32]) -> Vec<PlayerId> {
    let Some(&best) = scores.iter().max() else {
        return vec![];
    };
    scores
        .iter()
        .enumerate()
        .filter(|&(_, &score)| score == best)
        .map(|(id, _)| id)
        .collect()
}
