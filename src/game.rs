//! Entry point for hosting a game.
//!
//! This module defines the [`Game`] type, which assembles the table, the players and the
//! arbiter from a [`Configuration`], and the [`GameHandle`] returned once the game runs in the
//! background.
//!
//! # Threads
//!
//! Starting a game spawns:
//! - one `arbiter` thread, dealing cards and judging claims,
//! - one `player-<id>` thread per player,
//! - one `computer-<id>` thread per computer player, generating random clicks.
//!
//! The host only talks to the game through the [`GameHandle`]: forwarding key presses of human
//! players, reading scores, requesting termination and collecting the winners.
//!
//! # Example
//!
//! See crate-level documentation for an example on how to use the `Game`.

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, bail};
use tracing::{instrument, trace, warn};

use crate::arbiter::Arbiter;
use crate::board::Board;
use crate::configuration::Configuration;
use crate::logger::init_logger;
use crate::player::Player;
use crate::set_validator::{FeatureRule, SetValidator};
use crate::signal::Termination;
use crate::user_interface::UserInterface;
use crate::{Card, PlayerId, Slot};

/// A game ready to be started.
pub struct Game {
    arbiter: Arbiter,
    termination: Termination,
}

impl Game {
    /// Create a game with the all-equal-or-all-different [`FeatureRule`].
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, or if logging to file was requested
    /// and could not be set up.
    pub fn new(config: Configuration, ui: Arc<dyn UserInterface>) -> anyhow::Result<Game> {
        let validator = FeatureRule::new(config.feature_size, config.feature_count);
        Self::with_validator(config, ui, Arc::new(validator))
    }

    /// Create a game judging claims with a custom rule.
    ///
    /// # Errors
    /// Same as [`Game::new`], and when the validator expects groups of a different size than
    /// the configured feature size.
    #[instrument(skip_all)]
    pub fn with_validator(
        config: Configuration,
        ui: Arc<dyn UserInterface>,
        validator: Arc<dyn SetValidator>,
    ) -> anyhow::Result<Game> {
        config.validate()?;
        if validator.feature_size() != config.feature_size {
            bail!(
                "validator judges groups of {} cards, claims are made of {}",
                validator.feature_size(),
                config.feature_size
            );
        }
        if config.log {
            init_logger()?;
        }
        trace!(?config);

        let termination = Termination::new();
        let arbiter = Arbiter::new(config, ui, validator, termination.clone());
        Ok(Game {
            arbiter,
            termination,
        })
    }

    /// The shared table, read-only for the host.
    pub fn board(&self) -> &Arc<Board> {
        self.arbiter.board()
    }

    /// Every player, indexed by id.
    pub fn players(&self) -> &[Arc<Player>] {
        self.arbiter.players()
    }

    /// Start the game in the background.
    ///
    /// # Errors
    /// Returns an error if the arbiter thread could not be spawned.
    pub fn start(self) -> anyhow::Result<GameHandle> {
        let board = self.board().clone();
        let players = self.players().to_vec();
        let arbiter = self.arbiter.spawn()?;
        Ok(GameHandle {
            arbiter,
            board,
            players,
            termination: self.termination,
        })
    }

    /// Play the whole game on the current thread and return the winners.
    ///
    /// # Errors
    /// Returns an error if a player thread could not be spawned or panicked.
    pub fn run(self) -> anyhow::Result<Vec<PlayerId>> {
        self.arbiter.run()
    }
}

/// A running game.
pub struct GameHandle {
    arbiter: JoinHandle<anyhow::Result<Vec<PlayerId>>>,
    board: Arc<Board>,
    players: Vec<Arc<Player>>,
    termination: Termination,
}

impl GameHandle {
    /// Forward a key press of `player` on `slot`.
    ///
    /// Unknown players are ignored. Clicks are dropped while the player's queue is full.
    pub fn key_pressed(&self, player: PlayerId, slot: Slot) {
        match self.players.get(player) {
            Some(p) => p.key_pressed(slot),
            None => warn!(player, "key press for unknown player"),
        }
    }

    /// Ask the game to stop. Winners are still announced.
    pub fn terminate(&self) {
        self.termination.request();
    }

    /// Current score of `player`.
    pub fn score(&self, player: PlayerId) -> Option<u32> {
        self.players.get(player).map(|p| p.score())
    }

    /// Current score of every player, indexed by id.
    pub fn scores(&self) -> Vec<u32> {
        self.players.iter().map(|p| p.score()).collect()
    }

    /// Content of every slot.
    pub fn table(&self) -> Vec<Option<Card>> {
        self.board.slots()
    }

    /// The shared table, for read-only queries such as
    /// [`snapshot_markers`](Board::snapshot_markers).
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    /// True once the arbiter thread has returned.
    pub fn is_finished(&self) -> bool {
        self.arbiter.is_finished()
    }

    /// Wait for the end of the game and return the winners.
    ///
    /// # Errors
    /// Returns an error if the arbiter or a player thread panicked.
    pub fn join(self) -> anyhow::Result<Vec<PlayerId>> {
        self.arbiter
            .join()
            .map_err(|_| anyhow!("arbiter thread panicked"))?
    }
}
