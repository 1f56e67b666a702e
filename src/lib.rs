//! # Set Table
//!
//! A concurrent engine for real-time, multi-player games of Set.
//!
//! Several players, human or computer, mark cards on a shared table at the same time. When a
//! player holds a full group of markers it submits a claim and waits; a single arbiter judges
//! claims one at a time, removes matched cards, refills the table, reshuffles it when the
//! countdown runs out, and announces the winners once no set can be made anymore.
//!
//! It provides:
//! - The shared table with per-player markers (`Board`)
//! - Player threads, including computer players generating their own clicks (`Player`)
//! - The arbiter thread owning the deck and the round lifecycle, hosted by [`Game`]
//! - Pluggable set rules via the [`SetValidator`] trait, with the classic [`FeatureRule`]
//! - A display sink via the [`UserInterface`] trait, with a `tracing` based [`LogUi`]
//!
//! # Documentation Overview
//!
//! - For the thread layout and the host-facing API, see the [`game`] module.
//! - For game parameters, see [`Configuration`](crate::configuration::Configuration).
//! - For the rule deciding what a set is, see the [`set_validator`] module.
//! - For the concurrency contract of the table, see the [`board`] module.
//!
//! # Usage Example
//!
//! ```no_run
//! use std::{sync::Arc, thread, time::Duration};
//! use set_table::prelude::*;
//!
//! fn main() -> set_table::anyhow::Result<()> {
//!     let config = Configuration::new()
//!         .with_players(1, 3)
//!         .with_turn_timeout(Duration::from_secs(30));
//!
//!     let game = Game::new(config, Arc::new(LogUi))?.start()?;
//!
//!     // forward the clicks of the human player
//!     game.key_pressed(0, 4);
//!     game.key_pressed(0, 7);
//!     game.key_pressed(0, 11);
//!
//!     thread::sleep(Duration::from_secs(60));
//!     println!("scores: {:?}", game.scores());
//!
//!     game.terminate();
//!     let winners = game.join()?;
//!     println!("winners: {winners:?}");
//!     Ok(())
//! }
//! ```
#![warn(missing_docs)]

mod arbiter;
pub mod board;
pub mod configuration;
pub mod game;
mod logger;
mod player;
pub mod set_validator;
mod signal;
pub mod user_interface;

pub use anyhow;
pub use arbiter::winners;
pub use game::{Game, GameHandle};
pub use player::{Player, Verdict};
pub use set_validator::{FeatureRule, SetValidator};
pub use user_interface::{LogUi, UserInterface};

/// Identifier of a card, from 0 to the deck size.
pub type Card = usize;
/// Index of a position on the table.
pub type Slot = usize;
/// Identifier of a player, from 0 to the number of players.
pub type PlayerId = usize;

/// Commonly used types and traits for quick access.
///
/// Import this prelude to get started easily:
/// ```rust
/// use set_table::prelude::*;
/// ```
pub mod prelude {
    pub use crate::configuration::Configuration;
    pub use crate::game::{Game, GameHandle};
    pub use crate::set_validator::{FeatureRule, SetValidator};
    pub use crate::user_interface::{LogUi, UserInterface};
}
