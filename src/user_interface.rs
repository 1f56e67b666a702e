//! Module defining the display sink the game reports to

use std::time::Duration;

use tracing::{debug, info, trace};

use crate::{Card, PlayerId, Slot};

/// What the display should implement.
///
/// Every notification is fire-and-forget. Calls come from the arbiter and player threads,
/// sometimes while the board is locked, so implementations must return quickly and must not
/// call back into the game.
pub trait UserInterface: Send + Sync {
    /// Time left before the table is reshuffled. `warn` is set once under the warning threshold.
    fn set_countdown(&self, remaining: Duration, warn: bool);

    /// New score of a player.
    fn set_score(&self, player: PlayerId, score: u32);

    /// Time left in a player's freeze. A zero duration clears it.
    fn set_freeze(&self, player: PlayerId, remaining: Duration);

    /// `card` was placed in `slot`.
    fn place_card(&self, card: Card, slot: Slot);

    /// The card in `slot` was removed.
    fn remove_card(&self, slot: Slot);

    /// `player` marked `slot`.
    fn place_token(&self, player: PlayerId, slot: Slot);

    /// The marker of `player` on `slot` was retracted.
    fn remove_token(&self, player: PlayerId, slot: Slot);

    /// End of the game, with every player sharing the best score.
    fn announce_winner(&self, players: &[PlayerId]);
}

/// Display rendering every notification as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUi;

impl UserInterface for LogUi {
    fn set_countdown(&self, remaining: Duration, warn: bool) {
        trace!(?remaining, warn, "countdown");
    }

    fn set_score(&self, player: PlayerId, score: u32) {
        info!(player, score, "score");
    }

    fn set_freeze(&self, player: PlayerId, remaining: Duration) {
        trace!(player, ?remaining, "freeze");
    }

    fn place_card(&self, card: Card, slot: Slot) {
        debug!(card, slot, "card placed");
    }

    fn remove_card(&self, slot: Slot) {
        debug!(slot, "card removed");
    }

    fn place_token(&self, player: PlayerId, slot: Slot) {
        trace!(player, slot, "token placed");
    }

    fn remove_token(&self, player: PlayerId, slot: Slot) {
        trace!(player, slot, "token removed");
    }

    fn announce_winner(&self, players: &[PlayerId]) {
        info!(?players, "winners");
    }
}
