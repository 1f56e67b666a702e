//! Shared table state: which card lies in which slot, and which slots each player marked.
//!
//! Everything lives behind a single [`Mutex`]. Inside the crate, `Board::lock` hands out a
//! guard so the arbiter and the players can chain several operations in one critical section.
//! The guard is never held across a blocking wait.
//!
//! Hosts only get read access: a [`Board`] reached through [`Game::board`] or
//! [`GameHandle::board`] cannot place or remove cards or markers.
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use set_table::prelude::*;
//!
//! let game = Game::new(Configuration::new(), Arc::new(LogUi)).unwrap();
//! game.board().place_card(0, 0);
//! ```
//!
//! [`Game::board`]: crate::game::Game::board
//! [`GameHandle::board`]: crate::game::GameHandle::board

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, trace};

use crate::set_validator::SetValidator;
use crate::user_interface::UserInterface;
use crate::{Card, PlayerId, Slot};

struct BoardState {
    slot_to_card: Vec<Option<Card>>,
    card_to_slot: Vec<Option<Slot>>,
    tokens: Vec<Vec<Slot>>,
}

/// The table shared by the arbiter and every player. Read-only outside the crate.
pub struct Board {
    state: Mutex<BoardState>,
    ui: Arc<dyn UserInterface>,
}

/// Exclusive access to the board. Obtained through [`Board::lock`].
pub(crate) struct BoardGuard<'a> {
    state: MutexGuard<'a, BoardState>,
    ui: &'a dyn UserInterface,
}

impl Board {
    /// Create an empty table of `table_size` slots for `deck_size` cards and `players` players.
    pub(crate) fn new(
        table_size: usize,
        deck_size: usize,
        players: usize,
        ui: Arc<dyn UserInterface>,
    ) -> Board {
        Board {
            state: Mutex::new(BoardState {
                slot_to_card: vec![None; table_size],
                card_to_slot: vec![None; deck_size],
                tokens: vec![vec![]; players],
            }),
            ui,
        }
    }

    /// Lock the board.
    pub(crate) fn lock(&self) -> BoardGuard<'_> {
        BoardGuard {
            state: self.state.lock().expect("poisoned"),
            ui: self.ui.as_ref(),
        }
    }

    #[cfg(test)]
    pub(crate) fn place_card(&self, card: Card, slot: Slot) {
        self.lock().place_card(card, slot)
    }

    #[cfg(test)]
    pub(crate) fn remove_card(&self, slot: Slot) -> Option<Card> {
        self.lock().remove_card(slot)
    }

    #[cfg(test)]
    pub(crate) fn place_token(&self, player: PlayerId, slot: Slot, feature_size: usize) -> bool {
        self.lock().place_token(player, slot, feature_size)
    }

    pub(crate) fn clear_tokens(&self, player: PlayerId) {
        self.lock().clear_tokens(player)
    }

    /// Number of occupied slots.
    pub fn count_cards(&self) -> usize {
        self.lock().count_cards()
    }

    /// Copy of the slots marked by `player`, in marking order. Empty for an unknown player.
    pub fn snapshot_markers(&self, player: PlayerId) -> Vec<Slot> {
        self.lock().snapshot_markers(player)
    }

    /// Every card on the table, in slot order.
    pub fn cards(&self) -> Vec<Card> {
        self.lock().cards()
    }

    /// Content of every slot.
    pub fn slots(&self) -> Vec<Option<Card>> {
        self.lock().slots()
    }

    /// Every valid set currently on the table, as groups of slots. Each one is logged.
    pub fn hints(&self, validator: &dyn SetValidator) -> Vec<Vec<Slot>> {
        self.lock().hints(validator)
    }
}

impl BoardGuard<'_> {
    /// Put `card` in the empty `slot`.
    ///
    /// # Panics
    /// If the slot is occupied or the card is already on the table.
    pub fn place_card(&mut self, card: Card, slot: Slot) {
        assert!(
            self.state.slot_to_card[slot].is_none(),
            "slot {slot} is already occupied"
        );
        assert!(
            self.state.card_to_slot[card].is_none(),
            "card {card} is already on the table"
        );
        self.state.slot_to_card[slot] = Some(card);
        self.state.card_to_slot[card] = Some(slot);
        self.ui.place_card(card, slot);
    }

    /// Empty `slot` and retract every marker on it. Returns the card that was there, if any.
    pub fn remove_card(&mut self, slot: Slot) -> Option<Card> {
        let card = self.state.slot_to_card[slot].take()?;
        self.state.card_to_slot[card] = None;
        self.ui.remove_card(slot);

        for player in 0..self.state.tokens.len() {
            self.remove_token(player, slot);
        }
        Some(card)
    }

    /// Mark `slot` for `player`.
    ///
    /// Returns false, without any change, if the slot is empty or already marked, or if the
    /// player already has `feature_size` markers.
    pub fn place_token(&mut self, player: PlayerId, slot: Slot, feature_size: usize) -> bool {
        if self.state.slot_to_card[slot].is_none() {
            return false;
        }
        let tokens = &mut self.state.tokens[player];
        if tokens.len() >= feature_size || tokens.contains(&slot) {
            return false;
        }
        tokens.push(slot);
        trace!(player, slot, "token placed");
        self.ui.place_token(player, slot);
        true
    }

    /// Retract the marker of `player` on `slot`. Returns false if there was none.
    pub fn remove_token(&mut self, player: PlayerId, slot: Slot) -> bool {
        let tokens = &mut self.state.tokens[player];
        match tokens.iter().position(|&s| s == slot) {
            Some(pos) => {
                tokens.remove(pos);
                trace!(player, slot, "token removed");
                self.ui.remove_token(player, slot);
                true
            }
            None => false,
        }
    }

    /// Retract every marker of `player`.
    pub fn clear_tokens(&mut self, player: PlayerId) {
        for slot in self.snapshot_markers(player) {
            self.remove_token(player, slot);
        }
    }

    /// True if `player` marked `slot`.
    pub fn has_token(&self, player: PlayerId, slot: Slot) -> bool {
        self.state.tokens[player].contains(&slot)
    }

    /// Number of markers of `player`.
    pub fn token_count(&self, player: PlayerId) -> usize {
        self.state.tokens[player].len()
    }

    /// Copy of the slots marked by `player`, in marking order.
    pub fn snapshot_markers(&self, player: PlayerId) -> Vec<Slot> {
        self.state.tokens.get(player).cloned().unwrap_or_default()
    }

    /// Card in `slot`, if any.
    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        self.state.slot_to_card[slot]
    }

    /// Number of occupied slots.
    pub fn count_cards(&self) -> usize {
        self.state.slot_to_card.iter().flatten().count()
    }

    /// Every card on the table, in slot order.
    pub fn cards(&self) -> Vec<Card> {
        self.state.slot_to_card.iter().flatten().copied().collect()
    }

    /// Content of every slot.
    pub fn slots(&self) -> Vec<Option<Card>> {
        self.state.slot_to_card.clone()
    }

    /// Every empty slot, in order.
    pub fn empty_slots(&self) -> Vec<Slot> {
        (0..self.state.slot_to_card.len())
            .filter(|&slot| self.state.slot_to_card[slot].is_none())
            .collect()
    }

    /// Every valid set currently on the table, as groups of slots. Each one is logged.
    pub fn hints(&self, validator: &dyn SetValidator) -> Vec<Vec<Slot>> {
        let cards = self.cards();
        validator
            .find_sets(&cards, usize::MAX)
            .into_iter()
            .map(|set| {
                let slots = set
                    .iter()
                    .filter_map(|&card| self.state.card_to_slot[card])
                    .collect::<Vec<_>>();
                info!(?slots, cards = ?set, "hint");
                slots
            })
            .collect()
    }
}
