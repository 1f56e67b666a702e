//! Config for the game
//!
//! This module provides the parameters shared by the arbiter, the board and every player.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Flags are case-insensitive, set the value to `"true"` to enable one.
//!
//! - `SET_FEATURE_SIZE` — Number of values per feature, and cards per claim (default: `3`)
//! - `SET_FEATURE_COUNT` — Number of features per card (default: `4`)
//! - `SET_DECK_SIZE` — Number of cards in play (default: every feature combination)
//! - `SET_TABLE_SIZE` — Number of slots on the table (default: `12`)
//! - `SET_HUMAN_PLAYERS` — Number of human players (default: `2`)
//! - `SET_COMPUTER_PLAYERS` — Number of computer players (default: `2`)
//! - `SET_TURN_TIMEOUT_MS` — Countdown before the table is reshuffled (default: `60000`)
//! - `SET_TURN_TIMEOUT_WARNING_MS` — Remaining time under which the countdown warns (default: `5000`)
//! - `SET_POINT_FREEZE_MS` — Freeze after a valid set (default: `1000`)
//! - `SET_PENALTY_FREEZE_MS` — Freeze after an invalid set (default: `3000`)
//! - `SET_HINTS` — Log every valid set after each deal (default: `false`)
//! - `SET_LOG` — Enable logging to a file (default: `false`)

use std::time::Duration;

use anyhow::bail;

/// Largest deck a game accepts. Cards are dealt from a `Vec` built upfront.
pub const MAX_DECK_SIZE: usize = 4096;

/// Configuration for a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) feature_size: usize,
    pub(crate) feature_count: usize,
    pub(crate) deck_size: Option<usize>,
    pub(crate) table_size: usize,
    pub(crate) human_players: usize,
    pub(crate) computer_players: usize,
    pub(crate) turn_timeout: Duration,
    pub(crate) turn_timeout_warning: Duration,
    pub(crate) point_freeze: Duration,
    pub(crate) penalty_freeze: Duration,
    pub(crate) hints: bool,
    pub(crate) log: bool,
}

impl Configuration {
    /// Create a new configuration for the standard game.
    ///
    /// By default:
    /// - Cards have 4 features of 3 values each, so the deck holds 81 cards.
    /// - A claim is made of 3 cards, and the table has 12 slots.
    /// - 2 human players and 2 computer players.
    /// - The table is reshuffled after 60 seconds without a valid set, with a warning at 5 seconds.
    /// - A valid set freezes the player for 1 second, an invalid one for 3 seconds.
    /// - Hints and logging to file are disabled.
    pub fn new() -> Self {
        Self {
            feature_size: 3,
            feature_count: 4,
            deck_size: None,
            table_size: 12,
            human_players: 2,
            computer_players: 2,
            turn_timeout: Duration::from_secs(60),
            turn_timeout_warning: Duration::from_secs(5),
            point_freeze: Duration::from_secs(1),
            penalty_freeze: Duration::from_secs(3),
            hints: false,
            log: false,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the [module documentation](self) for the recognized variables. Any unset or
    /// unparsable variable keeps the default value of [`Configuration::new()`].
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_usize(var: &str) -> Option<usize> {
            std::env::var(var).ok()?.parse().ok()
        }

        fn get_env_millis(var: &str) -> Option<Duration> {
            std::env::var(var)
                .ok()?
                .parse::<u64>()
                .ok()
                .map(Duration::from_millis)
        }

        let default = Self::new();
        Self {
            feature_size: get_env_usize("SET_FEATURE_SIZE").unwrap_or(default.feature_size),
            feature_count: get_env_usize("SET_FEATURE_COUNT").unwrap_or(default.feature_count),
            deck_size: get_env_usize("SET_DECK_SIZE"),
            table_size: get_env_usize("SET_TABLE_SIZE").unwrap_or(default.table_size),
            human_players: get_env_usize("SET_HUMAN_PLAYERS").unwrap_or(default.human_players),
            computer_players: get_env_usize("SET_COMPUTER_PLAYERS")
                .unwrap_or(default.computer_players),
            turn_timeout: get_env_millis("SET_TURN_TIMEOUT_MS").unwrap_or(default.turn_timeout),
            turn_timeout_warning: get_env_millis("SET_TURN_TIMEOUT_WARNING_MS")
                .unwrap_or(default.turn_timeout_warning),
            point_freeze: get_env_millis("SET_POINT_FREEZE_MS").unwrap_or(default.point_freeze),
            penalty_freeze: get_env_millis("SET_PENALTY_FREEZE_MS")
                .unwrap_or(default.penalty_freeze),
            hints: get_env_flag("SET_HINTS", default.hints),
            log: get_env_flag("SET_LOG", default.log),
        }
    }

    /// Set the number of values per feature. This is also the number of cards in a claim.
    pub fn with_feature_size(mut self, value: usize) -> Self {
        self.feature_size = value;
        self
    }

    /// Set the number of features per card.
    pub fn with_feature_count(mut self, value: usize) -> Self {
        self.feature_count = value;
        self
    }

    /// Limit the deck to the first `value` cards of the feature space.
    pub fn with_deck_size(mut self, value: usize) -> Self {
        self.deck_size = Some(value);
        self
    }

    /// Set the number of slots on the table.
    pub fn with_table_size(mut self, value: usize) -> Self {
        self.table_size = value;
        self
    }

    /// Set the number of human and computer players.
    ///
    /// Human players get the first ids, computer players the following ones.
    pub fn with_players(mut self, human: usize, computer: usize) -> Self {
        self.human_players = human;
        self.computer_players = computer;
        self
    }

    /// Set the countdown before the table is reshuffled.
    pub fn with_turn_timeout(mut self, value: Duration) -> Self {
        self.turn_timeout = value;
        self
    }

    /// Set the remaining time under which the countdown is displayed as a warning.
    pub fn with_turn_timeout_warning(mut self, value: Duration) -> Self {
        self.turn_timeout_warning = value;
        self
    }

    /// Set the freeze applied to a player after a valid set.
    pub fn with_point_freeze(mut self, value: Duration) -> Self {
        self.point_freeze = value;
        self
    }

    /// Set the freeze applied to a player after an invalid set.
    pub fn with_penalty_freeze(mut self, value: Duration) -> Self {
        self.penalty_freeze = value;
        self
    }

    /// Enable or disable hints (every valid set on the table is logged after each deal).
    pub fn with_hints(mut self, value: bool) -> Self {
        self.hints = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Number of cards in a claim.
    pub fn feature_size(&self) -> usize {
        self.feature_size
    }

    /// Number of slots on the table.
    pub fn table_size(&self) -> usize {
        self.table_size
    }

    /// Total number of players.
    pub fn players(&self) -> usize {
        self.human_players + self.computer_players
    }

    /// Number of cards in play: the explicit deck size if any, every feature combination
    /// otherwise.
    ///
    /// Saturates at `usize::MAX` when the feature space does not fit, which [`validate`]
    /// rejects.
    ///
    /// [`validate`]: Configuration::validate
    pub fn deck_size(&self) -> usize {
        self.deck_size
            .or_else(|| self.feature_space())
            .unwrap_or(usize::MAX)
    }

    /// Number of distinct cards, `None` if it overflows `usize`.
    fn feature_space(&self) -> Option<usize> {
        u32::try_from(self.feature_count)
            .ok()
            .and_then(|count| self.feature_size.checked_pow(count))
    }

    /// Reject configurations the game cannot run with.
    ///
    /// # Errors
    /// Returned when sizes are zero or inconsistent with each other, when the deck exceeds
    /// [`MAX_DECK_SIZE`], when there is no player, or when the warning threshold exceeds the
    /// turn timeout.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.feature_size < 2 {
            bail!("a claim needs at least 2 cards (feature size is {})", self.feature_size);
        }
        if self.feature_count == 0 {
            bail!("cards need at least one feature");
        }
        if self.feature_size > self.table_size {
            bail!(
                "feature size ({}) is larger than the table ({} slots)",
                self.feature_size,
                self.table_size
            );
        }
        match (self.deck_size, self.feature_space()) {
            (None, None) => bail!(
                "{} features of {} values make too many cards to deal",
                self.feature_count,
                self.feature_size
            ),
            (Some(deck), Some(space)) if deck > space => bail!(
                "deck size ({deck}) exceeds the {space} distinct cards of the feature space"
            ),
            _ => {}
        }
        if self.deck_size() > MAX_DECK_SIZE {
            bail!(
                "deck size ({}) is above the supported maximum of {MAX_DECK_SIZE} cards",
                self.deck_size()
            );
        }
        if self.deck_size() < self.feature_size {
            bail!("deck size ({}) cannot hold a single set", self.deck_size());
        }
        if self.players() == 0 {
            bail!("a game needs at least one player");
        }
        if self.turn_timeout.is_zero() {
            bail!("turn timeout must be positive");
        }
        if self.turn_timeout_warning > self.turn_timeout {
            bail!(
                "turn timeout warning ({:?}) is above the turn timeout ({:?})",
                self.turn_timeout_warning,
                self.turn_timeout
            );
        }
        Ok(())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}
