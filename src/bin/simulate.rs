//! Run a game between computer players only, logging every event to stdout.
//!
//! Game parameters are read from the `SET_*` environment variables, see
//! [`Configuration::from_env`]. Human players are turned into computer players.

use std::sync::Arc;

use set_table::prelude::*;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> set_table::anyhow::Result<()> {
    let config = Configuration::from_env();
    let players = config.players();
    let config = config.with_players(0, players).with_log(false);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(?config, "starting simulation");
    let winners = Game::new(config, Arc::new(LogUi))?.run()?;
    println!("winners: {winners:?}");
    Ok(())
}
