use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier, Mutex,
    },
    thread,
    time::{Duration, Instant},
};

use set_table::prelude::*;
use set_table::{winners, Card, PlayerId, Slot};
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, Filter, SubscriberExt},
    Layer, Registry,
};

struct CustomLevelFilter;
impl<S> Filter<S> for CustomLevelFilter {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        meta.level() <= &Level::DEBUG
    }
}

#[allow(dead_code)]
fn init_debug_logger() {
    let format = fmt::format()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_thread_names(true)
        .with_target(false);

    let reg = Registry::default().with(
        fmt::layer()
            .event_format(format)
            .with_filter(CustomLevelFilter),
    );

    let _ = tracing::subscriber::set_global_default(reg);
}

/// Counts the hints logged by the board.
#[derive(Clone, Default)]
struct HintCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for HintCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target() == "set_table::board" && *meta.level() == Level::INFO {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Score(PlayerId, u32),
    Freeze(PlayerId, Duration),
    CardPlaced(Card, Slot),
    CardRemoved(Slot),
    Winners(Vec<PlayerId>),
}

/// Display keeping every notification but the countdown and the tokens.
#[derive(Default)]
struct RecordingUi {
    events: Mutex<Vec<Event>>,
}

impl RecordingUi {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl UserInterface for RecordingUi {
    fn set_countdown(&self, _remaining: Duration, _warn: bool) {}

    fn set_score(&self, player: PlayerId, score: u32) {
        self.push(Event::Score(player, score));
    }

    fn set_freeze(&self, player: PlayerId, remaining: Duration) {
        self.push(Event::Freeze(player, remaining));
    }

    fn place_card(&self, card: Card, slot: Slot) {
        self.push(Event::CardPlaced(card, slot));
    }

    fn remove_card(&self, slot: Slot) {
        self.push(Event::CardRemoved(slot));
    }

    fn place_token(&self, _player: PlayerId, _slot: Slot) {}

    fn remove_token(&self, _player: PlayerId, _slot: Slot) {}

    fn announce_winner(&self, players: &[PlayerId]) {
        self.push(Event::Winners(players.to_vec()));
    }
}

fn wait_for(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

/// Cards 0..9, two features of three values.
fn small_config() -> Configuration {
    Configuration::new()
        .with_feature_count(2)
        .with_point_freeze(Duration::ZERO)
        .with_penalty_freeze(Duration::from_millis(200))
        .with_turn_timeout_warning(Duration::from_millis(50))
}

fn slots_of(table: &[Option<Card>], cards: &[Card]) -> Vec<Slot> {
    cards
        .iter()
        .map(|card| table.iter().position(|c| c == &Some(*card)).unwrap())
        .collect()
}

#[test]
fn computer_game_runs_to_completion() {
    let config = small_config()
        .with_table_size(6)
        .with_players(0, 3)
        .with_penalty_freeze(Duration::from_millis(10))
        .with_turn_timeout(Duration::from_millis(500));
    let ui = Arc::new(RecordingUi::default());
    let game = Game::new(config, ui.clone()).unwrap().start().unwrap();

    let finished = wait_for(Duration::from_secs(60), || game.is_finished());
    if !finished {
        game.terminate();
    }
    let scores = game.scores();
    let result = game.join().unwrap();
    assert!(finished, "game did not end on its own");

    assert!(scores.iter().sum::<u32>() >= 1);
    assert!(scores.iter().sum::<u32>() <= 3);
    assert_eq!(result, winners(&scores));
    assert_eq!(ui.count(|e| matches!(e, Event::Winners(_))), 1);
    assert!(ui.events().contains(&Event::Winners(result)));
}

#[test]
fn human_player_scores_a_set() {
    let config = small_config()
        .with_table_size(9)
        .with_players(2, 0)
        .with_turn_timeout(Duration::from_secs(60));
    let ui = Arc::new(RecordingUi::default());
    let game = Game::new(config, ui.clone()).unwrap().start().unwrap();

    assert!(wait_for(Duration::from_secs(5), || game.board().count_cards() == 9));
    let table = game.table();
    let cards = table.iter().flatten().copied().collect::<Vec<_>>();
    let set = FeatureRule::new(3, 2).find_sets(&cards, 1).remove(0);
    let slots = slots_of(&table, &set);

    for &slot in &slots {
        game.key_pressed(0, slot);
    }
    assert!(wait_for(Duration::from_secs(5), || game.score(0) == Some(1)));
    assert_eq!(game.score(1), Some(0));
    assert!(ui.events().contains(&Event::Score(0, 1)));

    // the deck is empty: the matched slots stay empty
    let table = game.table();
    assert!(slots.iter().all(|&slot| table[slot].is_none()));
    assert_eq!(game.board().count_cards(), 6);
    assert!(game.board().snapshot_markers(0).is_empty());

    game.terminate();
    assert_eq!(game.join().unwrap(), vec![0]);
}

#[test]
fn invalid_set_freezes_player() {
    let config = small_config()
        .with_table_size(9)
        .with_players(1, 0)
        .with_turn_timeout(Duration::from_secs(60));
    let ui = Arc::new(RecordingUi::default());
    let game = Game::new(config, ui.clone()).unwrap().start().unwrap();

    assert!(wait_for(Duration::from_secs(5), || game.board().count_cards() == 9));
    let table = game.table();
    // 0, 1 and 3 share no line of the plane
    let slots = slots_of(&table, &[0, 1, 3]);
    for &slot in &slots {
        game.key_pressed(0, slot);
    }

    assert!(wait_for(Duration::from_secs(5), || {
        ui.count(|e| matches!(e, Event::Freeze(0, d) if d.is_zero())) == 1
    }));
    assert!(ui.count(|e| matches!(e, Event::Freeze(0, d) if !d.is_zero())) >= 1);
    assert_eq!(game.score(0), Some(0));
    assert_eq!(game.table(), table);
    assert!(game.board().snapshot_markers(0).is_empty());

    game.terminate();
    assert_eq!(game.join().unwrap(), vec![0]);
}

#[test]
fn timeout_reshuffles_the_table() {
    let config = small_config()
        .with_table_size(6)
        .with_players(1, 0)
        .with_turn_timeout(Duration::from_millis(200));
    let ui = Arc::new(RecordingUi::default());
    let game = Game::new(config, ui.clone()).unwrap().start().unwrap();

    // a full table is cleared at least once
    assert!(wait_for(Duration::from_secs(5), || {
        ui.count(|e| matches!(e, Event::CardRemoved(_))) >= 6
    }));
    // the table may be caught between clearing and dealing
    let deadline = Instant::now() + Duration::from_secs(5);
    let cards = loop {
        let cards = game.board().cards();
        if cards.len() == 6 {
            break cards;
        }
        assert!(Instant::now() < deadline, "table never refilled");
        thread::sleep(Duration::from_millis(5));
    };
    let unique = cards.iter().collect::<BTreeSet<_>>();
    assert_eq!(unique.len(), 6);
    assert!(cards.iter().all(|&card| card < 9));
    assert!(ui.count(|e| matches!(e, Event::CardPlaced(..))) >= 12);

    game.terminate();
    game.join().unwrap();
}

#[test]
fn simultaneous_claims_score_once() {
    for _ in 0..5 {
        let config = small_config()
            .with_table_size(9)
            .with_players(2, 0)
            .with_turn_timeout(Duration::from_secs(60));
        let ui = Arc::new(RecordingUi::default());
        let game = Game::new(config, ui.clone()).unwrap().start().unwrap();

        assert!(wait_for(Duration::from_secs(5), || game.board().count_cards() == 9));
        let table = game.table();
        let cards = table.iter().flatten().copied().collect::<Vec<_>>();
        let set = FeatureRule::new(3, 2).find_sets(&cards, 1).remove(0);
        let slots = slots_of(&table, &set);

        let start = Barrier::new(2);
        thread::scope(|scope| {
            for player in 0..2 {
                let (game, start, slots) = (&game, &start, &slots);
                scope.spawn(move || {
                    start.wait();
                    for &slot in slots {
                        game.key_pressed(player, slot);
                    }
                });
            }
        });

        assert!(wait_for(Duration::from_secs(5), || {
            game.scores().iter().sum::<u32>() == 1
        }));
        // let the losing claim be judged too
        thread::sleep(Duration::from_millis(200));
        let scores = game.scores();
        assert_eq!(scores.iter().sum::<u32>(), 1, "{scores:?}");
        assert_eq!(ui.count(|e| matches!(e, Event::Score(..))), 1);
        assert_eq!(ui.count(|e| matches!(e, Event::CardRemoved(_))), 3);
        assert_eq!(game.board().count_cards(), 6);
        assert!(game.board().snapshot_markers(0).is_empty());
        assert!(game.board().snapshot_markers(1).is_empty());
        // the loser is not penalised for a stale claim
        assert_eq!(ui.count(|e| matches!(e, Event::Freeze(_, d) if !d.is_zero())), 0);

        game.terminate();
        assert_eq!(game.join().unwrap(), winners(&scores));
    }
}

#[test]
fn hints_are_logged_after_each_deal() {
    fn play(hints: bool) -> usize {
        let config = small_config()
            .with_table_size(6)
            .with_players(0, 3)
            .with_penalty_freeze(Duration::from_millis(10))
            .with_turn_timeout(Duration::from_millis(500))
            .with_hints(hints);
        let counter = HintCounter::default();
        let subscriber = Registry::default().with(counter.clone());
        // the arbiter runs on this thread, the board logs hints from it
        let winners = tracing::subscriber::with_default(subscriber, || {
            Game::new(config, Arc::new(LogUi)).unwrap().run().unwrap()
        });
        assert!(!winners.is_empty());
        counter.0.load(Ordering::SeqCst)
    }

    // any 6 cards of the plane hold a set
    assert!(play(true) >= 1);
    assert_eq!(play(false), 0);
}

#[test]
fn terminate_stops_every_thread() {
    let config = Configuration::new()
        .with_players(2, 2)
        .with_point_freeze(Duration::from_millis(20))
        .with_penalty_freeze(Duration::from_millis(20));
    let game = Game::new(config, Arc::new(LogUi)).unwrap().start().unwrap();

    thread::sleep(Duration::from_millis(200));
    game.key_pressed(0, 1);
    game.key_pressed(7, 1);
    game.terminate();

    assert!(wait_for(Duration::from_secs(10), || game.is_finished()));
    let scores = game.scores();
    assert_eq!(game.join().unwrap(), winners(&scores));
}
