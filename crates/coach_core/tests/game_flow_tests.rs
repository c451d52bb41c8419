//! End-to-end game flow against scripted engines
//!
//! - Status stays consistent with the legal move set over random games
//! - Undo restores positions exactly
//! - A scripted engine plays a full exchange through the controller

use coach_core::uci::parse_position_command;
use coach_core::{
    AnalysisClient, CoachConfig, GameController, GameLine, GameStatus, MoveOutcome, Position,
    ScriptedTransport, TimeLimit, TimingSettings,
};
use proptest::prelude::*;

// =============================================================================
// Rules consistency
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_status_matches_legal_moves(choices in prop::collection::vec(any::<u16>(), 0..120)) {
        let mut pos = Position::startpos();
        let mut earlier: Vec<Position> = Vec::new();
        for choice in choices {
            let moves = pos.legal_moves();
            let status = pos.status(earlier.iter());
            match status {
                GameStatus::Checkmate | GameStatus::Stalemate => prop_assert!(moves.is_empty()),
                GameStatus::Ongoing => prop_assert!(!moves.is_empty()),
                _ => {}
            }
            if status.is_terminal() {
                break;
            }
            let mv = moves[usize::from(choice) % moves.len()];
            let next = pos.apply(mv).unwrap();
            earlier.push(std::mem::replace(&mut pos, next));
        }
    }

    #[test]
    fn prop_undo_restores_exact_position(choices in prop::collection::vec(any::<u16>(), 1..40)) {
        let mut config = CoachConfig::default();
        config.timing = TimingSettings { reply_ms: 10, eval_ms: 10, top_moves_ms: 10 };
        let mut game = GameController::new(config, None).unwrap();
        let mut played = Vec::new();
        for choice in choices {
            if game.status().is_terminal() {
                break;
            }
            let moves = game.position().legal_moves();
            let mv = moves[usize::from(choice) % moves.len()];
            // promotions are always to a queen through the controller
            if mv.promotion.is_some_and(|p| p != coach_core::PieceKind::Queen) {
                continue;
            }
            played.push(game.position().clone());
            game.select(mv.from);
            let outcome = game.select(mv.to);
            prop_assert!(matches!(outcome, MoveOutcome::Played(_)), "{outcome:?}");
        }
        while played.len() >= 2 {
            let expected = played[played.len() - 2].clone();
            prop_assert_eq!(game.undo(), 2);
            played.truncate(played.len() - 2);
            prop_assert_eq!(game.position(), &expected);
        }
        prop_assert_eq!(game.undo(), played.len());
        prop_assert_eq!(game.position(), &Position::startpos());
    }
}

// =============================================================================
// Scripted engine
// =============================================================================

/// Replies with the last legal move in generation order and a fixed score.
fn last_legal_engine() -> impl FnMut(&str) -> Vec<String> + Send + 'static {
    let mut current: Option<GameLine> = None;
    move |cmd| {
        if let Some(args) = cmd.strip_prefix("position ") {
            let args: Vec<&str> = args.split_whitespace().collect();
            current = parse_position_command(&args).ok();
            return Vec::new();
        }
        if !cmd.starts_with("go") {
            return Vec::new();
        }
        let moves = current
            .as_ref()
            .map(|l| l.current().legal_moves())
            .unwrap_or_default();
        let mut out: Vec<String> = moves
            .iter()
            .rev()
            .take(3)
            .enumerate()
            .map(|(i, mv)| format!("info depth 2 multipv {} score cp {} pv {mv}", i + 1, 50 - 10 * i as i32))
            .collect();
        out.push(match moves.last() {
            Some(mv) => format!("bestmove {mv}"),
            None => "bestmove (none)".to_string(),
        });
        out
    }
}

fn scripted_game() -> GameController {
    let mut config = CoachConfig::default();
    config.engine.reply_grace_ms = 50;
    config.timing = TimingSettings {
        reply_ms: 20,
        eval_ms: 20,
        top_moves_ms: 50,
    };
    config.overlay.top_moves = 3;
    let client =
        AnalysisClient::with_transport(Box::new(ScriptedTransport::new(last_legal_engine())), &config.engine)
            .unwrap();
    GameController::new(config, Some(client)).unwrap()
}

#[test]
fn test_full_exchange_with_scripted_engine() {
    let mut game = scripted_game();
    for _ in 0..4 {
        let moves = game.position().legal_moves();
        let mv = moves[0];
        game.select(mv.from);
        let MoveOutcome::Played(report) = game.select(mv.to) else {
            panic!("move {mv} was not played");
        };
        if report.status.is_terminal() {
            break;
        }
        assert!(report.reply.is_some());
    }
    let snap = game.snapshot();
    assert_eq!(snap.history_depth % 2, 0);
    assert_eq!(snap.moves.len(), snap.history_depth);
    assert!(snap.engine.available);
}

#[test]
fn test_overlay_lists_distinct_moves() {
    let mut game = scripted_game();
    let overlay = game.refresh_overlay().cloned().unwrap();
    assert_eq!(overlay.evaluation, Some(50));
    assert_eq!(overlay.top_moves.len(), 3);
    let mut names: Vec<&str> = overlay.top_moves.iter().map(|m| m.notation.as_str()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 3);
}

#[test]
fn test_client_round_trip_through_public_api() {
    let config = CoachConfig::default();
    let mut client =
        AnalysisClient::with_transport(Box::new(ScriptedTransport::new(last_legal_engine())), &config.engine)
            .unwrap();
    let line = GameLine::new(Position::startpos());
    let limit = TimeLimit::from_millis(20);
    let mv = client.best_move(&line, &limit).unwrap();
    assert!(line.current().is_legal(mv));
    client.shutdown();
    assert!(!client.is_available());
}
