use super::*;
use crate::transport::{ScriptHandle, ScriptedTransport};
use crate::uci::MATE_SCORE;
use std::thread;
use std::time::Instant;

fn settings() -> EngineSettings {
    EngineSettings {
        handshake_timeout_ms: 500,
        reply_grace_ms: 50,
        ..EngineSettings::default()
    }
}

fn client_with(
    responder: impl FnMut(&str) -> Vec<String> + Send + 'static,
) -> (AnalysisClient, ScriptHandle) {
    let transport = ScriptedTransport::new(responder).named("Mock 1.0");
    let handle = transport.handle();
    let client = AnalysisClient::with_transport(Box::new(transport), &settings()).unwrap();
    (client, handle)
}

fn lines(texts: &[&str]) -> Vec<String> {
    texts.iter().map(|t| t.to_string()).collect()
}

/// Answers every `go` with the given lines.
fn on_go(texts: &'static [&'static str]) -> impl FnMut(&str) -> Vec<String> + Send + 'static {
    move |cmd| {
        if cmd.starts_with("go") {
            lines(texts)
        } else {
            Vec::new()
        }
    }
}

fn startpos() -> GameLine {
    GameLine::new(Position::startpos())
}

fn limit() -> TimeLimit {
    TimeLimit::from_millis(30)
}

fn count(handle: &ScriptHandle, line: &str) -> usize {
    handle.sent().iter().filter(|s| s.as_str() == line).count()
}

#[test]
fn test_handshake_sets_name_and_skill() {
    let (client, handle) = client_with(|_| Vec::new());
    assert!(client.is_available());
    assert_eq!(client.engine_name(), Some("Mock 1.0"));
    assert_eq!(client.skill_level(), 10);
    let sent = handle.sent();
    assert_eq!(sent[0], "uci");
    assert!(sent.contains(&"setoption name Skill Level value 10".to_string()));
}

#[test]
fn test_handshake_timeout() {
    struct Mute;
    impl EngineTransport for Mute {
        fn send(&mut self, _: &str) -> Result<(), EngineError> {
            Ok(())
        }
        fn recv_until(&mut self, until: Instant) -> Result<Option<String>, EngineError> {
            thread::sleep(until.saturating_duration_since(Instant::now()));
            Ok(None)
        }
        fn terminate(&mut self) {}
    }
    let mut s = settings();
    s.handshake_timeout_ms = 30;
    let err = AnalysisClient::with_transport(Box::new(Mute), &s).err().unwrap();
    assert!(matches!(err, EngineError::Timeout));
}

#[test]
fn test_skill_is_clamped() {
    let (mut client, handle) = client_with(|_| Vec::new());
    assert_eq!(client.configure_skill(99), 20);
    assert_eq!(client.configure_skill(-3), 0);
    assert_eq!(client.configure_skill(7), 7);
    assert_eq!(count(&handle, "setoption name Skill Level value 20"), 1);
    assert_eq!(count(&handle, "setoption name Skill Level value 0"), 1);
    assert_eq!(client.skill_level(), 7);
}

#[test]
fn test_best_move() {
    let (mut client, handle) = client_with(on_go(&["info depth 1 score cp 20 pv e2e4", "bestmove e2e4 ponder e7e5"]));
    let mv = client.best_move(&startpos(), &limit()).unwrap();
    assert_eq!(mv, Move::from_uci("e2e4").unwrap());
    let sent = handle.sent();
    assert!(sent.contains(&"position startpos".to_string()));
    assert!(sent.contains(&"go movetime 30".to_string()));
    // barrier before the search
    let ready = sent.iter().rposition(|s| s == "isready").unwrap();
    let go = sent.iter().position(|s| s.starts_with("go")).unwrap();
    assert!(ready < go);
}

#[test]
fn test_best_move_sends_history() {
    let (mut client, handle) = client_with(on_go(&["bestmove g8f6"]));
    let line = GameLine::from_moves(Position::startpos(), &[Move::from_uci("d2d4").unwrap()]).unwrap();
    assert_eq!(client.best_move(&line, &limit()).unwrap(), Move::from_uci("g8f6").unwrap());
    assert!(handle.sent().contains(&"position startpos moves d2d4".to_string()));
}

#[test]
fn test_best_move_protocol_errors() {
    let (mut client, _) = client_with(on_go(&["bestmove e2e5"]));
    assert!(matches!(
        client.best_move(&startpos(), &limit()),
        Err(EngineError::Protocol(_))
    ));
    assert!(client.is_available());

    let (mut client, _) = client_with(on_go(&["bestmove (none)"]));
    assert!(matches!(
        client.best_move(&startpos(), &limit()),
        Err(EngineError::Protocol(_))
    ));
}

#[test]
fn test_best_move_timeout_keeps_engine() {
    let mut searches = 0;
    let (mut client, handle) = client_with(move |cmd| {
        if cmd.starts_with("go") {
            searches += 1;
            if searches > 1 {
                return lines(&["bestmove d2d4"]);
            }
        }
        Vec::new()
    });
    let started = Instant::now();
    assert!(matches!(
        client.best_move(&startpos(), &limit()),
        Err(EngineError::Timeout)
    ));
    // budget plus grace, not much more
    assert!(started.elapsed() >= Duration::from_millis(80));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(count(&handle, "stop"), 1);
    assert!(client.is_available());

    assert_eq!(
        client.best_move(&startpos(), &limit()).unwrap(),
        Move::from_uci("d2d4").unwrap()
    );
}

#[test]
fn test_stale_bestmove_is_not_taken_for_next_answer() {
    let mut searches = 0;
    let (mut client, _) = client_with(move |cmd| match cmd {
        "stop" => lines(&["bestmove a2a3"]),
        c if c.starts_with("go") => {
            searches += 1;
            if searches == 1 {
                Vec::new()
            } else {
                lines(&["bestmove e2e4"])
            }
        }
        _ => Vec::new(),
    });
    assert!(client.best_move(&startpos(), &limit()).is_err());
    assert_eq!(
        client.best_move(&startpos(), &limit()).unwrap(),
        Move::from_uci("e2e4").unwrap()
    );
}

const MULTIPV_SCRIPT: &[&str] = &[
    "info depth 1 multipv 1 score cp 30 pv e2e4 e7e5",
    "info depth 1 multipv 2 score cp 25 pv d2d4",
    "info depth 2 multipv 2 score cp 28 pv e2e4",
    "info depth 2 multipv 3 score cp 10 pv g1f3",
    "bestmove e2e4",
];

#[test]
fn test_top_lines_dedups_by_notation() {
    let (mut client, _) = client_with(on_go(MULTIPV_SCRIPT));
    let top = client.top_lines(&startpos(), 5, &limit()).unwrap();
    let names: Vec<&str> = top.iter().map(|m| m.notation.as_str()).collect();
    assert_eq!(names, vec!["e4", "d4", "Nf3"]);
    // first-seen score wins
    assert_eq!(top[0].score, 30);
    assert_eq!(top[0].mv, Move::from_uci("e2e4").unwrap());
}

#[test]
fn test_top_lines_truncates_and_stops_early() {
    let (mut client, handle) = client_with(on_go(MULTIPV_SCRIPT));
    let top = client.top_lines(&startpos(), 2, &limit()).unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].notation, "e4");
    assert_eq!(top[1].notation, "d4");
    // two distinct moves arrived before bestmove, so the search was stopped
    assert_eq!(count(&handle, "stop"), 1);
    assert_eq!(count(&handle, "setoption name MultiPV value 2"), 1);
}

#[test]
fn test_top_lines_is_repeatable() {
    let (mut client, handle) = client_with(on_go(MULTIPV_SCRIPT));
    let first = client.top_lines(&startpos(), 3, &limit()).unwrap();
    let second = client.top_lines(&startpos(), 3, &limit()).unwrap();
    assert_eq!(first, second);
    // MultiPV only resent when it changes
    assert_eq!(count(&handle, "setoption name MultiPV value 3"), 1);
}

#[test]
fn test_top_lines_orders_by_rank() {
    let (mut client, _) = client_with(on_go(&[
        "info depth 1 multipv 2 score cp 5 pv b1c3",
        "info depth 1 multipv 1 score cp 15 pv c2c4",
        "bestmove c2c4",
    ]));
    let top = client.top_lines(&startpos(), 2, &limit()).unwrap();
    assert_eq!(top[0].notation, "c4");
    assert_eq!(top[1].notation, "Nc3");
}

#[test]
fn test_top_lines_deadline_returns_partial() {
    let (mut client, _) = client_with(on_go(&["info depth 1 multipv 1 score cp 12 pv e2e4"]));
    let top = client.top_lines(&startpos(), 3, &limit()).unwrap();
    assert_eq!(top.len(), 1);
}

#[test]
fn test_top_lines_zero_does_not_query() {
    let (mut client, handle) = client_with(on_go(MULTIPV_SCRIPT));
    let before = handle.sent().len();
    assert!(client.top_lines(&startpos(), 0, &limit()).unwrap().is_empty());
    assert_eq!(handle.sent().len(), before);
}

#[test]
fn test_top_lines_ignores_garbage_pv() {
    let (mut client, _) = client_with(on_go(&[
        "info depth 1 multipv 1 score cp 12 pv e2e5",
        "info depth 1 multipv 1 pv e2e4",
        "info string hello",
        "info depth 1 multipv 2 score cp 3 pv a2a3",
        "bestmove a2a3",
    ]));
    let top = client.top_lines(&startpos(), 3, &limit()).unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].notation, "a3");
}

#[test]
fn test_evaluation_mate_sentinel() {
    let (mut client, _) = client_with(on_go(&[
        "info depth 1 score cp 300 pv d1h5",
        "info depth 4 score mate 2 pv d1h5",
        "bestmove d1h5",
    ]));
    let eval = client.evaluation_of(&startpos(), &limit()).unwrap();
    assert_eq!(eval, MATE_SCORE - 2);
    assert!(eval.abs() <= MATE_SCORE);
}

#[test]
fn test_evaluation_is_from_whites_view() {
    let (mut client, _) = client_with(on_go(&["info depth 3 score cp 40 pv e7e5", "bestmove e7e5"]));
    let line = GameLine::from_moves(Position::startpos(), &[Move::from_uci("e2e4").unwrap()]).unwrap();
    assert_eq!(client.evaluation_of(&line, &limit()).unwrap(), -40);
}

#[test]
fn test_evaluation_without_score_times_out() {
    let (mut client, _) = client_with(on_go(&["info depth 1 nodes 20"]));
    assert!(matches!(
        client.evaluation_of(&startpos(), &limit()),
        Err(EngineError::Timeout)
    ));
}

#[test]
fn test_process_death_marks_unavailable() {
    let (mut client, handle) = client_with(on_go(&["bestmove e2e4"]));
    handle.kill();
    assert!(matches!(
        client.best_move(&startpos(), &limit()),
        Err(EngineError::ProcessFailure(_))
    ));
    assert!(!client.is_available());
    assert!(matches!(
        client.evaluation_of(&startpos(), &limit()),
        Err(EngineError::Unavailable)
    ));
    // never fails the caller
    assert_eq!(client.configure_skill(30), 20);
}

#[test]
fn test_cancelled_before_start() {
    let (mut client, _) = client_with(on_go(&["bestmove e2e4"]));
    let limit = limit();
    limit.stop();
    assert!(matches!(
        client.best_move(&startpos(), &limit),
        Err(EngineError::Cancelled)
    ));
    assert!(client.is_available());
}

#[test]
fn test_cancelled_while_waiting() {
    let (mut client, handle) = client_with(|_| Vec::new());
    let limit = TimeLimit::from_millis(5_000);
    let canceller = limit.clone();
    let t = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        canceller.stop();
    });
    let started = Instant::now();
    assert!(matches!(
        client.top_lines(&startpos(), 3, &limit),
        Err(EngineError::Cancelled)
    ));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(count(&handle, "stop"), 1);
    t.join().unwrap();
}

#[test]
fn test_shutdown_happens_once() {
    let (mut client, handle) = client_with(|_| Vec::new());
    client.shutdown();
    client.shutdown();
    assert!(!client.is_available());
    drop(client);
    assert_eq!(count(&handle, "quit"), 1);
}

#[test]
fn test_drop_shuts_down() {
    let (client, handle) = client_with(|_| Vec::new());
    drop(client);
    assert_eq!(count(&handle, "quit"), 1);
    assert!(handle.is_dead());
}
