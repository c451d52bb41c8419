use super::*;

#[test]
fn test_defaults() {
    let cfg = CoachConfig::default();
    assert_eq!(cfg.engine.path, PathBuf::from("stockfish"));
    assert_eq!(cfg.engine.skill_level, 10);
    assert_eq!(cfg.timing.reply_ms, 100);
    assert_eq!(cfg.timing.eval_ms, 100);
    assert_eq!(cfg.timing.top_moves_ms, 1000);
    assert_eq!(cfg.overlay.top_moves, 5);
    assert_eq!(cfg.overlay.eval_clamp, 1000);
    assert_eq!(cfg.start_fen, STARTPOS_FEN);
}

#[test]
fn test_empty_file_is_default() {
    let cfg = CoachConfig::from_toml_str("", Path::new("coach.toml")).unwrap();
    assert_eq!(cfg, CoachConfig::default());
}

#[test]
fn test_partial_override() {
    let text = r#"
        [engine]
        path = "/opt/engines/sf"
        args = ["--threads", "2"]
        skill_level = 3

        [timing]
        reply_ms = 250
    "#;
    let cfg = CoachConfig::from_toml_str(text, Path::new("coach.toml")).unwrap();
    assert_eq!(cfg.engine.path, PathBuf::from("/opt/engines/sf"));
    assert_eq!(cfg.engine.args, vec!["--threads", "2"]);
    assert_eq!(cfg.engine.skill_level, 3);
    // untouched fields keep their defaults
    assert_eq!(cfg.engine.reply_grace_ms, 500);
    assert_eq!(cfg.timing.reply_ms, 250);
    assert_eq!(cfg.timing.top_moves_ms, 1000);
    assert_eq!(cfg.timing.reply_limit().budget_ms(), 250);
    assert_eq!(cfg.overlay, OverlaySettings::default());
}

#[test]
fn test_parse_error_names_file() {
    let err = CoachConfig::from_toml_str("[engine\npath = 1", Path::new("bad.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("bad.toml"));
}

#[test]
fn test_missing_file_gives_defaults() {
    let path = std::env::temp_dir().join("coach-config-that-does-not-exist.toml");
    let cfg = CoachConfig::load(&path).unwrap();
    assert_eq!(cfg, CoachConfig::default());
}

#[test]
fn test_load_from_disk() {
    let path = std::env::temp_dir().join(format!("coach-config-{}.toml", std::process::id()));
    fs::write(&path, "start_fen = \"8/8/8/8/8/8/8/K6k w - - 0 1\"\n[overlay]\ntop_moves = 2\n").unwrap();
    let cfg = CoachConfig::load(&path).unwrap();
    fs::remove_file(&path).unwrap();
    assert_eq!(cfg.start_fen, "8/8/8/8/8/8/8/K6k w - - 0 1");
    assert_eq!(cfg.overlay.top_moves, 2);
}
