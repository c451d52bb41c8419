use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

#[test]
fn test_material_is_balanced_at_start() {
    let pos = Position::startpos();
    assert_eq!(material(&pos, Color::White), 0);
    assert_eq!(material(&pos, Color::Black), 0);
}

#[test]
fn test_ranks_every_legal_move() {
    let pos = Position::startpos();
    let ranked = rank_moves(&pos, 20, &mut rng());
    assert_eq!(ranked.len(), 20);
    for s in &ranked {
        assert!(pos.is_legal(s.mv));
    }
}

#[test]
fn test_takes_free_queen_at_full_skill() {
    // White rook can take an undefended queen
    let pos = Position::from_fen("4k3/8/8/3q4/8/8/8/3RK3 w - - 0 1").unwrap();
    let ranked = rank_moves(&pos, 20, &mut rng());
    assert_eq!(ranked[0].mv, Move::from_uci("d1d5").unwrap());
}

#[test]
fn test_finds_mate_in_one() {
    let pos = Position::from_fen("6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1").unwrap();
    let ranked = rank_moves(&pos, 0, &mut rng());
    assert_eq!(ranked[0].score, LineScore::Mate);
    assert_eq!(ranked[0].mv, Move::from_uci("a1a8").unwrap());
}

#[test]
fn test_no_moves_when_mated() {
    let pos = Position::from_fen("r1bqkbnr/pppp1Qpp/2n5/4p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 1").unwrap();
    assert!(rank_moves(&pos, 10, &mut rng()).is_empty());
}
