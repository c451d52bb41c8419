use super::*;
use proptest::prelude::*;

fn sq(s: &str) -> Square {
    s.parse().unwrap()
}

/// Distance table from `start` computed by a plain level-by-level sweep,
/// independent of the path reconstruction above.
fn reference_distances(start: Square) -> [Option<usize>; 64] {
    let mut dist = [None; 64];
    dist[start.index() as usize] = Some(0);
    let mut frontier = vec![start];
    let mut level = 0;
    while !frontier.is_empty() {
        level += 1;
        let mut next = Vec::new();
        for s in frontier {
            for (dr, df) in KNIGHT_OFFSETS {
                if let Some(n) = s.offset(df, dr) {
                    if dist[n.index() as usize].is_none() {
                        dist[n.index() as usize] = Some(level);
                        next.push(n);
                    }
                }
            }
        }
        frontier = next;
    }
    dist
}

fn is_knight_hop(a: Square, b: Square) -> bool {
    let df = (i32::from(a.file()) - i32::from(b.file())).abs();
    let dr = (i32::from(a.rank()) - i32::from(b.rank())).abs();
    (df == 1 && dr == 2) || (df == 2 && dr == 1)
}

#[test]
fn test_same_square() {
    let e4 = sq("e4");
    assert_eq!(shortest_path(e4, e4), vec![e4]);
    assert_eq!(knight_distance(e4, e4), Some(0));
}

#[test]
fn test_single_hop() {
    assert_eq!(shortest_path(sq("g1"), sq("f3")), vec![sq("g1"), sq("f3")]);
}

#[test]
fn test_corner_to_corner() {
    let path = shortest_path(sq("a1"), sq("h8"));
    // a1 -> h8 takes six knight moves
    assert_eq!(path.len(), 7);
    assert_eq!(path.first(), Some(&sq("a1")));
    assert_eq!(path.last(), Some(&sq("h8")));
}

#[test]
fn test_deterministic_tie_break() {
    // a1 -> b2 is a known 4-move case with many equal paths.
    let first = shortest_path(sq("a1"), sq("b2"));
    let second = shortest_path(sq("a1"), sq("b2"));
    assert_eq!(first.len(), 5);
    assert_eq!(first, second);
}

#[test]
fn test_offsets_move_rank_first() {
    // (2, 1) is two ranks up and one file right, so it is tried first
    assert_eq!(knight_neighbours(sq("a1")).collect::<Vec<_>>(), vec![sq("b3"), sq("c2")]);
    assert_eq!(
        shortest_path(sq("a1"), sq("b1")),
        vec![sq("a1"), sq("b3"), sq("d2"), sq("b1")]
    );
}

#[test]
fn test_exhaustive_against_reference() {
    for a in Square::all() {
        let reference = reference_distances(a);
        for b in Square::all() {
            let path = shortest_path(a, b);
            assert_eq!(
                Some(path.len() - 1),
                reference[b.index() as usize],
                "distance {a} -> {b}"
            );
        }
    }
}

#[test]
fn test_neighbour_counts() {
    assert_eq!(knight_neighbours(sq("a1")).count(), 2);
    assert_eq!(knight_neighbours(sq("e4")).count(), 8);
    assert_eq!(knight_neighbours(sq("b1")).count(), 3);
}

proptest! {
    #[test]
    fn prop_path_is_chain_of_knight_hops(a in 0u8..64, b in 0u8..64) {
        let start = Square::from_index(a).unwrap();
        let end = Square::from_index(b).unwrap();
        let path = shortest_path(start, end);
        prop_assert_eq!(path[0], start);
        prop_assert_eq!(*path.last().unwrap(), end);
        for w in path.windows(2) {
            prop_assert!(is_knight_hop(w[0], w[1]));
        }
        // no square visited twice
        let mut seen = path.clone();
        seen.sort();
        seen.dedup();
        prop_assert_eq!(seen.len(), path.len());
    }

    #[test]
    fn prop_distance_is_symmetric(a in 0u8..64, b in 0u8..64) {
        let x = Square::from_index(a).unwrap();
        let y = Square::from_index(b).unwrap();
        prop_assert_eq!(knight_distance(x, y), knight_distance(y, x));
    }
}
