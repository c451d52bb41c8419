//! Shortest knight paths on the 8x8 board, for the knight-path overlay.
//!
//! Breadth-first search over the implicit knight graph. Neighbours are
//! expanded in the fixed [`KNIGHT_OFFSETS`] order, so among equally short
//! paths the same one is always returned.

use std::collections::VecDeque;

use crate::types::Square;

/// Knight jumps as (rank, file) deltas, in expansion order.
pub const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (2, 1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (-1, -2),
    (1, -2),
    (2, -1),
];

/// Squares a knight on `sq` can jump to, in offset order.
pub fn knight_neighbours(sq: Square) -> impl Iterator<Item = Square> {
    KNIGHT_OFFSETS
        .iter()
        .filter_map(move |&(dr, df)| sq.offset(df, dr))
}

/// Shortest knight path from `start` to `end`, both inclusive.
///
/// Returns `[start]` when the squares are equal and an empty path if `end`
/// cannot be reached.
pub fn shortest_path(start: Square, end: Square) -> Vec<Square> {
    if start == end {
        return vec![start];
    }

    // parent[i] is the square we reached square i from
    let mut parent: [Option<Square>; 64] = [None; 64];
    let mut visited = [false; 64];
    let mut queue = VecDeque::with_capacity(64);
    visited[start.index() as usize] = true;
    queue.push_back(start);

    while let Some(curr) = queue.pop_front() {
        for next in knight_neighbours(curr) {
            let idx = next.index() as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            parent[idx] = Some(curr);
            if next == end {
                return rebuild(&parent, start, end);
            }
            queue.push_back(next);
        }
    }
    Vec::new()
}

/// Number of knight moves between two squares, if reachable.
pub fn knight_distance(start: Square, end: Square) -> Option<usize> {
    let path = shortest_path(start, end);
    if path.is_empty() {
        None
    } else {
        Some(path.len() - 1)
    }
}

fn rebuild(parent: &[Option<Square>; 64], start: Square, end: Square) -> Vec<Square> {
    let mut path = vec![end];
    let mut curr = end;
    while curr != start {
        match parent[curr.index() as usize] {
            Some(prev) => {
                path.push(prev);
                curr = prev;
            }
            None => return Vec::new(),
        }
    }
    path.reverse();
    path
}

#[cfg(test)]
#[path = "knight_path_tests.rs"]
mod knight_path_tests;
