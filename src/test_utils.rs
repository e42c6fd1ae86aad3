//! Test utilities for the rule engine and the search agent

use crate::{Coord, GameState};

/// Builds a game of the given dimensions by replaying `moves` from Black.
///
/// # Panics
/// If the dimensions are invalid or any move is rejected.
pub fn state_from_moves(size: usize, win_length: usize, moves: &[(usize, usize)]) -> GameState{
    GameState::from_moves(size, win_length, moves.iter().copied())
        .unwrap_or_else(|error| panic!("invalid test position: {error}"))
}

/// Builds a default 15x15 game with the given moves.
pub fn standard_state(moves: &[(usize, usize)]) -> GameState{
    state_from_moves(15, 5, moves)
}

/// Shorthand for `Coord::new`.
pub fn at(row: usize, col: usize) -> Coord{
    Coord::new(row, col)
}

/// Utility function to compare floats with tolerance
pub fn approx_eq(a: f64, b: f64) -> bool{
    (a - b).abs() < 1e-8
}
