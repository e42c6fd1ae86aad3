//! Module defining the Gomoku rule engine: grid, move history, turn order
//! and result detection.
//!
//! The tactical candidate scan lives in the `threat` module and extends
//! `GameState` with another `impl` block.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default grid dimension.
pub const DEFAULT_SIZE: usize = 15;
/// Default number of aligned stones needed to win.
pub const DEFAULT_WIN_LENGTH: usize = 5;

/// The four line directions through a cell: horizontal, vertical and both diagonals.
pub(crate) const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// One of the two players. `Black` always moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player{
    /// First player, stone value `+1`.
    Black,
    /// Second player, stone value `-1`.
    White
}

impl Player{
    /// Returns the other player.
    #[inline]
    pub fn opponent(self) -> Player{
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black
        }
    }

    /// Returns the signed stone value of this player (`+1` or `-1`).
    #[inline]
    pub fn sign(self) -> i8{
        match self {
            Player::Black => 1,
            Player::White => -1
        }
    }
}

/// A grid coordinate. Ordering is row-major, which fixes every tie-break
/// in candidate enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord{
    /// Row index, from 0 at the top.
    pub row: usize,
    /// Column index, from 0 on the left.
    pub col: usize
}

impl Coord{
    /// Creates a coordinate from a row and a column index.
    ///
    /// No bounds check is made here; `GameState::is_legal` and
    /// `GameState::play` validate against the grid.
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self{
        Coord { row, col }
    }

    /// Offsets this coordinate by `k` steps along `(dr, dc)`, returning `None`
    /// when the result leaves a `size`x`size` grid.
    #[inline]
    pub(crate) fn offset(self, dr: isize, dc: isize, k: isize, size: usize) -> Option<Coord>{
        let r = self.row as isize + k * dr;
        let c = self.col as isize + k * dc;

        if r < 0 || c < 0 || r >= size as isize || c >= size as isize {
            None
        }
        else{
            Some(Coord::new(r as usize, c as usize))
        }
    }
}

impl From<(usize, usize)> for Coord{
    fn from((row, col): (usize, usize)) -> Self{
        Coord::new(row, col)
    }
}

impl fmt::Display for Coord{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Result of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome{
    /// The game is still open.
    Undetermined,
    /// The given player aligned `win_length` stones.
    Win(Player),
    /// The grid filled up without an alignment.
    Draw
}

impl Outcome{
    /// `true` for a win or a draw.
    #[inline]
    pub fn is_terminal(self) -> bool{
        self != Outcome::Undetermined
    }

    /// Returns the winner, if any.
    #[inline]
    pub fn winner(self) -> Option<Player>{
        match self {
            Outcome::Win(player) => Some(player),
            _ => None
        }
    }

    /// Scores this outcome from `player`'s point of view:
    /// `1` for a win, `-1` for a loss and `0` for a draw or an open game.
    #[inline]
    pub fn value_for(self, player: Player) -> i64{
        match self {
            Outcome::Win(winner) if winner == player => 1,
            Outcome::Win(_) => -1,
            _ => 0
        }
    }
}

/// Errors raised by the rule engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError{
    /// The coordinate lies outside the grid.
    #[error("cannot play at {0}: outside the {1}x{1} grid")]
    OutOfBounds(Coord, usize),
    /// The cell already holds a stone.
    #[error("cannot play at {0}: cell is occupied")]
    Occupied(Coord),
    /// The game already has a winner or is drawn.
    #[error("cannot play at {0}: the game is already decided")]
    GameOver(Coord),
    /// The grid cannot host the requested win length.
    #[error("invalid grid: size {size} with win length {win_length}")]
    InvalidDimensions{ size: usize, win_length: usize }
}

impl GameError{
    /// `true` for errors caused by the chosen cell itself (out of bounds or occupied).
    pub fn is_illegal_move(&self) -> bool{
        matches!(self, GameError::OutOfBounds(..) | GameError::Occupied(_))
    }
}

/// The full state of a game: grid, move history, player to move and result.
///
/// Cloning produces a deep, independent copy; the search branches by cloning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState{
    size: usize,
    win_length: usize,
    grid: Vec<Option<Player>>,
    history: Vec<Coord>,
    turn: Player,
    result: Outcome
}

impl Default for GameState{
    fn default() -> Self{
        GameState::new()
    }
}

impl GameState{
    /// Creates an empty 15x15 game where five in a row wins.
    pub fn new() -> Self{
        GameState {
            size: DEFAULT_SIZE,
            win_length: DEFAULT_WIN_LENGTH,
            grid: vec![None; DEFAULT_SIZE * DEFAULT_SIZE],
            history: Vec::new(),
            turn: Player::Black,
            result: Outcome::Undetermined
        }
    }

    /// Creates an empty game with a custom grid size and win length.
    ///
    /// # Errors
    /// `GameError::InvalidDimensions` if either value is zero or if
    /// `win_length` exceeds `size`.
    pub fn with_dimensions(size: usize, win_length: usize) -> Result<Self, GameError>{
        if size == 0 || win_length == 0 || win_length > size {
            return Err(GameError::InvalidDimensions { size, win_length });
        }

        Ok(GameState {
            size,
            win_length,
            grid: vec![None; size * size],
            history: Vec::new(),
            turn: Player::Black,
            result: Outcome::Undetermined
        })
    }

    /// Creates a game and replays `moves` on it, alternating from Black.
    ///
    /// # Parameters
    /// - `size`: Grid dimension.
    /// - `win_length`: Aligned stones needed to win.
    /// - `moves`: Coordinates to play, in order.
    ///
    /// # Errors
    /// `GameError::InvalidDimensions` for bad dimensions, or the first error
    /// raised by `play` while replaying.
    ///
    /// # Examples
    /// ```rust
    /// use gomoku_mcts::{Coord, GameError, GameState, Player};
    ///
    /// let state = GameState::from_moves(9, 4, [(4, 4), (4, 5)])?;
    /// assert_eq!(state.turn(), Player::Black);
    /// assert_eq!(state.last_move(), Some(Coord::new(4, 5)));
    ///
    /// let replayed = GameState::from_moves(9, 4, [(4, 4), (4, 4)]);
    /// assert_eq!(replayed.err(), Some(GameError::Occupied(Coord::new(4, 4))));
    /// # Ok::<(), GameError>(())
    /// ```
    pub fn from_moves<I, C>(size: usize, win_length: usize, moves: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = C>,
        C: Into<Coord>
    {
        let mut state = GameState::with_dimensions(size, win_length)?;
        for coord in moves {
            state.play(coord.into())?;
        }
        Ok(state)
    }

    /// Returns the grid dimension: the grid has `size * size` cells.
    #[inline]
    pub fn size(&self) -> usize{
        self.size
    }

    /// Returns the number of aligned stones needed to win.
    #[inline]
    pub fn win_length(&self) -> usize{
        self.win_length
    }

    /// Player who moves next.
    #[inline]
    pub fn turn(&self) -> Player{
        self.turn
    }

    /// Result as of the last move.
    #[inline]
    pub fn result(&self) -> Outcome{
        self.result
    }

    /// Coordinates played so far, oldest first.
    #[inline]
    pub fn history(&self) -> &[Coord]{
        &self.history
    }

    /// Returns the most recently played coordinate, or `None` before the first move.
    #[inline]
    pub fn last_move(&self) -> Option<Coord>{
        self.history.last().copied()
    }

    /// Number of stones on the grid.
    #[inline]
    pub fn stone_count(&self) -> usize{
        self.history.len()
    }

    /// Stone at `coord`, or `None` for an empty or out-of-bounds cell.
    #[inline]
    pub fn cell(&self, coord: Coord) -> Option<Player>{
        if self.in_bounds(coord) { self.grid[self.index(coord)] } else { None }
    }

    /// Checks whether `coord` lies on the grid, regardless of occupancy.
    #[inline]
    pub fn in_bounds(&self, coord: Coord) -> bool{
        coord.row < self.size && coord.col < self.size
    }

    #[inline]
    fn index(&self, coord: Coord) -> usize{
        coord.row * self.size + coord.col
    }

    /// Checks whether a stone may be placed at `coord`.
    ///
    /// # Parameters
    /// - `coord`: The cell to test.
    ///
    /// # Returns
    /// `true` when the cell lies on the grid and is empty. Whether the game is
    /// already decided is not considered here; `play` checks that separately.
    pub fn is_legal(&self, coord: Coord) -> bool{
        self.in_bounds(coord) && self.grid[self.index(coord)].is_none()
    }

    /// Places a stone for the player to move, then updates the result.
    ///
    /// # Parameters
    /// - `coord`: The cell to play.
    ///
    /// # Errors
    /// - `GameError::GameOver` if the result is already decided.
    /// - `GameError::OutOfBounds` / `GameError::Occupied` for an illegal cell.
    ///   The state is left untouched on error.
    pub fn play(&mut self, coord: Coord) -> Result<(), GameError>{
        if self.result.is_terminal() {
            return Err(GameError::GameOver(coord));
        }
        if !self.in_bounds(coord) {
            return Err(GameError::OutOfBounds(coord, self.size));
        }

        let index = self.index(coord);
        if self.grid[index].is_some() {
            return Err(GameError::Occupied(coord));
        }

        self.grid[index] = Some(self.turn);
        self.history.push(coord);
        self.turn = self.turn.opponent();
        self.result = self.check_terminal();
        Ok(())
    }

    /// Computes the result from the most recent move.
    ///
    /// Only the four lines through the last stone are examined, each over a
    /// window of `win_length - 1` cells on both sides clipped to the grid.
    /// A full grid without an alignment is a draw.
    ///
    /// # Returns
    /// `Outcome::Win` for the player of the last stone if it completed a line,
    /// `Outcome::Draw` on a full grid, `Outcome::Undetermined` otherwise.
    pub fn check_terminal(&self) -> Outcome{
        let last = match self.history.last() {
            Some(&coord) => coord,
            None => return Outcome::Undetermined
        };
        let color = match self.cell(last) {
            Some(color) => color,
            None => return Outcome::Undetermined
        };

        let reach = self.win_length as isize - 1;
        for (dr, dc) in DIRECTIONS {
            let mut run = 0;
            for k in -reach..=reach {
                let Some(coord) = last.offset(dr, dc, k, self.size) else { continue };

                if self.grid[self.index(coord)] == Some(color) {
                    run += 1;
                    if run == self.win_length {
                        return Outcome::Win(color);
                    }
                }
                else{
                    run = 0;
                }
            }
        }

        if self.history.len() == self.size * self.size {
            Outcome::Draw
        }
        else{
            Outcome::Undetermined
        }
    }

    /// Collects the empty cells within Chebyshev distance `radius` of any stone.
    ///
    /// # Parameters
    /// - `radius`: Maximum row and column distance to a stone.
    ///
    /// # Returns
    /// The vacancies in row-major order; empty before the first move.
    pub fn vacancies_within(&self, radius: usize) -> BTreeSet<Coord>{
        let mut vacancies = BTreeSet::new();

        for stone in &self.history {
            let row_lo = stone.row.saturating_sub(radius);
            let row_hi = stone.row.saturating_add(radius).min(self.size - 1);
            let col_lo = stone.col.saturating_sub(radius);
            let col_hi = stone.col.saturating_add(radius).min(self.size - 1);

            for row in row_lo..=row_hi {
                for col in col_lo..=col_hi {
                    let coord = Coord::new(row, col);
                    if self.grid[self.index(coord)].is_none() {
                        vacancies.insert(coord);
                    }
                }
            }
        }

        vacancies
    }

    /// The search frontier: empty cells touching at least one stone.
    #[inline]
    pub fn adjacent_vacancies(&self) -> BTreeSet<Coord>{
        self.vacancies_within(1)
    }

    /// Centre cell of the grid, the opening move of choice.
    #[inline]
    pub fn center(&self) -> Coord{
        Coord::new(self.size / 2, self.size / 2)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::test_utils::state_from_moves;

    #[test]
    fn test_new_state() {
        let state = GameState::new();

        assert_eq!(state.size(), 15);
        assert_eq!(state.win_length(), 5);
        assert_eq!(state.turn(), Player::Black);
        assert_eq!(state.result(), Outcome::Undetermined);
        assert!(state.history().is_empty());
        assert!(state.adjacent_vacancies().is_empty());
    }

    #[test]
    fn test_invalid_dimensions() {
        assert_eq!(
            GameState::with_dimensions(3, 5),
            Err(GameError::InvalidDimensions { size: 3, win_length: 5 })
        );
        assert!(GameState::with_dimensions(0, 0).is_err());
        assert!(GameState::with_dimensions(5, 0).is_err());
    }

    #[test]
    fn test_play_alternates() -> Result<(), GameError> {
        let mut state = GameState::new();

        state.play(Coord::new(7, 7))?;
        assert_eq!(state.cell(Coord::new(7, 7)), Some(Player::Black));
        assert_eq!(state.turn(), Player::White);

        state.play(Coord::new(7, 8))?;
        assert_eq!(state.cell(Coord::new(7, 8)), Some(Player::White));
        assert_eq!(state.turn(), Player::Black);
        assert_eq!(state.last_move(), Some(Coord::new(7, 8)));
        Ok(())
    }

    #[test]
    fn test_illegal_moves_are_reported() -> Result<(), GameError> {
        let mut state = GameState::new();
        state.play(Coord::new(0, 0))?;

        let occupied = state.play(Coord::new(0, 0));
        assert_eq!(occupied, Err(GameError::Occupied(Coord::new(0, 0))));
        assert!(occupied.unwrap_err().is_illegal_move());

        let outside = state.play(Coord::new(15, 3));
        assert_eq!(outside, Err(GameError::OutOfBounds(Coord::new(15, 3), 15)));

        assert!(!state.is_legal(Coord::new(0, 0)));
        assert!(!state.is_legal(Coord::new(3, 15)));
        assert!(state.is_legal(Coord::new(14, 14)));
        assert_eq!(state.stone_count(), 1);
        assert_eq!(state.turn(), Player::White);
        Ok(())
    }

    #[test]
    fn test_horizontal_win_on_fifth_stone() -> Result<(), GameError> {
        let mut state = GameState::new();

        for col in 0..4 {
            state.play(Coord::new(7, col))?;
            assert_eq!(state.result(), Outcome::Undetermined);
            state.play(Coord::new(9, col))?;
            assert_eq!(state.result(), Outcome::Undetermined);
        }

        state.play(Coord::new(7, 4))?;
        assert_eq!(state.result(), Outcome::Win(Player::Black));
        assert_eq!(state.check_terminal(), Outcome::Win(Player::Black));
        Ok(())
    }

    #[test]
    fn test_win_completed_in_the_middle() {
        // White fills (5,7) last, between two pairs on the anti-diagonal.
        let state = state_from_moves(15, 5, &[
            (0, 0), (3, 9), (0, 2), (4, 8), (0, 4), (6, 6), (0, 6), (7, 5), (14, 14), (5, 7)
        ]);

        assert_eq!(state.result(), Outcome::Win(Player::White));
    }

    #[test]
    fn test_vertical_and_diagonal_wins() {
        let vertical = state_from_moves(15, 5, &[
            (10, 3), (0, 0), (11, 3), (0, 2), (12, 3), (0, 4), (13, 3), (0, 6), (14, 3)
        ]);
        assert_eq!(vertical.result(), Outcome::Win(Player::Black));

        let diagonal = state_from_moves(15, 5, &[
            (10, 10), (0, 0), (11, 11), (0, 2), (12, 12), (0, 4), (13, 13), (0, 6), (14, 14)
        ]);
        assert_eq!(diagonal.result(), Outcome::Win(Player::Black));
    }

    #[test]
    fn test_interrupted_line_is_not_a_win() {
        // Black X X O X X on row 7: White's stone at (7, 2) splits the line.
        let state = state_from_moves(15, 5, &[
            (7, 0), (7, 2), (7, 1), (0, 0), (7, 3), (0, 2), (7, 4)
        ]);

        assert_eq!(state.result(), Outcome::Undetermined);
    }

    #[test]
    fn test_play_after_win_fails() {
        let mut state = state_from_moves(5, 3, &[(0, 0), (0, 4), (1, 1), (4, 0), (2, 2)]);

        assert_eq!(state.result(), Outcome::Win(Player::Black));
        assert_eq!(state.play(Coord::new(3, 3)), Err(GameError::GameOver(Coord::new(3, 3))));
    }

    #[test]
    fn test_small_board_diagonal_from_corner() {
        let state = state_from_moves(5, 3, &[(0, 0), (0, 4), (1, 1), (4, 0), (2, 2)]);

        assert_eq!(state.check_terminal(), Outcome::Win(Player::Black));
        assert_eq!(state.cell(Coord::new(3, 3)), None);
    }

    #[test]
    fn test_full_grid_draw() {
        // X O X
        // X O O
        // O X X
        let state = state_from_moves(3, 3, &[
            (0, 0), (0, 1), (0, 2), (1, 1), (2, 1), (1, 2), (1, 0), (2, 0), (2, 2)
        ]);

        assert_eq!(state.result(), Outcome::Draw);
        assert!(state.adjacent_vacancies().is_empty());
    }

    #[test]
    fn test_adjacent_vacancies_corner() -> Result<(), GameError> {
        let mut state = GameState::new();
        state.play(Coord::new(0, 0))?;

        let expected: BTreeSet<Coord> = [(0, 1), (1, 0), (1, 1)].into_iter().map(Coord::from).collect();
        assert_eq!(state.adjacent_vacancies(), expected);
        assert_eq!(state.vacancies_within(2).len(), 8);
        Ok(())
    }

    #[test]
    fn test_vacancies_within_huge_radius() -> Result<(), GameError> {
        let mut state = GameState::with_dimensions(5, 3)?;
        state.play(Coord::new(4, 4))?;

        assert_eq!(state.vacancies_within(usize::MAX).len(), 24);
        Ok(())
    }

    #[test]
    fn test_outcome_value() {
        assert_eq!(Outcome::Win(Player::Black).value_for(Player::Black), 1);
        assert_eq!(Outcome::Win(Player::Black).value_for(Player::White), -1);
        assert_eq!(Outcome::Draw.value_for(Player::White), 0);
        assert_eq!(Outcome::Undetermined.value_for(Player::Black), 0);
    }

    proptest! {
        #[test]
        fn prop_occupancy_matches_history(cells in proptest::collection::vec((0usize..9, 0usize..9), 0..60)) {
            let mut state = GameState::with_dimensions(9, 5).unwrap();
            let mut expected_turn = Player::Black;

            for (row, col) in cells {
                let coord = Coord::new(row, col);
                let legal = state.is_legal(coord) && !state.result().is_terminal();
                let played = state.play(coord).is_ok();
                prop_assert_eq!(legal, played);
                if played {
                    expected_turn = expected_turn.opponent();
                }
                prop_assert_eq!(state.turn(), expected_turn);
            }

            let occupied = (0..9)
                .flat_map(|r| (0..9).map(move |c| Coord::new(r, c)))
                .filter(|&coord| state.cell(coord).is_some())
                .count();
            prop_assert_eq!(occupied, state.history().len());
        }

        #[test]
        fn prop_frontier_is_empty_and_adjacent(cells in proptest::collection::vec((0usize..15, 0usize..15), 1..40)) {
            let mut state = GameState::new();
            for (row, col) in cells {
                let _ = state.play(Coord::new(row, col));
            }

            for vacancy in state.adjacent_vacancies() {
                let near_stone = state.history().iter().any(|stone| {
                    stone.row.abs_diff(vacancy.row) <= 1 && stone.col.abs_diff(vacancy.col) <= 1
                });
                prop_assert!(state.cell(vacancy).is_none());
                prop_assert!(near_stone, "vacancy {} is not next to any stone", vacancy);
            }
        }
    }
}
