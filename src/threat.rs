//! Threat-pattern filter over the search frontier.
//!
//! A frontier cell is a key candidate when, for either player, one of the four
//! lines through it shows a run that the cell turns into a threat: a run of
//! `win_length - 2` stones with both completing ends empty, or a run of
//! `win_length - 1` stones. The scanned cell itself is empty and is skipped
//! over without breaking the run, so split patterns such as `XX_X` count too.

use std::collections::BTreeSet;

use tracing::debug;

use crate::game::{Coord, GameState, Player, DIRECTIONS};

impl GameState{
    /// Returns the frontier cells matching a threat pattern for either player,
    /// or the whole frontier when none does.
    ///
    /// The result is never empty while at least one stone is on the grid and
    /// a frontier cell remains.
    ///
    /// # Parameters
    /// - `log`: emit the key candidates at `debug` level.
    #[inline]
    pub fn tactical_candidates(&self, log: bool) -> BTreeSet<Coord>{
        self.tactical_candidates_within(1, log)
    }

    /// Same filter over the wider frontier `vacancies_within(radius)`.
    ///
    /// # Parameters
    /// - `radius`: Maximum row and column distance from a frontier cell to a stone.
    /// - `log`: emit the key candidates at `debug` level.
    ///
    /// # Returns
    /// The key cells of that frontier, or the whole frontier when there are none.
    pub fn tactical_candidates_within(&self, radius: usize, log: bool) -> BTreeSet<Coord>{
        let vacancies = self.vacancies_within(radius);

        let keys: BTreeSet<Coord> = vacancies.iter()
            .copied()
            .filter(|&vacancy| {
                [Player::White, Player::Black].into_iter().any(|player| self.is_key_cell(vacancy, player))
            })
            .collect();

        if keys.is_empty() {
            return vacancies;
        }

        if log {
            debug!(radius, candidates = ?keys, "key candidates");
        }
        keys
    }

    /// Scans the four lines through `vacancy` for a `player` threat.
    fn is_key_cell(&self, vacancy: Coord, player: Player) -> bool{
        let reach = self.win_length() as isize - 1;
        let open_run = self.win_length().saturating_sub(2);
        let closing_run = self.win_length() - 1;

        for (dr, dc) in DIRECTIONS {
            let mut count = 0;
            let mut start = 0;

            for k in -reach..=reach {
                let Some(coord) = vacancy.offset(dr, dc, k, self.size()) else { continue };

                if self.cell(coord) == Some(player) {
                    if count == 0 {
                        start = k - 1;
                    }
                    count += 1;
                }
                else if k != 0 {
                    count = 0;
                }

                if count == open_run && count > 0 && self.is_open(vacancy, dr, dc, start) && self.is_open(vacancy, dr, dc, k + 1) {
                    return true;
                }
                if count == closing_run {
                    return true;
                }
            }
        }

        false
    }

    /// `true` if the cell `k` steps from `origin` along `(dr, dc)` is on the grid and empty.
    #[inline]
    fn is_open(&self, origin: Coord, dr: isize, dc: isize, k: isize) -> bool{
        origin.offset(dr, dc, k, self.size()).is_some_and(|coord| self.cell(coord).is_none())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::game::{Coord, GameState};
    use crate::test_utils::state_from_moves;

    #[test]
    fn test_fallback_to_frontier() {
        let state = state_from_moves(15, 5, &[(7, 7), (7, 8)]);

        assert_eq!(state.tactical_candidates(false), state.adjacent_vacancies());
    }

    #[test]
    fn test_empty_board_has_no_candidates() {
        assert!(GameState::new().tactical_candidates(false).is_empty());
    }

    #[test]
    fn test_open_three_ends() {
        // Black at (7,5),(7,6),(7,7); White scattered far away.
        let state = state_from_moves(15, 5, &[(7, 5), (0, 0), (7, 6), (0, 14), (7, 7)]);
        let keys = state.tactical_candidates(false);

        assert!(keys.contains(&Coord::new(7, 4)));
        assert!(keys.contains(&Coord::new(7, 8)));
        assert!(!keys.contains(&Coord::new(6, 6)));
        assert!(keys.is_subset(&state.adjacent_vacancies()));
    }

    #[test]
    fn test_blocked_three_is_ignored() {
        // Black three on row 7 walled by White on both sides.
        let state = state_from_moves(15, 5, &[(7, 5), (7, 4), (7, 6), (7, 8), (7, 7)]);
        let keys = state.tactical_candidates(false);

        assert_eq!(keys, state.adjacent_vacancies());
    }

    #[test]
    fn test_closed_four_must_be_answered() {
        // Black four (7,4)..(7,7) closed by White at (7,3): only (7,8) completes it.
        let state = state_from_moves(15, 5, &[
            (7, 4), (7, 3), (7, 5), (0, 0), (7, 6), (0, 14), (7, 7)
        ]);
        let keys = state.tactical_candidates(false);

        assert!(keys.contains(&Coord::new(7, 8)));
        assert!(!keys.contains(&Coord::new(6, 5)));
    }

    #[test]
    fn test_split_four_gap_is_key() {
        // Black X X _ X X on row 3: the gap completes five.
        let state = state_from_moves(15, 5, &[
            (3, 3), (10, 0), (3, 4), (10, 14), (3, 6), (14, 7), (3, 7)
        ]);

        assert!(state.tactical_candidates(true).contains(&Coord::new(3, 5)));
    }

    #[test]
    fn test_opponent_threats_count() {
        // White holds the open three; Black to move must still see it.
        let state = state_from_moves(15, 5, &[(0, 0), (5, 5), (0, 14), (6, 6), (14, 0), (7, 7)]);
        let keys = state.tactical_candidates(false);

        assert!(keys.contains(&Coord::new(4, 4)));
        assert!(keys.contains(&Coord::new(8, 8)));
    }

    #[test]
    fn test_wider_frontier_scan() {
        // Black three (7,5)..(7,7): (7,3) sits two cells from the nearest stone.
        let state = state_from_moves(15, 5, &[(7, 5), (0, 0), (7, 6), (0, 14), (7, 7)]);

        let narrow = state.tactical_candidates(false);
        let wide = state.tactical_candidates_within(2, false);

        assert!(!narrow.contains(&Coord::new(7, 3)));
        assert!(wide.contains(&Coord::new(7, 3)));
        assert!(wide.is_superset(&narrow));
        assert!(wide.is_subset(&state.vacancies_within(2)));
    }

    proptest! {
        #[test]
        fn prop_candidates_within_frontier(cells in proptest::collection::vec((0usize..15, 0usize..15), 1..50)) {
            let mut state = GameState::new();
            for (row, col) in cells {
                let _ = state.play(Coord::new(row, col));
            }

            let frontier = state.adjacent_vacancies();
            let candidates = state.tactical_candidates(false);

            prop_assert!(candidates.is_subset(&frontier));
            prop_assert_eq!(candidates.is_empty(), frontier.is_empty());
        }
    }
}
