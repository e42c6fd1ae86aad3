//! A Gomoku (align-five) rule engine and a Monte Carlo Tree Search agent
//! that plays it.
//!
//! The rule engine tracks the grid, validates moves, detects wins from the
//! last stone and proposes candidate moves. A threat-pattern scan narrows the
//! candidates down to the cells that matter tactically, and that scan is what
//! keeps the search's branching factor tractable.
//!
//! The agent grows a statistics tree over candidate futures with random
//! rollouts and UCB1 selection, and carries the explored subtree over from one
//! real move to the next.
//!
//! # Modules
//! - `game`: Grid, turn order, legality, result detection and the frontier.
//! - `threat`: Tactical candidate filter over the frontier.
//! - `tree`: Parent/child tree with weak back-references.
//! - `mcts`: The search agent and its configuration.
//! - `utils`: Random pick and argmax helpers.
//! - `test_utils`: Position builders for tests.
//!
//! # Examples
//! ```rust
//! use gomoku_mcts::{Coord, GameState, SearchAgent, SearchConfig, SearchError};
//!
//! fn main() -> Result<(), SearchError> {
//!     let mut game = GameState::new();
//!     game.play(Coord::new(7, 7))?;
//!
//!     let config = SearchConfig { iterations: 30, seed: Some(42), ..SearchConfig::DEFAULT };
//!     let mut agent = SearchAgent::with_config(game.clone(), config)?;
//!
//!     // White's reply; the agent's root already sits on it.
//!     let result = agent.search()?;
//!     game.play(result.mov)?;
//!     assert!((0.0..=1.0).contains(&result.win_rate));
//!
//!     // Black answers outside the agent, which re-roots its tree.
//!     let answer = *game.tactical_candidates(false).iter().next().unwrap();
//!     game.play(answer)?;
//!     agent.update_root(answer)?;
//!     assert_eq!(agent.root_state(), game);
//!     Ok(())
//! }
//! ```

mod tree;
mod game;
mod threat;
mod mcts;
pub mod utils;

#[doc(hidden)]
pub mod test_utils;

pub use game::*;
pub use mcts::*;
