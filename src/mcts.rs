//! Implementation of the Monte Carlo Tree Search agent.
//!
//! Every iteration runs selection, expansion, a random rollout and
//! backpropagation over a tree of owned `GameState` snapshots. The tree
//! survives between real moves: the chosen or observed move is promoted to
//! root and its sibling subtrees are dropped.

use std::{
    collections::BTreeSet,
    rc::Rc,
    time::{Duration, Instant}
};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    tree::{promote, Node, NodeRef},
    utils::{argmax_first, pick_uniform},
    Coord, GameError, GameState, Outcome, Player
};

/// Maps a signed value sum into a win probability in `[0, 1]`.
///
/// # Parameters
/// - `value_sum`: Sum of outcomes (`+1` win, `0` draw, `-1` loss).
/// - `visits`: Number of outcomes summed. Must be positive.
#[inline]
pub fn win_rate(value_sum: f64, visits: f64) -> f64{
    value_sum / (2. * visits) + 0.5
}

/// The UCB1 selection score: mean value plus an exploration bonus.
///
/// # Parameters
/// - `value_sum`: Sum of outcomes seen through the node.
/// - `visits`: Visits to the node. Must be positive.
/// - `parent_visits`: Visits to the parent. Must be positive.
/// - `exploration_coef`: Weight of the exploration term.
#[inline]
pub fn selection_score(value_sum: f64, visits: f64, parent_visits: f64, exploration_coef: f64) -> f64{
    value_sum / visits + exploration_coef * (parent_visits.ln() / visits).sqrt()
}

/// Errors that can occur during a search.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError{
    /// A move handed to the agent was rejected by the rules.
    #[error(transparent)]
    Game(#[from] GameError),
    /// The root position is already decided, there is nothing to search.
    #[error("cannot search a finished game ({0:?})")]
    TerminalState(Outcome),
    /// A live position produced no candidate move. Indicates a logic bug.
    #[error("no candidate moves on a live board after {moves_played} moves")]
    EmptyCandidateSet{ moves_played: usize },
    /// The configuration cannot drive a search.
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String)
}

/// Configuration parameters for a `SearchAgent`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig{
    /// Iterations per `search` call. At least one.
    pub iterations: usize,
    /// Weight of the exploration term in the selection score.
    pub exploration_coef: f64,
    /// Rollout plies, counted from the root, that sample tactical candidates
    /// before falling back to the plain frontier.
    pub rollout_tactical_plies: usize,
    /// Wall-clock budget per `search` call, checked between iterations.
    pub time_limit_ms: Option<u64>,
    /// Stop once any root child has more visits than this.
    pub early_stop_visits: Option<u32>,
    /// Seed for the rollout generator; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Adds the wider tactical candidates to shallow nodes in the midgame.
    /// `None` keeps every node on the adjacent frontier.
    pub wide_expansion: Option<WideExpansion>
}

/// Second, wider expansion of shallow nodes.
///
/// When selection passes through an expanded node at most `max_depth` plies
/// below the root, and the root position holds at least `min_stones` stones,
/// the node gains one child per `tactical_candidates_within(radius)` move it
/// does not have yet. Each node is widened once.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WideExpansion{
    /// Frontier radius of the second scan. At least one.
    pub radius: usize,
    /// Deepest node widened, in plies below the root (the root is 0).
    pub max_depth: usize,
    /// Stones required on the root position before any widening.
    pub min_stones: usize
}

impl WideExpansion{
    /// Radius 2 on the root and its children once eight stones are down.
    pub const DEFAULT: WideExpansion = WideExpansion{
        radius: 2,
        max_depth: 1,
        min_stones: 8
    };
}

impl Default for WideExpansion{
    fn default() -> Self{
        WideExpansion::DEFAULT
    }
}

impl SearchConfig{
    /// The default configuration: 1000 iterations, exploration coefficient 2,
    /// five tactical rollout plies, no time limit, an OS seed and no wide
    /// expansion.
    pub const DEFAULT: SearchConfig = SearchConfig{
        iterations: 1000,
        exploration_coef: 2.0,
        rollout_tactical_plies: 5,
        time_limit_ms: None,
        early_stop_visits: None,
        seed: None,
        wide_expansion: None
    };

    /// Checks that the configuration can drive a search.
    pub fn validate(&self) -> Result<(), SearchError>{
        if self.iterations == 0 {
            return Err(SearchError::InvalidConfig("iterations must be at least 1".into()));
        }
        if !self.exploration_coef.is_finite() || self.exploration_coef < 0. {
            return Err(SearchError::InvalidConfig(format!(
                "exploration_coef must be a non-negative number, got {}", self.exploration_coef
            )));
        }
        if self.wide_expansion.is_some_and(|wide| wide.radius == 0) {
            return Err(SearchError::InvalidConfig("wide_expansion.radius must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for SearchConfig{
    fn default() -> Self{
        SearchConfig::DEFAULT
    }
}

/// Data stored in each node of the search tree.
#[derive(Debug)]
struct SearchNodeData{
    /// Position reached by the path from the root.
    state: GameState,
    /// Player whose move produced `state`; statistics are from this side.
    mover: Player,
    move_from_parent: Option<Coord>,
    visits: u32,
    value_sum: i64,
    /// Set once the wide expansion has added its children.
    widened: bool
}

impl SearchNodeData{
    fn new(state: GameState, move_from_parent: Option<Coord>) -> Self{
        SearchNodeData {
            mover: state.turn().opponent(),
            state,
            move_from_parent,
            visits: 0,
            value_sum: 0,
            widened: false
        }
    }

    /// Win probability for `mover`. Requires at least one visit.
    #[inline]
    fn win_rate(&self) -> f64{
        win_rate(self.value_sum as f64, self.visits as f64)
    }

    #[inline]
    fn selection_score(&self, parent_visits: f64, exploration_coef: f64) -> f64{
        selection_score(self.value_sum as f64, self.visits as f64, parent_visits, exploration_coef)
    }

    #[inline]
    fn add_value(&mut self, value: i64){
        self.visits += 1;
        self.value_sum += value;
    }
}

type SearchNodeRef = NodeRef<SearchNodeData>;

/// Recommended move returned by `SearchAgent::search`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchResult{
    pub mov: Coord,
    /// Estimated win probability for the side playing `mov`, in `[0, 1]`.
    pub win_rate: f64,
    /// Iterations actually run.
    pub iterations: usize,
    /// Visits accumulated under `mov`, carried into the next turn.
    pub root_visits: u32
}

/// Diagnostics of `SearchAgent::update_root`. Both are zero when the tree was rebuilt.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RootUpdate{
    /// Visits of the promoted child before promotion.
    pub reused_visits: u32,
    /// Visits of the former root divided by its number of children.
    pub avg_sibling_visits: f64
}

/// Statistics of one root child.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChildStats{
    pub mov: Coord,
    pub visits: u32,
    pub value_sum: i64
}

/// Moves worth expanding from `state`: the grid centre on an empty board,
/// the tactical candidates otherwise.
fn expansion_moves(state: &GameState) -> BTreeSet<Coord>{
    if state.history().is_empty() {
        BTreeSet::from([state.center()])
    }
    else{
        state.tactical_candidates(false)
    }
}

/// The search agent.
///
/// The agent mirrors the real game: feed it every move actually played with
/// `update_root`, and ask for a move with `search`, which also advances the
/// root to the move it recommends.
pub struct SearchAgent{
    root: SearchNodeRef,
    config: SearchConfig,
    rng: StdRng
}

impl SearchAgent{
    /// Creates an agent rooted at `state` with the default configuration and
    /// the given iteration budget.
    pub fn new(state: GameState, iterations: usize) -> Result<Self, SearchError>{
        SearchAgent::with_config(state, SearchConfig { iterations, ..SearchConfig::DEFAULT })
    }

    /// Creates an agent rooted at `state` with a custom configuration.
    ///
    /// # Errors
    /// `SearchError::InvalidConfig` if `config` does not validate.
    pub fn with_config(state: GameState, config: SearchConfig) -> Result<Self, SearchError>{
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng()
        };

        Ok(SearchAgent {
            root: Node::new_root(SearchNodeData::new(state, None)),
            config,
            rng
        })
    }

    #[inline]
    pub fn config(&self) -> &SearchConfig{
        &self.config
    }

    /// Copy of the position at the root.
    pub fn root_state(&self) -> GameState{
        self.root.borrow().get().state.clone()
    }

    #[inline]
    pub fn root_visits(&self) -> u32{
        self.root.borrow().get().visits
    }

    #[inline]
    pub fn root_value_sum(&self) -> i64{
        self.root.borrow().get().value_sum
    }

    /// Statistics of every root child, in creation order: the expansion moves
    /// in coordinate order, then any moves added by the wide expansion.
    pub fn root_children(&self) -> Vec<ChildStats>{
        self.root.borrow().children().iter()
            .filter_map(|child| {
                let child = child.borrow();
                let data = child.get();
                data.move_from_parent.map(|mov| ChildStats { mov, visits: data.visits, value_sum: data.value_sum })
            })
            .collect()
    }

    /// Descends from the root to a leaf.
    ///
    /// Unvisited children are sampled uniformly first; once all children have
    /// been visited the highest selection score wins, ties to the first child.
    /// Shallow nodes are widened on the way down when `wide_expansion` is set.
    fn selection(&mut self) -> Result<SearchNodeRef, SearchError>{
        let mut node = Rc::clone(&self.root);
        let mut depth = 0;

        loop {
            if let Some(radius) = self.widening_radius(&node, depth) {
                self.widen(&node, radius)?;
            }

            let next = {
                let current = node.borrow();
                if !current.has_children() {
                    break;
                }

                let children = current.children();
                let unvisited: Vec<&SearchNodeRef> = children.iter()
                    .filter(|child| child.borrow().get().visits == 0)
                    .collect();

                match pick_uniform(&unvisited, &mut self.rng) {
                    Some(child) => Rc::clone(child),
                    None => {
                        let parent_visits = current.get().visits as f64;
                        let coef = self.config.exploration_coef;
                        let index = argmax_first(children, |child| {
                            child.borrow().get().selection_score(parent_visits, coef)
                        }).unwrap_or(0);

                        Rc::clone(&children[index])
                    }
                }
            };

            node = next;
            depth += 1;
        }

        Ok(node)
    }

    /// Radius to widen `node` with, if it qualifies at `depth` plies below the root.
    fn widening_radius(&self, node: &SearchNodeRef, depth: usize) -> Option<usize>{
        let wide = self.config.wide_expansion?;
        if depth > wide.max_depth {
            return None;
        }

        let node = node.borrow();
        let root_stones = self.root.borrow().get().state.stone_count();
        (node.has_children() && !node.get().widened && root_stones >= wide.min_stones).then_some(wide.radius)
    }

    /// Appends a child for every wider tactical candidate `node` lacks and marks it widened.
    fn widen(&mut self, node: &SearchNodeRef, radius: usize) -> Result<(), SearchError>{
        let (state, existing) = {
            let node = node.borrow();
            let existing: BTreeSet<Coord> = node.children().iter()
                .filter_map(|child| child.borrow().get().move_from_parent)
                .collect();
            (node.get().state.clone(), existing)
        };

        let mut added = 0;
        for mov in state.tactical_candidates_within(radius, false) {
            if existing.contains(&mov) {
                continue;
            }

            let mut next = state.clone();
            next.play(mov)?;
            Node::add_child(node, SearchNodeData::new(next, Some(mov)));
            added += 1;
        }

        node.borrow_mut().get_mut().widened = true;
        trace!(radius, added, stones = state.stone_count(), "node widened");
        Ok(())
    }

    /// Creates one child per expansion move and returns the first one.
    fn expansion(&mut self, node: &SearchNodeRef) -> Result<SearchNodeRef, SearchError>{
        let state = node.borrow().get().state.clone();
        let mut first: Option<SearchNodeRef> = None;

        for mov in expansion_moves(&state) {
            let mut next = state.clone();
            next.play(mov)?;

            let child = Node::add_child(node, SearchNodeData::new(next, Some(mov)));
            if first.is_none() {
                first = Some(child);
            }
        }

        first.ok_or(SearchError::EmptyCandidateSet { moves_played: state.stone_count() })
    }

    /// Plays random moves from `node` to the end of the game.
    ///
    /// # Returns
    /// The outcome from the point of view of the node's mover.
    fn simulation(&mut self, node: &SearchNodeRef) -> Result<i64, SearchError>{
        let (mut state, mover) = {
            let node = node.borrow();
            (node.get().state.clone(), node.get().mover)
        };
        let root_stones = self.root.borrow().get().state.stone_count();

        while !state.result().is_terminal() {
            let plies = state.stone_count() - root_stones;
            let moves: Vec<Coord> = if plies <= self.config.rollout_tactical_plies {
                state.tactical_candidates(false).into_iter().collect()
            }
            else{
                state.adjacent_vacancies().into_iter().collect()
            };

            let Some(mov) = pick_uniform(&moves, &mut self.rng) else {
                return Err(SearchError::EmptyCandidateSet { moves_played: state.stone_count() });
            };
            state.play(mov)?;
        }

        Ok(state.result().value_for(mover))
    }

    /// Adds `value` to every node from `node` up to, but excluding, the root,
    /// flipping its sign at each level, then counts one visit on the root.
    fn backpropagation(&mut self, node: &SearchNodeRef, value: i64){
        let mut value = value;
        let mut current = Rc::clone(node);

        loop {
            let parent = {
                let mut node = current.borrow_mut();
                if node.is_root() {
                    break;
                }
                node.get_mut().add_value(value);
                node.get_parent()
            };

            value = -value;
            match parent {
                Some(parent) => current = parent,
                None => break
            }
        }

        self.root.borrow_mut().get_mut().visits += 1;
    }

    /// Performs one full iteration: selection, expansion, simulation and backpropagation.
    fn iterate(&mut self) -> Result<(), SearchError>{
        let mut node = self.selection()?;

        let (outcome, mover, expandable) = {
            let leaf = node.borrow();
            let data = leaf.get();
            (data.state.result(), data.mover, data.visits != 0 || leaf.is_root())
        };

        let value = if outcome.is_terminal() {
            outcome.value_for(mover)
        }
        else{
            if expandable {
                node = self.expansion(&node)?;
            }
            self.simulation(&node)?
        };

        self.backpropagation(&node, value);
        Ok(())
    }

    fn early_stop_reached(&self) -> bool{
        self.config.early_stop_visits.is_some_and(|cap| {
            self.root.borrow().children().iter().any(|child| child.borrow().get().visits > cap)
        })
    }

    /// Runs the configured number of iterations and recommends a move.
    ///
    /// The root child with the best win rate is returned (ties to the lowest
    /// move) and becomes the new root, keeping its statistics for the next call.
    ///
    /// # Errors
    /// - `SearchError::TerminalState` if the root position is decided.
    /// - `SearchError::EmptyCandidateSet` if a live position has no candidate.
    pub fn search(&mut self) -> Result<SearchResult, SearchError>{
        let (outcome, moves_played) = {
            let root = self.root.borrow();
            (root.get().state.result(), root.get().state.stone_count())
        };
        if outcome.is_terminal() {
            return Err(SearchError::TerminalState(outcome));
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            self.root.borrow().get().state.tactical_candidates(true);
        }

        let started = Instant::now();
        let deadline = self.config.time_limit_ms.map(|ms| started + Duration::from_millis(ms));

        let mut iterations = 0;
        while iterations < self.config.iterations {
            if iterations > 0 && (deadline.is_some_and(|deadline| Instant::now() >= deadline) || self.early_stop_reached()) {
                break;
            }

            self.iterate()?;
            iterations += 1;
            trace!(iteration = iterations, root_visits = self.root_visits(), "iteration done");
        }

        let best = {
            let root = self.root.borrow();
            let visited: Vec<&SearchNodeRef> = root.children().iter()
                .filter(|child| child.borrow().get().visits > 0)
                .collect();

            let choice = argmax_first(&visited, |child| child.borrow().get().win_rate()).map(|index| Rc::clone(visited[index]));
            choice
        };
        let best = best.ok_or(SearchError::EmptyCandidateSet { moves_played })?;

        let (mov, win_rate, root_visits) = {
            let node = best.borrow();
            let data = node.get();
            let mov = data.move_from_parent.ok_or(SearchError::EmptyCandidateSet { moves_played })?;
            (mov, data.win_rate(), data.visits)
        };

        promote(&best);
        self.root = best;

        debug!(
            %mov,
            win_rate,
            iterations,
            root_visits,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "search finished"
        );

        Ok(SearchResult { mov, win_rate, iterations, root_visits })
    }

    /// Advances the root past a move played outside the agent.
    ///
    /// An explored move promotes the matching child and keeps its subtree;
    /// otherwise the tree is rebuilt from the root position plus `mov`.
    ///
    /// # Errors
    /// `SearchError::Game` if `mov` is illegal; the tree is left unchanged.
    pub fn update_root(&mut self, mov: Coord) -> Result<RootUpdate, SearchError>{
        let found = {
            let root = self.root.borrow();
            let matching = root.children().iter()
                .find(|child| child.borrow().get().move_from_parent == Some(mov))
                .map(|child| (Rc::clone(child), root.get().visits, root.children().len()));
            matching
        };

        if let Some((child, parent_visits, children_count)) = found {
            promote(&child);

            let update = RootUpdate {
                reused_visits: child.borrow().get().visits,
                avg_sibling_visits: parent_visits as f64 / children_count as f64
            };
            self.root = child;

            debug!(%mov, reused_visits = update.reused_visits, avg_sibling_visits = update.avg_sibling_visits, "root reused");
            return Ok(update);
        }

        let mut state = self.root_state();
        state.play(mov)?;
        self.root = Node::new_root(SearchNodeData::new(state, Some(mov)));

        debug!(%mov, "root rebuilt");
        Ok(RootUpdate::default())
    }
}
