use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use log::{debug, trace};

use crate::board::{Board, Color};
use crate::evaluate::{eval, is_draw_position};
use crate::move_generator::generate_moves;
use crate::moves::{Move, MoveList};

/// Fixed search depth in plies; the tree is exhaustive, no pruning.
pub const SEARCH_DEPTH: u8 = 4;

/// Mate magnitude stays far above any material sum. The node level is
/// subtracted so that nearer mates win over deeper ones.
const MATE_SCORE: f32 = 1e5;

pub const EVAL_FLAG_MATE: u8 = 1;
pub const EVAL_FLAG_STALEMATE: u8 = 2;
pub const EVAL_FLAG_DRAW: u8 = 4;

/// One node of the search tree. Strictly owned by its parent; the whole tree
/// is dropped as soon as the best root move is extracted.
#[derive(Debug, Default)]
struct Node {
    children: Vec<Node>,
    score: f32,
    level: u8,
    /// Index into the parent's pseudo-legal move list.
    move_index: u8,
    flags: u8,
}

/// Builds the legal subtree under `parent`. Leaves get a material eval
/// immediately, interior nodes are scored 0 pending minimax backup. A node
/// with no surviving legal child is terminal: mate if the side to move is in
/// check, stalemate otherwise.
fn generate_move_tree(board: &Board, parent: &mut Node, depth_limit: u8, stop: &AtomicBool) {
    if stop.load(Ordering::Relaxed) {
        return;
    }

    if is_draw_position(board) {
        parent.flags = EVAL_FLAG_DRAW;
        parent.score = 0.0;
        return;
    }

    let mut moves = MoveList::new();
    generate_moves(board, board.side_to_move, &mut moves);

    let depth = parent.level + 1;
    let leaf = depth >= depth_limit;

    for (move_index, m) in moves.iter().enumerate() {
        let mut next = board.clone();
        if !next.apply_move(*m) {
            continue;
        }

        let mut node = Node {
            children: Vec::new(),
            score: if leaf { eval(&next) } else { 0.0 },
            level: depth,
            move_index: move_index as u8,
            flags: 0,
        };
        if !leaf {
            generate_move_tree(&next, &mut node, depth_limit, stop);
        }
        parent.children.push(node);
    }

    if parent.children.is_empty() && !stop.load(Ordering::Relaxed) {
        if board.is_in_check(board.side_to_move) {
            parent.flags |= EVAL_FLAG_MATE;
            let magnitude = MATE_SCORE - parent.level as f32;
            parent.score = match board.side_to_move {
                Color::White => -magnitude,
                Color::Black => magnitude,
            };
        } else {
            parent.flags |= EVAL_FLAG_STALEMATE;
            parent.score = 0.0;
        }
    }
}

/// Postorder minimax backup: white-to-move nodes take the max over children,
/// black-to-move nodes the min, alternating strictly by depth.
fn calc_minmax_score(node: &mut Node, side_to_move: Color) -> f32 {
    if node.children.is_empty() {
        return node.score;
    }

    let maximize = side_to_move == Color::White;
    let mut result = if maximize { f32::NEG_INFINITY } else { f32::INFINITY };
    for child in node.children.iter_mut() {
        let score = calc_minmax_score(child, side_to_move.opposite());
        result = if maximize {
            result.max(score)
        } else {
            result.min(score)
        };
    }

    node.score = result;
    result
}

fn search_best_move(board: &Board, depth: u8, stop: &AtomicBool) -> Option<Move> {
    let mut root = Node::default();
    generate_move_tree(board, &mut root, depth, stop);
    calc_minmax_score(&mut root, board.side_to_move);

    if root.children.is_empty() {
        // Mate, stalemate or a dead draw at the root; there is nothing to play.
        return None;
    }

    // Ties resolve to the first child in generation order, which keeps the
    // result reproducible.
    let maximize = board.side_to_move == Color::White;
    let mut best = &root.children[0];
    for child in &root.children[1..] {
        if (maximize && child.score > best.score) || (!maximize && child.score < best.score) {
            best = child;
        }
    }

    let mut moves = MoveList::new();
    generate_moves(board, board.side_to_move, &mut moves);
    let chosen = moves[best.move_index as usize];

    debug!(
        "search depth {depth}: best move {} score {}",
        chosen.long_algebraic_notation(),
        best.score
    );

    Some(chosen)
}

/// Move-selection driver. Idle between searches; `find_best_move` runs one
/// search on a background task and blocks until it finishes. The task owns a
/// snapshot of the position, nothing is shared but the stop flag.
pub struct Analyzer {
    board: Board,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Option<Move>>>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Analyzer {
        Analyzer {
            board: Board::starting_position(),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn start_new_game(&mut self) {
        assert!(self.worker.is_none(), "analyzer must be stopped before starting a new game");
        self.board = Board::starting_position();
    }

    /// Contract: only valid while no search is running.
    pub fn set_initial_position(&mut self, board: Board) {
        assert!(self.worker.is_none(), "cannot change the position while a search is running");
        self.board = board;
    }

    /// Cooperative cancellation; the flag is checked at every node visit. A
    /// stopped search still reports whatever partial result the tree walk
    /// produced, callers discard it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.join_worker();
    }

    /// Runs one fixed-depth search to completion and returns the chosen root
    /// move, or None when the side to move has no legal move. Blocks the
    /// caller; the analyzer is idle again once this returns.
    pub fn find_best_move(&mut self) -> Option<Move> {
        assert!(self.worker.is_none(), "a search is already running");

        let board = self.board.clone();
        let stop = Arc::clone(&self.stop);
        let worker = thread::Builder::new()
            .name("analyzer".to_string())
            .spawn(move || {
                trace!("analyzer task started");
                search_best_move(&board, SEARCH_DEPTH, &stop)
            })
            .expect("failed to spawn the analyzer thread");
        self.worker = Some(worker);

        self.join_worker()
    }

    fn join_worker(&mut self) -> Option<Move> {
        let result = match self.worker.take() {
            Some(worker) => worker.join().expect("analyzer thread panicked"),
            None => None,
        };
        self.stop.store(false, Ordering::Relaxed);
        result
    }
}

impl Drop for Analyzer {
    fn drop(&mut self) {
        self.stop();
    }
}
