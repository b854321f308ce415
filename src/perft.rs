use std::time::Instant;

use log::info;
use num_format::{Locale, ToFormattedString};

use crate::{
    board::{Board, PIECE_KING, PIECE_PAWN, file_of},
    move_generator::generate_moves,
    moves::{Move, MoveList},
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PerftResults {
    pub nodes: u64,
    pub captures: u64,
    pub castles: u64,
    pub en_passant: u64,
}

impl Board {
    pub fn run_perft(&self, depth: u8, divide: bool) -> PerftResults {
        let mut results = PerftResults::default();

        let start_time = Instant::now();
        do_perft(depth, 1, self, &mut results, divide);
        let elapsed = start_time.elapsed();

        if divide {
            println!("\n{}", results.nodes);
        }

        let nps = results.nodes as f64 / elapsed.as_secs_f64();
        info!(
            "depth {depth} in {elapsed:#?}. Nodes: {}. Nodes per second: {}",
            results.nodes.to_formatted_string(&Locale::en),
            (nps as u64).to_formatted_string(&Locale::en)
        );
        info!("{:?}", results);

        results
    }
}

// Counts referenced from https://www.chessprogramming.org/Perft_Results
fn do_perft(draft: u8, ply: u8, board: &Board, results: &mut PerftResults, divide: bool) {
    if draft == 0 {
        results.nodes += 1;
        return;
    }

    let mut moves = MoveList::new();
    generate_moves(board, board.side_to_move, &mut moves);

    for m in moves {
        let mut next = board.clone();
        if !next.apply_move(m) {
            continue;
        }

        tally_move(&m, board, results);

        let start_nodes = results.nodes;
        do_perft(draft - 1, ply + 1, &next, results, divide);

        if divide && ply == 1 {
            println!("{} {}", m.long_algebraic_notation(), results.nodes - start_nodes);
        }
    }
}

/// Classifies an applied move against the position it was played from.
/// Captures, castles and en passant are tallied at every ply, not only at
/// the horizon.
fn tally_move(m: &Move, board: &Board, results: &mut PerftResults) {
    let mover = board.piece_at(m.from());

    if mover.piece_type() == PIECE_KING && file_of(m.from()) == 4 {
        let to_file = file_of(m.to());
        if to_file == 6 || to_file == 2 {
            results.castles += 1;
            return;
        }
    }

    if m.is_capture() {
        results.captures += 1;
        if mover.piece_type() == PIECE_PAWN && board.piece_at(m.to()).is_empty() {
            results.en_passant += 1;
        }
    }
}

#[cfg(test)]
mod perft_tests {
    use super::*;

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn perft_nodes(fen: &str, depth: u8) -> u64 {
        let board = Board::from_fen(fen).unwrap();
        board.run_perft(depth, false).nodes
    }

    #[test]
    fn starting_position_node_counts() {
        let board = Board::starting_position();
        assert_eq!(board.run_perft(1, false).nodes, 20);
        assert_eq!(board.run_perft(2, false).nodes, 400);
        assert_eq!(board.run_perft(3, false).nodes, 8_902);
        assert_eq!(board.run_perft(4, false).nodes, 197_281);
    }

    #[test]
    fn kiwipete_node_counts() {
        assert_eq!(perft_nodes(KIWIPETE, 1), 48);
        assert_eq!(perft_nodes(KIWIPETE, 2), 2_039);
        assert_eq!(perft_nodes(KIWIPETE, 3), 97_862);
    }

    #[test]
    fn endgame_position_node_counts() {
        let fen = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";
        assert_eq!(perft_nodes(fen, 1), 14);
        assert_eq!(perft_nodes(fen, 2), 191);
        assert_eq!(perft_nodes(fen, 3), 2_812);
        assert_eq!(perft_nodes(fen, 4), 43_238);
    }

    #[test]
    fn promotion_heavy_position_node_counts() {
        let fen = "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8";
        assert_eq!(perft_nodes(fen, 1), 44);
        assert_eq!(perft_nodes(fen, 2), 1_486);
        assert_eq!(perft_nodes(fen, 3), 62_379);
    }

    #[test]
    fn kiwipete_depth_one_classifies_moves() {
        let board = Board::from_fen(KIWIPETE).unwrap();
        let results = board.run_perft(1, false);
        assert_eq!(results.nodes, 48);
        assert_eq!(results.captures, 8);
        assert_eq!(results.castles, 2);
        assert_eq!(results.en_passant, 0);
    }

    #[test]
    fn en_passant_capture_is_counted() {
        let board = Board::from_fen("8/8/8/3pP3/8/8/8/k6K w - d6 0 1").unwrap();
        let results = board.run_perft(1, false);
        assert_eq!(results.en_passant, 1);
    }
}
