use std::process::exit;

use log::{debug, error, trace};
use vampirc_uci::{UciMessage, UciMove, UciPiece, parse_with_unknown};

use crate::{
    board::{Board, PIECE_BISHOP, PIECE_KNIGHT, PIECE_NONE, PIECE_PAWN, PIECE_QUEEN, PIECE_ROOK},
    move_generator::generate_moves,
    moves::{Move, MoveList},
    search::Analyzer,
};

#[derive(Default)]
pub struct UciInterface {
    analyzer: Analyzer,
}

impl UciInterface {
    pub fn process_command(&mut self, cmd: &str) {
        debug!("Received UCI cmd string '{cmd}'");
        let messages = parse_with_unknown(cmd);
        for m in messages {
            match m {
                UciMessage::Uci => {
                    println!("id name OkapiChess");
                    println!("id author the okapi-chess authors");
                    println!("uciok");
                }
                UciMessage::IsReady => {
                    println!("readyok")
                }
                UciMessage::UciNewGame => {
                    self.analyzer.stop();
                    self.analyzer.start_new_game();
                }
                UciMessage::Position { startpos, fen, moves } => {
                    let mut board = if startpos {
                        Some(Board::starting_position())
                    } else if let Some(fen) = fen {
                        match Board::from_fen(&fen.0) {
                            Ok(b) => Some(b),
                            Err(err) => {
                                error!("Failed to parse FEN from UCI. Error: {err}. FEN: {}", fen.0);
                                None
                            }
                        }
                    } else {
                        None
                    };

                    if let Some(board) = board.as_mut() {
                        if !moves.is_empty() {
                            debug!("running {} moves", moves.len());
                            replay_moves(board, &moves);
                        }
                        self.analyzer.set_initial_position(board.clone());
                    }

                    trace!("At end of position. {:#?}", self.analyzer.board());
                }
                UciMessage::Go { .. } => {
                    trace!("At start of go. {:#?}", self.analyzer.board());
                    match self.analyzer.find_best_move() {
                        Some(m) => println!("bestmove {}", m.long_algebraic_notation()),
                        None => println!("bestmove 0000"),
                    }
                }
                UciMessage::Stop => {
                    self.analyzer.stop();
                }
                UciMessage::Quit => exit(0),
                UciMessage::Unknown(message, err) => {
                    if !self.process_nonstandard_command(&message) {
                        error!("Unknown UCI cmd in '{message}'. Parsing error: {err:?}")
                    }
                }
                _ => {
                    error!("Unhandled UCI cmd in '{cmd}'")
                }
            }
        }
    }

    /// Debugging commands outside the UCI protocol: `perft <depth>` and
    /// `perftd <depth>` walk the move tree from the current position, `d`
    /// dumps the board.
    fn process_nonstandard_command(&mut self, cmd: &str) -> bool {
        let mut tokens = cmd.split_whitespace();
        match tokens.next() {
            Some(keyword @ ("perft" | "perftd")) => {
                let Some(depth) = tokens.next().and_then(|d| d.parse::<u8>().ok()) else {
                    error!("'{cmd}' needs a numeric depth");
                    return true;
                };
                let divide = keyword == "perftd";
                for d in 1..=depth {
                    let results = self.analyzer.board().run_perft(d, divide && d == depth);
                    println!(
                        "depth {d}: {} nodes, {} captures, {} castles, {} en passant",
                        results.nodes, results.captures, results.castles, results.en_passant
                    );
                }
                true
            }
            Some("d") => {
                println!("{:?}", self.analyzer.board());
                println!("Fen: {}", self.analyzer.board().to_fen());
                true
            }
            _ => false,
        }
    }
}

/// Applies a sequence of wire moves to the board. Replaying an illegal move
/// means the GUI and the engine disagree about the game, which is not
/// recoverable.
fn replay_moves(board: &mut Board, moves: &[UciMove]) {
    for uci_move in moves {
        let m = convert_uci_move(board, uci_move);

        // The wire move must exist in the position's pseudo-legal list;
        // apply_move performs whatever it is handed and only rejects
        // self-check.
        let mut candidates = MoveList::new();
        generate_moves(board, board.side_to_move, &mut candidates);
        let candidate = candidates
            .iter()
            .copied()
            .find(|c| c.from() == m.from() && c.to() == m.to() && c.promotion() == m.promotion());

        let legal = match candidate {
            Some(candidate) => board.apply_move(candidate),
            None => false,
        };
        if !legal {
            error!("Illegal move '{uci_move}' in position {}", board.to_fen());
            panic!("illegal move from UCI position command")
        }
    }
}

/// Translates a wire move into the packed representation, recovering the
/// capture flag from the board.
fn convert_uci_move(board: &Board, m: &UciMove) -> Move {
    let from = (m.from.file as u8) - b'a' + ((m.from.rank - 1) * 8);
    let to = (m.to.file as u8) - b'a' + ((m.to.rank - 1) * 8);

    let promotion = match m.promotion {
        None => PIECE_NONE,
        Some(UciPiece::Knight) => PIECE_KNIGHT,
        Some(UciPiece::Bishop) => PIECE_BISHOP,
        Some(UciPiece::Rook) => PIECE_ROOK,
        Some(UciPiece::Queen) => PIECE_QUEEN,
        Some(other) => {
            error!("Unexpected promotion value '{other:?}'");
            panic!("Unexpected promotion value")
        }
    };

    let mover = board.piece_at(from);
    let capture = board.is_enemy_piece(to, board.side_to_move)
        || (mover.piece_type() == PIECE_PAWN && board.en_passant_square == Some(to));

    Move::new(from, to, capture, promotion)
}

#[cfg(test)]
mod uci_tests {
    use super::*;
    use vampirc_uci::parse_one;

    fn moves_of(cmd: &str) -> Vec<UciMove> {
        match parse_one(cmd) {
            UciMessage::Position { moves, .. } => moves,
            other => panic!("expected a position message, got {other:?}"),
        }
    }

    #[test]
    fn replays_an_opening_line() {
        let mut board = Board::starting_position();
        let moves = moves_of("position startpos moves e2e4 e7e5 g1f3\n");
        replay_moves(&mut board, &moves);
        assert_eq!(
            board.to_fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 0 1"
        );
    }

    #[test]
    fn recovers_the_capture_flag_from_the_board() {
        let mut board = Board::starting_position();
        let moves = moves_of("position startpos moves e2e4 d7d5 e4d5\n");
        replay_moves(&mut board, &moves);
        assert_eq!(board.to_fen(), "rnbqkbnr/ppp1pppp/8/3P4/8/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1");
    }

    #[test]
    fn marks_an_en_passant_reply_as_a_capture() {
        let mut board = Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let moves = moves_of("position fen 4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1 moves e5d6\n");
        let m = convert_uci_move(&board, &moves[0]);
        assert!(m.is_capture());
        replay_moves(&mut board, &moves);
        assert_eq!(board.to_fen(), "4k3/8/3P4/8/8/8/8/4K3 b - - 0 1");
    }

    #[test]
    fn converts_a_promotion_suffix() {
        let board = Board::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let moves = moves_of("position fen 4k3/P7/8/8/8/8/8/4K3 w - - 0 1 moves a7a8q\n");
        let m = convert_uci_move(&board, &moves[0]);
        assert_eq!(m.promotion(), PIECE_QUEEN);
        assert_eq!(m.long_algebraic_notation(), "a7a8q");
    }

    #[test]
    #[should_panic(expected = "illegal move")]
    fn replaying_an_illegal_move_panics() {
        let mut board = Board::starting_position();
        let moves = moves_of("position startpos moves e2e5\n");
        replay_moves(&mut board, &moves);
    }

    #[test]
    #[should_panic(expected = "illegal move")]
    fn replaying_a_castle_without_rights_panics() {
        // Not in the pseudo-legal list; must not reach the rook-relocation
        // bookkeeping in apply_move.
        let mut board = Board::from_fen("4k3/8/8/8/8/8/8/4K2R w - - 0 1").unwrap();
        let moves = moves_of("position fen 4k3/8/8/8/8/8/8/4K2R w - - 0 1 moves e1g1\n");
        replay_moves(&mut board, &moves);
    }
}
