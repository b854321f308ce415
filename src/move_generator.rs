use crate::board::{
    BLACK_KING_START, BLACK_KINGSIDE_ROOK_START, BLACK_QUEENSIDE_ROOK_START, Board,
    CASTLE_BLACK_KING, CASTLE_BLACK_QUEEN, CASTLE_WHITE_KING, CASTLE_WHITE_QUEEN, Color,
    PIECE_BISHOP, PIECE_KING, PIECE_KNIGHT, PIECE_NONE, PIECE_PAWN, PIECE_QUEEN, PIECE_ROOK, Piece,
    WHITE_KING_START, WHITE_KINGSIDE_ROOK_START, WHITE_QUEENSIDE_ROOK_START, file_of,
    is_valid_square, rank_of, to_square,
};
use crate::moves::{Move, MoveList};

const KNIGHT_MOVES: [[i8; 2]; 8] = [
    [-2, -1],
    [-2, 1],
    [-1, -2],
    [-1, 2],
    [1, -2],
    [1, 2],
    [2, -1],
    [2, 1],
];

const BISHOP_VECTORS: [[i8; 2]; 4] = [[-1, -1], [-1, 1], [1, -1], [1, 1]];

const ROOK_VECTORS: [[i8; 2]; 4] = [[-1, 0], [0, -1], [1, 0], [0, 1]];

const KING_OFFSETS: [[i8; 2]; 8] = [
    [-1, -1],
    [-1, 0],
    [-1, 1],
    [0, -1],
    [0, 1],
    [1, -1],
    [1, 0],
    [1, 1],
];

const PROMOTION_PIECES: [u8; 4] = [PIECE_QUEEN, PIECE_ROOK, PIECE_BISHOP, PIECE_KNIGHT];

/// Generates all pseudo-legal moves for `side`. Moves that would leave the
/// moving side's own king in check are included; legality is enforced at
/// application time by `Board::apply_move`. Generation order is fixed
/// (square-major, then per-piece order) so that search tie-breaking is
/// deterministic.
pub fn generate_moves(board: &Board, side: Color, moves: &mut MoveList) {
    for square in 0..64u8 {
        let piece = board.piece_at(square);
        if piece.is_empty() || piece.color() != side {
            continue;
        }

        match piece.piece_type() {
            PIECE_PAWN => generate_pawn_moves(board, square, moves),
            PIECE_KNIGHT => generate_knight_moves(board, square, moves),
            PIECE_BISHOP => generate_sliding_moves(board, square, &BISHOP_VECTORS, moves),
            PIECE_ROOK => generate_sliding_moves(board, square, &ROOK_VECTORS, moves),
            PIECE_QUEEN => {
                generate_sliding_moves(board, square, &ROOK_VECTORS, moves);
                generate_sliding_moves(board, square, &BISHOP_VECTORS, moves);
            }
            PIECE_KING => generate_king_moves(board, square, moves),
            _ => unreachable!("invalid piece type on square {square}"),
        }
    }

    generate_castling_moves(board, side, moves);
}

fn generate_pawn_moves(board: &Board, square: u8, moves: &mut MoveList) {
    let side = board.piece_at(square).color();
    let rank = rank_of(square) as i8;
    let file = file_of(square) as i8;

    let advance: i8 = if side == Color::White { 1 } else { -1 };
    let target_rank = rank + advance;
    let promotion_rank: i8 = if side == Color::White { 7 } else { 0 };

    // Single push, fanning out into four promotions on the last rank
    if is_valid_square(target_rank, file) && board.is_empty_square(target_rank, file) {
        let to = to_square(target_rank as u8, file as u8);
        if target_rank == promotion_rank {
            for promotion in PROMOTION_PIECES {
                moves.push(Move::new(square, to, false, promotion));
            }
        } else {
            moves.push(Move::quiet(square, to));
        }
    }

    // Double push from the starting rank, both squares must be empty
    let on_start_rank = (side == Color::White && rank == 1) || (side == Color::Black && rank == 6);
    if on_start_rank
        && board.is_empty_square(target_rank, file)
        && board.is_empty_square(rank + advance * 2, file)
    {
        moves.push(Move::quiet(square, to_square((rank + advance * 2) as u8, file as u8)));
    }

    // Diagonal captures
    for capture_file in [file - 1, file + 1] {
        if is_valid_square(target_rank, capture_file)
            && board.is_enemy_piece(to_square(target_rank as u8, capture_file as u8), side)
        {
            let to = to_square(target_rank as u8, capture_file as u8);
            if target_rank == promotion_rank {
                for promotion in PROMOTION_PIECES {
                    moves.push(Move::new(square, to, true, promotion));
                }
            } else {
                moves.push(Move::new(square, to, true, PIECE_NONE));
            }
        }
    }

    // En passant: the capturing pawn must sit beside the skipped square
    if let Some(ep_square) = board.en_passant_square {
        let ep_rank = rank_of(ep_square) as i8;
        let ep_file = file_of(ep_square) as i8;

        if rank == ep_rank - advance && (file - 1 == ep_file || file + 1 == ep_file) {
            moves.push(Move::new(square, ep_square, true, PIECE_NONE));
        }
    }
}

fn generate_knight_moves(board: &Board, square: u8, moves: &mut MoveList) {
    let side = board.piece_at(square).color();
    let rank = rank_of(square) as i8;
    let file = file_of(square) as i8;

    for offset in KNIGHT_MOVES {
        let target_rank = rank + offset[0];
        let target_file = file + offset[1];

        if !is_valid_square(target_rank, target_file) {
            continue;
        }

        let to = to_square(target_rank as u8, target_file as u8);
        if board.is_enemy_piece(to, side) {
            moves.push(Move::new(square, to, true, PIECE_NONE));
        } else if board.piece_at(to).is_empty() {
            moves.push(Move::quiet(square, to));
        }
    }
}

fn generate_sliding_moves(board: &Board, square: u8, vectors: &[[i8; 2]; 4], moves: &mut MoveList) {
    let side = board.piece_at(square).color();
    let rank = rank_of(square) as i8;
    let file = file_of(square) as i8;

    for vector in vectors {
        for step in 1..8 {
            let target_rank = rank + step * vector[0];
            let target_file = file + step * vector[1];

            if !is_valid_square(target_rank, target_file) {
                break;
            }

            let to = to_square(target_rank as u8, target_file as u8);
            let target = board.piece_at(to);
            if target.is_empty() {
                moves.push(Move::quiet(square, to));
            } else {
                if target.color() != side {
                    moves.push(Move::new(square, to, true, PIECE_NONE));
                }
                break;
            }
        }
    }
}

fn generate_king_moves(board: &Board, square: u8, moves: &mut MoveList) {
    let side = board.piece_at(square).color();
    let rank = rank_of(square) as i8;
    let file = file_of(square) as i8;

    // Diagonal steps first, then straight, matching the fixed generation order
    for offset in BISHOP_VECTORS.iter().chain(ROOK_VECTORS.iter()) {
        let target_rank = rank + offset[0];
        let target_file = file + offset[1];

        if !is_valid_square(target_rank, target_file) {
            continue;
        }

        let to = to_square(target_rank as u8, target_file as u8);
        let target = board.piece_at(to);
        if target.is_empty() || target.color() != side {
            moves.push(Move::new(square, to, !target.is_empty(), PIECE_NONE));
        }
    }
}

fn generate_castling_moves(board: &Board, side: Color, moves: &mut MoveList) {
    // The rook-presence check covers rights going stale when a rook is
    // captured on its origin square without ever moving.
    let (king_start, kingside_rook, queenside_rook, kingside_right, queenside_right, attacker) =
        match side {
            Color::White => (
                WHITE_KING_START,
                WHITE_KINGSIDE_ROOK_START,
                WHITE_QUEENSIDE_ROOK_START,
                CASTLE_WHITE_KING,
                CASTLE_WHITE_QUEEN,
                Color::Black,
            ),
            Color::Black => (
                BLACK_KING_START,
                BLACK_KINGSIDE_ROOK_START,
                BLACK_QUEENSIDE_ROOK_START,
                CASTLE_BLACK_KING,
                CASTLE_BLACK_QUEEN,
                Color::White,
            ),
        };

    let rank = rank_of(king_start) as i8;
    let rook = Piece::new(PIECE_ROOK, side);

    if board.castling_rights & kingside_right != 0 && board.piece_at(kingside_rook) == rook {
        // f and g files empty, e/f/g not attacked
        if board.is_empty_square(rank, 5)
            && board.is_empty_square(rank, 6)
            && !is_square_attacked(board, rank, 4, attacker)
            && !is_square_attacked(board, rank, 5, attacker)
            && !is_square_attacked(board, rank, 6, attacker)
        {
            moves.push(Move::quiet(king_start, to_square(rank as u8, 6)));
        }
    }

    if board.castling_rights & queenside_right != 0 && board.piece_at(queenside_rook) == rook {
        // b, c and d files empty, e/d/c not attacked
        if board.is_empty_square(rank, 1)
            && board.is_empty_square(rank, 2)
            && board.is_empty_square(rank, 3)
            && !is_square_attacked(board, rank, 4, attacker)
            && !is_square_attacked(board, rank, 3, attacker)
            && !is_square_attacked(board, rank, 2, attacker)
        {
            moves.push(Move::quiet(king_start, to_square(rank as u8, 2)));
        }
    }
}

/// Attack test for an arbitrary square, used by castling generation. Check
/// detection for a king goes through `Board::is_in_check` which uses the
/// cached king squares.
pub fn is_square_attacked(board: &Board, rank: i8, file: i8, attacking_side: Color) -> bool {
    let attacker_is = |rank: i8, file: i8, piece_type: u8| {
        if !is_valid_square(rank, file) {
            return false;
        }
        let piece = board.piece_on(rank as u8, file as u8);
        piece.piece_type() == piece_type && piece.color() == attacking_side
    };

    // Pawns attack against their direction of advance
    let pawn_advance: i8 = if attacking_side == Color::White { -1 } else { 1 };
    if attacker_is(rank + pawn_advance, file - 1, PIECE_PAWN)
        || attacker_is(rank + pawn_advance, file + 1, PIECE_PAWN)
    {
        return true;
    }

    for offset in KNIGHT_MOVES {
        if attacker_is(rank + offset[0], file + offset[1], PIECE_KNIGHT) {
            return true;
        }
    }

    for offset in KING_OFFSETS {
        if attacker_is(rank + offset[0], file + offset[1], PIECE_KING) {
            return true;
        }
    }

    // Sliding attacks, diagonal then straight
    for vector in BISHOP_VECTORS.iter().chain(ROOK_VECTORS.iter()) {
        let diagonal = vector[0] != 0 && vector[1] != 0;

        let mut target_rank = rank + vector[0];
        let mut target_file = file + vector[1];
        while is_valid_square(target_rank, target_file) {
            let piece = board.piece_on(target_rank as u8, target_file as u8);
            if !piece.is_empty() {
                if piece.color() == attacking_side
                    && (piece.piece_type() == PIECE_QUEEN
                        || (diagonal && piece.piece_type() == PIECE_BISHOP)
                        || (!diagonal && piece.piece_type() == PIECE_ROOK))
                {
                    return true;
                }
                break;
            }

            target_rank += vector[0];
            target_file += vector[1];
        }
    }

    false
}

impl Board {
    /// Single legality oracle: used by `apply_move` rejection and by castling
    /// transit checks. Requires exactly one king of `side` on the board.
    pub fn is_in_check(&self, side: Color) -> bool {
        let king_square = self.king_square(side);
        let enemy_king_square = self.king_square(side.opposite());

        let king_rank = rank_of(king_square) as i8;
        let king_file = file_of(king_square) as i8;

        // Adjacent enemy king: guards against illegal positions
        let enemy_king_rank = rank_of(enemy_king_square) as i8;
        let enemy_king_file = file_of(enemy_king_square) as i8;
        if (king_rank - enemy_king_rank).abs() <= 1 && (king_file - enemy_king_file).abs() <= 1 {
            return true;
        }

        for vector in ROOK_VECTORS {
            let mut target_rank = king_rank + vector[0];
            let mut target_file = king_file + vector[1];
            while is_valid_square(target_rank, target_file) {
                let piece = self.piece_on(target_rank as u8, target_file as u8);
                if !piece.is_empty() {
                    if piece.color() != side
                        && (piece.piece_type() == PIECE_ROOK || piece.piece_type() == PIECE_QUEEN)
                    {
                        return true;
                    }
                    break;
                }
                target_rank += vector[0];
                target_file += vector[1];
            }
        }

        for vector in BISHOP_VECTORS {
            let mut target_rank = king_rank + vector[0];
            let mut target_file = king_file + vector[1];
            while is_valid_square(target_rank, target_file) {
                let piece = self.piece_on(target_rank as u8, target_file as u8);
                if !piece.is_empty() {
                    if piece.color() != side
                        && (piece.piece_type() == PIECE_BISHOP || piece.piece_type() == PIECE_QUEEN)
                    {
                        return true;
                    }
                    break;
                }
                target_rank += vector[0];
                target_file += vector[1];
            }
        }

        let enemy_knight = Piece::new(PIECE_KNIGHT, side.opposite());
        for offset in KNIGHT_MOVES {
            let target_rank = king_rank + offset[0];
            let target_file = king_file + offset[1];
            if is_valid_square(target_rank, target_file)
                && self.piece_on(target_rank as u8, target_file as u8) == enemy_knight
            {
                return true;
            }
        }

        let enemy_pawn = Piece::new(PIECE_PAWN, side.opposite());
        let pawn_rank = if side == Color::White {
            king_rank + 1
        } else {
            king_rank - 1
        };
        for pawn_file in [king_file - 1, king_file + 1] {
            if is_valid_square(pawn_rank, pawn_file)
                && self.piece_on(pawn_rank as u8, pawn_file as u8) == enemy_pawn
            {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod move_generator_tests {
    use super::*;
    use crate::board::{STARTING_FEN, parse_square};

    fn moves_for(fen: &str) -> (Board, MoveList) {
        let board = Board::from_fen(fen).unwrap();
        let mut moves = MoveList::new();
        generate_moves(&board, board.side_to_move, &mut moves);
        (board, moves)
    }

    fn contains(moves: &MoveList, from: &str, to: &str) -> bool {
        let from = parse_square(from).unwrap();
        let to = parse_square(to).unwrap();
        moves.iter().any(|m| m.from() == from && m.to() == to)
    }

    #[test]
    fn starting_position_has_twenty_moves() {
        let (_, moves) = moves_for(STARTING_FEN);
        assert_eq!(moves.len(), 20);
    }

    #[test]
    fn maximum_known_move_count_fits_the_list() {
        // The position with the highest known number of legal moves.
        let (_, moves) = moves_for("R6R/3Q4/1Q4Q1/4Q3/2Q4Q/Q4Q2/pp1Q4/kBNN1KB1 w - - 0 1");
        assert_eq!(moves.len(), 218);
    }

    #[test]
    fn promotion_fans_out_into_four_moves() {
        let (_, moves) = moves_for("3r4/2P5/8/8/8/8/8/k3K3 w - - 0 1");

        let push_promotions = moves
            .iter()
            .filter(|m| contains_move(m, "c7", "c8"))
            .count();
        let capture_promotions = moves
            .iter()
            .filter(|m| contains_move(m, "c7", "d8"))
            .count();
        assert_eq!(push_promotions, 4);
        assert_eq!(capture_promotions, 4);

        fn contains_move(m: &Move, from: &str, to: &str) -> bool {
            m.from() == parse_square(from).unwrap() && m.to() == parse_square(to).unwrap()
        }
    }

    #[test]
    fn en_passant_capture_is_generated_for_adjacent_pawns() {
        let (_, moves) = moves_for("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1");
        assert!(contains(&moves, "e5", "d6"));

        // Same position without the en passant target
        let (_, moves) = moves_for("4k3/8/8/3pP3/8/8/8/4K3 w - - 0 1");
        assert!(!contains(&moves, "e5", "d6"));
    }

    #[test]
    fn double_push_requires_both_squares_empty() {
        let (_, moves) = moves_for("4k3/8/8/8/8/4n3/4P3/4K3 w - - 0 1");
        assert!(!contains(&moves, "e2", "e3"));
        assert!(!contains(&moves, "e2", "e4"));

        let (_, moves) = moves_for("4k3/8/8/8/4n3/8/4P3/4K3 w - - 0 1");
        assert!(contains(&moves, "e2", "e3"));
        assert!(!contains(&moves, "e2", "e4"));
    }

    #[test]
    fn castling_is_generated_when_all_preconditions_hold() {
        let (_, moves) = moves_for("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
        assert!(contains(&moves, "e1", "g1"));
        assert!(contains(&moves, "e1", "c1"));
    }

    #[test]
    fn castling_requires_the_rights_bit() {
        let (_, moves) = moves_for("r3k2r/8/8/8/8/8/8/R3K2R w Qkq - 0 1");
        assert!(!contains(&moves, "e1", "g1"));
        assert!(contains(&moves, "e1", "c1"));
    }

    #[test]
    fn castling_requires_the_rook_to_be_present() {
        // Rights claim KQ but the h1 rook is gone.
        let (_, moves) = moves_for("r3k2r/8/8/8/8/8/8/R3K3 w KQkq - 0 1");
        assert!(!contains(&moves, "e1", "g1"));
        assert!(contains(&moves, "e1", "c1"));
    }

    #[test]
    fn castling_requires_empty_intervening_squares() {
        let (_, moves) = moves_for("r3k2r/8/8/8/8/8/8/RN2K1NR w KQkq - 0 1");
        assert!(!contains(&moves, "e1", "g1"));
        assert!(!contains(&moves, "e1", "c1"));
    }

    #[test]
    fn castling_requires_unattacked_transit_squares() {
        // Black rook on f8 covers f1
        let (_, moves) = moves_for("5rk1/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(!contains(&moves, "e1", "g1"));
        assert!(contains(&moves, "e1", "c1"));

        // Black rook on d8 covers d1
        let (_, moves) = moves_for("3rk2r/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(contains(&moves, "e1", "g1"));
        assert!(!contains(&moves, "e1", "c1"));
    }

    #[test]
    fn castling_refused_while_in_check() {
        let (_, moves) = moves_for("4rk2/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(!contains(&moves, "e1", "g1"));
        assert!(!contains(&moves, "e1", "c1"));
    }

    #[test]
    fn queenside_b_file_may_be_attacked() {
        // b1 under attack does not prevent queenside castling, it is not on
        // the king's path.
        let (_, moves) = moves_for("1r2k3/8/8/8/8/8/8/R3K2R w KQ - 0 1");
        assert!(contains(&moves, "e1", "c1"));
    }

    #[test]
    fn check_detection_covers_all_attacker_types() {
        let in_check = [
            "4k3/8/8/8/8/8/4r3/4K3 w - - 0 1",  // rook
            "4k3/8/8/8/8/8/3q4/4K3 w - - 0 1",  // queen, diagonal
            "4k3/8/8/8/8/5n2/8/4K3 w - - 0 1",  // knight
            "4k3/8/8/8/8/8/3p4/4K3 w - - 0 1",  // pawn
            "8/8/8/8/8/8/4k3/4K3 w - - 0 1",    // adjacent kings
            "4k3/8/b7/8/8/8/8/5K2 w - - 0 1",   // bishop on the a6-f1 diagonal
        ];
        for fen in in_check {
            let board = Board::from_fen(fen).unwrap();
            assert!(board.is_in_check(Color::White), "expected check in {fen}");
        }

        let not_in_check = [
            STARTING_FEN,
            "4k3/8/8/8/8/8/4p3/4K3 w - - 0 1", // pawn directly ahead does not attack
            "4k3/8/8/8/8/4r3/4P3/4K3 w - - 0 1", // rook blocked by own pawn
        ];
        for fen in not_in_check {
            let board = Board::from_fen(fen).unwrap();
            assert!(!board.is_in_check(Color::White), "unexpected check in {fen}");
        }
    }

    /// Brute-force oracle: the king is attacked iff some opponent
    /// pseudo-legal capture targets its square.
    fn attacked_by_any_move(board: &Board, side: Color) -> bool {
        let king_square = board.king_square(side);
        let mut moves = MoveList::new();
        generate_moves(board, side.opposite(), &mut moves);
        moves.iter().any(|m| m.is_capture() && m.to() == king_square)
    }

    #[test]
    fn check_detection_agrees_with_brute_force() {
        // Walk every position reachable in two plies from the start.
        let root = Board::from_fen(STARTING_FEN).unwrap();
        let mut first_moves = MoveList::new();
        generate_moves(&root, root.side_to_move, &mut first_moves);

        let mut positions_checked = 0;
        for first in &first_moves {
            let mut after_first = root.clone();
            if !after_first.apply_move(*first) {
                continue;
            }

            let mut second_moves = MoveList::new();
            generate_moves(&after_first, after_first.side_to_move, &mut second_moves);
            for second in &second_moves {
                let mut after_second = after_first.clone();
                if !after_second.apply_move(*second) {
                    continue;
                }

                for side in [Color::White, Color::Black] {
                    assert_eq!(
                        after_second.is_in_check(side),
                        attacked_by_any_move(&after_second, side),
                        "disagreement for {:?} in {}",
                        side,
                        after_second.to_fen()
                    );
                }
                positions_checked += 1;
            }
        }

        assert_eq!(positions_checked, 400);
    }

    #[test]
    fn applied_moves_never_leave_the_mover_in_check() {
        let board =
            Board::from_fen("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1")
                .unwrap();
        let mut moves = MoveList::new();
        generate_moves(&board, board.side_to_move, &mut moves);

        for m in &moves {
            let mut next = board.clone();
            if next.apply_move(*m) {
                assert!(!next.is_in_check(board.side_to_move), "move {m:?} left the mover in check");
            }
        }
    }
}
