use crate::board::{Board, Color, PIECE_KING};

/// Material values indexed by piece type. The king carries no material value,
/// mate handling lives in the search.
pub const PIECE_VALUES: [f32; 7] = [0.0, 1.0, 3.0, 3.1, 5.0, 9.0, 0.0];

/// Signed material sum, white-positive.
pub fn eval(board: &Board) -> f32 {
    let mut score = 0.0f32;

    for square in 0..64u8 {
        let piece = board.piece_at(square);
        if piece.is_empty() {
            continue;
        }

        let value = PIECE_VALUES[piece.piece_type() as usize];
        score += match piece.color() {
            Color::White => value,
            Color::Black => -value,
        };
    }

    score
}

/// True when every occupied square holds a king: the bare-kings degenerate
/// case. Other draw conditions (repetition, fifty-move) are not detected.
pub fn is_draw_position(board: &Board) -> bool {
    for square in 0..64u8 {
        let piece = board.piece_at(square);
        if !piece.is_empty() && piece.piece_type() != PIECE_KING {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod evaluate_tests {
    use super::*;
    use crate::board::STARTING_FEN;

    #[test]
    fn starting_position_is_balanced() {
        let board = Board::from_fen(STARTING_FEN).unwrap();
        assert_eq!(eval(&board), 0.0);
    }

    #[test]
    fn material_sum_is_signed() {
        // White: queen + pawn, black: rook + bishop
        let board = Board::from_fen("4k3/2r5/3b4/8/8/5P2/2Q5/4K3 w - - 0 1").unwrap();
        let expected = 9.0 + 1.0 - 5.0 - 3.1;
        assert!((eval(&board) - expected).abs() < 1e-6);
    }

    #[test]
    fn bare_kings_are_a_draw() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(is_draw_position(&board));
    }

    #[test]
    fn a_single_pawn_is_not_a_draw() {
        let board = Board::from_fen("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1").unwrap();
        assert!(!is_draw_position(&board));
    }
}
