use arrayvec::ArrayVec;

use crate::board::{
    BLACK_KINGSIDE_ROOK_START, BLACK_QUEENSIDE_ROOK_START, Board, CASTLE_BLACK_KING,
    CASTLE_BLACK_QUEEN, CASTLE_WHITE_KING, CASTLE_WHITE_QUEEN, Color, PIECE_KING, PIECE_NONE,
    PIECE_PAWN, PIECE_ROOK, Piece, WHITE_KINGSIDE_ROOK_START, WHITE_QUEENSIDE_ROOK_START, file_of,
    rank_of, square_name, to_square,
};

/// 218 is the proven maximum number of legal moves in any position, so
/// pseudo-legal generation fits in a fixed buffer with no heap allocation.
pub const MOVE_LIST_CAPACITY: usize = 218;

pub type MoveList = ArrayVec<Move, MOVE_LIST_CAPACITY>;

/// from: bits 0-5, to: bits 6-11, promotion piece type: bits 12-14,
/// capture flag: bit 15. The default value is the null move (from == to == 0)
/// which must never be applied; callers check list emptiness, not nullity.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Move {
    pub data: u16,
}

const MOVE_FLAG_CAPTURE: u16 = 1 << 15;

impl Move {
    pub const NULL: Move = Move { data: 0 };

    pub fn new(from: u8, to: u8, capture: bool, promotion: u8) -> Move {
        let mut data = from as u16 | ((to as u16) << 6) | ((promotion as u16) << 12);
        if capture {
            data |= MOVE_FLAG_CAPTURE;
        }
        Move { data }
    }

    pub fn quiet(from: u8, to: u8) -> Move {
        Move::new(from, to, false, PIECE_NONE)
    }

    #[inline]
    pub fn from(self) -> u8 {
        (self.data & 0x003F) as u8
    }

    #[inline]
    pub fn to(self) -> u8 {
        ((self.data >> 6) & 0x003F) as u8
    }

    /// Piece type to promote to, PIECE_NONE for non-promotion moves.
    #[inline]
    pub fn promotion(self) -> u8 {
        ((self.data >> 12) & 0x0007) as u8
    }

    #[inline]
    pub fn is_capture(self) -> bool {
        self.data & MOVE_FLAG_CAPTURE != 0
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.from() == 0 && self.to() == 0
    }

    /// "e2e4" style, with a promotion piece letter suffix where applicable.
    pub fn long_algebraic_notation(self) -> String {
        let mut notation = square_name(self.from());
        notation.push_str(&square_name(self.to()));

        match self.promotion() {
            PIECE_NONE => {}
            promotion => notation.push(
                Piece::new(promotion, Color::Black).notation(), // lowercase letter
            ),
        }

        notation
    }
}

impl std::fmt::Debug for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Move {} (from: {} to: {} capture: {})",
            self.long_algebraic_notation(),
            self.from(),
            self.to(),
            self.is_capture()
        )
    }
}

impl Board {
    /// Performs the move unconditionally, then rejects it if the moving side
    /// is left in check. Returns false on an illegal move; the board is not
    /// guaranteed usable afterwards, callers keep a pre-move copy instead of
    /// relying on an undo.
    #[must_use]
    pub fn apply_move(&mut self, m: Move) -> bool {
        let moving_piece = self.piece_at(m.from());
        let side = moving_piece.color();

        let previous_en_passant = self.en_passant_square;
        self.en_passant_square = None;
        // Always flipped so that a caller restoring from a copy has nothing
        // special to undo.
        self.side_to_move = self.side_to_move.opposite();

        match moving_piece.piece_type() {
            PIECE_KING => {
                self.set_king_square(side, m.to());

                // A king move of two files is a castle; relocate the rook.
                let from_file = file_of(m.from());
                let to_file = file_of(m.to());
                if from_file == 4 && to_file == 6 {
                    let rank = rank_of(m.from());
                    self.write_piece(to_square(rank, 5), Piece::new(PIECE_ROOK, side));
                    self.write_piece(to_square(rank, 7), Piece::EMPTY);
                } else if from_file == 4 && to_file == 2 {
                    let rank = rank_of(m.from());
                    self.write_piece(to_square(rank, 3), Piece::new(PIECE_ROOK, side));
                    self.write_piece(to_square(rank, 0), Piece::EMPTY);
                }

                self.castling_rights &= match side {
                    Color::White => !(CASTLE_WHITE_KING | CASTLE_WHITE_QUEEN),
                    Color::Black => !(CASTLE_BLACK_KING | CASTLE_BLACK_QUEEN),
                };
            }
            PIECE_ROOK => {
                if m.from() == WHITE_KINGSIDE_ROOK_START {
                    self.castling_rights &= !CASTLE_WHITE_KING;
                } else if m.from() == WHITE_QUEENSIDE_ROOK_START {
                    self.castling_rights &= !CASTLE_WHITE_QUEEN;
                } else if m.from() == BLACK_KINGSIDE_ROOK_START {
                    self.castling_rights &= !CASTLE_BLACK_KING;
                } else if m.from() == BLACK_QUEENSIDE_ROOK_START {
                    self.castling_rights &= !CASTLE_BLACK_QUEEN;
                }
            }
            _ => {}
        }

        self.write_piece(m.from(), Piece::EMPTY);
        self.write_piece(m.to(), moving_piece);

        if moving_piece.piece_type() == PIECE_PAWN {
            let diff = m.to() as i16 - m.from() as i16;
            if diff == 16 || diff == -16 {
                // Double push: the skipped square becomes the en passant target.
                self.en_passant_square = Some((m.to() as i16 - diff / 2) as u8);
            } else if previous_en_passant == Some(m.to()) && file_of(m.to()) != file_of(m.from()) {
                // En passant capture: the captured pawn sits on the from-rank
                // in the to-file.
                self.write_piece(to_square(rank_of(m.from()), file_of(m.to())), Piece::EMPTY);
            } else if m.promotion() != PIECE_NONE {
                self.write_piece(m.to(), Piece::new(m.promotion(), side));
            }
        }

        !self.is_in_check(side)
    }
}
