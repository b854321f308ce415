use std::fmt::Debug;
use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use thiserror::Error;

pub static STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

pub const PIECE_NONE: u8 = 0;
pub const PIECE_PAWN: u8 = 1;
pub const PIECE_KNIGHT: u8 = 2;
pub const PIECE_BISHOP: u8 = 3;
pub const PIECE_ROOK: u8 = 4;
pub const PIECE_QUEEN: u8 = 5;
pub const PIECE_KING: u8 = 6;
pub const PIECE_MASK: u8 = 0b0111;

const COLOR_BLACK: u8 = 1 << 3;

pub const CASTLE_WHITE_KING: u8 = 1;
pub const CASTLE_WHITE_QUEEN: u8 = 1 << 1;
pub const CASTLE_BLACK_KING: u8 = 1 << 2;
pub const CASTLE_BLACK_QUEEN: u8 = 1 << 3;

pub const WHITE_KING_START: u8 = 4; // e1
pub const BLACK_KING_START: u8 = 60; // e8
pub const WHITE_KINGSIDE_ROOK_START: u8 = 7; // h1
pub const WHITE_QUEENSIDE_ROOK_START: u8 = 0; // a1
pub const BLACK_KINGSIDE_ROOK_START: u8 = 63; // h8
pub const BLACK_QUEENSIDE_ROOK_START: u8 = 56; // a8

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

/// Piece type in bits 0-2, color in bit 3. An empty square is all zeroes and
/// its color is not meaningful.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Piece(u8);

impl Piece {
    pub const EMPTY: Piece = Piece(PIECE_NONE);

    pub fn new(piece_type: u8, color: Color) -> Piece {
        debug_assert!(piece_type <= PIECE_KING);
        let color_flag = match color {
            Color::White => 0,
            Color::Black => COLOR_BLACK,
        };
        Piece(piece_type | color_flag)
    }

    #[inline]
    pub fn piece_type(self) -> u8 {
        self.0 & PIECE_MASK
    }

    #[inline]
    pub fn color(self) -> Color {
        if self.0 & COLOR_BLACK != 0 {
            Color::Black
        } else {
            Color::White
        }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.piece_type() == PIECE_NONE
    }

    /// FEN letter: uppercase for white, lowercase for black.
    pub fn notation(self) -> char {
        let letter = match self.piece_type() {
            PIECE_PAWN => 'P',
            PIECE_KNIGHT => 'N',
            PIECE_BISHOP => 'B',
            PIECE_ROOK => 'R',
            PIECE_QUEEN => 'Q',
            PIECE_KING => 'K',
            _ => return ' ',
        };

        match self.color() {
            Color::White => letter,
            Color::Black => letter.to_ascii_lowercase(),
        }
    }

    pub fn from_letter(letter: char) -> Result<Piece, FenError> {
        let color = if letter.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };

        let piece_type = match letter.to_ascii_lowercase() {
            'p' => PIECE_PAWN,
            'n' => PIECE_KNIGHT,
            'b' => PIECE_BISHOP,
            'r' => PIECE_ROOK,
            'q' => PIECE_QUEEN,
            'k' => PIECE_KING,
            _ => return Err(FenError::UnexpectedPieceChar(letter)),
        };

        Ok(Piece::new(piece_type, color))
    }
}

impl Debug for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Piece({:#04x} '{}')", self.0, self.notation())
    }
}

#[inline]
pub fn to_square(rank: u8, file: u8) -> u8 {
    rank * 8 + file
}

#[inline]
pub fn rank_of(square: u8) -> u8 {
    square / 8
}

#[inline]
pub fn file_of(square: u8) -> u8 {
    square % 8
}

#[inline]
pub fn is_valid_square(rank: i8, file: i8) -> bool {
    (rank | file) & !0x07 == 0
}

pub fn square_name(square: u8) -> String {
    let file = (b'a' + file_of(square)) as char;
    let rank = (b'1' + rank_of(square)) as char;
    format!("{file}{rank}")
}

pub fn parse_square(square: &str) -> Result<u8, FenError> {
    let bytes = square.as_bytes();
    if bytes.len() != 2 || !(b'a'..=b'h').contains(&bytes[0]) || !(b'1'..=b'8').contains(&bytes[1]) {
        return Err(FenError::MalformedSquare(square.to_string()));
    }

    Ok(to_square(bytes[1] - b'1', bytes[0] - b'a'))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FenError {
    #[error("expected FEN to have 6 space-delimited fields but it had {0}")]
    WrongFieldCount(usize),
    #[error("unexpected character '{0}' in piece placement")]
    UnexpectedPieceChar(char),
    #[error("piece placement does not fit on the board")]
    PlacementOverflow,
    #[error("piece placement does not fill the board")]
    PlacementIncomplete,
    #[error("unexpected side to move value '{0}'")]
    UnexpectedSideToMove(String),
    #[error("unexpected character '{0}' in castling rights")]
    UnexpectedCastlingChar(char),
    #[error("malformed square '{0}'")]
    MalformedSquare(String),
}

const HASH_PIECE_SQUARE_COUNT: usize = 12 * 64;
const HASH_BLACK_TO_MOVE_IDX: usize = HASH_PIECE_SQUARE_COUNT;
const HASH_CASTLE_BASE_IDX: usize = HASH_BLACK_TO_MOVE_IDX + 1;
const HASH_EP_FILE_IDX: usize = HASH_CASTLE_BASE_IDX + 4;
const HASH_VALUE_COUNT: usize = HASH_EP_FILE_IDX + 8;

/// Zobrist-style keys. Seeded with a fixed value so that hashes are stable
/// across runs; the hash only has to be a pure function of board state.
static HASH_VALUES: LazyLock<[u64; HASH_VALUE_COUNT]> = LazyLock::new(|| {
    let mut rng = StdRng::seed_from_u64(0x9A3B_15C7_0D4E_F261);
    let mut values = [0u64; HASH_VALUE_COUNT];
    for value in values.iter_mut() {
        *value = rng.next_u64();
    }
    values
});

fn piece_square_hash(piece: Piece, square: u8, values: &[u64; HASH_VALUE_COUNT]) -> u64 {
    let color_offset = match piece.color() {
        Color::White => 0,
        Color::Black => 6,
    };
    values[(piece.piece_type() as usize - 1 + color_offset) * 64 + square as usize]
}

/// 8x8 mailbox board. Index 0 is a1, index 63 is h8, row-major by rank.
#[derive(Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Piece; 64],
    pub side_to_move: Color,
    pub castling_rights: u8,
    pub en_passant_square: Option<u8>,
    white_king_square: u8,
    black_king_square: u8,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            squares: [Piece::EMPTY; 64],
            side_to_move: Color::White,
            castling_rights: 0,
            en_passant_square: None,
            white_king_square: 0,
            black_king_square: 0,
        }
    }
}

impl Board {
    pub fn starting_position() -> Board {
        let mut board = Board::default();
        board.castling_rights =
            CASTLE_WHITE_KING | CASTLE_WHITE_QUEEN | CASTLE_BLACK_KING | CASTLE_BLACK_QUEEN;

        for file in 0..8 {
            board.set(1, file, Piece::new(PIECE_PAWN, Color::White));
            board.set(6, file, Piece::new(PIECE_PAWN, Color::Black));
        }

        const BACK_RANK: [u8; 8] = [
            PIECE_ROOK,
            PIECE_KNIGHT,
            PIECE_BISHOP,
            PIECE_QUEEN,
            PIECE_KING,
            PIECE_BISHOP,
            PIECE_KNIGHT,
            PIECE_ROOK,
        ];
        for (file, piece_type) in BACK_RANK.iter().enumerate() {
            board.set(0, file as u8, Piece::new(*piece_type, Color::White));
            board.set(7, file as u8, Piece::new(*piece_type, Color::Black));
        }

        board
    }

    pub fn clear(&mut self) {
        *self = Board::default();
    }

    /// Places a piece on (rank, file), keeping the king square cache current.
    /// Used by the FEN parser to populate a board field by field.
    pub fn set(&mut self, rank: u8, file: u8, piece: Piece) {
        self.write_piece(to_square(rank, file), piece);
    }

    pub(crate) fn write_piece(&mut self, square: u8, piece: Piece) {
        self.squares[square as usize] = piece;
        if piece.piece_type() == PIECE_KING {
            match piece.color() {
                Color::White => self.white_king_square = square,
                Color::Black => self.black_king_square = square,
            }
        }
    }

    #[inline]
    pub fn piece_at(&self, square: u8) -> Piece {
        self.squares[square as usize]
    }

    #[inline]
    pub fn piece_on(&self, rank: u8, file: u8) -> Piece {
        self.piece_at(to_square(rank, file))
    }

    #[inline]
    pub fn king_square(&self, side: Color) -> u8 {
        match side {
            Color::White => self.white_king_square,
            Color::Black => self.black_king_square,
        }
    }

    pub(crate) fn set_king_square(&mut self, side: Color, square: u8) {
        match side {
            Color::White => self.white_king_square = square,
            Color::Black => self.black_king_square = square,
        }
    }

    pub fn set_side_to_move(&mut self, side: Color) {
        self.side_to_move = side;
    }

    pub fn set_castling_rights(&mut self, rights: u8) {
        self.castling_rights = rights;
    }

    pub fn set_en_passant_square(&mut self, square: Option<u8>) {
        self.en_passant_square = square;
    }

    #[inline]
    pub fn is_empty_square(&self, rank: i8, file: i8) -> bool {
        self.piece_on(rank as u8, file as u8).is_empty()
    }

    #[inline]
    pub fn is_enemy_piece(&self, square: u8, my_side: Color) -> bool {
        let piece = self.piece_at(square);
        !piece.is_empty() && piece.color() != my_side
    }

    /// Pure function of the observable board state. Not consumed by the
    /// search yet; exposed for transposition keys and repetition detection.
    pub fn hash(&self) -> u64 {
        let values = &*HASH_VALUES;
        let mut hash = 0u64;

        for (square, piece) in self.squares.iter().enumerate() {
            if !piece.is_empty() {
                hash ^= piece_square_hash(*piece, square as u8, values);
            }
        }

        if self.side_to_move == Color::Black {
            hash ^= values[HASH_BLACK_TO_MOVE_IDX];
        }

        for bit in 0..4usize {
            if self.castling_rights & (1 << bit) != 0 {
                hash ^= values[HASH_CASTLE_BASE_IDX + bit];
            }
        }

        if let Some(ep) = self.en_passant_square {
            hash ^= values[HASH_EP_FILE_IDX + file_of(ep) as usize];
        }

        hash
    }

    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        let fields: Vec<&str> = fen.split_ascii_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::WrongFieldCount(fields.len()));
        }

        let mut board = Board::default();

        let mut rank: i8 = 7;
        let mut file: i8 = 0;
        for c in fields[0].chars() {
            match c {
                '/' => {
                    if file != 8 {
                        return Err(FenError::PlacementIncomplete);
                    }
                    rank -= 1;
                    file = 0;
                    if rank < 0 {
                        return Err(FenError::PlacementOverflow);
                    }
                }
                '1'..='8' => {
                    file += c.to_digit(10).unwrap() as i8;
                }
                _ => {
                    if file > 7 {
                        return Err(FenError::PlacementOverflow);
                    }
                    board.set(rank as u8, file as u8, Piece::from_letter(c)?);
                    file += 1;
                }
            }

            if file > 8 {
                return Err(FenError::PlacementOverflow);
            }
        }

        // All eight ranks and all eight files of the last rank must have
        // been consumed.
        if rank != 0 || file != 8 {
            return Err(FenError::PlacementIncomplete);
        }

        board.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::UnexpectedSideToMove(other.to_string())),
        };

        if fields[2] != "-" {
            for c in fields[2].chars() {
                board.castling_rights |= match c {
                    'K' => CASTLE_WHITE_KING,
                    'Q' => CASTLE_WHITE_QUEEN,
                    'k' => CASTLE_BLACK_KING,
                    'q' => CASTLE_BLACK_QUEEN,
                    _ => return Err(FenError::UnexpectedCastlingChar(c)),
                };
            }
        }

        if fields[3] != "-" {
            board.en_passant_square = Some(parse_square(fields[3])?);
        }

        // Halfmove clock and fullmove counter are accepted but not tracked.

        Ok(board)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empty_count = 0;
            for file in 0..8 {
                let piece = self.piece_on(rank, file);
                if piece.is_empty() {
                    empty_count += 1;
                } else {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    fen.push(piece.notation());
                }
            }

            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }

            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            if self.castling_rights & CASTLE_WHITE_KING != 0 {
                fen.push('K');
            }
            if self.castling_rights & CASTLE_WHITE_QUEEN != 0 {
                fen.push('Q');
            }
            if self.castling_rights & CASTLE_BLACK_KING != 0 {
                fen.push('k');
            }
            if self.castling_rights & CASTLE_BLACK_QUEEN != 0 {
                fen.push('q');
            }
        }

        fen.push(' ');
        match self.en_passant_square {
            Some(square) => fen.push_str(&square_name(square)),
            None => fen.push('-'),
        }

        // Move counters are not tracked, emit them best effort.
        fen.push_str(" 0 1");

        fen
    }
}

impl Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let piece = self.piece_on(rank, file);
                let c = if piece.is_empty() { '.' } else { piece.notation() };
                write!(f, " {c}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "   a b c d e f g h")?;
        writeln!(
            f,
            "side to move: {:?}, castling rights: {:#06b}, en passant: {:?}",
            self.side_to_move, self.castling_rights, self.en_passant_square
        )
    }
}
