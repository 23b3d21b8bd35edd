//! Error types for variant construction and input parsing.

use std::fmt;

/// Error type for variant assembly failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantError {
    /// Board dimensions outside the 1-16 range
    BadBoardSize { files: usize, ranks: usize },
    /// Board does not fit in the chosen word width
    BoardTooLarge {
        files: usize,
        ranks: usize,
        bits: usize,
    },
    /// More piece types than the encoding supports
    TooManyPieceTypes { count: usize },
    /// Unknown piece abbreviation in a promotion/demotion/victim list
    UnknownPiece { symbol: String },
    /// Too many distinct leaper/rider/stepper descriptions
    TableOverflow { family: &'static str },
    /// Castle rule references an off-board square
    BadCastleRule { square: usize },
    /// Variant has no starting position
    MissingStartPosition,
}

impl fmt::Display for VariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantError::BadBoardSize { files, ranks } => {
                write!(f, "Board size {files}x{ranks} outside supported range")
            }
            VariantError::BoardTooLarge { files, ranks, bits } => {
                write!(f, "Board {files}x{ranks} does not fit in {bits} bits")
            }
            VariantError::TooManyPieceTypes { count } => {
                write!(f, "Too many piece types ({count}, maximum 32)")
            }
            VariantError::UnknownPiece { symbol } => {
                write!(f, "Unknown piece symbol '{symbol}'")
            }
            VariantError::TableOverflow { family } => {
                write!(f, "Too many distinct {family} move descriptions")
            }
            VariantError::BadCastleRule { square } => {
                write!(f, "Castle rule references invalid square {square}")
            }
            VariantError::MissingStartPosition => {
                write!(f, "Variant has no starting position")
            }
        }
    }
}

impl std::error::Error for VariantError {}

/// Error type for FEN parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN string has too few fields
    TooFewParts { found: usize },
    /// Unknown piece character in the placement field
    InvalidPiece { symbol: String },
    /// Placement overruns the board
    TooManyFiles { rank: usize },
    /// Placement has the wrong number of ranks
    BadRankCount { found: usize },
    /// Invalid side to move (must be 'w' or 'b')
    InvalidSideToMove { found: String },
    /// Invalid castling field
    InvalidCastling { found: String },
    /// Invalid en passant square
    InvalidEnPassant { found: String },
    /// Unknown piece in the holdings field
    InvalidHolding { symbol: String },
    /// A piece was placed on an excluded cell
    PieceOnExcludedCell { square: String },
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewParts { found } => {
                write!(f, "FEN must have at least 2 fields, found {found}")
            }
            FenError::InvalidPiece { symbol } => {
                write!(f, "Invalid piece '{symbol}' in FEN")
            }
            FenError::TooManyFiles { rank } => {
                write!(f, "Too many files in FEN rank {rank}")
            }
            FenError::BadRankCount { found } => {
                write!(f, "FEN has {found} ranks, board disagrees")
            }
            FenError::InvalidSideToMove { found } => {
                write!(f, "Invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::InvalidCastling { found } => {
                write!(f, "Invalid castling field '{found}'")
            }
            FenError::InvalidEnPassant { found } => {
                write!(f, "Invalid en passant square '{found}'")
            }
            FenError::InvalidHolding { symbol } => {
                write!(f, "Invalid holdings piece '{symbol}'")
            }
            FenError::PieceOnExcludedCell { square } => {
                write!(f, "Piece placed on excluded cell {square}")
            }
        }
    }
}

impl std::error::Error for FenError {}

/// Error type for move-text parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Empty move string
    Empty,
    /// Invalid square notation in move
    InvalidSquare { notation: String },
    /// Unknown piece letter
    InvalidPiece { symbol: String },
    /// Move matches more than one legal move
    AmbiguousMove { notation: String },
    /// No legal move matches the text
    NoMatchingMove { notation: String },
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveParseError::Empty => write!(f, "Empty move string"),
            MoveParseError::InvalidSquare { notation } => {
                write!(f, "Invalid square in move '{notation}'")
            }
            MoveParseError::InvalidPiece { symbol } => {
                write!(f, "Unknown piece letter '{symbol}'")
            }
            MoveParseError::AmbiguousMove { notation } => {
                write!(f, "Ambiguous move '{notation}'")
            }
            MoveParseError::NoMatchingMove { notation } => {
                write!(f, "No legal move matches '{notation}'")
            }
        }
    }
}

impl std::error::Error for MoveParseError {}
