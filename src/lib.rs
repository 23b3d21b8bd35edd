//! A parameterized engine core for chess-like games.
//!
//! The crate hosts a bitboard-indexed move generator compiled from
//! declarative piece descriptions, a reversible board with incremental
//! Zobrist hashing and holdings, and an iterative-deepening alpha-beta
//! search with quiescence, a transposition table and a mate sub-search.
//! Variants from orthodox chess through Xiangqi, Crazyhouse and Seirawan
//! assemble through [`variant::VariantBuilder`]; a finished variant plays
//! through [`game::Game`] or the width-erased [`game::AnyGame`].
//!
//! # Example
//! ```
//! use fairy_engine::{game::Game, moves::MoveList, variants};
//!
//! let mut game = Game::new(variants::chess::<u64>().unwrap()).unwrap();
//! let mut moves = MoveList::new();
//! game.generate_legal_moves(&mut moves);
//! assert_eq!(moves.len(), 20);
//! ```

pub mod betza;
pub mod bits;
pub mod board;
pub mod chase;
pub mod error;
pub mod fen;
pub mod game;
pub mod geometry;
pub mod movegen;
pub mod moves;
pub mod movestring;
pub mod pieces;
pub mod search;
pub mod variant;
pub mod variants;

pub mod eval;

mod zobrist;

pub use board::{Board, UnmakeInfo};
pub use error::{FenError, MoveParseError, VariantError};
pub use game::{AnyGame, Game};
pub use geometry::{Bitboard, Geometry, Side, Square};
pub use moves::{Move, MoveList};
pub use pieces::{MoveFlags, PieceDesc, PieceFlags, PieceId};
pub use search::{HistoryEntry, PlayState, Search, SearchClock, SearchOutcome};
pub use variant::{RuleFlags, TerminalScores, Variant, VariantBuilder};
