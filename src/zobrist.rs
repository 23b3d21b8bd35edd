//! Zobrist hashing for variant positions.
//!
//! Key tables are sized for the engine-wide maxima (32 piece types, 2 sides,
//! 128 cells, 32 holdings levels) so a single set of keys serves every board
//! shape; boards of different geometries simply never use the high indices.

use once_cell::sync::Lazy;
use rand::prelude::*;

use crate::geometry::{Side, Square};
use crate::pieces::PieceId;

/// Highest in-hand count that gets its own key level.
pub(crate) const MAX_HOLDING_LEVEL: usize = 32;

pub(crate) struct ZobristKeys {
    /// piece_keys[cell][piece][side]
    pub(crate) piece_keys: Vec<[[u64; 2]; 32]>,
    pub(crate) side_key: u64,
    /// hold_keys[count level][piece][side]
    pub(crate) hold_keys: Vec<[[u64; 2]; 32]>,
    /// castle_keys[side][board side] (0 = kingside, 1 = queenside)
    pub(crate) castle_keys: [[u64; 2]; 2],
}

impl ZobristKeys {
    fn new() -> Self {
        // Fixed seed for reproducibility across runs and builds
        let mut rng = StdRng::seed_from_u64(0x00C0_FFEE_5EED_u64);

        let mut piece_keys = vec![[[0u64; 2]; 32]; 128];
        for cell in &mut piece_keys {
            for piece in cell.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }

        let side_key = rng.gen();

        let mut hold_keys = vec![[[0u64; 2]; 32]; MAX_HOLDING_LEVEL];
        for level in &mut hold_keys {
            for piece in level.iter_mut() {
                for key in piece.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        // Level zero contributes nothing so an empty hand hashes like no hand
        for piece in hold_keys[0].iter_mut() {
            for key in piece.iter_mut() {
                *key = 0;
            }
        }

        let mut castle_keys = [[0u64; 2]; 2];
        for side in &mut castle_keys {
            for key in side.iter_mut() {
                *key = rng.gen();
            }
        }

        ZobristKeys {
            piece_keys,
            side_key,
            hold_keys,
            castle_keys,
        }
    }

    #[inline]
    pub(crate) fn piece(&self, piece: PieceId, side: Side, sq: Square) -> u64 {
        self.piece_keys[sq.index()][piece.index()][side.index()]
    }

    #[inline]
    pub(crate) fn holding(&self, piece: PieceId, side: Side, count: i8) -> u64 {
        let level = (count.max(0) as usize).min(MAX_HOLDING_LEVEL - 1);
        self.hold_keys[level][piece.index()][side.index()]
    }

    #[inline]
    pub(crate) fn castle(&self, side: Side, board_side: usize) -> u64 {
        self.castle_keys[side.index()][board_side & 1]
    }
}

pub(crate) static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

/// Bit mixer used for the opening-randomness draw; a position hash folded
/// with the game seed must give an unbiased small value.
#[inline]
#[must_use]
pub(crate) fn hash_mix(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 33;
    x = x.wrapping_mul(0xC4CE_B9FE_1A85_EC53);
    x ^= x >> 33;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_distinct() {
        let z = &*ZOBRIST;
        assert_ne!(
            z.piece(PieceId(0), Side::White, Square::from_index(0)),
            z.piece(PieceId(0), Side::Black, Square::from_index(0))
        );
        assert_ne!(
            z.piece(PieceId(0), Side::White, Square::from_index(0)),
            z.piece(PieceId(1), Side::White, Square::from_index(0))
        );
        assert_ne!(z.side_key, 0);
    }

    #[test]
    fn test_empty_holding_level_is_zero() {
        let z = &*ZOBRIST;
        assert_eq!(z.holding(PieceId(3), Side::White, 0), 0);
        assert_ne!(z.holding(PieceId(3), Side::White, 1), 0);
        assert_ne!(
            z.holding(PieceId(3), Side::White, 1),
            z.holding(PieceId(3), Side::White, 2)
        );
    }

    #[test]
    fn test_hash_mix_spreads_bits() {
        let a = hash_mix(1);
        let b = hash_mix(2);
        assert_ne!(a, b);
        assert!(a.count_ones() > 8 && a.count_ones() < 56);
    }
}
