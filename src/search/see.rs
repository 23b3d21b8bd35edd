//! Static exchange evaluation.
//!
//! Plays out the capture sequence on one cell, each side taking with its
//! least valued attacker. The attacker set is recomputed against the shrunk
//! occupancy after every take, which reveals x-ray attackers behind moved
//! pieces along shared rays without family-specific bookkeeping. Results go
//! through a small direct-mapped cache keyed by position and move.

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::Bitboard;
use crate::moves::Move;
use crate::variant::Variant;

const SEE_CACHE_SIZE: usize = (1 << 16) + 8;

pub struct SeeCache {
    keys: Vec<u64>,
    values: Vec<i32>,
}

impl SeeCache {
    #[must_use]
    pub fn new() -> Self {
        SeeCache {
            keys: vec![0; SEE_CACHE_SIZE],
            values: vec![0; SEE_CACHE_SIZE],
        }
    }

    pub fn clear(&mut self) {
        for k in &mut self.keys {
            *k = 0;
        }
    }

    #[inline]
    fn slot(key: u64) -> usize {
        (key % SEE_CACHE_SIZE as u64) as usize
    }
}

impl Default for SeeCache {
    fn default() -> Self {
        SeeCache::new()
    }
}

/// Exchange value of `mv` in centipawns, from the mover's point of view.
pub fn see<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
    cache: &mut SeeCache,
    mv: Move,
) -> i32 {
    if !mv.is_capture() || mv.is_drop() || mv.is_pickup() {
        return 0;
    }

    let key = board.hash ^ mv.as_u64().wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let slot = SeeCache::slot(key);
    if cache.keys[slot] == key && key != 0 {
        return cache.values[slot];
    }

    let value = see_uncached(variant, board, mv);
    cache.keys[slot] = key;
    cache.values[slot] = value;
    value
}

fn piece_value<W: BitWord>(variant: &Variant<W>, board: &Board<W>, sq: crate::geometry::Square) -> i32 {
    let piece = board.get_piece(sq);
    variant.pieces[piece.index()].value.0
}

fn see_uncached<W: BitWord>(variant: &Variant<W>, board: &Board<W>, mv: Move) -> i32 {
    let target = mv.to();
    let victim_sq = mv.capture_square();
    let mut side = board.side_to_move;

    let mut gain = [0i32; 40];
    let mut depth = 0usize;

    // First capture is forced by the move itself
    gain[0] = piece_value(variant, board, victim_sq);
    if mv.is_double_capture() {
        gain[0] += piece_value(variant, board, mv.pickup_square(0));
    }

    let from = mv.from();
    let mut occ = board.occupied();
    occ.reset(from);
    occ.reset(victim_sq);
    let mut attacked_value = if mv.is_promotion() {
        variant.pieces[mv.final_piece().index()].value.0
    } else {
        piece_value(variant, board, from)
    };
    side = side.flip();

    // Iterate least-valued takers; recomputing the attacker set after each
    // removal reveals the x-rays
    loop {
        let attackers = variant.movegen.attackers_of(
            variant,
            board,
            Bitboard::from_square(target),
            side,
            occ,
        ) & occ;
        let Some(from) = least_valued(variant, board, attackers) else {
            break;
        };
        depth += 1;
        if depth >= gain.len() - 1 {
            break;
        }
        gain[depth] = attacked_value - gain[depth - 1];
        attacked_value = piece_value(variant, board, from);
        occ.reset(from);
        side = side.flip();

        // Stop early when the capture cannot possibly help
        if gain[depth].max(-gain[depth - 1]) < 0 {
            break;
        }
    }

    // Negamax the swap list backwards
    while depth > 0 {
        gain[depth - 1] = -((-gain[depth - 1]).max(gain[depth]));
        depth -= 1;
    }
    gain[0]
}

fn least_valued<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
    attackers: Bitboard<W>,
) -> Option<crate::geometry::Square> {
    if attackers.is_empty() {
        return None;
    }
    board.least_valued_piece(variant, attackers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::GenMode;
    use crate::moves::MoveList;
    use crate::variants;

    fn find_capture(
        variant: &Variant<u64>,
        board: &Board<u64>,
        from: &str,
        to: &str,
    ) -> Move {
        let geo = variant.geo();
        let mut list = MoveList::new();
        variant.movegen.generate_moves(variant, board, board.side_to_move, &mut list, GenMode::All);
        let from_sq = geo.parse_square(from).expect("from square");
        let to_sq = geo.parse_square(to).expect("to square");
        *list
            .iter()
            .find(|m| m.is_capture() && m.swaps() > 0 && m.from() == from_sq && m.to() == to_sq)
            .expect("capture present")
    }

    #[test]
    fn test_see_winning_capture() {
        let variant = variants::chess::<u64>().expect("chess");
        let mut board = Board::new();
        // Pawn takes an undefended queen
        crate::fen::setup_fen(&variant, &mut board, "4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1", false)
            .expect("fen");
        let mv = find_capture(&variant, &board, "e4", "d5");
        let mut cache = SeeCache::new();
        let value = see(&variant, &board, &mut cache, mv);
        assert!(value >= 800, "pawn takes queen should win material, got {value}");
    }

    #[test]
    fn test_see_losing_capture() {
        let variant = variants::chess::<u64>().expect("chess");
        let mut board = Board::new();
        // Queen takes a defended pawn
        crate::fen::setup_fen(&variant, &mut board, "4k3/2p5/3p4/8/3Q4/8/8/4K3 w - - 0 1", false)
            .expect("fen");
        let mv = find_capture(&variant, &board, "d4", "d6");
        let mut cache = SeeCache::new();
        let value = see(&variant, &board, &mut cache, mv);
        assert!(value < 0, "queen takes defended pawn loses material, got {value}");
    }

    #[test]
    fn test_see_monotonicity_low_takes_high() {
        // Capturing a higher-valued piece with a lower-valued one nets at
        // least the difference
        let variant = variants::chess::<u64>().expect("chess");
        let mut board = Board::new();
        crate::fen::setup_fen(&variant, &mut board, "4k3/8/2n5/8/3r4/2P5/8/4K3 w - - 0 1", false)
            .expect("fen");
        let mv = find_capture(&variant, &board, "c3", "d4");
        let mut cache = SeeCache::new();
        let value = see(&variant, &board, &mut cache, mv);
        let pawn = 100;
        let rook = 500;
        assert!(value >= rook - pawn, "SEE {value} below guaranteed margin");
    }

    #[test]
    fn test_see_cache_stability() {
        let variant = variants::chess::<u64>().expect("chess");
        let mut board = Board::new();
        crate::fen::setup_fen(&variant, &mut board, "4k3/8/8/3q4/4P3/8/8/4K3 w - - 0 1", false)
            .expect("fen");
        let mv = find_capture(&variant, &board, "e4", "d5");
        let mut cache = SeeCache::new();
        let a = see(&variant, &board, &mut cache, mv);
        let b = see(&variant, &board, &mut cache, mv);
        assert_eq!(a, b);
    }
}
