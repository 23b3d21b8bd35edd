//! Board state and reversible move application.
//!
//! The board holds per-side and per-piece bitboards, the royal and
//! unmoved-piece sets, en-passant state, holdings, two incremental Zobrist
//! keys (the second one excludes holdings, for board-repetition detection)
//! and the rule-relevant counters. `make` resolves a move's components in
//! pickup -> swap -> drop -> holdings order; `unmake` inverts them exactly.

use crate::bits::BitWord;
use crate::geometry::{Bitboard, Side, Square};
use crate::moves::Move;
use crate::pieces::{PieceFlags, PieceId, MAX_PIECE_TYPES};
use crate::variant::{RuleFlags, Variant};
use crate::zobrist::ZOBRIST;

/// Board status bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BoardFlags(pub u8);

impl BoardFlags {
    pub const CHECK: u8 = 0x01;
    pub const WSHAK: u8 = 0x02;
    pub const BSHAK: u8 = 0x04;
    pub const NO_RETALIATE: u8 = 0x08;
}

/// Everything `make` clobbers that cannot be recomputed.
#[derive(Clone, Debug)]
pub struct UnmakeInfo<W: BitWord> {
    init: Bitboard<W>,
    ep: Bitboard<W>,
    ep_victim: Option<Square>,
    hash: u64,
    board_hash: u64,
    fifty_counter: u16,
    check_count: [u8; 2],
    board_flags: u8,
    castle_rights: u8,
    /// On-board identity of each pickup, so a demoted victim is restored in
    /// its promoted form.
    pickup_piece: [(PieceId, Side); 4],
}

impl<W: BitWord> Default for UnmakeInfo<W> {
    fn default() -> Self {
        UnmakeInfo {
            init: Bitboard::EMPTY,
            ep: Bitboard::EMPTY,
            ep_victim: None,
            hash: 0,
            board_hash: 0,
            fifty_counter: 0,
            check_count: [0; 2],
            board_flags: 0,
            castle_rights: 0,
            pickup_piece: [(PieceId(0), Side::White); 4],
        }
    }
}

/// Saved state for null moves.
#[derive(Clone, Copy, Debug)]
pub struct NullMoveInfo<W: BitWord> {
    ep: Bitboard<W>,
    ep_victim: Option<Square>,
    hash: u64,
    board_hash: u64,
    board_flags: u8,
}

#[derive(Clone)]
pub struct Board<W: BitWord> {
    /// Occupancy per side.
    pub bbc: [Bitboard<W>; 2],
    /// Occupancy per piece type.
    pub bbp: [Bitboard<W>; MAX_PIECE_TYPES],
    pub royal: Bitboard<W>,
    /// Unmoved pieces; enables castling and initial-move atoms.
    pub init: Bitboard<W>,
    /// Flag cells per side, for capture-the-flag rules.
    pub flag: [Bitboard<W>; 2],
    /// En-passant destination cell(s).
    pub ep: Bitboard<W>,
    /// Cell of the piece an en-passant capture removes.
    pub ep_victim: Option<Square>,
    piece: [u8; 128],
    pub holdings: [[i8; 2]; MAX_PIECE_TYPES],
    pub hash: u64,
    /// Hash without holdings contributions.
    pub board_hash: u64,
    pub side_to_move: Side,
    pub fifty_counter: u16,
    /// Checks delivered *to* each side since game start.
    pub check_count: [u8; 2],
    pub board_flags: u8,
    /// Derived castling availability bits, kept hashed; bit = 2*side + board_side.
    pub castle_rights: u8,
}

impl<W: BitWord> Board<W> {
    #[must_use]
    pub fn new() -> Self {
        Board {
            bbc: [Bitboard::EMPTY; 2],
            bbp: [Bitboard::EMPTY; MAX_PIECE_TYPES],
            royal: Bitboard::EMPTY,
            init: Bitboard::EMPTY,
            flag: [Bitboard::EMPTY; 2],
            ep: Bitboard::EMPTY,
            ep_victim: None,
            piece: [0; 128],
            holdings: [[0; 2]; MAX_PIECE_TYPES],
            hash: 0,
            board_hash: 0,
            side_to_move: Side::White,
            fifty_counter: 0,
            check_count: [0; 2],
            board_flags: 0,
            castle_rights: 0,
        }
    }

    pub fn clear(&mut self) {
        *self = Board::new();
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn occupied(&self) -> Bitboard<W> {
        self.bbc[0] | self.bbc[1]
    }

    #[inline]
    #[must_use]
    pub fn get_piece(&self, sq: Square) -> PieceId {
        debug_assert!(self.occupied().test(sq), "get_piece on empty cell");
        PieceId(self.piece[sq.index()])
    }

    #[inline]
    #[must_use]
    pub fn get_side(&self, sq: Square) -> Option<Side> {
        if self.bbc[0].test(sq) {
            Some(Side::White)
        } else if self.bbc[1].test(sq) {
            Some(Side::Black)
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(PieceId, Side)> {
        self.get_side(sq).map(|side| (self.get_piece(sq), side))
    }

    #[inline]
    #[must_use]
    pub fn piece_count(&self, piece: PieceId, side: Side) -> u32 {
        (self.bbp[piece.index()] & self.bbc[side.index()]).popcount()
    }

    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        self.board_flags & BoardFlags::CHECK != 0
    }

    /// Record whether the side to move stands in check. Incoming checks also
    /// bump the check counter (used by check-limit rules); leaving check
    /// clears the mover's shak mark.
    pub fn set_check(&mut self, check: bool) {
        self.board_flags &= !BoardFlags::CHECK;
        if check {
            self.board_flags |= BoardFlags::CHECK;
            self.check_count[self.side_to_move.index()] =
                self.check_count[self.side_to_move.index()].saturating_add(1);
        } else {
            let shak_bit = BoardFlags::WSHAK << self.side_to_move.index();
            self.board_flags &= !shak_bit;
        }
    }

    pub fn mark_shak(&mut self) {
        self.board_flags |= BoardFlags::WSHAK << self.side_to_move.index();
    }

    #[must_use]
    pub fn have_shak(&self) -> bool {
        self.board_flags & (BoardFlags::WSHAK << self.side_to_move.index()) != 0
    }

    #[must_use]
    pub fn retaliate_ok(&self) -> bool {
        self.board_flags & BoardFlags::NO_RETALIATE == 0
    }

    /// Least valued piece inside `mask`, by the variant's value ordering.
    #[must_use]
    pub fn least_valued_piece(&self, variant: &Variant<W>, mask: Bitboard<W>) -> Option<Square> {
        for &p in &variant.value_order {
            let bb = self.bbp[p.index()] & mask;
            if !bb.is_empty() {
                return Some(bb.bitscan());
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Placement primitives
    // ------------------------------------------------------------------

    pub fn put_piece(&mut self, variant: &Variant<W>, piece: PieceId, side: Side, sq: Square) {
        debug_assert!(!self.bbc[side.index()].test(sq), "put_piece on occupied cell");
        debug_assert!(!self.bbp[piece.index()].test(sq), "put_piece on occupied cell");
        self.bbc[side.index()].set(sq);
        self.bbp[piece.index()].set(sq);
        self.piece[sq.index()] = piece.0;
        if variant.pieces[piece.index()].is_royal() {
            self.royal.set(sq);
        }
        let key = ZOBRIST.piece(piece, side, sq);
        self.hash ^= key;
        self.board_hash ^= key;
    }

    /// Place a piece and mark it unmoved (position setup).
    pub fn put_new_piece(&mut self, variant: &Variant<W>, piece: PieceId, side: Side, sq: Square) {
        self.put_piece(variant, piece, side, sq);
        self.init.set(sq);
    }

    pub fn clear_piece(&mut self, piece: PieceId, side: Side, sq: Square) {
        debug_assert!(self.bbc[side.index()].test(sq));
        debug_assert!(self.bbp[piece.index()].test(sq));
        self.bbc[side.index()].reset(sq);
        self.bbp[piece.index()].reset(sq);
        self.royal.reset(sq);
        self.init.reset(sq);
        let key = ZOBRIST.piece(piece, side, sq);
        self.hash ^= key;
        self.board_hash ^= key;
    }

    /// Recompute the castling-availability bits from `init` and adjust the
    /// hashes for any that changed.
    pub fn refresh_castle_rights(&mut self, variant: &Variant<W>) {
        let mut rights = 0u8;
        for rule in &variant.movegen.castles {
            if self.init.test(rule.king_from) && self.init.test(rule.rook_from) {
                rights |= 1 << (2 * rule.side.index() + rule.board_side);
            }
        }
        let changed = rights ^ self.castle_rights;
        for bit in 0..4 {
            if changed & (1 << bit) != 0 {
                let key = ZOBRIST.castle(Side::from_index(bit / 2), bit % 2);
                self.hash ^= key;
                self.board_hash ^= key;
            }
        }
        self.castle_rights = rights;
    }

    // ------------------------------------------------------------------
    // Make / unmake
    // ------------------------------------------------------------------

    pub fn make(&mut self, variant: &Variant<W>, mv: Move, ui: &mut UnmakeInfo<W>) {
        ui.init = self.init;
        ui.hash = self.hash;
        ui.board_hash = self.board_hash;
        ui.fifty_counter = self.fifty_counter;
        ui.ep = self.ep;
        ui.ep_victim = self.ep_victim;
        ui.board_flags = self.board_flags;
        ui.check_count = self.check_count;
        ui.castle_rights = self.castle_rights;

        self.board_flags &= !BoardFlags::NO_RETALIATE;

        // Pickups: clear victims (and the mover, for promotion-shaped moves)
        for c in 0..mv.pickups() {
            let sq = mv.pickup_square(c);
            let piece = self.get_piece(sq);
            let side = self.get_side(sq).unwrap_or(self.side_to_move);
            ui.pickup_piece[c] = (piece, side);
            self.clear_piece(piece, side, sq);
            if variant.pieces[piece.index()]
                .flags
                .contains(PieceFlags::NO_RETALIATE)
                && side != self.side_to_move
            {
                self.board_flags |= BoardFlags::NO_RETALIATE;
            }
        }

        // Swaps: clear all origins first so castle paths may overlap
        let mut swap_piece = [(PieceId(0), Side::White); 3];
        for c in 0..mv.swaps() {
            let (from, _) = mv.swap_squares(c);
            let piece = self.get_piece(from);
            let side = self.get_side(from).unwrap_or(self.side_to_move);
            swap_piece[c] = (piece, side);
            if variant.pieces[piece.index()]
                .flags
                .contains(PieceFlags::NO_RETALIATE)
                && side == self.side_to_move
            {
                self.board_flags &= !BoardFlags::NO_RETALIATE;
            }
            self.clear_piece(piece, side, from);
        }
        for c in 0..mv.swaps() {
            let (_, to) = mv.swap_squares(c);
            let (piece, side) = swap_piece[c];
            self.put_piece(variant, piece, side, to);
        }

        // Drops
        for c in 0..mv.drops() {
            let (piece, side, sq) = mv.drop_slot(c);
            self.put_piece(variant, piece, side, sq);
        }

        // Holdings delta; keys are cumulative per count level
        if variant.rules.intersects(RuleFlags::USE_HOLDINGS) && mv.has_holdings() {
            let (piece, side, count) = mv.holdings_slot();
            let slot = &mut self.holdings[piece.index()][side.index()];
            if count < 0 {
                self.hash ^= ZOBRIST.holding(piece, side, *slot);
            }
            *slot += count;
            if count > 0 {
                self.hash ^= ZOBRIST.holding(piece, side, *slot);
            }
        }

        // En-passant state
        self.ep = Bitboard::EMPTY;
        self.ep_victim = None;
        if mv.sets_enpassant() {
            self.ep = variant.geo().between(mv.from(), mv.to());
            self.ep_victim = Some(mv.to());
        }

        if !mv.keeps_turn() {
            self.side_to_move = self.side_to_move.flip();
            self.hash ^= ZOBRIST.side_key;
            self.board_hash ^= ZOBRIST.side_key;
        }

        self.fifty_counter += 1;
        if mv.is_irreversible() {
            self.fifty_counter = 0;
        }

        self.refresh_castle_rights(variant);

        // Not in check until the caller proves otherwise
        self.board_flags &= !BoardFlags::CHECK;
    }

    pub fn unmake(&mut self, variant: &Variant<W>, mv: Move, ui: &UnmakeInfo<W>) {
        if !mv.keeps_turn() {
            self.side_to_move = self.side_to_move.flip();
        }

        // Reverse drops
        for c in 0..mv.drops() {
            let (piece, side, sq) = mv.drop_slot(c);
            self.clear_piece(piece, side, sq);
        }

        // Reverse swaps: clear destinations, restore origins
        let mut swap_piece = [(PieceId(0), Side::White); 3];
        for c in 0..mv.swaps() {
            let (_, to) = mv.swap_squares(c);
            let piece = self.get_piece(to);
            let side = self.get_side(to).unwrap_or(self.side_to_move);
            swap_piece[c] = (piece, side);
            self.clear_piece(piece, side, to);
        }
        for c in 0..mv.swaps() {
            let (from, _) = mv.swap_squares(c);
            let (piece, side) = swap_piece[c];
            self.put_piece(variant, piece, side, from);
        }

        // Reverse pickups, restoring the recorded on-board identity
        for c in 0..mv.pickups() {
            let sq = mv.pickup_square(c);
            let (piece, side) = ui.pickup_piece[c];
            self.put_piece(variant, piece, side, sq);
        }

        // Reverse holdings
        if variant.rules.intersects(RuleFlags::USE_HOLDINGS) && mv.has_holdings() {
            let (piece, side, count) = mv.holdings_slot();
            self.holdings[piece.index()][side.index()] -= count;
            debug_assert!(self.holdings[piece.index()][side.index()] >= 0);
        }

        self.init = ui.init;
        self.hash = ui.hash;
        self.board_hash = ui.board_hash;
        self.fifty_counter = ui.fifty_counter;
        self.ep = ui.ep;
        self.ep_victim = ui.ep_victim;
        self.board_flags = ui.board_flags;
        self.check_count = ui.check_count;
        self.castle_rights = ui.castle_rights;
    }

    pub fn make_null(&mut self) -> NullMoveInfo<W> {
        let info = NullMoveInfo {
            ep: self.ep,
            ep_victim: self.ep_victim,
            hash: self.hash,
            board_hash: self.board_hash,
            board_flags: self.board_flags,
        };
        self.ep = Bitboard::EMPTY;
        self.ep_victim = None;
        self.side_to_move = self.side_to_move.flip();
        self.hash ^= ZOBRIST.side_key;
        self.board_hash ^= ZOBRIST.side_key;
        self.board_flags &= !BoardFlags::CHECK;
        info
    }

    pub fn unmake_null(&mut self, info: NullMoveInfo<W>) {
        self.side_to_move = self.side_to_move.flip();
        self.ep = info.ep;
        self.ep_victim = info.ep_victim;
        self.hash = info.hash;
        self.board_hash = info.board_hash;
        self.board_flags = info.board_flags;
    }

    // ------------------------------------------------------------------
    // Hash verification
    // ------------------------------------------------------------------

    /// Full Zobrist fold over pieces, holdings, side and castling bits; the
    /// incremental `hash` must always equal this.
    #[must_use]
    pub fn recompute_hash(&self, variant: &Variant<W>) -> u64 {
        let mut hash = 0u64;
        for side in [Side::White, Side::Black] {
            for p in 0..variant.pieces.len() {
                let bb = self.bbp[p] & self.bbc[side.index()];
                for sq in bb.iter() {
                    hash ^= ZOBRIST.piece(PieceId(p as u8), side, sq);
                }
                for level in 1..=self.holdings[p][side.index()].max(0) {
                    hash ^= ZOBRIST.holding(PieceId(p as u8), side, level);
                }
            }
        }
        if self.side_to_move == Side::Black {
            hash ^= ZOBRIST.side_key;
        }
        for bit in 0..4 {
            if self.castle_rights & (1 << bit) != 0 {
                hash ^= ZOBRIST.castle(Side::from_index(bit / 2), bit % 2);
            }
        }
        hash
    }

    /// Structural invariants; compiled into debug builds only.
    pub fn debug_validate(&self, variant: &Variant<W>) {
        debug_assert!((self.bbc[0] & self.bbc[1]).is_empty());
        let occupied = self.occupied();
        let mut from_types = Bitboard::<W>::EMPTY;
        for p in 0..variant.pieces.len() {
            for q in (p + 1)..variant.pieces.len() {
                debug_assert!((self.bbp[p] & self.bbp[q]).is_empty());
            }
            from_types |= self.bbp[p];
        }
        debug_assert!(from_types == occupied);
        for sq in occupied.iter() {
            debug_assert!(self.bbp[self.piece[sq.index()] as usize].test(sq));
        }
        let mut royal = Bitboard::<W>::EMPTY;
        for (p, desc) in variant.pieces.iter().enumerate() {
            if desc.is_royal() {
                royal |= self.bbp[p];
            }
        }
        debug_assert!(royal == self.royal);
        debug_assert!((self.init & !occupied).is_empty());
        debug_assert_eq!(self.hash, self.recompute_hash(variant));
    }
}

impl<W: BitWord> Default for Board<W> {
    fn default() -> Self {
        Board::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants;

    #[test]
    fn test_put_and_clear_piece_tracks_every_set() {
        let variant = variants::chess::<u64>().expect("chess");
        let mut board: Board<u64> = Board::new();
        let king = variant.piece_by_notation('K').expect("king");
        let rook = variant.piece_by_notation('R').expect("rook");
        let e4 = variant.geo().parse_square("e4").expect("e4");
        let a1 = variant.geo().parse_square("a1").expect("a1");

        board.put_piece(&variant, king, Side::White, e4);
        board.put_new_piece(&variant, rook, Side::Black, a1);

        assert!(board.royal.test(e4));
        assert!(!board.royal.test(a1));
        assert!(board.init.test(a1));
        assert!(!board.init.test(e4));
        assert_eq!(board.get_piece(e4), king);
        assert_eq!(board.get_side(a1), Some(Side::Black));
        assert_eq!(board.piece_count(rook, Side::Black), 1);

        let hash_before_clear = board.hash;
        board.clear_piece(rook, Side::Black, a1);
        assert!(!board.init.test(a1));
        assert!(board.piece_at(a1).is_none());
        assert_ne!(board.hash, hash_before_clear);

        // Putting it back restores the piece hash contribution
        board.put_piece(&variant, rook, Side::Black, a1);
        assert_eq!(board.hash, hash_before_clear);
    }

    #[test]
    fn test_holdings_hash_levels_accumulate() {
        let variant = variants::crazyhouse::<u64>().expect("crazyhouse");
        let mut board: Board<u64> = Board::new();
        let king = variant.piece_by_notation('K').expect("king");
        let pawn = variant.piece_by_notation('P').expect("pawn");
        let e1 = variant.geo().parse_square("e1").expect("e1");
        let e8 = variant.geo().parse_square("e8").expect("e8");
        board.put_piece(&variant, king, Side::White, e1);
        board.put_piece(&variant, king, Side::Black, e8);

        // Two drops from a two-pawn hand leave the hash where a recompute
        // puts it at every step
        board.holdings[pawn.index()][0] = 2;
        board.hash ^= crate::zobrist::ZOBRIST.holding(pawn, Side::White, 1);
        board.hash ^= crate::zobrist::ZOBRIST.holding(pawn, Side::White, 2);
        assert_eq!(board.hash, board.recompute_hash(&variant));

        let e4 = variant.geo().parse_square("e4").expect("e4");
        let d4 = variant.geo().parse_square("d4").expect("d4");
        let mut ui = UnmakeInfo::default();
        let first = Move::drop(pawn, Side::White, e4);
        board.make(&variant, first, &mut ui);
        assert_eq!(board.holdings[pawn.index()][0], 1);
        assert_eq!(board.hash, board.recompute_hash(&variant));

        let mut ui2 = UnmakeInfo::default();
        let second = Move::drop(pawn, Side::White, d4).with_keep_turn();
        board.make(&variant, second, &mut ui2);
        assert_eq!(board.holdings[pawn.index()][0], 0);
        assert_eq!(board.hash, board.recompute_hash(&variant));

        board.unmake(&variant, second, &ui2);
        board.unmake(&variant, first, &ui);
        assert_eq!(board.holdings[pawn.index()][0], 2);
        assert_eq!(board.hash, board.recompute_hash(&variant));
    }

    #[test]
    fn test_check_bookkeeping() {
        let mut board: Board<u64> = Board::new();
        assert!(!board.in_check());
        board.set_check(true);
        assert!(board.in_check());
        assert_eq!(board.check_count[0], 1);
        board.mark_shak();
        assert!(board.have_shak());
        // Leaving check clears the shak mark for the side to move
        board.set_check(false);
        assert!(!board.have_shak());
        assert_eq!(board.check_count[0], 1);
    }

    #[test]
    fn test_no_retaliate_set_and_cleared() {
        let mut board: Board<u64> = Board::new();
        assert!(board.retaliate_ok());
        board.board_flags |= BoardFlags::NO_RETALIATE;
        assert!(!board.retaliate_ok());
    }
}
