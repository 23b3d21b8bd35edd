//! Attack queries: superpiece screens, square-attacked tests, check and pin
//! detection.

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::{Bitboard, Side, Square};
use crate::pieces::{MoveFlags, PieceDesc, PieceFlags, PieceId};
use crate::variant::{RuleFlags, Variant};

use super::MoveGen;

impl<W: BitWord> MoveGen<W> {
    /// Build the per-cell superpiece attack sets: the union, over every
    /// declared piece type, of each cell reachable by any capture move.
    /// Called once, after all pieces are declared.
    pub fn finalize_super(&mut self, pieces: &[PieceDesc<W>]) {
        self.super_slider_flags = MoveFlags::NONE;
        self.super_hopper_flags = MoveFlags::NONE;
        let mut stepper_indices = Vec::new();
        let mut leaper_flags = Vec::new();
        let mut rider_flags = Vec::new();

        for desc in pieces {
            for flags in [desc.capture_flags, desc.special_flags, desc.initial_flags] {
                if flags.is_empty() {
                    continue;
                }
                self.super_slider_flags =
                    MoveFlags(self.super_slider_flags.0 | flags.slider_dirs());
                self.super_hopper_flags = MoveFlags(
                    self.super_hopper_flags.0
                        | (flags.hopper_dirs() << MoveFlags::HOPPER_SHIFT),
                );
                if flags.is_stepper() && !stepper_indices.contains(&flags.stepper_index()) {
                    stepper_indices.push(flags.stepper_index());
                }
                if flags.is_leaper() {
                    leaper_flags.push(flags);
                }
                if flags.is_rider() {
                    rider_flags.push(flags);
                }
            }
        }

        for sq in 0..self.geo.cells() {
            let square = Square::from_index(sq);
            if !self.geo.all.test(square) {
                self.super_all[sq] = Bitboard::EMPTY;
                continue;
            }

            let mut slider = Bitboard::EMPTY;
            if self.super_slider_flags.is_slider() {
                slider = self.slider_moves(self.super_slider_flags, square, Bitboard::EMPTY);
            }

            let mut hopper = Bitboard::EMPTY;
            if self.super_hopper_flags.is_hopper() {
                // With one screen anywhere, a hopper reaches everything a
                // slider along the same rays reaches.
                hopper = self.slider_moves(
                    MoveFlags(self.super_hopper_flags.hopper_dirs()),
                    square,
                    Bitboard::EMPTY,
                );
            }

            let mut leaper = Bitboard::EMPTY;
            for &flags in &leaper_flags {
                for side in [Side::White, Side::Black] {
                    leaper |= self.leaper_moves(flags, side, square, Bitboard::EMPTY);
                }
            }

            let mut stepper = Bitboard::EMPTY;
            for &si in &stepper_indices {
                let flags = MoveFlags((si as u32) << MoveFlags::STEPPER_SHIFT);
                for side in [Side::White, Side::Black] {
                    stepper |= self.stepper_moves(flags, side, square, Bitboard::EMPTY);
                }
            }

            let mut rider = Bitboard::EMPTY;
            for &flags in &rider_flags {
                rider |= self.rider_moves(flags, square, Bitboard::EMPTY);
            }

            self.super_slider[sq] = slider & self.geo.all;
            self.super_hopper[sq] = hopper & self.geo.all;
            self.super_leaper[sq] = leaper & self.geo.all;
            self.super_stepper[sq] = stepper & self.geo.all;
            self.super_rider[sq] = rider & self.geo.all;
            self.super_all[sq] = self.super_slider[sq]
                | self.super_hopper[sq]
                | self.super_leaper[sq]
                | self.super_stepper[sq]
                | self.super_rider[sq];
        }
    }

    /// Capture-attack set of one piece standing on `from`, against the given
    /// occupancy (which may differ from the board's, e.g. with the defending
    /// king removed).
    #[must_use]
    pub fn attacks_from(
        &self,
        variant: &Variant<W>,
        piece: PieceId,
        side: Side,
        from: Square,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        let desc = &variant.pieces[piece.index()];
        let occ = occ | desc.block[side.index()];
        self.moves_for_flags(desc.capture_flags, side, from, occ) & desc.prison[side.index()]
    }

    /// All cells of `targets` attacked by `by`, with `occ` as occupancy.
    /// The superpiece set prunes pieces that could not possibly reach.
    #[must_use]
    pub fn any_attack_on(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        targets: Bitboard<W>,
        by: Side,
        occ: Bitboard<W>,
    ) -> bool {
        !self.attackers_of(variant, board, targets, by, occ).is_empty()
    }

    /// The cells of `by`'s pieces that attack at least one cell of `targets`.
    #[must_use]
    pub fn attackers_of(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        targets: Bitboard<W>,
        by: Side,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        let mut screen = Bitboard::EMPTY;
        for sq in targets.iter() {
            screen |= self.super_all[sq.index()];
        }
        let mut candidates = screen & board.bbc[by.index()] & occ;
        let mut attackers = Bitboard::EMPTY;

        // Target piece types matter when victim lists are restricted
        let mut target_types = 0u32;
        for sq in targets.iter() {
            if board.occupied().test(sq) {
                target_types |= board.get_piece(sq).bit();
            } else {
                target_types = !0;
            }
        }

        while !candidates.is_empty() {
            let from = candidates.pop();
            let piece = board.get_piece(from);
            let desc = &variant.pieces[piece.index()];
            if desc.allowed_victims & target_types == 0 {
                continue;
            }
            if !(self.attacks_from(variant, piece, by, from, occ) & targets).is_empty() {
                attackers.set(from);
            }
        }
        attackers
    }

    /// Cells attacked by any piece of `by` (used for castle paths and king
    /// escape masks).
    #[must_use]
    pub fn attack_map(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        by: Side,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        let mut attacked = Bitboard::EMPTY;
        let mut movers = board.bbc[by.index()] & occ;
        while !movers.is_empty() {
            let from = movers.pop();
            let piece = board.get_piece(from);
            attacked |= self.attacks_from(variant, piece, by, from, occ);
        }
        attacked
    }

    /// Is `side` in check? Honours the flying-general taboo, the any-king
    /// and the duple-check rules.
    #[must_use]
    pub fn player_in_check(&self, variant: &Variant<W>, board: &Board<W>, side: Side) -> bool {
        let royal = board.royal & board.bbc[side.index()];
        if royal.is_empty() {
            return false;
        }
        let opp = side.flip();
        let occ = board.occupied();

        if variant.rules.contains(RuleFlags::KING_TABOO) && self.kings_face(board, side) {
            return true;
        }

        if royal.onebit() || variant.rules.contains(RuleFlags::CHECK_ANY_KING) {
            for sq in royal.iter() {
                if self.any_attack_on(variant, board, Bitboard::from_square(sq), opp, occ) {
                    return true;
                }
            }
            return false;
        }

        if variant.rules.contains(RuleFlags::KING_DUPLECHECK) {
            // All royals must stand attacked at once
            for sq in royal.iter() {
                if !self.any_attack_on(variant, board, Bitboard::from_square(sq), opp, occ) {
                    return false;
                }
            }
            return true;
        }

        // Default with multiple royals: capturing one is not yet fatal
        false
    }

    /// Flying-general test: the two royals face each other along an open
    /// file.
    #[must_use]
    pub fn kings_face(&self, board: &Board<W>, side: Side) -> bool {
        let own = board.royal & board.bbc[side.index()];
        let theirs = board.royal & board.bbc[side.flip().index()];
        let occ = board.occupied();
        for a in own.iter() {
            for b in theirs.iter() {
                if self.geo.file_of(a) == self.geo.file_of(b)
                    && (self.geo.between(a, b) & occ).is_empty()
                {
                    return true;
                }
            }
        }
        false
    }

    /// Cells of the checking pieces when `side` is in check.
    #[must_use]
    pub fn checkers(&self, variant: &Variant<W>, board: &Board<W>, side: Side) -> Bitboard<W> {
        let royal = board.royal & board.bbc[side.index()];
        if royal.is_empty() {
            return Bitboard::EMPTY;
        }
        self.attackers_of(variant, board, royal, side.flip(), board.occupied())
    }

    /// Own pieces of `side` that shield a royal from an enemy ray piece.
    /// One blocker pins for sliders, leapers and riders; a hopper "pins" the
    /// two pieces that make up screen and shield.
    #[must_use]
    pub fn pinned_pieces(&self, variant: &Variant<W>, board: &Board<W>, side: Side) -> Bitboard<W> {
        let royal = board.royal & board.bbc[side.index()];
        let opp = side.flip();
        let occ = board.occupied();
        let mut pinned = Bitboard::EMPTY;

        let mut enemies = board.bbc[opp.index()];
        while !enemies.is_empty() {
            let e_sq = enemies.pop();
            let piece = board.get_piece(e_sq);
            let flags = variant.pieces[piece.index()].capture_flags;
            if !flags.needs_occupancy() {
                continue;
            }
            for r_sq in royal.iter() {
                if flags.is_slider() || flags.is_rider() {
                    if !self.ray_enabled(flags, e_sq, r_sq) {
                        continue;
                    }
                    let ray = self.connecting_ray(flags, e_sq, r_sq);
                    if ray.is_empty() {
                        continue;
                    }
                    let blockers = ray & occ;
                    let own = ray & board.bbc[side.index()];
                    if blockers == own && own.onebit() {
                        pinned |= own;
                    }
                }
                if flags.is_hopper() {
                    if !self.ray_enabled(
                        MoveFlags(flags.hopper_dirs()),
                        e_sq,
                        r_sq,
                    ) {
                        continue;
                    }
                    let ray = self.geo.between(e_sq, r_sq);
                    let blockers = ray & occ;
                    let own = ray & board.bbc[side.index()];
                    if blockers.twobit() && !own.is_empty() {
                        pinned |= own;
                    }
                }
                if flags.is_lame_leaper() {
                    // A piece whose removal would expose the royal to the
                    // lame leaper is doing the blocking.
                    if self
                        .leaper_moves(flags, opp, e_sq, occ)
                        .test(r_sq)
                    {
                        continue;
                    }
                    let mut candidates =
                        self.leaper_first_leg(flags, opp, e_sq) & board.bbc[side.index()] & occ;
                    while !candidates.is_empty() {
                        let c = candidates.pop();
                        let without = occ & !Bitboard::from_square(c);
                        if self.leaper_moves(flags, opp, e_sq, without).test(r_sq) {
                            pinned.set(c);
                        }
                    }
                }
            }
        }
        pinned & !royal
    }

    fn leaper_first_leg(&self, flags: MoveFlags, side: Side, from: Square) -> Bitboard<W> {
        let index = flags.leaper_index();
        if flags.is_asymm_leaper() {
            self.aleaper[side.index()][index - 1][from.index()]
        } else {
            self.leaper[index - 1][from.index()]
        }
    }

    /// Does a slider/rider word include the ray family that connects the two
    /// squares?
    fn ray_enabled(&self, flags: MoveFlags, a: Square, b: Square) -> bool {
        if flags.is_rider() {
            return true; // rider rays are validated by the precomputed table
        }
        let geo = &self.geo;
        let dirs = flags.slider_dirs();
        if geo.rank_of(a) == geo.rank_of(b) {
            return dirs & MoveFlags::SLIDER_H != 0;
        }
        if geo.file_of(a) == geo.file_of(b) {
            return dirs & MoveFlags::SLIDER_V != 0;
        }
        if geo.diagonal_nr[a.index()] == geo.diagonal_nr[b.index()] {
            return dirs & MoveFlags::SLIDER_D != 0;
        }
        if geo.antidiagonal_nr[a.index()] == geo.antidiagonal_nr[b.index()] {
            return dirs & MoveFlags::SLIDER_A != 0;
        }
        false
    }

    /// Was the move just made a checking move? Called after `make`, with the
    /// side to move being the side that may now stand in check.
    #[must_use]
    pub fn was_checking_move(&self, variant: &Variant<W>, board: &Board<W>) -> bool {
        self.player_in_check(variant, board, board.side_to_move)
    }

    /// After `make`, record check state and shak marks on the board.
    pub fn update_check_state(&self, variant: &Variant<W>, board: &mut Board<W>) {
        let side = board.side_to_move;
        let check = self.player_in_check(variant, board, side);
        board.set_check(check);
        if check && variant.rules.contains(RuleFlags::USE_SHAKMATE) {
            let royal = board.royal & board.bbc[side.index()];
            let checkers = self.attackers_of(
                variant,
                board,
                royal,
                side.flip(),
                board.occupied(),
            );
            for sq in checkers.iter() {
                let piece = board.get_piece(sq);
                if variant.pieces[piece.index()]
                    .flags
                    .contains(PieceFlags::SHAK)
                {
                    board.mark_shak();
                    break;
                }
            }
        }
    }
}
