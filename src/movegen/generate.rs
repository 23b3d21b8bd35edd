//! Pseudo-legal move generation, check evasions and the staged driver.
//!
//! Moves produced here satisfy movement rules but not king safety; the
//! search filters them by make / in-check / unmake, so every legality rule
//! lives in exactly one place.

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::{Bitboard, Side, Square};
use crate::moves::{Move, MoveList};
use crate::pieces::{MoveFlags, PieceFlags, PieceId};
use crate::variant::{RuleFlags, Variant};

use super::MoveGen;

/// What subset of moves to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenMode {
    /// Everything pseudo-legal.
    All,
    /// Captures, promotions and (in drop games) checking drops near the
    /// enemy king; everything when in check.
    Quiescence,
}

/// Stages of the mate-search generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    DropCheck,
    MoveCheck,
    Evade,
    Done,
}

impl<W: BitWord> MoveGen<W> {
    /// Write the pseudo-legal moves of `side` into `list`.
    pub fn generate_moves(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
        mode: GenMode,
    ) {
        list.clear();
        let in_check = board.in_check() && side == board.side_to_move;

        if in_check && (board.royal & board.bbc[side.index()]).onebit() {
            self.generate_evasion_candidates(variant, board, side, list);
            self.apply_forced_capture(variant, list);
            return;
        }

        // Drops come first; under forced drops they are the whole move set
        if variant.rules.intersects(RuleFlags::ALLOW_DROPS | RuleFlags::FORCE_DROPS) {
            self.generate_drops(variant, board, side, list, mode);
            if variant.rules.contains(RuleFlags::FORCE_DROPS) && !list.is_empty() {
                return;
            }
        }

        if variant.rules.contains(RuleFlags::ALLOW_PICKUP) && !in_check && mode == GenMode::All {
            self.generate_pickups(variant, board, side, list);
        }

        if variant.rules.contains(RuleFlags::PROMOTE_IN_PLACE) && mode == GenMode::All {
            self.generate_in_place_promotions(variant, board, side, list);
        }

        self.generate_board_moves(variant, board, side, list, mode);
        self.generate_castles(variant, board, side, list, mode);

        if variant.rules.contains(RuleFlags::GATE_DROPS) {
            self.add_gating_moves(variant, board, side, list);
        }

        self.apply_forced_capture(variant, list);
    }

    // ------------------------------------------------------------------
    // Drops
    // ------------------------------------------------------------------

    fn generate_drops(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
        mode: GenMode,
    ) {
        let occupied = board.occupied();
        let s = side.index();

        // In quiescence only drops that bother the enemy king are loud
        let quiesce_zone = if mode == GenMode::Quiescence {
            let mut zone = Bitboard::EMPTY;
            for sq in (board.royal & board.bbc[side.flip().index()]).iter() {
                zone |= self.geo.king_zone[sq.index()];
                zone |= self.super_all[sq.index()];
            }
            zone
        } else {
            self.geo.all
        };

        for p in 0..variant.pieces.len() {
            if board.holdings[p][s] <= 0 {
                continue;
            }
            let piece = PieceId(p as u8);
            let desc = &variant.pieces[p];
            let mut zone =
                desc.drop_zone[s] & !occupied & desc.prison[s] & self.geo.all & quiesce_zone;

            if !desc.flags.contains(PieceFlags::DROP_DEAD) {
                zone &= !variant.dead_zone[p][s];
            }

            if desc.flags.contains(PieceFlags::DROP_ONE_FILE) {
                let own = board.bbp[p] & board.bbc[s];
                for f in 0..self.geo.files {
                    if (own & self.geo.file[f]).popcount() >= u32::from(desc.drop_file_max) {
                        zone &= !self.geo.file[f];
                    }
                }
            }

            for to in zone.iter() {
                list.push(Move::drop(piece, side, to));
                if variant.rules.contains(RuleFlags::PROMOTE_ON_DROP) {
                    for row in &desc.promotion {
                        if !row.zone[s].test(to) {
                            continue;
                        }
                        for t in variant.choice_pieces(row.choice) {
                            list.push(Move::drop_promoted(piece, t, side, to));
                        }
                    }
                }
            }
        }
    }

    fn generate_pickups(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
    ) {
        let mut own = board.bbc[side.index()] & !board.royal;
        while !own.is_empty() {
            let from = own.pop();
            let piece = board.get_piece(from);
            let demoted = variant.pieces[piece.index()].demotion;
            list.push(Move::pickup_as(piece, demoted, side, from));
        }
    }

    fn generate_in_place_promotions(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
    ) {
        let s = side.index();
        let mut own = board.bbc[s];
        while !own.is_empty() {
            let from = own.pop();
            let piece = board.get_piece(from);
            let desc = &variant.pieces[piece.index()];
            for row in &desc.promotion {
                if !row.zone[s].test(from) {
                    continue;
                }
                for t in variant.choice_pieces(row.choice) {
                    if board.piece_count(t, side)
                        >= u32::from(variant.pieces[t.index()].max_count[s])
                    {
                        continue;
                    }
                    list.push(Move::promotion(piece, side, from, from, t));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Board moves
    // ------------------------------------------------------------------

    fn generate_board_moves(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
        mode: GenMode,
    ) {
        let s = side.index();
        let opp = side.flip();
        let occupied = board.occupied();
        let in_check = board.in_check() && side == board.side_to_move;

        let mut movers = board.bbc[s];
        while !movers.is_empty() {
            let from = movers.pop();
            let piece = board.get_piece(from);
            let desc = &variant.pieces[piece.index()];

            let in_special = desc.special_zone[s].test(from)
                && (!variant.rules.contains(RuleFlags::SPECIAL_IS_INIT)
                    || board.init.test(from));
            let is_initial = board.init.test(from);
            let move_flags = desc.effective_move_flags(in_special, is_initial);
            let occ = occupied | desc.block[s];

            let mut quiet_dests = self.moves_for_flags(move_flags, side, from, occ)
                & !occupied
                & desc.prison[s];
            if mode == GenMode::Quiescence && !in_check {
                // Only quiet moves that promote stay loud
                let mut promo_zone = Bitboard::EMPTY;
                for row in &desc.promotion {
                    promo_zone |= row.zone[s];
                }
                quiet_dests &= promo_zone;
            }
            if desc.flags.contains(PieceFlags::NO_RETURN) {
                quiet_dests.reset(from);
            }

            let mut capture_dests = self.moves_for_flags(desc.capture_flags, side, from, occ)
                & board.bbc[opp.index()]
                & desc.prison[s];
            if !board.retaliate_ok() {
                capture_dests = Bitboard::EMPTY;
            }

            for to in quiet_dests.iter() {
                self.emit_move(variant, board, side, piece, from, to, None, list, mode);
            }
            for to in capture_dests.iter() {
                let victim = board.get_piece(to);
                let victim_desc = &variant.pieces[victim.index()];
                if victim_desc.flags.contains(PieceFlags::IRON) {
                    continue;
                }
                if desc.allowed_victims & victim.bit() == 0 {
                    continue;
                }
                self.emit_move(variant, board, side, piece, from, to, Some(to), list, mode);
            }

            // Lion-style second capture from the landing square
            if variant.rules.contains(RuleFlags::MULTI_CAPTURE)
                && desc.capture_flags.is_double_leaper()
            {
                self.emit_double_captures(variant, board, side, piece, from, list);
            }

            // Promotion by moving as the target piece
            if variant.rules.contains(RuleFlags::PROMOTE_BY_MOVE)
                && desc.promotion_choice != 0
                && mode == GenMode::All
            {
                self.emit_promote_by_move(variant, board, side, piece, from, list);
            }

            // En passant: the destination is the ep cell, the victim sits
            // elsewhere
            if desc.flags.contains(PieceFlags::TAKE_EP) && !board.ep.is_empty() {
                if let Some(victim_sq) = board.ep_victim {
                    let ep_hits =
                        self.moves_for_flags(desc.capture_flags, side, from, occ) & board.ep;
                    for to in ep_hits.iter() {
                        let mut mv = Move::capture_ep(piece, from, to, victim_sq);
                        mv = self.holdings_for_capture(variant, board, side, victim_sq, mv);
                        list.push(mv);
                    }
                }
            }
        }
    }

    /// Emit one move from `from` to `to`, expanding promotion possibilities.
    #[allow(clippy::too_many_arguments)]
    fn emit_move(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        piece: PieceId,
        from: Square,
        to: Square,
        capture_sq: Option<Square>,
        list: &mut MoveList,
        mode: GenMode,
    ) {
        let s = side.index();
        let desc = &variant.pieces[piece.index()];

        let mut choice = 0u32;
        let mut in_zone = false;
        if desc.entry_promotion_zone[s].is_empty() || desc.entry_promotion_zone[s].test(from) {
            for row in &desc.promotion {
                if row.zone[s].test(to)
                    || (variant.rules.contains(RuleFlags::PROMOTE_IN_PLACE) && row.zone[s].test(from))
                {
                    choice |= row.choice;
                    in_zone = true;
                }
            }
        }

        // An assimilating capturer takes over the victim's type
        if let Some(victim_sq) = capture_sq {
            if desc.flags.contains(PieceFlags::ASSIMILATE)
                && variant.rules.contains(RuleFlags::VICTIM_SIDEEFFECT)
            {
                let victim = board.get_piece(victim_sq);
                if victim != piece {
                    let mv = Move::capture_promotion(piece, side, from, to, victim);
                    list.push(self.holdings_for_capture(variant, board, side, victim_sq, mv));
                    return;
                }
            }
        }

        let base = match capture_sq {
            Some(victim_sq) => {
                let mv = Move::capture_ep(piece, from, to, victim_sq);
                self.holdings_for_capture(variant, board, side, victim_sq, mv)
            }
            None => {
                let mut mv = Move::normal(piece, from, to);
                if desc.flags.contains(PieceFlags::SET_EP)
                    && !self.geo.between(from, to).is_empty()
                    && self.geo.file_of(from) == self.geo.file_of(to)
                {
                    mv = mv.with_set_enpassant();
                }
                if desc.is_pawn() {
                    mv = mv.with_reset50();
                }
                mv
            }
        };

        // The last piece still able to promote may pick any target
        if desc.flags.contains(PieceFlags::PROMOTE_WILD)
            && in_zone
            && (board.bbp[piece.index()] & board.bbc[s]).onebit()
        {
            for (t, target) in variant.pieces.iter().enumerate() {
                if !target.is_royal() {
                    choice |= 1 << t;
                }
            }
        }

        if in_zone && choice != 0 {
            let optional = desc.optional_promotion_zone[s].test(to);
            let dead_after = variant.dead_zone[piece.index()][s].test(to);
            let mut promoted_any = false;
            for t in variant.choice_pieces(choice) {
                if board.piece_count(t, side) >= u32::from(variant.pieces[t.index()].max_count[s]) {
                    continue;
                }
                let mv = match capture_sq {
                    Some(victim_sq) => {
                        let m = Move::capture_promotion(piece, side, from, to, t);
                        self.holdings_for_capture(variant, board, side, victim_sq, m)
                    }
                    None => Move::promotion(piece, side, from, to, t),
                };
                list.push(mv);
                promoted_any = true;
            }
            // The non-promoting copy survives in optional zones (unless the
            // piece would be dead on arrival), and as a fallback when every
            // promotion target is at its maximum
            if (optional && !dead_after && mode == GenMode::All) || !promoted_any {
                list.push(base);
            }
        } else {
            list.push(base);
        }
    }

    /// Moves made with the target piece's movement that end as a promotion.
    fn emit_promote_by_move(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        piece: PieceId,
        from: Square,
        list: &mut MoveList,
    ) {
        let s = side.index();
        let desc = &variant.pieces[piece.index()];
        let occupied = board.occupied();
        for row in &desc.promotion {
            if !row.zone[s].test(from) {
                continue;
            }
            for t in variant.choice_pieces(row.choice) {
                let target = &variant.pieces[t.index()];
                if board.piece_count(t, side) >= u32::from(target.max_count[s]) {
                    continue;
                }
                let occ = occupied | target.block[s];
                let quiet = self.moves_for_flags(target.move_flags, side, from, occ)
                    & !occupied
                    & target.prison[s];
                for to in quiet.iter() {
                    list.push(Move::promotion(piece, side, from, to, t));
                }
                let caps = self.moves_for_flags(target.capture_flags, side, from, occ)
                    & board.bbc[side.flip().index()]
                    & target.prison[s];
                for to in caps.iter() {
                    let victim = board.get_piece(to);
                    if variant.pieces[victim.index()].flags.contains(PieceFlags::IRON) {
                        continue;
                    }
                    let mv = Move::capture_promotion(piece, side, from, to, t);
                    list.push(self.holdings_for_capture(variant, board, side, to, mv));
                }
            }
        }
    }

    fn emit_double_captures(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        piece: PieceId,
        from: Square,
        list: &mut MoveList,
    ) {
        let desc = &variant.pieces[piece.index()];
        let opp = side.flip();
        let occ = board.occupied() | desc.block[side.index()];
        let first_leg = self.leaper_first_leg_targets(desc.capture_flags, side, from);
        let mut victims1 = first_leg & board.bbc[opp.index()];
        while !victims1.is_empty() {
            let mid = victims1.pop();
            let second = self.leaper_second_leg_targets(desc.capture_flags, mid);
            let mut victims2 = second & board.bbc[opp.index()] & desc.prison[side.index()];
            while !victims2.is_empty() {
                let to = victims2.pop();
                if to == from {
                    continue;
                }
                let full = self.leaper_moves(desc.capture_flags, side, from, occ);
                if !full.test(to) {
                    continue;
                }
                list.push(Move::double_capture(piece, from, to, mid));
            }
        }
    }

    /// Captured pieces may enter a hand, demoted, depending on the rules.
    fn holdings_for_capture(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        victim_sq: Square,
        mv: Move,
    ) -> Move {
        let victim = board.get_piece(victim_sq);
        let demoted = variant.pieces[victim.index()].demotion;
        if variant.rules.contains(RuleFlags::KEEP_CAPTURE) {
            mv.with_holdings(demoted, side, 1)
        } else if variant.rules.contains(RuleFlags::RETURN_CAPTURE) {
            mv.with_holdings(demoted, side.flip(), 1)
        } else {
            mv
        }
    }

    // ------------------------------------------------------------------
    // Castling
    // ------------------------------------------------------------------

    fn generate_castles(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
        mode: GenMode,
    ) {
        if mode == GenMode::Quiescence {
            return;
        }
        let occupied = board.occupied();
        for rule in &self.castles {
            if rule.side != side {
                continue;
            }
            if !board.init.test(rule.king_from) || !board.init.test(rule.rook_from) {
                continue;
            }
            let Some((king, king_side)) = board.piece_at(rule.king_from) else {
                continue;
            };
            if king_side != side
                || !variant.pieces[king.index()]
                    .flags
                    .contains(PieceFlags::CASTLE)
            {
                continue;
            }

            let participants =
                Bitboard::from_square(rule.king_from) | Bitboard::from_square(rule.rook_from);
            if !(rule.free & occupied & !participants).is_empty() {
                continue;
            }

            // Every square on the king's path must be safe, origin included
            let occ_no_king = occupied & !Bitboard::from_square(rule.king_from);
            let mut safe = true;
            for sq in rule.safe.iter() {
                if self.any_attack_on(
                    variant,
                    board,
                    Bitboard::from_square(sq),
                    side.flip(),
                    occ_no_king,
                ) {
                    safe = false;
                    break;
                }
            }
            if !safe {
                continue;
            }

            list.push(Move::castle(
                king,
                rule.king_from,
                rule.king_to,
                rule.rook_from,
                rule.rook_to,
            ));
        }
    }

    // ------------------------------------------------------------------
    // Gating
    // ------------------------------------------------------------------

    fn add_gating_moves(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
    ) {
        let s = side.index();
        let back_rank = if side == Side::White {
            self.geo.rank[0]
        } else {
            self.geo.rank[self.geo.ranks - 1]
        };
        let gate_squares = back_rank & board.init & board.bbc[s];
        if gate_squares.is_empty() {
            return;
        }

        let holdings: Vec<PieceId> = (0..variant.pieces.len())
            .filter(|&p| board.holdings[p][s] > 0)
            .map(|p| PieceId(p as u8))
            .collect();
        if holdings.is_empty() {
            return;
        }

        let mut gated = Vec::new();
        for &mv in list.iter() {
            if mv.is_drop() || mv.is_pickup() || mv.has_holdings() {
                continue;
            }
            if mv.swaps() == 0 {
                continue;
            }
            let from = mv.from();
            if gate_squares.test(from) {
                for &q in &holdings {
                    gated.push(mv.with_gate(q, side, from));
                }
            }
            // A castle vacates the partner square too
            if mv.is_castle() {
                let (rook_from, rook_to) = mv.swap_squares(1);
                if gate_squares.test(rook_from) && rook_from != mv.to() && rook_to != rook_from {
                    for &q in &holdings {
                        gated.push(mv.with_gate(q, side, rook_from));
                    }
                }
            }
        }
        for mv in gated {
            list.push(mv);
        }
    }

    // ------------------------------------------------------------------
    // Forced capture
    // ------------------------------------------------------------------

    fn apply_forced_capture(&self, variant: &Variant<W>, list: &mut MoveList) {
        if !variant.rules.contains(RuleFlags::FORCE_CAPTURE) {
            return;
        }
        if list.iter().any(|m| m.is_capture()) {
            list.retain(|m| m.is_capture());
        }
    }

    // ------------------------------------------------------------------
    // Evasions
    // ------------------------------------------------------------------

    /// Candidate check evasions: royal retreats, checker captures,
    /// interpositions (moves and drops onto the checking rays), and screen
    /// evacuations for hopper checks. A superset of the legal evasions;
    /// make/in-check/unmake filters the rest.
    pub fn generate_evasion_candidates(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
    ) {
        let royal = board.royal & board.bbc[side.index()];
        let checkers = self.checkers(variant, board, side);
        let double_check = checkers.popcount() > 1;

        // The union of rays between checkers and royal; landing there can
        // block, and a hopper's screen lives there too
        let mut rays = Bitboard::EMPTY;
        let mut screens = Bitboard::EMPTY;
        for c in checkers.iter() {
            let piece = board.get_piece(c);
            let flags = variant.pieces[piece.index()].capture_flags;
            for r in royal.iter() {
                let ray = if flags.is_rider() {
                    self.connecting_ray(flags, c, r)
                } else {
                    self.geo.between(c, r)
                };
                rays |= ray;
                if flags.is_hopper() {
                    screens |= ray & board.occupied();
                }
            }
        }

        let mut full = MoveList::new();
        self.generate_all_ignoring_check(variant, board, side, &mut full);

        for &mv in full.iter() {
            let keep = if mv.is_drop() {
                !double_check && rays.test(mv.to())
            } else if mv.is_pickup() {
                false
            } else {
                let from = mv.from();
                let mover_is_royal = royal.test(from);
                if double_check {
                    mover_is_royal
                } else {
                    mover_is_royal
                        || (mv.is_capture() && checkers.test(mv.capture_square()))
                        || rays.test(mv.to())
                        || screens.test(from)
                }
            };
            if keep {
                list.push(mv);
            }
        }
    }

    /// Full pseudo-legal generation without the evasion shortcut; used by the
    /// evasion filter and by the staged generator.
    fn generate_all_ignoring_check(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
    ) {
        if variant.rules.intersects(RuleFlags::ALLOW_DROPS | RuleFlags::FORCE_DROPS) {
            self.generate_drops(variant, board, side, list, GenMode::All);
        }
        if variant.rules.contains(RuleFlags::PROMOTE_IN_PLACE) {
            self.generate_in_place_promotions(variant, board, side, list);
        }
        self.generate_board_moves(variant, board, side, list, GenMode::All);
        if variant.rules.contains(RuleFlags::GATE_DROPS) {
            self.add_gating_moves(variant, board, side, list);
        }
    }
}

/// Staged move emission for the mate sub-search: checking drops, then
/// checking board moves, then (on the defending side) evasions.
pub struct StagedMoves {
    pub stage: Stage,
    list: MoveList,
    cursor: usize,
}

impl StagedMoves {
    #[must_use]
    pub fn attacking() -> Self {
        StagedMoves {
            stage: Stage::DropCheck,
            list: MoveList::new(),
            cursor: 0,
        }
    }

    #[must_use]
    pub fn defending() -> Self {
        StagedMoves {
            stage: Stage::Evade,
            list: MoveList::new(),
            cursor: 0,
        }
    }

    /// Next candidate move, refilling from the following stage when the
    /// current one runs dry.
    pub fn next<W: BitWord>(
        &mut self,
        gen: &MoveGen<W>,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
    ) -> Option<Move> {
        loop {
            if self.cursor < self.list.len() {
                let mv = self.list.get(self.cursor);
                self.cursor += 1;
                return mv;
            }
            self.cursor = 0;
            self.list.clear();
            match self.stage {
                Stage::DropCheck => {
                    self.stage = Stage::MoveCheck;
                    gen.generate_checking_drops(variant, board, side, &mut self.list);
                }
                Stage::MoveCheck => {
                    self.stage = Stage::Done;
                    gen.generate_checking_board_moves(variant, board, side, &mut self.list);
                }
                Stage::Evade => {
                    self.stage = Stage::Done;
                    if board.in_check() {
                        gen.generate_evasion_candidates(variant, board, side, &mut self.list);
                    } else {
                        gen.generate_moves(variant, board, side, &mut self.list, GenMode::All);
                    }
                }
                Stage::Done => return None,
            }
        }
    }
}

impl<W: BitWord> MoveGen<W> {
    /// Drops that give check: the dropped piece attacks a royal from its
    /// landing square (drops never discover checks).
    pub fn generate_checking_drops(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
    ) {
        if !variant.rules.intersects(RuleFlags::ALLOW_DROPS | RuleFlags::FORCE_DROPS) {
            return;
        }
        let mut drops = MoveList::new();
        self.generate_drops(variant, board, side, &mut drops, GenMode::All);
        let enemy_royal = board.royal & board.bbc[side.flip().index()];
        for &mv in drops.iter() {
            let (piece, _, to) = mv.drop_slot(0);
            let occ = board.occupied() | Bitboard::from_square(to);
            if !(self.attacks_from(variant, piece, side, to, occ) & enemy_royal).is_empty() {
                list.push(mv);
            }
        }
    }

    /// Board moves that give check, found by make / check / unmake.
    pub fn generate_checking_board_moves(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
        list: &mut MoveList,
    ) {
        let mut all = MoveList::new();
        let mut scratch = board.clone();
        let mut ui = crate::board::UnmakeInfo::default();
        self.generate_board_moves(variant, board, side, &mut all, GenMode::All);
        for &mv in all.iter() {
            if mv.is_drop() {
                continue;
            }
            scratch.make(variant, mv, &mut ui);
            let checks = self.player_in_check(variant, &scratch, side.flip());
            scratch.unmake(variant, mv, &ui);
            if checks {
                list.push(mv);
            }
        }
    }

    /// First-leg destinations of a (double) leaper word.
    fn leaper_first_leg_targets(&self, flags: MoveFlags, side: Side, from: Square) -> Bitboard<W> {
        let index = flags.leaper_index();
        if flags.is_asymm_leaper() {
            self.aleaper[side.index()][index - 1][from.index()]
        } else {
            self.leaper[index - 1][from.index()]
        }
    }

    fn leaper_second_leg_targets(&self, flags: MoveFlags, mid: Square) -> Bitboard<W> {
        let index = flags.leaper_index2();
        self.leaper[index - 1][mid.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::variants;

    fn position(fen: &str) -> (crate::variant::Variant<u64>, Board<u64>) {
        let variant = variants::chess::<u64>().expect("chess");
        let mut board = Board::new();
        crate::fen::setup_fen(&variant, &mut board, fen, false).expect("fen");
        (variant, board)
    }

    #[test]
    fn test_forced_capture_filters_quiets() {
        let (mut variant, board) = position("4k3/8/5p2/8/4N3/8/8/4K3 w - - 0 1");
        variant.rules.insert(RuleFlags::FORCE_CAPTURE);
        let mut list = MoveList::new();
        variant
            .movegen
            .generate_moves(&variant, &board, Side::White, &mut list, GenMode::All);
        assert!(!list.is_empty());
        assert!(list.iter().all(|m| m.is_capture()), "captures are mandatory");
    }

    #[test]
    fn test_forced_capture_falls_back_to_all_moves() {
        let (mut variant, board) = position("4k3/8/8/8/4N3/8/8/4K3 w - - 0 1");
        variant.rules.insert(RuleFlags::FORCE_CAPTURE);
        let mut list = MoveList::new();
        variant
            .movegen
            .generate_moves(&variant, &board, Side::White, &mut list, GenMode::All);
        assert!(list.iter().any(|m| !m.is_capture()));
    }

    #[test]
    fn test_drop_one_per_file_restriction() {
        let mut variant = variants::crazyhouse::<u64>().expect("crazyhouse");
        let pawn = variant.piece_by_notation('P').expect("pawn");
        variant.pieces[pawn.index()]
            .flags
            .insert(PieceFlags::DROP_ONE_FILE);
        let mut board = Board::new();
        crate::fen::setup_fen(
            &variant,
            &mut board,
            "4k3/8/8/8/8/4P3/8/4K3[P] w - - 0 1",
            false,
        )
        .expect("fen");

        let mut list = MoveList::new();
        variant
            .movegen
            .generate_moves(&variant, &board, Side::White, &mut list, GenMode::All);
        let geo = variant.geo();
        let drops: Vec<Move> = list.iter().copied().filter(|m| m.is_drop()).collect();
        assert!(!drops.is_empty());
        // The e-file already carries a pawn, so no drop lands there
        assert!(drops.iter().all(|m| geo.file_of(m.to()) != 4));
    }

    #[test]
    fn test_quiescence_keeps_only_loud_moves() {
        let (variant, board) =
            position("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let mut loud = MoveList::new();
        variant
            .movegen
            .generate_moves(&variant, &board, Side::White, &mut loud, GenMode::Quiescence);
        assert!(loud.iter().all(|m| m.is_capture() || m.is_promotion()));
        assert!(loud.iter().any(|m| m.is_capture()));
    }

    #[test]
    fn test_evasions_cover_block_capture_and_retreat() {
        // White king on e1 checked by a rook on e8; the bishop can block,
        // the rook can be captured by nothing, the king can sidestep
        let (variant, board) = position("4r1k1/8/8/8/8/8/3B4/4K3 w - - 0 1");
        let mut list = MoveList::new();
        variant
            .movegen
            .generate_moves(&variant, &board, Side::White, &mut list, GenMode::All);
        let geo = variant.geo();
        // Block on e3 via Be3 must be among the candidates
        let e3 = geo.parse_square("e3").expect("e3");
        assert!(list.iter().any(|m| !m.is_drop() && m.to() == e3));
        // King retreats off the file are there too
        let d1 = geo.parse_square("d1").expect("d1");
        assert!(list.iter().any(|m| !m.is_drop() && m.to() == d1));
        // And nothing unrelated slips in
        for m in list.iter() {
            let from = m.from();
            let mover_is_king = board.royal.test(from);
            let blocks = geo.file_of(m.to()) == 4;
            assert!(mover_is_king || blocks, "unrelated move {m:?}");
        }
    }

    #[test]
    fn test_staged_generator_emits_checks_then_stops() {
        let (variant, board) = position("4k3/8/8/8/8/8/R7/4K3 w - - 0 1");
        let mut stage = StagedMoves::attacking();
        let mut checks = Vec::new();
        let mut scratch = board.clone();
        let mut ui = crate::board::UnmakeInfo::default();
        while let Some(mv) = stage.next(&variant.movegen, &variant, &board, Side::White) {
            scratch.make(&variant, mv, &mut ui);
            let gives = variant
                .movegen
                .player_in_check(&variant, &scratch, Side::Black);
            scratch.unmake(&variant, mv, &ui);
            assert!(gives, "stage emitted a non-check {mv:?}");
            checks.push(mv);
        }
        // Ra8+ and Re2+ at least
        assert!(checks.len() >= 2);
        assert_eq!(stage.stage, Stage::Done);
    }
}
