//! Static evaluation.
//!
//! A single function scores the position from the side-to-move perspective
//! in centipawns: material with in-hand discounts, derived piece-square
//! tables, mobility against a safe-square mask, pawn structure, king safety,
//! mate-potential gating with a mop-up term, a tempo bonus for drop games,
//! a fifty-move taper and a small hash-keyed opening perturbation. Scores
//! are cached in a compact two-bucket hash.

mod king_safety;
pub(crate) mod mate;
mod pawns;
mod pst;

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::{Bitboard, Side};
use crate::pieces::{PieceClass, PieceFlags};
use crate::variant::{RuleFlags, Variant};
use crate::zobrist::hash_mix;

/// Phase never drops below this, so late-game tables stay tame.
pub const GAME_PHASE_FLOOR: i32 = 2;

/// Finish the variant's evaluation tables; called from `finalize`.
pub(crate) fn finalize_variant<W: BitWord>(variant: &mut Variant<W>) {
    variant.pst = pst::build_pst(variant);
    mate::analyse(variant);

    let mut phase = 0;
    for &(_, piece, _) in &variant.start_placement {
        let desc = &variant.pieces[piece.index()];
        if !desc.is_royal() && !desc.is_pawn() {
            phase += desc.phase_weight;
        }
    }
    variant.game_phase_max = phase.max(GAME_PHASE_FLOOR);
}

/// Two-bucket evaluation cache. An entry packs the upper 48 bits of the key
/// with a 16-bit score into one word, the key half doubling as the lock.
struct EvalHash {
    table: Vec<[u64; 2]>,
    mask: usize,
}

impl EvalHash {
    fn new(entries: usize) -> Self {
        let n = entries.next_power_of_two().max(1024);
        EvalHash {
            table: vec![[0; 2]; n],
            mask: n - 1,
        }
    }

    #[inline]
    fn probe(&self, hash: u64) -> Option<i32> {
        let bucket = &self.table[(hash as usize) & self.mask];
        let lock = hash & !0xFFFF;
        for &entry in bucket {
            if entry & !0xFFFF == lock && entry != 0 {
                return Some(entry as u16 as i16 as i32);
            }
        }
        None
    }

    #[inline]
    fn store(&mut self, hash: u64, score: i32) {
        let bucket = &mut self.table[(hash as usize) & self.mask];
        let entry = (hash & !0xFFFF) | u64::from(score.clamp(-32000, 32000) as i16 as u16);
        bucket[1] = bucket[0];
        bucket[0] = entry;
    }
}

/// Evaluator state: the cache and the per-game randomness seed.
pub struct Eval {
    hash: EvalHash,
    pub game_seed: u64,
}

impl Eval {
    #[must_use]
    pub fn new(hash_bytes: usize) -> Self {
        Eval {
            hash: EvalHash::new(hash_bytes / 16),
            game_seed: 0,
        }
    }

    pub fn clear(&mut self) {
        for bucket in self.hash.table.iter_mut() {
            *bucket = [0; 2];
        }
    }

    /// Centipawn score from the side-to-move perspective.
    pub fn static_eval<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &Board<W>,
        moves_played: u32,
    ) -> i32 {
        if let Some(score) = self.hash.probe(board.hash) {
            return score;
        }

        let stm = board.side_to_move;
        let phase_max = variant.game_phase_max.max(GAME_PHASE_FLOOR);
        let mut phase = 0i32;

        // Material + PST, (mg, eg) per side
        let mut mg = [0i32; 2];
        let mut eg = [0i32; 2];
        let mut nonroyal_count = [0i32; 2];

        for side in [Side::White, Side::Black] {
            let s = side.index();
            for (p, desc) in variant.pieces.iter().enumerate() {
                let bb = board.bbp[p] & board.bbc[s];
                for sq in bb.iter() {
                    mg[s] += desc.value.0;
                    eg[s] += desc.value.1;
                    let (pmg, peg) = variant.pst[p][s][sq.index()];
                    mg[s] += i32::from(pmg);
                    eg[s] += i32::from(peg);
                    if !desc.is_royal() {
                        nonroyal_count[s] += 1;
                        if !desc.is_pawn() {
                            phase += desc.phase_weight;
                        }
                    }
                }
                // Owning the pair (bishops, mostly) is worth a little extra
                if desc.flags.contains(PieceFlags::PAIR_BONUS) && bb.popcount() >= 2 {
                    mg[s] += 20;
                    eg[s] += 35;
                }

                // In-hand material at a phase-dependent discount; gated
                // drops count nearly full since they enter on demand
                let held = i32::from(board.holdings[p][s].max(0));
                if held > 0 {
                    let (num_mg, num_eg) = if variant.rules.contains(RuleFlags::GATE_DROPS) {
                        (19, 18)
                    } else {
                        (18, 15)
                    };
                    mg[s] += held * desc.value.0 * num_mg / 20;
                    eg[s] += held * desc.value.1 * num_eg / 20;
                    if !desc.is_royal() && !desc.is_pawn() {
                        phase += held * desc.phase_weight;
                    }
                    nonroyal_count[s] += held;
                }
            }
        }

        // Mate-potential gating
        let can_win = [
            side_can_win(variant, board, Side::White),
            side_can_win(variant, board, Side::Black),
        ];
        if !can_win[0] && !can_win[1] {
            self.hash.store(board.hash, 0);
            return 0;
        }

        // Mobility, pawns and king safety
        let structure = pawns::analyse(variant, board);
        for side in [Side::White, Side::Black] {
            let s = side.index();
            let (m_mg, m_eg) = mobility(variant, board, side);
            mg[s] += m_mg;
            eg[s] += m_eg;
            let (p_mg, p_eg) = pawns::score(variant, board, &structure, side);
            mg[s] += p_mg;
            eg[s] += p_eg;
            let (k_mg, k_eg) = king_safety::score(variant, board, &structure, side);
            mg[s] += k_mg;
            eg[s] += k_eg;
        }

        // A side that cannot mate keeps only its placement score
        for side in [Side::White, Side::Black] {
            let s = side.index();
            if !can_win[s] {
                let mut pst_only_mg = 0i32;
                let mut pst_only_eg = 0i32;
                for (p, _) in variant.pieces.iter().enumerate() {
                    let bb = board.bbp[p] & board.bbc[s];
                    for sq in bb.iter() {
                        let (pmg, peg) = variant.pst[p][s][sq.index()];
                        pst_only_mg += i32::from(pmg);
                        pst_only_eg += i32::from(peg);
                    }
                }
                mg[s] = pst_only_mg;
                eg[s] = pst_only_eg;
            }
        }

        // Mop-up: drive a bare king towards a usable corner
        for side in [Side::White, Side::Black] {
            let s = side.index();
            let o = 1 - s;
            if can_win[s] && nonroyal_count[o] == 0 && nonroyal_count[s] > 0 {
                let bonus = mop_up(variant, board, side);
                mg[s] += bonus;
                eg[s] += bonus;
            }
        }

        // Phase taper; variants that recycle captures never leave the opening
        let phase = if variant.rules.intersects(RuleFlags::USE_CAPTURE) {
            phase_max
        } else {
            phase.clamp(GAME_PHASE_FLOOR, phase_max)
        };
        let white_score = (mg[0] - mg[1]) * phase / phase_max
            + (eg[0] - eg[1]) * (phase_max - phase) / phase_max;

        let mut score = if stm == Side::White {
            white_score
        } else {
            -white_score
        };

        // Tempo for the side to move in drop games: hand material is energy
        let mut tempo = 0;
        if variant
            .rules
            .intersects(RuleFlags::ALLOW_DROPS | RuleFlags::FORCE_DROPS)
        {
            let mut held = 0i32;
            for p in 0..variant.pieces.len() {
                held += i32::from(board.holdings[p][stm.index()].max(0));
            }
            tempo = (6 * held).min(30);
            score += tempo;
        }

        // Fifty-move taper towards the draw score
        let limit = i32::from(variant.scores.fifty_limit);
        if limit > 0 {
            let used = i32::from(board.fifty_counter).min(limit);
            score = score * (limit - used) / limit;
        }

        // Opening randomness: a uniform draw keyed by position and game seed
        if moves_played < variant.random_ply_count && variant.random_amplitude > 0 {
            let amp = variant.random_amplitude;
            let draw = (hash_mix(board.hash ^ self.game_seed) % (2 * amp as u64 + 1)) as i32 - amp;
            score += draw;
        }

        self.hash.store(board.hash, score);
        if tempo == 0 {
            // Antisymmetric without the tempo term: the flipped-side twin is
            // the same position with the negated score
            self.hash.store(board.hash ^ crate::zobrist::ZOBRIST.side_key, -score);
        }
        score
    }
}

/// Could this side ever deliver mate with what it has (board and hand)?
pub(crate) fn side_can_win<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
    side: Side,
) -> bool {
    let s = side.index();
    let mut types: Vec<usize> = Vec::new();
    let mut total = 0i32;
    for (p, desc) in variant.pieces.iter().enumerate() {
        if desc.is_royal() {
            continue;
        }
        let count = (board.bbp[p] & board.bbc[s]).popcount() as i32
            + i32::from(board.holdings[p][s].max(0));
        if count > 0 {
            types.push(p);
            total += count;
            if !desc.flags.contains(PieceFlags::CANT_MATE) {
                return true;
            }
        }
    }
    if total >= 3 {
        return true;
    }
    if total == 2 {
        // Pair table, with a board-level check for same-coloured bound pieces
        let (p, q) = if types.len() == 2 {
            (types[0], types[1])
        } else {
            (types[0], types[0])
        };
        if !variant.pieces_can_win[p][q] {
            return false;
        }
        if variant.pieces[p].flags.contains(PieceFlags::COLOURBOUND)
            && variant.pieces[q].flags.contains(PieceFlags::COLOURBOUND)
        {
            let geo = variant.geo();
            let on_board = (board.bbp[p] | board.bbp[q]) & board.bbc[s];
            if on_board.popcount() == 2
                && ((on_board & geo.light) == on_board || (on_board & geo.dark) == on_board)
            {
                return false;
            }
        }
        return true;
    }
    false
}

/// Mobility score for a side: safe destinations versus the piece's expected
/// reach, with a penalty for blocking a friendly pawn's advance.
fn mobility<W: BitWord>(variant: &Variant<W>, board: &Board<W>, side: Side) -> (i32, i32) {
    let s = side.index();
    let opp = side.flip();
    let occ = board.occupied();

    // Squares guarded by enemy pawn-class pieces are unsafe for the rest
    let mut unsafe_sq = Bitboard::EMPTY;
    for (p, desc) in variant.pieces.iter().enumerate() {
        if matches!(desc.class, PieceClass::Pawn) {
            let bb = board.bbp[p] & board.bbc[opp.index()];
            for sq in bb.iter() {
                unsafe_sq |= variant.movegen.attacks_from(variant, crate::pieces::PieceId(p as u8), opp, sq, occ);
            }
        }
    }

    let mut mg = 0i32;
    let mut eg = 0i32;
    let mut movers = board.bbc[s];
    while !movers.is_empty() {
        let from = movers.pop();
        let piece = board.get_piece(from);
        let desc = &variant.pieces[piece.index()];
        if desc.is_pawn() || desc.is_royal() {
            continue;
        }
        let dests = variant
            .movegen
            .moves_for_flags(desc.move_flags, side, from, occ | desc.block[s])
            & !board.bbc[s]
            & desc.prison[s];
        let safe = (dests & !unsafe_sq).popcount() as i32;
        let centred = (safe - desc.expected_mobility).clamp(-12, 12);
        mg += centred * desc.mobility_weight;
        eg += centred * desc.mobility_weight;
    }

    // Blocking a friendly pawn's forward march costs a little
    let own_pawns = pawns::pawns(variant, board, side);
    for sq in own_pawns.iter() {
        let geo = variant.geo();
        let r = geo.rank_of(sq) as i32 + if side == Side::White { 1 } else { -1 };
        if r >= 0 && (r as usize) < geo.ranks {
            let front = geo.square(geo.file_of(sq), r as usize);
            if (board.bbc[s] & Bitboard::from_square(front)) == Bitboard::from_square(front) {
                mg -= 4;
                eg -= 6;
            }
        }
    }

    (mg, eg)
}

/// Drive the bare king to a corner the winning material can use.
fn mop_up<W: BitWord>(variant: &Variant<W>, board: &Board<W>, side: Side) -> i32 {
    let geo = variant.geo();
    let s = side.index();
    let their_royal = board.royal & board.bbc[1 - s];
    let own_royal = board.royal & board.bbc[s];
    if their_royal.is_empty() || own_royal.is_empty() {
        return 0;
    }
    let loser = their_royal.bitscan();
    let winner = own_royal.bitscan();

    // Colour-bound winners need a corner of their own colour
    let mut corners = geo.corner;
    let mut bound_colour: Option<Bitboard<W>> = None;
    for (p, desc) in variant.pieces.iter().enumerate() {
        if desc.flags.contains(PieceFlags::COLOURBOUND) {
            let bb = board.bbp[p] & board.bbc[s];
            if !bb.is_empty() {
                bound_colour = Some(if (bb & geo.light) == bb {
                    geo.light
                } else {
                    geo.dark
                });
            }
        }
    }
    if let Some(colour) = bound_colour {
        let matching = corners & colour;
        if !matching.is_empty() {
            corners = matching;
        }
    }

    let mut corner_dist = i32::MAX;
    for c in corners.iter() {
        let df = geo.file_of(loser).abs_diff(geo.file_of(c)) as i32;
        let dr = geo.rank_of(loser).abs_diff(geo.rank_of(c)) as i32;
        corner_dist = corner_dist.min(df.max(dr));
    }
    if corner_dist == i32::MAX {
        corner_dist = 0;
    }
    let king_dist = {
        let df = geo.file_of(loser).abs_diff(geo.file_of(winner)) as i32;
        let dr = geo.rank_of(loser).abs_diff(geo.rank_of(winner)) as i32;
        df.max(dr)
    };

    60 - 8 * corner_dist - 4 * king_dist
}
