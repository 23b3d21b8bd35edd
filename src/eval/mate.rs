//! Mate-potential analysis, run once at variant finalisation.
//!
//! For every piece type (and every pair of types that cannot mate alone)
//! the analysis searches for a checkmate of a bare king in the worst corner,
//! with the attacking king in support. Types for which no mate exists are
//! marked `CANT_MATE`; the pair table feeds the evaluator's dead-draw and
//! mop-up logic. A pair of identical simple leapers is ruled out without a
//! board scan: mate positions exist but can never be forced, the leaper
//! being unable to lose a tempo.

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::{Side, Square};
use crate::moves::MoveList;
use crate::movegen::GenMode;
use crate::pieces::{PieceFlags, PieceId, MAX_PIECE_TYPES};
use crate::variant::Variant;

pub(crate) fn analyse<W: BitWord>(variant: &mut Variant<W>) {
    let Some(&royal) = variant.royal_pieces.first() else {
        return;
    };

    let mut can_single = [false; MAX_PIECE_TYPES];
    for p in 0..variant.pieces.len() {
        let piece = PieceId(p as u8);
        if variant.pieces[p].is_royal() {
            can_single[p] = false;
            continue;
        }
        can_single[p] = mate_exists(variant, royal, &[piece]);
    }

    // A piece that promotes mates if some promotion target does
    let mut changed = true;
    while changed {
        changed = false;
        for p in 0..variant.pieces.len() {
            if can_single[p] {
                continue;
            }
            let choice = variant.pieces[p].promotion_choice;
            for t in 0..variant.pieces.len() {
                if choice & (1 << t) != 0 && can_single[t] {
                    can_single[p] = true;
                    changed = true;
                    break;
                }
            }
        }
    }

    for (p, single) in can_single.iter().enumerate().take(variant.pieces.len()) {
        if !single && !variant.pieces[p].is_royal() {
            variant.pieces[p].flags.insert(PieceFlags::CANT_MATE);
        }
    }

    let n = variant.pieces.len();
    for p in 0..n {
        for q in 0..n {
            if variant.pieces[p].is_royal() || variant.pieces[q].is_royal() {
                variant.pieces_can_win[p][q] = can_single[p] || can_single[q];
                continue;
            }
            if can_single[p] || can_single[q] {
                variant.pieces_can_win[p][q] = true;
                continue;
            }
            if p == q && is_simple_leaper_only(variant, p) {
                variant.pieces_can_win[p][q] = false;
                continue;
            }
            if q < p {
                variant.pieces_can_win[p][q] = variant.pieces_can_win[q][p];
                continue;
            }
            let wins = mate_exists(variant, royal, &[PieceId(p as u8), PieceId(q as u8)]);
            variant.pieces_can_win[p][q] = wins;
        }
    }
}

fn is_simple_leaper_only<W: BitWord>(variant: &Variant<W>, p: usize) -> bool {
    let desc = &variant.pieces[p];
    desc.move_flags.is_simple_leaper()
        && !desc.move_flags.is_slider()
        && !desc.move_flags.is_hopper()
        && !desc.move_flags.is_rider()
        && !desc.move_flags.is_stepper()
        && desc.promotion_choice == 0
}

/// Does any checkmate of a bare king in its worst refuge exist with this
/// attacking material? The defender stands in a corner of whatever region
/// its prison allows (a palace corner when confined, a board corner
/// otherwise); the attacking king sits in supporting range inside its own
/// prison, and the pieces anywhere nearby.
fn mate_exists<W: BitWord>(variant: &Variant<W>, royal: PieceId, attackers: &[PieceId]) -> bool {
    let geo = variant.geo();
    let defender_region = variant.pieces[royal.index()].prison[1];
    let attacker_region = variant.pieces[royal.index()].prison[0];

    // Small refuges (palaces) are scanned whole; open boards only at their
    // corners, where bare-king mates live
    let corners: Vec<Square> = if defender_region.popcount() <= 12 {
        defender_region.iter().collect()
    } else {
        (defender_region & geo.corner).iter().collect()
    };

    let confined_attacker = attacker_region.popcount() < geo.all.popcount();

    for &corner in &corners {
        let near: Vec<Square> = geo
            .all
            .iter()
            .filter(|&sq| chebyshev(geo, sq, corner) <= 4)
            .collect();

        // A confined attacking king supports from anywhere in its prison
        // (the flying-general file matters more than proximity); a free one
        // stands in opposition range
        let king_spots: Vec<Square> = if confined_attacker {
            attacker_region
                .iter()
                .filter(|&sq| chebyshev(geo, sq, corner) >= 2)
                .collect()
        } else {
            near.iter()
                .copied()
                .filter(|&sq| (2..=3).contains(&chebyshev(geo, sq, corner)))
                .collect()
        };

        for &wk in &king_spots {
            if try_placements(variant, royal, corner, wk, attackers, &near, &mut Vec::new()) {
                return true;
            }
        }
    }
    false
}

fn try_placements<W: BitWord>(
    variant: &Variant<W>,
    royal: PieceId,
    bare_king: Square,
    white_king: Square,
    remaining: &[PieceId],
    near: &[Square],
    placed: &mut Vec<(PieceId, Square)>,
) -> bool {
    if remaining.is_empty() {
        return is_mate_position(variant, royal, bare_king, white_king, placed);
    }
    let piece = remaining[0];
    for &sq in near {
        if sq == bare_king || sq == white_king || placed.iter().any(|&(_, s)| s == sq) {
            continue;
        }
        if !variant.pieces[piece.index()].prison[0].test(sq) {
            continue;
        }
        placed.push((piece, sq));
        let hit = try_placements(
            variant,
            royal,
            bare_king,
            white_king,
            &remaining[1..],
            near,
            placed,
        );
        placed.pop();
        if hit {
            return true;
        }
    }
    false
}

fn is_mate_position<W: BitWord>(
    variant: &Variant<W>,
    royal: PieceId,
    bare_king: Square,
    white_king: Square,
    placed: &[(PieceId, Square)],
) -> bool {
    if !variant.pieces[royal.index()].prison[1].test(bare_king)
        || !variant.pieces[royal.index()].prison[0].test(white_king)
    {
        return false;
    }

    let mut board = Board::new();
    board.put_piece(variant, royal, Side::Black, bare_king);
    board.put_piece(variant, royal, Side::White, white_king);
    for &(piece, sq) in placed {
        board.put_piece(variant, piece, Side::White, sq);
    }
    board.side_to_move = Side::Black;
    board.hash ^= crate::zobrist::ZOBRIST.side_key;
    board.board_hash ^= crate::zobrist::ZOBRIST.side_key;

    if !variant.movegen.player_in_check(variant, &board, Side::Black) {
        return false;
    }
    board.set_check(true);

    // Mate when no black move escapes
    let mut list = MoveList::new();
    variant
        .movegen
        .generate_moves(variant, &board, Side::Black, &mut list, GenMode::All);
    let mut ui = crate::board::UnmakeInfo::default();
    for &mv in list.iter() {
        board.make(variant, mv, &mut ui);
        let legal = !variant.movegen.player_in_check(variant, &board, Side::Black);
        board.unmake(variant, mv, &ui);
        if legal {
            return false;
        }
    }
    true
}

fn chebyshev<W: BitWord>(geo: &crate::geometry::Geometry<W>, a: Square, b: Square) -> i32 {
    let df = geo.file_of(a).abs_diff(geo.file_of(b)) as i32;
    let dr = geo.rank_of(a).abs_diff(geo.rank_of(b)) as i32;
    df.max(dr)
}
