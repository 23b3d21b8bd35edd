//! King safety: pawn shelter against the weight of the attack aimed at the
//! king zone, combined in the Senpai manner as attack * deficit / scale.

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::Side;
use crate::variant::{RuleFlags, Variant};

use super::pawns::PawnStructure;

const SAFETY_SCALE: i32 = 16;

/// King-safety score for `side`'s king, (mg, eg); higher is safer.
pub(crate) fn score<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
    structure: &PawnStructure<W>,
    side: Side,
) -> (i32, i32) {
    let geo = variant.geo();
    let s = side.index();
    let royal = board.royal & board.bbc[s];
    if royal.is_empty() {
        return (0, 0);
    }
    let king_sq = royal.bitscan();
    let king_file = geo.file_of(king_sq);

    // Shelter deficit: how much pawn cover the castled king is missing.
    // Drop games care about the squares next to the king instead, since a
    // shelter can be assembled from hand.
    let deficit = if variant.rules.intersects(RuleFlags::USE_HOLDINGS) {
        let zone = geo.king_zone[king_sq.index()];
        let defenders = (zone & board.bbc[s]).popcount() as i32;
        (4 - defenders).max(0)
    } else {
        let mut cover = 0;
        for f in king_file.saturating_sub(1)..=(king_file + 1).min(geo.files - 1) {
            cover += structure.shelter[s][f].min(1);
        }
        3 - cover
    };

    // Attack weight: enemy pieces bearing on the king zone
    let zone = geo.king_zone[king_sq.index()];
    let attackers = variant.movegen.attackers_of(
        variant,
        board,
        zone,
        side.flip(),
        board.occupied(),
    );
    let mut attack_weight = 0i32;
    for sq in attackers.iter() {
        let piece = board.get_piece(sq);
        attack_weight += variant.pieces[piece.index()].king_safety_weight;
    }
    // In-hand pieces join the attack in drop games
    if variant.rules.intersects(RuleFlags::ALLOW_DROPS | RuleFlags::FORCE_DROPS) {
        for (p, desc) in variant.pieces.iter().enumerate() {
            let held = i32::from(board.holdings[p][side.flip().index()].max(0));
            attack_weight += held * desc.king_safety_weight / 2;
        }
    }

    let danger = attack_weight * (deficit + 1) * 8 / SAFETY_SCALE;
    let shelter_mg = -6 * deficit;

    (shelter_mg - danger, -danger / 2)
}
