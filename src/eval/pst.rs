//! Piece-square tables, derived per variant at finalisation.
//!
//! There are no hand-tuned tables here: every entry is computed from the
//! piece's actual movement (reach and mobility), its class, tropism towards
//! an enemy palace or flag cells, and pawn advancement. This keeps the
//! tables meaningful for arbitrary fairy pieces.

use crate::bits::BitWord;
use crate::geometry::{Bitboard, Side};
use crate::pieces::PieceClass;
use crate::variant::{RuleFlags, Variant};

/// Build `pst[piece][side][square] -> (mg, eg)`.
pub(crate) fn build_pst<W: BitWord>(variant: &Variant<W>) -> Vec<[Vec<(i16, i16)>; 2]> {
    let geo = variant.geo();
    let cells = geo.cells();
    let mut tables = Vec::with_capacity(variant.pieces.len());

    for desc in &variant.pieces {
        let mut per_side = [vec![(0i16, 0i16); cells], vec![(0i16, 0i16); cells]];

        // Average reach over the board centres the mobility bonus
        let mut total_reach = 0i32;
        let mut counted = 0i32;
        for sq in geo.all.iter() {
            total_reach += variant
                .movegen
                .moves_for_flags(desc.move_flags, Side::White, sq, Bitboard::EMPTY)
                .popcount() as i32;
            counted += 1;
        }
        let avg_reach = if counted > 0 { total_reach / counted } else { 0 };

        for side in [Side::White, Side::Black] {
            let s = side.index();
            for sq in geo.all.iter() {
                let mut mg = 0i32;
                let mut eg = 0i32;

                let reach = variant
                    .movegen
                    .moves_for_flags(desc.move_flags, side, sq, Bitboard::EMPTY)
                    .popcount() as i32;

                match desc.class {
                    PieceClass::Pawn => {
                        // Advancement, scaled towards the promotion zone
                        let home = if side == Side::White {
                            0
                        } else {
                            geo.ranks - 1
                        };
                        let advance = geo.rank_of(sq).abs_diff(home) as i32;
                        mg += 3 * advance;
                        eg += 5 * advance;
                        // Central files are worth a little more early
                        let centre_dist = centre_distance_file(geo.file_of(sq), geo.files);
                        mg += 2 - centre_dist;
                    }
                    PieceClass::Royal => {
                        // Sheltered early, centralized late
                        let centre_dist = centre_distance(geo, sq);
                        mg += 3 * centre_dist - 6;
                        eg += 6 - 3 * centre_dist;
                    }
                    _ => {
                        // Reach-based centrality for everything else
                        mg += (reach - avg_reach) * 2;
                        eg += reach - avg_reach;
                    }
                }

                // Tropism to an enemy palace (royal prison smaller than the
                // board means there is one)
                if let Some(&royal) = variant.royal_pieces.first() {
                    let enemy_prison = variant.pieces[royal.index()].prison[1 - s];
                    if enemy_prison.popcount() < geo.all.popcount() && !enemy_prison.is_empty() {
                        let d = distance_to_set(geo, sq, enemy_prison);
                        if !matches!(desc.class, PieceClass::Pawn | PieceClass::Royal) {
                            mg += (6 - d).max(0);
                            eg += (6 - d).max(0);
                        }
                    }
                }

                // Proximity to flag cells when flags decide the game
                if variant.rules.intersects(RuleFlags::CAPTURE_THE_FLAG) {
                    let targets = variant.flag_cells[1 - s];
                    if !targets.is_empty() {
                        let d = distance_to_set(geo, sq, targets);
                        mg += (8 - 2 * d).max(0);
                        eg += (10 - 2 * d).max(0);
                    }
                }

                per_side[s][sq.index()] = (clamp16(mg), clamp16(eg));
            }
        }
        tables.push(per_side);
    }
    tables
}

fn clamp16(v: i32) -> i16 {
    v.clamp(-120, 120) as i16
}

fn centre_distance_file(file: usize, files: usize) -> i32 {
    let centre2 = (files - 1) as i32; // doubled centre coordinate
    ((2 * file as i32) - centre2).abs() / 2
}

fn centre_distance<W: BitWord>(geo: &crate::geometry::Geometry<W>, sq: crate::geometry::Square) -> i32 {
    let df = centre_distance_file(geo.file_of(sq), geo.files);
    let dr = centre_distance_file(geo.rank_of(sq), geo.ranks);
    df.max(dr)
}

fn distance_to_set<W: BitWord>(
    geo: &crate::geometry::Geometry<W>,
    sq: crate::geometry::Square,
    set: Bitboard<W>,
) -> i32 {
    let mut best = i32::MAX;
    for t in set.iter() {
        let df = geo.file_of(sq).abs_diff(geo.file_of(t)) as i32;
        let dr = geo.rank_of(sq).abs_diff(geo.rank_of(t)) as i32;
        best = best.min(df.max(dr));
    }
    if best == i32::MAX {
        0
    } else {
        best
    }
}
