//! Pawn-structure evaluation, computed once per call into a scratch struct.

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::{Bitboard, Side};
use crate::pieces::PieceClass;
use crate::variant::Variant;

/// Per-call pawn data: open files, passed and weak pawns, shelter by file.
pub(crate) struct PawnStructure<W: BitWord> {
    pub open_files: Bitboard<W>,
    pub passed: [Bitboard<W>; 2],
    pub weak: [Bitboard<W>; 2],
    /// Shelter quality per file and side, 0 (bare) to 3 (solid).
    pub shelter: [Vec<i32>; 2],
}

/// All pawn-class pieces of one side.
pub(crate) fn pawns<W: BitWord>(variant: &Variant<W>, board: &Board<W>, side: Side) -> Bitboard<W> {
    let mut bb = Bitboard::EMPTY;
    for (p, desc) in variant.pieces.iter().enumerate() {
        if matches!(desc.class, PieceClass::Pawn) {
            bb |= board.bbp[p] & board.bbc[side.index()];
        }
    }
    bb
}

pub(crate) fn analyse<W: BitWord>(variant: &Variant<W>, board: &Board<W>) -> PawnStructure<W> {
    let geo = variant.geo();
    let white = pawns(variant, board, Side::White);
    let black = pawns(variant, board, Side::Black);

    let mut open_files = Bitboard::EMPTY;
    let mut shelter = [vec![0i32; geo.files], vec![0i32; geo.files]];

    for f in 0..geo.files {
        let file_mask = geo.file[f];
        if (white & file_mask).is_empty() && (black & file_mask).is_empty() {
            open_files |= file_mask;
        }
        // Shelter: own pawns on the file and its neighbours, nearer ranks
        // counting more
        for (s, own) in [(0usize, white), (1usize, black)] {
            let mut score = 0;
            for nf in f.saturating_sub(1)..=(f + 1).min(geo.files - 1) {
                let pawns_on_file = own & geo.file[nf];
                if !pawns_on_file.is_empty() {
                    let sq = if s == 0 {
                        pawns_on_file.bitscan()
                    } else {
                        pawns_on_file.msb()
                    };
                    let advance = if s == 0 {
                        geo.rank_of(sq)
                    } else {
                        geo.ranks - 1 - geo.rank_of(sq)
                    };
                    score += if advance <= 2 { 1 } else { 0 };
                }
            }
            shelter[s][f] = score;
        }
    }

    let mut passed = [Bitboard::EMPTY; 2];
    let mut weak = [Bitboard::EMPTY; 2];
    for (s, own, theirs) in [(0usize, white, black), (1usize, black, white)] {
        let side = Side::from_index(s);
        for sq in own.iter() {
            let f = geo.file_of(sq);
            let r = geo.rank_of(sq);

            // Passed: no enemy pawn ahead on this or adjacent files
            let ahead = if side == Side::White {
                geo.northward[r]
            } else {
                geo.southward[r]
            };
            let mut span = geo.file[f];
            if f > 0 {
                span |= geo.file[f - 1];
            }
            if f + 1 < geo.files {
                span |= geo.file[f + 1];
            }
            if (theirs & ahead & span).is_empty() {
                passed[s].set(sq);
            }

            // Weak: no friendly pawn beside or behind on adjacent files
            let behind = if side == Side::White {
                geo.southward[r] | geo.rank[r]
            } else {
                geo.northward[r] | geo.rank[r]
            };
            let mut guard_span = Bitboard::EMPTY;
            if f > 0 {
                guard_span |= geo.file[f - 1];
            }
            if f + 1 < geo.files {
                guard_span |= geo.file[f + 1];
            }
            if (own & behind & guard_span).is_empty() {
                weak[s].set(sq);
            }
        }
    }

    PawnStructure {
        open_files,
        passed,
        weak,
        shelter,
    }
}

/// Score the pawn structure for one side, (mg, eg).
pub(crate) fn score<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
    structure: &PawnStructure<W>,
    side: Side,
) -> (i32, i32) {
    let geo = variant.geo();
    let s = side.index();
    let mut mg = 0i32;
    let mut eg = 0i32;

    // Passers grow with the rank they have reached
    for sq in structure.passed[s].iter() {
        let advance = if side == Side::White {
            geo.rank_of(sq)
        } else {
            geo.ranks - 1 - geo.rank_of(sq)
        } as i32;
        mg += 4 + 2 * advance;
        eg += 8 + 5 * advance;
    }

    // Weak pawns hurt more when the opponent can pile up on them
    let opp_heavy = heavy_pieces(variant, board, side.flip());
    for sq in structure.weak[s].iter() {
        let f = geo.file_of(sq);
        let exposed = (opp_heavy & geo.file[f]).popcount() as i32;
        mg -= 6 + 4 * exposed;
        eg -= 10 + 4 * exposed;
    }

    // A rook-class piece at the base of a friendly pawn chain supports it
    for (p, desc) in variant.pieces.iter().enumerate() {
        if !matches!(desc.class, PieceClass::Major) {
            continue;
        }
        let own_pawns = pawns(variant, board, side);
        for sq in (board.bbp[p] & board.bbc[s]).iter() {
            let f = geo.file_of(sq);
            let file_pawns = own_pawns & geo.file[f];
            if !file_pawns.is_empty() {
                let base = if side == Side::White {
                    file_pawns.bitscan()
                } else {
                    file_pawns.msb()
                };
                let behind = if side == Side::White {
                    geo.rank_of(sq) < geo.rank_of(base)
                } else {
                    geo.rank_of(sq) > geo.rank_of(base)
                };
                if behind {
                    mg += 4;
                    eg += 8;
                }
            } else if structure.open_files.test(sq) {
                mg += 10;
                eg += 5;
            }
        }
    }

    (mg, eg)
}

fn heavy_pieces<W: BitWord>(variant: &Variant<W>, board: &Board<W>, side: Side) -> Bitboard<W> {
    let mut bb = Bitboard::EMPTY;
    for (p, desc) in variant.pieces.iter().enumerate() {
        if matches!(desc.class, PieceClass::Major | PieceClass::Super) {
            bb |= board.bbp[p] & board.bbc[side.index()];
        }
    }
    bb
}
