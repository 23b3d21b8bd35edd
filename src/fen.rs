//! Extended FEN reading and writing.
//!
//! The surface syntax follows the usual conventions, extended for variants:
//! `*` marks an excluded cell, abbreviations may be two characters (`+P` for
//! promoted forms), an optional `[...]` block after the placement lists the
//! holdings, and castling rights accept both `KQkq` and file letters.

use crate::bits::BitWord;
use crate::board::Board;
use crate::error::FenError;
use crate::geometry::{Geometry, Side, Square};
use crate::pieces::{PieceDesc, PieceId};
use crate::variant::{RuleFlags, Variant};

/// Parse a placement field into piece locations. Standalone so variant
/// finalisation can record the reference start placement.
pub(crate) fn parse_placement<W: BitWord>(
    geo: &Geometry<W>,
    pieces: &[PieceDesc<W>],
    placement: &str,
) -> Result<Vec<(Square, PieceId, Side)>, FenError> {
    let ranks: Vec<&str> = placement.split('/').collect();
    if ranks.len() != geo.ranks {
        return Err(FenError::BadRankCount { found: ranks.len() });
    }

    let mut out = Vec::new();
    for (i, rank_str) in ranks.iter().enumerate() {
        let rank = geo.ranks - 1 - i;
        let mut file = 0usize;
        let mut chars = rank_str.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                let mut run = 0usize;
                while let Some(&d) = chars.peek() {
                    if let Some(v) = d.to_digit(10) {
                        run = run * 10 + v as usize;
                        chars.next();
                    } else {
                        break;
                    }
                }
                file += run;
                continue;
            }
            chars.next();
            if c == '*' {
                // Excluded cell placeholder
                file += 1;
                continue;
            }
            let mut symbol = c.to_string();
            if c == '+' {
                let Some(next) = chars.next() else {
                    return Err(FenError::InvalidPiece { symbol });
                };
                symbol.push(next);
            }
            if file >= geo.files {
                return Err(FenError::TooManyFiles { rank });
            }
            let sq = geo.square(file, rank);
            let found = pieces.iter().position(|d| d.abbrev[0] == symbol).map(|p| (p, Side::White))
                .or_else(|| {
                    pieces
                        .iter()
                        .position(|d| d.abbrev[1] == symbol)
                        .map(|p| (p, Side::Black))
                });
            let Some((piece, side)) = found else {
                return Err(FenError::InvalidPiece { symbol });
            };
            if !geo.all.test(sq) {
                return Err(FenError::PieceOnExcludedCell {
                    square: geo.square_name(sq),
                });
            }
            out.push((sq, PieceId(piece as u8), side));
            file += 1;
        }
        if file > geo.files {
            return Err(FenError::TooManyFiles { rank });
        }
    }
    Ok(out)
}

/// Set up a position from an extended FEN. Returns the full-move number.
/// With `skip_castle` the castling field is ignored and every placed piece
/// keeps its unmoved mark (used while deriving castle partners).
pub fn setup_fen<W: BitWord>(
    variant: &Variant<W>,
    board: &mut Board<W>,
    fen: &str,
    skip_castle: bool,
) -> Result<u32, FenError> {
    let mut working = Board::new();
    let geo = variant.geo();

    let trimmed = fen.trim();
    let mut fields = trimmed.split_whitespace();
    let placement_full = fields.next().ok_or(FenError::TooFewParts { found: 0 })?;

    // Split off the holdings block
    let (placement, holdings_str) = match placement_full.find('[') {
        Some(open) => {
            let close = placement_full.rfind(']').unwrap_or(placement_full.len());
            (
                &placement_full[..open],
                Some(&placement_full[open + 1..close]),
            )
        }
        None => (placement_full, None),
    };

    let placed = parse_placement(geo, &variant.pieces, placement)?;
    for &(sq, piece, side) in &placed {
        // A piece is unmoved when it stands where the start position put it
        let unmoved = variant
            .start_placement
            .iter()
            .any(|&(s2, p2, side2)| s2 == sq && p2 == piece && side2 == side);
        if unmoved || skip_castle {
            working.put_new_piece(variant, piece, side, sq);
        } else {
            working.put_piece(variant, piece, side, sq);
        }
    }

    if let Some(holdings) = holdings_str {
        if holdings != "-" {
            let mut chars = holdings.chars().peekable();
            while let Some(&c) = chars.peek() {
                chars.next();
                let mut symbol = c.to_string();
                if c == '+' {
                    let Some(next) = chars.next() else {
                        return Err(FenError::InvalidHolding { symbol });
                    };
                    symbol.push(next);
                }
                let Some((piece, side)) = variant.piece_by_abbrev(&symbol) else {
                    return Err(FenError::InvalidHolding { symbol });
                };
                let slot = &mut working.holdings[piece.index()][side.index()];
                if *slot < i8::MAX {
                    *slot += 1;
                    working.hash ^=
                        crate::zobrist::ZOBRIST.holding(piece, side, *slot);
                }
            }
        }
    }

    let side_field = fields.next().unwrap_or("w");
    working.side_to_move = match side_field {
        "w" => Side::White,
        "b" => Side::Black,
        other => {
            return Err(FenError::InvalidSideToMove {
                found: other.to_string(),
            })
        }
    };
    if working.side_to_move == Side::Black {
        working.hash ^= crate::zobrist::ZOBRIST.side_key;
        working.board_hash ^= crate::zobrist::ZOBRIST.side_key;
    }

    let castling_field = fields.next().unwrap_or("-");
    if !skip_castle {
        apply_castling_field(variant, &mut working, castling_field)?;
    }

    let ep_field = fields.next().unwrap_or("-");
    if ep_field != "-" {
        let Some(ep_sq) = geo.parse_square(ep_field) else {
            return Err(FenError::InvalidEnPassant {
                found: ep_field.to_string(),
            });
        };
        let rank = geo.rank_of(ep_sq) as i32;
        let victim_rank = if working.side_to_move == Side::White {
            rank + 1
        } else {
            rank - 1
        };
        if victim_rank >= 0 && (victim_rank as usize) < geo.ranks {
            let victim = geo.square(geo.file_of(ep_sq), victim_rank as usize);
            if working.occupied().test(victim) {
                working.ep.set(ep_sq);
                working.ep_victim = Some(victim);
            }
        }
    }

    working.fifty_counter = fields
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let fullmove = fields.next().and_then(|s| s.parse().ok()).unwrap_or(1);

    working.refresh_castle_rights(variant);
    working.flag = variant.flag_cells;

    // Only commit on success; a parse failure leaves the board untouched
    *board = working;
    let check = variant
        .movegen
        .player_in_check(variant, board, board.side_to_move);
    board.set_check(check);
    // The setup check is old news for check-counting rules
    board.check_count = [0, 0];

    Ok(fullmove)
}

/// Apply a castling-rights field by pruning unmoved marks that the FEN does
/// not grant.
fn apply_castling_field<W: BitWord>(
    variant: &Variant<W>,
    board: &mut Board<W>,
    field: &str,
) -> Result<(), FenError> {
    let geo = variant.geo();
    let mut granted: Vec<bool> = vec![false; variant.movegen.castles.len()];

    if field != "-" {
        for c in field.chars() {
            let side = if c.is_ascii_uppercase() {
                Side::White
            } else {
                Side::Black
            };
            let lower = c.to_ascii_lowercase();
            let mut matched = false;
            for (i, rule) in variant.movegen.castles.iter().enumerate() {
                if rule.side != side {
                    continue;
                }
                let hit = match lower {
                    'k' => rule.board_side == 0,
                    'q' => rule.board_side == 1,
                    file @ 'a'..='p' => geo.file_of(rule.rook_from) == (file as usize - 'a' as usize),
                    _ => false,
                };
                if hit {
                    granted[i] = true;
                    matched = true;
                }
            }
            if !matched && !variant.movegen.castles.is_empty() {
                return Err(FenError::InvalidCastling {
                    found: field.to_string(),
                });
            }
        }
    }

    // Remove unmoved marks the rights do not support
    for (i, rule) in variant.movegen.castles.iter().enumerate() {
        if granted[i] {
            continue;
        }
        board.init.reset(rule.rook_from);
        // The king mark falls only when no other rule of this side survives
        let king_still_needed = variant
            .movegen
            .castles
            .iter()
            .enumerate()
            .any(|(j, r)| granted[j] && r.side == rule.side && r.king_from == rule.king_from);
        if !king_still_needed {
            board.init.reset(rule.king_from);
        }
    }
    Ok(())
}

/// Serialize a position back to an extended FEN.
#[must_use]
pub fn make_fen<W: BitWord>(variant: &Variant<W>, board: &Board<W>, fullmove: u32) -> String {
    let geo = variant.geo();
    let mut out = String::new();

    for rank in (0..geo.ranks).rev() {
        let mut empty_run = 0usize;
        for file in 0..geo.files {
            let sq = geo.square(file, rank);
            if !geo.all.test(sq) {
                if empty_run > 0 {
                    out.push_str(&empty_run.to_string());
                    empty_run = 0;
                }
                out.push('*');
                continue;
            }
            match board.piece_at(sq) {
                Some((piece, side)) => {
                    if empty_run > 0 {
                        out.push_str(&empty_run.to_string());
                        empty_run = 0;
                    }
                    out.push_str(&variant.pieces[piece.index()].abbrev[side.index()]);
                }
                None => empty_run += 1,
            }
        }
        if empty_run > 0 {
            out.push_str(&empty_run.to_string());
        }
        if rank > 0 {
            out.push('/');
        }
    }

    if variant.rules.intersects(RuleFlags::USE_HOLDINGS) {
        out.push('[');
        let mut any = false;
        for side in [Side::White, Side::Black] {
            for (p, desc) in variant.pieces.iter().enumerate() {
                for _ in 0..board.holdings[p][side.index()].max(0) {
                    out.push_str(&desc.abbrev[side.index()]);
                    any = true;
                }
            }
        }
        if !any {
            out.push('-');
        }
        out.push(']');
    }

    out.push(' ');
    out.push(if board.side_to_move == Side::White { 'w' } else { 'b' });

    out.push(' ');
    let mut castles = String::new();
    for rule in &variant.movegen.castles {
        let bit = 1 << (2 * rule.side.index() + rule.board_side);
        if board.castle_rights & bit != 0 {
            let c = if rule.board_side == 0 { 'K' } else { 'Q' };
            if rule.side == Side::White {
                castles.push(c);
            } else {
                castles.push(c.to_ascii_lowercase());
            }
        }
    }
    if castles.is_empty() {
        out.push('-');
    } else {
        out.push_str(&castles);
    }

    out.push(' ');
    if board.ep.is_empty() {
        out.push('-');
    } else {
        out.push_str(&geo.square_name(board.ep.bitscan()));
    }

    out.push(' ');
    out.push_str(&board.fifty_counter.to_string());
    out.push(' ');
    out.push_str(&fullmove.to_string());
    out
}

/// Reference placement of the variant's starting position; used to decide
/// which pieces count as unmoved when reading other FENs.
pub(crate) fn start_placement_of<W: BitWord>(
    geo: &Geometry<W>,
    pieces: &[PieceDesc<W>],
    start_fen: &str,
) -> Vec<(Square, PieceId, Side)> {
    let placement_field = start_fen
        .split_whitespace()
        .next()
        .unwrap_or("");
    let placement = match placement_field.find('[') {
        Some(open) => &placement_field[..open],
        None => placement_field,
    };
    parse_placement(geo, pieces, placement).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants;

    #[test]
    fn test_placement_multi_digit_runs() {
        let variant = variants::capablanca::<u128>().expect("capablanca");
        let geo = variant.geo();
        let placed = parse_placement(geo, &variant.pieces, "10/10/10/10/10/10/10/4K5")
            .expect("placement parses");
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].0, geo.square(4, 0));
    }

    #[test]
    fn test_placement_rejects_bad_rank_counts() {
        let variant = variants::chess::<u64>().expect("chess");
        let geo = variant.geo();
        assert!(matches!(
            parse_placement(geo, &variant.pieces, "8/8/8/8"),
            Err(FenError::BadRankCount { .. })
        ));
        assert!(matches!(
            parse_placement(geo, &variant.pieces, "9/8/8/8/8/8/8/8"),
            Err(FenError::TooManyFiles { .. })
        ));
        assert!(matches!(
            parse_placement(geo, &variant.pieces, "J7/8/8/8/8/8/8/8"),
            Err(FenError::InvalidPiece { .. })
        ));
    }

    #[test]
    fn test_two_character_abbreviations_parse() {
        let variant = variants::crazyhouse::<u64>().expect("crazyhouse");
        let geo = variant.geo();
        let placed = parse_placement(geo, &variant.pieces, "+Q7/8/8/8/8/8/8/8")
            .expect("promoted piece parses");
        let plus_q = variant.piece_by_abbrev("+Q").map(|(p, _)| p).expect("+Q");
        assert_eq!(placed[0].1, plus_q);
    }

    #[test]
    fn test_holdings_field_roundtrip() {
        let variant = variants::crazyhouse::<u64>().expect("crazyhouse");
        let mut board = crate::board::Board::new();
        setup_fen(
            &variant,
            &mut board,
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[NNp] w KQkq - 0 1",
            false,
        )
        .expect("fen");
        let knight = variant.piece_by_notation('N').expect("knight");
        let pawn = variant.piece_by_notation('P').expect("pawn");
        assert_eq!(board.holdings[knight.index()][0], 2);
        assert_eq!(board.holdings[pawn.index()][1], 1);

        let out = make_fen(&variant, &board, 1);
        assert!(out.contains("[NNp]"), "got {out}");
        assert_eq!(board.hash, board.recompute_hash(&variant));
    }

    #[test]
    fn test_castling_rights_prune_unmoved_marks() {
        let variant = variants::chess::<u64>().expect("chess");
        let geo = variant.geo();
        let mut board = crate::board::Board::new();
        setup_fen(
            &variant,
            &mut board,
            "r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1",
            false,
        )
        .expect("fen");
        // White keeps only kingside, black only queenside
        assert_eq!(board.castle_rights, 0b1001);
        assert!(board.init.test(geo.square(7, 0)));
        assert!(!board.init.test(geo.square(0, 0)));
    }
}
