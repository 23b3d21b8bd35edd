//! Move text: SAN and long algebraic, drop (`P@e4`) and gating (`e2e4/N`)
//! forms, with the usual castle spellings.
//!
//! Parsing works by matching the text against the legal move list rather
//! than reconstructing moves, so every notation quirk reduces to a filter.

use crate::bits::BitWord;
use crate::board::Board;
use crate::error::MoveParseError;
use crate::moves::{Move, MoveList};
use crate::variant::Variant;

/// Parse any accepted notation against the legal move list.
pub fn parse_move<W: BitWord>(
    variant: &Variant<W>,
    legal: &MoveList,
    text: &str,
) -> Result<Move, MoveParseError> {
    let text = text
        .trim()
        .trim_end_matches(['+', '#', '!', '?'])
        .to_string();
    if text.is_empty() {
        return Err(MoveParseError::Empty);
    }

    // Castles by name; O-O-O binds before O-O
    if matches!(text.as_str(), "O-O-O" | "0-0-0" | "o-o-o") {
        return unique(legal.iter().copied().filter(|m| is_queenside_castle(variant, *m)), &text);
    }
    if matches!(text.as_str(), "O-O" | "0-0" | "o-o") {
        return unique(legal.iter().copied().filter(|m| is_kingside_castle(variant, *m)), &text);
    }

    // Drop: P@e4
    if let Some(at) = text.find('@') {
        let (piece_str, rest) = text.split_at(at);
        let dest = variant.geo().parse_square(&rest[1..]).ok_or_else(|| {
            MoveParseError::InvalidSquare {
                notation: text.clone(),
            }
        })?;
        let piece = variant
            .piece_by_notation(piece_str.chars().next().unwrap_or('?'))
            .or_else(|| variant.piece_by_abbrev(piece_str).map(|(p, _)| p))
            .ok_or_else(|| MoveParseError::InvalidPiece {
                symbol: piece_str.to_string(),
            })?;
        return unique(
            legal
                .iter()
                .copied()
                .filter(|m| m.is_drop() && m.to() == dest && m.drop_slot(0).0 == piece),
            &text,
        );
    }

    // Gate suffix: e2e4/N
    if let Some(slash) = text.find('/') {
        let (lan_part, gate_part) = text.split_at(slash);
        let gate_piece = variant
            .piece_by_notation(gate_part[1..].chars().next().unwrap_or('?'))
            .ok_or_else(|| MoveParseError::InvalidPiece {
                symbol: gate_part[1..].to_string(),
            })?;
        let inner = parse_lan(variant, legal, lan_part, Some(gate_piece));
        if let Ok(mv) = inner {
            return Ok(mv);
        }
        return Err(MoveParseError::NoMatchingMove { notation: text });
    }

    // Long algebraic first, SAN as the fallback
    if let Ok(mv) = parse_lan(variant, legal, &text, None) {
        return Ok(mv);
    }
    parse_san(variant, legal, &text)
}

fn unique(
    mut candidates: impl Iterator<Item = Move>,
    text: &str,
) -> Result<Move, MoveParseError> {
    let Some(first) = candidates.next() else {
        return Err(MoveParseError::NoMatchingMove {
            notation: text.to_string(),
        });
    };
    if candidates.next().is_some() {
        return Err(MoveParseError::AmbiguousMove {
            notation: text.to_string(),
        });
    }
    Ok(first)
}

fn is_kingside_castle<W: BitWord>(variant: &Variant<W>, mv: Move) -> bool {
    mv.is_castle() && {
        let geo = variant.geo();
        geo.file_of(mv.to()) > geo.file_of(mv.from())
    }
}

fn is_queenside_castle<W: BitWord>(variant: &Variant<W>, mv: Move) -> bool {
    mv.is_castle() && {
        let geo = variant.geo();
        geo.file_of(mv.to()) < geo.file_of(mv.from())
    }
}

/// `e2e4`, `e7e8q` (promotion letter), `e1g1` or king-takes-rook `e1h1` for
/// castling.
fn parse_lan<W: BitWord>(
    variant: &Variant<W>,
    legal: &MoveList,
    text: &str,
    gate: Option<crate::pieces::PieceId>,
) -> Result<Move, MoveParseError> {
    let geo = variant.geo();
    let bytes = text.as_bytes();
    // Squares are a letter plus 1-2 digits; scan the split point
    let mut split = 0;
    for i in 2..bytes.len() {
        if bytes[i].is_ascii_lowercase() && i >= 2 {
            split = i;
            break;
        }
    }
    if split == 0 {
        return Err(MoveParseError::InvalidSquare {
            notation: text.to_string(),
        });
    }
    let Some(from) = geo.parse_square(&text[..split]) else {
        return Err(MoveParseError::InvalidSquare {
            notation: text.to_string(),
        });
    };

    // Destination, with an optional promotion letter at the end
    let rest = &text[split..];
    let (to_str, promo) = match rest.chars().last() {
        Some(c) if c.is_ascii_alphabetic() && rest.len() > 2 && !rest.ends_with(|c: char| c.is_ascii_digit()) => {
            (&rest[..rest.len() - 1], Some(c))
        }
        _ => (rest, None),
    };
    let Some(to) = geo.parse_square(to_str) else {
        return Err(MoveParseError::InvalidSquare {
            notation: text.to_string(),
        });
    };

    let promo_letter = promo.map(|c| c.to_ascii_uppercase());

    let matches = legal.iter().copied().filter(|m| {
        if m.is_drop() {
            return false;
        }
        if m.swaps() == 0 && m.pickups() == 0 {
            return false;
        }
        let m_from = m.from();
        if m_from != from {
            return false;
        }
        // Castling answers both the king-destination and king-takes-rook
        // conventions
        let to_match = if m.is_castle() {
            let (rook_from, _) = m.swap_squares(1);
            m.to() == to || rook_from == to
        } else if m.is_pickup() {
            m_from == to
        } else {
            m.to() == to
        };
        if !to_match {
            return false;
        }
        // Promotion targets match by notation letter; distinct piece types
        // (a demotable queen, say) may share one
        match promo_letter {
            Some(letter) => {
                m.is_promotion() && variant.pieces[m.final_piece().index()].notation == letter
            }
            None => !m.is_promotion(),
        }
    });

    match gate {
        Some(gp) => unique(
            matches.filter(|m| m.is_gate() && m.drop_slot(m.drops() - 1).0 == gp),
            text,
        ),
        None => unique(matches.filter(|m| !m.is_gate()), text),
    }
}

/// SAN: piece letter, optional disambiguation, `x`, destination, `=P`.
fn parse_san<W: BitWord>(
    variant: &Variant<W>,
    legal: &MoveList,
    text: &str,
) -> Result<Move, MoveParseError> {
    let geo = variant.geo();
    let original = text;
    let mut text = text;

    // Promotion suffix
    let mut promo_letter = None;
    if let Some(eq) = text.find('=') {
        let letter = text[eq + 1..].chars().next().ok_or_else(|| {
            MoveParseError::InvalidPiece {
                symbol: String::new(),
            }
        })?;
        if variant.piece_by_notation(letter).is_none() {
            return Err(MoveParseError::InvalidPiece {
                symbol: letter.to_string(),
            });
        }
        promo_letter = Some(letter);
        text = &text[..eq];
    }

    // Leading piece letter (uppercase, not a file)
    let mut piece_letter = None;
    let mut chars: Vec<char> = text.chars().collect();
    if let Some(&first) = chars.first() {
        if first.is_ascii_uppercase() {
            piece_letter = Some(first);
            chars.remove(0);
        }
    }

    let is_capture = chars.contains(&'x');
    chars.retain(|&c| c != 'x');

    // Destination is the trailing square; what precedes disambiguates
    let text2: String = chars.iter().collect();
    let mut dest = None;
    let mut dis_file = None;
    let mut dis_rank = None;
    for split in (1..=text2.len()).rev() {
        if !text2.is_char_boundary(split) {
            continue;
        }
        let tail = &text2[split - 1..];
        if tail.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
            if let Some(sq) = geo.parse_square(&text2[split - 1..]) {
                dest = Some(sq);
                for c in text2[..split - 1].chars() {
                    if c.is_ascii_lowercase() {
                        dis_file = Some(c as usize - 'a' as usize);
                    } else if let Some(d) = c.to_digit(10) {
                        dis_rank = Some(d as usize - 1);
                    }
                }
                break;
            }
        }
    }
    let Some(dest) = dest else {
        return Err(MoveParseError::InvalidSquare {
            notation: original.to_string(),
        });
    };

    if let Some(letter) = piece_letter {
        if variant.piece_by_notation(letter).is_none() {
            return Err(MoveParseError::InvalidPiece {
                symbol: letter.to_string(),
            });
        }
    }

    unique(
        legal.iter().copied().filter(|m| {
            if m.is_drop() || m.is_castle() || m.is_pickup() {
                return false;
            }
            if m.to() != dest {
                return false;
            }
            let from = m.from();
            let mover = m.piece();
            match piece_letter {
                Some(letter) => {
                    if variant.pieces[mover.index()].notation != letter {
                        return false;
                    }
                }
                None => {
                    // No letter means a pawn-class mover
                    if !variant.pieces[mover.index()].is_pawn() {
                        return false;
                    }
                }
            }
            if is_capture != m.is_capture() {
                return false;
            }
            if let Some(f) = dis_file {
                if geo.file_of(from) != f {
                    return false;
                }
            }
            if let Some(r) = dis_rank {
                if geo.rank_of(from) != r {
                    return false;
                }
            }
            match promo_letter {
                Some(letter) => {
                    m.is_promotion() && variant.pieces[m.final_piece().index()].notation == letter
                }
                None => !m.is_promotion(),
            }
        }),
        original,
    )
    .map_err(|e| match e {
        MoveParseError::NoMatchingMove { .. } => MoveParseError::NoMatchingMove {
            notation: original.to_string(),
        },
        other => other,
    })
}

/// Long algebraic rendering.
#[must_use]
pub fn to_lan<W: BitWord>(variant: &Variant<W>, mv: Move) -> String {
    let geo = variant.geo();
    if mv.is_none() {
        return "0000".to_string();
    }
    if mv.is_drop() {
        let (piece, side, to) = mv.drop_slot(0);
        return format!(
            "{}@{}",
            variant.pieces[piece.index()].abbrev[side.index()].to_uppercase(),
            geo.square_name(to)
        );
    }
    if mv.is_pickup() {
        // A pickup to hand reads as a move to its own square
        let name = geo.square_name(mv.from());
        return format!("{name}{name}");
    }
    let mut out = format!("{}{}", geo.square_name(mv.from()), geo.square_name(mv.to()));
    if mv.is_promotion() {
        let target = mv.final_piece();
        out.push(
            variant.pieces[target.index()]
                .notation
                .to_ascii_lowercase(),
        );
    }
    if mv.is_gate() {
        let (piece, _, _) = mv.drop_slot(mv.drops() - 1);
        out.push('/');
        out.push(variant.pieces[piece.index()].notation);
    }
    out
}

/// SAN rendering against the legal move list (for disambiguation).
#[must_use]
pub fn to_san<W: BitWord>(
    variant: &Variant<W>,
    board: &mut Board<W>,
    legal: &MoveList,
    mv: Move,
) -> String {
    let geo = variant.geo();
    if mv.is_castle() {
        let base = if geo.file_of(mv.to()) > geo.file_of(mv.from()) {
            "O-O"
        } else {
            "O-O-O"
        };
        return format!("{base}{}", san_suffix(variant, board, mv));
    }
    if mv.is_drop() {
        let (piece, _, to) = mv.drop_slot(0);
        return format!(
            "{}@{}{}",
            variant.pieces[piece.index()].notation,
            geo.square_name(to),
            san_suffix(variant, board, mv)
        );
    }
    if mv.is_pickup() {
        return to_lan(variant, mv);
    }

    let piece = mv.piece();
    let desc = &variant.pieces[piece.index()];
    let mut out = String::new();

    if desc.is_pawn() {
        if mv.is_capture() {
            out.push((b'a' + geo.file_of(mv.from()) as u8) as char);
        }
    } else {
        out.push(desc.notation);
        // Disambiguate against sibling moves
        let twins: Vec<Move> = legal
            .iter()
            .copied()
            .filter(|m| {
                !m.is_drop()
                    && !m.is_castle()
                    && !m.is_pickup()
                    && m.swaps() + m.pickups() > 0
                    && m.piece() == piece
                    && m.to() == mv.to()
                    && m.from() != mv.from()
            })
            .collect();
        if !twins.is_empty() {
            let same_file = twins
                .iter()
                .any(|m| geo.file_of(m.from()) == geo.file_of(mv.from()));
            if !same_file {
                out.push((b'a' + geo.file_of(mv.from()) as u8) as char);
            } else {
                let same_rank = twins
                    .iter()
                    .any(|m| geo.rank_of(m.from()) == geo.rank_of(mv.from()));
                if !same_rank {
                    out.push_str(&(geo.rank_of(mv.from()) + 1).to_string());
                } else {
                    out.push_str(&geo.square_name(mv.from()));
                }
            }
        }
    }

    if mv.is_capture() {
        out.push('x');
    }
    out.push_str(&geo.square_name(mv.to()));
    if mv.is_promotion() {
        out.push('=');
        out.push(variant.pieces[mv.final_piece().index()].notation);
    }
    if mv.is_gate() {
        let (piece, _, _) = mv.drop_slot(mv.drops() - 1);
        out.push('/');
        out.push(variant.pieces[piece.index()].notation);
    }
    out.push_str(&san_suffix(variant, board, mv));
    out
}

/// `+` or `#` by making the move and looking.
fn san_suffix<W: BitWord>(variant: &Variant<W>, board: &mut Board<W>, mv: Move) -> String {
    let mut ui = crate::board::UnmakeInfo::default();
    board.make(variant, mv, &mut ui);
    let opp_in_check = variant
        .movegen
        .player_in_check(variant, board, board.side_to_move);
    let suffix = if opp_in_check {
        if crate::search::no_legal_reply(variant, board) {
            "#"
        } else {
            "+"
        }
    } else {
        ""
    };
    board.unmake(variant, mv, &ui);
    suffix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::search::legal_moves;
    use crate::variants;

    fn setup(fen: &str) -> (std::sync::Arc<crate::Variant<u64>>, Board<u64>, MoveList) {
        let game = crate::Game::new(variants::chess::<u64>().expect("chess")).expect("game");
        let variant = game.variant.clone();
        let mut board = Board::new();
        crate::fen::setup_fen(&variant, &mut board, fen, false).expect("fen");
        let mut list = MoveList::new();
        legal_moves(&variant, &mut board, &mut list);
        (variant, board, list)
    }

    #[test]
    fn test_pawn_push_and_capture_san() {
        let (variant, mut board, list) =
            setup("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let push = parse_move(&variant, &list, "e5").expect("push");
        assert_eq!(to_san(&variant, &mut board, &list, push), "e5");
        let take = parse_move(&variant, &list, "exd5").expect("capture");
        assert!(take.is_capture());
        assert_eq!(to_san(&variant, &mut board, &list, take), "exd5");
        assert_eq!(to_lan(&variant, take), "e4d5");
    }

    #[test]
    fn test_check_and_mate_suffixes() {
        let (variant, mut board, list) = setup("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1");
        let mate = parse_move(&variant, &list, "a1a8").expect("rook lift");
        assert_eq!(to_san(&variant, &mut board, &list, mate), "Ra8#");
        let (variant2, mut board2, list2) = setup("6k1/6pp/8/8/8/8/6PP/R5K1 w - - 0 1");
        let check = parse_move(&variant2, &list2, "a1a8").expect("rook lift");
        assert_eq!(to_san(&variant2, &mut board2, &list2, check), "Ra8+");
    }

    #[test]
    fn test_promotion_text_roundtrip() {
        let (variant, mut board, list) = setup("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
        let by_san = parse_move(&variant, &list, "a8=N").expect("underpromotion");
        assert!(by_san.is_promotion());
        let by_lan = parse_move(&variant, &list, "a7a8n").expect("lan promotion");
        assert_eq!(by_san, by_lan);
        let san = to_san(&variant, &mut board, &list, by_san);
        assert!(san.starts_with("a8=N"), "got {san}");
        assert_eq!(to_lan(&variant, by_san), "a7a8n");
    }

    #[test]
    fn test_rank_disambiguation() {
        // Rooks on a1 and a5 both reach a3
        let (variant, mut board, list) = setup("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1");
        assert!(parse_move(&variant, &list, "Ra3").is_err());
        let low = parse_move(&variant, &list, "R1a3").expect("disambiguated");
        assert_eq!(to_san(&variant, &mut board, &list, low), "R1a3");
    }

    #[test]
    fn test_garbage_rejected() {
        let (variant, _, list) = setup("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
        assert!(parse_move(&variant, &list, "").is_err());
        assert!(parse_move(&variant, &list, "zz9").is_err());
        assert!(parse_move(&variant, &list, "e5").is_err(), "not reachable yet");
        assert!(parse_move(&variant, &list, "O-O").is_err(), "castle blocked");
    }
}
