//! Built-in variant definitions.
//!
//! Drivers are expected to assemble their own variants through
//! [`VariantBuilder`]; the definitions here cover the mainstream family and
//! double as the fixtures the test suite plays with.

use crate::bits::BitWord;
use crate::error::VariantError;
use crate::geometry::{Bitboard, Dir, Side};
use crate::pieces::{MoveFlags, PieceDesc, PieceFlags, PromotionRow};
use crate::search::LEGAL_WIN;
use crate::variant::{RuleFlags, Variant, VariantBuilder};

/// Orthodox chess.
pub fn chess<W: BitWord>() -> Result<Variant<W>, VariantError> {
    let mut b = VariantBuilder::new("chess", 8, 8)?;
    add_orthodox_pieces(&mut b, "NBRQ")?;
    add_orthodox_castling(&mut b)?;
    b.set_start_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    b.finalize()
}

/// Crazyhouse: captures go to hand, drops allowed, promoted pieces demote.
pub fn crazyhouse<W: BitWord>() -> Result<Variant<W>, VariantError> {
    let mut b = VariantBuilder::new("crazyhouse", 8, 8)?;
    let pawn = add_orthodox_pieces(&mut b, "+N+B+R+Q")?;

    // Promoted forms: orthodox movers that demote to a pawn when captured
    let n_flags = b.movegen().leaper(&[(1, 2)])?;
    let bishop = slider_flags(false, true);
    let rook = slider_flags(true, false);
    let queen = slider_flags(true, true);
    for (name, white, black, notation, flags, value) in [
        ("promoted knight", "+N", "+n", 'N', n_flags, 320),
        ("promoted bishop", "+B", "+b", 'B', bishop, 330),
        ("promoted rook", "+R", "+r", 'R', rook, 500),
        ("promoted queen", "+Q", "+q", 'Q', queen, 950),
    ] {
        let id = b.add_piece(PieceDesc::new(name, white, black, notation, flags, value))?;
        if white == "+B" {
            b.piece_mut(id).flags.insert(PieceFlags::COLOURBOUND);
        }
    }

    // Pawns may not be dropped on either back rank
    let zone = b.geo().all & !(b.geo().rank[0] | b.geo().rank[7]);
    b.piece_mut(pawn).drop_zone = [zone, zone];

    add_orthodox_castling(&mut b)?;
    b.add_rules(RuleFlags::ALLOW_DROPS | RuleFlags::KEEP_CAPTURE);
    b.set_start_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    b.finalize()
}

/// Seirawan chess: hawks and elephants gate in on vacated back-rank squares.
pub fn seirawan<W: BitWord>() -> Result<Variant<W>, VariantError> {
    let mut b = VariantBuilder::new("seirawan", 8, 8)?;
    add_orthodox_pieces(&mut b, "NBRQHE")?;

    let n_leap = b.movegen().leaper(&[(1, 2)])?;
    let hawk = n_leap.or(slider_flags(false, true));
    let elephant = n_leap.or(slider_flags(true, false));
    b.add_piece(PieceDesc::new("hawk", "H", "h", 'H', hawk, 860))?;
    b.add_piece(PieceDesc::new("elephant", "E", "e", 'E', elephant, 900))?;

    add_orthodox_castling(&mut b)?;
    b.add_rules(RuleFlags::GATE_DROPS);
    b.set_start_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[HEhe] w KQkq - 0 1");
    b.finalize()
}

/// Capablanca chess on 10x8 with archbishop and chancellor.
pub fn capablanca<W: BitWord>() -> Result<Variant<W>, VariantError> {
    let mut b = VariantBuilder::new("capablanca", 10, 8)?;
    add_orthodox_pieces(&mut b, "NBRQAC")?;

    let n_leap = b.movegen().leaper(&[(1, 2)])?;
    let archbishop = n_leap.or(slider_flags(false, true));
    let chancellor = n_leap.or(slider_flags(true, false));
    b.add_piece(PieceDesc::new("archbishop", "A", "a", 'A', archbishop, 840))?;
    b.add_piece(PieceDesc::new("chancellor", "C", "c", 'C', chancellor, 880))?;

    let geo = b.geo();
    let (e1, i1, b1) = (geo.square(5, 0), geo.square(8, 0), geo.square(2, 0));
    let (a1, j1) = (geo.square(0, 0), geo.square(9, 0));
    let (e8, i8_, b8) = (geo.square(5, 7), geo.square(8, 7), geo.square(2, 7));
    let (a8, j8) = (geo.square(0, 7), geo.square(9, 7));
    b.movegen().add_castle_rule(Side::White, e1, i1, j1)?;
    b.movegen().add_castle_rule(Side::White, e1, b1, a1)?;
    b.movegen().add_castle_rule(Side::Black, e8, i8_, j8)?;
    b.movegen().add_castle_rule(Side::Black, e8, b8, a8)?;

    b.set_start_fen("rnabqkbcnr/pppppppppp/10/10/10/10/PPPPPPPPPP/RNABQKBCNR w KQkq - 0 1");
    b.finalize()
}

/// Xiangqi on the 9x10 board.
pub fn xiangqi<W: BitWord>() -> Result<Variant<W>, VariantError> {
    let mut b = VariantBuilder::new("xiangqi", 9, 10)?;

    let geo = b.geo();
    let mut palace_white = Bitboard::EMPTY;
    let mut palace_black = Bitboard::EMPTY;
    for f in 3..=5 {
        for r in 0..=2 {
            palace_white.set(geo.square(f, r));
            palace_black.set(geo.square(f, 9 - r));
        }
    }
    let white_half = geo.homeland[0];
    let black_half = geo.homeland[1];

    let wazir = b.movegen().leaper(&[(0, 1)])?;
    let ferz = b.movegen().leaper(&[(1, 1)])?;
    let elephant = b.movegen().double_leaper(&[(1, 1)], &[(1, 1)], Some(&[(2, 2)]))?;
    let horse = b.movegen().double_leaper(&[(1, 0)], &[(1, 1)], Some(&[(1, 2)]))?;
    let rook = slider_flags(true, false);
    let cannon_hop = hopper_flags();
    let step_forward = b.movegen().stepper(&[(Dir::North, 1)])?;
    let step_spread = b
        .movegen()
        .stepper(&[(Dir::North, 1), (Dir::East, 1), (Dir::West, 1)])?;

    let king = b.add_piece(PieceDesc::new("general", "K", "k", 'K', wazir, 0))?;
    b.piece_mut(king).flags.insert(PieceFlags::ROYAL);
    b.piece_mut(king).prison = [palace_white, palace_black];

    let advisor = b.add_piece(PieceDesc::new("advisor", "A", "a", 'A', ferz, 200))?;
    b.piece_mut(advisor).prison = [palace_white, palace_black];

    let eleph = b.add_piece(PieceDesc::new("elephant", "E", "e", 'E', elephant, 200))?;
    b.piece_mut(eleph).prison = [white_half, black_half];

    b.add_piece(PieceDesc::new("horse", "H", "h", 'H', horse, 400))?;
    b.add_piece(PieceDesc::new("chariot", "R", "r", 'R', rook, 900))?;

    let cannon = b.add_piece(PieceDesc::new("cannon", "C", "c", 'C', rook, 450))?;
    b.piece_mut(cannon).capture_flags = cannon_hop;

    let pawn = b.add_piece(PieceDesc::new("soldier", "P", "p", 'P', step_forward, 100))?;
    // Crossing the river turns the soldier into its spread-moving form
    let crossed =
        b.add_piece(PieceDesc::new("crossed soldier", "+P", "+p", 'P', step_spread, 200))?;
    b.piece_mut(crossed).capture_flags = step_spread;
    b.piece_mut(pawn).capture_flags = step_forward;
    b.piece_mut(pawn).promotion.push(PromotionRow {
        zone: [black_half, white_half],
        targets: "+P".to_string(),
        choice: 0,
    });

    b.add_zone("white palace", palace_white);
    b.add_zone("black palace", palace_black);
    b.add_rules(RuleFlags::KING_TABOO | RuleFlags::KING_TRAPPED | RuleFlags::USE_CHASERULE);
    b.scores_mut().stalemate = -LEGAL_WIN;
    b.scores_mut().fifty_limit = 120;
    b.set_start_fen("rheakaehr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RHEAKAEHR w - - 0 1");
    b.finalize()
}

/// Shatranj: elephants and ferz, the baring rule, stalemate a loss.
pub fn shatranj<W: BitWord>() -> Result<Variant<W>, VariantError> {
    let mut b = VariantBuilder::new("shatranj", 8, 8)?;

    let king_leap = b.movegen().leaper(&[(0, 1), (1, 1)])?;
    let ferz = b.movegen().leaper(&[(1, 1)])?;
    let alfil = b.movegen().leaper(&[(2, 2)])?;
    let knight = b.movegen().leaper(&[(1, 2)])?;
    let rook = slider_flags(true, false);
    let fwd = b.movegen().stepper(&[(Dir::North, 1)])?;
    let pawn_take = b.movegen().asym_leaper(&[(-1, 1), (1, 1)])?;

    let king = b.add_piece(PieceDesc::new("shah", "K", "k", 'K', king_leap, 0))?;
    b.piece_mut(king).flags.insert(PieceFlags::ROYAL);

    b.add_piece(PieceDesc::new("ferz", "F", "f", 'F', ferz, 200))?;
    let a = b.add_piece(PieceDesc::new("alfil", "A", "a", 'A', alfil, 200))?;
    b.piece_mut(a).flags.insert(PieceFlags::COLOURBOUND);
    b.add_piece(PieceDesc::new("faras", "N", "n", 'N', knight, 320))?;
    b.add_piece(PieceDesc::new("rukh", "R", "r", 'R', rook, 500))?;

    let geo = b.geo();
    let last = [geo.rank[7], geo.rank[0]];
    let pawn = b.add_piece(PieceDesc::new("baidaq", "P", "p", 'P', fwd, 100))?;
    b.piece_mut(pawn).capture_flags = pawn_take;
    b.piece_mut(pawn).promotion.push(PromotionRow {
        zone: last,
        targets: "F".to_string(),
        choice: 0,
    });

    b.add_rules(RuleFlags::USE_BARERULE);
    b.scores_mut().stalemate = -LEGAL_WIN;
    b.scores_mut().fifty_limit = 140;
    b.set_start_fen("rnakfanr/pppppppp/8/8/8/8/PPPPPPPP/RNAKFANR w - - 0 1");
    b.finalize()
}

// ----------------------------------------------------------------------
// Shared plumbing
// ----------------------------------------------------------------------

fn slider_flags(orthogonal: bool, diagonal: bool) -> MoveFlags {
    let mut flags = 0u32;
    if orthogonal {
        flags |= MoveFlags::SLIDER_H | MoveFlags::SLIDER_V;
    }
    if diagonal {
        flags |= MoveFlags::SLIDER_D | MoveFlags::SLIDER_A;
    }
    MoveFlags(flags)
}

/// Orthogonal screen-jumper (the cannon's capture).
fn hopper_flags() -> MoveFlags {
    MoveFlags((MoveFlags::SLIDER_H | MoveFlags::SLIDER_V) << MoveFlags::HOPPER_SHIFT)
}

/// Declare the orthodox six with the given promotion-target string; returns
/// the pawn's id.
fn add_orthodox_pieces<W: BitWord>(
    b: &mut VariantBuilder<W>,
    promotion_targets: &str,
) -> Result<crate::pieces::PieceId, VariantError> {
    let fwd1 = b.movegen().stepper(&[(Dir::North, 1)])?;
    let fwd2 = b.movegen().stepper(&[(Dir::North, 2)])?;
    let pawn_take = b.movegen().asym_leaper(&[(-1, 1), (1, 1)])?;
    let knight = b.movegen().leaper(&[(1, 2)])?;
    let king_leap = b.movegen().leaper(&[(0, 1), (1, 1)])?;

    let geo = b.geo();
    let last = [geo.rank[geo.ranks - 1], geo.rank[0]];

    let pawn = b.add_piece(PieceDesc::new("pawn", "P", "p", 'P', fwd1, 100))?;
    {
        let desc = b.piece_mut(pawn);
        desc.capture_flags = pawn_take;
        desc.initial_flags = fwd2;
        desc.flags.insert(PieceFlags::SET_EP);
        desc.flags.insert(PieceFlags::TAKE_EP);
        desc.promotion.push(PromotionRow {
            zone: last,
            targets: promotion_targets.to_string(),
            choice: 0,
        });
    }

    b.add_piece(PieceDesc::new("knight", "N", "n", 'N', knight, 320))?;
    let bishop = b.add_piece(PieceDesc::new(
        "bishop",
        "B",
        "b",
        'B',
        slider_flags(false, true),
        330,
    ))?;
    b.piece_mut(bishop).flags.insert(PieceFlags::PAIR_BONUS);
    b.piece_mut(bishop).flags.insert(PieceFlags::COLOURBOUND);
    b.add_piece(PieceDesc::new("rook", "R", "r", 'R', slider_flags(true, false), 500))?;
    b.add_piece(PieceDesc::new("queen", "Q", "q", 'Q', slider_flags(true, true), 950))?;
    let king = b.add_piece(PieceDesc::new("king", "K", "k", 'K', king_leap, 0))?;
    b.piece_mut(king)
        .flags
        .insert(PieceFlags::ROYAL | PieceFlags::CASTLE);
    Ok(pawn)
}

fn add_orthodox_castling<W: BitWord>(b: &mut VariantBuilder<W>) -> Result<(), VariantError> {
    let geo = b.geo();
    let (e1, g1, c1) = (geo.square(4, 0), geo.square(6, 0), geo.square(2, 0));
    let (a1, h1) = (geo.square(0, 0), geo.square(7, 0));
    let top = geo.ranks - 1;
    let (e8, g8, c8) = (geo.square(4, top), geo.square(6, top), geo.square(2, top));
    let (a8, h8) = (geo.square(0, top), geo.square(7, top));
    b.movegen().add_castle_rule(Side::White, e1, g1, h1)?;
    b.movegen().add_castle_rule(Side::White, e1, c1, a1)?;
    b.movegen().add_castle_rule(Side::Black, e8, g8, h8)?;
    b.movegen().add_castle_rule(Side::Black, e8, c8, a8)?;
    Ok(())
}

/// Build the variant picked by name, wrapped in a width-erased game.
pub fn game_by_name(name: &str) -> Result<crate::game::AnyGame, VariantError> {
    use crate::game::{AnyGame, Game};
    let any = match name {
        "chess" => AnyGame::Medium(Game::new(chess::<u64>()?).map_err(|_| fen_error())?),
        "crazyhouse" => AnyGame::Medium(Game::new(crazyhouse::<u64>()?).map_err(|_| fen_error())?),
        "seirawan" => AnyGame::Medium(Game::new(seirawan::<u64>()?).map_err(|_| fen_error())?),
        "capablanca" => AnyGame::Large(Game::new(capablanca::<u128>()?).map_err(|_| fen_error())?),
        "xiangqi" => AnyGame::Large(Game::new(xiangqi::<u128>()?).map_err(|_| fen_error())?),
        "shatranj" => AnyGame::Medium(Game::new(shatranj::<u64>()?).map_err(|_| fen_error())?),
        other => {
            return Err(VariantError::UnknownPiece {
                symbol: other.to_string(),
            })
        }
    };
    Ok(any)
}

fn fen_error() -> VariantError {
    VariantError::MissingStartPosition
}
