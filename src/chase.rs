//! Chase detection for the Xiangqi chase rule.
//!
//! When a repetition arises under `USE_CHASERULE`, the side that keeps
//! attacking an unprotected non-pawn, non-royal piece without delivering
//! check is the chaser and must deviate. The classifier looks at the
//! repeated position itself: pieces the mover newly threatens that have no
//! defender and cannot profitably be exchanged count as chased.

use crate::bits::BitWord;
use crate::board::Board;
use crate::geometry::{Bitboard, Side};
use crate::pieces::PieceClass;
use crate::variant::Variant;

/// Who, if anyone, is chasing in the repeated position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChaseVerdict {
    /// Plain repetition; score it as such.
    None,
    /// The side to move is chasing; its repetition claim is illegal.
    StmChases,
    /// The opponent is chasing; the repetition wins for the side to move.
    OppChases,
}

/// Classify a repetition position.
pub fn classify<W: BitWord>(variant: &Variant<W>, board: &Board<W>) -> ChaseVerdict {
    let stm = board.side_to_move;
    let stm_chasing = chased_pieces(variant, board, stm.flip());
    let opp_chasing = chased_pieces(variant, board, stm);

    // A mutual chase cancels out, as does no chase at all
    match (!stm_chasing.is_empty(), !opp_chasing.is_empty()) {
        (true, false) => ChaseVerdict::StmChases,
        (false, true) => ChaseVerdict::OppChases,
        _ => ChaseVerdict::None,
    }
}

/// Pieces of `victim_side` that stand chased: attacked by an enemy piece,
/// not a pawn or royal, and without a defender of equal standing.
pub fn chased_pieces<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
    victim_side: Side,
) -> Bitboard<W> {
    let attacker_side = victim_side.flip();
    let occ = board.occupied();
    let mut chased = Bitboard::EMPTY;

    let mut victims = board.bbc[victim_side.index()] & !board.royal;
    while !victims.is_empty() {
        let sq = victims.pop();
        let piece = board.get_piece(sq);
        let desc = &variant.pieces[piece.index()];
        if matches!(desc.class, PieceClass::Pawn) {
            continue;
        }

        let attackers = variant.movegen.attackers_of(
            variant,
            board,
            Bitboard::from_square(sq),
            attacker_side,
            occ,
        );
        if attackers.is_empty() {
            continue;
        }

        // A cheaper attacker chases regardless of protection; an equal or
        // dearer one only when the victim is unprotected
        let defended = variant.movegen.any_attack_on(
            variant,
            board,
            Bitboard::from_square(sq),
            victim_side,
            occ & !Bitboard::from_square(sq),
        );
        let mut cheapest = i32::MAX;
        for a in attackers.iter() {
            let ap = board.get_piece(a);
            cheapest = cheapest.min(variant.pieces[ap.index()].value.0);
        }
        if cheapest < desc.value.0 || !defended {
            chased.set(sq);
        }
    }
    chased
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fen;
    use crate::variants;

    #[test]
    fn test_undefended_attacked_horse_is_chased() {
        let variant = variants::xiangqi::<u128>().expect("xiangqi");
        let mut board = Board::new();
        // Red chariot on the open file stares down an unprotected horse
        fen::setup_fen(
            &variant,
            &mut board,
            "4k4/9/2h6/9/9/9/9/2R6/9/4K4 b - - 0 1",
            false,
        )
        .expect("fen");
        let chased = chased_pieces(&variant, &board, Side::Black);
        let geo = variant.geo();
        assert!(chased.test(geo.parse_square("c8").expect("c8")));
        // Black is to move, so the chasing side is the opponent
        assert_eq!(classify(&variant, &board), ChaseVerdict::OppChases);
    }

    #[test]
    fn test_protected_equal_piece_is_not_chased() {
        let variant = variants::xiangqi::<u128>().expect("xiangqi");
        let mut board = Board::new();
        // The horse now has a chariot defender of its own
        fen::setup_fen(
            &variant,
            &mut board,
            "2r1k4/9/2h6/9/9/9/9/2R6/9/4K4 b - - 0 1",
            false,
        )
        .expect("fen");
        let chased = chased_pieces(&variant, &board, Side::Black);
        let geo = variant.geo();
        assert!(!chased.test(geo.parse_square("c8").expect("c8")));
    }

    #[test]
    fn test_pawns_and_royals_never_count_as_chased() {
        let variant = variants::xiangqi::<u128>().expect("xiangqi");
        let mut board = Board::new();
        // A chariot bearing down on a soldier and the general
        fen::setup_fen(
            &variant,
            &mut board,
            "4k4/9/4p4/9/9/9/9/4R4/9/3K5 b - - 0 1",
            false,
        )
        .expect("fen");
        let chased = chased_pieces(&variant, &board, Side::Black);
        assert!(chased.is_empty());
    }
}
