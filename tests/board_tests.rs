//! Board state, make/unmake and FEN round-trip tests.

use fairy_engine::board::{Board, UnmakeInfo};
use fairy_engine::fen;
use fairy_engine::movegen::GenMode;
use fairy_engine::moves::MoveList;
use fairy_engine::search::legal_moves;
use fairy_engine::variants;
use fairy_engine::{Game, Move, Side};

const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

fn chess_board(fen_str: &str) -> (std::sync::Arc<fairy_engine::Variant<u64>>, Board<u64>) {
    let game = Game::new(variants::chess::<u64>().expect("chess")).expect("game");
    let variant = game.variant.clone();
    let mut board = Board::new();
    fen::setup_fen(&variant, &mut board, fen_str, false).expect("fen parses");
    (variant, board)
}

fn find_move(
    variant: &fairy_engine::Variant<u64>,
    board: &mut Board<u64>,
    from: &str,
    to: &str,
) -> Move {
    let geo = variant.geo();
    let mut list = MoveList::new();
    legal_moves(variant, board, &mut list);
    let from_sq = geo.parse_square(from).expect("from");
    let to_sq = geo.parse_square(to).expect("to");
    *list
        .iter()
        .find(|m| !m.is_drop() && m.from() == from_sq && m.to() == to_sq)
        .expect("move present")
}

#[test]
fn test_start_position_basics() {
    let (variant, board) = chess_board(START);
    assert_eq!(board.occupied().popcount(), 32);
    assert_eq!(board.side_to_move, Side::White);
    assert!(!variant.movegen.player_in_check(&variant, &board, Side::White));
    assert_eq!(board.hash, board.recompute_hash(&variant));
    assert_eq!(board.castle_rights, 0b1111);
}

#[test]
fn test_make_unmake_restores_everything() {
    let (variant, mut board) = chess_board(START);
    let before_hash = board.hash;
    let before_board_hash = board.board_hash;
    let before_init = board.init;

    let mv = find_move(&variant, &mut board, "e2", "e4");
    let mut ui = UnmakeInfo::default();
    board.make(&variant, mv, &mut ui);
    assert_ne!(board.hash, before_hash);
    assert_eq!(board.side_to_move, Side::Black);
    board.unmake(&variant, mv, &ui);

    assert_eq!(board.hash, before_hash);
    assert_eq!(board.board_hash, before_board_hash);
    assert_eq!(board.init, before_init);
    assert_eq!(board.side_to_move, Side::White);
    assert_eq!(board.hash, board.recompute_hash(&variant));
}

#[test]
fn test_double_push_sets_en_passant() {
    let (variant, mut board) = chess_board(START);
    let mv = find_move(&variant, &mut board, "e2", "e4");
    assert!(mv.sets_enpassant());
    let mut ui = UnmakeInfo::default();
    board.make(&variant, mv, &mut ui);

    let geo = variant.geo();
    let e3 = geo.parse_square("e3").expect("e3");
    let e4 = geo.parse_square("e4").expect("e4");
    assert!(board.ep.test(e3));
    assert_eq!(board.ep_victim, Some(e4));

    // A single push must not set it
    board.unmake(&variant, mv, &ui);
    let single = find_move(&variant, &mut board, "d2", "d3");
    assert!(!single.sets_enpassant());
}

#[test]
fn test_en_passant_capture_removes_victim() {
    let (variant, mut board) = chess_board("4k3/8/8/1pP5/8/8/8/4K3 w - b6 0 1");
    let geo = variant.geo();
    let mut list = MoveList::new();
    legal_moves(&variant, &mut board, &mut list);
    let b6 = geo.parse_square("b6").expect("b6");
    let b5 = geo.parse_square("b5").expect("b5");
    let ep = list
        .iter()
        .find(|m| m.is_capture() && !m.is_drop() && m.to() == b6)
        .copied()
        .expect("en passant available");
    assert_eq!(ep.capture_square(), b5);

    let mut ui = UnmakeInfo::default();
    board.make(&variant, ep, &mut ui);
    assert!(board.piece_at(b5).is_none());
    assert!(board.piece_at(b6).is_some());
    board.unmake(&variant, ep, &ui);
    assert!(board.piece_at(b5).is_some());
    assert_eq!(board.hash, board.recompute_hash(&variant));
}

#[test]
fn test_castle_make_unmake() {
    let (variant, mut board) = chess_board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    let mv = find_move(&variant, &mut board, "e1", "g1");
    assert!(mv.is_castle());
    let before = board.hash;

    let geo = variant.geo();
    let mut ui = UnmakeInfo::default();
    board.make(&variant, mv, &mut ui);
    let g1 = geo.parse_square("g1").expect("g1");
    let f1 = geo.parse_square("f1").expect("f1");
    assert!(board.piece_at(g1).is_some());
    assert!(board.piece_at(f1).is_some());
    // Both white rights fall with the king's unmoved mark
    assert_eq!(board.castle_rights & 0b0011, 0);

    board.unmake(&variant, mv, &ui);
    assert_eq!(board.hash, before);
    assert_eq!(board.castle_rights & 0b0011, 0b0011);
}

#[test]
fn test_rook_move_drops_one_castle_right() {
    let (variant, mut board) = chess_board("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    let mv = find_move(&variant, &mut board, "h1", "h2");
    let mut ui = UnmakeInfo::default();
    board.make(&variant, mv, &mut ui);
    // White kingside right gone, queenside kept
    assert_eq!(board.castle_rights & 0b0001, 0);
    assert_ne!(board.castle_rights & 0b0010, 0);
}

#[test]
fn test_promotion_and_demotion_identity() {
    let (variant, mut board) = chess_board("4k3/P7/8/8/8/8/8/4K3 w - - 0 1");
    let mut list = MoveList::new();
    legal_moves(&variant, &mut board, &mut list);
    let promos: Vec<Move> = list.iter().copied().filter(|m| m.is_promotion()).collect();
    assert_eq!(promos.len(), 4, "four underpromotion choices");

    let queen = variant.piece_by_notation('Q').expect("queen");
    let promo = promos
        .iter()
        .copied()
        .find(|m| m.final_piece() == queen)
        .expect("queen promotion");
    let before = board.hash;
    let mut ui = UnmakeInfo::default();
    board.make(&variant, promo, &mut ui);
    let a8 = variant.geo().parse_square("a8").expect("a8");
    assert_eq!(board.piece_at(a8).map(|(p, _)| p), Some(queen));
    board.unmake(&variant, promo, &ui);
    assert_eq!(board.hash, before);
    let a7 = variant.geo().parse_square("a7").expect("a7");
    let pawn = variant.piece_by_notation('P').expect("pawn");
    assert_eq!(board.piece_at(a7).map(|(p, _)| p), Some(pawn));
}

#[test]
fn test_fen_roundtrip() {
    for fen_str in [
        START,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "4k3/8/8/1pP5/8/8/8/4K3 w - b6 0 1",
        "8/8/8/8/8/8/4P3/4K2k b - - 12 34",
    ] {
        let (variant, board) = chess_board(fen_str);
        let out = fen::make_fen(&variant, &board, 1);
        let (_, reparsed) = chess_board(&out);
        assert_eq!(board.hash, reparsed.hash, "fen {fen_str} -> {out}");
        assert_eq!(board.fifty_counter, reparsed.fifty_counter);
    }
}

#[test]
fn test_fen_errors_leave_board_untouched() {
    let (variant, mut board) = chess_board(START);
    let before = board.hash;
    assert!(fen::setup_fen(&variant, &mut board, "rubbish", false).is_err());
    assert!(fen::setup_fen(&variant, &mut board, "8/8/8/8/8/8/8/9 w - - 0 1", false).is_err());
    assert_eq!(board.hash, before);
}

#[test]
fn test_pseudo_moves_superset_of_legal() {
    let (variant, mut board) =
        chess_board("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3");
    let mut pseudo = MoveList::new();
    variant
        .movegen
        .generate_moves(&variant, &board, Side::White, &mut pseudo, GenMode::All);
    let mut legal = MoveList::new();
    legal_moves(&variant, &mut board, &mut legal);
    assert!(legal.len() < pseudo.len(), "some pseudo moves leave check");
    for mv in legal.iter() {
        assert!(pseudo.contains(*mv));
    }
}

#[test]
fn test_null_move_roundtrip() {
    let (variant, mut board) = chess_board("4k3/8/8/1pP5/8/8/8/4K3 w - b6 0 1");
    let before_hash = board.hash;
    let before_ep = board.ep;
    let info = board.make_null();
    assert!(board.ep.is_empty());
    assert_eq!(board.side_to_move, Side::Black);
    assert_ne!(board.hash, before_hash);
    board.unmake_null(info);
    assert_eq!(board.hash, before_hash);
    assert_eq!(board.ep, before_ep);
    let _ = variant;
}
