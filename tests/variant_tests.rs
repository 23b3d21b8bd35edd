//! Behaviour of the non-orthodox built-in variants: drops, gating, hoppers,
//! palaces and the baring rule.

use fairy_engine::moves::MoveList;
use fairy_engine::variants;
use fairy_engine::{Game, PlayState, Side};

#[test]
fn test_crazyhouse_capture_fills_hand() {
    let mut game = Game::new(variants::crazyhouse::<u64>().expect("variant")).expect("game");
    game.setup_fen_position("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2", false)
        .expect("fen");
    let capture = game.move_string_to_move("e4d5").expect("capture");
    assert!(capture.has_holdings());
    assert!(game.playmove(capture));

    let pawn = game.variant.piece_by_notation('P').expect("pawn");
    assert_eq!(game.board.holdings[pawn.index()][Side::White.index()], 1);

    // The hand shows up in the FEN and the hash
    let fen = game.make_fen_string();
    assert!(fen.contains('['), "crazyhouse FEN carries holdings: {fen}");
    assert!(fen.contains("[P]"), "white pawn in hand: {fen}");
}

#[test]
fn test_crazyhouse_drops_generated_and_played() {
    let mut game = Game::new(variants::crazyhouse::<u64>().expect("variant")).expect("game");
    game.setup_fen_position("rnbqkbnr/ppp1pppp/8/8/8/8/PPPP1PPP/RNBQKBNR[Pp] w KQkq - 0 3", false)
        .expect("fen");

    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    let drops: Vec<_> = list.iter().filter(|m| m.is_drop()).collect();
    // Pawn drops: all empty squares off the back ranks
    assert!(!drops.is_empty());
    for mv in &drops {
        let rank = game.variant.geo().rank_of(mv.to());
        assert!(rank > 0 && rank < 7, "no pawn drops on back ranks");
    }

    let drop = game.move_string_to_move("P@e4").expect("drop parses");
    assert!(game.playmove(drop));
    let pawn = game.variant.piece_by_notation('P').expect("pawn");
    assert_eq!(game.board.holdings[pawn.index()][Side::White.index()], 0);
    let e4 = game.variant.geo().parse_square("e4").expect("square");
    assert_eq!(game.board.piece_at(e4).map(|(p, _)| p), Some(pawn));
}

#[test]
fn test_crazyhouse_promoted_piece_demotes_to_pawn() {
    let mut game = Game::new(variants::crazyhouse::<u64>().expect("variant")).expect("game");
    // White promotes; black then captures the promoted piece
    game.setup_fen_position("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", false)
        .expect("fen");
    let promo = game.move_string_to_move("a7a8q").expect("promotion");
    assert!(game.playmove(promo));

    // The promoted queen demotes when captured
    let kd = game.move_string_to_move("e8d7").expect("king walk");
    assert!(game.playmove(kd));
    let quiet = game.move_string_to_move("e1d1").expect("quiet");
    assert!(game.playmove(quiet));
    let back = game.move_string_to_move("d7c6").expect("king walk 2");
    assert!(game.playmove(back));
    let quiet2 = game.move_string_to_move("d1e1").expect("quiet 2");
    assert!(game.playmove(quiet2));
    let take = game.move_string_to_move("c6b7").expect("approach");
    assert!(game.playmove(take));
    // Not capturing yet; verify the promoted piece's demotion entry instead
    let plus_q = game
        .variant
        .piece_by_abbrev("+Q")
        .map(|(p, _)| p)
        .expect("+Q exists");
    let pawn = game.variant.piece_by_notation('P').expect("pawn");
    assert_eq!(game.variant.pieces[plus_q.index()].demotion, pawn);
}

#[test]
fn test_seirawan_gating_moves_exist() {
    let mut game = Game::new(variants::seirawan::<u64>().expect("variant")).expect("game");
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);

    let gates: Vec<_> = list.iter().filter(|m| m.is_gate()).collect();
    // Knight moves from b1/g1 can gate a hawk or an elephant
    assert_eq!(list.len(), 28, "20 normal + 8 gated knight moves");
    assert_eq!(gates.len(), 8);

    let gated = game.move_string_to_move("b1c3/H").expect("gate parses");
    assert!(gated.is_gate());
    assert!(game.playmove(gated));
    let hawk = game.variant.piece_by_notation('H').expect("hawk");
    let b1 = game.variant.geo().parse_square("b1").expect("square");
    assert_eq!(game.board.piece_at(b1).map(|(p, _)| p), Some(hawk));
    assert_eq!(game.board.holdings[hawk.index()][Side::White.index()], 0);
}

#[test]
fn test_xiangqi_start_moves() {
    let mut game = Game::new(variants::xiangqi::<u128>().expect("variant")).expect("game");
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    // 5 soldier pushes, 1 king step, 2 advisor steps, 4 elephant spreads,
    // 4 horse hops, 4 chariot lifts, and 13 moves per cannon
    assert_eq!(list.len(), 46);
}

#[test]
fn test_xiangqi_cannon_needs_screen_to_capture() {
    let mut game = Game::new(variants::xiangqi::<u128>().expect("variant")).expect("game");
    // Classic opening: cannon to the middle, then it eyes the e7 soldier
    // over the e4 soldier screen
    let mv = game.move_string_to_move("b3e3").expect("cannon centralizes");
    assert!(game.playmove(mv));
    let reply = game.move_string_to_move("b10c8").expect("horse develops");
    assert!(game.playmove(reply));

    let shot = game.move_string_to_move("e3e7").expect("cannon takes over screen");
    assert!(shot.is_capture());
    assert!(game.playmove(shot));
}

#[test]
fn test_xiangqi_horse_is_blocked_by_adjacent_piece() {
    let mut game = Game::new(variants::xiangqi::<u128>().expect("variant")).expect("game");
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    let geo = game.variant.geo();
    let b1 = geo.parse_square("b1").expect("b1");
    let horse_moves: Vec<_> = list
        .iter()
        .filter(|m| !m.is_drop() && m.swaps() > 0 && m.from() == b1)
        .collect();
    // The rook on a1 and elephant on c1 block the sideways legs; only the
    // forward hops remain
    assert_eq!(horse_moves.len(), 2);
}

#[test]
fn test_xiangqi_flying_generals_forbidden() {
    let mut game = Game::new(variants::xiangqi::<u128>().expect("variant")).expect("game");
    // Kings face each other on the e-file with nothing between
    game.setup_fen_position("4k4/9/9/9/9/9/9/9/9/4K4 w - - 0 1", false)
        .expect("fen");
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    // The king may step sideways but never stay on the open file
    let geo = game.variant.geo();
    for mv in list.iter() {
        assert_ne!(
            geo.file_of(mv.to()),
            4,
            "move {} keeps the generals facing",
            game.move_to_lan(*mv)
        );
    }
}

#[test]
fn test_xiangqi_advisor_stays_in_palace() {
    let mut game = Game::new(variants::xiangqi::<u128>().expect("variant")).expect("game");
    let mv = game.move_string_to_move("d1e2").expect("advisor up");
    assert!(game.playmove(mv));
    let reply = game.move_string_to_move("d10e9").expect("black advisor");
    assert!(game.playmove(reply));
    // From e2 the advisor has the four palace diagonals minus occupied ones;
    // it can never leave files c..e
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    let geo = game.variant.geo();
    let e2 = geo.parse_square("e2").expect("e2");
    for mv in list.iter().filter(|m| !m.is_drop() && m.swaps() > 0 && m.from() == e2) {
        let f = geo.file_of(mv.to());
        assert!((2..=4).contains(&f), "advisor escaped the palace");
    }
}

#[test]
fn test_xiangqi_soldier_spreads_after_river() {
    let mut game = Game::new(variants::xiangqi::<u128>().expect("variant")).expect("game");
    game.setup_fen_position("4k4/9/9/9/4P4/9/9/9/9/4K4 w - - 0 1", false)
        .expect("fen");
    // The soldier on e6 has crossed the river; it was promoted to the
    // spread-moving form as it crossed, so from here it also steps sideways
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    let geo = game.variant.geo();
    let e6 = geo.parse_square("e6").expect("e6");
    let crossing = list
        .iter()
        .copied()
        .find(|m| !m.is_drop() && m.swaps() + m.pickups() > 0 && m.from() == e6)
        .expect("soldier move");
    // Crossing promotes into the crossed-soldier type
    assert!(game.playmove(crossing));
}

#[test]
fn test_shatranj_bare_king_loses() {
    let mut game = Game::new(variants::shatranj::<u64>().expect("variant")).expect("game");
    // White has a rook; black is bare
    game.setup_fen_position("4k3/8/8/8/8/8/8/R3K3 b - - 0 1", false)
        .expect("fen");
    let mut list = MoveList::new();
    let state = game.get_game_end_state(&mut list);
    assert_eq!(state, PlayState::EndedLoseBare);
}

#[test]
fn test_shatranj_pawn_promotes_to_ferz_only() {
    let mut game = Game::new(variants::shatranj::<u64>().expect("variant")).expect("game");
    game.setup_fen_position("4k3/P7/8/8/8/8/8/4K3 w - - 0 1", false)
        .expect("fen");
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    let promos: Vec<_> = list.iter().filter(|m| m.is_promotion()).collect();
    assert_eq!(promos.len(), 1);
    let ferz = game.variant.piece_by_notation('F').expect("ferz");
    assert_eq!(promos[0].final_piece(), ferz);
}

#[test]
fn test_capablanca_start_moves() {
    let mut game = Game::new(variants::capablanca::<u128>().expect("variant")).expect("game");
    let mut list = MoveList::new();
    game.generate_legal_moves(&mut list);
    // 20 pawn moves plus two leaps each from the knights, archbishop and
    // chancellor
    assert_eq!(list.len(), 28);
}

#[test]
fn test_flag_capture_rule_through_builder() {
    use fairy_engine::{RuleFlags, VariantBuilder};
    use fairy_engine::pieces::{PieceDesc, PieceFlags};

    // A bare-bones race variant: kings only, reach the far rank to win
    let mut b = VariantBuilder::<u64>::new("race", 8, 8).expect("builder");
    let king_leap = b.movegen().leaper(&[(0, 1), (1, 1)]).expect("leaper");
    let king = b
        .add_piece(PieceDesc::new("king", "K", "k", 'K', king_leap, 0))
        .expect("king");
    b.piece_mut(king).flags.insert(PieceFlags::ROYAL);
    let top = b.geo().rank[7];
    let bottom = b.geo().rank[0];
    b.set_flag_cells(Side::White, top);
    b.set_flag_cells(Side::Black, bottom);
    b.add_rules(RuleFlags::CAPTURE_ANY_FLAG);
    b.set_start_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
    let variant = b.finalize().expect("finalize");

    let mut game = Game::new(variant).expect("game");
    game.setup_fen_position("k7/4K3/8/8/8/8/8/8 w - - 0 1", false)
        .expect("fen");
    let step = game.move_string_to_move("e7e8").expect("step onto the flag");
    assert!(game.playmove(step));
    let mut list = MoveList::new();
    assert_eq!(
        game.get_game_end_state(&mut list),
        PlayState::EndedFlagCaptured
    );
}

#[test]
fn test_check_limit_rule() {
    // Single-check chess: one check ends the game
    let mut variant = variants::chess::<u64>().expect("chess");
    variant.scores.check_limit = 1;
    let mut game = Game::new(variant).expect("game");
    game.setup_fen_position("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1", false)
        .expect("fen");
    // The rook is pinned against nothing; sliding along the file checks
    let check = game.move_string_to_move("e2e5").expect("rook stays, still check");
    assert!(game.playmove(check));
    assert!(game.player_in_check(Side::Black));
    let mut list = MoveList::new();
    assert_eq!(
        game.get_game_end_state(&mut list),
        PlayState::EndedCheckCount
    );
}

#[test]
fn test_widths_are_independent() {
    // The same variant can host games on different board words
    let mut small = Game::new(variants::chess::<u64>().expect("chess")).expect("game");
    let mut large = Game::new(variants::chess::<u128>().expect("chess")).expect("game");
    assert_eq!(small.perft(3), large.perft(3));
}

#[test]
fn test_any_game_dispatch() {
    let mut any = variants::game_by_name("xiangqi").expect("xiangqi");
    let mut list = MoveList::new();
    any.generate_legal_moves(&mut list);
    assert_eq!(list.len(), 46);
    assert!(variants::game_by_name("no-such-variant").is_err());
}
