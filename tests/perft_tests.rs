//! Move-generator validation by perft counts.

use fairy_engine::variants;
use fairy_engine::Game;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn chess_game(fen: Option<&str>) -> Game<u64> {
    let mut game = Game::new(variants::chess::<u64>().expect("chess")).expect("game");
    if let Some(fen) = fen {
        game.setup_fen_position(fen, false).expect("fen parses");
    }
    game
}

#[test]
fn test_perft_startpos_shallow() {
    let mut game = chess_game(None);
    assert_eq!(game.perft(1), 20);
    assert_eq!(game.perft(2), 400);
    assert_eq!(game.perft(3), 8_902);
    assert_eq!(game.perft(4), 197_281);
}

#[test]
fn test_perft_startpos_depth_5() {
    let mut game = chess_game(None);
    assert_eq!(game.perft(5), 4_865_609);
}

#[test]
#[ignore = "slow; run with --ignored for the full sweep"]
fn test_perft_startpos_depth_6() {
    let mut game = chess_game(None);
    assert_eq!(game.perft(6), 119_060_324);
}

#[test]
fn test_perft_kiwipete_shallow() {
    let mut game = chess_game(Some(KIWIPETE));
    assert_eq!(game.perft(1), 48);
    assert_eq!(game.perft(2), 2_039);
    assert_eq!(game.perft(3), 97_862);
}

#[test]
#[ignore = "slow; run with --ignored for the full sweep"]
fn test_perft_kiwipete_deep() {
    let mut game = chess_game(Some(KIWIPETE));
    assert_eq!(game.perft(4), 4_085_603);
    assert_eq!(game.perft(5), 193_690_690);
}

#[test]
fn test_perft_en_passant_position() {
    // Position 3 from the usual perft suite: en passant and pins
    let mut game = chess_game(Some("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1"));
    assert_eq!(game.perft(1), 14);
    assert_eq!(game.perft(2), 191);
    assert_eq!(game.perft(3), 2_812);
    assert_eq!(game.perft(4), 43_238);
    assert_eq!(game.perft(5), 674_624);
}

#[test]
fn test_perft_promotion_position() {
    // Position 4: promotions, castling refusals
    let mut game =
        chess_game(Some("r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1"));
    assert_eq!(game.perft(1), 6);
    assert_eq!(game.perft(2), 264);
    assert_eq!(game.perft(3), 9_467);
    assert_eq!(game.perft(4), 422_333);
}

#[test]
fn test_perft_divide_sums_to_total() {
    let mut game = chess_game(None);
    let divide = game.perft_divide(3);
    let total: u64 = divide.iter().map(|&(_, n)| n).sum();
    assert_eq!(total, 8_902);
    assert_eq!(divide.len(), 20);
}
