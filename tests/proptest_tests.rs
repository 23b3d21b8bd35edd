//! Property tests: make/unmake restoration, hash consistency and FEN
//! round-trips over random legal play.

use proptest::prelude::*;

use fairy_engine::board::{Board, UnmakeInfo};
use fairy_engine::fen;
use fairy_engine::moves::MoveList;
use fairy_engine::search::legal_moves;
use fairy_engine::variants;
use fairy_engine::{Game, Move};

fn move_count_strategy() -> impl Strategy<Value = usize> {
    1..=24usize
}

fn seed_strategy() -> impl Strategy<Value = u64> {
    any::<u64>()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// make followed by unmake restores the board bit for bit
    #[test]
    fn prop_make_unmake_restores_state(seed in seed_strategy(), num_moves in move_count_strategy()) {
        use rand::prelude::*;

        let game = Game::new(variants::chess::<u64>().expect("chess")).expect("game");
        let variant = game.variant.clone();
        let mut board = Board::new();
        fen::setup_fen(&variant, &mut board, &variant.start_fen, false).expect("fen");
        let mut rng = StdRng::seed_from_u64(seed);

        let initial_hash = board.hash;
        let initial_board_hash = board.board_hash;
        let initial_fen = fen::make_fen(&variant, &board, 1);

        let mut history: Vec<(Move, UnmakeInfo<u64>)> = Vec::new();
        for _ in 0..num_moves {
            let mut moves = MoveList::new();
            legal_moves(&variant, &mut board, &mut moves);
            if moves.is_empty() {
                break;
            }
            let mv = moves.get(rng.gen_range(0..moves.len())).expect("index");
            let mut ui = UnmakeInfo::default();
            board.make(&variant, mv, &mut ui);
            variant.movegen.update_check_state(&variant, &mut board);
            history.push((mv, ui));
        }

        while let Some((mv, ui)) = history.pop() {
            board.unmake(&variant, mv, &ui);
        }

        prop_assert_eq!(board.hash, initial_hash);
        prop_assert_eq!(board.board_hash, initial_board_hash);
        prop_assert_eq!(fen::make_fen(&variant, &board, 1), initial_fen);
    }

    /// The incremental hash always equals the full Zobrist fold
    #[test]
    fn prop_hash_matches_recompute(seed in seed_strategy(), num_moves in move_count_strategy()) {
        use rand::prelude::*;

        let game = Game::new(variants::chess::<u64>().expect("chess")).expect("game");
        let variant = game.variant.clone();
        let mut board = Board::new();
        fen::setup_fen(&variant, &mut board, &variant.start_fen, false).expect("fen");
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..num_moves {
            let mut moves = MoveList::new();
            legal_moves(&variant, &mut board, &mut moves);
            if moves.is_empty() {
                break;
            }
            let mv = moves.get(rng.gen_range(0..moves.len())).expect("index");
            let mut ui = UnmakeInfo::default();
            board.make(&variant, mv, &mut ui);
            variant.movegen.update_check_state(&variant, &mut board);

            prop_assert_eq!(board.hash, board.recompute_hash(&variant));
            prop_assert!((board.bbc[0] & board.bbc[1]).is_empty());
        }
    }

    /// FEN round-trips preserve the position
    #[test]
    fn prop_fen_roundtrip(seed in seed_strategy(), num_moves in move_count_strategy()) {
        use rand::prelude::*;

        let game = Game::new(variants::chess::<u64>().expect("chess")).expect("game");
        let variant = game.variant.clone();
        let mut board = Board::new();
        fen::setup_fen(&variant, &mut board, &variant.start_fen, false).expect("fen");
        let mut rng = StdRng::seed_from_u64(seed);

        for _ in 0..num_moves {
            let mut moves = MoveList::new();
            legal_moves(&variant, &mut board, &mut moves);
            if moves.is_empty() {
                break;
            }
            let mv = moves.get(rng.gen_range(0..moves.len())).expect("index");
            let mut ui = UnmakeInfo::default();
            board.make(&variant, mv, &mut ui);
            variant.movegen.update_check_state(&variant, &mut board);
        }

        let out = fen::make_fen(&variant, &board, 1);
        let mut reparsed = Board::new();
        fen::setup_fen(&variant, &mut reparsed, &out, false).expect("reparse");
        prop_assert_eq!(board.occupied(), reparsed.occupied());
        prop_assert_eq!(board.side_to_move, reparsed.side_to_move);
        prop_assert_eq!(board.castle_rights, reparsed.castle_rights);
        prop_assert_eq!(fen::make_fen(&variant, &reparsed, 1), out);
    }

    /// Crazyhouse exercises the same invariants with drops and holdings
    #[test]
    fn prop_crazyhouse_make_unmake(seed in seed_strategy(), num_moves in 1..=16usize) {
        use rand::prelude::*;

        let game = Game::new(variants::crazyhouse::<u64>().expect("variant")).expect("game");
        let variant = game.variant.clone();
        let mut board = Board::new();
        fen::setup_fen(&variant, &mut board, &variant.start_fen, false).expect("fen");
        let mut rng = StdRng::seed_from_u64(seed);

        let initial_hash = board.hash;
        let initial_holdings = board.holdings;

        let mut history: Vec<(Move, UnmakeInfo<u64>)> = Vec::new();
        for _ in 0..num_moves {
            let mut moves = MoveList::new();
            legal_moves(&variant, &mut board, &mut moves);
            if moves.is_empty() {
                break;
            }
            let mv = moves.get(rng.gen_range(0..moves.len())).expect("index");
            let mut ui = UnmakeInfo::default();
            board.make(&variant, mv, &mut ui);
            variant.movegen.update_check_state(&variant, &mut board);
            prop_assert_eq!(board.hash, board.recompute_hash(&variant));
            history.push((mv, ui));
        }

        while let Some((mv, ui)) = history.pop() {
            board.unmake(&variant, mv, &ui);
        }
        prop_assert_eq!(board.hash, initial_hash);
        prop_assert_eq!(board.holdings, initial_holdings);
    }
}
