//! The game object: a variant, a board, the played-move history and the
//! search state, with the operations a protocol driver needs.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use crate::bits::BitWord;
use crate::board::{Board, UnmakeInfo};
use crate::error::{FenError, MoveParseError};
use crate::geometry::Side;
use crate::movegen::GenMode;
use crate::moves::{Move, MoveList};
use crate::search::{legal_moves, HistoryEntry, PlayState, Search, SearchClock, SearchOutcome};
use crate::variant::Variant;

/// Default transposition table size.
pub const DEFAULT_TT_BYTES: usize = 64 * 1024 * 1024;

pub struct Game<W: BitWord> {
    pub variant: Arc<Variant<W>>,
    pub board: Board<W>,
    pub search: Search,
    undo_stack: Vec<(Move, UnmakeInfo<W>)>,
    redo_stack: Vec<Move>,
    /// Positions since game start, current position last.
    hash_history: Vec<HistoryEntry>,
    fullmove_base: u32,
    last_outcome: Option<SearchOutcome>,
}

impl<W: BitWord> Game<W> {
    pub fn new(variant: Variant<W>) -> Result<Self, FenError> {
        let variant = Arc::new(variant);
        let mut game = Game {
            variant: Arc::clone(&variant),
            board: Board::new(),
            search: Search::new(DEFAULT_TT_BYTES),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            hash_history: Vec::new(),
            fullmove_base: 1,
            last_outcome: None,
        };
        game.start_new_game()?;
        Ok(game)
    }

    /// Reset to the variant's starting position and clear all search state.
    pub fn start_new_game(&mut self) -> Result<(), FenError> {
        let start_fen = self.variant.start_fen.clone();
        self.setup_fen_position(&start_fen, false)?;
        self.search.reset_for_new_game();
        self.search.eval.game_seed = {
            // Seed the opening randomness per game
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(1)
        };
        Ok(())
    }

    pub fn set_transposition_table_size(&mut self, bytes: usize) {
        self.search.set_table_size(bytes);
    }

    pub fn setup_fen_position(&mut self, fen: &str, skip_castle: bool) -> Result<(), FenError> {
        let fullmove = crate::fen::setup_fen(&self.variant, &mut self.board, fen, skip_castle)?;
        self.fullmove_base = fullmove;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.hash_history.clear();
        self.hash_history.push(HistoryEntry {
            hash: self.board.hash,
            board_hash: self.board.board_hash,
            mv: Move::NONE,
        });
        Ok(())
    }

    #[must_use]
    pub fn make_fen_string(&self) -> String {
        let fullmove = self.fullmove_base + self.moves_played() / 2;
        crate::fen::make_fen(&self.variant, &self.board, fullmove)
    }

    #[must_use]
    pub fn moves_played(&self) -> u32 {
        self.undo_stack.len() as u32
    }

    /// Pseudo-legal moves for the side to move.
    pub fn generate_moves(&self, list: &mut MoveList) {
        self.variant.movegen.generate_moves(
            &self.variant,
            &self.board,
            self.board.side_to_move,
            list,
            GenMode::All,
        );
    }

    /// Fully legal moves for the side to move.
    pub fn generate_legal_moves(&mut self, list: &mut MoveList) {
        legal_moves(&self.variant, &mut self.board, list);
    }

    #[must_use]
    pub fn player_in_check(&self, side: Side) -> bool {
        self.variant
            .movegen
            .player_in_check(&self.variant, &self.board, side)
    }

    /// Classify the current position; the legal moves land in `list`.
    pub fn get_game_end_state(&mut self, list: &mut MoveList) -> PlayState {
        let variant = Arc::clone(&self.variant);
        self.search
            .game_end_state(&variant, &mut self.board, &self.hash_history, list)
    }

    /// Play a move on the game board. The move must be legal.
    pub fn playmove(&mut self, mv: Move) -> bool {
        let variant = Arc::clone(&self.variant);
        let mut list = MoveList::new();
        legal_moves(&variant, &mut self.board, &mut list);
        if !list.contains(mv) {
            return false;
        }
        let mut ui = UnmakeInfo::default();
        self.board.make(&variant, mv, &mut ui);
        variant.movegen.update_check_state(&variant, &mut self.board);
        self.undo_stack.push((mv, ui));
        self.redo_stack.clear();
        self.hash_history.push(HistoryEntry {
            hash: self.board.hash,
            board_hash: self.board.board_hash,
            mv,
        });
        true
    }

    /// Take back the last played move.
    pub fn takeback(&mut self) -> bool {
        let Some((mv, ui)) = self.undo_stack.pop() else {
            return false;
        };
        self.board.unmake(&self.variant, mv, &ui);
        self.hash_history.pop();
        self.redo_stack.push(mv);
        true
    }

    /// Replay the move most recently taken back.
    pub fn replaymove(&mut self) -> bool {
        let Some(mv) = self.redo_stack.pop() else {
            return false;
        };
        let variant = Arc::clone(&self.variant);
        let mut ui = UnmakeInfo::default();
        self.board.make(&variant, mv, &mut ui);
        variant.movegen.update_check_state(&variant, &mut self.board);
        self.undo_stack.push((mv, ui));
        self.hash_history.push(HistoryEntry {
            hash: self.board.hash,
            board_hash: self.board.board_hash,
            mv,
        });
        true
    }

    /// Parse a move in any accepted notation against the legal moves.
    pub fn move_string_to_move(&mut self, text: &str) -> Result<Move, MoveParseError> {
        let variant = Arc::clone(&self.variant);
        let mut list = MoveList::new();
        legal_moves(&variant, &mut self.board, &mut list);
        crate::movestring::parse_move(&variant, &list, text)
    }

    /// Move rendered as SAN.
    #[must_use]
    pub fn move_to_san(&mut self, mv: Move) -> String {
        let variant = Arc::clone(&self.variant);
        let mut list = MoveList::new();
        legal_moves(&variant, &mut self.board, &mut list);
        crate::movestring::to_san(&variant, &mut self.board, &list, mv)
    }

    /// Move rendered as long algebraic.
    #[must_use]
    pub fn move_to_lan(&self, mv: Move) -> String {
        crate::movestring::to_lan(&self.variant, mv)
    }

    /// Search the position and play the chosen move. Returns the state
    /// before the move (anything but `Ok` means no move was played).
    pub fn think(&mut self, max_depth: i32) -> PlayState {
        let variant = Arc::clone(&self.variant);
        let mut list = MoveList::new();
        let state = self.get_game_end_state(&mut list);
        if state != PlayState::Ok {
            return state;
        }

        let history = self.hash_history.clone();
        let moves_played = self.moves_played();
        let outcome = self.search.think(
            &variant,
            &mut self.board,
            &history,
            moves_played,
            max_depth,
        );

        let chosen = outcome.best_move.or_else(|| list.get(0));
        self.last_outcome = Some(outcome);
        if let Some(mv) = chosen {
            if self.playmove(mv) {
                return PlayState::Ok;
            }
            // The search produced a move the rules reject; fall back
            if let Some(fallback) = list.get(0) {
                if self.playmove(fallback) {
                    return PlayState::Ok;
                }
            }
        }
        PlayState::EndedForfeit
    }

    /// Search without playing a move (infinite-analysis entry point).
    pub fn analyse(&mut self, max_depth: i32) -> SearchOutcome {
        let variant = Arc::clone(&self.variant);
        let history = self.hash_history.clone();
        let moves_played = self.moves_played();
        let outcome = self.search.think(
            &variant,
            &mut self.board,
            &history,
            moves_played,
            max_depth,
        );
        self.last_outcome = Some(outcome.clone());
        outcome
    }

    /// Ponder on the expected reply: play it hypothetically, search, take it
    /// back. Returns the outcome of the speculative search.
    pub fn ponder(&mut self, expected: Move, max_depth: i32) -> Option<SearchOutcome> {
        if !self.playmove(expected) {
            return None;
        }
        let outcome = self.analyse(max_depth);
        self.takeback();
        Some(outcome)
    }

    /// Static evaluation of the current position, side to move perspective.
    pub fn eval(&mut self) -> i32 {
        let variant = Arc::clone(&self.variant);
        let moves_played = self.moves_played();
        self.search
            .eval
            .static_eval(&variant, &self.board, moves_played)
    }

    /// Static exchange value of a move.
    pub fn see(&mut self, mv: Move) -> i32 {
        let variant = Arc::clone(&self.variant);
        crate::search::see::see(&variant, &self.board, &mut self.search.see_cache, mv)
    }

    /// Principal variation of the last search.
    #[must_use]
    pub fn pv(&self) -> &[Move] {
        self.last_outcome.as_ref().map_or(&[], |o| &o.pv)
    }

    #[must_use]
    pub fn last_score(&self) -> i32 {
        self.last_outcome.as_ref().map_or(0, |o| o.score)
    }

    /// Shared abort flag; a driver sets it to cancel a running search.
    #[must_use]
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.search.abort)
    }

    /// Shared clock; the driver owns the time policy.
    #[must_use]
    pub fn clock(&self) -> Arc<SearchClock> {
        Arc::clone(&self.search.clock)
    }

    /// Convenience deadline setter for drivers without their own clock.
    pub fn set_time_budget_ms(&mut self, soft: Option<u64>, hard: Option<u64>) {
        let now = Instant::now();
        self.search.clock.reset(
            now,
            soft.map(|ms| now + std::time::Duration::from_millis(ms)),
            hard.map(|ms| now + std::time::Duration::from_millis(ms)),
        );
    }

    /// Perft node count, for move-generator validation.
    pub fn perft(&mut self, depth: u32) -> u64 {
        let variant = Arc::clone(&self.variant);
        perft_inner(&variant, &mut self.board, depth)
    }

    /// Perft with per-root-move subtotals.
    pub fn perft_divide(&mut self, depth: u32) -> Vec<(Move, u64)> {
        let variant = Arc::clone(&self.variant);
        let mut list = MoveList::new();
        legal_moves(&variant, &mut self.board, &mut list);
        let mut out = Vec::new();
        let mut ui = UnmakeInfo::default();
        for &mv in list.iter() {
            self.board.make(&variant, mv, &mut ui);
            variant
                .movegen
                .update_check_state(&variant, &mut self.board);
            let nodes = if depth <= 1 {
                1
            } else {
                perft_inner(&variant, &mut self.board, depth - 1)
            };
            self.board.unmake(&variant, mv, &ui);
            out.push((mv, nodes));
        }
        out
    }
}

fn perft_inner<W: BitWord>(variant: &Variant<W>, board: &mut Board<W>, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut list = MoveList::new();
    legal_moves(variant, board, &mut list);
    if depth == 1 {
        return list.len() as u64;
    }
    let mut nodes = 0;
    let mut ui = UnmakeInfo::default();
    for &mv in list.iter() {
        board.make(variant, mv, &mut ui);
        variant.movegen.update_check_state(variant, board);
        nodes += perft_inner(variant, board, depth - 1);
        board.unmake(variant, mv, &ui);
    }
    nodes
}

/// Width-erased game for drivers that pick the board word at runtime.
pub enum AnyGame {
    Small(Game<u32>),
    Medium(Game<u64>),
    Large(Game<u128>),
}

macro_rules! dispatch {
    ($self:expr, $game:ident => $body:expr) => {
        match $self {
            AnyGame::Small($game) => $body,
            AnyGame::Medium($game) => $body,
            AnyGame::Large($game) => $body,
        }
    };
}

impl AnyGame {
    pub fn start_new_game(&mut self) -> Result<(), FenError> {
        dispatch!(self, g => g.start_new_game())
    }

    pub fn set_transposition_table_size(&mut self, bytes: usize) {
        dispatch!(self, g => g.set_transposition_table_size(bytes));
    }

    pub fn setup_fen_position(&mut self, fen: &str, skip_castle: bool) -> Result<(), FenError> {
        dispatch!(self, g => g.setup_fen_position(fen, skip_castle))
    }

    #[must_use]
    pub fn make_fen_string(&self) -> String {
        dispatch!(self, g => g.make_fen_string())
    }

    pub fn generate_legal_moves(&mut self, list: &mut MoveList) {
        dispatch!(self, g => g.generate_legal_moves(list));
    }

    #[must_use]
    pub fn player_in_check(&self, side: Side) -> bool {
        dispatch!(self, g => g.player_in_check(side))
    }

    pub fn get_game_end_state(&mut self, list: &mut MoveList) -> PlayState {
        dispatch!(self, g => g.get_game_end_state(list))
    }

    pub fn playmove(&mut self, mv: Move) -> bool {
        dispatch!(self, g => g.playmove(mv))
    }

    pub fn takeback(&mut self) -> bool {
        dispatch!(self, g => g.takeback())
    }

    pub fn replaymove(&mut self) -> bool {
        dispatch!(self, g => g.replaymove())
    }

    pub fn move_string_to_move(&mut self, text: &str) -> Result<Move, MoveParseError> {
        dispatch!(self, g => g.move_string_to_move(text))
    }

    pub fn think(&mut self, max_depth: i32) -> PlayState {
        dispatch!(self, g => g.think(max_depth))
    }

    pub fn analyse(&mut self, max_depth: i32) -> SearchOutcome {
        dispatch!(self, g => g.analyse(max_depth))
    }

    pub fn eval(&mut self) -> i32 {
        dispatch!(self, g => g.eval())
    }

    pub fn see(&mut self, mv: Move) -> i32 {
        dispatch!(self, g => g.see(mv))
    }

    #[must_use]
    pub fn pv(&self) -> &[Move] {
        dispatch!(self, g => g.pv())
    }

    pub fn set_time_budget_ms(&mut self, soft: Option<u64>, hard: Option<u64>) {
        dispatch!(self, g => g.set_time_budget_ms(soft, hard));
    }

    pub fn perft(&mut self, depth: u32) -> u64 {
        dispatch!(self, g => g.perft(depth))
    }
}
