//! Iterative-deepening principal-variation search.
//!
//! The driver deepens one ply at a time, keeping the transposition table,
//! killer/counter/history state and the triangular PV between iterations.
//! Cancellation is cooperative: a shared abort flag, the clock and an
//! optional input hook are polled every `clock_nodes` nodes; when any of
//! them fires, every level returns immediately and the PV of the last
//! completed iteration stands.

mod alpha_beta;
pub mod ordering;
mod pv;
mod quiescence;
pub mod see;
mod tsume;
pub mod tt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::debug;
use parking_lot::Mutex;

use crate::bits::BitWord;
use crate::board::Board;
use crate::eval::Eval;
use crate::geometry::Side;
use crate::movegen::GenMode;
use crate::moves::{Move, MoveList};
use crate::variant::Variant;

pub use ordering::{CounterMoves, History, Killers, MAX_PLY};
pub use pv::PvTable;
pub use see::SeeCache;
pub use tsume::MateCache;
pub use tt::{Bound, TransTable};

/// Score of a won game, before distance-to-mate adjustment.
pub const LEGAL_WIN: i32 = 16000;
pub const LEGAL_DRAW: i32 = 0;
/// Sentinel returned by a child node whose position is not legal; the
/// parent discards the move.
pub const ILLEGAL: i32 = LEGAL_WIN + 500;

#[inline]
#[must_use]
pub fn is_mate_score(score: i32) -> bool {
    score.abs() > LEGAL_WIN - 1000 && score.abs() <= LEGAL_WIN
}

/// Mate scores enter the table shifted so they read as distance from the
/// probing node rather than from the root.
#[inline]
pub(crate) fn score_to_tt(score: i32, ply: i32) -> i32 {
    if is_mate_score(score) {
        if score > 0 {
            score + ply
        } else {
            score - ply
        }
    } else {
        score
    }
}

#[inline]
pub(crate) fn score_from_tt(score: i32, ply: i32) -> i32 {
    if is_mate_score(score) {
        if score > 0 {
            score - ply
        } else {
            score + ply
        }
    } else {
        score
    }
}

/// Game-state verdicts reported by `think` and `get_game_end_state`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    Ok,
    EndedMate,
    EndedStalemate,
    EndedRepeat,
    Ended50Move,
    EndedInsufficient,
    EndedLoseBare,
    EndedWinBare,
    EndedForfeit,
    EndedInadequateMate,
    EndedFlagCaptured,
    EndedNoPieces,
    EndedCheckCount,
}

/// Deadline holder shared with the driver; the driver may rewrite the
/// deadlines while a ponder search runs.
pub struct SearchClock {
    start: Mutex<Instant>,
    soft: Mutex<Option<Instant>>,
    hard: Mutex<Option<Instant>>,
}

impl SearchClock {
    #[must_use]
    pub fn new() -> Self {
        SearchClock {
            start: Mutex::new(Instant::now()),
            soft: Mutex::new(None),
            hard: Mutex::new(None),
        }
    }

    pub fn reset(&self, start: Instant, soft: Option<Instant>, hard: Option<Instant>) {
        *self.start.lock() = start;
        *self.soft.lock() = soft;
        *self.hard.lock() = hard;
    }

    #[must_use]
    pub fn hard_expired(&self) -> bool {
        self.hard.lock().is_some_and(|t| Instant::now() >= t)
    }

    #[must_use]
    pub fn soft_expired(&self) -> bool {
        self.soft.lock().is_some_and(|t| Instant::now() >= t)
    }

    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.lock().elapsed().as_millis() as u64
    }
}

impl Default for SearchClock {
    fn default() -> Self {
        SearchClock::new()
    }
}

/// Polling hook type for keyboard/clock integration.
pub type PollHook = Box<dyn FnMut() -> bool + Send>;

/// One position of the running game record: both hashes plus the move that
/// produced it (`Move::NONE` for the starting entry). The search keeps the
/// same records along its own path; the board-only hash and the holdings
/// deltas drive board-repetition detection in variants where captured
/// pieces return to play.
#[derive(Clone, Copy, Debug)]
pub struct HistoryEntry {
    pub hash: u64,
    pub board_hash: u64,
    pub mv: Move,
}

/// Result of one `think` call.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub ponder_move: Option<Move>,
    pub score: i32,
    pub depth: i32,
    pub nodes: u64,
    pub pv: Vec<Move>,
}

/// Search state that persists across searches of one game.
pub struct Search {
    pub tt: TransTable,
    pub eval: Eval,
    pub killers: Killers,
    pub counters: CounterMoves,
    pub history: History,
    pub see_cache: SeeCache,
    pub mate_cache: MateCache,
    pub pv: PvTable,
    pub abort: Arc<AtomicBool>,
    pub clock: Arc<SearchClock>,
    pub clock_hook: Option<PollHook>,
    pub input_hook: Option<PollHook>,
    /// Nodes between cooperative polls.
    pub clock_nodes: u64,

    pub(crate) nodes: u64,
    pub(crate) sel_depth: i32,
    /// Positions from game start through the current search path.
    pub(crate) stack: Vec<HistoryEntry>,
    /// Length of the game-history prefix of `stack`.
    pub(crate) game_prefix: usize,
    pub(crate) moves_played: u32,
    /// Last move made at each ply, for counter-move lookups.
    pub(crate) prev_moves: [Move; MAX_PLY],
    pub(crate) root_depth: i32,
}

impl Search {
    #[must_use]
    pub fn new(tt_bytes: usize) -> Self {
        Search {
            tt: TransTable::new(tt_bytes),
            eval: Eval::new(tt_bytes / 16),
            killers: Killers::new(),
            counters: CounterMoves::new(),
            history: History::new(),
            see_cache: SeeCache::new(),
            mate_cache: MateCache::new(),
            pv: PvTable::new(MAX_PLY),
            abort: Arc::new(AtomicBool::new(false)),
            clock: Arc::new(SearchClock::new()),
            clock_hook: None,
            input_hook: None,
            clock_nodes: 4096,
            nodes: 0,
            sel_depth: 0,
            stack: Vec::new(),
            game_prefix: 0,
            moves_played: 0,
            prev_moves: [Move::NONE; MAX_PLY],
            root_depth: 0,
        }
    }

    /// Replace the transposition table (and the eval cache with it).
    pub fn set_table_size(&mut self, bytes: usize) {
        self.tt = TransTable::new(bytes);
        self.eval = Eval::new(bytes / 16);
    }

    pub fn reset_for_new_game(&mut self) {
        self.tt.clear();
        self.eval.clear();
        self.killers.clear();
        self.counters.clear();
        self.history.clear();
        self.see_cache.clear();
        self.mate_cache.clear();
        self.abort.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn should_stop(&mut self) -> bool {
        if self.abort.load(Ordering::Relaxed) {
            return true;
        }
        if self.nodes % self.clock_nodes == 0 {
            if self.clock.hard_expired() {
                self.abort.store(true, Ordering::Relaxed);
                return true;
            }
            let mut fired = false;
            if let Some(hook) = self.clock_hook.as_mut() {
                fired |= hook();
            }
            if let Some(hook) = self.input_hook.as_mut() {
                fired |= hook();
            }
            if fired {
                self.abort.store(true, Ordering::Relaxed);
                return true;
            }
        }
        false
    }

    /// Iterative-deepening driver. `history` holds every position since
    /// game start, the current one last.
    pub fn think<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        history: &[HistoryEntry],
        moves_played: u32,
        max_depth: i32,
    ) -> SearchOutcome {
        self.abort.store(false, Ordering::Relaxed);
        self.nodes = 0;
        self.sel_depth = 0;
        self.moves_played = moves_played;
        self.stack.clear();
        self.stack.extend_from_slice(history);
        self.game_prefix = self.stack.len();
        self.tt.new_search();
        self.history.decay();
        self.killers.clear();
        self.pv.clear();
        self.prev_moves = [Move::NONE; MAX_PLY];

        let mut outcome = SearchOutcome {
            best_move: None,
            ponder_move: None,
            score: 0,
            depth: 0,
            nodes: 0,
            pv: Vec::new(),
        };

        let mut score_guess = 0;
        for depth in 1..=max_depth.min(MAX_PLY as i32 - 2) {
            self.root_depth = depth;

            // Aspiration around the previous score once the search is warm
            let mut alpha = if depth >= 4 { score_guess - 50 } else { -ILLEGAL };
            let mut beta = if depth >= 4 { score_guess + 50 } else { ILLEGAL };
            let score = loop {
                let s = self.alphabeta(variant, board, depth, alpha, beta, 0, true);
                if self.abort.load(Ordering::Relaxed) {
                    break s;
                }
                if s <= alpha {
                    alpha = -ILLEGAL;
                } else if s >= beta {
                    beta = ILLEGAL;
                } else {
                    break s;
                }
            };

            if self.abort.load(Ordering::Relaxed) && depth > 1 {
                break;
            }
            score_guess = score;

            if let Some(best) = self.pv.best_move() {
                outcome.best_move = Some(best);
                outcome.ponder_move = self.pv.ponder_move();
                outcome.score = score;
                outcome.depth = depth;
                outcome.pv = self.pv.best_line().to_vec();
            }

            debug!(
                "depth {} score {} nodes {} seldepth {} time {}ms",
                depth,
                score,
                self.nodes,
                self.sel_depth,
                self.clock.elapsed_ms()
            );

            // A proven mate needs no deeper confirmation
            if is_mate_score(score) && LEGAL_WIN - score.abs() <= depth {
                break;
            }
            if self.clock.soft_expired() {
                break;
            }
        }

        outcome.nodes = self.nodes;
        outcome
    }

    /// Classify the current position for game-end reporting; `list`
    /// receives the legal moves as a side effect.
    pub fn game_end_state<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        history: &[HistoryEntry],
        list: &mut MoveList,
    ) -> PlayState {
        let stm = board.side_to_move;

        legal_moves(variant, board, list);

        if flags_captured(variant, board).is_some() {
            return PlayState::EndedFlagCaptured;
        }

        if board.bbc[stm.index()].is_empty() || extinct_side(variant, board).is_some() {
            return PlayState::EndedNoPieces;
        }

        if variant.scores.check_limit > 0
            && board.check_count[stm.index()] >= variant.scores.check_limit
        {
            return PlayState::EndedCheckCount;
        }

        if list.is_empty() {
            return if board.in_check() {
                if variant
                    .rules
                    .contains(crate::variant::RuleFlags::USE_SHAKMATE)
                    && !board.have_shak()
                {
                    PlayState::EndedInadequateMate
                } else {
                    PlayState::EndedMate
                }
            } else {
                PlayState::EndedStalemate
            };
        }

        if variant.scores.fifty_limit > 0
            && board.fifty_counter >= variant.scores.fifty_limit
            && !board.in_check()
        {
            return PlayState::Ended50Move;
        }

        if variant.scores.repeat_claim > 0 {
            let current = board.hash;
            let count = history.iter().filter(|e| e.hash == current).count() as u32;
            if count >= variant.scores.repeat_claim {
                return PlayState::EndedRepeat;
            }
        }

        if variant
            .rules
            .contains(crate::variant::RuleFlags::USE_BARERULE)
        {
            let own_bare = (board.bbc[stm.index()] & !board.royal).is_empty();
            let opp_bare = (board.bbc[stm.flip().index()] & !board.royal).is_empty();
            if own_bare && !opp_bare {
                return PlayState::EndedLoseBare;
            }
            if opp_bare && !own_bare {
                return PlayState::EndedWinBare;
            }
        }

        if !crate::eval::side_can_win(variant, board, stm)
            && !crate::eval::side_can_win(variant, board, stm.flip())
        {
            return PlayState::EndedInsufficient;
        }

        PlayState::Ok
    }
}

/// A side whose capture-flag pieces are all gone, if any. Pieces carrying
/// the flag must survive (extinction rule); the check only fires for types
/// the side actually started with.
pub(crate) fn extinct_side<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
) -> Option<Side> {
    use crate::pieces::PieceFlags;
    for (p, desc) in variant.pieces.iter().enumerate() {
        if !desc.flags.contains(PieceFlags::CAPTURE_FLAG) {
            continue;
        }
        for side in [Side::White, Side::Black] {
            let started = variant
                .start_placement
                .iter()
                .any(|&(_, piece, s)| piece.index() == p && s == side);
            if started
                && (board.bbp[p] & board.bbc[side.index()]).is_empty()
                && board.holdings[p][side.index()] <= 0
            {
                return Some(side);
            }
        }
    }
    None
}

/// A side has captured the flag cells its rules demand.
pub(crate) fn flags_captured<W: BitWord>(
    variant: &Variant<W>,
    board: &Board<W>,
) -> Option<Side> {
    use crate::variant::RuleFlags;
    if !variant.rules.intersects(RuleFlags::CAPTURE_THE_FLAG) {
        return None;
    }
    for side in [Side::White, Side::Black] {
        let targets = variant.flag_cells[side.index()];
        if targets.is_empty() {
            continue;
        }
        let occupied = targets & board.bbc[side.index()];
        let all = variant.rules.contains(RuleFlags::CAPTURE_ALL_FLAG);
        if (all && occupied == targets) || (!all && !occupied.is_empty()) {
            return Some(side);
        }
    }
    None
}

/// Pseudo-legal generation filtered by make / in-check / unmake.
pub fn legal_moves<W: BitWord>(variant: &Variant<W>, board: &mut Board<W>, list: &mut MoveList) {
    let stm = board.side_to_move;
    let mut pseudo = MoveList::new();
    variant
        .movegen
        .generate_moves(variant, board, stm, &mut pseudo, GenMode::All);

    list.clear();
    let mut ui = crate::board::UnmakeInfo::default();
    for &mv in pseudo.iter() {
        board.make(variant, mv, &mut ui);
        let ok = move_is_legal_after_make(variant, board, stm, mv);
        board.unmake(variant, mv, &ui);
        if ok {
            list.push(mv);
        }
    }
}

/// Per-move rule checks run with the move already applied; the mover is
/// `stm`. This is the one place where full legality is decided.
pub(crate) fn move_is_legal_after_make<W: BitWord>(
    variant: &Variant<W>,
    board: &mut Board<W>,
    stm: Side,
    mv: Move,
) -> bool {
    use crate::pieces::PieceFlags;
    use crate::variant::RuleFlags;

    if variant.movegen.player_in_check(variant, board, stm) {
        return false;
    }

    // Quiet-promotion rule: the promotion must be entirely quiet. It may
    // not capture, may not give check, and the new piece may not attack
    // anything from its square.
    if variant.rules.contains(RuleFlags::QUIET_PROMOTION) && mv.is_promotion() {
        if mv.is_capture() {
            return false;
        }
        if variant.movegen.player_in_check(variant, board, stm.flip()) {
            return false;
        }
        let to = mv.to();
        let promoted = mv.final_piece();
        let attacks = variant
            .movegen
            .attacks_from(variant, promoted, stm, to, board.occupied());
        if !(attacks & board.bbc[stm.flip().index()]).is_empty() {
            return false;
        }
    }

    // Drop restrictions: no checking or mating drops for flagged pieces
    if mv.is_drop() {
        let (piece, _, _) = mv.drop_slot(0);
        let flags = variant.pieces[piece.index()].flags;
        if flags.intersects(PieceFlags::DROP_NO_CHECK | PieceFlags::DROP_NO_MATE) {
            let gives_check = variant
                .movegen
                .player_in_check(variant, board, stm.flip());
            if gives_check {
                if flags.contains(PieceFlags::DROP_NO_CHECK) {
                    return false;
                }
                if flags.contains(PieceFlags::DROP_NO_MATE)
                    && no_legal_reply(variant, board)
                {
                    return false;
                }
            }
        }
    }

    // Sliding royals may not pass through an attacked square
    if variant.rules.contains(RuleFlags::NO_MOVE_PAST_CHECK) && mv.swaps() > 0 {
        let piece = mv.piece();
        if variant.pieces[piece.index()].is_royal() {
            let path = variant.geo().between(mv.from(), mv.to());
            for sq in path.iter() {
                if variant.movegen.any_attack_on(
                    variant,
                    board,
                    crate::geometry::Bitboard::from_square(sq),
                    stm.flip(),
                    board.occupied(),
                ) {
                    return false;
                }
            }
        }
    }

    // An endangered piece may not move to an attacked square
    if variant.rules.contains(RuleFlags::VICTIM_SIDEEFFECT) && mv.swaps() > 0 {
        let piece = mv.final_piece();
        if variant.pieces[piece.index()]
            .flags
            .contains(PieceFlags::ENDANGERED)
            && variant.movegen.any_attack_on(
                variant,
                board,
                crate::geometry::Bitboard::from_square(mv.to()),
                stm.flip(),
                board.occupied(),
            )
        {
            return false;
        }
    }

    // A piece that may not deliver mate must leave an escape
    if !mv.is_drop() && mv.swaps() > 0 {
        let piece = mv.final_piece();
        if variant.pieces[piece.index()]
            .flags
            .contains(PieceFlags::NO_MATE)
        {
            let gives_check = variant
                .movegen
                .player_in_check(variant, board, stm.flip());
            if gives_check && no_legal_reply(variant, board) {
                return false;
            }
        }
    }

    true
}

/// Does the side to move have any legal reply? Used by drop-mate and
/// no-mate piece rules.
pub(crate) fn no_legal_reply<W: BitWord>(variant: &Variant<W>, board: &mut Board<W>) -> bool {
    let stm = board.side_to_move;
    let in_check = variant.movegen.player_in_check(variant, board, stm);
    let saved_flags = board.board_flags;
    if in_check {
        board.board_flags |= crate::board::BoardFlags::CHECK;
    }
    let mut pseudo = MoveList::new();
    variant
        .movegen
        .generate_moves(variant, board, stm, &mut pseudo, GenMode::All);
    board.board_flags = saved_flags;

    let mut ui = crate::board::UnmakeInfo::default();
    for &mv in pseudo.iter() {
        board.make(variant, mv, &mut ui);
        let legal = !variant.movegen.player_in_check(variant, board, stm);
        board.unmake(variant, mv, &ui);
        if legal {
            return false;
        }
    }
    true
}
