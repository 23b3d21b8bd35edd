//! The alpha-beta recursion: termination rules, pruning, extensions and the
//! PVS move loop.

use crate::bits::BitWord;
use crate::board::Board;
use crate::chase::{self, ChaseVerdict};
use crate::geometry::Side;
use crate::movegen::GenMode;
use crate::moves::{Move, MoveList, ScoredMoveList};
use crate::pieces::PieceClass;
use crate::variant::{RuleFlags, Variant};

use super::see::see;
use super::tt::Bound;
use super::{
    is_mate_score, move_is_legal_after_make, ILLEGAL, LEGAL_WIN, MAX_PLY,
};

const HASH_MOVE_SCORE: i32 = 1 << 20;
const WINNING_CAPTURE_SCORE: i32 = 100_000;
const MATE_KILLER_SCORE: i32 = 95_000;
const KILLER1_SCORE: i32 = 90_000;
const KILLER2_SCORE: i32 = 80_000;
const NULL_KILLER_SCORE: i32 = 75_000;
const COUNTER_SCORE: i32 = 70_000;
const LOSING_CAPTURE_SCORE: i32 = -50_000;
const LMR_SCORE_THRESHOLD: i32 = 1500;

impl super::Search {
    #[allow(clippy::too_many_lines)]
    pub(crate) fn alphabeta<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: i32,
        allow_null: bool,
    ) -> i32 {
        let is_root = ply == 0;
        let is_pv = beta > alpha + 1;
        let stm = board.side_to_move;

        self.pv.terminate(ply as usize);

        if ply >= MAX_PLY as i32 - 2 {
            return self.eval.static_eval(variant, board, self.moves_played);
        }

        // ------------------------------------------------------------------
        // Terminal rules
        // ------------------------------------------------------------------
        if !is_root {
            if let Some(score) = self.terminal_score(variant, board, ply, alpha, depth) {
                return score;
            }
        }

        if depth <= 0 {
            return self.quiesce(variant, board, alpha, beta, ply, 0);
        }

        self.nodes += 1;
        self.sel_depth = self.sel_depth.max(ply + 1);
        if self.should_stop() {
            return 0;
        }

        let in_check = board.in_check();

        // Mate-distance pruning
        if !is_root {
            alpha = alpha.max(-LEGAL_WIN + ply);
            beta = beta.min(LEGAL_WIN - ply - 1);
            if alpha >= beta {
                return alpha;
            }
        }

        // ------------------------------------------------------------------
        // Transposition table
        // ------------------------------------------------------------------
        let mut tt_move = Move::NONE;
        if let Some(hit) = self.tt.probe(board.hash, ply) {
            tt_move = hit.best_move;
            if !is_pv && hit.depth >= depth && !self.is_repetition(board) {
                let cutoff = match hit.bound {
                    Bound::Exact => true,
                    Bound::Lower => hit.score >= beta,
                    Bound::Upper => hit.score <= alpha,
                };
                if cutoff {
                    return hit.score;
                }
            }
        }

        let static_eval = if in_check {
            -LEGAL_WIN
        } else {
            self.eval.static_eval(variant, board, self.moves_played)
        };

        // ------------------------------------------------------------------
        // Node-level pruning
        // ------------------------------------------------------------------
        if !is_pv && !in_check {
            // Razoring / static-null: a huge static margin over beta stands
            if depth <= 3 && !is_mate_score(beta) && static_eval - 50 * depth * depth >= beta {
                return static_eval - 50 * depth * depth;
            }

            // Null move, skipped when zugzwang looms
            if allow_null && depth >= 2 && static_eval >= beta && self.has_reversible_mover(variant, board, stm)
            {
                let r = 2 + depth / 4;
                let info = board.make_null();
                self.stack.push(super::HistoryEntry {
                    hash: board.hash,
                    board_hash: board.board_hash,
                    mv: Move::NONE,
                });
                let score = -self.alphabeta(
                    variant,
                    board,
                    (depth - 1 - r).max(0),
                    -beta,
                    -beta + 1,
                    ply + 1,
                    false,
                );
                self.stack.pop();
                board.unmake_null(info);
                if self.abort.load(std::sync::atomic::Ordering::Relaxed) {
                    return 0;
                }
                if score >= beta {
                    let score = if is_mate_score(score) { beta } else { score };
                    self.tt
                        .store(board.hash, depth, ply, score, Bound::Lower, Move::NONE);
                    return score;
                }
                // Remember what refuted the null move
                let null_hash = board.hash ^ crate::zobrist::ZOBRIST.side_key;
                if let Some(hit) = self.tt.probe(null_hash, ply + 1) {
                    self.killers.store_null(ply as usize, hit.best_move);
                }
            }
        }

        // Internal iterative deepening for PV nodes without a hash move
        if is_pv && tt_move.is_none() && depth > 3 {
            self.alphabeta(variant, board, depth - 2, alpha, beta, ply, false);
            if let Some(hit) = self.tt.probe(board.hash, ply) {
                tt_move = hit.best_move;
            }
        }

        // Mate sub-search near the horizon in drop games
        if !in_check
            && depth == 1
            && variant
                .rules
                .intersects(RuleFlags::ALLOW_DROPS | RuleFlags::FORCE_DROPS)
        {
            if let Some(mate) = self.mate_probe(variant, board, ply, 3) {
                return mate;
            }
        }

        // ------------------------------------------------------------------
        // Move loop
        // ------------------------------------------------------------------
        let mut moves = MoveList::new();
        variant
            .movegen
            .generate_moves(variant, board, stm, &mut moves, GenMode::All);
        let mut scored = self.order_moves(variant, board, &moves, tt_move, ply);

        let mut best_score = -ILLEGAL;
        let mut best_move = Move::NONE;
        let mut raised_alpha = false;
        let mut legal_moves = 0u32;

        let mut index = 0usize;
        let mut ui = crate::board::UnmakeInfo::default();
        while let Some(entry) = scored.pick_best(index) {
            index += 1;
            let mv = entry.mv;
            let move_score = entry.score;

            if self.abort.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }

            // Exchange value is needed for the check extension and must be
            // measured before the move is on the board
            let move_see = if mv.is_capture() {
                see(variant, board, &mut self.see_cache, mv)
            } else {
                0
            };

            board.make(variant, mv, &mut ui);
            if !move_is_legal_after_make(variant, board, stm, mv) {
                board.unmake(variant, mv, &ui);
                continue;
            }
            variant.movegen.update_check_state(variant, board);
            let gives_check = board.in_check();
            legal_moves += 1;

            let is_quiet = !mv.is_capture() && !mv.is_promotion();

            self.stack.push(super::HistoryEntry {
                hash: board.hash,
                board_hash: board.board_hash,
                mv,
            });
            if (ply as usize) < MAX_PLY {
                self.prev_moves[ply as usize] = mv;
            }

            // Check extension for safe checks
            let mut extension = 0;
            if gives_check && move_see >= 0 {
                extension = 1;
            }

            // Late move reductions on cold quiet moves
            let mut reduction = 0;
            if is_quiet
                && !gives_check
                && !in_check
                && !is_pv
                && depth >= 3
                && legal_moves > 3
                && move_score < LMR_SCORE_THRESHOLD
            {
                reduction = 1 + depth / 8 + (legal_moves as i32) / 12;
                reduction = reduction.min(depth - 1);
            }

            let new_depth = depth - 1 + extension;
            let mut score;
            if legal_moves == 1 {
                score = -self.alphabeta(variant, board, new_depth, -beta, -alpha, ply + 1, true);
            } else {
                score = -self.alphabeta(
                    variant,
                    board,
                    new_depth - reduction,
                    -alpha - 1,
                    -alpha,
                    ply + 1,
                    true,
                );
                if score > alpha && reduction > 0 {
                    score =
                        -self.alphabeta(variant, board, new_depth, -alpha - 1, -alpha, ply + 1, true);
                }
                if score > alpha && score < beta {
                    score = -self.alphabeta(variant, board, new_depth, -beta, -alpha, ply + 1, true);
                }
            }

            self.stack.pop();
            board.unmake(variant, mv, &ui);

            // A child reporting ILLEGAL vetoes the move entirely
            if score == -ILLEGAL {
                legal_moves -= 1;
                continue;
            }

            if self.abort.load(std::sync::atomic::Ordering::Relaxed) {
                break;
            }

            if is_quiet && score <= alpha && !in_check && !mv.is_castle() && !mv.is_pickup() {
                self.history.penalize(stm, mv, depth);
            }

            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    if score >= beta {
                        self.note_cutoff(stm, mv, ply, depth, score, in_check);
                        self.tt
                            .store(board.hash, depth, ply, score, Bound::Lower, mv);
                        return score;
                    }
                    alpha = score;
                    raised_alpha = true;
                    self.pv.update(ply as usize, mv);
                }
            }
        }

        if self.abort.load(std::sync::atomic::Ordering::Relaxed) {
            return if raised_alpha { best_score } else { 0 };
        }

        if legal_moves == 0 {
            return self.mated_score(variant, board, ply);
        }

        if !best_move.is_none() {
            let bound = if raised_alpha {
                Bound::Exact
            } else {
                Bound::Upper
            };
            self.tt
                .store(board.hash, depth, ply, best_score, bound, best_move);
        }
        best_score
    }

    /// Score for a side with no legal moves.
    pub(crate) fn mated_score<W: BitWord>(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        ply: i32,
    ) -> i32 {
        if board.in_check() {
            if variant.rules.contains(RuleFlags::USE_SHAKMATE) && !board.have_shak() {
                // Mate without the required checking sequence is no win
                return variant.scores.stalemate;
            }
            -variant.scores.mate + ply
        } else {
            let score = variant.scores.stalemate;
            if score <= -(LEGAL_WIN - 1000) {
                score + ply
            } else if score >= LEGAL_WIN - 1000 {
                score - ply
            } else {
                score
            }
        }
    }

    /// Rules checked on entry to every interior node.
    fn terminal_score<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        ply: i32,
        alpha: i32,
        depth: i32,
    ) -> Option<i32> {
        let stm = board.side_to_move;
        let scores = &variant.scores;

        if let Some(winner) = super::flags_captured(variant, board) {
            return Some(if winner == stm {
                scores.flag_capture - ply
            } else {
                -scores.flag_capture + ply
            });
        }

        // Extinction: a side that lost every piece of a capture-flag type
        // has lost the game
        if let Some(loser) = super::extinct_side(variant, board) {
            return Some(if loser == stm {
                -scores.flag_capture + ply
            } else {
                scores.flag_capture - ply
            });
        }

        if scores.fifty_limit > 0 && board.fifty_counter >= scores.fifty_limit && !board.in_check()
        {
            return Some(crate::search::LEGAL_DRAW);
        }

        if self.is_repetition(board) {
            if board.in_check() {
                // The opponent is checking perpetually and owns the fault
                return Some(-scores.perpetual - ply);
            }
            if variant.rules.contains(RuleFlags::USE_CHASERULE) {
                match chase::classify(variant, board) {
                    ChaseVerdict::StmChases => return Some(ILLEGAL),
                    ChaseVerdict::OppChases => return Some(LEGAL_WIN - ply),
                    ChaseVerdict::None => {}
                }
            }
            return Some(scores.repetition);
        }

        // Board repetition with worsened holdings: in variants where
        // captured pieces return, repeating the piece placement while the
        // hand has only shrunk is a losing pattern
        if variant.rules.intersects(RuleFlags::USE_CAPTURE)
            && depth > 0
            && self.board_repetition_loss(variant, board)
        {
            return Some(alpha - 1);
        }

        // Baring decides before material draws: a lone king has lost even
        // when the winner's material could never mate
        if variant.rules.contains(RuleFlags::USE_BARERULE) {
            let own_bare = (board.bbc[stm.index()] & !board.royal).is_empty();
            let opp_bare = (board.bbc[stm.flip().index()] & !board.royal).is_empty();
            if own_bare && !opp_bare {
                return Some(-scores.bare_king + ply);
            }
        }

        // Dead material
        if !crate::eval::side_can_win(variant, board, Side::White)
            && !crate::eval::side_can_win(variant, board, Side::Black)
        {
            return Some(crate::search::LEGAL_DRAW);
        }

        if scores.check_limit > 0 && board.check_count[stm.index()] >= scores.check_limit {
            return Some(-scores.check_limit_score + ply);
        }

        None
    }

    /// Has the position occurred before inside the current irreversible
    /// segment?
    pub(crate) fn is_repetition<W: BitWord>(&self, board: &Board<W>) -> bool {
        let len = self.stack.len();
        if len < 2 {
            return false;
        }
        let span = (board.fifty_counter as usize).min(len - 1);
        self.stack[len - 1 - span..len - 1]
            .iter()
            .any(|e| e.hash == board.hash)
    }

    /// The board placement repeated while the mover's hand only got worse.
    /// Walks the move record backwards, accumulating holdings deltas, until
    /// an earlier position with the same board hash but a different full
    /// hash turns up; a pure loss of hand material since then condemns the
    /// line, a pure gain clears it, a mixed exchange is no verdict.
    fn board_repetition_loss<W: BitWord>(&self, variant: &Variant<W>, board: &Board<W>) -> bool {
        let len = self.stack.len();
        if len < 2 {
            return false;
        }
        let me = board.side_to_move;
        let mut deltas = [[0i32; 2]; crate::pieces::MAX_PIECE_TYPES];

        for n in (0..len - 1).rev() {
            let mv = self.stack[n + 1].mv;
            if !variant.rules.intersects(RuleFlags::USE_CAPTURE) && mv.is_irreversible() {
                break;
            }
            if !mv.is_none() && mv.has_holdings() {
                let (piece, side, count) = mv.holdings_slot();
                deltas[piece.index()][side.index()] += i32::from(count);
            }

            if self.stack[n].board_hash == board.board_hash && self.stack[n].hash != board.hash {
                let mut pure_gain = true;
                let mut pure_loss = true;
                for piece in 0..variant.pieces.len() {
                    if deltas[piece][me.index()] < 0 {
                        pure_gain = false;
                    }
                    if deltas[piece][me.index()] > 0 {
                        pure_loss = false;
                    }
                }
                if pure_gain {
                    return false;
                }
                return pure_loss;
            }
        }
        false
    }

    /// Null-move sanity: some piece other than royals and pawns can move, so
    /// passing the turn is not hiding zugzwang.
    fn has_reversible_mover<W: BitWord>(
        &self,
        variant: &Variant<W>,
        board: &Board<W>,
        side: Side,
    ) -> bool {
        let s = side.index();
        for (p, desc) in variant.pieces.iter().enumerate() {
            if desc.is_royal() || matches!(desc.class, PieceClass::Pawn) {
                continue;
            }
            if !(board.bbp[p] & board.bbc[s]).is_empty() {
                return true;
            }
            if board.holdings[p][s] > 0 {
                return true;
            }
        }
        false
    }

    /// Score moves for the main loop ordering.
    pub(crate) fn order_moves<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &Board<W>,
        moves: &MoveList,
        tt_move: Move,
        ply: i32,
    ) -> ScoredMoveList {
        let stm = board.side_to_move;
        let killers = self.killers.at(ply as usize);
        let prev = if ply > 0 {
            self.prev_moves[(ply - 1) as usize]
        } else {
            Move::NONE
        };
        let counter = self.counters.get(prev, stm);

        let mut scored = ScoredMoveList::new();
        for &mv in moves.iter() {
            let score = if mv == tt_move {
                HASH_MOVE_SCORE
            } else if mv == killers.mate {
                MATE_KILLER_SCORE
            } else if mv.is_pickup() {
                // Taking a piece in hand is rarely urgent
                self.history.score(stm, mv) - 200
            } else if mv.is_capture() {
                let exchange = see(variant, board, &mut self.see_cache, mv);
                if exchange >= 0 {
                    let victim = if board.occupied().test(mv.capture_square()) {
                        let piece = board.get_piece(mv.capture_square());
                        variant.pieces[piece.index()].value.0
                    } else {
                        0
                    };
                    WINNING_CAPTURE_SCORE + victim
                } else {
                    LOSING_CAPTURE_SCORE + exchange
                }
            } else if mv.is_promotion() {
                WINNING_CAPTURE_SCORE - 1
            } else if mv == killers.primary {
                KILLER1_SCORE
            } else if mv == killers.secondary {
                KILLER2_SCORE
            } else if mv == killers.null {
                NULL_KILLER_SCORE
            } else if mv == counter {
                COUNTER_SCORE
            } else {
                self.history.score(stm, mv)
            };
            scored.push(mv, score);
        }
        scored
    }

    /// Bookkeeping on a beta cutoff.
    fn note_cutoff(&mut self, stm: Side, mv: Move, ply: i32, depth: i32, score: i32, in_check: bool) {
        let is_quiet = !mv.is_capture() && !mv.is_promotion() && !mv.is_castle() && !mv.is_pickup();
        if is_quiet {
            self.killers.store(ply as usize, mv);
            if is_mate_score(score) {
                self.killers.store_mate(ply as usize, mv);
            }
            if ply > 0 {
                let prev = self.prev_moves[(ply - 1) as usize];
                self.counters.set(prev, stm, mv);
            }
            if !in_check {
                self.history.reward(stm, mv, depth);
            }
        }
    }
}
