//! Quiescence search: stand pat, then only the loud moves.

use crate::bits::BitWord;
use crate::board::Board;
use crate::movegen::GenMode;
use crate::moves::MoveList;
use crate::variant::{RuleFlags, Variant};

use super::see::see;
use super::{move_is_legal_after_make, ILLEGAL, LEGAL_WIN, MAX_PLY};

impl super::Search {
    /// `draft` counts how far below the nominal horizon we are (negative
    /// going deeper).
    pub(crate) fn quiesce<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        mut alpha: i32,
        beta: i32,
        ply: i32,
        draft: i32,
    ) -> i32 {
        self.nodes += 1;
        self.sel_depth = self.sel_depth.max(ply + 1);
        if self.should_stop() {
            return 0;
        }
        self.pv.terminate(ply as usize);

        if ply >= MAX_PLY as i32 - 2 {
            return self.eval.static_eval(variant, board, self.moves_played);
        }

        let in_check = board.in_check();
        let mut best_score = -LEGAL_WIN + ply;

        if !in_check {
            // Stand pat
            let stand_pat = self.eval.static_eval(variant, board, self.moves_played);
            if stand_pat >= beta {
                return stand_pat;
            }
            best_score = stand_pat;
            alpha = alpha.max(stand_pat);

            // Deep pickup/forced-capture tails devolve to a static exchange
            // estimate instead of expanding further
            if draft < -8
                && variant
                    .rules
                    .intersects(RuleFlags::ALLOW_PICKUP | RuleFlags::FORCE_CAPTURE)
            {
                return self.static_qsearch(variant, board, stand_pat, beta);
            }
        }

        let stm = board.side_to_move;
        let mut moves = MoveList::new();
        variant
            .movegen
            .generate_moves(variant, board, stm, &mut moves, GenMode::Quiescence);

        let tt_move = self
            .tt
            .probe(board.hash, ply)
            .map_or(crate::moves::Move::NONE, |hit| hit.best_move);
        let mut scored = self.order_moves(variant, board, &moves, tt_move, ply);

        let mut legal_moves = 0u32;
        let mut index = 0usize;
        let mut ui = crate::board::UnmakeInfo::default();
        while let Some(entry) = scored.pick_best(index) {
            index += 1;
            let mv = entry.mv;

            // Outside check, losing exchanges are not worth expanding
            if !in_check && mv.is_capture() && see(variant, board, &mut self.see_cache, mv) < 0 {
                continue;
            }

            board.make(variant, mv, &mut ui);
            if !move_is_legal_after_make(variant, board, stm, mv) {
                board.unmake(variant, mv, &ui);
                continue;
            }
            variant.movegen.update_check_state(variant, board);
            legal_moves += 1;
            self.stack.push(super::HistoryEntry {
                hash: board.hash,
                board_hash: board.board_hash,
                mv,
            });

            let score = -self.quiesce(variant, board, -beta, -alpha, ply + 1, draft - 1);

            self.stack.pop();
            board.unmake(variant, mv, &ui);

            if score == -ILLEGAL {
                legal_moves -= 1;
                continue;
            }
            if self.abort.load(std::sync::atomic::Ordering::Relaxed) {
                return 0;
            }

            if score > best_score {
                best_score = score;
                if score > alpha {
                    if score >= beta {
                        return score;
                    }
                    alpha = score;
                    self.pv.update(ply as usize, mv);
                }
            }
        }

        // Checkmate shows up here when every evasion failed
        if in_check && legal_moves == 0 {
            return self.mated_score(variant, board, ply);
        }

        best_score
    }

    /// Capture deltas measured against the stand-pat score, no further tree.
    fn static_qsearch<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        stand_pat: i32,
        beta: i32,
    ) -> i32 {
        let stm = board.side_to_move;
        let mut moves = MoveList::new();
        variant
            .movegen
            .generate_moves(variant, board, stm, &mut moves, GenMode::Quiescence);

        let mut best = stand_pat;
        for &mv in moves.iter() {
            if !mv.is_capture() {
                continue;
            }
            let exchange = see(variant, board, &mut self.see_cache, mv);
            if exchange > 0 {
                best = best.max(stand_pat + exchange);
                if best >= beta {
                    break;
                }
            }
        }
        best
    }
}
