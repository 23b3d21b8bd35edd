//! Mate sub-search: a staged checks-and-evasions prober for drop games.
//!
//! The attacker tries only checking drops and checking board moves; the
//! defender only evasions. If some check leaves the defender without a
//! legal reply within the ply budget, the line is a forced mate. Verdicts
//! are cached in a direct-mapped table keyed by position and remaining
//! plies; only mate results are trusted into the main transposition table.

use crate::bits::BitWord;
use crate::board::Board;
use crate::moves::Move;
use crate::movegen::StagedMoves;
use crate::variant::Variant;

use super::{move_is_legal_after_make, Bound, LEGAL_WIN};

const MATE_CACHE_SIZE: usize = (1 << 16) + 8;
const MATE_NODE_BUDGET: u64 = 1_000;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Unknown,
    Mate,
    NoMate,
}

pub struct MateCache {
    keys: Vec<u64>,
    verdicts: Vec<u8>,
}

impl MateCache {
    #[must_use]
    pub fn new() -> Self {
        MateCache {
            keys: vec![0; MATE_CACHE_SIZE],
            verdicts: vec![0; MATE_CACHE_SIZE],
        }
    }

    pub fn clear(&mut self) {
        for k in &mut self.keys {
            *k = 0;
        }
    }

    #[inline]
    fn slot(key: u64) -> usize {
        (key % MATE_CACHE_SIZE as u64) as usize
    }

    fn probe(&self, hash: u64, plies: i32) -> Verdict {
        let key = hash ^ (plies as u64).wrapping_mul(0x100_0000_01B3);
        let slot = Self::slot(key);
        if self.keys[slot] == key && key != 0 {
            match self.verdicts[slot] {
                1 => Verdict::Mate,
                2 => Verdict::NoMate,
                _ => Verdict::Unknown,
            }
        } else {
            Verdict::Unknown
        }
    }

    fn store(&mut self, hash: u64, plies: i32, verdict: Verdict) {
        let key = hash ^ (plies as u64).wrapping_mul(0x100_0000_01B3);
        let slot = Self::slot(key);
        self.keys[slot] = key;
        self.verdicts[slot] = match verdict {
            Verdict::Mate => 1,
            Verdict::NoMate => 2,
            Verdict::Unknown => 0,
        };
    }
}

impl Default for MateCache {
    fn default() -> Self {
        MateCache::new()
    }
}

impl super::Search {
    /// Probe for a forced mate by the side to move within `mply` of its own
    /// checking moves. Returns the mate score when found.
    pub(crate) fn mate_probe<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        ply: i32,
        mply: i32,
    ) -> Option<i32> {
        let mut budget = MATE_NODE_BUDGET;
        if self.mate_attack(variant, board, 0, mply, &mut budget) {
            let score = LEGAL_WIN - ply - 1;
            // Only proven mates reach the transposition table
            self.tt
                .store(board.hash, mply, ply, score, Bound::Lower, Move::NONE);
            Some(score)
        } else {
            None
        }
    }

    /// Attacker to move: does some checking move force mate?
    fn mate_attack<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        depth: i32,
        mply: i32,
        budget: &mut u64,
    ) -> bool {
        if depth >= mply || *budget == 0 {
            return false;
        }
        match self.mate_cache.probe(board.hash, mply - depth) {
            Verdict::Mate => return true,
            Verdict::NoMate => return false,
            Verdict::Unknown => {}
        }

        let stm = board.side_to_move;
        let mut stage = StagedMoves::attacking();
        let mut found = false;
        let mut ui = crate::board::UnmakeInfo::default();

        while let Some(mv) = stage.next(&variant.movegen, variant, board, stm) {
            if *budget == 0 {
                break;
            }
            *budget -= 1;

            board.make(variant, mv, &mut ui);
            if !move_is_legal_after_make(variant, board, stm, mv) {
                board.unmake(variant, mv, &ui);
                continue;
            }
            variant.movegen.update_check_state(variant, board);
            if !board.in_check() {
                // The staged filter is approximate; a non-check is useless
                board.unmake(variant, mv, &ui);
                continue;
            }
            let mated = self.mate_defend(variant, board, depth + 1, mply, budget);
            board.unmake(variant, mv, &ui);
            if mated {
                found = true;
                break;
            }
        }

        // A budget-truncated scan proves nothing; only settled verdicts
        // enter the cache
        if found || *budget > 0 {
            self.mate_cache.store(
                board.hash,
                mply - depth,
                if found { Verdict::Mate } else { Verdict::NoMate },
            );
        }
        found
    }

    /// Defender to move, in check: is every evasion hopeless?
    fn mate_defend<W: BitWord>(
        &mut self,
        variant: &Variant<W>,
        board: &mut Board<W>,
        depth: i32,
        mply: i32,
        budget: &mut u64,
    ) -> bool {
        let stm = board.side_to_move;
        let mut stage = StagedMoves::defending();
        let mut any_escape = false;
        let mut any_legal = false;
        let mut ui = crate::board::UnmakeInfo::default();

        while let Some(mv) = stage.next(&variant.movegen, variant, board, stm) {
            if *budget == 0 {
                // Out of budget: assume an escape rather than a false mate
                return false;
            }
            *budget -= 1;

            board.make(variant, mv, &mut ui);
            if !move_is_legal_after_make(variant, board, stm, mv) {
                board.unmake(variant, mv, &ui);
                continue;
            }
            any_legal = true;
            variant.movegen.update_check_state(variant, board);

            let still_mated = if depth >= mply {
                false
            } else {
                self.mate_attack(variant, board, depth, mply, budget)
            };
            board.unmake(variant, mv, &ui);

            if !still_mated {
                any_escape = true;
                break;
            }
        }

        if !any_legal {
            return true;
        }
        !any_escape
    }
}
