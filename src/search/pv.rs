//! Triangular principal-variation table.

use crate::moves::Move;

pub struct PvTable {
    lines: Vec<Vec<Move>>,
}

impl PvTable {
    #[must_use]
    pub fn new(max_ply: usize) -> Self {
        PvTable {
            lines: vec![Vec::new(); max_ply + 1],
        }
    }

    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
    }

    /// Leaf reached: terminate the line at this ply.
    pub fn terminate(&mut self, ply: usize) {
        if ply < self.lines.len() {
            self.lines[ply].clear();
        }
    }

    /// An alpha-improving move at `ply`: the line here becomes the move
    /// followed by the line found one ply deeper.
    pub fn update(&mut self, ply: usize, mv: Move) {
        if ply >= self.lines.len() {
            return;
        }
        let child: Vec<Move> = if ply + 1 < self.lines.len() {
            self.lines[ply + 1].clone()
        } else {
            Vec::new()
        };
        let line = &mut self.lines[ply];
        line.clear();
        line.push(mv);
        line.extend(child);
    }

    #[must_use]
    pub fn best_line(&self) -> &[Move] {
        &self.lines[0]
    }

    #[must_use]
    pub fn best_move(&self) -> Option<Move> {
        self.lines[0].first().copied()
    }

    #[must_use]
    pub fn ponder_move(&self) -> Option<Move> {
        self.lines[0].get(1).copied()
    }
}
