//! Move generation: atom compilation, attack bitboards, pseudo-legal and
//! evasion generation, check and pin detection.
//!
//! The generator owns the board geometry and every movement lookup table.
//! Piece descriptors reference tables through indices packed into their
//! [`MoveFlags`] words, so there is no ownership cycle between the two.

mod attack;
mod generate;

pub use generate::{GenMode, StagedMoves, Stage};

use crate::bits::BitWord;
use crate::error::VariantError;
use crate::geometry::{Bitboard, Dir, Geometry, Side, Square};
use crate::pieces::MoveFlags;

/// Maximum table count per family; indices must fit a 4-bit field.
const MAX_FAMILY_TABLES: usize = 15;

/// A castling rule: king and partner origin/destination plus derived masks.
#[derive(Clone, Debug)]
pub struct CastleRule<W: BitWord> {
    pub side: Side,
    pub king_from: Square,
    pub king_to: Square,
    pub rook_from: Square,
    pub rook_to: Square,
    /// Squares that must be empty (participants excluded).
    pub free: Bitboard<W>,
    /// Squares the king traverses, origin and destination included; none may
    /// be attacked.
    pub safe: Bitboard<W>,
    /// Board side: 0 = kingside, 1 = queenside; keys the castle hash.
    pub board_side: usize,
}

/// One rider description: up to four (dx, dy) ray families.
#[derive(Clone, Copy, Debug, Default)]
struct RiderSteps {
    steps: [(i8, i8); 4],
}

/// Table arenas plus everything derived from the declared piece set.
pub struct MoveGen<W: BitWord> {
    pub geo: Geometry<W>,

    /// Symmetric leaper destination sets, `[index][square]`.
    leaper: Vec<Vec<Bitboard<W>>>,
    /// Asymmetric leaper sets, `[side][index][square]`.
    aleaper: [Vec<Vec<Bitboard<W>>>; 2],

    rider_steps: Vec<RiderSteps>,
    /// Ray between from and to for pin detection, `[index][from * cells + to]`.
    rider_ray: Vec<Vec<Bitboard<W>>>,

    /// Packed per-direction repeat counts, `[index][side]`; 4 bits per
    /// direction in `Dir` order. Index 0 is reserved (flag value "none").
    stepper_description: Vec<[u32; 2]>,

    /// Slider tables: attack pattern for a mover on `file` given the rank
    /// occupancy, replicated across every rank; mask with the target rank or
    /// diagonal to use. `[file][occupancy]`.
    horizontal_slider: Vec<Vec<Bitboard<W>>>,
    /// `[rank][occupancy along file]`, replicated across files.
    vertical_slider: Vec<Vec<Bitboard<W>>>,
    horizontal_hopper: Vec<Vec<Bitboard<W>>>,
    vertical_hopper: Vec<Vec<Bitboard<W>>>,

    pub castles: Vec<CastleRule<W>>,

    /// Union of every declared capture capability, per family, per cell.
    pub super_all: Vec<Bitboard<W>>,
    pub super_slider: Vec<Bitboard<W>>,
    pub super_hopper: Vec<Bitboard<W>>,
    pub super_leaper: Vec<Bitboard<W>>,
    pub super_stepper: Vec<Bitboard<W>>,
    pub super_rider: Vec<Bitboard<W>>,
    pub(crate) super_slider_flags: MoveFlags,
    pub(crate) super_hopper_flags: MoveFlags,
}

impl<W: BitWord> MoveGen<W> {
    pub fn new(geo: Geometry<W>) -> Self {
        let cells = geo.cells();
        let mut gen = MoveGen {
            geo,
            leaper: Vec::new(),
            aleaper: [Vec::new(), Vec::new()],
            rider_steps: vec![RiderSteps::default()], // index 0 = none
            rider_ray: vec![Vec::new()],
            stepper_description: vec![[0, 0]], // index 0 = none
            horizontal_slider: Vec::new(),
            vertical_slider: Vec::new(),
            horizontal_hopper: Vec::new(),
            vertical_hopper: Vec::new(),
            castles: Vec::new(),
            super_all: vec![Bitboard::EMPTY; cells],
            super_slider: vec![Bitboard::EMPTY; cells],
            super_hopper: vec![Bitboard::EMPTY; cells],
            super_leaper: vec![Bitboard::EMPTY; cells],
            super_stepper: vec![Bitboard::EMPTY; cells],
            super_rider: vec![Bitboard::EMPTY; cells],
            super_slider_flags: MoveFlags::NONE,
            super_hopper_flags: MoveFlags::NONE,
        };
        gen.build_slider_tables();
        gen
    }

    // ------------------------------------------------------------------
    // Atom compilation
    // ------------------------------------------------------------------

    /// Compile a symmetric leaper from (n, m) offsets. Each offset expands
    /// eight-fold: (+-n, +-m) and (+-m, +-n).
    pub fn leaper(&mut self, offsets: &[(i8, i8)]) -> Result<MoveFlags, VariantError> {
        let mut table = vec![Bitboard::EMPTY; self.geo.cells()];
        for (sq, entry) in table.iter_mut().enumerate() {
            let sq = Square::from_index(sq);
            for &(n, m) in offsets {
                *entry |= self.leap_targets(sq, n, m);
            }
        }
        let index = self.intern_leaper(table)?;
        Ok(MoveFlags(
            MoveFlags::IS_LEAPER | ((index as u32) << MoveFlags::LEAPER_SHIFT),
        ))
    }

    /// Compile an asymmetric leaper from explicit (df, dr) deltas; the black
    /// table is the vertical mirror.
    pub fn asym_leaper(&mut self, deltas: &[(i8, i8)]) -> Result<MoveFlags, VariantError> {
        let cells = self.geo.cells();
        let mut white = vec![Bitboard::EMPTY; cells];
        let mut black = vec![Bitboard::EMPTY; cells];
        for sq in 0..cells {
            let square = Square::from_index(sq);
            for &(df, dr) in deltas {
                if let Some(to) = self.offset(square, df, dr) {
                    white[sq].set(to);
                }
                if let Some(to) = self.offset(square, df, -dr) {
                    black[sq].set(to);
                }
            }
        }
        let index = self.aleaper[0].len();
        if index >= MAX_FAMILY_TABLES {
            return Err(VariantError::TableOverflow { family: "leaper" });
        }
        self.aleaper[0].push(white);
        self.aleaper[1].push(black);
        Ok(MoveFlags(
            MoveFlags::IS_LEAPER
                | MoveFlags::LEAPER_ASYMM
                | (((index + 1) as u32) << MoveFlags::LEAPER_SHIFT),
        ))
    }

    /// Compile a double leaper: leg A to an intermediate square, then leg B
    /// onward. When `lame` the intermediate must be empty and the final
    /// destinations are masked by the single-leap set `mask_offsets`.
    pub fn double_leaper(
        &mut self,
        leg_a: &[(i8, i8)],
        leg_b: &[(i8, i8)],
        lame_mask: Option<&[(i8, i8)]>,
    ) -> Result<MoveFlags, VariantError> {
        let a = self.leaper(leg_a)?;
        let b = self.leaper(leg_b)?;
        let mut word = MoveFlags(
            MoveFlags::IS_LEAPER
                | MoveFlags::LEAPER_DOUBLE
                | ((a.leaper_index() as u32) << MoveFlags::LEAPER_SHIFT)
                | ((b.leaper_index() as u32) << MoveFlags::LEAPER2_SHIFT),
        );
        if let Some(mask) = lame_mask {
            let m = self.leaper(mask)?;
            word = MoveFlags(
                word.0
                    | MoveFlags::LEAPER_LAME
                    | ((m.leaper_index() as u32) << MoveFlags::LEAPER_MASK_SHIFT),
            );
        }
        Ok(word)
    }

    /// Slider over a subset of the four ray families.
    #[must_use]
    pub fn slider(horizontal: bool, vertical: bool, diagonal: bool, antidiagonal: bool) -> MoveFlags {
        let mut word = 0;
        if horizontal {
            word |= MoveFlags::SLIDER_H;
        }
        if vertical {
            word |= MoveFlags::SLIDER_V;
        }
        if diagonal {
            word |= MoveFlags::SLIDER_D;
        }
        if antidiagonal {
            word |= MoveFlags::SLIDER_A;
        }
        MoveFlags(word)
    }

    /// Hopper (screen-jumper) over a subset of the four ray families.
    #[must_use]
    pub fn hopper(horizontal: bool, vertical: bool, diagonal: bool, antidiagonal: bool) -> MoveFlags {
        MoveFlags(Self::slider(horizontal, vertical, diagonal, antidiagonal).0 << MoveFlags::HOPPER_SHIFT)
    }

    /// Compile a stepper from per-direction repeat counts (0-15), given for
    /// White; the Black word mirrors every direction vertically.
    pub fn stepper(&mut self, counts: &[(Dir, u8)]) -> Result<MoveFlags, VariantError> {
        let mut white = 0u32;
        let mut black = 0u32;
        for &(dir, count) in counts {
            let count = u32::from(count.min(15));
            white |= count << (4 * dir as u32);
            black |= count << (4 * dir.mirror() as u32);
        }
        // Dedup identical descriptions
        for (i, desc) in self.stepper_description.iter().enumerate().skip(1) {
            if desc[0] == white && desc[1] == black {
                return Ok(MoveFlags((i as u32) << MoveFlags::STEPPER_SHIFT));
            }
        }
        let index = self.stepper_description.len();
        if index > MAX_FAMILY_TABLES {
            return Err(VariantError::TableOverflow { family: "stepper" });
        }
        self.stepper_description.push([white, black]);
        Ok(MoveFlags((index as u32) << MoveFlags::STEPPER_SHIFT))
    }

    /// Compile a rider: repeated (df, dr) leaps along a ray, up to four ray
    /// families, each expanded eight-fold.
    pub fn rider(&mut self, steps: &[(i8, i8)]) -> Result<MoveFlags, VariantError> {
        let index = self.rider_steps.len();
        if index > MAX_FAMILY_TABLES || steps.len() > 4 {
            return Err(VariantError::TableOverflow { family: "rider" });
        }
        let mut desc = RiderSteps::default();
        for (slot, &step) in desc.steps.iter_mut().zip(steps.iter()) {
            *slot = step;
        }
        self.rider_steps.push(desc);

        // Precompute the strictly-between ray for every (from, to) pair this
        // rider connects; used by pin detection.
        let cells = self.geo.cells();
        let mut rays = vec![Bitboard::EMPTY; cells * cells];
        for from in 0..cells {
            let square = Square::from_index(from);
            for (sx, sy) in Self::expand_octants(&desc) {
                let mut ray = Bitboard::EMPTY;
                let mut cur = square;
                while let Some(next) = self.offset(cur, sx, sy) {
                    rays[from * cells + next.index()] = ray;
                    ray.set(next);
                    cur = next;
                }
            }
        }
        self.rider_ray.push(rays);
        Ok(MoveFlags((index as u32) << MoveFlags::RIDER_SHIFT))
    }

    fn expand_octants(desc: &RiderSteps) -> Vec<(i8, i8)> {
        let mut out = Vec::new();
        for &(sx, sy) in &desc.steps {
            if sx == 0 && sy == 0 {
                break;
            }
            for &(dx, dy) in &[
                (sx, sy),
                (sx, -sy),
                (-sx, sy),
                (-sx, -sy),
                (sy, sx),
                (sy, -sx),
                (-sy, sx),
                (-sy, -sx),
            ] {
                if !out.contains(&(dx, dy)) {
                    out.push((dx, dy));
                }
            }
        }
        out
    }

    /// Register a castling rule and derive its path masks. The partner's
    /// destination is the square the king passes last, i.e. adjacent to the
    /// king's destination on the origin side.
    pub fn add_castle_rule(
        &mut self,
        side: Side,
        king_from: Square,
        king_to: Square,
        rook_from: Square,
    ) -> Result<(), VariantError> {
        let cells = self.geo.cells();
        for sq in [king_from, king_to, rook_from] {
            if sq.index() >= cells || !self.geo.all.test(sq) {
                return Err(VariantError::BadCastleRule { square: sq.index() });
            }
        }
        let kingside = self.geo.file_of(king_to) > self.geo.file_of(king_from);
        let rook_to_file = if kingside {
            self.geo.file_of(king_to) - 1
        } else {
            self.geo.file_of(king_to) + 1
        };
        let rook_to = self.geo.square(rook_to_file, self.geo.rank_of(king_from));

        let mut free = self.geo.between(king_from, king_to)
            | self.geo.between(rook_from, rook_to)
            | Bitboard::from_square(king_to)
            | Bitboard::from_square(rook_to);
        free.reset(king_from);
        free.reset(rook_from);

        let safe = self.geo.between(king_from, king_to)
            | Bitboard::from_square(king_from)
            | Bitboard::from_square(king_to);

        self.castles.push(CastleRule {
            side,
            king_from,
            king_to,
            rook_from,
            rook_to,
            free,
            safe,
            board_side: usize::from(!kingside),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Table internals
    // ------------------------------------------------------------------

    fn intern_leaper(&mut self, table: Vec<Bitboard<W>>) -> Result<usize, VariantError> {
        // Equivalent leapers share one table; this deduplicates the memory
        // for pieces that combine the same leap with different other atoms.
        for (i, existing) in self.leaper.iter().enumerate() {
            if existing == &table {
                return Ok(i + 1);
            }
        }
        let index = self.leaper.len() + 1;
        if index > MAX_FAMILY_TABLES {
            return Err(VariantError::TableOverflow { family: "leaper" });
        }
        self.leaper.push(table);
        Ok(index)
    }

    fn leap_targets(&self, from: Square, n: i8, m: i8) -> Bitboard<W> {
        let mut bb = Bitboard::EMPTY;
        for &(df, dr) in &[
            (n, m),
            (n, -m),
            (-n, m),
            (-n, -m),
            (m, n),
            (m, -n),
            (-m, n),
            (-m, -n),
        ] {
            if let Some(to) = self.offset(from, df, dr) {
                bb.set(to);
            }
        }
        bb
    }

    #[inline]
    fn offset(&self, from: Square, df: i8, dr: i8) -> Option<Square> {
        let f = self.geo.file_of(from) as i32 + df as i32;
        let r = self.geo.rank_of(from) as i32 + dr as i32;
        if f >= 0 && r >= 0 && (f as usize) < self.geo.files && (r as usize) < self.geo.ranks {
            let sq = self.geo.square(f as usize, r as usize);
            if self.geo.all.test(sq) {
                return Some(sq);
            }
        }
        None
    }

    /// One-dimensional slider and hopper patterns, replicated across ranks
    /// (horizontal tables) or files (vertical tables) so a single mask picks
    /// out the rank, file or diagonal being scanned.
    fn build_slider_tables(&mut self) {
        let files = self.geo.files;
        let ranks = self.geo.ranks;

        self.horizontal_slider = (0..files)
            .map(|f| {
                (0..1usize << files)
                    .map(|occ| self.replicate_rank_pattern(Self::line_attack(f, occ, files)))
                    .collect()
            })
            .collect();
        self.horizontal_hopper = (0..files)
            .map(|f| {
                (0..1usize << files)
                    .map(|occ| self.replicate_rank_pattern(Self::line_hop(f, occ, files)))
                    .collect()
            })
            .collect();
        self.vertical_slider = (0..ranks)
            .map(|r| {
                (0..1usize << ranks)
                    .map(|occ| self.replicate_file_pattern(Self::line_attack(r, occ, ranks)))
                    .collect()
            })
            .collect();
        self.vertical_hopper = (0..ranks)
            .map(|r| {
                (0..1usize << ranks)
                    .map(|occ| self.replicate_file_pattern(Self::line_hop(r, occ, ranks)))
                    .collect()
            })
            .collect();
    }

    /// Cells reachable along one line from `pos` given `occ`; runs stop at
    /// and include the first blocker.
    fn line_attack(pos: usize, occ: usize, len: usize) -> usize {
        let mut out = 0usize;
        let mut i = pos;
        while i + 1 < len {
            i += 1;
            out |= 1 << i;
            if occ & (1 << i) != 0 {
                break;
            }
        }
        let mut i = pos;
        while i > 0 {
            i -= 1;
            out |= 1 << i;
            if occ & (1 << i) != 0 {
                break;
            }
        }
        out
    }

    /// Cells reachable by jumping exactly one screen: everything strictly
    /// beyond the first blocker, up to and including the second.
    fn line_hop(pos: usize, occ: usize, len: usize) -> usize {
        let mut out = 0usize;
        let mut i = pos;
        let mut seen_screen = false;
        while i + 1 < len {
            i += 1;
            let hit = occ & (1 << i) != 0;
            if seen_screen {
                out |= 1 << i;
                if hit {
                    break;
                }
            } else if hit {
                seen_screen = true;
            }
        }
        let mut i = pos;
        let mut seen_screen = false;
        while i > 0 {
            i -= 1;
            let hit = occ & (1 << i) != 0;
            if seen_screen {
                out |= 1 << i;
                if hit {
                    break;
                }
            } else if hit {
                seen_screen = true;
            }
        }
        out
    }

    fn replicate_rank_pattern(&self, pattern: usize) -> Bitboard<W> {
        let mut bb = Bitboard::EMPTY;
        for r in 0..self.geo.ranks {
            for f in 0..self.geo.files {
                if pattern & (1 << f) != 0 {
                    bb.set(self.geo.square(f, r));
                }
            }
        }
        bb
    }

    fn replicate_file_pattern(&self, pattern: usize) -> Bitboard<W> {
        let mut bb = Bitboard::EMPTY;
        for r in 0..self.geo.ranks {
            if pattern & (1 << r) != 0 {
                for f in 0..self.geo.files {
                    bb.set(self.geo.square(f, r));
                }
            }
        }
        bb
    }

    // ------------------------------------------------------------------
    // Per-family attack bitboards
    // ------------------------------------------------------------------

    #[must_use]
    pub fn leaper_moves(
        &self,
        flags: MoveFlags,
        side: Side,
        from: Square,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        debug_assert!(flags.is_leaper());
        let index = flags.leaper_index();
        let mut moves = if flags.is_asymm_leaper() {
            self.aleaper[side.index()][index - 1][from.index()]
        } else {
            self.leaper[index - 1][from.index()]
        };

        if flags.is_simple_leaper() {
            return moves;
        }

        if flags.is_double_leaper() {
            let mut intermediates = moves;
            if flags.is_lame_leaper() {
                intermediates &= !occ;
            }
            let second = flags.leaper_index2();
            for sq in intermediates.iter() {
                moves |= self.leaper[second - 1][sq.index()];
            }
        }

        if flags.is_lame_leaper() {
            moves &= self.leaper[flags.leaper_mask_index() - 1][from.index()];
        }

        moves & self.geo.all
    }

    #[must_use]
    pub fn slider_moves(&self, flags: MoveFlags, from: Square, occ: Bitboard<W>) -> Bitboard<W> {
        debug_assert!(flags.is_slider());
        let geo = &self.geo;
        let file = geo.file_of(from);
        let rank = geo.rank_of(from);
        let mut moves = Bitboard::EMPTY;

        if flags.0 & MoveFlags::SLIDER_H != 0 {
            let index = geo.get_rank(occ, rank);
            moves |= self.horizontal_slider[file][index] & geo.rank[rank];
        }
        if flags.0 & MoveFlags::SLIDER_V != 0 {
            let index = geo.get_file(occ, file);
            moves |= self.vertical_slider[rank][index] & geo.file[file];
        }
        if flags.0 & MoveFlags::SLIDER_D != 0 {
            let mask = geo.diagonal[geo.diagonal_nr[from.index()] as usize];
            let index = geo.get_rank(geo.fill_south(occ & mask), 0);
            moves |= self.horizontal_slider[file][index] & mask;
        }
        if flags.0 & MoveFlags::SLIDER_A != 0 {
            let mask = geo.antidiagonal[geo.antidiagonal_nr[from.index()] as usize];
            let index = geo.get_rank(geo.fill_south(occ & mask), 0);
            moves |= self.horizontal_slider[file][index] & mask;
        }
        moves & geo.all
    }

    #[must_use]
    pub fn hopper_moves(&self, flags: MoveFlags, from: Square, occ: Bitboard<W>) -> Bitboard<W> {
        debug_assert!(flags.is_hopper());
        let geo = &self.geo;
        let file = geo.file_of(from);
        let rank = geo.rank_of(from);
        let dirs = flags.hopper_dirs();
        let mut moves = Bitboard::EMPTY;

        if dirs & MoveFlags::SLIDER_H != 0 {
            let index = geo.get_rank(occ, rank);
            moves |= self.horizontal_hopper[file][index] & geo.rank[rank];
        }
        if dirs & MoveFlags::SLIDER_V != 0 {
            let index = geo.get_file(occ, file);
            moves |= self.vertical_hopper[rank][index] & geo.file[file];
        }
        if dirs & MoveFlags::SLIDER_D != 0 {
            let mask = geo.diagonal[geo.diagonal_nr[from.index()] as usize];
            let index = geo.get_rank(geo.fill_south(occ & mask), 0);
            moves |= self.horizontal_hopper[file][index] & mask;
        }
        if dirs & MoveFlags::SLIDER_A != 0 {
            let mask = geo.antidiagonal[geo.antidiagonal_nr[from.index()] as usize];
            let index = geo.get_rank(geo.fill_south(occ & mask), 0);
            moves |= self.horizontal_hopper[file][index] & mask;
        }
        moves & geo.all
    }

    #[must_use]
    pub fn rider_moves(
        &self,
        flags: MoveFlags,
        from: Square,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        debug_assert!(flags.is_rider());
        let desc = &self.rider_steps[flags.rider_index()];
        let mut moves = Bitboard::EMPTY;
        for (sx, sy) in Self::expand_octants(desc) {
            let mut cur = from;
            while let Some(next) = self.offset(cur, sx, sy) {
                moves.set(next);
                if occ.test(next) {
                    break;
                }
                cur = next;
            }
        }
        moves
    }

    /// Stepper destinations from a set of origins, in parallel. Returns all
    /// cells stepped onto; occupied cells end their ray.
    #[must_use]
    pub fn stepper_moves_set(
        &self,
        flags: MoveFlags,
        side: Side,
        steppers: Bitboard<W>,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        debug_assert!(flags.is_stepper());
        let desc = self.stepper_description[flags.stepper_index()][side.index()];
        let mut moves = Bitboard::EMPTY;
        for d in 0..8 {
            let mut count = (desc >> (4 * d)) & 15;
            let mut dmoves = steppers;
            while count > 0 {
                dmoves &= self.geo.step_mask[d];
                dmoves = dmoves.sshift(self.geo.step_shift[d]) & self.geo.all;
                moves |= dmoves;
                dmoves &= !occ;
                count -= 1;
            }
        }
        moves
    }

    /// Stepper destinations from one origin.
    #[must_use]
    pub fn stepper_moves(
        &self,
        flags: MoveFlags,
        side: Side,
        from: Square,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        self.stepper_moves_set(flags, side, Bitboard::from_square(from), occ)
    }

    /// Union of every family a flag word enables.
    #[must_use]
    pub fn moves_for_flags(
        &self,
        flags: MoveFlags,
        side: Side,
        from: Square,
        occ: Bitboard<W>,
    ) -> Bitboard<W> {
        let mut moves = Bitboard::EMPTY;
        if flags.is_leaper() {
            moves |= self.leaper_moves(flags, side, from, occ);
        }
        if flags.is_slider() {
            moves |= self.slider_moves(flags, from, occ);
        }
        if flags.is_hopper() {
            moves |= self.hopper_moves(flags, from, occ);
        }
        if flags.is_rider() {
            moves |= self.rider_moves(flags, from, occ);
        }
        if flags.is_stepper() {
            moves |= self.stepper_moves(flags, side, from, occ);
        }
        moves & !Bitboard::from_square(from) & self.geo.all
    }

    /// Ray strictly between two squares for any enabled ray family (slider,
    /// hopper, rider); used for pins and interpositions.
    #[must_use]
    pub fn connecting_ray(&self, flags: MoveFlags, from: Square, to: Square) -> Bitboard<W> {
        if flags.is_slider() || flags.is_hopper() {
            let ray = self.geo.between(from, to);
            if !ray.is_empty() || self.adjacent(from, to) {
                return ray;
            }
        }
        if flags.is_rider() {
            return self.rider_ray[flags.rider_index()][from.index() * self.geo.cells() + to.index()];
        }
        Bitboard::EMPTY
    }

    fn adjacent(&self, a: Square, b: Square) -> bool {
        self.geo.king_zone[a.index()].test(b)
    }

    /// Recover a leaper's (df, dr) deltas from its table, measured at a
    /// central cell; used by the Betza pretty-printer.
    #[must_use]
    pub fn leaper_offsets(&self, flags: MoveFlags, side: Side) -> Vec<(i8, i8)> {
        if !flags.is_leaper() {
            return Vec::new();
        }
        let geo = &self.geo;
        let centre = geo.square(geo.files / 2, geo.ranks / 2);
        let index = flags.leaper_index();
        let table = if flags.is_asymm_leaper() {
            &self.aleaper[side.index()][index - 1]
        } else {
            &self.leaper[index - 1]
        };
        let cf = geo.file_of(centre) as i8;
        let cr = geo.rank_of(centre) as i8;
        table[centre.index()]
            .iter()
            .map(|sq| {
                (
                    geo.file_of(sq) as i8 - cf,
                    geo.rank_of(sq) as i8 - cr,
                )
            })
            .collect()
    }

    /// Per-direction repeat counts of a stepper word, in `Dir` order.
    #[must_use]
    pub fn stepper_counts(&self, flags: MoveFlags, side: Side) -> [u8; 8] {
        let mut out = [0u8; 8];
        if !flags.is_stepper() {
            return out;
        }
        let desc = self.stepper_description[flags.stepper_index()][side.index()];
        for (d, slot) in out.iter_mut().enumerate() {
            *slot = ((desc >> (4 * d)) & 15) as u8;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Geometry;

    fn gen8() -> MoveGen<u64> {
        MoveGen::new(Geometry::new(8, 8).expect("8x8"))
    }

    #[test]
    fn test_knight_leaper() {
        let mut gen = gen8();
        let n = gen.leaper(&[(1, 2)]).expect("leaper");
        // Knight on d4 (file 3, rank 3) attacks 8 squares
        let d4 = gen.geo.square(3, 3);
        assert_eq!(gen.leaper_moves(n, Side::White, d4, Bitboard::EMPTY).popcount(), 8);
        // Knight in the corner attacks 2
        let a1 = gen.geo.square(0, 0);
        assert_eq!(gen.leaper_moves(n, Side::White, a1, Bitboard::EMPTY).popcount(), 2);
    }

    #[test]
    fn test_leaper_tables_are_merged() {
        let mut gen = gen8();
        let a = gen.leaper(&[(1, 2)]).expect("leaper");
        let b = gen.leaper(&[(1, 2)]).expect("leaper");
        assert_eq!(a, b);
        assert_eq!(gen.leaper.len(), 1);
    }

    #[test]
    fn test_rook_slider_blocked() {
        let gen = gen8();
        let flags = MoveGen::<u64>::slider(true, true, false, false);
        let d4 = gen.geo.square(3, 3);
        let mut occ: Bitboard<u64> = Bitboard::EMPTY;
        occ.set(gen.geo.square(3, 6)); // blocker on d7
        let moves = gen.slider_moves(flags, d4, occ);
        assert!(moves.test(gen.geo.square(3, 6))); // can capture the blocker
        assert!(!moves.test(gen.geo.square(3, 7))); // not beyond it
        assert!(moves.test(gen.geo.square(0, 3))); // full west run
        assert_eq!(moves.popcount(), 7 + 3 + 3); // rank + up to blocker + down
    }

    #[test]
    fn test_bishop_diagonal_slider() {
        let gen = gen8();
        let flags = MoveGen::<u64>::slider(false, false, true, true);
        let c1 = gen.geo.square(2, 0);
        let moves = gen.slider_moves(flags, c1, Bitboard::EMPTY);
        assert_eq!(moves.popcount(), 7);
        assert!(moves.test(gen.geo.square(7, 5))); // h6
        assert!(moves.test(gen.geo.square(0, 2))); // a3
    }

    #[test]
    fn test_cannon_hopper() {
        let gen = gen8();
        let flags = MoveGen::<u64>::hopper(true, true, false, false);
        let d1 = gen.geo.square(3, 0);
        let mut occ: Bitboard<u64> = Bitboard::EMPTY;
        occ.set(gen.geo.square(3, 3)); // screen on d4
        occ.set(gen.geo.square(3, 6)); // target on d7
        let moves = gen.hopper_moves(flags, d1, occ);
        assert!(moves.test(gen.geo.square(3, 6))); // capture over the screen
        assert!(moves.test(gen.geo.square(3, 4))); // empty cells beyond screen
        assert!(!moves.test(gen.geo.square(3, 7))); // not beyond second blocker
        assert!(!moves.test(gen.geo.square(3, 2))); // not before the screen
    }

    #[test]
    fn test_pawn_stepper_mirrored() {
        let mut gen = gen8();
        let flags = gen.stepper(&[(Dir::North, 1)]).expect("stepper");
        let e2 = gen.geo.square(4, 1);
        let white = gen.stepper_moves(flags, Side::White, e2, Bitboard::EMPTY);
        assert!(white.test(gen.geo.square(4, 2)));
        assert_eq!(white.popcount(), 1);
        let black = gen.stepper_moves(flags, Side::Black, e2, Bitboard::EMPTY);
        assert!(black.test(gen.geo.square(4, 0)));
    }

    #[test]
    fn test_double_step_stepper_blocked() {
        let mut gen = gen8();
        let flags = gen.stepper(&[(Dir::North, 2)]).expect("stepper");
        let e2 = gen.geo.square(4, 1);
        let open = gen.stepper_moves(flags, Side::White, e2, Bitboard::EMPTY);
        assert_eq!(open.popcount(), 2);
        let mut occ: Bitboard<u64> = Bitboard::EMPTY;
        occ.set(gen.geo.square(4, 2));
        let blocked = gen.stepper_moves(flags, Side::White, e2, occ);
        // First step hits the blocker; no continuation
        assert_eq!(blocked.popcount(), 1);
        assert!(blocked.test(gen.geo.square(4, 2)));
    }

    #[test]
    fn test_xiangqi_horse_is_lame() {
        let mut gen = gen8();
        let horse = gen
            .double_leaper(&[(1, 0)], &[(1, 1)], Some(&[(1, 2)]))
            .expect("lame leaper");
        let d4 = gen.geo.square(3, 3);
        let open = gen.leaper_moves(horse, Side::White, d4, Bitboard::EMPTY);
        assert_eq!(open.popcount(), 8);
        // Block the northern orthogonal step: both north destinations die
        let mut occ: Bitboard<u64> = Bitboard::EMPTY;
        occ.set(gen.geo.square(3, 4));
        let blocked = gen.leaper_moves(horse, Side::White, d4, occ);
        assert_eq!(blocked.popcount(), 6);
        assert!(!blocked.test(gen.geo.square(2, 5)));
        assert!(!blocked.test(gen.geo.square(4, 5)));
    }

    #[test]
    fn test_rider_two_one() {
        let mut gen = gen8();
        let flags = gen.rider(&[(2, 1)]).expect("rider");
        let a1 = gen.geo.square(0, 0);
        let open = gen.rider_moves(flags, a1, Bitboard::EMPTY);
        // (2,1) ray: b3, c5, d7 and (1,2) ray: c2, e3, g4 (plus nothing off-board)
        assert!(open.test(gen.geo.square(1, 2)));
        assert!(open.test(gen.geo.square(2, 4)));
        assert!(open.test(gen.geo.square(3, 6)));
        let mut occ: Bitboard<u64> = Bitboard::EMPTY;
        occ.set(gen.geo.square(2, 4));
        let blocked = gen.rider_moves(flags, a1, occ);
        assert!(blocked.test(gen.geo.square(2, 4)));
        assert!(!blocked.test(gen.geo.square(3, 6)));
    }

    #[test]
    fn test_castle_rule_masks() {
        let mut gen = gen8();
        let e1 = gen.geo.square(4, 0);
        let g1 = gen.geo.square(6, 0);
        let h1 = gen.geo.square(7, 0);
        gen.add_castle_rule(Side::White, e1, g1, h1).expect("castle");
        let rule = &gen.castles[0];
        assert_eq!(rule.rook_to, gen.geo.square(5, 0));
        assert!(rule.free.test(gen.geo.square(5, 0)));
        assert!(rule.free.test(g1));
        assert!(!rule.free.test(e1));
        assert!(!rule.free.test(h1));
        assert!(rule.safe.test(e1));
        assert!(rule.safe.test(gen.geo.square(5, 0)));
        assert!(rule.safe.test(g1));
        assert_eq!(rule.board_side, 0);
    }
}
