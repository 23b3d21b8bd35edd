//! Variant assembly: rule flags, terminal scores, the finished [`Variant`]
//! and the builder that wires pieces, zones, castling and derived tables
//! together.

use log::debug;

use crate::bits::BitWord;
use crate::error::VariantError;
use crate::geometry::{Bitboard, Geometry, Side, Square};
use crate::movegen::MoveGen;
use crate::pieces::{MoveFlags, PieceClass, PieceDesc, PieceFlags, PieceId, MAX_PIECE_TYPES};

/// Variant-level rule switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct RuleFlags(pub u32);

impl RuleFlags {
    pub const NONE: RuleFlags = RuleFlags(0);
    /// Captures are mandatory when at least one exists.
    pub const FORCE_CAPTURE: RuleFlags = RuleFlags(0x0000_0001);
    /// Pieces may capture more than one victim per move.
    pub const MULTI_CAPTURE: RuleFlags = RuleFlags(0x0000_0002);
    /// Captured pieces go to the capturer's hand.
    pub const KEEP_CAPTURE: RuleFlags = RuleFlags(0x0000_0004);
    /// Captured pieces return to their owner's hand.
    pub const RETURN_CAPTURE: RuleFlags = RuleFlags(0x0000_0008);
    /// Royals may not face each other along an open file.
    pub const KING_TABOO: RuleFlags = RuleFlags(0x0000_0010);
    /// Royals are confined to a palace (enforced through prisons).
    pub const KING_TRAPPED: RuleFlags = RuleFlags(0x0000_0020);
    /// With several royals, attacking any one of them is check.
    pub const CHECK_ANY_KING: RuleFlags = RuleFlags(0x0000_0040);
    /// With several royals, it is check only if all are attacked.
    pub const KING_DUPLECHECK: RuleFlags = RuleFlags(0x0000_0080);
    pub const ALLOW_DROPS: RuleFlags = RuleFlags(0x0000_0100);
    /// Drops are forced when possible.
    pub const FORCE_DROPS: RuleFlags = RuleFlags(0x0000_0200);
    /// Drops work as Seirawan gates.
    pub const GATE_DROPS: RuleFlags = RuleFlags(0x0000_0400);
    /// Players may take their own pieces in hand.
    pub const ALLOW_PICKUP: RuleFlags = RuleFlags(0x0000_0800);
    /// Promotions may happen in place, without moving.
    pub const PROMOTE_IN_PLACE: RuleFlags = RuleFlags(0x0000_1000);
    /// Pieces may promote as they are dropped.
    pub const PROMOTE_ON_DROP: RuleFlags = RuleFlags(0x0000_2000);
    /// Special-zone moves are only available to unmoved pieces.
    pub const SPECIAL_IS_INIT: RuleFlags = RuleFlags(0x0000_4000);
    /// Capture victims have side effects (no-retaliate and friends).
    pub const VICTIM_SIDEEFFECT: RuleFlags = RuleFlags(0x0000_8000);
    /// The checking sequence before mate needs particular pieces.
    pub const USE_SHAKMATE: RuleFlags = RuleFlags(0x0001_0000);
    /// Shatranj-style baring rule.
    pub const USE_BARERULE: RuleFlags = RuleFlags(0x0002_0000);
    /// Xiangqi-style chase rule.
    pub const USE_CHASERULE: RuleFlags = RuleFlags(0x0004_0000);
    /// Promotion moves must be quiet and the piece left unattacked.
    pub const QUIET_PROMOTION: RuleFlags = RuleFlags(0x0008_0000);
    /// Capturing any flag cell wins.
    pub const CAPTURE_ANY_FLAG: RuleFlags = RuleFlags(0x0010_0000);
    /// Capturing all flag cells wins.
    pub const CAPTURE_ALL_FLAG: RuleFlags = RuleFlags(0x0020_0000);
    /// Sliding royals may not slide through an attacked square.
    pub const NO_MOVE_PAST_CHECK: RuleFlags = RuleFlags(0x0040_0000);
    /// Promote by moving as the target piece.
    pub const PROMOTE_BY_MOVE: RuleFlags = RuleFlags(0x0080_0000);

    /// Captured pieces come back into play one way or another.
    pub const USE_CAPTURE: RuleFlags =
        RuleFlags(Self::KEEP_CAPTURE.0 | Self::RETURN_CAPTURE.0);
    /// The game uses holdings in some way.
    pub const USE_HOLDINGS: RuleFlags = RuleFlags(
        Self::ALLOW_DROPS.0
            | Self::FORCE_DROPS.0
            | Self::GATE_DROPS.0
            | Self::USE_CAPTURE.0
            | Self::ALLOW_PICKUP.0,
    );
    pub const CAPTURE_THE_FLAG: RuleFlags =
        RuleFlags(Self::CAPTURE_ANY_FLAG.0 | Self::CAPTURE_ALL_FLAG.0);

    #[inline]
    #[must_use]
    pub const fn contains(self, other: RuleFlags) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    #[must_use]
    pub const fn intersects(self, other: RuleFlags) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn insert(&mut self, other: RuleFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for RuleFlags {
    type Output = RuleFlags;
    fn bitor(self, rhs: RuleFlags) -> RuleFlags {
        RuleFlags(self.0 | rhs.0)
    }
}

/// Scores attached to terminal states, from the perspective of the side the
/// state favours.
#[derive(Clone, Copy, Debug)]
pub struct TerminalScores {
    pub mate: i32,
    pub stalemate: i32,
    /// Returned on repetition within the irreversible segment.
    pub repetition: i32,
    /// Returned instead of `repetition` when in check throughout.
    pub perpetual: i32,
    pub no_pieces: i32,
    pub bare_king: i32,
    pub flag_capture: i32,
    pub check_limit_score: i32,
    /// Repetitions needed for a claim (game-end detection, not search).
    pub repeat_claim: u32,
    /// Half-move limit for the fifty-move rule; 0 disables it.
    pub fifty_limit: u16,
    /// Checks that win the game; 0 disables the rule.
    pub check_limit: u8,
}

impl Default for TerminalScores {
    fn default() -> Self {
        use crate::search::LEGAL_WIN;
        TerminalScores {
            mate: LEGAL_WIN,
            stalemate: 0,
            repetition: 0,
            perpetual: -LEGAL_WIN,
            no_pieces: -LEGAL_WIN,
            bare_king: LEGAL_WIN,
            flag_capture: LEGAL_WIN,
            check_limit_score: LEGAL_WIN,
            repeat_claim: 3,
            fifty_limit: 100,
            check_limit: 0,
        }
    }
}

/// A fully assembled variant: geometry, tables, pieces and rules.
pub struct Variant<W: BitWord> {
    pub name: String,
    pub movegen: MoveGen<W>,
    pub pieces: Vec<PieceDesc<W>>,
    pub rules: RuleFlags,
    pub scores: TerminalScores,
    pub start_fen: String,
    /// Flag cells per side for capture-the-flag victory.
    pub flag_cells: [Bitboard<W>; 2],
    /// Named zones, kept for interface introspection.
    pub zones: Vec<(String, Bitboard<W>)>,
    /// Reference placement of the start position (for unmoved-piece marks).
    pub start_placement: Vec<(Square, PieceId, Side)>,
    /// Piece ids sorted by ascending nominal value.
    pub value_order: Vec<PieceId>,
    pub royal_pieces: Vec<PieceId>,
    /// Per piece, per side: squares where the piece could never move again.
    pub dead_zone: Vec<[Bitboard<W>; 2]>,
    /// Derived piece-square tables, `[piece][side][square] -> (mg, eg)`.
    pub pst: Vec<[Vec<(i16, i16)>; 2]>,
    /// Can the pair (p, q), with king support, beat a bare king?
    pub pieces_can_win: [[bool; MAX_PIECE_TYPES]; MAX_PIECE_TYPES],
    /// Total phase weight of the starting material.
    pub game_phase_max: i32,
    /// Half-moves of opening randomness and its amplitude in centipawns.
    pub random_ply_count: u32,
    pub random_amplitude: i32,
}

impl<W: BitWord> Variant<W> {
    #[inline]
    #[must_use]
    pub fn geo(&self) -> &Geometry<W> {
        &self.movegen.geo
    }

    #[inline]
    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    /// Iterate the piece ids of a promotion-choice bit mask.
    pub fn choice_pieces(&self, choice: u32) -> impl Iterator<Item = PieceId> + '_ {
        (0..self.pieces.len())
            .filter(move |p| choice & (1 << p) != 0)
            .map(|p| PieceId(p as u8))
    }

    /// Find a piece by either side's abbreviation.
    #[must_use]
    pub fn piece_by_abbrev(&self, symbol: &str) -> Option<(PieceId, Side)> {
        for (i, desc) in self.pieces.iter().enumerate() {
            if desc.abbrev[0] == symbol {
                return Some((PieceId(i as u8), Side::White));
            }
            if desc.abbrev[1] == symbol {
                return Some((PieceId(i as u8), Side::Black));
            }
        }
        None
    }

    /// Find a piece by its SAN notation letter.
    #[must_use]
    pub fn piece_by_notation(&self, letter: char) -> Option<PieceId> {
        self.pieces
            .iter()
            .position(|d| d.notation == letter)
            .map(|i| PieceId(i as u8))
    }
}

/// Builder for [`Variant`]; compile atoms through [`VariantBuilder::movegen`],
/// then declare pieces, zones and rules, then `finalize`.
pub struct VariantBuilder<W: BitWord> {
    pub name: String,
    movegen: MoveGen<W>,
    pieces: Vec<PieceDesc<W>>,
    rules: RuleFlags,
    scores: TerminalScores,
    start_fen: Option<String>,
    flag_cells: [Bitboard<W>; 2],
    zones: Vec<(String, Bitboard<W>)>,
    random_ply_count: u32,
    random_amplitude: i32,
}

impl<W: BitWord> VariantBuilder<W> {
    pub fn new(name: &str, files: usize, ranks: usize) -> Result<Self, VariantError> {
        let geo = Geometry::new(files, ranks)?;
        Ok(VariantBuilder {
            name: name.to_string(),
            movegen: MoveGen::new(geo),
            pieces: Vec::new(),
            rules: RuleFlags::NONE,
            scores: TerminalScores::default(),
            start_fen: None,
            flag_cells: [Bitboard::EMPTY; 2],
            zones: Vec::new(),
            random_ply_count: 0,
            random_amplitude: 0,
        })
    }

    /// Access the generator to compile move atoms and castle rules.
    pub fn movegen(&mut self) -> &mut MoveGen<W> {
        &mut self.movegen
    }

    #[must_use]
    pub fn geo(&self) -> &Geometry<W> {
        &self.movegen.geo
    }

    pub fn exclude_cells(&mut self, cells: &[Square]) {
        self.movegen.geo.exclude_cells(cells);
        // Slider tables depend only on shape, not exclusions; the `all` mask
        // filters excluded destinations at generation time.
    }

    pub fn add_piece(&mut self, desc: PieceDesc<W>) -> Result<PieceId, VariantError> {
        if self.pieces.len() >= MAX_PIECE_TYPES {
            return Err(VariantError::TooManyPieceTypes {
                count: self.pieces.len() + 1,
            });
        }
        let id = PieceId(self.pieces.len() as u8);
        let mut desc = desc;
        desc.demotion = id;
        if desc.flags.contains(PieceFlags::ROYAL) {
            desc.max_count = [1, 1];
        }
        self.pieces.push(desc);
        Ok(id)
    }

    /// Adjust a declared piece (zones, flags, promotion rows).
    pub fn piece_mut(&mut self, id: PieceId) -> &mut PieceDesc<W> {
        &mut self.pieces[id.index()]
    }

    /// Attach a special-zone move to the piece with the given symbol.
    pub fn add_special_move(
        &mut self,
        symbol: &str,
        zone: [Bitboard<W>; 2],
        flags: MoveFlags,
    ) -> Result<(), VariantError> {
        let id = self
            .find_piece(symbol)
            .ok_or_else(|| VariantError::UnknownPiece {
                symbol: symbol.to_string(),
            })?;
        let desc = &mut self.pieces[id.index()];
        desc.special_zone = zone;
        desc.special_flags = flags;
        Ok(())
    }

    /// Attach an initial-move description to the piece with the given symbol.
    pub fn add_initial_move(&mut self, symbol: &str, flags: MoveFlags) -> Result<(), VariantError> {
        let id = self
            .find_piece(symbol)
            .ok_or_else(|| VariantError::UnknownPiece {
                symbol: symbol.to_string(),
            })?;
        self.pieces[id.index()].initial_flags = flags;
        Ok(())
    }

    pub fn set_rules(&mut self, rules: RuleFlags) {
        self.rules = rules;
    }

    pub fn add_rules(&mut self, rules: RuleFlags) {
        self.rules.insert(rules);
    }

    pub fn set_scores(&mut self, scores: TerminalScores) {
        self.scores = scores;
    }

    pub fn scores_mut(&mut self) -> &mut TerminalScores {
        &mut self.scores
    }

    pub fn set_start_fen(&mut self, fen: &str) {
        self.start_fen = Some(fen.to_string());
    }

    pub fn set_flag_cells(&mut self, side: Side, cells: Bitboard<W>) {
        self.flag_cells[side.index()] = cells;
    }

    pub fn add_zone(&mut self, name: &str, cells: Bitboard<W>) {
        self.zones.push((name.to_string(), cells));
    }

    pub fn set_opening_randomness(&mut self, plies: u32, amplitude: i32) {
        self.random_ply_count = plies;
        self.random_amplitude = amplitude;
    }

    fn find_piece(&self, symbol: &str) -> Option<PieceId> {
        self.pieces
            .iter()
            .position(|d| d.abbrev[0] == symbol || d.abbrev[1] == symbol)
            .map(|i| PieceId(i as u8))
    }

    /// Resolve cross-references, derive every table, and produce the variant.
    pub fn finalize(mut self) -> Result<Variant<W>, VariantError> {
        let start_fen = self
            .start_fen
            .take()
            .ok_or(VariantError::MissingStartPosition)?;

        self.resolve_promotions()?;
        self.resolve_victims()?;
        self.default_zones();
        self.derive_classes();

        let mut value_order: Vec<PieceId> =
            (0..self.pieces.len()).map(|p| PieceId(p as u8)).collect();
        value_order.sort_by_key(|p| self.pieces[p.index()].value.0);

        let royal_pieces: Vec<PieceId> = (0..self.pieces.len())
            .filter(|&p| self.pieces[p].is_royal())
            .map(|p| PieceId(p as u8))
            .collect();

        let dead_zone = self.derive_dead_zones();

        self.movegen.finalize_super(&self.pieces);

        let start_placement =
            crate::fen::start_placement_of(&self.movegen.geo, &self.pieces, &start_fen);

        let mut variant = Variant {
            name: self.name,
            movegen: self.movegen,
            pieces: self.pieces,
            rules: self.rules,
            scores: self.scores,
            start_fen,
            start_placement,
            flag_cells: self.flag_cells,
            zones: self.zones,
            value_order,
            royal_pieces,
            dead_zone,
            pst: Vec::new(),
            pieces_can_win: [[false; MAX_PIECE_TYPES]; MAX_PIECE_TYPES],
            game_phase_max: 0,
            random_ply_count: self.random_ply_count,
            random_amplitude: self.random_amplitude,
        };

        crate::eval::finalize_variant(&mut variant);
        debug!(
            "variant '{}' finalized: {} piece types, phase max {}",
            variant.name,
            variant.pieces.len(),
            variant.game_phase_max
        );
        Ok(variant)
    }

    /// Turn promotion target strings into choice bit masks and wire up
    /// demotions.
    fn resolve_promotions(&mut self) -> Result<(), VariantError> {
        let abbrevs: Vec<[String; 2]> = self.pieces.iter().map(|d| d.abbrev.clone()).collect();

        let lookup = |symbol: &str| -> Option<usize> {
            abbrevs
                .iter()
                .position(|a| a[0] == symbol || a[1] == symbol)
        };

        let mut demotions: Vec<(usize, usize)> = Vec::new();

        for (n, desc) in self.pieces.iter_mut().enumerate() {
            let mut union = 0u32;
            for row in &mut desc.promotion {
                let mut choice = 0u32;
                let mut rest = row.targets.as_str();
                while !rest.is_empty() {
                    // Two-character abbreviations ('+P') bind first
                    let (symbol, tail) = if rest.len() >= 2 && lookup(&rest[..2]).is_some() {
                        (&rest[..2], &rest[2..])
                    } else {
                        (&rest[..1], &rest[1..])
                    };
                    let target = lookup(symbol).ok_or_else(|| VariantError::UnknownPiece {
                        symbol: symbol.to_string(),
                    })?;
                    choice |= 1 << target;
                    // A '+'-prefixed target demotes back to its base piece
                    if symbol.starts_with('+') {
                        demotions.push((target, n));
                    }
                    rest = tail;
                }
                row.choice = choice;
                union |= choice;
            }
            desc.promotion_choice = union;

            // Promotion zone is the union of row zones
            for side in 0..2 {
                let mut zone = Bitboard::EMPTY;
                for row in &desc.promotion {
                    zone |= row.zone[side];
                }
                desc.promotion_zone[side] = zone;
            }
        }

        for (promoted, base) in demotions {
            self.pieces[promoted].demotion = PieceId(base as u8);
        }

        // Explicit demotion symbols override the convention
        for n in 0..self.pieces.len() {
            if let Some(symbol) = self.pieces[n].demotion_symbol.clone() {
                let target = lookup(&symbol).ok_or(VariantError::UnknownPiece { symbol })?;
                self.pieces[n].demotion = PieceId(target as u8);
            }
        }
        Ok(())
    }

    fn resolve_victims(&mut self) -> Result<(), VariantError> {
        let abbrevs: Vec<[String; 2]> = self.pieces.iter().map(|d| d.abbrev.clone()).collect();
        for desc in &mut self.pieces {
            let Some(symbols) = desc.victim_symbols.clone() else {
                continue;
            };
            let mut mask = 0u32;
            for symbol in symbols.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let target = abbrevs
                    .iter()
                    .position(|a| a[0] == symbol || a[1] == symbol)
                    .ok_or_else(|| VariantError::UnknownPiece {
                        symbol: symbol.to_string(),
                    })?;
                mask |= 1 << target;
            }
            desc.allowed_victims = mask;
        }
        Ok(())
    }

    /// Empty prisons and drop zones mean "everywhere".
    fn default_zones(&mut self) {
        let all = self.movegen.geo.all;
        for desc in &mut self.pieces {
            for side in 0..2 {
                if desc.prison[side].is_empty() {
                    desc.prison[side] = all;
                }
                if desc.drop_zone[side].is_empty() {
                    desc.drop_zone[side] = all;
                }
            }
        }
    }

    /// Class, phase and safety weights follow the nominal value.
    fn derive_classes(&mut self) {
        let geo_cells = self.movegen.geo.all.popcount() as i32;
        for n in 0..self.pieces.len() {
            let value = self.pieces[n].value.0;
            let desc = &self.pieces[n];
            let class = if desc.flags.contains(PieceFlags::ROYAL) {
                PieceClass::Royal
            } else if value < 200 {
                PieceClass::Pawn
            } else if value < 400 {
                PieceClass::Minor
            } else if value < 750 {
                PieceClass::Major
            } else {
                PieceClass::Super
            };
            let (phase, safety, mobility) = match class {
                PieceClass::Pawn | PieceClass::Royal => (0, 0, 1),
                PieceClass::Minor => (1, 2, 4),
                PieceClass::Major => (2, 3, 2),
                PieceClass::Super => (4, 5, 1),
            };

            // Expected mobility: reach from a central cell on an open board
            let geo = &self.movegen.geo;
            let centre = geo.square(geo.files / 2, geo.ranks / 2);
            let reach = self
                .movegen
                .moves_for_flags(
                    self.pieces[n].move_flags,
                    Side::White,
                    centre,
                    Bitboard::EMPTY,
                )
                .popcount() as i32;

            let desc = &mut self.pieces[n];
            desc.class = class;
            desc.phase_weight = phase;
            desc.king_safety_weight = safety;
            desc.mobility_weight = mobility;
            desc.expected_mobility = (reach / 2).min(geo_cells / 4).max(1);
        }
    }

    /// Squares a piece could never leave again; drops there are forbidden
    /// unless the piece is explicitly droppable-dead.
    pub(crate) fn derive_dead_zones(&self) -> Vec<[Bitboard<W>; 2]> {
        let geo = &self.movegen.geo;
        let mut zones = Vec::with_capacity(self.pieces.len());
        for desc in &self.pieces {
            let mut per_side = [Bitboard::EMPTY; 2];
            for side in [Side::White, Side::Black] {
                let mut dead = Bitboard::EMPTY;
                for sq in geo.all.iter() {
                    let moves = self.movegen.moves_for_flags(
                        desc.move_flags,
                        side,
                        sq,
                        Bitboard::EMPTY,
                    ) | self.movegen.moves_for_flags(
                        desc.capture_flags,
                        side,
                        sq,
                        Bitboard::EMPTY,
                    );
                    if (moves & desc.prison[side.index()]).is_empty() {
                        dead.set(sq);
                    }
                }
                per_side[side.index()] = dead;
            }
            zones.push(per_side);
        }
        zones
    }
}
