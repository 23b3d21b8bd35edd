//! Pretty-printing of compiled movement words in Betza notation.
//!
//! The printer reads the generator's tables back rather than keeping the
//! original descriptions around, so whatever was compiled is what gets
//! described. Unknown leaps fall back to the `(n,m)` spelling.

use crate::bits::BitWord;
use crate::geometry::{Dir, Side};
use crate::pieces::{MoveFlags, PieceDesc};
use crate::variant::Variant;

/// Betza atom letter for a (n, m) leap, if one exists.
fn leap_letter(n: u8, m: u8) -> Option<char> {
    match (n.min(m), n.max(m)) {
        (0, 1) => Some('W'),
        (1, 1) => Some('F'),
        (0, 2) => Some('D'),
        (1, 2) => Some('N'),
        (2, 2) => Some('A'),
        (0, 3) => Some('H'),
        (1, 3) => Some('C'),
        (2, 3) => Some('Z'),
        (3, 3) => Some('G'),
        _ => None,
    }
}

/// Canonicalize deltas into unordered (n, m) leap classes.
fn leap_classes(offsets: &[(i8, i8)]) -> Vec<(u8, u8)> {
    let mut classes: Vec<(u8, u8)> = Vec::new();
    for &(df, dr) in offsets {
        let a = df.unsigned_abs();
        let b = dr.unsigned_abs();
        let class = (a.min(b), a.max(b));
        if !classes.contains(&class) {
            classes.push(class);
        }
    }
    classes.sort_unstable();
    classes
}

fn describe_leaper<W: BitWord>(gen: &crate::movegen::MoveGen<W>, flags: MoveFlags) -> String {
    let offsets = gen.leaper_offsets(flags, Side::White);
    let mut out = String::new();

    if flags.is_lame_leaper() {
        // A lame leaper prints as its masked leap with the non-jumping
        // modifier, the Xiangqi horse being the archetype
        let mask = MoveFlags(
            MoveFlags::IS_LEAPER | ((flags.leaper_mask_index() as u32) << MoveFlags::LEAPER_SHIFT),
        );
        for (n, m) in leap_classes(&gen.leaper_offsets(mask, Side::White)) {
            out.push('n');
            match leap_letter(n, m) {
                Some(c) => out.push(c),
                None => out.push_str(&format!("({n},{m})")),
            }
        }
        return out;
    }

    for (n, m) in leap_classes(&offsets) {
        match leap_letter(n, m) {
            Some(c) => out.push(c),
            None => out.push_str(&format!("({n},{m})")),
        }
    }
    if flags.is_double_leaper() {
        out.push('a'); // again-modifier for the second leg
    }
    out
}

fn describe_slider(dirs: u32) -> String {
    let orth = dirs & (MoveFlags::SLIDER_H | MoveFlags::SLIDER_V);
    let diag = dirs & (MoveFlags::SLIDER_D | MoveFlags::SLIDER_A);
    match (
        orth == (MoveFlags::SLIDER_H | MoveFlags::SLIDER_V),
        diag == (MoveFlags::SLIDER_D | MoveFlags::SLIDER_A),
    ) {
        (true, true) => "Q".to_string(),
        (true, false) if diag == 0 => "R".to_string(),
        (false, true) if orth == 0 => "B".to_string(),
        _ => {
            // Partial direction sets spell out their rays
            let mut out = String::new();
            if dirs & MoveFlags::SLIDER_H != 0 {
                out.push_str("sR");
            }
            if dirs & MoveFlags::SLIDER_V != 0 {
                out.push_str("vR");
            }
            if diag != 0 {
                out.push_str("B'");
            }
            out
        }
    }
}

fn describe_stepper<W: BitWord>(gen: &crate::movegen::MoveGen<W>, flags: MoveFlags) -> String {
    let counts = gen.stepper_counts(flags, Side::White);
    let mut out = String::new();
    let letters = ["f", "fr", "r", "br", "b", "bl", "l", "fl"];
    for dir in Dir::ALL {
        let c = counts[dir as usize];
        if c == 0 {
            continue;
        }
        out.push_str(letters[dir as usize]);
        if c == 1 {
            out.push('W');
        } else if c >= 15 {
            out.push('R');
        } else {
            out.push_str(&format!("W{c}"));
        }
    }
    out
}

/// Describe one movement word.
pub fn describe_flags<W: BitWord>(variant: &Variant<W>, flags: MoveFlags) -> String {
    let gen = &variant.movegen;
    let mut out = String::new();
    if flags.is_leaper() {
        out.push_str(&describe_leaper(gen, flags));
    }
    if flags.is_slider() {
        out.push_str(&describe_slider(flags.slider_dirs()));
    }
    if flags.is_hopper() {
        out.push('p');
        out.push_str(&describe_slider(flags.hopper_dirs()));
    }
    if flags.is_rider() {
        // A rider is its leap repeated; doubled letter in Betza style
        out.push_str("(rider)");
    }
    if flags.is_stepper() {
        out.push_str(&describe_stepper(gen, flags));
    }
    out
}

/// Describe a piece: shared atoms plain, move-only with `m`, capture-only
/// with `c`.
pub fn describe_piece<W: BitWord>(variant: &Variant<W>, desc: &PieceDesc<W>) -> String {
    if desc.move_flags == desc.capture_flags {
        return describe_flags(variant, desc.move_flags);
    }
    let mut out = String::new();
    if !desc.move_flags.is_empty() {
        out.push('m');
        out.push_str(&describe_flags(variant, desc.move_flags));
    }
    if !desc.capture_flags.is_empty() {
        out.push('c');
        out.push_str(&describe_flags(variant, desc.capture_flags));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variants;

    #[test]
    fn test_orthodox_piece_descriptions() {
        let variant = variants::chess::<u64>().expect("chess");
        let by_notation = |letter: char| {
            let id = variant.piece_by_notation(letter).expect("piece");
            describe_piece(&variant, &variant.pieces[id.index()])
        };
        assert_eq!(by_notation('N'), "N");
        assert_eq!(by_notation('R'), "R");
        assert_eq!(by_notation('B'), "B");
        assert_eq!(by_notation('Q'), "Q");
        assert_eq!(by_notation('K'), "WF");
    }

    #[test]
    fn test_cannon_description_marks_hop() {
        let variant = variants::xiangqi::<u128>().expect("xiangqi");
        let id = variant.piece_by_notation('C').expect("cannon");
        let text = describe_piece(&variant, &variant.pieces[id.index()]);
        assert!(text.starts_with('m'), "cannon moves and captures differ: {text}");
        assert!(text.contains("pR"), "capture should be a hopping rook: {text}");
    }

    #[test]
    fn test_horse_is_lame() {
        let variant = variants::xiangqi::<u128>().expect("xiangqi");
        let id = variant.piece_by_notation('H').expect("horse");
        let text = describe_piece(&variant, &variant.pieces[id.index()]);
        assert!(text.contains("nN"), "horse is a non-jumping knight: {text}");
    }
}
