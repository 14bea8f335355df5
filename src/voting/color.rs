use lazy_static::lazy_static;
use regex::Regex;

pub const FOR_COLOR: &str = "#56B200";
pub const AGAINST_COLOR: &str = "#FF4C42";
pub const ABSTAIN_COLOR: &str = "#FFBC1F";
pub const DEFAULT_COLOR: &str = "#CBD5E1";

/// Palette for labels without a canonical meaning. Order is part of the
/// contract: reordering changes every derived color.
pub const PALETTE: [&str; 20] = [
    "#2563EB", "#9333EA", "#0D9488", "#DB2777", "#EA580C",
    "#4F46E5", "#0891B2", "#65A30D", "#C026D3", "#DC2626",
    "#0284C7", "#7C3AED", "#059669", "#E11D48", "#D97706",
    "#4338CA", "#0E7490", "#16A34A", "#A21CAF", "#B45309",
];

lazy_static! {
    static ref FOR_LABEL: Regex = Regex::new(r"(?i)^(for|yes|yae)").expect("valid label pattern");
    static ref AGAINST_LABEL: Regex = Regex::new(r"(?i)^(against|no|nay)").expect("valid label pattern");
    static ref ABSTAIN_LABEL: Regex = Regex::new(r"(?i)^abstain$").expect("valid label pattern");
}

/// Deterministic color for a choice label.
pub fn color_for_choice(label: Option<&str>) -> &'static str {
    let label = match label {
        Some(l) if !l.is_empty() => l,
        _ => return DEFAULT_COLOR,
    };

    if FOR_LABEL.is_match(label) {
        return FOR_COLOR;
    }
    if AGAINST_LABEL.is_match(label) {
        return AGAINST_COLOR;
    }
    if ABSTAIN_LABEL.is_match(label) {
        return ABSTAIN_COLOR;
    }

    let idx = label_hash(label).unsigned_abs() as usize % PALETTE.len();
    PALETTE[idx]
}

/// Colors for every choice of a proposal, in choice order.
pub fn choice_colors(choices: &[String]) -> Vec<String> {
    choices
        .iter()
        .map(|c| color_for_choice(Some(c)).to_string())
        .collect()
}

// 31-multiplier rolling hash over UTF-16 code units, wrapping at 32 bits.
fn label_hash(label: &str) -> i32 {
    label
        .to_lowercase()
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_labels() {
        assert_eq!(color_for_choice(Some("For")), FOR_COLOR);
        assert_eq!(color_for_choice(Some("Yes")), FOR_COLOR);
        assert_eq!(color_for_choice(Some("YAE")), FOR_COLOR);
        assert_eq!(color_for_choice(Some("For the proposal")), FOR_COLOR);
        assert_eq!(color_for_choice(Some("Against")), AGAINST_COLOR);
        assert_eq!(color_for_choice(Some("nay")), AGAINST_COLOR);
        assert_eq!(color_for_choice(Some("No")), AGAINST_COLOR);
        assert_eq!(color_for_choice(Some("Abstain")), ABSTAIN_COLOR);
        assert_ne!(color_for_choice(Some("Abstain from all")), ABSTAIN_COLOR);
    }

    #[test]
    fn missing_label_is_grey() {
        assert_eq!(color_for_choice(None), DEFAULT_COLOR);
        assert_eq!(color_for_choice(Some("")), DEFAULT_COLOR);
    }

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(label_hash("a"), 97);
        assert_eq!(label_hash("ab"), 97 * 31 + 98);
        // Long labels overflow and wrap like 32-bit two's complement.
        let long = "treasury diversification option";
        let expected = long.encode_utf16().fold(0i64, |h, u| {
            ((h * 31 + i64::from(u)) as i32) as i64
        });
        assert_eq!(i64::from(label_hash(long)), expected);
    }

    #[test]
    fn palette_colors_for_other_labels() {
        let color = color_for_choice(Some("Option B"));
        assert!(PALETTE.contains(&color));
        assert_eq!(color, color_for_choice(Some("OPTION b")));
    }

    proptest! {
        #[test]
        fn color_is_deterministic_and_case_insensitive(label in "[a-zA-Z ]{1,24}") {
            let first = color_for_choice(Some(&label));
            prop_assert_eq!(first, color_for_choice(Some(&label)));
            prop_assert_eq!(first, color_for_choice(Some(&label.to_uppercase())));
        }
    }
}
