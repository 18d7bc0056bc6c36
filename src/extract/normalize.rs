use unicode_normalization::UnicodeNormalization;

const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

/// Compatibility-normalize a detail line, drop zero-width characters, and
/// trim surrounding whitespace plus trailing periods.
pub fn clean_line(raw: &str) -> String {
    let normalized: String = raw.nfkc().filter(|c| !ZERO_WIDTH.contains(c)).collect();
    normalized
        .trim()
        .trim_end_matches(['.', ' '])
        .trim_end()
        .to_string()
}
