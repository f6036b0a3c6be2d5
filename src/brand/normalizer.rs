use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// Latin letters with no canonical decomposition into base letter + mark
const NON_DECOMPOSABLE: &[(char, &str)] = &[
    ('ł', "l"),
    ('Ł', "L"),
    ('ø', "o"),
    ('Ø', "O"),
    ('đ', "d"),
    ('Đ', "D"),
    ('ð', "d"),
    ('Ð', "D"),
    ('ħ', "h"),
    ('Ħ', "H"),
    ('ı', "i"),
    ('ŀ', "l"),
    ('Ŀ', "L"),
    ('ß', "ss"),
    ('æ', "ae"),
    ('Æ', "AE"),
    ('œ', "oe"),
    ('Œ', "OE"),
    ('þ', "th"),
    ('Þ', "TH"),
];

/// Map extended-Latin characters to their base ASCII letters, e.g.
/// `Babē` → `Babe`, `eļļas` → `ellas`.
///
/// Characters outside the Latin range that have no decomposition are kept as
/// they are.
pub fn to_basic_ascii(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for c in text.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        match NON_DECOMPOSABLE.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}
