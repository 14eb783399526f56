//! Escaping for user text placed into generated markup.

use std::borrow::Cow;

/// Characters with syntactic meaning in markup positions.
const MARKUP_SPECIAL: [char; 5] = ['\\', '[', ']', '#', '$'];

/// Escape text for a markup position (content blocks, headings).
///
/// Every special character gets a backslash prefix in a single pass, so an
/// inserted backslash is never escaped twice.
pub fn escape_markup(s: &str) -> Cow<'_, str> {
    if !s.contains(MARKUP_SPECIAL) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        if MARKUP_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    Cow::Owned(out)
}

/// Escape text for a string literal position (`"..."`).
pub fn escape_string(s: &str) -> Cow<'_, str> {
    if !s.contains(['\\', '"']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_borrowed() {
        assert!(matches!(escape_markup("Plain title"), Cow::Borrowed(_)));
        assert!(matches!(escape_string("Times New Roman"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_each_special_char_escaped() {
        assert_eq!(escape_markup("\\"), "\\\\");
        assert_eq!(escape_markup("["), "\\[");
        assert_eq!(escape_markup("]"), "\\]");
        assert_eq!(escape_markup("#"), "\\#");
        assert_eq!(escape_markup("$"), "\\$");
    }

    #[test]
    fn test_backslash_not_double_escaped() {
        // `\[` in the input is a literal backslash followed by a bracket.
        assert_eq!(escape_markup("\\[x]"), "\\\\\\[x\\]");
        assert_eq!(escape_markup("a\\#b $5"), "a\\\\\\#b \\$5");
    }

    #[test]
    fn test_no_unescaped_special_remains() {
        let escaped = escape_markup("\\[]#$");
        let mut chars = escaped.chars();
        while let Some(c) = chars.next() {
            assert_eq!(c, '\\', "unescaped special in {escaped}");
            assert!(chars.next().is_some_and(|n| MARKUP_SPECIAL.contains(&n)));
        }
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_string(r"C:\fonts"), r"C:\\fonts");
        assert_eq!(escape_string(r#"\""#), r#"\\\""#);
    }
}
