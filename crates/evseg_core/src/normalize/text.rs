use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// Marker written by the acquisition step when a filing has no such section.
pub const SECTION_NOT_FOUND: &str = "SECTION NOT FOUND";

// `<word>-<line break><lowercase>`; horizontal whitespace may surround the break. A blank
// line after the hyphen is a paragraph break, not a wrap.
static WRAPPED_HYPHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w)-[ \t]*\r?\n[ \t]*([a-z])").expect("wrapped hyphen pattern")
});

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btable\s+of\s+contents\b|\bpage\s+\d+\b|_{2,}").expect("boilerplate pattern")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

fn repair_hyphenation(text: &str) -> String {
    // A replacement consumes the word character before the hyphen, so chained breaks
    // ("a-\nb-\nc") need another sweep.
    let mut current = text.to_string();
    loop {
        match WRAPPED_HYPHEN.replace_all(&current, "${1}${2}") {
            Cow::Borrowed(_) => return current,
            Cow::Owned(next) => current = next,
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

fn strip_boilerplate(text: &str) -> String {
    // Removing one token can join its neighbours into another ("Table of Page 3 Contents"),
    // so strip until nothing matches. Every replacement shortens the text.
    let mut current = collapse_whitespace(text);
    while BOILERPLATE.is_match(&current) {
        current = collapse_whitespace(&BOILERPLATE.replace_all(&current, " "));
    }
    current
}

/// Normalize raw section text for sentence splitting.
///
/// Contract:
/// - The `SECTION NOT FOUND` sentinel (and empty input) yields an empty string.
/// - Line-wrapped hyphenation is rejoined when the continuation starts lowercase.
/// - `Table of Contents`, `Page <n>` and underscore rules are replaced by a space.
/// - Whitespace runs collapse to a single space; the result is trimmed.
/// - `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw_text: &str) -> String {
    if raw_text.trim() == SECTION_NOT_FOUND {
        return String::new();
    }

    let repaired = repair_hyphenation(raw_text);
    let stripped = strip_boilerplate(&repaired);
    let out = stripped.trim();

    if out == SECTION_NOT_FOUND {
        return String::new();
    }
    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejoins_chained_line_breaks() {
        assert_eq!(normalize("de-\ncar-\nbonization"), "decarbonization");
    }

    #[test]
    fn keeps_hyphen_before_capitalized_continuation() {
        assert_eq!(normalize("North-\nAmerica"), "North- America");
    }

    #[test]
    fn sentinel_with_padding_is_empty() {
        assert_eq!(normalize("  SECTION NOT FOUND\n"), "");
        assert_eq!(normalize("SECTION   NOT\nFOUND"), "");
    }
}
