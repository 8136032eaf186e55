//! Raw completion text -> display markup.

use once_cell::sync::Lazy;
use regex::Regex;

pub const LINE_BREAK: &str = "<br>";
pub const DECORATIVE_BULLET: &str = "🔹 ";

static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid line break regex"));
static BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)• ").expect("valid bullet regex"));
static NUMBERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s*)(\d+)\. ").expect("valid numbered list regex"));

/// Turns a raw answer into display markup.
///
/// Line breaks (`\r\n`, `\r` or `\n`) become [`LINE_BREAK`], a leading `• ` becomes [`DECORATIVE_BULLET`] and a
/// leading `N. ` becomes `**N.** `. Apply once per raw answer: feeding the output back in
/// is not guaranteed to be a no-op.
pub fn format_answer(raw: &str) -> String {
    LINE_BREAK_RE
        .split(raw)
        .map(format_line)
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}

fn format_line(line: &str) -> String {
    let line = BULLET_RE.replace(line, format!("${{1}}{DECORATIVE_BULLET}").as_str());
    NUMBERED_RE.replace(&line, "${1}**${2}.** ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("a\nb", "a<br>b")]
    #[case("a\r\nb", "a<br>b")]
    #[case("a\rb", "a<br>b")]
    #[case("a\r\rb", "a<br><br>b")]
    #[case("a\n\nb\n", "a<br><br>b<br>")]
    #[case("1. x", "**1.** x")]
    #[case("12. twelve", "**12.** twelve")]
    #[case("• x", "🔹 x")]
    #[case("  • nested", "  🔹 nested")]
    #[case("plain text", "plain text")]
    #[case("", "")]
    fn formats_markers(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(format_answer(raw), expected);
    }

    #[test]
    fn only_leading_markers_are_rewritten() {
        assert_eq!(format_answer("step 1. then • more"), "step 1. then • more");
    }

    #[test]
    fn mixed_list() {
        let raw = "Tips:\n1. Listen\n2. Be honest\n• Stay patient";
        assert_eq!(
            format_answer(raw),
            "Tips:<br>**1.** Listen<br>**2.** Be honest<br>🔹 Stay patient"
        );
    }
}
