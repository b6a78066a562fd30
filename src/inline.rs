//! Inline span scanning for a single line of text.
//!
//! The scanner never fails: anything it cannot pair up is emitted as plain
//! text. Stray emphasis markers are removed up front by [`normalize`] so an
//! unbalanced `**` cannot swallow the rest of the line.

use std::borrow::Cow;

use crate::block::InlineRun;

const BOLD: &str = "**";
const STAR: char = '*';
const TICK: char = '`';

/// Clean up emphasis markers before scanning.
///
/// Bold markers swallow one space on their inner side, then any marker kind
/// with an odd count on the line is dropped entirely.
pub fn normalize(line: &str) -> Cow<'_, str> {
    if !line.contains(STAR) {
        return Cow::Borrowed(line);
    }

    let mut text = collapse_bold_spacing(line);

    if text.matches(BOLD).count() % 2 != 0 {
        log::debug!("unbalanced bold markers, rendering as plain text: {line:?}");
        text = text.replace(BOLD, "");
    }

    if text.matches(STAR).count() % 2 != 0 {
        log::debug!("unbalanced italic markers, rendering as plain text: {line:?}");
        text = text.replace(STAR, "");
    }

    Cow::Owned(text)
}

/// `** bold **` becomes `**bold**`. Markers alternate opener/closer from
/// the left, so the space outside a pair is left alone.
fn collapse_bold_spacing(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    let mut opener = true;

    while let Some(pos) = rest.find(BOLD) {
        let before = &rest[..pos];
        if opener {
            out.push_str(before);
        } else {
            out.push_str(before.strip_suffix(' ').unwrap_or(before));
        }
        out.push_str(BOLD);

        rest = &rest[pos + BOLD.len()..];
        if opener {
            rest = rest.strip_prefix(' ').unwrap_or(rest);
        }
        opener = !opener;
    }

    out.push_str(rest);
    out
}

/// Split one line into styled runs.
pub fn scan(line: &str) -> Vec<InlineRun> {
    let text = normalize(line);
    let mut runs = Vec::new();
    let mut plain = String::new();
    let mut rest: &str = &text;

    while let Some(ch) = rest.chars().next() {
        if let Some((run, consumed)) = span_at(rest) {
            if !plain.is_empty() {
                runs.push(InlineRun::Plain(std::mem::take(&mut plain)));
            }
            // `****` and friends: markers consumed, nothing to show
            if !run.text().is_empty() {
                runs.push(run);
            }
            rest = &rest[consumed..];
            continue;
        }

        plain.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    if !plain.is_empty() {
        runs.push(InlineRun::Plain(plain));
    }

    runs
}

/// Try each span kind at the cursor, in priority order. Returns the run and
/// the number of bytes it covers, delimiters included.
fn span_at(rest: &str) -> Option<(InlineRun, usize)> {
    bold(rest)
        .or_else(|| italic(rest))
        .or_else(|| code(rest))
        .or_else(|| link(rest))
}

fn bold(rest: &str) -> Option<(InlineRun, usize)> {
    let inner = rest.strip_prefix(BOLD)?;
    let end = inner.find(BOLD)?;
    Some((
        InlineRun::Bold(inner[..end].to_string()),
        end + 2 * BOLD.len(),
    ))
}

fn italic(rest: &str) -> Option<(InlineRun, usize)> {
    let inner = rest.strip_prefix(STAR)?;
    if inner.starts_with(STAR) {
        return None;
    }
    let end = inner.find(STAR)?;
    Some((InlineRun::Italic(inner[..end].to_string()), end + 2))
}

fn code(rest: &str) -> Option<(InlineRun, usize)> {
    let inner = rest.strip_prefix(TICK)?;
    let end = inner.find(TICK)?;
    Some((InlineRun::Code(inner[..end].to_string()), end + 2))
}

/// `[label](url)`: the first `]` must be followed directly by `(`.
fn link(rest: &str) -> Option<(InlineRun, usize)> {
    let inner = rest.strip_prefix('[')?;
    let close = inner.find(']')?;
    let target = inner[close + 1..].strip_prefix('(')?;
    let end = target.find(')')?;

    let run = InlineRun::Link {
        label: inner[..close].to_string(),
        url: target[..end].to_string(),
    };
    // '[' + label + "](" + url + ')'
    Some((run, 1 + close + 2 + end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn plain(s: &str) -> InlineRun {
        InlineRun::Plain(s.to_string())
    }

    fn visible(runs: &[InlineRun]) -> String {
        runs.iter().map(InlineRun::text).collect()
    }

    #[test]
    fn empty_line_has_no_runs() {
        assert!(scan("").is_empty());
    }

    #[test]
    fn plain_text_is_one_run() {
        let line = "Nothing special here: 3 < 4, a_b, #tag.";
        assert_eq!(scan(line), vec![plain(line)]);
    }

    #[test]
    fn bold_and_italic_sentence() {
        assert_eq!(
            scan("Some **bold** and *italic* text."),
            vec![
                plain("Some "),
                InlineRun::Bold("bold".into()),
                plain(" and "),
                InlineRun::Italic("italic".into()),
                plain(" text."),
            ]
        );
    }

    #[test]
    fn whole_line_code_span() {
        assert_eq!(scan("`let x = 1;`"), vec![InlineRun::Code("let x = 1;".into())]);
    }

    #[test]
    fn stars_inside_code_are_literal() {
        assert_eq!(
            scan("call `a*b*c` now"),
            vec![plain("call "), InlineRun::Code("a*b*c".into()), plain(" now")]
        );
    }

    #[test]
    fn emphasis_before_backtick_wins() {
        assert_eq!(
            scan("*x `y* z`"),
            vec![InlineRun::Italic("x `y".into()), plain(" z`")]
        );
    }

    #[test]
    fn link_keeps_label_and_url() {
        assert_eq!(
            scan("see [the docs](https://docs.rs) first"),
            vec![
                plain("see "),
                InlineRun::Link {
                    label: "the docs".into(),
                    url: "https://docs.rs".into(),
                },
                plain(" first"),
            ]
        );
    }

    #[rstest]
    #[case::no_paren("[label] (url)")]
    #[case::unclosed_bracket("[label(url)")]
    #[case::unclosed_paren("[label](url")]
    #[case::lone_tick("it`s")]
    fn incomplete_spans_stay_plain(#[case] line: &str) {
        assert_eq!(scan(line), vec![plain(line)]);
    }

    #[test]
    fn odd_bold_markers_are_stripped() {
        let runs = scan("a **b** c **d");
        assert!(runs.iter().all(|r| !matches!(r, InlineRun::Bold(_))));
        assert_eq!(visible(&runs), "a b c d");
    }

    #[test]
    fn odd_single_star_is_stripped() {
        assert_eq!(scan("5 * 3 = 15"), vec![plain("5  3 = 15")]);
    }

    #[rstest]
    #[case("** bold **", "**bold**")]
    #[case("a ** b ** c", "a **b** c")]
    #[case("x **y** z", "x **y** z")]
    #[case("no stars", "no stars")]
    fn bold_spacing_collapses_inside_pairs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn spaced_bold_pairs_up() {
        assert_eq!(
            scan("a ** b ** c"),
            vec![plain("a "), InlineRun::Bold("b".into()), plain(" c")]
        );
    }

    #[test]
    fn empty_spans_emit_nothing() {
        assert_eq!(scan("a****b"), vec![plain("a"), plain("b")]);
        assert_eq!(scan("``"), vec![]);
    }

    #[test]
    fn multibyte_text_survives() {
        assert_eq!(
            scan("héllo **wörld** ✓"),
            vec![plain("héllo "), InlineRun::Bold("wörld".into()), plain(" ✓")]
        );
    }

    #[test]
    fn only_delimiters_are_dropped() {
        let line = "mix of `code`, **bold**, *it* and [l](u) plus \u{7} bell";
        let runs = scan(line);
        assert_eq!(visible(&runs), "mix of code, bold, it and l plus \u{7} bell");
    }
}
