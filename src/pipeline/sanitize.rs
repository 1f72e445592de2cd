//! Sanitisation: pull the `<svg>…</svg>` document out of a model response.
//!
//! Even when told to return bare SVG, vision models wrap it in fences, add a
//! sentence of commentary, or run out of tokens before the closing tag. The
//! rules here are deterministic string passes, applied in order:
//!
//! 1. Normalise line endings (CRLF → LF)
//! 2. Strip the BOM and zero-width spaces; joiners and soft hyphens are
//!    text content and stay
//! 3. Remove code-fence markers (```` ```xml ````, ```` ```svg ````, ```` ``` ````)
//! 4. Trim surrounding whitespace
//! 5. Extract the first bounded `<svg …>…</svg>` element
//!
//! When rule 5 finds no closing tag the cleaned text is returned as-is,
//! since a truncated SVG is often still renderable. Only an empty result is
//! rejected.

use once_cell::sync::Lazy;
use regex::Regex;

/// Why no markup could be extracted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("response is empty after cleaning")]
    Empty,
}

/// Clean a raw response and return the canonical SVG markup.
pub fn sanitize_svg(raw: &str) -> Result<String, SanitizeError> {
    let s = normalise_line_endings(raw);
    let s = remove_invisible_chars(&s);
    let s = strip_fences(&s);
    let cleaned = s.trim();

    if cleaned.is_empty() {
        return Err(SanitizeError::Empty);
    }

    Ok(extract_svg(cleaned)
        .map(str::to_string)
        .unwrap_or_else(|| cleaned.to_string()))
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}'], "")
}

// ── Rule 3: Strip code-fence markers ─────────────────────────────────────────

static RE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:xml|svg|html)?").unwrap());

fn strip_fences(input: &str) -> String {
    RE_FENCE.replace_all(input, "").into_owned()
}

// ── Rule 5: Extract the bounded <svg> element ────────────────────────────────

static RE_SVG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<svg\b.*?</svg>").unwrap());

fn extract_svg(input: &str) -> Option<&str> {
    RE_SVG.find(input).map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect width="10" height="10"/></svg>"#;

    #[test]
    fn bare_svg_passes_through() {
        assert_eq!(sanitize_svg(SVG).unwrap(), SVG);
    }

    #[test]
    fn strips_xml_fence() {
        let raw = format!("```xml\n{SVG}\n```");
        assert_eq!(sanitize_svg(&raw).unwrap(), SVG);
    }

    #[test]
    fn strips_svg_fence_and_commentary() {
        let raw = format!("Here is the SVG you asked for:\n```svg\n{SVG}\n```\nLet me know!");
        assert_eq!(sanitize_svg(&raw).unwrap(), SVG);
    }

    #[test]
    fn first_svg_wins() {
        let raw = format!("{SVG}\n<svg><circle/></svg>");
        assert_eq!(sanitize_svg(&raw).unwrap(), SVG);
    }

    #[test]
    fn nested_svg_is_not_confused_with_svg_prefix_tags() {
        let raw = "<svgfoo/> <svg><g/></svg>";
        assert_eq!(sanitize_svg(raw).unwrap(), "<svg><g/></svg>");
    }

    #[test]
    fn missing_close_tag_falls_back_to_cleaned_text() {
        let raw = "```xml\n<svg viewBox=\"0 0 5 5\"><rect width=\"5\"\n```";
        assert_eq!(
            sanitize_svg(raw).unwrap(),
            "<svg viewBox=\"0 0 5 5\"><rect width=\"5\""
        );
    }

    #[test]
    fn empty_after_cleaning_is_error() {
        assert_eq!(sanitize_svg("```xml\n\n```"), Err(SanitizeError::Empty));
        assert_eq!(sanitize_svg("   \u{200B}  "), Err(SanitizeError::Empty));
    }

    #[test]
    fn crlf_and_invisible_chars_are_removed() {
        let raw = "\u{FEFF}<svg>\r\n<text>a\u{200B}b</text>\r\n</svg>";
        assert_eq!(sanitize_svg(raw).unwrap(), "<svg>\n<text>ab</text>\n</svg>");
    }

    #[test]
    fn joiners_and_soft_hyphens_in_text_survive() {
        let raw = "<svg><text>\u{1F469}\u{200D}\u{1F4BB} co\u{00AD}operate \u{0645}\u{200C}\u{0627}</text></svg>";
        assert_eq!(sanitize_svg(raw).unwrap(), raw);
    }
}
