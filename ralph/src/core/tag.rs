//! Single-tag extraction from agent output.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::error::{CoreError, CoreResult};
use crate::core::markup::{OpenTag, find_close_tag, find_open_tag};

static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// True if `tag` is usable as a tag name.
pub fn is_valid_tag_name(tag: &str) -> bool {
    TAG_NAME_RE.is_match(tag)
}

/// Return the trimmed content of the first `<tag>...</tag>` block.
///
/// The opening tag may carry whitespace inside the brackets but no attributes;
/// the block ends at the first matching closing tag. `Ok(None)` means no
/// complete block exists, which callers treat as a normal outcome.
pub fn extract_tag<'a>(text: &'a str, tag: &str) -> CoreResult<Option<&'a str>> {
    let tag = tag.trim();
    if !is_valid_tag_name(tag) {
        return Err(CoreError::InvalidTag(tag.to_string()));
    }
    let Some(open) = find_open_tag(text, 0, tag, OpenTag::is_bare) else {
        return Ok(None);
    };
    let Some(close) = find_close_tag(text, open.end, tag) else {
        return Ok(None);
    };
    Ok(Some(text[open.end..close.start].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_block() {
        assert_eq!(extract_tag("x <tag>hello</tag> y", "tag"), Ok(Some("hello")));
    }

    #[test]
    fn preserves_inner_formatting_and_markup() {
        let text = "<ralph_progress>\n  - did <b>a</b>\n  - did b\n\n</ralph_progress>";
        assert_eq!(
            extract_tag(text, "ralph_progress"),
            Ok(Some("- did <b>a</b>\n  - did b"))
        );
    }

    #[test]
    fn matching_is_case_insensitive_and_whitespace_tolerant() {
        let text = "< Summary >done</ SUMMARY >";
        assert_eq!(extract_tag(text, "summary"), Ok(Some("done")));
    }

    #[test]
    fn first_block_wins_and_stops_at_first_close() {
        let text = "<t>one</t><t>two</t>";
        assert_eq!(extract_tag(text, "t"), Ok(Some("one")));
    }

    #[test]
    fn prefixed_names_do_not_match() {
        assert_eq!(extract_tag("<tags>x</tags>", "tag"), Ok(None));
        assert_eq!(extract_tag("<tag-x>x</tag-x>", "tag"), Ok(None));
    }

    #[test]
    fn missing_block_is_none() {
        assert_eq!(extract_tag("no markup here", "tag"), Ok(None));
        assert_eq!(extract_tag("<tag>never closed", "tag"), Ok(None));
        assert_eq!(extract_tag("</tag><tag>", "tag"), Ok(None));
    }

    #[test]
    fn invalid_tag_name_is_an_error() {
        for bad in ["", "1tag", "ta g", "<tag>", "tag!"] {
            assert!(
                matches!(extract_tag("<tag>x</tag>", bad), Err(CoreError::InvalidTag(_))),
                "{bad:?}"
            );
        }
        assert_eq!(extract_tag("<_a-1>ok</_a-1>", " _a-1 "), Ok(Some("ok")));
    }
}
