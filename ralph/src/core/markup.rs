//! Hand-written scanner for the tag grammar agents emit.
//!
//! Tag names are matched ASCII-case-insensitively, whitespace is allowed
//! between the angle brackets and the name, and every search is a single
//! forward pass over the bytes. An opening tag runs to the first `>`; a `<`
//! before that `>` ends the candidate, so no byte is examined by more than one
//! tag and scanning stays linear in the input size. All delimiters are ASCII,
//! so every offset returned here is a valid `str` slice boundary.

/// An opening (or self-closing) tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenTag<'a> {
    /// Byte offset of `<`.
    pub start: usize,
    /// Byte offset just past `>`.
    pub end: usize,
    /// Raw text between the tag name and `>`, including any trailing `/`.
    pub attrs: &'a str,
}

impl<'a> OpenTag<'a> {
    /// True when the tag ends with `/>` (whitespace allowed before `>`).
    pub fn is_self_closing(&self) -> bool {
        trim_ascii_end(self.attrs).ends_with('/')
    }

    /// Attribute text without the self-closing slash.
    pub fn attr_text(&self) -> &'a str {
        let trimmed = trim_ascii_end(self.attrs);
        trimmed.strip_suffix('/').unwrap_or(self.attrs)
    }

    /// True when nothing but whitespace follows the tag name.
    pub fn is_bare(&self) -> bool {
        is_blank(self.attrs)
    }
}

/// Byte range of a closing tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseTag {
    pub start: usize,
    pub end: usize,
}

/// Find the first opening tag named `name` at or after `from` that `accept`
/// approves of.
pub fn find_open_tag<'a>(
    text: &'a str,
    from: usize,
    name: &str,
    accept: impl Fn(&OpenTag<'a>) -> bool,
) -> Option<OpenTag<'a>> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(lt) = next_lt(bytes, pos) {
        if let Some(tag) = open_tag_at(text, lt, name) {
            if accept(&tag) {
                return Some(tag);
            }
        }
        pos = lt + 1;
    }
    None
}

/// Find the first `</name>` at or after `from`.
pub fn find_close_tag(text: &str, from: usize, name: &str) -> Option<CloseTag> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(lt) = next_lt(bytes, pos) {
        if let Some(end) = close_tag_at(bytes, lt, name) {
            return Some(CloseTag { start: lt, end });
        }
        pos = lt + 1;
    }
    None
}

/// Value of the first attribute called `name` (case-insensitive) that carries
/// a non-empty quoted value. `id="" id="US-1"` yields `US-1`.
pub fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    Attributes::new(attrs)
        .filter(|attr| attr.name.eq_ignore_ascii_case(name))
        .filter_map(|attr| attr.value)
        .find(|value| !value.is_empty())
}

/// One `name="value"` pair. `value` is `None` for bare or unquoted attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr<'a> {
    pub name: &'a str,
    pub value: Option<&'a str>,
}

/// Tolerant tokenizer over an attribute list. Stray characters are skipped.
pub struct Attributes<'a> {
    raw: &'a str,
    pos: usize,
}

impl<'a> Attributes<'a> {
    pub fn new(raw: &'a str) -> Self {
        Self { raw, pos: 0 }
    }
}

impl<'a> Iterator for Attributes<'a> {
    type Item = Attr<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.raw.as_bytes();
        loop {
            self.pos = skip_ws(bytes, self.pos);
            if self.pos >= bytes.len() {
                return None;
            }
            let name_start = self.pos;
            while self.pos < bytes.len() && !is_attr_delimiter(bytes[self.pos]) {
                self.pos += 1;
            }
            if self.pos == name_start {
                self.pos += 1;
                continue;
            }
            let name = &self.raw[name_start..self.pos];

            let after_name = skip_ws(bytes, self.pos);
            if after_name >= bytes.len() || bytes[after_name] != b'=' {
                return Some(Attr { name, value: None });
            }
            self.pos = skip_ws(bytes, after_name + 1);
            let value = match bytes.get(self.pos) {
                Some(&quote) if quote == b'"' || quote == b'\'' => {
                    let value_start = self.pos + 1;
                    match bytes[value_start..].iter().position(|&b| b == quote) {
                        Some(len) => {
                            self.pos = value_start + len + 1;
                            Some(&self.raw[value_start..value_start + len])
                        }
                        None => {
                            self.pos = bytes.len();
                            None
                        }
                    }
                }
                _ => {
                    while self.pos < bytes.len() && !bytes[self.pos].is_ascii_whitespace() {
                        self.pos += 1;
                    }
                    None
                }
            };
            return Some(Attr { name, value });
        }
    }
}

/// Parse `<` ws* NAME boundary ... `>` at `start`. The attribute text may not
/// contain `<`.
fn open_tag_at<'a>(text: &'a str, start: usize, name: &str) -> Option<OpenTag<'a>> {
    let bytes = text.as_bytes();
    let name_start = skip_ws(bytes, start + 1);
    let name_end = match_name(bytes, name_start, name)?;
    if bytes.get(name_end).is_some_and(|&b| is_word_byte(b)) {
        return None;
    }
    let gt = name_end + bytes[name_end..].iter().position(|&b| b == b'>' || b == b'<')?;
    if bytes[gt] != b'>' {
        return None;
    }
    Some(OpenTag {
        start,
        end: gt + 1,
        attrs: &text[name_end..gt],
    })
}

/// Parse `<` ws* `/` ws* NAME ws* `>` at `start`, returning the end offset.
fn close_tag_at(bytes: &[u8], start: usize, name: &str) -> Option<usize> {
    let slash = skip_ws(bytes, start + 1);
    if bytes.get(slash) != Some(&b'/') {
        return None;
    }
    let name_start = skip_ws(bytes, slash + 1);
    let name_end = match_name(bytes, name_start, name)?;
    let gt = skip_ws(bytes, name_end);
    (bytes.get(gt) == Some(&b'>')).then_some(gt + 1)
}

fn match_name(bytes: &[u8], pos: usize, name: &str) -> Option<usize> {
    let end = pos.checked_add(name.len())?;
    let candidate = bytes.get(pos..end)?;
    candidate
        .eq_ignore_ascii_case(name.as_bytes())
        .then_some(end)
}

fn next_lt(bytes: &[u8], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == b'<')
        .map(|offset| from + offset)
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || !b.is_ascii()
}

fn is_attr_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'=' | b'"' | b'\'' | b'/')
}

fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_whitespace())
}

fn trim_ascii_end(text: &str) -> &str {
    text.trim_end_matches(|c: char| c.is_ascii_whitespace())
}
