//! Text wrapper
//!
//! Human-readable encoding: `%-%fos:key,ns,default,translation%-%`.
//! Inside a reference `\`, `,` and `%` are backslash-escaped, so the closing
//! `%-%` can only ever be the real terminator.

use super::{Unwrapped, WrapProps, WrappedKey, Wrapper};

const PREFIX: &str = "%-%fos:";
const SUFFIX: &str = "%-%";
const FIELDS: usize = 4;

/// Readable delimiter-based wrapper
#[derive(Debug, Clone, Copy, Default)]
pub struct TextWrapper;

impl TextWrapper {
    pub fn new() -> Self {
        Self
    }
}

fn escape(value: &str, out: &mut String) {
    for c in value.chars() {
        if matches!(c, '\\' | ',' | '%') {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Parse one reference body (text right after the prefix).
///
/// Returns the key, the translation and the number of bytes consumed,
/// suffix included.
fn parse_reference(body: &str) -> Option<(WrappedKey, String, usize)> {
    let mut fields: Vec<String> = Vec::with_capacity(FIELDS);
    let mut current = String::new();
    let mut chars = body.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                current.push(escaped);
            }
            ',' => {
                if fields.len() + 1 == FIELDS {
                    return None;
                }
                fields.push(std::mem::take(&mut current));
            }
            '%' => {
                if !body[i..].starts_with(SUFFIX) || fields.len() + 1 != FIELDS {
                    return None;
                }
                let translation = current;
                let mut fields = fields.into_iter();
                let key = fields.next().filter(|k| !k.is_empty())?;
                let ns = fields.next().filter(|n| !n.is_empty());
                let default_value = fields.next().filter(|d| !d.is_empty());
                let consumed = i + SUFFIX.len();
                return Some((WrappedKey { key, ns, default_value }, translation, consumed));
            }
            c => current.push(c),
        }
    }
    None
}

impl Wrapper for TextWrapper {
    fn wrap(&self, props: &WrapProps) -> String {
        let key = props.to_key();
        let mut result = String::from(PREFIX);
        escape(&key.key, &mut result);
        result.push(',');
        escape(key.ns.as_deref().unwrap_or_default(), &mut result);
        result.push(',');
        escape(key.default_value.as_deref().unwrap_or_default(), &mut result);
        result.push(',');
        escape(props.translation.as_deref().unwrap_or_default(), &mut result);
        result.push_str(SUFFIX);
        result
    }

    fn unwrap(&self, text: &str) -> Option<Unwrapped> {
        if !self.test_text(text) {
            return None;
        }

        let mut plain = String::with_capacity(text.len());
        let mut keys = Vec::new();
        let mut rest = text;
        while let Some(pos) = rest.find(PREFIX) {
            plain.push_str(&rest[..pos]);
            let body = &rest[pos + PREFIX.len()..];
            match parse_reference(body) {
                Some((key, translation, consumed)) => {
                    keys.push(key);
                    plain.push_str(&translation);
                    rest = &body[consumed..];
                }
                None => {
                    plain.push_str(PREFIX);
                    rest = body;
                }
            }
        }
        plain.push_str(rest);

        if keys.is_empty() {
            return None;
        }
        Some(Unwrapped { text: plain, keys })
    }

    fn test_text(&self, text: &str) -> bool {
        text.contains(PREFIX)
    }
}
