//! Invisible wrapper
//!
//! Appends the key reference to the translation as zero-width characters:
//! a start mark followed by eight bit characters per byte of a compact JSON
//! payload. The rendered text looks exactly like the translation.

use serde::{Deserialize, Serialize};

use super::{Unwrapped, WrapProps, WrappedKey, Wrapper};

/// Start of an encoded reference (INVISIBLE PLUS)
const MARK: char = '\u{2064}';
/// Bit 0 (ZERO WIDTH NON-JOINER)
const ZERO: char = '\u{200C}';
/// Bit 1 (ZERO WIDTH JOINER)
const ONE: char = '\u{200D}';

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    k: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
}

/// Zero-width encoding wrapper
#[derive(Debug, Clone, Copy, Default)]
pub struct InvisibleWrapper;

impl InvisibleWrapper {
    pub fn new() -> Self {
        Self
    }

    fn encode(key: &WrappedKey) -> String {
        let payload = Payload {
            k: key.key.clone(),
            n: key.ns.clone(),
            d: key.default_value.clone(),
        };
        let json = serde_json::to_vec(&payload).unwrap_or_default();

        let mut encoded = String::with_capacity(json.len() * 8 * ONE.len_utf8() + MARK.len_utf8());
        encoded.push(MARK);
        for byte in json {
            for shift in (0..8).rev() {
                encoded.push(if (byte >> shift) & 1 == 1 { ONE } else { ZERO });
            }
        }
        encoded
    }

    /// Decode the reference at the start of a bit run; returns the key and
    /// how many bit characters it used
    fn decode(run: &str) -> Option<(WrappedKey, usize)> {
        let bits: Vec<bool> = run.chars().map(|c| c == ONE).collect();
        let bytes: Vec<u8> = bits
            .chunks_exact(8)
            .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | u8::from(bit)))
            .collect();
        if bytes.first() != Some(&b'{') {
            return None;
        }

        // joiners after the closing brace belong to the surrounding text
        let mut stream = serde_json::Deserializer::from_slice(&bytes).into_iter::<Payload>();
        let payload = stream.next()?.ok()?;
        let used = stream.byte_offset() * 8;
        if payload.k.is_empty() {
            return None;
        }
        let key = WrappedKey {
            key: payload.k,
            ns: payload.n,
            default_value: payload.d,
        };
        Some((key, used))
    }
}

fn is_bit(c: char) -> bool {
    c == ZERO || c == ONE
}

impl Wrapper for InvisibleWrapper {
    fn wrap(&self, props: &WrapProps) -> String {
        let mut result = props.translation.clone().unwrap_or_default();
        result.push_str(&Self::encode(&props.to_key()));
        result
    }

    fn unwrap(&self, text: &str) -> Option<Unwrapped> {
        if !self.test_text(text) {
            return None;
        }

        let mut plain = String::with_capacity(text.len());
        let mut keys = Vec::new();
        let mut rest = text;
        while let Some(pos) = rest.find(MARK) {
            plain.push_str(&rest[..pos]);
            let after = &rest[pos + MARK.len_utf8()..];
            let run_end = after
                .char_indices()
                .find(|&(_, c)| !is_bit(c))
                .map_or(after.len(), |(i, _)| i);

            match Self::decode(&after[..run_end]) {
                Some((key, used)) => {
                    keys.push(key);
                    let end = after.char_indices().nth(used).map_or(after.len(), |(i, _)| i);
                    rest = &after[end..];
                }
                None => {
                    // not ours: keep the mark and scan on
                    plain.push(MARK);
                    rest = after;
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
        text.contains(MARK)
    }
}
