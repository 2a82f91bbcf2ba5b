//! Table-driven decoding of the catalog's obfuscated source descriptors.
//!
//! The catalog hands out source entries as hex-pair substitution strings.
//! The mapping is upstream-owned and has changed before, so it lives here as
//! data: `DecodeTable::default()` carries the scheme current at time of
//! writing, and a replacement table can be supplied without touching the
//! decode logic.

use std::collections::HashMap;

use crate::error::ResolveError;
use crate::types::SourceDescriptor;

/// Byte-pair substitution table, current as of the AllAnime scheme in use by
/// ani-cli. Each entry maps one lowercase hex pair to one output character.
const DEFAULT_PAIRS: &[(&str, char)] = &[
    ("79", 'A'), ("7a", 'B'), ("7b", 'C'), ("7c", 'D'), ("7d", 'E'),
    ("7e", 'F'), ("7f", 'G'), ("70", 'H'), ("71", 'I'), ("72", 'J'),
    ("73", 'K'), ("74", 'L'), ("75", 'M'), ("76", 'N'), ("77", 'O'),
    ("68", 'P'), ("69", 'Q'), ("6a", 'R'), ("6b", 'S'), ("6c", 'T'),
    ("6d", 'U'), ("6e", 'V'), ("6f", 'W'), ("60", 'X'), ("61", 'Y'),
    ("62", 'Z'),
    ("59", 'a'), ("5a", 'b'), ("5b", 'c'), ("5c", 'd'), ("5d", 'e'),
    ("5e", 'f'), ("5f", 'g'), ("50", 'h'), ("51", 'i'), ("52", 'j'),
    ("53", 'k'), ("54", 'l'), ("55", 'm'), ("56", 'n'), ("57", 'o'),
    ("48", 'p'), ("49", 'q'), ("4a", 'r'), ("4b", 's'), ("4c", 't'),
    ("4d", 'u'), ("4e", 'v'), ("4f", 'w'), ("40", 'x'), ("41", 'y'),
    ("42", 'z'),
    ("08", '0'), ("09", '1'), ("0a", '2'), ("0b", '3'), ("0c", '4'),
    ("0d", '5'), ("0e", '6'), ("0f", '7'), ("00", '8'), ("01", '9'),
    ("15", '-'), ("16", '.'), ("67", '_'), ("46", '~'),
    ("02", ':'), ("17", '/'), ("07", '?'), ("1b", '#'),
    ("63", '['), ("65", ']'), ("78", '@'), ("19", '!'),
    ("1c", '$'), ("1e", '&'), ("10", '('), ("11", ')'),
    ("12", '*'), ("13", '+'), ("14", ','), ("03", ';'),
    ("05", '='), ("1d", '%'),
];

/// Separator between the provider tag and the payload in a decoded
/// descriptor. Provider tags never contain it; URLs only after their scheme.
const TAG_SEPARATOR: char = ':';

pub struct DecodeTable {
    forward: HashMap<[u8; 2], char>,
    reverse: HashMap<char, [u8; 2]>,
}

impl Default for DecodeTable {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_PAIRS)
    }
}

impl DecodeTable {
    /// Entries whose key is not exactly two bytes are ignored; there is no
    /// way to match them against the pair-chunked input.
    pub fn from_pairs(pairs: &[(&str, char)]) -> Self {
        let mut forward = HashMap::with_capacity(pairs.len());
        let mut reverse = HashMap::with_capacity(pairs.len());
        for (hex, ch) in pairs {
            let &[a, b] = hex.as_bytes() else {
                continue;
            };
            let key = [a, b];
            forward.insert(key, *ch);
            reverse.insert(*ch, key);
        }
        Self { forward, reverse }
    }

    /// Decode one opaque catalog descriptor into `(provider_id, payload)`.
    ///
    /// Pure and deterministic. An unmapped pair, an odd-length body or a
    /// missing tag separator all fail with `MalformedDescriptor`; a partial
    /// or garbage result is never produced.
    pub fn decode(&self, raw: &str) -> Result<SourceDescriptor, ResolveError> {
        let body = raw.strip_prefix("--").unwrap_or(raw);
        if body.is_empty() || body.len() % 2 != 0 {
            return Err(ResolveError::MalformedDescriptor(raw.to_string()));
        }

        let mut decoded = String::with_capacity(body.len() / 2);
        for chunk in body.as_bytes().chunks(2) {
            let key = [chunk[0].to_ascii_lowercase(), chunk[1].to_ascii_lowercase()];
            match self.forward.get(&key) {
                Some(ch) => decoded.push(*ch),
                None => return Err(ResolveError::MalformedDescriptor(raw.to_string())),
            }
        }

        let Some((tag, payload)) = decoded.split_once(TAG_SEPARATOR) else {
            return Err(ResolveError::MalformedDescriptor(raw.to_string()));
        };
        if tag.is_empty() {
            return Err(ResolveError::MalformedDescriptor(raw.to_string()));
        }

        Ok(SourceDescriptor {
            provider_id: tag.to_string(),
            payload: payload.to_string(),
        })
    }

    /// Inverse transform. Used by the catalog client to frame the provider
    /// tag into the descriptor body, and by fixtures.
    pub fn encode(&self, plain: &str) -> Option<String> {
        let mut out = String::with_capacity(plain.len() * 2);
        for ch in plain.chars() {
            let pair = self.reverse.get(&ch)?;
            out.push(pair[0] as char);
            out.push(pair[1] as char);
        }
        Some(out)
    }
}
