//! Rich-text facet detection
//!
//! Scans post text for mentions and links and produces byte-offset facets
//! for the record. This is a pure transform over the text; mention handles
//! are carried as written, without resolution.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Byte range of a facet within the post text (UTF-8 offsets)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByteSlice {
    #[serde(rename = "byteStart")]
    pub byte_start: usize,
    #[serde(rename = "byteEnd")]
    pub byte_end: usize,
}

/// A single facet feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
}

/// A byte-range annotation marking a mention or link in post text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

fn mention_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Boundary prefix keeps emails (a@b.com) from matching; the handle
        // itself must look like a domain
        Regex::new(r"(?:^|[\s(])(@([A-Za-z0-9][A-Za-z0-9-]*(?:\.[A-Za-z0-9][A-Za-z0-9-]*)+))")
            .expect("mention regex")
    })
}

fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("link regex"))
}

/// Detect mention and link facets in post text
///
/// Returns facets ordered by byte start. Byte offsets index into the UTF-8
/// encoding of `text`, as the record format requires.
pub fn detect_facets(text: &str) -> Vec<Facet> {
    let mut facets = Vec::new();

    for cap in mention_regex().captures_iter(text) {
        let whole = cap.get(1).expect("mention group");
        let handle = cap.get(2).expect("handle group");
        facets.push(Facet {
            index: ByteSlice {
                byte_start: whole.start(),
                byte_end: whole.end(),
            },
            features: vec![FacetFeature::Mention {
                did: handle.as_str().to_string(),
            }],
        });
    }

    for m in link_regex().find_iter(text) {
        let trimmed = m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '"', '\'']);
        if trimmed.len() <= "https://".len() {
            continue;
        }
        facets.push(Facet {
            index: ByteSlice {
                byte_start: m.start(),
                byte_end: m.start() + trimmed.len(),
            },
            features: vec![FacetFeature::Link {
                uri: trimmed.to_string(),
            }],
        });
    }

    facets.sort_by_key(|f| f.index.byte_start);
    facets
}
