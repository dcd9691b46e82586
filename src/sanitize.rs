//! Cleanup of raw model output
//!
//! Models tend to answer with markdown bullets, bold markers and a polite
//! preamble or closing paragraph even when told not to. The sanitizer strips
//! those so the client receives plain lines of text.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_MAX_LEN: usize = 4000;

/// Phrases that mark a line as preamble or conclusion boilerplate.
pub const DEFAULT_DENYLIST: &[&str] = &[
    // preamble
    "as an expert",
    "as an ai",
    "having analyzed",
    "here is the analysis",
    "here's the analysis",
    "sure,",
    "certainly",
    // conclusion
    "in conclusion",
    "to summarize",
    "in summary",
    "overall,",
    "i hope this helps",
];

const ELLIPSIS: char = '…';

// Runs after bullet characters are gone, so "1.- x" reads as "1. x" here
static NUMBERED_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\s*\d+\.(?:\s|$))+\s*").unwrap());

#[derive(Debug, Clone)]
pub struct Sanitizer {
    denylist: Vec<String>,
    max_len: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(
            DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            DEFAULT_MAX_LEN,
        )
    }
}

impl Sanitizer {
    pub fn new(denylist: Vec<String>, max_len: usize) -> Self {
        let denylist = denylist
            .into_iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { denylist, max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn clean(&self, raw_text: &str) -> String {
        self.clean_with_limit(raw_text, self.max_len)
    }

    pub fn clean_with_limit(&self, raw_text: &str, max_len: usize) -> String {
        let normalized = raw_text.replace("\r\n", "\n").replace('\r', "\n");

        let lines: Vec<String> = normalized
            .trim()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter(|line| !self.is_boilerplate(line))
            .map(strip_markers)
            .filter(|line| !line.is_empty())
            // Removing markers can join a phrase back together ("over-all,")
            .filter(|line| !self.is_boilerplate(line))
            .collect();

        truncate(lines.join("\n"), max_len)
    }

    fn is_boilerplate(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.denylist.iter().any(|phrase| lower.contains(phrase.as_str()))
    }
}

/// Sanitize with the default denylist.
pub fn sanitize(raw_text: &str, max_len: usize) -> String {
    static DEFAULT: Lazy<Sanitizer> = Lazy::new(Sanitizer::default);
    DEFAULT.clean_with_limit(raw_text, max_len)
}

fn strip_markers(line: &str) -> String {
    let without_bullets: String = line
        .chars()
        .filter(|c| !matches!(c, '*' | '-' | '•'))
        .collect();
    NUMBERED_MARKERS
        .replace(&without_bullets, "")
        .trim()
        .to_string()
}

fn truncate(text: String, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text;
    }
    let mut out: String = text.chars().take(max_len).collect();
    out.push(ELLIPSIS);
    out
}
