//! Length and idempotence checks for the sanitizer over generated inputs

use decision_relay::sanitize::{DEFAULT_MAX_LEN, Sanitizer, sanitize};

const FRAGMENTS: &[&str] = &[
    "- ",
    "* ",
    "• ",
    "1. ",
    "1.- ",
    "2.* ",
    "3.•",
    "**bold**",
    "plain words",
    "Pros: stable",
    "In conclusion, done",
    "as an expert I think",
    "\r\n",
    "\n\n",
    "  ",
    "ação",
    "12.5%",
];

/// Deterministic pseudo-random mix of fragments.
fn generated_inputs() -> Vec<String> {
    let mut seed: u64 = 0x9e37_79b9_7f4a_7c15;
    (0..300)
        .map(|_| {
            let parts = (seed % 12) as usize + 1;
            let mut s = String::new();
            for _ in 0..parts {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                s.push_str(FRAGMENTS[(seed % FRAGMENTS.len() as u64) as usize]);
                if seed % 3 == 0 {
                    s.push('\n');
                }
            }
            s
        })
        .collect()
}

#[test]
fn output_never_exceeds_limit_plus_ellipsis() {
    for max_len in [1, 5, 17, 64, DEFAULT_MAX_LEN] {
        for raw in generated_inputs() {
            let out = sanitize(&raw, max_len);
            assert!(
                out.chars().count() <= max_len + 1,
                "max_len={max_len} input={raw:?} output={out:?}"
            );
        }
    }
}

#[test]
fn sanitizing_twice_changes_nothing() {
    for raw in generated_inputs() {
        let once = sanitize(&raw, DEFAULT_MAX_LEN);
        assert_eq!(sanitize(&once, DEFAULT_MAX_LEN), once, "input={raw:?}");
    }
}

#[test]
fn no_line_starts_with_a_marker() {
    for raw in generated_inputs() {
        for line in sanitize(&raw, DEFAULT_MAX_LEN).lines() {
            assert!(
                !line.starts_with(['-', '*', '•']),
                "line {line:?} from {raw:?}"
            );
            assert!(
                !line.contains(['-', '*', '•']),
                "line {line:?} from {raw:?}"
            );
            assert!(!line.trim().is_empty());
        }
    }
}

#[test]
fn configured_sanitizer_uses_its_own_limit() {
    let s = Sanitizer::new(vec!["em conclusão".into()], 10);
    let out = s.clean("Prós: estabilidade e calma\nEm conclusão, fique");
    assert_eq!(out, "Prós: esta…");
    assert_eq!(s.max_len(), 10);
}
