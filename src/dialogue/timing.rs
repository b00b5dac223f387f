//! Display pacing: how long each message stays on screen.
//!
//! All functions here are pure and deterministic: identical text always maps
//! to the identical duration, so UI hold times can be asserted exactly.

use std::time::Duration;

/// Hold duration for a reaction phrase, tiered by text length.
///
/// Length is measured in UTF-16 code units, which is how the front-end that
/// renders these phrases counts them (an emoji outside the BMP counts as two).
pub fn reaction_time(text: &str) -> u64 {
    let length = text.encode_utf16().count();
    match length {
        0..=29 => 3000,
        30..=59 => 4000,
        60..=99 => 5000,
        100..=149 => 6000,
        _ => 7000,
    }
}

/// Hold duration for long-form text (digressions): 2.5 words per second plus
/// 100ms per emoji, clamped to 4..8 seconds.
pub fn read_time(text: &str) -> u64 {
    let words = text.split_whitespace().count() as u64;
    let emoji = text.chars().filter(|c| is_emoji(*c)).count() as u64;
    // words / 2.5 * 1000 == words * 400, kept integral for exact results
    let raw = words * 400 + emoji * 100;
    raw.clamp(4000, 8000)
}

/// Time the typewriter needs to reveal `text` at `speed_ms` per character.
pub fn typing_duration(text: &str, speed_ms: u64) -> Duration {
    Duration::from_millis((text.chars().count() as u64).saturating_mul(speed_ms))
}

/// Code points with the Unicode `Emoji` property, outside ASCII. Digits,
/// `#` and `*` carry the property too but are plain text here.
const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x00A9, 0x00A9), (0x00AE, 0x00AE), (0x203C, 0x203C), (0x2049, 0x2049),
    (0x2122, 0x2122), (0x2139, 0x2139), (0x2194, 0x2199), (0x21A9, 0x21AA),
    (0x231A, 0x231B), (0x2328, 0x2328), (0x23CF, 0x23CF), (0x23E9, 0x23F3),
    (0x23F8, 0x23FA), (0x24C2, 0x24C2), (0x25AA, 0x25AB), (0x25B6, 0x25B6),
    (0x25C0, 0x25C0), (0x25FB, 0x25FE), (0x2600, 0x2604), (0x260E, 0x260E),
    (0x2611, 0x2611), (0x2614, 0x2615), (0x2618, 0x2618), (0x261D, 0x261D),
    (0x2620, 0x2620), (0x2622, 0x2623), (0x2626, 0x2626), (0x262A, 0x262A),
    (0x262E, 0x262F), (0x2638, 0x263A), (0x2640, 0x2640), (0x2642, 0x2642),
    (0x2648, 0x2653), (0x265F, 0x2660), (0x2663, 0x2663), (0x2665, 0x2666),
    (0x2668, 0x2668), (0x267B, 0x267B), (0x267E, 0x267F), (0x2692, 0x2697),
    (0x2699, 0x2699), (0x269B, 0x269C), (0x26A0, 0x26A1), (0x26A7, 0x26A7),
    (0x26AA, 0x26AB), (0x26B0, 0x26B1), (0x26BD, 0x26BE), (0x26C4, 0x26C5),
    (0x26C8, 0x26C8), (0x26CE, 0x26CF), (0x26D1, 0x26D1), (0x26D3, 0x26D4),
    (0x26E9, 0x26EA), (0x26F0, 0x26F5), (0x26F7, 0x26FA), (0x26FD, 0x26FD),
    (0x2702, 0x2702), (0x2705, 0x2705), (0x2708, 0x270D), (0x270F, 0x270F),
    (0x2712, 0x2712), (0x2714, 0x2714), (0x2716, 0x2716), (0x271D, 0x271D),
    (0x2721, 0x2721), (0x2728, 0x2728), (0x2733, 0x2734), (0x2744, 0x2744),
    (0x2747, 0x2747), (0x274C, 0x274C), (0x274E, 0x274E), (0x2753, 0x2755),
    (0x2757, 0x2757), (0x2763, 0x2764), (0x2795, 0x2797), (0x27A1, 0x27A1),
    (0x27B0, 0x27B0), (0x27BF, 0x27BF), (0x2934, 0x2935), (0x2B05, 0x2B07),
    (0x2B1B, 0x2B1C), (0x2B50, 0x2B50), (0x2B55, 0x2B55), (0x3030, 0x3030),
    (0x303D, 0x303D), (0x3297, 0x3297), (0x3299, 0x3299), (0x1F004, 0x1F004),
    (0x1F0CF, 0x1F0CF), (0x1F170, 0x1F171), (0x1F17E, 0x1F17F), (0x1F18E, 0x1F18E),
    (0x1F191, 0x1F19A), (0x1F1E6, 0x1F1FF), (0x1F201, 0x1F202), (0x1F21A, 0x1F21A),
    (0x1F22F, 0x1F22F), (0x1F232, 0x1F23A), (0x1F250, 0x1F251), (0x1F300, 0x1F321),
    (0x1F324, 0x1F393), (0x1F396, 0x1F397), (0x1F399, 0x1F39B), (0x1F39E, 0x1F3F0),
    (0x1F3F3, 0x1F3F5), (0x1F3F7, 0x1F4FD), (0x1F4FF, 0x1F53D), (0x1F549, 0x1F54E),
    (0x1F550, 0x1F567), (0x1F56F, 0x1F570), (0x1F573, 0x1F57A), (0x1F587, 0x1F587),
    (0x1F58A, 0x1F58D), (0x1F590, 0x1F590), (0x1F595, 0x1F596), (0x1F5A4, 0x1F5A5),
    (0x1F5A8, 0x1F5A8), (0x1F5B1, 0x1F5B2), (0x1F5BC, 0x1F5BC), (0x1F5C2, 0x1F5C4),
    (0x1F5D1, 0x1F5D3), (0x1F5DC, 0x1F5DE), (0x1F5E1, 0x1F5E1), (0x1F5E3, 0x1F5E3),
    (0x1F5E8, 0x1F5E8), (0x1F5EF, 0x1F5EF), (0x1F5F3, 0x1F5F3), (0x1F5FA, 0x1F64F),
    (0x1F680, 0x1F6C5), (0x1F6CB, 0x1F6D2), (0x1F6D5, 0x1F6D7), (0x1F6DC, 0x1F6E5),
    (0x1F6E9, 0x1F6E9), (0x1F6EB, 0x1F6EC), (0x1F6F0, 0x1F6F0), (0x1F6F3, 0x1F6FC),
    (0x1F7E0, 0x1F7EB), (0x1F7F0, 0x1F7F0), (0x1F90C, 0x1F93A), (0x1F93C, 0x1F945),
    (0x1F947, 0x1F9FF), (0x1FA70, 0x1FA7C), (0x1FA80, 0x1FA89), (0x1FA8F, 0x1FAC6),
    (0x1FACE, 0x1FADC), (0x1FADF, 0x1FAE9), (0x1FAF0, 0x1FAF8),
];

fn is_emoji(c: char) -> bool {
    let cp = c as u32;
    EMOJI_RANGES
        .binary_search_by(|&(lo, hi)| {
            if hi < cp {
                std::cmp::Ordering::Less
            } else if lo > cp {
                std::cmp::Ordering::Greater
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reaction_tiers_match_boundaries() {
        assert_eq!(reaction_time("hi"), 3000);
        assert_eq!(reaction_time(""), 3000);
        assert_eq!(reaction_time(&"a".repeat(29)), 3000);
        assert_eq!(reaction_time(&"a".repeat(30)), 4000);
        assert_eq!(reaction_time(&"a".repeat(59)), 4000);
        assert_eq!(reaction_time(&"a".repeat(60)), 5000);
        assert_eq!(reaction_time(&"a".repeat(99)), 5000);
        assert_eq!(reaction_time(&"a".repeat(100)), 6000);
        assert_eq!(reaction_time(&"a".repeat(149)), 6000);
        assert_eq!(reaction_time(&"a".repeat(150)), 7000);
        assert_eq!(reaction_time(&"a".repeat(1000)), 7000);
    }

    #[test]
    fn astral_emoji_counts_double() {
        // 28 ascii chars + one emoji = 30 UTF-16 units
        let text = format!("{}🌿", "a".repeat(28));
        assert_eq!(text.chars().count(), 29);
        assert_eq!(reaction_time(&text), 4000);
    }

    #[test]
    fn read_time_is_clamped() {
        assert_eq!(read_time(""), 4000);
        assert_eq!(read_time("just a few words"), 4000);
        // 15 words = 6000ms
        let fifteen = vec!["leaf"; 15].join(" ");
        assert_eq!(read_time(&fifteen), 6000);
        let many = vec!["leaf"; 100].join(" ");
        assert_eq!(read_time(&many), 8000);
    }

    #[test]
    fn read_time_adds_emoji_bonus() {
        let twelve = vec!["moss"; 12].join(" ");
        assert_eq!(read_time(&twelve), 4800);
        let with_emoji = format!("{} 🌿✨", twelve);
        // 13 words (the emoji cluster is a word) + 2 emoji
        assert_eq!(read_time(&with_emoji), 13 * 400 + 200);
    }

    #[test]
    fn text_style_symbols_count_as_emoji() {
        let twelve = vec!["moss"; 12].join(" ");
        // × is not an emoji; ™ © ▶ ↔ are
        let text = format!("{} ×12 ™©▶↔", twelve);
        assert_eq!(read_time(&text), 14 * 400 + 4 * 100);
    }

    #[test]
    fn digits_and_plain_symbols_are_not_emoji() {
        for c in ['0', '9', '#', '*', 'a', '×', '✓', '→'] {
            assert!(!is_emoji(c), "{:?} counted as emoji", c);
        }
        for c in ['©', '®', '‼', '™', 'ℹ', '↔', '↪', '▪', '▶', '◀', '◾', '⤴', 'Ⓜ', '㊗', '㊙', '🌿', '✨', '🫶'] {
            assert!(is_emoji(c), "{:?} not counted as emoji", c);
        }
    }

    #[test]
    fn typing_scales_with_characters() {
        assert_eq!(typing_duration("hello", 50), Duration::from_millis(250));
        assert_eq!(typing_duration("", 50), Duration::ZERO);
        assert_eq!(typing_duration("🌿🌿", 10), Duration::from_millis(20));
    }

    #[test]
    fn typing_saturates_instead_of_overflowing() {
        assert_eq!(
            typing_duration("a long enough line", u64::MAX),
            Duration::from_millis(u64::MAX)
        );
    }

    proptest! {
        #[test]
        fn reaction_time_is_monotone_in_length(a in 0usize..300, b in 0usize..300) {
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(reaction_time(&"x".repeat(short)) <= reaction_time(&"x".repeat(long)));
        }

        #[test]
        fn read_time_stays_in_bounds(text in ".{0,400}") {
            let t = read_time(&text);
            prop_assert!((4000..=8000).contains(&t));
        }
    }
}
