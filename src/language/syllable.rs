const DOUBLE_INITIALS: [&str; 3] = ["zh", "ch", "sh"];
const SINGLE_INITIALS: &str = "bpmfdtnlgkhjqxrzcsyw";

/// Split a toneless pinyin syllable into (initial, final).
///
/// `y` and `w` count as initials so that `yi`, `wo` split the way shuangpin
/// schemes type them. Syllables without an initial return an empty initial.
pub fn split_syllable(pinyin: &str) -> (&str, &str) {
    if let Some(initial) = DOUBLE_INITIALS.iter().find(|i| pinyin.starts_with(*i)) {
        return pinyin.split_at(initial.len());
    }

    match pinyin.chars().next() {
        Some(first) if SINGLE_INITIALS.contains(first) => pinyin.split_at(1),
        _ => ("", pinyin),
    }
}
