use std::collections::BTreeMap;

use itertools::Itertools;

/// Rows drawn by the results heatmap, lowercase US layout.
pub const KEYBOARD_ROWS: [&[char]; 4] = [
    &['`', '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', '-', '='],
    &['q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p', '[', ']', '\\'],
    &['a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l', ';', '\''],
    &['z', 'x', 'c', 'v', 'b', 'n', 'm', ',', '.', '/'],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heat {
    None,
    Low,
    Medium,
    High,
}

/// The `n` keys with the most misses, most missed first, ties by character.
pub fn most_missed_keys(key_errors: &BTreeMap<char, u32>, n: usize) -> Vec<(char, u32)> {
    key_errors
        .iter()
        .filter(|&(_, &count)| count > 0)
        .map(|(&c, &count)| (c, count))
        .sorted_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)))
        .take(n)
        .collect()
}

/// Heat bucket for `key`, relative to the most missed key. Uppercase misses
/// are folded onto the lowercase key.
pub fn heat(key_errors: &BTreeMap<char, u32>, key: char) -> Heat {
    let errors_for = |k: char| -> u32 {
        key_errors
            .iter()
            .filter(|&(&c, _)| c.to_lowercase().eq(k.to_lowercase()))
            .map(|(_, &n)| n)
            .sum()
    };

    let errors = errors_for(key);
    if errors == 0 {
        return Heat::None;
    }

    let max_errors = key_errors.values().copied().max().unwrap_or(0).max(1);
    let intensity = (errors as f64 / max_errors as f64).min(1.0);
    if intensity < 0.3 {
        Heat::Low
    } else if intensity < 0.6 {
        Heat::Medium
    } else {
        Heat::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors(pairs: &[(char, u32)]) -> BTreeMap<char, u32> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn most_missed_orders_by_count_then_char() {
        let e = errors(&[('{', 2), ('a', 5), ('z', 2), (';', 1)]);
        assert_eq!(most_missed_keys(&e, 3), vec![('a', 5), ('z', 2), ('{', 2)]);
        assert!(most_missed_keys(&BTreeMap::new(), 5).is_empty());
    }

    #[test]
    fn heat_buckets() {
        let e = errors(&[('a', 10), ('s', 5), ('d', 2)]);
        assert_eq!(heat(&e, 'a'), Heat::High);
        assert_eq!(heat(&e, 's'), Heat::Medium);
        assert_eq!(heat(&e, 'd'), Heat::Low);
        assert_eq!(heat(&e, 'f'), Heat::None);
    }

    #[test]
    fn heat_folds_case() {
        let e = errors(&[('A', 3)]);
        assert_eq!(heat(&e, 'a'), Heat::High);
    }
}
