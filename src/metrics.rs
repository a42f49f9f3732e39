//! Speed and accuracy arithmetic.
//!
//! One "word" is five characters. Every ratio here returns 0 instead of
//! dividing by a zero (or negative) elapsed time or keystroke count.

/// Upper bound applied to live and sampled speeds.
pub const WPM_CAP: u32 = 300;

/// Live WPM is only recomputed once this much time has passed since start.
pub const LIVE_WPM_MIN_ELAPSED_MS: u64 = 3000;

const CHARS_PER_WORD: f64 = 5.0;

/// Correct characters minus mistakes, floored at zero.
pub fn net_chars(correct: u32, incorrect: u32) -> u32 {
    correct.saturating_sub(incorrect)
}

/// Rounded words per minute for `chars` typed over `elapsed_secs`.
pub fn words_per_minute(chars: u32, elapsed_secs: f64) -> u32 {
    if elapsed_secs <= 0.0 || !elapsed_secs.is_finite() {
        return 0;
    }
    let minutes = elapsed_secs / 60.0;
    ((chars as f64 / CHARS_PER_WORD) / minutes).round() as u32
}

/// Net WPM, penalising each mistake by one correct character.
pub fn net_wpm(correct: u32, incorrect: u32, elapsed_secs: f64) -> u32 {
    words_per_minute(net_chars(correct, incorrect), elapsed_secs)
}

/// Gross WPM over every keystroke, ignoring correctness.
pub fn raw_wpm(total_keystrokes: u32, elapsed_secs: f64) -> u32 {
    words_per_minute(total_keystrokes, elapsed_secs)
}

pub fn capped(wpm: u32) -> u32 {
    wpm.min(WPM_CAP)
}

/// Rounded percentage of keystrokes that were correct.
pub fn accuracy(correct: u32, total_keystrokes: u32) -> u32 {
    if total_keystrokes == 0 {
        return 0;
    }
    ((correct as f64 / total_keystrokes as f64) * 100.0).round() as u32
}

pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

pub fn std_dev(data: &[f64]) -> Option<f64> {
    match (mean(data), data.len()) {
        (Some(data_mean), count) if count > 0 => {
            let variance = data
                .iter()
                .map(|value| {
                    let diff = data_mean - *value;

                    diff * diff
                })
                .sum::<f64>()
                / count as f64;

            Some(variance.sqrt())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn net_chars_never_negative() {
        assert_eq!(net_chars(3, 10), 0);
        assert_eq!(net_chars(10, 3), 7);
    }

    #[test]
    fn wpm_zero_for_zero_elapsed() {
        assert_eq!(net_wpm(50, 0, 0.0), 0);
        assert_eq!(raw_wpm(50, 0.0), 0);
        assert_eq!(net_wpm(50, 0, -1.0), 0);
    }

    #[test]
    fn wpm_basic() {
        // 100 chars = 20 words in 15s = 80 wpm
        assert_eq!(net_wpm(100, 0, 15.0), 80);
        // 62 chars over 15s = 49.6 -> 50
        assert_eq!(net_wpm(62, 0, 15.0), 50);
        assert_eq!(net_wpm(110, 10, 15.0), 80);
        assert_eq!(raw_wpm(120, 60.0), 24);
    }

    #[test]
    fn cap_limits_spikes() {
        assert_eq!(capped(1200), WPM_CAP);
        assert_eq!(capped(42), 42);
    }

    #[test]
    fn accuracy_guards_zero_keystrokes() {
        assert_eq!(accuracy(0, 0), 0);
        assert_eq!(accuracy(3, 4), 75);
        assert_eq!(accuracy(2, 3), 67);
        assert_eq!(accuracy(5, 5), 100);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[10., 20., 30., 15., 22.]), Some(19.4));
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_std_dev() {
        assert_eq!(
            std_dev(&[100., 120., 90., 102., 94.]),
            Some(10.322790320451151)
        );
        assert_eq!(std_dev(&[42.0]), Some(0.0));
        assert_eq!(std_dev(&[]), None);
    }
}
