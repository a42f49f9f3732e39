use crate::session::WpmSample;

/// X (seconds) and Y (wpm) bounds for the results chart. Raw speed counts
/// towards the Y bound since both series share the axis.
pub fn compute_chart_params(samples: &[WpmSample], fallback_secs: f64) -> (f64, f64) {
    let highest_wpm = samples
        .iter()
        .map(|s| s.wpm.max(s.raw))
        .max()
        .unwrap_or(0) as f64;

    let overall_duration = samples
        .last()
        .map(|s| s.second as f64)
        .unwrap_or(fallback_secs)
        .max(1.0);

    (overall_duration, highest_wpm.max(1.0))
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

pub fn net_points(samples: &[WpmSample]) -> Vec<(f64, f64)> {
    samples.iter().copied().map(Into::into).collect()
}

pub fn raw_points(samples: &[WpmSample]) -> Vec<(f64, f64)> {
    samples
        .iter()
        .map(|s| (s.second as f64, s.raw as f64))
        .collect()
}
