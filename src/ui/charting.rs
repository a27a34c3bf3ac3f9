/// X (seconds) and Y (cpm) upper bounds for the results chart
pub fn compute_chart_params(points: &[(f64, f64)], time_limit_secs: Option<f64>) -> (f64, f64) {
    let highest_cpm = points.iter().map(|&(_, cpm)| cpm).fold(0.0, f64::max);

    let overall_duration = match points.last() {
        Some(&(t, _)) => t,
        None => time_limit_secs.unwrap_or(1.0),
    };

    (overall_duration.max(1.0), highest_cpm.round())
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
