use keypace::metrics::WpmSample;

/// Compute X (seconds) and Y (WPM) bounds for the results chart
pub fn compute_chart_params(samples: &[WpmSample], time_limit_secs: Option<u32>) -> (f64, f64) {
    let highest_wpm = samples.iter().map(|s| s.wpm).fold(0.0, f64::max);

    let overall_duration = samples
        .last()
        .map(|s| s.t)
        .or(time_limit_secs.map(f64::from))
        .unwrap_or(1.0)
        .max(1.0);

    (overall_duration, highest_wpm.round())
}

pub fn chart_points(samples: &[WpmSample]) -> Vec<(f64, f64)> {
    samples.iter().copied().map(Into::into).collect()
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_chart_params_empty() {
        assert_eq!(compute_chart_params(&[], Some(5)), (5.0, 0.0));
        assert_eq!(compute_chart_params(&[], None), (1.0, 0.0));
    }

    #[test]
    fn test_compute_chart_params_from_samples() {
        let samples = [
            WpmSample::new(0.25, 12.0),
            WpmSample::new(0.5, 48.6),
            WpmSample::new(7.5, 40.0),
        ];

        assert_eq!(compute_chart_params(&samples, Some(60)), (7.5, 49.0));
    }

    #[test]
    fn test_short_series_has_minimum_duration() {
        let samples = [WpmSample::new(0.25, 30.0)];
        assert_eq!(compute_chart_params(&samples, None), (1.0, 30.0));
    }

    #[test]
    fn test_chart_points() {
        let samples = [WpmSample::new(1.0, 20.0), WpmSample::new(2.0, 35.0)];
        assert_eq!(chart_points(&samples), vec![(1.0, 20.0), (2.0, 35.0)]);
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(1.0), "1");
        assert_eq!(format_label(1.2345), "1.23");
    }
}
