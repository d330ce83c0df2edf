use crate::models::Mark;

pub const FAILING_BAND: i64 = 45;
pub const LOW_PASS_BAND: i64 = 55;

/// Report-card banding for a 0–100 mark.
pub fn band(mark: f64) -> i64 {
    match mark {
        m if m < 50.0 => FAILING_BAND,
        m if m < 65.0 => LOW_PASS_BAND,
        m => m.round() as i64,
    }
}

/// Numeric marks are banded; placeholder text passes through untouched.
pub fn band_mark(mark: &Mark) -> Mark {
    match mark {
        Mark::Numeric(value) => Mark::Numeric(band(*value) as f64),
        Mark::Text(_) => mark.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_follow_expected_tiers() {
        assert_eq!(band(0.0), 45);
        assert_eq!(band(30.0), 45);
        assert_eq!(band(49.99), 45);
        assert_eq!(band(50.0), 55);
        assert_eq!(band(64.999), 55);
        assert_eq!(band(65.0), 65);
        assert_eq!(band(72.4), 72);
        assert_eq!(band(72.5), 73);
        assert_eq!(band(99.6), 100);
    }

    #[test]
    fn text_marks_pass_through() {
        let incomplete = Mark::Text("INC".to_string());
        assert_eq!(band_mark(&incomplete), incomplete);
        assert_eq!(band_mark(&Mark::Numeric(78.0)), Mark::Numeric(78.0));
        assert_eq!(band_mark(&Mark::Numeric(52.0)), Mark::Numeric(55.0));
    }
}
