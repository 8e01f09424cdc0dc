#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array.
pub fn argsort<T: std::cmp::PartialOrd>(x: &[T], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| x[a].partial_cmp(&x[b]).unwrap()),
        SortOrder::Descending => indices.sort_by(|&a, &b| x[b].partial_cmp(&x[a]).unwrap()),
    }
    indices
}

/// clamp_pct clamps a percentage value to the interval [0.0, 100.0].
pub fn clamp_pct(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x > 100.0 {
        100.0
    } else {
        x
    }
}

/// format_race_clock formats a duration in seconds as h:mm:ss.
pub fn format_race_clock(t_s: f64) -> String {
    let t_total = t_s.max(0.0) as u64;
    let hours = t_total / 3600;
    let minutes = (t_total % 3600) / 60;
    let seconds = t_total % 60;
    format!("{}:{:02}:{:02}", hours, minutes, seconds)
}

/// format_laptime formats a lap time in seconds as m:ss.mmm.
pub fn format_laptime(t_s: f64) -> String {
    let minutes = (t_s.max(0.0) / 60.0) as u64;
    let seconds = t_s.max(0.0) - minutes as f64 * 60.0;
    format!("{}:{:06.3}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argsort_orders_indices() {
        let x = [3.0, 1.0, 2.0];
        assert_eq!(argsort(&x, SortOrder::Ascending), vec![1, 2, 0]);
        assert_eq!(argsort(&x, SortOrder::Descending), vec![0, 2, 1]);
    }

    #[test]
    fn clamp_pct_bounds() {
        assert_eq!(clamp_pct(-3.5), 0.0);
        assert_eq!(clamp_pct(54.2), 54.2);
        assert_eq!(clamp_pct(112.0), 100.0);
    }

    #[test]
    fn format_race_clock_hms() {
        assert_eq!(format_race_clock(0.0), "0:00:00");
        assert_eq!(format_race_clock(86399.0), "23:59:59");
        assert_eq!(format_race_clock(3726.0), "1:02:06");
    }

    #[test]
    fn format_laptime_msm() {
        assert_eq!(format_laptime(225.431), "3:45.431");
        assert_eq!(format_laptime(59.9), "0:59.900");
    }
}
