//! Order statistics.

/// Median of `values`, averaging the two middle elements for an even
/// count. Returns `None` for an empty slice.
///
/// Sorts `values` in place.
#[must_use]
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some(f64::midpoint(values[mid - 1], values[mid]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_has_no_median() {
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn odd_count_takes_middle() {
        assert_eq!(median(&mut [5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&mut [7.5]), Some(7.5));
    }

    #[test]
    fn even_count_averages_middle_pair() {
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut [10.0, 20.0]), Some(15.0));
    }

    #[test]
    fn robust_to_single_outlier() {
        assert_eq!(median(&mut [100.0, 98.0, 0.0, 102.0, 101.0]), Some(100.0));
    }
}
