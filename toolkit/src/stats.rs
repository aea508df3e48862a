/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median of an already sorted slice, `None` for an empty slice.
pub fn median_of_sorted(values: &[f64]) -> Option<f64> {
    let len = values.len();
    if len == 0 {
        return None;
    }
    let mid = len / 2;
    if len % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Sorts a copy and takes the median.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    median_of_sorted(&sorted)
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use crate::stats::{mean, median, median_of_sorted};

    #[test]
    fn mean_and_median(){
        assert_eq!(None, mean(&[]));
        assert_relative_eq!(2.0, mean(&[1.0, 2.0, 3.0]).unwrap());
        assert_relative_eq!(2.5, median_of_sorted(&[1.0, 2.0, 3.0, 4.0]).unwrap());
        assert_relative_eq!(3.0, median(&[5.0, 3.0, 1.0]).unwrap());
        assert_eq!(None, median(&[]));
    }
}
