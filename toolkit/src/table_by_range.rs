use std::fmt::{Display, Formatter};

/// The upper end of a range in a [TableByRange].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UpperBound {
    Value(f64),
    Infinity,
}

impl Display for UpperBound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UpperBound::Value(v) => write!(f, "{v}"),
            UpperBound::Infinity => write!(f, "infinity"),
        }
    }
}

/// Groups values into collectors by numeric range.
///
/// `ranges` is a sorted list of boundaries. One range holds every key below the
/// first boundary, one range every key at or above the last one, and one range
/// spans each pair of neighbouring boundaries (lower inclusive, upper exclusive).
/// Collectors are created on demand.
#[derive(Debug, Clone)]
pub struct TableByRange<C> {
    ranges: Vec<f64>,
    lowest_bound: f64,
    // index 0 is the lowest range, index i + 1 starts at ranges[i]
    collectors: Vec<Option<C>>,
}

impl<C: Default> TableByRange<C> {
    pub fn new(ranges: Vec<f64>) -> Self {
        Self::with_lowest_bound(ranges, 0.0)
    }

    pub fn with_lowest_bound(ranges: Vec<f64>, lowest_bound: f64) -> Self {
        let collectors = std::iter::repeat_with(|| None).take(ranges.len() + 1).collect();
        Self { ranges, lowest_bound, collectors }
    }

    fn range_index(&self, key: f64) -> usize {
        self.ranges.iter().take_while(|bound| **bound <= key).count()
    }

    pub fn get_collector(&mut self, key: f64) -> &mut C {
        let idx = self.range_index(key);
        self.collectors[idx].get_or_insert_with(C::default)
    }

    fn lower(&self, idx: usize) -> f64 {
        if idx == 0 { self.lowest_bound } else { self.ranges[idx - 1] }
    }

    fn upper(&self, idx: usize) -> UpperBound {
        self.ranges.get(idx).map_or(UpperBound::Infinity, |v| UpperBound::Value(*v))
    }

    /// Iterates over `(lower, upper, collector)`.
    ///
    /// With `unseen_all` every range is returned, unseen ones with a fresh collector.
    /// Otherwise with `unseen_between` unseen ranges between the lowest and the highest
    /// seen range are returned. Else only seen ranges.
    pub fn iter_ranges(&self, unseen_between: bool, unseen_all: bool) -> Vec<(f64, UpperBound, C)> where C: Clone {
        let first_seen = self.collectors.iter().position(Option::is_some);
        let last_seen = self.collectors.iter().rposition(Option::is_some);
        let mut result = Vec::new();
        for (idx, collector) in self.collectors.iter().enumerate() {
            let collector = match collector {
                Some(seen) => seen.clone(),
                None => {
                    let between = match (first_seen, last_seen) {
                        (Some(first), Some(last)) => idx > first && idx < last,
                        _ => false
                    };
                    if !unseen_all && !(unseen_between && between) {
                        continue;
                    }
                    C::default()
                }
            };
            result.push((self.lower(idx), self.upper(idx), collector));
        }
        result
    }
}

#[cfg(test)]
mod test {
    use crate::table_by_range::{TableByRange, UpperBound};

    #[test]
    fn collects_by_range(){
        let mut table: TableByRange<Vec<f64>> = TableByRange::new(vec![1.0, 10.0, 25.0, 100.0]);
        table.get_collector(0.5).push(0.5);
        table.get_collector(1.0).push(1.0);
        table.get_collector(30.0).push(30.0);
        table.get_collector(500.0).push(500.0);

        let seen = table.iter_ranges(false, false);
        assert_eq!(4, seen.len());
        assert_eq!((0.0, UpperBound::Value(1.0), vec![0.5]), seen[0]);
        assert_eq!((1.0, UpperBound::Value(10.0), vec![1.0]), seen[1]);
        assert_eq!((25.0, UpperBound::Value(100.0), vec![30.0]), seen[2]);
        assert_eq!((100.0, UpperBound::Infinity, vec![500.0]), seen[3]);

        let between = table.iter_ranges(true, false);
        assert_eq!(5, between.len());
        assert_eq!((10.0, UpperBound::Value(25.0), vec![]), between[2]);
    }

    #[test]
    fn unseen_between_stops_at_highest(){
        let mut table: TableByRange<usize> = TableByRange::new(vec![1.0, 2.0, 3.0]);
        *table.get_collector(1.5) += 1;
        assert_eq!(1, table.iter_ranges(true, false).len());
        assert_eq!(4, table.iter_ranges(true, true).len());
        assert_eq!("infinity", UpperBound::Infinity.to_string());
    }
}
