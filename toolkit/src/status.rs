use std::time::{Duration, Instant};
use crate::text::pluralize;

/// Counts processed items and periodically logs the progress of a stage.
///
/// A stage can carry a wall clock budget, [StatusMessage::item_processed] reports
/// when the budget is exhausted so that the caller can stop early.
#[derive(Debug)]
pub struct StatusMessage {
    item_name: String,
    plural_item_name: String,
    items_processed: usize,
    first_time: Instant,
    last_report: Instant,
    interval: Duration,
    max_time: Option<Duration>,
    verbose: bool,
}

impl StatusMessage {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(15);

    pub fn new(item_name: impl Into<String>) -> Self {
        let item_name = item_name.into();
        let plural_item_name = pluralize(&item_name);
        let now = Instant::now();
        Self {
            item_name,
            plural_item_name,
            items_processed: 0,
            first_time: now,
            last_report: now,
            interval: Self::DEFAULT_INTERVAL,
            max_time: None,
            verbose: true,
        }
    }

    /// Sets the budget of the stage. A zero duration means no budget.
    pub fn with_max_time(mut self, max_time: Option<Duration>) -> Self {
        self.max_time = max_time.filter(|d| !d.is_zero());
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }

    pub fn num_processed(&self) -> usize {
        self.items_processed
    }

    pub fn elapsed_time(&self) -> Duration {
        self.first_time.elapsed()
    }

    pub fn item_unit(&self) -> &str {
        if self.items_processed == 1 {
            &self.item_name
        } else {
            &self.plural_item_name
        }
    }

    /// Notes one processed item. Returns true if the time budget is exhausted.
    pub fn item_processed(&mut self) -> bool {
        let now = Instant::now();
        self.items_processed += 1;
        if self.verbose && now - self.last_report >= self.interval {
            let secs = (now - self.first_time).as_secs();
            log::info!(
                "Elapsed time: {} minutes {} seconds, {} {} processed",
                secs / 60,
                secs % 60,
                self.items_processed,
                self.item_unit()
            );
            self.last_report = now;
        }
        self.is_time_exhausted_at(now)
    }

    pub fn is_time_exhausted(&self) -> bool {
        self.is_time_exhausted_at(Instant::now())
    }

    fn is_time_exhausted_at(&self, now: Instant) -> bool {
        match self.max_time {
            Some(max) if now - self.first_time >= max => {
                log::info!(
                    "Maximum time reached, interrupting processing after {} {}",
                    self.items_processed,
                    self.item_unit()
                );
                true
            }
            _ => false
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;
    use crate::status::StatusMessage;

    #[test]
    fn counts_items(){
        let mut status = StatusMessage::new("article");
        assert_eq!("articles", status.item_unit());
        assert!(!status.item_processed());
        assert_eq!("article", status.item_unit());
        assert!(!status.item_processed());
        assert_eq!(2, status.num_processed());
    }

    #[test]
    fn budget_is_reported(){
        let mut status = StatusMessage::new("document").with_max_time(Some(Duration::from_nanos(1)));
        std::thread::sleep(Duration::from_millis(2));
        assert!(status.item_processed());
        let mut unlimited = StatusMessage::new("document").with_max_time(Some(Duration::ZERO));
        assert!(!unlimited.item_processed());
    }
}
