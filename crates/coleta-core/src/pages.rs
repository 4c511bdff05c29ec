//! Pagination cursor and termination policy.

/// How a source's page sequence ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Iterate `[start, total_pages]` inclusive.
    Bounded { start: u32, total_pages: u32 },
    /// Fetch successive pages until one extracts to zero records.
    Auto { start: u32 },
}

/// What to do when a page's fetch is permanently exhausted.
///
/// Only meaningful in bounded mode; auto mode always aborts the
/// language because the empty-page termination signal is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustedPolicy {
    /// Skip the page and advance to the next one.
    #[default]
    SkipPage,
    /// Abort the remaining pages of this language.
    AbortLanguage,
}

/// Stateful cursor over one `(source, language)` page sequence.
///
/// Callers alternate [`next_page`](Self::next_page) with
/// [`record_yield`](Self::record_yield) so auto mode can observe
/// whether the previous page produced records. A page may have a
/// payload yet extract to nothing; that still terminates auto mode.
#[derive(Debug)]
pub struct PaginationDriver {
    mode: Pagination,
    next: u32,
    done: bool,
}

impl PaginationDriver {
    pub fn new(mode: Pagination) -> Self {
        let next = match mode {
            Pagination::Bounded { start, .. } | Pagination::Auto { start } => start,
        };
        Self {
            mode,
            next,
            done: false,
        }
    }

    /// The next page number to fetch, or `None` when the sequence ended.
    pub fn next_page(&mut self) -> Option<u32> {
        if self.done {
            return None;
        }
        match self.mode {
            Pagination::Bounded { total_pages, .. } if self.next > total_pages => {
                self.done = true;
                None
            }
            _ => {
                let page = self.next;
                self.next += 1;
                Some(page)
            }
        }
    }

    /// Report how many records the last page extracted to.
    pub fn record_yield(&mut self, extracted: usize) {
        if matches!(self.mode, Pagination::Auto { .. }) && extracted == 0 {
            self.done = true;
        }
    }

    /// Stop the sequence early (exhausted fetch, shutdown).
    pub fn terminate(&mut self) {
        self.done = true;
    }

    pub fn is_auto(&self) -> bool {
        matches!(self.mode, Pagination::Auto { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_is_inclusive() {
        let mut driver = PaginationDriver::new(Pagination::Bounded {
            start: 1,
            total_pages: 3,
        });
        assert_eq!(driver.next_page(), Some(1));
        driver.record_yield(10);
        assert_eq!(driver.next_page(), Some(2));
        driver.record_yield(10);
        assert_eq!(driver.next_page(), Some(3));
        driver.record_yield(10);
        assert_eq!(driver.next_page(), None);
    }

    #[test]
    fn bounded_ignores_empty_pages() {
        let mut driver = PaginationDriver::new(Pagination::Bounded {
            start: 1,
            total_pages: 2,
        });
        assert_eq!(driver.next_page(), Some(1));
        driver.record_yield(0);
        assert_eq!(driver.next_page(), Some(2));
    }

    #[test]
    fn auto_stops_on_empty_yield() {
        let mut driver = PaginationDriver::new(Pagination::Auto { start: 0 });
        assert_eq!(driver.next_page(), Some(0));
        driver.record_yield(7);
        assert_eq!(driver.next_page(), Some(1));
        driver.record_yield(0);
        assert_eq!(driver.next_page(), None);
    }

    #[test]
    fn terminate_ends_sequence() {
        let mut driver = PaginationDriver::new(Pagination::Auto { start: 1 });
        assert_eq!(driver.next_page(), Some(1));
        driver.terminate();
        assert_eq!(driver.next_page(), None);
    }
}
