//! Row range for paginated queries.

/// A window of rows, expressed as offset and limit.
///
/// The grid asks for half-open `[start, end)` ranges while the Supabase
/// client speaks inclusive `from..=to`; both convert to the same
/// `offset`/`limit` pair PostgREST understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// Index of the first row.
    pub offset: usize,
    /// Maximum number of rows; `None` reads to the end.
    pub limit: Option<usize>,
}

impl Range {
    /// Creates a range from a half-open `[start, end)` row window.
    ///
    /// An `end` before `start` yields an empty range.
    pub fn half_open(start: usize, end: usize) -> Self {
        Self {
            offset: start,
            limit: Some(end.saturating_sub(start)),
        }
    }

    /// Creates a range of every row from `start` on.
    pub fn starting_at(start: usize) -> Self {
        Self {
            offset: start,
            limit: None,
        }
    }

    /// Creates a range from an inclusive `from..=to` row window.
    pub fn inclusive(from: usize, to: usize) -> Self {
        Self::half_open(from, to.saturating_add(1))
    }

    /// Returns the exclusive end index, if bounded.
    pub fn end(&self) -> Option<usize> {
        self.limit.map(|limit| self.offset.saturating_add(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_open_and_inclusive_agree() {
        assert_eq!(Range::half_open(0, 50), Range::inclusive(0, 49));
        assert_eq!(Range::half_open(100, 150).limit, Some(50));
        assert_eq!(Range::half_open(100, 150).end(), Some(150));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert_eq!(Range::half_open(10, 5).limit, Some(0));
    }

    #[test]
    fn test_open_ended_range() {
        assert_eq!(Range::starting_at(20).end(), None);
    }
}
