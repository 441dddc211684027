//! Pagination window resolution.
//!
//! Callers describe a page as `{count, older, newer}` where the cursors
//! are content-item identities, never timestamps. The resolver clamps the
//! count into the domain's limits and normalizes the cursors into a
//! [`Bound`] the feed assembler splices into its WHERE clause. Storage
//! ordering is always most-recent-first; the assembler re-reverses pages
//! that were framed as "the N items after this cursor" so those come back
//! chronological.

use rusqlite::types::ToSql;

/// Per-domain page-size limits. `default` applies when the caller passes
/// zero; a zero count is never treated as "unbounded".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

/// Page limits for board and home post feeds.
pub const POST_PAGE: PageLimits = PageLimits {
    min: 1,
    max: 255,
    default: 20,
};

/// Page limits for comment threads (applies only when the thread is
/// explicitly bounded; the unbounded default is the full thread).
pub const COMMENT_PAGE: PageLimits = PageLimits {
    min: 1,
    max: 255,
    default: 20,
};

/// Page limits for private-message history and conversation listings.
pub const PM_PAGE: PageLimits = PageLimits {
    min: 1,
    max: 20,
    default: 20,
};

/// Caller-facing pagination options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Requested page size; 0 means the domain default.
    pub count: u32,
    /// Return items strictly older (smaller identity) than this cursor.
    pub older: Option<i64>,
    /// Return items strictly newer (larger identity) than this cursor.
    pub newer: Option<i64>,
}

/// Identity bound derived from the cursor pair. Cursor rows themselves
/// are always excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// No cursor given; the window is the most recent `limit` items.
    Unbounded,
    /// `id < older`.
    Older(i64),
    /// `id > newer`; the page is re-reversed to chronological order.
    Newer(i64),
    /// `newer < id < older`, strictly between.
    Between { newer: i64, older: i64 },
    /// Both cursors given with `older <= newer`: defined to be empty,
    /// not an error.
    Empty,
}

/// A resolved window: bounded, ordered (most-recent-first) query shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub bound: Bound,
}

impl Window {
    /// Whether the window is degenerate and the query can be skipped.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self.bound, Bound::Empty)
    }

    /// Whether the fetched (descending) page must be reversed so the
    /// returned sequence is chronological: true exactly for the
    /// "newer than cursor" framing.
    #[must_use]
    pub const fn reverse_output(&self) -> bool {
        matches!(self.bound, Bound::Newer(_))
    }

    /// Append this window's identity condition on `column` to a
    /// conditions/params pair (positional `?N` placeholders).
    pub(crate) fn push_condition(
        &self,
        column: &str,
        conditions: &mut Vec<String>,
        params: &mut Vec<Box<dyn ToSql>>,
    ) {
        match self.bound {
            Bound::Unbounded | Bound::Empty => {}
            Bound::Older(older) => {
                params.push(Box::new(older));
                conditions.push(format!("{column} < ?{}", params.len()));
            }
            Bound::Newer(newer) => {
                params.push(Box::new(newer));
                conditions.push(format!("{column} > ?{}", params.len()));
            }
            Bound::Between { newer, older } => {
                params.push(Box::new(newer));
                conditions.push(format!("{column} > ?{}", params.len()));
                params.push(Box::new(older));
                conditions.push(format!("{column} < ?{}", params.len()));
            }
        }
    }
}

/// Resolve caller options into a bounded window under `limits`.
#[must_use]
pub fn resolve(options: &PageOptions, limits: &PageLimits) -> Window {
    let requested = if options.count == 0 {
        limits.default
    } else {
        options.count
    };
    let limit = requested.clamp(limits.min, limits.max);

    let bound = match (options.older, options.newer) {
        (Some(older), Some(newer)) if older <= newer => Bound::Empty,
        (Some(older), Some(newer)) => Bound::Between { newer, older },
        (Some(older), None) => Bound::Older(older),
        (None, Some(newer)) => Bound::Newer(newer),
        (None, None) => Bound::Unbounded,
    };

    Window { limit, bound }
}

#[cfg(test)]
mod tests {
    use super::{Bound, PM_PAGE, POST_PAGE, PageLimits, PageOptions, Window, resolve};
    use proptest::prelude::*;

    #[test]
    fn zero_count_coerces_to_domain_default_never_unbounded() {
        let window = resolve(&PageOptions::default(), &POST_PAGE);
        assert_eq!(window.limit, POST_PAGE.default);
        assert_eq!(window.bound, Bound::Unbounded);
    }

    #[test]
    fn count_clamps_into_domain_range() {
        let opts = PageOptions {
            count: 1_000,
            ..PageOptions::default()
        };
        assert_eq!(resolve(&opts, &PM_PAGE).limit, PM_PAGE.max);
    }

    #[test]
    fn older_only_bounds_below() {
        let opts = PageOptions {
            count: 5,
            older: Some(103),
            newer: None,
        };
        let window = resolve(&opts, &POST_PAGE);
        assert_eq!(window.bound, Bound::Older(103));
        assert!(!window.reverse_output());
    }

    #[test]
    fn newer_only_bounds_above_and_reverses() {
        let opts = PageOptions {
            count: 5,
            older: None,
            newer: Some(97),
        };
        let window = resolve(&opts, &POST_PAGE);
        assert_eq!(window.bound, Bound::Newer(97));
        assert!(window.reverse_output());
    }

    #[test]
    fn inverted_cursor_pair_is_empty_not_an_error() {
        let opts = PageOptions {
            count: 5,
            older: Some(7),
            newer: Some(7),
        };
        assert!(resolve(&opts, &POST_PAGE).is_empty());

        let opts = PageOptions {
            count: 5,
            older: Some(3),
            newer: Some(9),
        };
        assert!(resolve(&opts, &POST_PAGE).is_empty());
    }

    #[test]
    fn between_excludes_both_cursor_rows() {
        let opts = PageOptions {
            count: 4,
            older: Some(103),
            newer: Some(97),
        };
        let window = resolve(&opts, &POST_PAGE);
        assert_eq!(
            window.bound,
            Bound::Between {
                newer: 97,
                older: 103
            }
        );

        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        window.push_condition("post_id", &mut conditions, &mut params);
        assert_eq!(conditions, vec!["post_id > ?1", "post_id < ?2"]);
        assert_eq!(params.len(), 2);
    }

    proptest! {
        #[test]
        fn limit_always_within_domain_range(
            count in 0u32..2_000,
            min in 1u32..10,
            span in 0u32..300,
            default in 0u32..300,
        ) {
            let limits = PageLimits {
                min,
                max: min + span,
                default: (min + default % (span + 1)).min(min + span),
            };
            let opts = PageOptions { count, older: None, newer: None };
            let window = resolve(&opts, &limits);
            prop_assert!(window.limit >= limits.min);
            prop_assert!(window.limit <= limits.max);
        }

        #[test]
        fn bound_shape_matches_cursors(
            older in proptest::option::of(0i64..10_000),
            newer in proptest::option::of(0i64..10_000),
        ) {
            let opts = PageOptions { count: 10, older, newer };
            let window = resolve(&opts, &POST_PAGE);
            match (older, newer) {
                (Some(o), Some(n)) if o <= n => prop_assert!(window.is_empty()),
                (Some(o), Some(n)) => prop_assert_eq!(
                    window.bound,
                    Bound::Between { newer: n, older: o }
                ),
                (Some(o), None) => prop_assert_eq!(window.bound, Bound::Older(o)),
                (None, Some(n)) => prop_assert_eq!(window.bound, Bound::Newer(n)),
                (None, None) => prop_assert_eq!(window.bound, Bound::Unbounded),
            }
        }

        #[test]
        fn only_newer_pages_reverse(
            older in proptest::option::of(0i64..10_000),
            newer in proptest::option::of(0i64..10_000),
        ) {
            let opts = PageOptions { count: 10, older, newer };
            let window = resolve(&opts, &POST_PAGE);
            prop_assert_eq!(
                window.reverse_output(),
                older.is_none() && newer.is_some()
            );
        }
    }

    #[test]
    fn empty_window_emits_no_condition() {
        let window = Window {
            limit: 4,
            bound: Bound::Empty,
        };
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        window.push_condition("post_id", &mut conditions, &mut params);
        assert!(conditions.is_empty());
        assert!(params.is_empty());
    }
}
