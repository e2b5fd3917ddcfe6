//! Page request and response types.

use std::fmt;

use serde::Serialize;

/// Zero-based page index. Advanced only by the fetcher, one step per successful page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PageCursor(u32);

impl PageCursor {
    pub const INITIAL: Self = Self(0);

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page request, identical across the original attempt and its post-renewal retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    #[serde(rename = "page")]
    pub cursor: PageCursor,
    #[serde(rename = "size")]
    pub page_size: u32,
    #[serde(rename = "sort")]
    pub sort_key: String,
}

impl PageRequest {
    /// Query parameters in wire order: `page`, `size`, `sort`.
    pub fn query_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("page", self.cursor.to_string()),
            ("size", self.page_size.to_string()),
            ("sort", self.sort_key.clone()),
        ]
    }
}

/// One page of items as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The server sends no "has more" flag; a short page ends the list.
    ///
    /// A final page of exactly `page_size` items is indistinguishable from a
    /// full middle page, so one extra (empty) request is needed to detect it.
    #[inline]
    pub fn is_last(&self, page_size: u32) -> bool {
        self.items.len() < page_size as usize
    }
}
