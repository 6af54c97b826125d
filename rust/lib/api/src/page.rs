//! Pagination envelope.
//!
//! The backend answers list endpoints with
//! `{"count": n, "next": url|null, "previous": url|null, "results": [...]}`.
//! A few endpoints have been seen answering with a bare array instead; both
//! shapes decode into [`Page`] so call sites never branch on shape.

use serde::{Deserialize, Deserializer, Serialize};

/// Default page size used by the feeds.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub total_count: u64,
    /// Opaque cursor (a URL) for the following page, `None` on the last page.
    pub next_page_token: Option<String>,
    pub previous_page_token: Option<String>,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self { total_count: 0, next_page_token: None, previous_page_token: None, items: Vec::new() }
    }

    pub fn has_next(&self) -> bool {
        self.next_page_token.is_some()
    }

    /// Map items while keeping the cursors.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_count: self.total_count,
            next_page_token: self.next_page_token,
            previous_page_token: self.previous_page_token,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WirePage<T> {
    Envelope {
        count: u64,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> From<WirePage<T>> for Page<T> {
    fn from(wire: WirePage<T>) -> Self {
        match wire {
            WirePage::Envelope { count, next, previous, results } => Page {
                total_count: count,
                next_page_token: next,
                previous_page_token: previous,
                items: results,
            },
            WirePage::Bare(items) => Page {
                total_count: items.len() as u64,
                next_page_token: None,
                previous_page_token: None,
                items,
            },
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Page<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        WirePage::<T>::deserialize(deserializer).map(Page::from)
    }
}

/// 1-based page number plus page size, sent as `?page=&page_size=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self { page: page.max(1), page_size: page_size.max(1) }
    }

    pub fn first(page_size: u32) -> Self {
        Self::new(1, page_size)
    }

    pub fn next(self) -> Self {
        Self { page: self.page + 1, ..self }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_envelope() {
        let page: Page<u32> = serde_json::from_str(
            r#"{"count": 5, "next": "http://x/api/timeline/?page=2", "previous": null, "results": [1, 2]}"#,
        )
        .unwrap();
        assert_eq!(page.total_count, 5);
        assert!(page.has_next());
        assert_eq!(page.previous_page_token, None);
        assert_eq!(page.items, vec![1, 2]);
    }

    #[test]
    fn decodes_bare_array_as_single_page() {
        let page: Page<u32> = serde_json::from_str("[4, 5, 6]").unwrap();
        assert_eq!(page.total_count, 3);
        assert!(!page.has_next());
        assert_eq!(page.items, vec![4, 5, 6]);
    }

    #[test]
    fn map_keeps_cursors() {
        let page = Page {
            total_count: 2,
            next_page_token: Some("n".to_string()),
            previous_page_token: None,
            items: vec![1u32, 2],
        };
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.items, vec![10, 20]);
        assert_eq!(mapped.next_page_token.as_deref(), Some("n"));
    }

    #[test]
    fn page_request_clamps_and_advances() {
        let req = PageRequest::new(0, 0);
        assert_eq!(req, PageRequest { page: 1, page_size: 1 });
        assert_eq!(PageRequest::default().next(), PageRequest { page: 2, page_size: 20 });
    }
}
