//! Page range parsing.
//!
//! Turns the free-text range a user types (`"1-3, 5, 7-9"`) into a
//! [`PageSelection`]: a strictly ascending, duplicate-free list of 1-indexed
//! page numbers, all within `[1, total_pages]`.
//!
//! Parsing is lenient. A token that is not a number, a reversed range, or
//! anything outside the document is skipped rather than reported, and a
//! selection that ends up empty resolves to every page.

use crate::config::PageRangeMode;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// An ordered set of distinct, in-bounds, 1-indexed page numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    pages: Vec<usize>,
}

impl PageSelection {
    /// Every page of a `total_pages`-page document.
    pub fn all(total_pages: usize) -> Self {
        Self {
            pages: (1..=total_pages).collect(),
        }
    }

    /// Parse a comma-separated range expression against `total_pages`.
    ///
    /// The result may be empty; use [`PageSelection::resolve`] to apply the
    /// all-pages fallback.
    pub fn parse(raw: &str, total_pages: usize) -> Self {
        let mut pages = BTreeSet::new();

        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match parse_token(token, total_pages) {
                Some((start, end)) => pages.extend(start..=end),
                None => debug!("Skipping page range token {:?}", token),
            }
        }

        Self {
            pages: pages.into_iter().collect(),
        }
    }

    /// Resolve the user's range choice, falling back to all pages when the
    /// custom text selects nothing.
    pub fn resolve(mode: &PageRangeMode, total_pages: usize) -> Self {
        match mode {
            PageRangeMode::All => Self::all(total_pages),
            PageRangeMode::Custom(raw) if raw.trim().is_empty() => Self::all(total_pages),
            PageRangeMode::Custom(raw) => {
                let parsed = Self::parse(raw, total_pages);
                if parsed.is_empty() {
                    info!(
                        "Range {:?} selects no pages of {}; using all pages",
                        raw, total_pages
                    );
                    Self::all(total_pages)
                } else {
                    parsed
                }
            }
        }
    }

    pub fn pages(&self) -> &[usize] {
        &self.pages
    }

    /// 0-indexed page numbers, for engine calls.
    pub fn to_indices(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p - 1).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Parse one token into an inclusive `(start, end)` span, or `None` if the
/// token is malformed or out of bounds.
fn parse_token(token: &str, total_pages: usize) -> Option<(usize, usize)> {
    let (start, end) = match token.split_once('-') {
        Some((start, end)) => (parse_page(start)?, parse_page(end)?),
        None => {
            let page = parse_page(token)?;
            (page, page)
        }
    };

    (start >= 1 && start <= end && end <= total_pages).then_some((start, end))
}

fn parse_page(s: &str) -> Option<usize> {
    s.trim().parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_tokens_are_merged_and_sorted() {
        assert_eq!(PageSelection::parse("1-3,2,5", 10).pages(), &[1, 2, 3, 5]);
        assert_eq!(PageSelection::parse("7, 2-4", 10).pages(), &[2, 3, 4, 7]);
    }

    #[test]
    fn reversed_range_is_empty() {
        assert!(PageSelection::parse("3-1", 10).is_empty());
    }

    #[test]
    fn out_of_bounds_tokens_are_skipped() {
        assert_eq!(PageSelection::parse("0, 4, 11, 9-12", 10).pages(), &[4]);
    }

    #[test]
    fn malformed_tokens_are_skipped() {
        let sel = PageSelection::parse("abc, 2, 3-x, -4, 1-2-3, , 6", 10);
        assert_eq!(sel.pages(), &[2, 6]);
    }

    #[test]
    fn whitespace_around_endpoints_is_allowed() {
        assert_eq!(PageSelection::parse(" 2 - 4 ", 5).pages(), &[2, 3, 4]);
    }

    #[test]
    fn output_is_strictly_ascending() {
        let sel = PageSelection::parse("9,1-3,3,8-9,2", 9);
        assert!(sel.pages().windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sel.pages(), &[1, 2, 3, 8, 9]);
    }

    #[test]
    fn resolve_falls_back_to_all_pages() {
        let mode = PageRangeMode::Custom("99, x, 5-2".into());
        assert_eq!(PageSelection::resolve(&mode, 4).pages(), &[1, 2, 3, 4]);
    }

    #[test]
    fn resolve_blank_custom_is_all_pages() {
        let mode = PageRangeMode::Custom("   ".into());
        assert_eq!(PageSelection::resolve(&mode, 3).pages(), &[1, 2, 3]);
    }

    #[test]
    fn resolve_all_mode() {
        assert_eq!(
            PageSelection::resolve(&PageRangeMode::All, 5).pages(),
            &[1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn resolve_custom_scenario() {
        let mode = PageRangeMode::Custom("2-4,7".into());
        assert_eq!(PageSelection::resolve(&mode, 10).pages(), &[2, 3, 4, 7]);
    }

    #[test]
    fn indices_are_zero_based() {
        assert_eq!(PageSelection::parse("1,3", 3).to_indices(), vec![0, 2]);
    }

    #[test]
    fn zero_page_document_selects_nothing() {
        assert!(PageSelection::all(0).is_empty());
        assert!(PageSelection::resolve(&PageRangeMode::Custom("1".into()), 0).is_empty());
    }
}
