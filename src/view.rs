//! Review list state: filters and pagination.
//!
//! `ViewState` only changes through [`ViewState::apply`]; everything shown on
//! screen is derived from it and the current review list.

use unicode_normalization::UnicodeNormalization;

use crate::models::{Review, Sentiment};

pub const PAGE_SIZES: [usize; 3] = [10, 20, 30];
pub const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewAction {
    SetSearch(String),
    SelectHospital(Option<String>),
    SelectSentiment(Option<Sentiment>),
    ClearFilters,
    SetPage(usize),
    NextPage,
    PrevPage,
    SetPageSize(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search: String,
    pub hospital: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub page: usize, // 1-based
    pub page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(PAGE_SIZES[0])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView<'a> {
    pub items: Vec<&'a Review>,
    pub page: usize,
    pub total_pages: usize,
    pub range_start: usize, // 1-based, inclusive; 0 when empty
    pub range_end: usize,
    pub total: usize,
    pub window: Vec<usize>,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        Self {
            search: String::new(),
            hospital: None,
            sentiment: None,
            page: 1,
            page_size: normalize_page_size(page_size),
        }
    }

    /// `filtered_len` is the size of the currently filtered list, used to clamp page moves.
    pub fn apply(&mut self, action: ViewAction, filtered_len: usize) {
        match action {
            ViewAction::SetSearch(q) => {
                self.search = q;
                self.page = 1;
            }
            ViewAction::SelectHospital(h) => {
                self.hospital = h;
                self.page = 1;
            }
            ViewAction::SelectSentiment(s) => {
                self.sentiment = s;
                self.page = 1;
            }
            ViewAction::ClearFilters => {
                self.search.clear();
                self.hospital = None;
                self.sentiment = None;
                self.page = 1;
            }
            ViewAction::SetPageSize(n) => {
                self.page_size = normalize_page_size(n);
                self.page = 1;
            }
            ViewAction::SetPage(p) => self.page = p.clamp(1, self.total_pages(filtered_len)),
            ViewAction::NextPage => {
                self.page = (self.page + 1).min(self.total_pages(filtered_len));
            }
            ViewAction::PrevPage => self.page = self.page.saturating_sub(1).max(1),
        }
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search.is_empty() || self.hospital.is_some() || self.sentiment.is_some()
    }

    /// Never below 1, so an empty list still has a page to show.
    pub fn total_pages(&self, len: usize) -> usize {
        len.div_ceil(self.page_size).max(1)
    }

    pub fn matches(&self, r: &Review) -> bool {
        if !self.search.is_empty() && !fold(&r.hospital_name).contains(&fold(&self.search)) {
            return false;
        }
        if let Some(h) = &self.hospital {
            if &r.hospital_name != h {
                return false;
            }
        }
        if let Some(s) = self.sentiment {
            if r.overall_sentiment != s {
                return false;
            }
        }
        true
    }

    pub fn filter<'a>(&self, reviews: &'a [Review]) -> Vec<&'a Review> {
        reviews.iter().filter(|r| self.matches(r)).collect()
    }

    pub fn paginate<'a>(&self, filtered: &[&'a Review]) -> PageView<'a> {
        let total = filtered.len();
        let total_pages = self.total_pages(total);
        let page = self.page.clamp(1, total_pages);
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(total);
        let items = filtered.get(start..end).map(<[_]>::to_vec).unwrap_or_default();

        PageView {
            items,
            page,
            total_pages,
            range_start: if total == 0 { 0 } else { start + 1 },
            range_end: end,
            total,
            window: page_window(page, total_pages),
        }
    }
}

fn normalize_page_size(n: usize) -> usize {
    if PAGE_SIZES.contains(&n) {
        n
    } else {
        PAGE_SIZES[0]
    }
}

fn fold(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// Up to five page numbers around `page`, pinned to the ends near the edges.
pub fn page_window(page: usize, total_pages: usize) -> Vec<usize> {
    if total_pages <= PAGE_WINDOW {
        return (1..=total_pages).collect();
    }
    let first = if page <= 3 {
        1
    } else if page >= total_pages - 2 {
        total_pages - PAGE_WINDOW + 1
    } else {
        page - 2
    };
    (first..first + PAGE_WINDOW).collect()
}
