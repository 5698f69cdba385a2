/// Page-number pagination for post listings
///
/// `?page=` is parsed leniently: a missing or non-numeric value is page 1.
/// Any number outside `1..=num_pages`, including zero and negatives, is the
/// last page.
use serde::Deserialize;

/// Raw `?page=` query parameter.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Requested page number before clamping; 1 when absent or not an integer.
    pub fn requested(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

/// A resolved page within a listing of `total` items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub number: i64,
    pub per_page: i64,
    pub total: i64,
}

impl PageRequest {
    pub fn resolve(requested: i64, per_page: i64, total: i64) -> Self {
        let per_page = per_page.max(1);
        let total = total.max(0);
        let num_pages = num_pages(total, per_page);
        let number = if (1..=num_pages).contains(&requested) {
            requested
        } else {
            num_pages
        };
        Self {
            number,
            per_page,
            total,
        }
    }

    pub fn num_pages(&self) -> i64 {
        num_pages(self.total, self.per_page)
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// A numbered link in the paginator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLink {
    pub number: i64,
    pub current: bool,
}

/// One page of items plus the navigation state templates need.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest) -> Self {
        Self {
            items,
            number: request.number,
            num_pages: request.num_pages(),
            total: request.total,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    pub fn next_page_number(&self) -> i64 {
        self.number + 1
    }

    pub fn previous_page_number(&self) -> i64 {
        self.number - 1
    }

    pub fn page_range(&self) -> Vec<i64> {
        (1..=self.num_pages).collect()
    }

    pub fn links(&self) -> Vec<PageLink> {
        self.page_range()
            .into_iter()
            .map(|number| PageLink {
                number,
                current: number == self.number,
            })
            .collect()
    }
}

/// Empty listings still have one (empty) page.
fn num_pages(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    }
}
