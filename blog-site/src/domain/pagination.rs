use serde::Serialize;

use crate::domain::error::DomainError;

/// Records per listing page.
pub const PAGE_SIZE: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(total: u64, per_page: u64) -> Self {
        Self {
            total,
            per_page: per_page.max(1),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// An empty result still has one (empty) page.
    pub fn num_pages(&self) -> u64 {
        self.total.div_ceil(self.per_page).max(1)
    }

    /// Turns the raw `?page=` value into a page number. Accepts a
    /// positive integer or `last`.
    pub fn resolve(&self, raw: Option<&str>) -> Result<u64, DomainError> {
        let raw = raw.map(str::trim).unwrap_or("");
        let number = match raw {
            "" => 1,
            "last" => self.num_pages(),
            other => other
                .parse::<u64>()
                .map_err(|_| DomainError::InvalidPage(other.to_string()))?,
        };
        if number == 0 || number > self.num_pages() {
            return Err(DomainError::InvalidPage(raw.to_string()));
        }
        Ok(number)
    }

    pub fn offset(&self, number: u64) -> u64 {
        number.saturating_sub(1) * self.per_page
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
    pub is_paginated: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, number: u64, paginator: &Paginator) -> Self {
        let num_pages = paginator.num_pages();
        let has_next = number < num_pages;
        let has_previous = number > 1;
        Self {
            items,
            number,
            num_pages,
            total: paginator.total(),
            per_page: paginator.per_page(),
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then(|| number - 1),
            is_paginated: num_pages > 1,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 1, &Paginator::new(0, PAGE_SIZE))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_records_make_two_pages() {
        let paginator = Paginator::new(5, PAGE_SIZE);
        assert_eq!(paginator.num_pages(), 2);
        assert_eq!(paginator.resolve(None).unwrap(), 1);
        assert_eq!(paginator.resolve(Some("2")).unwrap(), 2);
        assert_eq!(paginator.resolve(Some("last")).unwrap(), 2);
        assert_eq!(paginator.offset(2), 4);

        let page = Page::new(vec![1, 2, 3, 4], 1, &paginator);
        assert!(page.is_paginated);
        assert!(page.has_next);
        assert_eq!(page.next_page_number, Some(2));
        assert_eq!(page.previous_page_number, None);
    }

    #[test]
    fn out_of_range_and_garbage_pages_are_rejected() {
        let paginator = Paginator::new(5, PAGE_SIZE);
        assert!(matches!(
            paginator.resolve(Some("3")),
            Err(DomainError::InvalidPage(_))
        ));
        assert!(paginator.resolve(Some("0")).is_err());
        assert!(paginator.resolve(Some("-1")).is_err());
        assert!(paginator.resolve(Some("two")).is_err());
    }

    #[test]
    fn empty_result_has_a_single_page() {
        let paginator = Paginator::new(0, PAGE_SIZE);
        assert_eq!(paginator.num_pages(), 1);
        assert_eq!(paginator.resolve(Some("1")).unwrap(), 1);
        assert!(paginator.resolve(Some("2")).is_err());

        let page: Page<u8> = Page::empty();
        assert!(!page.is_paginated);
        assert!(page.is_empty());
    }
}
