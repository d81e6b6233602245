//! Pending-route queue shared between discovery and dispatch.
//!
//! Populated exactly once. `pop` is a single lock-free step on a
//! `SegQueue`, so two callers can never receive the same route, and once
//! populated an empty pop always means "no more work".

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::queue::SegQueue;
use rustc_hash::FxHashSet;

use crate::core::RoutePath;

#[derive(Debug, Default)]
pub struct PageQueue {
    routes: SegQueue<RoutePath>,
    populated: AtomicBool,
}

impl PageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the page set. Returns `false` (and ignores `routes`) when the
    /// queue was already populated.
    pub fn populate(&self, routes: impl IntoIterator<Item = RoutePath>) -> bool {
        if self.populated.swap(true, Ordering::AcqRel) {
            return false;
        }
        for route in routes {
            self.routes.push(route);
        }
        true
    }

    #[inline]
    pub fn pop(&self) -> Option<RoutePath> {
        self.routes.pop()
    }

    #[inline]
    pub fn is_populated(&self) -> bool {
        self.populated.load(Ordering::Acquire)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Page set for one build: the not-found route first, then every discovered
/// route once, in discovery order.
pub fn page_set(discovered: impl IntoIterator<Item = RoutePath>) -> Vec<RoutePath> {
    let not_found = RoutePath::not_found();
    let mut seen = FxHashSet::default();
    seen.insert(not_found.clone());

    let mut pages = vec![not_found];
    pages.extend(discovered.into_iter().filter(|route| seen.insert(route.clone())));
    pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_page_set_prepends_not_found() {
        let pages = page_set([RoutePath::new("/about"), RoutePath::new("/blog/post-1")]);
        assert_eq!(pages.len(), 3);
        assert!(pages[0].is_not_found());
        assert_eq!(pages[1].as_str(), "/about");
    }

    #[test]
    fn test_page_set_dedups_not_found_and_repeats() {
        let pages = page_set([
            RoutePath::new("/about"),
            RoutePath::not_found(),
            RoutePath::new("about/"),
        ]);
        assert_eq!(pages, vec![RoutePath::not_found(), RoutePath::new("/about")]);
    }

    #[test]
    fn test_page_set_one_entry_per_output_file() {
        let output = std::path::Path::new("/dist");
        let pages = page_set([
            RoutePath::new("/a/b"),
            RoutePath::new("/a//b"),
            RoutePath::new("/a/./b"),
        ]);
        assert_eq!(pages.len(), 2);

        let files: FxHashSet<_> = pages.iter().filter_map(|p| p.page_file(output)).collect();
        assert_eq!(files.len(), pages.len());
    }

    #[test]
    fn test_page_set_empty_discovery() {
        let pages = page_set([]);
        assert_eq!(pages, vec![RoutePath::not_found()]);
    }

    #[test]
    fn test_populate_once() {
        let queue = PageQueue::new();
        assert!(!queue.is_populated());
        assert!(queue.populate([RoutePath::new("/a")]));
        assert!(!queue.populate([RoutePath::new("/b")]));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop(), Some(RoutePath::new("/a")));
        assert_eq!(queue.pop(), None);
        assert!(queue.is_populated());
    }

    #[test]
    fn test_concurrent_pops_are_unique() {
        let queue = Arc::new(PageQueue::new());
        queue.populate((0..2000).map(|i| RoutePath::new(&format!("/p/{i}"))));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    let mut got = Vec::new();
                    while let Some(route) = queue.pop() {
                        got.push(route);
                    }
                    got
                })
            })
            .collect();

        let mut all: Vec<RoutePath> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(total, 2000);
        assert_eq!(all.len(), 2000);
    }
}
