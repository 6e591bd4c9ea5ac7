//! Deterministic page and sort selection for catalog discovery.
//!
//! Identical seeds always land on the same page and ordering, while distinct
//! moods spread across the first few result pages.

use sha2::{Digest, Sha256};
use std::fmt::Display;

/// Number of discovery pages a seed can land on
pub const MAX_PAGES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Popularity,
    VoteAverage,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Popularity => "popularity.desc",
            SortOrder::VoteAverage => "vote_average.desc",
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Page in `1..=max_pages` taken from the first 8 hex digits of SHA-256(seed)
pub fn pick_page(seed: &str, max_pages: u32) -> u32 {
    let digest = Sha256::digest(seed.as_bytes());
    // The first 8 hex digits are exactly the first 4 bytes, big-endian
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix % max_pages + 1
}

/// Vote average when the first code point is even, popularity otherwise
pub fn pick_sort(seed: &str) -> SortOrder {
    match seed.chars().next() {
        Some(c) if (c as u32) % 2 == 0 => SortOrder::VoteAverage,
        _ => SortOrder::Popularity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_page_known_values() {
        assert_eq!(pick_page("feliz", MAX_PAGES), 4);
        assert_eq!(pick_page("triste", MAX_PAGES), 1);
        assert_eq!(pick_page("quero algo leve e inspirador", MAX_PAGES), 3);
        assert_eq!(pick_page("b", MAX_PAGES), 2);
        assert_eq!(pick_page("ação", MAX_PAGES), 1);
    }

    #[test]
    fn test_pick_sort_known_values() {
        assert_eq!(pick_sort("feliz"), SortOrder::VoteAverage);
        assert_eq!(pick_sort("a"), SortOrder::Popularity);
        assert_eq!(pick_sort("b"), SortOrder::VoteAverage);
        assert_eq!(pick_sort("ação"), SortOrder::Popularity);
    }

    #[test]
    fn test_empty_seed_sorts_by_popularity() {
        assert_eq!(pick_sort(""), SortOrder::Popularity);
        let page = pick_page("", MAX_PAGES);
        assert!((1..=MAX_PAGES).contains(&page));
    }

    #[test]
    fn test_seed_functions_are_pure() {
        let seeds = ["feliz", "triste", "medo", "", "😀 animado"];
        let first: Vec<_> = seeds
            .iter()
            .map(|s| (pick_page(s, MAX_PAGES), pick_sort(s)))
            .collect();
        let reversed: Vec<_> = seeds
            .iter()
            .rev()
            .map(|s| (pick_page(s, MAX_PAGES), pick_sort(s)))
            .collect();

        let mut reversed = reversed;
        reversed.reverse();
        assert_eq!(first, reversed);
    }

    #[test]
    fn test_page_always_in_range() {
        for i in 0..200 {
            let page = pick_page(&format!("mood-{}", i), MAX_PAGES);
            assert!((1..=MAX_PAGES).contains(&page));
        }
    }
}
