//! Deduplication of papers fetched from several sources.
//!
//! The same article often shows up twice in one run: as an arXiv preprint and in a
//! journal feed, or in both a journal's RSS feed and CrossRef. Duplicates are matched
//! on DOI first, then on title similarity with at least one shared author.

use std::collections::HashSet;
use strsim::jaro_winkler;

use crate::models::{Paper, UNKNOWN_AUTHOR};

/// Minimum Jaro-Winkler similarity for two titles to be considered the same
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Find duplicate papers.
///
/// Returns groups of paper indices (in input order) that refer to the same work.
pub fn find_duplicates(papers: &[Paper]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for (i, paper_i) in papers.iter().enumerate() {
        if processed.contains(&i) {
            continue;
        }

        let mut group = vec![i];
        for (j, paper_j) in papers.iter().enumerate().skip(i + 1) {
            if !processed.contains(&j) && are_duplicates(paper_i, paper_j) {
                group.push(j);
                processed.insert(j);
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }
        processed.insert(i);
    }

    groups
}

/// Remove duplicates, keeping the first occurrence of each group
pub fn deduplicate_papers(papers: Vec<Paper>) -> Vec<Paper> {
    let to_remove: HashSet<usize> = find_duplicates(&papers)
        .into_iter()
        .flat_map(|group| group.into_iter().skip(1))
        .collect();

    if to_remove.is_empty() {
        return papers;
    }

    tracing::debug!("Removing {} duplicate papers", to_remove.len());
    papers
        .into_iter()
        .enumerate()
        .filter(|(i, _)| !to_remove.contains(i))
        .map(|(_, p)| p)
        .collect()
}

fn are_duplicates(a: &Paper, b: &Paper) -> bool {
    // A single source never lists the same work twice
    if a.source == b.source {
        return false;
    }

    if let (Some(doi_a), Some(doi_b)) = (&a.doi, &b.doi) {
        if !doi_a.is_empty() && doi_a.eq_ignore_ascii_case(doi_b) {
            return true;
        }
    }

    let title_a = normalize_title(&a.title);
    let title_b = normalize_title(&b.title);

    (title_a == title_b || jaro_winkler(&title_a, &title_b) >= TITLE_SIMILARITY_THRESHOLD)
        && authors_match(a, b)
}

/// At least one author in common; missing author info counts as a match
fn authors_match(a: &Paper, b: &Paper) -> bool {
    let authors_a = author_set(a);
    let authors_b = author_set(b);

    if authors_a.is_empty() || authors_b.is_empty() {
        return true;
    }
    !authors_a.is_disjoint(&authors_b)
}

fn author_set(paper: &Paper) -> HashSet<String> {
    paper
        .authors
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && s != &UNKNOWN_AUTHOR.to_lowercase())
        .collect()
}

fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
