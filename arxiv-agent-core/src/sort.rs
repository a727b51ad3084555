//! Result ordering for the service layer and CLI.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::PaperRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    Published,
    Updated,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortKey {
    /// Accepts `published`, `updated`, `title` in any case, plus the
    /// display labels `Published Date` / `Updated Date`.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "published" | "published date" | "published_date" | "date" => Some(SortKey::Published),
            "updated" | "updated date" | "updated_date" => Some(SortKey::Updated),
            "title" => Some(SortKey::Title),
            _ => None,
        }
    }
}

impl SortOrder {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "oldest" => Some(SortOrder::Ascending),
            "desc" | "descending" | "newest" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// Sort papers in place. The sort is stable.
///
/// Records missing the timestamp being sorted on go last in either order.
pub fn sort_papers(papers: &mut [PaperRecord], key: SortKey, order: SortOrder) {
    papers.sort_by(|a, b| compare(a, b, key, order));
}

fn compare(a: &PaperRecord, b: &PaperRecord, key: SortKey, order: SortOrder) -> Ordering {
    let directed = |ord: Ordering| match order {
        SortOrder::Ascending => ord,
        SortOrder::Descending => ord.reverse(),
    };
    match key {
        SortKey::Title => directed(
            a.title
                .to_lowercase()
                .cmp(&b.title.to_lowercase())
                .then_with(|| a.title.cmp(&b.title)),
        ),
        SortKey::Published | SortKey::Updated => {
            let (ta, tb) = if key == SortKey::Published {
                (a.published, b.published)
            } else {
                (a.updated, b.updated)
            };
            match (ta, tb) {
                (Some(x), Some(y)) => directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn paper(title: &str, published: Option<&str>, updated: Option<&str>) -> PaperRecord {
        let ts = |s: &str| s.parse::<DateTime<Utc>>().unwrap();
        PaperRecord {
            title: title.into(),
            authors: vec![],
            summary: String::new(),
            published: published.map(ts),
            updated: updated.map(ts),
            id: format!("http://arxiv.org/abs/{title}"),
            pdf_url: None,
            categories: Default::default(),
        }
    }

    fn titles(papers: &[PaperRecord]) -> Vec<&str> {
        papers.iter().map(|p| p.title.as_str()).collect()
    }

    fn sample() -> Vec<PaperRecord> {
        vec![
            paper("beta", Some("2024-01-02T00:00:00Z"), None),
            paper("Alpha", Some("2024-03-01T00:00:00Z"), Some("2024-04-01T00:00:00Z")),
            paper("gamma", None, Some("2024-02-01T00:00:00Z")),
            paper("delta", Some("2023-12-31T00:00:00Z"), None),
        ]
    }

    #[test]
    fn test_published_newest_first() {
        let mut papers = sample();
        sort_papers(&mut papers, SortKey::Published, SortOrder::Descending);
        assert_eq!(titles(&papers), vec!["Alpha", "beta", "delta", "gamma"]);
    }

    #[test]
    fn test_published_oldest_first_missing_still_last() {
        let mut papers = sample();
        sort_papers(&mut papers, SortKey::Published, SortOrder::Ascending);
        assert_eq!(titles(&papers), vec!["delta", "beta", "Alpha", "gamma"]);
    }

    #[test]
    fn test_updated_missing_last() {
        let mut papers = sample();
        sort_papers(&mut papers, SortKey::Updated, SortOrder::Descending);
        assert_eq!(titles(&papers), vec!["Alpha", "gamma", "beta", "delta"]);
    }

    #[test]
    fn test_title_case_insensitive() {
        let mut papers = sample();
        sort_papers(&mut papers, SortKey::Title, SortOrder::Ascending);
        assert_eq!(titles(&papers), vec!["Alpha", "beta", "delta", "gamma"]);
        sort_papers(&mut papers, SortKey::Title, SortOrder::Descending);
        assert_eq!(titles(&papers), vec!["gamma", "delta", "beta", "Alpha"]);
    }

    #[test]
    fn test_loose_parsing() {
        assert_eq!(SortKey::from_str_loose("Published Date"), Some(SortKey::Published));
        assert_eq!(SortKey::from_str_loose(" TITLE "), Some(SortKey::Title));
        assert_eq!(SortKey::from_str_loose("relevance"), None);
        assert_eq!(SortOrder::from_str_loose("newest"), Some(SortOrder::Descending));
        assert_eq!(SortOrder::from_str_loose("asc"), Some(SortOrder::Ascending));
        assert_eq!(SortOrder::from_str_loose("sideways"), None);
    }
}
