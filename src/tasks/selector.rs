use crate::models::SearchResult;
use tracing::debug;

pub const DEFAULT_MAX_SOURCES: usize = 5;

/// Picks which URLs get fetched.
///
/// Selection is a plain prefix of the aggregated list; relevance scores are
/// carried through but deliberately not used to reorder.
pub struct SourceSelector;

impl SourceSelector {
    pub fn select(results: &[SearchResult], max_count: usize) -> Vec<String> {
        let urls: Vec<String> = results
            .iter()
            .take(max_count)
            .map(|r| r.url.clone())
            .collect();
        debug!("Selected {} of {} URLs", urls.len(), results.len());
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(n: usize) -> Vec<SearchResult> {
        (0..n)
            .map(|i| SearchResult {
                url: format!("https://site{}.com", i),
                title: format!("Site {}", i),
                snippet: String::new(),
                // Later entries score higher; selection must ignore that.
                relevance_score: i as f64,
                origin_sub_query: "q".to_string(),
            })
            .collect()
    }

    #[test]
    fn returns_prefix_of_requested_size() {
        let input = results(8);
        let selected = SourceSelector::select(&input, 5);
        assert_eq!(selected.len(), 5);
        for (url, result) in selected.iter().zip(&input) {
            assert_eq!(url, &result.url);
        }
    }

    #[test]
    fn fewer_results_than_requested_returns_all() {
        assert_eq!(SourceSelector::select(&results(2), 5).len(), 2);
        assert!(SourceSelector::select(&[], 5).is_empty());
    }

    #[test]
    fn zero_max_count_selects_nothing() {
        assert!(SourceSelector::select(&results(3), 0).is_empty());
    }
}
