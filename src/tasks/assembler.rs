use crate::models::{AssembledContext, ContextSegment, FetchResult};
use tracing::{debug, info};

pub const DEFAULT_GLOBAL_BUDGET: usize = 32_000;
pub const DEFAULT_PER_SOURCE_BUDGET: usize = 6_000;

/// Packs fetched content into a bounded, attributed context.
pub struct ContextAssembler;

impl ContextAssembler {
    /// Segments are admitted in input order. Each source is cut to
    /// `per_source_budget` characters first. The running total (segment text
    /// plus its citation header) is checked after each admission, so the
    /// first usable source is always kept, the segment that crosses
    /// `global_budget` is kept, and everything after it is dropped.
    ///
    /// Only failures and sources with no text at all are skipped;
    /// whitespace-only text is kept as is.
    ///
    /// `total_chars` reports admitted segment text only. It is below
    /// `global_budget` before the last admission, hence never above
    /// `global_budget + per_source_budget`.
    pub fn assemble(
        query: &str,
        fetch_results: &[FetchResult],
        global_budget: usize,
        per_source_budget: usize,
    ) -> AssembledContext {
        let mut context = AssembledContext::empty(query);
        let mut running = 0usize;

        for result in fetch_results {
            let FetchResult::Success { url, title, content } = result else {
                continue;
            };
            if content.is_empty() {
                continue;
            }

            let text = truncate_chars(content, per_source_budget);
            let segment = ContextSegment {
                source_title: title.clone(),
                source_url: url.clone(),
                text: text.to_string(),
            };

            let text_chars = text.chars().count();
            running += segment.header().chars().count() + text_chars;
            context.total_chars += text_chars;
            context.segments.push(segment);

            if running >= global_budget {
                debug!("Global budget reached, dropping remaining sources");
                break;
            }
        }

        info!(
            "Assembled {} segment(s), {} chars of source text",
            context.segments.len(),
            context.total_chars
        );
        context
    }
}

/// The longest prefix of `s` holding at most `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
