use std::collections::HashSet;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::catalog::CatalogEntry;
use crate::config::CatalogConfig;

/// Minimum normalized similarity for a title to count as an estimated match.
const SIMILARITY_THRESHOLD: f64 = 0.5;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    /// Include titles that literally contain the query.
    pub match_exact: bool,
    /// Additionally include fuzzy matches ranked by similarity.
    pub match_estimate: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            match_exact: true,
            match_estimate: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    entries: Vec<CatalogEntry>,
}

pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, SearchError> {
        Self::with_base_url(&config.url, config.timeout())
    }

    /// Create a client with an explicit base URL (for testing)
    pub fn with_base_url(
        base_url: &str,
        timeout: std::time::Duration,
    ) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Search the catalog for titles matching `query`.
    ///
    /// The service returns a candidate set; classification into exact and
    /// estimated matches, ranking and duplicate suppression all happen
    /// locally so the ordering is reproducible for a given catalog state.
    /// An empty result is not an error, it means "no matches".
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<CatalogEntry>, SearchError> {
        let (title, year) = parse_query_title(query);

        let mut url = format!(
            "{}/api/search?q={}",
            self.base_url,
            urlencoding::encode(&title)
        );
        if let Some(y) = year {
            url.push_str(&format!("&year={}", y));
        }

        debug!(query = %title, year, "searching catalog");

        let response: SearchResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ranked = rank_entries(&title, options, response.entries);
        debug!(count = ranked.len(), "search complete");
        Ok(ranked)
    }
}

/// Classify and order candidate entries for a query.
///
/// Exact matches keep catalog order and come first; estimated matches follow,
/// ordered by descending similarity with id as tiebreaker. An id seen as an
/// exact match never reappears as an estimated one.
fn rank_entries(
    query: &str,
    options: &SearchOptions,
    candidates: Vec<CatalogEntry>,
) -> Vec<CatalogEntry> {
    let needle = query.trim().to_lowercase();

    let mut exact: Vec<CatalogEntry> = Vec::new();
    let mut exact_ids: HashSet<String> = HashSet::new();
    let mut estimated: Vec<(f64, CatalogEntry)> = Vec::new();

    for entry in candidates {
        let title = entry.name.to_lowercase();

        if options.match_exact && title.contains(&needle) {
            if exact_ids.insert(entry.id.clone()) {
                estimated.retain(|(_, e)| e.id != entry.id);
                exact.push(entry);
            }
            continue;
        }

        if options.match_estimate {
            let score = similarity(&needle, &title);
            if score >= SIMILARITY_THRESHOLD
                && !exact_ids.contains(&entry.id)
                && !estimated.iter().any(|(_, e)| e.id == entry.id)
            {
                estimated.push((score, entry));
            }
        }
    }

    estimated.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    exact.extend(estimated.into_iter().map(|(_, e)| e));
    exact
}

/// Normalized similarity in [0, 1] based on edit distance.
fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let dist = levenshtein(&a, &b);
    1.0 - dist as f64 / a.len().max(b.len()) as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Try to split a trailing parenthesized year off a query
/// e.g. "The Matrix (1999)" -> ("The Matrix", Some(1999))
pub fn parse_query_title(raw: &str) -> (String, Option<u16>) {
    let trimmed = raw.trim();

    let year_regex = regex::Regex::new(r"\(((19|20)\d{2})\)\s*$").ok();
    if let Some(re) = year_regex
        && let Some(caps) = re.captures(trimmed)
    {
        let year = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let title = trimmed[..caps.get(0).map_or(trimmed.len(), |m| m.start())]
            .trim()
            .to_string();
        if !title.is_empty() {
            return (title, year);
        }
    }

    (trimmed.to_string(), None)
}
