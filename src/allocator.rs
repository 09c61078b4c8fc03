//! DOI suffix allocation
//!
//! Suffixes are `YY.NNNN`: the lowest unused four-digit counter for the
//! current two-digit year, computed from the sibling names already present
//! in the allocation scope. There is no atomic reservation here - the
//! orchestrator uses the storage service's `create_node` as the effective
//! compare-and-set and re-runs the allocator with a fresh sibling listing
//! when the target name already exists.

use crate::config::DoiConfig;
use crate::errors::DoiResult;
use crate::identifiers::DoiSuffix;
use chrono::Local;
use rand::Rng;

/// Alphabet for test-mode suffixes; excludes look-alike characters
const TEST_SUFFIX_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyz1234567890";

/// Computes the next unused DOI suffix for the current year
#[derive(Debug, Clone)]
pub struct IdentifierAllocator {
    prefix: String,
    random_test_id: bool,
}

impl IdentifierAllocator {
    /// Build an allocator from the site configuration
    pub fn new(config: &DoiConfig) -> Self {
        Self {
            prefix: config.identifier_prefix.clone(),
            random_test_id: config.random_test_id,
        }
    }

    /// Compute the next suffix given the sibling names currently present
    ///
    /// In random-test-id mode the counter is bypassed entirely and the
    /// sibling set is ignored.
    pub fn allocate(&self, siblings: &[String]) -> DoiResult<DoiSuffix> {
        let raw = if self.random_test_id {
            let suffix = random_test_suffix();
            tracing::warn!(%suffix, "random DOI suffix");
            suffix
        } else {
            let suffix = next_counter_suffix(siblings, &current_year());
            tracing::debug!(%suffix, "next DOI suffix");
            suffix
        };
        DoiSuffix::new(format!("{}{}", self.prefix, raw))
    }
}

/// Current two-digit year used as the counter scope
pub fn current_year() -> String {
    Local::now().format("%y").to_string()
}

/// Lowest unused counter for `year`, formatted `YY.NNNN`
///
/// Sibling names are parsed on their first `.`; names whose left part is a
/// different year, or whose right part is not an integer, are not DOI
/// allocations and are skipped.
pub fn next_counter_suffix(siblings: &[String], year: &str) -> String {
    let mut max = 0u32;
    for name in siblings {
        if let Some((left, right)) = name.split_once('.') {
            if left == year {
                if let Ok(counter) = right.parse::<u32>() {
                    max = max.max(counter);
                }
            }
        }
    }
    format!("{}.{:04}", year, max + 1)
}

/// Random filename-safe suffix for non-production environments:
/// five characters, a separator, five characters, and a `.test` marker
pub fn random_test_suffix() -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(17);
    for i in 0..11 {
        if i == 5 {
            out.push('-');
        } else {
            let index = rng.gen_range(0..TEST_SUFFIX_ALPHABET.len());
            out.push(TEST_SUFFIX_ALPHABET[index] as char);
        }
    }
    out.push_str(".test");
    out
}
