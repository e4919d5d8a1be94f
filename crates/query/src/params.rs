//! Untrusted request parameters for one query operation.

/// The flat parameter set parsed from an API request.
///
/// Values arrive as raw strings; validation against the resource's
/// whitelists happens inside the query builder, not here. Filter order
/// is preserved because filters apply in the order they were supplied.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct QueryParams {
    /// Filter name/value pairs, in request order.
    pub filters: Vec<(String, String)>,

    /// Requested include names.
    pub includes: Vec<String>,

    /// Requested output field names.
    pub fields: Vec<String>,

    /// Sort tokens; a leading `-` means descending.
    pub sorts: Vec<String>,

    /// Free-text search query.
    pub search: Option<String>,
}

/// Split a comma-separated request value into trimmed entries.
///
/// Empty entries are kept; the builder treats them as absent so that
/// `"a,,b"` behaves identically to `"a,b"` without tripping validation.
pub fn comma_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn comma_list_trims_entries() {
        assert_eq!(comma_list("owner, versions"), vec!["owner", "versions"]);
    }

    #[test]
    fn comma_list_keeps_empty_entries() {
        assert_eq!(comma_list("owner,,"), vec!["owner", "", ""]);
    }

    #[test]
    fn params_default_is_empty() {
        let params = QueryParams::default();
        assert!(params.filters.is_empty());
        assert!(params.search.is_none());
    }
}
