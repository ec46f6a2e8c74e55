use url::form_urlencoded;

use porter_logging::porter_warn;

use crate::filter::FilterKey;
use crate::sort::SortKey;

/// Deep-linkable slice state carried in the URL query string.
///
/// Selection is deliberately excluded; only filter, sort, and search
/// round-trip through a link.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryState {
    pub filter: FilterKey,
    pub sort: SortKey,
    pub search: String,
}

/// Encodes only non-default fields, so a default state yields `""`.
pub fn encode_query(state: &QueryState) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if state.filter != FilterKey::default() {
        serializer.append_pair("filter", state.filter.as_str());
    }
    if state.sort != SortKey::default() {
        serializer.append_pair("sort", state.sort.as_str());
    }
    if !state.search.is_empty() {
        serializer.append_pair("q", &state.search);
    }
    serializer.finish()
}

/// Parses a query string leniently: unknown keys are ignored, invalid
/// values fall back to the default with a warning, and `search` is
/// accepted as an alias of `q`. A leading `?` is tolerated.
pub fn decode_query(query: &str) -> QueryState {
    let raw = query.strip_prefix('?').unwrap_or(query);
    let mut state = QueryState::default();
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match key.as_ref() {
            "filter" => match value.parse::<FilterKey>() {
                Ok(filter) => state.filter = filter,
                Err(err) => porter_warn!("query string: {}", err),
            },
            "sort" => match value.parse::<SortKey>() {
                Ok(sort) => state.sort = sort,
                Err(err) => porter_warn!("query string: {}", err),
            },
            "q" | "search" => state.search = value.trim().to_string(),
            _ => {}
        }
    }
    state
}
