//! Free-text filtering over already-fetched listings.

/// Items that can be matched by a free-text query.
pub trait Searchable {
    /// The text fields a query is matched against.
    fn search_fields(&self) -> Vec<&str>;
}

/// Case-insensitive substring match of `query` against any field of `item`.
/// A blank query matches everything.
pub fn matches_query<T: Searchable + ?Sized>(item: &T, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Keeps the items matching `query`, preserving order.
pub fn filter_by_query<T: Searchable>(items: Vec<T>, query: Option<&str>) -> Vec<T> {
    match query {
        Some(q) if !q.trim().is_empty() => items
            .into_iter()
            .filter(|item| matches_query(item, q))
            .collect(),
        _ => items,
    }
}

/// Splits comma-separated input into trimmed, non-empty values.
pub fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Trims each value and drops the empty ones.
pub fn normalize_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}
