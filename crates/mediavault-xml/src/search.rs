use mediavault_core::ListedEntry;

/// Filter entries whose leaf name or full path contains `pattern`,
/// ignoring case. An empty pattern matches everything.
///
/// # Examples
///
/// ```
/// use mediavault_core::ListedEntry;
/// use mediavault_xml::search_by_name_pattern;
///
/// let entries = vec![ListedEntry::directory("youth/"), ListedEntry::directory("adult/")];
/// let hits = search_by_name_pattern(&entries, "YOUTH");
/// assert_eq!(hits.len(), 1);
/// assert_eq!(hits[0].name, "youth");
/// ```
#[must_use]
pub fn search_by_name_pattern(entries: &[ListedEntry], pattern: &str) -> Vec<ListedEntry> {
    let needle = pattern.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| {
            needle.is_empty()
                || entry.name.to_lowercase().contains(&needle)
                || entry.path.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}
