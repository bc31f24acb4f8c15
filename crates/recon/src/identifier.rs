use crate::matcher::{find_column, ColumnMatcher};

/// Pick the join-key column.
///
/// An explicit column name wins when it exists (trimmed, exact). Otherwise
/// the matcher list is applied: canonical names first, then keyword scan.
pub fn resolve_identifier(
    columns: &[String],
    explicit: Option<&str>,
    matchers: &[ColumnMatcher],
) -> Option<String> {
    if let Some(name) = explicit {
        let name = name.trim();
        return columns.iter().find(|c| c.trim() == name).cloned();
    }
    find_column(matchers, columns).map(str::to_string)
}
