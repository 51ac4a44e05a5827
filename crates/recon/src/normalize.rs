//! Column renaming and row filtering, applied to each role before extraction.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::{ColumnRename, RangeFilter, RoleConfig, RowFilter};
use crate::error::ReconError;
use crate::model::{Role, Table};

/// Rename headers through a one-step mapping.
///
/// Headers not in the mapping are kept. Entries whose source column is
/// absent are skipped, so the same table can serve several export layouts.
pub fn rename_columns(table: &Table, renames: &[ColumnRename]) -> Table {
    let lookup: HashMap<&str, &str> = renames
        .iter()
        .map(|r| (r.from.as_str(), r.to.as_str()))
        .collect();

    for r in renames {
        if table.column_index(&r.from).is_none() {
            debug!(from = %r.from, to = %r.to, "rename source absent, skipped");
        }
    }

    let headers = table
        .headers
        .iter()
        .map(|h| lookup.get(h.as_str()).map(|to| to.to_string()).unwrap_or_else(|| h.clone()))
        .collect();

    Table {
        headers,
        rows: table.rows.clone(),
    }
}

/// Keep rows whose filter column holds one of the listed values.
pub fn filter_rows(role: Role, table: Table, filter: &RowFilter) -> Result<Table, ReconError> {
    if filter.is_passthrough() {
        return Ok(table);
    }

    let idx = table
        .column_index(&filter.column)
        .ok_or_else(|| ReconError::MissingColumn {
            role,
            column: filter.column.clone(),
        })?;

    let before = table.rows.len();
    let rows: Vec<Vec<String>> = table
        .rows
        .into_iter()
        .filter(|row| {
            let val = row.get(idx).map(|s| s.trim()).unwrap_or("");
            filter.values.iter().any(|v| v == val)
        })
        .collect();

    debug!(%role, column = %filter.column, kept = rows.len(), dropped = before - rows.len(), "row filter applied");

    Ok(Table {
        headers: table.headers,
        rows,
    })
}

/// Keep rows whose range column value lies within the inclusive bounds.
/// Blank or unparseable cells fall outside every range.
pub fn filter_range(role: Role, table: Table, range: &RangeFilter) -> Result<Table, ReconError> {
    let bounds = range
        .bounds()
        .map_err(|e| ReconError::ConfigValidation(format!("role '{role}': {e}")))?;
    let Some(kind) = bounds.kind() else {
        return Ok(table);
    };

    let idx = table
        .column_index(&range.column)
        .ok_or_else(|| ReconError::MissingColumn {
            role,
            column: range.column.clone(),
        })?;

    let before = table.rows.len();
    let rows: Vec<Vec<String>> = table
        .rows
        .into_iter()
        .filter(|row| {
            let raw = row.get(idx).map(String::as_str).unwrap_or("");
            kind.parse_like(raw).is_some_and(|v| bounds.contains(&v))
        })
        .collect();

    debug!(%role, column = %range.column, kept = rows.len(), dropped = before - rows.len(), "range filter applied");

    Ok(Table {
        headers: table.headers,
        rows,
    })
}

/// Rename then filter one role's table.
pub fn normalize(role: Role, table: &Table, config: &RoleConfig) -> Result<Table, ReconError> {
    let renamed = rename_columns(table, &config.rename);

    let mut seen = std::collections::HashSet::new();
    for h in &renamed.headers {
        if !h.is_empty() && !seen.insert(h.as_str()) {
            warn!(%role, column = %h, "duplicate header after rename, first occurrence wins");
        }
    }

    let filtered = match config.filter {
        Some(ref filter) => filter_rows(role, renamed, filter)?,
        None => renamed,
    };
    match config.range {
        Some(ref range) => filter_range(role, filtered, range),
        None => Ok(filtered),
    }
}
