//! Left joins of the three sources into one wide table.
//!
//! ```text
//! orders ⟕ users (user_id) ⟕ restaurants (restaurant_id)
//! ```
//!
//! Every order yields exactly one output row. Keys are matched on their
//! canonical string form ([`Cell::join_key`]) so an integer `7` in one source
//! meets the text `"7"` in another. A key that repeats on the right side is
//! rejected instead of fanning the order out into several rows.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::MergeError;
use crate::models::{Cell, Table, RESTAURANT_ID, USER_ID};

/// Result of a single left join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub table: Table,
    /// Left rows whose key found no partner (null keys included).
    pub unmatched: usize,
}

/// Counters reported after [`merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub rows: usize,
    pub unmatched_users: usize,
    pub unmatched_restaurants: usize,
}

/// Join orders with users, then with restaurants.
pub fn merge(
    orders: &Table,
    users: &Table,
    restaurants: &Table,
) -> Result<(Table, MergeStats), MergeError> {
    let with_users = left_join(orders, users, USER_ID, "users")?;
    let merged = left_join(&with_users.table, restaurants, RESTAURANT_ID, "restaurants")?;

    let stats = MergeStats {
        rows: merged.table.len(),
        unmatched_users: with_users.unmatched,
        unmatched_restaurants: merged.unmatched,
    };
    Ok((merged.table, stats))
}

/// Left outer join of `left` and `right` on the column `on`.
///
/// Output columns are the left columns followed by the right columns minus
/// the key. Non-key names present on both sides get `_x` / `_y` suffixes.
pub fn left_join(
    left: &Table,
    right: &Table,
    on: &str,
    right_name: &'static str,
) -> Result<JoinOutcome, MergeError> {
    let left_key = left.column_index(on).ok_or_else(|| MergeError::MissingKey {
        column: on.to_string(),
        side: "left",
    })?;
    let right_key = right.column_index(on).ok_or_else(|| MergeError::MissingKey {
        column: on.to_string(),
        side: right_name,
    })?;

    let index = index_unique(right, right_key, on, right_name)?;

    let overlap = |name: &String| name != on && left.has_column(name) && right.has_column(name);
    let mut columns: Vec<String> = left
        .columns
        .iter()
        .map(|c| if overlap(c) { format!("{}_x", c) } else { c.clone() })
        .collect();
    let right_columns: Vec<usize> = (0..right.columns.len()).filter(|&i| i != right_key).collect();
    columns.extend(right_columns.iter().map(|&i| {
        let c = &right.columns[i];
        if overlap(c) {
            format!("{}_y", c)
        } else {
            c.clone()
        }
    }));

    let mut unmatched = 0;
    let rows = left
        .rows
        .iter()
        .map(|row| {
            let partner = row[left_key]
                .join_key()
                .and_then(|k| index.get(&k))
                .map(|&i| &right.rows[i]);
            if partner.is_none() {
                unmatched += 1;
            }

            let mut out = Vec::with_capacity(columns.len());
            out.extend(row.iter().cloned());
            match partner {
                Some(r) => out.extend(right_columns.iter().map(|&i| r[i].clone())),
                None => out.resize(out.len() + right_columns.len(), Cell::Null),
            }
            out
        })
        .collect();

    Ok(JoinOutcome {
        table: Table::from_rows(columns, rows),
        unmatched,
    })
}

/// Map each key of the right table to its row, rejecting duplicates.
fn index_unique(
    table: &Table,
    key_idx: usize,
    column: &str,
    side: &'static str,
) -> Result<HashMap<String, usize>, MergeError> {
    let mut index = HashMap::with_capacity(table.len());
    for (i, row) in table.rows.iter().enumerate() {
        let Some(key) = row[key_idx].join_key() else {
            continue;
        };
        if index.insert(key.clone(), i).is_some() {
            return Err(MergeError::DuplicateKey {
                column: column.to_string(),
                side,
                key,
            });
        }
    }
    Ok(index)
}
