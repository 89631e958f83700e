//! Generic group-by aggregation over a [`Table`].
//!
//! An [`Aggregation`] names the group columns, the value column, a
//! [`Reducer`], and optionally a row [`Filter`] and a [`Having`] condition
//! on the reduced value. Every referenced column is checked up front: a
//! missing column is a [`SchemaError`], never an empty result.
//!
//! Null handling follows dataframe conventions: rows whose group key is null
//! are dropped, reducers skip null values, the sum of nothing is `0` and the
//! mean of nothing is `NaN`.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::SchemaError;
use crate::models::{Cell, Row, Table};

/// Group key tuple, one label per group column.
pub type GroupKey = Vec<String>;

/// Mapping from group key to reduced value, sorted by key.
pub type Groups = BTreeMap<GroupKey, f64>;

/// How the values of a group collapse into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Sum,
    Mean,
    /// Non-null values.
    Count,
    /// Distinct non-null values.
    CountDistinct,
}

/// Row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals the given cell.
    Eq(String, Cell),
    /// Column is numeric and at least the given value.
    Ge(String, f64),
    /// All of the inner filters hold.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Cell>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn ge(column: &str, value: f64) -> Self {
        Filter::Ge(column.to_string(), value)
    }

    pub fn and(self, other: Filter) -> Self {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// Resolve column names to indices once.
    fn compile(&self, table: &Table, query: &str) -> Result<CompiledFilter, SchemaError> {
        let index = |c: &str| {
            table
                .column_index(c)
                .ok_or_else(|| SchemaError::new(query, c))
        };
        Ok(match self {
            Filter::Eq(c, v) => CompiledFilter::Eq(index(c.as_str())?, v.clone()),
            Filter::Ge(c, v) => CompiledFilter::Ge(index(c.as_str())?, *v),
            Filter::And(parts) => CompiledFilter::And(
                parts
                    .iter()
                    .map(|p| p.compile(table, query))
                    .collect::<Result<_, _>>()?,
            ),
        })
    }
}

enum CompiledFilter {
    Eq(usize, Cell),
    Ge(usize, f64),
    And(Vec<CompiledFilter>),
}

impl CompiledFilter {
    fn matches(&self, row: &Row) -> bool {
        match self {
            CompiledFilter::Eq(i, v) => &row[*i] == v,
            CompiledFilter::Ge(i, v) => row[*i].as_f64().is_some_and(|x| x >= *v),
            CompiledFilter::And(parts) => parts.iter().all(|p| p.matches(row)),
        }
    }
}

/// Condition on the reduced value of a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Having {
    Gt(f64),
    Lt(f64),
}

impl Having {
    fn keeps(&self, value: f64) -> bool {
        match self {
            Having::Gt(t) => value > *t,
            Having::Lt(t) => value < *t,
        }
    }
}

/// A single aggregation query.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Name used in error messages.
    pub name: String,
    pub group_by: Vec<String>,
    pub value: String,
    pub reducer: Reducer,
    pub filter: Option<Filter>,
    pub having: Option<Having>,
}

impl Aggregation {
    pub fn new(name: &str, group_by: &[&str], value: &str, reducer: Reducer) -> Self {
        Self {
            name: name.to_string(),
            group_by: group_by.iter().map(|s| s.to_string()).collect(),
            value: value.to_string(),
            reducer,
            filter: None,
            having: None,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn having(mut self, having: Having) -> Self {
        self.having = Some(having);
        self
    }
}

#[derive(Default)]
struct Accumulator {
    sum: f64,
    count: usize,
    distinct: HashSet<String>,
}

impl Accumulator {
    fn push(&mut self, reducer: Reducer, cell: &Cell) {
        match reducer {
            Reducer::Sum | Reducer::Mean => {
                if let Some(v) = cell.as_f64() {
                    self.sum += v;
                    self.count += 1;
                }
            }
            Reducer::Count => {
                if cell.group_label().is_some() {
                    self.count += 1;
                }
            }
            Reducer::CountDistinct => {
                if let Some(key) = cell.join_key().or_else(|| cell.group_label()) {
                    self.distinct.insert(key);
                }
            }
        }
    }

    fn finish(&self, reducer: Reducer) -> f64 {
        match reducer {
            Reducer::Sum => self.sum,
            Reducer::Mean if self.count == 0 => f64::NAN,
            Reducer::Mean => self.sum / self.count as f64,
            Reducer::Count => self.count as f64,
            Reducer::CountDistinct => self.distinct.len() as f64,
        }
    }
}

/// Run one aggregation.
pub fn aggregate(table: &Table, agg: &Aggregation) -> Result<Groups, SchemaError> {
    let index = |c: &str| {
        table
            .column_index(c)
            .ok_or_else(|| SchemaError::new(&agg.name, c))
    };
    let group_idx: Vec<usize> = agg
        .group_by
        .iter()
        .map(|c| index(c.as_str()))
        .collect::<Result<_, _>>()?;
    let value_idx = index(agg.value.as_str())?;
    let filter = agg
        .filter
        .as_ref()
        .map(|f| f.compile(table, &agg.name))
        .transpose()?;

    let mut acc: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for row in &table.rows {
        if filter.as_ref().is_some_and(|f| !f.matches(row)) {
            continue;
        }
        let Some(key) = group_idx
            .iter()
            .map(|&i| row[i].group_label())
            .collect::<Option<GroupKey>>()
        else {
            continue;
        };
        acc.entry(key).or_default().push(agg.reducer, &row[value_idx]);
    }

    Ok(acc
        .into_iter()
        .map(|(key, a)| (key, a.finish(agg.reducer)))
        .filter(|(_, v)| agg.having.map_or(true, |h| h.keeps(*v)))
        .collect())
}

/// Reduce the whole (filtered) table to one value.
pub fn reduce(
    table: &Table,
    name: &str,
    value: &str,
    reducer: Reducer,
    filter: Option<Filter>,
) -> Result<f64, SchemaError> {
    let mut agg = Aggregation::new(name, &[], value, reducer);
    agg.filter = filter;
    let groups = aggregate(table, &agg)?;
    Ok(groups.get(&GroupKey::new()).copied().unwrap_or(match reducer {
        Reducer::Mean => f64::NAN,
        _ => 0.0,
    }))
}

/// Number of rows matching `filter` (all rows when `None`).
pub fn count_rows(table: &Table, name: &str, filter: Option<&Filter>) -> Result<usize, SchemaError> {
    match filter {
        None => Ok(table.len()),
        Some(f) => {
            let compiled = f.compile(table, name)?;
            Ok(table.rows.iter().filter(|r| compiled.matches(r)).count())
        }
    }
}

/// First key holding the largest value (keys are visited in sorted order).
pub fn arg_max(groups: &Groups) -> Option<&GroupKey> {
    let mut best: Option<(&GroupKey, f64)> = None;
    for (key, &value) in groups {
        if value.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((key, value));
        }
    }
    best.map(|(k, _)| k)
}

/// Percentage of `part` in `total`, 0 when `total` is 0.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Round half to even at `decimals` places.
///
/// Rounds the exact binary value, so 100.025 (stored slightly above the
/// tie) goes up and 0.125 (an exact tie) goes to even. Scaling by a power
/// of ten first would round twice.
pub fn round_half_even(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    if decimals <= 0 {
        let factor = 10f64.powi(decimals);
        return (value * factor).round_ties_even() / factor;
    }
    format!("{:.*}", decimals as usize, value)
        .parse()
        .unwrap_or(value)
}
