//! Report types and rendering.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::models::Cell;

/// Parameters of the fixed query battery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Membership tier treated as "Gold".
    pub gold_tier: String,
    /// City whose revenue is reported on its own.
    pub spotlight_city: String,
    /// Users spending more than this count as high spenders.
    pub spend_threshold: f64,
    /// Restaurants with fewer orders than this are listed by average order value.
    pub max_orders: usize,
    /// How many of those restaurants to list.
    pub top_k: usize,
    /// Minimum restaurant rating for the high-rating order count.
    pub high_rating: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            gold_tier: "Gold".to_string(),
            spotlight_city: "Hyderabad".to_string(),
            spend_threshold: 1000.0,
            max_orders: 20,
            top_k: 5,
            high_rating: 4.5,
        }
    }
}

/// One row of a grouped answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRow {
    pub key: Vec<String>,
    pub values: Vec<Cell>,
}

/// The answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    Grouped {
        key_columns: Vec<String>,
        value_columns: Vec<String>,
        rows: Vec<GroupRow>,
    },
    Scalar {
        value: Cell,
    },
    /// Arg-max city with its order count, absent when nothing qualified.
    TopCity {
        city: Option<String>,
        orders: usize,
    },
}

/// A labelled answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub id: String,
    pub label: String,
    pub answer: Answer,
}

impl Section {
    pub fn new(id: &str, label: impl Into<String>, answer: Answer) -> Self {
        Self {
            id: id.to_string(),
            label: label.into(),
            answer,
        }
    }
}

/// All answers in presentation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Scalar value of a section, if it has one.
    pub fn scalar(&self, id: &str) -> Option<&Cell> {
        match &self.section(id)?.answer {
            Answer::Scalar { value } => Some(value),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering, one block per section.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            let _ = writeln!(out, "{} - {}:", section.id, section.label);
            match &section.answer {
                Answer::Grouped {
                    key_columns,
                    value_columns,
                    rows,
                } => render_grouped(&mut out, key_columns, value_columns, rows),
                Answer::Scalar { value } => {
                    let _ = writeln!(out, "{}", format_value(value));
                }
                Answer::TopCity { city: Some(c), orders } => {
                    let _ = writeln!(out, "{} ({} orders)", c, orders);
                }
                Answer::TopCity { city: None, .. } => out.push_str("n/a\n"),
            }
            out.push('\n');
        }
        out
    }
}

fn render_grouped(out: &mut String, keys: &[String], values: &[String], rows: &[GroupRow]) {
    if rows.is_empty() {
        out.push_str("(no rows)\n");
        return;
    }

    let header: Vec<&str> = keys.iter().chain(values).map(String::as_str).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            r.key
                .iter()
                .cloned()
                .chain(r.values.iter().map(format_value))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            body.iter()
                .map(|line| line[i].chars().count())
                .chain(std::iter::once(header[i].chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if i < keys.len() {
                    format!("{:<w$}", c, w = widths[i])
                } else {
                    format!("{:>w$}", c, w = widths[i])
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let _ = writeln!(out, "{}", line(header.clone()));
    for cells in &body {
        let _ = writeln!(out, "{}", line(cells.iter().map(String::as_str).collect()));
    }
}

fn format_value(cell: &Cell) -> String {
    match cell {
        Cell::Float(v) if v.is_finite() => format!("{:.2}", v),
        Cell::Float(_) | Cell::Null => "n/a".to_string(),
        other => other.to_string(),
    }
}
