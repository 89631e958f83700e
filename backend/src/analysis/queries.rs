//! The fixed query battery: ten grouped queries and six scalar answers.
//!
//! Each query is an independent read of the merged table. Results are
//! collected into a [`Report`] in presentation order.

use std::cmp::Ordering;

use crate::error::SchemaError;
use crate::models::{
    Cell, Table, CITY, CUISINE, MEMBERSHIP, ORDER_ID, QUARTER, RATING, RATING_RANGE,
    RESTAURANT_ID, RESTAURANT_NAME, TOTAL_AMOUNT, USER_ID,
};

use super::aggregate::{
    aggregate, arg_max, count_rows, pct, reduce, round_half_even, Aggregation, Filter, Groups,
    Having, Reducer,
};
use super::report::{Answer, GroupRow, Report, ReportConfig, Section};

/// Run every query against `table`.
pub fn run_queries(table: &Table, config: &ReportConfig) -> Result<Report, SchemaError> {
    let gold = Filter::eq(MEMBERSHIP, config.gold_tier.as_str());

    let q1 = aggregate(
        table,
        &Aggregation::new("Q1", &[CITY], TOTAL_AMOUNT, Reducer::Sum).filter(gold.clone()),
    )?;

    let mut sections = vec![
        Section::new("Q1", format!("{} revenue by city", config.gold_tier), grouped(&[CITY], TOTAL_AMOUNT, &q1)),
        Section::new(
            "Q2",
            "Average order value by cuisine",
            simple(table, Aggregation::new("Q2", &[CUISINE], TOTAL_AMOUNT, Reducer::Mean))?,
        ),
        Section::new(
            "Q3",
            format!("Users with total spend > {}", config.spend_threshold),
            Answer::Scalar {
                value: Cell::Int(high_spenders(table, config.spend_threshold)? as i64),
            },
        ),
        Section::new(
            "Q4",
            "Total revenue by rating range",
            simple(table, Aggregation::new("Q4", &[RATING_RANGE], TOTAL_AMOUNT, Reducer::Sum))?,
        ),
        Section::new(
            "Q5",
            format!("Average order value ({} members) by city", config.gold_tier),
            simple(
                table,
                Aggregation::new("Q5", &[CITY], TOTAL_AMOUNT, Reducer::Mean).filter(gold.clone()),
            )?,
        ),
        Section::new("Q6", "Restaurant count and revenue by cuisine", cuisine_summary(table)?),
        Section::new(
            "Q7",
            format!("Percentage of orders by {} members", config.gold_tier),
            Answer::Scalar {
                value: Cell::Int(gold_share(table, &gold)? as i64),
            },
        ),
        Section::new(
            "Q8",
            format!(
                "Top {} restaurants with < {} orders by average order value",
                config.top_k, config.max_orders
            ),
            small_restaurants(table, config)?,
        ),
        Section::new(
            "Q9",
            "Revenue by membership and cuisine",
            simple(
                table,
                Aggregation::new("Q9", &[MEMBERSHIP, CUISINE], TOTAL_AMOUNT, Reducer::Sum),
            )?,
        ),
        Section::new(
            "Q10",
            "Total revenue by quarter",
            simple(table, Aggregation::new("Q10", &[QUARTER], TOTAL_AMOUNT, Reducer::Sum))?,
        ),
    ];

    sections.extend(answers(table, config, &gold, &q1)?);
    Ok(Report { sections })
}

/// The six scalar answers.
fn answers(
    table: &Table,
    config: &ReportConfig,
    gold: &Filter,
    q1: &Groups,
) -> Result<Vec<Section>, SchemaError> {
    let gold_orders = count_rows(table, "ANS 1", Some(gold))?;

    let spotlight = reduce(
        table,
        "ANS 2",
        TOTAL_AMOUNT,
        Reducer::Sum,
        Some(Filter::eq(CITY, config.spotlight_city.as_str())),
    )?;

    let users = reduce(table, "ANS 3", USER_ID, Reducer::CountDistinct, None)?;

    let gold_aov = reduce(table, "ANS 4", TOTAL_AMOUNT, Reducer::Mean, Some(gold.clone()))?;

    let well_rated = count_rows(table, "ANS 5", Some(&Filter::ge(RATING, config.high_rating)))?;

    let top_city = arg_max(q1).and_then(|k| k.first().cloned());
    let top_city_orders = match &top_city {
        Some(city) => count_rows(
            table,
            "ANS 6",
            Some(&gold.clone().and(Filter::eq(CITY, city.as_str()))),
        )?,
        None => 0,
    };

    Ok(vec![
        Section::new(
            "ANS 1",
            format!("Total orders by {} members", config.gold_tier),
            Answer::Scalar { value: Cell::Int(gold_orders as i64) },
        ),
        Section::new(
            "ANS 2",
            format!("Total revenue from {} (rounded)", config.spotlight_city),
            Answer::Scalar { value: Cell::Int(round_half_even(spotlight, 0) as i64) },
        ),
        Section::new(
            "ANS 3",
            "Distinct users with at least one order",
            Answer::Scalar { value: Cell::Int(users as i64) },
        ),
        Section::new(
            "ANS 4",
            format!("Average order value for {} members", config.gold_tier),
            Answer::Scalar { value: Cell::Float(round_half_even(gold_aov, 2)) },
        ),
        Section::new(
            "ANS 5",
            format!("Orders with restaurant rating >= {}", config.high_rating),
            Answer::Scalar { value: Cell::Int(well_rated as i64) },
        ),
        Section::new(
            "ANS 6",
            format!("Orders in the top {} revenue city", config.gold_tier),
            Answer::TopCity {
                city: top_city,
                orders: top_city_orders,
            },
        ),
    ])
}

fn simple(table: &Table, agg: Aggregation) -> Result<Answer, SchemaError> {
    let groups = aggregate(table, &agg)?;
    let keys: Vec<&str> = agg.group_by.iter().map(String::as_str).collect();
    Ok(grouped(&keys, &agg.value, &groups))
}

fn grouped(keys: &[&str], value: &str, groups: &Groups) -> Answer {
    Answer::Grouped {
        key_columns: keys.iter().map(|k| k.to_string()).collect(),
        value_columns: vec![value.to_string()],
        rows: groups
            .iter()
            .map(|(key, v)| GroupRow {
                key: key.clone(),
                values: vec![Cell::Float(*v)],
            })
            .collect(),
    }
}

/// Users whose summed spend exceeds `threshold`.
fn high_spenders(table: &Table, threshold: f64) -> Result<usize, SchemaError> {
    let agg = Aggregation::new("Q3", &[USER_ID], TOTAL_AMOUNT, Reducer::Sum).having(Having::Gt(threshold));
    Ok(aggregate(table, &agg)?.len())
}

/// Distinct restaurants and revenue side by side, per cuisine.
fn cuisine_summary(table: &Table) -> Result<Answer, SchemaError> {
    let restaurants = aggregate(
        table,
        &Aggregation::new("Q6", &[CUISINE], RESTAURANT_ID, Reducer::CountDistinct),
    )?;
    let revenue = aggregate(
        table,
        &Aggregation::new("Q6", &[CUISINE], TOTAL_AMOUNT, Reducer::Sum),
    )?;

    let rows = restaurants
        .iter()
        .map(|(key, &count)| GroupRow {
            key: key.clone(),
            values: vec![
                Cell::Int(count as i64),
                revenue.get(key).map_or(Cell::Null, |v| Cell::Float(*v)),
            ],
        })
        .collect();

    Ok(Answer::Grouped {
        key_columns: vec![CUISINE.to_string()],
        value_columns: vec!["restaurant_count".to_string(), "total_revenue".to_string()],
        rows,
    })
}

/// Share of rows matching `gold`, as a whole percentage.
fn gold_share(table: &Table, gold: &Filter) -> Result<f64, SchemaError> {
    let part = count_rows(table, "Q7", Some(gold))?;
    Ok(round_half_even(pct(part, table.len()), 0))
}

/// Restaurants below the order-count cap, best average order value first.
fn small_restaurants(table: &Table, config: &ReportConfig) -> Result<Answer, SchemaError> {
    let counts = aggregate(
        table,
        &Aggregation::new("Q8", &[RESTAURANT_NAME], ORDER_ID, Reducer::Count)
            .having(Having::Lt(config.max_orders as f64)),
    )?;
    let means = aggregate(
        table,
        &Aggregation::new("Q8", &[RESTAURANT_NAME], TOTAL_AMOUNT, Reducer::Mean),
    )?;

    let mut ranked: Vec<(&Vec<String>, f64, f64)> = counts
        .iter()
        .map(|(key, &count)| (key, means.get(key).copied().unwrap_or(f64::NAN), count))
        .collect();
    ranked.sort_by(|a, b| match (a.1.is_nan(), b.1.is_nan()) {
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        _ => b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal),
    });
    ranked.truncate(config.top_k);

    Ok(Answer::Grouped {
        key_columns: vec![RESTAURANT_NAME.to_string()],
        value_columns: vec!["avg_order_value".to_string(), "order_count".to_string()],
        rows: ranked
            .into_iter()
            .map(|(key, mean, count)| GroupRow {
                key: key.clone(),
                values: vec![Cell::Float(mean), Cell::Int(count as i64)],
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::normalize::RatingRange;

    #[allow(clippy::too_many_arguments)]
    fn row(order: i64, user: &str, city: &str, tier: &str, amount: f64, name: &str, cuisine: &str, rating: f64, q: &str) -> Vec<Cell> {
        vec![
            Cell::Int(order),
            Cell::from(user),
            Cell::Int(order % 3),
            Cell::Float(amount),
            Cell::from(tier),
            Cell::from(city),
            Cell::from(name),
            Cell::from(cuisine),
            Cell::Float(rating),
            Cell::from(RatingRange::from_rating(Some(rating)).label()),
            Cell::from(q),
        ]
    }

    fn table() -> Table {
        Table::from_rows(
            vec![
                "order_id".into(),
                "user_id".into(),
                "restaurant_id".into(),
                "total_amount".into(),
                "membership".into(),
                "city".into(),
                "restaurant_name".into(),
                "cuisine".into(),
                "rating".into(),
                "rating_range".into(),
                "quarter".into(),
            ],
            vec![
                row(1, "u1", "Hyderabad", "Gold", 700.0, "Spice Hub", "Indian", 4.6, "2023Q1"),
                row(2, "u1", "Hyderabad", "Gold", 500.5, "Spice Hub", "Indian", 4.6, "2023Q1"),
                row(3, "u2", "Pune", "Gold", 300.0, "Wok", "Chinese", 3.8, "2023Q2"),
                row(4, "u3", "Pune", "Regular", 100.0, "Wok", "Chinese", 3.8, "2023Q2"),
                row(5, "u4", "Delhi", "Regular", 50.0, "Pasta Co", "Italian", 4.2, "2023Q3"),
            ],
        )
    }

    fn report() -> Report {
        run_queries(&table(), &ReportConfig::default()).unwrap()
    }

    fn rows(report: &Report, id: &str) -> Vec<GroupRow> {
        match &report.section(id).unwrap().answer {
            Answer::Grouped { rows, .. } => rows.clone(),
            other => panic!("{id} is not grouped: {other:?}"),
        }
    }

    #[test]
    fn test_section_order() {
        let ids: Vec<_> = report().sections.into_iter().map(|s| s.id).collect();
        assert_eq!(
            ids,
            vec![
                "Q1", "Q2", "Q3", "Q4", "Q5", "Q6", "Q7", "Q8", "Q9", "Q10", "ANS 1", "ANS 2",
                "ANS 3", "ANS 4", "ANS 5", "ANS 6"
            ]
        );
    }

    #[test]
    fn test_gold_revenue_by_city() {
        let q1 = rows(&report(), "Q1");
        assert_eq!(q1.len(), 2);
        assert_eq!(q1[0].key, vec!["Hyderabad"]);
        assert_eq!(q1[0].values, vec![Cell::Float(1200.5)]);
        assert_eq!(q1[1].values, vec![Cell::Float(300.0)]);
    }

    #[test]
    fn test_high_spenders_and_share() {
        let r = report();
        assert_eq!(r.scalar("Q3"), Some(&Cell::Int(1)));
        // 3 gold orders out of 5
        assert_eq!(r.scalar("Q7"), Some(&Cell::Int(60)));
    }

    #[test]
    fn test_cuisine_summary() {
        let q6 = rows(&report(), "Q6");
        let chinese = q6.iter().find(|r| r.key == vec!["Chinese"]).unwrap();
        // orders 3 and 4 map to restaurant ids 0 and 1
        assert_eq!(chinese.values, vec![Cell::Int(2), Cell::Float(400.0)]);
    }

    #[test]
    fn test_small_restaurants_sorted_by_mean() {
        let q8 = rows(&report(), "Q8");
        let names: Vec<_> = q8.iter().map(|r| r.key[0].clone()).collect();
        assert_eq!(names, vec!["Spice Hub", "Wok", "Pasta Co"]);
        assert_eq!(q8[0].values, vec![Cell::Float(600.25), Cell::Int(2)]);

        let config = ReportConfig {
            max_orders: 2,
            top_k: 1,
            ..ReportConfig::default()
        };
        let r = run_queries(&table(), &config).unwrap();
        let q8 = rows(&r, "Q8");
        assert_eq!(q8.len(), 1);
        assert_eq!(q8[0].key, vec!["Pasta Co"]);
    }

    #[test]
    fn test_pair_and_quarter_groups() {
        let r = report();
        assert_eq!(rows(&r, "Q9").len(), 4);
        let q10 = rows(&r, "Q10");
        assert_eq!(q10.iter().map(|g| g.key[0].as_str()).collect::<Vec<_>>(), vec!["2023Q1", "2023Q2", "2023Q3"]);
    }

    #[test]
    fn test_scalar_answers() {
        let r = report();
        assert_eq!(r.scalar("ANS 1"), Some(&Cell::Int(3)));
        // 1200.5 rounds half to even
        assert_eq!(r.scalar("ANS 2"), Some(&Cell::Int(1200)));
        assert_eq!(r.scalar("ANS 3"), Some(&Cell::Int(4)));
        assert_eq!(r.scalar("ANS 4"), Some(&Cell::Float(500.17)));
        assert_eq!(r.scalar("ANS 5"), Some(&Cell::Int(2)));
        assert_eq!(
            r.section("ANS 6").unwrap().answer,
            Answer::TopCity {
                city: Some("Hyderabad".into()),
                orders: 2
            }
        );
    }

    #[test]
    fn test_gold_average_half_cent() {
        let mut t = table();
        t.rows = vec![row(1, "u1", "Hyderabad", "Gold", 100.025, "Spice Hub", "Indian", 4.6, "2023Q1")];
        let r = run_queries(&t, &ReportConfig::default()).unwrap();
        assert_eq!(r.scalar("ANS 4"), Some(&Cell::Float(100.03)));

        t.rows[0][3] = Cell::Float(100.035);
        let r = run_queries(&t, &ReportConfig::default()).unwrap();
        assert_eq!(r.scalar("ANS 4"), Some(&Cell::Float(100.03)));
    }

    #[test]
    fn test_no_gold_members() {
        let config = ReportConfig {
            gold_tier: "Platinum".into(),
            ..ReportConfig::default()
        };
        let r = run_queries(&table(), &config).unwrap();
        assert_eq!(r.section("ANS 6").unwrap().answer, Answer::TopCity { city: None, orders: 0 });
        assert_eq!(r.scalar("Q7"), Some(&Cell::Int(0)));
        assert!(rows(&r, "Q1").is_empty());
        match r.scalar("ANS 4") {
            Some(Cell::Float(v)) => assert!(v.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_fails_fast() {
        let mut t = table();
        let idx = t.column_index("quarter").unwrap();
        t.columns.remove(idx);
        for r in &mut t.rows {
            r.remove(idx);
        }
        let err = run_queries(&t, &ReportConfig::default()).unwrap_err();
        assert_eq!(err.query, "Q10");
        assert_eq!(err.column, "quarter");
    }
}
