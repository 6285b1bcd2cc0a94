use std::collections::{BTreeMap, BTreeSet};

use super::figure::{DataPoint, Figure};
use super::spec::{Aggregate, ChartError, ChartKind, ChartSpec, DateBucket, SortOrder};
use crate::cases::CaseTable;

const COUNT_LABEL: &str = "Number of cases";

/// Evaluates a chart spec against the table with fixed aggregation code.
pub fn build_figure(table: &CaseTable, spec: &ChartSpec) -> Result<Figure, ChartError> {
    let group_column = resolve(table, &spec.group_by)?;
    let distinct_column = match &spec.aggregate {
        Aggregate::Count => None,
        Aggregate::CountDistinct { column } => Some(resolve(table, column)?),
    };
    let filters = spec
        .filters
        .iter()
        .map(|filter| Ok((resolve(table, &filter.column)?, filter.equals.as_str())))
        .collect::<Result<Vec<_>, ChartError>>()?;

    let mut groups: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for row in table.rows() {
        let keep = filters
            .iter()
            .all(|(column, expected)| row[*column].as_deref() == Some(*expected));
        if !keep {
            continue;
        }

        let Some(group) = row[group_column].as_deref() else {
            continue;
        };
        let key = bucket(group, spec.date_bucket);

        match distinct_column {
            None => *counts.entry(key).or_default() += 1,
            Some(column) => {
                let members = groups.entry(key).or_default();
                if let Some(value) = row[column].as_deref() {
                    members.insert(value);
                }
            }
        }
    }

    let mut points = match distinct_column {
        None => counts
            .into_iter()
            .map(|(label, count)| DataPoint {
                label,
                value: count as f64,
            })
            .collect::<Vec<_>>(),
        Some(_) => groups
            .into_iter()
            .map(|(label, members)| DataPoint {
                label,
                value: members.len() as f64,
            })
            .collect::<Vec<_>>(),
    };

    let order = spec.sort.unwrap_or(match spec.kind {
        ChartKind::Line => SortOrder::Label,
        ChartKind::Bar | ChartKind::Pie => SortOrder::ValueDesc,
    });
    // Groups come out of the map in label order, so stable sorts keep ties
    // alphabetical.
    match order {
        SortOrder::Label => {}
        SortOrder::ValueDesc => points.sort_by(|a, b| b.value.total_cmp(&a.value)),
        SortOrder::ValueAsc => points.sort_by(|a, b| a.value.total_cmp(&b.value)),
    }
    if let Some(limit) = spec.limit {
        points.truncate(limit);
    }

    let y_label = spec.y_label.clone().unwrap_or_else(|| match &spec.aggregate {
        Aggregate::Count => COUNT_LABEL.to_string(),
        Aggregate::CountDistinct { column } => format!("Distinct {column}"),
    });
    let x_label = spec.x_label.clone().unwrap_or_else(|| spec.group_by.clone());
    let title = spec
        .title
        .clone()
        .unwrap_or_else(|| format!("{y_label} by {x_label}"));

    Ok(Figure {
        kind: spec.kind,
        title,
        x_label,
        y_label,
        points,
    })
}

fn resolve(table: &CaseTable, column: &str) -> Result<usize, ChartError> {
    table
        .column_index(column)
        .ok_or_else(|| ChartError::UnknownColumn(column.to_string()))
}

fn bucket(value: &str, date_bucket: Option<DateBucket>) -> String {
    let Some(date_bucket) = date_bucket else {
        return value.to_string();
    };
    if !looks_like_iso_date(value) {
        return value.to_string();
    }
    value[..date_bucket.prefix_len()].to_string()
}

fn looks_like_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() >= 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}
