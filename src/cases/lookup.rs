use super::schema::CASE_NUMBER_COLUMN;
use super::table::{CaseTable, Cell};

pub const NO_CASE_REPORTED: &str = "No case reported";

/// Renders every column of the rows whose case number equals `case_number`
/// exactly. A miss is a normal outcome and yields [`NO_CASE_REPORTED`].
pub fn lookup_case(table: &CaseTable, case_number: &str) -> String {
    let Some(key_column) = table.column_index(CASE_NUMBER_COLUMN) else {
        return NO_CASE_REPORTED.to_string();
    };

    let matches = table
        .rows_matching(key_column, case_number)
        .collect::<Vec<_>>();
    if matches.is_empty() {
        return NO_CASE_REPORTED.to_string();
    }

    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let values = matches
                .iter()
                .map(|row| format_value(row.get(idx)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{column}: [{values}]")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_value(cell: Option<&Cell>) -> String {
    match cell.and_then(Option::as_deref) {
        Some(value) => format!("'{value}'"),
        None => "nan".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{NO_CASE_REPORTED, lookup_case};
    use crate::cases::CaseTable;

    fn table() -> CaseTable {
        let row = |case: &str, channel: Option<&str>, operator: &str| {
            vec![
                Some(case.to_string()),
                channel.map(str::to_string),
                Some(operator.to_string()),
            ]
        };
        CaseTable::new(
            vec![
                "CaseNumber".to_string(),
                "Channel".to_string(),
                "Operator".to_string(),
            ],
            vec![
                row("HL-001", Some("Hotline"), "Somchai"),
                row("HL-002", None, "Malee"),
                row("HL-002", Some("Email"), "Anan"),
            ],
        )
        .expect("table")
    }

    #[test]
    fn known_case_lists_every_column_with_its_value() {
        let info = lookup_case(&table(), "HL-001");
        assert_eq!(
            info,
            "CaseNumber: ['HL-001']\nChannel: ['Hotline']\nOperator: ['Somchai']"
        );
    }

    #[test]
    fn duplicate_case_numbers_list_all_values_per_column() {
        let info = lookup_case(&table(), "HL-002");
        assert!(info.contains("Channel: [nan, 'Email']"));
        assert!(info.contains("Operator: ['Malee', 'Anan']"));
    }

    #[test]
    fn absent_case_returns_sentinel() {
        assert_eq!(lookup_case(&table(), "HL-999"), NO_CASE_REPORTED);
    }

    #[test]
    fn match_is_exact_and_case_sensitive() {
        assert_eq!(lookup_case(&table(), "hl-001"), NO_CASE_REPORTED);
        assert_eq!(lookup_case(&table(), "HL-001 "), NO_CASE_REPORTED);
    }

    #[test]
    fn blank_input_returns_sentinel() {
        assert_eq!(lookup_case(&table(), ""), NO_CASE_REPORTED);
    }

    #[test]
    fn table_without_case_number_column_returns_sentinel() {
        let table = CaseTable::new(vec!["Channel".to_string()], vec![vec![None]]).expect("table");
        assert_eq!(lookup_case(&table, "HL-001"), NO_CASE_REPORTED);
    }
}
