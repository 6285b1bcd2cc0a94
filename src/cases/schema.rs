use super::table::CaseTable;

pub const CASE_NUMBER_COLUMN: &str = "CaseNumber";
pub const CHANNEL_COLUMN: &str = "Channel";

const COLUMN_DESCRIPTIONS: [(&str, &str); 13] = [
    ("CallId", "Unique name of report"),
    ("Company", "Company which whistleblower is working"),
    (CASE_NUMBER_COLUMN, "Unique number of case reported"),
    ("Coverage", "Column indicating if the case is out of scope or not"),
    ("ReportDate", "Date of case reported (YYYY-MM-DD)"),
    ("ReportTime", "Time of case reported (HH:MM:SS)"),
    (CHANNEL_COLUMN, "Channel of case reported"),
    ("Operator", "Operator receiving a case reported"),
    (
        "WhistleblowerType",
        "Column specifying if the whistleblower is employee of the company or third party",
    ),
    (
        "Identity",
        "Column indicating if the whistleblower disclose their identity or not",
    ),
    (
        "IncidentType",
        "Column indicating type of incident such as 'Inappropriate behavior'",
    ),
    (
        "AllegedPerson",
        "Identity of the alleged person such as name",
    ),
    (
        "SubmissionDate",
        "Date of report submitted to the company's management (YYYY-MM-DD)",
    ),
];

const FALLBACK_DESCRIPTION: &str = "Column of the hotline log";

/// One `Name: description` line per column, in table order. The channel
/// column also lists the channels observed in the data.
pub fn describe_schema(table: &CaseTable) -> String {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let description = COLUMN_DESCRIPTIONS
                .iter()
                .find(|(name, _)| name == column)
                .map_or(FALLBACK_DESCRIPTION, |(_, description)| *description);

            if column == CHANNEL_COLUMN {
                let channels = table.distinct_values(idx);
                if !channels.is_empty() {
                    return format!("{column}: {description} (e.g. {})", channels.join(", "));
                }
            }

            format!("{column}: {description}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
