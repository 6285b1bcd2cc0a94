use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use time::{Date, Duration, Month};

const SECONDS_PER_DAY: f64 = 86_400.0;
/// First serial after 9999-12-31 23:59:59.
const MAX_EXCEL_SERIAL: f64 = 2_958_466.0;

/// A single spreadsheet cell; `None` marks a missing value.
pub type Cell = Option<String>;

/// The hotline log, loaded once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    UnsupportedFormat(String),
    Read(String),
    NoSheets,
    MissingHeader,
    DuplicateColumn(String),
}

impl Display for TableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat(ext) => {
                write!(f, "unsupported file format '{ext}' (expected xlsx, xls, ods or csv)")
            }
            Self::Read(msg) => write!(f, "unable to read file: {msg}"),
            Self::NoSheets => write!(f, "workbook has no worksheets"),
            Self::MissingHeader => write!(f, "missing header row"),
            Self::DuplicateColumn(name) => write!(f, "duplicate column '{name}'"),
        }
    }
}

impl Error for TableError {}

impl CaseTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        if columns.is_empty() {
            return Err(TableError::MissingHeader);
        }

        for (idx, name) in columns.iter().enumerate() {
            if columns[..idx].contains(name) {
                return Err(TableError::DuplicateColumn(name.clone()));
            }
        }

        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Loads the first worksheet of a workbook, or a CSV file, using the first
    /// row as the header.
    pub fn load(path: &Path) -> Result<Self, TableError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path),
            "csv" => load_csv(path),
            other => Err(TableError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn rows_matching<'a>(
        &'a self,
        column: usize,
        value: &'a str,
    ) -> impl Iterator<Item = &'a [Cell]> + 'a {
        self.rows()
            .filter(move |row| row.get(column).and_then(Option::as_deref) == Some(value))
    }

    /// Non-missing values of a column in first-seen order.
    pub fn distinct_values(&self, column: usize) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for value in self.rows().filter_map(|row| row.get(column).and_then(Option::as_deref)) {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        seen
    }
}

fn load_workbook(path: &Path) -> Result<CaseTable, TableError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|err| TableError::Read(err.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(TableError::NoSheets)?
        .map_err(|err| TableError::Read(err.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or(TableError::MissingHeader)?;
    let columns = header
        .iter()
        .enumerate()
        .map(|(idx, cell)| header_name(idx, cell_text(cell)))
        .collect();

    let body = rows
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(Option::is_some))
        .collect();

    CaseTable::new(columns, body)
}

fn load_csv(path: &Path) -> Result<CaseTable, TableError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|err| TableError::Read(err.to_string()))?;

    let columns = reader
        .headers()
        .map_err(|err| TableError::Read(err.to_string()))?
        .iter()
        .enumerate()
        .map(|(idx, name)| header_name(idx, non_blank(name)))
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| TableError::Read(err.to_string()))?;
        let row = record.iter().map(non_blank).collect::<Vec<_>>();
        if row.iter().any(Option::is_some) {
            rows.push(row);
        }
    }

    CaseTable::new(columns, rows)
}

fn header_name(idx: usize, name: Cell) -> String {
    name.map(|name| name.trim().to_string())
        .unwrap_or_else(|| format!("column_{}", idx + 1))
}

fn non_blank(value: &str) -> Cell {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn cell_text(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(s) => non_blank(s),
        Data::Float(n) => Some(format_number(*n)),
        Data::Int(n) => Some(n.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => excel_serial_to_text(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => non_blank(s),
    }
}

fn format_number(n: f64) -> String {
    // Integers without decimals, so numeric case numbers match their text form.
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Converts an Excel serial (1900 date system) into ISO text. Serials past
/// 9999-12-31 are treated as missing.
fn excel_serial_to_text(serial: f64) -> Cell {
    if !(0.0..MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }

    let days = serial.trunc() as i64;
    let seconds = ((serial.fract() * SECONDS_PER_DAY).round() as i64).min(86_399);
    let clock = format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    );

    if days == 0 {
        return Some(clock);
    }

    // Excel counts a 1900-02-29 that never existed (serial 60), so earlier
    // serials count from 1899-12-31.
    let epoch = if days < 60 {
        Date::from_calendar_date(1899, Month::December, 31).ok()?
    } else {
        Date::from_calendar_date(1899, Month::December, 30).ok()?
    };
    let date = epoch.checked_add(Duration::days(days))?;
    let day = format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    );

    if seconds == 0 {
        Some(day)
    } else {
        Some(format!("{day} {clock}"))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use calamine::{CellErrorType, Data, ExcelDateTime, ExcelDateTimeType};
    use rust_xlsxwriter::{Format, Workbook};

    use super::{CaseTable, TableError, cell_text, excel_serial_to_text, format_number};

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn new_pads_short_rows_and_drops_extra_cells() {
        let table = CaseTable::new(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![cell("1")], vec![cell("2"), cell("3"), cell("4")]],
        )
        .expect("table");

        let rows = table.rows().collect::<Vec<_>>();
        assert_eq!(rows[0], &[cell("1"), None]);
        assert_eq!(rows[1], &[cell("2"), cell("3")]);
    }

    #[test]
    fn new_rejects_duplicate_columns() {
        let err = CaseTable::new(vec!["A".to_string(), "A".to_string()], vec![])
            .expect_err("duplicate column");
        assert_eq!(err, TableError::DuplicateColumn("A".to_string()));
    }

    #[test]
    fn distinct_values_skip_missing_and_keep_first_seen_order() {
        let table = CaseTable::new(
            vec!["Channel".to_string()],
            vec![
                vec![cell("Hotline")],
                vec![None],
                vec![cell("Email")],
                vec![cell("Hotline")],
            ],
        )
        .expect("table");

        assert_eq!(table.distinct_values(0), vec!["Hotline", "Email"]);
    }

    #[test]
    fn excel_serials_convert_to_iso_text() {
        assert_eq!(excel_serial_to_text(45292.0).as_deref(), Some("2024-01-01"));
        assert_eq!(excel_serial_to_text(45306.0).as_deref(), Some("2024-01-15"));
        assert_eq!(
            excel_serial_to_text(45292.5).as_deref(),
            Some("2024-01-01 12:00:00")
        );
        assert_eq!(excel_serial_to_text(0.25).as_deref(), Some("06:00:00"));
        assert_eq!(excel_serial_to_text(-1.0), None);
    }

    #[test]
    fn excel_serials_out_of_range_are_missing() {
        assert_eq!(
            excel_serial_to_text(2_958_465.0).as_deref(),
            Some("9999-12-31")
        );
        assert_eq!(excel_serial_to_text(2_958_466.0), None);
        assert_eq!(excel_serial_to_text(1.0e15), None);
        assert_eq!(excel_serial_to_text(f64::INFINITY), None);
        assert_eq!(excel_serial_to_text(f64::NAN), None);
    }

    #[test]
    fn early_1900_serials_follow_excel_calendar() {
        assert_eq!(excel_serial_to_text(1.0).as_deref(), Some("1900-01-01"));
        assert_eq!(excel_serial_to_text(59.0).as_deref(), Some("1900-02-28"));
        assert_eq!(excel_serial_to_text(61.0).as_deref(), Some("1900-03-01"));
    }

    #[test]
    fn whole_floats_print_without_decimals() {
        assert_eq!(format_number(6601.0), "6601");
        assert_eq!(format_number(1.5), "1.5");
    }

    #[test]
    fn load_csv_reads_header_and_skips_blank_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("log.csv");
        fs::write(
            &path,
            "CaseNumber,Channel\nC-1,Hotline\n,\nC-2,\n",
        )
        .expect("write csv");

        let table = CaseTable::load(&path).expect("load csv");
        assert_eq!(table.columns(), &["CaseNumber", "Channel"]);
        assert_eq!(table.len(), 2);
        let rows = table.rows().collect::<Vec<_>>();
        assert_eq!(rows[1], &[cell("C-2"), None]);
    }

    #[test]
    fn workbook_cells_map_to_text() {
        assert_eq!(cell_text(&Data::Float(6601.0)), cell("6601"));
        assert_eq!(cell_text(&Data::Float(2.5)), cell("2.5"));
        assert_eq!(cell_text(&Data::Int(42)), cell("42"));
        assert_eq!(cell_text(&Data::Bool(true)), cell("TRUE"));
        assert_eq!(cell_text(&Data::Bool(false)), cell("FALSE"));
        assert_eq!(cell_text(&Data::String("Hotline".to_string())), cell("Hotline"));
        assert_eq!(cell_text(&Data::String("   ".to_string())), None);
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::Error(CellErrorType::NA)), None);
        assert_eq!(
            cell_text(&Data::DateTimeIso("2024-01-15T10:30:00".to_string())),
            cell("2024-01-15T10:30:00")
        );
        let received = ExcelDateTime::new(45306.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_text(&Data::DateTime(received)), cell("2024-01-15"));
    }

    #[test]
    fn load_xlsx_names_blank_headers_and_skips_blank_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hotline_log.xlsx");

        let date = Format::new().set_num_format("yyyy-mm-dd");
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "CaseNumber").expect("header");
        sheet.write_string(0, 2, "DateReceived").expect("header");
        sheet.write_number(1, 0, 6601.0).expect("cell");
        sheet.write_string(1, 1, "Hotline").expect("cell");
        sheet
            .write_number_with_format(1, 2, 45306.0, &date)
            .expect("cell");
        sheet.write_number(3, 0, 6602.0).expect("cell");
        sheet.write_boolean(3, 1, true).expect("cell");
        workbook.save(&path).expect("save workbook");

        let table = CaseTable::load(&path).expect("load xlsx");
        assert_eq!(table.columns(), &["CaseNumber", "column_2", "DateReceived"]);
        assert_eq!(table.len(), 2);
        let rows = table.rows().collect::<Vec<_>>();
        assert_eq!(rows[0], &[cell("6601"), cell("Hotline"), cell("2024-01-15")]);
        assert_eq!(rows[1], &[cell("6602"), cell("TRUE"), None]);
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let err = CaseTable::load(std::path::Path::new("cases.json")).expect_err("json");
        assert_eq!(err, TableError::UnsupportedFormat("json".to_string()));
    }

    #[test]
    fn load_reports_missing_workbook() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = CaseTable::load(&dir.path().join("missing.xlsx")).expect_err("missing file");
        assert!(matches!(err, TableError::Read(_)));
    }
}
