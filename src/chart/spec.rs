use std::error::Error;
use std::fmt::{Display, Formatter};

use serde::Deserialize;

use crate::llm::LlmError;

pub const SPEC_OPEN_TAG: &str = "<chart_spec>";
pub const SPEC_CLOSE_TAG: &str = "</chart_spec>";

/// Declarative chart description returned by the model. Only the fields
/// below are accepted; anything else fails parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub group_by: String,
    #[serde(default)]
    pub date_bucket: Option<DateBucket>,
    #[serde(default)]
    pub aggregate: Aggregate,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Pie => "pie",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBucket {
    Day,
    Month,
    Year,
}

impl DateBucket {
    /// Length of the `YYYY-MM-DD` prefix kept for this bucket.
    pub fn prefix_len(self) -> usize {
        match self {
            Self::Day => 10,
            Self::Month => 7,
            Self::Year => 4,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAggregate")]
pub enum Aggregate {
    #[default]
    Count,
    CountDistinct {
        column: String,
    },
}

/// Wire shape of `aggregate`. Only `op` and `column` are accepted, and
/// `column` only for `count_distinct`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAggregate {
    op: AggregateOp,
    column: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum AggregateOp {
    Count,
    CountDistinct,
}

impl TryFrom<RawAggregate> for Aggregate {
    type Error = String;

    fn try_from(raw: RawAggregate) -> Result<Self, Self::Error> {
        match (raw.op, raw.column) {
            (AggregateOp::Count, None) => Ok(Self::Count),
            (AggregateOp::Count, Some(column)) => Err(format!(
                "aggregate 'count' takes no column (got '{column}')"
            )),
            (AggregateOp::CountDistinct, Some(column)) => Ok(Self::CountDistinct { column }),
            (AggregateOp::CountDistinct, None) => {
                Err("aggregate 'count_distinct' needs a column".to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    pub column: String,
    pub equals: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    ValueDesc,
    ValueAsc,
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartError {
    Llm(LlmError),
    MissingSpecTags,
    InvalidSpec(String),
    UnknownColumn(String),
}

impl Display for ChartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Llm(err) => write!(f, "chart request failed: {err}"),
            Self::MissingSpecTags => write!(
                f,
                "chart response did not contain a {SPEC_OPEN_TAG}...{SPEC_CLOSE_TAG} block"
            ),
            Self::InvalidSpec(msg) => write!(f, "invalid chart spec: {msg}"),
            Self::UnknownColumn(name) => write!(f, "chart spec references unknown column '{name}'"),
        }
    }
}

impl Error for ChartError {}

impl From<LlmError> for ChartError {
    fn from(err: LlmError) -> Self {
        Self::Llm(err)
    }
}

/// Inner text of the first `open ... close` pair, with outer whitespace
/// trimmed. Internal newlines are kept as-is.
pub fn extract_tagged<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let len = text[start..].find(close)?;
    Some(text[start..start + len].trim())
}

pub fn parse_chart_spec(response: &str) -> Result<ChartSpec, ChartError> {
    let body = extract_tagged(response, SPEC_OPEN_TAG, SPEC_CLOSE_TAG)
        .ok_or(ChartError::MissingSpecTags)?;
    let body = strip_code_fence(body);

    let spec = serde_json::from_str::<ChartSpec>(body)
        .map_err(|err| ChartError::InvalidSpec(err.to_string()))?;
    if spec.limit == Some(0) {
        return Err(ChartError::InvalidSpec("limit must be at least 1".to_string()));
    }
    if spec.group_by.trim().is_empty() {
        return Err(ChartError::InvalidSpec("group_by must name a column".to_string()));
    }
    Ok(spec)
}

// Models like to wrap JSON in ```json fences even inside the tags.
fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
