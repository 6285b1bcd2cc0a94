use super::spec::ChartKind;

const MAX_LABEL_CHARS: usize = 24;
const BAR_GLYPH: char = '█';
const POINT_GLYPH: char = '●';
pub const NO_DATA_TEXT: &str = "No data to plot";

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    pub label: String,
    pub value: f64,
}

/// A rendered chart: already aggregated, sorted and truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<DataPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FigureLineKind {
    Title,
    Axis,
    Data,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FigureLine {
    pub kind: FigureLineKind,
    pub text: String,
}

impl FigureLine {
    fn new(kind: FigureLineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

impl Figure {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Terminal rendering; `max_bar_width` is the glyph count of the largest
    /// value's bar.
    pub fn render_lines(&self, max_bar_width: usize) -> Vec<FigureLine> {
        let max_bar_width = max_bar_width.max(1);
        let mut lines = vec![
            FigureLine::new(FigureLineKind::Title, self.title.clone()),
            FigureLine::new(
                FigureLineKind::Axis,
                format!("x: {}  y: {}", self.x_label, self.y_label),
            ),
        ];

        if self.is_empty() {
            lines.push(FigureLine::new(FigureLineKind::Empty, NO_DATA_TEXT));
            return lines;
        }

        let labels = self
            .points
            .iter()
            .map(|point| shorten_label(&point.label))
            .collect::<Vec<_>>();
        let label_width = labels
            .iter()
            .map(|label| label.chars().count())
            .max()
            .unwrap_or(0);
        let max_value = self
            .points
            .iter()
            .map(|point| point.value)
            .fold(0.0_f64, f64::max);
        let total = self.points.iter().map(|point| point.value).sum::<f64>();

        for (point, label) in self.points.iter().zip(labels) {
            let body = match self.kind {
                ChartKind::Bar => format!(
                    "{} {}",
                    bar(point.value, max_value, max_bar_width),
                    format_value(point.value)
                ),
                ChartKind::Line => {
                    let offset = scaled(point.value, max_value, max_bar_width - 1);
                    format!(
                        "{}{POINT_GLYPH} {}",
                        " ".repeat(offset),
                        format_value(point.value)
                    )
                }
                ChartKind::Pie => {
                    let share = if total > 0.0 { point.value / total } else { 0.0 };
                    format!(
                        "{} {:.1}% ({})",
                        bar(share, 1.0, max_bar_width),
                        share * 100.0,
                        format_value(point.value)
                    )
                }
            };
            lines.push(FigureLine::new(
                FigureLineKind::Data,
                format!("{label:<label_width$} │{body}"),
            ));
        }

        lines
    }

    pub fn to_text(&self, max_bar_width: usize) -> String {
        self.render_lines(max_bar_width)
            .into_iter()
            .map(|line| line.text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn scaled(value: f64, max_value: f64, width: usize) -> usize {
    if max_value <= 0.0 || value <= 0.0 {
        return 0;
    }
    ((value / max_value) * width as f64).round() as usize
}

fn bar(value: f64, max_value: f64, width: usize) -> String {
    let mut len = scaled(value, max_value, width);
    if len == 0 && value > 0.0 {
        len = 1;
    }
    BAR_GLYPH.to_string().repeat(len)
}

pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn shorten_label(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        return label.to_string();
    }
    let head = label.chars().take(MAX_LABEL_CHARS - 1).collect::<String>();
    format!("{head}…")
}
