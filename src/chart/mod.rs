mod figure;
mod generator;
mod interpret;
mod spec;

pub use figure::{DataPoint, Figure, FigureLine, FigureLineKind, NO_DATA_TEXT};
pub use generator::{GeneratedChart, chart_instruction, generate_chart};
pub use interpret::build_figure;
pub use spec::{
    Aggregate, ChartError, ChartKind, ChartSpec, DateBucket, Filter, SPEC_CLOSE_TAG,
    SPEC_OPEN_TAG, SortOrder, extract_tagged, parse_chart_spec,
};
