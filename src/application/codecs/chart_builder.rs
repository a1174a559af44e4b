//! Tabular data -> chart figure
//!
//! Each chart kind maps to one construction function in [`CHART_BUILDERS`].
//! Construction follows the conventions of plotly express: a `color` column
//! splits rows into one trace per distinct value, axis titles default to the
//! column names, and the theme and layout overrides are applied last.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;
use validator::Validate;

use super::themes;
use crate::domain::entities::{Figure, TabularData, Trace};
use crate::domain::errors::DatasetError;
use crate::domain::value_objects::ChartKind;

fn default_theme() -> String {
    themes::DEFAULT_THEME.to_string()
}

/// What to plot and how; read from `plotly_args`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "fig", default)]
    pub params: ChartParams,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub layout: Map<String, Value>,
}

impl ChartSpec {
    pub fn new(kind: impl Into<String>, params: ChartParams) -> Self {
        Self {
            kind: kind.into(),
            params,
            theme: default_theme(),
            layout: Map::new(),
        }
    }
}

/// Arguments of a chart construction function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChartParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// `v` or `h`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display names for columns
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Copied onto every trace
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

type BuildFn = fn(&TabularData, &ChartParams) -> Result<Figure, DatasetError>;

/// Construction function per chart kind
pub const CHART_BUILDERS: [(ChartKind, BuildFn); 7] = [
    (ChartKind::Bar, build_bar),
    (ChartKind::Line, build_line),
    (ChartKind::Scatter, build_scatter),
    (ChartKind::Area, build_area),
    (ChartKind::Histogram, build_histogram),
    (ChartKind::Box, build_box),
    (ChartKind::Pie, build_pie),
];

/// Builds figures from tabular data
#[derive(Debug, Clone, Copy, Default)]
pub struct ChartArtifactBuilder;

impl ChartArtifactBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the figure for `spec`; `data` is left untouched
    pub fn build(&self, data: &TabularData, spec: &ChartSpec) -> Result<Figure, DatasetError> {
        let kind: ChartKind = spec.kind.parse()?;
        let build_fn = CHART_BUILDERS
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, build_fn)| *build_fn)
            .ok_or_else(|| DatasetError::UnsupportedChartKind(spec.kind.clone()))?;

        spec.params.validate()?;
        let template = themes::template(&spec.theme)?;

        let mut figure = build_fn(data, &spec.params)?;
        figure.set_template(template);
        figure.update_layout(&spec.layout);

        debug!(
            kind = %kind,
            traces = figure.data.len(),
            rows = data.num_rows(),
            "Built chart"
        );
        Ok(figure)
    }
}

struct Group {
    value: Option<Value>,
    rows: Vec<usize>,
}

impl Group {
    fn name(&self) -> String {
        match &self.value {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

fn column<'a>(data: &'a TabularData, name: &str) -> Result<&'a [Value], DatasetError> {
    data.column(name).ok_or_else(|| {
        DatasetError::InvalidArguments(format!(
            "Column '{}' not found. Available columns: {}",
            name,
            data.column_names().collect::<Vec<_>>().join(", ")
        ))
    })
}

fn label(params: &ChartParams, column: &str) -> String {
    params
        .labels
        .get(column)
        .cloned()
        .unwrap_or_else(|| column.to_string())
}

/// Rows per distinct `color` value, in first-seen order
fn groups(data: &TabularData, params: &ChartParams) -> Result<Vec<Group>, DatasetError> {
    let rows = data.num_rows();
    let Some(color) = &params.color else {
        return Ok(vec![Group {
            value: None,
            rows: (0..rows).collect(),
        }]);
    };

    let mut groups: Vec<Group> = Vec::new();
    for (row, value) in column(data, color)?.iter().enumerate() {
        match groups.iter_mut().find(|g| g.value.as_ref() == Some(value)) {
            Some(group) => group.rows.push(row),
            None => groups.push(Group {
                value: Some(value.clone()),
                rows: vec![row],
            }),
        }
    }
    Ok(groups)
}

/// Values at `rows`; rows past the end of a short column read as null
fn pick(values: &[Value], rows: &[usize]) -> Value {
    Value::Array(
        rows.iter()
            .map(|&row| values.get(row).cloned().unwrap_or(Value::Null))
            .collect(),
    )
}

/// Column values, or the row index when the column is not given
fn axis_values(
    data: &TabularData,
    column_name: Option<&str>,
) -> Result<Vec<Value>, DatasetError> {
    match column_name {
        Some(name) => Ok(column(data, name)?.to_vec()),
        None => Ok((0..data.num_rows()).map(Value::from).collect()),
    }
}

fn axis_label(params: &ChartParams, column_name: Option<&str>) -> String {
    column_name.map_or_else(|| "index".to_string(), |name| label(params, name))
}

fn new_trace(kind: &str, group: &Group, params: &ChartParams) -> Trace {
    let mut trace = Trace::new(kind);
    let name = group.name();
    trace
        .set("name", name.clone())
        .set("legendgroup", name)
        .set("showlegend", group.value.is_some());
    if let Some(opacity) = params.opacity {
        trace.set("marker", json!({ "opacity": opacity }));
    }
    trace
}

fn finish_trace(mut trace: Trace, params: &ChartParams) -> Trace {
    trace.update(&params.extra);
    trace
}

fn base_layout(figure: &mut Figure, params: &ChartParams) {
    let mut layout = json!({
        "legend": {"tracegroupgap": 0},
        "margin": {"t": 60},
    });
    if let Some(color) = &params.color {
        layout["legend"]["title"] = json!({ "text": label(params, color) });
    }
    if let Some(title) = &params.title {
        layout["title"] = json!({ "text": title });
    }
    if let Value::Object(layout) = layout {
        figure.update_layout(&layout);
    }
}

fn axis_titles(figure: &mut Figure, x: String, y: String) {
    let layout = json!({
        "xaxis": {"title": {"text": x}},
        "yaxis": {"title": {"text": y}},
    });
    if let Value::Object(layout) = layout {
        figure.update_layout(&layout);
    }
}

/// Shared body of the x/y chart kinds
fn build_xy(
    data: &TabularData,
    params: &ChartParams,
    kind: ChartKind,
    trace_type: &str,
    style: &dyn Fn(&mut Trace),
) -> Result<Figure, DatasetError> {
    let (x, y) = (params.x.as_deref(), params.y.as_deref());
    if x.is_none() && y.is_none() {
        return Err(DatasetError::InvalidArguments(format!(
            "{} chart requires at least one of 'x' or 'y'",
            kind
        )));
    }
    let x_values = axis_values(data, x)?;
    let y_values = axis_values(data, y)?;

    let mut figure = Figure::new();
    for group in groups(data, params)? {
        let mut trace = new_trace(trace_type, &group, params);
        trace
            .set("x", pick(&x_values, &group.rows))
            .set("y", pick(&y_values, &group.rows));
        if let Some(orientation) = &params.orientation {
            trace.set("orientation", orientation.clone());
        }
        style(&mut trace);
        figure.add_trace(finish_trace(trace, params));
    }

    base_layout(&mut figure, params);
    axis_titles(&mut figure, axis_label(params, x), axis_label(params, y));
    Ok(figure)
}

fn build_bar(data: &TabularData, params: &ChartParams) -> Result<Figure, DatasetError> {
    let orientation = params.orientation.clone().unwrap_or_else(|| "v".to_string());
    let mut figure = build_xy(data, params, ChartKind::Bar, "bar", &|trace| {
        trace.set("orientation", orientation.clone());
    })?;
    figure.update_layout(&object(json!({"barmode": "relative"})));
    Ok(figure)
}

fn build_line(data: &TabularData, params: &ChartParams) -> Result<Figure, DatasetError> {
    let mode = if params.markers.unwrap_or(false) {
        "lines+markers"
    } else {
        "lines"
    };
    build_xy(data, params, ChartKind::Line, "scatter", &|trace| {
        trace.set("mode", mode);
    })
}

fn build_scatter(data: &TabularData, params: &ChartParams) -> Result<Figure, DatasetError> {
    build_xy(data, params, ChartKind::Scatter, "scatter", &|trace| {
        trace.set("mode", "markers");
    })
}

fn build_area(data: &TabularData, params: &ChartParams) -> Result<Figure, DatasetError> {
    build_xy(data, params, ChartKind::Area, "scatter", &|trace| {
        trace.set("mode", "lines").set("stackgroup", "1");
    })
}

fn build_histogram(data: &TabularData, params: &ChartParams) -> Result<Figure, DatasetError> {
    let (x, y) = (params.x.as_deref(), params.y.as_deref());
    // Binned axis: x unless only y is given
    let (binned, summed, horizontal) = match (x, y) {
        (Some(x), y) => (x, y, false),
        (None, Some(y)) => (y, None, true),
        (None, None) => {
            return Err(DatasetError::InvalidArguments(
                "histogram chart requires at least one of 'x' or 'y'".to_string(),
            ))
        }
    };
    let binned_values = column(data, binned)?;
    let summed_values = summed.map(|name| column(data, name)).transpose()?;

    let mut figure = Figure::new();
    for group in groups(data, params)? {
        let mut trace = new_trace("histogram", &group, params);
        let (binned_axis, summed_axis, nbins_key) = if horizontal {
            ("y", "x", "nbinsy")
        } else {
            ("x", "y", "nbinsx")
        };
        trace.set(binned_axis, pick(binned_values, &group.rows));
        if let Some(values) = summed_values {
            trace
                .set(summed_axis, pick(values, &group.rows))
                .set("histfunc", "sum");
        }
        if let Some(nbins) = params.nbins {
            trace.set(nbins_key, nbins);
        }
        if horizontal {
            trace.set("orientation", "h");
        }
        figure.add_trace(finish_trace(trace, params));
    }

    base_layout(&mut figure, params);
    let binned_label = label(params, binned);
    let value_label = match summed {
        Some(name) => format!("sum of {}", label(params, name)),
        None => "count".to_string(),
    };
    if horizontal {
        axis_titles(&mut figure, value_label, binned_label);
    } else {
        axis_titles(&mut figure, binned_label, value_label);
    }
    figure.update_layout(&object(json!({"barmode": "relative"})));
    Ok(figure)
}

fn build_box(data: &TabularData, params: &ChartParams) -> Result<Figure, DatasetError> {
    let (x, y) = (params.x.as_deref(), params.y.as_deref());
    if x.is_none() && y.is_none() {
        return Err(DatasetError::InvalidArguments(
            "box chart requires at least one of 'x' or 'y'".to_string(),
        ));
    }
    let x_values = x.map(|name| column(data, name)).transpose()?;
    let y_values = y.map(|name| column(data, name)).transpose()?;

    let mut figure = Figure::new();
    for group in groups(data, params)? {
        let mut trace = new_trace("box", &group, params);
        if let Some(values) = x_values {
            trace.set("x", pick(values, &group.rows));
        }
        if let Some(values) = y_values {
            trace.set("y", pick(values, &group.rows));
        }
        if let Some(orientation) = &params.orientation {
            trace.set("orientation", orientation.clone());
        }
        figure.add_trace(finish_trace(trace, params));
    }

    base_layout(&mut figure, params);
    if let Some(x) = x {
        figure.update_layout(&object(json!({"xaxis": {"title": {"text": label(params, x)}}})));
    }
    if let Some(y) = y {
        figure.update_layout(&object(json!({"yaxis": {"title": {"text": label(params, y)}}})));
    }
    if params.color.is_some() {
        figure.update_layout(&object(json!({"boxmode": "group"})));
    }
    Ok(figure)
}

fn build_pie(data: &TabularData, params: &ChartParams) -> Result<Figure, DatasetError> {
    if params.color.is_some() {
        return Err(DatasetError::InvalidArguments(
            "pie chart does not support 'color'; use 'names'".to_string(),
        ));
    }
    if params.names.is_none() && params.values.is_none() {
        return Err(DatasetError::InvalidArguments(
            "pie chart requires at least one of 'names' or 'values'".to_string(),
        ));
    }

    let mut trace = Trace::new("pie");
    if let Some(names) = &params.names {
        trace.set("labels", column(data, names)?.to_vec());
    }
    if let Some(values) = &params.values {
        trace.set("values", column(data, values)?.to_vec());
    }
    if let Some(opacity) = params.opacity {
        trace.set("opacity", opacity);
    }

    let mut figure = Figure::new();
    figure.add_trace(finish_trace(trace, params));
    base_layout(&mut figure, params);
    Ok(figure)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
