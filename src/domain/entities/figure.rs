//! Declarative chart figure in the plotly JSON shape
//!
//! A figure is `{"data": [trace, ...], "layout": {...}}`. Layout updates
//! follow plotly's conventions: underscore-separated keys address nested
//! properties (`xaxis_title_text`) and plain-string titles are expanded to
//! `{"text": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property names that contain an underscore and must not be split
const COMPOUND_PROPERTIES: [&str; 5] = [
    "paper_bgcolor",
    "plot_bgcolor",
    "error_x",
    "error_y",
    "error_z",
];

/// A single trace; `type` selects the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Trace {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            properties: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Merge properties using the same rules as layout updates
    pub fn update(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            set_nested(&mut self.properties, key, value.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    #[serde(default)]
    pub data: Vec<Trace>,
    #[serde(default)]
    pub layout: Map<String, Value>,
}

impl Figure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_trace(&mut self, trace: Trace) {
        self.data.push(trace);
    }

    /// Apply layout overrides; later calls win
    pub fn update_layout(&mut self, updates: &Map<String, Value>) {
        for (key, value) in updates {
            set_nested(&mut self.layout, key, value.clone());
        }
    }

    /// Replace the layout template
    pub fn set_template(&mut self, template: Value) {
        self.layout.insert("template".to_string(), template);
    }

    /// Look up a layout property by dotted path, e.g. `title.text`
    pub fn layout_value(&self, path: &str) -> Option<&Value> {
        lookup(&self.layout, path)
    }

    /// Layout as rendered: template layout defaults overlaid with the
    /// figure's own layout
    pub fn resolved_layout(&self) -> Map<String, Value> {
        let mut resolved = self
            .layout
            .get("template")
            .and_then(|template| template.get("layout"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        for (key, value) in &self.layout {
            if key == "template" {
                continue;
            }
            merge_value(&mut resolved, key, value.clone());
        }
        resolved
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    parts.try_fold(map.get(first)?, |value, part| value.get(part))
}

/// Split a magic-underscore key into property path segments
fn split_key(key: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut pieces = key.split('_').peekable();

    while let Some(piece) = pieces.next() {
        let mut segment = piece.to_string();
        if let Some(next) = pieces.peek() {
            let joined = format!("{}_{}", segment, next);
            if COMPOUND_PROPERTIES.contains(&joined.as_str()) {
                segment = joined;
                pieces.next();
            }
        }
        segments.push(segment);
    }
    segments
}

fn normalise(last: &str, value: Value) -> Value {
    match value {
        Value::String(text) if last == "title" => {
            let mut title = Map::new();
            title.insert("text".to_string(), Value::String(text));
            Value::Object(title)
        }
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                set_nested(&mut out, &key, value);
            }
            Value::Object(out)
        }
        other => other,
    }
}

fn set_nested(target: &mut Map<String, Value>, key: &str, value: Value) {
    let segments = split_key(key);
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = target;
    for parent in parents {
        let entry = current
            .entry(parent.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }

    merge_value(current, last, normalise(last, value));
}

/// Objects merge recursively; anything else replaces
fn merge_value(target: &mut Map<String, Value>, key: &str, value: Value) {
    match (target.get_mut(key), value) {
        (Some(Value::Object(existing)), Value::Object(incoming)) => {
            for (child_key, child_value) in incoming {
                merge_value(existing, &child_key, child_value);
            }
        }
        (_, value) => {
            target.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn updates(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_string_title_becomes_text() {
        let mut figure = Figure::new();
        figure.update_layout(&updates(json!({"title": "Test"})));
        assert_eq!(figure.layout_value("title.text"), Some(&json!("Test")));
    }

    #[test]
    fn test_magic_underscore_keys() {
        let mut figure = Figure::new();
        figure.update_layout(&updates(json!({
            "xaxis_title": "x",
            "yaxis_title_font_size": 14,
            "paper_bgcolor": "white",
        })));

        assert_eq!(figure.layout_value("xaxis.title.text"), Some(&json!("x")));
        assert_eq!(
            figure.layout_value("yaxis.title.font.size"),
            Some(&json!(14))
        );
        assert_eq!(figure.layout_value("paper_bgcolor"), Some(&json!("white")));
    }

    #[test]
    fn test_nested_updates_merge() {
        let mut figure = Figure::new();
        figure.update_layout(&updates(json!({"xaxis": {"title": {"text": "a"}, "showgrid": true}})));
        figure.update_layout(&updates(json!({"xaxis": {"title": "b"}})));

        assert_eq!(figure.layout_value("xaxis.title.text"), Some(&json!("b")));
        assert_eq!(figure.layout_value("xaxis.showgrid"), Some(&json!(true)));
    }

    #[test]
    fn test_resolved_layout_prefers_figure_over_template() {
        let mut figure = Figure::new();
        figure.set_template(json!({"layout": {"font": {"color": "#2a3f5f", "size": 12}, "title": {"x": 0.05}}}));
        figure.update_layout(&updates(json!({"title": "T", "font_size": 16})));

        let layout = figure.resolved_layout();
        assert_eq!(layout["title"], json!({"x": 0.05, "text": "T"}));
        assert_eq!(layout["font"], json!({"color": "#2a3f5f", "size": 16}));
        assert!(!layout.contains_key("template"));
    }

    #[test]
    fn test_figure_json_shape() {
        let mut figure = Figure::new();
        let mut trace = Trace::new("bar");
        trace.set("x", json!(["a", "b"])).set("y", json!([1, 2]));
        figure.add_trace(trace);

        let value = serde_json::to_value(&figure).unwrap();
        assert_eq!(
            value,
            json!({"data": [{"type": "bar", "x": ["a", "b"], "y": [1, 2]}], "layout": {}})
        );

        let back: Figure = serde_json::from_value(value).unwrap();
        assert_eq!(back, figure);
    }

    #[test]
    fn test_trace_update_splits_keys() {
        let mut trace = Trace::new("scatter");
        trace.update(&updates(json!({"marker_color": "red", "error_y": {"visible": true}})));
        assert_eq!(trace.get("marker"), Some(&json!({"color": "red"})));
        assert_eq!(trace.get("error_y"), Some(&json!({"visible": true})));
    }
}
