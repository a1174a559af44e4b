//! Figure templates selectable by name

use serde_json::{json, Value};

use crate::domain::errors::DatasetError;

pub const DEFAULT_THEME: &str = "plotly";

const PLOTLY_COLORWAY: [&str; 10] = [
    "#636efa", "#EF553B", "#00cc96", "#ab63fa", "#FFA15A", "#19d3f3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

pub const THEMES: [&str; 7] = [
    "plotly",
    "plotly_white",
    "plotly_dark",
    "ggplot2",
    "seaborn",
    "simple_white",
    "none",
];

/// Template for `name`, in the `{"layout": {...}}` shape
pub fn template(name: &str) -> Result<Value, DatasetError> {
    let layout = match name {
        "plotly" => json!({
            "colorway": PLOTLY_COLORWAY,
            "font": {"color": "#2a3f5f"},
            "paper_bgcolor": "white",
            "plot_bgcolor": "#E5ECF6",
            "title": {"x": 0.05},
            "hovermode": "closest",
            "xaxis": {"gridcolor": "white", "linecolor": "white", "zerolinecolor": "white", "automargin": true},
            "yaxis": {"gridcolor": "white", "linecolor": "white", "zerolinecolor": "white", "automargin": true},
        }),
        "plotly_white" => json!({
            "colorway": PLOTLY_COLORWAY,
            "font": {"color": "#2a3f5f"},
            "paper_bgcolor": "white",
            "plot_bgcolor": "white",
            "title": {"x": 0.05},
            "hovermode": "closest",
            "xaxis": {"gridcolor": "#EBF0F8", "linecolor": "#EBF0F8", "zerolinecolor": "#EBF0F8", "automargin": true},
            "yaxis": {"gridcolor": "#EBF0F8", "linecolor": "#EBF0F8", "zerolinecolor": "#EBF0F8", "automargin": true},
        }),
        "plotly_dark" => json!({
            "colorway": PLOTLY_COLORWAY,
            "font": {"color": "#f2f5fa"},
            "paper_bgcolor": "rgb(17,17,17)",
            "plot_bgcolor": "rgb(17,17,17)",
            "title": {"x": 0.05},
            "hovermode": "closest",
            "xaxis": {"gridcolor": "#283442", "linecolor": "#506784", "zerolinecolor": "#283442", "automargin": true},
            "yaxis": {"gridcolor": "#283442", "linecolor": "#506784", "zerolinecolor": "#283442", "automargin": true},
        }),
        "ggplot2" => json!({
            "colorway": ["#F8766D", "#A3A500", "#00BF7D", "#00B0F6", "#E76BF3"],
            "font": {"color": "rgb(51,51,51)"},
            "paper_bgcolor": "white",
            "plot_bgcolor": "rgb(237,237,237)",
            "xaxis": {"gridcolor": "white", "showgrid": true, "ticks": "outside", "tickcolor": "rgb(51,51,51)"},
            "yaxis": {"gridcolor": "white", "showgrid": true, "ticks": "outside", "tickcolor": "rgb(51,51,51)"},
        }),
        "seaborn" => json!({
            "colorway": [
                "rgb(76,114,176)", "rgb(221,132,82)", "rgb(85,168,104)", "rgb(196,78,82)",
                "rgb(129,114,179)", "rgb(147,120,96)", "rgb(218,139,195)", "rgb(140,140,140)",
                "rgb(204,185,116)", "rgb(100,181,205)"
            ],
            "font": {"color": "rgb(36,36,36)"},
            "paper_bgcolor": "white",
            "plot_bgcolor": "rgb(234,234,242)",
            "xaxis": {"gridcolor": "white", "showgrid": true, "zeroline": false},
            "yaxis": {"gridcolor": "white", "showgrid": true, "zeroline": false},
        }),
        "simple_white" => json!({
            "colorway": [
                "#1F77B4", "#FF7F0E", "#2CA02C", "#D62728", "#9467BD", "#8C564B", "#E377C2",
                "#7F7F7F", "#BCBD22", "#17BECF"
            ],
            "font": {"color": "rgb(36,36,36)"},
            "paper_bgcolor": "white",
            "plot_bgcolor": "white",
            "xaxis": {"showgrid": false, "showline": true, "linecolor": "rgb(36,36,36)", "ticks": "outside"},
            "yaxis": {"showgrid": false, "showline": true, "linecolor": "rgb(36,36,36)", "ticks": "outside"},
        }),
        "none" => json!({}),
        other => {
            return Err(DatasetError::InvalidArguments(format!(
                "Unknown theme '{}'. Available themes: {}",
                other,
                THEMES.join(", ")
            )))
        }
    };

    Ok(json!({ "layout": layout }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_themes_resolve() {
        for name in THEMES {
            let template = template(name).unwrap();
            assert!(template["layout"].is_object(), "{}", name);
        }
    }

    #[test]
    fn test_default_theme_colorway() {
        let template = template(DEFAULT_THEME).unwrap();
        assert_eq!(template["layout"]["colorway"][0], "#636efa");
    }

    #[test]
    fn test_unknown_theme() {
        let err = template("solarized").unwrap_err();
        assert!(matches!(err, DatasetError::InvalidArguments(_)));
        assert!(err.to_string().contains("plotly_dark"));
    }
}
