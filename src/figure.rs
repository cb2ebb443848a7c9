use serde::{Deserialize, Serialize};

/// Available trace types supported by the chart renderer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceKind {
    /// Points only
    Scatter,

    /// Points connected with lines
    Line,

    /// Vertical bars
    Bar,
}

/// One data series of a figure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: TraceKind,

    #[serde(default)]
    pub name: String,

    pub x: Vec<f64>,

    pub y: Vec<f64>,
}

impl Trace {
    pub fn new(kind: TraceKind, name: &str, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self {
            kind,
            name: name.to_string(),
            x,
            y,
        }
    }

    pub fn line(name: &str, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new(TraceKind::Line, name, x, y)
    }

    pub fn scatter(name: &str, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new(TraceKind::Scatter, name, x, y)
    }

    pub fn bar(name: &str, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self::new(TraceKind::Bar, name, x, y)
    }

    /// Pairs up x and y values, ignoring the tail of the longer side
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }
}

/// Styling shared by all traces of a figure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FigureLayout {
    /// Title displayed at the top of the chart
    #[serde(default)]
    pub title: String,

    /// Label for the X-axis
    #[serde(default)]
    pub x_label: String,

    /// Label for the Y-axis
    #[serde(default)]
    pub y_label: String,
}

impl Default for FigureLayout {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: "X Axis".to_string(),
            y_label: "Y Axis".to_string(),
        }
    }
}

/// Data-plus-styling description of one chart
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub data: Vec<Trace>,

    #[serde(default)]
    pub layout: FigureLayout,
}

impl Figure {
    pub fn new(title: &str) -> Self {
        Self {
            data: Vec::new(),
            layout: FigureLayout {
                title: title.to_string(),
                ..FigureLayout::default()
            },
        }
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.data.push(trace);
        self
    }

    pub fn with_labels(mut self, x_label: &str, y_label: &str) -> Self {
        self.layout.x_label = x_label.to_string();
        self.layout.y_label = y_label.to_string();
        self
    }

    /// Bounding box over every trace as `(min_x, max_x, min_y, max_y)`
    ///
    /// Returns `None` when the figure holds no points.
    pub fn bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.data.iter().flat_map(Trace::points);
        let (x0, y0) = points.next()?;
        Some(points.fold((x0, x0, y0, y0), |(min_x, max_x, min_y, max_y), (x, y)| {
            (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
        }))
    }

    /// Converts the figure to the JSON value carried by a graph component
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
