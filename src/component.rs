use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::figure::Figure;
use crate::table::DataTable;

/// CSS class carried by every error payload
pub const ERROR_CLASS: &str = "dash-error";

/// Markdown prop that lets raw HTML in the source through unescaped
pub const ALLOW_HTML_PROP: &str = "dangerously_allow_html";

/// Node of a dashboard render tree
///
/// Serialized as `{"type", "id", "props", "children"}` with empty parts
/// omitted. The browser renderer and [`Component::to_html`] both consume
/// this shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Component>,
}

impl Component {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: None,
            props: Map::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_prop(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.props.insert(name.to_string(), value.into());
        self
    }

    pub fn with_class(self, class: &str) -> Self {
        self.with_prop("className", class)
    }

    pub fn with_child(mut self, child: Component) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Component>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn div(children: impl IntoIterator<Item = Component>) -> Self {
        Self::new("Div").with_children(children)
    }

    pub fn text(text: &str) -> Self {
        Self::new("Text").with_prop("text", text)
    }

    pub fn heading(level: u8, text: &str) -> Self {
        let level = level.clamp(1, 6);
        Self::new(&format!("H{}", level)).with_child(Self::text(text))
    }

    pub fn link(href: &str, label: &str) -> Self {
        Self::new("Link")
            .with_prop("href", href)
            .with_child(Self::text(label))
    }

    /// Tab strip whose `value` property holds the selected tab's value
    pub fn tabs(id: &str, value: &str, tabs: impl IntoIterator<Item = Component>) -> Self {
        Self::new("Tabs")
            .with_id(id)
            .with_prop("value", value)
            .with_children(tabs)
    }

    pub fn tab(label: &str, value: &str) -> Self {
        Self::new("Tab")
            .with_prop("label", label)
            .with_prop("value", value)
    }

    pub fn dropdown<S: AsRef<str>>(id: &str, options: &[S], value: &str) -> Self {
        let options: Vec<Value> = options
            .iter()
            .map(|o| json!({ "label": o.as_ref(), "value": o.as_ref() }))
            .collect();
        Self::new("Dropdown")
            .with_id(id)
            .with_prop("options", options)
            .with_prop("value", value)
    }

    /// Invisible component exposing the browser's `pathname`
    pub fn location(id: &str) -> Self {
        Self::new("Location").with_id(id)
    }

    /// Range input with a numeric `value` property
    pub fn slider(id: &str, min: f64, max: f64, value: f64) -> Self {
        Self::new("Slider")
            .with_id(id)
            .with_prop("min", min)
            .with_prop("max", max)
            .with_prop("value", value)
    }

    pub fn graph(id: &str, figure: &Figure) -> Self {
        Self::new("Graph")
            .with_id(id)
            .with_prop("figure", figure.to_value())
    }

    pub fn data_table(id: &str, table: &DataTable) -> Self {
        Self::new("DataTable")
            .with_id(id)
            .with_prop("columns", table.headers())
            .with_prop("data", Value::from(table.rows.clone()))
    }

    /// Markdown text; raw HTML in `source` is escaped unless the
    /// `dangerously_allow_html` prop is `true`
    pub fn markdown(source: &str) -> Self {
        Self::new("Markdown").with_prop("source", source)
    }

    /// Visible error payload rendered in place of missing content
    pub fn error(message: &str) -> Self {
        Self::div([Self::text(message)]).with_class(ERROR_CLASS)
    }

    pub fn is_error(&self) -> bool {
        self.props.get("className").and_then(Value::as_str) == Some(ERROR_CLASS)
    }

    /// Depth-first search for the component with the given id
    pub fn find(&self, id: &str) -> Option<&Component> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Every id in the tree, in depth-first order
    pub fn ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        if let Some(id) = &self.id {
            ids.push(id);
        }
        for child in &self.children {
            child.collect_ids(ids);
        }
    }

    /// Concatenated text of every text node in the tree
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        if let Some(text) = self.props.get("text").and_then(Value::as_str) {
            out.push_str(text);
        }
        for child in &self.children {
            out.push_str(&child.text_content());
        }
        out
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Static HTML rendering used for the first paint and for exports
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self.kind.as_str() {
            "Text" => {
                let text = self.props.get("text").and_then(Value::as_str).unwrap_or("");
                out.push_str(&escape_html(text));
            }
            "Location" => {}
            "Markdown" => {
                let source = self.props.get("source").and_then(Value::as_str).unwrap_or("");
                let trusted = self
                    .props
                    .get(ALLOW_HTML_PROP)
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                self.open_tag(out, "div", Some("markdown"));
                if trusted {
                    out.push_str(&crate::markdown::to_html_trusted(source));
                } else {
                    out.push_str(&crate::markdown::to_html(source));
                }
                out.push_str("</div>");
            }
            "Dropdown" => {
                self.open_tag(out, "select", None);
                let selected = self.props.get("value").and_then(Value::as_str);
                let options = self.props.get("options").and_then(Value::as_array);
                for option in options.into_iter().flatten() {
                    let value = option["value"].as_str().unwrap_or("");
                    let label = option["label"].as_str().unwrap_or(value);
                    out.push_str(&format!(
                        "<option value=\"{}\"{}>{}</option>",
                        escape_html(value),
                        if selected == Some(value) { " selected" } else { "" },
                        escape_html(label)
                    ));
                }
                out.push_str("</select>");
            }
            "Tab" => {
                let value = self.props.get("value").and_then(Value::as_str).unwrap_or("");
                let label = self.props.get("label").and_then(Value::as_str).unwrap_or(value);
                out.push_str(&format!(
                    "<button class=\"tab\" data-value=\"{}\">{}</button>",
                    escape_html(value),
                    escape_html(label)
                ));
            }
            "Graph" => {
                let figure = self.props.get("figure").cloned().unwrap_or(Value::Null);
                let attrs = format!(" data-figure=\"{}\"", escape_html(&figure.to_string()));
                self.open_tag_with(out, "div", Some("dash-graph"), &attrs);
                out.push_str("</div>");
            }
            "Tabs" => {
                let value = self.props.get("value").and_then(Value::as_str).unwrap_or("");
                let attrs = format!(" data-value=\"{}\"", escape_html(value));
                self.open_tag_with(out, "div", Some("tabs"), &attrs);
                self.write_children(out);
                out.push_str("</div>");
            }
            "Slider" => {
                let number = |name: &str| self.props.get(name).cloned().unwrap_or(Value::from(0));
                let attrs = format!(
                    " type=\"range\" min=\"{}\" max=\"{}\" value=\"{}\"",
                    number("min"),
                    number("max"),
                    number("value")
                );
                self.open_tag_with(out, "input", None, &attrs);
            }
            "DataTable" => self.write_table(out),
            "Link" => {
                let href = self.props.get("href").and_then(Value::as_str).unwrap_or("#");
                out.push_str(&format!("<a href=\"{}\">", escape_html(href)));
                self.write_children(out);
                out.push_str("</a>");
            }
            kind => {
                let tag = match kind {
                    "H1" => "h1",
                    "H2" => "h2",
                    "H3" => "h3",
                    "H4" => "h4",
                    "H5" => "h5",
                    "H6" => "h6",
                    _ => "div",
                };
                self.open_tag(out, tag, None);
                self.write_children(out);
                out.push_str(&format!("</{}>", tag));
            }
        }
    }

    fn open_tag(&self, out: &mut String, tag: &str, default_class: Option<&str>) {
        self.open_tag_with(out, tag, default_class, "");
    }

    fn open_tag_with(&self, out: &mut String, tag: &str, default_class: Option<&str>, attrs: &str) {
        out.push('<');
        out.push_str(tag);
        if let Some(id) = &self.id {
            out.push_str(&format!(" id=\"{}\"", escape_html(id)));
        }
        let class = self
            .props
            .get("className")
            .and_then(Value::as_str)
            .or(default_class);
        if let Some(class) = class {
            out.push_str(&format!(" class=\"{}\"", escape_html(class)));
        }
        out.push_str(attrs);
        out.push('>');
    }

    fn write_children(&self, out: &mut String) {
        for child in &self.children {
            child.write_html(out);
        }
    }

    fn write_table(&self, out: &mut String) {
        self.open_tag(out, "table", None);
        out.push_str("<thead><tr>");
        let columns = self.props.get("columns").and_then(Value::as_array);
        for column in columns.into_iter().flatten() {
            let name = column.as_str().map(str::to_string).unwrap_or_else(|| column.to_string());
            out.push_str(&format!("<th>{}</th>", escape_html(&name)));
        }
        out.push_str("</tr></thead><tbody>");
        let rows = self.props.get("data").and_then(Value::as_array);
        for row in rows.into_iter().flatten() {
            out.push_str("<tr>");
            for cell in row.as_array().into_iter().flatten() {
                let text = match cell {
                    Value::Null => String::new(),
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push_str(&format!("<td>{}</td>", escape_html(&text)));
            }
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");
    }
}

/// Escapes the five HTML-significant characters
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
