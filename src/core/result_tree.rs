//! Hierarchical result tracking
//!
//! A [`ResultNode`] records the outcome of one build step or category. Nodes
//! nest; the aggregate status of a node is `Failed` as soon as the node itself
//! or any descendant failed. Trees are written to JSON so results produced by a
//! separate tool (e.g. the release-note generator) can be grafted into the
//! release report, and rendered as text or HTML for operators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::ReportError;

/// Outcome of a step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    /// Step succeeded
    #[default]
    Ok,
    /// Step failed
    Failed,
    /// Any other label produced by an external tool (kept verbatim)
    Other(String),
}

impl Status {
    /// Whether this is the `Failed` status
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Label as written to files and reports
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::Failed => "Failed",
            Self::Other(label) => label,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Status {
    fn from(label: String) -> Self {
        match label.as_str() {
            "OK" => Self::Ok,
            "Failed" => Self::Failed,
            _ => Self::Other(label),
        }
    }
}

impl From<&str> for Status {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        match status {
            Status::Other(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

/// Metadata attached to a node (branch, sha, ...)
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A named outcome with optional metadata and ordered children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultNode {
    /// Human-readable label
    pub name: String,
    /// Own status (see [`ResultNode::status`] for the aggregate)
    #[serde(default)]
    pub status: Status,
    /// Structured metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
    /// Child nodes in attachment order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ResultNode>,
}

impl ResultNode {
    /// Create a leaf node
    pub fn new(name: impl Into<String>, status: impl Into<Status>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            metadata: Metadata::new(),
            children: Vec::new(),
        }
    }

    /// Create a leaf node with metadata
    pub fn with_metadata(
        name: impl Into<String>,
        status: impl Into<Status>,
        metadata: Metadata,
    ) -> Self {
        Self {
            metadata,
            ..Self::new(name, status)
        }
    }

    /// Create a category node whose outcome comes from its children
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, Status::Ok)
    }

    /// Append a child node
    pub fn add_sibling(&mut self, node: ResultNode) {
        self.children.push(node);
    }

    /// Aggregate status: `Failed` if this node or any descendant failed
    pub fn status(&self) -> Status {
        if self.any_failed() {
            Status::Failed
        } else {
            Status::Ok
        }
    }

    fn any_failed(&self) -> bool {
        self.status.is_failed() || self.children.iter().any(ResultNode::any_failed)
    }

    /// Find a direct child by name
    pub fn child(&self, name: &str) -> Option<&ResultNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Number of nodes in the tree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(ResultNode::node_count).sum::<usize>()
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::Serialize(e.to_string()))
    }

    /// Parse from JSON
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Write the tree to a JSON file
    pub fn to_file(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ReportError::Io {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }
        std::fs::write(path, json + "\n").map_err(|e| ReportError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Read a tree previously written with [`ResultNode::to_file`]
    pub fn from_file(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|e| ReportError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| ReportError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Format as an indented text tree with aggregate status per node
    pub fn format_tree(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "{}", self.label());
        for (i, child) in self.children.iter().enumerate() {
            child.format_node(&mut output, "", i == self.children.len() - 1);
        }
        output
    }

    fn format_node(&self, output: &mut String, prefix: &str, is_last: bool) {
        let connector = if is_last { "└── " } else { "├── " };
        let _ = writeln!(output, "{prefix}{connector}{}", self.label());

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };
        for (i, child) in self.children.iter().enumerate() {
            child.format_node(output, &child_prefix, i == self.children.len() - 1);
        }
    }

    fn label(&self) -> String {
        let mut label = format!("[{}] {}", self.status(), self.name);
        if !self.metadata.is_empty() {
            let meta: Vec<String> = self
                .metadata
                .iter()
                .map(|(k, v)| format!("{k}={}", metadata_text(v)))
                .collect();
            let _ = write!(label, " ({})", meta.join(", "));
        }
        label
    }

    /// Print the text tree to stdout
    pub fn dump(&self) {
        print!("{}", self.format_tree());
    }

    /// Render a standalone HTML status page
    pub fn tree_view_render(&self) -> String {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(html, "<title>{} - {}</title>", escape_html(&self.name), self.status());
        html.push_str(STYLE);
        html.push_str("</head>\n<body>\n<ul class=\"tree\">\n");
        self.render_html_node(&mut html, 1);
        html.push_str("</ul>\n</body>\n</html>\n");
        html
    }

    fn render_html_node(&self, html: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let status = self.status();
        let class = if status.is_failed() { "failed" } else { "ok" };
        let _ = write!(
            html,
            "{indent}<li><span class=\"status {class}\">{}</span> <span class=\"name\">{}</span>",
            escape_html(status.as_str()),
            escape_html(&self.name)
        );
        for (key, value) in &self.metadata {
            let _ = write!(
                html,
                " <span class=\"meta\">{}: {}</span>",
                escape_html(key),
                escape_html(&metadata_text(value))
            );
        }
        if self.children.is_empty() {
            html.push_str("</li>\n");
            return;
        }
        html.push('\n');
        let _ = writeln!(html, "{indent}  <ul>");
        for child in &self.children {
            child.render_html_node(html, depth + 2);
        }
        let _ = writeln!(html, "{indent}  </ul>");
        let _ = writeln!(html, "{indent}</li>");
    }
}

const STYLE: &str = "<style>
body { font-family: sans-serif; }
ul.tree, ul.tree ul { list-style: none; padding-left: 1.5em; }
.status { display: inline-block; min-width: 4em; font-weight: bold; }
.status.ok { color: #2e7d32; }
.status.failed { color: #c62828; }
.meta { color: #666; font-size: 0.9em; margin-left: 0.5em; }
</style>
";

fn metadata_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
