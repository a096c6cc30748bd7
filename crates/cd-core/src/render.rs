//! Human-facing renderings of a [`CheckedDict`]: a plain table, commented
//! YAML and reStructuredText documentation.

use std::fmt;

use crate::checked::CheckedDict;
use crate::error::Result;
use crate::schema::format_choices;
use crate::value::Value;

/// Width of wrapped doc lines in the table view.
const HELP_WIDTH: usize = 58;

/// Width of wrapped doc lines in YAML comments.
const COMMENT_WIDTH: usize = 72;

/// Greedy word wrap. Words longer than `width` get a line of their own.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Render a single value as inline YAML.
fn yaml_value(value: &Value) -> Result<String> {
    match value {
        // Flow style keeps collections on the key's line; JSON is valid flow YAML.
        Value::List(_) | Value::Map(_) => Ok(serde_json::to_string(value)?),
        _ => Ok(serde_yaml::to_string(value)?.trim_end().to_string()),
    }
}

impl CheckedDict {
    /// Short description of the rules for `key`: choices, range and type.
    pub fn info_str(&self, key: &str) -> String {
        let mut info = Vec::new();
        if let Ok(Some(choices)) = self.get_choices(key) {
            let items: Vec<String> = choices.iter().map(Value::to_string).collect();
            info.push(format!("choices: {{{}}}", items.join(" ")));
        }
        if let Ok(Some((lo, hi))) = self.get_range(key) {
            info.push(format!("between {lo} - {hi}"));
        }
        if let Some(ty) = self.expected_type(key) {
            info.push(ty.to_string());
        }
        info.join(" | ")
    }

    /// The comment block written above `key` in YAML output.
    fn yaml_comment(&self, key: &str) -> String {
        let mut lines = Vec::new();
        if let Some(doc) = self.get_doc(key) {
            lines.extend(wrap(doc, COMMENT_WIDTH).into_iter().map(|l| format!("# {l}")));
        }
        let mut parts = Vec::new();
        if let Some(default) = self.defaults().get(key) {
            parts.push(format!("default: {default}"));
        }
        if let Some(ty) = self.expected_type(key) {
            parts.push(format!("type: {ty}"));
        }
        if let Ok(Some(choices)) = self.get_choices(key) {
            parts.push(format!("choices: {}", format_choices(&choices)));
        }
        if let Ok(Some((lo, hi))) = self.get_range(key) {
            parts.push(format!("range: {lo} - {hi}"));
        }
        if !parts.is_empty() {
            lines.push(format!("# ** {}", parts.join(", ")));
        }
        lines.join("\n")
    }

    /// The current values as YAML, each key preceded by a comment with its
    /// doc, default, type, choices and range. Keys come out sorted.
    pub fn as_yaml(&self) -> Result<String> {
        let mut out = String::new();
        for (key, value) in self.iter() {
            let comment = self.yaml_comment(key);
            if !comment.is_empty() {
                out.push_str(&comment);
                out.push('\n');
            }
            let key_text = serde_yaml::to_string(key)?;
            out.push_str(&format!("{}: {}\n\n", key_text.trim_end(), yaml_value(value)?));
        }
        Ok(out)
    }

    /// reStructuredText documentation of every default key.
    pub fn generate_rst_documentation(&self) -> String {
        let mut lines = Vec::new();
        for (key, value) in self.defaults() {
            lines.push(format!("{key}:"));
            let typestr = self
                .expected_type(key)
                .map(|t| t.to_string())
                .unwrap_or_default();
            lines.push(format!("    | Default: **{value}**  -- `{typestr}`"));
            if let Ok(Some(choices)) = self.get_choices(key) {
                let items: Vec<String> = choices.iter().map(Value::to_string).collect();
                lines.push(format!("    | Choices: ``{}``", items.join(", ")));
            }
            if let Ok(Some((lo, hi))) = self.get_range(key) {
                lines.push(format!("    | Between {lo} - {hi}"));
            }
            if let Some(doc) = self.get_doc(key) {
                lines.push(format!("    | *{doc}*"));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }

    /// Rows of (key, value, info) with wrapped doc lines as extra rows.
    pub(crate) fn table_rows(&self) -> Vec<[String; 3]> {
        let mut rows = Vec::new();
        for (key, value) in self.iter() {
            rows.push([key.to_string(), value.to_string(), self.info_str(key)]);
            if let Some(doc) = self.get_doc(key) {
                for line in wrap(doc, HELP_WIDTH) {
                    rows.push([String::new(), String::new(), line]);
                }
            }
        }
        rows
    }
}

/// Write rows as left-aligned columns framed by dashed rules.
pub fn write_table(f: &mut fmt::Formatter<'_>, rows: &[[String; 3]]) -> fmt::Result {
    let mut widths = [0usize; 3];
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let rule = rule.join("  ");
    writeln!(f, "{rule}")?;
    for row in rows {
        let line = format!(
            "{:<w0$}  {:<w1$}  {}",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1]
        );
        writeln!(f, "{}", line.trim_end())?;
    }
    write!(f, "{rule}")
}

impl fmt::Display for CheckedDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_table(f, &self.table_rows())
    }
}
