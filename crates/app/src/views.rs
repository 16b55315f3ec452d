//! View rendering
//!
//! Views are HTML templates with `{{ key }}` placeholders filled from the
//! top-level fields of a JSON context. Templates are read once at startup
//! from the configured views directory; names without a file fall back to
//! the built-in templates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

const ERROR_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Error</title>
</head>
<body>
  <h1>{{ message }}</h1>
</body>
</html>
"#;

#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error("View not found: {0}")]
    NotFound(String),

    #[error("Failed to read views from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders a named view with a JSON context
pub trait ViewRenderer: Send + Sync {
    fn render(&self, name: &str, context: &Value) -> Result<String, ViewError>;
}

/// Placeholder-substitution templates
#[derive(Debug, Clone, Default)]
pub struct TemplateViews {
    templates: HashMap<String, String>,
}

impl TemplateViews {
    /// Built-in templates only
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load every `<name>.html` file in `dir`
    pub fn load(dir: &Path) -> Result<Self, ViewError> {
        let io_error = |source| ViewError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut templates = HashMap::new();
        for entry in std::fs::read_dir(dir).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let template = std::fs::read_to_string(&path).map_err(|source| ViewError::Io {
                path: path.clone(),
                source,
            })?;
            templates.insert(name, template);
        }

        tracing::info!(dir = %dir.display(), count = templates.len(), "Views loaded");
        Ok(Self { templates })
    }

    fn template(&self, name: &str) -> Option<&str> {
        if let Some(template) = self.templates.get(name) {
            return Some(template);
        }
        match name {
            "error" => Some(ERROR_TEMPLATE),
            _ => None,
        }
    }
}

impl ViewRenderer for TemplateViews {
    fn render(&self, name: &str, context: &Value) -> Result<String, ViewError> {
        let template = self
            .template(name)
            .ok_or_else(|| ViewError::NotFound(name.to_string()))?;
        Ok(substitute(template, context))
    }
}

/// Replace `{{ key }}` with the escaped value of `context[key]`
fn substitute(template: &str, context: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after = &rest[start + 2..];
        let end = match after.find("}}") {
            Some(end) => end,
            None => break,
        };

        out.push_str(&rest[..start]);
        let key = after[..end].trim();
        match context.get(key) {
            Some(Value::String(s)) => out.push_str(&escape_html(s)),
            Some(Value::Null) | None => {}
            Some(other) => out.push_str(&escape_html(&other.to_string())),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
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
