//! SPARQL templates: lookup by id and placeholder substitution.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use crate::error::TemplateError;

/// Result type for template operations.
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

/// Lookup from template id to raw template text.
pub trait TemplateStore: Send + Sync {
    /// Load the raw text of template `id`. Unknown ids are [`TemplateError::NotFound`].
    fn load(&self, id: &str) -> TemplateResult<String>;
}

/// Templates stored as `<dir>/<id>.txt`.
#[derive(Debug, Clone)]
pub struct DirTemplateStore {
    dir: PathBuf,
}

impl DirTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Ids come from the classifier's output; keep them to plain file stems.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl TemplateStore for DirTemplateStore {
    fn load(&self, id: &str) -> TemplateResult<String> {
        if !is_valid_id(id) {
            tracing::warn!(template_id = id, "rejecting malformed template id");
            return Err(TemplateError::NotFound { id: id.to_string() });
        }
        let path = self.dir.join(format!("{id}.txt"));
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TemplateError::NotFound { id: id.to_string() })
            }
            Err(source) => Err(TemplateError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

/// Templates held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<String, String>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(id.into(), text.into());
        self
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, id: &str) -> TemplateResult<String> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound { id: id.to_string() })
    }
}

/// Replace every occurrence of each placeholder key with its value.
///
/// Plain text replacement, one pass per entry in key order. A key that is a
/// substring of another key, or a value that contains a later key, can
/// interfere with later replacements.
pub fn resolve(text: &str, placeholders: &BTreeMap<String, String>) -> String {
    let mut out = text.to_string();
    for (key, value) in placeholders {
        if key.is_empty() {
            continue;
        }
        out = out.replace(key.as_str(), value);
    }
    out
}

/// Load template `id` from `store` and fill its placeholders.
pub fn render(
    store: &dyn TemplateStore,
    id: &str,
    placeholders: &BTreeMap<String, String>,
) -> TemplateResult<String> {
    let text = store.load(id)?;
    Ok(resolve(&text, placeholders))
}
