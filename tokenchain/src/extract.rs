//! Tolerant field lookup over arbitrary JSON responses.
//!
//! Servers disagree on where they put tokens and ids, so lookups walk a
//! prioritized list of dotted paths (`"data.accessToken"`) and take the first
//! one that holds a usable value. An explicit override path, when configured,
//! is tried before the list and wins outright.

use serde::Serialize;
use serde_json::Value;

/// Paths tried, in order, when looking for the access token.
pub const TOKEN_FIELD_CANDIDATES: &[&str] = &[
    "accessToken",
    "access_token",
    "token",
    "data.accessToken",
    "data.access_token",
    "result.accessToken",
    "result.access_token",
    "response.accessToken",
    "response.access_token",
];

/// Paths tried, in order, when looking for the user identifier.
pub const IDENTIFIER_FIELD_CANDIDATES: &[&str] = &[
    "userId",
    "user_id",
    "id",
    "data.userId",
    "data.user_id",
    "data.id",
    "result.userId",
    "result.user_id",
    "result.id",
    "response.userId",
    "response.user_id",
    "response.id",
];

/// Whether a value counts as found.
///
/// `null`, `false`, the empty string and numeric zero are treated as absent;
/// anything else is a hit and is passed through unmodified.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Walk a dotted path through `root`.
///
/// Each segment is a key lookup on an object; a segment made of digits also
/// indexes into an array. Returns `None` as soon as an intermediate is missing.
pub fn resolve_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// A successful lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extracted {
    /// The path that produced the value.
    pub path: String,
    pub value: Value,
    /// True when the configured override path matched.
    pub from_override: bool,
}

impl Extracted {
    /// The value rendered as a plain string: strings verbatim, other JSON as text.
    pub fn as_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Prioritized search over a fixed candidate list plus an optional override.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    candidates: Vec<String>,
    override_path: Option<String>,
}

impl FieldExtractor {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            override_path: None,
        }
    }

    pub fn for_access_token() -> Self {
        Self::new(TOKEN_FIELD_CANDIDATES.iter().copied())
    }

    pub fn for_identifier() -> Self {
        Self::new(IDENTIFIER_FIELD_CANDIDATES.iter().copied())
    }

    /// Set the override path. Blank paths are ignored.
    pub fn with_override(mut self, path: Option<&str>) -> Self {
        self.override_path = path
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);
        self
    }

    pub fn override_path(&self) -> Option<&str> {
        self.override_path.as_deref()
    }

    /// Every path this extractor will try, override first.
    pub fn attempted(&self) -> Vec<String> {
        self.override_path
            .iter()
            .chain(self.candidates.iter())
            .cloned()
            .collect()
    }

    /// First non-empty match, or `None` when nothing matched.
    pub fn extract(&self, payload: &Value) -> Option<Extracted> {
        if let Some(path) = &self.override_path {
            if let Some(value) = resolve_path(payload, path).filter(|v| is_present(v)) {
                return Some(Extracted {
                    path: path.clone(),
                    value: value.clone(),
                    from_override: true,
                });
            }
        }

        self.candidates.iter().find_map(|path| {
            resolve_path(payload, path)
                .filter(|v| is_present(v))
                .map(|value| Extracted {
                    path: path.clone(),
                    value: value.clone(),
                    from_override: false,
                })
        })
    }
}
