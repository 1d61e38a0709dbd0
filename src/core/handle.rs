//! Logger identity: hierarchical name plus accumulated fields

use super::field::{Field, FieldSet};
use std::sync::Arc;

/// Name and field annotations carried by every derived logger
///
/// Deriving (`named`, `with`) always produces a new handle; the receiver is
/// never modified, so handles can be shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct Handle {
    segments: Arc<Vec<String>>,
    fields: FieldSet,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle rooted at a dot-separated name such as `"api.auth"`
    pub fn with_name(name: &str) -> Self {
        name.split('.')
            .fold(Self::new(), |handle, segment| handle.named(segment))
    }

    /// Append a name segment
    ///
    /// Surrounding whitespace is trimmed and inner whitespace becomes `_` so
    /// the name stays usable as a tag. Empty segments are ignored.
    #[must_use]
    pub fn named(&self, segment: &str) -> Self {
        let segment = normalize_segment(segment);
        if segment.is_empty() {
            return self.clone();
        }
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self {
            segments: Arc::new(segments),
            fields: self.fields.clone(),
        }
    }

    /// Append fields to the annotation set
    #[must_use]
    pub fn with(&self, fields: &[Field]) -> Self {
        Self {
            segments: Arc::clone(&self.segments),
            fields: self.fields.extended(fields),
        }
    }

    /// Dot-joined name, empty for the root handle
    pub fn name(&self) -> String {
        self.segments.join(".")
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }
}

fn normalize_segment(segment: &str) -> String {
    segment
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}
