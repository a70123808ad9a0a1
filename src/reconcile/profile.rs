//! reconcile::profile
//!
//! Which fields the reconciler inspects when two documents differ.

use crate::core::document::DocumentKind;

/// Field-level comparison rules for one document kind.
///
/// - `id_field` keys both collections
/// - `watched_fields` are compared by value
/// - `set_fields` are arrays compared as sets (order ignored)
/// - `count_fields` are nested collections compared by size
///
/// # Example
///
/// ```
/// use govpub::reconcile::ReconcileProfile;
///
/// let profile = ReconcileProfile::new("code")
///     .watch(&["label"])
///     .sets(&["tags"]);
/// assert_eq!(profile.id_field, "code");
/// assert_eq!(profile.watched_fields, vec!["label".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileProfile {
    pub id_field: String,
    pub watched_fields: Vec<String>,
    pub set_fields: Vec<String>,
    pub count_fields: Vec<String>,
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

impl ReconcileProfile {
    /// A profile keyed by `id_field` with nothing watched.
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            watched_fields: Vec::new(),
            set_fields: Vec::new(),
            count_fields: Vec::new(),
        }
    }

    pub fn watch(mut self, fields: &[&str]) -> Self {
        self.watched_fields.extend(owned(fields));
        self
    }

    pub fn sets(mut self, fields: &[&str]) -> Self {
        self.set_fields.extend(owned(fields));
        self
    }

    pub fn counts(mut self, fields: &[&str]) -> Self {
        self.count_fields.extend(owned(fields));
        self
    }

    /// Entity statements.
    pub fn entities() -> Self {
        Self::new("id")
            .watch(&["name", "description", "website", "status", "did"])
            .sets(&["categories"])
            .counts(&["credentials"])
    }

    /// Vocabulary terms.
    pub fn vocabulary() -> Self {
        Self::new("id")
            .watch(&["label", "definition", "uri", "status"])
            .sets(&["tags"])
            .counts(&["examples"])
    }

    /// Keyed by `id`, no field-level detail.
    pub fn generic() -> Self {
        Self::new("id")
    }

    /// The built-in profile for a document kind.
    pub fn for_kind(kind: &DocumentKind) -> Self {
        match kind {
            DocumentKind::EntityStatement => Self::entities(),
            DocumentKind::VocabularyTerm => Self::vocabulary(),
            _ => Self::generic(),
        }
    }
}

impl Default for ReconcileProfile {
    fn default() -> Self {
        Self::generic()
    }
}
