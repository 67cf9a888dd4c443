#![forbid(unsafe_code)]

//! Marker and MarkerSet

use indexmap::IndexMap;

/// A parsed annotation: an identifier plus its expressions
///
/// The expression text of `+maxlength=50` is stored under the marker's own
/// identifier, so `expressions()["maxlength"] == "50"`. A marker written
/// without `=` carries no expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    identifier: String,
    expressions: IndexMap<String, String>,
}

impl Marker {
    /// Creates a marker without expressions
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            expressions: IndexMap::new(),
        }
    }

    /// Creates a marker whose expression is keyed by its own identifier
    pub fn with_expression(identifier: impl Into<String>, expression: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let mut expressions = IndexMap::new();
        expressions.insert(identifier.clone(), expression.into());
        Self {
            identifier,
            expressions,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn expressions(&self) -> &IndexMap<String, String> {
        &self.expressions
    }

    /// The expression stored under the marker's own identifier
    pub fn expression(&self) -> Option<&str> {
        self.expressions.get(&self.identifier).map(String::as_str)
    }
}

/// Ordered, identifier-unique collection of markers
///
/// Re-inserting an identifier replaces the stored marker in place
/// (last write wins) without changing its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    markers: IndexMap<String, Marker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a marker, replacing any marker with the same identifier
    pub fn insert(&mut self, marker: Marker) {
        self.markers.insert(marker.identifier.clone(), marker);
    }

    /// Inserts every marker of `other`, in its order
    pub fn extend(&mut self, other: &MarkerSet) {
        for marker in other.iter() {
            self.insert(marker.clone());
        }
    }

    pub fn get(&self, identifier: &str) -> Option<&Marker> {
        self.markers.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.markers.contains_key(identifier)
    }

    /// Removes a marker, preserving the order of the rest
    pub fn remove(&mut self, identifier: &str) -> Option<Marker> {
        self.markers.shift_remove(identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Markers ordered by identifier (stable)
    pub fn sorted(&self) -> Vec<&Marker> {
        let mut markers: Vec<&Marker> = self.markers.values().collect();
        markers.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl FromIterator<Marker> for MarkerSet {
    fn from_iter<T: IntoIterator<Item = Marker>>(iter: T) -> Self {
        let mut set = MarkerSet::new();
        for marker in iter {
            set.insert(marker);
        }
        set
    }
}
