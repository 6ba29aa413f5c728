use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Placeholder replaced by the current patient identifier in patch values
pub const PATIENT_PLACEHOLDER: &str = "{patient}";

/// Flat keyword to value mapping applied to a DICOM object
///
/// Entries keep their insertion order. Inserting a keyword that is already
/// present replaces its value in place, so later writes win.
///
/// Serialized as a JSON object:
///
/// ```
/// use retag_core::TagPatch;
///
/// let patch: TagPatch = serde_json::from_str(r#"{"Manufacturer": "i3M", "PatientSex": "O"}"#).unwrap();
/// assert_eq!(patch.get("PatientSex"), Some("O"));
/// assert_eq!(patch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPatch {
    entries: Vec<(String, String)>,
}

impl TagPatch {
    /// Creates an empty patch
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a keyword, replacing any previous value for it
    pub fn insert(&mut self, keyword: impl Into<String>, value: impl Into<String>) {
        let keyword = keyword.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == keyword) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((keyword, value)),
        }
    }

    /// Builder: adds a keyword/value pair
    pub fn with(mut self, keyword: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(keyword, value);
        self
    }

    /// Returns the value set for a keyword
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == keyword)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Layers `other` on top of this patch; `other` wins on shared keywords
    pub fn merged_with(&self, other: &TagPatch) -> TagPatch {
        let mut merged = self.clone();
        for (k, v) in other.iter() {
            merged.insert(k, v);
        }
        merged
    }

    /// Replaces the patient placeholder in every value
    pub fn resolved_for(&self, patient: &str) -> TagPatch {
        TagPatch {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (k.clone(), v.replace(PATIENT_PLACEHOLDER, patient)))
                .collect(),
        }
    }
}

impl Serialize for TagPatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct TagPatchVisitor;

impl<'de> Visitor<'de> for TagPatchVisitor {
    type Value = TagPatch;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of DICOM keywords to string values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TagPatch, A::Error> {
        let mut patch = TagPatch::new();
        while let Some((k, v)) = access.next_entry::<String, String>()? {
            patch.insert(k, v);
        }
        Ok(patch)
    }
}

impl<'de> Deserialize<'de> for TagPatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TagPatchVisitor)
    }
}
