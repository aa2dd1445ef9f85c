//! Documents as they are kept in the remote store.

use crate::{error::Result, CollectionName, DocumentId, Error, Revision, Timestamp};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Field map of a document.
pub type Fields = serde_json::Map<String, Value>;

/// A schema-flexible record in a remote collection.
///
/// `create_time`, `update_time` and `revision` are assigned by the remote on
/// every write and are never sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Opaque identifier, unique within the collection
    pub id: DocumentId,
    /// Collection this document belongs to
    pub collection: CollectionName,
    /// User-supplied fields
    pub fields: Fields,
    /// When the document was first written (milliseconds since epoch)
    pub create_time: Timestamp,
    /// When the document was last written (milliseconds since epoch)
    pub update_time: Timestamp,
    /// Remote write counter at the document's last write
    pub revision: Revision,
}

impl Document {
    /// Create a document with zeroed server metadata.
    pub fn new(
        id: impl Into<DocumentId>,
        collection: impl Into<CollectionName>,
        fields: Fields,
    ) -> Self {
        Self {
            id: id.into(),
            collection: collection.into(),
            fields,
            create_time: 0,
            update_time: 0,
            revision: 0,
        }
    }

    /// Set creation and update timestamps.
    pub fn with_times(mut self, create_time: Timestamp, update_time: Timestamp) -> Self {
        self.create_time = create_time;
        self.update_time = update_time;
        self
    }

    /// Set the revision.
    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = revision;
        self
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a string field value.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Decode the fields into a typed value, checking the collection first.
    pub fn decode<T: DeserializeOwned>(&self, collection: &str) -> Result<T> {
        if self.collection != collection {
            return Err(Error::WrongCollection {
                id: self.id.clone(),
                expected: collection.to_string(),
                actual: self.collection.clone(),
            });
        }
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            Error::InvalidDocument {
                id: self.id.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// Target of a `put`: a new document or an existing id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum DocumentKey {
    /// Let the store assign an id
    New,
    /// Create or overwrite the document with this id
    Existing(DocumentId),
}

/// A conjunction of field-equality predicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    predicates: Vec<(String, Value)>,
}

impl Filter {
    /// A filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push((field.into(), value.into()));
        self
    }

    /// Value required for a field, if the filter constrains it.
    pub fn value_of(&self, field: &str) -> Option<&Value> {
        self.predicates
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Check whether a field map satisfies every predicate.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.predicates
            .iter()
            .all(|(name, value)| fields.get(name) == Some(value))
    }

    /// Number of predicates.
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// True when the filter matches everything.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}
