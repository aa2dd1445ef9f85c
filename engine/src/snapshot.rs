//! Snapshots delivered by collection subscriptions.

use crate::{CollectionName, Document, DocumentId, Revision};
use serde::{Deserialize, Serialize};

/// The complete result set of a query at one point in time.
///
/// Every delivery of a subscription is a full snapshot of the matching
/// documents, not a diff, so applying one never depends on having seen the
/// previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Collection the query ran against
    pub collection: CollectionName,
    /// Matching documents
    pub documents: Vec<Document>,
    /// Remote revision this snapshot reflects
    pub revision: Revision,
}

impl Snapshot {
    pub fn new(
        collection: impl Into<CollectionName>,
        documents: Vec<Document>,
        revision: Revision,
    ) -> Self {
        Self {
            collection: collection.into(),
            documents,
            revision,
        }
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no document matched.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Ids of the documents, in delivery order.
    pub fn ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.documents.iter().map(|d| &d.id)
    }
}
