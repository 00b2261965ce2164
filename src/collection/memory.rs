use crate::{
    collection::{self, Collection, FindQuery},
    common::{
        filter::Filter,
        value::{Document, IDENTITY_FIELD, Value},
    },
};

use parking_lot::RwLock;

/// Failure of an in-process collection.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum MemoryError {
    /// Another document already holds the identity.
    #[error("a document with identity `{0}` already exists")]
    DuplicateIdentity(String),
}

/// Collection held in process.
///
/// Each primitive runs under a single lock, so it is atomic with respect to the others.
///
/// ```rust
/// use shelter_repository::collection::{Collection, FindQuery, memory::MemoryCollection};
/// use shelter_repository::common::value::{Document, Value};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let collection = MemoryCollection::default();
/// let document = Document::from([("name".to_string(), Value::from("Rex"))]);
/// let identity = collection.insert_one(document).await?;
/// assert!(identity.is_some());
/// assert_eq!(collection.find(&FindQuery::default()).await?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct MemoryCollection {
    documents: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    /// Collection holding the given documents, stored as they are.
    pub fn with_documents(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Whether the collection holds no document.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

impl Collection for MemoryCollection {
    type Error = MemoryError;

    async fn insert_one(&self, mut document: Document) -> Result<Option<String>, Self::Error> {
        let identity = collection::assign_identity(&mut document);
        let mut documents = self.documents.write();
        let taken = Value::String(identity.clone());
        if documents
            .iter()
            .any(|existing| existing.get(IDENTITY_FIELD) == Some(&taken))
        {
            return Err(MemoryError::DuplicateIdentity(identity));
        }
        documents.push(document);
        Ok(Some(identity))
    }

    async fn find(&self, query: &FindQuery) -> Result<Vec<Document>, Self::Error> {
        let documents = self.documents.read().clone();
        Ok(query.evaluate(documents))
    }

    async fn update_many(&self, filter: &Filter, new_values: &Document) -> Result<u64, Self::Error> {
        let mut documents = self.documents.write();
        let mut modified = 0;
        for document in documents.iter_mut().filter(|document| filter.matches(document)) {
            let mut changed = false;
            for (field, value) in new_values {
                if document.get(field) != Some(value) {
                    document.insert(field.clone(), value.clone());
                    changed = true;
                }
            }
            if changed {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_many(&self, filter: &Filter) -> Result<u64, Self::Error> {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|document| !filter.matches(document));
        Ok((before - documents.len()) as u64)
    }
}
