//! The repository mediating every read and write to one animal collection.
//!
//! Mutations reject malformed or empty arguments before the store is contacted, while
//! reads coerce them to safe defaults and never fail on input.
//!
//! ```rust
//! use serde_json::json;
//! use shelter_repository::{
//!     collection::memory::MemoryCollection,
//!     repository::{ReadArgs, Repository},
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = Repository::new(Arc::new(MemoryCollection::default()));
//! repository
//!     .create(json!({"name": "Rex", "animal_type": "Dog", "age": 3}))
//!     .await?;
//! let args: ReadArgs<serde_json::Value> = ReadArgs {
//!     filter: Some(json!({"animal_type": "Dog"})),
//!     ..Default::default()
//! };
//! let dogs = repository.read(args).await?;
//! assert_eq!(dogs.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::{
    collection::{Collection, FindQuery},
    common::{
        filter::Filter,
        projection::Projection,
        sort::Sort,
        value::{self, Document, IDENTITY_FIELD, Value},
    },
    error::{Argument, Error, InvalidInput},
};

use serde::Serialize;
use std::sync::Arc;

/// Arguments of a read.
///
/// Filter and projection are raw arguments; anything malformed is coerced.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadArgs<F, P = F> {
    /// Documents to select, `None` for all of them.
    pub filter: Option<F>,
    /// Fields to return, `None` to hide the identity field only.
    pub projection: Option<P>,
    /// Maximum number of documents, `0` for no limit.
    pub limit: usize,
    /// Order applied before the limit.
    pub sort: Option<Sort>,
}

impl<F, P> Default for ReadArgs<F, P> {
    fn default() -> Self {
        Self {
            filter: None,
            projection: None,
            limit: 0,
            sort: None,
        }
    }
}

impl<F: Serialize, P: Serialize> From<ReadArgs<F, P>> for FindQuery {
    fn from(args: ReadArgs<F, P>) -> Self {
        Self {
            filter: args.filter.map(Filter::coerce).unwrap_or_default(),
            projection: args.projection.map(Projection::coerce).unwrap_or_default(),
            sort: args.sort.filter(|sort| !sort.is_empty()),
            limit: args.limit,
        }
    }
}

/// Document a create stores: scalar fields, and a string identity if one is supplied.
fn new_document<T: Serialize>(raw: T) -> Result<Document, InvalidInput> {
    let mapping = value::require_mapping(raw, Argument::Document)?;
    let document = value::document_from_mapping(mapping, Argument::Document)?;
    match document.get(IDENTITY_FIELD) {
        None | Some(Value::String(_)) => Ok(document),
        Some(_) => Err(InvalidInput::UnsupportedValue {
            argument: Argument::Document,
            field: IDENTITY_FIELD.to_string(),
        }),
    }
}

/// Field values an update merges; the identity field cannot be rewritten.
fn merged_values<T: Serialize>(raw: T) -> Result<Document, InvalidInput> {
    let mapping = value::require_mapping(raw, Argument::NewValues)?;
    let new_values = value::document_from_mapping(mapping, Argument::NewValues)?;
    if new_values.contains_key(IDENTITY_FIELD) {
        return Err(InvalidInput::ReadOnlyField {
            argument: Argument::NewValues,
            field: IDENTITY_FIELD.to_string(),
        });
    }
    Ok(new_values)
}

/// CRUD access to one collection of animal records.
///
/// The repository holds no state of its own beyond the shared collection handle.
#[derive(Debug)]
pub struct Repository<C> {
    collection: Arc<C>,
}

impl<C> Clone for Repository<C> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
        }
    }
}

impl<C: Collection> Repository<C> {
    /// Repository over an already connected collection.
    pub fn new(collection: Arc<C>) -> Self {
        Self { collection }
    }

    /// The underlying collection.
    pub fn collection(&self) -> &Arc<C> {
        &self.collection
    }

    fn rejected(invalid_input: InvalidInput) -> Error<C::Error> {
        #[cfg(feature = "tracing")]
        tracing::debug!(%invalid_input, "rejected before contacting the store");
        Error::InvalidInput(invalid_input)
    }

    /// Insert one document.
    ///
    /// Returns whether the store acknowledged an identity for it.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.create", skip_all, err)
    )]
    pub async fn create<T: Serialize>(&self, document: T) -> Result<bool, Error<C::Error>> {
        let document = new_document(document).map_err(Self::rejected)?;
        let identity = self
            .collection
            .insert_one(document)
            .await
            .map_err(Error::Store)?;
        Ok(identity.is_some())
    }

    /// Documents matching the filter, sorted, limited and projected.
    ///
    /// Malformed filters match every document and malformed projections hide the
    /// identity field only, so this only fails when the store does.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.read", skip_all, fields(limit = args.limit), err)
    )]
    pub async fn read<F: Serialize, P: Serialize>(
        &self,
        args: ReadArgs<F, P>,
    ) -> Result<Vec<Document>, Error<C::Error>> {
        let query = FindQuery::from(args);
        self.collection.find(&query).await.map_err(Error::Store)
    }

    /// Merge the new values into every document matching the filter.
    ///
    /// Returns how many documents changed; documents already holding every value
    /// are not counted.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.update", skip_all, err)
    )]
    pub async fn update<F: Serialize, U: Serialize>(
        &self,
        filter: F,
        new_values: U,
    ) -> Result<u64, Error<C::Error>> {
        let filter = Filter::require(filter).map_err(Self::rejected)?;
        let new_values = merged_values(new_values).map_err(Self::rejected)?;
        self.collection
            .update_many(&filter, &new_values)
            .await
            .map_err(Error::Store)
    }

    /// Remove every document matching the filter.
    ///
    /// An empty filter is rejected, so the whole collection is never wiped.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "shelter_repository.delete", skip_all, err)
    )]
    pub async fn delete<T: Serialize>(&self, filter: T) -> Result<u64, Error<C::Error>> {
        let filter = Filter::require(filter).map_err(Self::rejected)?;
        self.collection
            .delete_many(&filter)
            .await
            .map_err(Error::Store)
    }
}
