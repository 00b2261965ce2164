#![deny(missing_docs)]

//! # Shelter Repository
//!
//! A defensively validated CRUD repository for animal-shelter records kept in a document store.
//!
//! ## Overview
//!
//! This library mediates every read and write to one collection of animal records:
//! - Create, Read, Update and Delete over documents of scalar fields
//! - Mutations reject malformed or empty arguments with a typed error, before the store is contacted
//! - Reads coerce malformed filters and projections to safe defaults instead of failing
//! - Collections are injected, so the same repository runs against DynamoDB or in process
//!
//! ## Quick Example
//!
//! Raw arguments are any serializable value, for instance JSON built with `serde_json`:
//!
//! ```no_run
//! use aws_sdk_dynamodb::Client;
//! use serde_json::json;
//! use shelter_repository::{
//!     collection::dynamodb::{DynamoArgs, DynamoCollection},
//!     common::sort::{Sort, SortOrder},
//!     repository::{ReadArgs, Repository},
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let client = Client::from_conf(aws_sdk_dynamodb::config::Config::builder().build());
//! let collection = DynamoCollection::new(
//!     client,
//!     DynamoArgs {
//!         table_name: "animals".to_string(),
//!         ..Default::default()
//!     },
//! );
//! let repository = Repository::new(Arc::new(collection));
//! repository
//!     .create(json!({"name": "Rex", "animal_type": "Dog", "age_upon_outcome_in_weeks": 52}))
//!     .await?;
//! // the three youngest dogs, identity hidden
//! let args: ReadArgs<serde_json::Value> = ReadArgs {
//!     filter: Some(json!({"animal_type": "Dog"})),
//!     sort: Some(Sort::default().by("age_upon_outcome_in_weeks", SortOrder::Ascending)),
//!     limit: 3,
//!     ..Default::default()
//! };
//! let youngest = repository.read(args).await?;
//! let adopted = repository
//!     .update(json!({"name": "Rex"}), json!({"outcome_type": "Adoption"}))
//!     .await?;
//! // an empty filter is rejected rather than wiping the collection
//! assert!(repository.delete(json!({})).await.is_err());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`mod@collection`] - The collection trait and its DynamoDB and in-process implementations
//! - [`mod@common`] - Document values, filters, projections and sorts
//! - [`mod@error`] - Invalid-input and store errors
//! - [`mod@repository`] - The repository and its read arguments

/// Collection handles the repository runs against.
pub mod collection;

/// Document values, filters, projections and sorts.
pub mod common;

/// Errors returned by repository operations.
pub mod error;

/// Create, Read, Update and Delete over one collection.
pub mod repository;
