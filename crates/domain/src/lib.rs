#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod catalog;
mod error;
mod exercise;
mod service;
mod sync;

pub use catalog::{
    CatalogService, CatalogSnapshot, Cursor, LocalCatalogRepository, RemoteCatalogRepository,
};
pub use error::{BoxError, ReadError, StorageError, SyncError, WriteError};
pub use exercise::{BodyPart, Category, Difficulty, Exercise, ExerciseID};
pub use service::Service;
pub use sync::{CatalogSync, Freshness, SyncSettings, SyncStrategy};
