use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{ClassMap, Mapper};
use crate::aggregate::{CollectionResolver, Pipeline};
use crate::collection::{Collection, InsertManyOptions, InsertManyResult};
use crate::errors::DbError;
use crate::query::{DeleteReport, Filter, FindOptions, UpdateReport};
use crate::value::{Document, Value};

/// A collection read and written as `T`.
pub struct TypedCollection<T> {
    collection: Arc<Collection>,
    mapper: Arc<Mapper>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TypedCollection<T> {
    fn clone(&self) -> Self {
        Self { collection: Arc::clone(&self.collection), mapper: Arc::clone(&self.mapper), marker: PhantomData }
    }
}

impl<T> std::fmt::Debug for TypedCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedCollection")
            .field("namespace", &self.collection.namespace())
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> TypedCollection<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Wraps `collection`; registers the discovered class map of `T` unless one is
    /// already registered.
    pub fn new(collection: Arc<Collection>, mapper: Arc<Mapper>) -> Self {
        if mapper.class_map::<T>().is_none()
            && let Ok(map) = ClassMap::of::<T>()
        {
            mapper.register_class_map::<T>(map);
        }
        Self { collection, mapper, marker: PhantomData }
    }

    pub const fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    fn decode_all(&self, docs: impl IntoIterator<Item = Document>) -> Result<Vec<T>, DbError> {
        docs.into_iter().map(|d| self.mapper.from_document(&d)).collect()
    }

    /// Inserts `entity`; an id assigned by the store is written back into it, even when
    /// the insert itself fails.
    ///
    /// # Errors
    /// Mapping errors before the write; otherwise as [`Collection::insert_one`].
    pub fn insert_one(&self, entity: &mut T) -> Result<Value, DbError> {
        let mut doc = self.mapper.to_document(entity)?;
        let result = self.collection.insert_one(&mut doc);
        if let Some(id) = doc.id() {
            self.mapper.set_id(entity, id)?;
        }
        result
    }

    /// Inserts every entity in order, writing assigned ids back.
    ///
    /// # Errors
    /// Mapping errors before any write; otherwise as [`Collection::insert_many`].
    pub fn insert_many(&self, entities: &mut [T]) -> Result<InsertManyResult, DbError> {
        let mut docs = entities.iter().map(|e| self.mapper.to_document(e)).collect::<Result<Vec<_>, _>>()?;
        let result = self.collection.insert_many(&mut docs, InsertManyOptions::default());
        for (entity, doc) in entities.iter_mut().zip(&docs) {
            if let Some(id) = doc.id() {
                self.mapper.set_id(entity, id)?;
            }
        }
        result
    }

    /// # Errors
    /// Mapping errors for any matched document.
    pub fn find(&self, filter: &Filter) -> Result<Vec<T>, DbError> {
        self.decode_all(self.collection.find(filter.clone()).iter())
    }

    /// # Errors
    /// `QueryError` for invalid options; mapping errors for any matched document.
    pub fn find_with(&self, filter: &Filter, options: FindOptions) -> Result<Vec<T>, DbError> {
        self.decode_all(self.collection.find_with(filter.clone(), options)?.iter())
    }

    /// # Errors
    /// Mapping errors for the matched document.
    pub fn find_one(&self, filter: &Filter) -> Result<Option<T>, DbError> {
        self.collection.find_one(filter).map(|d| self.mapper.from_document(&d)).transpose()
    }

    pub fn count_documents(&self, filter: &Filter) -> u64 {
        self.collection.count_documents(filter)
    }

    /// Replaces the first match with `entity`.
    ///
    /// # Errors
    /// Mapping errors; otherwise as [`Collection::replace_one`].
    pub fn replace_one(&self, filter: &Filter, entity: &T) -> Result<UpdateReport, DbError> {
        self.collection.replace_one(filter, self.mapper.to_document(entity)?)
    }

    /// # Errors
    /// As [`Collection::delete_one`].
    pub fn delete_one(&self, filter: &Filter) -> Result<DeleteReport, DbError> {
        self.collection.delete_one(filter)
    }

    /// Runs `pipeline` and maps each output document to `U`.
    ///
    /// # Errors
    /// As [`Collection::aggregate`]; mapping errors for any output document.
    pub fn aggregate_as<U: DeserializeOwned + 'static>(
        &self,
        pipeline: &Pipeline,
        resolver: &dyn CollectionResolver,
    ) -> Result<Vec<U>, DbError> {
        self.collection
            .aggregate(pipeline, resolver)?
            .iter()
            .map(|d| self.mapper.from_document(d))
            .collect()
    }
}
