//! Remote reflection client interface
//!
//! The transport itself (connection handling, protocol revisions, wire
//! framing) lives outside this crate; consumers inject an implementation of
//! `ReflectionClient` and everything here programs against it. All calls are
//! single-shot awaits with no cancellation; a caller that loses interest
//! simply discards the result.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::descriptor::{EntityId, EntityRow, RawTypeDescriptor, TypedValue};
use crate::error::Result;

/// Interface to the remote simulation
#[async_trait]
pub trait ReflectionClient: Send + Sync {
    /// Fetch the full type registry, keyed by type path
    async fn fetch_registry(&self) -> Result<HashMap<String, RawTypeDescriptor>>;

    /// Current value of one component on one entity.
    ///
    /// A missing or unserializable component comes back as an error-tagged
    /// `TypedValue`, not as a transport failure.
    async fn get_component(&self, entity: EntityId, type_path: &str) -> Result<TypedValue>;

    /// Current value of one resource
    async fn get_resource(&self, type_path: &str) -> Result<TypedValue>;

    /// Type paths of every component present on the entity
    async fn list_components(&self, entity: EntityId) -> Result<Vec<String>>;

    /// Type paths of every registered resource
    async fn list_resources(&self) -> Result<Vec<String>>;

    /// Write `value` at `path` inside a component
    async fn mutate_component(
        &self,
        entity: EntityId,
        type_path: &str,
        path: &str,
        value: Value,
    ) -> Result<()>;

    /// Write `value` at `path` inside a resource
    async fn mutate_resource(&self, type_path: &str, path: &str, value: Value) -> Result<()>;

    /// All entities with their optional name and parent
    async fn query_entities(&self) -> Result<Vec<EntityRow>>;

    /// Spawn an empty entity, returning its id
    async fn spawn_entity(&self) -> Result<EntityId>;

    /// Destroy an entity and its descendants
    async fn destroy_entity(&self, entity: EntityId) -> Result<()>;

    /// Move entities under a new parent, or to the top level
    async fn reparent_entities(&self, entities: &[EntityId], parent: Option<EntityId>) -> Result<()>;
}
