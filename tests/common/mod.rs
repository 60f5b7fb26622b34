//! Scripted mock transport for integration tests
//!
//! Answers from in-memory tables and counts every call so tests can assert
//! fetch/idempotence behavior.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use remote_inspector::client::ReflectionClient;
use remote_inspector::descriptor::{EntityId, EntityRow, RawTypeDescriptor, TypedValue};
use remote_inspector::error::{InspectorError, Result};

#[derive(Default)]
pub struct MockClient {
    pub registry: HashMap<String, RawTypeDescriptor>,
    pub rows: Vec<EntityRow>,
    /// list_components answers; an id missing here plays a vanished entity
    pub components: HashMap<EntityId, Vec<String>>,
    pub component_values: HashMap<(EntityId, String), TypedValue>,
    pub resources: Vec<String>,
    pub resource_values: HashMap<String, TypedValue>,
    /// Every mutation call fails when set
    pub reject_mutations: bool,
    /// fetch_registry fails when set
    pub fail_registry: bool,
    /// Artificial latency on fetch_registry, to overlap concurrent callers
    pub registry_delay: Option<Duration>,

    pub calls: Mutex<HashMap<&'static str, usize>>,
    pub mutations: Mutex<Vec<(String, String, Value)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self, method: &str) -> usize {
        *self.calls.lock().unwrap().get(method).unwrap_or(&0)
    }

    pub fn mutations(&self) -> Vec<(String, String, Value)> {
        self.mutations.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str) {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
    }
}

#[async_trait]
impl ReflectionClient for MockClient {
    async fn fetch_registry(&self) -> Result<HashMap<String, RawTypeDescriptor>> {
        self.record("fetch_registry");
        if let Some(delay) = self.registry_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_registry {
            return Err(InspectorError::transport("registry unavailable"));
        }
        Ok(self.registry.clone())
    }

    async fn get_component(&self, entity: EntityId, type_path: &str) -> Result<TypedValue> {
        self.record("get_component");
        Ok(self
            .component_values
            .get(&(entity, type_path.to_string()))
            .cloned()
            .unwrap_or_else(|| TypedValue::err(type_path, "component unavailable")))
    }

    async fn get_resource(&self, type_path: &str) -> Result<TypedValue> {
        self.record("get_resource");
        Ok(self
            .resource_values
            .get(type_path)
            .cloned()
            .unwrap_or_else(|| TypedValue::err(type_path, "resource unavailable")))
    }

    async fn list_components(&self, entity: EntityId) -> Result<Vec<String>> {
        self.record("list_components");
        self.components
            .get(&entity)
            .cloned()
            .ok_or(InspectorError::EntityMissing(entity))
    }

    async fn list_resources(&self) -> Result<Vec<String>> {
        self.record("list_resources");
        Ok(self.resources.clone())
    }

    async fn mutate_component(
        &self,
        _entity: EntityId,
        type_path: &str,
        path: &str,
        value: Value,
    ) -> Result<()> {
        self.record("mutate_component");
        if self.reject_mutations {
            return Err(InspectorError::transport("mutation refused"));
        }
        self.mutations
            .lock()
            .unwrap()
            .push((type_path.to_string(), path.to_string(), value));
        Ok(())
    }

    async fn mutate_resource(&self, type_path: &str, path: &str, value: Value) -> Result<()> {
        self.record("mutate_resource");
        if self.reject_mutations {
            return Err(InspectorError::transport("mutation refused"));
        }
        self.mutations
            .lock()
            .unwrap()
            .push((type_path.to_string(), path.to_string(), value));
        Ok(())
    }

    async fn query_entities(&self) -> Result<Vec<EntityRow>> {
        self.record("query_entities");
        Ok(self.rows.clone())
    }

    async fn spawn_entity(&self) -> Result<EntityId> {
        self.record("spawn_entity");
        Ok(9999)
    }

    async fn destroy_entity(&self, _entity: EntityId) -> Result<()> {
        self.record("destroy_entity");
        Ok(())
    }

    async fn reparent_entities(&self, _entities: &[EntityId], _parent: Option<EntityId>) -> Result<()> {
        self.record("reparent_entities");
        Ok(())
    }
}
