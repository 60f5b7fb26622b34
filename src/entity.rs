//! Entity hierarchy cache
//!
//! Builds the parent/child forest from the remote's flat entity rows and
//! keeps listing and per-target detail caches with separate invalidation
//! granularity: membership changes (spawn/destroy/reparent, resource
//! insert/remove) drop the listing; a value mutation drops only the targeted
//! detail entry. Everything is replaced wholesale, never patched under
//! contention.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::ReflectionClient;
use crate::descriptor::{EntityId, TypedValue};
use crate::error::{InspectorError, Result};
use crate::schema::SchemaRegistry;
use crate::value::{EditEvent, ValueTree};

/// One entity with its owned children
///
/// Forest invariant: each id appears exactly once, either as a root or as
/// exactly one parent's child.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Type paths of the components present on this entity
    pub components: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntityNode>,
}

/// Cached view of the remote entity hierarchy and resource set
pub struct EntityGraphCache {
    client: Arc<dyn ReflectionClient>,
    forest: Mutex<Option<Arc<Vec<EntityNode>>>>,
    resource_names: Mutex<Option<Arc<Vec<String>>>>,
    entity_details: Mutex<HashMap<EntityId, Arc<Vec<TypedValue>>>>,
    resource_details: Mutex<HashMap<String, Arc<TypedValue>>>,
}

impl EntityGraphCache {
    pub fn new(client: Arc<dyn ReflectionClient>) -> Self {
        Self {
            client,
            forest: Mutex::new(None),
            resource_names: Mutex::new(None),
            entity_details: Mutex::new(HashMap::new()),
            resource_details: Mutex::new(HashMap::new()),
        }
    }

    /// The entity forest, rebuilt on first call after an invalidation
    pub async fn tree(&self) -> Result<Arc<Vec<EntityNode>>> {
        let mut guard = self.forest.lock().await;
        if let Some(forest) = guard.as_ref() {
            return Ok(forest.clone());
        }
        let forest = Arc::new(self.build_forest().await?);
        *guard = Some(forest.clone());
        Ok(forest)
    }

    /// Type paths of every registered resource
    pub async fn resource_names(&self) -> Result<Arc<Vec<String>>> {
        let mut guard = self.resource_names.lock().await;
        if let Some(names) = guard.as_ref() {
            return Ok(names.clone());
        }
        let names = Arc::new(self.client.list_resources().await?);
        *guard = Some(names.clone());
        Ok(names)
    }

    /// Component values of one entity. A component that fails to fetch while
    /// its siblings succeed comes back error-tagged, not as a failure.
    pub async fn entity_detail(&self, id: EntityId) -> Result<Arc<Vec<TypedValue>>> {
        let mut guard = self.entity_details.lock().await;
        if let Some(detail) = guard.get(&id) {
            return Ok(detail.clone());
        }

        let components = self.client.list_components(id).await?;
        let mut values = Vec::with_capacity(components.len());
        for type_path in components {
            match self.client.get_component(id, &type_path).await {
                Ok(value) => values.push(value),
                Err(error) => values.push(TypedValue::err(&type_path, error.to_string())),
            }
        }

        let detail = Arc::new(values);
        guard.insert(id, detail.clone());
        Ok(detail)
    }

    /// Current value of one resource
    pub async fn resource_detail(&self, type_path: &str) -> Result<Arc<TypedValue>> {
        let mut guard = self.resource_details.lock().await;
        if let Some(detail) = guard.get(type_path) {
            return Ok(detail.clone());
        }

        let value = match self.client.get_resource(type_path).await {
            Ok(value) => value,
            Err(error) => TypedValue::err(type_path, error.to_string()),
        };
        let detail = Arc::new(value);
        guard.insert(type_path.to_string(), detail.clone());
        Ok(detail)
    }

    /// `None`: membership may have changed, drop the listing and every
    /// entity detail. `Some(ids)`: a value mutation touched those entities,
    /// drop only their detail entries and keep the listing.
    pub async fn invalidate(&self, entity_ids: Option<&[EntityId]>) {
        match entity_ids {
            None => {
                *self.forest.lock().await = None;
                self.entity_details.lock().await.clear();
            }
            Some(ids) => {
                let mut details = self.entity_details.lock().await;
                for id in ids {
                    details.remove(id);
                }
            }
        }
    }

    /// Resource-side counterpart of [`invalidate`](Self::invalidate)
    pub async fn invalidate_resources(&self, type_paths: Option<&[String]>) {
        match type_paths {
            None => {
                *self.resource_names.lock().await = None;
                self.resource_details.lock().await.clear();
            }
            Some(paths) => {
                let mut details = self.resource_details.lock().await;
                for path in paths {
                    details.remove(path);
                }
            }
        }
    }

    /// Patch a name-only change into the cached forest without a refetch
    pub async fn apply_rename(&self, id: EntityId, name: Option<String>) {
        let mut guard = self.forest.lock().await;
        if let Some(forest) = guard.as_ref() {
            let mut patched = forest.as_ref().clone();
            if rename_node(&mut patched, id, &name) {
                *guard = Some(Arc::new(patched));
            }
        }
    }

    async fn build_forest(&self) -> Result<Vec<EntityNode>> {
        let rows = self.client.query_entities().await?;

        let mut nodes: HashMap<EntityId, EntityNode> = HashMap::with_capacity(rows.len());
        let mut parents: HashMap<EntityId, EntityId> = HashMap::new();
        let mut order: Vec<EntityId> = Vec::with_capacity(rows.len());

        for row in rows {
            // The entity may have been despawned between the query and this
            // call; one vanished entity must not abort the whole listing
            match self.client.list_components(row.id).await {
                Ok(components) => {
                    nodes.insert(
                        row.id,
                        EntityNode {
                            id: row.id,
                            name: row.name,
                            components,
                            children: Vec::new(),
                        },
                    );
                    if let Some(parent) = row.parent {
                        parents.insert(row.id, parent);
                    }
                    order.push(row.id);
                }
                Err(error) => {
                    tracing::debug!(entity = row.id, %error, "entity vanished during listing, skipped");
                }
            }
        }

        Ok(assemble_forest(nodes, &parents, &order))
    }
}

/// Link nodes under their declared parents; an orphan whose parent was
/// skipped or never existed is promoted to a root instead of being dropped
fn assemble_forest(
    mut nodes: HashMap<EntityId, EntityNode>,
    parents: &HashMap<EntityId, EntityId>,
    order: &[EntityId],
) -> Vec<EntityNode> {
    let mut children_of: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
    let mut roots: Vec<EntityId> = Vec::new();

    for id in order {
        match parents.get(id) {
            Some(parent) if nodes.contains_key(parent) => {
                children_of.entry(*parent).or_default().push(*id);
            }
            _ => roots.push(*id),
        }
    }

    fn take(
        id: EntityId,
        nodes: &mut HashMap<EntityId, EntityNode>,
        children_of: &HashMap<EntityId, Vec<EntityId>>,
    ) -> Option<EntityNode> {
        let mut node = nodes.remove(&id)?;
        if let Some(child_ids) = children_of.get(&id) {
            for child_id in child_ids.clone() {
                if let Some(child) = take(child_id, nodes, children_of) {
                    node.children.push(child);
                }
            }
        }
        Some(node)
    }

    roots
        .into_iter()
        .filter_map(|id| take(id, &mut nodes, &children_of))
        .collect()
}

fn rename_node(forest: &mut [EntityNode], id: EntityId, name: &Option<String>) -> bool {
    for node in forest {
        if node.id == id {
            node.name = name.clone();
            return true;
        }
        if rename_node(&mut node.children, id, name) {
            return true;
        }
    }
    false
}

/// What a mutation is aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationTarget {
    Component(EntityId),
    Resource,
}

/// Session facade tying the registry, the entity cache and the transport
/// together: mounts value trees and relays their edit events, driving cache
/// invalidation off mutation acknowledgements
pub struct Inspector {
    client: Arc<dyn ReflectionClient>,
    pub registry: SchemaRegistry,
    pub entities: EntityGraphCache,
}

impl Inspector {
    pub fn new(client: Arc<dyn ReflectionClient>) -> Self {
        Self {
            registry: SchemaRegistry::new(client.clone()),
            entities: EntityGraphCache::new(client.clone()),
            client,
        }
    }

    /// Mount the value tree for one component on one entity
    pub async fn mount_component(&self, entity: EntityId, type_path: &str) -> Result<ValueTree> {
        let detail = self.entities.entity_detail(entity).await?;
        let typed = detail
            .iter()
            .find(|value| value.type_path == type_path)
            .cloned()
            .unwrap_or_else(|| TypedValue::err(type_path, "component not present"));
        let schema = self.registry.get_type_schema(type_path).await;
        Ok(ValueTree::mount(&typed, schema))
    }

    /// Mount the value tree for one resource
    pub async fn mount_resource(&self, type_path: &str) -> Result<ValueTree> {
        let typed = self.entities.resource_detail(type_path).await?;
        let schema = self.registry.get_type_schema(type_path).await;
        Ok(ValueTree::mount(&typed, schema))
    }

    /// Relay one edit event to the remote. Acknowledgement invalidates the
    /// targeted detail entry; a rejection surfaces the offending path and
    /// leaves every cache intact so the in-progress edit is not discarded.
    pub async fn apply_edit(&self, target: MutationTarget, event: &EditEvent) -> Result<()> {
        let outcome = match target {
            MutationTarget::Component(entity) => {
                self.client
                    .mutate_component(entity, &event.type_path, &event.path, event.value.clone())
                    .await
            }
            MutationTarget::Resource => {
                self.client
                    .mutate_resource(&event.type_path, &event.path, event.value.clone())
                    .await
            }
        };

        match outcome {
            Ok(()) => {
                match target {
                    MutationTarget::Component(entity) => {
                        self.entities.invalidate(Some(&[entity])).await;
                    }
                    MutationTarget::Resource => {
                        self.entities
                            .invalidate_resources(Some(std::slice::from_ref(&event.type_path)))
                            .await;
                    }
                }
                Ok(())
            }
            Err(error) => Err(InspectorError::MutationRejected {
                path: event.path.clone(),
                message: error.to_string(),
            }),
        }
    }

    /// Spawn an empty entity; membership changed, so the listing goes
    pub async fn spawn(&self) -> Result<EntityId> {
        let id = self.client.spawn_entity().await?;
        self.entities.invalidate(None).await;
        Ok(id)
    }

    /// Destroy an entity and its descendants
    pub async fn destroy(&self, entity: EntityId) -> Result<()> {
        self.client.destroy_entity(entity).await?;
        self.entities.invalidate(None).await;
        Ok(())
    }

    /// Move entities under a new parent (or to the top level)
    pub async fn reparent(&self, entities: &[EntityId], parent: Option<EntityId>) -> Result<()> {
        self.client.reparent_entities(entities, parent).await?;
        self.entities.invalidate(None).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(id: EntityId) -> EntityNode {
        EntityNode {
            id,
            name: None,
            components: Vec::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn orphans_are_promoted_to_roots() {
        // 1 <- 2 <- 3, and 4 pointing at an absent parent 999
        let nodes: HashMap<EntityId, EntityNode> =
            [1, 2, 3, 4].into_iter().map(|id| (id, bare(id))).collect();
        let parents: HashMap<EntityId, EntityId> =
            [(2, 1), (3, 2), (4, 999)].into_iter().collect();
        let order = vec![1, 2, 3, 4];

        let forest = assemble_forest(nodes, &parents, &order);

        assert_eq!(forest.len(), 2);
        let chain = forest.iter().find(|node| node.id == 1).unwrap();
        assert_eq!(chain.children.len(), 1);
        assert_eq!(chain.children[0].id, 2);
        assert_eq!(chain.children[0].children[0].id, 3);
        assert!(forest.iter().any(|node| node.id == 4));
    }

    #[test]
    fn each_id_appears_exactly_once() {
        let nodes: HashMap<EntityId, EntityNode> =
            [10, 11, 12].into_iter().map(|id| (id, bare(id))).collect();
        let parents: HashMap<EntityId, EntityId> = [(11, 10), (12, 10)].into_iter().collect();
        let order = vec![10, 11, 12];

        let forest = assemble_forest(nodes, &parents, &order);

        fn count(forest: &[EntityNode]) -> usize {
            forest.iter().map(|n| 1 + count(&n.children)).sum()
        }
        assert_eq!(forest.len(), 1);
        assert_eq!(count(&forest), 3);
    }

    #[test]
    fn rename_patches_nested_node() {
        let mut forest = vec![EntityNode {
            children: vec![bare(2)],
            ..bare(1)
        }];
        assert!(rename_node(&mut forest, 2, &Some("camera".to_string())));
        assert_eq!(forest[0].children[0].name.as_deref(), Some("camera"));
        assert!(!rename_node(&mut forest, 99, &None));
    }
}
