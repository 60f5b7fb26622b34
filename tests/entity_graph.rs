//! Entity forest construction and cache invalidation granularity

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::MockClient;
use remote_inspector::descriptor::{EntityRow, TypedValue};
use remote_inspector::entity::{EntityGraphCache, Inspector, MutationTarget};
use remote_inspector::value::EditEvent;
use serde_json::json;

fn scripted_world() -> MockClient {
    let rows = vec![
        EntityRow { id: 1, name: Some("root".to_string()), parent: None },
        EntityRow { id: 2, name: None, parent: Some(1) },
        EntityRow { id: 3, name: Some("leaf".to_string()), parent: Some(2) },
        EntityRow { id: 4, name: None, parent: Some(999) },
        // Vanishes between query and component listing
        EntityRow { id: 5, name: None, parent: Some(1) },
    ];

    let mut components: HashMap<u64, Vec<String>> = HashMap::new();
    for id in [1u64, 2, 3, 4] {
        components.insert(id, vec!["game::Transform".to_string()]);
    }
    // id 5 deliberately absent: list_components fails for it

    let mut component_values = HashMap::new();
    for id in [1u64, 2, 3, 4] {
        component_values.insert(
            (id, "game::Transform".to_string()),
            TypedValue::ok("game::Transform", json!({ "scale": 1.0 })),
        );
    }

    MockClient {
        rows,
        components,
        component_values,
        resources: vec!["game::Score".to_string()],
        resource_values: [(
            "game::Score".to_string(),
            TypedValue::ok("game::Score", json!(0)),
        )]
        .into_iter()
        .collect(),
        ..MockClient::new()
    }
}

#[tokio::test]
async fn forest_links_children_and_promotes_orphans() {
    let client = Arc::new(scripted_world());
    let cache = EntityGraphCache::new(client.clone());

    let forest = cache.tree().await.unwrap();

    // Two roots: the real chain 1 -> 2 -> 3, and orphan 4 promoted to the
    // top level because parent 999 does not exist
    assert_eq!(forest.len(), 2);
    let chain = forest.iter().find(|node| node.id == 1).unwrap();
    assert_eq!(chain.children.len(), 1);
    assert_eq!(chain.children[0].id, 2);
    assert_eq!(chain.children[0].children[0].id, 3);
    assert!(forest.iter().any(|node| node.id == 4));

    // The vanished entity was skipped without aborting the listing
    assert!(!forest.iter().any(|node| node.id == 5));
    assert_eq!(chain.components, ["game::Transform"]);
}

#[tokio::test]
async fn listing_is_cached_until_membership_changes() {
    let client = Arc::new(scripted_world());
    let cache = EntityGraphCache::new(client.clone());

    cache.tree().await.unwrap();
    cache.tree().await.unwrap();
    assert_eq!(client.calls("query_entities"), 1);

    cache.invalidate(None).await;
    cache.tree().await.unwrap();
    assert_eq!(client.calls("query_entities"), 2);
}

#[tokio::test]
async fn detail_invalidation_preserves_the_listing() {
    let client = Arc::new(scripted_world());
    let cache = EntityGraphCache::new(client.clone());

    cache.tree().await.unwrap();
    let queries_after_listing = client.calls("query_entities");

    cache.entity_detail(1).await.unwrap();
    cache.entity_detail(1).await.unwrap();
    let fetches = client.calls("get_component");

    cache.invalidate(Some(&[1])).await;
    cache.entity_detail(1).await.unwrap();

    // The detail entry was refetched, the listing was not
    assert!(client.calls("get_component") > fetches);
    assert_eq!(client.calls("query_entities"), queries_after_listing);
}

#[tokio::test]
async fn per_component_fetch_failure_is_error_tagged() {
    let mut client = scripted_world();
    client
        .components
        .get_mut(&1)
        .unwrap()
        .push("game::Broken".to_string());
    // No value scripted for game::Broken: the mock answers with an
    // error-tagged TypedValue while the sibling succeeds
    let cache = EntityGraphCache::new(Arc::new(client));

    let detail = cache.entity_detail(1).await.unwrap();
    assert_eq!(detail.len(), 2);
    assert!(!detail.iter().find(|v| v.type_path == "game::Transform").unwrap().is_err());
    assert!(detail.iter().find(|v| v.type_path == "game::Broken").unwrap().is_err());
}

#[tokio::test]
async fn acknowledged_mutation_invalidates_only_the_target() {
    let client = Arc::new(scripted_world());
    let inspector = Inspector::new(client.clone());

    inspector.entities.tree().await.unwrap();
    inspector.entities.entity_detail(1).await.unwrap();
    let fetches = client.calls("get_component");

    let event = EditEvent {
        type_path: "game::Transform".to_string(),
        path: "scale".to_string(),
        value: json!(2.0),
    };
    inspector
        .apply_edit(MutationTarget::Component(1), &event)
        .await
        .unwrap();

    assert_eq!(
        client.mutations(),
        vec![("game::Transform".to_string(), "scale".to_string(), json!(2.0))]
    );

    // Target detail refetches, the listing does not
    inspector.entities.entity_detail(1).await.unwrap();
    assert!(client.calls("get_component") > fetches);
    assert_eq!(client.calls("query_entities"), 1);
}

#[tokio::test]
async fn rejected_mutation_surfaces_the_path_and_keeps_caches() {
    let client = Arc::new(MockClient {
        reject_mutations: true,
        ..scripted_world()
    });
    let inspector = Inspector::new(client.clone());

    inspector.entities.entity_detail(1).await.unwrap();
    let fetches = client.calls("get_component");

    let event = EditEvent {
        type_path: "game::Transform".to_string(),
        path: "scale".to_string(),
        value: json!(2.0),
    };
    let error = inspector
        .apply_edit(MutationTarget::Component(1), &event)
        .await
        .unwrap_err();
    assert!(error.to_string().contains("scale"));

    // The in-progress edit is not discarded: nothing was invalidated
    inspector.entities.entity_detail(1).await.unwrap();
    assert_eq!(client.calls("get_component"), fetches);
}

#[tokio::test]
async fn spawn_invalidates_the_listing() {
    let client = Arc::new(scripted_world());
    let inspector = Inspector::new(client.clone());

    inspector.entities.tree().await.unwrap();
    inspector.spawn().await.unwrap();
    inspector.entities.tree().await.unwrap();

    assert_eq!(client.calls("query_entities"), 2);
}

#[tokio::test]
async fn resource_detail_and_invalidation() {
    let client = Arc::new(scripted_world());
    let inspector = Inspector::new(client.clone());

    let names = inspector.entities.resource_names().await.unwrap();
    assert_eq!(names.as_ref(), &["game::Score".to_string()]);

    inspector.entities.resource_detail("game::Score").await.unwrap();
    inspector.entities.resource_detail("game::Score").await.unwrap();
    assert_eq!(client.calls("get_resource"), 1);

    let event = EditEvent {
        type_path: "game::Score".to_string(),
        path: "".to_string(),
        value: json!(10),
    };
    inspector
        .apply_edit(MutationTarget::Resource, &event)
        .await
        .unwrap();

    inspector.entities.resource_detail("game::Score").await.unwrap();
    assert_eq!(client.calls("get_resource"), 2);
}

#[tokio::test]
async fn rename_patches_the_cached_forest_in_place() {
    let client = Arc::new(scripted_world());
    let cache = EntityGraphCache::new(client.clone());

    cache.tree().await.unwrap();
    cache.apply_rename(2, Some("arm".to_string())).await;

    let forest = cache.tree().await.unwrap();
    let chain = forest.iter().find(|node| node.id == 1).unwrap();
    assert_eq!(chain.children[0].name.as_deref(), Some("arm"));
    // Patch, not refetch
    assert_eq!(client.calls("query_entities"), 1);
}
