//! Schema registry
//!
//! Fetches the raw type registry once per cache epoch, runs every entry
//! through the codec and the fixup pass, inlines all internal references into
//! fully expanded trees, and answers per-type lookups from the resulting
//! immutable snapshot. Lookups never fail: unknown types and upstream fetch
//! failures degrade to a minimal fallback node.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::client::ReflectionClient;
use crate::descriptor::RawTypeDescriptor;
use crate::error::Result;

use super::{apply_fixup, descriptor_to_schema, short_type_name, Items, SchemaNode};

/// One cache epoch of normalized, dereferenced schemas
///
/// Immutable once built; discarded wholesale on invalidation.
pub struct RegistrySnapshot {
    schemas: HashMap<String, Arc<SchemaNode>>,
    /// SHA-256 over the raw registry, identifies the epoch
    pub digest: String,
    pub fetched_at: DateTime<Utc>,
    /// Groups of mutually-referential type paths found during dereferencing;
    /// members resolve to opaque markers where a cycle would re-enter
    pub cyclic_groups: Vec<Vec<String>>,
}

impl RegistrySnapshot {
    /// Run the full raw-registry-to-snapshot pipeline: codec, fixups,
    /// dereference, identity restore.
    pub fn build(raw: &HashMap<String, RawTypeDescriptor>) -> Self {
        let encoded: HashMap<String, SchemaNode> = raw
            .iter()
            .map(|(key, descriptor)| (key.clone(), apply_fixup(descriptor_to_schema(descriptor))))
            .collect();

        let cyclic_groups = detect_cycles(&encoded);

        let mut memo: HashMap<String, SchemaNode> = HashMap::with_capacity(encoded.len());
        let mut in_progress = HashSet::new();
        let mut schemas = HashMap::with_capacity(encoded.len());
        for key in encoded.keys() {
            let mut resolved = resolve(key, &encoded, &mut memo, &mut in_progress);

            // Dereferencing may have propagated the referenced node's own
            // identity (single-field wrappers resolve to their element);
            // force the registry key's identity back onto the entry.
            resolved.type_path = key.clone();
            resolved.short_path = raw
                .get(key)
                .map(|descriptor| descriptor.short_path.clone())
                .unwrap_or_else(|| short_type_name(key));

            schemas.insert(key.clone(), Arc::new(resolved));
        }

        Self {
            schemas,
            digest: registry_digest(raw),
            fetched_at: Utc::now(),
            cyclic_groups,
        }
    }

    pub fn get(&self, type_path: &str) -> Option<Arc<SchemaNode>> {
        self.schemas.get(type_path).cloned()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn type_paths(&self) -> impl Iterator<Item = &String> {
        self.schemas.keys()
    }

    /// Fuzzy-search registered types by short and full path
    pub fn search(&self, query: &str, limit: usize) -> Vec<TypeSearchResult> {
        let matcher = SkimMatcherV2::default();
        let mut results: Vec<TypeSearchResult> = self
            .schemas
            .values()
            .filter_map(|node| {
                let score = matcher
                    .fuzzy_match(&node.short_path, query)
                    .or_else(|| matcher.fuzzy_match(&node.type_path, query))?;
                Some(TypeSearchResult {
                    type_path: node.type_path.clone(),
                    short_path: node.short_path.clone(),
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.type_path.cmp(&b.type_path)));
        results.truncate(limit);
        results
    }
}

/// Search hit for a registered type
#[derive(Debug, Clone)]
pub struct TypeSearchResult {
    pub type_path: String,
    pub short_path: String,
    pub score: i64,
}

/// Inline every `$ref` reachable from `key` into a self-contained tree.
///
/// Re-entering a type already on the resolution stack means the registry
/// contains a reference cycle; the re-entry point resolves to a minimal
/// opaque marker so expansion terminates.
fn resolve(
    key: &str,
    encoded: &HashMap<String, SchemaNode>,
    memo: &mut HashMap<String, SchemaNode>,
    in_progress: &mut HashSet<String>,
) -> SchemaNode {
    if let Some(done) = memo.get(key) {
        return done.clone();
    }
    if !in_progress.insert(key.to_string()) {
        return SchemaNode::fallback(key);
    }

    let resolved = match encoded.get(key) {
        Some(node) => inline_refs(node.clone(), encoded, memo, in_progress),
        None => SchemaNode::fallback(key),
    };

    in_progress.remove(key);
    memo.insert(key.to_string(), resolved.clone());
    resolved
}

fn inline_refs(
    node: SchemaNode,
    encoded: &HashMap<String, SchemaNode>,
    memo: &mut HashMap<String, SchemaNode>,
    in_progress: &mut HashSet<String>,
) -> SchemaNode {
    if let Some(target) = &node.reference {
        let mut inner = resolve(target, encoded, memo, in_progress);
        // A referring node may carry its own title (retitled optional
        // payloads); the referenced identity must not clobber it
        if node.title.is_some() {
            inner.title = node.title;
        }
        return inner;
    }

    let mut node = node;
    if let Some(properties) = node.properties.take() {
        node.properties = Some(
            properties
                .into_iter()
                .map(|(name, child)| (name, inline_refs(child, encoded, memo, in_progress)))
                .collect(),
        );
    }
    if let Some(items) = node.items.take() {
        node.items = Some(match items {
            Items::Single(element) => {
                Items::Single(Box::new(inline_refs(*element, encoded, memo, in_progress)))
            }
            Items::Tuple(elements) => Items::Tuple(
                elements
                    .into_iter()
                    .map(|element| inline_refs(element, encoded, memo, in_progress))
                    .collect(),
            ),
        });
    }
    if let Some(additional) = node.additional_properties.take() {
        node.additional_properties =
            Some(Box::new(inline_refs(*additional, encoded, memo, in_progress)));
    }
    if !node.one_of.is_empty() {
        let variants = std::mem::take(&mut node.one_of);
        node.one_of = variants
            .into_iter()
            .map(|variant| inline_refs(variant, encoded, memo, in_progress))
            .collect();
    }
    node
}

/// Build the type-reference graph and report strongly connected components,
/// i.e. the groups a naive eager dereference would never finish expanding.
fn detect_cycles(encoded: &HashMap<String, SchemaNode>) -> Vec<Vec<String>> {
    let mut graph: DiGraph<String, ()> = DiGraph::with_capacity(encoded.len(), encoded.len());
    let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(encoded.len());

    for key in encoded.keys() {
        indices.insert(key, graph.add_node(key.clone()));
    }
    for (key, node) in encoded {
        let mut targets = Vec::new();
        collect_references(node, &mut targets);
        let from = indices[key.as_str()];
        for target in targets {
            if let Some(&to) = indices.get(target.as_str()) {
                graph.add_edge(from, to, ());
            }
        }
    }

    kosaraju_scc(&graph)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1
                || scc
                    .first()
                    .map(|&idx| graph.find_edge(idx, idx).is_some())
                    .unwrap_or(false)
        })
        .map(|scc| {
            let mut group: Vec<String> = scc
                .into_iter()
                .filter_map(|idx| graph.node_weight(idx).cloned())
                .collect();
            group.sort();
            group
        })
        .collect()
}

fn collect_references(node: &SchemaNode, out: &mut Vec<String>) {
    if let Some(target) = &node.reference {
        out.push(target.clone());
    }
    if let Some(properties) = &node.properties {
        for child in properties.values() {
            collect_references(child, out);
        }
    }
    match &node.items {
        Some(Items::Single(element)) => collect_references(element, out),
        Some(Items::Tuple(elements)) => {
            for element in elements {
                collect_references(element, out);
            }
        }
        None => {}
    }
    if let Some(additional) = &node.additional_properties {
        collect_references(additional, out);
    }
    for variant in &node.one_of {
        collect_references(variant, out);
    }
}

/// Canonical digest of the raw registry: entries hashed in key order
fn registry_digest(raw: &HashMap<String, RawTypeDescriptor>) -> String {
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort();

    let mut hasher = Sha256::new();
    for key in keys {
        hasher.update(key.as_bytes());
        if let Ok(bytes) = serde_json::to_vec(&raw[key]) {
            hasher.update(&bytes);
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Cached, lazily-built view of the remote type registry
///
/// Constructed once per session with an injected client; consumers share it
/// by reference. The snapshot is replaced wholesale, never patched.
pub struct SchemaRegistry {
    client: Arc<dyn ReflectionClient>,
    snapshot: Mutex<Option<Arc<RegistrySnapshot>>>,
}

impl SchemaRegistry {
    pub fn new(client: Arc<dyn ReflectionClient>) -> Self {
        Self {
            client,
            snapshot: Mutex::new(None),
        }
    }

    /// Current snapshot, fetching and building it on first call.
    ///
    /// The lock is held across the fetch so overlapping first-callers share
    /// one raw fetch and observe the same snapshot.
    pub async fn snapshot(&self) -> Result<Arc<RegistrySnapshot>> {
        let mut guard = self.snapshot.lock().await;
        if let Some(snapshot) = guard.as_ref() {
            return Ok(snapshot.clone());
        }

        let raw = self.client.fetch_registry().await?;
        let snapshot = Arc::new(RegistrySnapshot::build(&raw));
        tracing::debug!(
            types = snapshot.len(),
            digest = %snapshot.digest,
            "rebuilt registry snapshot"
        );
        for group in &snapshot.cyclic_groups {
            tracing::warn!(group = ?group, "reference cycle in type registry; members resolve to opaque markers");
        }

        *guard = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Schema for one type path. Never fails: an unknown path, or a registry
    /// fetch failure, yields a minimal fallback node that renders opaque.
    pub async fn get_type_schema(&self, type_path: &str) -> Arc<SchemaNode> {
        match self.snapshot().await {
            Ok(snapshot) => snapshot
                .get(type_path)
                .unwrap_or_else(|| Arc::new(SchemaNode::fallback(type_path))),
            Err(error) => {
                tracing::warn!(%type_path, %error, "registry fetch failed; serving fallback schema");
                Arc::new(SchemaNode::fallback(type_path))
            }
        }
    }

    /// Fuzzy type search over the current snapshot
    pub async fn search(&self, query: &str, limit: usize) -> Vec<TypeSearchResult> {
        match self.snapshot().await {
            Ok(snapshot) => snapshot.search(query, limit),
            Err(_) => Vec::new(),
        }
    }

    /// Discard the snapshot; the next lookup triggers a full rebuild
    pub async fn invalidate(&self) {
        *self.snapshot.lock().await = None;
    }
}
