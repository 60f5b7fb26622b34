//! Remote Inspector
//!
//! Schema-transformation and path-addressed value-tree engine for inspecting
//! and editing the live state of a running simulation (entities, components,
//! resources) over a remote reflection protocol.
//!
//! ## Features
//!
//! - **Schema Codec**: turns raw, reference-laden registry entries into
//!   normalized schema nodes, with special-case fixups for foreign types
//!   (textual wrappers, entity ids, math vectors, optionals)
//! - **Schema Registry**: one coalesced fetch per cache epoch, full
//!   reference dereferencing with cycle markers, fallback nodes for unknown
//!   types
//! - **Value Tree**: recursive value/schema pairing for rendering,
//!   default synthesis, sum-type variant selection by structural adherence,
//!   and structurally-complete path-addressed updates
//! - **Entity Graph Cache**: parent/child forest from flat entity rows with
//!   per-target cache invalidation driven by mutation acknowledgements
//!
//! ## Data flow
//!
//! ```text
//! raw registry ──codec+fixups──▶ SchemaRegistry ──lookups──▶ ValueTree
//!                                                               │ edits
//!                                                               ▼
//! EntityGraphCache ◀──invalidate── transport ◀── {path, value} events
//! ```

pub mod bridge;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod schema;
pub mod value;

pub use bridge::BridgeMessage;
pub use client::ReflectionClient;
pub use config::InspectorConfig;
pub use descriptor::{EntityId, EntityRow, PrimitiveKind, RawTypeDescriptor, TypeKind, TypeRef, TypedValue, VariantDescriptor};
pub use entity::{EntityGraphCache, EntityNode, Inspector, MutationTarget};
pub use error::{InspectorError, Result};
pub use schema::{RegistrySnapshot, SchemaNode, SchemaRegistry};
pub use value::{generate_default, EditEvent, ValueTree, Widget};
