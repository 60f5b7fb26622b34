//! Value/schema pairing
//!
//! The recursive engine that pairs a runtime value with its schema node to
//! render an editable description, synthesize defaults, pick sum-type
//! variants by structural adherence, and turn leaf edits into
//! structurally-complete path-addressed updates.

pub mod adhere;
pub mod defaults;
pub mod path;
pub mod tree;

pub use adhere::{adheres, find_selected_index};
pub use defaults::generate_default;
pub use tree::{EditEvent, NamedWidget, ValueTree, Widget};
