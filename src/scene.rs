//! In-memory [`SceneHost`](crate::host::SceneHost) implementation.

mod attribute;
mod json;
mod node;
mod tree;

pub use attribute::AttributeValue;
pub use json::{JsonError, SceneLoadError, SceneLoadResult};
pub use node::{NodeId, SceneNode};
pub use tree::{SceneError, SceneResult, SceneTree, ROOT_CLASS, YIELD_WARNING};
