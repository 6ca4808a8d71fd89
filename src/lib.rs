//! Path queries over a hierarchical scene tree.
//!
//! ```
//! use scenequery::{ExecutionContext, PathResolver, SceneTree};
//!
//! let scene = r#"{ "children": [{ "name": "Workspace", "children": [{ "name": "Baseplate" }] }] }"#;
//! let tree = SceneTree::from_json(scene).unwrap();
//! let mut resolver = PathResolver::new(&tree, ExecutionContext::Simulation.tick());
//!
//! let baseplate = resolver.path("Workspace\\Baseplate").unwrap();
//! assert!(resolver.unreliable_path("Workspace\\Nothing").is_none());
//! # let _ = baseplate;
//! ```

pub mod config;
pub mod host;
pub mod path;
pub mod resolve;
pub mod scene;
pub mod tick;

pub use config::{ResolveOptions, RootLayout};
pub use host::SceneHost;
pub use path::{Path, RootAlias, Segment};
pub use resolve::{PathError, PathResolver, PathResult};
pub use scene::{NodeId, SceneTree};
pub use tick::{ExecutionContext, FixedTick, FrameTick, Tick, YieldTick};
