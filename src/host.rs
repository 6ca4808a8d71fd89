use std::fmt::Debug;

/// Scene graph the resolver walks.
///
/// Nodes are cheap handles into the host's tree. Every lookup returns `None` for "absent"; absence is never an error
/// at this level.
pub trait SceneHost {
	type Node: Clone + PartialEq + Debug;

	/// The tree root. Its children are services addressed by name.
	fn root(&self) -> Self::Node;

	fn is_root(&self, node: &Self::Node) -> bool {
		*node == self.root()
	}

	/// Display name of a node.
	fn name(&self, node: &Self::Node) -> String;

	/// First child of `parent` called `name`, without waiting.
	fn find_first_child(&self, parent: &Self::Node, name: &str) -> Option<Self::Node>;

	/// Suspends the caller until `parent` has a child called `name`.
	///
	/// Gives up only on the host's own default timeout, if it has one.
	fn wait_for_child(&self, parent: &Self::Node, name: &str) -> Option<Self::Node>;

	/// Fetches a root-level service by name, creating it on first access where the host supports that.
	fn service(&self, name: &str) -> Option<Self::Node>;

	/// All nodes carrying `tag`, in the host's enumeration order.
	fn tagged(&self, tag: &str) -> Vec<Self::Node>;

	/// The player owning this execution context. Absent on hosts without one, e.g. a server.
	fn local_player(&self) -> Option<Self::Node>;

	/// The character of `player`, suspending until one spawns.
	fn wait_for_character(&self, player: &Self::Node) -> Option<Self::Node>;
}
