use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use indextree::Arena;
use tracing::{debug, warn};

use super::attribute::AttributeValue;
use super::node::{NodeId, SceneNode};
use crate::host::SceneHost;

/// Class and name of the root node.
pub const ROOT_CLASS: &str = "DataModel";
/// How long a wait may go unanswered before it is reported as a possible infinite yield.
pub const YIELD_WARNING: Duration = Duration::from_secs(5);

pub type SceneResult<T> = Result<T, SceneError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
	#[error("Node {0:?} does not exist")]
	UnknownNode(NodeId),
	#[error("The root node cannot be reparented or destroyed")]
	RootLocked,
	#[error("Cannot parent {node:?} into its own subtree")]
	Cycle { node: NodeId },
}

fn alive(arena: &Arena<SceneNode>, id: NodeId) -> bool {
	arena.get(id.0).is_some_and(|node| !node.is_removed())
}

struct Inner {
	root: indextree::NodeId,
	arena: Arena<SceneNode>,
	local_player: Option<NodeId>,
	/// Player -> character
	characters: HashMap<NodeId, NodeId>,
}

impl Inner {
	fn contains(&self, id: NodeId) -> bool {
		alive(&self.arena, id)
	}

	fn check(&self, id: NodeId) -> SceneResult<()> {
		if self.contains(id) {
			Ok(())
		} else {
			Err(SceneError::UnknownNode(id))
		}
	}

	fn node(&self, id: NodeId) -> SceneResult<&SceneNode> {
		self.check(id)?;
		self.arena.get(id.0).map(|node| node.get()).ok_or(SceneError::UnknownNode(id))
	}

	fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut SceneNode> {
		self.check(id)?;
		self.arena
			.get_mut(id.0)
			.map(|node| node.get_mut())
			.ok_or(SceneError::UnknownNode(id))
	}

	fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
		if !self.contains(parent) {
			return None;
		}
		parent
			.0
			.children(&self.arena)
			.find(|child| self.arena.get(*child).is_some_and(|node| node.get().name == name))
			.map(NodeId)
	}

	fn attach(&mut self, parent: NodeId, child: NodeId) -> SceneResult<()> {
		self.check(parent)?;
		self.check(child)?;
		if child.0 == self.root {
			return Err(SceneError::RootLocked);
		}
		if parent.0.ancestors(&self.arena).any(|ancestor| ancestor == child.0) {
			return Err(SceneError::Cycle { node: child });
		}
		child.0.detach(&mut self.arena);
		parent
			.0
			.checked_append(child.0, &mut self.arena)
			.map_err(|_| SceneError::Cycle { node: child })
	}
}

enum Waiting<T> {
	Ready(T),
	Pending,
	/// What was waited on can no longer appear.
	Gone,
}

/// In-memory scene tree.
///
/// All methods take `&self`: the arena sits behind a mutex, and every change wakes up threads blocked in
/// [`SceneHost::wait_for_child`] or [`SceneHost::wait_for_character`].
pub struct SceneTree {
	inner: Mutex<Inner>,
	changed: Condvar,
	wait_timeout: Option<Duration>,
}

impl Default for SceneTree {
	fn default() -> Self {
		Self::new()
	}
}

impl SceneTree {
	pub fn new() -> Self {
		let mut arena = Arena::new();
		let root = arena.new_node(SceneNode::new(ROOT_CLASS, "Game"));

		Self {
			inner: Mutex::new(Inner {
				root,
				arena,
				local_player: None,
				characters: HashMap::new(),
			}),
			changed: Condvar::new(),
			wait_timeout: None,
		}
	}

	/// Makes blocking waits give up after `timeout`. By default they wait forever.
	pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.wait_timeout = timeout;
		self
	}

	fn lock(&self) -> MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Runs a mutation and wakes up every waiter.
	fn modify<T>(&self, f: impl FnOnce(&mut Inner) -> SceneResult<T>) -> SceneResult<T> {
		let mut inner = self.lock();
		let result = f(&mut *inner);
		drop(inner);
		self.changed.notify_all();
		result
	}

	fn wait_until<T>(&self, what: &str, mut check: impl FnMut(&Inner) -> Waiting<T>) -> Option<T> {
		let start = Instant::now();
		let mut warned = false;
		let mut inner = self.lock();

		loop {
			match check(&*inner) {
				Waiting::Ready(val) => return Some(val),
				Waiting::Gone => return None,
				Waiting::Pending => {}
			}

			let elapsed = start.elapsed();
			if self.wait_timeout.is_some_and(|timeout| elapsed >= timeout) {
				debug!("Gave up waiting for {what} after {elapsed:?}");
				return None;
			}
			if !warned && elapsed >= YIELD_WARNING {
				warn!("Infinite yield possible on {what}");
				warned = true;
			}

			let deadline = [self.wait_timeout, (!warned).then_some(YIELD_WARNING)]
				.into_iter()
				.flatten()
				.min();
			inner = match deadline {
				Some(deadline) => {
					self.changed
						.wait_timeout(inner, deadline.saturating_sub(elapsed))
						.unwrap_or_else(PoisonError::into_inner)
						.0
				}
				None => self.changed.wait(inner).unwrap_or_else(PoisonError::into_inner),
			};
		}
	}

	/// Creates a node without a parent. It is not part of the scene until parented.
	pub fn create(&self, class_name: &str, name: &str) -> NodeId {
		let mut inner = self.lock();
		NodeId(inner.arena.new_node(SceneNode::new(class_name, name)))
	}

	/// Creates a node and appends it to `parent`.
	pub fn add_child(&self, parent: NodeId, class_name: &str, name: &str) -> SceneResult<NodeId> {
		self.modify(|inner| {
			inner.check(parent)?;
			let child = NodeId(inner.arena.new_node(SceneNode::new(class_name, name)));
			inner.attach(parent, child)?;
			Ok(child)
		})
	}

	/// Moves `node` under `parent`, or out of the scene with `None`.
	pub fn set_parent(&self, node: NodeId, parent: Option<NodeId>) -> SceneResult<()> {
		self.modify(|inner| match parent {
			Some(parent) => inner.attach(parent, node),
			None => {
				inner.check(node)?;
				if node.0 == inner.root {
					return Err(SceneError::RootLocked);
				}
				node.0.detach(&mut inner.arena);
				Ok(())
			}
		})
	}

	/// Removes `node` and its whole subtree.
	pub fn destroy(&self, node: NodeId) -> SceneResult<()> {
		self.modify(|inner| {
			inner.check(node)?;
			if node.0 == inner.root {
				return Err(SceneError::RootLocked);
			}
			node.0.remove_subtree(&mut inner.arena);

			let Inner {
				arena,
				local_player,
				characters,
				..
			} = inner;
			if local_player.is_some_and(|player| !alive(arena, player)) {
				*local_player = None;
			}
			characters.retain(|player, character| alive(arena, *player) && alive(arena, *character));
			Ok(())
		})
	}

	pub fn rename(&self, node: NodeId, name: &str) -> SceneResult<()> {
		self.modify(|inner| {
			inner.node_mut(node)?.name = name.to_owned();
			Ok(())
		})
	}

	/// Snapshot of a node's data.
	pub fn node(&self, node: NodeId) -> Option<SceneNode> {
		self.lock().node(node).ok().cloned()
	}

	pub fn contains(&self, node: NodeId) -> bool {
		self.lock().contains(node)
	}

	pub fn class_name(&self, node: NodeId) -> Option<String> {
		Some(self.lock().node(node).ok()?.class_name.clone())
	}

	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		let inner = self.lock();
		inner.check(node).ok()?;
		inner.arena.get(node.0)?.parent().map(NodeId)
	}

	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		let inner = self.lock();
		if !inner.contains(node) {
			return Vec::new();
		}
		node.0.children(&inner.arena).map(NodeId).collect()
	}

	/// Names from the root down to `node`, separated like a path.
	pub fn full_name(&self, node: NodeId) -> Option<String> {
		let inner = self.lock();
		inner.check(node).ok()?;
		let mut names: Vec<&str> = node
			.0
			.ancestors(&inner.arena)
			.filter(|id| *id != inner.root)
			.filter_map(|id| inner.arena.get(id))
			.map(|node| node.get().name.as_str())
			.collect();
		names.reverse();
		let delimiter = crate::path::DELIMITER.to_string();
		Some(names.join(delimiter.as_str()))
	}

	pub fn add_tag(&self, node: NodeId, tag: &str) -> SceneResult<()> {
		self.modify(|inner| {
			inner.node_mut(node)?.tags.insert(tag.to_owned());
			Ok(())
		})
	}

	pub fn remove_tag(&self, node: NodeId, tag: &str) -> SceneResult<()> {
		self.modify(|inner| {
			inner.node_mut(node)?.tags.remove(tag);
			Ok(())
		})
	}

	pub fn has_tag(&self, node: NodeId, tag: &str) -> bool {
		self.lock().node(node).is_ok_and(|node| node.has_tag(tag))
	}

	pub fn set_attribute(&self, node: NodeId, key: &str, value: impl Into<AttributeValue>) -> SceneResult<()> {
		let value = value.into();
		self.modify(|inner| {
			inner.node_mut(node)?.attributes.insert(key.to_owned(), value);
			Ok(())
		})
	}

	/// Removes an attribute, returning its last value.
	pub fn remove_attribute(&self, node: NodeId, key: &str) -> SceneResult<Option<AttributeValue>> {
		self.modify(|inner| Ok(inner.node_mut(node)?.attributes.remove(key)))
	}

	pub fn attribute(&self, node: NodeId, key: &str) -> Option<AttributeValue> {
		self.lock().node(node).ok()?.attributes.get(key).cloned()
	}

	pub fn attributes(&self, node: NodeId) -> BTreeMap<String, AttributeValue> {
		self.lock()
			.node(node)
			.map(|node| node.attributes.clone())
			.unwrap_or_default()
	}

	pub fn set_local_player(&self, player: Option<NodeId>) -> SceneResult<()> {
		self.modify(|inner| {
			if let Some(player) = player {
				inner.check(player)?;
			}
			inner.local_player = player;
			Ok(())
		})
	}

	/// Spawns (`Some`) or despawns (`None`) the character of `player`.
	pub fn set_character(&self, player: NodeId, character: Option<NodeId>) -> SceneResult<()> {
		self.modify(|inner| {
			inner.check(player)?;
			match character {
				Some(character) => {
					inner.check(character)?;
					inner.characters.insert(player, character);
				}
				None => {
					inner.characters.remove(&player);
				}
			}
			Ok(())
		})
	}
}

impl SceneHost for SceneTree {
	type Node = NodeId;

	fn root(&self) -> NodeId {
		NodeId(self.lock().root)
	}

	fn name(&self, node: &NodeId) -> String {
		self.lock().node(*node).map(|node| node.name.clone()).unwrap_or_default()
	}

	fn find_first_child(&self, parent: &NodeId, name: &str) -> Option<NodeId> {
		self.lock().find_child(*parent, name)
	}

	fn wait_for_child(&self, parent: &NodeId, name: &str) -> Option<NodeId> {
		let what = format!("{name:?}");
		self.wait_until(&what, |inner| {
			if !inner.contains(*parent) {
				return Waiting::Gone;
			}
			match inner.find_child(*parent, name) {
				Some(child) => Waiting::Ready(child),
				None => Waiting::Pending,
			}
		})
	}

	fn service(&self, name: &str) -> Option<NodeId> {
		if name.is_empty() {
			return None;
		}

		let mut inner = self.lock();
		let root = NodeId(inner.root);
		if let Some(service) = inner.find_child(root, name) {
			return Some(service);
		}

		debug!("Creating service {name:?}");
		let service = NodeId(inner.arena.new_node(SceneNode::new(name, name)));
		root.0.append(service.0, &mut inner.arena);
		drop(inner);
		self.changed.notify_all();
		Some(service)
	}

	/// Depth-first from the root, so only nodes that are part of the scene count.
	fn tagged(&self, tag: &str) -> Vec<NodeId> {
		let inner = self.lock();
		inner
			.root
			.descendants(&inner.arena)
			.filter(|id| inner.arena.get(*id).is_some_and(|node| node.get().has_tag(tag)))
			.map(NodeId)
			.collect()
	}

	fn local_player(&self) -> Option<NodeId> {
		self.lock().local_player
	}

	fn wait_for_character(&self, player: &NodeId) -> Option<NodeId> {
		let what = format!("the character of {:?}", self.name(player));
		self.wait_until(&what, |inner| {
			if !inner.contains(*player) {
				return Waiting::Gone;
			}
			match inner.characters.get(player) {
				Some(character) => Waiting::Ready(*character),
				None => Waiting::Pending,
			}
		})
	}
}

fn rec_fmt(
	indent: usize,
	f: &mut std::fmt::Formatter<'_>,
	node_id: indextree::NodeId,
	arena: &Arena<SceneNode>,
) -> std::fmt::Result {
	let Some(node) = arena.get(node_id) else {
		return Ok(());
	};

	let node = node.get();

	let class_name = &node.class_name;
	#[cfg(feature = "owo")]
	let class_name = {
		use owo_colors::OwoColorize;
		class_name.magenta()
	};

	write!(f, "{}- [{}] {}", "  ".repeat(indent), class_name, node.name)?;
	for tag in &node.tags {
		#[cfg(feature = "owo")]
		let tag = {
			use owo_colors::OwoColorize;
			tag.yellow()
		};
		write!(f, " #{tag}")?;
	}
	writeln!(f)?;

	for child in node_id.children(arena) {
		rec_fmt(indent + 1, f, child, arena)?;
	}

	Ok(())
}

impl Display for SceneTree {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let inner = self.lock();
		rec_fmt(0, f, inner.root, &inner.arena)
	}
}
