use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::ResolveOptions;
use crate::host::SceneHost;
use crate::path::{Path, RootAlias, Segment};
use crate::tick::Tick;

pub type PathResult<T> = Result<T, PathError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
	#[error("Infinite yield on @{name} while resolving \"{path}\"")]
	Timeout { name: String, path: String },
	#[error("Path \"{path}\" did not resolve to a node")]
	Unresolved { path: String },
}

/// Walks path strings down a [`SceneHost`].
///
/// A resolution keeps a cursor that starts at the parent and moves once per segment. Misses leave the cursor absent
/// but do not stop the walk: child lookups under an absent cursor stay absent, while unique-name segments look up
/// the whole scene and may yield a node again. The only failure that stops a walk is a `*@name` segment running out
/// of time.
pub struct PathResolver<'h, H: SceneHost, T: Tick> {
	host: &'h H,
	tick: T,
	options: ResolveOptions,
}

impl<'h, H: SceneHost, T: Tick> PathResolver<'h, H, T> {
	pub fn new(host: &'h H, tick: T) -> Self {
		Self {
			host,
			tick,
			options: ResolveOptions::default(),
		}
	}

	pub fn with_options(mut self, options: ResolveOptions) -> Self {
		self.options = options;
		self
	}

	pub fn host(&self) -> &'h H {
		self.host
	}

	pub fn options(&self) -> &ResolveOptions {
		&self.options
	}

	/// Resolves `path` from the host root, treating absence as an error.
	pub fn path(&mut self, path: &str) -> PathResult<H::Node> {
		let root = self.host.root();
		let timeout = self.options.timeout;
		self.path_from(path, root, timeout)
	}

	/// Resolves `path` from `parent`, treating absence as an error.
	pub fn path_from(&mut self, path: &str, parent: H::Node, timeout: Duration) -> PathResult<H::Node> {
		let path = Path::parse(path);
		self.resolve(&path, parent, timeout)?.ok_or_else(|| PathError::Unresolved {
			path: path.source().to_owned(),
		})
	}

	/// Resolves `path` from the host root. `None` when any step came up empty or timed out.
	pub fn unreliable_path(&mut self, path: &str) -> Option<H::Node> {
		let root = self.host.root();
		let timeout = self.options.timeout;
		self.unreliable_path_from(path, root, timeout)
	}

	pub fn unreliable_path_from(&mut self, path: &str, parent: H::Node, timeout: Duration) -> Option<H::Node> {
		self.resolve(&Path::parse(path), parent, timeout).ok().flatten()
	}

	/// Walks an already parsed path. `Ok(None)` is a miss, `Err` only ever a unique wait timing out.
	pub fn resolve(&mut self, path: &Path, parent: H::Node, timeout: Duration) -> PathResult<Option<H::Node>> {
		let mut cursor = Some(parent);

		for segment in path.segments() {
			cursor = match segment {
				Segment::Alias(alias) => self.alias(*alias, cursor.as_ref()),
				Segment::UniqueWait(name) => Some(self.wait_unique(path, name, timeout)?),
				Segment::Unique(name) => self.find_unique(name),
				Segment::WaitChild(name) => self.child(cursor.as_ref(), name, true),
				Segment::Child(name) => self.child(cursor.as_ref(), name, false),
			};

			if cursor.is_none() {
				debug!("No node for {segment} in \"{}\"", path.source());
			}
		}

		Ok(cursor)
	}

	fn alias(&self, alias: RootAlias, cursor: Option<&H::Node>) -> Option<H::Node> {
		let layout = &self.options.layout;
		match alias {
			RootAlias::Shared => self.child(cursor, &layout.shared_storage, false),
			RootAlias::Server => {
				let scripts = self.host.service(&layout.server_scripts)?;
				self.host.wait_for_child(&scripts, &layout.script_folder)
			}
			RootAlias::Client => {
				let player = self.host.local_player()?;
				let scripts = self.host.wait_for_child(&player, &layout.player_scripts)?;
				self.host.wait_for_child(&scripts, &layout.script_folder)
			}
			RootAlias::LocalPlayer => self.host.local_player(),
			RootAlias::Character => {
				let player = self.host.local_player()?;
				self.host.wait_for_character(&player)
			}
			RootAlias::Gui => {
				let player = self.host.local_player()?;
				self.host.wait_for_child(&player, &layout.player_gui)
			}
		}
	}

	/// Child lookup shared by plain and waiting segments. Under the root every name is a service.
	fn child(&self, cursor: Option<&H::Node>, name: &str, wait: bool) -> Option<H::Node> {
		let parent = cursor?;
		if self.host.is_root(parent) {
			self.host.service(name)
		} else if wait {
			self.host.wait_for_child(parent, name)
		} else {
			self.host.find_first_child(parent, name)
		}
	}

	fn find_unique(&self, name: &str) -> Option<H::Node> {
		self.host
			.tagged(&self.options.unique_tag)
			.into_iter()
			.find(|node| self.host.name(node) == name)
	}

	/// Polls once per tick until a unique node called `name` shows up.
	///
	/// The budget covers the whole loop: the time reported by each tick plus the time each poll of the host takes.
	fn wait_unique(&mut self, path: &Path, name: &str, timeout: Duration) -> PathResult<H::Node> {
		let mut elapsed = Duration::ZERO;
		loop {
			elapsed += self.tick.wait();

			if elapsed >= timeout {
				warn!("Infinite yield possible on @{name} trying to parse on \"{}\"", path.source());
				return Err(PathError::Timeout {
					name: name.to_owned(),
					path: path.source().to_owned(),
				});
			}

			let poll = Instant::now();
			let found = self.find_unique(name);
			elapsed += poll.elapsed();

			if let Some(node) = found {
				return Ok(node);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::fmt;
	use std::sync::{Arc, Mutex};
	use std::thread;

	use tracing::field::{Field, Visit};
	use tracing::{Event, Level, Subscriber};
	use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

	use super::*;
	use crate::scene::{NodeId, SceneTree};
	use crate::tick::FixedTick;

	const UNIQUE: &str = crate::config::UNIQUE_NAME_TAG;
	const DEFAULT: Duration = crate::config::DEFAULT_TIMEOUT;

	type Events = Arc<Mutex<Vec<(Level, String)>>>;

	struct Capture(Events);

	struct MessageVisitor(String);

	impl Visit for MessageVisitor {
		fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
			if field.name() == "message" {
				self.0 = format!("{value:?}");
			}
		}
	}

	impl<S: Subscriber> Layer<S> for Capture {
		fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
			let mut visitor = MessageVisitor(String::new());
			event.record(&mut visitor);
			self.0.lock().unwrap().push((*event.metadata().level(), visitor.0));
		}
	}

	/// Runs `f` with every tracing event it emits recorded.
	fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<(Level, String)>) {
		let events = Events::default();
		let subscriber = tracing_subscriber::registry().with(Capture(events.clone()));
		let result = tracing::subscriber::with_default(subscriber, f);
		let events = events.lock().unwrap().clone();
		(result, events)
	}

	fn warnings(events: &[(Level, String)]) -> Vec<&str> {
		events
			.iter()
			.filter(|(level, _)| *level == Level::WARN)
			.map(|(_, msg)| msg.as_str())
			.collect()
	}

	fn step() -> FixedTick<'static> {
		FixedTick::new(Duration::from_millis(100))
	}

	/// Game
	/// - Workspace
	///   - Baseplate
	///     - Texture
	///   - Door [UniqueName]
	///     - Hinge
	/// - ServerScriptService
	///   - TS
	///     - Main
	fn scene() -> (SceneTree, NodeId, NodeId) {
		let tree = SceneTree::new();
		let workspace = tree.service("Workspace").unwrap();
		let baseplate = tree.add_child(workspace, "Part", "Baseplate").unwrap();
		tree.add_child(baseplate, "Texture", "Texture").unwrap();
		let door = tree.add_child(workspace, "Model", "Door").unwrap();
		tree.add_tag(door, UNIQUE).unwrap();
		tree.add_child(door, "Part", "Hinge").unwrap();
		let scripts = tree.service("ServerScriptService").unwrap();
		let ts = tree.add_child(scripts, "Folder", "TS").unwrap();
		tree.add_child(ts, "ModuleScript", "Main").unwrap();
		(tree, workspace, door)
	}

	/// Host whose tag enumeration takes a while, like a large scene would.
	struct SlowHost {
		tree: SceneTree,
		delay: Duration,
	}

	impl SceneHost for SlowHost {
		type Node = NodeId;

		fn root(&self) -> NodeId {
			self.tree.root()
		}

		fn name(&self, node: &NodeId) -> String {
			self.tree.name(node)
		}

		fn find_first_child(&self, parent: &NodeId, name: &str) -> Option<NodeId> {
			self.tree.find_first_child(parent, name)
		}

		fn wait_for_child(&self, parent: &NodeId, name: &str) -> Option<NodeId> {
			self.tree.wait_for_child(parent, name)
		}

		fn service(&self, name: &str) -> Option<NodeId> {
			self.tree.service(name)
		}

		fn tagged(&self, tag: &str) -> Vec<NodeId> {
			thread::sleep(self.delay);
			self.tree.tagged(tag)
		}

		fn local_player(&self) -> Option<NodeId> {
			self.tree.local_player()
		}

		fn wait_for_character(&self, player: &NodeId) -> Option<NodeId> {
			self.tree.wait_for_character(player)
		}
	}

	#[test]
	fn test_empty_path_returns_parent() {
		let (tree, workspace, _) = scene();
		let mut resolver = PathResolver::new(&tree, step());

		assert_eq!(resolver.unreliable_path(""), Some(tree.root()));
		assert_eq!(resolver.unreliable_path(" \\ \\\\"), Some(tree.root()));
		assert_eq!(
			resolver.unreliable_path_from("  ", workspace, DEFAULT),
			Some(workspace)
		);
	}

	#[test]
	fn test_plain_segments() {
		let (tree, workspace, _) = scene();
		let mut resolver = PathResolver::new(&tree, step());

		let baseplate = tree.find_first_child(&workspace, "Baseplate").unwrap();
		assert_eq!(resolver.unreliable_path_from("Baseplate", workspace, DEFAULT), Some(baseplate));
		assert_eq!(resolver.unreliable_path_from("Nope", workspace, DEFAULT), None);

		let texture = resolver.path("Workspace\\Baseplate\\Texture").unwrap();
		assert_eq!(tree.name(&texture), "Texture");
		assert_eq!(tree.parent(texture), Some(baseplate));
	}

	#[test]
	fn test_wait_child_blocks_until_inserted() {
		let (tree, workspace, _) = scene();
		let tree = Arc::new(tree);

		let spawner = {
			let tree = tree.clone();
			thread::spawn(move || {
				thread::sleep(Duration::from_millis(20));
				tree.add_child(workspace, "Part", "Late").unwrap()
			})
		};

		let mut resolver = PathResolver::new(&*tree, step());
		let found = resolver.path("Workspace\\*Late").unwrap();
		let late = spawner.join().unwrap();
		assert_eq!(found, late);
		// host waits do not go through the tick
		assert_eq!(resolver.tick.ticks(), 0);
	}

	#[test]
	fn test_root_segments_are_services() {
		let (tree, workspace, _) = scene();
		let mut resolver = PathResolver::new(&tree, step());

		assert_eq!(resolver.unreliable_path("Workspace"), Some(workspace));
		assert_eq!(resolver.unreliable_path("*Workspace"), Some(workspace));

		// services come into existence on first access
		let lighting = resolver.path("Lighting").unwrap();
		assert_eq!(tree.parent(lighting), Some(tree.root()));
		assert_eq!(tree.class_name(lighting).as_deref(), Some("Lighting"));
	}

	#[test]
	fn test_unique_lookup_does_not_block() {
		let (tree, _, door) = scene();
		let tick = step();
		let mut resolver = PathResolver::new(&tree, tick);

		assert_eq!(resolver.unreliable_path("@Door"), Some(door));
		assert_eq!(resolver.unreliable_path("@Ghost"), None);
		// from any parent, the lookup is scene-wide
		let hinge = resolver.path("Workspace\\Baseplate\\@Door\\Hinge").unwrap();
		assert_eq!(tree.parent(hinge), Some(door));
		assert_eq!(resolver.tick.ticks(), 0);
	}

	#[test]
	fn test_unique_lookup_takes_first_in_enumeration_order() {
		let (tree, workspace, door) = scene();
		let storage = tree.service("ReplicatedStorage").unwrap();
		let other = tree.add_child(storage, "Model", "Door").unwrap();
		tree.add_tag(other, UNIQUE).unwrap();

		let mut resolver = PathResolver::new(&tree, step());
		assert_eq!(tree.tagged(UNIQUE), vec![door, other]);
		assert_eq!(resolver.unreliable_path("@Door"), Some(door));

		// untagged namesakes never match
		tree.add_child(workspace, "Model", "Lamp").unwrap();
		assert_eq!(resolver.unreliable_path("@Lamp"), None);
	}

	#[test]
	fn test_unique_wait_finds_late_node() {
		let (tree, workspace, _) = scene();
		let tick = step().on_tick(|n| {
			if n == 3 {
				let lever = tree.add_child(workspace, "Part", "Lever").unwrap();
				tree.add_tag(lever, UNIQUE).unwrap();
			}
		});
		let mut resolver = PathResolver::new(&tree, tick);

		let (lever, events) = capture(|| resolver.path("*@Lever"));
		let lever = lever.unwrap();
		assert_eq!(tree.name(&lever), "Lever");
		assert_eq!(resolver.tick.ticks(), 3);
		assert!(warnings(&events).is_empty());
	}

	#[test]
	fn test_unique_wait_times_out_once() {
		let (tree, workspace, _) = scene();
		let mut resolver = PathResolver::new(&tree, step());

		let (result, events) = capture(|| {
			resolver.unreliable_path_from("Baseplate\\*@Ghost\\Texture", workspace, Duration::from_millis(450))
		});
		assert_eq!(result, None);
		// 100ms steps, the fifth pushes the total past 450ms
		assert_eq!(resolver.tick.ticks(), 5);

		let warnings = warnings(&events);
		assert_eq!(warnings.len(), 1);
		assert!(warnings[0].contains("@Ghost"));
		assert!(warnings[0].contains(r#""Baseplate\*@Ghost\Texture""#));

		let mut resolver = PathResolver::new(&tree, step());
		assert_eq!(
			resolver.path_from("*@Ghost", workspace, Duration::from_millis(200)),
			Err(PathError::Timeout {
				name: "Ghost".to_owned(),
				path: "*@Ghost".to_owned(),
			})
		);

		let err = resolver
			.path_from("Baseplate\\*@Ghost", workspace, Duration::from_millis(200))
			.unwrap_err();
		assert!(err.to_string().ends_with(r#""Baseplate\*@Ghost""#));
	}

	#[test]
	fn test_unique_wait_uses_configured_timeout() {
		let (tree, _, _) = scene();
		let options = ResolveOptions::default().with_timeout(Duration::from_secs(1));
		let mut resolver = PathResolver::new(&tree, step()).with_options(options);

		assert!(resolver.path("*@Ghost").is_err());
		assert_eq!(resolver.tick.ticks(), 10);
	}

	#[test]
	fn test_unique_wait_budget_counts_host_time() {
		let host = SlowHost {
			tree: scene().0,
			delay: Duration::from_millis(20),
		};
		let root = host.root();
		let mut resolver = PathResolver::new(&host, FixedTick::new(Duration::from_millis(1)));

		let start = Instant::now();
		let (result, events) = capture(|| resolver.unreliable_path_from("*@Ghost", root, Duration::from_millis(100)));
		assert_eq!(result, None);
		assert_eq!(warnings(&events).len(), 1);
		// every poll costs at least 20ms of the 100ms budget
		assert!(resolver.tick.ticks() <= 6);
		assert!(start.elapsed() < Duration::from_secs(1));
	}

	#[test]
	fn test_server_alias_is_not_a_child_search() {
		let (tree, _, _) = scene();
		// a decoy the literal reading would find
		let server = tree.service("Server").unwrap();
		tree.add_child(server, "ModuleScript", "Main").unwrap();

		let mut resolver = PathResolver::new(&tree, step());
		let main = resolver.path("Server\\Main").unwrap();
		let ts = tree.parent(main).unwrap();
		assert_eq!(tree.name(&ts), "TS");
		assert_eq!(tree.name(&tree.parent(ts).unwrap()), "ServerScriptService");
	}

	#[test]
	fn test_shared_alias_rewrites_to_storage() {
		let (tree, _, _) = scene();
		let storage = tree.service("ReplicatedStorage").unwrap();
		let remotes = tree.add_child(storage, "Folder", "Remotes").unwrap();

		let mut resolver = PathResolver::new(&tree, step());
		assert_eq!(resolver.unreliable_path("Shared\\Remotes"), Some(remotes));
		assert_eq!(resolver.unreliable_path("Shared"), Some(storage));
		// not an alias past the first segment
		assert_eq!(resolver.unreliable_path("ReplicatedStorage\\Shared"), None);
	}

	#[test]
	fn test_player_aliases() {
		let (tree, _, _) = scene();
		let players = tree.service("Players").unwrap();
		let player = tree.add_child(players, "Player", "builder").unwrap();
		let gui = tree.add_child(player, "PlayerGui", "PlayerGui").unwrap();
		let scripts = tree.add_child(player, "PlayerScripts", "PlayerScripts").unwrap();
		let ts = tree.add_child(scripts, "Folder", "TS").unwrap();
		let client = tree.add_child(ts, "LocalScript", "Client").unwrap();
		let workspace = tree.service("Workspace").unwrap();
		let character = tree.add_child(workspace, "Model", "builder").unwrap();
		let head = tree.add_child(character, "Part", "Head").unwrap();

		let mut resolver = PathResolver::new(&tree, step());
		assert_eq!(resolver.unreliable_path("LocalPlayer"), None);

		tree.set_local_player(Some(player)).unwrap();
		tree.set_character(player, Some(character)).unwrap();

		assert_eq!(resolver.unreliable_path("LocalPlayer"), Some(player));
		assert_eq!(resolver.unreliable_path("Gui"), Some(gui));
		assert_eq!(resolver.unreliable_path("Client\\Client"), Some(client));
		assert_eq!(resolver.unreliable_path("Character\\Head"), Some(head));
	}

	#[test]
	fn test_misses_propagate_without_diagnostics() {
		let (tree, workspace, _) = scene();
		let mut resolver = PathResolver::new(&tree, step());

		let (result, events) =
			capture(|| resolver.unreliable_path_from("NoSuchThing\\AlsoMissing", workspace, DEFAULT));
		assert_eq!(result, None);
		assert!(warnings(&events).is_empty());

		let misses = events.iter().filter(|(_, msg)| msg.starts_with("No node for")).count();
		assert_eq!(misses, 2);
		assert_eq!(resolver.tick.ticks(), 0);

		assert_eq!(
			resolver.path_from("NoSuchThing", workspace, DEFAULT),
			Err(PathError::Unresolved {
				path: "NoSuchThing".to_owned()
			})
		);
	}

	#[test]
	fn test_unique_segment_recovers_absent_cursor() {
		let (tree, workspace, door) = scene();
		let mut resolver = PathResolver::new(&tree, step());

		assert_eq!(resolver.unreliable_path_from("Missing\\@Door", workspace, DEFAULT), Some(door));
		// waits against an absent cursor never block
		assert_eq!(resolver.unreliable_path_from("Missing\\*Hinge", workspace, DEFAULT), None);
	}

	#[test]
	fn test_segment_order() {
		let (tree, workspace, _) = scene();
		let polled = Cell::new(false);
		let tick = step().on_tick(|n| {
			if n == 2 {
				let foo = tree.add_child(workspace, "Model", "Foo").unwrap();
				tree.add_tag(foo, UNIQUE).unwrap();
				tree.add_child(foo, "Part", "Bar").unwrap();
				polled.set(true);
			}
		});
		let mut resolver = PathResolver::new(&tree, tick);

		let bar = resolver.path("*@Foo\\Bar").unwrap();
		assert!(polled.get());
		assert_eq!(tree.name(&tree.parent(bar).unwrap()), "Foo");
	}

	#[test]
	fn test_resolution_is_idempotent() {
		let (tree, _, _) = scene();
		let before = tree.to_string();
		let mut resolver = PathResolver::new(&tree, step());

		let first = resolver.unreliable_path("Workspace\\@Door\\Hinge");
		let second = resolver.unreliable_path("Workspace\\@Door\\Hinge");
		assert!(first.is_some());
		assert_eq!(first, second);

		assert_eq!(resolver.unreliable_path("Workspace\\Nothing"), None);
		assert_eq!(resolver.unreliable_path("Workspace\\Nothing"), None);
		assert_eq!(tree.to_string(), before);
	}
}
