use std::time::Duration;

/// Budget for a single `*@name` segment.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Tag marking a node whose name is unique in the whole scene.
pub const UNIQUE_NAME_TAG: &str = "UniqueName";

/// Node names the root aliases expand to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootLayout {
	/// `Shared` is rewritten to this service name.
	pub shared_storage: String,
	/// Service holding server scripts, used by `Server`.
	pub server_scripts: String,
	/// Folder holding compiled scripts, inside both the server scripts and the player scripts.
	pub script_folder: String,
	/// Child of the local player holding client scripts, used by `Client`.
	pub player_scripts: String,
	/// Child of the local player holding its GUI, used by `Gui`.
	pub player_gui: String,
}

impl Default for RootLayout {
	fn default() -> Self {
		Self {
			shared_storage: "ReplicatedStorage".to_owned(),
			server_scripts: "ServerScriptService".to_owned(),
			script_folder: "TS".to_owned(),
			player_scripts: "PlayerScripts".to_owned(),
			player_gui: "PlayerGui".to_owned(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
	/// Default budget for unique waits, used when a call does not pass its own.
	pub timeout: Duration,
	pub unique_tag: String,
	pub layout: RootLayout,
}

impl ResolveOptions {
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn with_unique_tag(mut self, tag: impl Into<String>) -> Self {
		self.unique_tag = tag.into();
		self
	}

	pub fn with_layout(mut self, layout: RootLayout) -> Self {
		self.layout = layout;
		self
	}
}

impl Default for ResolveOptions {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			unique_tag: UNIQUE_NAME_TAG.to_owned(),
			layout: RootLayout::default(),
		}
	}
}
