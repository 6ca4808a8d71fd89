//! Path strings and their segments.
//!
//! A path is a list of node names separated by `\`. Every segment may carry a sigil selecting how it is looked up:
//!
//! | segment   | lookup                                              |
//! |-----------|-----------------------------------------------------|
//! | `name`    | first child called `name`, right now                |
//! | `*name`   | wait until a child called `name` exists             |
//! | `@name`   | node tagged as unique called `name`, right now      |
//! | `*@name`  | wait for a node tagged as unique called `name`      |
//!
//! The first segment may also be one of the [`RootAlias`] keywords.

use std::fmt;
use std::str::FromStr;

pub const DELIMITER: char = '\\';

const UNIQUE_WAIT_SIGIL: &str = "*@";
const UNIQUE_SIGIL: &str = "@";
const WAIT_SIGIL: &str = "*";

/// Keywords only recognized as the first segment of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootAlias {
	/// Shared storage service. Resolved like a plain segment naming that service.
	Shared,
	/// Script container of the server.
	Server,
	/// Script container of the local player.
	Client,
	/// Player owning the current execution context.
	LocalPlayer,
	/// Character of the local player, waiting for it to spawn.
	Character,
	/// GUI root of the local player.
	Gui,
}

impl RootAlias {
	pub fn keyword(self) -> &'static str {
		match self {
			RootAlias::Shared => "Shared",
			RootAlias::Server => "Server",
			RootAlias::Client => "Client",
			RootAlias::LocalPlayer => "LocalPlayer",
			RootAlias::Character => "Character",
			RootAlias::Gui => "Gui",
		}
	}

	pub fn from_keyword(keyword: &str) -> Option<Self> {
		Some(match keyword {
			"Shared" => RootAlias::Shared,
			"Server" => RootAlias::Server,
			"Client" => RootAlias::Client,
			"LocalPlayer" => RootAlias::LocalPlayer,
			"Character" => RootAlias::Character,
			"Gui" => RootAlias::Gui,
			_ => return None,
		})
	}
}

impl fmt::Display for RootAlias {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.keyword())
	}
}

/// One trimmed, non-empty element of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
	Alias(RootAlias),
	/// `*@name`
	UniqueWait(String),
	/// `@name`
	Unique(String),
	/// `*name`
	WaitChild(String),
	/// `name`
	Child(String),
}

impl Segment {
	/// Classifies a trimmed segment by its sigil.
	///
	/// `*@` has to be tested before `*`, since the wait sigil is a prefix of it.
	pub fn classify(text: &str) -> Self {
		if let Some(name) = text.strip_prefix(UNIQUE_WAIT_SIGIL) {
			Segment::UniqueWait(name.to_owned())
		} else if let Some(name) = text.strip_prefix(UNIQUE_SIGIL) {
			Segment::Unique(name.to_owned())
		} else if let Some(name) = text.strip_prefix(WAIT_SIGIL) {
			Segment::WaitChild(name.to_owned())
		} else {
			Segment::Child(text.to_owned())
		}
	}

	/// Name the segment looks for, without its sigil.
	pub fn name(&self) -> &str {
		match self {
			Segment::Alias(alias) => alias.keyword(),
			Segment::UniqueWait(name) | Segment::Unique(name) | Segment::WaitChild(name) | Segment::Child(name) => name,
		}
	}

	/// Whether resolving this segment may suspend the caller.
	pub fn is_blocking(&self) -> bool {
		matches!(
			self,
			Segment::UniqueWait(_)
				| Segment::WaitChild(_)
				| Segment::Alias(RootAlias::Server | RootAlias::Client | RootAlias::Character | RootAlias::Gui)
		)
	}
}

impl fmt::Display for Segment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Segment::Alias(alias) => write!(f, "{alias}"),
			Segment::UniqueWait(name) => write!(f, "{UNIQUE_WAIT_SIGIL}{name}"),
			Segment::Unique(name) => write!(f, "{UNIQUE_SIGIL}{name}"),
			Segment::WaitChild(name) => write!(f, "{WAIT_SIGIL}{name}"),
			Segment::Child(name) => f.write_str(name),
		}
	}
}

/// Parsed path. Parsing never fails: empty pieces are dropped and anything else is a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
	source: String,
	segments: Vec<Segment>,
}

impl Path {
	pub fn parse(source: &str) -> Self {
		let segments = source
			.split(DELIMITER)
			.map(str::trim)
			.filter(|piece| !piece.is_empty())
			.enumerate()
			.map(|(i, piece)| match RootAlias::from_keyword(piece) {
				Some(alias) if i == 0 => Segment::Alias(alias),
				_ => Segment::classify(piece),
			})
			.collect();

		Self {
			source: source.to_owned(),
			segments,
		}
	}

	/// The string this path was parsed from, untouched.
	pub fn source(&self) -> &str {
		&self.source
	}

	pub fn segments(&self) -> &[Segment] {
		&self.segments
	}

	pub fn is_empty(&self) -> bool {
		self.segments.is_empty()
	}

	pub fn len(&self) -> usize {
		self.segments.len()
	}
}

impl FromStr for Path {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::parse(s))
	}
}

impl From<&str> for Path {
	fn from(value: &str) -> Self {
		Self::parse(value)
	}
}

/// Prints the normalized form: trimmed segments joined by the delimiter.
impl fmt::Display for Path {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (i, segment) in self.segments.iter().enumerate() {
			if i > 0 {
				write!(f, "{DELIMITER}")?;
			}
			write!(f, "{segment}")?;
		}
		Ok(())
	}
}
