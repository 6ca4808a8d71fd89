use std::collections::{BTreeMap, BTreeSet};

use super::attribute::AttributeValue;

/// Handle to a node of a [`SceneTree`](super::SceneTree). Stays valid until the node is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct NodeId(pub(crate) indextree::NodeId);

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
	pub name: String,
	pub class_name: String,
	pub attributes: BTreeMap<String, AttributeValue>,
	pub tags: BTreeSet<String>,
}

impl SceneNode {
	pub fn new(class_name: &str, name: &str) -> Self {
		Self {
			name: name.to_owned(),
			class_name: class_name.to_owned(),
			attributes: BTreeMap::new(),
			tags: BTreeSet::new(),
		}
	}

	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.contains(tag)
	}
}
