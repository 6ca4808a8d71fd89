//! Scene descriptions in JSON.
//!
//! ```json
//! {
//!     "children": [
//!         {
//!             "name": "Workspace",
//!             "children": [
//!                 { "class": "Part", "name": "Door", "tags": ["UniqueName"], "attributes": { "Locked": true } }
//!             ]
//!         }
//!     ]
//! }
//! ```
//!
//! The top-level object describes the root, whose children are services. `class` defaults to the name for services
//! and to `Folder` everywhere else. A node with `"localPlayer": true` becomes the local player.

use glam::{vec2, vec3};
use json::JsonValue;

use super::attribute::AttributeValue;
use super::node::NodeId;
use super::tree::{SceneError, SceneTree};
use crate::host::SceneHost;

pub type JsonResult<T> = Result<T, JsonError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum JsonError {
	#[error("Key {0:?} does not exist")]
	KeyDoesNotExist(String),
	#[error("Value at {0:?} is not an object")]
	ValueIsNotObject(String),
	#[error("Value at {0:?} is not a list")]
	ValueIsNotList(String),
	#[error("Value at {0:?} is not a string")]
	ValueIsNotString(String),
	#[error("Value at {0:?} is not a bool")]
	ValueIsNotBool(String),
	#[error("Value at {0:?} is not a valid attribute\n  - expected bool, number, string or a list of 2 or 3 numbers")]
	InvalidAttribute(String),
	#[error("Error in list at index {index}\n  - {inner}")]
	ErrorInList { index: usize, inner: Box<JsonError> },
	#[error("Error in object at {key:?}\n  - {inner}")]
	ErrorInObject { key: String, inner: Box<JsonError> },
}

impl JsonError {
	pub fn nested(self, key: &str) -> Self {
		Self::ErrorInObject {
			key: key.to_owned(),
			inner: Box::new(self),
		}
	}

	pub fn in_list(self, index: usize) -> Self {
		Self::ErrorInList {
			index,
			inner: Box::new(self),
		}
	}
}

pub type SceneLoadResult<T> = Result<T, SceneLoadError>;

#[derive(Debug, thiserror::Error)]
pub enum SceneLoadError {
	#[error("Could not parse JSON: {0}")]
	Parse(#[from] json::Error),
	#[error(transparent)]
	Json(#[from] JsonError),
	#[error(transparent)]
	Scene(#[from] SceneError),
}

impl SceneLoadError {
	fn nested(self, key: &str) -> Self {
		match self {
			SceneLoadError::Json(err) => SceneLoadError::Json(err.nested(key)),
			_ => self,
		}
	}

	fn in_list(self, index: usize) -> Self {
		match self {
			SceneLoadError::Json(err) => SceneLoadError::Json(err.in_list(index)),
			_ => self,
		}
	}
}

struct JsonObject<'a>(&'a json::object::Object);

impl<'a> JsonObject<'a> {
	fn from_value(key: &str, val: &'a JsonValue) -> JsonResult<Self> {
		match val {
			JsonValue::Object(obj) => Ok(JsonObject(obj)),
			_ => Err(JsonError::ValueIsNotObject(key.to_owned())),
		}
	}

	fn get(&self, key: &str) -> JsonResult<&'a JsonValue> {
		match self.0.get(key) {
			Some(value) => Ok(value),
			None => Err(JsonError::KeyDoesNotExist(key.to_owned())),
		}
	}

	fn get_opt(&self, key: &str) -> Option<&'a JsonValue> {
		self.0.get(key).filter(|val| !val.is_null())
	}

	fn get_str(&self, key: &str) -> JsonResult<&'a str> {
		match self.get(key)?.as_str() {
			Some(val) => Ok(val),
			None => Err(JsonError::ValueIsNotString(key.to_owned())),
		}
	}

	fn get_opt_str(&self, key: &str) -> JsonResult<Option<&'a str>> {
		match self.get_opt(key) {
			Some(val) => val
				.as_str()
				.map(Some)
				.ok_or_else(|| JsonError::ValueIsNotString(key.to_owned())),
			None => Ok(None),
		}
	}

	fn get_opt_bool(&self, key: &str) -> JsonResult<Option<bool>> {
		match self.get_opt(key) {
			Some(val) => val
				.as_bool()
				.map(Some)
				.ok_or_else(|| JsonError::ValueIsNotBool(key.to_owned())),
			None => Ok(None),
		}
	}

	fn get_opt_list(&self, key: &str) -> JsonResult<&'a [JsonValue]> {
		match self.get_opt(key) {
			Some(JsonValue::Array(arr)) => Ok(arr),
			Some(_) => Err(JsonError::ValueIsNotList(key.to_owned())),
			None => Ok(&[]),
		}
	}

	fn get_opt_object(&self, key: &str) -> JsonResult<Option<JsonObject<'a>>> {
		self.get_opt(key).map(|val| JsonObject::from_value(key, val)).transpose()
	}
}

fn deserialize_attribute(key: &str, val: &JsonValue) -> JsonResult<AttributeValue> {
	let invalid = || JsonError::InvalidAttribute(key.to_owned());

	match val {
		JsonValue::Boolean(val) => Ok(AttributeValue::Bool(*val)),
		JsonValue::Number(_) => val.as_f64().map(AttributeValue::Number).ok_or_else(invalid),
		JsonValue::Short(_) | JsonValue::String(_) => val.as_str().map(AttributeValue::from).ok_or_else(invalid),
		JsonValue::Array(list) => {
			let floats = list
				.iter()
				.map(|val| val.as_f32().ok_or_else(invalid))
				.collect::<JsonResult<Vec<_>>>()?;
			match floats.as_slice() {
				[x, y] => Ok(AttributeValue::Vector2(vec2(*x, *y))),
				[x, y, z] => Ok(AttributeValue::Vector3(vec3(*x, *y, *z))),
				_ => Err(invalid()),
			}
		}
		_ => Err(invalid()),
	}
}

fn deserialize_node(tree: &SceneTree, parent: NodeId, obj: JsonObject, is_service: bool) -> SceneLoadResult<()> {
	let name = obj.get_str("name")?;
	let class_name = obj
		.get_opt_str("class")?
		.unwrap_or(if is_service { name } else { "Folder" });
	let node = tree.add_child(parent, class_name, name)?;

	for (i, tag) in obj.get_opt_list("tags")?.iter().enumerate() {
		let tag = tag
			.as_str()
			.ok_or_else(|| JsonError::ValueIsNotString(i.to_string()).nested("tags"))?;
		tree.add_tag(node, tag)?;
	}

	if let Some(attributes) = obj.get_opt_object("attributes")? {
		for (key, val) in attributes.0.iter() {
			let val = deserialize_attribute(key, val).map_err(|e| e.nested("attributes"))?;
			tree.set_attribute(node, key, val)?;
		}
	}

	if obj.get_opt_bool("localPlayer")?.unwrap_or(false) {
		tree.set_local_player(Some(node))?;
	}

	deserialize_children(tree, node, obj, false)
}

fn deserialize_children(tree: &SceneTree, parent: NodeId, obj: JsonObject, are_services: bool) -> SceneLoadResult<()> {
	for (i, child) in obj.get_opt_list("children")?.iter().enumerate() {
		JsonObject::from_value(&i.to_string(), child)
			.map_err(SceneLoadError::from)
			.and_then(|child| deserialize_node(tree, parent, child, are_services))
			.map_err(|e| e.in_list(i).nested("children"))?;
	}
	Ok(())
}

impl SceneTree {
	/// Builds a scene from its JSON description.
	pub fn from_json(source: &str) -> SceneLoadResult<Self> {
		let value = json::parse(source)?;
		let obj = JsonObject::from_value("(root)", &value)?;

		let tree = SceneTree::new();
		if let Some(name) = obj.get_opt_str("name")? {
			tree.rename(tree.root(), name)?;
		}
		deserialize_children(&tree, tree.root(), obj, true)?;
		Ok(tree)
	}
}
