use std::fmt;

use glam::{Vec2, Vec3};

/// Value stored under an attribute key of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
	Bool(bool),
	Number(f64),
	String(String),
	Vector2(Vec2),
	Vector3(Vec3),
}

impl AttributeValue {
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			AttributeValue::Bool(val) => Some(*val),
			_ => None,
		}
	}

	pub fn as_number(&self) -> Option<f64> {
		match self {
			AttributeValue::Number(val) => Some(*val),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			AttributeValue::String(val) => Some(val),
			_ => None,
		}
	}

	pub fn type_name(&self) -> &'static str {
		match self {
			AttributeValue::Bool(_) => "bool",
			AttributeValue::Number(_) => "number",
			AttributeValue::String(_) => "string",
			AttributeValue::Vector2(_) => "Vector2",
			AttributeValue::Vector3(_) => "Vector3",
		}
	}
}

impl From<bool> for AttributeValue {
	fn from(value: bool) -> Self {
		AttributeValue::Bool(value)
	}
}

impl From<f64> for AttributeValue {
	fn from(value: f64) -> Self {
		AttributeValue::Number(value)
	}
}

impl From<i32> for AttributeValue {
	fn from(value: i32) -> Self {
		AttributeValue::Number(value.into())
	}
}

impl From<&str> for AttributeValue {
	fn from(value: &str) -> Self {
		AttributeValue::String(value.to_owned())
	}
}

impl From<String> for AttributeValue {
	fn from(value: String) -> Self {
		AttributeValue::String(value)
	}
}

impl From<Vec2> for AttributeValue {
	fn from(value: Vec2) -> Self {
		AttributeValue::Vector2(value)
	}
}

impl From<Vec3> for AttributeValue {
	fn from(value: Vec3) -> Self {
		AttributeValue::Vector3(value)
	}
}

impl fmt::Display for AttributeValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AttributeValue::Bool(val) => write!(f, "{val}"),
			AttributeValue::Number(val) => write!(f, "{val}"),
			AttributeValue::String(val) => write!(f, "{val:?}"),
			AttributeValue::Vector2(val) => write!(f, "({}, {})", val.x, val.y),
			AttributeValue::Vector3(val) => write!(f, "({}, {}, {})", val.x, val.y, val.z),
		}
	}
}
