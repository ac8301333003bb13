use glam::{Vec2, Vec3};
use rustc_hash::FxHashMap;

use crate::math::Color;

/// A tagged property value.
///
/// Covers the primitive kinds game data attaches to nodes (and that the
/// glTF importer reads out of `extras`). A closed sum keeps lookups typed
/// without a dynamic reference-holding bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    Int(i64),
    Float(f32),
    String(String),
    Color(Color),
    Vec2(Vec2),
    Vec3(Vec3),
}

impl Property {
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Property::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Property::Int(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Property::Float(v) => Some(*v),
            Property::Int(v) => Some(*v as f32),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Property::String(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_color(&self) -> Option<Color> {
        match self {
            Property::Color(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vec2(&self) -> Option<Vec2> {
        match self {
            Property::Vec2(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_vec3(&self) -> Option<Vec3> {
        match self {
            Property::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<bool> for Property {
    fn from(v: bool) -> Self {
        Property::Bool(v)
    }
}

impl From<i64> for Property {
    fn from(v: i64) -> Self {
        Property::Int(v)
    }
}

impl From<f32> for Property {
    fn from(v: f32) -> Self {
        Property::Float(v)
    }
}

impl From<&str> for Property {
    fn from(v: &str) -> Self {
        Property::String(v.to_string())
    }
}

impl From<String> for Property {
    fn from(v: String) -> Self {
        Property::String(v)
    }
}

impl From<Color> for Property {
    fn from(v: Color) -> Self {
        Property::Color(v)
    }
}

impl From<Vec2> for Property {
    fn from(v: Vec2) -> Self {
        Property::Vec2(v)
    }
}

impl From<Vec3> for Property {
    fn from(v: Vec3) -> Self {
        Property::Vec3(v)
    }
}

/// String-keyed property bag attached to every node.
///
/// Preserved round-trip through cloning and the importer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    map: FxHashMap<String, Property>,
}

impl Properties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Property>) {
        self.map.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.map.get(key)
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Property> {
        self.map.remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}
