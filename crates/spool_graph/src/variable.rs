// SPDX-License-Identifier: MIT OR Apache-2.0
//! Variable kinds, values, and single-slot containers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of value kinds that can flow through a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// Boolean value
    Bool,
    /// Integer value
    Int,
    /// Floating point value
    Float,
    /// String value
    String,
    /// 3D vector
    Vector3,
    /// Opaque reference to a host object
    Object,
    /// Guid value
    Guid,
    /// Quaternion rotation
    Quaternion,
    /// Color (RGBA)
    Color,
}

/// 3D vector value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3(pub [f32; 3]);

/// Quaternion value, `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quat(pub [f32; 4]);

/// RGBA color value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorRgba(pub [f32; 4]);

/// Opaque reference to an object owned by the host.
///
/// The runtime never dereferences these; they travel through the stack and
/// serialize through the external-object reference table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef(pub u64);

impl ObjectRef {
    /// The null object reference.
    pub const NULL: ObjectRef = ObjectRef(0);

    /// Check whether this reference points at nothing.
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// A typed value of one of the supported kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// String
    String(String),
    /// 3D vector
    Vector3(Vec3),
    /// Host object reference
    Object(ObjectRef),
    /// Guid
    Guid(Uuid),
    /// Quaternion
    Quaternion(Quat),
    /// RGBA color
    Color(ColorRgba),
}

impl Value {
    /// The kind tag of this value.
    pub fn kind(&self) -> VariableType {
        match self {
            Self::Bool(_) => VariableType::Bool,
            Self::Int(_) => VariableType::Int,
            Self::Float(_) => VariableType::Float,
            Self::String(_) => VariableType::String,
            Self::Vector3(_) => VariableType::Vector3,
            Self::Object(_) => VariableType::Object,
            Self::Guid(_) => VariableType::Guid,
            Self::Quaternion(_) => VariableType::Quaternion,
            Self::Color(_) => VariableType::Color,
        }
    }

    /// The default value for a kind.
    pub fn default_for(kind: VariableType) -> Value {
        match kind {
            VariableType::Bool => Value::Bool(false),
            VariableType::Int => Value::Int(0),
            VariableType::Float => Value::Float(0.0),
            VariableType::String => Value::String(String::new()),
            VariableType::Vector3 => Value::Vector3(Vec3::default()),
            VariableType::Object => Value::Object(ObjectRef::NULL),
            VariableType::Guid => Value::Guid(Uuid::nil()),
            VariableType::Quaternion => Value::Quaternion(Quat::default()),
            VariableType::Color => Value::Color(ColorRgba::default()),
        }
    }
}

/// Rust types that map onto a [`VariableType`] kind.
pub trait VariableValue: Sized {
    /// The kind this type maps to.
    const KIND: VariableType;

    /// Wrap into a [`Value`].
    fn into_value(self) -> Value;

    /// Extract from a [`Value`] of the matching kind.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! variable_value {
    ($ty:ty, $kind:ident) => {
        impl VariableValue for $ty {
            const KIND: VariableType = VariableType::$kind;

            fn into_value(self) -> Value {
                Value::$kind(self)
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$kind(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

variable_value!(bool, Bool);
variable_value!(i32, Int);
variable_value!(f32, Float);
variable_value!(String, String);
variable_value!(Vec3, Vector3);
variable_value!(ObjectRef, Object);
variable_value!(Uuid, Guid);
variable_value!(Quat, Quaternion);
variable_value!(ColorRgba, Color);

/// Single-slot typed container for a value with exactly one stable owner.
///
/// Used where pool semantics are unnecessary: node stack-input constants,
/// node properties, and graph variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarCell {
    kind: VariableType,
    value: Value,
}

impl VarCell {
    /// Create a cell holding the default value for `kind`.
    pub fn new(kind: VariableType) -> Self {
        Self {
            kind,
            value: Value::default_for(kind),
        }
    }

    /// Create a cell from an initial value.
    pub fn with_value(value: Value) -> Self {
        Self {
            kind: value.kind(),
            value,
        }
    }

    /// The kind this cell stores.
    pub fn kind(&self) -> VariableType {
        self.kind
    }

    /// The stored value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the stored value.
    ///
    /// Panics if the value kind does not match the cell kind.
    pub fn set(&mut self, value: Value) {
        assert_eq!(
            value.kind(),
            self.kind,
            "storing a {:?} value in a {:?} cell",
            value.kind(),
            self.kind
        );
        self.value = value;
    }

    /// Read the value as a concrete type.
    ///
    /// Panics if `T` does not match the cell kind.
    pub fn get_as<T: VariableValue>(&self) -> T {
        match T::from_value(&self.value) {
            Some(v) => v,
            None => panic!("reading a {:?} cell as {:?}", self.kind, T::KIND),
        }
    }

    /// Store a concrete value.
    ///
    /// Panics if `T` does not match the cell kind.
    pub fn set_as<T: VariableValue>(&mut self, value: T) {
        self.set(value.into_value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values_match_kind() {
        for kind in [
            VariableType::Bool,
            VariableType::Int,
            VariableType::Float,
            VariableType::String,
            VariableType::Vector3,
            VariableType::Object,
            VariableType::Guid,
            VariableType::Quaternion,
            VariableType::Color,
        ] {
            assert_eq!(Value::default_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_cell_roundtrip() {
        let mut cell = VarCell::new(VariableType::Int);
        assert_eq!(cell.get_as::<i32>(), 0);
        cell.set_as(41);
        assert_eq!(cell.get_as::<i32>(), 41);
        assert_eq!(cell.value(), &Value::Int(41));
    }

    #[test]
    #[should_panic(expected = "storing a Float value in a Int cell")]
    fn test_cell_rejects_wrong_kind() {
        let mut cell = VarCell::new(VariableType::Int);
        cell.set(Value::Float(1.0));
    }

    #[test]
    fn test_object_ref_null() {
        assert!(ObjectRef::NULL.is_null());
        assert!(!ObjectRef(7).is_null());
    }
}
