//! Conversion between the client's typed values and the loosely typed
//! [`Variant`] the automation interface speaks.
//!
//! The set of client-side kinds is closed: integer, float, string and
//! fixed-length integer/float arrays. Anything else the tool hands back
//! (booleans, nested arrays, object references) is reported as unsupported
//! instead of being coerced.

use std::fmt;

use thiserror::Error;

/// Largest magnitude an `i64` can have and still survive a trip through `f64`.
const EXACT_FLOAT_LIMIT: u64 = 1 << 53;

/// Opaque reference to an object living inside the bus tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(u64);

impl ObjectRef {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Automation-side value as exchanged with the bus tool.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Variant>),
    Object(ObjectRef),
}

impl Variant {
    /// Classify the variant. Homogeneous numeric arrays report their element kind;
    /// an empty array counts as an integer array.
    pub fn kind(&self) -> ValueKind {
        match self {
            Variant::Empty => ValueKind::Empty,
            Variant::Bool(_) => ValueKind::Bool,
            Variant::Int(_) => ValueKind::Int,
            Variant::Float(_) => ValueKind::Float,
            Variant::Str(_) => ValueKind::String,
            Variant::Object(_) => ValueKind::Object,
            Variant::Array(items) => {
                if items.iter().all(|item| matches!(item, Variant::Int(_))) {
                    ValueKind::IntArray
                } else if items.iter().all(|item| matches!(item, Variant::Float(_))) {
                    ValueKind::FloatArray
                } else {
                    ValueKind::MixedArray
                }
            }
        }
    }

    /// Human readable shape, including the array length where there is one.
    pub fn describe(&self) -> String {
        match self {
            Variant::Array(items) => format!("{}[{}]", self.kind(), items.len()),
            other => other.kind().to_string(),
        }
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Variant::Object(object) => Some(*object),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(flag) => Some(*flag),
            Variant::Int(value) => Some(*value != 0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Str(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::Str(value.to_string())
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::Str(value)
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int(value)
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Float(value)
    }
}

/// Shape of a value on either side of the automation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Empty,
    Bool,
    Int,
    Float,
    String,
    IntArray,
    FloatArray,
    MixedArray,
    Object,
}

impl ValueKind {
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ValueKind::IntArray | ValueKind::FloatArray | ValueKind::MixedArray
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Empty => "empty",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::String => "string",
            ValueKind::IntArray => "int",
            ValueKind::FloatArray => "float",
            ValueKind::MixedArray => "mixed",
            ValueKind::Object => "object",
        };
        if self.is_array() {
            write!(f, "{name} array")
        } else {
            f.write_str(name)
        }
    }
}

/// Why a value could not cross the boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("expected {expected}, found {found}")]
    Mismatch { expected: String, found: String },
    #[error("unsupported value kind {0}")]
    Unsupported(ValueKind),
}

impl CoercionError {
    fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        CoercionError::Mismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Scalar value held by a variable, signal or CAPL argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::String,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => exact_float(*value),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn to_variant(&self) -> Variant {
        match self {
            Value::Int(value) => Variant::Int(*value),
            Value::Float(value) => Variant::Float(*value),
            Value::Str(text) => Variant::Str(text.clone()),
        }
    }

    /// Read a scalar out of a variant. Arrays are a shape mismatch, everything
    /// outside the supported set is unsupported.
    pub fn from_variant(variant: &Variant) -> Result<Value, CoercionError> {
        match variant {
            Variant::Int(value) => Ok(Value::Int(*value)),
            Variant::Float(value) => Ok(Value::Float(*value)),
            Variant::Str(text) => Ok(Value::Str(text.clone())),
            Variant::Array(_) if variant.kind() != ValueKind::MixedArray => {
                Err(CoercionError::mismatch("scalar", variant.describe()))
            }
            other => Err(CoercionError::Unsupported(other.kind())),
        }
    }

    /// Convert for writing into a slot that currently holds `stored`.
    ///
    /// Integers widen into float slots only when the conversion is exact; floats
    /// never narrow into integer slots.
    pub fn coerce_for(&self, stored: &Variant) -> Result<Variant, CoercionError> {
        let target = stored.kind();
        match (self, target) {
            (Value::Int(value), ValueKind::Int) => Ok(Variant::Int(*value)),
            (Value::Float(value), ValueKind::Float) => Ok(Variant::Float(*value)),
            (Value::Str(text), ValueKind::String) => Ok(Variant::Str(text.clone())),
            (Value::Int(value), ValueKind::Float) => exact_float(*value)
                .map(Variant::Float)
                .ok_or_else(|| CoercionError::mismatch("float", "int beyond float precision")),
            (_, ValueKind::Empty | ValueKind::Bool | ValueKind::Object | ValueKind::MixedArray) => {
                Err(CoercionError::Unsupported(target))
            }
            (value, _) => Err(CoercionError::mismatch(stored.describe(), value.kind())),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Str(text) => write!(f, "{text:?}"),
        }
    }
}

/// Fixed-length numeric array. The length is declared by the tool; the client
/// only checks that reads and writes agree with it.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayValue {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl ArrayValue {
    pub fn len(&self) -> usize {
        match self {
            ArrayValue::Int(items) => items.len(),
            ArrayValue::Float(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ArrayValue::Int(_) => ValueKind::IntArray,
            ArrayValue::Float(_) => ValueKind::FloatArray,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            ArrayValue::Int(items) => Some(items),
            ArrayValue::Float(_) => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            ArrayValue::Float(items) => Some(items),
            ArrayValue::Int(_) => None,
        }
    }

    pub fn to_variant(&self) -> Variant {
        match self {
            ArrayValue::Int(items) => Variant::Array(items.iter().copied().map(Variant::Int).collect()),
            ArrayValue::Float(items) => {
                Variant::Array(items.iter().copied().map(Variant::Float).collect())
            }
        }
    }

    /// Materialize every element of a stored array; its length is the declared one.
    pub fn from_variant(variant: &Variant) -> Result<ArrayValue, CoercionError> {
        let Variant::Array(items) = variant else {
            return match variant.kind() {
                ValueKind::Int | ValueKind::Float | ValueKind::String => {
                    Err(CoercionError::mismatch("array", variant.describe()))
                }
                other => Err(CoercionError::Unsupported(other)),
            };
        };
        match variant.kind() {
            ValueKind::IntArray => Ok(ArrayValue::Int(
                items.iter().filter_map(Variant::as_i64).collect(),
            )),
            ValueKind::FloatArray => Ok(ArrayValue::Float(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Variant::Float(value) => Some(*value),
                        _ => None,
                    })
                    .collect(),
            )),
            other => Err(CoercionError::Unsupported(other)),
        }
    }

    /// Expand element by element for writing into the array currently held in
    /// `stored`. The whole array must be supplied: any length difference is a
    /// mismatch and nothing is padded or truncated.
    pub fn coerce_for(&self, stored: &Variant) -> Result<Variant, CoercionError> {
        let Variant::Array(current) = stored else {
            return match stored.kind() {
                ValueKind::Int | ValueKind::Float | ValueKind::String => Err(
                    CoercionError::mismatch(stored.describe(), self.describe()),
                ),
                other => Err(CoercionError::Unsupported(other)),
            };
        };
        if current.len() != self.len() {
            return Err(CoercionError::mismatch(stored.describe(), self.describe()));
        }

        match (self, stored.kind()) {
            (ArrayValue::Int(_), ValueKind::IntArray)
            | (ArrayValue::Float(_), ValueKind::FloatArray) => Ok(self.to_variant()),
            // An empty declared array classifies as int; any empty write fits it.
            (ArrayValue::Float(_), ValueKind::IntArray) if current.is_empty() => {
                Ok(Variant::Array(Vec::new()))
            }
            (ArrayValue::Int(items), ValueKind::FloatArray) => items
                .iter()
                .map(|item| exact_float(*item).map(Variant::Float))
                .collect::<Option<Vec<_>>>()
                .map(Variant::Array)
                .ok_or_else(|| CoercionError::mismatch("float array", "int beyond float precision")),
            (_, ValueKind::MixedArray) => Err(CoercionError::Unsupported(ValueKind::MixedArray)),
            _ => Err(CoercionError::mismatch(stored.describe(), self.describe())),
        }
    }

    pub fn describe(&self) -> String {
        format!("{}[{}]", self.kind(), self.len())
    }
}

impl From<Vec<i64>> for ArrayValue {
    fn from(items: Vec<i64>) -> Self {
        ArrayValue::Int(items)
    }
}

impl From<Vec<i32>> for ArrayValue {
    fn from(items: Vec<i32>) -> Self {
        ArrayValue::Int(items.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<f64>> for ArrayValue {
    fn from(items: Vec<f64>) -> Self {
        ArrayValue::Float(items)
    }
}

impl From<&[i64]> for ArrayValue {
    fn from(items: &[i64]) -> Self {
        ArrayValue::Int(items.to_vec())
    }
}

impl From<&[f64]> for ArrayValue {
    fn from(items: &[f64]) -> Self {
        ArrayValue::Float(items.to_vec())
    }
}

fn exact_float(value: i64) -> Option<f64> {
    (value.unsigned_abs() <= EXACT_FLOAT_LIMIT).then_some(value as f64)
}
