// PhySL
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! The primitive argument type passed between nodes of the execution tree

pub mod array;

pub use array::{Element, ElementType, NdArray, MAX_DIMENSIONS};

use crate::annotation::Annotation;
use crate::primitive::PrimitiveHandle;
use std::fmt;

/// A value flowing through the execution tree.
///
/// Operands of a node use the same type: a `Primitive` operand is a child node
/// to evaluate, every other variant is a constant.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(NdArray<bool>),
    Int(NdArray<i64>),
    Float(NdArray<f64>),
    Str(String),
    List(Vec<Value>),
    Dict(Dictionary),
    /// Handle to another node; invocable values (closures) are nodes too
    Primitive(PrimitiveHandle),
}

impl Value {
    /// Name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(a) if a.is_scalar() => "bool",
            Value::Int(a) if a.is_scalar() => "int64",
            Value::Float(a) if a.is_scalar() => "float64",
            Value::Bool(_) => "bool array",
            Value::Int(_) => "int64 array",
            Value::Float(_) => "float64 array",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dictionary",
            Value::Primitive(_) => "primitive",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Primitive(_))
    }

    pub fn as_primitive(&self) -> Option<&PrimitiveHandle> {
        match self {
            Value::Primitive(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Integer view of a scalar; floats convert only when integral
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(a) => a.scalar_value().map(|b| *b as i64),
            Value::Int(a) => a.scalar_value().copied(),
            Value::Float(a) => a.scalar_value().filter(|f| f.fract() == 0.0).map(|f| *f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(a) => a.scalar_value().map(|b| if *b { 1.0 } else { 0.0 }),
            Value::Int(a) => a.scalar_value().map(|i| *i as f64),
            Value::Float(a) => a.scalar_value().copied(),
            _ => None,
        }
    }

    /// Truth value used by conditions; `None` when the value has none
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Nil => Some(false),
            Value::Bool(a) => a.scalar_value().copied(),
            Value::Int(a) => a.scalar_value().map(|i| *i != 0),
            Value::Float(a) => a.scalar_value().map(|f| *f != 0.0),
            Value::Str(s) => Some(!s.is_empty()),
            Value::List(items) => Some(!items.is_empty()),
            Value::Dict(dict) => Some(!dict.is_empty()),
            Value::Primitive(_) => None,
        }
    }

    /// Dimensionality of numeric values, `None` for everything else
    pub fn dims(&self) -> Option<usize> {
        match self {
            Value::Bool(a) => Some(a.dims()),
            Value::Int(a) => Some(a.dims()),
            Value::Float(a) => Some(a.dims()),
            _ => None,
        }
    }

    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            Value::Bool(a) => Some(a.shape()),
            Value::Int(a) => Some(a.shape()),
            Value::Float(a) => Some(a.shape()),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<ElementType> {
        match self {
            Value::Bool(_) => Some(ElementType::Bool),
            Value::Int(_) => Some(ElementType::Int64),
            Value::Float(_) => Some(ElementType::Float64),
            _ => None,
        }
    }

    /// Elements of a list, or of a one-dimensional array as scalars
    pub fn into_elements(self) -> Option<Vec<Value>> {
        match self {
            Value::List(items) => Some(items),
            Value::Bool(a) if a.dims() == 1 => Some(a.data().iter().map(|v| Value::from(*v)).collect()),
            Value::Int(a) if a.dims() == 1 => Some(a.data().iter().map(|v| Value::from(*v)).collect()),
            Value::Float(a) if a.dims() == 1 => Some(a.data().iter().map(|v| Value::from(*v)).collect()),
            _ => None,
        }
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        match self {
            Value::Bool(a) => a.annotation(),
            Value::Int(a) => a.annotation(),
            Value::Float(a) => a.annotation(),
            _ => None,
        }
    }

    /// Attach (or clear) the annotation of a numeric value; other values are returned unchanged
    pub fn with_annotation(self, annotation: Option<Annotation>) -> Result<Value, Value> {
        match self {
            Value::Bool(mut a) => {
                a.set_annotation(annotation);
                Ok(Value::Bool(a))
            }
            Value::Int(mut a) => {
                a.set_annotation(annotation);
                Ok(Value::Int(a))
            }
            Value::Float(mut a) => {
                a.set_annotation(annotation);
                Ok(Value::Float(a))
            }
            other => Err(other),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

fn fmt_array<T: Element>(array: &NdArray<T>, f: &mut fmt::Formatter<'_>, element: fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result) -> fmt::Result {
    fn level<T: Element>(data: &[T], shape: &[usize], f: &mut fmt::Formatter<'_>, element: fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result) -> fmt::Result {
        match shape.split_first() {
            None => element(&data[0], f),
            Some((&extent, rest)) => {
                let stride = rest.iter().product::<usize>();
                f.write_str("[")?;
                for i in 0..extent {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    level(&data[i * stride..(i + 1) * stride], rest, f, element)?;
                }
                f.write_str("]")
            }
        }
    }
    level(array.data(), array.shape(), f, element)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(a) => fmt_array(a, f, |v, f| write!(f, "{}", v)),
            Value::Int(a) => fmt_array(a, f, |v, f| write!(f, "{}", v)),
            Value::Float(a) => fmt_array(a, f, |v, f| write!(f, "{:?}", v)),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Dict(dict) => {
                f.write_str("{")?;
                for (i, (key, value)) in dict.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    key.fmt_nested(f)?;
                    f.write_str(": ")?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Value::Primitive(handle) => write!(f, "<{}>", handle.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Primitive(a), Value::Primitive(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(NdArray::scalar(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(NdArray::scalar(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(NdArray::scalar(value as i64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(NdArray::scalar(value))
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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<NdArray<bool>> for Value {
    fn from(array: NdArray<bool>) -> Self {
        Value::Bool(array)
    }
}

impl From<NdArray<i64>> for Value {
    fn from(array: NdArray<i64>) -> Self {
        Value::Int(array)
    }
}

impl From<NdArray<f64>> for Value {
    fn from(array: NdArray<f64>) -> Self {
        Value::Float(array)
    }
}

impl From<PrimitiveHandle> for Value {
    fn from(handle: PrimitiveHandle) -> Self {
        Value::Primitive(handle)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dict(dict)
    }
}

/// Insertion-ordered key/value dictionary with arbitrary value keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(Value, Value)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; returns the previous value for the key
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Same keys in the same order with every value passed through `f`
    pub fn map_values(self, mut f: impl FnMut(Value) -> Value) -> Self {
        Self {
            entries: self.entries.into_iter().map(|(k, v)| (k, f(v))).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Value::from(3_i64).as_i64(), Some(3));
        assert_eq!(Value::from(2.0).as_i64(), Some(2));
        assert_eq!(Value::from(2.5).as_i64(), None);
        assert_eq!(Value::from(true).as_f64(), Some(1.0));
        assert_eq!(Value::Nil.as_i64(), None);
    }

    #[test]
    fn test_truthiness() {
        assert_eq!(Value::Nil.to_bool(), Some(false));
        assert_eq!(Value::from(0_i64).to_bool(), Some(false));
        assert_eq!(Value::from(0.5).to_bool(), Some(true));
        assert_eq!(Value::from("").to_bool(), Some(false));
        assert_eq!(Value::Int(NdArray::vector(vec![1, 2])).to_bool(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(3_i64).to_string(), "3");
        assert_eq!(Value::from(3.0).to_string(), "3.0");
        assert_eq!(Value::List(vec![Value::from(2_i64), Value::from("a")]).to_string(), "[2, \"a\"]");

        let m = NdArray::matrix(2, 2, vec![1_i64, 2, 3, 4]).unwrap();
        assert_eq!(Value::Int(m).to_string(), "[[1, 2], [3, 4]]");
    }

    #[test]
    fn test_equality_ignores_annotation() {
        let plain = Value::Int(NdArray::vector(vec![1, 2]));
        let annotated = plain.clone().with_annotation(Some(Annotation::new("tile", vec![]))).unwrap();
        assert_eq!(plain, annotated);
        assert!(annotated.annotation().is_some());
        assert_ne!(Value::from(1_i64), Value::from(1.0));
    }

    #[test]
    fn test_elements() {
        let v = Value::Float(NdArray::vector(vec![1.0, 2.0]));
        assert_eq!(v.into_elements(), Some(vec![Value::from(1.0), Value::from(2.0)]));
        assert_eq!(Value::from(1_i64).into_elements(), None);
    }

    #[test]
    fn test_dictionary_replaces() {
        let mut dict = Dictionary::new();
        assert!(dict.insert(Value::from("a"), Value::from(1_i64)).is_none());
        assert_eq!(dict.insert(Value::from("a"), Value::from(2_i64)), Some(Value::from(1_i64)));
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::from("a")), Some(&Value::from(2_i64)));
    }
}
