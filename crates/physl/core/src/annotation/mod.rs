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

//! Metadata attached to array values.
//!
//! An annotation is a list whose head is its key followed by arbitrary data;
//! data entries that are themselves keyed lists are nested annotations. The
//! well-known nested keys are `tile` (see [`tiling`]), `locality` (see
//! [`locality`]) and `name` (see [`AnnotationInformation`]).

pub mod locality;
pub mod tiling;

pub use locality::LocalityInformation;
pub use tiling::{TilingAxis, TilingInformation1d, TilingInformation2d, TilingInformation3d, TilingSpan};

use crate::value::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnotationError {
    #[error("annotation must be a list starting with a string key, got {0}")]
    Malformed(String),

    #[error("annotation '{0}' is missing")]
    Missing(String),

    #[error("annotation '{key}': {message}")]
    Invalid { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    key: String,
    data: Vec<Value>,
}

impl Annotation {
    pub fn new(key: impl Into<String>, data: Vec<Value>) -> Self {
        Self { key: key.into(), data }
    }

    /// Parse `[key, data...]`
    pub fn from_value(value: &Value) -> Result<Self, AnnotationError> {
        match value.as_list() {
            Some([Value::Str(key), data @ ..]) => Ok(Self::new(key.clone(), data.to_vec())),
            _ => Err(AnnotationError::Malformed(value.to_string())),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut items = Vec::with_capacity(self.data.len() + 1);
        items.push(Value::from(self.key.as_str()));
        items.extend(self.data.iter().cloned());
        Value::List(items)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    /// Nested annotation stored under `key`
    pub fn find(&self, key: &str) -> Option<Annotation> {
        self.data.iter().filter_map(|value| Annotation::from_value(value).ok()).find(|nested| nested.key == key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Add a nested annotation, replacing one with the same key
    pub fn add(&mut self, nested: Annotation) {
        self.remove(&nested.key);
        self.data.push(nested.to_value());
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.data.len();
        self.data.retain(|value| Annotation::from_value(value).map_or(true, |nested| nested.key != key));
        before != self.data.len()
    }

    pub fn with(mut self, nested: Annotation) -> Self {
        self.add(nested);
        self
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Name and generation of an annotated value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationInformation {
    name: String,
    generation: i64,
}

impl AnnotationInformation {
    pub const KEY: &'static str = "name";

    pub fn new(name: impl Into<String>, generation: i64) -> Self {
        Self { name: name.into(), generation }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> i64 {
        self.generation
    }

    pub fn increment_generation(&mut self) -> i64 {
        self.generation += 1;
        self.generation
    }

    /// Same logical value, strictly later generation
    pub fn is_newer_than(&self, other: &AnnotationInformation) -> bool {
        self.name == other.name && self.generation > other.generation
    }

    pub fn as_annotation(&self) -> Annotation {
        Annotation::new(Self::KEY, vec![Value::from(self.name.as_str()), Value::from(self.generation)])
    }

    pub fn from_annotation(annotation: &Annotation) -> Result<Self, AnnotationError> {
        let nested = if annotation.key() == Self::KEY {
            annotation.clone()
        } else {
            annotation.find(Self::KEY).ok_or_else(|| AnnotationError::Missing(Self::KEY.to_string()))?
        };
        match nested.data() {
            [Value::Str(name), generation] => match generation.as_i64() {
                Some(generation) => Ok(Self::new(name.clone(), generation)),
                None => Err(AnnotationError::Invalid {
                    key: Self::KEY.to_string(),
                    message: "generation must be an integer".to_string(),
                }),
            },
            _ => Err(AnnotationError::Invalid {
                key: Self::KEY.to_string(),
                message: "expected a name and a generation".to_string(),
            }),
        }
    }
}

/// Bump the generation stored in `annotation` in place; `None` if it carries no name
pub fn increment_generation(annotation: &mut Annotation) -> Option<i64> {
    let mut info = AnnotationInformation::from_annotation(annotation).ok()?;
    let generation = info.increment_generation();
    annotation.add(info.as_annotation());
    Some(generation)
}

/// Carry the generation history of `previous` over to `value` being bound in its place.
///
/// When both are annotated and `previous` is named, `value` ends up with the
/// same name and a generation one past the newer of the two.
pub fn rebind_generation(previous: &Value, value: Value) -> Value {
    let Some(old) = previous.annotation().and_then(|a| AnnotationInformation::from_annotation(a).ok()) else {
        return value;
    };
    let Some(mut annotation) = value.annotation().cloned() else {
        return value;
    };

    let generation = match AnnotationInformation::from_annotation(&annotation) {
        Ok(current) if current.name() == old.name() => current.generation().max(old.generation()),
        _ => old.generation(),
    };
    annotation.add(AnnotationInformation::new(old.name(), generation + 1).as_annotation());
    value.with_annotation(Some(annotation)).unwrap_or_else(|unchanged| unchanged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NdArray;

    fn tiled() -> Annotation {
        Annotation::new("meta", vec![]).with(TilingInformation1d::new(TilingAxis::Columns, TilingSpan::new(0, 4)).as_annotation())
    }

    #[test]
    fn test_value_round_trip() {
        let annotation = tiled();
        let value = annotation.to_value();
        assert_eq!(Annotation::from_value(&value).unwrap(), annotation);
        assert!(Annotation::from_value(&Value::from(1_i64)).is_err());
        assert!(Annotation::from_value(&Value::List(vec![Value::from(1_i64)])).is_err());
    }

    #[test]
    fn test_find_add_remove() {
        let mut annotation = tiled();
        assert!(annotation.has("tile"));
        annotation.add(AnnotationInformation::new("x", 1).as_annotation());
        annotation.add(AnnotationInformation::new("x", 2).as_annotation());
        assert_eq!(annotation.data().len(), 2);
        assert_eq!(AnnotationInformation::from_annotation(&annotation).unwrap().generation(), 2);

        assert!(annotation.remove("tile"));
        assert!(!annotation.remove("tile"));
        assert!(!annotation.has("tile"));
    }

    #[test]
    fn test_increment_generation() {
        let mut annotation = tiled();
        assert_eq!(increment_generation(&mut annotation), None);

        annotation.add(AnnotationInformation::new("a", 1).as_annotation());
        assert_eq!(increment_generation(&mut annotation), Some(2));
        assert_eq!(increment_generation(&mut annotation), Some(3));
    }

    #[test]
    fn test_rebind_increments_generation() {
        let named = tiled().with(AnnotationInformation::new("a", 4).as_annotation());
        let previous = Value::Int(NdArray::vector(vec![1, 2, 3, 4]).with_annotation(named));
        let next = Value::Int(NdArray::vector(vec![5, 6, 7, 8]).with_annotation(tiled()));

        let rebound = rebind_generation(&previous, next);
        let info = AnnotationInformation::from_annotation(rebound.annotation().unwrap()).unwrap();
        assert_eq!(info, AnnotationInformation::new("a", 5));
        assert!(info.is_newer_than(&AnnotationInformation::new("a", 4)));
    }

    #[test]
    fn test_rebind_plain_values_untouched() {
        let plain = Value::from(1_i64);
        assert_eq!(rebind_generation(&Value::Nil, plain.clone()), plain);
        assert!(rebind_generation(&Value::Nil, plain).annotation().is_none());
    }
}
