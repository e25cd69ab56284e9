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

//! Minimal n-dimensional array storage backing numeric values.
//!
//! The numeric kernels are external to the execution tree; this type only
//! provides what the evaluator needs: 0-3 dimensions, an element type tag,
//! shared (reference) or owned storage, shape queries and element access.

use crate::annotation::Annotation;
use std::fmt;
use std::sync::Arc;

/// Highest dimensionality an array may have
pub const MAX_DIMENSIONS: usize = 3;

/// Element type tag of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Bool,
    Int64,
    Float64,
}

impl ElementType {
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Bool => "bool",
            ElementType::Int64 => "int64",
            ElementType::Float64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Types that can be stored in an [`NdArray`]
pub trait Element: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    const TYPE: ElementType;
}

impl Element for bool {
    const TYPE: ElementType = ElementType::Bool;
}

impl Element for i64 {
    const TYPE: ElementType = ElementType::Int64;
}

impl Element for f64 {
    const TYPE: ElementType = ElementType::Float64;
}

/// Row-major array with reference-counted storage.
///
/// Cloning an array shares its storage; the clone is a reference until one
/// side mutates through [`NdArray::data_mut`], which copies shared storage first.
#[derive(Clone)]
pub struct NdArray<T: Element> {
    shape: Vec<usize>,
    data: Arc<Vec<T>>,
    annotation: Option<Arc<Annotation>>,
}

impl<T: Element> NdArray<T> {
    /// Build an array from a shape and row-major data; `None` if they disagree
    pub fn from_shape(shape: Vec<usize>, data: Vec<T>) -> Option<Self> {
        if shape.len() > MAX_DIMENSIONS || shape.iter().product::<usize>() != data.len() {
            return None;
        }
        Some(Self {
            shape,
            data: Arc::new(data),
            annotation: None,
        })
    }

    pub fn scalar(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: Arc::new(vec![value]),
            annotation: None,
        }
    }

    pub fn vector(data: Vec<T>) -> Self {
        Self {
            shape: vec![data.len()],
            data: Arc::new(data),
            annotation: None,
        }
    }

    pub fn matrix(rows: usize, columns: usize, data: Vec<T>) -> Option<Self> {
        Self::from_shape(vec![rows, columns], data)
    }

    pub fn tensor(pages: usize, rows: usize, columns: usize, data: Vec<T>) -> Option<Self> {
        Self::from_shape(vec![pages, rows, columns], data)
    }

    pub fn element_type(&self) -> ElementType {
        T::TYPE
    }

    pub fn dims(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// The value of a 0-d array
    pub fn scalar_value(&self) -> Option<&T> {
        if self.is_scalar() { self.data.first() } else { None }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// True while the storage is shared with another array
    pub fn is_ref(&self) -> bool {
        Arc::strong_count(&self.data) > 1
    }

    /// Mutable access to the elements, copying shared storage first
    pub fn data_mut(&mut self) -> &mut [T] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Detach from any shared storage
    pub fn into_owned(mut self) -> Self {
        if self.is_ref() {
            self.data = Arc::new(self.data.as_ref().clone());
        }
        self
    }

    /// Row-major offset of a full multi-index
    pub fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for (&i, &extent) in index.iter().zip(&self.shape) {
            if i >= extent {
                return None;
            }
            offset = offset * extent + i;
        }
        Some(offset)
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.offset(index).map(|offset| &self.data[offset])
    }

    pub fn map<U: Element>(&self, f: impl Fn(&T) -> U) -> NdArray<U> {
        NdArray {
            shape: self.shape.clone(),
            data: Arc::new(self.data.iter().map(f).collect()),
            annotation: None,
        }
    }

    /// Element-wise combination; a 0-d operand is broadcast against the other
    pub fn zip_with<U: Element, R: Element>(&self, other: &NdArray<U>, f: impl Fn(&T, &U) -> R) -> Option<NdArray<R>> {
        let (shape, data) = if self.shape == other.shape {
            (self.shape.clone(), self.data.iter().zip(other.data.iter()).map(|(a, b)| f(a, b)).collect())
        } else if let Some(b) = other.scalar_value() {
            (self.shape.clone(), self.data.iter().map(|a| f(a, b)).collect())
        } else if let Some(a) = self.scalar_value() {
            (other.shape.clone(), other.data.iter().map(|b| f(a, b)).collect())
        } else {
            return None;
        };
        Some(NdArray {
            shape,
            data: Arc::new(data),
            annotation: None,
        })
    }

    /// Fallible variant of [`NdArray::zip_with`]
    pub fn try_zip_with<U: Element, R: Element, E>(&self, other: &NdArray<U>, f: impl Fn(&T, &U) -> Result<R, E>) -> Option<Result<NdArray<R>, E>> {
        let shape = if self.shape == other.shape || other.is_scalar() {
            self.shape.clone()
        } else if self.is_scalar() {
            other.shape.clone()
        } else {
            return None;
        };
        let len = shape.iter().product::<usize>();
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let a = &self.data[if self.is_scalar() { 0 } else { i }];
            let b = &other.data[if other.is_scalar() { 0 } else { i }];
            match f(a, b) {
                Ok(value) => out.push(value),
                Err(e) => return Some(Err(e)),
            }
        }
        Some(Ok(NdArray {
            shape,
            data: Arc::new(out),
            annotation: None,
        }))
    }

    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_deref()
    }

    pub fn set_annotation(&mut self, annotation: Option<Annotation>) {
        self.annotation = annotation.map(Arc::new);
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(Arc::new(annotation));
        self
    }
}

impl<T: Element> PartialEq for NdArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}

impl<T: Element> fmt::Debug for NdArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NdArray")
            .field("type", &T::TYPE)
            .field("shape", &self.shape)
            .field("data", &self.data)
            .field("annotated", &self.annotation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let s = NdArray::scalar(3_i64);
        assert_eq!(s.dims(), 0);
        assert_eq!(s.scalar_value(), Some(&3));

        let m = NdArray::matrix(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(m.shape(), &[2, 3]);
        assert_eq!(m.get(&[1, 2]), Some(&6.0));
        assert_eq!(m.get(&[2, 0]), None);

        assert!(NdArray::matrix(2, 2, vec![1_i64]).is_none());
        assert!(NdArray::from_shape(vec![1, 1, 1, 1], vec![true]).is_none());
    }

    #[test]
    fn test_copy_on_write() {
        let original = NdArray::vector(vec![1_i64, 2, 3]);
        let mut alias = original.clone();
        assert!(alias.is_ref());

        alias.data_mut()[0] = 10;
        assert!(!alias.is_ref());
        assert_eq!(original.data(), &[1, 2, 3]);
        assert_eq!(alias.data(), &[10, 2, 3]);
    }

    #[test]
    fn test_broadcast() {
        let v = NdArray::vector(vec![1_i64, 2, 3]);
        let s = NdArray::scalar(10_i64);
        let sum = v.zip_with(&s, |a, b| a + b).unwrap();
        assert_eq!(sum.data(), &[11, 12, 13]);

        let w = NdArray::vector(vec![1_i64, 2]);
        assert!(v.zip_with(&w, |a, b| a + b).is_none());

        let divided = v.try_zip_with(&NdArray::scalar(0_i64), |a, b| if *b == 0 { Err("zero") } else { Ok(a / b) });
        assert_eq!(divided.unwrap().unwrap_err(), "zero");
    }
}
