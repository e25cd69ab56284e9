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

//! `slice(value, index...)`: element, row and range access on arrays and lists.
//!
//! Each index selects along one axis: an integer picks one position (negative
//! values count from the end) and drops the axis, a `[start, stop]` list
//! keeps a half-open range, and nil keeps the whole axis. Missing trailing
//! indices keep their axes whole. A slice of a variable is also a valid
//! `store` target; the update happens in place.

use crate::context::EvalContext;
use crate::error::PrimitiveResult;
use crate::primitive::{value_operands, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::{Element, NdArray, Value};
use async_trait::async_trait;

pub const SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "slice",
    patterns: &["slice(_1, __2)"],
    create: Slice::create,
    help: "slice(x, index...)\n\nSelects elements, rows or ranges of an array or list; storable.",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    Index(usize),
    Range(usize, usize),
}

impl Selection {
    fn indices(self) -> std::ops::Range<usize> {
        match self {
            Selection::Index(i) => i..i + 1,
            Selection::Range(start, stop) => start..stop,
        }
    }
}

fn normalize(index: i64, extent: usize) -> i64 {
    if index < 0 { index + extent as i64 } else { index }
}

fn selection(index: &Value, extent: usize, instance: &PrimitiveInstance) -> PrimitiveResult<Selection> {
    let out_of_bounds = || instance.invalid_operand(format!("index {} out of bounds for an axis of extent {}", index, extent));
    match index {
        Value::Nil => Ok(Selection::Range(0, extent)),
        Value::List(bounds) if bounds.len() == 2 => {
            let bound = |value: &Value, default: usize| -> PrimitiveResult<i64> {
                match value {
                    Value::Nil => Ok(default as i64),
                    other => other.as_i64().map(|i| normalize(i, extent)).ok_or_else(|| instance.type_error("slice bounds must be integers")),
                }
            };
            let start = bound(&bounds[0], 0)?;
            let stop = bound(&bounds[1], extent)?;
            if start < 0 || stop < start || stop > extent as i64 {
                return Err(out_of_bounds());
            }
            Ok(Selection::Range(start as usize, stop as usize))
        }
        other => {
            let i = other.as_i64().ok_or_else(|| instance.type_error(format!("slice index must be an integer, nil or a [start, stop] list, got {}", other.type_name())))?;
            let i = normalize(i, extent);
            if i < 0 || i >= extent as i64 {
                return Err(out_of_bounds());
            }
            Ok(Selection::Index(i as usize))
        }
    }
}

/// Result shape and row-major source offsets of a selection
fn plan(shape: &[usize], indices: &[Value], instance: &PrimitiveInstance) -> PrimitiveResult<(Vec<usize>, Vec<usize>)> {
    if indices.len() > shape.len() {
        return Err(instance.type_error(format!("too many indices: {} for a value with {} dimensions", indices.len(), shape.len())));
    }
    let mut result_shape = Vec::new();
    let mut offsets = vec![0_usize];
    for (axis, &extent) in shape.iter().enumerate() {
        let selected = match indices.get(axis) {
            Some(index) => selection(index, extent, instance)?,
            None => Selection::Range(0, extent),
        };
        if let Selection::Range(start, stop) = selected {
            result_shape.push(stop - start);
        }
        offsets = offsets.iter().flat_map(|&base| selected.indices().map(move |i| base * extent + i)).collect();
    }
    Ok((result_shape, offsets))
}

fn gather<T: Element>(array: &NdArray<T>, indices: &[Value], instance: &PrimitiveInstance) -> PrimitiveResult<NdArray<T>> {
    let (shape, offsets) = plan(array.shape(), indices, instance)?;
    let data = offsets.iter().map(|&offset| array.data()[offset].clone()).collect();
    NdArray::from_shape(shape, data).ok_or_else(|| instance.type_error("slice produced an inconsistent shape"))
}

/// Conversion of assigned values into an array's element type
trait Coerce: Element + Sized {
    fn coerce(value: &Value) -> Option<NdArray<Self>>;
}

impl Coerce for bool {
    fn coerce(value: &Value) -> Option<NdArray<bool>> {
        match value {
            Value::Bool(a) => Some(a.clone()),
            _ => None,
        }
    }
}

impl Coerce for i64 {
    fn coerce(value: &Value) -> Option<NdArray<i64>> {
        match value {
            Value::Bool(a) => Some(a.map(|b| *b as i64)),
            Value::Int(a) => Some(a.clone()),
            _ => None,
        }
    }
}

impl Coerce for f64 {
    fn coerce(value: &Value) -> Option<NdArray<f64>> {
        match value {
            Value::Bool(a) => Some(a.map(|b| if *b { 1.0 } else { 0.0 })),
            Value::Int(a) => Some(a.map(|v| *v as f64)),
            Value::Float(a) => Some(a.clone()),
            _ => None,
        }
    }
}

fn scatter<T: Coerce>(array: &mut NdArray<T>, indices: &[Value], value: &Value, instance: &PrimitiveInstance) -> PrimitiveResult<()> {
    let (shape, offsets) = plan(array.shape(), indices, instance)?;
    let source = T::coerce(value).ok_or_else(|| instance.type_error(format!("cannot store {} into a {} array", value.type_name(), array.element_type())))?;
    if !source.is_scalar() && source.shape() != shape.as_slice() {
        return Err(instance.type_error(format!("cannot store a value of shape {:?} into a slice of shape {:?}", source.shape(), shape)));
    }

    let data = array.data_mut();
    for (i, &offset) in offsets.iter().enumerate() {
        data[offset] = source.data()[if source.is_scalar() { 0 } else { i }].clone();
    }
    Ok(())
}

/// Read a slice of `target`
pub fn read(target: &Value, indices: &[Value], instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    match target {
        Value::Bool(a) => gather(a, indices, instance).map(Value::Bool),
        Value::Int(a) => gather(a, indices, instance).map(Value::Int),
        Value::Float(a) => gather(a, indices, instance).map(Value::Float),
        Value::List(items) => match indices {
            [] => Ok(target.clone()),
            [index] => match selection(index, items.len(), instance)? {
                Selection::Index(i) => Ok(items[i].clone()),
                Selection::Range(start, stop) => Ok(Value::List(items[start..stop].to_vec())),
            },
            _ => Err(instance.type_error("lists take a single slice index")),
        },
        other => Err(instance.type_error(format!("cannot slice {}", other.type_name()))),
    }
}

/// Overwrite a slice of `target` in place with `value`
pub fn write(target: &mut Value, indices: &[Value], value: &Value, instance: &PrimitiveInstance) -> PrimitiveResult<()> {
    match target {
        Value::Bool(a) => scatter(a, indices, value, instance),
        Value::Int(a) => scatter(a, indices, value, instance),
        Value::Float(a) => scatter(a, indices, value, instance),
        Value::List(items) => match indices {
            [index] => match selection(index, items.len(), instance)? {
                Selection::Index(i) => {
                    items[i] = value.clone();
                    Ok(())
                }
                Selection::Range(start, stop) => match value.as_list() {
                    Some(replacement) if replacement.len() == stop - start => {
                        items[start..stop].clone_from_slice(replacement);
                        Ok(())
                    }
                    _ => Err(instance.type_error(format!("a list range of length {} needs a list of the same length", stop - start))),
                },
            },
            _ => Err(instance.type_error("lists take a single slice index")),
        },
        other => Err(instance.type_error(format!("cannot store into a slice of {}", other.type_name()))),
    }
}

#[derive(Debug)]
pub struct Slice {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
}

impl Slice {
    pub fn create(operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        if operands.is_empty() {
            return Err(instance.arity_error("slice needs a value to slice"));
        }
        Ok(PrimitiveHandle::new(Self { instance, operands }))
    }
}

#[async_trait]
impl Primitive for Slice {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let values = value_operands(&self.operands, &ctx).await?;
        read(&values[0], &values[1..], &self.instance)
    }

    fn is_bindable(&self) -> bool {
        self.operands[0].as_primitive().is_some_and(PrimitiveHandle::is_bindable)
    }

    async fn store(&self, value: Value, ctx: EvalContext) -> PrimitiveResult<()> {
        let target = self.operands[0].as_primitive().filter(|t| t.is_bindable()).ok_or_else(|| self.instance.type_error("slice target is not bindable"))?;
        let indices = value_operands(&self.operands[1..], &ctx).await?;
        target.store_with(&ctx, &mut |current: &mut Value| write(current, &indices, &value, &self.instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_tree::{AccessVariable, Store};
    use crate::frame::Frame;

    fn instance() -> PrimitiveInstance {
        PrimitiveInstance::anonymous("slice")
    }

    fn matrix() -> Value {
        Value::Int(NdArray::matrix(2, 3, vec![1, 2, 3, 4, 5, 6]).unwrap())
    }

    #[test]
    fn test_element_row_range() {
        let m = matrix();
        assert_eq!(read(&m, &[Value::from(1_i64), Value::from(2_i64)], &instance()).unwrap(), Value::from(6_i64));
        assert_eq!(read(&m, &[Value::from(-1_i64)], &instance()).unwrap(), Value::Int(NdArray::vector(vec![4, 5, 6])));

        let columns = Value::List(vec![Value::from(1_i64), Value::Nil]);
        let expected = Value::Int(NdArray::matrix(2, 2, vec![2, 3, 5, 6]).unwrap());
        assert_eq!(read(&m, &[Value::Nil, columns], &instance()).unwrap(), expected);
    }

    #[test]
    fn test_bounds() {
        let m = matrix();
        assert!(read(&m, &[Value::from(2_i64)], &instance()).is_err());
        assert!(read(&m, &[Value::from(0_i64), Value::from(0_i64), Value::from(0_i64)], &instance()).unwrap_err().is_type_error());
        assert!(read(&Value::from("s"), &[Value::from(0_i64)], &instance()).is_err());
    }

    #[test]
    fn test_list_slices() {
        let list = Value::List(vec![Value::from(1_i64), Value::from(2_i64), Value::from(3_i64)]);
        assert_eq!(read(&list, &[Value::from(-1_i64)], &instance()).unwrap(), Value::from(3_i64));

        let range = Value::List(vec![Value::from(0_i64), Value::from(2_i64)]);
        assert_eq!(read(&list, &[range], &instance()).unwrap(), Value::List(vec![Value::from(1_i64), Value::from(2_i64)]));
    }

    #[test]
    fn test_write_copies_shared_storage() {
        let original = matrix();
        let mut alias = original.clone();
        write(&mut alias, &[Value::from(0_i64)], &Value::from(0_i64), &instance()).unwrap();
        assert_eq!(read(&alias, &[Value::from(0_i64)], &instance()).unwrap(), Value::Int(NdArray::vector(vec![0, 0, 0])));
        assert_eq!(original, matrix());

        assert!(write(&mut alias, &[Value::from(0_i64)], &Value::from(1.5), &instance()).unwrap_err().is_type_error());
    }

    #[tokio::test]
    async fn test_store_into_variable_slice() {
        let globals = Frame::root();
        globals.define("m", matrix());
        let access = AccessVariable::create("m", PrimitiveInstance::anonymous("access-variable"));
        let slice = Slice::create(vec![access.into(), Value::from(1_i64), Value::from(0_i64)], instance()).unwrap();
        assert!(slice.is_bindable());

        let store = Store::create(vec![slice.into(), Value::from(40_i64)], PrimitiveInstance::anonymous("store")).unwrap();
        store.eval_value(&EvalContext::new(globals.clone())).await.unwrap();
        assert_eq!(globals.lookup("m"), Some(Value::Int(NdArray::matrix(2, 3, vec![1, 2, 3, 40, 5, 6]).unwrap())));
    }

    #[test]
    fn test_constant_slice_not_bindable() {
        let slice = Slice::create(vec![matrix(), Value::from(0_i64)], instance()).unwrap();
        assert!(!slice.is_bindable());
        assert!(Store::create(vec![slice.into(), Value::from(1_i64)], PrimitiveInstance::anonymous("store")).unwrap_err().is_type_error());
    }
}
