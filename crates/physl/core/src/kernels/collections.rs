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

use crate::context::EvalContext;
use crate::error::PrimitiveResult;
use crate::primitive::{value_operands, Primitive, PrimitiveHandle, PrimitiveInstance, PrimitiveSpec};
use crate::value::{Dictionary, Value};
use async_trait::async_trait;
use std::fmt;

pub const LIST_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "list",
    patterns: &["list(__1)", "[__1]"],
    create: |operands, instance| Collection::create(operands, instance, make_list),
    help: "list(args...)\n\nA list of the given values.",
};

pub const DICT_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "dict",
    patterns: &["dict(__1)"],
    create: |operands, instance| Collection::create(operands, instance, make_dict),
    help: "dict([key, value]...)\n\nA dictionary built from two-element lists.",
};

pub const LEN_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "len",
    patterns: &["len(_1)"],
    create: |operands, instance| {
        instance.expect_operands(&operands, 1)?;
        Collection::create(operands, instance, len)
    },
    help: "len(x)\n\nNumber of elements of a list, dictionary or string, or the extent of the first axis of an array.",
};

pub const SHAPE_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "shape",
    patterns: &["shape(_1)", "shape(_1, _2)"],
    create: |operands, instance| {
        instance.expect_operand_range(&operands, 1, 2)?;
        Collection::create(operands, instance, shape)
    },
    help: "shape(x)\nshape(x, axis)\n\nExtents of all axes as a list, or the extent along one axis (negative axes count from the end).",
};

pub(crate) type CollectionKernel = fn(Vec<Value>, &PrimitiveInstance) -> PrimitiveResult<Value>;

/// Node evaluating all operands concurrently and handing them to a kernel
pub struct Collection {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
    kernel: CollectionKernel,
}

impl Collection {
    pub(crate) fn create(operands: Vec<Value>, instance: PrimitiveInstance, kernel: CollectionKernel) -> PrimitiveResult<PrimitiveHandle> {
        Ok(PrimitiveHandle::new(Self { instance, operands, kernel }))
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection").field("instance", &self.instance.name()).field("operands", &self.operands).finish()
    }
}

#[async_trait]
impl Primitive for Collection {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let values = value_operands(&self.operands, &ctx).await?;
        (self.kernel)(values, &self.instance)
    }
}

fn make_list(values: Vec<Value>, _instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    Ok(Value::List(values))
}

fn make_dict(values: Vec<Value>, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    let mut dict = Dictionary::new();
    for (i, entry) in values.into_iter().enumerate() {
        match entry {
            Value::List(pair) if pair.len() == 2 => {
                let mut pair = pair.into_iter();
                if let (Some(key), Some(value)) = (pair.next(), pair.next()) {
                    dict.insert(key, value);
                }
            }
            other => return Err(instance.type_error(format!("dict entry {} must be a [key, value] list, got {}", i, other))),
        }
    }
    Ok(Value::Dict(dict))
}

fn len(mut values: Vec<Value>, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    let value = values.pop().unwrap_or_default();
    let len = match &value {
        Value::Str(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Dict(dict) => dict.len(),
        other => match other.shape() {
            Some([first, ..]) => *first,
            _ => return Err(instance.type_error(format!("len is not defined for {}", other.type_name()))),
        },
    };
    Ok(Value::from(len as i64))
}

/// Extents of a value: arrays report their shape, lists their length
fn extents(value: &Value) -> Option<Vec<usize>> {
    match value {
        Value::List(items) => Some(vec![items.len()]),
        other => other.shape().map(<[usize]>::to_vec),
    }
}

fn shape(values: Vec<Value>, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    let extents = extents(&values[0]).ok_or_else(|| instance.type_error(format!("shape is not defined for {}", values[0].type_name())))?;
    match values.get(1) {
        None => Ok(Value::List(extents.into_iter().map(|e| Value::from(e as i64)).collect())),
        Some(axis) => {
            let axis = axis.as_i64().ok_or_else(|| instance.type_error("axis must be an integer"))?;
            let dims = extents.len() as i64;
            let index = if axis < 0 { axis + dims } else { axis };
            if !(0..dims).contains(&index) {
                return Err(instance.type_error(format!("axis out of range: {} for a value with {} dimensions", axis, dims)));
            }
            Ok(Value::from(extents[index as usize] as i64))
        }
    }
}
