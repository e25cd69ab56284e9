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

//! Attaching and reading annotations on array values.

use super::collections::Collection;
use crate::annotation::{Annotation, AnnotationInformation, LocalityInformation};
use crate::error::PrimitiveResult;
use crate::primitive::{PrimitiveInstance, PrimitiveSpec};
use crate::value::Value;

pub const ANNOTATE_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "annotate",
    patterns: &["annotate(_1, _2, __3)"],
    create: |operands, instance| {
        check_min_operands(&operands, &instance, 2)?;
        Collection::create(operands, instance, annotate)
    },
    help: "annotate(x, key, data...)\n\nA copy of the array `x` carrying the annotation `[key, data...]`.",
};

pub const ANNOTATE_D_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "annotate_d",
    patterns: &["annotate_d(_1, _2, _3, __4)"],
    create: |operands, instance| {
        check_min_operands(&operands, &instance, 3)?;
        Collection::create(operands, instance, annotate_d)
    },
    help: "annotate_d(x, name, key, data...)\n\nLike annotate, additionally recording the name of the distributed \
           object (generation 1) and its locality when none is given.",
};

pub const ANNOTATION_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "annotation",
    patterns: &["annotation(_1)"],
    create: |operands, instance| {
        instance.expect_operands(&operands, 1)?;
        Collection::create(operands, instance, annotation)
    },
    help: "annotation(x)\n\nThe annotation attached to `x` as a list, or nil.",
};

fn check_min_operands(operands: &[Value], instance: &PrimitiveInstance, min: usize) -> PrimitiveResult<()> {
    if operands.len() < min {
        return Err(instance.arity_error(format!("expected at least {} operands, got {}", min, operands.len())));
    }
    Ok(())
}

fn key_operand(value: &Value, instance: &PrimitiveInstance) -> PrimitiveResult<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| instance.type_error(format!("annotation key must be a string, got {}", value.type_name())))
}

fn attach(target: Value, annotation: Annotation, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    target
        .with_annotation(Some(annotation))
        .map_err(|other| instance.type_error(format!("only arrays can be annotated, got {}", other.type_name())))
}

fn annotate(values: Vec<Value>, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    let mut values = values.into_iter();
    let target = values.next().unwrap_or_default();
    let key = key_operand(&values.next().unwrap_or_default(), instance)?;
    attach(target, Annotation::new(key, values.collect()), instance)
}

fn annotate_d(values: Vec<Value>, instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    let mut values = values.into_iter();
    let target = values.next().unwrap_or_default();
    let name = key_operand(&values.next().unwrap_or_default(), instance)?;
    let key = key_operand(&values.next().unwrap_or_default(), instance)?;

    let mut annotation = Annotation::new(key, values.collect()).with(AnnotationInformation::new(name, 1).as_annotation());
    if !annotation.has(LocalityInformation::KEY) {
        annotation.add(LocalityInformation::new(0, 1).as_annotation());
    }
    attach(target, annotation, instance)
}

fn annotation(values: Vec<Value>, _instance: &PrimitiveInstance) -> PrimitiveResult<Value> {
    Ok(values.first().and_then(Value::annotation).map_or(Value::Nil, Annotation::to_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{TilingAxis, TilingInformation1d, TilingSpan};
    use crate::context::EvalContext;
    use crate::frame::Frame;
    use crate::value::NdArray;

    async fn eval(spec: &PrimitiveSpec, operands: Vec<Value>) -> PrimitiveResult<Value> {
        (spec.create)(operands, PrimitiveInstance::anonymous(spec.name))?.eval_value(&EvalContext::new(Frame::root())).await
    }

    fn tile() -> Value {
        TilingInformation1d::new(TilingAxis::Columns, TilingSpan::new(0, 3)).as_annotation().to_value()
    }

    #[tokio::test]
    async fn test_annotate_and_read_back() {
        let v = Value::Int(NdArray::vector(vec![1, 2, 3]));
        let annotated = eval(&ANNOTATE_SPEC, vec![v, Value::from("meta"), tile()]).await.unwrap();

        let read = eval(&ANNOTATION_SPEC, vec![annotated]).await.unwrap();
        let annotation = Annotation::from_value(&read).unwrap();
        assert_eq!(annotation.key(), "meta");
        let tiling = TilingInformation1d::from_annotation(&annotation).unwrap();
        assert_eq!(tiling.span, TilingSpan::new(0, 3));
    }

    #[tokio::test]
    async fn test_annotate_d_adds_name_and_locality() {
        let v = Value::Float(NdArray::vector(vec![1.0, 2.0]));
        let annotated = eval(&ANNOTATE_D_SPEC, vec![v, Value::from("A"), Value::from("meta"), tile()]).await.unwrap();
        let annotation = annotated.annotation().unwrap();

        let info = AnnotationInformation::from_annotation(annotation).unwrap();
        assert_eq!(info.name(), "A");
        assert_eq!(info.generation(), 1);
        let locality = LocalityInformation::from_annotation(annotation).unwrap();
        assert_eq!(locality, LocalityInformation::new(0, 1));
    }

    #[tokio::test]
    async fn test_non_arrays_rejected() {
        let error = eval(&ANNOTATE_SPEC, vec![Value::from("text"), Value::from("meta")]).await.unwrap_err();
        assert!(error.is_type_error());
        assert_eq!(eval(&ANNOTATION_SPEC, vec![Value::from(1_i64)]).await.unwrap(), Value::Nil);
    }
}
