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
use crate::value::Value;
use async_trait::async_trait;
use tracing::debug;

pub const CONSOLE_OUTPUT_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "console_output",
    patterns: &["console_output(__1)"],
    create: |operands, instance| IoOperation::create(operands, instance, IoKind::Console),
    help: "console_output(args...)\n\nPrints the arguments separated by spaces, followed by a newline.",
};

pub const FILE_READ_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "file_read",
    patterns: &["file_read(_1)"],
    create: |operands, instance| {
        instance.expect_operands(&operands, 1)?;
        IoOperation::create(operands, instance, IoKind::Read)
    },
    help: "file_read(path)\n\nContents of the file at `path` as a string.",
};

pub const FILE_WRITE_SPEC: PrimitiveSpec = PrimitiveSpec {
    name: "file_write",
    patterns: &["file_write(_1, _2)"],
    create: |operands, instance| {
        instance.expect_operands(&operands, 2)?;
        IoOperation::create(operands, instance, IoKind::Write)
    },
    help: "file_write(path, value)\n\nWrites the printed form of `value` to the file at `path`.",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IoKind {
    Console,
    Read,
    Write,
}

#[derive(Debug)]
pub struct IoOperation {
    instance: PrimitiveInstance,
    operands: Vec<Value>,
    kind: IoKind,
}

impl IoOperation {
    fn create(operands: Vec<Value>, instance: PrimitiveInstance, kind: IoKind) -> PrimitiveResult<PrimitiveHandle> {
        Ok(PrimitiveHandle::new(Self { instance, operands, kind }))
    }

    fn path<'a>(&self, value: &'a Value) -> PrimitiveResult<&'a str> {
        value
            .as_str()
            .ok_or_else(|| self.instance.type_error(format!("file name must be a string, got {}", value.type_name())))
    }
}

#[async_trait]
impl Primitive for IoOperation {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, _args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let values = value_operands(&self.operands, &ctx).await?;
        match self.kind {
            IoKind::Console => {
                let line = values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ");
                println!("{}", line);
                Ok(Value::Nil)
            }
            IoKind::Read => {
                let path = self.path(&values[0])?;
                debug!("reading {}", path);
                tokio::fs::read_to_string(path)
                    .await
                    .map(Value::from)
                    .map_err(|e| self.instance.io_error(format!("cannot read file '{}'", path), e))
            }
            IoKind::Write => {
                let path = self.path(&values[0])?;
                debug!("writing {}", path);
                tokio::fs::write(path, values[1].to_string())
                    .await
                    .map_err(|e| self.instance.io_error(format!("cannot write file '{}'", path), e))?;
                Ok(Value::Nil)
            }
        }
    }
}
