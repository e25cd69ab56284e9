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

//! Evaluation context threaded through every `eval` call

use crate::error::{PrimitiveError, PrimitiveResult};
use crate::frame::Frame;
use physl_common::PhyslConfig;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;
use tokio::time::Instant;

/// Evaluation mode flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EvalMode(u8);

impl EvalMode {
    pub const DEFAULT: EvalMode = EvalMode(0);
    /// Lambdas evaluate to their bare node instead of a closure over the current frame
    pub const NO_WRAP_FUNCTIONS: EvalMode = EvalMode(0b001);
    /// Invocable nodes return a reference to themselves instead of running their body
    pub const NO_EVAL_LAMBDAS: EvalMode = EvalMode(0b010);
    /// Run parallel constructs inline on the current task
    pub const DIRECT_EXECUTION: EvalMode = EvalMode(0b100);

    pub fn contains(self, flag: EvalMode) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn with(self, flag: EvalMode) -> EvalMode {
        EvalMode(self.0 | flag.0)
    }

    pub fn without(self, flag: EvalMode) -> EvalMode {
        EvalMode(self.0 & !flag.0)
    }
}

impl BitOr for EvalMode {
    type Output = EvalMode;

    fn bitor(self, rhs: EvalMode) -> EvalMode {
        self.with(rhs)
    }
}

impl fmt::Display for EvalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(EvalMode::NO_WRAP_FUNCTIONS) {
            names.push("no-wrap-functions");
        }
        if self.contains(EvalMode::NO_EVAL_LAMBDAS) {
            names.push("no-eval-lambdas");
        }
        if self.contains(EvalMode::DIRECT_EXECUTION) {
            names.push("direct-execution");
        }
        if names.is_empty() { f.write_str("default") } else { f.write_str(&names.join("|")) }
    }
}

/// One entry of the function call stack
#[derive(Debug)]
pub struct CallFrame {
    function: String,
    depth: usize,
    parent: Option<Arc<CallFrame>>,
}

impl CallFrame {
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<&Arc<CallFrame>> {
        self.parent.as_ref()
    }
}

/// Value-typed evaluation state.
///
/// Cloning is cheap (reference counted frames); every `with_*` method returns a
/// modified copy so changes never leak into sibling branches.
#[derive(Debug, Clone)]
pub struct EvalContext {
    mode: EvalMode,
    frame: Arc<Frame>,
    call_stack: Option<Arc<CallFrame>>,
    deadline: Option<Instant>,
    max_depth: usize,
}

impl EvalContext {
    pub fn new(frame: Arc<Frame>) -> Self {
        Self {
            mode: EvalMode::DEFAULT,
            frame,
            call_stack: None,
            deadline: None,
            max_depth: PhyslConfig::default().max_recursion_depth,
        }
    }

    /// Context honouring the recursion limit, deadline and execution mode of `config`
    pub fn from_config(frame: Arc<Frame>, config: &PhyslConfig) -> Self {
        let mut ctx = Self::new(frame);
        ctx.max_depth = config.max_recursion_depth;
        ctx.deadline = config.eval_timeout().map(|timeout| Instant::now() + timeout);
        if config.direct_execution {
            ctx.mode = ctx.mode.with(EvalMode::DIRECT_EXECUTION);
        }
        ctx
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    pub fn with_mode(&self, mode: EvalMode) -> Self {
        Self { mode, ..self.clone() }
    }

    pub fn add_mode(&self, flag: EvalMode) -> Self {
        self.with_mode(self.mode.with(flag))
    }

    pub fn remove_mode(&self, flag: EvalMode) -> Self {
        self.with_mode(self.mode.without(flag))
    }

    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    pub fn with_frame(&self, frame: Arc<Frame>) -> Self {
        Self { frame, ..self.clone() }
    }

    /// Copy whose frame is a fresh child of the current frame
    pub fn with_child_frame(&self) -> Self {
        self.with_frame(Frame::child(&self.frame))
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn with_max_depth(&self, max_depth: usize) -> Self {
        Self { max_depth, ..self.clone() }
    }

    pub fn call_stack(&self) -> Option<&Arc<CallFrame>> {
        self.call_stack.as_ref()
    }

    /// Number of active function invocations
    pub fn depth(&self) -> usize {
        self.call_stack.as_ref().map_or(0, |frame| frame.depth)
    }

    /// Copy with `function` pushed onto the call stack; fails past the recursion limit
    pub fn enter_call(&self, function: &str, instance: &str) -> PrimitiveResult<Self> {
        let depth = self.depth() + 1;
        if depth > self.max_depth {
            return Err(PrimitiveError::RecursionLimit {
                instance: instance.to_string(),
                limit: self.max_depth,
            });
        }
        Ok(Self {
            call_stack: Some(Arc::new(CallFrame {
                function: function.to_string(),
                depth,
                parent: self.call_stack.clone(),
            })),
            ..self.clone()
        })
    }

    /// Fails once the deadline has passed
    pub fn check_deadline(&self, instance: &str) -> PrimitiveResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(PrimitiveError::Timeout {
                instance: instance.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Function names on the call stack, innermost first
    pub fn backtrace(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut frame = self.call_stack.as_ref();
        while let Some(current) = frame {
            names.push(current.function.clone());
            frame = current.parent.as_ref();
        }
        names
    }
}
