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

//! Expressions to execution trees.
//!
//! Calls, operators and list literals are matched against the registry and
//! become primitive nodes; identifiers become run-time variable accesses.
//! Every node gets an instance name `type$sequence$site/line:column`, where
//! the site is the enclosing definition (`main` at the top level).

use crate::ast::{Expression, Identifier, Literal};
use crate::environment::Environment;
use crate::function::Function;
use crate::matcher::{bind_placeholders, Binding};
use crate::parser::{generate_ast, ParseError, Position};
use crate::registry::{PatternKind, PatternRegistry, SpecialForm};
use physl_common::PhyslConfig;
use physl_core::execution_tree::{AccessFunction, AccessVariable, Block, CallFunction, DefineVariable, Lambda};
use physl_core::{LocalPlacement, Placement, PrimitiveError, PrimitiveInstance, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, trace};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{codename}({position}): unbound identifier '{name}'")]
    UnboundIdentifier { name: String, position: Position, codename: String },

    #[error("{codename}({position}): could not fully pattern-match: {expression}")]
    PatternMatchFailure { expression: String, position: Position, codename: String },

    #[error("{codename}({position}): malformed {form}: {message}")]
    MalformedForm {
        form: &'static str,
        message: String,
        position: Position,
        codename: String,
    },

    /// A factory rejected its operands
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

impl CompileError {
    pub fn is_type_error(&self) -> bool {
        matches!(self, CompileError::Primitive(e) if e.is_type_error())
    }
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Turns expressions into [`Function`]s using a registry and a placement
#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Arc<PatternRegistry>,
    placement: Arc<dyn Placement>,
    config: PhyslConfig,
}

impl Compiler {
    pub fn new(registry: Arc<PatternRegistry>) -> Self {
        Self {
            registry,
            placement: Arc::new(LocalPlacement),
            config: PhyslConfig::default(),
        }
    }

    /// Compiler over the process-wide default registry
    pub fn with_default_registry() -> CompileResult<Self> {
        Ok(Self::new(PatternRegistry::global()?))
    }

    /// Where pattern-matched nodes are created
    pub fn with_placement(mut self, placement: Arc<dyn Placement>) -> Self {
        self.placement = placement;
        self
    }

    /// Settings handed to every compiled function
    pub fn with_config(mut self, config: PhyslConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &PhyslConfig {
        &self.config
    }

    #[instrument(skip(self, source, env))]
    pub fn compile_source(&self, codename: &str, source: &str, env: &mut Environment) -> CompileResult<Function> {
        let expressions = generate_ast(source).map_err(|e| e.with_codename(codename))?;
        self.compile(codename, &expressions, env)
    }

    /// Compile top-level expressions; definitions among them see each other
    pub fn compile(&self, codename: &str, expressions: &[Expression], env: &mut Environment) -> CompileResult<Function> {
        let mut pass = CompilePass {
            registry: &self.registry,
            placement: self.placement.as_ref(),
            env,
            codename,
            sequence: HashMap::new(),
            sites: vec!["main".to_string()],
        };
        pass.predeclare(expressions);
        let compiled = expressions.iter().map(|expression| pass.compile(expression)).collect::<CompileResult<Vec<_>>>()?;
        debug!("compiled {} expressions from {}", compiled.len(), codename);

        let globals = pass.env.globals().clone();
        Ok(Function::new(codename, compiled, globals, self.config.clone()))
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Nil => Value::Nil,
        Literal::Bool(b) => Value::from(*b),
        Literal::Int(i) => Value::from(*i),
        Literal::Float(x) => Value::from(*x),
        Literal::Str(s) => Value::from(s.as_str()),
    }
}

/// State of one compilation
struct CompilePass<'c> {
    registry: &'c PatternRegistry,
    placement: &'c dyn Placement,
    env: &'c mut Environment,
    codename: &'c str,
    sequence: HashMap<String, usize>,
    /// Enclosing definitions, innermost last
    sites: Vec<String>,
}

impl CompilePass<'_> {
    fn instance(&mut self, type_name: &str, position: Option<Position>) -> PrimitiveInstance {
        let counter = self.sequence.entry(type_name.to_string()).or_insert(0);
        let sequence = *counter;
        *counter += 1;

        let site = self.sites.last().map_or("main", String::as_str);
        let name = match position {
            Some(position) => format!("{}${}${}/{}", type_name, sequence, site, position),
            None => format!("{}${}${}", type_name, sequence, site),
        };
        PrimitiveInstance::new(type_name, name, self.codename)
    }

    fn position_of(expression: &Expression) -> Position {
        expression.position().unwrap_or_else(Position::unknown)
    }

    fn malformed(&self, form: &'static str, expression: &Expression, message: impl Into<String>) -> CompileError {
        CompileError::MalformedForm {
            form,
            message: message.into(),
            position: Self::position_of(expression),
            codename: self.codename.to_string(),
        }
    }

    fn unbound(&self, identifier: &Identifier) -> CompileError {
        CompileError::UnboundIdentifier {
            name: identifier.name.clone(),
            position: identifier.position.unwrap_or_else(Position::unknown),
            codename: self.codename.to_string(),
        }
    }

    /// Declare the names of `define`s among `expressions` up front
    fn predeclare<'e>(&mut self, expressions: impl IntoIterator<Item = &'e Expression>) {
        for expression in expressions {
            if let Expression::Call { function, args } = expression {
                if function.name == "define" {
                    if let Some(name) = args.first().and_then(Expression::as_identifier) {
                        self.env.declare(name.name.clone());
                    }
                }
            }
        }
    }

    fn compile(&mut self, expression: &Expression) -> CompileResult<Value> {
        match expression {
            Expression::Literal(literal) => Ok(literal_value(literal)),
            Expression::Identifier(identifier) => self.compile_identifier(identifier),
            // locally bound names shadow primitives of the same name
            Expression::Call { function, args } if self.env.is_declared(&function.name) || !self.registry.has_name(&function.name) => {
                self.compile_call(function, args)
            }
            _ => self.compile_pattern(expression),
        }
    }

    fn compile_identifier(&mut self, identifier: &Identifier) -> CompileResult<Value> {
        if self.env.resolves(&identifier.name) {
            let instance = self.instance("access-variable", identifier.position);
            return Ok(AccessVariable::create(identifier.name.clone(), instance).into());
        }
        match self.registry.find_primitive(&identifier.name) {
            Some(spec) => {
                let instance = self.instance("access-function", identifier.position);
                Ok(AccessFunction::create(spec, instance).into())
            }
            None => Err(self.unbound(identifier)),
        }
    }

    fn compile_call(&mut self, function: &Identifier, args: &[Expression]) -> CompileResult<Value> {
        if !self.env.resolves(&function.name) {
            return Err(self.unbound(function));
        }
        let instance = self.instance("call-function", function.position);
        let callee = self.compile_identifier(function)?;
        let mut operands = vec![callee];
        for arg in args {
            operands.push(self.compile(arg)?);
        }
        Ok(CallFunction::create(operands, instance)?.into())
    }

    fn compile_pattern(&mut self, expression: &Expression) -> CompileResult<Value> {
        for entry in self.registry.candidates(expression) {
            let Some(bound) = bind_placeholders(expression, &entry.pattern) else {
                continue;
            };
            trace!(pattern = %entry.template, "matched {}", expression);

            let args: Vec<&Expression> = bound
                .into_iter()
                .flat_map(|(_, binding)| match binding {
                    Binding::Single(e) => std::slice::from_ref(e).iter(),
                    Binding::Rest(es) => es.iter(),
                })
                .collect();

            return match entry.kind {
                PatternKind::Special(SpecialForm::Define) => self.compile_define(expression, &args),
                PatternKind::Special(SpecialForm::Lambda) => self.compile_anonymous_lambda(expression, &args),
                PatternKind::Special(SpecialForm::Block) => self.compile_block(expression, &args),
                PatternKind::Primitive(spec) => {
                    let instance = self.instance(&entry.name, expression.position());
                    let operands = args.into_iter().map(|arg| self.compile(arg)).collect::<CompileResult<Vec<_>>>()?;
                    Ok(self.placement.create_node(spec.create, operands, instance)?.into())
                }
            };
        }

        Err(CompileError::PatternMatchFailure {
            expression: expression.to_string(),
            position: Self::position_of(expression),
            codename: self.codename.to_string(),
        })
    }

    fn parameters(&self, form: &'static str, expression: &Expression, params: &[&Expression]) -> CompileResult<Vec<String>> {
        params
            .iter()
            .map(|param| {
                param
                    .as_identifier()
                    .map(|id| id.name.clone())
                    .ok_or_else(|| self.malformed(form, expression, format!("parameter '{}' must be a name", param)))
            })
            .collect()
    }

    /// Compile `body` in a new scope holding `params`, under the site `name`
    fn compile_lambda(&mut self, name: &str, params: Vec<String>, body: &Expression, position: Option<Position>) -> CompileResult<Value> {
        let instance = self.instance("lambda", position);
        self.sites.push(name.to_string());
        self.env.push_scope();
        for param in &params {
            self.env.declare(param.clone());
        }
        let compiled = self.compile(body);
        self.env.pop_scope();
        self.sites.pop();
        Ok(Lambda::create(name, params, compiled?, instance)?.into())
    }

    fn compile_define(&mut self, expression: &Expression, args: &[&Expression]) -> CompileResult<Value> {
        let [name, rest @ ..] = args else {
            return Err(self.malformed("define", expression, "expected a name and a value"));
        };
        let Some((body, params)) = rest.split_last() else {
            return Err(self.malformed("define", expression, "expected a name and a value"));
        };
        let name = name
            .as_identifier()
            .map(|id| id.name.clone())
            .ok_or_else(|| self.malformed("define", expression, format!("'{}' is not a name", name)))?;

        let instance = self.instance("define-variable", expression.position());
        self.env.declare(name.clone());

        let value = if params.is_empty() {
            self.sites.push(name.clone());
            let compiled = self.compile(body);
            self.sites.pop();
            compiled?
        } else {
            let params = self.parameters("define", expression, params)?;
            self.compile_lambda(&name, params, body, expression.position())?
        };
        Ok(DefineVariable::create(name, value, instance)?.into())
    }

    fn compile_anonymous_lambda(&mut self, expression: &Expression, args: &[&Expression]) -> CompileResult<Value> {
        let Some((body, params)) = args.split_last() else {
            return Err(self.malformed("lambda", expression, "expected a body"));
        };
        let params = self.parameters("lambda", expression, params)?;
        self.compile_lambda("lambda", params, body, expression.position())
    }

    fn compile_block(&mut self, expression: &Expression, args: &[&Expression]) -> CompileResult<Value> {
        let instance = self.instance("block", expression.position());
        self.env.push_scope();
        self.predeclare(args.iter().copied());
        let compiled = args.iter().map(|arg| self.compile(arg)).collect::<CompileResult<Vec<_>>>();
        self.env.pop_scope();
        Ok(Block::create(compiled?, instance)?.into())
    }
}
