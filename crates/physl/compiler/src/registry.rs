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

//! Pattern registry: which templates compile to which primitives.
//!
//! Entries are kept in registration order and candidates are tried in that
//! order; the first full match wins. Registering the same name twice appends
//! a second entry rather than replacing the first.

use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::parser::{parse_expression, ParseResult};
use parking_lot::RwLock;
use physl_core::{builtin_primitives, PrimitiveSpec};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

pub const NO_HELP: &str = "No help available";

/// Forms the compiler builds itself instead of calling a factory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    Define,
    Lambda,
    Block,
}

#[derive(Debug, Clone, Copy)]
pub enum PatternKind {
    Special(SpecialForm),
    Primitive(PrimitiveSpec),
}

/// First-level shape of an expression, used to narrow the candidates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternKey {
    Name(String),
    Binary(BinaryOp),
    Unary(UnaryOp),
    List,
}

impl PatternKey {
    /// `None` for identifiers and literals, which never match a pattern
    pub fn of(expression: &Expression) -> Option<Self> {
        match expression {
            Expression::Call { function, .. } => Some(PatternKey::Name(function.name.clone())),
            Expression::Operation { op, .. } => Some(PatternKey::Binary(*op)),
            Expression::Unary { op, .. } => Some(PatternKey::Unary(*op)),
            Expression::List { .. } => Some(PatternKey::List),
            Expression::Identifier(_) | Expression::Literal(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatternEntry {
    /// Registered type name, also the prefix of instance names
    pub name: String,
    pub template: String,
    pub pattern: Expression,
    pub kind: PatternKind,
    pub help: String,
    /// Where the entry came from: "builtin" or a plugin name
    pub origin: String,
}

/// Source of additional primitives
pub trait PrimitivePlugin: Send + Sync {
    fn name(&self) -> &str;

    fn primitives(&self) -> Vec<PrimitiveSpec>;
}

#[derive(Default)]
struct RegistryInner {
    entries: Vec<Arc<PatternEntry>>,
    by_key: HashMap<PatternKey, Vec<Arc<PatternEntry>>>,
}

#[derive(Default)]
pub struct PatternRegistry {
    inner: RwLock<RegistryInner>,
}

impl PatternRegistry {
    /// Registry without any entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the special forms and every built-in primitive
    pub fn with_builtins() -> ParseResult<Self> {
        let registry = Self::empty();
        registry.register_special(SpecialForm::Define, "define", &["define(__1)"], "define(name, value)\ndefine(name, params..., body)\n\nBinds a variable or a named function in the current scope.")?;
        registry.register_special(SpecialForm::Lambda, "lambda", &["lambda(__1)"], "lambda(params..., body)\n\nAn anonymous function capturing its enclosing scope.")?;
        registry.register_special(SpecialForm::Block, "block", &["block(__1)"], "block(expr...)\n\nEvaluates expressions in order in a new scope; yields the last value.")?;
        for spec in builtin_primitives() {
            registry.register_primitive(spec, "builtin")?;
        }
        Ok(registry)
    }

    /// Process-wide registry with the built-ins, created on first use
    pub fn global() -> ParseResult<Arc<PatternRegistry>> {
        static GLOBAL: OnceLock<ParseResult<Arc<PatternRegistry>>> = OnceLock::new();
        GLOBAL.get_or_init(|| PatternRegistry::with_builtins().map(Arc::new)).clone()
    }

    /// Append an entry for each template
    pub fn register_pattern(&self, name: &str, templates: &[&str], kind: PatternKind, help: &str, origin: &str) -> ParseResult<()> {
        let parsed = templates.iter().map(|template| Ok((template.to_string(), parse_expression(template)?))).collect::<ParseResult<Vec<_>>>()?;

        let mut inner = self.inner.write();
        for (template, pattern) in parsed {
            let Some(key) = PatternKey::of(&pattern) else {
                debug!("skipping template '{}' of '{}': nothing to match on", template, name);
                continue;
            };
            let entry = Arc::new(PatternEntry {
                name: name.to_string(),
                template,
                pattern,
                kind,
                help: help.to_string(),
                origin: origin.to_string(),
            });
            inner.entries.push(entry.clone());
            inner.by_key.entry(key).or_default().push(entry);
        }
        Ok(())
    }

    pub fn register_primitive(&self, spec: PrimitiveSpec, origin: &str) -> ParseResult<()> {
        self.register_pattern(spec.name, spec.patterns, PatternKind::Primitive(spec), spec.help, origin)
    }

    fn register_special(&self, form: SpecialForm, name: &str, templates: &[&str], help: &str) -> ParseResult<()> {
        self.register_pattern(name, templates, PatternKind::Special(form), help, "builtin")
    }

    /// Register everything a plugin provides, after the existing entries
    pub fn register_plugin(&self, plugin: &dyn PrimitivePlugin) -> ParseResult<()> {
        let primitives = plugin.primitives();
        debug!("registering {} primitives from plugin '{}'", primitives.len(), plugin.name());
        for spec in primitives {
            self.register_primitive(spec, plugin.name())?;
        }
        Ok(())
    }

    /// Entries that could match `expression`, in registration order
    pub fn candidates(&self, expression: &Expression) -> Vec<Arc<PatternEntry>> {
        let Some(key) = PatternKey::of(expression) else {
            return Vec::new();
        };
        self.inner.read().by_key.get(&key).cloned().unwrap_or_default()
    }

    /// Whether any entry is keyed by the function name `name`
    pub fn has_name(&self, name: &str) -> bool {
        self.inner.read().by_key.contains_key(&PatternKey::Name(name.to_string()))
    }

    /// Primitive of the first entry named `name`; special forms have none
    pub fn find_primitive(&self, name: &str) -> Option<PrimitiveSpec> {
        self.inner.read().entries.iter().find_map(|entry| match entry.kind {
            PatternKind::Primitive(spec) if entry.name == name => Some(spec),
            _ => None,
        })
    }

    /// Help text of the first entry named `name` that has any
    pub fn find_help(&self, name: &str) -> String {
        self.inner
            .read()
            .entries
            .iter()
            .find(|entry| entry.name == name && !entry.help.is_empty())
            .map_or_else(|| NO_HELP.to_string(), |entry| entry.help.clone())
    }

    /// All entries in registration order
    pub fn entries(&self) -> Vec<Arc<PatternEntry>> {
        self.inner.read().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRegistry").field("entries", &self.len()).finish()
    }
}
