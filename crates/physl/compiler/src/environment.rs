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

use physl_core::{Frame, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Names visible while compiling, plus the run-time frame of globals.
///
/// Compile scopes only record *which* names exist; values live in
/// [`Frame`]s at run time. Globals defined through [`define_variable`]
/// are visible to every snippet compiled against this environment.
///
/// [`define_variable`]: Environment::define_variable
#[derive(Debug)]
pub struct Environment {
    globals: Arc<Frame>,
    scopes: Vec<HashSet<String>>,
}

impl Environment {
    pub fn new() -> Self {
        Self {
            globals: Frame::root(),
            scopes: vec![HashSet::new()],
        }
    }

    pub fn globals(&self) -> &Arc<Frame> {
        &self.globals
    }

    /// Bind a global before (or between) compilations
    pub fn define_variable(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.globals.define(name.clone(), value);
        self.declare(name);
    }

    /// Current value of a global
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.globals.lookup(name)
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    pub(crate) fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub(crate) fn declare(&mut self, name: impl Into<String>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into());
        }
    }

    /// Bound in a compile scope
    pub(crate) fn is_declared(&self, name: &str) -> bool {
        self.scopes.iter().rev().any(|scope| scope.contains(name))
    }

    /// Bound at compile time or already present among the globals
    pub fn resolves(&self, name: &str) -> bool {
        self.is_declared(name) || self.globals.is_bound(name)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_shadow_and_pop() {
        let mut env = Environment::new();
        env.push_scope();
        env.declare("x");
        assert!(env.resolves("x"));
        env.pop_scope();
        assert!(!env.resolves("x"));

        // the outermost scope is never removed
        env.pop_scope();
        env.declare("y");
        assert!(env.resolves("y"));
    }

    #[test]
    fn test_define_variable() {
        let mut env = Environment::new();
        env.define_variable("pi", Value::from(2.5));
        assert!(env.resolves("pi"));
        assert_eq!(env.variable("pi"), Some(Value::from(2.5)));
        assert_eq!(env.variable("tau"), None);
    }
}
