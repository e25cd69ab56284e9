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

//! Runtime variable frames.
//!
//! Frames form a parent chain; lookups walk from the innermost frame outwards.
//! Each frame's variables live in a shared [`Scope`], so several frame views can
//! sit over the same bindings.
//!
//! A closure stored into a frame on its own captured chain would keep that
//! frame alive through itself. Such closures are stored detached: they keep the
//! scopes between the holding frame and the captured frame, and the chain is
//! rebuilt over the holding frame when the value is read back. Lists and
//! dictionaries are detached element by element.

use crate::annotation;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Bindings of one frame
pub type Scope = RwLock<HashMap<String, Value>>;

pub struct Frame {
    parent: Option<Arc<Frame>>,
    variables: Arc<Scope>,
}

impl Frame {
    /// Outermost frame, used for globals
    pub fn root() -> Arc<Self> {
        Arc::new(Self {
            parent: None,
            variables: Arc::default(),
        })
    }

    pub fn child(parent: &Arc<Frame>) -> Arc<Self> {
        Arc::new(Self {
            parent: Some(Arc::clone(parent)),
            variables: Arc::default(),
        })
    }

    /// Frame chain over `self` with `scopes` layered outermost first
    pub(crate) fn rebuild(self: &Arc<Self>, scopes: &[Arc<Scope>]) -> Arc<Self> {
        scopes.iter().fold(Arc::clone(self), |parent, scope| {
            Arc::new(Self {
                parent: Some(parent),
                variables: Arc::clone(scope),
            })
        })
    }

    /// Scopes from just below `ancestor` down to this frame, outermost first;
    /// `None` if `ancestor` is not on this frame's chain
    pub(crate) fn scopes_below(self: &Arc<Self>, ancestor: &Frame) -> Option<Vec<Arc<Scope>>> {
        let mut scopes = Vec::new();
        let mut frame = Some(self);
        while let Some(current) = frame {
            if current.shares_scope(ancestor) {
                scopes.reverse();
                return Some(scopes);
            }
            scopes.push(Arc::clone(&current.variables));
            frame = current.parent.as_ref();
        }
        None
    }

    /// True if both frames view the same bindings
    pub fn shares_scope(&self, other: &Frame) -> bool {
        Arc::ptr_eq(&self.variables, &other.variables)
    }

    pub fn parent(&self) -> Option<&Arc<Frame>> {
        self.parent.as_ref()
    }

    /// Bind `name` in this frame, shadowing outer bindings
    pub fn define(self: &Arc<Self>, name: impl Into<String>, value: Value) {
        let value = self.detach(value);
        self.variables.write().insert(name.into(), value);
    }

    /// Value bound to `name` in this frame or the nearest enclosing one
    pub fn lookup(self: &Arc<Self>, name: &str) -> Option<Value> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if let Some(value) = current.variables.read().get(name) {
                return Some(current.reattach(value.clone()));
            }
            frame = current.parent.as_ref();
        }
        None
    }

    /// Rebind `name` in the nearest frame that defines it; false if unbound.
    ///
    /// Annotated values keep their generation history: the new value's
    /// generation is one past the value it replaces.
    pub fn assign(self: &Arc<Self>, name: &str, value: Value) -> bool {
        let Some(owner) = self.owner_of(name) else {
            return false;
        };
        let value = owner.detach(value);
        let mut variables = owner.variables.write();
        if let Some(slot) = variables.get_mut(name) {
            let previous = std::mem::take(slot);
            *slot = annotation::rebind_generation(&previous, value);
        }
        true
    }

    /// Update the value bound to `name` in place while holding the frame's write lock
    pub fn update<R>(self: &Arc<Self>, name: &str, f: impl FnOnce(&mut Value) -> R) -> Option<R> {
        let owner = self.owner_of(name)?;
        let mut variables = owner.variables.write();
        variables.get_mut(name).map(f)
    }

    /// True if `name` is bound in this frame or any enclosing one
    pub fn is_bound(&self, name: &str) -> bool {
        self.variables.read().contains_key(name) || self.parent.as_ref().is_some_and(|p| p.is_bound(name))
    }

    /// True if `name` is bound in this frame itself
    pub fn contains(&self, name: &str) -> bool {
        self.variables.read().contains_key(name)
    }

    /// Names bound in this frame, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth() + 1)
    }

    fn owner_of(self: &Arc<Self>, name: &str) -> Option<&Arc<Frame>> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if current.contains(name) {
                return Some(current);
            }
            frame = current.parent.as_ref();
        }
        None
    }

    fn detach(self: &Arc<Self>, value: Value) -> Value {
        match value {
            Value::Primitive(handle) => match handle.as_closure().and_then(|closure| closure.detach_from(self)) {
                Some(detached) => Value::Primitive(detached),
                None => Value::Primitive(handle),
            },
            Value::List(items) => Value::List(items.into_iter().map(|item| self.detach(item)).collect()),
            Value::Dict(dict) => Value::Dict(dict.map_values(|item| self.detach(item))),
            other => other,
        }
    }

    fn reattach(self: &Arc<Self>, value: Value) -> Value {
        match value {
            Value::Primitive(handle) => match handle.as_closure().and_then(|closure| closure.reattach(self)) {
                Some(attached) => Value::Primitive(attached),
                None => Value::Primitive(handle),
            },
            Value::List(items) => Value::List(items.into_iter().map(|item| self.reattach(item)).collect()),
            Value::Dict(dict) => Value::Dict(dict.map_values(|item| self.reattach(item))),
            other => other,
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame").field("depth", &self.depth()).field("names", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing() {
        let root = Frame::root();
        root.define("x", Value::from(1_i64));

        let child = Frame::child(&root);
        assert_eq!(child.lookup("x"), Some(Value::from(1_i64)));

        child.define("x", Value::from(2_i64));
        assert_eq!(child.lookup("x"), Some(Value::from(2_i64)));
        assert_eq!(root.lookup("x"), Some(Value::from(1_i64)));
        assert_eq!(child.depth(), 1);
    }

    #[test]
    fn test_assign_nearest_scope() {
        let root = Frame::root();
        root.define("x", Value::from(1_i64));
        let child = Frame::child(&root);

        assert!(child.assign("x", Value::from(5_i64)));
        assert_eq!(root.lookup("x"), Some(Value::from(5_i64)));
        assert!(!child.contains("x"));
        assert!(!child.assign("y", Value::Nil));
    }

    #[test]
    fn test_update_in_place() {
        let root = Frame::root();
        root.define("n", Value::from(1_i64));
        let child = Frame::child(&root);

        let updated = child.update("n", |value| {
            *value = Value::from(value.as_i64().unwrap_or(0) + 1);
        });
        assert!(updated.is_some());
        assert_eq!(root.lookup("n"), Some(Value::from(2_i64)));
        assert!(child.update("missing", |_| ()).is_none());
    }

    #[test]
    fn test_is_bound() {
        let root = Frame::root();
        root.define("a", Value::Nil);
        let child = Frame::child(&root);
        assert!(child.is_bound("a"));
        assert!(!child.contains("a"));
        assert!(!child.is_bound("b"));
    }

    #[test]
    fn test_scopes_below_ancestor() {
        let root = Frame::root();
        let middle = Frame::child(&root);
        let inner = Frame::child(&middle);
        inner.define("v", Value::from(1_i64));

        assert_eq!(inner.scopes_below(&root).map(|scopes| scopes.len()), Some(2));
        assert_eq!(inner.scopes_below(&inner).map(|scopes| scopes.len()), Some(0));
        assert!(root.scopes_below(&inner).is_none());

        let scopes = inner.scopes_below(&root).unwrap();
        let view = root.rebuild(&scopes);
        assert!(view.shares_scope(&inner));
        assert_eq!(view.lookup("v"), Some(Value::from(1_i64)));
        view.define("w", Value::Nil);
        assert!(inner.contains("w"));
    }
}
