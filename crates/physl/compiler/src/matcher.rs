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

//! Structural matching of expressions against pattern templates.
//!
//! In a template, `_N` matches any single expression and `__N` matches the
//! remaining (possibly empty) run of arguments or list items. Everything else
//! must match structurally.

use crate::ast::Expression;

/// A placeholder occurring in a pattern template
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Placeholder {
    pub index: usize,
    /// `__N`: binds a run of expressions
    pub rest: bool,
}

impl Placeholder {
    /// Recognize `_N` / `__N`
    pub fn parse(name: &str) -> Option<Self> {
        let (digits, rest) = match name.strip_prefix("__") {
            Some(digits) => (digits, true),
            None => (name.strip_prefix('_')?, false),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self { index: digits.parse().ok()?, rest })
    }

    fn of(expression: &Expression) -> Option<Self> {
        expression.as_identifier().and_then(|id| Self::parse(&id.name))
    }
}

/// Candidate-side expressions bound to one placeholder
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Binding<'a> {
    Single(&'a Expression),
    Rest(&'a [Expression]),
}

/// Match `candidate` against `pattern`.
///
/// On a full match `on_match` is called once per placeholder, in template
/// order, with the pattern-side placeholder node and what it bound, and the
/// result is true. On a mismatch nothing is reported.
pub fn match_ast<'a, 'p>(candidate: &'a Expression, pattern: &'p Expression, mut on_match: impl FnMut(&'p Expression, Binding<'a>)) -> bool {
    let mut bindings = Vec::new();
    if !match_node(candidate, pattern, &mut bindings) {
        return false;
    }
    for (placeholder, binding) in bindings {
        on_match(placeholder, binding);
    }
    true
}

/// Placeholder bindings keyed by placeholder, or `None` on mismatch
pub fn bind_placeholders<'a>(candidate: &'a Expression, pattern: &Expression) -> Option<Vec<(Placeholder, Binding<'a>)>> {
    let mut bound = Vec::new();
    let matched = match_ast(candidate, pattern, |node, binding| {
        if let Some(placeholder) = Placeholder::of(node) {
            bound.push((placeholder, binding));
        }
    });
    matched.then(|| {
        bound.sort_by_key(|(placeholder, _)| *placeholder);
        bound
    })
}

type Bindings<'a, 'p> = Vec<(&'p Expression, Binding<'a>)>;

fn match_node<'a, 'p>(candidate: &'a Expression, pattern: &'p Expression, bindings: &mut Bindings<'a, 'p>) -> bool {
    if let Some(placeholder) = Placeholder::of(pattern) {
        if placeholder.rest {
            // a rest placeholder outside an argument list binds a single expression
            bindings.push((pattern, Binding::Rest(std::slice::from_ref(candidate))));
        } else {
            bindings.push((pattern, Binding::Single(candidate)));
        }
        return true;
    }

    match (candidate, pattern) {
        (Expression::Identifier(a), Expression::Identifier(b)) => a.name == b.name,
        (Expression::Literal(a), Expression::Literal(b)) => a == b,
        (Expression::Unary { op: a, operand: x, .. }, Expression::Unary { op: b, operand: y, .. }) => a == b && match_node(x, y, bindings),
        (Expression::Operation { op: a, lhs: l1, rhs: r1, .. }, Expression::Operation { op: b, lhs: l2, rhs: r2, .. }) => {
            a == b && match_node(l1, l2, bindings) && match_node(r1, r2, bindings)
        }
        (Expression::Call { function: f1, args: a1 }, Expression::Call { function: f2, args: a2 }) => f1.name == f2.name && match_sequence(a1, a2, bindings),
        (Expression::List { items: a, .. }, Expression::List { items: b, .. }) => match_sequence(a, b, bindings),
        _ => false,
    }
}

fn match_sequence<'a, 'p>(candidates: &'a [Expression], patterns: &'p [Expression], bindings: &mut Bindings<'a, 'p>) -> bool {
    let rest = patterns.iter().position(|p| Placeholder::of(p).is_some_and(|placeholder| placeholder.rest));
    let Some(rest) = rest else {
        return candidates.len() == patterns.len() && candidates.iter().zip(patterns).all(|(c, p)| match_node(c, p, bindings));
    };

    let suffix = patterns.len() - rest - 1;
    if candidates.len() < rest + suffix {
        return false;
    }
    let tail = candidates.len() - suffix;
    if !candidates[..rest].iter().zip(&patterns[..rest]).all(|(c, p)| match_node(c, p, bindings)) {
        return false;
    }
    bindings.push((&patterns[rest], Binding::Rest(&candidates[rest..tail])));
    candidates[tail..].iter().zip(&patterns[rest + 1..]).all(|(c, p)| match_node(c, p, bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn expr(source: &str) -> Expression {
        parse_expression(source).unwrap()
    }

    #[test]
    fn test_placeholder_names() {
        assert_eq!(Placeholder::parse("_1"), Some(Placeholder { index: 1, rest: false }));
        assert_eq!(Placeholder::parse("__2"), Some(Placeholder { index: 2, rest: true }));
        assert_eq!(Placeholder::parse("_x"), None);
        assert_eq!(Placeholder::parse("_"), None);
        assert_eq!(Placeholder::parse("x_1"), None);
    }

    #[test]
    fn test_callback_pairs() {
        let candidate = expr("if(a > 1, b, c)");
        let pattern = expr("if(_1, _2, _3)");
        let mut seen = Vec::new();
        assert!(match_ast(&candidate, &pattern, |p, binding| {
            if let Binding::Single(c) = binding {
                seen.push((p.to_string(), c.to_string()));
            }
        }));
        assert_eq!(seen, vec![("_1".to_string(), "a > 1".to_string()), ("_2".into(), "b".into()), ("_3".into(), "c".into())]);
    }

    #[test]
    fn test_arity_mismatch_reports_nothing() {
        let mut calls = 0;
        assert!(!match_ast(&expr("shape(x, 1)"), &expr("shape(_1)"), |_, _| calls += 1));
        assert_eq!(calls, 0);
        assert!(match_ast(&expr("shape(x, 1)"), &expr("shape(_1, _2)"), |_, _| calls += 1));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_rest_binds_remaining_arguments() {
        let candidate = expr("map(f, a, b, c)");
        let bound = bind_placeholders(&candidate, &expr("map(_1, __2)")).unwrap();
        assert_eq!(bound.len(), 2);
        assert!(matches!(bound[1].1, Binding::Rest(items) if items.len() == 3));

        let empty = expr("list()");
        let bound = bind_placeholders(&empty, &expr("list(__1)")).unwrap();
        assert!(matches!(bound[0].1, Binding::Rest(items) if items.is_empty()));

        assert!(bind_placeholders(&expr("map()"), &expr("map(_1, __2)")).is_none());
    }

    #[test]
    fn test_operators_and_lists() {
        assert!(bind_placeholders(&expr("a + b * c"), &expr("_1 + _2")).is_some());
        assert!(bind_placeholders(&expr("a - b"), &expr("_1 + _2")).is_none());
        assert!(bind_placeholders(&expr("-x"), &expr("-_1")).is_some());
        assert!(bind_placeholders(&expr("[1, 2]"), &expr("[__1]")).is_some());
        assert!(bind_placeholders(&expr("f(x)"), &expr("g(_1)")).is_none());
    }
}
