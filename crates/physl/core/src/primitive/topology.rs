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

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use std::collections::HashMap;

/// Shape of a compiled expression: instance names and their operand nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpressionTopology {
    pub name: String,
    pub children: Vec<ExpressionTopology>,
}

impl ExpressionTopology {
    pub fn new(name: impl Into<String>, children: Vec<ExpressionTopology>) -> Self {
        Self { name: name.into(), children }
    }

    pub fn leaf(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// All instance names, depth first
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for child in &self.children {
            names.extend(child.names());
        }
        names
    }

    /// Graph with one vertex per distinct instance name; shared nodes appear once
    pub fn to_graph(&self) -> DiGraph<String, ()> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        self.add_to(&mut graph, &mut index);
        graph
    }

    pub fn to_dot(&self) -> String {
        let graph = self.to_graph();
        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    fn add_to(&self, graph: &mut DiGraph<String, ()>, index: &mut HashMap<String, NodeIndex>) -> NodeIndex {
        if let Some(&node) = index.get(&self.name) {
            return node;
        }
        let node = graph.add_node(self.name.clone());
        index.insert(self.name.clone(), node);
        for child in &self.children {
            let child_node = child.add_to(graph, index);
            graph.update_edge(node, child_node, ());
        }
        node
    }
}
