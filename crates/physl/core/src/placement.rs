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

//! Where primitive nodes are created.
//!
//! The compiler hands every registered factory call to a [`Placement`]. The
//! local placement builds the node in place; the channel placement hosts
//! nodes on a worker task and returns proxies that forward evaluation over a
//! channel, so callers see the same future interface either way.

use crate::context::EvalContext;
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::primitive::{Primitive, PrimitiveFactory, PrimitiveHandle, PrimitiveInstance};
use crate::value::Value;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

pub type LocalityId = u32;

/// Creates nodes of a primitive type at some locality
pub trait Placement: Send + Sync + Debug {
    fn locality(&self) -> LocalityId;

    fn create_node(&self, factory: PrimitiveFactory, operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle>;
}

/// Nodes live where they are created
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPlacement;

impl Placement for LocalPlacement {
    fn locality(&self) -> LocalityId {
        0
    }

    fn create_node(&self, factory: PrimitiveFactory, operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        factory(operands, instance)
    }
}

enum Request {
    Register {
        id: usize,
        node: PrimitiveHandle,
    },
    Eval {
        id: usize,
        args: Vec<Value>,
        ctx: EvalContext,
        reply: oneshot::Sender<PrimitiveResult<Value>>,
    },
    Store {
        id: usize,
        value: Value,
        ctx: EvalContext,
        reply: oneshot::Sender<PrimitiveResult<()>>,
    },
}

/// Nodes hosted by a worker task, reached through an mpsc channel
#[derive(Debug)]
pub struct ChannelPlacement {
    locality: LocalityId,
    sender: mpsc::UnboundedSender<Request>,
    next_id: AtomicUsize,
}

impl ChannelPlacement {
    /// Start the worker for `locality` on the current runtime
    pub fn spawn(locality: LocalityId) -> PrimitiveResult<Self> {
        let handle = Handle::try_current().map_err(|e| PrimitiveError::Placement {
            locality,
            message: format!("no async runtime to host the worker: {}", e),
        })?;
        let (sender, receiver) = mpsc::unbounded_channel();
        handle.spawn(run_worker(locality, receiver));
        debug!("started worker for locality {}", locality);
        Ok(Self {
            locality,
            sender,
            next_id: AtomicUsize::new(0),
        })
    }
}

impl Placement for ChannelPlacement {
    fn locality(&self) -> LocalityId {
        self.locality
    }

    fn create_node(&self, factory: PrimitiveFactory, operands: Vec<Value>, instance: PrimitiveInstance) -> PrimitiveResult<PrimitiveHandle> {
        let proxy_instance = PrimitiveInstance::new(instance.type_name(), instance.name(), instance.codename());
        let node = factory(operands, instance)?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let proxy = RemotePrimitive {
            id,
            locality: self.locality,
            sender: self.sender.clone(),
            instance: proxy_instance,
            operands: node.operands().to_vec(),
            bindable: node.is_bindable(),
        };
        self.sender.send(Request::Register { id, node }).map_err(|_| proxy.unreachable())?;
        Ok(PrimitiveHandle::new(proxy))
    }
}

async fn run_worker(locality: LocalityId, mut receiver: mpsc::UnboundedReceiver<Request>) {
    let mut nodes: HashMap<usize, PrimitiveHandle> = HashMap::new();
    while let Some(request) = receiver.recv().await {
        match request {
            Request::Register { id, node } => {
                nodes.insert(id, node);
            }
            Request::Eval { id, args, ctx, reply } => {
                let Some(node) = nodes.get(&id).cloned() else {
                    warn!("locality {}: evaluation of unknown node {}", locality, id);
                    continue;
                };
                tokio::spawn(async move {
                    let result = match node.eval(args, &ctx) {
                        Ok(future) => future.await,
                        Err(e) => Err(e),
                    };
                    let _ = reply.send(result);
                });
            }
            Request::Store { id, value, ctx, reply } => {
                let Some(node) = nodes.get(&id).cloned() else {
                    warn!("locality {}: store into unknown node {}", locality, id);
                    continue;
                };
                tokio::spawn(async move {
                    let _ = reply.send(node.store(value, &ctx).await);
                });
            }
        }
    }
    debug!("worker for locality {} stopped", locality);
}

/// Proxy for a node hosted by a [`ChannelPlacement`] worker
#[derive(Debug)]
pub struct RemotePrimitive {
    id: usize,
    locality: LocalityId,
    sender: mpsc::UnboundedSender<Request>,
    instance: PrimitiveInstance,
    operands: Vec<Value>,
    bindable: bool,
}

impl RemotePrimitive {
    pub fn locality(&self) -> LocalityId {
        self.locality
    }

    fn unreachable(&self) -> PrimitiveError {
        PrimitiveError::Placement {
            locality: self.locality,
            message: format!("node {} is unreachable", self.instance.name()),
        }
    }
}

impl Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Request::Register { id, .. } => write!(f, "Register({})", id),
            Request::Eval { id, .. } => write!(f, "Eval({})", id),
            Request::Store { id, .. } => write!(f, "Store({})", id),
        }
    }
}

#[async_trait]
impl Primitive for RemotePrimitive {
    fn instance(&self) -> &PrimitiveInstance {
        &self.instance
    }

    fn operands(&self) -> &[Value] {
        &self.operands
    }

    async fn eval(&self, args: Vec<Value>, ctx: EvalContext) -> PrimitiveResult<Value> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request::Eval { id: self.id, args, ctx, reply })
            .map_err(|_| self.unreachable())?;
        response.await.map_err(|_| self.unreachable())?
    }

    fn is_bindable(&self) -> bool {
        self.bindable
    }

    async fn store(&self, value: Value, ctx: EvalContext) -> PrimitiveResult<()> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Request::Store { id: self.id, value, ctx, reply })
            .map_err(|_| self.unreachable())?;
        response.await.map_err(|_| self.unreachable())?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution_tree::store;
    use crate::execution_tree::AccessVariable;
    use crate::frame::Frame;
    use crate::kernels::arithmetic;

    #[tokio::test]
    async fn test_local_placement_calls_factory() {
        let node = LocalPlacement
            .create_node(arithmetic::ADD_SPEC.create, vec![Value::from(1_i64), Value::from(2_i64)], PrimitiveInstance::anonymous("__add"))
            .unwrap();
        assert_eq!(node.eval_value(&EvalContext::new(Frame::root())).await.unwrap(), Value::from(3_i64));
    }

    #[tokio::test]
    async fn test_channel_placement_evaluates_remotely() {
        let placement = ChannelPlacement::spawn(1).unwrap();
        assert_eq!(placement.locality(), 1);

        let node = placement
            .create_node(arithmetic::MUL_SPEC.create, vec![Value::from(6_i64), Value::from(7_i64)], PrimitiveInstance::new("__mul", "__mul$0$main/1:1", "test"))
            .unwrap();
        assert_eq!(node.name(), "__mul$0$main/1:1");
        assert_eq!(node.eval_value(&EvalContext::new(Frame::root())).await.unwrap(), Value::from(42_i64));
        assert_eq!(node.instance().stats().count(), 1);
    }

    #[tokio::test]
    async fn test_remote_errors_propagate() {
        let placement = ChannelPlacement::spawn(1).unwrap();
        let node = placement
            .create_node(arithmetic::DIV_SPEC.create, vec![Value::from(1_i64), Value::from(0_i64)], PrimitiveInstance::anonymous("__div"))
            .unwrap();
        let error = node.eval_value(&EvalContext::new(Frame::root())).await.unwrap_err();
        assert!(error.to_string().contains("division by zero"));
    }

    #[tokio::test]
    async fn test_remote_store_target() {
        let placement = ChannelPlacement::spawn(2).unwrap();
        let globals = Frame::root();
        globals.define("x", Value::from(1_i64));

        let target = AccessVariable::create("x", PrimitiveInstance::anonymous("access-variable"));
        let node = placement
            .create_node(store::SPEC.create, vec![target.into(), Value::from(5_i64)], PrimitiveInstance::anonymous("store"))
            .unwrap();
        assert_eq!(node.eval_value(&EvalContext::new(globals.clone())).await.unwrap(), Value::Nil);
        assert_eq!(globals.lookup("x"), Some(Value::from(5_i64)));
    }

    #[test]
    fn test_channel_placement_needs_runtime() {
        let error = ChannelPlacement::spawn(3).unwrap_err();
        assert!(matches!(error, PrimitiveError::Placement { locality: 3, .. }));
    }

    #[test]
    fn test_construction_errors_stay_synchronous() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let _guard = runtime.enter();
        let placement = ChannelPlacement::spawn(1).unwrap();
        let result = placement.create_node(store::SPEC.create, vec![Value::from(3_i64), Value::from(5_i64)], PrimitiveInstance::anonymous("store"));
        assert!(result.unwrap_err().is_type_error());
    }
}
