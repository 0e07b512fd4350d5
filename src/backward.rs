//! Reverse-mode traversal of the graph reachable from a node.

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use crate::value::Value;

/// Every node reachable from `root`, each exactly once, operands before the
/// nodes that consume them. `root` comes last.
///
/// Uses an explicit stack so that deep graphs do not exhaust the call stack.
pub(crate) fn topological_order(root: &Value) -> Vec<Value> {
    let mut order = vec![];
    let mut visited = HashSet::new();
    let mut stack = vec![(root.clone(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        if !visited.insert(node.id()) {
            continue;
        }
        stack.push((node.clone(), true));
        // Reversed so that the first operand is visited first.
        for operand in node.0.op.operands().into_iter().flatten().rev() {
            if !visited.contains(&operand.id()) {
                stack.push((operand.clone(), false));
            }
        }
    }
    order
}

/// Partial derivatives of one root with respect to every node it depends on.
pub struct Gradients {
    nodes: Vec<Value>,
    grads: Vec<f64>,
    index: HashMap<usize, usize>,
}

impl Gradients {
    fn compute(root: &Value) -> Self {
        let nodes = topological_order(root);
        let index: HashMap<usize, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id(), i))
            .collect();
        let mut grads = vec![0.; nodes.len()];
        if let Some(seed) = grads.last_mut() {
            *seed = 1.;
        }

        for (i, node) in nodes.iter().enumerate().rev() {
            let grad = grads[i];
            trace!("propagate {} ({}): grad {grad}", node.label(), node.data());
            node.0.op.propagate(node.data(), grad, |operand, contribution| {
                if let Some(&j) = index.get(&operand.id()) {
                    grads[j] += contribution;
                }
            });
        }

        Self {
            nodes,
            grads,
            index,
        }
    }

    /// The derivative with respect to `var`, or zero if the root does not
    /// depend on it.
    pub fn wrt(&self, var: &Value) -> f64 {
        self.index
            .get(&var.id())
            .map_or(0., |&i| self.grads[i])
    }

    /// Number of nodes the root depends on, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes paired with their derivative, operands before consumers.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, f64)> + '_ {
        self.nodes.iter().zip(self.grads.iter().copied())
    }
}

impl Value {
    /// Backpropagates from this node.
    ///
    /// Seeds this node's gradient with 1 and adds the derivative of this node
    /// into the gradient of every node it depends on. Gradients are never
    /// cleared here: calling it twice without [`Value::zero_grad_all`] in
    /// between doubles every ancestor's gradient.
    pub fn backward(&self) {
        let gradients = Gradients::compute(self);
        debug!("backward over {} nodes", gradients.len());
        for (node, grad) in gradients.iter() {
            if node.ptr_eq(self) {
                node.seed();
            } else {
                node.accumulate(grad);
            }
        }
    }

    /// One-time derivation. Does not update internal gradient values.
    pub fn gradients(&self) -> Gradients {
        Gradients::compute(self)
    }

    /// Derivative of this node with respect to `var`, leaving gradients untouched.
    pub fn derive(&self, var: &Value) -> f64 {
        self.gradients().wrt(var)
    }
}
