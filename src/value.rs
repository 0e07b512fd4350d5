use std::{cell::Cell, fmt, rc::Rc};

use crate::{
    backward::topological_order,
    ops::{Op, OpTag},
};

pub(crate) struct ValuePayload {
    pub(crate) name: Option<String>,
    pub(crate) op: Op,
    pub(crate) data: f64,
    pub(crate) grad: Cell<f64>,
}

impl ValuePayload {
    fn new(name: Option<String>, op: Op, data: f64) -> Self {
        Self {
            name,
            op,
            data,
            grad: Cell::new(0.),
        }
    }
}

/// Long chains of operands would otherwise be released by nested `drop` calls,
/// one stack frame per node. Unlink them into a work list instead.
impl Drop for ValuePayload {
    fn drop(&mut self) {
        let mut pending = self.op.take_operands();
        while let Some(value) = pending.pop() {
            if let Ok(mut payload) = Rc::try_unwrap(value.0) {
                pending.extend(payload.op.take_operands());
            }
        }
    }
}

/// A tracked scalar in a dynamic computation graph.
///
/// Cloning a `Value` clones the handle, not the node: both handles refer to
/// the same data and the same gradient accumulator. A node lives as long as
/// some handle or some downstream node refers to it.
#[derive(Clone)]
pub struct Value(pub(crate) Rc<ValuePayload>);

impl Value {
    /// Creates a leaf node with no operands.
    pub fn new(data: f64) -> Value {
        Self(Rc::new(ValuePayload::new(None, Op::Leaf, data)))
    }

    /// Creates a leaf node carrying a label for diagnostics.
    pub fn named(name: impl Into<String>, data: f64) -> Value {
        Self(Rc::new(ValuePayload::new(Some(name.into()), Op::Leaf, data)))
    }

    pub(crate) fn from_op(op: Op, data: f64) -> Value {
        #[cfg(feature = "expr_name")]
        let name = Some(op.expr_name());
        #[cfg(not(feature = "expr_name"))]
        let name = None;
        Self(Rc::new(ValuePayload::new(name, op, data)))
    }

    /// The forward value. Never changes after construction.
    pub fn data(&self) -> f64 {
        self.0.data
    }

    pub fn grad(&self) -> f64 {
        self.0.grad.get()
    }

    /// Resets this node's gradient to zero. Other nodes are left untouched.
    pub fn zero_grad(&self) {
        self.0.grad.set(0.);
    }

    /// Resets the gradient of this node and of every node it depends on.
    pub fn zero_grad_all(&self) {
        for node in topological_order(self) {
            node.zero_grad();
        }
    }

    pub(crate) fn accumulate(&self, grad: f64) {
        self.0.grad.set(self.0.grad.get() + grad);
    }

    pub(crate) fn seed(&self) {
        self.0.grad.set(1.);
    }

    /// The operation that produced this node.
    pub fn op(&self) -> OpTag {
        self.0.op.tag()
    }

    /// Operand handles in argument order. Empty for a leaf.
    pub fn operands(&self) -> Vec<Value> {
        self.0.op.operands().into_iter().flatten().cloned().collect()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.0.op, Op::Leaf)
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    /// Label used in diagnostics: the name if one was given, the data of an
    /// anonymous leaf, or the operation tag.
    pub fn label(&self) -> String {
        match (&self.0.name, &self.0.op) {
            (Some(name), _) => name.clone(),
            (None, Op::Leaf) => format!("{}", self.0.data),
            (None, op) => op.tag().to_string(),
        }
    }

    /// Returns true if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl From<f64> for Value {
    fn from(data: f64) -> Self {
        Value::new(data)
    }
}

impl From<i32> for Value {
    fn from(data: i32) -> Self {
        Value::new(data as f64)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value(data={}, grad={})", self.data(), self.grad())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("label", &self.label())
            .field("data", &self.data())
            .field("grad", &self.grad())
            .field("op", &self.op())
            .finish()
    }
}
