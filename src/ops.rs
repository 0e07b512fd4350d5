//! The set of differentiable operations.
//!
//! Only add, mul, pow, exp, tanh and relu carry their own derivative rule.
//! Negation, subtraction and division are composed from them.

use std::{
    fmt::Display,
    ops::{Add, Div, Mul, Neg, Sub},
};

use crate::{error::EngineError, value::Value};

/// How a node was produced, with handles to its operands.
#[derive(Clone)]
pub(crate) enum Op {
    Leaf,
    Add(Value, Value),
    Mul(Value, Value),
    Pow(Value, f64),
    Exp(Value),
    Tanh(Value),
    Relu(Value),
}

impl Op {
    pub(crate) fn tag(&self) -> OpTag {
        match self {
            Op::Leaf => OpTag::Leaf,
            Op::Add(..) => OpTag::Add,
            Op::Mul(..) => OpTag::Mul,
            Op::Pow(_, exponent) => OpTag::Pow(*exponent),
            Op::Exp(_) => OpTag::Exp,
            Op::Tanh(_) => OpTag::Tanh,
            Op::Relu(_) => OpTag::Relu,
        }
    }

    pub(crate) fn operands(&self) -> [Option<&Value>; 2] {
        match self {
            Op::Leaf => [None, None],
            Op::Add(lhs, rhs) | Op::Mul(lhs, rhs) => [Some(lhs), Some(rhs)],
            Op::Pow(term, _) | Op::Exp(term) | Op::Tanh(term) | Op::Relu(term) => {
                [Some(term), None]
            }
        }
    }

    pub(crate) fn take_operands(&mut self) -> Vec<Value> {
        match std::mem::replace(self, Op::Leaf) {
            Op::Leaf => vec![],
            Op::Add(lhs, rhs) | Op::Mul(lhs, rhs) => vec![lhs, rhs],
            Op::Pow(term, _) | Op::Exp(term) | Op::Tanh(term) | Op::Relu(term) => vec![term],
        }
    }

    /// Applies the local derivative of this operation to the upstream gradient
    /// `grad` of its output `out`, handing each operand its contribution.
    pub(crate) fn propagate(&self, out: f64, grad: f64, mut push: impl FnMut(&Value, f64)) {
        match self {
            Op::Leaf => (),
            Op::Add(lhs, rhs) => {
                push(lhs, grad);
                push(rhs, grad);
            }
            Op::Mul(lhs, rhs) => {
                push(lhs, rhs.data() * grad);
                push(rhs, lhs.data() * grad);
            }
            Op::Pow(base, exponent) => {
                push(base, exponent * base.data().powf(exponent - 1.) * grad);
            }
            Op::Exp(term) => push(term, out * grad),
            Op::Tanh(term) => push(term, (1. - out * out) * grad),
            // One-sided at zero: the gradient only flows for strictly positive input.
            Op::Relu(term) => push(term, if term.data() > 0. { grad } else { 0. }),
        }
    }

    #[cfg(feature = "expr_name")]
    pub(crate) fn expr_name(&self) -> String {
        match self {
            Op::Leaf => String::new(),
            Op::Add(lhs, rhs) => format!("({} + {})", lhs.label(), rhs.label()),
            Op::Mul(lhs, rhs) => format!("{} * {}", lhs.label(), rhs.label()),
            Op::Pow(base, exponent) => format!("{}**{}", base.label(), exponent),
            Op::Exp(term) => format!("exp({})", term.label()),
            Op::Tanh(term) => format!("tanh({})", term.label()),
            Op::Relu(term) => format!("relu({})", term.label()),
        }
    }
}

/// Diagnostic tag of the operation that produced a node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OpTag {
    Leaf,
    Add,
    Mul,
    Pow(f64),
    Exp,
    Tanh,
    Relu,
}

impl Display for OpTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpTag::Leaf => Ok(()),
            OpTag::Add => write!(f, "+"),
            OpTag::Mul => write!(f, "*"),
            OpTag::Pow(exponent) => write!(f, "**{exponent}"),
            OpTag::Exp => write!(f, "exp"),
            OpTag::Tanh => write!(f, "tanh"),
            OpTag::Relu => write!(f, "relu"),
        }
    }
}

/// Right-hand argument of an operation: either a node already in the graph,
/// or a plain number that becomes a fresh leaf.
#[derive(Clone, Debug)]
pub enum Operand {
    Const(f64),
    Node(Value),
}

impl Operand {
    pub fn into_value(self) -> Value {
        match self {
            Operand::Const(data) => Value::new(data),
            Operand::Node(value) => value,
        }
    }
}

impl From<f64> for Operand {
    fn from(data: f64) -> Self {
        Operand::Const(data)
    }
}

impl From<i32> for Operand {
    fn from(data: i32) -> Self {
        Operand::Const(data as f64)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Node(value)
    }
}

impl From<&Value> for Operand {
    fn from(value: &Value) -> Self {
        Operand::Node(value.clone())
    }
}

#[allow(clippy::should_implement_trait)]
impl Value {
    pub fn add(&self, rhs: impl Into<Operand>) -> Value {
        let rhs = rhs.into().into_value();
        let data = self.data() + rhs.data();
        Value::from_op(Op::Add(self.clone(), rhs), data)
    }

    pub fn mul(&self, rhs: impl Into<Operand>) -> Value {
        let rhs = rhs.into().into_value();
        let data = self.data() * rhs.data();
        Value::from_op(Op::Mul(self.clone(), rhs), data)
    }

    /// Raises this value to a constant power.
    pub fn pow(&self, exponent: f64) -> Value {
        Value::from_op(Op::Pow(self.clone(), exponent), self.data().powf(exponent))
    }

    pub fn powi(&self, exponent: i32) -> Value {
        self.pow(exponent as f64)
    }

    /// Like [`Value::pow`], but accepts any operand and rejects a tracked
    /// exponent instead of recording a derivative rule that ignores it.
    pub fn try_pow(&self, exponent: impl Into<Operand>) -> Result<Value, EngineError> {
        match exponent.into() {
            Operand::Const(exponent) => Ok(self.pow(exponent)),
            Operand::Node(exponent) => Err(EngineError::TrackedExponent {
                exponent: exponent.data(),
            }),
        }
    }

    pub fn neg(&self) -> Value {
        self.mul(-1.)
    }

    pub fn sub(&self, rhs: impl Into<Operand>) -> Value {
        let rhs = rhs.into().into_value();
        self.add(rhs.neg())
    }

    pub fn div(&self, rhs: impl Into<Operand>) -> Value {
        let rhs = rhs.into().into_value();
        self.mul(rhs.pow(-1.))
    }

    pub fn exp(&self) -> Value {
        Value::from_op(Op::Exp(self.clone()), self.data().exp())
    }

    pub fn tanh(&self) -> Value {
        Value::from_op(Op::Tanh(self.clone()), self.data().tanh())
    }

    pub fn relu(&self) -> Value {
        let data = self.data();
        // Written so that NaN passes through instead of clamping to zero.
        let data = if data < 0. { 0. } else { data };
        Value::from_op(Op::Relu(self.clone()), data)
    }
}

impl Add for &Value {
    type Output = Value;
    fn add(self, rhs: Self) -> Self::Output {
        Value::add(self, rhs)
    }
}

impl Add<f64> for &Value {
    type Output = Value;
    fn add(self, rhs: f64) -> Self::Output {
        Value::add(self, rhs)
    }
}

impl Add<&Value> for f64 {
    type Output = Value;
    fn add(self, rhs: &Value) -> Self::Output {
        Value::new(self).add(rhs)
    }
}

impl Sub for &Value {
    type Output = Value;
    fn sub(self, rhs: Self) -> Self::Output {
        Value::sub(self, rhs)
    }
}

impl Sub<f64> for &Value {
    type Output = Value;
    fn sub(self, rhs: f64) -> Self::Output {
        Value::sub(self, rhs)
    }
}

impl Sub<&Value> for f64 {
    type Output = Value;
    fn sub(self, rhs: &Value) -> Self::Output {
        Value::new(self).sub(rhs)
    }
}

impl Mul for &Value {
    type Output = Value;
    fn mul(self, rhs: Self) -> Self::Output {
        Value::mul(self, rhs)
    }
}

impl Mul<f64> for &Value {
    type Output = Value;
    fn mul(self, rhs: f64) -> Self::Output {
        Value::mul(self, rhs)
    }
}

impl Mul<&Value> for f64 {
    type Output = Value;
    fn mul(self, rhs: &Value) -> Self::Output {
        Value::new(self).mul(rhs)
    }
}

impl Div for &Value {
    type Output = Value;
    fn div(self, rhs: Self) -> Self::Output {
        Value::div(self, rhs)
    }
}

impl Div<f64> for &Value {
    type Output = Value;
    fn div(self, rhs: f64) -> Self::Output {
        Value::div(self, rhs)
    }
}

impl Div<&Value> for f64 {
    type Output = Value;
    fn div(self, rhs: &Value) -> Self::Output {
        Value::new(self).div(rhs)
    }
}

impl Neg for &Value {
    type Output = Value;
    fn neg(self) -> Self::Output {
        Value::neg(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_ops_are_built_from_primitives() {
        let a = Value::new(6.);
        let b = Value::new(3.);

        let neg = a.neg();
        assert_eq!(neg.op(), OpTag::Mul);
        assert_eq!(neg.data(), -6.);

        let diff = a.sub(&b);
        assert_eq!(diff.op(), OpTag::Add);
        assert_eq!(diff.operands()[1].op(), OpTag::Mul);
        assert_eq!(diff.data(), 3.);

        let quot = a.div(&b);
        assert_eq!(quot.op(), OpTag::Mul);
        assert_eq!(quot.operands()[1].op(), OpTag::Pow(-1.));
        assert_eq!(quot.data(), 2.);
    }

    #[test]
    fn literals_coerce_on_both_sides() {
        let a = Value::new(2.);
        assert_eq!((&a + 1.).data(), 3.);
        assert_eq!((1. + &a).data(), 3.);
        assert_eq!((&a - 5.).data(), -3.);
        assert_eq!((5. - &a).data(), 3.);
        assert_eq!((&a * 4.).data(), 8.);
        assert_eq!((4. * &a).data(), 8.);
        assert_eq!((&a / 4.).data(), 0.5);
        assert_eq!((4. / &a).data(), 2.);
        assert_eq!((-&a).data(), -2.);

        let c = 1. + &a;
        assert!(c.operands()[0].is_leaf());
        assert!(c.operands()[1].ptr_eq(&a));
    }

    #[test]
    fn tracked_exponent_is_rejected() {
        let a = Value::new(2.);
        let p = Value::new(3.);
        assert_eq!(
            a.try_pow(&p).unwrap_err(),
            EngineError::TrackedExponent { exponent: 3. }
        );
        assert_eq!(a.try_pow(3.).unwrap().data(), 8.);
    }

    #[test]
    fn relu_forward() {
        assert_eq!(Value::new(-2.).relu().data(), 0.);
        assert_eq!(Value::new(0.).relu().data(), 0.);
        assert_eq!(Value::new(1.5).relu().data(), 1.5);
        assert!(Value::new(f64::NAN).relu().data().is_nan());
    }

    #[test]
    fn domain_errors_propagate_as_nan() {
        let a = Value::new(-8.);
        assert!(a.pow(0.5).data().is_nan());
        assert!(Value::new(0.).pow(-1.).data().is_infinite());
    }

    #[test]
    fn tag_display() {
        assert_eq!(OpTag::Add.to_string(), "+");
        assert_eq!(OpTag::Pow(2.).to_string(), "**2");
        assert_eq!(OpTag::Leaf.to_string(), "");
        assert_eq!(OpTag::Relu.to_string(), "relu");
    }
}
