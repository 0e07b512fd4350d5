//! Reverse-mode automatic differentiation over a dynamic graph of scalars.
//!
//! Every operation on a [`Value`] records a new node; [`Value::backward`]
//! fills in the gradient of every node the result depends on.
//!
//! ```
//! use scalargrad::Value;
//!
//! let a = Value::new(1.);
//! let b = Value::new(3.);
//! let d = Value::new(-2.);
//! let y = &(&a + &b) * &d;
//! y.backward();
//! assert_eq!(y.data(), -8.);
//! assert_eq!(a.grad(), -2.);
//! assert_eq!(d.grad(), 4.);
//! ```

mod backward;
mod dot;
pub mod error;
pub mod grad_check;
pub mod nn;
mod ops;
pub mod train;
mod value;

pub use backward::Gradients;
pub use error::EngineError;
pub use ops::{OpTag, Operand};
pub use value::Value;
