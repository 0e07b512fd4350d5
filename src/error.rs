use thiserror::Error;

/// Errors raised by the engine and by the layers composed on top of it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Exponent must be a constant number, got a tracked value (data: {exponent})")]
    TrackedExponent { exponent: f64 },

    #[error("Input size mismatch: expected {expected}, got {actual}")]
    InputSize { expected: usize, actual: usize },

    #[error("Sample count mismatch: {inputs} inputs but {targets} targets")]
    SampleCount { inputs: usize, targets: usize },
}
