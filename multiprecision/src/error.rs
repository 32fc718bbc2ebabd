use thiserror::Error;

/// Failures of big-integer and modular operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("failed to parse integer: {0}")]
    Parse(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Montgomery reduction requires an odd modulus")]
    EvenModulusForMontgomery,
}

pub type Result<T> = std::result::Result<T, Error>;
