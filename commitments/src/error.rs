use thiserror::Error;

pub type Result<T, E = CommitmentError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CommitmentError {
    #[error("invalid FRI step list {steps:?}: {reason}")]
    InvalidStepList {
        steps: Vec<usize>,
        reason: &'static str,
    },
    #[error("size {0} is not a power of two")]
    SizeNotPowerOfTwo(usize),
    #[error("{field} has no multiplicative subgroup of size 2^{log_size}")]
    DomainTooLarge { field: &'static str, log_size: u32 },
    #[error("cannot halve a domain of size 2^{log_size} {count} times")]
    DomainChainTooLong { log_size: u32, count: u32 },
    #[error("batch {0} is already committed")]
    BatchAlreadyCommitted(usize),
    #[error("batch {0} has not been committed")]
    BatchNotCommitted(usize),
    #[error("batch {0} is empty")]
    EmptyBatch(usize),
    #[error("batch {batch} has no polynomial {poly}")]
    UnknownPolynomial { batch: usize, poly: usize },
    #[error("polynomial of degree {degree} exceeds the bound {bound}")]
    DegreeTooLarge { degree: usize, bound: usize },
    #[error("division by the zero polynomial")]
    DivisionByZero,
    #[error("interpolation points are not distinct")]
    DuplicatePoint,
    #[error("leaf index {index} is out of range for {leaves} leaves")]
    InvalidLeafIndex { index: usize, leaves: usize },
    #[error("fixed batches need an evaluation point, call `setup` first")]
    MissingSetup,
    #[error("evaluation storage does not match batch {0}")]
    EvalStorageMismatch(usize),
    #[error("batch {0} is not opened at the points the verifier expects")]
    UnexpectedEvalPoints(usize),
    #[error("preprocessed data was drawn from a different transcript")]
    SetupMismatch,
    #[error("malformed proof: {0}")]
    Deserialize(String),
}
