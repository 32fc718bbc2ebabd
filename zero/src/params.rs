//! Commitment parameters shared by the prover and the verifier.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use zk_evm_commitments::FriParams;
use zk_evm_multiprecision::FftField;

pub const DEFAULT_DEGREE_LOG: usize = 10;
pub const DEFAULT_EXPAND_FACTOR: usize = 2;
pub const DEFAULT_LAMBDA: usize = 40;
pub const DEFAULT_GRINDING_BITS: u32 = 16;

/// Largest step [`default_step_list`] uses.
const DEFAULT_MAX_STEP: usize = 3;

/// Contents of the params JSON file written by `zero setup`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofParams {
    /// Committed polynomials have degree below `2^degree_log`, which bounds
    /// the number of trace rows.
    pub degree_log: usize,
    /// Log of the blow-up of the evaluation domain.
    pub expand_factor: usize,
    /// Number of FRI queries.
    pub lambda: usize,
    pub grinding_bits: u32,
    pub step_list: Vec<usize>,
}

/// Folds the polynomial down to degree 3 in steps of at most 3, ending with
/// a single step.
pub fn default_step_list(degree_log: usize) -> Vec<usize> {
    let mut remaining = degree_log.saturating_sub(1).max(1);
    let mut steps = vec![];
    while remaining > 1 {
        let step = DEFAULT_MAX_STEP.min(remaining - 1);
        steps.push(step);
        remaining -= step;
    }
    steps.push(1);
    steps
}

impl Default for ProofParams {
    fn default() -> Self {
        Self::new(DEFAULT_DEGREE_LOG, DEFAULT_EXPAND_FACTOR)
    }
}

impl ProofParams {
    pub fn new(degree_log: usize, expand_factor: usize) -> Self {
        Self {
            degree_log,
            expand_factor,
            lambda: DEFAULT_LAMBDA,
            grinding_bits: DEFAULT_GRINDING_BITS,
            step_list: default_step_list(degree_log),
        }
    }

    /// Replaces the FRI settings given on the command line.
    pub fn with_overrides(
        mut self,
        lambda: Option<usize>,
        grinding_bits: Option<u32>,
        step_list: Option<Vec<usize>>,
    ) -> Self {
        if let Some(lambda) = lambda {
            self.lambda = lambda;
        }
        if let Some(bits) = grinding_bits {
            self.grinding_bits = bits;
        }
        if let Some(steps) = step_list {
            self.step_list = steps;
        }
        self
    }

    /// Number of rows of every committed column.
    pub fn height(&self) -> usize {
        1 << self.degree_log
    }

    pub fn fri_params<F: FftField>(&self) -> Result<FriParams<F>> {
        FriParams::new(
            self.degree_log,
            self.expand_factor,
            self.step_list.clone(),
            self.lambda,
            self.grinding_bits,
        )
        .with_context(|| format!("invalid parameters {self:?}"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let des = &mut serde_json::Deserializer::from_reader(BufReader::new(file));
        serde_path_to_error::deserialize(des)
            .with_context(|| format!("malformed parameters in {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use zk_evm_multiprecision::Goldilocks;

    use super::*;

    #[test]
    fn test_default_step_list() {
        assert_eq!(default_step_list(10), vec![3, 3, 2, 1]);
        assert_eq!(default_step_list(4), vec![2, 1]);
        assert_eq!(default_step_list(2), vec![1]);
        assert_eq!(default_step_list(0), vec![1]);
    }

    #[test]
    fn test_defaults_are_valid() -> anyhow::Result<()> {
        let params = ProofParams::new(6, 2);
        let fri = params.fri_params::<Goldilocks>()?;
        assert_eq!(fri.r, 5);
        assert_eq!(fri.final_polynomial_degree_bound(), 3);
        Ok(())
    }

    #[test]
    fn test_overrides() {
        let params = ProofParams::default().with_overrides(Some(8), None, Some(vec![2, 1]));
        assert_eq!(params.lambda, 8);
        assert_eq!(params.grinding_bits, DEFAULT_GRINDING_BITS);
        assert_eq!(params.step_list, vec![2, 1]);
        assert!(params.fri_params::<Goldilocks>().is_ok());

        let invalid = params.with_overrides(None, None, Some(vec![2, 2]));
        assert!(invalid.fri_params::<Goldilocks>().is_err());
    }

    #[test]
    fn test_save_and_load() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!("zero-params-{}.json", std::process::id()));
        let params = ProofParams::new(9, 1);
        params.save(&path)?;
        assert_eq!(ProofParams::load(&path)?, params);

        std::fs::write(&path, r#"{ "degree_log": 9, "expand_factor": "two" }"#)?;
        let err = ProofParams::load(&path).expect_err("expand_factor is a string");
        assert!(format!("{err:#}").contains("expand_factor"), "{err:#}");
        std::fs::remove_file(&path)?;
        Ok(())
    }
}
