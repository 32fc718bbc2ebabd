use anyhow::{bail, Result};
use clap::Parser;
use dotenvy::dotenv;
use evm_arithmetization::load_blocks;
use tracing::{error, info};
use zero::params::ProofParams;
use zero::proof::ProofFile;
use zero::{prover, verifier};

use self::cli::{Command, FriArgs};

mod cli;

impl FriArgs {
    fn apply(self, params: ProofParams) -> ProofParams {
        params.with_overrides(self.lambda, self.grinding_bits, self.step_list)
    }
}

fn main() -> Result<()> {
    dotenv().ok();
    zero::tracing::init();

    let args = cli::Cli::parse();
    match args.command {
        Command::Setup {
            params,
            degree_log,
            expand_factor,
            fri,
        } => {
            let proof_params = fri.apply(ProofParams::new(degree_log, expand_factor));
            // Reject unusable parameters before anything is written.
            proof_params.fri_params::<zero::F>()?;
            proof_params.save(&params)?;
            info!("Wrote {proof_params:?} to {}", params.display());
        }
        Command::Prove {
            trace,
            params,
            proof,
            fri,
        } => {
            let params = fri.apply(ProofParams::load(&params)?);
            let blocks = load_blocks(&trace)?;
            info!("Proving {} blocks from {}", blocks.len(), trace.display());
            let proof_file = prover::prove(&params, &blocks)?;
            proof_file.write(&proof)?;
            info!("Wrote proof to {}", proof.display());
        }
        Command::Verify {
            trace,
            params,
            proof,
        } => {
            let params = ProofParams::load(&params)?;
            let blocks = load_blocks(&trace)?;
            let proof_file = ProofFile::read(&proof)?;
            match verifier::verify(&params, &blocks, &proof_file) {
                Ok(true) => info!("All proofs verified successfully!"),
                Ok(false) => bail!("proof in {} does not verify", proof.display()),
                Err(e) => {
                    error!("{e:?}");
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}
