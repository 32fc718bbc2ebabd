use rayon::prelude::*;
use zk_evm_common::keccak256;

use crate::merkle::Digest;
use crate::pool::PoolLevel;
use crate::transcript::Transcript;

/// Nonces tried per parallel batch.
const BATCH: u64 = 1 << 16;

fn leading_zeros(digest: &Digest) -> u32 {
    let mut zeros = 0;
    for byte in digest {
        zeros += byte.leading_zeros();
        if *byte != 0 {
            break;
        }
    }
    zeros
}

fn check_nonce(state: &Digest, nonce: u64, bits: u32) -> bool {
    let mut buf = [0u8; 40];
    buf[..32].copy_from_slice(state);
    buf[32..].copy_from_slice(&nonce.to_be_bytes());
    leading_zeros(&keccak256(buf)) >= bits
}

/// Finds the smallest nonce whose hash with the transcript state has `bits`
/// leading zero bits and absorbs it. Without grinding the nonce is 0 and the
/// transcript is left untouched.
pub fn run_grinding(transcript: &mut Transcript, bits: u32) -> u64 {
    if bits == 0 {
        return 0;
    }
    let state = *transcript.state();
    let mut start = 0u64;
    let nonce = loop {
        let found = PoolLevel::Low.install(|| {
            (start..start.saturating_add(BATCH))
                .into_par_iter()
                .find_first(|&nonce| check_nonce(&state, nonce, bits))
        });
        if let Some(nonce) = found {
            break nonce;
        }
        start = start.saturating_add(BATCH);
    };
    log::debug!("grinding: found nonce {nonce} for {bits} bits");
    transcript.absorb(&nonce.to_be_bytes());
    nonce
}

/// Checks a grinding nonce and, when valid, absorbs it like the prover did.
pub fn verify_grinding(transcript: &mut Transcript, nonce: u64, bits: u32) -> bool {
    if bits == 0 {
        return nonce == 0;
    }
    if !check_nonce(transcript.state(), nonce, bits) {
        return false;
    }
    transcript.absorb(&nonce.to_be_bytes());
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grinding_round_trip() {
        let mut prover = Transcript::new(b"grind");
        let mut verifier = prover.clone();
        let nonce = run_grinding(&mut prover, 8);
        assert!(verify_grinding(&mut verifier, nonce, 8));
        assert_eq!(prover, verifier);

        let mut other = Transcript::new(b"grind");
        let bad = (0..).find(|&n| !check_nonce(other.state(), n, 8)).unwrap_or(u64::MAX);
        assert!(!verify_grinding(&mut other, bad, 8));
    }

    #[test]
    fn test_no_grinding() {
        let mut t = Transcript::new(b"none");
        let before = t.clone();
        assert_eq!(run_grinding(&mut t, 0), 0);
        assert_eq!(t, before);
        assert!(verify_grinding(&mut t, 0, 0));
        assert!(!verify_grinding(&mut t, 5, 0));
    }

    #[test]
    fn test_leading_zeros() {
        let mut d = [0xffu8; 32];
        assert_eq!(leading_zeros(&d), 0);
        d[0] = 0;
        d[1] = 0x1f;
        assert_eq!(leading_zeros(&d), 11);
    }
}
