use anyhow::Result;
use num_bigint::BigUint as Reference;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use zk_evm_multiprecision::{
    inverse_mod, ressol, BigModRt, BigUint, ModularElement, ModularParams, U256,
};

const BN254_BASE: &str = "0x30644e72e131a029b85045b68181585d97816a916871ca8d3c208c16d87cfd47";

fn to_ref(x: &U256) -> Reference {
    Reference::from_bytes_be(&x.to_be_bytes())
}

fn random_below(rng: &mut ChaCha8Rng, m: &U256) -> U256 {
    let mut limbs = [0u64; 4];
    rng.fill(&mut limbs[..]);
    U256::from_limbs(limbs).checked_rem(m).unwrap()
}

#[test]
fn montgomery_and_barrett_agree_with_reference() -> Result<()> {
    let m: U256 = BN254_BASE.parse()?;
    let mont = ModularParams::montgomery(m)?;
    let barrett = ModularParams::barrett(m)?;
    let reference_m = to_ref(&m);
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    for _ in 0..100 {
        let a = random_below(&mut rng, &m);
        let b = random_below(&mut rng, &m);
        let expected = (to_ref(&a) * to_ref(&b)) % &reference_m;
        for params in [&mont, &barrett] {
            let product = params.adjust_regular(
                &params.mul(&params.adjust_modular(&a), &params.adjust_modular(&b)),
            );
            assert_eq!(to_ref(&product), expected);
            // Montgomery round-trip.
            assert_eq!(params.adjust_regular(&params.adjust_modular(&a)), a);
        }
    }
    Ok(())
}

#[test]
fn inverse_times_value_is_one() -> Result<()> {
    let m: U256 = BN254_BASE.parse()?;
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    for _ in 0..20 {
        let a = random_below(&mut rng, &m);
        if a.is_zero() {
            continue;
        }
        let x = BigModRt::with_modulus(&a, &m)?;
        assert_eq!(x.mul_mod(&x.inverse()?), x.one_like());
        let inv = inverse_mod(&a, &m)?;
        assert_eq!(
            (to_ref(&a) * to_ref(&inv)) % to_ref(&m),
            Reference::from(1u8)
        );
    }
    Ok(())
}

#[test]
fn square_roots_square_back() -> Result<()> {
    let p: U256 = BN254_BASE.parse()?;
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    for _ in 0..20 {
        let r = random_below(&mut rng, &p);
        let x = BigModRt::with_modulus(&r, &p)?;
        let a = x.square().to_uint();
        let root = ressol(&a, &p)?;
        let root_elem = x.from_uint_like(&root);
        assert_eq!(root_elem.square().to_uint(), a);
    }
    Ok(())
}

#[test]
fn narrow_width_arithmetic() -> Result<()> {
    type U100 = BigUint<100, 2>;
    let m: U100 = "1267650600228229401496703204653".parse()?; // 2^100 - 723
    let params = ModularParams::new(m)?;
    let a = params.adjust_modular(&m.wrapping_sub(&U100::ONE));
    let sum = params.add(&a, &a);
    assert_eq!(
        params.adjust_regular(&sum),
        m.wrapping_sub(&U100::from(2u8))
    );
    Ok(())
}
