//! Shamir secret sharing over GF(2^8).
//!
//! Each secret byte is the constant term of its own random polynomial of
//! degree `threshold - 1`; share `i` holds every polynomial evaluated at
//! `x = i`. Any `threshold` points determine the polynomials exactly, while
//! fewer are consistent with every possible secret byte.
//!
//! The field uses the AES reduction polynomial x^8 + x^4 + x^3 + x + 1.
//! Multiplication runs a fixed eight rounds with masks instead of branches.

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::{KeyShare, ThresholdSplitter, check_policy, normalize_shares};
use crate::error::{Result, VaultError};

/// Low byte of the reduction polynomial (0x11B).
const REDUCTION: u8 = 0x1B;

#[inline]
pub(crate) fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

pub(crate) fn mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    for _ in 0..8 {
        product ^= a & 0u8.wrapping_sub(b & 1);
        let carry = 0u8.wrapping_sub(a >> 7);
        a = (a << 1) ^ (REDUCTION & carry);
        b >>= 1;
    }
    product
}

/// Multiplicative inverse via a^254 (a^255 = 1 for a != 0). Maps 0 to 0.
pub(crate) fn inv(a: u8) -> u8 {
    let a2 = mul(a, a);
    let a4 = mul(a2, a2);
    let a8 = mul(a4, a4);
    let a16 = mul(a8, a8);
    let a32 = mul(a16, a16);
    let a64 = mul(a32, a32);
    let a128 = mul(a64, a64);
    // 254 = 128 + 64 + 32 + 16 + 8 + 4 + 2
    mul(mul(mul(mul(mul(mul(a128, a64), a32), a16), a8), a4), a2)
}

/// Horner evaluation; `coefficients[0]` is the constant term.
fn evaluate(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &c| add(mul(acc, x), c))
}

/// Lagrange basis weights at x = 0 for the given x-coordinates.
fn lagrange_at_zero(xs: &[u8]) -> Vec<u8> {
    xs.iter()
        .enumerate()
        .map(|(j, &xj)| {
            let mut numerator = 1u8;
            let mut denominator = 1u8;
            for (m, &xm) in xs.iter().enumerate() {
                if m != j {
                    numerator = mul(numerator, xm);
                    denominator = mul(denominator, add(xm, xj));
                }
            }
            mul(numerator, inv(denominator))
        })
        .collect()
}

/// Always-available in-process backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gf256Splitter;

impl ThresholdSplitter for Gf256Splitter {
    fn name(&self) -> &'static str {
        "gf256"
    }

    fn split(&self, secret: &[u8], threshold: u8, parts: u8) -> Result<Vec<KeyShare>> {
        check_policy(threshold, parts)?;
        if secret.is_empty() {
            return Err(VaultError::InvalidPolicy("cannot split an empty secret".into()));
        }

        let degree = threshold as usize - 1;
        let mut shares: Vec<KeyShare> = (1..=parts)
            .map(|x| KeyShare::new(x, Vec::with_capacity(secret.len())))
            .collect();

        let mut coefficients = Zeroizing::new(vec![0u8; threshold as usize]);
        for &byte in secret {
            coefficients[0] = byte;
            OsRng.fill_bytes(&mut coefficients[1..=degree]);
            for share in shares.iter_mut() {
                share.data.push(evaluate(&coefficients, share.index));
            }
        }

        Ok(shares)
    }

    fn combine(&self, shares: &[KeyShare], threshold: u8) -> Result<Zeroizing<Vec<u8>>> {
        let points = normalize_shares(shares, threshold)?;
        let xs: Vec<u8> = points.iter().map(|s| s.index).collect();
        let weights = lagrange_at_zero(&xs);

        let len = points[0].data.len();
        let mut secret = Zeroizing::new(vec![0u8; len]);
        for (share, &weight) in points.iter().zip(&weights) {
            for (out, &y) in secret.iter_mut().zip(&share.data) {
                *out = add(*out, mul(y, weight));
            }
        }
        Ok(secret)
    }
}
