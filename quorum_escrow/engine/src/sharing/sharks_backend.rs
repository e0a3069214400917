//! Alternate backend delegating to the `sharks` crate (Shamir over GF(2^8)).

use sharks::{Share, Sharks};
use zeroize::Zeroizing;

use super::{KeyShare, ThresholdSplitter, check_policy, normalize_shares};
use crate::error::{Result, VaultError};

#[derive(Debug, Clone, Copy, Default)]
pub struct SharksSplitter;

impl ThresholdSplitter for SharksSplitter {
    fn name(&self) -> &'static str {
        "sharks"
    }

    fn split(&self, secret: &[u8], threshold: u8, parts: u8) -> Result<Vec<KeyShare>> {
        check_policy(threshold, parts)?;
        if secret.is_empty() {
            return Err(VaultError::InvalidPolicy("cannot split an empty secret".into()));
        }

        let dealer = Sharks(threshold).dealer(secret);
        let shares: Vec<KeyShare> = dealer
            .take(parts as usize)
            .map(|share| {
                let bytes = Zeroizing::new(Vec::<u8>::from(&share));
                KeyShare::from_bytes(&bytes)
            })
            .collect::<Result<_>>()?;

        if shares.len() != parts as usize {
            return Err(VaultError::InvalidPolicy(format!(
                "expected {parts} shares, dealer produced {}",
                shares.len()
            )));
        }
        Ok(shares)
    }

    fn combine(&self, shares: &[KeyShare], threshold: u8) -> Result<Zeroizing<Vec<u8>>> {
        let points = normalize_shares(shares, threshold)?;
        let sharks_shares = points
            .iter()
            .map(|s| {
                Share::try_from(s.to_bytes().as_slice())
                    .map_err(|e| VaultError::ShareCombineFailed(e.to_string()))
            })
            .collect::<Result<Vec<Share>>>()?;

        Sharks(threshold)
            .recover(&sharks_shares)
            .map(Zeroizing::new)
            .map_err(|e| VaultError::ShareCombineFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_through_sharks() {
        let secret = [0x33u8; 32];
        let shares = SharksSplitter.split(&secret, 2, 3).unwrap();
        let recovered = SharksSplitter.combine(&shares[1..], 2).unwrap();
        assert_eq!(recovered.as_slice(), &secret);
    }

    #[test]
    fn below_threshold_is_refused() {
        let shares = SharksSplitter.split(&[1u8; 32], 3, 3).unwrap();
        assert!(matches!(
            SharksSplitter.combine(&shares[..2], 3),
            Err(VaultError::InsufficientShares { .. })
        ));
    }
}
