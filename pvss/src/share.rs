//! Dealing, verification, reencryption and reconstruction of shares.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar, traits::Identity};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DleqProof, Keypair, PublicKey, PvssError, SharingParameters};

const SHARE_CONTEXT: &[u8] = b"share";

/// The shared secret `s·h`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Secret(RistrettoPoint);

impl Secret {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    pub fn to_hex(&self) -> String {
        self.to_bytes().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// `Y_i = p(i)·X_i` with a proof that it matches the coefficient commitments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedShare {
    /// 1-based evaluation point.
    pub index: u32,
    pub holder: String,
    pub value: RistrettoPoint,
    pub proof: DleqProof,
}

/// Everything published by the dealer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharingInstance {
    pub params: SharingParameters,
    pub threshold: usize,
    pub holders: BTreeMap<String, PublicKey>,
    /// `C_j = a_j·g` for every polynomial coefficient.
    pub commitments: Vec<RistrettoPoint>,
    pub shares: Vec<EncryptedShare>,
}

/// A share decrypted by its holder, `p(i)·h`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DecryptedShare {
    pub index: u32,
    value: RistrettoPoint,
}

/// ElGamal encryption of a decrypted share under a receiver key:
/// `u = k·h`, `v = p(i)·h + k·R`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReencryptedShare {
    pub index: u32,
    pub holder: String,
    pub receiver: PublicKey,
    pub u: RistrettoPoint,
    pub v: RistrettoPoint,
}

fn eval_poly(coeffs: &[Scalar], x: Scalar) -> Scalar {
    coeffs
        .iter()
        .rev()
        .fold(Scalar::zero(), |acc, a| acc * x + a)
}

/// Deal a fresh secret to `holders` with reconstruction threshold `threshold`.
/// Holders are indexed `1..=n` in name order.
pub fn share_secret<R: Rng + CryptoRng>(
    rng: &mut R,
    params: &SharingParameters,
    holders: &BTreeMap<String, PublicKey>,
    threshold: usize,
) -> Result<(Secret, SharingInstance), PvssError> {
    if threshold == 0 {
        return Err(PvssError::InvalidThreshold);
    }
    if holders.len() < threshold {
        return Err(PvssError::InsufficientKeys {
            threshold,
            supplied: holders.len(),
        });
    }

    let coeffs: Vec<Scalar> = (0..threshold).map(|_| Scalar::random(rng)).collect();
    let commitments = coeffs.iter().map(|a| a * params.g).collect();

    let shares = holders
        .iter()
        .enumerate()
        .map(|(i, (name, pk))| {
            let index = i as u32 + 1;
            let p_i = eval_poly(&coeffs, Scalar::from(index));
            let x_i = p_i * params.g;
            let value = p_i * pk.0;
            let proof = DleqProof::prove(rng, &p_i, &params.g, &x_i, &pk.0, &value, SHARE_CONTEXT);
            EncryptedShare {
                index,
                holder: name.clone(),
                value,
                proof,
            }
        })
        .collect();

    let secret = Secret(coeffs[0] * params.h);
    debug!(holders = holders.len(), threshold, "dealt shares");
    Ok((
        secret,
        SharingInstance {
            params: *params,
            threshold,
            holders: holders.clone(),
            commitments,
            shares,
        },
    ))
}

impl SharingInstance {
    /// `X_i = Σ_j C_j·i^j`, the commitment to `p(i)` on `g`.
    fn committed_point(&self, index: u32) -> RistrettoPoint {
        let x = Scalar::from(index);
        self.commitments
            .iter()
            .rev()
            .fold(RistrettoPoint::identity(), |acc, c| acc * x + c)
    }

    /// Public verification: every holder has exactly one share, at its
    /// name-order index, with a valid DLEQ proof.
    pub fn verify(&self) -> Result<(), PvssError> {
        if self.threshold == 0 {
            return Err(PvssError::InvalidThreshold);
        }
        if self.commitments.len() != self.threshold {
            return Err(PvssError::MalformedInstance("commitment count"));
        }
        if self.shares.len() != self.holders.len() {
            return Err(PvssError::MalformedInstance("share count"));
        }
        for (i, ((name, pk), share)) in self.holders.iter().zip(self.shares.iter()).enumerate() {
            if share.index != i as u32 + 1 || share.holder != *name {
                return Err(PvssError::MalformedInstance("share order"));
            }
            let x_i = self.committed_point(share.index);
            if !share
                .proof
                .verify(&self.params.g, &x_i, &pk.0, &share.value, SHARE_CONTEXT)
            {
                return Err(PvssError::InvalidShareProof(share.index));
            }
        }
        Ok(())
    }

    pub fn share_for(&self, holder: &str) -> Result<&EncryptedShare, PvssError> {
        self.shares
            .iter()
            .find(|s| s.holder == holder)
            .ok_or_else(|| PvssError::UnknownHolder(holder.to_string()))
    }
}

impl Keypair {
    /// Strip this identity's encryption layer off its share.
    pub fn decrypt_share(&self, share: &EncryptedShare) -> Result<DecryptedShare, PvssError> {
        if share.holder != self.name {
            return Err(PvssError::HolderMismatch {
                index: share.index,
                holder: share.holder.clone(),
                expected: self.name.clone(),
            });
        }
        Ok(DecryptedShare {
            index: share.index,
            value: self.private().invert() * share.value,
        })
    }
}

/// Decrypt `share` with the holder's key and encrypt it for `receiver`.
pub fn reencrypt<R: Rng + CryptoRng>(
    rng: &mut R,
    params: &SharingParameters,
    holder: &Keypair,
    share: &EncryptedShare,
    receiver: &PublicKey,
) -> Result<ReencryptedShare, PvssError> {
    let decrypted = holder.decrypt_share(share)?;
    let k = Scalar::random(rng);
    Ok(ReencryptedShare {
        index: decrypted.index,
        holder: holder.name.clone(),
        receiver: *receiver,
        u: k * params.h,
        v: decrypted.value + k * receiver.0,
    })
}

fn lagrange_at_zero(index: u32, indices: &[u32]) -> Scalar {
    let xi = Scalar::from(index);
    let (num, den) = indices
        .iter()
        .filter(|&&j| j != index)
        .fold((Scalar::one(), Scalar::one()), |(num, den), &j| {
            let xj = Scalar::from(j);
            (num * xj, den * (xj - xi))
        });
    num * den.invert()
}

/// Recover the secret from reencrypted shares addressed to `receiver`.
pub fn reconstruct(
    receiver: &Keypair,
    shares: &[ReencryptedShare],
    threshold: usize,
) -> Result<Secret, PvssError> {
    if threshold == 0 {
        return Err(PvssError::InvalidThreshold);
    }
    if shares.len() < threshold {
        return Err(PvssError::InsufficientShares {
            threshold,
            supplied: shares.len(),
        });
    }

    let mut seen = BTreeSet::new();
    for share in shares.iter() {
        if share.index == 0 || !seen.insert(share.index) {
            return Err(PvssError::DuplicateShareIndex(share.index));
        }
        if share.receiver != receiver.public {
            return Err(PvssError::ReceiverMismatch(share.index));
        }
    }

    let indices: Vec<u32> = seen.into_iter().collect();
    let secret = shares.iter().fold(RistrettoPoint::identity(), |acc, share| {
        let value = share.v - receiver.private() * share.u;
        acc + lagrange_at_zero(share.index, &indices) * value
    });
    Ok(Secret(secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_core::AesRng;

    struct Session {
        params: SharingParameters,
        identities: Vec<Keypair>,
        secret: Secret,
        instance: SharingInstance,
    }

    fn deal(names: &[&str], threshold: usize) -> Session {
        let mut rng = AesRng::new();
        let params = SharingParameters::generate(&mut rng);
        let identities: Vec<Keypair> = names
            .iter()
            .map(|n| Keypair::generate(&mut rng, &params, *n))
            .collect();
        let holders = identities
            .iter()
            .map(|k| (k.name.clone(), k.public))
            .collect();
        let (secret, instance) = share_secret(&mut rng, &params, &holders, threshold).unwrap();
        Session {
            params,
            identities,
            secret,
            instance,
        }
    }

    fn reencrypt_for(s: &Session, holders: &[usize], receiver: &Keypair) -> Vec<ReencryptedShare> {
        let mut rng = AesRng::new();
        holders
            .iter()
            .map(|&i| {
                let kp = &s.identities[i];
                let share = s.instance.share_for(&kp.name).unwrap();
                reencrypt(&mut rng, &s.params, kp, share, &receiver.public).unwrap()
            })
            .collect()
    }

    #[test]
    fn any_threshold_subset_reconstructs() {
        let s = deal(&["Alice", "Boris", "Chris"], 2);
        s.instance.verify().unwrap();

        let mut rng = AesRng::new();
        let requester = Keypair::generate(&mut rng, &s.params, "requester");
        for subset in [[0, 1], [0, 2], [1, 2], [2, 0]] {
            let shares = reencrypt_for(&s, &subset, &requester);
            assert_eq!(reconstruct(&requester, &shares, 2).unwrap(), s.secret);
        }

        let all = reencrypt_for(&s, &[0, 1, 2], &requester);
        assert_eq!(reconstruct(&requester, &all, 2).unwrap(), s.secret);
    }

    #[test]
    fn fewer_than_threshold_fails() {
        let s = deal(&["Alice", "Boris", "Chris"], 2);
        let mut rng = AesRng::new();
        let requester = Keypair::generate(&mut rng, &s.params, "requester");
        let shares = reencrypt_for(&s, &[1], &requester);
        assert_eq!(
            reconstruct(&requester, &shares, 2),
            Err(PvssError::InsufficientShares {
                threshold: 2,
                supplied: 1
            })
        );

        // Lying about the threshold yields a different point.
        assert_ne!(reconstruct(&requester, &shares, 1).unwrap(), s.secret);
    }

    #[test]
    fn round_trip_across_trials() {
        for threshold in 1..=4 {
            let s = deal(&["a", "b", "c", "d", "e"], threshold);
            s.instance.verify().unwrap();
            let mut rng = AesRng::new();
            let requester = Keypair::generate(&mut rng, &s.params, "requester");
            let holders: Vec<usize> = (5 - threshold..5).collect();
            let shares = reencrypt_for(&s, &holders, &requester);
            assert_eq!(reconstruct(&requester, &shares, threshold).unwrap(), s.secret);
        }
    }

    #[test]
    fn wrong_receiver_and_duplicates_fail() {
        let s = deal(&["Alice", "Boris", "Chris"], 2);
        let mut rng = AesRng::new();
        let requester = Keypair::generate(&mut rng, &s.params, "requester");
        let other = Keypair::generate(&mut rng, &s.params, "other");

        let shares = reencrypt_for(&s, &[0, 1], &requester);
        assert_eq!(
            reconstruct(&other, &shares, 2),
            Err(PvssError::ReceiverMismatch(1))
        );

        let dup = vec![shares[0].clone(), shares[0].clone()];
        assert_eq!(
            reconstruct(&requester, &dup, 2),
            Err(PvssError::DuplicateShareIndex(1))
        );
    }

    #[test]
    fn tampered_share_fails_verification() {
        let mut s = deal(&["Alice", "Boris", "Chris"], 2);
        s.instance.shares[1].value = s.instance.shares[1].value + s.params.h;
        assert_eq!(s.instance.verify(), Err(PvssError::InvalidShareProof(2)));

        let mut s = deal(&["Alice", "Boris", "Chris"], 2);
        s.instance.commitments.pop();
        assert!(matches!(
            s.instance.verify(),
            Err(PvssError::MalformedInstance(_))
        ));
    }

    #[test]
    fn dealing_checks_parameters() {
        let mut rng = AesRng::new();
        let params = SharingParameters::generate(&mut rng);
        let kp = Keypair::generate(&mut rng, &params, "Alice");
        let holders = BTreeMap::from([(kp.name.clone(), kp.public)]);
        assert_eq!(
            share_secret(&mut rng, &params, &holders, 2).unwrap_err(),
            PvssError::InsufficientKeys {
                threshold: 2,
                supplied: 1
            }
        );
        assert_eq!(
            share_secret(&mut rng, &params, &holders, 0).unwrap_err(),
            PvssError::InvalidThreshold
        );
    }

    #[test]
    fn holder_cannot_reencrypt_foreign_share() {
        let s = deal(&["Alice", "Boris"], 2);
        let mut rng = AesRng::new();
        let share = s.instance.share_for("Boris").unwrap();
        assert!(matches!(
            reencrypt(&mut rng, &s.params, &s.identities[0], share, &s.identities[1].public),
            Err(PvssError::HolderMismatch { .. })
        ));
        assert_eq!(
            s.instance.share_for("Zoe").unwrap_err(),
            PvssError::UnknownHolder("Zoe".to_string())
        );
    }
}
