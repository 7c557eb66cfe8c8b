//! Hashing and signature verification primitives.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use sha3::{Digest, Sha3_256};

/// Digest size of SHA3-256.
pub const DIGEST_BYTES: usize = 32;
/// Domain tag prepended to both children when hashing a Merkle node.
pub const MERKLE_NODE_TAG: &[u8] = b"MERKLE_NODE";
/// Deepest Merkle proof accepted by `vmerkle`.
pub const MERKLE_MAX_DEPTH: usize = 32;

/// SHA3-256 of `data`.
#[must_use]
pub fn sha3_256(data: &[u8]) -> [u8; DIGEST_BYTES] {
    let mut out = [0u8; DIGEST_BYTES];
    out.copy_from_slice(&Sha3_256::digest(data));
    out
}

/// Parent node of two Merkle children.
#[must_use]
pub fn merkle_node(left: &[u8; DIGEST_BYTES], right: &[u8; DIGEST_BYTES]) -> [u8; DIGEST_BYTES] {
    let mut h = Sha3_256::new();
    h.update(MERKLE_NODE_TAG);
    h.update(left);
    h.update(right);
    let mut out = [0u8; DIGEST_BYTES];
    out.copy_from_slice(&h.finalize());
    out
}

/// Folds a leaf up its authentication path.
///
/// Bit `i` of `index` tells whether the node at level `i` is a right child.
#[must_use]
pub fn merkle_root(
    leaf: &[u8; DIGEST_BYTES],
    index: u32,
    siblings: &[[u8; DIGEST_BYTES]],
) -> [u8; DIGEST_BYTES] {
    siblings
        .iter()
        .enumerate()
        .fold(*leaf, |node, (level, sibling)| {
            if (u64::from(index) >> level) & 1 == 1 {
                merkle_node(sibling, &node)
            } else {
                merkle_node(&node, sibling)
            }
        })
}

/// Checks a Merkle inclusion proof.
///
/// Proofs deeper than [`MERKLE_MAX_DEPTH`] and indices with bits set at or
/// above the proof depth are rejected.
#[must_use]
pub fn verify_merkle(
    root: &[u8; DIGEST_BYTES],
    leaf: &[u8; DIGEST_BYTES],
    index: u32,
    siblings: &[[u8; DIGEST_BYTES]],
) -> bool {
    let depth = siblings.len();
    if depth > MERKLE_MAX_DEPTH || u64::from(index) >> depth != 0 {
        return false;
    }
    merkle_root(leaf, index, siblings) == *root
}

/// BIP-340 Schnorr verification of a 64-byte signature over a 32-byte message
/// by a 32-byte x-only public key. Malformed keys or signatures verify false.
#[must_use]
pub fn verify_schnorr(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let Ok(key) = k256::schnorr::VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(signature) = k256::schnorr::Signature::try_from(signature) else {
        return false;
    };
    key.verify_prehash(message, &signature).is_ok()
}

/// ECDSA secp256k1 verification of a compact `r ‖ s` signature over a 32-byte
/// prehash by an uncompressed `x ‖ y` public key. Malformed inputs verify false.
#[must_use]
pub fn verify_ecdsa(public_key_xy: &[u8], signature: &[u8], prehash: &[u8]) -> bool {
    if public_key_xy.len() != 64 {
        return false;
    }
    let mut sec1 = [0u8; 65];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(public_key_xy);
    let Ok(key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1) else {
        return false;
    };
    let Ok(signature) = k256::ecdsa::Signature::from_slice(signature) else {
        return false;
    };
    key.verify_prehash(prehash, &signature).is_ok()
}
