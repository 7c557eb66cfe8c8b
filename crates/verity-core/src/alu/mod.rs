//! Arithmetic, logic, float and cryptographic primitives.
//!
//! Everything here is a pure function of its operands; flag updates and
//! register writes happen in the executor.

/// Fixed-width integers with overflow reporting.
pub mod int;
/// IEEE 754 operations on raw bit patterns.
pub mod float;
/// SHA3, Merkle and signature primitives.
pub mod crypto;

pub use crypto::{
    merkle_node, merkle_root, sha3_256, verify_ecdsa, verify_merkle, verify_schnorr, DIGEST_BYTES,
    MERKLE_MAX_DEPTH, MERKLE_NODE_TAG,
};
pub use float::{CANONICAL_NAN_F16, CANONICAL_NAN_F32, CANONICAL_NAN_F64};
pub use int::Uint;
