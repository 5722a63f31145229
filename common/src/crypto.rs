//! Hashing helpers for ledger content hashes

use crate::hash::{Hash, KeyHash};
use blake2::{
    digest::consts::{U28, U32},
    Blake2b, Digest,
};

pub mod ed25519;

/// Blake2b-256 of arbitrary bytes
pub fn blake2b_256(data: &[u8]) -> Hash<32> {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

/// Blake2b-224 of arbitrary bytes
pub fn blake2b_224(data: &[u8]) -> Hash<28> {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

/// Blake2b-224 of a one-byte tag followed by the payload, as used for script hashes
pub fn blake2b_224_tagged(tag: u8, data: &[u8]) -> Hash<28> {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update([tag]);
    hasher.update(data);
    Hash::new(hasher.finalize().into())
}

/// Hash of a verification key
pub fn keyhash(vkey: &[u8]) -> KeyHash {
    blake2b_224(vkey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_of_empty_input() {
        assert_eq!(
            blake2b_256(&[]).to_string(),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn tagged_hash_differs_from_untagged() {
        let payload = [1u8, 2, 3];
        assert_ne!(blake2b_224_tagged(0, &payload), blake2b_224(&payload));
        assert_eq!(blake2b_224_tagged(0, &payload), blake2b_224(&[0, 1, 2, 3]));
    }
}
