//! Canonical CBOR helpers for ledger primitives

use minicbor::{data::Tag, Encode, Encoder};

/// Canonical encoding of a ledger value. Maps are ordered containers, so equal values always
/// produce equal bytes.
pub fn to_canonical_cbor<T: Encode<()>>(value: &T) -> Vec<u8> {
    let mut bytes = Vec::new();
    // Writing into a Vec cannot fail
    let _ = minicbor::encode(value, &mut bytes);
    bytes
}

/// Size in bytes of the canonical encoding
pub fn canonical_size<T: Encode<()>>(value: &T) -> u64 {
    to_canonical_cbor(value).len() as u64
}

// Rationals are written as a tag-30 pair, the ledger's unit-interval form
pub mod rational_cbor_codec {
    use super::*;
    use crate::rational_number::RationalNumber;

    /// For use with `#[cbor(encode_with = "rational_cbor_codec::encode")]`
    pub fn encode<C, W: minicbor::encode::Write>(
        v: &RationalNumber,
        e: &mut Encoder<W>,
        _ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.tag(Tag::new(30))?.array(2)?.u64(*v.numer())?.u64(*v.denom())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rational_number::RationalNumber;

    struct Wrapped(RationalNumber);

    impl<C> Encode<C> for Wrapped {
        fn encode<W: minicbor::encode::Write>(
            &self,
            e: &mut Encoder<W>,
            ctx: &mut C,
        ) -> Result<(), minicbor::encode::Error<W::Error>> {
            rational_cbor_codec::encode(&self.0, e, ctx)
        }
    }

    #[test]
    fn rational_is_tagged_pair() {
        let bytes = to_canonical_cbor(&Wrapped(RationalNumber::new(3, 4)));
        assert_eq!(bytes, vec![0xd8, 0x1e, 0x82, 0x03, 0x04]);
    }
}
