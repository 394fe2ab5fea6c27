//! Aggregated threshold signature
//!
//! Binary layout (then standard base64 for the textual token):
//!
//! ```text
//! Multisignature  := field(1, bytes, CompactBitArray) || field(2, bytes, sig)*
//! CompactBitArray := field(1, varint, n % 8)? || field(2, bytes, elems)
//! ```
//!
//! `n % 8` is omitted when zero. Signatures appear in increasing slot order.

use super::bitmask::ParticipationMask;
use super::wire::{put_bytes_field, put_varint_field, FieldReader, FieldValue};
use super::CodecError;
use base64::{engine::general_purpose::STANDARD, Engine as _};

const FIELD_BIT_ARRAY: u32 = 1;
const FIELD_SIGNATURES: u32 = 2;
const FIELD_EXTRA_BITS: u32 = 1;
const FIELD_ELEMS: u32 = 2;

/// Signatures from a subset of wallet slots plus the mask naming that subset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedSignature {
    mask: ParticipationMask,
    signatures: Vec<Vec<u8>>,
}

impl AggregatedSignature {
    /// Pair a mask with signatures already in increasing slot order
    pub fn new(mask: ParticipationMask, signatures: Vec<Vec<u8>>) -> Result<Self, CodecError> {
        if mask.is_empty() {
            return Err(CodecError::UnsupportedWalletSize(0));
        }
        if mask.count() == 0 || mask.count() != signatures.len() {
            return Err(CodecError::UnsupportedSignerPattern(format!(
                "mask {} with {} signature(s)",
                mask,
                signatures.len()
            )));
        }
        for (slot, signature) in mask.signers().zip(&signatures) {
            if signature.is_empty() {
                return Err(CodecError::MalformedSignature {
                    slot,
                    reason: "empty signature".to_string(),
                });
            }
        }
        Ok(Self { mask, signatures })
    }

    /// Collect `(slot, signature)` pairs in any order for a wallet of `slot_count` keys
    pub fn from_slots<I>(slot_count: usize, entries: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = (usize, Vec<u8>)>,
    {
        if slot_count == 0 {
            return Err(CodecError::UnsupportedWalletSize(0));
        }
        let mut entries: Vec<(usize, Vec<u8>)> = entries.into_iter().collect();
        entries.sort_by_key(|(slot, _)| *slot);

        let mut mask = ParticipationMask::new(slot_count);
        for (slot, _) in &entries {
            if mask.is_set(*slot) {
                return Err(CodecError::UnsupportedSignerPattern(format!(
                    "slot {} signed twice",
                    slot
                )));
            }
            mask.set(*slot)?;
        }

        Self::new(mask, entries.into_iter().map(|(_, sig)| sig).collect())
    }

    /// Like [`from_slots`](Self::from_slots) with base64-encoded signatures
    pub fn from_base64_slots<'a, I>(slot_count: usize, entries: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let decoded = entries
            .into_iter()
            .map(|(slot, encoded)| {
                STANDARD
                    .decode(encoded)
                    .map(|bytes| (slot, bytes))
                    .map_err(|e| CodecError::MalformedSignature {
                        slot,
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_slots(slot_count, decoded)
    }

    pub fn mask(&self) -> &ParticipationMask {
        &self.mask
    }

    /// Signatures in slot order
    pub fn signatures(&self) -> &[Vec<u8>] {
        &self.signatures
    }

    /// `(slot, signature)` pairs in slot order
    pub fn entries(&self) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        self.mask
            .signers()
            .zip(self.signatures.iter().map(Vec::as_slice))
    }

    /// Binary encoding
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bit_array = Vec::new();
        let extra_bits = self.mask.extra_bits();
        if extra_bits != 0 {
            put_varint_field(&mut bit_array, FIELD_EXTRA_BITS, u64::from(extra_bits));
        }
        put_bytes_field(&mut bit_array, FIELD_ELEMS, &self.mask.to_elems());

        let mut out = Vec::with_capacity(bit_array.len() + self.signatures.len() * 68);
        put_bytes_field(&mut out, FIELD_BIT_ARRAY, &bit_array);
        for signature in &self.signatures {
            put_bytes_field(&mut out, FIELD_SIGNATURES, signature);
        }
        out
    }

    /// The broadcastable token
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse a binary encoding
    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut reader = FieldReader::new(data);
        let mut mask = None;
        let mut signatures = Vec::new();

        while !reader.is_done() {
            match reader.next_field()? {
                (FIELD_BIT_ARRAY, FieldValue::Bytes(bytes)) if mask.is_none() => {
                    mask = Some(decode_bit_array(bytes)?);
                }
                (FIELD_SIGNATURES, FieldValue::Bytes(bytes)) => signatures.push(bytes.to_vec()),
                (field, _) => {
                    return Err(CodecError::MalformedAggregate(format!(
                        "unexpected field {}",
                        field
                    )))
                }
            }
        }

        let mask =
            mask.ok_or_else(|| CodecError::MalformedAggregate("missing bit array".into()))?;
        Self::new(mask, signatures)
    }

    /// Parse a token produced by [`encode`](Self::encode)
    pub fn decode(token: &str) -> Result<Self, CodecError> {
        let bytes = STANDARD
            .decode(token)
            .map_err(|e| CodecError::MalformedAggregate(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

fn decode_bit_array(data: &[u8]) -> Result<ParticipationMask, CodecError> {
    let mut reader = FieldReader::new(data);
    let mut extra_bits = 0u64;
    let mut elems: &[u8] = &[];

    while !reader.is_done() {
        match reader.next_field()? {
            (FIELD_EXTRA_BITS, FieldValue::Varint(value)) => extra_bits = value,
            (FIELD_ELEMS, FieldValue::Bytes(bytes)) => elems = bytes,
            (field, _) => {
                return Err(CodecError::MalformedAggregate(format!(
                    "unexpected bit array field {}",
                    field
                )))
            }
        }
    }

    let extra_bits = u8::try_from(extra_bits)
        .map_err(|_| CodecError::MalformedAggregate("extra bits overflow".into()))?;
    ParticipationMask::from_elems(extra_bits, elems)
}

/// Encode `(slot, base64 signature)` pairs for a wallet of `slot_count` keys
pub fn aggregate<'a, I>(slot_count: usize, entries: I) -> Result<String, CodecError>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    Ok(AggregatedSignature::from_base64_slots(slot_count, entries)?.encode())
}
