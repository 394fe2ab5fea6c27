//! Golden vectors for the aggregated-signature token.
//!
//! Earlier deployments built the token textually from a lookup table keyed by
//! wallet size and a 3-bit participation pattern, splicing base64 signatures
//! together. That construction is reproduced here only to pin the general
//! encoder against it; it is valid for n in {2, 3} and 64-byte signatures.

use super::{AggregatedSignature, CodecError};

const HEADER: &str = "CgUI";
const INFIX: &str = "IB";
const DELIMITER: &str = "JA";
const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Size prefix and whether the mask must be right-padded to 3 characters
fn size_prefix(slot_count: usize) -> Result<(&'static str, bool), CodecError> {
    match slot_count {
        2 => Ok(("Ah", true)),
        3 => Ok(("Ax", false)),
        n => Err(CodecError::UnsupportedWalletSize(n)),
    }
}

fn slot_prefix(mask: &str) -> Result<&'static str, CodecError> {
    match mask {
        "001" => Ok("IB"),
        "010" => Ok("QB"),
        "011" => Ok("YB"),
        "100" => Ok("gB"),
        "101" => Ok("oB"),
        "110" => Ok("wB"),
        "111" => Ok("4B"),
        other => Err(CodecError::UnsupportedSignerPattern(other.to_string())),
    }
}

/// Drop the trailing "==" and bump the new last character by one
fn normalize_length(signature: &str) -> String {
    let mut chars: Vec<u8> = signature.as_bytes()[..signature.len() - 2].to_vec();
    if let Some(last) = chars.last_mut() {
        let index = BASE64_ALPHABET
            .iter()
            .position(|c| c == last)
            .expect("base64 character");
        *last = BASE64_ALPHABET[index + 1];
    }
    String::from_utf8(chars).expect("ascii")
}

/// Table-driven token for `signatures` (base64, slot order) under `mask`
pub(crate) fn table_token(
    slot_count: usize,
    mask: &str,
    signatures: &[&str],
) -> Result<String, CodecError> {
    let (size, pad) = size_prefix(slot_count)?;
    let padded = if pad {
        format!("{}0", mask)
    } else {
        mask.to_string()
    };
    let header = format!("{}{}{}{}", HEADER, size, INFIX, slot_prefix(&padded)?);

    let mut parts = vec![header];
    for (i, signature) in signatures.iter().enumerate() {
        if i + 1 < signatures.len() {
            parts.push(normalize_length(signature));
        } else {
            parts.push(signature.to_string());
        }
    }
    Ok(parts.join(DELIMITER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ParticipationMask;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn signature(slot: usize) -> String {
        let bytes: Vec<u8> = (0..64u8)
            .map(|i| i.wrapping_mul(7).wrapping_add(slot as u8 * 31))
            .collect();
        STANDARD.encode(bytes)
    }

    fn subsets(n: usize) -> Vec<Vec<usize>> {
        (1..(1u32 << n))
            .map(|bits| (0..n).filter(|i| bits & (1 << i) != 0).collect())
            .collect()
    }

    #[test]
    fn test_two_of_three_scenario() {
        let token = table_token(3, "101", &["AAAA==", "BBBB=="]).unwrap();
        assert_eq!(token, "CgUIAxIBoB".to_string() + "JA" + "AAAB" + "JA" + "BBBB==");
    }

    #[test]
    fn test_table_rejects_unknown_shapes() {
        assert_eq!(
            table_token(4, "1010", &["AAAA=="]),
            Err(CodecError::UnsupportedWalletSize(4))
        );
        assert_eq!(
            table_token(3, "000", &[]),
            Err(CodecError::UnsupportedSignerPattern("000".to_string()))
        );
    }

    #[test]
    fn test_general_encoder_matches_table() {
        for n in [2usize, 3] {
            for subset in subsets(n) {
                let sigs: Vec<String> = subset.iter().map(|slot| signature(*slot)).collect();
                let mask = ParticipationMask::from_slots(n, subset.iter().copied()).unwrap();

                let expected = table_token(
                    n,
                    &mask.to_string(),
                    &sigs.iter().map(String::as_str).collect::<Vec<_>>(),
                )
                .unwrap();
                let actual = crate::codec::aggregate(
                    n,
                    subset.iter().copied().zip(sigs.iter().map(String::as_str)),
                )
                .unwrap();

                assert_eq!(actual, expected, "n={} mask={}", n, mask);
                assert_eq!(
                    AggregatedSignature::decode(&actual).unwrap().mask(),
                    &mask
                );
            }
        }
    }

    #[test]
    fn test_slot_prefix_tracks_pattern() {
        for subset in subsets(3) {
            let mask = ParticipationMask::from_slots(3, subset.iter().copied()).unwrap();
            let sigs: Vec<String> = subset.iter().map(|slot| signature(*slot)).collect();
            let token = crate::codec::aggregate(
                3,
                subset.iter().copied().zip(sigs.iter().map(String::as_str)),
            )
            .unwrap();

            let prefix = slot_prefix(&mask.to_string()).unwrap();
            assert_eq!(&token[..10], format!("CgUIAxIB{}", prefix));
        }
    }
}
