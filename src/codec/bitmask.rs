//! Participation bitmask over wallet slots

use super::CodecError;
use bitvec::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Which slots of a wallet contributed a signature.
///
/// Rendered as one '1'/'0' character per slot in slot order, so `"011"` means
/// slots 1 and 2 signed and slot 0 did not.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParticipationMask {
    bits: BitVec<u8, Msb0>,
}

impl ParticipationMask {
    /// An all-zero mask over `slot_count` slots
    pub fn new(slot_count: usize) -> Self {
        Self {
            bits: bitvec![u8, Msb0; 0; slot_count],
        }
    }

    /// Build a mask with the given slots set
    pub fn from_slots<I>(slot_count: usize, slots: I) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut mask = Self::new(slot_count);
        for slot in slots {
            mask.set(slot)?;
        }
        Ok(mask)
    }

    pub fn set(&mut self, slot: usize) -> Result<(), CodecError> {
        let size = self.bits.len();
        if slot >= size {
            return Err(CodecError::SlotOutOfRange { slot, size });
        }
        self.bits.set(slot, true);
        Ok(())
    }

    pub fn is_set(&self, slot: usize) -> bool {
        slot < self.bits.len() && self.bits[slot]
    }

    /// Number of slots (n), not number of signers
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of participating slots
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Participating slot indices in increasing order
    pub fn signers(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    /// Number of bits used in the final element byte (0 when it is full)
    pub fn extra_bits(&self) -> u8 {
        (self.bits.len() % 8) as u8
    }

    /// Pack into bytes, slot i at bit (7 - i % 8) of byte i / 8
    pub fn to_elems(&self) -> Vec<u8> {
        let mut bits = self.bits.clone();
        bits.set_uninitialized(false);
        bits.into_vec()
    }

    /// Inverse of [`to_elems`](Self::to_elems)
    pub fn from_elems(extra_bits: u8, elems: &[u8]) -> Result<Self, CodecError> {
        if extra_bits >= 8 {
            return Err(CodecError::MalformedAggregate(format!(
                "extra bits {} out of range",
                extra_bits
            )));
        }
        let slot_count = match (extra_bits, elems.len()) {
            (_, 0) => 0,
            (0, len) => len * 8,
            (extra, len) => (len - 1) * 8 + extra as usize,
        };

        let mut bits = BitVec::<u8, Msb0>::from_slice(elems);
        bits.truncate(slot_count);
        Ok(Self { bits })
    }
}

impl fmt::Display for ParticipationMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.bits.iter().by_vals() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for ParticipationMask {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits = s
            .chars()
            .map(|c| match c {
                '1' => Ok(true),
                '0' => Ok(false),
                _ => Err(CodecError::UnsupportedSignerPattern(s.to_string())),
            })
            .collect::<Result<BitVec<u8, Msb0>, _>>()?;
        Ok(Self { bits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_and_parse() {
        let mask = ParticipationMask::from_slots(3, [0, 2]).unwrap();
        assert_eq!(mask.to_string(), "101");
        assert_eq!("101".parse::<ParticipationMask>().unwrap(), mask);
        assert_eq!(mask.count(), 2);
        assert_eq!(mask.signers().collect::<Vec<_>>(), vec![0, 2]);
        assert!("1x1".parse::<ParticipationMask>().is_err());
    }

    #[test]
    fn test_slot_out_of_range() {
        assert_eq!(
            ParticipationMask::from_slots(2, [2]),
            Err(CodecError::SlotOutOfRange { slot: 2, size: 2 })
        );
    }

    #[test]
    fn test_elems_layout() {
        let mask = ParticipationMask::from_slots(3, [0, 2]).unwrap();
        assert_eq!(mask.to_elems(), vec![0xA0]);
        assert_eq!(mask.extra_bits(), 3);

        let wide = ParticipationMask::from_slots(10, [1, 8, 9]).unwrap();
        assert_eq!(wide.to_elems(), vec![0x40, 0xC0]);
        assert_eq!(wide.extra_bits(), 2);
        assert_eq!(
            ParticipationMask::from_elems(wide.extra_bits(), &wide.to_elems()).unwrap(),
            wide
        );

        let dirty = ParticipationMask::from_elems(3, &[0xBF]).unwrap();
        assert_eq!(dirty.to_string(), "101");
        assert_eq!(dirty.to_elems(), vec![0xA0]);

        let full = ParticipationMask::from_slots(8, [7]).unwrap();
        assert_eq!(full.extra_bits(), 0);
        assert_eq!(
            ParticipationMask::from_elems(0, &full.to_elems()).unwrap(),
            full
        );
    }
}
