//! FICH codec
//!
//! The Frame Information Channel is the FEC-protected control header carried
//! in every YSF frame. The 32 information bits are protected by a CRC-8 and
//! a rate-1/2 K=5 convolutional code, then bit-interleaved into the 11-byte
//! codeword at a fixed offset in the network frame.

use crate::fec::convenc::ConvEncState;
use crate::fec::crc8;
use crate::fec::viterbi;

/// Length of the encoded FICH codeword in bytes.
pub const FICH_LENGTH_BYTES: usize = 11;
/// Length of the encoded FICH codeword in bits.
pub const FICH_LENGTH_BITS: usize = FICH_LENGTH_BYTES * 8;

const INFO_BITS: usize = 32;
const CRC_BITS: usize = 8;
const TAIL_BITS: usize = 4;
const CODE_BITS: usize = INFO_BITS + CRC_BITS + TAIL_BITS;

/// Interleave multiplier, coprime to the 88-bit codeword length.
const INTERLEAVE_A: usize = 25;

const fn interleave_table() -> [usize; FICH_LENGTH_BITS] {
    let mut table = [0usize; FICH_LENGTH_BITS];
    let mut i = 0;
    while i < FICH_LENGTH_BITS {
        table[i] = (INTERLEAVE_A * (i + 1)) % FICH_LENGTH_BITS;
        i += 1;
    }
    table
}

/// Where bit `i` of the encoded stream sits inside the codeword. The
/// multiplier is coprime to the length, so the mapping is a permutation.
const INTERLEAVE_TABLE: [usize; FICH_LENGTH_BITS] = interleave_table();

/// Frame indicator carried in the FICH FI field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameIndicator {
    Header,
    Communications,
    Terminator,
    Test,
}

impl FrameIndicator {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => FrameIndicator::Header,
            1 => FrameIndicator::Communications,
            2 => FrameIndicator::Terminator,
            _ => FrameIndicator::Test,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            FrameIndicator::Header => 0,
            FrameIndicator::Communications => 1,
            FrameIndicator::Terminator => 2,
            FrameIndicator::Test => 3,
        }
    }
}

/// Data type carried in the FICH DT field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    VdMode1,
    DataFr,
    VdMode2,
    VoiceFr,
}

impl DataType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => DataType::VdMode1,
            1 => DataType::DataFr,
            2 => DataType::VdMode2,
            _ => DataType::VoiceFr,
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            DataType::VdMode1 => 0,
            DataType::DataFr => 1,
            DataType::VdMode2 => 2,
            DataType::VoiceFr => 3,
        }
    }
}

/// Decoded view over the four FICH information bytes.
///
/// Byte 0: FI(2) CS(2) CM(2) BN(2), byte 1: BT(2) FN(3) FT(3),
/// byte 2: res(1) DEV(1) MR(3) VOIP(1) DT(2), byte 3: SQL(1) DG-ID(7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fich {
    bytes: [u8; 4],
}

impl Fich {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the codeword region. Returns `None` when the CRC check fails;
    /// the caller is expected to drop the frame silently.
    pub fn decode(region: &[u8]) -> Option<Fich> {
        assert!(region.len() >= FICH_LENGTH_BYTES);

        // gather the codeword bits back into encoder order
        let mut encoded = [0u8; FICH_LENGTH_BITS];
        for (i, bit) in encoded.iter_mut().enumerate() {
            *bit = crc8::get_nth_bit(region, INTERLEAVE_TABLE[i]);
        }

        let mut decoded = [0u8; CODE_BITS];
        viterbi::decode(&encoded, &mut decoded);

        let mut data = [0u8; 5];
        for (i, &bit) in decoded.iter().take(INFO_BITS + CRC_BITS).enumerate() {
            if bit != 0 {
                data[i / 8] |= 0x80 >> (i % 8);
            }
        }

        if crc8::crc8_fich(&data, INFO_BITS) != data[4] {
            return None;
        }

        Some(Fich { bytes: [data[0], data[1], data[2], data[3]] })
    }

    /// Encode into the codeword region, recomputing CRC and parity.
    pub fn encode(&self, region: &mut [u8]) {
        assert!(region.len() >= FICH_LENGTH_BYTES);

        let mut data = [0u8; 5];
        data[..4].copy_from_slice(&self.bytes);
        data[4] = crc8::crc8_fich(&data, INFO_BITS);

        // 40 information + CRC bits and a 4-bit tail flushing the encoder
        let mut bits = [0u8; CODE_BITS];
        for (i, bit) in bits.iter_mut().take(INFO_BITS + CRC_BITS).enumerate() {
            *bit = crc8::get_nth_bit(&data, i);
        }

        let mut encoded = [0u8; FICH_LENGTH_BITS];
        ConvEncState::new().encode(&bits, &mut encoded);

        // scatter the encoded bits into their interleaved positions
        for byte in region.iter_mut().take(FICH_LENGTH_BYTES) {
            *byte = 0;
        }
        for (i, &bit) in encoded.iter().enumerate() {
            if bit != 0 {
                let n = INTERLEAVE_TABLE[i];
                region[n / 8] |= 0x80 >> (n % 8);
            }
        }
    }

    pub fn fi(&self) -> FrameIndicator {
        FrameIndicator::from_bits(self.bytes[0] >> 6)
    }

    pub fn cm(&self) -> u8 {
        (self.bytes[0] >> 2) & 0x03
    }

    pub fn bn(&self) -> u8 {
        self.bytes[0] & 0x03
    }

    pub fn bt(&self) -> u8 {
        self.bytes[1] >> 6
    }

    /// Fragment number.
    pub fn fnum(&self) -> u8 {
        (self.bytes[1] >> 3) & 0x07
    }

    /// Fragment total.
    pub fn ftot(&self) -> u8 {
        self.bytes[1] & 0x07
    }

    pub fn mr(&self) -> u8 {
        (self.bytes[2] >> 3) & 0x07
    }

    pub fn dt(&self) -> DataType {
        DataType::from_bits(self.bytes[2] & 0x03)
    }

    pub fn dgid(&self) -> u8 {
        self.bytes[3] & 0x7f
    }

    pub fn set_fi(&mut self, fi: FrameIndicator) {
        self.bytes[0] = (self.bytes[0] & 0x3f) | (fi.to_bits() << 6);
    }

    pub fn set_fnum(&mut self, fnum: u8) {
        self.bytes[1] = (self.bytes[1] & 0xc7) | ((fnum & 0x07) << 3);
    }

    pub fn set_ftot(&mut self, ftot: u8) {
        self.bytes[1] = (self.bytes[1] & 0xf8) | (ftot & 0x07);
    }

    pub fn set_dt(&mut self, dt: DataType) {
        self.bytes[2] = (self.bytes[2] & 0xfc) | dt.to_bits();
    }

    /// Mutates only the DG-ID bits; `encode` recomputes the parity.
    pub fn set_dgid(&mut self, dgid: u8) {
        self.bytes[3] = (self.bytes[3] & 0x80) | (dgid & 0x7f);
    }
}
