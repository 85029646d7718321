/// Splits a 16-bit opcode into the fields the instruction set is
/// written in terms of: four nibbles, plus the 8- and 12-bit immediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSplitter(u8, u8);

impl BitSplitter {
    pub fn from_u16(value: u16) -> BitSplitter {
        BitSplitter((value >> 8) as u8, (value & 0x00FF) as u8)
    }

    /// Wrap the two bytes of an opcode, high byte first as they appear in memory.
    pub fn new(left: u8, right: u8) -> BitSplitter {
        BitSplitter(left, right)
    }

    /// Left-shift the first u8-component 8 bits,
    /// then take bitwise or with the second component
    /// in order to store the components in a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.0 as u16) << 8) | self.1 as u16
    }

    /// The four nibbles, most significant first.
    pub fn as_four_u8(&self) -> (u8, u8, u8, u8) {
        let four_last_bits_mask = 0x0F;
        (
            (self.0 >> 4) & four_last_bits_mask,
            self.0 & four_last_bits_mask,
            (self.1 >> 4) & four_last_bits_mask,
            self.1 & four_last_bits_mask,
        )
    }

    /// The `nn` immediate.
    pub fn last_8_bits(&self) -> u8 {
        self.1
    }

    /// The `nnn` address.
    pub fn last_12_bits(&self) -> u16 {
        self.as_u16() & 0x0FFF
    }
}
