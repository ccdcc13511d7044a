/// 7-bit VIS mode code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct VisCode(u8);

impl VisCode {
    #[inline]
    pub const fn new(value: u8) -> Option<Self> {
        if value & 0x80 == 0 {
            Some(Self(value))
        }
        else {
            None
        }
    }

    /// Splits a received byte into code and parity bit. Returns `None` if the
    /// parity bit doesn't match.
    #[inline]
    pub fn from_byte(byte: u8) -> Option<Self> {
        let code = Self(byte & 0x7f);
        (code.parity() == (byte & 0x80 != 0)).then_some(code)
    }

    #[inline]
    pub fn get(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn get_bit(&self, bit: u8) -> bool {
        assert!(bit < 7);
        (self.0 >> bit) & 1 != 0
    }

    /// Even parity: set if an odd number of data bits is set.
    #[inline]
    pub fn parity(&self) -> bool {
        self.0.count_ones() & 1 != 0
    }

    /// Code with the parity bit in bit 7, as it is sent on the wire.
    #[inline]
    pub fn to_byte(&self) -> u8 {
        self.0 | (u8::from(self.parity()) << 7)
    }
}
