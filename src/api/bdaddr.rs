//! Implementation of Bluetooth's 48-bit hardware address.

use std::fmt::{self, Debug, Display, Formatter, LowerHex, UpperHex};
use std::str::FromStr;

/// Stores the 6 byte address used to identify Bluetooth devices and local radios.
///
/// `address[0]` is the most significant byte, matching the order in which addresses are written.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Default)]
pub struct BDAddr {
    address: [u8; 6],
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseBDAddrError {
    #[error("Bluetooth address has to be 6 bytes long")]
    IncorrectByteCount,
    #[error("Invalid digit in address: {0}")]
    InvalidDigit(#[from] std::num::ParseIntError),
}

impl Display for BDAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        <Self as UpperHex>::fmt(self, f)
    }
}

impl LowerHex for BDAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let a = &self.address;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

impl UpperHex for BDAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let a = &self.address;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a[0], a[1], a[2], a[3], a[4], a[5]
        )
    }
}

impl Debug for BDAddr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        <Self as Display>::fmt(self, f)
    }
}

impl From<[u8; 6]> for BDAddr {
    /// Build an address from an array, most significant byte first.
    ///
    /// ```
    /// # use btdiscover::api::BDAddr;
    /// let addr: BDAddr = [0x2A, 0xCC, 0x00, 0x34, 0xFA, 0x00].into();
    /// assert_eq!("2A:CC:00:34:FA:00", addr.to_string());
    /// ```
    fn from(address: [u8; 6]) -> Self {
        Self { address }
    }
}

impl From<u64> for BDAddr {
    /// Takes the low 48 bits of `int`, which is how native stacks hand addresses around.
    fn from(int: u64) -> Self {
        let mut address = [0; 6];
        address.copy_from_slice(&int.to_be_bytes()[2..]);
        Self { address }
    }
}

impl From<BDAddr> for u64 {
    fn from(addr: BDAddr) -> Self {
        let mut bytes = [0; 8];
        bytes[2..].copy_from_slice(&addr.address);
        u64::from_be_bytes(bytes)
    }
}

impl FromStr for BDAddr {
    type Err = ParseBDAddrError;

    /// Parses a Bluetooth address of the form `aa:bb:cc:dd:ee:ff` or of form
    /// `aabbccddeeff`.
    ///
    /// All hex-digits `[0-9a-fA-F]` are allowed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            Self::from_str_delim(s)
        } else {
            Self::from_str_no_delim(s)
        }
    }
}

impl BDAddr {
    /// Destruct the address into the underlying array.
    pub fn into_inner(self) -> [u8; 6] {
        self.address
    }

    /// An all-zero address never identifies a real device.
    pub fn is_null(&self) -> bool {
        self.address == [0; 6]
    }

    /// Parses a Bluetooth address with colons `:` as delimiters.
    pub fn from_str_delim(s: &str) -> Result<Self, ParseBDAddrError> {
        let bytes = s
            .split(':')
            .map(|part| u8::from_str_radix(part, 16))
            .collect::<Result<Vec<u8>, _>>()?;
        let address = <[u8; 6]>::try_from(bytes.as_slice())
            .map_err(|_| ParseBDAddrError::IncorrectByteCount)?;
        Ok(Self { address })
    }

    /// Parses a Bluetooth address written as 12 hex digits without delimiters.
    pub fn from_str_no_delim(s: &str) -> Result<Self, ParseBDAddrError> {
        if s.len() != 12 || !s.is_ascii() {
            return Err(ParseBDAddrError::IncorrectByteCount);
        }
        let mut address = [0; 6];
        for (byte, pair) in address.iter_mut().zip(s.as_bytes().chunks(2)) {
            // `s` is ASCII, so every two-byte chunk is valid UTF-8.
            let pair = std::str::from_utf8(pair).map_err(|_| ParseBDAddrError::IncorrectByteCount)?;
            *byte = u8::from_str_radix(pair, 16)?;
        }
        Ok(Self { address })
    }

    /// Create a `String` with the address in lower case and without delimiters.
    pub fn to_string_no_delim(&self) -> String {
        self.address.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
