//! Chain identifiers as returned by the keychain (`0x`-hex felts).

use std::fmt;
use std::str::FromStr;

use ruint::aliases::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{KeychainError, Result};

/// Widest value a Starknet felt holds.
const FELT_BITS: usize = 252;

/// Felt-width chain id. Starknet ids are short strings (up to 31 chars)
/// packed into a felt, e.g. `0x534e5f4d41494e` is `SN_MAIN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(U256);

impl ChainId {
    /// Parse a `0x`-prefixed hex or plain decimal string.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || KeychainError::InvalidChainId(s.to_string());
        let (digits, radix) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => (digits, 16),
            None => (s, 10),
        };
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix as u32)) {
            return Err(invalid());
        }
        let value = U256::from_str_radix(digits, radix).map_err(|_| invalid())?;
        if value.bit_len() > FELT_BITS {
            return Err(invalid());
        }
        Ok(Self(value))
    }

    /// The id as a 256-bit integer.
    pub fn value(&self) -> U256 {
        self.0
    }

    /// Big-endian felt bytes.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }

    /// Decode the id as a Starknet short string, if it is printable ASCII.
    pub fn as_short_string(&self) -> Option<String> {
        let bytes = self.to_be_bytes();
        let start = bytes.iter().position(|b| *b != 0)?;
        let text = &bytes[start..];
        if text.iter().all(|b| b.is_ascii_graphic()) {
            String::from_utf8(text.to_vec()).ok()
        } else {
            None
        }
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = KeychainError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(U256::from(id))
    }
}

impl From<ChainId> for U256 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

// Serialized as the `0x`-hex string the keychain uses on the wire.
impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_and_decimal() {
        assert_eq!(ChainId::parse("0x1").unwrap(), ChainId::from(1u64));
        assert_eq!(ChainId::parse("0xff").unwrap(), ChainId::from(255u64));
        assert_eq!(ChainId::parse("42").unwrap(), ChainId::from(42u64));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ChainId::parse("0x").is_err());
        assert!(ChainId::parse("0xzz").is_err());
        assert!(ChainId::parse("").is_err());
        assert!(ChainId::parse("mainnet").is_err());
        assert!(ChainId::parse("-1").is_err());
    }

    #[test]
    fn test_short_string() {
        let main = ChainId::parse("0x534e5f4d41494e").unwrap();
        assert_eq!(main.as_short_string().as_deref(), Some("SN_MAIN"));
        let sepolia = ChainId::parse("0x534e5f5345504f4c4941").unwrap();
        assert_eq!(sepolia.as_short_string().as_deref(), Some("SN_SEPOLIA"));
        assert_eq!(ChainId::from(1u64).as_short_string(), None);
        assert_eq!(ChainId::from(0u64).as_short_string(), None);
    }

    #[test]
    fn test_long_slot_chain_ids() {
        // "WP_ARCADE_MAINNET", 17 chars
        let slot = ChainId::parse("0x57505f4152434144455f4d41494e4e4554").unwrap();
        assert_eq!(slot.as_short_string().as_deref(), Some("WP_ARCADE_MAINNET"));
        assert_eq!(slot.to_string(), "0x57505f4152434144455f4d41494e4e4554");

        // 31 chars, the widest short string
        let name = "WP_ABCDEFGHIJKLMNOPQRSTUVWXYZ01";
        let id = ChainId::parse(&format!("0x{}", hex::encode(name))).unwrap();
        assert_eq!(id.as_short_string().as_deref(), Some(name));
    }

    #[test]
    fn test_rejects_values_wider_than_a_felt() {
        let too_wide = format!("0x1{}", "0".repeat(63));
        assert!(ChainId::parse(&too_wide).is_err());
        let max_felt_width = format!("0x{}", "f".repeat(63));
        assert!(ChainId::parse(&max_felt_width).is_ok());
    }

    #[test]
    fn test_display_and_serde_are_hex() {
        assert_eq!(ChainId::from(255u64).to_string(), "0xff");
        assert_eq!(serde_json::to_string(&ChainId::from(1u64)).unwrap(), r#""0x1""#);
        let id: ChainId = serde_json::from_str(r#""0x534e5f4d41494e""#).unwrap();
        assert_eq!(id.as_short_string().as_deref(), Some("SN_MAIN"));
    }
}
