//!
//! Address type used to bind UTXO entries to their owners.
//!
//! The engine treats addresses as opaque `prefix:payload` value types.
//! The human-readable cashaddr codec lives outside of this crate; the
//! textual form used here encodes the version byte followed by the
//! payload as hex, which is sufficient for routing, logging and
//! storage purposes.
//!

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::Error;
use crate::network::NetworkType;
use crate::tx::ScriptPublicKey;

/// Address prefix identifying the network an address belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prefix {
    Mainnet,
    Testnet,
    Simnet,
    Devnet,
}

impl Prefix {
    fn as_str(&self) -> &'static str {
        match self {
            Prefix::Mainnet => "kaspa",
            Prefix::Testnet => "kaspatest",
            Prefix::Simnet => "kaspasim",
            Prefix::Devnet => "kaspadev",
        }
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Prefix {
    type Err = Error;
    fn from_str(prefix: &str) -> Result<Self, Self::Err> {
        match prefix {
            "kaspa" => Ok(Prefix::Mainnet),
            "kaspatest" => Ok(Prefix::Testnet),
            "kaspasim" => Ok(Prefix::Simnet),
            "kaspadev" => Ok(Prefix::Devnet),
            _ => Err(Error::InvalidAddress(prefix.to_string())),
        }
    }
}

/// Address version determining the payload interpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
pub enum Version {
    /// Schnorr public key (32 bytes).
    PubKey = 0,
    /// ECDSA public key (33 bytes).
    PubKeyEcdsa = 1,
    /// Blake2b hash of a redeem script (32 bytes).
    ScriptHash = 8,
}

impl Version {
    pub fn public_key_len(&self) -> usize {
        match self {
            Version::PubKey => 32,
            Version::PubKeyEcdsa => 33,
            Version::ScriptHash => 32,
        }
    }
}

impl TryFrom<u8> for Version {
    type Error = Error;
    fn try_from(version: u8) -> Result<Self, Self::Error> {
        match version {
            0 => Ok(Version::PubKey),
            1 => Ok(Version::PubKeyEcdsa),
            8 => Ok(Version::ScriptHash),
            _ => Err(Error::InvalidAddress(format!("unknown address version {version}"))),
        }
    }
}

/// A Kaspa address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, BorshSerialize, BorshDeserialize)]
pub struct Address {
    pub prefix: Prefix,
    pub version: Version,
    pub payload: Vec<u8>,
}

impl Address {
    pub fn new(prefix: Prefix, version: Version, payload: &[u8]) -> Self {
        Self { prefix, version, payload: payload.to_vec() }
    }

    pub fn network_type(&self) -> NetworkType {
        match self.prefix {
            Prefix::Mainnet => NetworkType::Mainnet,
            Prefix::Testnet => NetworkType::Testnet,
            Prefix::Simnet => NetworkType::Simnet,
            Prefix::Devnet => NetworkType::Devnet,
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut bytes = Vec::with_capacity(self.payload.len() + 1);
        bytes.push(self.version as u8);
        bytes.extend_from_slice(&self.payload);
        write!(f, "{}:{}", self.prefix, faster_hex::hex_string(&bytes))
    }
}

impl FromStr for Address {
    type Err = Error;
    fn from_str(address: &str) -> Result<Self, Self::Err> {
        let (prefix, hex) = address.split_once(':').ok_or_else(|| Error::InvalidAddress(address.to_string()))?;
        let prefix = Prefix::from_str(prefix)?;
        let mut bytes = vec![0u8; hex.len() / 2];
        faster_hex::hex_decode(hex.as_bytes(), &mut bytes).map_err(|_| Error::InvalidAddress(address.to_string()))?;
        let (version, payload) = bytes.split_first().ok_or_else(|| Error::InvalidAddress(address.to_string()))?;
        let version = Version::try_from(*version)?;
        if payload.len() != version.public_key_len() {
            return Err(Error::InvalidAddress(address.to_string()));
        }
        Ok(Address { prefix, version, payload: payload.to_vec() })
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct AddressVisitor;

impl de::Visitor<'_> for AddressVisitor {
    type Value = Address;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string containing a prefix-qualified address")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Address::from_str(value).map_err(|err| de::Error::custom(err.to_string()))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(AddressVisitor)
    }
}

// Script opcodes used by the standard payment scripts below.
const OP_CHECK_SIG: u8 = 0xac;
const OP_CHECK_SIG_ECDSA: u8 = 0xab;
const OP_BLAKE2B: u8 = 0xaa;
const OP_EQUAL: u8 = 0x87;
const OP_DATA_32: u8 = 0x20;
const OP_DATA_33: u8 = 0x21;

/// Builds the standard script paying to the supplied address.
pub fn pay_to_address_script(address: &Address) -> ScriptPublicKey {
    let mut script = Vec::with_capacity(address.payload.len() + 3);
    match address.version {
        Version::PubKey => {
            script.push(OP_DATA_32);
            script.extend_from_slice(&address.payload);
            script.push(OP_CHECK_SIG);
        }
        Version::PubKeyEcdsa => {
            script.push(OP_DATA_33);
            script.extend_from_slice(&address.payload);
            script.push(OP_CHECK_SIG_ECDSA);
        }
        Version::ScriptHash => {
            script.push(OP_BLAKE2B);
            script.push(OP_DATA_32);
            script.extend_from_slice(&address.payload);
            script.push(OP_EQUAL);
        }
    }
    ScriptPublicKey::new(0, script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let address = Address::new(Prefix::Mainnet, Version::PubKey, &[0xabu8; 32]);
        let text = address.to_string();
        assert!(text.starts_with("kaspa:"));
        assert_eq!(Address::from_str(&text).unwrap(), address);

        assert!(Address::from_str("kaspa").is_err());
        assert!(Address::from_str("bitcoin:00").is_err());
    }

    #[test]
    fn test_pay_to_address_script() {
        let address = Address::new(Prefix::Testnet, Version::PubKey, &[0x11u8; 32]);
        let script = pay_to_address_script(&address);
        assert_eq!(script.script().len(), 34);
        assert_eq!(script.script()[0], OP_DATA_32);
        assert_eq!(script.script()[33], OP_CHECK_SIG);
    }
}
