//!
//! Transaction fee variants.
//!

use crate::result::Result;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Transaction fees. Fees are comprised of 2 values:
///
/// `relay` fees - mandatory fees that are required to relay the transaction
/// `priority` fees - optional fees applied to the final outgoing transaction
/// in addition to `relay` fees.
///
/// Fees can be:
/// - `SenderPays` - (standard) fees are added on top of the outgoing
///   transaction value and are absorbed by the change.
/// - `ReceiverPays` - fees are subtracted from the outgoing transaction
///   value, so the receiver gets the payment amount minus fees.
///
/// NOTE: If the priority fee is `0`, the variants control who pays
/// the `relay` fees.
///
/// NOTE: `ReceiverPays` can fail during the generation process if the
/// final transaction value is not sufficient to cover the fees. Use
/// estimation to check that the funds are sufficient before generating.
///
#[derive(Debug, Clone, Copy, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fees {
    /// Fee management disabled (sweep transactions, pays all fees)
    None,
    /// Priority fees are added on top of the transaction value
    SenderPays(u64),
    /// All transaction fees are subtracted from the transaction value
    ReceiverPays(u64),
}

impl Fees {
    pub fn is_none(&self) -> bool {
        matches!(self, Fees::None)
    }

    /// Priority fee amount irrespective of the variant.
    pub fn additional(&self) -> u64 {
        match self {
            Fees::None => 0,
            Fees::SenderPays(fee) | Fees::ReceiverPays(fee) => *fee,
        }
    }

    pub fn sender_pays(&self) -> bool {
        matches!(self, Fees::SenderPays(_))
    }

    pub fn receiver_pays(&self) -> bool {
        matches!(self, Fees::ReceiverPays(_))
    }
}

/// Converts a positive `i64` value into `SenderPays` fees and a
/// negative `i64` value into `ReceiverPays` fees.
impl From<i64> for Fees {
    fn from(fee: i64) -> Self {
        if fee < 0 {
            Fees::ReceiverPays(fee.unsigned_abs())
        } else {
            Fees::SenderPays(fee as u64)
        }
    }
}

impl From<u64> for Fees {
    fn from(fee: u64) -> Self {
        Fees::SenderPays(fee)
    }
}

impl TryFrom<&str> for Fees {
    type Error = crate::error::Error;
    fn try_from(fee: &str) -> Result<Self> {
        if fee.is_empty() {
            Ok(Fees::None)
        } else {
            let fee = crate::utils::try_kaspa_str_to_sompi_i64(fee)?.unwrap_or(0);
            Ok(Fees::from(fee))
        }
    }
}

impl TryFrom<String> for Fees {
    type Error = crate::error::Error;
    fn try_from(fee: String) -> Result<Self> {
        Self::try_from(fee.as_str())
    }
}
