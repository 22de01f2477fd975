//!
//! Kaspa value formatting and parsing utilities.
//!
//! All conversions are integer-exact. KAS amount strings are parsed
//! and rendered without passing through floating point, so values
//! survive a round-trip unchanged.
//!

use crate::address::Address;
use crate::error::Error;
use crate::network::NetworkType;
use crate::result::Result;
use crate::tx::SOMPI_PER_KASPA;
use separator::Separatable;
use workflow_log::style;

pub fn try_kaspa_str_to_sompi<S: Into<String>>(s: S) -> Result<Option<u64>> {
    let s: String = s.into();
    let amount = s.trim();
    if amount.is_empty() {
        return Ok(None);
    }

    Ok(Some(str_to_sompi(amount)?))
}

pub fn try_kaspa_str_to_sompi_i64<S: Into<String>>(s: S) -> Result<Option<i64>> {
    let s: String = s.into();
    let amount = s.trim();
    if amount.is_empty() {
        return Ok(None);
    }

    let (negative, amount) = match amount.strip_prefix('-') {
        Some(amount) => (true, amount),
        None => (false, amount),
    };
    let sompi = i64::try_from(str_to_sompi(amount)?).map_err(|_| Error::InvalidKaspaAmount(amount.to_string()))?;
    Ok(Some(if negative { -sompi } else { sompi }))
}

/// Renders a Sompi amount as a KAS string with the minimal number
/// of decimal places ("1.5", "0.00000001", "100").
pub fn sompi_to_kaspa_string(sompi: u64) -> String {
    let integer = sompi / SOMPI_PER_KASPA;
    let fraction = sompi % SOMPI_PER_KASPA;
    if fraction == 0 {
        integer.to_string()
    } else {
        let fraction = format!("{fraction:08}");
        format!("{}.{}", integer, fraction.trim_end_matches('0'))
    }
}

/// Renders a Sompi amount as a KAS string with all 8 decimal places
/// and a thousands-separated integer part.
pub fn sompi_to_kaspa_string_with_trailing_zeroes(sompi: u64) -> String {
    let integer = sompi / SOMPI_PER_KASPA;
    let fraction = sompi % SOMPI_PER_KASPA;
    format!("{}.{:08}", integer.separated_string(), fraction)
}

pub fn kaspa_suffix(network_type: &NetworkType) -> &'static str {
    match network_type {
        NetworkType::Mainnet => "KAS",
        NetworkType::Testnet => "TKAS",
        NetworkType::Simnet => "SKAS",
        NetworkType::Devnet => "DKAS",
    }
}

#[inline]
pub fn sompi_to_kaspa_string_with_suffix(sompi: u64, network_type: &NetworkType) -> String {
    let kas = sompi_to_kaspa_string(sompi);
    let suffix = kaspa_suffix(network_type);
    format!("{kas} {suffix}")
}

#[inline]
pub fn sompi_to_kaspa_string_with_trailing_zeroes_and_suffix(sompi: u64, network_type: &NetworkType) -> String {
    let kas = sompi_to_kaspa_string_with_trailing_zeroes(sompi);
    let suffix = kaspa_suffix(network_type);
    format!("{kas} {suffix}")
}

pub fn format_address_colors(address: &Address, range: Option<usize>) -> String {
    let address = address.to_string();

    let parts = address.split(':').collect::<Vec<&str>>();
    let prefix = style(parts[0]).dim();
    let payload = parts[1];
    let range = range.unwrap_or(6);
    let start = range;
    let finish = payload.len() - range;

    let left = &payload[0..start];
    let center = style(&payload[start..finish]).dim();
    let right = &payload[finish..];

    format!("{prefix}:{left}:{center}:{right}")
}

fn str_to_sompi(amount: &str) -> Result<u64> {
    let overflow = || Error::InvalidKaspaAmount(amount.to_string());

    let Some(dot_idx) = amount.find('.') else {
        return amount.parse::<u64>()?.checked_mul(SOMPI_PER_KASPA).ok_or_else(overflow);
    };
    let integer = amount[..dot_idx].parse::<u64>()?.checked_mul(SOMPI_PER_KASPA).ok_or_else(overflow)?;
    let decimal = &amount[dot_idx + 1..];
    let decimal_len = decimal.len();
    let decimal = if decimal_len == 0 {
        0
    } else if decimal_len <= 8 {
        decimal.parse::<u64>()? * 10u64.pow(8 - decimal_len as u32)
    } else {
        // sub-sompi precision cannot be represented
        return Err(overflow());
    };
    integer.checked_add(decimal).ok_or_else(overflow)
}
