//!
//! Context balances.
//!

use crate::imports::*;

pub enum DeltaStyle {
    Mature,
    Pending,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
pub enum Delta {
    #[default]
    NoChange = 0,
    Increase,
    Decrease,
}

impl Delta {
    pub fn style(&self, s: &str, delta_style: DeltaStyle) -> String {
        match self {
            Delta::NoChange => "".to_string() + s,
            Delta::Increase => style(s).green().to_string(),
            Delta::Decrease => {
                if matches!(delta_style, DeltaStyle::Mature) {
                    style(s).red().to_string()
                } else {
                    style(s).dim().to_string()
                }
            }
        }
    }
}

impl From<std::cmp::Ordering> for Delta {
    fn from(o: std::cmp::Ordering) -> Self {
        match o {
            std::cmp::Ordering::Less => Delta::Decrease,
            std::cmp::Ordering::Greater => Delta::Increase,
            std::cmp::Ordering::Equal => Delta::NoChange,
        }
    }
}

/// Balance of a [`UtxoContext`](crate::utxo::UtxoContext), split into
/// mature (spendable), pending (awaiting maturity) and outgoing
/// (in-flight) totals.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub mature: u64,
    pub pending: u64,
    pub outgoing: u64,
    pub mature_utxo_count: usize,
    pub pending_utxo_count: usize,
    pub stasis_utxo_count: usize,
    #[serde(skip)]
    mature_delta: Delta,
    #[serde(skip)]
    pending_delta: Delta,
}

impl Balance {
    pub fn new(
        mature: u64,
        pending: u64,
        outgoing: u64,
        mature_utxo_count: usize,
        pending_utxo_count: usize,
        stasis_utxo_count: usize,
    ) -> Self {
        Self {
            mature,
            pending,
            outgoing,
            mature_delta: Delta::default(),
            pending_delta: Delta::default(),
            mature_utxo_count,
            pending_utxo_count,
            stasis_utxo_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mature == 0 && self.pending == 0
    }

    /// Compares the balance totals, disregarding deltas.
    pub fn eq_totals(&self, other: &Balance) -> bool {
        self.mature == other.mature
            && self.pending == other.pending
            && self.outgoing == other.outgoing
            && self.mature_utxo_count == other.mature_utxo_count
            && self.pending_utxo_count == other.pending_utxo_count
            && self.stasis_utxo_count == other.stasis_utxo_count
    }

    /// Total amount that can still enter the mature state.
    pub fn total(&self) -> u64 {
        self.mature + self.pending
    }

    pub fn delta(&mut self, previous: &Option<Balance>) {
        if let Some(previous) = previous {
            self.mature_delta = self.mature.cmp(&previous.mature).into();
            self.pending_delta = self.pending.cmp(&previous.pending).into();
        } else {
            self.mature_delta = Delta::NoChange;
            self.pending_delta = Delta::NoChange;
        }
    }

    pub fn to_balance_strings(&self, network_type: &NetworkType, padding: Option<usize>) -> BalanceStrings {
        (Some(self), network_type, padding).into()
    }
}

pub struct BalanceStrings {
    pub mature: String,
    pub pending: Option<String>,
}

impl From<(Option<&Balance>, &NetworkType, Option<usize>)> for BalanceStrings {
    fn from((balance, network_type, padding): (Option<&Balance>, &NetworkType, Option<usize>)) -> Self {
        let suffix = utils::kaspa_suffix(network_type);
        if let Some(balance) = balance {
            let mut mature = utils::sompi_to_kaspa_string(balance.mature);
            let mut pending = if balance.pending > 0 { Some(utils::sompi_to_kaspa_string(balance.pending)) } else { None };
            if let Some(padding) = padding {
                mature = mature.pad_to_width(padding);
                pending = pending.map(|pending| pending.pad_to_width(padding));
            }
            Self {
                mature: format!("{} {}", balance.mature_delta.style(&mature, DeltaStyle::Mature), suffix),
                pending: pending.map(|pending| format!("{} {}", balance.pending_delta.style(&pending, DeltaStyle::Pending), suffix)),
            }
        } else {
            Self { mature: format!("N/A {suffix}"), pending: None }
        }
    }
}

impl std::fmt::Display for BalanceStrings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(pending) = &self.pending {
            write!(f, "{} ({} pending)", self.mature, pending)
        } else {
            write!(f, "{}", self.mature)
        }
    }
}
