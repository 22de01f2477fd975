//!
//! Consensus parameters and constants governing transaction
//! mass, fees and the monetary supply.
//!

use crate::address::{Address, Prefix};
use crate::network::NetworkType;

/// Number of Sompi per KAS.
pub const SOMPI_PER_KASPA: u64 = 100_000_000;

/// Maximum amount of Sompi that can ever exist (29 billion KAS).
pub const MAX_SOMPI: u64 = 29_000_000_000 * SOMPI_PER_KASPA;

/// DAA score assigned to UTXO entries that have not yet been accepted.
pub const UNACCEPTED_DAA_SCORE: u64 = u64::MAX;

/// Maximum mass a transaction may have and still be accepted
/// into the mempool and relayed across the network.
pub const MAXIMUM_STANDARD_TRANSACTION_MASS: u64 = 100_000;

/// Minimum fee, in Sompi per 1000 grams of mass, a transaction
/// must pay to be accepted into the mempool and relayed.
pub const MINIMUM_RELAY_TRANSACTION_FEE: u64 = 1_000;

/// Factor translating transient byte size into transient mass.
pub const TRANSIENT_BYTE_TO_MASS_FACTOR: u64 = 4;

/// Consensus parameters relevant to transaction mass and fee
/// calculations, per network.
#[derive(Clone, Copy, Debug)]
pub struct Params {
    pub mass_per_tx_byte: u64,
    pub mass_per_script_pub_key_byte: u64,
    pub mass_per_sig_op: u64,
    pub storage_mass_parameter: u64,
    pub max_tx_inputs: usize,
    pub max_tx_outputs: usize,
}

pub const MAINNET_PARAMS: Params = Params {
    mass_per_tx_byte: 1,
    mass_per_script_pub_key_byte: 10,
    mass_per_sig_op: 1000,
    storage_mass_parameter: 10u64.pow(12),
    max_tx_inputs: 10_000,
    max_tx_outputs: 10_000,
};

pub const TESTNET_PARAMS: Params = Params {
    mass_per_tx_byte: 1,
    mass_per_script_pub_key_byte: 10,
    mass_per_sig_op: 1000,
    storage_mass_parameter: 10u64.pow(12),
    max_tx_inputs: 10_000,
    max_tx_outputs: 10_000,
};

pub const SIMNET_PARAMS: Params = Params {
    mass_per_tx_byte: 1,
    mass_per_script_pub_key_byte: 10,
    mass_per_sig_op: 1000,
    storage_mass_parameter: 10u64.pow(12),
    max_tx_inputs: 10_000,
    max_tx_outputs: 10_000,
};

pub const DEVNET_PARAMS: Params = Params {
    mass_per_tx_byte: 1,
    mass_per_script_pub_key_byte: 10,
    mass_per_sig_op: 1000,
    storage_mass_parameter: 10u64.pow(12),
    max_tx_inputs: 10_000,
    max_tx_outputs: 10_000,
};

/// Consensus parameters for a given address prefix.
pub fn get_consensus_params_by_address(address: &Address) -> Params {
    match address.prefix {
        Prefix::Mainnet => MAINNET_PARAMS,
        Prefix::Testnet => TESTNET_PARAMS,
        Prefix::Simnet => SIMNET_PARAMS,
        Prefix::Devnet => DEVNET_PARAMS,
    }
}

/// Consensus parameters for a given network type.
pub fn get_consensus_params_by_network(network: &NetworkType) -> Params {
    match network {
        NetworkType::Mainnet => MAINNET_PARAMS,
        NetworkType::Testnet => TESTNET_PARAMS,
        NetworkType::Simnet => SIMNET_PARAMS,
        NetworkType::Devnet => DEVNET_PARAMS,
    }
}

impl From<NetworkType> for Params {
    fn from(network_type: NetworkType) -> Self {
        get_consensus_params_by_network(&network_type)
    }
}
