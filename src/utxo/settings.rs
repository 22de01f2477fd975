//!
//! Network parameters that control maturity periods and other
//! transaction related properties of the UTXO subsystem.
//!
//! Parameters are plain values resolved from a [`NetworkId`] and
//! injected into the components that need them, so tests and
//! embedders can freely construct custom configurations.
//!

use crate::imports::*;

#[derive(Debug, Clone, Copy)]
pub struct NetworkParams {
    coinbase_transaction_maturity_period_daa: u64,
    coinbase_transaction_stasis_period_daa: u64,
    user_transaction_maturity_period_daa: u64,
    mass_combination_strategy: MassCombinationStrategy,
    additional_compound_transaction_mass: u64,
}

impl NetworkParams {
    pub const MAINNET: NetworkParams = NetworkParams {
        coinbase_transaction_maturity_period_daa: 100,
        coinbase_transaction_stasis_period_daa: 50,
        user_transaction_maturity_period_daa: 10,
        mass_combination_strategy: MassCombinationStrategy::Max,
        additional_compound_transaction_mass: 0,
    };

    pub const TESTNET10: NetworkParams = NetworkParams { ..Self::MAINNET };

    pub const TESTNET11: NetworkParams = NetworkParams {
        coinbase_transaction_maturity_period_daa: 1_000,
        coinbase_transaction_stasis_period_daa: 500,
        user_transaction_maturity_period_daa: 100,
        mass_combination_strategy: MassCombinationStrategy::Max,
        additional_compound_transaction_mass: 100,
    };

    pub const SIMNET: NetworkParams = NetworkParams { ..Self::MAINNET };

    pub const DEVNET: NetworkParams = NetworkParams { ..Self::MAINNET };

    #[inline]
    pub fn coinbase_transaction_maturity_period_daa(&self) -> u64 {
        self.coinbase_transaction_maturity_period_daa
    }

    #[inline]
    pub fn coinbase_transaction_stasis_period_daa(&self) -> u64 {
        self.coinbase_transaction_stasis_period_daa
    }

    #[inline]
    pub fn user_transaction_maturity_period_daa(&self) -> u64 {
        self.user_transaction_maturity_period_daa
    }

    #[inline]
    pub fn mass_combination_strategy(&self) -> MassCombinationStrategy {
        self.mass_combination_strategy
    }

    #[inline]
    pub fn additional_compound_transaction_mass(&self) -> u64 {
        self.additional_compound_transaction_mass
    }

    /// Overrides the DAA period after which coinbase transactions
    /// are considered mature.
    pub fn with_coinbase_transaction_maturity_period_daa(mut self, value: u64) -> Self {
        self.coinbase_transaction_maturity_period_daa = value;
        self
    }

    /// Overrides the DAA period after which user transactions
    /// are considered mature.
    pub fn with_user_transaction_maturity_period_daa(mut self, value: u64) -> Self {
        self.user_transaction_maturity_period_daa = value;
        self
    }
}

impl From<NetworkId> for NetworkParams {
    fn from(value: NetworkId) -> Self {
        match value.network_type {
            NetworkType::Mainnet => Self::MAINNET,
            NetworkType::Testnet => match value.suffix {
                Some(11) => Self::TESTNET11,
                _ => Self::TESTNET10,
            },
            NetworkType::Devnet => Self::DEVNET,
            NetworkType::Simnet => Self::SIMNET,
        }
    }
}
