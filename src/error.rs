//!
//! Error types produced by the engine.
//!

use thiserror::Error;
use workflow_core::abortable::Aborted;
use workflow_core::channel::{ChannelError, RecvError, SendError, TrySendError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Custom(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    ParseInt(#[from] std::num::ParseIntError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid network type: {0}")]
    InvalidNetworkType(String),

    #[error("Invalid network id: {0}")]
    InvalidNetworkId(String),

    #[error("Network id is not set")]
    MissingNetworkId,

    #[error("Network type mismatch, expecting {0}, connected node network is {1}")]
    NetworkTypeConnectionMismatch(String, String),

    #[error("Not connected")]
    NotConnected,

    #[error("The connected node does not have UTXO index enabled")]
    MissingUtxoIndex,

    #[error("DAA score is not available: {0}")]
    MissingDaaScore(&'static str),

    #[error("Invalid KAS amount: '{0}'")]
    InvalidKaspaAmount(String),

    #[error("Insufficient funds")]
    InsufficientFunds { additional_needed: u64, origin: &'static str },

    #[error("Transaction outputs exceed the maximum allowed mass")]
    GeneratorTransactionOutputsAreTooHeavy { mass: u64, kind: &'static str },

    #[error("Storage mass exceeds maximum")]
    GeneratorTransactionIsTooHeavy,

    #[error("Sweep transactions should not contain priority fees")]
    GeneratorFeesInSweepTransaction,

    #[error("Payment outputs may not contain zero-value outputs")]
    GeneratorZeroValuePaymentOutput,

    #[error("Change address does not match supplied network type")]
    GeneratorChangeAddressNetworkTypeMismatch,

    #[error("Payment output address does not match supplied network type")]
    GeneratorPaymentOutputNetworkTypeMismatch,

    #[error(transparent)]
    Aborted(#[from] Aborted),

    #[error("Channel error")]
    ChannelRecvError(#[from] RecvError),
}

impl Error {
    pub fn custom<T: Into<String>>(msg: T) -> Self {
        Error::Custom(msg.into())
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Self::Custom(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Self::Custom(err)
    }
}

impl<T> From<ChannelError<T>> for Error {
    fn from(e: ChannelError<T>) -> Error {
        Error::Custom(e.to_string())
    }
}

impl<T> From<SendError<T>> for Error {
    fn from(e: SendError<T>) -> Error {
        Error::Custom(e.to_string())
    }
}

impl<T> From<TrySendError<T>> for Error {
    fn from(e: TrySendError<T>) -> Error {
        Error::Custom(e.to_string())
    }
}
