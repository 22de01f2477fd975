//!
//! Signing trait consumed by the transaction [`Generator`](super::Generator).
//! Cryptographic key handling and signature algorithms live outside of
//! this crate; implementations of [`SignerT`] bridge the two.
//!

use crate::imports::*;
use crate::tx::SignableTransaction;

pub trait SignerT: Send + Sync + 'static {
    /// Sign all inputs of the supplied transaction. The `addresses`
    /// slice lists the unique addresses spent by the transaction inputs
    /// and can be used to locate the corresponding private keys.
    fn try_sign(&self, transaction: SignableTransaction, addresses: &[Address]) -> Result<SignableTransaction>;

    /// Produce a signature script for a single input.
    fn try_create_input_signature(
        &self,
        transaction: &SignableTransaction,
        input_index: usize,
        address: &Address,
    ) -> Result<Vec<u8>>;
}
