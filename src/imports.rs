//!
//! This file contains the most common imports that
//! are used internally across the crate.
//!

pub use crate::address::{Address, Prefix};
pub use crate::error::Error;
pub use crate::events::{EventKind, Events};
pub use crate::network::{NetworkId, NetworkType};
pub use crate::result::Result;
pub use crate::rpc::Rpc;
pub use crate::rpc::{DynRpcApi, RpcCtl};
pub use crate::storage::*;
pub use crate::tx::MassCombinationStrategy;
pub use crate::tx::{ScriptPublicKey, TransactionId, TransactionIndexType, TransactionOutpoint};
pub use crate::utxo::balance::Balance;
pub use crate::utxo::{Maturity, NetworkParams, OutgoingTransaction, UtxoContext, UtxoEntryReference, UtxoProcessor};
pub use crate::{storage, utils};

pub use ahash::{AHashMap, AHashSet};
pub use async_trait::async_trait;
pub use borsh::{BorshDeserialize, BorshSerialize};
pub use dashmap::{DashMap, DashSet};
pub use futures::future::join_all;
pub use futures::{select, select_biased, FutureExt, Stream, StreamExt};
pub use pad::PadStr;
pub use separator::Separatable;
pub use serde::{Deserialize, Deserializer, Serialize};
pub use std::collections::{HashMap, HashSet, VecDeque};
pub use std::fmt;
pub use std::pin::Pin;
pub use std::str::FromStr;
pub use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
pub use std::sync::{Arc, Mutex, MutexGuard, RwLock};
pub use std::task::{Context, Poll};
pub use workflow_core::prelude::*;
pub use workflow_log::prelude::*;
