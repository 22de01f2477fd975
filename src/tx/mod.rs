//!
//! Transaction generation and processing primitives.
//!

pub mod consensus;
pub mod fees;
pub mod generator;
pub mod mass;
pub mod payment;
pub mod primitives;
pub mod serializable;

pub use self::consensus::*;
pub use self::fees::*;
pub use self::generator::*;
pub use self::mass::*;
pub use self::payment::*;
pub use self::primitives::*;
