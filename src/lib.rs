//! # TxForge
//!
//! Bitcoin transaction construction, serialization and signing, covering
//! legacy (P2PKH/P2SH), segwit v0 (P2WPKH/P2WSH) and taproot
//! (key-path and script-path) spends.
//!
//! ## Architecture
//!
//! The crate is a pure core: no I/O, no shared mutable state, every
//! operation deterministic in its inputs. External concerns sit behind two
//! traits:
//! - [`signer::PrevOutputProvider`] — spent-output lookup
//! - [`signer::SigningBackend`] — ECDSA/schnorr signing capability
//!
//! ## Design Principles
//!
//! 1. **Exact binary formats**: CompactSize, script push encodings and the
//!    three sighash preimages follow the consensus rules byte for byte
//! 2. **Positional witnesses**: the witness section always carries one
//!    stack per input; padding with empty stacks is automatic
//! 3. **Explicit parameters**: network and sequence values are always
//!    passed in, never taken from ambient configuration
//! 4. **Exact Version Pinning**: consensus-critical cryptography
//!    dependencies are pinned to exact versions
//!
//! ## Usage
//!
//! ```rust
//! use txforge::address::Address;
//! use txforge::types::*;
//!
//! let destination = Address::decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap();
//!
//! let input = TxInput::new(
//!     OutPoint::from_txid_hex(
//!         "9f96ade4b41d5433f4eda31e1738ec2b36f6e7d1420d94a6af99801a88f7f7ff",
//!         0,
//!     )
//!     .unwrap(),
//!     Sequence::rbf(),
//! );
//! let output = TxOutput::new(50_000, destination.to_script_pubkey());
//!
//! let tx = Transaction::new(vec![input], vec![output]);
//! assert_eq!(tx.version, 2);
//! assert_eq!(tx.serialize().len(), tx.size());
//! ```

pub mod types;
pub mod constants;
pub mod encoding;
pub mod script;
pub mod address;
pub mod taproot;
pub mod sighash;
pub mod transaction;
pub mod signer;
pub mod error;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use error::{Result, TxForgeError};
