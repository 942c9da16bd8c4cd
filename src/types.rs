//! Core data types for transaction construction

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{Result, TxForgeError};
use crate::script::Script;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Bitcoin network, selecting address version bytes and bech32 prefixes.
///
/// Network parameters are always passed explicitly; there is no process-wide
/// network configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    /// Human-readable part for bech32/bech32m addresses
    pub fn hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => "bc",
            Network::Testnet => "tb",
            Network::Regtest => "bcrt",
        }
    }

    /// Base58Check version byte for P2PKH addresses
    pub fn p2pkh_version(&self) -> u8 {
        match self {
            Network::Mainnet => P2PKH_VERSION_MAINNET,
            Network::Testnet | Network::Regtest => P2PKH_VERSION_TESTNET,
        }
    }

    /// Base58Check version byte for P2SH addresses
    pub fn p2sh_version(&self) -> u8 {
        match self {
            Network::Mainnet => P2SH_VERSION_MAINNET,
            Network::Testnet | Network::Regtest => P2SH_VERSION_TESTNET,
        }
    }
}

/// Reference to a previous transaction output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Previous transaction id in internal (serialized) byte order
    pub txid: Hash,
    pub index: u32,
}

impl OutPoint {
    pub fn new(txid: Hash, index: u32) -> Self {
        Self { txid, index }
    }

    /// Builds an outpoint from a txid as displayed by explorers and nodes
    /// (little-endian hex), reversing it into internal byte order.
    pub fn from_txid_hex(txid_hex: &str, index: u32) -> Result<Self> {
        let mut bytes = hex::decode(txid_hex)
            .map_err(|e| TxForgeError::Format(format!("Invalid txid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(TxForgeError::Format(format!(
                "Txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        bytes.reverse();
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes);
        Ok(Self { txid, index })
    }

    /// Txid in display order (little-endian hex)
    pub fn txid_hex(&self) -> String {
        let mut bytes = self.txid;
        bytes.reverse();
        hex::encode(bytes)
    }
}

/// Transaction input: previous output, unlocking script and sequence.
///
/// The sequence is mandatory and explicit. Whether a default should signal
/// RBF is a policy decision left to the caller; see the `Sequence` builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prevout: OutPoint,
    pub script_sig: Script,
    pub sequence: u32,
}

impl TxInput {
    pub fn new(prevout: OutPoint, sequence: u32) -> Self {
        Self {
            prevout,
            script_sig: Script::new(),
            sequence,
        }
    }
}

/// Transaction output: amount in satoshis and locking script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: i64,
    pub script_pubkey: Script,
}

impl TxOutput {
    pub fn new(amount: i64, script_pubkey: Script) -> Self {
        Self {
            amount,
            script_pubkey,
        }
    }
}

/// Witness stack for one input: an ordered list of byte strings.
///
/// "No witness" is modelled as an explicit empty stack, never as a missing
/// entry, so the serialized witness section is always positional with the
/// inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    pub stack: Vec<ByteString>,
}

impl Witness {
    pub fn new(stack: Vec<ByteString>) -> Self {
        Self { stack }
    }

    pub fn empty() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// A Bitcoin transaction.
///
/// `witnesses` is positional with `inputs`. When `segwit` is set the
/// serialized form carries the marker/flag pair and one witness stack per
/// input; inputs without one are padded with an empty stack at
/// serialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: i32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub witnesses: Vec<Witness>,
    pub locktime: u32,
    pub segwit: bool,
}

impl Transaction {
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        Self {
            version: DEFAULT_TX_VERSION,
            inputs,
            outputs,
            witnesses: Vec::new(),
            locktime: DEFAULT_TX_LOCKTIME,
            segwit: false,
        }
    }
}

/// Input sequence builders for timelocks and RBF.
///
/// These only compute values; nothing in the library applies one implicitly.
pub struct Sequence;

impl Sequence {
    /// Final sequence, disables both RBF and relative timelocks
    pub fn final_() -> u32 {
        SEQUENCE_FINAL
    }

    /// Opt-in replace-by-fee
    pub fn rbf() -> u32 {
        SEQUENCE_RBF
    }

    /// Sequence that keeps an absolute nLockTime enforceable
    pub fn absolute_timelock() -> u32 {
        SEQUENCE_ABSOLUTE_TIMELOCK
    }

    /// Relative timelock in blocks (BIP68); value must fit in 16 bits
    pub fn relative_blocks(blocks: u16) -> u32 {
        blocks as u32
    }

    /// Relative timelock in 512-second increments (BIP68)
    pub fn relative_time(increments: u16) -> u32 {
        SEQUENCE_TYPE_TIME | increments as u32
    }
}
