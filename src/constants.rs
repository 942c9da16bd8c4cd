//! Protocol constants used when building and signing transactions

/// Default transaction version
pub const DEFAULT_TX_VERSION: i32 = 2;

/// Default transaction locktime
pub const DEFAULT_TX_LOCKTIME: u32 = 0;

/// Sequence number for a final (non-replaceable) input
pub const SEQUENCE_FINAL: u32 = 0xffff_ffff;

/// Sequence number signalling opt-in replace-by-fee
pub const SEQUENCE_RBF: u32 = 0xffff_fffd;

/// Sequence number enabling an absolute (nLockTime) timelock
pub const SEQUENCE_ABSOLUTE_TIMELOCK: u32 = 0xffff_fffe;

/// Sequence value used when blanking other inputs for SIGHASH_NONE/SINGLE
pub const SEQUENCE_EMPTY: u32 = 0;

/// Relative timelock flag: value counts 512-second increments, not blocks
pub const SEQUENCE_TYPE_TIME: u32 = 1 << 22;

/// Signs all inputs and outputs
pub const SIGHASH_ALL: u8 = 0x01;

/// Signs all inputs, no outputs
pub const SIGHASH_NONE: u8 = 0x02;

/// Signs all inputs and the output matching the signed input's index
pub const SIGHASH_SINGLE: u8 = 0x03;

/// Modifier: sign only the input being signed
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Taproot default sighash (equivalent to ALL, encoded as zero)
pub const SIGHASH_DEFAULT: u8 = 0x00;

/// Leaf version for tapscript leaves (BIP342)
pub const LEAF_VERSION_TAPSCRIPT: u8 = 0xc0;

/// Mandatory first byte of a taproot annex witness element
pub const ANNEX_TAG: u8 = 0x50;

/// Maximum depth of a taproot script tree merkle path
pub const TAPROOT_CONTROL_MAX_NODE_COUNT: usize = 128;

/// Amount placeholder for blanked outputs in SIGHASH_SINGLE legacy digests
pub const NEGATIVE_SATOSHI: i64 = -1;

// Script opcodes (only the ones the builders and parsers need)
pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Base58 version byte for P2PKH on mainnet
pub const P2PKH_VERSION_MAINNET: u8 = 0x00;

/// Base58 version byte for P2PKH on testnet/regtest
pub const P2PKH_VERSION_TESTNET: u8 = 0x6f;

/// Base58 version byte for P2SH on mainnet
pub const P2SH_VERSION_MAINNET: u8 = 0x05;

/// Base58 version byte for P2SH on testnet/regtest
pub const P2SH_VERSION_TESTNET: u8 = 0xc4;
