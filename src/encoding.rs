//! Canonical encoding primitives: CompactSize integers, Base58Check and
//! bech32/bech32m address text, and the hash helpers the rest of the crate
//! builds on.

use bech32::{Fe32, Hrp};
use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::error::{Result, TxForgeError};
use crate::types::Hash;

/// SHA256(data)
pub fn sha256(data: &[u8]) -> Hash {
    let digest = Sha256::digest(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);
    hash
}

/// SHA256(SHA256(data))
pub fn sha256d_hash(data: &[u8]) -> Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(data);
    let result = sha256d::Hash::from_engine(engine);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripemd = Ripemd160::digest(sha);
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&ripemd);
    hash
}

/// Encode an unsigned integer as a CompactSize (varint).
///
/// 1 byte below 0xfd, then 0xfd/0xfe/0xff prefixed little-endian 2/4/8 byte
/// forms at the canonical size-class boundaries.
pub fn encode_compact_size(n: u64) -> Vec<u8> {
    if n < 0xfd {
        vec![n as u8]
    } else if n < 0x1_0000 {
        let mut out = vec![0xfd];
        out.extend_from_slice(&(n as u16).to_le_bytes());
        out
    } else if n < 0x1_0000_0000 {
        let mut out = vec![0xfe];
        out.extend_from_slice(&(n as u32).to_le_bytes());
        out
    } else {
        let mut out = vec![0xff];
        out.extend_from_slice(&n.to_le_bytes());
        out
    }
}

/// Decode a CompactSize, returning the value and bytes consumed.
///
/// With `strict` set, non-minimal encodings (e.g. 0xfd 0x05 0x00) are
/// rejected; consensus transaction parsing passes `false`.
pub fn decode_compact_size(bytes: &[u8], strict: bool) -> Result<(u64, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| TxForgeError::Format("Truncated CompactSize".to_string()))?;

    let (value, consumed, floor) = match first {
        0..=0xfc => return Ok((first as u64, 1)),
        0xfd => {
            let raw = read_le_bytes(bytes, 2)?;
            (raw, 3, 0xfd)
        }
        0xfe => {
            let raw = read_le_bytes(bytes, 4)?;
            (raw, 5, 0x1_0000)
        }
        0xff => {
            let raw = read_le_bytes(bytes, 8)?;
            (raw, 9, 0x1_0000_0000)
        }
    };

    if strict && value < floor {
        return Err(TxForgeError::Format(format!(
            "Non-minimal CompactSize encoding of {}",
            value
        )));
    }
    Ok((value, consumed))
}

fn read_le_bytes(bytes: &[u8], width: usize) -> Result<u64> {
    if bytes.len() < 1 + width {
        return Err(TxForgeError::Format("Truncated CompactSize".to_string()));
    }
    let mut value = 0u64;
    for (i, b) in bytes[1..1 + width].iter().enumerate() {
        value |= (*b as u64) << (8 * i);
    }
    Ok(value)
}

/// Prepend the CompactSize of `data`'s length to `data`
pub fn with_compact_size_prefix(data: &[u8]) -> Vec<u8> {
    let mut out = encode_compact_size(data.len() as u64);
    out.extend_from_slice(data);
    out
}

/// Base58Check-encode a version byte plus payload.
///
/// The 4-byte checksum is the first bytes of SHA256d(version || payload).
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(payload.len() + 5);
    data.push(version);
    data.extend_from_slice(payload);
    let checksum = sha256d_hash(&data);
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).into_string()
}

/// Decode a Base58Check string into its version byte and payload
pub fn base58check_decode(text: &str) -> Result<(u8, Vec<u8>)> {
    let decoded = bs58::decode(text)
        .into_vec()
        .map_err(|e| TxForgeError::Format(format!("Invalid base58: {}", e)))?;
    if decoded.len() < 5 {
        return Err(TxForgeError::Format(format!(
            "Base58Check payload too short: {} bytes",
            decoded.len()
        )));
    }
    let (body, checksum) = decoded.split_at(decoded.len() - 4);
    let expected = sha256d_hash(body);
    if checksum != &expected[..4] {
        return Err(TxForgeError::Checksum(
            "Base58Check checksum mismatch".to_string(),
        ));
    }
    Ok((body[0], body[1..].to_vec()))
}

/// Encode a segwit address: bech32 for witness version 0, bech32m above
pub fn segwit_address_encode(hrp: &str, witness_version: u8, program: &[u8]) -> Result<String> {
    let hrp = Hrp::parse(hrp)
        .map_err(|e| TxForgeError::Format(format!("Invalid address prefix: {}", e)))?;
    let version = Fe32::try_from(witness_version)
        .map_err(|_| TxForgeError::Format(format!("Invalid witness version {}", witness_version)))?;
    bech32::segwit::encode(hrp, version, program)
        .map_err(|e| TxForgeError::Format(format!("Invalid witness program: {}", e)))
}

/// Decode a segwit address into (hrp, witness version, program).
///
/// The bech32 crate verifies the checksum variant against the witness
/// version (bech32 for v0, bech32m for v1+) per BIP173/BIP350.
pub fn segwit_address_decode(address: &str) -> Result<(String, u8, Vec<u8>)> {
    let (hrp, version, program) = bech32::segwit::decode(address)
        .map_err(|e| TxForgeError::Checksum(format!("Invalid bech32 address: {}", e)))?;
    Ok((hrp.to_string(), version.to_u8(), program))
}
