//! Transaction wire format: serialization, parsing, identifiers and weight

use crate::encoding::{decode_compact_size, encode_compact_size, sha256d_hash, with_compact_size_prefix};
use crate::error::{Result, TxForgeError};
use crate::script::Script;
use crate::types::{OutPoint, Transaction, TxInput, TxOutput, Witness};

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;

impl OutPoint {
    /// Wire form: txid (internal order) followed by the output index
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(&self.txid);
        out.extend_from_slice(&self.index.to_le_bytes());
        out
    }
}

impl TxInput {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.prevout.serialize();
        out.extend_from_slice(&with_compact_size_prefix(&self.script_sig.serialize()));
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out
    }
}

impl TxOutput {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + 34);
        out.extend_from_slice(&self.amount.to_le_bytes());
        out.extend_from_slice(&with_compact_size_prefix(&self.script_pubkey.serialize()));
        out
    }
}

impl Witness {
    /// Wire form: item count, then each item length-prefixed
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = encode_compact_size(self.stack.len() as u64);
        for item in &self.stack {
            out.extend_from_slice(&with_compact_size_prefix(item));
        }
        out
    }
}

/// Byte cursor over a serialized transaction.
///
/// Wire parsing accepts non-minimal CompactSize encodings, matching node
/// behaviour for transaction structure.
struct Reader<'a> {
    bytes: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, cursor: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .cursor
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                TxForgeError::Format(format!(
                    "Transaction truncated: needed {} bytes at offset {}",
                    n, self.cursor
                ))
            })?;
        let slice = &self.bytes[self.cursor..end];
        self.cursor = end;
        Ok(slice)
    }

    fn u32_le(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn i32_le(&mut self) -> Result<i32> {
        let bytes = self.take(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn i64_le(&mut self) -> Result<i64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(i64::from_le_bytes(buf))
    }

    fn compact_size(&mut self) -> Result<u64> {
        let (value, consumed) = decode_compact_size(&self.bytes[self.cursor..], false)?;
        self.cursor += consumed;
        Ok(value)
    }

    fn var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.item_count(1)?;
        Ok(self.take(len)?.to_vec())
    }

    /// Reads a CompactSize count and rejects it if `count * min_item_size`
    /// cannot fit in the remaining bytes, so counts are bounded before any
    /// allocation sized from them.
    fn item_count(&mut self, min_item_size: usize) -> Result<usize> {
        let count = self.compact_size()?;
        let remaining = (self.bytes.len() - self.cursor) as u64;
        if count > remaining / min_item_size as u64 {
            return Err(TxForgeError::Format(format!(
                "Count of {} items exceeds the {} remaining bytes",
                count, remaining
            )));
        }
        Ok(count as usize)
    }

    fn done(&self) -> bool {
        self.cursor == self.bytes.len()
    }
}

impl Transaction {
    /// Serializes to the wire format.
    ///
    /// When `segwit` is set, emits the marker/flag pair and one witness
    /// stack per input; inputs past the end of `witnesses` get an empty
    /// stack so the witness section stays positional.
    pub fn serialize(&self) -> Vec<u8> {
        self.serialize_inner(self.segwit)
    }

    /// Serializes without the witness section, regardless of the segwit flag
    pub fn serialize_legacy(&self) -> Vec<u8> {
        self.serialize_inner(false)
    }

    fn serialize_inner(&self, with_witness: bool) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());

        if with_witness {
            out.push(SEGWIT_MARKER);
            out.push(SEGWIT_FLAG);
        }

        out.extend_from_slice(&encode_compact_size(self.inputs.len() as u64));
        for input in &self.inputs {
            out.extend_from_slice(&input.serialize());
        }

        out.extend_from_slice(&encode_compact_size(self.outputs.len() as u64));
        for output in &self.outputs {
            out.extend_from_slice(&output.serialize());
        }

        if with_witness {
            let empty = Witness::empty();
            for index in 0..self.inputs.len() {
                let witness = self.witnesses.get(index).unwrap_or(&empty);
                out.extend_from_slice(&witness.serialize());
            }
        }

        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// Parses a transaction from wire bytes, rejecting trailing data
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let version = reader.i32_le()?;

        // segwit marker: zero inputs is impossible, so 0x00 here is the marker
        let segwit = bytes.get(4) == Some(&SEGWIT_MARKER);
        if segwit {
            let flag = reader.take(2)?[1];
            if flag != SEGWIT_FLAG {
                return Err(TxForgeError::Format(format!(
                    "Unknown segwit flag 0x{:02x}",
                    flag
                )));
            }
        }

        // a serialized input is at least 41 bytes: outpoint, empty
        // scriptSig, sequence
        let input_count = reader.item_count(41)?;
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            let mut txid = [0u8; 32];
            txid.copy_from_slice(reader.take(32)?);
            let index = reader.u32_le()?;
            let script_sig = Script::deserialize(&reader.var_bytes()?)?;
            let sequence = reader.u32_le()?;
            inputs.push(TxInput {
                prevout: OutPoint::new(txid, index),
                script_sig,
                sequence,
            });
        }

        // amount plus an empty script: 9 bytes minimum per output
        let output_count = reader.item_count(9)?;
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            let amount = reader.i64_le()?;
            let script_pubkey = Script::deserialize(&reader.var_bytes()?)?;
            outputs.push(TxOutput::new(amount, script_pubkey));
        }

        let mut witnesses = Vec::new();
        if segwit {
            for _ in 0..input_count {
                let item_count = reader.item_count(1)?;
                let mut stack = Vec::with_capacity(item_count);
                for _ in 0..item_count {
                    stack.push(reader.var_bytes()?);
                }
                witnesses.push(Witness::new(stack));
            }
        }

        let locktime = reader.u32_le()?;
        if !reader.done() {
            return Err(TxForgeError::Format(format!(
                "{} trailing bytes after transaction",
                bytes.len() - reader.cursor
            )));
        }

        Ok(Transaction {
            version,
            inputs,
            outputs,
            witnesses,
            locktime,
            segwit,
        })
    }

    /// Transaction id: SHA256d of the witness-stripped serialization,
    /// internal byte order
    pub fn txid(&self) -> [u8; 32] {
        sha256d_hash(&self.serialize_legacy())
    }

    /// Witness transaction id; equals `txid` for non-segwit transactions
    pub fn wtxid(&self) -> [u8; 32] {
        sha256d_hash(&self.serialize())
    }

    /// Txid in display order (little-endian hex)
    pub fn txid_hex(&self) -> String {
        let mut bytes = self.txid();
        bytes.reverse();
        hex::encode(bytes)
    }

    /// Wtxid in display order (little-endian hex)
    pub fn wtxid_hex(&self) -> String {
        let mut bytes = self.wtxid();
        bytes.reverse();
        hex::encode(bytes)
    }

    /// Total serialized size in bytes
    pub fn size(&self) -> usize {
        self.serialize().len()
    }

    /// BIP141 weight: 3x the witness-stripped size plus the total size
    pub fn weight(&self) -> usize {
        3 * self.serialize_legacy().len() + self.size()
    }

    /// Virtual size: weight divided by 4, rounded up
    pub fn vsize(&self) -> usize {
        self.weight().div_ceil(4)
    }
}
