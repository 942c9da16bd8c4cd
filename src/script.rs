//! Bitcoin Script as an ordered command sequence

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::encoding::{hash160, sha256};
use crate::error::{Result, TxForgeError};
use crate::types::{ByteString, Hash};

/// One script command: a raw opcode or a data push.
///
/// Small-integer pushes are normalized to `Push`: OP_0 is the empty push,
/// OP_1..OP_16 are single-byte pushes of 1..16, so a command sequence always
/// re-serializes with the minimal push encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Op(u8),
    Push(ByteString),
}

/// An ordered sequence of script commands
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    commands: Vec<Command>,
}

impl Script {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    pub fn from_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Appends a raw opcode
    pub fn push_op(mut self, opcode: u8) -> Self {
        self.commands.push(Command::Op(opcode));
        self
    }

    /// Appends a data push
    pub fn push_data(mut self, data: &[u8]) -> Self {
        self.commands.push(Command::Push(data.to_vec()));
        self
    }

    /// Serializes each command with its minimal push encoding
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for command in &self.commands {
            match command {
                Command::Op(opcode) => out.push(*opcode),
                Command::Push(data) => serialize_push(&mut out, data),
            }
        }
        out
    }

    /// Parses raw script bytes into a command sequence.
    ///
    /// The scan is iterative so scripts with tens of thousands of commands
    /// parse without recursion depth limits.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut commands = Vec::new();
        let mut cursor = 0usize;

        while cursor < bytes.len() {
            let opcode = bytes[cursor];
            cursor += 1;

            match opcode {
                OP_0 => commands.push(Command::Push(Vec::new())),
                0x01..=0x4b => {
                    let len = opcode as usize;
                    commands.push(Command::Push(read_push(bytes, &mut cursor, len)?));
                }
                OP_PUSHDATA1 => {
                    let len = read_push_len(bytes, &mut cursor, 1)?;
                    commands.push(Command::Push(read_push(bytes, &mut cursor, len)?));
                }
                OP_PUSHDATA2 => {
                    let len = read_push_len(bytes, &mut cursor, 2)?;
                    commands.push(Command::Push(read_push(bytes, &mut cursor, len)?));
                }
                OP_PUSHDATA4 => {
                    let len = read_push_len(bytes, &mut cursor, 4)?;
                    commands.push(Command::Push(read_push(bytes, &mut cursor, len)?));
                }
                OP_1..=OP_16 => {
                    commands.push(Command::Push(vec![opcode - OP_1 + 1]));
                }
                _ => commands.push(Command::Op(opcode)),
            }
        }

        Ok(Self { commands })
    }

    /// HASH160 of the serialized script, for P2SH/P2WPKH-style commitments
    pub fn to_hash160(&self) -> [u8; 20] {
        hash160(&self.serialize())
    }

    /// SHA256 of the serialized script, for P2WSH commitments
    pub fn to_sha256(&self) -> Hash {
        sha256(&self.serialize())
    }

    /// P2PKH locking script: OP_DUP OP_HASH160 <20B> OP_EQUALVERIFY OP_CHECKSIG
    pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Self {
        Script::new()
            .push_op(OP_DUP)
            .push_op(OP_HASH160)
            .push_data(pubkey_hash)
            .push_op(OP_EQUALVERIFY)
            .push_op(OP_CHECKSIG)
    }

    /// P2SH locking script: OP_HASH160 <20B> OP_EQUAL
    pub fn p2sh(script_hash: &[u8; 20]) -> Self {
        Script::new()
            .push_op(OP_HASH160)
            .push_data(script_hash)
            .push_op(OP_EQUAL)
    }

    /// P2WPKH locking script: OP_0 <20B>
    pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Self {
        Script::new()
            .push_data(&[])
            .push_data(pubkey_hash)
    }

    /// P2WSH locking script: OP_0 <32B>
    pub fn p2wsh(script_hash: &Hash) -> Self {
        Script::new()
            .push_data(&[])
            .push_data(script_hash)
    }

    /// P2TR locking script: OP_1 <32B x-only key>
    pub fn p2tr(output_key: &Hash) -> Self {
        Script::new()
            .push_data(&[1])
            .push_data(output_key)
    }
}

fn serialize_push(out: &mut Vec<u8>, data: &[u8]) {
    match data.len() {
        0 => out.push(OP_0),
        1 if (1..=16).contains(&data[0]) => out.push(OP_1 + data[0] - 1),
        len if len < OP_PUSHDATA1 as usize => {
            out.push(len as u8);
            out.extend_from_slice(data);
        }
        len if len <= 0xff => {
            out.push(OP_PUSHDATA1);
            out.push(len as u8);
            out.extend_from_slice(data);
        }
        len if len <= 0xffff => {
            out.push(OP_PUSHDATA2);
            out.extend_from_slice(&(len as u16).to_le_bytes());
            out.extend_from_slice(data);
        }
        len => {
            out.push(OP_PUSHDATA4);
            out.extend_from_slice(&(len as u32).to_le_bytes());
            out.extend_from_slice(data);
        }
    }
}

fn read_push_len(bytes: &[u8], cursor: &mut usize, width: usize) -> Result<usize> {
    if *cursor + width > bytes.len() {
        return Err(TxForgeError::ScriptParse(
            "Truncated PUSHDATA length".to_string(),
        ));
    }
    let mut len = 0usize;
    for i in 0..width {
        len |= (bytes[*cursor + i] as usize) << (8 * i);
    }
    *cursor += width;
    Ok(len)
}

fn read_push(bytes: &[u8], cursor: &mut usize, len: usize) -> Result<ByteString> {
    if *cursor + len > bytes.len() {
        return Err(TxForgeError::ScriptParse(format!(
            "Push declares {} bytes but only {} remain",
            len,
            bytes.len() - *cursor
        )));
    }
    let data = bytes[*cursor..*cursor + len].to_vec();
    *cursor += len;
    Ok(data)
}
