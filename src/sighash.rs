//! Signature digests: legacy, segwit v0 (BIP143) and taproot (BIP341).
//!
//! `SighashCache` computes the whole-transaction hash components once and
//! reuses them across every input's digest, so signing n inputs costs O(n)
//! rather than O(n^2). The cache holds only immutable data after
//! construction; per-input digests may be computed concurrently.

use sha2::{Digest, Sha256};

use crate::constants::{
    NEGATIVE_SATOSHI, SEQUENCE_EMPTY, SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_DEFAULT,
    SIGHASH_NONE, SIGHASH_SINGLE,
};
use crate::encoding::{sha256, sha256d_hash, with_compact_size_prefix};
use crate::error::{Result, TxForgeError};
use crate::script::Script;
use crate::taproot::tagged_hash;
use crate::types::{Hash, Transaction};

const ZERO_HASH: Hash = [0u8; 32];

/// Spent output data for taproot digests: locking script and amount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrevOutput {
    pub script_pubkey: Script,
    pub amount: u64,
}

impl PrevOutput {
    pub fn new(script_pubkey: Script, amount: u64) -> Self {
        Self {
            script_pubkey,
            amount,
        }
    }
}

/// Single-SHA component hashes plus the spent outputs, needed only for
/// taproot digests
struct TaprootComponents {
    prev_outputs: Vec<PrevOutput>,
    sha_prevouts: Hash,
    sha_amounts: Hash,
    sha_script_pubkeys: Hash,
    sha_sequences: Hash,
    sha_outputs: Hash,
}

/// Per-transaction digest state shared across all inputs being signed
pub struct SighashCache<'a> {
    tx: &'a Transaction,
    hash_prevouts: Hash,
    hash_sequences: Hash,
    hash_outputs: Hash,
    taproot: Option<TaprootComponents>,
}

impl<'a> SighashCache<'a> {
    /// Cache for legacy and segwit v0 digests.
    ///
    /// The BIP143 double-SHA trio is computed eagerly; taproot digests
    /// require `with_prev_outputs`.
    pub fn new(tx: &'a Transaction) -> Self {
        Self {
            tx,
            hash_prevouts: sha256d_hash(&serialize_prevouts(tx)),
            hash_sequences: sha256d_hash(&serialize_sequences(tx)),
            hash_outputs: sha256d_hash(&serialize_outputs(tx)),
            taproot: None,
        }
    }

    /// Cache that can also produce taproot digests.
    ///
    /// `prev_outputs` must list the spent output for every input, in input
    /// order; BIP341 commits to all spent scripts and amounts.
    pub fn with_prev_outputs(tx: &'a Transaction, prev_outputs: Vec<PrevOutput>) -> Result<Self> {
        if prev_outputs.len() != tx.inputs.len() {
            return Err(TxForgeError::DigestComputation(format!(
                "Expected {} spent outputs, got {}",
                tx.inputs.len(),
                prev_outputs.len()
            )));
        }

        let mut amounts = Vec::with_capacity(prev_outputs.len() * 8);
        let mut scripts = Vec::new();
        for prev in &prev_outputs {
            amounts.extend_from_slice(&prev.amount.to_le_bytes());
            scripts.extend_from_slice(&with_compact_size_prefix(&prev.script_pubkey.serialize()));
        }

        let mut cache = Self::new(tx);
        cache.taproot = Some(TaprootComponents {
            sha_prevouts: sha256(&serialize_prevouts(tx)),
            sha_amounts: sha256(&amounts),
            sha_script_pubkeys: sha256(&scripts),
            sha_sequences: sha256(&serialize_sequences(tx)),
            sha_outputs: sha256(&serialize_outputs(tx)),
            prev_outputs,
        });
        Ok(cache)
    }

    /// Legacy digest: the transaction is reserialized with substituted
    /// scriptSigs, the sighash type appended, and double-hashed.
    ///
    /// `script_code` is the script being satisfied: the previous locking
    /// script for P2PKH, the redeem script for P2SH.
    pub fn legacy_digest(&self, input_index: usize, script_code: &Script, sighash: u8) -> Result<Hash> {
        self.check_input_index(input_index)?;
        let base = sighash & 0x1f;
        let anyone_can_pay = sighash & SIGHASH_ANYONECANPAY != 0;

        let mut tx = self.tx.clone();
        tx.segwit = false;
        tx.witnesses.clear();

        for (index, input) in tx.inputs.iter_mut().enumerate() {
            input.script_sig = if index == input_index {
                script_code.clone()
            } else {
                Script::new()
            };
        }

        match base {
            SIGHASH_NONE => {
                tx.outputs.clear();
                blank_other_sequences(&mut tx, input_index);
            }
            SIGHASH_SINGLE => {
                if input_index >= tx.outputs.len() {
                    return Err(TxForgeError::DigestComputation(format!(
                        "SIGHASH_SINGLE input {} has no matching output",
                        input_index
                    )));
                }
                // keep only the paired output; earlier slots become
                // placeholder outputs with amount -1 and an empty script
                tx.outputs.truncate(input_index + 1);
                for output in tx.outputs.iter_mut().take(input_index) {
                    output.amount = NEGATIVE_SATOSHI;
                    output.script_pubkey = Script::new();
                }
                blank_other_sequences(&mut tx, input_index);
            }
            _ => {}
        }

        if anyone_can_pay {
            tx.inputs = vec![tx.inputs[input_index].clone()];
        }

        let mut preimage = tx.serialize_legacy();
        preimage.extend_from_slice(&(sighash as u32).to_le_bytes());
        Ok(sha256d_hash(&preimage))
    }

    /// Segwit v0 digest per BIP143.
    ///
    /// `script_code` is the implied P2PKH script for P2WPKH, or the witness
    /// script for P2WSH. `amount` is the value of the output being spent.
    pub fn segwit_v0_digest(
        &self,
        input_index: usize,
        script_code: &Script,
        amount: u64,
        sighash: u8,
    ) -> Result<Hash> {
        self.check_input_index(input_index)?;
        let base = sighash & 0x1f;
        let anyone_can_pay = sighash & SIGHASH_ANYONECANPAY != 0;
        let input = &self.tx.inputs[input_index];

        let hash_prevouts = if anyone_can_pay {
            ZERO_HASH
        } else {
            self.hash_prevouts
        };
        let hash_sequences = if anyone_can_pay || base == SIGHASH_NONE || base == SIGHASH_SINGLE {
            ZERO_HASH
        } else {
            self.hash_sequences
        };
        let hash_outputs = match base {
            SIGHASH_NONE => ZERO_HASH,
            SIGHASH_SINGLE => {
                if input_index >= self.tx.outputs.len() {
                    ZERO_HASH
                } else {
                    sha256d_hash(&self.tx.outputs[input_index].serialize())
                }
            }
            _ => self.hash_outputs,
        };

        let mut preimage = Vec::with_capacity(156 + script_code.serialize().len());
        preimage.extend_from_slice(&self.tx.version.to_le_bytes());
        preimage.extend_from_slice(&hash_prevouts);
        preimage.extend_from_slice(&hash_sequences);
        preimage.extend_from_slice(&input.prevout.serialize());
        preimage.extend_from_slice(&with_compact_size_prefix(&script_code.serialize()));
        preimage.extend_from_slice(&amount.to_le_bytes());
        preimage.extend_from_slice(&input.sequence.to_le_bytes());
        preimage.extend_from_slice(&hash_outputs);
        preimage.extend_from_slice(&self.tx.locktime.to_le_bytes());
        preimage.extend_from_slice(&(sighash as u32).to_le_bytes());

        Ok(sha256d_hash(&preimage))
    }

    /// Taproot digest per BIP341, for key-path and script-path spends.
    ///
    /// `annex` is the full annex witness element including its 0x50 tag;
    /// its presence changes the spend-type byte and adds an annex hash.
    /// `leaf_hash` selects a script-path digest with the tapleaf extension.
    pub fn taproot_digest(
        &self,
        input_index: usize,
        sighash: u8,
        annex: Option<&[u8]>,
        leaf_hash: Option<&Hash>,
    ) -> Result<Hash> {
        self.check_input_index(input_index)?;
        let components = self.taproot.as_ref().ok_or_else(|| {
            TxForgeError::DigestComputation(
                "Taproot digest requires spent outputs; build the cache with prev outputs"
                    .to_string(),
            )
        })?;

        let anyone_can_pay = sighash & SIGHASH_ANYONECANPAY != 0;
        let out_type = if sighash == SIGHASH_DEFAULT {
            SIGHASH_ALL
        } else {
            sighash & 0x03
        };
        if !matches!(
            sighash,
            0x00 | 0x01 | 0x02 | 0x03 | 0x81 | 0x82 | 0x83
        ) {
            return Err(TxForgeError::DigestComputation(format!(
                "Invalid taproot sighash type 0x{:02x}",
                sighash
            )));
        }

        let ext_flag: u8 = if leaf_hash.is_some() { 1 } else { 0 };
        let spend_type = ext_flag * 2 + if annex.is_some() { 1 } else { 0 };
        let input = &self.tx.inputs[input_index];

        let mut msg = Vec::with_capacity(206);
        msg.push(0x00); // epoch
        msg.push(sighash);
        msg.extend_from_slice(&self.tx.version.to_le_bytes());
        msg.extend_from_slice(&self.tx.locktime.to_le_bytes());

        if !anyone_can_pay {
            msg.extend_from_slice(&components.sha_prevouts);
            msg.extend_from_slice(&components.sha_amounts);
            msg.extend_from_slice(&components.sha_script_pubkeys);
            msg.extend_from_slice(&components.sha_sequences);
        }
        if out_type == SIGHASH_ALL {
            msg.extend_from_slice(&components.sha_outputs);
        }

        msg.push(spend_type);

        if anyone_can_pay {
            let prev = &components.prev_outputs[input_index];
            msg.extend_from_slice(&input.prevout.serialize());
            msg.extend_from_slice(&prev.amount.to_le_bytes());
            msg.extend_from_slice(&with_compact_size_prefix(&prev.script_pubkey.serialize()));
            msg.extend_from_slice(&input.sequence.to_le_bytes());
        } else {
            msg.extend_from_slice(&(input_index as u32).to_le_bytes());
        }

        if let Some(annex) = annex {
            msg.extend_from_slice(&sha256(&with_compact_size_prefix(annex)));
        }

        if out_type == SIGHASH_SINGLE {
            if input_index >= self.tx.outputs.len() {
                return Err(TxForgeError::DigestComputation(format!(
                    "SIGHASH_SINGLE input {} has no matching output",
                    input_index
                )));
            }
            msg.extend_from_slice(&Sha256::digest(
                self.tx.outputs[input_index].serialize(),
            ));
        }

        if let Some(leaf_hash) = leaf_hash {
            msg.extend_from_slice(leaf_hash);
            msg.push(0x00); // key version
            msg.extend_from_slice(&0xffff_ffffu32.to_le_bytes()); // no OP_CODESEPARATOR executed
        }

        Ok(tagged_hash("TapSighash", &msg))
    }

    /// Spent output for an input, when the cache was built with them
    pub fn prev_output(&self, input_index: usize) -> Option<&PrevOutput> {
        self.taproot
            .as_ref()
            .and_then(|c| c.prev_outputs.get(input_index))
    }

    fn check_input_index(&self, input_index: usize) -> Result<()> {
        if input_index >= self.tx.inputs.len() {
            return Err(TxForgeError::DigestComputation(format!(
                "Input index {} out of range for {} inputs",
                input_index,
                self.tx.inputs.len()
            )));
        }
        Ok(())
    }
}

fn serialize_prevouts(tx: &Transaction) -> Vec<u8> {
    let mut out = Vec::with_capacity(36 * tx.inputs.len());
    for input in &tx.inputs {
        out.extend_from_slice(&input.prevout.serialize());
    }
    out
}

fn serialize_sequences(tx: &Transaction) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 * tx.inputs.len());
    for input in &tx.inputs {
        out.extend_from_slice(&input.sequence.to_le_bytes());
    }
    out
}

fn serialize_outputs(tx: &Transaction) -> Vec<u8> {
    let mut out = Vec::new();
    for output in &tx.outputs {
        out.extend_from_slice(&output.serialize());
    }
    out
}

fn blank_other_sequences(tx: &mut Transaction, input_index: usize) {
    for (index, input) in tx.inputs.iter_mut().enumerate() {
        if index != input_index {
            input.sequence = SEQUENCE_EMPTY;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SEQUENCE_FINAL;
    use crate::types::{OutPoint, TxInput, TxOutput};

    fn sample_tx() -> Transaction {
        let inputs = vec![
            TxInput::new(OutPoint::new([0x11; 32], 0), SEQUENCE_FINAL),
            TxInput::new(OutPoint::new([0x22; 32], 1), SEQUENCE_FINAL),
        ];
        let outputs = vec![
            TxOutput::new(40_000, Script::p2wpkh(&[0xaa; 20])),
            TxOutput::new(9_000, Script::p2pkh(&[0xbb; 20])),
        ];
        Transaction::new(inputs, outputs)
    }

    fn sample_prev_outputs() -> Vec<PrevOutput> {
        vec![
            PrevOutput::new(Script::p2tr(&[0xcc; 32]), 30_000),
            PrevOutput::new(Script::p2tr(&[0xdd; 32]), 20_000),
        ]
    }

    #[test]
    fn test_legacy_digest_depends_on_script_code() {
        let tx = sample_tx();
        let cache = SighashCache::new(&tx);
        let a = cache
            .legacy_digest(0, &Script::p2pkh(&[0x01; 20]), SIGHASH_ALL)
            .unwrap();
        let b = cache
            .legacy_digest(0, &Script::p2pkh(&[0x02; 20]), SIGHASH_ALL)
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_legacy_sighash_none_ignores_outputs() {
        let mut tx = sample_tx();
        let script = Script::p2pkh(&[0x01; 20]);

        let digest_before = SighashCache::new(&tx)
            .legacy_digest(0, &script, SIGHASH_NONE)
            .unwrap();
        tx.outputs[0].amount = 1;
        let digest_after = SighashCache::new(&tx)
            .legacy_digest(0, &script, SIGHASH_NONE)
            .unwrap();
        assert_eq!(digest_before, digest_after);
    }

    #[test]
    fn test_legacy_sighash_single_out_of_range() {
        let mut tx = sample_tx();
        tx.outputs.truncate(1);
        let cache = SighashCache::new(&tx);
        let result = cache.legacy_digest(1, &Script::p2pkh(&[0x01; 20]), SIGHASH_SINGLE);
        assert!(matches!(result, Err(TxForgeError::DigestComputation(_))));
    }

    #[test]
    fn test_legacy_anyonecanpay_ignores_other_inputs() {
        let mut tx = sample_tx();
        let script = Script::p2pkh(&[0x01; 20]);
        let sighash = SIGHASH_ALL | SIGHASH_ANYONECANPAY;

        let digest_before = SighashCache::new(&tx)
            .legacy_digest(0, &script, sighash)
            .unwrap();
        tx.inputs[1].prevout.index = 9;
        let digest_after = SighashCache::new(&tx)
            .legacy_digest(0, &script, sighash)
            .unwrap();
        assert_eq!(digest_before, digest_after);
    }

    #[test]
    fn test_bip143_p2wpkh_reference_vector() {
        // BIP143 "Native P2WPKH" example, signing input 1
        let bytes = hex::decode(
            "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f\
             0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57\
             b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85\
             c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2\
             f0167faa815988ac11000000",
        )
        .unwrap();
        let tx = Transaction::deserialize(&bytes).unwrap();
        let cache = SighashCache::new(&tx);

        assert_eq!(
            hex::encode(cache.hash_prevouts),
            "96b827c8483d4e9b96712b6713a7b68d6e8003a781feba36c31143470b4efd37"
        );
        assert_eq!(
            hex::encode(cache.hash_sequences),
            "52b0a642eea2fb7ae638c36f6252b6750293dbe574a806984b8e4d8548339a3b"
        );
        assert_eq!(
            hex::encode(cache.hash_outputs),
            "863ef3e1a92afbfdb97f31ad0fc7683ee943e9abcf2501590ff8f6551f47e5e5"
        );

        let script_code = Script::deserialize(
            &hex::decode("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac").unwrap(),
        )
        .unwrap();
        let digest = cache
            .segwit_v0_digest(1, &script_code, 600_000_000, SIGHASH_ALL)
            .unwrap();
        assert_eq!(
            hex::encode(digest),
            "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
        );
    }

    #[test]
    fn test_segwit_digest_single_out_of_range_uses_zero_hash() {
        let mut tx = sample_tx();
        tx.outputs.truncate(1);
        let cache = SighashCache::new(&tx);
        // BIP143 falls back to a zero hash rather than failing
        assert!(cache
            .segwit_v0_digest(1, &Script::p2pkh(&[0x01; 20]), 1_000, SIGHASH_SINGLE)
            .is_ok());
    }

    #[test]
    fn test_taproot_digest_requires_prev_outputs() {
        let tx = sample_tx();
        let cache = SighashCache::new(&tx);
        let result = cache.taproot_digest(0, SIGHASH_DEFAULT, None, None);
        assert!(matches!(result, Err(TxForgeError::DigestComputation(_))));
    }

    #[test]
    fn test_taproot_annex_changes_digest() {
        let tx = sample_tx();
        let cache = SighashCache::with_prev_outputs(&tx, sample_prev_outputs()).unwrap();

        let without = cache.taproot_digest(0, SIGHASH_DEFAULT, None, None).unwrap();
        let annex = [0x50u8, 0x01, 0x02];
        let with = cache
            .taproot_digest(0, SIGHASH_DEFAULT, Some(&annex), None)
            .unwrap();
        assert_ne!(without, with);
    }

    #[test]
    fn test_taproot_script_path_extension_changes_digest() {
        let tx = sample_tx();
        let cache = SighashCache::with_prev_outputs(&tx, sample_prev_outputs()).unwrap();

        let key_path = cache.taproot_digest(0, SIGHASH_DEFAULT, None, None).unwrap();
        let leaf = [0x5au8; 32];
        let script_path = cache
            .taproot_digest(0, SIGHASH_DEFAULT, None, Some(&leaf))
            .unwrap();
        assert_ne!(key_path, script_path);
    }

    #[test]
    fn test_taproot_default_differs_from_explicit_all() {
        // same scope, but the sighash byte itself is committed
        let tx = sample_tx();
        let cache = SighashCache::with_prev_outputs(&tx, sample_prev_outputs()).unwrap();
        let default = cache.taproot_digest(0, SIGHASH_DEFAULT, None, None).unwrap();
        let all = cache.taproot_digest(0, SIGHASH_ALL, None, None).unwrap();
        assert_ne!(default, all);
    }

    #[test]
    fn test_taproot_rejects_invalid_sighash() {
        let tx = sample_tx();
        let cache = SighashCache::with_prev_outputs(&tx, sample_prev_outputs()).unwrap();
        assert!(cache.taproot_digest(0, 0x04, None, None).is_err());
        assert!(cache.taproot_digest(0, 0x80, None, None).is_err());
    }

    #[test]
    fn test_prev_output_count_enforced() {
        let tx = sample_tx();
        let result = SighashCache::with_prev_outputs(
            &tx,
            vec![PrevOutput::new(Script::p2tr(&[0xcc; 32]), 30_000)],
        );
        assert!(matches!(result, Err(TxForgeError::DigestComputation(_))));
    }

    #[test]
    fn test_input_index_out_of_range() {
        let tx = sample_tx();
        let cache = SighashCache::new(&tx);
        assert!(cache
            .legacy_digest(5, &Script::new(), SIGHASH_ALL)
            .is_err());
        assert!(cache
            .segwit_v0_digest(5, &Script::new(), 0, SIGHASH_ALL)
            .is_err());
    }
}
