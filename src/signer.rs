//! Signing orchestration: digest selection, signature assembly, and the
//! scriptSig/witness layout for each supported spend type.

use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use crate::constants::{ANNEX_TAG, SIGHASH_DEFAULT};
use crate::encoding::hash160;
use crate::error::{Result, TxForgeError};
use crate::script::Script;
use crate::sighash::{PrevOutput, SighashCache};
use crate::taproot::{tweak_private_key, ControlBlock, TapLeaf};
use crate::types::{ByteString, Hash, Transaction, Witness};

/// Spent-output lookup: `(script_pubkey, amount)` for an outpoint.
///
/// Transport and persistence live behind this trait; the signer only needs
/// the locking script and value of each output being spent.
pub trait PrevOutputProvider {
    fn prev_output(&self, txid: &Hash, index: u32) -> Option<(Script, u64)>;
}

/// Signing capability, usually local but possibly remote (HSM, wallet RPC).
///
/// ECDSA signatures are returned DER-encoded without the sighash byte;
/// the signer appends it.
pub trait SigningBackend {
    fn sign_ecdsa(&self, digest: &Hash, private_key: &[u8; 32]) -> Result<Vec<u8>>;
    fn sign_schnorr(
        &self,
        digest: &Hash,
        private_key: &[u8; 32],
        aux_rand: &[u8; 32],
    ) -> Result<[u8; 64]>;
}

/// In-process signing backend over libsecp256k1
pub struct LocalSigner {
    secp: Secp256k1<All>,
}

impl LocalSigner {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }

    /// Compressed public key for a private key
    pub fn public_key(&self, private_key: &[u8; 32]) -> Result<[u8; 33]> {
        let secret = SecretKey::from_slice(private_key)
            .map_err(|_| TxForgeError::Signing("Invalid private key".to_string()))?;
        Ok(PublicKey::from_secret_key(&self.secp, &secret).serialize())
    }

    /// X-only public key for a private key
    pub fn x_only_public_key(&self, private_key: &[u8; 32]) -> Result<Hash> {
        let keypair = secp256k1::Keypair::from_seckey_slice(&self.secp, private_key)
            .map_err(|_| TxForgeError::Signing("Invalid private key".to_string()))?;
        Ok(keypair.x_only_public_key().0.serialize())
    }
}

impl Default for LocalSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl SigningBackend for LocalSigner {
    fn sign_ecdsa(&self, digest: &Hash, private_key: &[u8; 32]) -> Result<Vec<u8>> {
        let secret = SecretKey::from_slice(private_key)
            .map_err(|_| TxForgeError::Signing("Invalid private key".to_string()))?;
        let message = Message::from_digest_slice(digest)
            .map_err(|_| TxForgeError::Signing("Digest must be 32 bytes".to_string()))?;
        let signature = self.secp.sign_ecdsa(&message, &secret);
        Ok(signature.serialize_der().to_vec())
    }

    fn sign_schnorr(
        &self,
        digest: &Hash,
        private_key: &[u8; 32],
        aux_rand: &[u8; 32],
    ) -> Result<[u8; 64]> {
        let keypair = secp256k1::Keypair::from_seckey_slice(&self.secp, private_key)
            .map_err(|_| TxForgeError::Signing("Invalid private key".to_string()))?;
        let message = Message::from_digest_slice(digest)
            .map_err(|_| TxForgeError::Signing("Digest must be 32 bytes".to_string()))?;
        let signature = self
            .secp
            .sign_schnorr_with_aux_rand(&message, &keypair, aux_rand);
        let bytes: &[u8] = signature.as_ref();
        let mut out = [0u8; 64];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

/// How one input is spent, selecting the digest algorithm and the
/// scriptSig/witness layout
#[derive(Debug, Clone)]
pub enum SpendKind {
    /// Pay-to-pubkey-hash; scriptSig is `<sig> <pubkey>`
    LegacyP2pkh { public_key: ByteString },
    /// Pay-to-script-hash around a single-signature redeem script;
    /// scriptSig is `<sig> <redeem script>`
    LegacyP2sh { redeem_script: Script },
    /// Native segwit v0 pubkey hash; witness is `[sig, pubkey]`
    SegwitP2wpkh { public_key: ByteString },
    /// Native segwit v0 script hash around a single-signature witness
    /// script; witness is `[sig, witness script]`
    SegwitP2wsh { witness_script: Script },
    /// Taproot key path; the private key is tweaked with the merkle root
    /// of the committed script tree (none for key-path-only outputs)
    TaprootKeyPath { merkle_root: Option<Hash> },
    /// Taproot script path through `leaf`, proving membership in `leaves`
    /// with a control block; witness is `[args.., script, control block]`
    TaprootScriptPath {
        internal_key: Hash,
        leaf: TapLeaf,
        leaves: Vec<TapLeaf>,
        script_args: Vec<ByteString>,
    },
}

/// Per-input signing instructions
#[derive(Debug, Clone)]
pub struct InputPlan {
    pub input_index: usize,
    pub private_key: [u8; 32],
    pub kind: SpendKind,
    pub sighash: u8,
    /// Full annex element including the 0x50 tag; taproot inputs only
    pub annex: Option<ByteString>,
    /// Auxiliary randomness for schnorr nonce generation
    pub aux_rand: [u8; 32],
}

impl InputPlan {
    pub fn new(input_index: usize, private_key: [u8; 32], kind: SpendKind, sighash: u8) -> Self {
        Self {
            input_index,
            private_key,
            kind,
            sighash,
            annex: None,
            aux_rand: [0u8; 32],
        }
    }

    pub fn with_annex(mut self, annex: ByteString) -> Self {
        self.annex = Some(annex);
        self
    }

    pub fn with_aux_rand(mut self, aux_rand: [u8; 32]) -> Self {
        self.aux_rand = aux_rand;
        self
    }
}

/// Signs the planned inputs and writes their scriptSigs and witnesses back
/// into the transaction.
///
/// Whole-transaction hash components are computed once and shared across
/// all inputs. After signing, the witness list is padded with empty stacks
/// so it is positional with the inputs whenever any witness data exists.
pub fn sign_transaction(
    tx: &mut Transaction,
    plans: &[InputPlan],
    provider: &dyn PrevOutputProvider,
    backend: &dyn SigningBackend,
) -> Result<()> {
    for plan in plans {
        if plan.input_index >= tx.inputs.len() {
            return Err(TxForgeError::Signing(format!(
                "Plan targets input {} but the transaction has {}",
                plan.input_index,
                tx.inputs.len()
            )));
        }
        if let Some(annex) = &plan.annex {
            if annex.first() != Some(&ANNEX_TAG) {
                return Err(TxForgeError::Signing(
                    "Annex must start with the 0x50 tag byte".to_string(),
                ));
            }
            if !matches!(
                plan.kind,
                SpendKind::TaprootKeyPath { .. } | SpendKind::TaprootScriptPath { .. }
            ) {
                return Err(TxForgeError::Signing(
                    "Annex is only valid for taproot inputs".to_string(),
                ));
            }
        }
    }

    // BIP341 commits to every spent output, so taproot plans need the full
    // prevout set; legacy and segwit v0 need only their own input's.
    let needs_all_prevouts = plans.iter().any(|plan| {
        matches!(
            plan.kind,
            SpendKind::TaprootKeyPath { .. } | SpendKind::TaprootScriptPath { .. }
        )
    });

    let cache = if needs_all_prevouts {
        let mut prev_outputs = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let (script, amount) = provider
                .prev_output(&input.prevout.txid, input.prevout.index)
                .ok_or_else(|| {
                    TxForgeError::DigestComputation(format!(
                        "Missing spent output for {}:{}",
                        input.prevout.txid_hex(),
                        input.prevout.index
                    ))
                })?;
            prev_outputs.push(PrevOutput::new(script, amount));
        }
        SighashCache::with_prev_outputs(tx, prev_outputs)?
    } else {
        SighashCache::new(tx)
    };

    let mut script_sigs: Vec<(usize, Script)> = Vec::new();
    let mut witnesses: Vec<(usize, Witness)> = Vec::new();

    for plan in plans {
        let index = plan.input_index;
        match &plan.kind {
            SpendKind::LegacyP2pkh { public_key } => {
                let script_code = Script::p2pkh(&hash160(public_key));
                let digest = cache.legacy_digest(index, &script_code, plan.sighash)?;
                let signature = ecdsa_with_sighash(backend, &digest, &plan.private_key, plan.sighash)?;
                script_sigs.push((
                    index,
                    Script::new().push_data(&signature).push_data(public_key),
                ));
            }
            SpendKind::LegacyP2sh { redeem_script } => {
                let digest = cache.legacy_digest(index, redeem_script, plan.sighash)?;
                let signature = ecdsa_with_sighash(backend, &digest, &plan.private_key, plan.sighash)?;
                script_sigs.push((
                    index,
                    Script::new()
                        .push_data(&signature)
                        .push_data(&redeem_script.serialize()),
                ));
            }
            SpendKind::SegwitP2wpkh { public_key } => {
                let amount = spent_amount(tx, provider, index)?;
                let script_code = Script::p2pkh(&hash160(public_key));
                let digest = cache.segwit_v0_digest(index, &script_code, amount, plan.sighash)?;
                let signature = ecdsa_with_sighash(backend, &digest, &plan.private_key, plan.sighash)?;
                witnesses.push((index, Witness::new(vec![signature, public_key.clone()])));
            }
            SpendKind::SegwitP2wsh { witness_script } => {
                let amount = spent_amount(tx, provider, index)?;
                let digest =
                    cache.segwit_v0_digest(index, witness_script, amount, plan.sighash)?;
                let signature = ecdsa_with_sighash(backend, &digest, &plan.private_key, plan.sighash)?;
                witnesses.push((
                    index,
                    Witness::new(vec![signature, witness_script.serialize()]),
                ));
            }
            SpendKind::TaprootKeyPath { merkle_root } => {
                let digest =
                    cache.taproot_digest(index, plan.sighash, plan.annex.as_deref(), None)?;
                let tweaked = tweak_private_key(&plan.private_key, merkle_root.as_ref())?;
                let signature = backend.sign_schnorr(&digest, &tweaked, &plan.aux_rand)?;

                let mut stack = vec![schnorr_with_sighash(&signature, plan.sighash)];
                if let Some(annex) = &plan.annex {
                    stack.push(annex.clone());
                }
                witnesses.push((index, Witness::new(stack)));
            }
            SpendKind::TaprootScriptPath {
                internal_key,
                leaf,
                leaves,
                script_args,
            } => {
                let leaf_hash = leaf.leaf_hash();
                let digest = cache.taproot_digest(
                    index,
                    plan.sighash,
                    plan.annex.as_deref(),
                    Some(&leaf_hash),
                )?;
                // script-path keys sign untweaked; the tweak only binds the
                // output key to the tree
                let signature =
                    backend.sign_schnorr(&digest, &plan.private_key, &plan.aux_rand)?;
                let control_block = ControlBlock::build(leaf, leaves, internal_key)?;

                let mut stack = script_args.clone();
                stack.push(schnorr_with_sighash(&signature, plan.sighash));
                stack.push(leaf.script.serialize());
                stack.push(control_block.serialize());
                if let Some(annex) = &plan.annex {
                    stack.push(annex.clone());
                }
                witnesses.push((index, Witness::new(stack)));
            }
        }
    }

    for (index, script_sig) in script_sigs {
        tx.inputs[index].script_sig = script_sig;
    }

    let has_witness_data = !witnesses.is_empty()
        || tx.witnesses.iter().any(|witness| !witness.is_empty());
    if has_witness_data {
        // every input gets a stack, empty where nothing was produced
        tx.witnesses.resize(tx.inputs.len(), Witness::empty());
        for (index, witness) in witnesses {
            tx.witnesses[index] = witness;
        }
        tx.segwit = true;
    }

    Ok(())
}

fn spent_amount(
    tx: &Transaction,
    provider: &dyn PrevOutputProvider,
    input_index: usize,
) -> Result<u64> {
    let prevout = &tx.inputs[input_index].prevout;
    provider
        .prev_output(&prevout.txid, prevout.index)
        .map(|(_, amount)| amount)
        .ok_or_else(|| {
            TxForgeError::DigestComputation(format!(
                "Missing spent output for {}:{}",
                prevout.txid_hex(),
                prevout.index
            ))
        })
}

fn ecdsa_with_sighash(
    backend: &dyn SigningBackend,
    digest: &Hash,
    private_key: &[u8; 32],
    sighash: u8,
) -> Result<ByteString> {
    let mut signature = backend.sign_ecdsa(digest, private_key)?;
    signature.push(sighash);
    Ok(signature)
}

/// Schnorr signatures carry the sighash byte only when it is not the
/// default (BIP341: a 64-byte signature implies SIGHASH_DEFAULT)
fn schnorr_with_sighash(signature: &[u8; 64], sighash: u8) -> ByteString {
    let mut out = signature.to_vec();
    if sighash != SIGHASH_DEFAULT {
        out.push(sighash);
    }
    out
}
