//! Taproot key tweaking, tagged hashes, and script-tree construction (BIP341)

use secp256k1::{Scalar, Secp256k1, XOnlyPublicKey};
use sha2::{Digest, Sha256};

use crate::constants::{LEAF_VERSION_TAPSCRIPT, TAPROOT_CONTROL_MAX_NODE_COUNT};
use crate::encoding::{sha256, with_compact_size_prefix};
use crate::error::{Result, TxForgeError};
use crate::script::Script;
use crate::types::Hash;

/// Domain-separated hash: SHA256(SHA256(tag) || SHA256(tag) || data)
pub fn tagged_hash(tag: &str, data: &[u8]) -> Hash {
    let tag_digest = sha256(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_digest);
    hasher.update(tag_digest);
    hasher.update(data);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
}

/// Tweaks an x-only internal key with the TapTweak of itself and an optional
/// script-tree merkle root.
///
/// Returns both the tweaked x-only key and the parity of its y coordinate.
/// Parity is a first-class output: control blocks cannot be built without
/// it, and it is unrecoverable after the x-only serialization.
pub fn tweak_public_key(internal_key: &Hash, merkle_root: Option<&Hash>) -> Result<(Hash, u8)> {
    let secp = Secp256k1::verification_only();
    let internal = XOnlyPublicKey::from_slice(internal_key)
        .map_err(|_| TxForgeError::Signing("Invalid internal public key".to_string()))?;

    let scalar = tap_tweak_scalar(internal_key, merkle_root)?;
    let (tweaked, parity) = internal
        .add_tweak(&secp, &scalar)
        .map_err(|_| TxForgeError::Signing("Tweaked key is the point at infinity".to_string()))?;

    Ok((tweaked.serialize(), parity.to_u8()))
}

/// Tweaks a private key for a taproot key-path spend.
///
/// Negates the key first when the internal public key has odd y, so the
/// resulting key signs for the x-only tweaked output key.
pub fn tweak_private_key(secret_key: &[u8; 32], merkle_root: Option<&Hash>) -> Result<[u8; 32]> {
    let secp = Secp256k1::new();
    let keypair = secp256k1::Keypair::from_seckey_slice(&secp, secret_key)
        .map_err(|_| TxForgeError::Signing("Invalid private key".to_string()))?;
    let (internal, _) = keypair.x_only_public_key();

    let scalar = tap_tweak_scalar(&internal.serialize(), merkle_root)?;
    let tweaked = keypair
        .add_xonly_tweak(&secp, &scalar)
        .map_err(|_| TxForgeError::Signing("Private key tweak failed".to_string()))?;

    Ok(tweaked.secret_key().secret_bytes())
}

fn tap_tweak_scalar(internal_key: &Hash, merkle_root: Option<&Hash>) -> Result<Scalar> {
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(internal_key);
    if let Some(root) = merkle_root {
        data.extend_from_slice(root);
    }
    let tweak = tagged_hash("TapTweak", &data);
    Scalar::from_be_bytes(tweak)
        .map_err(|_| TxForgeError::Signing("TapTweak exceeds curve order".to_string()))
}

/// A tapscript leaf: version byte plus the script committed at that leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapLeaf {
    pub version: u8,
    pub script: Script,
}

impl TapLeaf {
    /// Leaf with the standard tapscript version (0xc0)
    pub fn new(script: Script) -> Self {
        Self {
            version: LEAF_VERSION_TAPSCRIPT,
            script,
        }
    }

    pub fn with_version(version: u8, script: Script) -> Self {
        Self { version, script }
    }

    /// TapLeaf tagged hash: version || compact_size(script) || script
    pub fn leaf_hash(&self) -> Hash {
        tap_leaf_hash(self.version, &self.script)
    }
}

/// TapLeaf tagged hash over leafVersion || compactSize(len(script)) || script
pub fn tap_leaf_hash(leaf_version: u8, script: &Script) -> Hash {
    let mut data = vec![leaf_version];
    data.extend_from_slice(&with_compact_size_prefix(&script.serialize()));
    tagged_hash("TapLeaf", &data)
}

/// TapBranch tagged hash of two child hashes, sorted lexicographically so
/// the result is order-independent
pub fn tap_branch_merge(a: &Hash, b: &Hash) -> Hash {
    let (left, right) = if a <= b { (a, b) } else { (b, a) };
    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(left);
    data.extend_from_slice(right);
    tagged_hash("TapBranch", &data)
}

/// Merkle root of a leaf set.
///
/// Leaves are paired level by level; an odd leaf is promoted unchanged to
/// the next level. Returns `None` for an empty set (key-path-only output).
pub fn merkle_root(leaves: &[TapLeaf]) -> Option<Hash> {
    if leaves.is_empty() {
        return None;
    }
    let mut level: Vec<Hash> = leaves.iter().map(TapLeaf::leaf_hash).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        for pair in level.chunks(2) {
            match pair {
                [a, b] => next.push(tap_branch_merge(a, b)),
                [a] => next.push(*a),
                _ => unreachable!(),
            }
        }
        level = next;
    }
    Some(level[0])
}

/// Sibling hashes from the selected leaf up to the root, leaf-to-root order.
///
/// Levels where the leaf is promoted without a sibling contribute nothing.
pub fn merkle_path(leaves: &[TapLeaf], selected_index: usize) -> Result<Vec<Hash>> {
    if selected_index >= leaves.len() {
        return Err(TxForgeError::Signing(format!(
            "Leaf index {} out of range for {} leaves",
            selected_index,
            leaves.len()
        )));
    }

    let mut path = Vec::new();
    let mut level: Vec<Hash> = leaves.iter().map(TapLeaf::leaf_hash).collect();
    let mut index = selected_index;

    while level.len() > 1 {
        let sibling = index ^ 1;
        if sibling < level.len() {
            path.push(level[sibling]);
        }
        let mut next = Vec::with_capacity(level.len() / 2 + 1);
        for pair in level.chunks(2) {
            match pair {
                [a, b] => next.push(tap_branch_merge(a, b)),
                [a] => next.push(*a),
                _ => unreachable!(),
            }
        }
        index /= 2;
        level = next;
    }

    Ok(path)
}

/// Tweaked output key and parity for an internal key committed to a leaf set
pub fn taproot_output_key(internal_key: &Hash, leaves: &[TapLeaf]) -> Result<(Hash, u8)> {
    let root = merkle_root(leaves);
    tweak_public_key(internal_key, root.as_ref())
}

/// Control block proving a script-path spend belongs to the committed tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBlock {
    pub leaf_version: u8,
    pub parity: u8,
    pub internal_key: Hash,
    pub merkle_path: Vec<Hash>,
}

impl ControlBlock {
    /// Assembles a control block from a precomputed merkle path.
    ///
    /// Secondary constructor; `build` computes the path from the leaf set.
    pub fn new(
        leaf_version: u8,
        parity: u8,
        internal_key: Hash,
        merkle_path: Vec<Hash>,
    ) -> Result<Self> {
        if merkle_path.len() > TAPROOT_CONTROL_MAX_NODE_COUNT {
            return Err(TxForgeError::Format(format!(
                "Merkle path of {} nodes exceeds the maximum of {}",
                merkle_path.len(),
                TAPROOT_CONTROL_MAX_NODE_COUNT
            )));
        }
        Ok(Self {
            leaf_version,
            parity,
            internal_key,
            merkle_path,
        })
    }

    /// Builds the control block for `selected` against the full leaf set,
    /// computing the merkle path and output-key parity internally.
    pub fn build(selected: &TapLeaf, leaves: &[TapLeaf], internal_key: &Hash) -> Result<Self> {
        let index = leaves
            .iter()
            .position(|leaf| leaf == selected)
            .ok_or_else(|| {
                TxForgeError::Signing("Selected leaf is not in the leaf set".to_string())
            })?;
        let path = merkle_path(leaves, index)?;
        let (_, parity) = taproot_output_key(internal_key, leaves)?;
        Self::new(selected.version, parity, *internal_key, path)
    }

    /// Wire form: (leaf_version | parity) || internal key || path hashes
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(33 + 32 * self.merkle_path.len());
        out.push(self.leaf_version | self.parity);
        out.extend_from_slice(&self.internal_key);
        for node in &self.merkle_path {
            out.extend_from_slice(node);
        }
        out
    }
}
