//! Polymorphic Bitcoin addresses across the five standard output kinds.
//!
//! `Address` is a closed tagged union; construction goes through the text
//! decoder cascade (Base58Check, then bech32, then bech32m), through an
//! explicit variant constructor, or by pattern-matching a locking script.

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::encoding::{
    base58check_decode, base58check_encode, segwit_address_decode, segwit_address_encode,
};
use crate::error::{Result, TxForgeError};
use crate::script::{Command, Script};
use crate::types::{Hash, Network};

/// A parsed address: variant tag, network tag and fixed-length payload.
///
/// Payload lengths are enforced at construction: 20 bytes for the hash160
/// variants, 32 bytes for P2WSH and P2TR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Address {
    P2pkh { network: Network, hash: [u8; 20] },
    P2sh { network: Network, hash: [u8; 20] },
    P2wpkh { network: Network, program: [u8; 20] },
    P2wsh { network: Network, program: Hash },
    P2tr { network: Network, program: Hash },
}

impl Address {
    /// Decodes address text, trying Base58Check first, then bech32/bech32m.
    ///
    /// The network is derived from the version byte or HRP. The 0x6f legacy
    /// version byte is shared by testnet and regtest and decodes as testnet.
    pub fn decode(text: &str) -> Result<Self> {
        if let Ok((version, payload)) = base58check_decode(text) {
            return Self::from_base58_parts(version, &payload);
        }

        if let Ok((hrp, version, program)) = segwit_address_decode(text) {
            let network = match hrp.as_str() {
                "bc" => Network::Mainnet,
                "tb" => Network::Testnet,
                "bcrt" => Network::Regtest,
                other => {
                    return Err(TxForgeError::Format(format!(
                        "Unknown address prefix '{}'",
                        other
                    )))
                }
            };
            return Self::from_witness_program(network, version, &program);
        }

        Err(TxForgeError::Format(format!(
            "Unknown address format: {}",
            text
        )))
    }

    fn from_base58_parts(version: u8, payload: &[u8]) -> Result<Self> {
        let hash: [u8; 20] = payload.try_into().map_err(|_| {
            TxForgeError::Format(format!(
                "Base58Check address payload must be 20 bytes, got {}",
                payload.len()
            ))
        })?;
        match version {
            P2PKH_VERSION_MAINNET => Ok(Address::P2pkh {
                network: Network::Mainnet,
                hash,
            }),
            P2PKH_VERSION_TESTNET => Ok(Address::P2pkh {
                network: Network::Testnet,
                hash,
            }),
            P2SH_VERSION_MAINNET => Ok(Address::P2sh {
                network: Network::Mainnet,
                hash,
            }),
            P2SH_VERSION_TESTNET => Ok(Address::P2sh {
                network: Network::Testnet,
                hash,
            }),
            other => Err(TxForgeError::Format(format!(
                "Unknown address version byte 0x{:02x}",
                other
            ))),
        }
    }

    /// Builds an address from an explicit witness version and program
    pub fn from_witness_program(network: Network, version: u8, program: &[u8]) -> Result<Self> {
        match (version, program.len()) {
            (0, 20) => {
                let mut p = [0u8; 20];
                p.copy_from_slice(program);
                Ok(Address::P2wpkh {
                    network,
                    program: p,
                })
            }
            (0, 32) => {
                let mut p = [0u8; 32];
                p.copy_from_slice(program);
                Ok(Address::P2wsh {
                    network,
                    program: p,
                })
            }
            (1, 32) => {
                let mut p = [0u8; 32];
                p.copy_from_slice(program);
                Ok(Address::P2tr {
                    network,
                    program: p,
                })
            }
            (v, len) => Err(TxForgeError::Format(format!(
                "Unsupported witness program: version {} length {}",
                v, len
            ))),
        }
    }

    /// Derives an address by pattern-matching a locking script's structure
    pub fn from_script_pubkey(script: &Script, network: Network) -> Result<Self> {
        match script.commands() {
            // OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG
            [Command::Op(OP_DUP), Command::Op(OP_HASH160), Command::Push(h), Command::Op(OP_EQUALVERIFY), Command::Op(OP_CHECKSIG)]
                if h.len() == 20 =>
            {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(h);
                Ok(Address::P2pkh { network, hash })
            }
            // OP_HASH160 <20> OP_EQUAL
            [Command::Op(OP_HASH160), Command::Push(h), Command::Op(OP_EQUAL)] if h.len() == 20 => {
                let mut hash = [0u8; 20];
                hash.copy_from_slice(h);
                Ok(Address::P2sh { network, hash })
            }
            // OP_0 <20|32>, OP_1 <32>
            [Command::Push(version), Command::Push(program)] => {
                let v = match version.as_slice() {
                    [] => 0u8,
                    [n] if (1..=16).contains(n) => *n,
                    _ => {
                        return Err(TxForgeError::UnsupportedScript(
                            "Malformed witness version push".to_string(),
                        ))
                    }
                };
                Self::from_witness_program(network, v, program).map_err(|_| {
                    TxForgeError::UnsupportedScript(format!(
                        "Witness program version {} length {} has no address form",
                        v,
                        program.len()
                    ))
                })
            }
            _ => Err(TxForgeError::UnsupportedScript(
                "Locking script matches no standard address pattern".to_string(),
            )),
        }
    }

    /// The locking script this address commits to
    pub fn to_script_pubkey(&self) -> Script {
        match self {
            Address::P2pkh { hash, .. } => Script::p2pkh(hash),
            Address::P2sh { hash, .. } => Script::p2sh(hash),
            Address::P2wpkh { program, .. } => Script::p2wpkh(program),
            Address::P2wsh { program, .. } => Script::p2wsh(program),
            Address::P2tr { program, .. } => Script::p2tr(program),
        }
    }

    /// Encodes to text with the network's version byte or HRP.
    ///
    /// Regtest P2PKH/P2SH addresses share testnet's version bytes, so their
    /// text form decodes back as testnet; the segwit variants keep the
    /// distinct `bcrt` prefix and round-trip exactly.
    pub fn to_text(&self) -> Result<String> {
        match self {
            Address::P2pkh { network, hash } => {
                Ok(base58check_encode(network.p2pkh_version(), hash))
            }
            Address::P2sh { network, hash } => Ok(base58check_encode(network.p2sh_version(), hash)),
            Address::P2wpkh { network, program } => {
                segwit_address_encode(network.hrp(), 0, program)
            }
            Address::P2wsh { network, program } => segwit_address_encode(network.hrp(), 0, program),
            Address::P2tr { network, program } => segwit_address_encode(network.hrp(), 1, program),
        }
    }

    /// The raw payload: hash160 or witness program bytes
    pub fn program(&self) -> &[u8] {
        match self {
            Address::P2pkh { hash, .. } | Address::P2sh { hash, .. } => hash,
            Address::P2wpkh { program, .. } => program,
            Address::P2wsh { program, .. } | Address::P2tr { program, .. } => program,
        }
    }

    pub fn network(&self) -> Network {
        match self {
            Address::P2pkh { network, .. }
            | Address::P2sh { network, .. }
            | Address::P2wpkh { network, .. }
            | Address::P2wsh { network, .. }
            | Address::P2tr { network, .. } => *network,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_genesis_p2pkh() {
        let address = Address::decode("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa").unwrap();
        match &address {
            Address::P2pkh { network, hash } => {
                assert_eq!(*network, Network::Mainnet);
                assert_eq!(
                    hex::encode(hash),
                    "62e907b15cbf27d5425399ebf6f0fb50ebb88f18"
                );
            }
            other => panic!("expected P2PKH, got {:?}", other),
        }
        assert_eq!(
            address.to_text().unwrap(),
            "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"
        );
    }

    #[test]
    fn test_decode_bip173_p2wpkh() {
        let address = Address::decode("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4").unwrap();
        assert!(matches!(address, Address::P2wpkh { .. }));
        assert_eq!(
            hex::encode(address.program()),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }

    #[test]
    fn test_decode_bip86_p2tr() {
        // first BIP86 receiving address
        let address =
            Address::decode("bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr")
                .unwrap();
        assert!(matches!(address, Address::P2tr { .. }));
        assert_eq!(
            hex::encode(address.program()),
            "a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c"
        );
    }

    #[test]
    fn test_round_trip_all_variants_both_networks() {
        for network in [Network::Mainnet, Network::Testnet] {
            let addresses = vec![
                Address::P2pkh {
                    network,
                    hash: [0x11; 20],
                },
                Address::P2sh {
                    network,
                    hash: [0x22; 20],
                },
                Address::P2wpkh {
                    network,
                    program: [0x33; 20],
                },
                Address::P2wsh {
                    network,
                    program: [0x44; 32],
                },
                Address::P2tr {
                    network,
                    program: [0x55; 32],
                },
            ];
            for address in addresses {
                let text = address.to_text().unwrap();
                assert_eq!(Address::decode(&text).unwrap(), address);
            }
        }
    }

    #[test]
    fn test_script_pubkey_round_trip() {
        let address = Address::P2wsh {
            network: Network::Testnet,
            program: [0xab; 32],
        };
        let script = address.to_script_pubkey();
        assert_eq!(
            Address::from_script_pubkey(&script, Network::Testnet).unwrap(),
            address
        );
    }

    #[test]
    fn test_from_script_pubkey_p2pkh() {
        let script = Script::p2pkh(&[0x77; 20]);
        let address = Address::from_script_pubkey(&script, Network::Mainnet).unwrap();
        assert!(matches!(address, Address::P2pkh { .. }));
    }

    #[test]
    fn test_from_script_pubkey_rejects_nonstandard() {
        let script = Script::new().push_op(OP_RETURN).push_data(&[1, 2, 3]);
        let result = Address::from_script_pubkey(&script, Network::Mainnet);
        assert!(matches!(result, Err(TxForgeError::UnsupportedScript(_))));
    }

    #[test]
    fn test_regtest_legacy_decodes_as_testnet() {
        // shared 0x6f/0xc4 version bytes: payload survives, network tag
        // collapses to testnet
        let address = Address::P2pkh {
            network: Network::Regtest,
            hash: [0x66; 20],
        };
        let decoded = Address::decode(&address.to_text().unwrap()).unwrap();
        assert_eq!(
            decoded,
            Address::P2pkh {
                network: Network::Testnet,
                hash: [0x66; 20],
            }
        );

        // bech32 regtest keeps its own prefix and round-trips
        let segwit = Address::P2wpkh {
            network: Network::Regtest,
            program: [0x77; 20],
        };
        assert_eq!(
            Address::decode(&segwit.to_text().unwrap()).unwrap(),
            segwit
        );
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Address::decode("not-an-address").is_err());
        // valid-looking bech32 with an unknown prefix
        assert!(Address::decode("xx1qw508d6qejxtdg4y5r3zarvary0c5xw7kfjhscx").is_err());
    }

    #[test]
    fn test_witness_program_length_enforced() {
        assert!(Address::from_witness_program(Network::Mainnet, 0, &[0u8; 25]).is_err());
        assert!(Address::from_witness_program(Network::Mainnet, 1, &[0u8; 20]).is_err());
    }
}
