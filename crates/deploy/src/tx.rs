//! EIP-155 legacy contract-creation transactions signed with a local key.

use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_core::primitives::{Bytes, TxKind, U256};
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSignerSync;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{Context, Result};

/// A contract-creation transaction (`to` is empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCreation {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub input: Bytes,
    pub chain_id: u64,
}

impl LegacyCreation {
    fn transaction(&self) -> TxLegacy {
        TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Create,
            value: U256::ZERO,
            input: self.input.clone(),
        }
    }

    /// Sign and encode the transaction for `eth_sendRawTransaction`.
    pub fn sign(&self, signer: &PrivateKeySigner) -> Result<Bytes> {
        let mut tx = self.transaction();
        let signature = signer
            .sign_transaction_sync(&mut tx)
            .context("Failed to sign creation transaction")?;

        let envelope = TxEnvelope::from(tx.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy_eips::eip2718::Decodable2718;

    use super::*;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn creation(chain_id: u64) -> LegacyCreation {
        LegacyCreation {
            nonce: 3,
            gas_price: 1_000_000_000,
            gas_limit: 500_000,
            input: Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52]),
            chain_id,
        }
    }

    fn decode(raw: &Bytes) -> TxEnvelope {
        TxEnvelope::decode_2718(&mut raw.as_ref()).unwrap()
    }

    #[test]
    fn test_signing_hash_depends_on_chain_id() {
        assert_ne!(
            creation(31337).transaction().signature_hash(),
            creation(1075).transaction().signature_hash()
        );
    }

    #[test]
    fn test_signed_creation_decodes() {
        let signer = PrivateKeySigner::from_str(DEV_KEY).unwrap();
        let raw = creation(1075).sign(&signer).unwrap();

        let envelope = decode(&raw);
        let signed = envelope.as_legacy().unwrap();
        let tx = signed.tx();
        assert_eq!(tx.chain_id, Some(1075));
        assert_eq!(tx.nonce, 3);
        assert_eq!(tx.to, TxKind::Create);
        assert_eq!(tx.input, creation(1075).input);
    }

    #[test]
    fn test_signature_recovers_signer() {
        let signer = PrivateKeySigner::from_str(DEV_KEY).unwrap();
        let raw = creation(31337).sign(&signer).unwrap();

        let envelope = decode(&raw);
        let signed = envelope.as_legacy().unwrap();
        assert_eq!(
            signed
                .signature()
                .recover_address_from_prehash(&signed.signature_hash())
                .unwrap(),
            signer.address()
        );
    }

    #[test]
    fn test_large_init_code() {
        let signer = PrivateKeySigner::from_str(DEV_KEY).unwrap();
        let mut tx = creation(1075);
        tx.input = Bytes::from(vec![0x5b; 3000]);

        let envelope = decode(&tx.sign(&signer).unwrap());
        assert_eq!(envelope.as_legacy().unwrap().tx().input.len(), 3000);
    }
}
