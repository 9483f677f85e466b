// Transaction builder

use crate::core::{Amount, PublicKeyHex, Transaction, UtxoId};
use crate::error::TxError;
use crate::storage::UtxoPool;
use crate::wallet::KeyPair;

/// Sign a transaction in place with the sender's key pair
pub fn sign_transaction(tx: &mut Transaction, keypair: &KeyPair) {
    tx.signature = keypair.sign(&tx.signing_message());
}

/// Builds signed transfers out of the sender's unspent outputs
pub struct TransactionBuilder<'a> {
    keypair: &'a KeyPair,
    utxo_pool: &'a UtxoPool,
}

impl<'a> TransactionBuilder<'a> {
    /// Create a new transaction builder
    pub fn new(keypair: &'a KeyPair, utxo_pool: &'a UtxoPool) -> Self {
        Self { keypair, utxo_pool }
    }

    /// Build a transaction paying `amount` to `to` as the new output `output_id`
    ///
    /// Inputs are the sender's UTXOs in id order, taken until they cover
    /// `amount`. Whatever they hold above `amount` is not returned.
    pub fn build(
        &self,
        id: impl Into<String>,
        to: &PublicKeyHex,
        amount: Amount,
        output_id: impl Into<UtxoId>,
    ) -> Result<Transaction, TxError> {
        if amount.is_zero() {
            return Err(TxError::InvalidAmount);
        }

        let sender = self.keypair.public_key_hex();
        let (selected, _total) = self.select_utxos(&sender, amount)?;

        let mut tx = Transaction::new(
            id,
            sender,
            to.clone(),
            amount,
            selected,
            vec![output_id.into()],
        );
        sign_transaction(&mut tx, self.keypair);

        log::debug!("Built transaction {} spending {} inputs", tx.id, tx.input_utxos.len());
        Ok(tx)
    }

    /// Select UTXOs to cover amount
    fn select_utxos(
        &self,
        owner: &PublicKeyHex,
        target: Amount,
    ) -> Result<(Vec<UtxoId>, Amount), TxError> {
        let mut selected = Vec::new();
        let mut total = Amount::ZERO;

        for utxo in self.utxo_pool.utxos_for_owner(owner) {
            if total >= target {
                break;
            }
            selected.push(utxo.id.clone());
            total = total.checked_add(utxo.amount).unwrap_or(total);
        }

        if total < target {
            return Err(TxError::InsufficientInputs {
                required: target.to_string(),
                available: total.to_string(),
            });
        }

        Ok((selected, total))
    }
}
