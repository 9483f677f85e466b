// Transaction data structure

use serde::{Deserialize, Serialize};
use crate::core::{Amount, PublicKeyHex, UtxoId};
use super::serialize::{write_var_bytes, write_var_str, write_str_list};

/// Transfer of `amount` from `sender` to `receiver`
///
/// Spends every id in `input_utxos` (all owned by the sender) and creates
/// `output_utxos[0]`, owned by the receiver and holding `amount`. Any input
/// value above `amount` is not returned as change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    /// Caller-supplied id, unique within a block
    pub id: String,
    pub sender: PublicKeyHex,
    pub receiver: PublicKeyHex,
    pub amount: Amount,
    pub input_utxos: Vec<UtxoId>,
    pub output_utxos: Vec<UtxoId>,
    /// 64-byte compact ECDSA signature over [`Transaction::signing_message`]
    #[serde(with = "hex")]
    pub signature: Vec<u8>,
}

impl Transaction {
    /// Create an unsigned transaction
    pub fn new(
        id: impl Into<String>,
        sender: PublicKeyHex,
        receiver: PublicKeyHex,
        amount: Amount,
        input_utxos: Vec<UtxoId>,
        output_utxos: Vec<UtxoId>,
    ) -> Self {
        Self {
            id: id.into(),
            sender,
            receiver,
            amount,
            input_utxos,
            output_utxos,
            signature: Vec::new(),
        }
    }

    /// Canonical message covered by the signature
    ///
    /// `id, sender, receiver, amount` as length-prefixed UTF-8 (amount in its
    /// fixed 8-decimal text form), then the counted input ids and the counted
    /// output ids, both in list order.
    pub fn signing_message(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_var_str(&mut buf, &self.id);
        write_var_str(&mut buf, self.sender.as_str());
        write_var_str(&mut buf, self.receiver.as_str());
        write_var_str(&mut buf, &self.amount.to_string());
        write_str_list(&mut buf, &self.input_utxos);
        write_str_list(&mut buf, &self.output_utxos);
        buf
    }

    /// Bytes this transaction contributes to a block digest
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_var_bytes(&mut buf, &self.signing_message());
        write_var_bytes(&mut buf, &self.signature);
        buf
    }

    /// The single output this transaction creates, if well-formed
    pub fn created_output(&self) -> Option<&UtxoId> {
        match self.output_utxos.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}
