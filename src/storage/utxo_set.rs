// UTXO (Unspent Transaction Output) pool management

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use crate::core::{Amount, PublicKeyHex, Transaction, UtxoId};

/// UTXO - a spendable amount owned by a public key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Utxo {
    pub id: UtxoId,
    pub owner: PublicKeyHex,
    pub amount: Amount,
}

impl Utxo {
    pub fn new(id: impl Into<UtxoId>, owner: PublicKeyHex, amount: Amount) -> Self {
        Self {
            id: id.into(),
            owner,
            amount,
        }
    }
}

/// Read access to a set of unspent outputs
pub trait UtxoView {
    fn get_utxo(&self, id: &str) -> Option<&Utxo>;

    /// Whether `id` was spent at some point; such an id is never live again
    fn is_consumed(&self, id: &str) -> bool;

    fn has_utxo(&self, id: &str) -> bool {
        self.get_utxo(id).is_some()
    }
}

/// In-memory UTXO pool, ordered by id
///
/// Serializes as the map of live outputs only. The consumed ids are
/// rebuilt by replaying the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtxoPool {
    utxos: BTreeMap<UtxoId, Utxo>,
    #[serde(skip)]
    consumed: BTreeSet<UtxoId>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a UTXO, returning the one it replaced
    pub(crate) fn add_utxo(&mut self, utxo: Utxo) -> Option<Utxo> {
        self.utxos.insert(utxo.id.clone(), utxo)
    }

    /// Remove a UTXO (spent) and remember its id as consumed
    pub(crate) fn remove_utxo(&mut self, id: &str) -> Option<Utxo> {
        let removed = self.utxos.remove(id)?;
        self.consumed.insert(removed.id.clone());
        Some(removed)
    }

    /// Settle a validated transaction: consume its inputs, create its output
    pub(crate) fn apply_transaction(&mut self, tx: &Transaction) {
        for id in &tx.input_utxos {
            self.remove_utxo(id);
        }
        if let Some(output) = tx.created_output() {
            self.add_utxo(Utxo::new(output.clone(), tx.receiver.clone(), tx.amount));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.utxos.values()
    }

    /// Total amount owned by a public key
    pub fn get_balance(&self, owner: &PublicKeyHex) -> Amount {
        self.utxos_for_owner(owner)
            .fold(Amount::ZERO, |acc, utxo| acc.checked_add(utxo.amount).unwrap_or(acc))
    }

    /// All UTXOs owned by a public key
    pub fn utxos_for_owner<'a>(&'a self, owner: &'a PublicKeyHex) -> impl Iterator<Item = &'a Utxo> {
        self.utxos.values().filter(move |utxo| &utxo.owner == owner)
    }

    /// Count total UTXOs
    pub fn count(&self) -> usize {
        self.utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utxos.is_empty()
    }
}

impl UtxoView for UtxoPool {
    fn get_utxo(&self, id: &str) -> Option<&Utxo> {
        self.utxos.get(id)
    }

    fn is_consumed(&self, id: &str) -> bool {
        self.consumed.contains(id)
    }
}

impl FromIterator<Utxo> for UtxoPool {
    fn from_iter<I: IntoIterator<Item = Utxo>>(iter: I) -> Self {
        Self {
            utxos: iter.into_iter().map(|u| (u.id.clone(), u)).collect(),
            consumed: BTreeSet::new(),
        }
    }
}

/// Scratch view over a pool: applies transactions without touching the base
///
/// Lets a batch of dependent transactions be checked in order before any of
/// them is settled for real.
pub struct PoolOverlay<'a> {
    base: &'a UtxoPool,
    spent: HashSet<UtxoId>,
    created: BTreeMap<UtxoId, Utxo>,
}

impl<'a> PoolOverlay<'a> {
    pub fn new(base: &'a UtxoPool) -> Self {
        Self {
            base,
            spent: HashSet::new(),
            created: BTreeMap::new(),
        }
    }

    /// Record a transaction's effect in the scratch view
    ///
    /// Every input lands in `spent`, whether it came from the base pool or
    /// from an earlier transaction in this view.
    pub fn apply_transaction(&mut self, tx: &Transaction) {
        for id in &tx.input_utxos {
            self.created.remove(id);
            self.spent.insert(id.clone());
        }
        if let Some(output) = tx.created_output() {
            self.created.insert(
                output.clone(),
                Utxo::new(output.clone(), tx.receiver.clone(), tx.amount),
            );
        }
    }

    /// Whether `id` was consumed by a transaction applied to this view
    pub fn was_spent_here(&self, id: &str) -> bool {
        self.spent.contains(id)
    }
}

impl UtxoView for PoolOverlay<'_> {
    fn get_utxo(&self, id: &str) -> Option<&Utxo> {
        if self.spent.contains(id) {
            return None;
        }
        self.created.get(id).or_else(|| self.base.get_utxo(id))
    }

    fn is_consumed(&self, id: &str) -> bool {
        self.spent.contains(id) || self.base.is_consumed(id)
    }
}
