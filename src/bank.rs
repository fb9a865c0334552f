// 9.2 bank.rs: the balance gateway. the engine never touches balances except through
// this trait. lock at placement, transfer at match, release at cancel.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::settlement::{SettlementBatch, SettlementInstruction};
use crate::types::{AccountId, Denom};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("Account {account_id} has insufficient {denom}: requested {requested}, available {available}")]
    InsufficientBalance {
        account_id: AccountId,
        denom: Denom,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Account {account_id} has insufficient locked {denom}: requested {requested}, locked {locked}")]
    InsufficientLocked {
        account_id: AccountId,
        denom: Denom,
        requested: Decimal,
        locked: Decimal,
    },

    #[error("Invalid amount {0}")]
    InvalidAmount(Decimal),
}

/// Spendable and escrowed holdings of one account in one denomination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub spendable: Decimal,
    pub locked: Decimal,
}

impl Balance {
    pub fn total(&self) -> Decimal {
        self.spendable + self.locked
    }
}

/// Narrow interface to the account ledger. Every call is atomic and fails
/// without partial effect.
pub trait BalanceGateway {
    fn balance(&self, account_id: AccountId, denom: &Denom) -> Balance;

    fn spendable(&self, account_id: AccountId, denom: &Denom) -> Decimal {
        self.balance(account_id, denom).spendable
    }

    fn locked(&self, account_id: AccountId, denom: &Denom) -> Decimal {
        self.balance(account_id, denom).locked
    }

    fn lock(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError>;

    fn release(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError>;

    /// Moves escrowed funds of `from` into the spendable balance of `to`.
    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        denom: &Denom,
        amount: Decimal,
    ) -> Result<(), BankError>;

    fn mint(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError>;

    fn burn(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError>;

    /// Applies every instruction of the batch, or none of them.
    fn settle(&mut self, batch: &SettlementBatch) -> Result<(), BankError>;
}

// In-memory ledger. BTreeMap everywhere so iteration order is identical on every node.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBank {
    balances: BTreeMap<(AccountId, Denom), Balance>,
    supply: BTreeMap<Denom, Decimal>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total minted minus burned for a denomination.
    pub fn supply(&self, denom: &Denom) -> Decimal {
        self.supply.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of spendable and locked holdings over all accounts.
    pub fn total_holdings(&self, denom: &Denom) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, b)| b.total())
            .sum()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&(AccountId, Denom), &Balance)> {
        self.balances.iter()
    }

    fn apply(
        balances: &mut BTreeMap<(AccountId, Denom), Balance>,
        instruction: &SettlementInstruction,
    ) -> Result<(), BankError> {
        let amount = instruction.amount();
        if amount < Decimal::ZERO {
            return Err(BankError::InvalidAmount(amount));
        }

        match instruction {
            SettlementInstruction::Lock { account_id, denom, .. } => {
                let balance = balances.entry((*account_id, denom.clone())).or_default();
                if balance.spendable < amount {
                    return Err(BankError::InsufficientBalance {
                        account_id: *account_id,
                        denom: denom.clone(),
                        requested: amount,
                        available: balance.spendable,
                    });
                }
                balance.spendable -= amount;
                balance.locked += amount;
            }
            SettlementInstruction::Release { account_id, denom, .. } => {
                let balance = balances.entry((*account_id, denom.clone())).or_default();
                if balance.locked < amount {
                    return Err(BankError::InsufficientLocked {
                        account_id: *account_id,
                        denom: denom.clone(),
                        requested: amount,
                        locked: balance.locked,
                    });
                }
                balance.locked -= amount;
                balance.spendable += amount;
            }
            SettlementInstruction::Transfer { from, to, denom, .. } => {
                let sender = balances.entry((*from, denom.clone())).or_default();
                if sender.locked < amount {
                    return Err(BankError::InsufficientLocked {
                        account_id: *from,
                        denom: denom.clone(),
                        requested: amount,
                        locked: sender.locked,
                    });
                }
                sender.locked -= amount;
                balances.entry((*to, denom.clone())).or_default().spendable += amount;
            }
        }

        Ok(())
    }
}

impl BalanceGateway for InMemoryBank {
    fn balance(&self, account_id: AccountId, denom: &Denom) -> Balance {
        self.balances
            .get(&(account_id, denom.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn lock(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        let mut batch = SettlementBatch::new();
        batch.lock(account_id, denom, amount);
        self.settle(&batch)
    }

    fn release(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        let mut batch = SettlementBatch::new();
        batch.release(account_id, denom, amount);
        self.settle(&batch)
    }

    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        denom: &Denom,
        amount: Decimal,
    ) -> Result<(), BankError> {
        let mut batch = SettlementBatch::new();
        batch.transfer(from, to, denom, amount);
        self.settle(&batch)
    }

    fn mint(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        if amount <= Decimal::ZERO {
            return Err(BankError::InvalidAmount(amount));
        }
        self.balances
            .entry((account_id, denom.clone()))
            .or_default()
            .spendable += amount;
        *self.supply.entry(denom.clone()).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    fn burn(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        if amount <= Decimal::ZERO {
            return Err(BankError::InvalidAmount(amount));
        }
        let balance = self.balances.entry((account_id, denom.clone())).or_default();
        if balance.spendable < amount {
            return Err(BankError::InsufficientBalance {
                account_id,
                denom: denom.clone(),
                requested: amount,
                available: balance.spendable,
            });
        }
        balance.spendable -= amount;
        *self.supply.entry(denom.clone()).or_insert(Decimal::ZERO) -= amount;
        Ok(())
    }

    fn settle(&mut self, batch: &SettlementBatch) -> Result<(), BankError> {
        // stage on a copy of the touched entries, commit only if every step succeeded
        let mut staged: BTreeMap<(AccountId, Denom), Balance> = BTreeMap::new();
        for instruction in &batch.instructions {
            let keys = match instruction {
                SettlementInstruction::Lock { account_id, denom, .. }
                | SettlementInstruction::Release { account_id, denom, .. } => {
                    vec![(*account_id, denom.clone())]
                }
                SettlementInstruction::Transfer { from, to, denom, .. } => {
                    vec![(*from, denom.clone()), (*to, denom.clone())]
                }
            };
            for key in keys {
                if !staged.contains_key(&key) {
                    let current = self.balances.get(&key).copied().unwrap_or_default();
                    staged.insert(key, current);
                }
            }
            Self::apply(&mut staged, instruction)?;
        }

        self.balances.extend(staged);
        Ok(())
    }
}
