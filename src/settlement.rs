// 9.1 settlement.rs: the balance side of one command, batched so it lands atomically.
// a place command turns its match plan into exactly one batch.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{AccountId, Denom};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementInstruction {
    // Reserve spendable funds into the account's escrow
    Lock {
        account_id: AccountId,
        denom: Denom,
        amount: Decimal,
    },

    // Return escrowed funds to the account's spendable balance
    Release {
        account_id: AccountId,
        denom: Denom,
        amount: Decimal,
    },

    // Move escrowed funds of `from` into the spendable balance of `to`
    Transfer {
        from: AccountId,
        to: AccountId,
        denom: Denom,
        amount: Decimal,
    },
}

impl SettlementInstruction {
    pub fn amount(&self) -> Decimal {
        match self {
            SettlementInstruction::Lock { amount, .. }
            | SettlementInstruction::Release { amount, .. }
            | SettlementInstruction::Transfer { amount, .. } => *amount,
        }
    }
}

/// Net change of one account's holdings in one denomination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetFlow {
    pub spendable: Decimal,
    pub locked: Decimal,
}

// Instructions executed as one unit: all of them or none
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub instructions: Vec<SettlementInstruction>,
}

impl SettlementBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, instruction: SettlementInstruction) {
        self.instructions.push(instruction);
    }

    pub fn lock(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) {
        self.add(SettlementInstruction::Lock {
            account_id,
            denom: denom.clone(),
            amount,
        });
    }

    pub fn release(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) {
        self.add(SettlementInstruction::Release {
            account_id,
            denom: denom.clone(),
            amount,
        });
    }

    pub fn transfer(&mut self, from: AccountId, to: AccountId, denom: &Denom, amount: Decimal) {
        self.add(SettlementInstruction::Transfer {
            from,
            to,
            denom: denom.clone(),
            amount,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    // Net flows per (account, denom). the totals over all accounts of a denom
    // always sum to zero: settlement moves value, it never creates it.
    pub fn net_flows(&self) -> BTreeMap<(AccountId, Denom), NetFlow> {
        let mut flows: BTreeMap<(AccountId, Denom), NetFlow> = BTreeMap::new();

        for instruction in &self.instructions {
            match instruction {
                SettlementInstruction::Lock { account_id, denom, amount } => {
                    let flow = flows.entry((*account_id, denom.clone())).or_default();
                    flow.spendable -= *amount;
                    flow.locked += *amount;
                }
                SettlementInstruction::Release { account_id, denom, amount } => {
                    let flow = flows.entry((*account_id, denom.clone())).or_default();
                    flow.spendable += *amount;
                    flow.locked -= *amount;
                }
                SettlementInstruction::Transfer { from, to, denom, amount } => {
                    flows.entry((*from, denom.clone())).or_default().locked -= *amount;
                    flows.entry((*to, denom.clone())).or_default().spendable += *amount;
                }
            }
        }

        flows
    }
}
