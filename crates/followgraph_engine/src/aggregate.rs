use std::collections::{HashMap, HashSet};

use crate::Account;

/// Candidates keyed by `acct`, kept in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    accounts: Vec<Account>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `account`, or unions its `followed_by` into the entry already held for
    /// the same `acct`. Every other field keeps its first-seen value.
    pub fn merge(&mut self, account: &Account) {
        match self.index.get(&account.acct) {
            Some(&slot) => {
                self.accounts[slot]
                    .followed_by
                    .extend(account.followed_by.iter().cloned());
            }
            None => {
                self.index.insert(account.acct.clone(), self.accounts.len());
                self.accounts.push(account.clone());
            }
        }
    }

    pub fn get(&self, acct: &str) -> Option<&Account> {
        self.index.get(acct).map(|&slot| &self.accounts[slot])
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn into_accounts(self) -> Vec<Account> {
        self.accounts
    }
}

/// Flattens second-degree batches into one candidate set, dropping excluded
/// handles and accounts that opted out of discovery.
pub fn aggregate<'a, I>(batches: I, excluded: &HashSet<String>) -> CandidateSet
where
    I: IntoIterator<Item = &'a Vec<Account>>,
{
    let mut candidates = CandidateSet::new();
    for account in batches.into_iter().flatten() {
        if !account.discoverable || excluded.contains(&account.acct) {
            continue;
        }
        candidates.merge(account);
    }
    candidates
}
