use std::cmp::Reverse;

use crate::Account;

/// Orders candidates by mutual connections, then by follower count, both descending.
/// The sort is stable, so full ties keep their encounter order.
pub fn rank(mut accounts: Vec<Account>) -> Vec<Account> {
    accounts.sort_by_key(|account| (Reverse(account.followed_by.len()), Reverse(account.followers_count)));
    accounts
}
