//! Settlement authorization rules.
//!
//! Pure predicates over already loaded records: no storage, no clock. The
//! engine loads the split expense (and share), then asks these functions.
//!
//! | actor                 | view | modify split | modify share      | delete share |
//! |-----------------------|------|--------------|-------------------|--------------|
//! | creator               | yes  | yes          | full              | yes          |
//! | holder of the share   | yes  | no           | payment only      | no           |
//! | holder of another one | yes  | no           | no                | no           |
//! | anyone else           | no   | no           | no                | no           |

use crate::{Share, SplitExpense};

/// What an actor may change on a share.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareAccess {
    /// Every field (creator of the owning split expense).
    Full,
    /// Payment related fields only (holder of the share).
    PaymentOnly,
}

/// Creator or holder of any of its shares. `split.shares` must be loaded.
pub fn can_view(actor: &str, split: &SplitExpense) -> bool {
    split.created_by == actor || split.holders().any(|holder| holder == actor)
}

pub fn can_modify_split_expense(actor: &str, split: &SplitExpense) -> bool {
    split.created_by == actor
}

/// Creator wins over holder when the creator also holds the share.
pub fn share_access(actor: &str, share: &Share, owner: &SplitExpense) -> Option<ShareAccess> {
    if owner.created_by == actor {
        Some(ShareAccess::Full)
    } else if share.user_id == actor {
        Some(ShareAccess::PaymentOnly)
    } else {
        None
    }
}

pub fn can_modify_share(actor: &str, share: &Share, owner: &SplitExpense) -> bool {
    share_access(actor, share, owner).is_some()
}

/// Holders may never delete their own share.
pub fn can_delete_share(actor: &str, owner: &SplitExpense) -> bool {
    owner.created_by == actor
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{MoneyCents, SplitParams, SplitStrategy};

    fn split_with_holders(creator: &str, holders: &[&str]) -> SplitExpense {
        let id = Uuid::new_v4();
        let now = Utc::now();
        SplitExpense {
            id,
            group_id: "g1".to_string(),
            expense_id: "e1".to_string(),
            created_by: creator.to_string(),
            total_amount: MoneyCents::new(100 * holders.len() as i64),
            split_type: SplitStrategy::Equal,
            settlement_priority: 0,
            grace_end_date: now,
            custom_split_rules: SplitParams::None,
            needs_approval: false,
            due_date: now,
            idempotency_key: None,
            created_at: now,
            updated_at: now,
            shares: holders
                .iter()
                .map(|h| Share::new(id, h.to_string(), MoneyCents::new(100)))
                .collect(),
        }
    }

    #[test]
    fn view_matrix() {
        let split = split_with_holders("c", &["h1", "h2"]);
        assert!(can_view("c", &split));
        assert!(can_view("h1", &split));
        assert!(can_view("h2", &split));
        assert!(!can_view("u", &split));
    }

    #[test]
    fn modify_split_is_creator_only() {
        let split = split_with_holders("c", &["h1", "h2"]);
        assert!(can_modify_split_expense("c", &split));
        assert!(!can_modify_split_expense("h1", &split));
        assert!(!can_modify_split_expense("u", &split));
    }

    #[test]
    fn modify_share_matrix() {
        let split = split_with_holders("c", &["h1", "h2"]);
        let h1_share = &split.shares[0];
        assert_eq!(share_access("c", h1_share, &split), Some(ShareAccess::Full));
        assert_eq!(
            share_access("h1", h1_share, &split),
            Some(ShareAccess::PaymentOnly)
        );
        assert!(can_modify_share("c", h1_share, &split));
        assert!(can_modify_share("h1", h1_share, &split));
        assert!(!can_modify_share("h2", h1_share, &split));
        assert!(!can_modify_share("u", h1_share, &split));
    }

    #[test]
    fn creator_holding_a_share_keeps_full_access() {
        let split = split_with_holders("c", &["c", "h1"]);
        assert_eq!(
            share_access("c", &split.shares[0], &split),
            Some(ShareAccess::Full)
        );
    }

    #[test]
    fn delete_share_is_creator_only() {
        let split = split_with_holders("c", &["h1"]);
        assert!(can_delete_share("c", &split));
        assert!(!can_delete_share("h1", &split));
        assert!(!can_delete_share("u", &split));
    }
}
