//! Credit ledger entries and posting requests.

use crate::domain::{Money, TimeMs};
use serde::{Deserialize, Serialize};

/// Direction of a credit ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditTransactionType {
    /// Commission earned by the store.
    Earned,
    /// Credit redeemed against a wholesale order.
    Deducted,
}

impl CreditTransactionType {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditTransactionType::Earned => "earned",
            CreditTransactionType::Deducted => "deducted",
        }
    }

    /// Parse the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "earned" => Some(CreditTransactionType::Earned),
            "deducted" => Some(CreditTransactionType::Deducted),
            _ => None,
        }
    }
}

/// Append-only credit ledger entry.
///
/// Never updated or deleted; corrections are new entries. `balance_after`
/// is the partnership balance snapshot taken in the same transaction as
/// the insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: i64,
    pub partnership_id: i64,
    /// Signed amount: positive for earned, negative for deducted.
    pub amount: Money,
    pub tx_type: CreditTransactionType,
    pub reason: String,
    pub balance_after: Money,
    pub conversion_id: Option<i64>,
    pub wholesale_order_id: Option<i64>,
    pub created_at: TimeMs,
}

/// Request to post a signed amount against a partnership balance.
#[derive(Debug, Clone)]
pub struct CreditPosting {
    pub partnership_id: i64,
    /// Positive = earn, negative = deduct. Deductions are clamped to the
    /// available balance.
    pub amount: Money,
    pub reason: String,
    pub conversion_id: Option<i64>,
    pub wholesale_order_id: Option<i64>,
}

impl CreditPosting {
    /// An earn posting for a conversion commission.
    pub fn earned(partnership_id: i64, amount: Money, reason: impl Into<String>) -> Self {
        CreditPosting {
            partnership_id,
            amount,
            reason: reason.into(),
            conversion_id: None,
            wholesale_order_id: None,
        }
    }

    /// A deduction posting (amount given as a positive magnitude).
    pub fn deducted(partnership_id: i64, magnitude: Money, reason: impl Into<String>) -> Self {
        CreditPosting {
            partnership_id,
            amount: -magnitude.abs(),
            reason: reason.into(),
            conversion_id: None,
            wholesale_order_id: None,
        }
    }

    /// Attach the originating conversion.
    pub fn for_conversion(mut self, conversion_id: i64) -> Self {
        self.conversion_id = Some(conversion_id);
        self
    }

    /// Attach the originating wholesale order.
    pub fn for_wholesale_order(mut self, wholesale_order_id: i64) -> Self {
        self.wholesale_order_id = Some(wholesale_order_id);
        self
    }

    /// The ledger entry type implied by the amount's sign.
    pub fn tx_type(&self) -> CreditTransactionType {
        if self.amount.is_negative() {
            CreditTransactionType::Deducted
        } else {
            CreditTransactionType::Earned
        }
    }
}

/// Result of a posting: what was actually applied after clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedCredit {
    pub transaction_id: i64,
    /// The signed amount actually applied (deductions may be clamped).
    pub applied: Money,
    pub balance_after: Money,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tx_type_from_sign() {
        let earn = CreditPosting::earned(1, Money::from_str("5").unwrap(), "commission");
        assert_eq!(earn.tx_type(), CreditTransactionType::Earned);

        let deduct = CreditPosting::deducted(1, Money::from_str("5").unwrap(), "redemption");
        assert_eq!(deduct.tx_type(), CreditTransactionType::Deducted);
        assert_eq!(deduct.amount, Money::from_str("-5").unwrap());
    }

    #[test]
    fn test_deducted_normalizes_sign() {
        // A negative magnitude still yields a deduction.
        let deduct = CreditPosting::deducted(1, Money::from_str("-5").unwrap(), "redemption");
        assert_eq!(deduct.amount, Money::from_str("-5").unwrap());
    }

    #[test]
    fn test_transaction_type_roundtrip() {
        for t in [CreditTransactionType::Earned, CreditTransactionType::Deducted] {
            assert_eq!(CreditTransactionType::parse(t.as_str()), Some(t));
        }
        assert_eq!(CreditTransactionType::parse("refund"), None);
    }
}
