//! ACV and RCV payment tracking (step 7)
//!
//! Each payment type is recorded once, in two calls: create the expected
//! payment, then mark it received.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::PaymentId;

/// Payment phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    /// Actual Cash Value - the first, depreciated payment
    Acv,
    /// Recoverable depreciation released once repairs are done
    Rcv,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentType::Acv => write!(f, "ACV"),
            PaymentType::Rcv => write!(f, "RCV"),
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Expected,
    Received,
    Reconciled,
    Disputed,
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub status: PaymentStatus,
    #[serde(default)]
    pub received_date: Option<NaiveDate>,
    #[serde(default)]
    pub check_number: Option<String>,
}

impl Payment {
    /// A payment the owner is waiting on
    pub fn expected(payment_type: PaymentType, amount: Decimal) -> Self {
        Self {
            id: PaymentId::new_v7(),
            payment_type,
            amount,
            status: PaymentStatus::Expected,
            received_date: None,
            check_number: None,
        }
    }

    /// True once the money has arrived (received, reconciled or disputed)
    pub fn is_settled(&self) -> bool {
        self.status != PaymentStatus::Expected
    }
}

/// Second call of the pattern: what arrived and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub received_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_number: Option<String>,
}

/// The claim's two payment slots
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentLedger {
    acv: Option<Payment>,
    rcv: Option<Payment>,
}

impl PaymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, payment_type: PaymentType) -> Option<&Payment> {
        match payment_type {
            PaymentType::Acv => self.acv.as_ref(),
            PaymentType::Rcv => self.rcv.as_ref(),
        }
    }

    /// Stores the latest copy of a payment in its slot
    pub fn store(&mut self, payment: Payment) {
        match payment.payment_type {
            PaymentType::Acv => self.acv = Some(payment),
            PaymentType::Rcv => self.rcv = Some(payment),
        }
    }

    /// Fills a slot from a server record; a settled copy wins over an expected one
    pub fn restore(&mut self, payment: Payment) {
        if self.is_received(payment.payment_type) && !payment.is_settled() {
            return;
        }
        self.store(payment);
    }

    /// An expected payment whose mark-received call has not succeeded yet
    pub fn pending(&self, payment_type: PaymentType) -> Option<&Payment> {
        self.get(payment_type).filter(|p| !p.is_settled())
    }

    pub fn is_received(&self, payment_type: PaymentType) -> bool {
        self.get(payment_type).map(Payment::is_settled).unwrap_or(false)
    }

    /// Sum of settled payments
    pub fn total_received(&self) -> Decimal {
        [self.acv.as_ref(), self.rcv.as_ref()]
            .into_iter()
            .flatten()
            .filter(|p| p.is_settled())
            .map(|p| p.amount)
            .sum()
    }
}
