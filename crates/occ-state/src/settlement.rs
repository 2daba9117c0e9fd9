//! # Settlement Stage
//!
//! The terminal exit stage. Completion fixes the damage charges and
//! pending dues and derives `final_amount = damage_charges + pending_dues`.
//!
//! ```text
//! open() ──▶ OPEN ──complete()──▶ SETTLED (terminal)
//! ```

use serde::{Deserialize, Serialize};

use occ_core::{
    Amount, AmountInput, LifecycleError, SettlementId, StateError, Timestamp, ValidationError,
};

/// Lifecycle state of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementState {
    /// Awaiting amounts.
    Open,
    /// Amounts fixed (terminal).
    Settled,
}

impl std::fmt::Display for SettlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Open => "OPEN",
            Self::Settled => "SETTLED",
        })
    }
}

/// Form input for completing a settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementInput {
    pub damage_charges: AmountInput,
    pub pending_dues: AmountInput,
}

impl SettlementInput {
    /// Convenience constructor.
    pub fn new(damage_charges: impl Into<AmountInput>, pending_dues: impl Into<AmountInput>) -> Self {
        Self {
            damage_charges: damage_charges.into(),
            pending_dues: pending_dues.into(),
        }
    }
}

/// The settlement record of one exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: SettlementId,
    pub state: SettlementState,
    pub damage_charges: Amount,
    pub pending_dues: Amount,
    pub final_amount: Amount,
    pub settled_at: Option<Timestamp>,
}

impl Settlement {
    /// An open settlement with zero amounts.
    pub fn open(id: SettlementId) -> Self {
        Self {
            id,
            state: SettlementState::Open,
            damage_charges: Amount::ZERO,
            pending_dues: Amount::ZERO,
            final_amount: Amount::ZERO,
            settled_at: None,
        }
    }

    /// Whether the settlement is final.
    pub fn is_settled(&self) -> bool {
        self.state == SettlementState::Settled
    }

    /// Fix the amounts and settle.
    ///
    /// # Errors
    ///
    /// - [`StateError`] if `id` is not this settlement or it is already
    ///   settled.
    /// - [`ValidationError::InvalidAmount`] for negative, NaN, infinite,
    ///   non-numeric or over-precise amounts, or a sum that overflows.
    pub fn complete(
        &mut self,
        id: SettlementId,
        input: &SettlementInput,
        now: Timestamp,
    ) -> Result<(), LifecycleError> {
        if id != self.id {
            return Err(StateError::new(
                "complete settlement",
                self.state,
                format!("{id} is not the open settlement ({})", self.id),
            )
            .into());
        }
        if self.is_settled() {
            return Err(StateError::new(
                "complete settlement",
                self.state,
                "settlement is final",
            )
            .into());
        }

        let damage_charges = input.damage_charges.parse("damage_charges")?;
        let pending_dues = input.pending_dues.parse("pending_dues")?;
        let final_amount = damage_charges.checked_add(pending_dues).ok_or_else(|| {
            ValidationError::InvalidAmount {
                field: "final_amount",
                reason: format!("{damage_charges} + {pending_dues} overflows"),
            }
        })?;

        self.damage_charges = damage_charges;
        self.pending_dues = pending_dues;
        self.final_amount = final_amount;
        self.state = SettlementState::Settled;
        self.settled_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_amount_is_sum() {
        let mut s = Settlement::open(SettlementId::new());
        s.complete(s.id, &SettlementInput::new(0u32, 500u32), Timestamp::now())
            .unwrap();
        assert!(s.is_settled());
        assert_eq!(s.final_amount, Amount::from_major(500).unwrap());

        let mut s = Settlement::open(SettlementId::new());
        s.complete(s.id, &SettlementInput::new("120.50", 79.5), Timestamp::now())
            .unwrap();
        assert_eq!(s.final_amount.to_string(), "200.00");
    }

    #[test]
    fn invalid_amounts_rejected_not_zeroed() {
        for input in [
            SettlementInput::new(-1.0, 0u32),
            SettlementInput::new(f64::NAN, 0u32),
            SettlementInput::new(0u32, "abc"),
            SettlementInput::new(0u32, "-5"),
        ] {
            let mut s = Settlement::open(SettlementId::new());
            let err = s.complete(s.id, &input, Timestamp::now()).unwrap_err();
            assert!(matches!(
                err,
                LifecycleError::Validation(ValidationError::InvalidAmount { .. })
            ));
            assert_eq!(s.state, SettlementState::Open);
            assert_eq!(s.final_amount, Amount::ZERO);
        }
    }

    #[test]
    fn overflow_rejected() {
        let mut s = Settlement::open(SettlementId::new());
        let huge = "184467440737095516.15";
        let err = s
            .complete(s.id, &SettlementInput::new(huge, huge), Timestamp::now())
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Validation(ValidationError::InvalidAmount {
                field: "final_amount",
                ..
            })
        ));
    }

    #[test]
    fn settled_is_terminal() {
        let mut s = Settlement::open(SettlementId::new());
        s.complete(s.id, &SettlementInput::new(0u32, 0u32), Timestamp::now())
            .unwrap();
        let err = s
            .complete(s.id, &SettlementInput::new(1u32, 1u32), Timestamp::now())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::State(_)));
    }
}
