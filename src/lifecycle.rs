//! Table-driven lifecycle guard shared by the rental and order engines.
//!
//! Each operation is a `Transition`: the states it may start from and the
//! state it lands in. `apply` either yields the next state or an
//! `InvalidState` error naming the operation and the current status, so both
//! engines produce identical diagnostics for illegal transitions.

use std::fmt::Display;

use crate::error::AppError;
use crate::models::{OrderStatus, RentalStatus};

pub trait LifecycleStatus: Copy + Eq + Display + 'static {
    const ENTITY: &'static str;

    fn is_terminal(self) -> bool;
}

impl LifecycleStatus for RentalStatus {
    const ENTITY: &'static str = "rental";

    fn is_terminal(self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }
}

impl LifecycleStatus for OrderStatus {
    const ENTITY: &'static str = "order";

    fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

pub struct Transition<S: LifecycleStatus> {
    pub op: &'static str,
    pub from: &'static [S],
    pub to: S,
}

impl<S: LifecycleStatus> Transition<S> {
    pub fn apply(&self, current: S) -> Result<S, AppError> {
        if self.from.contains(&current) {
            Ok(self.to)
        } else {
            Err(AppError::InvalidState {
                entity: S::ENTITY,
                op: self.op,
                current: current.to_string(),
            })
        }
    }
}

pub mod rental {
    use super::Transition;
    use crate::models::RentalStatus::{self, *};

    pub const CONFIRM: Transition<RentalStatus> = Transition {
        op: "confirm",
        from: &[Pending],
        to: Confirmed,
    };

    pub const ACTIVATE: Transition<RentalStatus> = Transition {
        op: "activate",
        from: &[Confirmed],
        to: Active,
    };

    pub const COMPLETE: Transition<RentalStatus> = Transition {
        op: "complete",
        from: &[Active],
        to: Completed,
    };

    pub const CANCEL: Transition<RentalStatus> = Transition {
        op: "cancel",
        from: &[Pending, Confirmed, Active],
        to: Cancelled,
    };
}

pub mod order {
    use super::Transition;
    use crate::models::OrderStatus::{self, *};

    pub const CONFIRM: Transition<OrderStatus> = Transition {
        op: "confirm",
        from: &[Pending],
        to: Confirmed,
    };

    pub const SHIP: Transition<OrderStatus> = Transition {
        op: "mark shipped",
        from: &[Confirmed],
        to: Shipped,
    };

    pub const DELIVER: Transition<OrderStatus> = Transition {
        op: "mark delivered",
        from: &[Shipped],
        to: Delivered,
    };

    pub const CANCEL: Transition<OrderStatus> = Transition {
        op: "cancel",
        from: &[Pending, Confirmed, Shipped],
        to: Cancelled,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OrderStatus, RentalStatus};

    #[test]
    fn rental_happy_path() {
        let s = rental::CONFIRM.apply(RentalStatus::Pending).unwrap();
        assert_eq!(s, RentalStatus::Confirmed);
        let s = rental::ACTIVATE.apply(s).unwrap();
        assert_eq!(s, RentalStatus::Active);
        let s = rental::COMPLETE.apply(s).unwrap();
        assert_eq!(s, RentalStatus::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn rental_confirm_twice_fails() {
        let confirmed = rental::CONFIRM.apply(RentalStatus::Pending).unwrap();
        let err = rental::CONFIRM.apply(confirmed).unwrap_err();
        match err {
            AppError::InvalidState { op, current, .. } => {
                assert_eq!(op, "confirm");
                assert_eq!(current, "confirmed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rental_cancel_from_any_non_terminal() {
        for from in [
            RentalStatus::Pending,
            RentalStatus::Confirmed,
            RentalStatus::Active,
        ] {
            assert_eq!(rental::CANCEL.apply(from).unwrap(), RentalStatus::Cancelled);
        }
    }

    #[test]
    fn rental_cancel_twice_fails() {
        let cancelled = rental::CANCEL.apply(RentalStatus::Pending).unwrap();
        assert!(rental::CANCEL.apply(cancelled).is_err());
    }

    #[test]
    fn rental_complete_requires_active() {
        for from in [
            RentalStatus::Pending,
            RentalStatus::Confirmed,
            RentalStatus::Completed,
            RentalStatus::Cancelled,
        ] {
            assert!(rental::COMPLETE.apply(from).is_err());
        }
    }

    #[test]
    fn order_happy_path() {
        let s = order::CONFIRM.apply(OrderStatus::Pending).unwrap();
        let s = order::SHIP.apply(s).unwrap();
        let s = order::DELIVER.apply(s).unwrap();
        assert_eq!(s, OrderStatus::Delivered);
        assert!(s.is_terminal());
    }

    #[test]
    fn order_cancel_rejected_after_delivery() {
        let err = order::CANCEL.apply(OrderStatus::Delivered).unwrap_err();
        match err {
            AppError::InvalidState { entity, current, .. } => {
                assert_eq!(entity, "order");
                assert_eq!(current, "delivered");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn order_ship_requires_confirmed() {
        assert!(order::SHIP.apply(OrderStatus::Pending).is_err());
        assert!(order::SHIP.apply(OrderStatus::Shipped).is_err());
    }

    #[test]
    fn invalid_state_message_names_op_and_status() {
        let err = order::CONFIRM.apply(OrderStatus::Shipped).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("confirm"), "{msg}");
        assert!(msg.contains("shipped"), "{msg}");
    }
}
