//! Stock transition function for the order ledger
//!
//! An order reserves its quantity against its product exactly once: debited
//! on creation, credited back when the order becomes canceled, and debited
//! again if a canceled order is reactivated. Every other status change leaves
//! stock untouched.

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Order, OrderStatus, Product};

/// Errors raised by a stock transition. The product is unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("not enough stock available: requested {requested}, available {available}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("order quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("order references product {expected}, not {actual}")]
    ProductMismatch { expected: Uuid, actual: Uuid },

    #[error("stock level overflow")]
    Overflow,

    #[error("order is {0} and can no longer be canceled")]
    NotCancelable(OrderStatus),
}

/// Which orders a status change may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionScope {
    /// Any order, any current status
    AnyOrder,
    /// Only while the order is pending (owner cancellation)
    OwnPendingOrder,
}

/// Decide whether moving an order from `current` to `next` is permitted
/// under `scope`. `Ok(false)` means the status is already `next` and
/// nothing should be written.
pub fn check_transition(
    current: OrderStatus,
    next: OrderStatus,
    scope: TransitionScope,
) -> Result<bool, StockError> {
    if scope == TransitionScope::OwnPendingOrder && current != OrderStatus::Pending {
        return Err(StockError::NotCancelable(current));
    }
    Ok(current != next)
}

/// Stock change required by an order transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockAdjustment {
    None,
    Debit(i32),
    Credit(i32),
}

impl StockAdjustment {
    /// Classify the change from `previous` (None for a new order) to `next`
    pub fn for_transition(previous: Option<OrderStatus>, next: OrderStatus, quantity: i32) -> Self {
        match previous {
            None => StockAdjustment::Debit(quantity),
            Some(prev) if !prev.is_canceled() && next.is_canceled() => {
                StockAdjustment::Credit(quantity)
            }
            Some(prev) if prev.is_canceled() && !next.is_canceled() => {
                StockAdjustment::Debit(quantity)
            }
            Some(_) => StockAdjustment::None,
        }
    }

    /// New quantity on hand after applying this adjustment
    pub fn apply(self, on_hand: i32) -> Result<i32, StockError> {
        match self {
            StockAdjustment::None => Ok(on_hand),
            StockAdjustment::Debit(requested) if on_hand < requested => {
                Err(StockError::InsufficientStock {
                    available: on_hand,
                    requested,
                })
            }
            StockAdjustment::Debit(requested) => Ok(on_hand - requested),
            StockAdjustment::Credit(released) => {
                on_hand.checked_add(released).ok_or(StockError::Overflow)
            }
        }
    }

    /// Signed change to quantity on hand
    pub fn delta(self) -> i32 {
        match self {
            StockAdjustment::None => 0,
            StockAdjustment::Debit(q) => -q,
            StockAdjustment::Credit(q) => q,
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, StockAdjustment::None)
    }
}

/// Apply the stock side effect of moving `order` from `previous` to its
/// current status. `product` is only mutated when the transition succeeds.
pub fn apply_order_transition(
    previous: Option<OrderStatus>,
    order: &Order,
    product: &mut Product,
) -> Result<StockAdjustment, StockError> {
    if order.product_id != product.id {
        return Err(StockError::ProductMismatch {
            expected: order.product_id,
            actual: product.id,
        });
    }
    if order.quantity <= 0 {
        return Err(StockError::InvalidQuantity(order.quantity));
    }

    let adjustment = StockAdjustment::for_transition(previous, order.status, order.quantity);
    product.quantity = adjustment.apply(product.quantity)?;
    Ok(adjustment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(quantity: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "MacBook Pro".to_string(),
            description: "Apple Laptop".to_string(),
            quantity,
            price: Decimal::from(2000),
            created_at: Utc::now(),
        }
    }

    fn order_for(product: &Product, quantity: i32, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            product_id: product.id,
            quantity,
            ordered_by: Uuid::new_v4(),
            status,
            ordered_at: Utc::now(),
        }
    }

    #[test]
    fn test_transition_classification() {
        use OrderStatus::*;
        assert_eq!(StockAdjustment::for_transition(None, Pending, 3), StockAdjustment::Debit(3));
        assert_eq!(StockAdjustment::for_transition(Some(Pending), Canceled, 3), StockAdjustment::Credit(3));
        assert_eq!(StockAdjustment::for_transition(Some(Completed), Canceled, 3), StockAdjustment::Credit(3));
        assert_eq!(StockAdjustment::for_transition(Some(Canceled), Pending, 3), StockAdjustment::Debit(3));
        assert_eq!(StockAdjustment::for_transition(Some(Canceled), Completed, 3), StockAdjustment::Debit(3));
        assert_eq!(StockAdjustment::for_transition(Some(Pending), Completed, 3), StockAdjustment::None);
        assert_eq!(StockAdjustment::for_transition(Some(Canceled), Canceled, 3), StockAdjustment::None);
        assert_eq!(StockAdjustment::for_transition(Some(Pending), Pending, 3), StockAdjustment::None);
    }

    #[test]
    fn test_completed_order_debits_stock() {
        let mut p = product(10);
        let order = order_for(&p, 2, OrderStatus::Completed);
        let adjustment = apply_order_transition(None, &order, &mut p).unwrap();
        assert_eq!(adjustment, StockAdjustment::Debit(2));
        assert_eq!(p.quantity, 8);
    }

    #[test]
    fn test_insufficient_stock_leaves_product_unchanged() {
        let mut p = product(3);
        let order = order_for(&p, 5, OrderStatus::Pending);
        let err = apply_order_transition(None, &order, &mut p).unwrap_err();
        assert_eq!(err, StockError::InsufficientStock { available: 3, requested: 5 });
        assert_eq!(p.quantity, 3);
    }

    #[test]
    fn test_exact_stock_can_be_ordered() {
        let mut p = product(5);
        let order = order_for(&p, 5, OrderStatus::Pending);
        apply_order_transition(None, &order, &mut p).unwrap();
        assert_eq!(p.quantity, 0);
    }

    #[test]
    fn test_cancel_then_reactivate() {
        let mut p = product(10);
        let mut order = order_for(&p, 4, OrderStatus::Pending);
        apply_order_transition(None, &order, &mut p).unwrap();
        assert_eq!(p.quantity, 6);

        order.status = OrderStatus::Canceled;
        apply_order_transition(Some(OrderStatus::Pending), &order, &mut p).unwrap();
        assert_eq!(p.quantity, 10);

        order.status = OrderStatus::Completed;
        apply_order_transition(Some(OrderStatus::Canceled), &order, &mut p).unwrap();
        assert_eq!(p.quantity, 6);
    }

    #[test]
    fn test_reactivation_checks_stock() {
        let mut p = product(1);
        let order = order_for(&p, 4, OrderStatus::Pending);
        let err = apply_order_transition(Some(OrderStatus::Canceled), &order, &mut p).unwrap_err();
        assert!(matches!(err, StockError::InsufficientStock { .. }));
        assert_eq!(p.quantity, 1);
    }

    #[test]
    fn test_product_mismatch_is_rejected() {
        let mut p = product(10);
        let other = product(10);
        let order = order_for(&other, 1, OrderStatus::Pending);
        assert!(matches!(
            apply_order_transition(None, &order, &mut p),
            Err(StockError::ProductMismatch { .. })
        ));
        assert_eq!(p.quantity, 10);
    }

    #[test]
    fn test_non_positive_quantity_is_rejected() {
        let mut p = product(10);
        let order = order_for(&p, 0, OrderStatus::Pending);
        assert_eq!(
            apply_order_transition(None, &order, &mut p),
            Err(StockError::InvalidQuantity(0))
        );
    }

    #[test]
    fn test_owner_can_cancel_pending() {
        assert_eq!(
            check_transition(OrderStatus::Pending, OrderStatus::Canceled, TransitionScope::OwnPendingOrder),
            Ok(true)
        );
    }

    #[test]
    fn test_owner_cannot_cancel_twice() {
        assert_eq!(
            check_transition(OrderStatus::Canceled, OrderStatus::Canceled, TransitionScope::OwnPendingOrder),
            Err(StockError::NotCancelable(OrderStatus::Canceled))
        );
    }

    #[test]
    fn test_owner_cannot_cancel_completed() {
        assert_eq!(
            check_transition(OrderStatus::Completed, OrderStatus::Canceled, TransitionScope::OwnPendingOrder),
            Err(StockError::NotCancelable(OrderStatus::Completed))
        );
    }

    #[test]
    fn test_same_status_is_a_no_op() {
        use OrderStatus::*;
        for status in [Pending, Completed, Canceled] {
            assert_eq!(check_transition(status, status, TransitionScope::AnyOrder), Ok(false));
        }
        assert_eq!(check_transition(Completed, Canceled, TransitionScope::AnyOrder), Ok(true));
        assert_eq!(check_transition(Canceled, Pending, TransitionScope::AnyOrder), Ok(true));
    }

    #[test]
    fn test_credit_overflow() {
        assert_eq!(StockAdjustment::Credit(1).apply(i32::MAX), Err(StockError::Overflow));
    }
}
