//! Quantity aggregation and distribution logic for procurement
//!
//! Pure helpers used by the order issuer and the receiving flow. Keeping
//! them free of storage concerns makes the conservation rules directly
//! testable.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::OrderItem;

/// Decimal places carried by stored quantities
const QUANTITY_SCALE: u32 = 3;

/// A request line to be aggregated into an order item
#[derive(Debug, Clone)]
pub struct RequestLine {
    pub material_name: String,
    pub unit: String,
    pub quantity: Decimal,
}

/// Aggregate request lines sharing a lot into consolidated order items
///
/// Lines with the same material name are summed into one item. Order of
/// first appearance is preserved.
pub fn aggregate_order_items(lines: &[RequestLine]) -> Vec<OrderItem> {
    let mut items: Vec<OrderItem> = Vec::new();
    for line in lines {
        match items
            .iter_mut()
            .find(|i| i.material_name == line.material_name)
        {
            Some(item) => item.quantity += line.quantity,
            None => items.push(OrderItem {
                material_name: line.material_name.clone(),
                unit: line.unit.clone(),
                quantity: line.quantity,
                unit_price: None,
            }),
        }
    }
    items
}

/// Distribute a priced line's finalized quantity across the member
/// requests that were aggregated into it
///
/// When the supplier-negotiated total differs from the sum of the member
/// quantities, each member is scaled proportionally and the rounding
/// remainder lands on the last member, so the distributed quantities sum
/// to the priced total exactly.
///
/// Non-final shares round toward zero. Rounding to nearest could push the
/// running assignment past the priced total and hand the last member a
/// zero or negative quantity; truncation keeps every non-final share at or
/// below its exact proportion, so the last member always receives at least
/// its own exact share.
pub fn distribute_quantity(current: &[Decimal], priced_total: Decimal) -> Vec<Decimal> {
    let requested_total: Decimal = current.iter().copied().sum();
    if current.is_empty() || requested_total == priced_total {
        return current.to_vec();
    }

    let mut distributed = Vec::with_capacity(current.len());
    let mut assigned = Decimal::ZERO;
    for (idx, quantity) in current.iter().enumerate() {
        if idx + 1 == current.len() {
            distributed.push(priced_total - assigned);
        } else {
            let share = if requested_total.is_zero() {
                Decimal::ZERO
            } else {
                (*quantity * priced_total / requested_total)
                    .round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero)
            };
            assigned += share;
            distributed.push(share);
        }
    }
    distributed
}

/// Outcome planned for a physical receipt against a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptPlan {
    /// Delivered quantity covers (or exceeds) the request; the request is
    /// marked received with `final_quantity` recording what arrived.
    Full { final_quantity: Decimal },
    /// Delivery fell short; the request keeps the shortfall and re-enters
    /// the approved pool, while a sibling records the received portion.
    Partial {
        received: Decimal,
        remainder: Decimal,
    },
}

/// Plan the split for a receipt of `received` against a request for
/// `requested`
///
/// For a partial receipt the two resulting quantities always sum to the
/// original request quantity.
pub fn plan_receipt(requested: Decimal, received: Decimal) -> ReceiptPlan {
    if received >= requested {
        ReceiptPlan::Full {
            final_quantity: received,
        }
    } else {
        ReceiptPlan::Partial {
            received,
            remainder: requested - received,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn line(name: &str, qty: i64) -> RequestLine {
        RequestLine {
            material_name: name.to_string(),
            unit: "kg".to_string(),
            quantity: dec(qty),
        }
    }

    #[test]
    fn test_aggregate_sums_identical_materials() {
        let items = aggregate_order_items(&[
            line("Cemento", 100),
            line("Arena", 50),
            line("Cemento", 30),
        ]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].material_name, "Cemento");
        assert_eq!(items[0].quantity, dec(130));
        assert_eq!(items[1].material_name, "Arena");
        assert_eq!(items[1].quantity, dec(50));
    }

    #[test]
    fn test_aggregate_empty() {
        assert!(aggregate_order_items(&[]).is_empty());
    }

    #[test]
    fn test_distribute_unchanged_when_totals_match() {
        let current = vec![dec(100), dec(30)];
        assert_eq!(distribute_quantity(&current, dec(130)), current);
    }

    #[test]
    fn test_distribute_conserves_total() {
        let current = vec![dec(100), dec(30), dec(70)];
        let distributed = distribute_quantity(&current, dec(150));
        let total: Decimal = distributed.iter().copied().sum();
        assert_eq!(total, dec(150));
    }

    #[test]
    fn test_distribute_single_member_takes_all() {
        assert_eq!(distribute_quantity(&[dec(100)], dec(80)), vec![dec(80)]);
    }

    #[test]
    fn test_distribute_last_member_stays_positive() {
        // Seven members of 1.000 plus a tail of 0.001 against a total of
        // 6.999: nearest-rounding the large shares would overshoot the
        // total and drive the tail negative.
        let mut current = vec![dec(1); 7];
        current.push(Decimal::new(1, 3));
        let distributed = distribute_quantity(&current, Decimal::new(6999, 3));

        let total: Decimal = distributed.iter().copied().sum();
        assert_eq!(total, Decimal::new(6999, 3));
        assert!(
            *distributed.last().unwrap() > Decimal::ZERO,
            "last share must stay positive, got {:?}",
            distributed
        );
        for share in &distributed[..distributed.len() - 1] {
            assert!(*share >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_plan_receipt_exact() {
        assert_eq!(
            plan_receipt(dec(100), dec(100)),
            ReceiptPlan::Full {
                final_quantity: dec(100)
            }
        );
    }

    #[test]
    fn test_plan_receipt_over() {
        assert_eq!(
            plan_receipt(dec(100), dec(120)),
            ReceiptPlan::Full {
                final_quantity: dec(120)
            }
        );
    }

    #[test]
    fn test_plan_receipt_partial_conserves_quantity() {
        match plan_receipt(dec(100), dec(60)) {
            ReceiptPlan::Partial {
                received,
                remainder,
            } => {
                assert_eq!(received, dec(60));
                assert_eq!(remainder, dec(40));
                assert_eq!(received + remainder, dec(100));
            }
            other => panic!("expected partial plan, got {:?}", other),
        }
    }
}
