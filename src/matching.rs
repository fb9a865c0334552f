//! Matching algorithm.
//!
//! Planning is read-only: it walks the opposite side of the book in priority order and
//! works out every match an incoming order would make, without touching any state.
//! The engine settles the plan as one batch and only then applies it to the book, so a
//! rejected or killed order never leaves a trace.

use crate::order::{Order, OrderType, PriorityKey};
use crate::types::{mul_div_ceil, mul_div_floor, AccountId, OrderId};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// One planned match against a resting order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchStep {
    pub maker_key: PriorityKey,
    pub maker_order_id: OrderId,
    pub maker_account_id: AccountId,
    /// Taker source handed to the maker.
    pub taker_gives: Decimal,
    /// Maker source handed to the taker.
    pub maker_gives: Decimal,
    pub maker_remaining_after: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchPlan {
    pub steps: Vec<MatchStep>,
    pub source_remaining: Decimal,
}

impl MatchPlan {
    pub fn is_complete(&self) -> bool {
        self.source_remaining.is_zero()
    }

    pub fn source_matched(&self) -> Decimal {
        self.steps.iter().map(|s| s.taker_gives).sum()
    }

    pub fn destination_matched(&self) -> Decimal {
        self.steps.iter().map(|s| s.maker_gives).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Arithmetic overflow while matching order {0:?}")]
pub struct MatchOverflow(pub OrderId);

/// Whether `taker` may trade with `maker` at the maker's price.
///
/// The taker accepts `taker.dst / taker.src` of its destination per unit of source
/// at worst; the maker gives `maker.src / maker.dst` of it. They cross when
/// `taker.dst * maker.dst <= taker.src * maker.src`.
pub fn crosses(taker: &Order, maker: &Order) -> bool {
    match taker.order_type {
        OrderType::Market => true,
        OrderType::Limit => {
            taker.destination_amount * maker.destination_amount
                <= taker.source_amount * maker.source_amount
        }
    }
}

/// Works out the matches `taker` would make against `resting`, the opposite
/// side of its instrument's book.
pub fn plan_match(
    resting: &BTreeMap<PriorityKey, Order>,
    taker: &Order,
) -> Result<MatchPlan, MatchOverflow> {
    let overflow = || MatchOverflow(taker.id);
    let mut plan = MatchPlan {
        steps: Vec::new(),
        source_remaining: taker.source_remaining,
    };

    for (key, maker) in resting {
        if plan.source_remaining.is_zero() || !crosses(taker, maker) {
            break;
        }

        // how much maker source the taker's remaining source buys at the maker's price
        let affordable = mul_div_floor(plan.source_remaining, maker.source_amount, maker.destination_amount)
            .ok_or_else(overflow)?;
        let maker_gives = affordable.min(maker.source_remaining);
        if maker_gives.is_zero() {
            break;
        }

        // round the payment up so the maker never sells below its own price
        let taker_gives = mul_div_ceil(maker_gives, maker.destination_amount, maker.source_amount)
            .ok_or_else(overflow)?;
        debug_assert!(taker_gives <= plan.source_remaining);

        // rounding up must not push a limit taker past its own price. a maker whose
        // whole remainder is too dear is skipped; later makers may still cross.
        if taker.order_type == OrderType::Limit
            && maker_gives * taker.source_amount < taker_gives * taker.destination_amount
        {
            if maker_gives == maker.source_remaining {
                continue;
            }
            break;
        }

        let maker_remaining_after = maker.source_remaining - maker_gives;
        plan.source_remaining -= taker_gives;
        plan.steps.push(MatchStep {
            maker_key: *key,
            maker_order_id: maker.id,
            maker_account_id: maker.owner,
            taker_gives,
            maker_gives,
            maker_remaining_after,
        });

        // a maker left with quantity means the taker ran out: stop before a
        // later maker could jump the queue
        if !maker_remaining_after.is_zero() {
            break;
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::order::TimeInForce;
    use crate::types::{ClientOrderId, Denom, Timestamp};
    use rust_decimal_macros::dec;

    fn instrument(source: &str, destination: &str) -> Instrument {
        Instrument::new(Denom::new(source).unwrap(), Denom::new(destination).unwrap()).unwrap()
    }

    fn order(id: u64, instrument: Instrument, source: Decimal, destination: Decimal) -> Order {
        Order::new(
            OrderId(id),
            AccountId(id),
            ClientOrderId::new(format!("c{id}")),
            instrument,
            OrderType::Limit,
            TimeInForce::GoodTilCancel,
            source,
            destination,
            Timestamp::from_millis(0),
        )
    }

    fn book(orders: Vec<Order>) -> BTreeMap<PriorityKey, Order> {
        orders.into_iter().map(|o| (o.priority_key(), o)).collect()
    }

    #[test]
    fn proportional_match_against_resting_order() {
        // resting: sell 100 eur for 120 usd. incoming: sell 60 usd for 50 eur.
        let resting = book(vec![order(1, instrument("eur", "usd"), dec!(100), dec!(120))]);
        let taker = order(2, instrument("usd", "eur"), dec!(60), dec!(50));

        let plan = plan_match(&resting, &taker).unwrap();
        assert!(plan.is_complete());
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].taker_gives, dec!(60));
        assert_eq!(plan.steps[0].maker_gives, dec!(50));
        assert_eq!(plan.steps[0].maker_remaining_after, dec!(50));
    }

    #[test]
    fn no_cross_no_steps() {
        let resting = book(vec![order(1, instrument("eur", "usd"), dec!(100), dec!(120))]);
        // wants 1 eur per usd, the maker only offers 1/1.2
        let taker = order(2, instrument("usd", "eur"), dec!(60), dec!(60));

        assert!(!crosses(&taker, resting.values().next().unwrap()));
        let plan = plan_match(&resting, &taker).unwrap();
        assert!(plan.steps.is_empty());
        assert_eq!(plan.source_remaining, dec!(60));
    }

    #[test]
    fn walks_levels_best_first() {
        let resting = book(vec![
            order(1, instrument("eur", "usd"), dec!(10), dec!(13)),
            order(2, instrument("eur", "usd"), dec!(10), dec!(12)),
        ]);
        let taker = order(3, instrument("usd", "eur"), dec!(25), dec!(15));

        let plan = plan_match(&resting, &taker).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].maker_order_id, OrderId(2));
        assert_eq!(plan.steps[0].maker_gives, dec!(10));
        assert_eq!(plan.steps[0].taker_gives, dec!(12));
        // 13 usd left buys floor(13 * 10 / 13) = 10 eur from the second maker
        assert_eq!(plan.steps[1].maker_order_id, OrderId(1));
        assert_eq!(plan.steps[1].maker_gives, dec!(10));
        assert_eq!(plan.source_remaining, dec!(0));
        assert_eq!(plan.destination_matched(), dec!(20));
        assert_eq!(plan.source_matched(), dec!(25));
    }

    #[test]
    fn partial_maker_stops_the_walk() {
        let resting = book(vec![
            order(1, instrument("eur", "usd"), dec!(100), dec!(120)),
            order(2, instrument("eur", "usd"), dec!(100), dec!(120)),
        ]);
        let taker = order(3, instrument("usd", "eur"), dec!(30), dec!(20));

        let plan = plan_match(&resting, &taker).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].maker_order_id, OrderId(1));
        assert_eq!(plan.steps[0].maker_gives, dec!(25));
    }

    #[test]
    fn dear_remainder_does_not_block_the_queue() {
        // first maker sold 2 of 3 eur, its last eur would cost the taker 4 usd
        let mut worn = order(1, instrument("eur", "usd"), dec!(3), dec!(10));
        worn.fill(dec!(2), dec!(7));
        let fresh = order(2, instrument("eur", "usd"), dec!(3), dec!(10));
        let resting = book(vec![worn, fresh]);
        let taker = order(3, instrument("usd", "eur"), dec!(10), dec!(3));

        let plan = plan_match(&resting, &taker).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].maker_order_id, OrderId(2));
        assert_eq!(plan.steps[0].maker_gives, dec!(3));
        assert_eq!(plan.steps[0].taker_gives, dec!(10));
        assert!(plan.is_complete());
    }

    #[test]
    fn market_taker_ignores_its_price() {
        let resting = book(vec![order(1, instrument("eur", "usd"), dec!(100), dec!(200))]);
        let mut taker = order(2, instrument("usd", "eur"), dec!(50), dec!(50));
        taker.order_type = OrderType::Market;

        let plan = plan_match(&resting, &taker).unwrap();
        assert_eq!(plan.steps[0].maker_gives, dec!(25));
        assert!(plan.is_complete());
    }

    #[test]
    fn dust_that_buys_nothing_is_left() {
        let resting = book(vec![order(1, instrument("eur", "usd"), dec!(10), dec!(30))]);
        let mut taker = order(2, instrument("usd", "eur"), dec!(7), dec!(1));
        taker.order_type = OrderType::Market;

        let plan = plan_match(&resting, &taker).unwrap();
        // 7 usd buys 2 eur at 3 usd each, 1 usd cannot buy anything
        assert_eq!(plan.steps[0].maker_gives, dec!(2));
        assert_eq!(plan.steps[0].taker_gives, dec!(6));
        assert_eq!(plan.source_remaining, dec!(1));
        assert!(!plan.is_complete());
    }
}
