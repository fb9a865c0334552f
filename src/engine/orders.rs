//! Order placement, cancellation and replacement.

use super::core::{halt, Engine};
use super::results::{CancelResult, EngineError, OrderResult};
use crate::bank::{BalanceGateway, BankError};
use crate::events::{
    CancelReason, EventPayload, FillEvent, OrderAcceptedEvent, OrderCancelledEvent, OrderKilledEvent,
    OrderReplacedEvent,
};
use crate::index::OrderHandle;
use crate::instrument::{Instrument, InstrumentError};
use crate::matching::{plan_match, MatchPlan};
use crate::order::{Fill, Order, OrderStatus, OrderType, TimeInForce};
use crate::settlement::SettlementBatch;
use crate::types::{is_positive_whole, AccountId, ClientOrderId, Denom, OrderId, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A new order as submitted. Denominations arrive as text and are checked against
/// the registry on placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub owner: AccountId,
    pub client_order_id: ClientOrderId,
    pub source: String,
    pub destination: String,
    pub order_type: OrderType,
    #[serde(default)]
    pub time_in_force: TimeInForce,
    pub source_amount: Decimal,
    pub destination_amount: Decimal,
}

impl OrderRequest {
    /// Offer `source_amount` of `source` for at least `destination_amount` of `destination`.
    pub fn limit(
        owner: AccountId,
        client_order_id: impl Into<ClientOrderId>,
        source_amount: Decimal,
        source: &str,
        destination_amount: Decimal,
        destination: &str,
    ) -> Self {
        Self {
            owner,
            client_order_id: client_order_id.into(),
            source: source.to_string(),
            destination: destination.to_string(),
            order_type: OrderType::Limit,
            time_in_force: TimeInForce::GoodTilCancel,
            source_amount,
            destination_amount,
        }
    }

    /// Same shape as a limit order; the amounts only size it and price a rested residual.
    pub fn market(
        owner: AccountId,
        client_order_id: impl Into<ClientOrderId>,
        source_amount: Decimal,
        source: &str,
        destination_amount: Decimal,
        destination: &str,
    ) -> Self {
        Self {
            order_type: OrderType::Market,
            ..Self::limit(owner, client_order_id, source_amount, source, destination_amount, destination)
        }
    }

    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }
}

impl<B: BalanceGateway> Engine<B> {
    fn next_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    /// Place an order.
    ///
    /// Rejections leave no trace. A fill-or-kill order that cannot complete is not an
    /// error: it comes back with status `Killed` and no fills.
    pub fn place_order(&mut self, request: OrderRequest) -> Result<OrderResult, EngineError> {
        let owner = request.owner;
        let client_order_id = request.client_order_id.clone();
        let result = self.execute_place(request);
        if let Err(err) = &result {
            warn!(%owner, %client_order_id, error = %err, "order rejected");
        }
        result
    }

    /// Cancel a live order and release its unmatched source.
    pub fn cancel_order(
        &mut self,
        owner: AccountId,
        client_order_id: &ClientOrderId,
    ) -> Result<CancelResult, EngineError> {
        let order_id = match self.index.by_client_order_id(owner, client_order_id) {
            Some(handle) => handle.order_id(),
            None => {
                warn!(%owner, %client_order_id, "cancel of unknown order");
                return Err(EngineError::ClientOrderIdNotFound(owner, client_order_id.clone()));
            }
        };

        let order = self.detach_order(order_id)?;
        let source_released = order.source_remaining;

        self.emit_event(EventPayload::OrderCancelled(OrderCancelledEvent {
            order_id,
            account_id: owner,
            client_order_id: order.client_order_id.clone(),
            source_released,
            reason: CancelReason::UserRequested,
        }));
        debug!(%order_id, %owner, released = %source_released, "order cancelled");

        Ok(CancelResult { order, source_released })
    }

    /// Replace a live order with a new one on the same instrument.
    ///
    /// The prior order is withdrawn and the replacement placed as a fresh order. If the
    /// replacement is rejected or killed, the prior order goes back exactly where it was.
    pub fn cancel_replace_order(
        &mut self,
        prior_client_order_id: &ClientOrderId,
        request: OrderRequest,
    ) -> Result<OrderResult, EngineError> {
        let owner = request.owner;
        let result = self.execute_replace(prior_client_order_id, request);
        if let Err(err) = &result {
            warn!(%owner, prior = %prior_client_order_id, error = %err, "cancel-replace rejected");
        }
        result
    }

    fn execute_replace(
        &mut self,
        prior_client_order_id: &ClientOrderId,
        request: OrderRequest,
    ) -> Result<OrderResult, EngineError> {
        let owner = request.owner;
        let (prior_id, prior_instrument) = match self.index.by_client_order_id(owner, prior_client_order_id) {
            Some(handle) => (handle.order_id(), handle.instrument.instrument(handle.side)),
            None => {
                return Err(EngineError::ClientOrderIdNotFound(owner, prior_client_order_id.clone()));
            }
        };

        let requested = match (Denom::new(&request.source), Denom::new(&request.destination)) {
            (Some(source), Some(destination)) => Instrument { source, destination },
            _ => {
                return Err(InstrumentError::InvalidInstrument {
                    source_denom: request.source.clone(),
                    destination_denom: request.destination.clone(),
                }
                .into())
            }
        };
        if requested != prior_instrument {
            return Err(EngineError::OrderInstrumentChanged {
                prior: prior_instrument,
                requested,
            });
        }

        let prior = self.detach_order(prior_id)?;

        match self.execute_place(request) {
            Ok(result) if !result.is_killed() => {
                self.emit_event(EventPayload::OrderCancelled(OrderCancelledEvent {
                    order_id: prior.id,
                    account_id: owner,
                    client_order_id: prior.client_order_id.clone(),
                    source_released: prior.source_remaining,
                    reason: CancelReason::Replaced,
                }));
                self.emit_event(EventPayload::OrderReplaced(OrderReplacedEvent {
                    account_id: owner,
                    prior_order_id: prior.id,
                    new_order_id: result.order_id,
                }));
                debug!(prior = %prior.id, replacement = %result.order_id, "order replaced");
                Ok(result)
            }
            outcome => {
                self.reinstate(prior);
                outcome
            }
        }
    }

    /// Shape checks, then client order id uniqueness. Nothing is touched.
    fn validate_request(&self, request: &OrderRequest) -> Result<Instrument, EngineError> {
        let instrument = self.registry.validate(&request.source, &request.destination)?;

        let limit = self.config.max_order_amount;
        for amount in [request.source_amount, request.destination_amount] {
            if !is_positive_whole(amount) || amount > limit {
                return Err(EngineError::InvalidOrder(format!(
                    "amount {amount} must be a positive whole number no larger than {limit}"
                )));
            }
        }

        if !request
            .client_order_id
            .is_well_formed(self.config.max_client_order_id_len)
        {
            return Err(EngineError::InvalidClientOrderId(request.client_order_id.clone()));
        }

        if request.order_type == OrderType::Market
            && request.time_in_force == TimeInForce::GoodTilCancel
            && self.config.reject_market_gtc_on_empty_book
            && self.opposite_is_empty(&instrument)
        {
            return Err(EngineError::InvalidOrder(format!(
                "market order on {instrument} has nothing to cross and no price to rest at"
            )));
        }

        if self
            .index
            .contains_client_order_id(request.owner, &request.client_order_id)
        {
            return Err(EngineError::NonUniqueClientOrderId(
                request.owner,
                request.client_order_id.clone(),
            ));
        }

        Ok(instrument)
    }

    fn opposite_is_empty(&self, instrument: &Instrument) -> bool {
        self.registry
            .resolve_key(&instrument.key())
            .map_or(true, |book| book.side(instrument.side().opposite()).is_empty())
    }

    fn plan_for(&self, order: &Order) -> Result<MatchPlan, EngineError> {
        match self.registry.resolve_key(&order.instrument.key()) {
            Some(book) => Ok(plan_match(book.side(order.instrument.side().opposite()), order)?),
            None => Ok(MatchPlan {
                steps: Vec::new(),
                source_remaining: order.source_remaining,
            }),
        }
    }

    fn execute_place(&mut self, request: OrderRequest) -> Result<OrderResult, EngineError> {
        let instrument = self.validate_request(&request)?;
        let owner = request.owner;

        self.bank
            .lock(owner, &instrument.source, request.source_amount)
            .map_err(|err| match err {
                BankError::InsufficientBalance {
                    account_id,
                    requested,
                    available,
                    ..
                } => EngineError::InsufficientBalance {
                    account_id,
                    required: requested,
                    available,
                },
                other => EngineError::Bank(other),
            })?;

        // ids are handed out only once the order is funded
        let order_id = self.next_order_id();
        let mut order = Order::new(
            order_id,
            owner,
            request.client_order_id,
            instrument,
            request.order_type,
            request.time_in_force,
            request.source_amount,
            request.destination_amount,
            self.current_time,
        );

        let plan = match self.plan_for(&order) {
            Ok(plan) => plan,
            Err(err) => {
                self.release_escrow(owner, &order.instrument.source, order.source_amount);
                return Err(err);
            }
        };

        if order.time_in_force == TimeInForce::FillOrKill && !plan.is_complete() {
            self.release_escrow(owner, &order.instrument.source, order.source_amount);
            self.emit_event(EventPayload::OrderKilled(OrderKilledEvent {
                order_id,
                account_id: owner,
                client_order_id: order.client_order_id.clone(),
                source_amount: order.source_amount,
            }));
            debug!(%order_id, %owner, matchable = %plan.source_matched(), "fill-or-kill order killed");

            return Ok(OrderResult {
                order_id,
                status: OrderStatus::Killed,
                source_filled: Decimal::ZERO,
                destination_filled: Decimal::ZERO,
                source_remaining: order.source_amount,
                average_price: None,
                is_posted: false,
                fills: Vec::new(),
            });
        }

        let rests = !plan.is_complete() && order.time_in_force == TimeInForce::GoodTilCancel;
        let unfilled = if rests { Decimal::ZERO } else { plan.source_remaining };

        let mut batch = SettlementBatch::new();
        for step in &plan.steps {
            batch.transfer(owner, step.maker_account_id, &order.instrument.source, step.taker_gives);
            batch.transfer(step.maker_account_id, owner, &order.instrument.destination, step.maker_gives);
        }
        if !unfilled.is_zero() {
            batch.release(owner, &order.instrument.source, unfilled);
        }
        if !batch.is_empty() {
            if let Err(err) = self.bank.settle(&batch) {
                self.release_escrow(owner, &order.instrument.source, order.source_amount);
                return Err(err.into());
            }
        }

        // funds have moved: from here on the book must follow
        self.emit_event(EventPayload::OrderAccepted(OrderAcceptedEvent {
            order_id,
            account_id: owner,
            client_order_id: order.client_order_id.clone(),
            instrument: order.instrument.clone(),
            order_type: order.order_type,
            time_in_force: order.time_in_force,
            source_amount: order.source_amount,
            destination_amount: order.destination_amount,
        }));

        let fills = self.apply_plan(&mut order, &plan);

        let status = if order.is_filled() {
            OrderStatus::Filled
        } else if rests {
            order.status()
        } else {
            OrderStatus::Cancelled
        };

        let result = OrderResult {
            order_id,
            status,
            source_filled: order.source_filled,
            destination_filled: order.destination_filled,
            source_remaining: order.source_remaining,
            average_price: order.average_price(),
            is_posted: rests,
            fills,
        };

        if rests {
            self.rest_order(order);
        } else if !unfilled.is_zero() {
            self.emit_event(EventPayload::OrderCancelled(OrderCancelledEvent {
                order_id,
                account_id: owner,
                client_order_id: order.client_order_id.clone(),
                source_released: unfilled,
                reason: CancelReason::Unfilled,
            }));
        }

        debug!(
            %order_id,
            %owner,
            fills = result.fills.len(),
            filled = %result.source_filled,
            remaining = %result.source_remaining,
            status = ?result.status,
            "order placed"
        );

        Ok(result)
    }

    /// Applies a settled plan to the taker and the makers it crossed.
    fn apply_plan(&mut self, taker: &mut Order, plan: &MatchPlan) -> Vec<Fill> {
        let key = taker.instrument.key();
        let taker_side = taker.instrument.side();
        let maker_side = taker_side.opposite();
        let mut fills = Vec::with_capacity(plan.steps.len());

        for step in &plan.steps {
            let Some(book) = self.registry.resolve_key_mut(&key) else {
                halt(format_args!("book {}/{} vanished while matching", key.first, key.second));
            };
            let Some(maker) = book.get_mut(maker_side, &step.maker_key) else {
                halt(format_args!("maker {} missing from its book", step.maker_order_id));
            };

            maker.fill(step.maker_gives, step.taker_gives);
            let maker_status = maker.status();
            let maker_remaining = maker.source_remaining;
            let maker_filled = maker.is_filled();

            book.record_trade(taker_side, step.taker_gives, step.maker_gives, self.current_time);
            if maker_filled {
                book.remove(maker_side, &step.maker_key);
                if self.index.remove(step.maker_order_id).is_none() {
                    halt(format_args!("filled maker {} was not indexed", step.maker_order_id));
                }
            }

            taker.fill(step.taker_gives, step.maker_gives);
            let price = Price::new_unchecked(step.maker_gives / step.taker_gives);

            let fill = Fill {
                instrument: taker.instrument.clone(),
                maker_order_id: step.maker_order_id,
                maker_account_id: step.maker_account_id,
                taker_order_id: taker.id,
                taker_account_id: taker.owner,
                source_amount: step.taker_gives,
                destination_amount: step.maker_gives,
                price,
                maker_remaining,
                maker_status,
            };

            self.emit_event(EventPayload::Fill(FillEvent {
                instrument: taker.instrument.clone(),
                order_id: taker.id,
                account_id: taker.owner,
                counterparty: step.maker_account_id,
                source_amount: step.taker_gives,
                destination_amount: step.maker_gives,
                price,
                source_remaining: taker.source_remaining,
                status: taker.status(),
                is_maker: false,
            }));
            self.emit_event(EventPayload::Fill(FillEvent {
                instrument: taker.instrument.reversed(),
                order_id: step.maker_order_id,
                account_id: step.maker_account_id,
                counterparty: taker.owner,
                source_amount: step.maker_gives,
                destination_amount: step.taker_gives,
                price: Price::new_unchecked(step.taker_gives / step.maker_gives),
                source_remaining: maker_remaining,
                status: maker_status,
                is_maker: true,
            }));
            debug!(
                taker = %taker.id,
                maker = %step.maker_order_id,
                paid = %step.taker_gives,
                received = %step.maker_gives,
                "fill"
            );

            fills.push(fill);
        }

        fills
    }

    /// Puts an order on its book and in the index, together.
    fn rest_order(&mut self, order: Order) {
        let order_id = order.id;
        let owner = order.owner;
        let client_order_id = order.client_order_id.clone();
        let side = order.instrument.side();
        let instrument = order.instrument.clone();

        let book = match self.registry.ensure(&instrument) {
            Ok(book) => book,
            Err(err) => halt(format_args!("cannot rest {order_id}: {err}")),
        };
        let key = book.insert(order);

        let handle = OrderHandle {
            instrument: instrument.key(),
            side,
            key,
            owner,
            client_order_id,
        };
        if let Err(err) = self.index.insert(handle) {
            halt(format_args!("cannot index {order_id}: {err}"));
        }
    }

    /// Takes a live order off its book and out of the index and releases its escrow.
    fn detach_order(&mut self, order_id: OrderId) -> Result<Order, EngineError> {
        let handle = self
            .index
            .remove(order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;

        let Some(book) = self.registry.resolve_key_mut(&handle.instrument) else {
            halt(format_args!("indexed order {order_id} has no book"));
        };
        let Some(order) = book.remove(handle.side, &handle.key) else {
            halt(format_args!("indexed order {order_id} is not on its book"));
        };

        if let Err(err) = self
            .bank
            .release(order.owner, &order.instrument.source, order.source_remaining)
        {
            self.rest_order(order);
            return Err(err.into());
        }

        Ok(order)
    }

    /// Undoes `detach_order`: same escrow, same book position.
    fn reinstate(&mut self, order: Order) {
        if let Err(err) = self
            .bank
            .lock(order.owner, &order.instrument.source, order.source_remaining)
        {
            halt(format_args!("cannot re-lock escrow of {}: {err}", order.id));
        }
        self.rest_order(order);
    }

    fn release_escrow(&mut self, owner: AccountId, denom: &Denom, amount: Decimal) {
        if let Err(err) = self.bank.release(owner, denom, amount) {
            halt(format_args!("cannot release escrow just locked for {owner}: {err}"));
        }
    }
}
