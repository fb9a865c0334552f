//! End-to-end scenarios through the public engine surface.

use fx_market_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ALICE: AccountId = AccountId(1);
const BOB: AccountId = AccountId(2);
const CAROL: AccountId = AccountId(3);

fn denom(name: &str) -> Denom {
    Denom::new(name).unwrap()
}

fn engine() -> Engine {
    let config = MarketConfig::from_toml_str(
        r#"
        denominations = ["eur", "usd", "chf"]

        [engine]
        max_events = 1000
        "#,
    )
    .unwrap();
    let mut engine = config.build_engine().unwrap();
    for account in [ALICE, BOB, CAROL] {
        for d in ["eur", "usd", "chf"] {
            engine.bank_mut().mint(account, &denom(d), dec!(1000)).unwrap();
        }
    }
    engine
}

fn cid(text: &str) -> ClientOrderId {
    ClientOrderId::from(text)
}

#[test]
fn scenario_1_single_resting_order() {
    let mut engine = engine();
    let result = engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();

    assert!(result.is_posted);
    let book = engine.instrument_orders("eur", "usd").unwrap();
    assert_eq!(book.len(), 1);
    assert_eq!(book[0].source_remaining, dec!(100));
    assert!(engine.instrument_orders("usd", "eur").unwrap().is_empty());
}

#[test]
fn scenario_2_crossing_order_fills_proportionally() {
    let mut engine = engine();
    let a = engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();
    let b = engine
        .place_order(OrderRequest::limit(BOB, "B", dec!(60), "usd", dec!(50), "eur"))
        .unwrap();

    assert_eq!(b.status, OrderStatus::Filled);
    assert_eq!(b.source_filled, dec!(60));
    assert_eq!(b.destination_filled, dec!(50));
    assert!(engine.order(b.order_id).is_none());
    assert!(engine.order_by_client_id(BOB, &cid("B")).is_none());

    let a_after = engine.order(a.order_id).unwrap();
    assert_eq!(a_after.source_remaining, dec!(50));
    assert_eq!(a_after.source_filled, dec!(50));
    assert_eq!(a_after.destination_filled, dec!(60));

    let fill = &b.fills[0];
    assert_eq!(fill.maker_account_id, ALICE);
    assert_eq!(fill.maker_remaining, dec!(50));
    assert_eq!(fill.maker_status, OrderStatus::PartiallyFilled);
}

#[test]
fn scenario_3_fill_or_kill_beyond_liquidity() {
    let mut engine = engine();
    engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();
    let bob_usd = engine.bank().balance(BOB, &denom("usd"));
    let bob_eur = engine.bank().balance(BOB, &denom("eur"));

    let result = engine
        .place_order(
            OrderRequest::limit(BOB, "F", dec!(180), "usd", dec!(150), "eur")
                .with_time_in_force(TimeInForce::FillOrKill),
        )
        .unwrap();

    assert_eq!(result.status, OrderStatus::Killed);
    assert!(result.fills.is_empty());
    assert_eq!(engine.bank().balance(BOB, &denom("usd")), bob_usd);
    assert_eq!(engine.bank().balance(BOB, &denom("eur")), bob_eur);
    assert_eq!(engine.instrument_orders("eur", "usd").unwrap()[0].source_remaining, dec!(100));
    assert!(matches!(
        engine.events().last().map(|e| &e.payload),
        Some(EventPayload::OrderKilled(_))
    ));
}

#[test]
fn scenario_4_duplicate_client_order_id() {
    let mut engine = engine();
    engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();

    let duplicate = engine.place_order(OrderRequest::limit(ALICE, "A", dec!(10), "chf", dec!(10), "usd"));
    assert!(matches!(duplicate, Err(EngineError::NonUniqueClientOrderId(owner, _)) if owner == ALICE));
    assert_eq!(engine.bank().locked(ALICE, &denom("chf")), dec!(0));
}

#[test]
fn scenario_5_cancel_replace_other_instrument() {
    let mut engine = engine();
    let original = engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();
    let before = engine.order(original.order_id).unwrap().clone();

    let result = engine.cancel_replace_order(
        &cid("A"),
        OrderRequest::limit(ALICE, "A2", dec!(100), "usd", dec!(80), "eur"),
    );

    assert!(matches!(result, Err(EngineError::OrderInstrumentChanged { .. })));
    assert_eq!(engine.order(original.order_id), Some(&before));
    assert!(engine.order_by_client_id(ALICE, &cid("A2")).is_none());
}

#[test]
fn multi_level_sweep_with_time_priority() {
    let mut engine = engine();
    engine
        .place_order(OrderRequest::limit(ALICE, "a1", dec!(10), "eur", dec!(13), "usd"))
        .unwrap();
    let first_at_best = engine
        .place_order(OrderRequest::limit(BOB, "b1", dec!(10), "eur", dec!(12), "usd"))
        .unwrap();
    let second_at_best = engine
        .place_order(OrderRequest::limit(CAROL, "c1", dec!(20), "eur", dec!(24), "usd"))
        .unwrap();

    let result = engine
        .place_order(OrderRequest::limit(ALICE, "sweep", dec!(36), "usd", dec!(30), "eur"))
        .unwrap();

    let makers: Vec<OrderId> = result.fills.iter().map(|f| f.maker_order_id).collect();
    assert_eq!(makers, vec![first_at_best.order_id, second_at_best.order_id]);
    // the 1.3 level sits above the taker's limit
    assert_eq!(result.destination_filled, dec!(30));
    assert_eq!(result.source_filled, dec!(36));
    assert_eq!(result.status, OrderStatus::Filled);
}

#[test]
fn dear_remainder_is_skipped_for_the_next_maker() {
    let mut engine = engine();
    let worn = engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(3), "eur", dec!(10), "usd"))
        .unwrap();
    engine
        .place_order(OrderRequest::limit(BOB, "B", dec!(7), "usd", dec!(2), "eur"))
        .unwrap();
    assert_eq!(engine.order(worn.order_id).unwrap().source_remaining, dec!(1));
    let fresh = engine
        .place_order(OrderRequest::limit(CAROL, "C", dec!(3), "eur", dec!(10), "usd"))
        .unwrap();

    let taker = engine
        .place_order(
            OrderRequest::limit(BOB, "D", dec!(10), "usd", dec!(3), "eur")
                .with_time_in_force(TimeInForce::FillOrKill),
        )
        .unwrap();

    assert_eq!(taker.status, OrderStatus::Filled);
    let makers: Vec<OrderId> = taker.fills.iter().map(|f| f.maker_order_id).collect();
    assert_eq!(makers, vec![fresh.order_id]);
    assert!(engine.order(fresh.order_id).is_none());
    assert_eq!(engine.order(worn.order_id).unwrap().source_remaining, dec!(1));
    assert!(engine.instrument_orders("usd", "eur").unwrap().is_empty());
}

#[test]
fn partially_filled_taker_rests_remainder() {
    let mut engine = engine();
    engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(10), "eur", dec!(12), "usd"))
        .unwrap();
    let taker = engine
        .place_order(OrderRequest::limit(BOB, "B", dec!(60), "usd", dec!(50), "eur"))
        .unwrap();

    assert_eq!(taker.status, OrderStatus::PartiallyFilled);
    assert!(taker.is_posted);
    let resting = engine.order(taker.order_id).unwrap();
    assert_eq!(resting.source_remaining, dec!(48));
    // keeps its original price for priority
    assert_eq!(resting.price().value(), dec!(50) / dec!(60));
    assert_eq!(engine.bank().locked(BOB, &denom("usd")), dec!(48));
}

#[test]
fn cross_pair_books_are_independent() {
    let mut engine = engine();
    engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();
    let chf = engine
        .place_order(OrderRequest::limit(BOB, "B", dec!(60), "usd", dec!(50), "chf"))
        .unwrap();

    assert!(chf.fills.is_empty());
    assert!(chf.is_posted);
    let summaries = engine.instruments();
    assert_eq!(summaries.len(), 6);
    let resting: usize = summaries.iter().map(|s| s.resting_orders).sum();
    assert_eq!(resting, 2);
}

#[test]
fn api_round_trip_through_json() {
    let mut engine = engine();
    let commands = [
        r#"{"type":"place_limit","owner":1,"client_order_id":"A","source":"eur","source_amount":"100","destination":"usd","destination_amount":"120"}"#,
        r#"{"type":"place_limit","owner":2,"client_order_id":"B","source":"usd","source_amount":"60","destination":"eur","destination_amount":"50","time_in_force":"fillorkill"}"#,
        r#"{"type":"cancel","owner":1,"client_order_id":"A"}"#,
        r#"{"type":"cancel","owner":1,"client_order_id":"A"}"#,
    ];

    let responses: Vec<ApiResponse> = commands
        .iter()
        .map(|text| engine.apply(serde_json::from_str(text).unwrap()))
        .collect();

    assert!(matches!(&responses[0], ApiResponse::Order(r) if r.is_posted));
    assert!(matches!(&responses[1], ApiResponse::Order(r) if r.status == OrderStatus::Filled));
    assert!(matches!(&responses[2], ApiResponse::Cancelled(c) if c.source_released == dec!(50)));
    assert_eq!(responses[3].error_code(), Some(ErrorCode::ClientOrderIdNotFound));

    let json = serde_json::to_string(&responses[3]).unwrap();
    let back: ApiResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(back, responses[3]);
}

/// Ledger that refuses to settle on demand.
#[derive(Debug, Default)]
struct FlakyBank {
    inner: InMemoryBank,
    refuse_settlement: bool,
}

impl BalanceGateway for FlakyBank {
    fn balance(&self, account_id: AccountId, denom: &Denom) -> Balance {
        self.inner.balance(account_id, denom)
    }

    fn lock(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        self.inner.lock(account_id, denom, amount)
    }

    fn release(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        self.inner.release(account_id, denom, amount)
    }

    fn transfer(&mut self, from: AccountId, to: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        self.inner.transfer(from, to, denom, amount)
    }

    fn mint(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        self.inner.mint(account_id, denom, amount)
    }

    fn burn(&mut self, account_id: AccountId, denom: &Denom, amount: Decimal) -> Result<(), BankError> {
        self.inner.burn(account_id, denom, amount)
    }

    fn settle(&mut self, batch: &SettlementBatch) -> Result<(), BankError> {
        if self.refuse_settlement {
            return Err(BankError::InvalidAmount(Decimal::ZERO));
        }
        self.inner.settle(batch)
    }
}

#[test]
fn refused_settlement_rolls_back_the_command() {
    let mut engine = Engine::with_gateway(EngineConfig::default(), FlakyBank::default()).unwrap();
    engine.register_denom("eur").unwrap();
    engine.register_denom("usd").unwrap();
    engine.bank_mut().mint(ALICE, &denom("eur"), dec!(100)).unwrap();
    engine.bank_mut().mint(BOB, &denom("usd"), dec!(100)).unwrap();

    let maker = engine
        .place_order(OrderRequest::limit(ALICE, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();
    engine.bank_mut().refuse_settlement = true;

    let result = engine.place_order(OrderRequest::limit(BOB, "B", dec!(60), "usd", dec!(50), "eur"));
    assert!(matches!(result, Err(EngineError::Bank(_))));

    assert_eq!(engine.bank().balance(BOB, &denom("usd")).spendable, dec!(100));
    assert_eq!(engine.bank().balance(BOB, &denom("usd")).locked, dec!(0));
    assert_eq!(engine.order(maker.order_id).unwrap().source_remaining, dec!(100));
    assert!(engine.order_by_client_id(BOB, &cid("B")).is_none());
    assert!(engine.verify_consistency().is_ok());
}
