//! Token market simulation.
//!
//! Walks the matching engine through resting, crossing, fill-or-kill, duplicate
//! client ids, cancel-replace and a multi-level sweep. Book creation and rejected
//! commands show up in the log output alongside.

use fx_market_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn main() {
    tracing_subscriber::fmt::init();

    println!("Token Market Matching Simulation");
    println!("Multi-currency order books, price-time priority\n");

    scenario_1_resting_order();
    scenario_2_crossing_order();
    scenario_3_fill_or_kill();
    scenario_4_duplicate_client_id();
    scenario_5_cancel_replace();
    scenario_6_sweep();

    println!("\nAll simulations completed successfully.");
}

fn denom(name: &str) -> Denom {
    Denom::new(name).unwrap()
}

fn setup(accounts: &[AccountId]) -> Engine {
    let mut engine = MarketConfig::development().build_engine().unwrap();
    engine.set_time(Timestamp::from_millis(1_600_000_000_000));
    for &account in accounts {
        for name in ["eur", "usd", "chf"] {
            engine.bank_mut().mint(account, &denom(name), dec!(10000)).unwrap();
        }
    }
    engine
}

fn print_balances(engine: &Engine, account: AccountId, name: &str) {
    for d in ["eur", "usd"] {
        let balance = engine.bank().balance(account, &denom(d));
        println!(
            "    {} {}: spendable {}, locked {}",
            name, d, balance.spendable, balance.locked
        );
    }
}

/// One order on an empty book rests in full.
fn scenario_1_resting_order() {
    println!("Scenario 1: Resting Order\n");

    let alice = AccountId(1);
    let mut engine = setup(&[alice]);

    let result = engine
        .place_order(OrderRequest::limit(alice, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();

    println!("  Alice offers 100 EUR for 120 USD, posted: {}", result.is_posted);
    let order = engine.order(result.order_id).unwrap();
    println!("  Book holds order {} with {} EUR remaining", order.id, order.source_remaining);
    print_balances(&engine, alice, "Alice");
    println!();
}

/// A crossing order fills against the resting one at the resting price.
fn scenario_2_crossing_order() {
    println!("Scenario 2: Crossing Order\n");

    let alice = AccountId(1);
    let bob = AccountId(2);
    let mut engine = setup(&[alice, bob]);

    let resting = engine
        .place_order(OrderRequest::limit(alice, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();
    let taker = engine
        .place_order(OrderRequest::limit(bob, "B", dec!(60), "usd", dec!(50), "eur"))
        .unwrap();

    println!("  Bob offers 60 USD for 50 EUR");
    println!(
        "  Filled: {} USD for {} EUR at {} EUR/USD, status {:?}",
        taker.source_filled,
        taker.destination_filled,
        taker.average_price.unwrap(),
        taker.status
    );
    let remaining = engine.order(resting.order_id).unwrap().source_remaining;
    println!("  Alice's order has {} EUR left", remaining);
    print_balances(&engine, alice, "Alice");
    print_balances(&engine, bob, "Bob");
    println!();
}

/// Fill-or-kill larger than the book leaves everything as it was.
fn scenario_3_fill_or_kill() {
    println!("Scenario 3: Fill or Kill\n");

    let alice = AccountId(1);
    let bob = AccountId(2);
    let mut engine = setup(&[alice, bob]);

    engine
        .place_order(OrderRequest::limit(alice, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();

    let request = OrderRequest::limit(bob, "F", dec!(240), "usd", dec!(200), "eur")
        .with_time_in_force(TimeInForce::FillOrKill);
    let result = engine.place_order(request).unwrap();

    println!("  Bob wants 200 EUR, book offers 100");
    println!("  Status: {:?}, fills: {}", result.status, result.fills.len());
    println!("  Book still holds {} order(s)", engine.instrument_orders("eur", "usd").unwrap().len());
    print_balances(&engine, bob, "Bob");
    println!();
}

/// Client order ids are unique per account while the order lives.
fn scenario_4_duplicate_client_id() {
    println!("Scenario 4: Duplicate Client Order Id\n");

    let alice = AccountId(1);
    let mut engine = setup(&[alice]);

    engine
        .place_order(OrderRequest::limit(alice, "A", dec!(10), "eur", dec!(12), "usd"))
        .unwrap();
    let response = engine.apply(EngineCommand::PlaceLimit {
        owner: alice,
        client_order_id: ClientOrderId::from("A"),
        source: "eur".to_string(),
        source_amount: dec!(10),
        destination: "usd".to_string(),
        destination_amount: dec!(13),
        time_in_force: TimeInForce::GoodTilCancel,
    });

    if let ApiResponse::Error(err) = response {
        println!("  Second order rejected: code {} ({})", err.code.as_u32(), err.message);
    }
    println!();
}

/// Cancel-replace may not switch instruments.
fn scenario_5_cancel_replace() {
    println!("Scenario 5: Cancel Replace\n");

    let alice = AccountId(1);
    let mut engine = setup(&[alice]);

    let prior = engine
        .place_order(OrderRequest::limit(alice, "A", dec!(100), "eur", dec!(120), "usd"))
        .unwrap();

    let moved = engine.cancel_replace_order(
        &ClientOrderId::from("A"),
        OrderRequest::limit(alice, "A2", dec!(100), "eur", dec!(110), "chf"),
    );
    if let Err(err) = moved {
        println!("  Replace onto EUR/CHF rejected: {}", err);
    }
    println!("  Original order {} still live: {}", prior.order_id, engine.order(prior.order_id).is_some());

    let replaced = engine
        .cancel_replace_order(
            &ClientOrderId::from("A"),
            OrderRequest::limit(alice, "A2", dec!(80), "eur", dec!(100), "usd"),
        )
        .unwrap();
    println!("  Replaced on EUR/USD with order {}", replaced.order_id);
    print_balances(&engine, alice, "Alice");
    println!();
}

/// Several makers at different prices, one market taker.
fn scenario_6_sweep() {
    println!("Scenario 6: Sweep\n");

    let makers: Vec<AccountId> = (1..=5).map(AccountId).collect();
    let taker = AccountId(99);
    let mut accounts = makers.clone();
    accounts.push(taker);
    let mut engine = setup(&accounts);

    for (i, &maker) in makers.iter().enumerate() {
        let usd = dec!(120) + Decimal::from(i as u64) * dec!(2);
        engine
            .place_order(OrderRequest::limit(maker, format!("m{i}"), dec!(100), "eur", usd, "usd"))
            .unwrap();
    }

    for level in engine.depth("eur", "usd", 10).unwrap() {
        println!("  {} EUR at {} USD/EUR ({} orders)", level.source_remaining, level.price, level.order_count);
    }

    let request = OrderRequest::market(taker, "sweep", dec!(500), "usd", dec!(1), "eur")
        .with_time_in_force(TimeInForce::ImmediateOrCancel);
    let result = engine.place_order(request).unwrap();

    println!(
        "\n  Market order spends {} USD for {} EUR across {} fills, status {:?}",
        result.source_filled,
        result.destination_filled,
        result.fills.len(),
        result.status
    );
    for summary in engine.instruments() {
        if let Some(trade) = summary.last_trade {
            println!("  Last {} trade at {} ({})", summary.instrument, trade.last_price, trade.timestamp);
        }
    }
    println!("  Live orders: {}, events: {}", engine.live_order_count(), engine.events().len());
}
