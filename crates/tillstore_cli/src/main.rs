//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `tillstore_core` wiring end to end against a real database.
//! - Replay the menu scenario: seed, reprice, ambiguous lookup, rollback.
//!
//! Usage: `tillstore_cli [config.json]`. Without a config the store is
//! in-memory and logging stays off.

use log::info;
use std::error::Error;
use std::process::ExitCode;
use tillstore_core::{
    init_logging, AppConfig, AttributeKind, Record, RecordType, Store, Value,
};

const MENU: &[(&str, f64, &str)] = &[
    ("Pizza-sml", 9.99, "one-toppings"),
    ("Pizza-med", 12.99, "one-toppings"),
    ("Pizza-lrg", 14.99, "one-toppings"),
    ("Pizza-xlrg", 19.99, "one-toppings"),
    ("Pizza-sml", 12.99, "two-toppings"),
    ("Pizza-med", 14.99, "two-toppings"),
    ("Pizza-lrg", 19.99, "two-toppings"),
    ("Pizza-xlrg", 25.99, "two-toppings"),
];

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("tillstore_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    if let Some(logging) = &config.logging {
        init_logging(logging)?;
    }
    println!("tillstore_core version={}", tillstore_core::core_version());

    let mut store = Store::open(&config.store)?;
    store.register(RecordType::new(
        "items",
        [
            ("name", AttributeKind::Text),
            ("price", AttributeKind::Real),
            ("color", AttributeKind::Text),
        ],
    )?)?;

    let mut special = menu_item("Pizza-small", 12.99, "two-toppings");
    store.insert(&mut special, false)?;
    println!("pending_new={}", store.pending_new().len());

    let mut menu: Vec<Record> = MENU
        .iter()
        .map(|(name, price, color)| menu_item(name, *price, color))
        .collect();
    store.insert_many(&mut menu, true)?;
    println!("items={}", store.query_all("items")?.len());

    for mut item in store.query_all("items")? {
        let price = item.get("price").and_then(Value::as_real).unwrap_or(0.0);
        item.set("price", price + 1.0);
        store.update(&item)?;
    }
    store.commit()?;

    let priciest = store.query_one("items", "name = Pizza-xlrg, color = two-toppings")?;
    if let Some(record) = &priciest.record {
        println!("repriced {record}");
    }

    let large = store.query_one("items", "name = Pizza-lrg")?;
    if let Some(warning) = &large.warning {
        println!("warning: {warning}");
    }
    let Some(mut pizza) = large.into_record() else {
        return Err("no large pizza on the menu".into());
    };

    pizza.set("name", "Large Pizza");
    store.update(&pizza)?;
    println!("pending_dirty={}", store.pending_dirty().len());

    let rollback = store.rollback();
    store.refresh(&mut pizza)?;
    println!(
        "rolled back reverted={} pending_dirty={} name={}",
        rollback.reverted.len(),
        store.pending_dirty().len(),
        pizza.get("name").and_then(Value::as_text).unwrap_or_default()
    );

    store.close()?;
    info!("event=cli_scenario module=cli status=ok");
    Ok(())
}

fn menu_item(name: &str, price: f64, color: &str) -> Record {
    Record::new("items")
        .with("name", name)
        .with("price", price)
        .with("color", color)
}
