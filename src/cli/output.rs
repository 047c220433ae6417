//! Output formatting for `optrl` commands.
//!
//! Supports two modes: human-readable tables (default) and JSON (--json).

use serde::Serialize;
use tabled::{Table, Tabled};

use crate::pricing::PricingResults;

/// Output mode for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Table,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Table
        }
    }
}

/// One row of the pricing table
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct PriceRow {
    #[tabled(rename = "Model")]
    pub model: String,
    #[tabled(rename = "Price", display = "format_price")]
    pub price: f64,
}

fn format_price(price: &f64) -> String {
    format!("{price:.6}")
}

/// Rows in insertion order
pub fn price_rows(results: &PricingResults) -> Vec<PriceRow> {
    results
        .iter()
        .map(|(model, price)| PriceRow {
            model: model.to_string(),
            price,
        })
        .collect()
}

/// Print a vec of Tabled + Serialize items in the chosen mode.
pub fn print_items<T: Tabled + Serialize>(items: &[T], mode: OutputMode) -> anyhow::Result<()> {
    match mode {
        OutputMode::Table => {
            if items.is_empty() {
                println!("(no results)");
            } else {
                let table = Table::new(items).to_string();
                println!("{table}");
            }
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(items)?;
            println!("{json}");
        }
    }
    Ok(())
}

pub fn print_prices(results: &PricingResults, mode: OutputMode) -> anyhow::Result<()> {
    print_items(&price_rows(results), mode)
}
