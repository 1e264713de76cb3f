//! # Delivery Quote
//!
//! Asks the delivery service for an authoritative quote and prints the
//! priced order, the same way checkout would price it.
//!
//! ## Usage
//! ```bash
//! # Quote a ZIP inside the default zone
//! cargo run -p storefront-checkout --bin delivery-quote -- --zip 90001 --subtotal 450
//!
//! # Full street address and a custom config file
//! cargo run -p storefront-checkout --bin delivery-quote -- \
//!     --zip 90012 --street "200 N Spring St" --subtotal 1200 --config ./checkout.toml
//! ```
//!
//! Exits with status 1 when the address is outside the delivery zone and 2 on
//! configuration or transport errors.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use storefront_checkout::{CheckoutConfig, CheckoutError, DeliveryCostClient, HttpDeliveryClient};
use storefront_core::pricing::{DeliveryPolicy, PricingAggregator};
use storefront_core::types::Address;
use storefront_core::Money;
use tracing_subscriber::EnvFilter;

struct Args {
    zip: String,
    street: String,
    subtotal: Money,
    config: Option<PathBuf>,
}

fn print_help() {
    println!("Storefront Delivery Quote");
    println!();
    println!("Usage: delivery-quote --zip <ZIP> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -z, --zip <ZIP>          Delivery ZIP code (required)");
    println!("  -s, --street <STREET>    Street line (default: empty)");
    println!("  -t, --subtotal <AMOUNT>  Cart subtotal in dollars (default: 0)");
    println!("  -c, --config <PATH>      Config file (default: platform config dir)");
    println!("  -h, --help               Show this help message");
}

/// Parses the command line. `Ok(None)` means help was printed.
fn parse_args() -> Result<Option<Args>, String> {
    let args: Vec<String> = env::args().collect();

    let mut zip = None;
    let mut street = String::new();
    let mut subtotal = Money::zero();
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--zip" | "-z" => {
                zip = Some(value.ok_or("--zip needs a value")?.clone());
                i += 1;
            }
            "--street" | "-s" => {
                street = value.ok_or("--street needs a value")?.clone();
                i += 1;
            }
            "--subtotal" | "-t" => {
                let raw = value.ok_or("--subtotal needs a value")?;
                let amount: f64 = raw
                    .parse()
                    .map_err(|_| format!("invalid subtotal: {raw}"))?;
                subtotal = Money::try_from_major_units(amount).map_err(|e| e.to_string())?;
                i += 1;
            }
            "--config" | "-c" => {
                config = Some(PathBuf::from(value.ok_or("--config needs a value")?));
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
        i += 1;
    }

    let zip = zip.ok_or("--zip is required")?;
    Ok(Some(Args {
        zip,
        street,
        subtotal,
        config,
    }))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,storefront=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("Run with --help for usage.");
            return ExitCode::from(2);
        }
    };

    match quote(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_zone_error() => {
            eprintln!("✗ {}", e.user_message());
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("✗ {e}");
            ExitCode::from(2)
        }
    }
}

async fn quote(args: Args) -> Result<(), CheckoutError> {
    let config = CheckoutConfig::load(args.config)?;
    let client = HttpDeliveryClient::from_config(&config)?;

    let mut address = Address::default();
    address.street = args.street;
    address.zip_code = args.zip;
    let address = address.with_zone_defaults(&config.service_area());

    println!("Storefront Delivery Quote");
    println!("=========================");
    println!("Service:  {}", client.base_url());
    println!("Address:  {} {}, {} {}", address.street, address.city, address.state, address.zip_code);
    println!("Subtotal: {}", args.subtotal);
    println!();

    let validation = client.validate_address(&address).await?;
    if !validation.within_delivery_zone {
        return Err(CheckoutError::OutOfZone(format!(
            "{} is {:.1} miles away",
            address.zip_code, validation.distance_miles
        )));
    }
    println!("✓ Inside delivery zone ({:.1} mi)", validation.distance_miles);

    let cost = client.calculate_delivery_cost(&address, args.subtotal).await?;
    let resolved = DeliveryPolicy::default().finalize(args.subtotal, &validation, Some(&cost))?;
    let pricing = PricingAggregator::default().price(args.subtotal, resolved.shipping)?;

    println!();
    println!("  Subtotal  {:>12}", pricing.subtotal().to_string());
    if resolved.is_free {
        println!("  Delivery  {:>12}", "FREE");
    } else {
        println!("  Delivery  {:>12}", pricing.shipping().to_string());
    }
    println!("  Tax       {:>12}", pricing.tax().to_string());
    println!("  Total     {:>12}", pricing.total().to_string());

    Ok(())
}
