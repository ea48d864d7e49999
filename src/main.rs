//! PesaSoft operator CLI
//!
//! Drives the wallet core against a real backend without a phone:
//!
//! ```text
//! pesasoft [--env dev] status
//! pesasoft login 0712345678 <password>
//! pesasoft refresh
//! pesasoft receive-code
//! pesasoft decode '{"type":"payment","merchantName":"Naivas","amount":250}'
//! pesasoft top-up 500 [0712345678]
//! pesasoft tx-status <transaction-id>
//! pesasoft logout
//! ```
//!
//! The session survives between invocations in `storage.cache_dir`.

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use pesasoft_core::codec::{self, CodePayload, ReceiveIntent};
use pesasoft_core::config::ClientConfig;
use pesasoft_core::money;
use pesasoft_core::payment::{PaymentDispatcher, TopUpRequest};
use pesasoft_core::session::{AuthPhase, SessionStore};
use pesasoft_core::storage::FileCache;
use pesasoft_core::HttpBackend;

const USAGE: &str = "usage: pesasoft [--env <env>] <status | login <id> <password> | logout | refresh | receive-code | decode <raw> | top-up <amount> [phone] | tx-status <id>>";

/// `--env <name>` anywhere on the command line; the rest is the command.
fn split_args() -> (String, Vec<String>) {
    let mut env = "dev".to_string();
    let mut rest = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--env" {
            if let Some(value) = args.next() {
                env = value;
            }
        } else {
            rest.push(arg);
        }
    }
    (env, rest)
}

#[tokio::main]
async fn main() -> Result<()> {
    let (env, args) = split_args();
    let config = ClientConfig::load(&env)
        .with_context(|| format!("loading config for env '{}'", env))?;
    let _log_guard = pesasoft_core::logging::init_logging(&config.logging);

    tracing::info!(
        env = %env,
        build = env!("GIT_HASH"),
        "Starting pesasoft CLI"
    );

    let backend = Arc::new(HttpBackend::new(&config.api)?);
    let cache = Arc::new(FileCache::new(config.storage.cache_dir.clone()));
    let session = Arc::new(SessionStore::new(cache, backend.clone()));
    session.load().await;

    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    match (command.as_str(), &args[1..]) {
        ("status", []) => print_status(&session),
        ("login", [identifier, password]) => {
            let established = session.login(identifier, password).await?;
            println!("Logged in as {}", established.user.display_name());
            print_status(&session);
        }
        ("logout", []) => {
            session.logout().await;
            println!("Logged out");
        }
        ("refresh", []) => {
            let outcome = session.refresh().await;
            println!("Refresh: {:?}", outcome);
            print_status(&session);
        }
        ("receive-code", []) => {
            let user = session.user().context("not logged in")?;
            let payload = CodePayload::Receive(ReceiveIntent::for_user(&user));
            println!("{}", codec::encode(&payload)?);
        }
        ("decode", [raw]) => match codec::decode(raw)? {
            CodePayload::Receive(intent) => {
                println!(
                    "receive: {} ({}) id={}",
                    intent.name, intent.phone_number, intent.user_id
                );
            }
            CodePayload::Payment(intent) => {
                let amount = match intent.amount {
                    Some(amount) => money::format_amount(money::decimal_to_minor(amount)?),
                    None => "open amount".to_string(),
                };
                println!(
                    "payment: {} {} ref={}",
                    intent.merchant_name,
                    amount,
                    intent.reference.as_deref().unwrap_or("-")
                );
            }
        },
        ("top-up", [amount, phone @ ..]) if phone.len() <= 1 => {
            let amount_minor = money::parse_amount(amount)?;
            let phone_number = match phone.first() {
                Some(phone) => phone.clone(),
                None => session.user().context("not logged in")?.phone_number,
            };
            let dispatcher =
                PaymentDispatcher::new(backend, session.clone(), config.top_up.clone());
            let result = dispatcher
                .top_up(&TopUpRequest::mpesa(amount_minor, phone_number))
                .await?;
            println!(
                "Top-up {}: {} (tx {})",
                money::format_amount(amount_minor),
                result.status,
                result.transaction_id.as_deref().unwrap_or("-")
            );
        }
        ("tx-status", [transaction_id]) => {
            let dispatcher =
                PaymentDispatcher::new(backend, session.clone(), config.top_up.clone());
            let status = dispatcher.transaction_status(transaction_id).await?;
            println!("Transaction {}: {}", transaction_id, status);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

fn print_status(session: &SessionStore) {
    let snapshot = session.snapshot();
    println!("Build:   {}", env!("GIT_HASH"));
    println!("Session: {}", snapshot.phase());
    if snapshot.phase() != AuthPhase::Authenticated {
        return;
    }
    if let Some(user) = session.user() {
        println!("User:    {} ({})", user.display_name(), user.phone_number);
    }
    match session.wallet() {
        Some(wallet) => println!("Balance: {}", money::format_amount(wallet.balance_minor())),
        None => println!("Balance: unknown"),
    }
}
