//! Verify a batch of generated statements with bounded concurrency

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use statement_verify::{
    utils::MemoryVerdictStore, BatchVerifier, EngineConfig, Ledger, RunId, StatementEngine,
    StatementInput, StatementMetadata, Transaction, VerdictStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Statement of alternating deposits and withdrawals, optionally with a forged closing balance
fn statement(index: usize, forged: bool) -> Option<StatementInput> {
    let day = NaiveDate::from_ymd_opt(2024, 6, 1 + (index % 28) as u32)?;
    let mut balance = 10_000i64;
    let mut transactions = Vec::new();

    for sequence in 0..12 {
        let at = day.and_hms_opt(8 + sequence as u32, 30, 0)?;
        let amount = 150 + 37 * sequence as i64;
        let transaction = if sequence % 2 == 0 {
            balance += amount;
            Transaction::credit(sequence, at, "Funds received".to_string(), BigDecimal::from(amount))
        } else {
            balance -= amount;
            Transaction::debit(sequence, at, "Customer transfer".to_string(), BigDecimal::from(amount))
        };
        let declared = if forged && sequence == 11 { balance + 500 } else { balance };
        transactions.push(
            transaction
                .with_id(format!("RB{:07}", index * 100 + sequence))
                .with_balance_after(BigDecimal::from(declared)),
        );
    }

    let ledger = Ledger::new(StatementMetadata::new(format!("07{:08}", index)), transactions);
    Some(StatementInput::new(
        RunId::new(format!("batch-{:03}", index)),
        ledger,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statement_verify=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = EngineConfig::default();
    config.batch.concurrency = 4;
    let engine = Arc::new(StatementEngine::new(config)?);

    let store = Arc::new(MemoryVerdictStore::new());
    let verifier = BatchVerifier::new(engine).with_store(store.clone());

    let inputs: Vec<StatementInput> = (0..20)
        .filter_map(|index| statement(index, index % 7 == 3))
        .collect();
    let report = verifier.run(inputs).await;

    println!(
        "Verified {} statements, {} failed, {} skipped",
        report.verdicts.len(),
        report.failures.len(),
        report.skipped.len()
    );
    for verdict in &report.verdicts {
        println!("  {} {:?}", verdict.run_id, verdict.severity);
    }
    println!("Stored verdicts: {}", store.list_verdicts().await?.len());

    Ok(())
}
