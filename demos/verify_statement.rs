//! Verify a single statement and print its verdict

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use statement_verify::{
    EngineConfig, Ledger, RunId, StatementEngine, StatementInput, StatementMetadata, Transaction,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CONFIG: &str = r#"
[reconcile]
tolerance = "0.01"

[fee_model]
ratio_threshold = 2.0
minimum_vote_count = 3

[anomaly.thresholds]
max_same_second_groups = 1
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "statement_verify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let engine = StatementEngine::new(EngineConfig::from_toml_str(CONFIG)?)?;

    let day = NaiveDate::from_ymd_opt(2024, 5, 6).ok_or("invalid date")?;
    let at = |hour, minute| day.and_hms_opt(hour, minute, 0).ok_or("invalid time");

    let ledger = Ledger::new(
        StatementMetadata::new("0722555000")
            .with_provider("mpesa")
            .with_period(day, day),
        vec![
            Transaction::credit(0, at(8, 15)?, "Funds received".to_string(), BigDecimal::from(2500))
                .with_id("SE6100001")
                .with_balance_after(BigDecimal::from(3500)),
            Transaction::debit(1, at(9, 40)?, "Customer transfer".to_string(), BigDecimal::from(1200))
                .with_id("SE6100002")
                .with_fee(BigDecimal::from(23))
                .with_balance_after(BigDecimal::from(2277)),
            Transaction::debit(2, at(12, 5)?, "Pay Bill Online".to_string(), BigDecimal::from(900))
                .with_id("SE6100004")
                .with_balance_after(BigDecimal::from(1377)),
        ],
    );

    let page_one = vec![
        "M-PESA STATEMENT".to_string(),
        "Receipt No. | Completion Time | Details | Transaction Status | Paid In | Withdrawn | Balance"
            .to_string(),
        "SE6100001 2024-05-06 08:15 Funds received Completed 2,500.00 3,500.00".to_string(),
        "SE6100002 2024-05-06 09:40 Customer transfer Completed 1,200.00 2,277.00".to_string(),
        "SE6100004 2024-05-06 12:05 Pay Bill Online Completed 900.00 1,377.00".to_string(),
    ];

    let input = StatementInput::new(RunId::generate(), ledger).with_pages(vec![page_one]);
    let verdict = engine.verify(&input)?;

    println!("Run {} -> {:?}", verdict.run_id, verdict.severity);
    for signal in &verdict.signals {
        println!("  signal: {:?}", signal);
    }
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    Ok(())
}
