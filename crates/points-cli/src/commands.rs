use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use colored::Colorize;
use rand::Rng;
use serde::Serialize;

use points_ledger::{Ledger, LedgerConfig, LedgerError};
use points_server::{PointsConfig, PointsServer};
use points_store::StoreConfig;
use points_types::{Amount, TransactionKind, UserId};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Simulate(args) => cmd_simulate(args, cli.format).await,
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<PointsConfig> {
    let config = match path {
        Some(path) => PointsConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PointsConfig::default(),
    };
    Ok(config.apply_env()?)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind
            .parse()
            .with_context(|| format!("invalid bind address {bind:?}"))?;
    }
    println!(
        "{} points server on {} (cleanup: {:?})",
        "▶".green().bold(),
        config.server.bind_addr.to_string().bold(),
        config.ledger.cleanup
    );
    PointsServer::new(config).serve().await?;
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Per-user outcome of a simulation run.
#[derive(Debug, Default, Serialize)]
struct UserSummary {
    user_id: u64,
    charged: Amount,
    used: Amount,
    rejected: u64,
    timed_out: u64,
    expected: Amount,
    balance: Amount,
    history_len: usize,
    consistent: bool,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    ops: usize,
    elapsed_ms: u128,
    resident_locks: usize,
    users: Vec<UserSummary>,
}

struct PlannedOp {
    user: UserId,
    kind: TransactionKind,
    amount: Amount,
}

fn plan(args: &SimulateArgs) -> Vec<PlannedOp> {
    let mut rng = rand::thread_rng();
    let max_amount = (args.initial / 4).max(1);
    (0..args.ops)
        .map(|_| PlannedOp {
            user: UserId::new(rng.gen_range(0..args.users.max(1))),
            kind: if rng.gen_bool(0.4) {
                TransactionKind::Charge
            } else {
                TransactionKind::Use
            },
            amount: rng.gen_range(1..=max_amount),
        })
        .collect()
}

async fn cmd_simulate(args: SimulateArgs, format: OutputFormat) -> anyhow::Result<()> {
    if args.initial <= 0 {
        bail!("--initial must be positive");
    }
    let ledger = Arc::new(Ledger::in_memory(
        LedgerConfig {
            lock_timeout_ms: args.lock_timeout_ms,
            ..LedgerConfig::default()
        },
        StoreConfig::with_latency(Duration::from_millis(args.latency_ms)),
    ));

    let mut summaries: BTreeMap<UserId, UserSummary> = BTreeMap::new();
    for id in 0..args.users.max(1) {
        let user = UserId::new(id);
        ledger.charge(user, args.initial).await?;
        summaries.insert(
            user,
            UserSummary {
                user_id: id,
                charged: args.initial,
                ..UserSummary::default()
            },
        );
    }

    let started = Instant::now();
    let mut tasks = Vec::with_capacity(args.ops);
    for op in plan(&args) {
        let ledger = Arc::clone(&ledger);
        tasks.push(tokio::spawn(async move {
            let result = match op.kind {
                TransactionKind::Charge => ledger.charge(op.user, op.amount).await,
                TransactionKind::Use => ledger.use_points(op.user, op.amount).await,
            };
            (op, result)
        }));
    }

    for task in tasks {
        let (op, result) = task.await?;
        let Some(summary) = summaries.get_mut(&op.user) else {
            continue;
        };
        match (op.kind, result) {
            (TransactionKind::Charge, Ok(_)) => summary.charged += op.amount,
            (TransactionKind::Use, Ok(_)) => summary.used += op.amount,
            (_, Err(LedgerError::InsufficientBalance { .. })) => summary.rejected += 1,
            (_, Err(LedgerError::LockAcquisitionTimeout { .. })) => summary.timed_out += 1,
            (_, Err(e)) => return Err(e.into()),
        }
    }
    let elapsed = started.elapsed();

    let mut all_consistent = true;
    for (user, summary) in summaries.iter_mut() {
        summary.expected = summary.charged - summary.used;
        summary.balance = ledger.balance(*user).await?.amount;
        summary.history_len = ledger.history(*user).await?.len();
        let audit = ledger.audit(*user).await?;
        summary.consistent = audit.is_valid() && summary.balance == summary.expected;
        all_consistent &= summary.consistent;
    }

    let report = SimulationReport {
        ops: args.ops,
        elapsed_ms: elapsed.as_millis(),
        resident_locks: ledger.resident_locks(),
        users: summaries.into_values().collect(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    if !all_consistent {
        bail!("ledger state diverged from the expected totals");
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!(
        "{} {} operations in {}ms, {} resident locks",
        "Simulation".bold(),
        report.ops,
        report.elapsed_ms,
        report.resident_locks
    );
    println!(
        "  {:>6} {:>10} {:>10} {:>8} {:>8} {:>10} {:>8}",
        "user", "charged", "used", "rejected", "timeout", "balance", "history"
    );
    for u in &report.users {
        let mark = if u.consistent { "✓".green() } else { "✗".red() };
        println!(
            "  {:>6} {:>10} {:>10} {:>8} {:>8} {:>10} {:>8} {}",
            u.user_id.to_string().cyan(),
            u.charged,
            u.used,
            u.rejected,
            u.timed_out,
            u.balance.to_string().bold(),
            u.history_len,
            mark
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(users: u64, ops: usize, initial: i64) -> SimulateArgs {
        SimulateArgs {
            users,
            ops,
            initial,
            latency_ms: 0,
            lock_timeout_ms: None,
        }
    }

    #[test]
    fn plan_respects_bounds() {
        let ops = plan(&args(3, 500, 400));
        assert_eq!(ops.len(), 500);
        assert!(ops.iter().all(|op| op.user.get() < 3));
        assert!(ops.iter().all(|op| (1..=100).contains(&op.amount)));
    }

    #[tokio::test]
    async fn simulate_is_consistent() {
        cmd_simulate(args(4, 300, 200), OutputFormat::Json).await.unwrap();
    }

    #[tokio::test]
    async fn simulate_rejects_non_positive_initial() {
        assert!(cmd_simulate(args(1, 1, 0), OutputFormat::Text).await.is_err());
    }
}
