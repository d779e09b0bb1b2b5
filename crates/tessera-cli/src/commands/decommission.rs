use tokio::sync::watch;
use tracing::info;

use tessera_admin::{AdminError, DecommissionOutcome, DecommissionProgress};

use super::{parse_endpoint, Session};

pub async fn run(session: &Session, endpoint: &str) -> anyhow::Result<()> {
    let endpoint = parse_endpoint(endpoint)?;
    let mut client = session.client().await?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping decommission wait");
            let _ = cancel_tx.send(true);
        }
    });

    let result = client
        .decommission_worker(&endpoint)
        .with_cancel(cancel_rx)
        .on_progress(Box::new(|p: &DecommissionProgress| {
            println!(
                "  poll {:>3}: {}/{} tablets left ({}s)",
                p.poll,
                p.remaining_tablets,
                p.original_tablets,
                p.elapsed.as_secs()
            );
        }))
        .run()
        .await;
    client.close().await;

    match result {
        Ok(report) => {
            match report.outcome {
                DecommissionOutcome::Drained => println!(
                    "✓ Worker {} drained {} tablets in {}s and left the cluster",
                    report.endpoint,
                    report.original_tablets,
                    report.elapsed.as_secs()
                ),
                DecommissionOutcome::AlreadyRemoved => {
                    println!("✓ Worker {} was not in the cluster", report.endpoint)
                }
            }
            Ok(())
        }
        Err(AdminError::Cancelled(what)) => {
            println!("Stopped waiting for {what}; the worker stays marked as decommissioned");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
