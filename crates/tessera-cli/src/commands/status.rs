use clap::ValueEnum;
use tessera_admin::AdminClient;
use tessera_core::{CoordinatorState, WorkerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn show(session: &super::Session, format: OutputFormat) -> anyhow::Result<()> {
    let client = session.client().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&client))?),
        OutputFormat::Text => print!("{}", format_status(&client)),
    }

    client.close().await;
    Ok(())
}

fn sorted_coordinators(client: &AdminClient) -> Vec<&CoordinatorState> {
    let mut fes: Vec<_> = client.coordinators().values().collect();
    fes.sort_by_key(|fe| fe.id);
    fes
}

fn sorted_workers(client: &AdminClient) -> Vec<&WorkerState> {
    let mut bes: Vec<_> = client.workers().values().collect();
    bes.sort_by_key(|be| be.id);
    bes
}

fn to_json(client: &AdminClient) -> serde_json::Value {
    serde_json::json!({
        "query_port": client.query_port(),
        "coordinators": sorted_coordinators(client),
        "workers": sorted_workers(client),
    })
}

fn format_status(client: &AdminClient) -> String {
    let mut out = String::new();
    match client.query_port() {
        Some(port) => out.push_str(&format!("master query port: {port}\n\n")),
        None => out.push_str("master query port: unknown\n\n"),
    }

    out.push_str(&format!(
        "{:<6} {:<8} {:<6} {:<11} {}\n",
        "FE", "MASTER", "ALIVE", "QUERY PORT", "ERROR"
    ));
    for fe in sorted_coordinators(client) {
        out.push_str(&format!(
            "{:<6} {:<8} {:<6} {:<11} {}\n",
            fe.id.to_string(),
            fe.is_master,
            fe.alive,
            fe.query_port.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            fe.err_msg.as_deref().unwrap_or(""),
        ));
    }

    out.push_str(&format!(
        "\n{:<6} {:<11} {:<6} {:<15} {:<8} {}\n",
        "BE", "BACKEND ID", "ALIVE", "DECOMMISSIONED", "TABLETS", "ERROR"
    ));
    for be in sorted_workers(client) {
        out.push_str(&format!(
            "{:<6} {:<11} {:<6} {:<15} {:<8} {}\n",
            be.id.to_string(),
            be.backend_id,
            be.alive,
            be.decommissioned,
            be.tablet_num,
            be.err_msg.as_deref().unwrap_or(""),
        ));
    }
    out
}
