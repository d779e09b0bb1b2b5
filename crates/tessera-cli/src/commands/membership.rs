use anyhow::Context;

use super::{parse_endpoint, Session};

pub async fn add_fe(session: &Session, endpoint: &str) -> anyhow::Result<()> {
    let endpoint = parse_endpoint(endpoint)?;
    let mut client = session.client().await?;
    let result = client.add_coordinator(&endpoint).await;
    client.close().await;
    result?;
    println!("✓ Added coordinator {endpoint} (id {})", endpoint.node_id());
    Ok(())
}

pub async fn drop_fe(session: &Session, endpoint: &str) -> anyhow::Result<()> {
    let endpoint = parse_endpoint(endpoint)?;
    let mut client = session.client().await?;
    let result = client.drop_coordinator(&endpoint).await;
    client.close().await;
    result?;
    println!("✓ Dropped coordinator {endpoint}");
    Ok(())
}

pub async fn add_be(session: &Session, endpoint: &str) -> anyhow::Result<()> {
    let endpoint = parse_endpoint(endpoint)?;
    let mut client = session.client().await?;
    let result = client.add_worker(&endpoint).await;
    client.close().await;
    result?;
    println!("✓ Added worker {endpoint} (id {})", endpoint.node_id());
    Ok(())
}

pub async fn drop_be(session: &Session, endpoint: &str) -> anyhow::Result<()> {
    let endpoint = parse_endpoint(endpoint)?;
    let mut client = session.client().await?;
    let result = client.drop_worker(&endpoint).await;
    client.close().await;
    result?;
    println!("✓ Dropped worker {endpoint}");
    Ok(())
}

pub async fn create_vault(session: &Session) -> anyhow::Result<()> {
    let store = session
        .config
        .cloud_store
        .as_ref()
        .context("cluster.toml has no [cloud_store] section")?;
    let mut client = session.client().await?;
    let result = client.create_default_storage_vault(store).await;
    client.close().await;
    result?;
    println!("✓ Created storage vault {} as default", store.vault_name);
    Ok(())
}
