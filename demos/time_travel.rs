//! Time-shifted reads: resolve a record as it was at an earlier timestamp.
//!
//! Run with: cargo run --example time_travel

use strata_core::ContentTypeDefinition;
use strata_repository::StorageConfig;
use strata_sdk::RepositoryBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut repository = RepositoryBuilder::new("demo")
        .with_storage(StorageConfig::memory())
        .build()
        .await?;

    let pages = ContentTypeDefinition::builder("pages")
        .property("headline")
        .build();
    repository.register_content_type(&pages).await?;
    repository.select_content_type("pages").await?;

    let mut v1 = repository.new_record("Launch page")?;
    v1.set_property("headline", "Coming soon")?;
    let id = repository.save_record(&mut v1).await?;

    let first = repository.get_record(id).await?;
    let launch_instant = first
        .revision_timestamp()
        .expect("persisted records carry a revision timestamp");

    let mut v2 = repository.new_record("Launch page")?;
    v2.set_id(id);
    v2.set_property("headline", "We are live!")?;
    repository.save_record(&mut v2).await?;

    println!("latest:     {}", repository.get_record(id).await?.property_or("headline", "?"));

    repository.set_time_shift(launch_instant);
    println!("at launch:  {}", repository.get_record(id).await?.property_or("headline", "?"));
    repository.reset_time_shift();

    Ok(())
}
