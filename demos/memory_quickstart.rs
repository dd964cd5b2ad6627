//! Quickstart against the in-memory backend: define a schema, save and
//! fetch revisioned records.
//!
//! Run with: cargo run --example memory_quickstart

use strata_core::{ContentTypeDefinition, UserInfo};
use strata_repository::StorageConfig;
use strata_sdk::RepositoryBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut repository = RepositoryBuilder::new("demo")
        .with_storage(StorageConfig::memory())
        .as_user(UserInfo::new("demo-user"))
        .build()
        .await?;

    let profiles = ContentTypeDefinition::builder("profiles")
        .title("Company Profiles")
        .property("claim")
        .property("tags")
        .property("status")
        .status("1", "Draft")
        .status("2", "Published")
        .build();
    repository.register_content_type(&profiles).await?;
    repository.select_content_type("profiles").await?;

    // Insert: the counter issues id 1
    let mut record = repository.new_record("Acme Corp")?;
    record.set_property("claim", "We make everything")?;
    record.set_property("tags", "manufacturing,classic")?;
    record.set_property("status", "1")?;
    let id = repository.save_record(&mut record).await?;
    println!("saved record {id} at revision 1");

    // Update: revision bumps to 2, omitted properties carry over
    let mut update = repository.new_record("Acme Corp")?;
    update.set_id(id);
    update.set_property("status", "2")?;
    repository.save_record(&mut update).await?;

    let stored = repository.get_record(id).await?;
    println!(
        "{} (revision {}, status {}) tags: {:?}",
        stored.name().unwrap_or("?"),
        stored.revision(),
        stored.status_label().unwrap_or("?"),
        stored.array_property("tags"),
    );

    println!("records in repository: {}", repository.count_records().await?);
    Ok(())
}
