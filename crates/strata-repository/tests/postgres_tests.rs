//! Integration tests for PostgresStorage
//!
//! These tests require a PostgreSQL database to be running.
//! Set the DATABASE_URL environment variable to run them:
//!
//! ```bash
//! export DATABASE_URL="postgresql://localhost/strata_test"
//! cargo test --package strata-repository --features postgres -- --ignored
//! ```

#[cfg(feature = "postgres")]
mod postgres_tests {
    use sqlx::postgres::PgPool;
    use std::sync::Arc;
    use strata_core::{ContentTypeDefinition, DataDimensions, Record};
    use strata_repository::{PostgresStorage, StorageAdapter};

    /// Get database URL from environment or use default test database
    fn get_database_url() -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/strata_test".to_string())
    }

    /// Connect and drop leftover state from previous runs
    async fn setup_storage() -> PostgresStorage {
        let pool = PgPool::connect(&get_database_url()).await.expect(
            "Failed to connect to test database. Make sure PostgreSQL is running \
             and DATABASE_URL is set correctly.",
        );

        for sql in [
            "DROP TABLE IF EXISTS \"strata_test$profiles\"",
            "DROP TABLE IF EXISTS _definition_",
            "DROP TABLE IF EXISTS _counter_",
            "DROP TABLE IF EXISTS _lastchange_",
            "DROP TABLE IF EXISTS _config_",
        ] {
            sqlx::query(sql).execute(&pool).await.ok();
        }

        PostgresStorage::with_pool("strata_test", pool)
            .await
            .expect("bootstrap failed")
    }

    fn profiles_definition() -> Arc<ContentTypeDefinition> {
        Arc::new(
            ContentTypeDefinition::builder("profiles")
                .property("claim")
                .property("ranking")
                .protected_property("ranking")
                .build(),
        )
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_counter_issues_sequential_ids() {
        let storage = setup_storage().await;
        let definition = profiles_definition();
        storage.register_content_type(&definition).await.unwrap();

        for expected in 1..=3 {
            let record =
                Record::new(Arc::clone(&definition), &format!("Test {expected}")).unwrap();
            let id = storage.save_record("profiles", &record).await.unwrap();
            assert_eq!(id, expected);
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_revision_continues_after_delete() {
        let storage = setup_storage().await;
        let definition = profiles_definition();
        storage.register_content_type(&definition).await.unwrap();

        let mut record = Record::new(Arc::clone(&definition), "test").unwrap();
        record.set_property("claim", "A").unwrap();
        let id = storage.save_record("profiles", &record).await.unwrap();

        storage
            .delete_record("profiles", id, &DataDimensions::new())
            .await
            .unwrap();

        let mut recreated = Record::new(Arc::clone(&definition), "test").unwrap();
        recreated.set_id(id);
        recreated.set_property("claim", "A").unwrap();
        storage.save_record("profiles", &recreated).await.unwrap();

        let stored = storage
            .get_record("profiles", id, &DataDimensions::new())
            .await
            .unwrap();
        assert_eq!(stored.revision(), 3);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_protected_and_omitted_properties() {
        let storage = setup_storage().await;
        let definition = profiles_definition();
        storage.register_content_type(&definition).await.unwrap();

        let mut record = Record::new(Arc::clone(&definition), "test").unwrap();
        record.set_property("claim", "A").unwrap();
        record.set_property("ranking", "9").unwrap();
        let id = storage.save_record("profiles", &record).await.unwrap();

        let stored = storage
            .get_record("profiles", id, &DataDimensions::new())
            .await
            .unwrap();
        assert_eq!(stored.property("ranking"), Some(""));

        let mut partial = Record::new(Arc::clone(&definition), "test").unwrap();
        partial.set_id(id);
        storage.save_record("profiles", &partial).await.unwrap();

        let stored = storage
            .get_record("profiles", id, &DataDimensions::new())
            .await
            .unwrap();
        assert_eq!(stored.property("claim"), Some("A"));
        assert_eq!(stored.revision(), 2);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_delete_all_and_watermark() {
        let storage = setup_storage().await;
        let definition = profiles_definition();
        storage.register_content_type(&definition).await.unwrap();

        let dimensions = DataDimensions::new();
        for i in 1..=3 {
            let record = Record::new(Arc::clone(&definition), &format!("Test {i}")).unwrap();
            storage.save_record("profiles", &record).await.unwrap();
        }

        let w1 = storage.last_modified("profiles", &dimensions).await.unwrap();
        assert!(w1 > 0);

        let deleted = storage
            .delete_all_records("profiles", &dimensions)
            .await
            .unwrap();
        assert_eq!(deleted.len(), 3);
        assert_eq!(storage.count_records("profiles", &dimensions).await.unwrap(), 0);

        let w2 = storage.last_modified("profiles", &dimensions).await.unwrap();
        assert!(w2 > w1);
    }
}
