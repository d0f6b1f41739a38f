//! Contract tests for the bundled sample dataset: every sample thread must be
//! resolvable against the bundled CRM directory, and ingest must land them in
//! the database intact.

use casenote_core::crm::CrmDirectory;
use casenote_db::repositories::{SqlThreadRepository, ThreadRepository};
use casenote_db::{connect_with_settings, ingest_threads, migrations, sample_threads};

#[test]
fn every_sample_thread_has_a_crm_order_and_customer() {
    let crm = CrmDirectory::bundled();

    for thread in sample_threads() {
        let order = crm
            .get_order(&thread.order_id)
            .unwrap_or_else(|| panic!("order {} should exist in CRM", thread.order_id));
        assert!(
            crm.get_customer(&order.customer_id).is_some(),
            "customer {} for order {} should exist in CRM",
            order.customer_id,
            order.order_id
        );
    }
}

#[tokio::test]
async fn ingested_samples_survive_the_database_round_trip() {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    let repo = SqlThreadRepository::new(pool.clone());

    let result = ingest_threads(&repo, sample_threads()).await.expect("ingest");
    assert_eq!(result.created, 3);

    let stored = repo.list().await.expect("list");
    let expected = sample_threads();
    assert_eq!(stored.len(), expected.len());
    for (stored_thread, expected_thread) in stored.iter().zip(expected.iter()) {
        assert_eq!(stored_thread, expected_thread);
    }

    pool.close().await;
}
