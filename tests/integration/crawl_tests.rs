//! End-to-end harvests against a mock board

use crate::common::{
    listing_requests, mount_board, mount_broken_board, mount_source_list, stored_ids,
    test_config, Pages, READ_PATH,
};
use board_harvest::board::Source;
use board_harvest::crawler::{run_harvest, CrawlOutcome};
use board_harvest::storage::{OutcomeKind, RunStatus, SqliteStorage, Storage};
use board_harvest::{Checkpoint, Identity, IdentityKind};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn three_pages() -> Pages {
    vec![
        vec![(150, "2024.01.02 10:05"), (149, "2024.01.02 10:04"), (148, "2024.01.02 10:03")],
        vec![(147, "2024.01.02 10:02"), (146, "2024.01.02 10:01"), (101, "2024.01.02 10:00")],
        vec![(100, "2024.01.02 09:59"), (99, "2024.01.02 09:58"), (98, "2024.01.02 09:57")],
    ]
}

#[tokio::test]
async fn test_full_harvest_single_source() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server, "000001", &three_pages(), Some(1)).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let config = test_config(&mock_server.uri(), &db_path, &["000001"]);

    let report = run_harvest(&config, "test-hash", vec![])
        .await
        .expect("Harvest failed");

    assert_eq!(report.committed(), 1);
    assert_eq!(report.items_committed(), 9);
    assert_eq!(
        stored_ids(&db_path, "000001"),
        vec![98, 99, 100, 101, 146, 147, 148, 149, 150]
    );

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    let checkpoint = storage
        .latest_checkpoint(&Source::new("000001"), IdentityKind::PostId)
        .unwrap();
    assert_eq!(checkpoint, Checkpoint::at(Identity::PostId(150)));

    let posts = storage.get_posts(&Source::new("000001")).unwrap();
    let newest = posts.last().unwrap();
    assert_eq!(newest.title, "post 150");
    assert_eq!(newest.views, 1500);
    assert_eq!(newest.opinion, None);
    assert_eq!(newest.body, "body of 150\nsecond line");
    assert_eq!(newest.posted_at, "2024-01-02 10:05:00");

    let run = storage.get_run(report.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_second_harvest_only_checks_page_one() {
    let mock_server = MockServer::start().await;
    // Every post is fetched exactly once across both runs
    mount_board(&mock_server, "000001", &three_pages(), Some(1)).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let config = test_config(&mock_server.uri(), &db_path, &["000001"]);

    run_harvest(&config, "hash", vec![]).await.expect("First harvest failed");
    let second = run_harvest(&config, "hash", vec![])
        .await
        .expect("Second harvest failed");

    assert_eq!(second.up_to_date(), 1);
    assert_eq!(second.items_committed(), 0);
    assert_eq!(stored_ids(&db_path, "000001").len(), 9);

    // Freshness check + crawl on the first run, freshness check on the second
    assert_eq!(listing_requests(&mock_server, "000001", 1).await, 3);
    assert_eq!(listing_requests(&mock_server, "000001", 2).await, 1);
}

#[tokio::test]
async fn test_new_posts_stop_at_known_page() {
    let mock_server = MockServer::start().await;
    mount_board(
        &mock_server,
        "000001",
        &vec![
            vec![(4, "2024.01.02 10:03"), (3, "2024.01.02 10:02"), (2, "2024.01.02 10:01")],
            vec![(1, "2024.01.02 10:00")],
        ],
        None,
    )
    .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let config = test_config(&mock_server.uri(), &db_path, &["000001"]);
    run_harvest(&config, "hash", vec![]).await.expect("First harvest failed");

    // Three new posts arrive and push the old ones to page 2
    mock_server.reset().await;
    mount_board(
        &mock_server,
        "000001",
        &vec![
            vec![(7, "2024.01.02 10:06"), (6, "2024.01.02 10:05"), (5, "2024.01.02 10:04")],
            vec![(4, "2024.01.02 10:03"), (3, "2024.01.02 10:02"), (2, "2024.01.02 10:01")],
            vec![(1, "2024.01.02 10:00")],
        ],
        None,
    )
    .await;

    let report = run_harvest(&config, "hash", vec![])
        .await
        .expect("Second harvest failed");

    assert_eq!(report.items_committed(), 3);
    assert_eq!(stored_ids(&db_path, "000001"), vec![1, 2, 3, 4, 5, 6, 7]);
    // Page 2 reaches the checkpoint, so page 3 is never listed
    assert_eq!(listing_requests(&mock_server, "000001", 2).await, 1);
    assert_eq!(listing_requests(&mock_server, "000001", 3).await, 0);
}

#[tokio::test]
async fn test_failed_source_does_not_stop_the_run() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server, "000001", &three_pages(), Some(1)).await;
    mount_broken_board(&mock_server, "000002", 503).await;
    mount_board(&mock_server, "000003", &three_pages(), Some(1)).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let config = test_config(&mock_server.uri(), &db_path, &["000001", "000002", "000003"]);

    let report = run_harvest(&config, "hash", vec![])
        .await
        .expect("Harvest failed");

    assert_eq!(report.committed(), 2);
    assert_eq!(report.failed(), 1);
    match &report.outcomes[1] {
        (source, CrawlOutcome::Failed(reason)) => {
            assert_eq!(source.as_str(), "000002");
            assert!(reason.contains("503"), "unexpected reason: {}", reason);
        }
        other => panic!("expected 000002 to fail, got {:?}", other),
    }

    assert!(stored_ids(&db_path, "000002").is_empty());
    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    let counts = storage.get_outcome_counts(report.run_id).unwrap();
    assert_eq!(counts.get(&OutcomeKind::Failed), Some(&1));
    assert_eq!(
        storage
            .latest_checkpoint(&Source::new("000002"), IdentityKind::PostId)
            .unwrap(),
        Checkpoint::none(IdentityKind::PostId)
    );
}

#[tokio::test]
async fn test_broken_post_abandons_source_without_commit() {
    let mock_server = MockServer::start().await;
    // Mounted first, so it answers for post 99 ahead of the board's own mock
    Mock::given(method("GET"))
        .and(path(READ_PATH))
        .and(query_param("nid", "99"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_board(&mock_server, "000001", &three_pages(), None).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let config = test_config(&mock_server.uri(), &db_path, &["000001"]);

    let report = run_harvest(&config, "hash", vec![])
        .await
        .expect("Harvest failed");

    assert_eq!(report.failed(), 1);
    assert!(stored_ids(&db_path, "000001").is_empty());

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    assert_eq!(
        storage
            .latest_checkpoint(&Source::new("000001"), IdentityKind::PostId)
            .unwrap(),
        Checkpoint::none(IdentityKind::PostId)
    );
}

#[tokio::test]
async fn test_sources_downloaded_when_none_configured() {
    let mock_server = MockServer::start().await;
    mount_source_list(&mock_server, &["1", "5930", "1"]).await;
    mount_board(&mock_server, "000001", &three_pages(), None).await;
    mount_board(&mock_server, "005930", &vec![], None).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let config = test_config(&mock_server.uri(), &db_path, &[]);

    let report = run_harvest(&config, "hash", vec![])
        .await
        .expect("Harvest failed");

    let crawled: Vec<&str> = report
        .outcomes
        .iter()
        .map(|(source, _)| source.as_str())
        .collect();
    assert_eq!(crawled, vec!["000001", "005930"]);
    assert_eq!(report.outcomes[1].1, CrawlOutcome::UpToDate);
    assert_eq!(report.items_committed(), 9);
}

#[tokio::test]
async fn test_explicit_sources_override_config() {
    let mock_server = MockServer::start().await;
    mount_board(&mock_server, "000003", &three_pages(), Some(1)).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let config = test_config(&mock_server.uri(), &db_path, &["000001", "000002"]);

    let report = run_harvest(&config, "hash", vec![Source::new("000003")])
        .await
        .expect("Harvest failed");

    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].0.as_str(), "000003");
    assert_eq!(stored_ids(&db_path, "000003").len(), 9);
}

#[tokio::test]
async fn test_timestamp_identity_harvest() {
    let mock_server = MockServer::start().await;
    mount_board(
        &mock_server,
        "000001",
        &vec![
            vec![(6, "2024.01.02 10:02"), (5, "2024.01.02 10:01"), (4, "2024.01.02 10:01")],
            vec![(3, "2024.01.02 10:00"), (2, "2024.01.02 10:00"), (1, "2024.01.02 09:59")],
        ],
        Some(1),
    )
    .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("board.db");
    let mut config = test_config(&mock_server.uri(), &db_path, &["000001"]);
    config.crawler.identity = IdentityKind::Timestamp;

    let report = run_harvest(&config, "hash", vec![])
        .await
        .expect("Harvest failed");
    assert_eq!(report.items_committed(), 6);

    let second = run_harvest(&config, "hash", vec![])
        .await
        .expect("Second harvest failed");
    assert_eq!(second.up_to_date(), 1);

    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    let posts = storage.get_posts(&Source::new("000001")).unwrap();
    let sequence_of = |id: u64| posts.iter().find(|p| p.post_id == id).unwrap().sequence;
    assert!(sequence_of(2) < sequence_of(3));
    assert!(sequence_of(4) < sequence_of(5));
}
