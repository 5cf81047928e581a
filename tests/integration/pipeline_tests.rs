//! Full pipeline runs into a SQLite database on disk

use crate::common::{mount_comments, mount_counts, mount_listing, site_config, test_config};
use news_harvest::output::write_report;
use news_harvest::site::build_site;
use news_harvest::storage::{ArticleStore, RunStatus, SqliteStorage};
use news_harvest::{HarvestError, Pipeline, Stage};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("harvest.db")).unwrap()
}

#[tokio::test]
async fn test_full_run_persists_ranked_articles() {
    let server = MockServer::start().await;
    mount_listing(&server, "/cat", &["1-1", "2-1", "3-1"], None).await;
    mount_counts(&server, &[("1-1", 1), ("2-1", 2), ("3-1", 0)]).await;
    mount_comments(&server, "1", &[(11, 3, 0)]).await;
    mount_comments(&server, "2", &[(21, 10, 0), (22, 4, 0)]).await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, 25, 2);
    let site = build_site(&config);

    let summary = Pipeline::new(config, site, open(&dir))
        .with_config_hash("hash-1")
        .run_with(vec![format!("{}/cat", server.uri())])
        .await
        .unwrap();

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.articles_scored, 3);
    assert_eq!(summary.articles_written, 3);

    let storage = open(&dir);
    assert_eq!(storage.count_articles("vnexpress").unwrap(), 3);

    let run = storage.get_latest_run("vnexpress").unwrap().unwrap();
    assert_eq!(run.id, summary.run_id);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-1");
    assert_eq!(run.site, "vnexpress");
    assert_eq!(run.articles_written, 3);

    let mut out = Vec::new();
    write_report(&storage, "vnexpress", &mut out).unwrap();
    let base = server.uri();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!(
            "     14 {base}/2.html\n      3 {base}/1.html\n      0 {base}/3.html\n"
        )
    );
}

#[tokio::test]
async fn test_rerun_updates_score_and_keeps_creation() {
    let dir = TempDir::new().unwrap();

    let server = MockServer::start().await;
    mount_listing(&server, "/cat", &["1-1"], None).await;
    mount_counts(&server, &[("1-1", 1)]).await;
    mount_comments(&server, "1", &[(11, 2, 0)]).await;

    // Article URLs carry the server origin, so the second run reuses the
    // same server with fresh responses.
    let config = test_config(&server, 25, 0);
    let site = build_site(&config);
    Pipeline::new(config, site, open(&dir))
        .run_with(vec![format!("{}/cat", server.uri())])
        .await
        .unwrap();

    let url = format!("{}/1.html", server.uri());
    let before = open(&dir).get_article(&url).unwrap().unwrap();
    assert_eq!(before.score, 2);

    server.reset().await;
    mount_listing(&server, "/cat", &["1-1"], None).await;
    mount_counts(&server, &[("1-1", 2)]).await;
    mount_comments(&server, "1", &[(11, 6, 0), (12, 5, 0)]).await;

    let config = test_config(&server, 25, 0);
    let site = build_site(&config);
    Pipeline::new(config, site, open(&dir))
        .run_with(vec![format!("{}/cat", server.uri())])
        .await
        .unwrap();

    let storage = open(&dir);
    let after = storage.get_article(&url).unwrap().unwrap();
    assert_eq!(after.score, 11);
    assert_eq!(after.create_time, before.create_time);
    assert_eq!(after.comment_count, before.comment_count);
    assert_eq!(storage.count_articles("vnexpress").unwrap(), 1);
    assert_eq!(storage.count_runs("vnexpress").unwrap(), 2);
}

#[tokio::test]
async fn test_failed_run_keeps_scored_batches() {
    let server = MockServer::start().await;
    mount_listing(&server, "/p1", &["1-1", "2-1"], Some("/p2")).await;
    mount_counts(&server, &[("1-1", 0), ("2-1", 1)]).await;
    mount_comments(&server, "2", &[(21, 5, 0)]).await;
    Mock::given(method("GET"))
        .and(path("/p2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, 2, 0);
    let site = build_site(&config);

    let err = Pipeline::new(config, site, open(&dir))
        .run_with(vec![format!("{}/p1", server.uri())])
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::CrawlWave(2)));
    assert!(matches!(err, HarvestError::Transport { .. }));

    let storage = open(&dir);
    assert_eq!(storage.count_articles("vnexpress").unwrap(), 2);
    let run = storage.get_latest_run("vnexpress").unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.articles_written, 2);
}

#[tokio::test]
async fn test_two_sites_share_database_with_separate_rankings() {
    let dir = TempDir::new().unwrap();

    let vnexpress = MockServer::start().await;
    mount_listing(&vnexpress, "/cat", &["1-1"], None).await;
    mount_counts(&vnexpress, &[("1-1", 1)]).await;
    mount_comments(&vnexpress, "1", &[(11, 5, 0)]).await;

    let config = test_config(&vnexpress, 25, 0);
    let site = build_site(&config);
    Pipeline::new(config, site, open(&dir))
        .run_with(vec![format!("{}/cat", vnexpress.uri())])
        .await
        .unwrap();

    let tuoitre = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/timeline/0/trang-1.htm"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="box-category-item">
                <a class="box-category-link-title" href="/bai-101.htm" title="Bai" data-id="101">Bai</a>
                <span class="time-ago-last-news" title="2020-01-01T00:00:00"></span>
            </div></body></html>"#,
        ))
        .mount(&tuoitre)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/getcount-comment.api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"Success":true,"Data":[{"object_id":101,"total_count":1}]}"#,
        ))
        .mount(&tuoitre)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/getlist-comment.api"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"Success":true,"Data":"[{\"id\":1,\"likes\":9}]"}"#,
        ))
        .mount(&tuoitre)
        .await;

    let config = site_config(&tuoitre, "tuoitre", 25, 0);
    let site = build_site(&config);
    Pipeline::new(config, site, open(&dir))
        .run_with(vec![format!("{}/timeline/0/trang-1.htm", tuoitre.uri())])
        .await
        .unwrap();

    let storage = open(&dir);

    let mut out = Vec::new();
    write_report(&storage, "vnexpress", &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("      5 {}/1.html\n", vnexpress.uri())
    );

    let mut out = Vec::new();
    write_report(&storage, "tuoitre", &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("      9 {}/bai-101.htm\n", tuoitre.uri())
    );

    assert_eq!(storage.count_articles("vnexpress").unwrap(), 1);
    assert_eq!(storage.count_articles("tuoitre").unwrap(), 1);
    assert_eq!(storage.count_runs("tuoitre").unwrap(), 1);
}
