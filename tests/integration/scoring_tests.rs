//! Engagement scoring against a mock comment API

use crate::common::{
    crawled, mount_comments, mount_counts, mount_replies, requested_paths, test_config,
};
use news_harvest::config::MissingCountPolicy;
use news_harvest::gateway::Gateway;
use news_harvest::scorer::EngagementScorer;
use news_harvest::site::{build_site, DateWindow, Site, TuoiTre};
use news_harvest::{HarvestError, Record, Stage};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_only_commented_records_are_fanned_out() {
    let server = MockServer::start().await;
    mount_counts(&server, &[("a-1", 3), ("b-2", 0)]).await;
    mount_comments(&server, "a", &[(1, 6, 0), (2, 2, 0), (3, 1, 0)]).await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let scorer = EngagementScorer::new(&gateway, build_site(&config), MissingCountPolicy::Zero);

    let scored = scorer
        .score(vec![crawled(&server, "a-1"), crawled(&server, "b-2")])
        .await
        .unwrap();

    assert_eq!(scored[0].comment_count, 3);
    assert_eq!(scored[0].score, 9);
    assert_eq!(scored[1].comment_count, 0);
    assert_eq!(scored[1].score, 0);

    let paths = requested_paths(&server).await;
    assert_eq!(paths, vec!["/widget/index/", "/index/get"]);
}

#[tokio::test]
async fn test_scoring_stops_at_first_zero_like() {
    let server = MockServer::start().await;
    mount_counts(&server, &[("a-1", 4)]).await;
    mount_comments(&server, "a", &[(1, 5, 0), (2, 3, 0), (3, 0, 0), (4, 9, 0)]).await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let scorer = EngagementScorer::new(&gateway, build_site(&config), MissingCountPolicy::Zero);

    let scored = scorer.score(vec![crawled(&server, "a-1")]).await.unwrap();
    assert_eq!(scored[0].score, 8);
}

#[tokio::test]
async fn test_comment_request_limit_matches_count() {
    let server = MockServer::start().await;
    mount_counts(&server, &[("a-1", 7)]).await;
    Mock::given(method("GET"))
        .and(path("/index/get"))
        .and(query_param("limit", "7"))
        .and(query_param("sort", "like"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(crate::common::comments_body(&[(1, 2, 0)])),
        )
        .mount(&server)
        .await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let scorer = EngagementScorer::new(&gateway, build_site(&config), MissingCountPolicy::Zero);

    let scored = scorer.score(vec![crawled(&server, "a-1")]).await.unwrap();
    assert_eq!(scored[0].score, 2);
}

#[tokio::test]
async fn test_replies_attributed_by_position() {
    let server = MockServer::start().await;
    mount_counts(&server, &[("a-1", 2), ("b-1", 1), ("c-1", 1)]).await;
    mount_comments(&server, "a", &[(10, 4, 1), (11, 0, 2)]).await;
    mount_comments(&server, "b", &[(20, 1, 0)]).await;
    mount_comments(&server, "c", &[(30, 2, 1)]).await;
    mount_replies(&server, "10", &[(100, 3, 0)]).await;
    mount_replies(&server, "11", &[(110, 5, 0), (111, 0, 0)]).await;
    // Comment 300 has replies of its own, which are never requested
    mount_replies(&server, "30", &[(300, 7, 4)]).await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let scorer = EngagementScorer::new(&gateway, build_site(&config), MissingCountPolicy::Zero);

    let scored = scorer
        .score(vec![
            crawled(&server, "a-1"),
            crawled(&server, "b-1"),
            crawled(&server, "c-1"),
        ])
        .await
        .unwrap();

    let scores: Vec<_> = scored.iter().map(|r| r.score).collect();
    assert_eq!(scores, vec![12, 1, 9]);

    let reply_calls = requested_paths(&server)
        .await
        .into_iter()
        .filter(|p| p == "/index/getreplay")
        .count();
    assert_eq!(reply_calls, 3);
}

#[tokio::test]
async fn test_reply_failure_is_fatal_with_stage() {
    let server = MockServer::start().await;
    mount_counts(&server, &[("a-1", 1)]).await;
    mount_comments(&server, "a", &[(10, 4, 2)]).await;
    Mock::given(method("GET"))
        .and(path("/index/getreplay"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let scorer = EngagementScorer::new(&gateway, build_site(&config), MissingCountPolicy::Zero);

    let err = scorer
        .score(vec![crawled(&server, "a-1")])
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::ReplyFanout));
    assert!(err.to_string().contains("reply fan-out"));
}

#[tokio::test]
async fn test_count_failure_is_fatal_with_stage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/widget/index/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let scorer = EngagementScorer::new(&gateway, build_site(&config), MissingCountPolicy::Zero);

    let err = scorer
        .score(vec![crawled(&server, "a-1")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HarvestError::Transport {
            stage: Stage::CountQuery,
            ..
        }
    ));
}

#[tokio::test]
async fn test_tuoitre_sums_inline_children() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/getcount-comment.api"))
        .and(query_param("ids", "101,102"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"Success":true,"Data":[{"object_id":101,"total_count":3},{"object_id":102,"total_count":0}]}"#,
        ))
        .mount(&server)
        .await;

    let comments = r#"[{"id":1,"likes":0,"child_comments":[{"id":2,"likes":4}]},{"id":3,"likes":2}]"#;
    Mock::given(method("GET"))
        .and(path("/api/getlist-comment.api"))
        .and(query_param("objId", "101"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(serde_json::json!({ "Success": true, "Data": comments }).to_string()),
        )
        .mount(&server)
        .await;

    let site: Arc<dyn Site> =
        Arc::new(TuoiTre::new(DateWindow::days_ago(1)).with_comment_url(&server.uri()));
    let config = test_config(&server, 25, 0);
    let gateway = Gateway::new(&config.http).unwrap();
    let scorer = EngagementScorer::new(&gateway, site, MissingCountPolicy::Fail);

    let record = |id: &str| Record {
        url: format!("https://tuoitre.vn/{}.htm", id),
        title: id.to_string(),
        identifier: id.to_string(),
        article_id: id.to_string(),
        article_type: "article".to_string(),
        category: None,
        comment_count: 0,
        score: 0,
    };

    let scored = scorer.score(vec![record("101"), record("102")]).await.unwrap();
    assert_eq!(scored[0].score, 6);
    assert_eq!(scored[1].score, 0);
}
