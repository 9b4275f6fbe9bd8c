use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vodfetch::catalog::ResolutionTarget;
use vodfetch::playlist::{PlaylistClient, PlaylistError};

fn client(uri: &str) -> PlaylistClient {
    PlaylistClient::with_base_url(uri, Duration::from_secs(5)).unwrap()
}

fn movie_target() -> ResolutionTarget {
    ResolutionTarget {
        movie_id: "m1".to_string(),
        episode_id: None,
        season_number: None,
    }
}

#[tokio::test]
async fn test_get_playlist_movie() {
    let mock_server = MockServer::start().await;

    let response_body = r#"{
        "quality": "1080p",
        "segments": [
            {"url": "http://cdn.example/seg/0"},
            {"url": "http://cdn.example/seg/1"}
        ]
    }"#;

    Mock::given(method("GET"))
        .and(path("/api/playlist"))
        .and(query_param("movie_id", "m1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(response_body))
        .mount(&mock_server)
        .await;

    let manifest = client(&mock_server.uri())
        .get_playlist(&movie_target())
        .await
        .unwrap();

    assert_eq!(manifest.total_segments(), 2);
    assert_eq!(manifest.quality.as_deref(), Some("1080p"));
}

#[tokio::test]
async fn test_get_playlist_episode_sends_episode_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/playlist"))
        .and(query_param("movie_id", "s1"))
        .and(query_param("episode_id", "e33"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"segments": [{"url": "http://cdn.example/ep"}]}"#,
        ))
        .mount(&mock_server)
        .await;

    let target = ResolutionTarget {
        movie_id: "s1".to_string(),
        episode_id: Some("e33".to_string()),
        season_number: Some(3),
    };

    let manifest = client(&mock_server.uri()).get_playlist(&target).await.unwrap();
    assert_eq!(manifest.total_segments(), 1);
}

#[tokio::test]
async fn test_get_playlist_not_found_is_content_not_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/playlist"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .get_playlist(&movie_target())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaylistError::ContentNotAvailable));
}

#[tokio::test]
async fn test_get_playlist_gone_is_content_not_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/playlist"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .get_playlist(&movie_target())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaylistError::ContentNotAvailable));
}

#[tokio::test]
async fn test_get_playlist_server_error_is_service_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/playlist"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .get_playlist(&movie_target())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaylistError::ServiceError(_)));
}

#[tokio::test]
async fn test_get_playlist_garbage_body_is_service_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/playlist"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let err = client(&mock_server.uri())
        .get_playlist(&movie_target())
        .await
        .unwrap_err();

    assert!(matches!(err, PlaylistError::ServiceError(_)));
}
