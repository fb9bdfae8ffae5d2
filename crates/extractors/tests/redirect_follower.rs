//! Redirect-follower behavior against a local HTTP fixture.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use futures::stream;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use vodfetch_extractors::ExtractorError;
use vodfetch_extractors::http::create_client;
use vodfetch_extractors::players::{HostKind, Streamtape, VideoHost};

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn player_page(base: &str) -> String {
    // Prefix plus substring(3) of the token reassembles to /get_video?id=42.
    format!(
        "<html><body><script>\
         document.getElementById('botlink').innerHTML = '{base}/get_vi' + ('xyzdeo?id=42').substring(3);\
         </script></body></html>"
    )
}

fn host() -> Box<dyn VideoHost> {
    HostKind::Streamtape.new_host(create_client(false).unwrap())
}

#[tokio::test]
async fn ready_link_resolves_on_the_first_poll() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_handler = Arc::clone(&hits);

    let base: Arc<std::sync::OnceLock<String>> = Arc::new(std::sync::OnceLock::new());
    let base_for_player = Arc::clone(&base);

    let router = Router::new()
        .route(
            "/player",
            get(move || {
                let base = Arc::clone(&base_for_player);
                async move { Html(player_page(base.get().unwrap())) }
            }),
        )
        .route(
            "/get_video",
            get(move || {
                hits_handler.fetch_add(1, Ordering::SeqCst);
                async move {
                    let mut headers = HeaderMap::new();
                    headers.insert(
                        header::LOCATION,
                        "http://cdn.example/x.mp4".parse().unwrap(),
                    );
                    (StatusCode::FOUND, headers).into_response()
                }
            }),
        );

    let url = serve(router).await;
    base.set(url.clone()).unwrap();

    let token = CancellationToken::new();
    let media = host()
        .resolve_media_url(&format!("{url}/player"), &format!("{url}/episode-1"), &token)
        .await
        .unwrap();

    assert_eq!(media, "http://cdn.example/x.mp4");
    // Ready immediately, so exactly one poll.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn expired_marker_fails_without_polling() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_handler = Arc::clone(&hits);

    let base: Arc<std::sync::OnceLock<String>> = Arc::new(std::sync::OnceLock::new());
    let base_for_player = Arc::clone(&base);

    let router = Router::new()
        .route(
            "/player",
            get(move || {
                let base = Arc::clone(&base_for_player);
                async move { Html(player_page(base.get().unwrap())) }
            }),
        )
        .route(
            "/get_video",
            get(move || {
                hits_handler.fetch_add(1, Ordering::SeqCst);
                async move { Html("<html><body>Sorry, this link has Expired.</body></html>") }
            }),
        );

    let url = serve(router).await;
    base.set(url.clone()).unwrap();

    let token = CancellationToken::new();
    let err = host()
        .resolve_media_url(&format!("{url}/player"), &format!("{url}/episode-1"), &token)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractorError::Expired));
    // Expiry is fatal; no further polls.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_ready_responses_poll_up_to_the_ceiling() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_handler = Arc::clone(&hits);

    let base: Arc<std::sync::OnceLock<String>> = Arc::new(std::sync::OnceLock::new());
    let base_for_player = Arc::clone(&base);

    let router = Router::new()
        .route(
            "/player",
            get(move || {
                let base = Arc::clone(&base_for_player);
                async move { Html(player_page(base.get().unwrap())) }
            }),
        )
        .route(
            "/get_video",
            get(move || {
                hits_handler.fetch_add(1, Ordering::SeqCst);
                async move { Html("<html><body>We are preparing your video.</body></html>") }
            }),
        );

    let url = serve(router).await;
    base.set(url.clone()).unwrap();

    let host = Streamtape::new(create_client(false).unwrap())
        .with_polling(3, Duration::from_millis(20));
    let token = CancellationToken::new();
    let err = host
        .resolve_media_url(&format!("{url}/player"), &format!("{url}/episode-1"), &token)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractorError::NeverReady { attempts: 3 }));
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn body_dying_mid_stream_is_a_transient_failure() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_handler = Arc::clone(&hits);

    let base: Arc<std::sync::OnceLock<String>> = Arc::new(std::sync::OnceLock::new());
    let base_for_player = Arc::clone(&base);

    let router = Router::new()
        .route(
            "/player",
            get(move || {
                let base = Arc::clone(&base_for_player);
                async move { Html(player_page(base.get().unwrap())) }
            }),
        )
        .route(
            "/get_video",
            get(move || {
                hits_handler.fetch_add(1, Ordering::SeqCst);
                async move {
                    let body = stream::iter(vec![
                        Ok::<Vec<u8>, std::io::Error>(b"<html><body>prep".to_vec()),
                        Err(std::io::Error::new(
                            std::io::ErrorKind::ConnectionAborted,
                            "dropped",
                        )),
                    ]);
                    Body::from_stream(body).into_response()
                }
            }),
        );

    let url = serve(router).await;
    base.set(url.clone()).unwrap();

    let token = CancellationToken::new();
    let err = host()
        .resolve_media_url(&format!("{url}/player"), &format!("{url}/episode-1"), &token)
        .await
        .unwrap_err();

    // Surfaces as a network error for the caller's retry loop, instead of
    // being mistaken for a not-ready page and burning a poll.
    assert!(matches!(err, ExtractorError::Http(_)));
    assert!(err.is_transient());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancelled_token_stops_before_polling() {
    let base: Arc<std::sync::OnceLock<String>> = Arc::new(std::sync::OnceLock::new());
    let base_for_player = Arc::clone(&base);

    let router = Router::new().route(
        "/player",
        get(move || {
            let base = Arc::clone(&base_for_player);
            async move { Html(player_page(base.get().unwrap())) }
        }),
    );
    let url = serve(router).await;
    base.set(url.clone()).unwrap();

    let token = CancellationToken::new();
    token.cancel();

    // No /get_video route exists: a poll would fail loudly, cancellation
    // must win first.
    let err = host()
        .resolve_media_url(&format!("{url}/player"), &format!("{url}/episode-1"), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractorError::Cancelled));
}
