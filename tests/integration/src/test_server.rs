//! HTTP front integration tests.

#[cfg(test)]
mod tests {
    use mediavault_auth::canonical::uri_encode;
    use serde_json::Value;

    use crate::{no_redirect_client, server_url, test_object_key};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_health() {
        let resp = reqwest::get(format!("{}/health", server_url()))
            .await
            .expect("health request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "running");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_list_root_folders() {
        let resp = reqwest::get(format!("{}/api/videos/folders", server_url()))
            .await
            .expect("folders request");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert!(body["data"]["files"].is_array());
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_redirect_stream_request() {
        let key = test_object_key().unwrap();
        let resp = no_redirect_client()
            .unwrap()
            .get(format!(
                "{}/api/videos/stream?path={}",
                server_url(),
                uri_encode(&key)
            ))
            .send()
            .await
            .expect("stream request");
        assert_eq!(resp.status(), reqwest::StatusCode::FOUND);
        assert!(resp.headers().contains_key("location"));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_stream_without_path() {
        let resp = no_redirect_client()
            .unwrap()
            .get(format!("{}/api/videos/stream", server_url()))
            .send()
            .await
            .expect("stream request");
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Path required");
    }
}
