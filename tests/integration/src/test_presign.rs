//! Presigned URL integration tests.

#[cfg(test)]
mod tests {
    use http::Method;
    use mediavault_auth::presigned_expiry;
    use mediavault_core::UrlMode;
    use mediavault_store::MediaStore;

    use crate::{r2_store, test_object_key};

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_fetch_object_through_stream_url() {
        let store = r2_store().unwrap();
        let key = test_object_key().unwrap();
        let url = store.url_for(&key, &UrlMode::Stream).await.unwrap();

        let resp = reqwest::Client::new()
            .get(&url)
            .header("range", "bytes=0-15")
            .send()
            .await
            .expect("fetch presigned url");
        assert!(resp.status().is_success(), "status {}", resp.status());
    }

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_set_attachment_disposition_on_download() {
        let store = r2_store().unwrap();
        let key = test_object_key().unwrap();
        let filename = key.rsplit('/').next().unwrap().to_owned();
        let url = store
            .url_for(&key, &UrlMode::Download { filename })
            .await
            .unwrap();

        let resp = reqwest::Client::new()
            .head(&url)
            .send()
            .await
            .expect("head presigned url");
        assert!(resp.status().is_success(), "status {}", resp.status());
        let disposition = resp
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(disposition.starts_with("attachment"), "{disposition}");
    }

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_reject_tampered_signature() {
        let store = r2_store().unwrap();
        let key = test_object_key().unwrap();
        let presigned = store.presign(&Method::GET, &key, &[], 60).unwrap();

        let expiry = presigned_expiry(&presigned.url).unwrap();
        assert_eq!(expiry, presigned.expires_at);

        let tampered = format!("{}0", &presigned.url[..presigned.url.len() - 1]);
        let resp = reqwest::get(&tampered).await.expect("fetch tampered url");
        assert_eq!(resp.status(), reqwest::StatusCode::FORBIDDEN);
    }
}
