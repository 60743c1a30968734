//! Bucket listing integration tests.

#[cfg(test)]
mod tests {
    use mediavault_store::{MediaStore, StoreError};

    use crate::r2_store;

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_list_bucket_root() {
        let store = r2_store().unwrap();
        let entries = store.list("").await.expect("list root");

        let first_file = entries.iter().position(|e| !e.is_directory);
        if let Some(first_file) = first_file {
            assert!(entries[first_file..].iter().all(|e| !e.is_directory));
        }
        for dir in entries.iter().filter(|e| e.is_directory) {
            assert!(dir.path.ends_with('/'));
            assert!(!dir.path[..dir.path.len() - 1].contains('/'));
        }
    }

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_list_first_folder_one_level_deep() {
        let store = r2_store().unwrap();
        let root = store.list("").await.expect("list root");
        let Some(folder) = root.iter().find(|e| e.is_directory) else {
            return;
        };

        let entries = store.list(&folder.path).await.expect("list folder");
        for entry in &entries {
            assert!(entry.path.starts_with(&folder.path));
            let rest = entry.path[folder.path.len()..].trim_end_matches('/');
            assert!(!rest.contains('/'), "{} is more than one level deep", entry.path);
        }
    }

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_page_with_continuation_tokens() {
        let store = r2_store().unwrap();
        let first = store.list_page("", None, None).await.expect("first page");
        if first.is_truncated {
            let cursor = first.next_cursor.as_deref().expect("truncated page has a cursor");
            let second = store
                .list_page("", None, Some(cursor))
                .await
                .expect("second page");
            assert_ne!(
                first.entries.first().map(|e| &e.path),
                second.entries.first().map(|e| &e.path)
            );
        }
    }

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_search_files_only() {
        let store = r2_store().unwrap();
        let hits = store.search("mp4").await.expect("search");
        assert!(hits.iter().all(|e| !e.is_directory));
        assert!(
            hits.iter()
                .all(|e| e.path.to_lowercase().contains("mp4"))
        );
    }

    #[tokio::test]
    #[ignore = "requires R2 credentials"]
    async fn test_should_reject_wrong_secret() {
        let mut config = crate::archive_config().unwrap();
        config.storage.secret_access_key.push('x');
        let store = mediavault_store::R2Store::from_config(&config).unwrap();

        match store.list("").await {
            Err(StoreError::Upstream { status, body }) => {
                assert_eq!(status, http::StatusCode::FORBIDDEN);
                assert!(body.contains("SignatureDoesNotMatch"), "{body}");
            }
            other => panic!("expected signature rejection, got {other:?}"),
        }
    }
}
