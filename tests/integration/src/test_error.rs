//! Path guard and error mapping integration tests.

#[cfg(test)]
mod tests {
    use objets_store::{CannedAcl, StoreError};

    use crate::{backends, body, create_bucket, fs_backend, put};

    const TRAVERSALS: [&str; 5] = ["..", "../etc/passwd", "a/../../b", "..\\..\\win", "x/.."];

    #[tokio::test]
    async fn test_should_reject_traversal_keys_everywhere() {
        for backend in backends().await {
            let store = &*backend.store;
            create_bucket(store, "b").await;

            for key in TRAVERSALS {
                let results = [
                    store
                        .put_object("b", key, body(b"x"), CannedAcl::PublicRead)
                        .await
                        .map(|_| ()),
                    store.get_object("b", key).await.map(|_| ()),
                    store.stat_object("b", key).await.map(|_| ()),
                    store.delete_object("b", key).await,
                    store.put_object_acl("b", key, CannedAcl::PublicRead).await,
                ];
                for result in results {
                    let err = result.err().unwrap_or_else(|| {
                        panic!("[{}] {key:?} should be rejected", backend.name)
                    });
                    assert!(matches!(err, StoreError::InvalidPath { .. }));
                    assert_eq!(err.code(), "InvalidArgument");
                    assert_eq!(err.status_code(), 400);
                }
            }

            let listing = store
                .list_bucket("b", "")
                .await
                .unwrap_or_else(|e| panic!("[{}] list: {e}", backend.name));
            assert!(listing.contents.is_empty(), "[{}]", backend.name);
            assert!(listing.common_prefixes.is_empty());
        }
    }

    #[tokio::test]
    async fn test_should_reject_traversal_bucket_names() {
        for backend in backends().await {
            let store = &*backend.store;
            for bucket in TRAVERSALS {
                assert!(matches!(
                    store.put_bucket(bucket).await,
                    Err(StoreError::InvalidPath { .. })
                ));
                assert!(matches!(
                    store.delete_bucket(bucket).await,
                    Err(StoreError::InvalidPath { .. })
                ));
                assert!(matches!(
                    store.list_bucket(bucket, "").await,
                    Err(StoreError::InvalidPath { .. })
                ));
            }
            let buckets = store
                .buckets()
                .await
                .unwrap_or_else(|e| panic!("[{}] buckets: {e}", backend.name));
            assert!(buckets.is_empty(), "[{}]", backend.name);
        }
    }

    #[tokio::test]
    async fn test_should_not_touch_filesystem_outside_root() {
        let backend = fs_backend().await;
        let dir = backend
            .dir
            .as_ref()
            .unwrap_or_else(|| panic!("fs backend has a directory"));
        let store = &*backend.store;
        create_bucket(store, "b").await;

        let result = store
            .put_object("b", "../../escaped", body(b"x"), CannedAcl::PublicRead)
            .await;
        assert!(
            matches!(result, Err(StoreError::InvalidPath { .. })),
            "got {result:?}"
        );
        let result = store.put_bucket("../escaped-bucket").await;
        assert!(
            matches!(result, Err(StoreError::InvalidPath { .. })),
            "got {result:?}"
        );

        assert!(!dir.path().join("escaped").exists());
        assert!(!dir.path().join("escaped-bucket").exists());
        assert!(
            !dir.path()
                .parent()
                .unwrap_or_else(|| panic!("tempdir has a parent"))
                .join("escaped")
                .exists()
        );
    }

    #[tokio::test]
    async fn test_should_map_errors_to_codes() {
        for backend in backends().await {
            let store = &*backend.store;
            create_bucket(store, "b").await;
            put(store, "b", "k", b"x", CannedAcl::Private).await;

            let err = store
                .get_object("b", "missing")
                .await
                .err()
                .unwrap_or_else(|| panic!("[{}] expected NoSuchKey", backend.name));
            assert_eq!(err.code(), "NoSuchKey");
            assert_eq!(err.status_code(), 404);

            let err = store
                .list_bucket("ghost", "")
                .await
                .err()
                .unwrap_or_else(|| panic!("[{}] expected NoSuchBucket", backend.name));
            assert_eq!(err.code(), "NoSuchBucket");
            assert_eq!(err.status_code(), 404);
        }
    }
}
