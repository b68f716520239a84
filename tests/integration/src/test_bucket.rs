//! Bucket lifecycle integration tests.

#[cfg(test)]
mod tests {
    use objets_store::{CannedAcl, StoreError};

    use crate::{backends, create_bucket, put};

    #[tokio::test]
    async fn test_should_create_and_list_buckets() {
        for backend in backends().await {
            let store = &*backend.store;
            for name in ["photos", "archive", "logs"] {
                create_bucket(store, name).await;
            }
            // Creating an existing bucket succeeds.
            create_bucket(store, "photos").await;

            let names: Vec<String> = store
                .buckets()
                .await
                .unwrap_or_else(|e| panic!("[{}] buckets: {e}", backend.name))
                .into_iter()
                .map(|b| b.name)
                .collect();
            assert_eq!(names, vec!["archive", "logs", "photos"], "[{}]", backend.name);
        }
    }

    #[tokio::test]
    async fn test_should_delete_bucket_with_all_objects() {
        for backend in backends().await {
            let store = &*backend.store;
            create_bucket(store, "doomed").await;
            create_bucket(store, "kept").await;
            put(store, "doomed", "a", b"1", CannedAcl::PublicRead).await;
            put(store, "doomed", "dir/b", b"2", CannedAcl::Private).await;
            put(store, "kept", "a", b"3", CannedAcl::PublicRead).await;

            store
                .delete_bucket("doomed")
                .await
                .unwrap_or_else(|e| panic!("[{}] delete_bucket: {e}", backend.name));

            let names: Vec<String> = store
                .buckets()
                .await
                .unwrap_or_else(|e| panic!("[{}] buckets: {e}", backend.name))
                .into_iter()
                .map(|b| b.name)
                .collect();
            assert_eq!(names, vec!["kept"]);

            // Objects of other buckets keep their ACLs.
            let stat = store
                .stat_object("kept", "a")
                .await
                .unwrap_or_else(|e| panic!("[{}] stat: {e}", backend.name));
            assert_eq!(stat.effective_acl(), Some(CannedAcl::PublicRead));
        }
    }

    #[tokio::test]
    async fn test_should_recreate_deleted_bucket_empty() {
        for backend in backends().await {
            let store = &*backend.store;
            create_bucket(store, "b").await;
            put(store, "b", "k", b"old", CannedAcl::PublicRead).await;
            store
                .delete_bucket("b")
                .await
                .unwrap_or_else(|e| panic!("[{}] delete_bucket: {e}", backend.name));
            create_bucket(store, "b").await;

            let stat = store
                .stat_object("b", "k")
                .await
                .unwrap_or_else(|e| panic!("[{}] stat: {e}", backend.name));
            assert!(!stat.exists(), "[{}]", backend.name);
            let listing = store
                .list_bucket("b", "")
                .await
                .unwrap_or_else(|e| panic!("[{}] list: {e}", backend.name));
            assert!(listing.contents.is_empty());
        }
    }

    #[tokio::test]
    async fn test_should_fail_to_delete_missing_bucket() {
        for backend in backends().await {
            let result = backend.store.delete_bucket("ghost").await;
            assert!(
                matches!(result, Err(StoreError::NoSuchBucket { .. })),
                "[{}] got {result:?}",
                backend.name
            );
        }
    }
}
