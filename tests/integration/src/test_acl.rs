//! ACL durability and consistency tests for the filesystem backend.

#[cfg(test)]
mod tests {
    use objets_auth::{CredentialProvider, StaticCredentialProvider};
    use objets_store::{AclError, AclStore, CannedAcl, FsObjectStore, ObjectBackend, ObjectStat};

    use crate::{body, config_for, put};

    #[tokio::test]
    async fn test_should_persist_acls_across_restart() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let config = config_for(&dir);

        {
            let store = FsObjectStore::open(&config)
                .await
                .unwrap_or_else(|e| panic!("open: {e}"));
            store
                .put_bucket("b")
                .await
                .unwrap_or_else(|e| panic!("put_bucket: {e}"));
            put(&store, "b", "public", b"p", CannedAcl::PublicRead).await;
            put(&store, "b", "nested/secret", b"s", CannedAcl::Private).await;
            store.close().await.unwrap_or_else(|e| panic!("close: {e}"));
        }

        let store = FsObjectStore::open(&config)
            .await
            .unwrap_or_else(|e| panic!("reopen: {e}"));
        let object = store
            .get_object("b", "public")
            .await
            .unwrap_or_else(|e| panic!("get: {e}"));
        assert_eq!(object.acl, CannedAcl::PublicRead);
        let object = store
            .get_object("b", "nested/secret")
            .await
            .unwrap_or_else(|e| panic!("get: {e}"));
        assert_eq!(object.acl, CannedAcl::Private);
    }

    #[tokio::test]
    async fn test_should_recover_acls_after_unclean_shutdown() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let config = config_for(&dir);

        {
            let store = FsObjectStore::open(&config)
                .await
                .unwrap_or_else(|e| panic!("open: {e}"));
            store
                .put_bucket("b")
                .await
                .unwrap_or_else(|e| panic!("put_bucket: {e}"));
            put(&store, "b", "k", b"v", CannedAcl::PublicReadWrite).await;
            // Dropped without close.
        }

        let store = FsObjectStore::open(&config)
            .await
            .unwrap_or_else(|e| panic!("reopen: {e}"));
        let stat = store
            .stat_object("b", "k")
            .await
            .unwrap_or_else(|e| panic!("stat: {e}"));
        assert_eq!(stat.effective_acl(), Some(CannedAcl::PublicReadWrite));
    }

    #[tokio::test]
    async fn test_should_keep_acl_entries_paired_with_objects() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let store = FsObjectStore::open(&config_for(&dir))
            .await
            .unwrap_or_else(|e| panic!("open: {e}"));
        store
            .put_bucket("b")
            .await
            .unwrap_or_else(|e| panic!("put_bucket: {e}"));

        for key in ["one", "two/three", "two/four"] {
            put(&store, "b", key, b"x", CannedAcl::PublicRead).await;
        }
        store
            .delete_object("b", "one")
            .await
            .unwrap_or_else(|e| panic!("delete: {e}"));

        let keys = store
            .acl()
            .keys("b")
            .unwrap_or_else(|e| panic!("keys: {e}"));
        assert_eq!(keys, vec!["two/four", "two/three"]);

        store
            .delete_bucket("b")
            .await
            .unwrap_or_else(|e| panic!("delete_bucket: {e}"));
        assert!(
            store
                .acl()
                .keys("b")
                .unwrap_or_else(|e| panic!("keys: {e}"))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_should_treat_object_without_acl_as_private() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let store = FsObjectStore::open(&config_for(&dir))
            .await
            .unwrap_or_else(|e| panic!("open: {e}"));
        store
            .put_bucket("b")
            .await
            .unwrap_or_else(|e| panic!("put_bucket: {e}"));
        put(&store, "b", "k", b"x", CannedAcl::PublicRead).await;

        // Lose the ACL entry, as after a crash mid-delete.
        store
            .acl()
            .remove("b", "k")
            .unwrap_or_else(|e| panic!("remove: {e}"));

        let stat = store
            .stat_object("b", "k")
            .await
            .unwrap_or_else(|e| panic!("stat: {e}"));
        assert!(matches!(
            stat,
            ObjectStat::Present {
                acl: Err(AclError::NotFound { .. })
            }
        ));
        assert_eq!(stat.effective_acl(), Some(CannedAcl::Private));

        // A later upload restores the pairing.
        store
            .put_object("b", "k", body(b"y"), CannedAcl::PublicRead)
            .await
            .unwrap_or_else(|e| panic!("put: {e}"));
        let object = store
            .get_object("b", "k")
            .await
            .unwrap_or_else(|e| panic!("get: {e}"));
        assert_eq!(object.acl, CannedAcl::PublicRead);
    }

    #[tokio::test]
    async fn test_should_refuse_second_open_of_acl_database() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let config = config_for(&dir);
        let store = FsObjectStore::open(&config)
            .await
            .unwrap_or_else(|e| panic!("open: {e}"));

        assert!(AclStore::open(config.acl_db_path()).is_err());

        store.close().await.unwrap_or_else(|e| panic!("close: {e}"));
        assert!(AclStore::open(config.acl_db_path()).is_ok());
    }

    #[test]
    fn test_should_resolve_configured_credentials() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let mut config = config_for(&dir);
        config.access_key_id = "AKIDEXAMPLE".to_owned();
        config.secret_access_key = "wJalrXUtnFEMI".to_owned();

        let provider = StaticCredentialProvider::from_config(&config);
        assert_eq!(
            provider
                .get_secret_key("AKIDEXAMPLE")
                .unwrap_or_else(|e| panic!("lookup: {e}")),
            "wJalrXUtnFEMI"
        );
        assert!(provider.get_secret_key("OTHER").is_err());
    }
}
