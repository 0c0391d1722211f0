//! Ignore rules end to end.

#[cfg(test)]
mod tests {
    use crate::assertions::{file_becomes, stays_absent};
    use crate::harness::SmokeHarness;
    use crate::scenarios::KEY;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn ignored_paths_never_sent() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        let root = host_dir.path();
        fs::create_dir_all(root.join(".git/objects")).unwrap();
        fs::create_dir_all(root.join("node_modules/left-pad")).unwrap();
        fs::write(root.join(".git/config"), "[core]").unwrap();
        fs::write(root.join(".git/objects/ab"), "blob").unwrap();
        fs::write(root.join("node_modules/left-pad/index.js"), "module.exports = 1").unwrap();
        fs::write(root.join("main.go.swp"), "swap").unwrap();
        fs::write(root.join("main.go"), "package main").unwrap();

        let host = harness.host(root, KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();

        assert_eq!(host.client.send_initial_snapshot().await.unwrap(), 1);
        assert!(file_becomes(&joiner.path("main.go"), b"package main").await);

        // Live changes under ignored directories stay local too
        fs::write(root.join("node_modules/left-pad/extra.js"), "x").unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/main").unwrap();

        assert!(stays_absent(&joiner.path(".git"), Duration::from_millis(500)).await);
        assert!(!joiner.path("node_modules").exists());
        assert!(!joiner.path("main.go.swp").exists());
        assert_eq!(harness.messages_relayed(), 1);

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }
}
