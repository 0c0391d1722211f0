//! File content scenarios.

#[cfg(test)]
mod tests {
    use crate::assertions::{eventually, file_becomes, stays_absent, SYNC_WINDOW};
    use crate::harness::SmokeHarness;
    use crate::scenarios::KEY;
    use shadow_sync_types::MAX_SYNCED_FILE_BYTES;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn near_limit_file_arrives_intact() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        let content: Vec<u8> = (0..8 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        fs::write(host_dir.path().join("data.bin"), &content).unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();
        host.client.send_initial_snapshot().await.unwrap();

        let target = joiner.path("data.bin");
        assert!(
            eventually(Duration::from_secs(15), || {
                fs::read(&target).map(|b| b == content).unwrap_or(false)
            })
            .await
        );

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn oversized_file_not_sent() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        fs::write(host_dir.path().join("huge.bin"), vec![7u8; MAX_SYNCED_FILE_BYTES + 1]).unwrap();
        fs::write(host_dir.path().join("small.txt"), "ok").unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();

        assert_eq!(host.client.send_initial_snapshot().await.unwrap(), 1);
        assert!(file_becomes(&joiner.path("small.txt"), b"ok").await);
        assert!(stays_absent(&joiner.path("huge.bin"), Duration::from_millis(300)).await);

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn live_edits_flow_both_ways() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();

        fs::write(host.path("solution.py"), "def f():\n    pass\n").unwrap();
        assert!(file_becomes(&joiner.path("solution.py"), b"def f():\n    pass\n").await);

        fs::write(joiner.path("solution.py"), "def f():\n    return 1\n").unwrap();
        assert!(file_becomes(&host.path("solution.py"), b"def f():\n    return 1\n").await);

        fs::create_dir(host.path("pkg")).unwrap();
        fs::write(host.path("pkg/mod.py"), "x = 1").unwrap();
        assert!(file_becomes(&joiner.path("pkg/mod.py"), b"x = 1").await);

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn applied_changes_are_not_echoed() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        fs::write(host_dir.path().join("a.txt"), "hi").unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();
        host.client.send_initial_snapshot().await.unwrap();
        assert!(file_becomes(&joiner.path("a.txt"), b"hi").await);

        // The joiner's own write must not bounce back through the hub
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(harness.messages_relayed(), 1);

        fs::write(joiner.path("a.txt"), "reply").unwrap();
        assert!(file_becomes(&host.path("a.txt"), b"reply").await);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(harness.messages_relayed(), 2);

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wrong_key_cannot_read() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        let intruder_dir = tempdir().unwrap();
        fs::write(host_dir.path().join("secret.txt"), "classified").unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();
        let intruder = harness.joiner(intruder_dir.path(), "wrong-key").await.unwrap();
        host.client.send_initial_snapshot().await.unwrap();

        assert!(file_becomes(&joiner.path("secret.txt"), b"classified").await);
        assert!(stays_absent(&intruder.path("secret.txt"), Duration::from_millis(300)).await);
        // A bad frame is dropped, not fatal
        assert!(!intruder.client.cancellation_token().is_cancelled());
        assert!(eventually(SYNC_WINDOW, || harness.hub().peer_count() == 3).await);

        intruder.stop().await;
        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }
}
