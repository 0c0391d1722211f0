//! Session lifecycle scenarios.

#[cfg(test)]
mod tests {
    use crate::assertions::{file_becomes, stays_absent};
    use crate::harness::SmokeHarness;
    use crate::scenarios::KEY;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn snapshot_reaches_joiner() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        fs::write(host_dir.path().join("a.txt"), "hi").unwrap();
        fs::create_dir(host_dir.path().join("src")).unwrap();
        fs::write(host_dir.path().join("src/lib.rs"), "pub fn f() {}").unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();

        let sent = host.client.send_initial_snapshot().await.unwrap();
        assert_eq!(sent, 2);

        assert!(file_becomes(&joiner.path("a.txt"), b"hi").await);
        assert!(file_becomes(&joiner.path("src/lib.rs"), b"pub fn f() {}").await);

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rename_leaves_stale_copy() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        fs::write(host_dir.path().join("old.txt"), "contents").unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();
        host.client.send_initial_snapshot().await.unwrap();
        assert!(file_becomes(&joiner.path("old.txt"), b"contents").await);

        fs::rename(host_dir.path().join("old.txt"), host_dir.path().join("new.txt")).unwrap();

        assert!(file_becomes(&joiner.path("new.txt"), b"contents").await);
        // Deletions are not propagated
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fs::read(joiner.path("old.txt")).unwrap(), b"contents");

        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn read_only_joiner_edits_stay_local() {
        let harness = SmokeHarness::read_only().await.unwrap();
        let host_dir = tempdir().unwrap();
        let joiner_dir = tempdir().unwrap();
        let other_dir = tempdir().unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let joiner = harness.joiner(joiner_dir.path(), KEY).await.unwrap();
        let other = harness.joiner(other_dir.path(), KEY).await.unwrap();
        harness.wait_for_read_only(&joiner).await.unwrap();
        assert!(!host.client.is_read_only());

        fs::write(joiner.path("draft.txt"), "joiner edit").unwrap();
        fs::write(host.path("notes.txt"), "host edit").unwrap();

        // Host edits still flow
        assert!(file_becomes(&joiner.path("notes.txt"), b"host edit").await);
        assert!(file_becomes(&other.path("notes.txt"), b"host edit").await);

        assert!(stays_absent(&host.path("draft.txt"), Duration::from_millis(500)).await);
        assert!(!other.path("draft.txt").exists());

        other.stop().await;
        joiner.stop().await;
        host.stop().await;
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn late_joiner_gets_no_history() {
        let harness = SmokeHarness::start().await.unwrap();
        let host_dir = tempdir().unwrap();
        let early_dir = tempdir().unwrap();
        let late_dir = tempdir().unwrap();

        let host = harness.host(host_dir.path(), KEY).await.unwrap();
        let early = harness.joiner(early_dir.path(), KEY).await.unwrap();
        fs::write(host.path("first.txt"), "one").unwrap();
        assert!(file_becomes(&early.path("first.txt"), b"one").await);

        let late = harness.joiner(late_dir.path(), KEY).await.unwrap();
        assert!(stays_absent(&late.path("first.txt"), Duration::from_millis(300)).await);

        fs::write(host.path("second.txt"), "two").unwrap();
        assert!(file_becomes(&late.path("second.txt"), b"two").await);

        late.stop().await;
        early.stop().await;
        host.stop().await;
        harness.stop().await;
    }
}
