//! `common::run` installs a global tracing subscriber, so these tests live in their own binary.

use common::{OutputConfig, RuntimeConfig, S3Uri, Summary, TransferRequest, Uploader};

#[test]
fn run_returns_summary_on_success() {
    let summary = Summary {
        objects_transferred: 3,
        ..Summary::default()
    };
    let res = common::run(
        OutputConfig::default(),
        RuntimeConfig {
            max_workers: 2,
            max_blocking_threads: 0,
        },
        || async move { Ok(summary) },
    );
    assert_eq!(res, Some(summary));
}

#[test]
fn run_returns_none_on_failure() {
    let res = common::run(
        OutputConfig {
            quiet: true,
            ..OutputConfig::default()
        },
        RuntimeConfig::default(),
        || async { Err(anyhow::anyhow!("boom")) },
    );
    assert!(res.is_none());
}

#[test]
fn run_drives_a_full_upload() {
    let tmp_dir = tempfile::tempdir().unwrap();
    std::fs::write(tmp_dir.path().join("f.txt"), "hello").unwrap();
    let memory = std::sync::Arc::new(store::memory::MemoryStore::new());
    let shared: store::SharedStore = memory.clone();
    let path = tmp_dir.path().join("f.txt");
    let res = common::run(
        OutputConfig::default(),
        RuntimeConfig::default(),
        || async move {
            let uploader = Uploader::new(shared, 2);
            let remote: S3Uri = "s3://bucket/in".parse()?;
            uploader
                .submit(&TransferRequest::upload(path, &remote))
                .await?;
            Ok(uploader.wait().await?)
        },
    );
    assert_eq!(res.unwrap().bytes_transferred, 5);
    assert_eq!(memory.object("bucket", "in/f.txt").unwrap(), "hello");
}

#[test]
fn failed_batch_surfaces_as_none() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let memory = std::sync::Arc::new(store::memory::MemoryStore::new());
    let shared: store::SharedStore = memory.clone();
    let out = tmp_dir.path().to_path_buf();
    let res = common::run(
        OutputConfig {
            print_summary: true,
            ..OutputConfig::default()
        },
        RuntimeConfig::default(),
        || async move {
            let downloader = common::Downloader::new(shared, 2);
            let remote: S3Uri = "s3://bucket/missing.txt".parse()?;
            downloader
                .submit(&TransferRequest::download(&remote, out))
                .await?;
            Ok(downloader.wait().await?)
        },
    );
    assert!(res.is_none());
    assert_eq!(memory.get_calls().len(), 1);
}
