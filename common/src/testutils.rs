/// Files created by [`setup_test_tree`], relative to the temporary directory.
pub const TREE_FILES: [(&str, &str); 4] = [
    ("src/0.txt", "0"),
    ("src/bar/1.txt", "11"),
    ("src/bar/2.txt", "222"),
    ("src/baz/qux/3.txt", "3333"),
];

pub async fn setup_test_tree() -> anyhow::Result<tempfile::TempDir> {
    let tmp_dir = tempfile::tempdir()?;
    // src
    // |- 0.txt
    // |- bar
    //    |- 1.txt
    //    |- 2.txt
    // |- baz
    //    |- qux
    //       |- 3.txt
    for (path, content) in TREE_FILES {
        let path = tmp_dir.path().join(path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
    }
    Ok(tmp_dir)
}

pub fn memory_store() -> (std::sync::Arc<store::memory::MemoryStore>, store::SharedStore) {
    let memory = std::sync::Arc::new(store::memory::MemoryStore::new());
    let shared: store::SharedStore = memory.clone();
    (memory, shared)
}
