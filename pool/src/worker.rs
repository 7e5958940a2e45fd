use futures::FutureExt;

pub async fn run(id: usize, receiver: async_channel::Receiver<crate::Task>) {
    while let Ok(task) = receiver.recv().await {
        if let Err(panic) = std::panic::AssertUnwindSafe(task).catch_unwind().await {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            tracing::error!("worker {}: task panicked: {}", id, message);
        }
    }
    tracing::trace!("worker {} exiting, queue closed", id);
}
