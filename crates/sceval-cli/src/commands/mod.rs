pub mod evaluate;
pub mod refold;
pub mod run;

/// Runs a blocking stage (tool processes, file I/O) without stalling the
/// runtime's other tasks.
pub(crate) fn blocking<T>(stage: impl FnOnce() -> T) -> T {
    tokio::task::block_in_place(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::{Duration, Instant};

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn blocking_stage_leaves_the_runtime_free() {
        // The stage occupies the only worker; the sibling task still has to run.
        let seen = tokio::spawn(async {
            let ticked = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&ticked);
            tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

            blocking(|| {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !ticked.load(Ordering::SeqCst) && Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(10));
                }
                ticked.load(Ordering::SeqCst)
            })
        })
        .await
        .unwrap();
        assert!(seen);
    }
}
