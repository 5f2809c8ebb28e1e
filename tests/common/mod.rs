use tracing_subscriber::EnvFilter;
use weft_rs::prelude::*;

/// Routes runtime logs through the test harness; `RUST_LOG=weft_rs=trace`
/// shows every dequeue.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn pool(num_threads: usize) -> WorkerPool {
    init_tracing();
    let config = Config::builder().num_threads(num_threads).build().unwrap();
    WorkerPool::new(&config).unwrap()
}
