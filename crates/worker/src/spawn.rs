use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Runtime of the caller, or a small shared runtime owned by this crate when
/// the caller is a plain thread (hosts driving repositories synchronously).
fn handle() -> Handle {
	if let Ok(handle) = Handle::try_current() {
		return handle;
	}

	static FALLBACK: OnceLock<Runtime> = OnceLock::new();
	FALLBACK
		.get_or_init(|| {
			Builder::new_multi_thread()
				.worker_threads(1)
				.max_blocking_threads(4)
				.thread_name("resrepo-worker")
				.build()
				.expect("resrepo-worker fallback runtime")
		})
		.handle()
		.clone()
}

/// Runs `f` on the blocking pool under `class`.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "resrepo.worker.spawn_blocking");
	handle().spawn_blocking(f)
}
