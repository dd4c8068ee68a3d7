//! Per-file rescan scheduling.
//!
//! # State machine
//!
//! | State | New request | Scan finishes |
//! |---|---|---|
//! | (none) | `Pending`, job queued | - |
//! | `Pending` | coalesced, nothing queued | - |
//! | `Running` | token cancelled, `rerun` set | `rerun` or cancelled: back to `Pending` and requeued; otherwise result committed and entry removed |
//!
//! Deferred scans run from the context's idle queue under the model gate's
//! write side. [`SourceRepository::sync_scans`] runs pending scans inline
//! with pinned tokens and waits for running ones.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use resrepo_worker::ScanToken;

use super::{SourceRepository, load, scan};
use crate::file::ResourceFile;
use crate::generation;

#[derive(Debug)]
pub(super) enum ScanState {
	Pending { token: ScanToken },
	Running { token: ScanToken, rerun: bool },
}

const SYNC_POLL: Duration = Duration::from_millis(50);

impl SourceRepository {
	/// Requests a rescan of `path`, coalescing with a pending request and
	/// superseding a running one.
	pub fn schedule_rescan(&self, path: &Path) {
		{
			let mut scans = self.scans.lock();
			match scans.get_mut(path) {
				Some(ScanState::Pending { .. }) => {
					tracing::trace!(path = %path.display(), "resrepo.scan.coalesced");
					return;
				}
				Some(ScanState::Running { token, rerun }) => {
					token.cancel();
					*rerun = true;
					tracing::trace!(path = %path.display(), generation = token.generation(), "resrepo.scan.superseded");
					return;
				}
				None => {
					let token = ScanToken::new(generation::current());
					scans.insert(path.to_path_buf(), ScanState::Pending { token });
				}
			}
		}
		self.dispatch_scan(path);
	}

	/// Whether a rescan of `path` is pending or running.
	pub fn is_scan_pending(&self, path: &Path) -> bool {
		self.scans.lock().contains_key(path)
	}

	/// Number of files with a pending or running rescan.
	pub fn pending_scans(&self) -> usize {
		self.scans.lock().len()
	}

	fn scan_key(&self, path: &Path) -> String {
		format!("{}:{}", self.id, path.display())
	}

	fn dispatch_scan(&self, path: &Path) {
		if !self.ctx.config.scan.defer_rescans {
			self.run_scan(path, false);
			return;
		}
		let this = self.this.clone();
		let owned = path.to_path_buf();
		self.ctx.idle.submit(Some(self.scan_key(path)), move || {
			if let Some(repo) = this.upgrade() {
				let _gate = repo.ctx.gate.write();
				repo.run_scan(&owned, false);
			}
		});
	}

	/// Runs the pending scan of `path`, if any.
	fn run_scan(&self, path: &Path, pinned: bool) {
		let token = {
			let mut scans = self.scans.lock();
			let Some(state) = scans.get_mut(path) else {
				return;
			};
			let ScanState::Pending { token } = state else {
				return;
			};
			let token = if pinned { ScanToken::pinned(token.generation()) } else { token.clone() };
			*state = ScanState::Running { token: token.clone(), rerun: false };
			token
		};
		tracing::debug!(path = %path.display(), generation = token.generation(), pinned, "resrepo.scan.start");

		let scanned = self.scan_path(path);
		if self.requeue_if_superseded(path, &token) {
			return;
		}
		if let Some(file) = scanned {
			let types = self.state.lock().replace_file(path, file);
			self.structural_change(types);
		}
		if self.requeue_if_superseded(path, &token) {
			return;
		}
		let mut scans = self.scans.lock();
		scans.remove(path);
		drop(scans);
		self.scans_idle.notify_all();
		tracing::debug!(path = %path.display(), "resrepo.scan.done");
	}

	/// Moves a superseded running scan back to pending and requeues it.
	fn requeue_if_superseded(&self, path: &Path, token: &ScanToken) -> bool {
		{
			let mut scans = self.scans.lock();
			let superseded = match scans.get(path) {
				Some(ScanState::Running { rerun, .. }) => *rerun || token.is_cancelled(),
				_ => false,
			};
			if !superseded {
				return false;
			}
			let token = ScanToken::new(generation::current());
			scans.insert(path.to_path_buf(), ScanState::Pending { token });
		}
		tracing::debug!(path = %path.display(), "resrepo.scan.requeued");
		self.dispatch_scan(path);
		true
	}

	/// Scans `path` and commits the result right away, outside the queue.
	pub(super) fn rescan_now(&self, path: &Path) {
		if let Some(file) = self.scan_path(path) {
			let types = self.state.lock().replace_file(path, file);
			self.structural_change(types);
		}
	}

	/// Current contents of `path`: `None` when the path is not a resource
	/// file of this directory, `Some(None)` when the file is gone.
	fn scan_path(&self, path: &Path) -> Option<Option<ResourceFile>> {
		let (folder_type, configuration) = self.folder_of(path)?;
		if load::is_hidden(path) {
			return None;
		}
		let live = self.ctx.documents.live_document(path).is_some();
		if !live && !path.is_file() {
			return Some(None);
		}
		Some(scan::scan_file(&self.namespace, &self.ctx, path, folder_type, Arc::new(configuration)))
	}

	/// Runs every pending scan on the calling thread and waits for running
	/// ones. Must not be called while holding the model gate.
	pub(super) fn sync_scans(&self) {
		loop {
			let pending: Vec<PathBuf> = self
				.scans
				.lock()
				.iter()
				.filter(|(_, state)| matches!(state, ScanState::Pending { .. }))
				.map(|(path, _)| path.clone())
				.collect();
			for path in &pending {
				self.ctx.idle.cancel(&self.scan_key(path));
				self.run_scan(path, true);
			}
			let mut scans = self.scans.lock();
			if scans.is_empty() {
				return;
			}
			if scans.values().all(|state| matches!(state, ScanState::Running { .. })) {
				self.scans_idle.wait_for(&mut scans, SYNC_POLL);
			}
		}
	}
}
