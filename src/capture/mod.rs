//! Screenshot capture domain — public API.
//!
//! A full-page capture is performed by a privileged context: we ask for
//! one, then wait for it to report back. `CaptureSlot` holds at most one
//! pending capture; a second request while one is live is rejected with
//! `CaptureError::Busy` instead of stacking another waiter.

mod file;

pub use file::{png_data_url, FileScreenshotSource};

use crate::error::CaptureError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

type CaptureResult = Result<String, CaptureError>;

/// Screenshot collaborator: returns a `data:image/...;base64,` URL.
#[async_trait]
pub trait ScreenshotSource: Send + Sync {
    async fn capture(&self) -> Result<String, CaptureError>;
}

/// Sends the "start full-page capture" message to the privileged context.
pub trait CaptureRequester: Send + Sync {
    fn request_capture(&self) -> Result<(), String>;
}

struct Pending {
    id: u64,
    tx: oneshot::Sender<CaptureResult>,
}

/// Single-slot rendezvous between the waiting popup and the capturer.
#[derive(Default)]
pub struct CaptureSlot {
    pending: Mutex<Option<Pending>>,
    next_id: AtomicU64,
}

impl CaptureSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot. Fails with `Busy` while another capture is awaited;
    /// a capture whose waiter has gone away is replaced.
    pub fn begin(self: &Arc<Self>) -> Result<PendingCapture, CaptureError> {
        let mut guard = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = guard.as_ref() {
            if !existing.tx.is_closed() {
                log::warn!("[CAPTURE] Capture #{} still pending, rejecting", existing.id);
                return Err(CaptureError::Busy);
            }
            log::debug!("[CAPTURE] Replacing abandoned capture #{}", existing.id);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (tx, rx) = oneshot::channel();
        *guard = Some(Pending { id, tx });
        log::info!("[CAPTURE] Capture #{} started", id);
        Ok(PendingCapture {
            id,
            rx,
            slot: Arc::clone(self),
        })
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|p| !p.tx.is_closed())
            .unwrap_or(false)
    }

    /// Deliver the finished capture. Returns `false` when nothing was waiting.
    pub fn complete(&self, data_url: String) -> bool {
        self.resolve(Ok(data_url))
    }

    /// Report that the capture could not be taken.
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.resolve(Err(CaptureError::Failed(message.into())))
    }

    /// Abandon the pending capture, waking its waiter with `Cancelled`.
    pub fn cancel(&self) -> bool {
        self.resolve(Err(CaptureError::Cancelled))
    }

    fn resolve(&self, result: CaptureResult) -> bool {
        let taken = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match taken {
            Some(pending) => {
                log::info!(
                    "[CAPTURE] Capture #{} resolved ({})",
                    pending.id,
                    if result.is_ok() { "ok" } else { "error" }
                );
                pending.tx.send(result).is_ok()
            }
            None => {
                log::debug!("[CAPTURE] Result arrived with no capture pending, ignored");
                false
            }
        }
    }

    /// Clear the slot only if it still belongs to capture `id`.
    fn release(&self, id: u64) {
        let mut guard = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if guard.as_ref().map(|p| p.id) == Some(id) {
            *guard = None;
        }
    }
}

/// Handle returned by `CaptureSlot::begin`.
pub struct PendingCapture {
    id: u64,
    rx: oneshot::Receiver<CaptureResult>,
    slot: Arc<CaptureSlot>,
}

impl PendingCapture {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Wait for the capture, freeing the slot on timeout.
    pub async fn wait(self, timeout: Duration) -> Result<String, CaptureError> {
        let outcome = tokio::time::timeout(timeout, self.rx).await;
        self.slot.release(self.id);
        match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CaptureError::Cancelled),
            Err(_) => {
                log::warn!("[CAPTURE] Capture #{} timed out", self.id);
                Err(CaptureError::TimedOut(timeout.as_secs()))
            }
        }
    }
}

/// `ScreenshotSource` backed by a message to the capturer plus a `CaptureSlot`.
pub struct CaptureBridge {
    slot: Arc<CaptureSlot>,
    requester: Arc<dyn CaptureRequester>,
    timeout: Duration,
}

impl CaptureBridge {
    pub fn new(
        slot: Arc<CaptureSlot>,
        requester: Arc<dyn CaptureRequester>,
        timeout: Duration,
    ) -> Self {
        Self {
            slot,
            requester,
            timeout,
        }
    }
}

#[async_trait]
impl ScreenshotSource for CaptureBridge {
    async fn capture(&self) -> Result<String, CaptureError> {
        let pending = self.slot.begin()?;
        if let Err(e) = self.requester.request_capture() {
            self.slot.release(pending.id());
            return Err(CaptureError::Failed(e));
        }
        pending.wait(self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHOT: &str = "data:image/png;base64,iVBORw0KGgo=";

    #[tokio::test]
    async fn completion_reaches_waiter() {
        let slot = Arc::new(CaptureSlot::new());
        let pending = slot.begin().unwrap();
        assert!(slot.is_pending());
        assert!(slot.complete(SHOT.to_string()));
        assert_eq!(pending.wait(Duration::from_secs(1)).await.unwrap(), SHOT);
        assert!(!slot.is_pending());
    }

    #[tokio::test]
    async fn second_begin_is_rejected_while_pending() {
        let slot = Arc::new(CaptureSlot::new());
        let _first = slot.begin().unwrap();
        assert_eq!(slot.begin().err(), Some(CaptureError::Busy));
    }

    #[tokio::test]
    async fn abandoned_capture_is_replaced() {
        let slot = Arc::new(CaptureSlot::new());
        let first = slot.begin().unwrap();
        drop(first);
        let second = slot.begin().unwrap();
        assert!(slot.complete(SHOT.to_string()));
        assert!(second.wait(Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn completion_without_waiter_is_ignored() {
        let slot = CaptureSlot::new();
        assert!(!slot.complete(SHOT.to_string()));
    }

    #[tokio::test]
    async fn timeout_frees_the_slot() {
        let slot = Arc::new(CaptureSlot::new());
        let pending = slot.begin().unwrap();
        let err = pending.wait(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, CaptureError::TimedOut(_)));
        assert!(slot.begin().is_ok());
    }

    #[tokio::test]
    async fn cancel_wakes_waiter() {
        let slot = Arc::new(CaptureSlot::new());
        let pending = slot.begin().unwrap();
        assert!(slot.cancel());
        assert_eq!(
            pending.wait(Duration::from_secs(1)).await,
            Err(CaptureError::Cancelled)
        );
    }

    struct ImmediateCapturer {
        slot: Arc<CaptureSlot>,
    }

    impl CaptureRequester for ImmediateCapturer {
        fn request_capture(&self) -> Result<(), String> {
            self.slot.complete(SHOT.to_string());
            Ok(())
        }
    }

    struct BrokenCapturer;

    impl CaptureRequester for BrokenCapturer {
        fn request_capture(&self) -> Result<(), String> {
            Err("no active tab".to_string())
        }
    }

    #[tokio::test]
    async fn bridge_round_trip() {
        let slot = Arc::new(CaptureSlot::new());
        let bridge = CaptureBridge::new(
            slot.clone(),
            Arc::new(ImmediateCapturer { slot: slot.clone() }),
            Duration::from_secs(1),
        );
        assert_eq!(bridge.capture().await.unwrap(), SHOT);
    }

    #[tokio::test]
    async fn bridge_request_failure_releases_slot() {
        let slot = Arc::new(CaptureSlot::new());
        let bridge = CaptureBridge::new(slot.clone(), Arc::new(BrokenCapturer), Duration::from_secs(1));
        assert_eq!(
            bridge.capture().await,
            Err(CaptureError::Failed("no active tab".to_string()))
        );
        assert!(!slot.is_pending());
    }
}
