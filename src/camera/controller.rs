use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};

use crate::error::{CaptureError, DeviceError};

use super::{
    device::{CaptureBackend, CapturedFrame, DeviceBinding},
    state::{CaptureDevice, DeviceStatus},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

struct CameraInner {
    device: CaptureDevice,
    binding: Option<Box<dyn DeviceBinding>>,
    /// Bumped on every (re)acquisition; results from older generations are
    /// released on arrival instead of applied.
    generation: u64,
    acquisition: Option<JoinHandle<()>>,
    watchdog: Option<JoinHandle<()>>,
}

impl CameraInner {
    fn release(&mut self) {
        if let Some(handle) = self.acquisition.take() {
            handle.abort();
        }
        if let Some(handle) = self.watchdog.take() {
            handle.abort();
        }
        if let Some(mut binding) = self.binding.take() {
            binding.release();
        }
    }
}

/// Owns one capture device binding and its acquisition lifecycle.
#[derive(Clone)]
pub struct CameraController {
    backend: Arc<dyn CaptureBackend>,
    inner: Arc<Mutex<CameraInner>>,
    status_tx: Arc<watch::Sender<CaptureDevice>>,
    acquire_timeout: Duration,
}

impl CameraController {
    pub fn new(backend: Arc<dyn CaptureBackend>, acquire_timeout: Duration) -> Self {
        let (status_tx, _) = watch::channel(CaptureDevice::new());
        Self {
            backend,
            inner: Arc::new(Mutex::new(CameraInner {
                device: CaptureDevice::new(),
                binding: None,
                generation: 0,
                acquisition: None,
                watchdog: None,
            })),
            status_tx: Arc::new(status_tx),
            acquire_timeout,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CaptureDevice> {
        self.status_tx.subscribe()
    }

    pub async fn device(&self) -> CaptureDevice {
        self.inner.lock().await.device.clone()
    }

    pub async fn status(&self) -> DeviceStatus {
        self.inner.lock().await.device.status
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.lock().await.device.is_ready()
    }

    pub async fn has_binding(&self) -> bool {
        self.inner.lock().await.binding.is_some()
    }

    /// Starts acquisition unless it is already under way or done.
    pub async fn initialize(&self) {
        let mut inner = self.inner.lock().await;
        match inner.device.status {
            DeviceStatus::Initializing | DeviceStatus::Ready => {
                log_debug!("camera initialize ignored in {:?}", inner.device.status);
            }
            _ => self.begin_acquisition(&mut inner),
        }
    }

    /// Drops any binding and acquires again from scratch. Safe to call in
    /// any state and any number of times.
    pub async fn retry(&self) {
        let mut inner = self.inner.lock().await;
        log_info!("retrying camera acquisition from {:?}", inner.device.status);
        self.begin_acquisition(&mut inner);
    }

    pub async fn on_ready(&self) {
        let mut inner = self.inner.lock().await;
        if inner.binding.is_none() {
            log_debug!("ignoring ready signal before the device is bound");
            return;
        }
        if inner.device.mark_ready() {
            if let Some(handle) = inner.watchdog.take() {
                handle.abort();
            }
            self.publish(&inner.device);
        }
    }

    pub async fn on_error(&self, err: DeviceError) {
        let mut inner = self.inner.lock().await;
        log_warn!("camera error: {err}");
        inner.release();
        inner.generation += 1;
        inner.device.mark_error(&err);
        self.publish(&inner.device);
    }

    /// Waits until the device leaves `Initializing`.
    pub async fn settled(&self) -> CaptureDevice {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(|device| device.status != DeviceStatus::Initializing)
            .await
            .map(|device| device.clone())
            .ok();
        match settled {
            Some(device) => device,
            None => self.device().await,
        }
    }

    pub async fn capture_frame(&self) -> Result<CapturedFrame, CaptureError> {
        let raw = {
            let mut inner = self.inner.lock().await;
            if !inner.device.is_ready() {
                return Err(CaptureError::Unavailable);
            }
            let binding = inner
                .binding
                .as_mut()
                .ok_or_else(|| CaptureError::Failed("no device binding".into()))?;
            match binding.grab() {
                Ok(Some(raw)) => raw,
                Ok(None) => return Err(CaptureError::Failed("device returned no data".into())),
                Err(err) => return Err(CaptureError::Failed(err.to_string())),
            }
        };

        let frame = tokio::task::spawn_blocking(move || CapturedFrame::encode(raw))
            .await
            .map_err(|err| CaptureError::Failed(format!("frame encoder join failed: {err}")))??;
        log_debug!("captured frame ({} bytes)", frame.encoded_len());
        Ok(frame)
    }

    /// Releases the device; the controller returns to `Uninitialized`.
    pub async fn teardown(&self) {
        let mut inner = self.inner.lock().await;
        inner.release();
        inner.generation += 1;
        inner.device.reset();
        self.publish(&inner.device);
    }

    fn begin_acquisition(&self, inner: &mut CameraInner) {
        inner.release();
        inner.generation += 1;
        let generation = inner.generation;
        inner.device.begin_initializing();
        self.publish(&inner.device);

        let controller = self.clone();
        inner.acquisition = Some(tokio::spawn(async move {
            let result = controller.backend.open().await;
            controller.complete_acquisition(generation, result).await;
        }));

        let controller = self.clone();
        let timeout = self.acquire_timeout;
        inner.watchdog = Some(tokio::spawn(async move {
            time::sleep(timeout).await;
            controller.expire_acquisition(generation, timeout).await;
        }));
    }

    async fn complete_acquisition(
        &self,
        generation: u64,
        result: Result<Box<dyn DeviceBinding>, DeviceError>,
    ) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            if let Ok(mut binding) = result {
                binding.release();
            }
            log_debug!("discarded superseded camera acquisition");
            return;
        }

        inner.acquisition = None;
        if let Some(handle) = inner.watchdog.take() {
            handle.abort();
        }

        match result {
            Ok(mut binding) => {
                let ready = inner.device.mark_ready() || inner.device.is_ready();
                if ready && inner.binding.is_none() {
                    inner.binding = Some(binding);
                    log_info!("camera ready");
                } else {
                    binding.release();
                }
            }
            Err(err) => {
                log_warn!("camera acquisition failed: {err}");
                inner.device.mark_error(&err);
            }
        }
        self.publish(&inner.device);
    }

    async fn expire_acquisition(&self, generation: u64, timeout: Duration) {
        let mut inner = self.inner.lock().await;
        if inner.generation == generation && inner.device.mark_timed_out() {
            inner.watchdog = None;
            log_warn!(
                "camera not ready after {}s; still waiting for the device",
                timeout.as_secs()
            );
            self.publish(&inner.device);
        }
    }

    fn publish(&self, device: &CaptureDevice) {
        self.status_tx.send_replace(device.clone());
    }
}
