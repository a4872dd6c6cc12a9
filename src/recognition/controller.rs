use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    api::{RecognitionOutcome, RecognitionService},
    camera::{CameraController, DeviceStatus},
    error::{ApiError, AuthError},
    navigation::Route,
    session::{SessionHandoff, SessionStore},
};

use super::{AttemptPhase, FailureReason, RecognitionAttempt};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Default)]
struct PendingTasks {
    submission: Option<JoinHandle<()>>,
    proceed: Option<JoinHandle<()>>,
}

impl PendingTasks {
    fn abort_all(&mut self) {
        if let Some(handle) = self.submission.take() {
            handle.abort();
        }
        if let Some(handle) = self.proceed.take() {
            handle.abort();
        }
    }
}

/// Drives recognition attempts for one login view.
#[derive(Clone)]
pub struct RecognitionController {
    camera: CameraController,
    service: Arc<dyn RecognitionService>,
    sessions: SessionStore,
    attempt: Arc<Mutex<RecognitionAttempt>>,
    attempt_tx: Arc<watch::Sender<RecognitionAttempt>>,
    handoff_tx: Arc<watch::Sender<Option<SessionHandoff>>>,
    tasks: Arc<Mutex<PendingTasks>>,
    cancel: CancellationToken,
    proceed_delay: Duration,
}

impl RecognitionController {
    pub fn new(
        camera: CameraController,
        service: Arc<dyn RecognitionService>,
        sessions: SessionStore,
        proceed_delay: Duration,
    ) -> Self {
        let initial = RecognitionAttempt::idle();
        let (attempt_tx, _) = watch::channel(initial.clone());
        let (handoff_tx, _) = watch::channel(None);
        Self {
            camera,
            service,
            sessions,
            attempt: Arc::new(Mutex::new(initial)),
            attempt_tx: Arc::new(attempt_tx),
            handoff_tx: Arc::new(handoff_tx),
            tasks: Arc::new(Mutex::new(PendingTasks::default())),
            cancel: CancellationToken::new(),
            proceed_delay,
        }
    }

    pub async fn attempt(&self) -> RecognitionAttempt {
        self.attempt.lock().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RecognitionAttempt> {
        self.attempt_tx.subscribe()
    }

    pub fn handoffs(&self) -> watch::Receiver<Option<SessionHandoff>> {
        self.handoff_tx.subscribe()
    }

    pub fn handoff(&self) -> Option<SessionHandoff> {
        self.handoff_tx.borrow().clone()
    }

    /// Waits for the current attempt to succeed or fail.
    pub async fn outcome(&self) -> RecognitionAttempt {
        let mut rx = self.subscribe();
        let settled = rx
            .wait_for(RecognitionAttempt::is_settled)
            .await
            .map(|attempt| attempt.clone())
            .ok();
        match settled {
            Some(attempt) => attempt,
            None => self.attempt().await,
        }
    }

    /// Waits for the delayed hand-off after a successful attempt.
    pub async fn next_handoff(&self) -> Option<SessionHandoff> {
        let mut rx = self.handoffs();
        let handoff = rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|handoff| handoff.clone());
        handoff
    }

    /// Captures a frame and submits it. Returns once the submission is on
    /// its way; the result arrives through [`Self::subscribe`].
    pub async fn start(&self) -> Result<RecognitionAttempt, AuthError> {
        if self.cancel.is_cancelled() {
            return Err(AuthError::TornDown);
        }

        let id = {
            let mut attempt = self.attempt.lock().await;
            if attempt.is_in_flight() {
                return Err(AuthError::AttemptInFlight);
            }
            if !self.camera.is_ready().await {
                return Err(AuthError::CameraNotReady);
            }
            *attempt = RecognitionAttempt::begin();
            self.publish(&attempt);
            attempt.id
        };
        self.cancel_proceed().await;
        self.handoff_tx.send_replace(None);
        log_debug!("recognition attempt {id} capturing");

        let frame = match self.camera.capture_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                log_warn!("capture failed for attempt {id}: {err}");
                let mut attempt = self.attempt.lock().await;
                if attempt.id == id {
                    attempt.fail(FailureReason::Capture {
                        message: err.to_string(),
                    });
                    self.publish(&attempt);
                }
                return Err(err.into());
            }
        };

        let image = frame.into_data_url();
        let snapshot = {
            let mut attempt = self.attempt.lock().await;
            if self.cancel.is_cancelled() || attempt.id != id {
                return Err(AuthError::TornDown);
            }
            attempt.frame_captured(image.clone());
            self.publish(&attempt);
            attempt.clone()
        };

        self.spawn_submission(id, image).await;
        Ok(snapshot)
    }

    /// Starts over after a failure. A camera in error is re-acquired first
    /// and the caller is told to wait for it.
    pub async fn retry(&self) -> Result<RecognitionAttempt, AuthError> {
        if self.cancel.is_cancelled() {
            return Err(AuthError::TornDown);
        }

        let phase = self.attempt.lock().await.phase;
        if phase != AttemptPhase::Failed {
            return Err(AuthError::RetryNotPermitted(phase));
        }

        if self.camera.status().await == DeviceStatus::Error {
            log_info!("camera in error; re-acquiring before retry");
            self.camera.retry().await;
            return Err(AuthError::CameraNotReady);
        }

        self.start().await
    }

    /// Stops everything pending. Responses that arrive afterwards are dropped.
    pub async fn teardown(&self) {
        self.cancel.cancel();
        self.tasks.lock().await.abort_all();
        log_debug!("recognition controller torn down");
    }

    async fn spawn_submission(&self, id: Uuid, image: String) {
        let controller = self.clone();
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = controller.service.recognize(&image) => result,
            };
            controller.complete(id, result).await;
        });

        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.submission.replace(handle) {
            previous.abort();
        }
    }

    /// Applies a response to the attempt it belongs to, if that attempt is
    /// still the current one and still waiting.
    pub(crate) async fn complete(&self, id: Uuid, result: Result<RecognitionOutcome, ApiError>) {
        if self.cancel.is_cancelled() {
            log_debug!("dropping response for attempt {id} after teardown");
            return;
        }

        let mut attempt = self.attempt.lock().await;
        if attempt.id != id || attempt.phase != AttemptPhase::Submitting {
            log_debug!("dropping stale response for attempt {id}");
            return;
        }

        match result {
            Ok(RecognitionOutcome::Matched { user_name }) => {
                let login_time = Utc::now();
                if let Err(err) = self.sessions.create(&user_name, login_time).await {
                    log_error!("Failed to persist session for {user_name}: {err:#}");
                }
                log_info!("recognized {user_name}");
                attempt.succeed(user_name.clone());
                self.publish(&attempt);
                drop(attempt);

                self.schedule_proceed(SessionHandoff {
                    user_name,
                    login_time,
                    destination: Route::Welcome,
                })
                .await;
            }
            Ok(RecognitionOutcome::Rejected { reason }) => {
                log_info!("recognition rejected: {reason}");
                attempt.fail(FailureReason::Rejected { message: reason });
                self.publish(&attempt);
            }
            Err(err) => {
                log_warn!("recognition request failed: {err}");
                attempt.fail(FailureReason::from_api(&err));
                self.publish(&attempt);
            }
        }
    }

    async fn schedule_proceed(&self, handoff: SessionHandoff) {
        let handoff_tx = self.handoff_tx.clone();
        let cancel = self.cancel.clone();
        let delay = self.proceed_delay;

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = time::sleep(delay) => {
                    log_debug!("handing off {} to {}", handoff.user_name, handoff.destination);
                    handoff_tx.send_replace(Some(handoff));
                }
            }
        });

        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.proceed.replace(handle) {
            previous.abort();
        }
    }

    async fn cancel_proceed(&self) {
        if let Some(handle) = self.tasks.lock().await.proceed.take() {
            handle.abort();
        }
    }

    fn publish(&self, attempt: &RecognitionAttempt) {
        self.attempt_tx.send_replace(attempt.clone());
    }
}
