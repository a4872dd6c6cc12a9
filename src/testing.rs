//! In-crate fakes shared by the controller tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    api::{RecognitionOutcome, RecognitionService},
    camera::{CaptureBackend, DeviceBinding, RawFrame},
    error::{ApiError, DeviceError},
};

#[derive(Debug, Clone)]
pub(crate) enum FakeBehavior {
    Ready,
    ReadyAfter(Duration),
    Fail(DeviceError),
    Hang,
    /// Opens fine but every grab comes back empty.
    Empty,
}

/// Capture backend that counts live bindings.
pub(crate) struct FakeCamera {
    behavior: Mutex<FakeBehavior>,
    opens: AtomicUsize,
    live: Arc<AtomicUsize>,
}

impl FakeCamera {
    pub(crate) fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            opens: AtomicUsize::new(0),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn set_behavior(&self, behavior: FakeBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub(crate) fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn live_bindings(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    fn bind(&self, empty: bool) -> Box<dyn DeviceBinding> {
        self.live.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeBinding {
            live: self.live.clone(),
            released: false,
            empty,
        })
    }
}

#[async_trait]
impl CaptureBackend for FakeCamera {
    async fn open(&self) -> Result<Box<dyn DeviceBinding>, DeviceError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            FakeBehavior::Ready => Ok(self.bind(false)),
            FakeBehavior::ReadyAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.bind(false))
            }
            FakeBehavior::Fail(err) => Err(err),
            FakeBehavior::Hang => std::future::pending().await,
            FakeBehavior::Empty => Ok(self.bind(true)),
        }
    }
}

struct FakeBinding {
    live: Arc<AtomicUsize>,
    released: bool,
    empty: bool,
}

impl DeviceBinding for FakeBinding {
    fn grab(&mut self) -> Result<Option<RawFrame>, DeviceError> {
        if self.released || self.empty {
            return Ok(None);
        }
        Ok(Some(RawFrame::Rgb {
            width: 4,
            height: 4,
            pixels: vec![200; 4 * 4 * 3],
        }))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for FakeBinding {
    fn drop(&mut self) {
        self.release();
    }
}

/// Recognition service answering from a script, optionally after a delay.
pub(crate) struct FakeRecognizer {
    script: Mutex<VecDeque<Result<RecognitionOutcome, ApiError>>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeRecognizer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, response: Result<RecognitionOutcome, ApiError>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub(crate) fn matched(name: &str) -> Result<RecognitionOutcome, ApiError> {
        Ok(RecognitionOutcome::Matched {
            user_name: name.to_string(),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionService for FakeRecognizer {
    async fn recognize(&self, _image: &str) -> Result<RecognitionOutcome, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ApiError::Transport("no scripted response".into())))
    }
}
