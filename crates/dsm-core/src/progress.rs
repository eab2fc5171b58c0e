use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};

use crate::types::DSMPayload;

/// One frame of the progress stream.
///
/// `Progress` frames are free-form human-readable strings; `Error` and
/// `Complete` are terminal — exactly one of them closes the channel, and the
/// reader stops after receiving either.
#[derive(Debug, Clone)]
pub enum Frame {
    Progress(String),
    Error(String),
    Complete(DSMPayload),
}

/// Single-producer half of the progress channel.
///
/// `progress` frames are sent with `try_send`: under back-pressure they are
/// silently dropped rather than blocking the pipeline. `error`/`complete`
/// are terminal and use a blocking `send` — every run must end in one or
/// the other, so those two are never allowed to drop.
#[derive(Clone)]
pub struct ProgressSender {
    inner: SyncSender<Frame>,
}

impl ProgressSender {
    pub fn progress(&self, message: impl Into<String>) {
        match self.inner.try_send(Frame::Progress(message.into())) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        let _ = self.inner.send(Frame::Error(message.into()));
    }

    pub fn complete(&self, payload: DSMPayload) {
        let _ = self.inner.send(Frame::Complete(payload));
    }
}

/// Single-consumer half of the progress channel. Frames are strictly
/// ordered with respect to the phase that produced them.
pub struct ProgressReceiver {
    inner: Receiver<Frame>,
}

impl ProgressReceiver {
    pub fn recv(&self) -> Option<Frame> {
        self.inner.recv().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = Frame> + '_ {
        self.inner.iter()
    }
}

/// Default buffer depth for the bounded channel. Small on purpose: this is
/// a progress ticker, not a log — a slow reader should see the channel fill
/// and start dropping `progress` frames rather than stall the pipeline.
const DEFAULT_BUFFER: usize = 32;

pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = mpsc::sync_channel(DEFAULT_BUFFER);
    (ProgressSender { inner: tx }, ProgressReceiver { inner: rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_frame_is_delivered() {
        let (tx, rx) = channel();
        tx.progress("cloning");
        tx.complete(DSMPayload::empty("main"));
        let frames: Vec<Frame> = rx.iter().collect();
        assert!(matches!(frames.first(), Some(Frame::Progress(_))));
        assert!(matches!(frames.last(), Some(Frame::Complete(_))));
    }

    #[test]
    fn error_frame_is_delivered() {
        let (tx, rx) = channel();
        tx.error("boom");
        assert!(matches!(rx.recv(), Some(Frame::Error(msg)) if msg == "boom"));
    }
}
