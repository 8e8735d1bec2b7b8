//! Single stop path shared by the listening and spectrogram views

use crate::capture::CaptureStream;
use crate::session::MatchTransport;
use crate::visual::RedrawLoop;

/// Releases the device, closes the transport and stops the redraw loop.
///
/// Runs at most once; later calls are no-ops.
#[derive(Default)]
pub struct Teardown {
    capture: Option<CaptureStream>,
    transport: Option<Box<dyn MatchTransport>>,
    redraw: Option<RedrawLoop>,
    done: bool,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_capture(&mut self, capture: CaptureStream) {
        self.capture = Some(capture);
    }

    pub fn set_transport(&mut self, transport: Box<dyn MatchTransport>) {
        self.transport = Some(transport);
    }

    pub fn set_redraw(&mut self, redraw: RedrawLoop) {
        self.redraw = Some(redraw);
    }

    pub fn capture(&self) -> Option<&CaptureStream> {
        self.capture.as_ref()
    }

    /// Open transport, if any, while the session is live
    pub fn transport_mut(&mut self) -> Option<&mut Box<dyn MatchTransport>> {
        if self.done {
            return None;
        }
        self.transport.as_mut()
    }

    /// Returns `false` if teardown already ran
    pub async fn run(&mut self) -> bool {
        if self.done {
            return false;
        }
        self.done = true;

        if let Some(capture) = self.capture.take() {
            capture.release().await;
        }
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                log::warn!("Closing connection failed: {}", e);
            }
        }
        if let Some(redraw) = self.redraw.as_mut() {
            redraw.stop();
        }
        log::debug!("Teardown complete");
        true
    }

    /// Hand back the redraw loop after teardown so its final state can be read
    pub fn take_redraw(&mut self) -> Option<RedrawLoop> {
        self.redraw.take()
    }
}
