use crate::error::Result;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Receives interleaved samples from the input's delivery thread
pub type SampleCallback = Box<dyn FnMut(&[f32]) + Send + 'static>;

/// A source of live audio
pub trait AudioInput: Send {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Begin delivering samples to `callback`
    fn start(&mut self, callback: SampleCallback) -> Result<()>;

    /// Stop delivery and release the underlying device
    fn stop(&mut self);

    /// The source has delivered everything it ever will
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Flag raised once the source is exhausted, for observers on other threads
    fn exhaustion_flag(&self) -> Option<Arc<AtomicBool>> {
        None
    }

    /// Set once the device stopped delivering because of an error.
    ///
    /// A finite source running out of samples is not a failure.
    fn failure(&self) -> Option<String> {
        None
    }
}
