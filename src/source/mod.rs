#[cfg(all(target_os = "linux", feature = "camera"))]
pub mod gst;

use crate::error::Result;
use crate::frame::{FrameData, FrameFormat};

use async_trait::async_trait;
use std::time::SystemTime;
use tracing::{debug, info};

#[cfg(all(target_os = "linux", feature = "camera"))]
pub use gst::GstCameraSource;

/// Source of video frames for the pipeline.
///
/// `read_frame` yields `Ok(None)` at end of stream; errors are
/// reserved for faults on a stream that was expected to continue.
#[async_trait]
pub trait CaptureSource: Send {
    /// Pull the next frame, or `None` when the stream has ended
    async fn read_frame(&mut self) -> Result<Option<FrameData>>;

    /// Release the underlying device or resources
    async fn release(&mut self) -> Result<()>;
}

/// Deterministic frame source driven by a presence script.
///
/// Each script entry produces one RGB24 frame: `true` renders a
/// bright block on a dark background, `false` renders the background
/// alone. The stream ends when the script is exhausted. Used for
/// tests and for exercising the pipeline without camera hardware.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    script: Vec<bool>,
    cursor: usize,
    frame_counter: u64,
    released: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32, script: Vec<bool>) -> Self {
        info!(
            "Synthetic source ready: {} scripted frame(s) at {}x{}",
            script.len(),
            width,
            height
        );
        Self {
            width,
            height,
            script,
            cursor: 0,
            frame_counter: 0,
            released: false,
        }
    }

    pub fn released(&self) -> bool {
        self.released
    }

    fn render(&self, present: bool) -> Vec<u8> {
        let mut data = vec![16u8; (self.width * self.height * 3) as usize];
        if present {
            // Centered block covering a quarter of each dimension
            let bw = (self.width / 4).max(1);
            let bh = (self.height / 4).max(1);
            let x0 = (self.width - bw) / 2;
            let y0 = (self.height - bh) / 2;
            for y in y0..(y0 + bh) {
                for x in x0..(x0 + bw) {
                    let idx = ((y * self.width + x) * 3) as usize;
                    data[idx] = 240;
                    data[idx + 1] = 240;
                    data[idx + 2] = 240;
                }
            }
        }
        data
    }
}

#[async_trait]
impl CaptureSource for SyntheticSource {
    async fn read_frame(&mut self) -> Result<Option<FrameData>> {
        if self.cursor >= self.script.len() {
            debug!("Synthetic source exhausted after {} frames", self.frame_counter);
            return Ok(None);
        }

        let present = self.script[self.cursor];
        self.cursor += 1;

        let frame = FrameData::new(
            self.frame_counter,
            SystemTime::now(),
            self.render(present),
            self.width,
            self.height,
            FrameFormat::Rgb24,
        );
        self.frame_counter += 1;

        Ok(Some(frame))
    }

    async fn release(&mut self) -> Result<()> {
        self.released = true;
        debug!("Synthetic source released");
        Ok(())
    }
}
