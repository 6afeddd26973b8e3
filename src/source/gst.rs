use crate::config::CameraConfig;
use crate::error::{FacewatchError, Result};
use crate::frame::{FrameData, FrameFormat};
use crate::source::CaptureSource;

use async_trait::async_trait;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// GStreamer-backed camera source capturing MJPEG from a V4L2 device.
///
/// Samples are pushed from the appsink callback into a channel so
/// `read_frame` stays a plain async receive. A closed channel means
/// the pipeline hit end of stream.
pub struct GstCameraSource {
    config: CameraConfig,
    pipeline: Pipeline,
    frames: mpsc::UnboundedReceiver<gstreamer::Sample>,
    frame_counter: u64,
}

impl GstCameraSource {
    /// Bind the camera device and start the capture pipeline
    pub fn open(config: CameraConfig) -> Result<Self> {
        gstreamer::init().map_err(|e| {
            FacewatchError::camera(format!("Failed to initialize GStreamer: {}", e))
        })?;

        let pipeline_desc = Self::build_pipeline_string(&config);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| FacewatchError::camera(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| FacewatchError::camera("Failed to downcast to Pipeline"))?;

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| FacewatchError::camera("Failed to get appsink element"))?
            .downcast::<AppSink>()
            .map_err(|_| FacewatchError::camera("Failed to downcast to AppSink"))?;

        let (tx, rx) = mpsc::unbounded_channel();
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let _ = tx.send(sample);
                    Ok(gstreamer::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            FacewatchError::camera(format!(
                "Failed to bind camera device {}: {}",
                config.index, e
            ))
        })?;

        info!("GStreamer pipeline started for device {}", config.index);
        Ok(Self {
            config,
            pipeline,
            frames: rx,
            frame_counter: 0,
        })
    }

    fn build_pipeline_string(config: &CameraConfig) -> String {
        let (width, height) = config.resolution;
        format!(
            "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
             image/jpeg,width={},height={},framerate={}/1 ! \
             queue max-size-buffers=4 leaky=downstream ! \
             appsink name=sink sync=false max-buffers=10 drop=false qos=false enable-last-sample=false emit-signals=false",
            config.index, width, height, config.fps
        )
    }

    fn sample_to_frame(&mut self, sample: gstreamer::Sample) -> Result<FrameData> {
        let buffer = sample
            .buffer()
            .ok_or_else(|| FacewatchError::camera("No buffer in sample"))?;

        let caps = sample
            .caps()
            .ok_or_else(|| FacewatchError::camera("No caps in sample"))?;

        let video_info = VideoInfo::from_caps(caps)
            .map_err(|e| FacewatchError::camera(format!("Failed to get video info: {}", e)))?;

        let map = buffer
            .map_readable()
            .map_err(|e| FacewatchError::camera(format!("Failed to map buffer: {}", e)))?;

        let frame_id = self.frame_counter;
        self.frame_counter += 1;

        let frame = FrameData::new(
            frame_id,
            SystemTime::now(),
            map.as_slice().to_vec(),
            video_info.width(),
            video_info.height(),
            FrameFormat::Mjpeg,
        );

        trace!(
            "Captured MJPEG frame {} ({}x{}, {} bytes)",
            frame_id,
            frame.width,
            frame.height,
            frame.data.len()
        );
        Ok(frame)
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}

#[async_trait]
impl CaptureSource for GstCameraSource {
    async fn read_frame(&mut self) -> Result<Option<FrameData>> {
        match self.frames.recv().await {
            Some(sample) => Ok(Some(self.sample_to_frame(sample)?)),
            None => {
                debug!("GStreamer sample channel closed, stream ended");
                Ok(None)
            }
        }
    }

    async fn release(&mut self) -> Result<()> {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop GStreamer pipeline cleanly: {}", e);
        }
        self.frames.close();
        info!("Camera device {} released", self.config.index);
        Ok(())
    }
}
