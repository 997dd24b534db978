// Opens a camera and hands out frames on request.
// The nokhwa camera lives on its own worker thread; the render loop asks for
// a frame and awaits the reply, so the window never blocks on the device.

use crate::error::Error;
use crate::types::FrameBuffer;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use std::sync::mpsc;
use std::thread;

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
        Resolution,
    },
};

/// A pending frame. Owns nothing of the source, so the source can be dropped mid-flight.
pub type FrameRequest = LocalBoxFuture<'static, Result<FrameBuffer, Error>>;

/// A live stream of still images. Dropping it releases the device.
pub trait VideoSource {
    /// Ask for the next frame. Resolves once the device delivers (or fails).
    fn next_frame(&mut self) -> FrameRequest;
}

/// Something that can produce a video source when capture starts.
pub trait Acquire {
    type Source: VideoSource + 'static;

    fn acquire(&mut self) -> Result<Self::Source, Error>;
}

/// Which camera to open and what format to ask it for.
#[derive(Clone, Copy, Debug)]
pub struct CameraRequest {
    pub index: u32,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Acquire for CameraRequest {
    type Source = CameraFeed;

    fn acquire(&mut self) -> Result<CameraFeed, Error> {
        CameraFeed::open(*self)
    }
}

type FrameReply = oneshot::Sender<Result<FrameBuffer, Error>>;

/// Handle to the camera worker. Dropping it closes the stream and waits for the
/// worker to let go of the device, so the same camera can be reopened right away.
pub struct CameraFeed {
    requests: Option<mpsc::Sender<FrameReply>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl CameraFeed {
    /// Open the camera on a worker thread and wait until the stream is up.
    /// On success, nothing is shown on screen yet; we just hold an open stream.
    pub fn open(req: CameraRequest) -> Result<Self, Error> {
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(u32, u32), Error>>(1);
        let (requests, request_rx) = mpsc::channel::<FrameReply>();

        let worker = thread::Builder::new()
            .name(format!("camera-{}", req.index))
            .spawn(move || {
                let mut cam = match open_camera(req) {
                    Ok(cam) => cam,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let actual = cam.resolution();
                if ready_tx.send(Ok((actual.width(), actual.height()))).is_err() {
                    return;
                }

                // One frame per request; stops when the feed handle is dropped.
                while let Ok(reply) = request_rx.recv() {
                    let frame = grab_frame(&mut cam);
                    if reply.send(frame).is_err() {
                        log::debug!("frame arrived after its request was cancelled; discarded");
                    }
                }
                log::debug!("camera worker exiting");
            })
            .map_err(|e| Error::CameraInit(format!("Spawn camera thread: {e}")))?;

        let ready = ready_rx
            .recv()
            .map_err(|_| Error::CameraInit("camera thread exited during startup".into()))
            .and_then(|opened| opened);
        let (width, height) = match ready {
            Ok(size) => size,
            Err(e) => {
                // The worker is already on its way out; make sure it is gone.
                let _ = worker.join();
                return Err(e);
            }
        };
        log::info!("camera {} streaming at {width}x{height}", req.index);

        Ok(Self { requests: Some(requests), worker: Some(worker) })
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop after any frame in progress.
        self.requests = None;
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("camera worker panicked");
            }
        }
        log::debug!("camera released");
    }
}

impl VideoSource for CameraFeed {
    fn next_frame(&mut self) -> FrameRequest {
        let (reply, frame) = oneshot::channel();
        let sent = match &self.requests {
            Some(requests) => requests.send(reply).is_ok(),
            None => false,
        };
        Box::pin(async move {
            if !sent {
                return Err(Error::CameraFrame("camera worker is gone".into()));
            }
            frame
                .await
                .map_err(|_| Error::CameraFrame("camera worker dropped the request".into()))?
        })
    }
}

fn open_camera(req: CameraRequest) -> Result<Camera, Error> {
    let fmt = CameraFormat::new(
        Resolution::new(req.width, req.height),
        FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
        req.fps,
    );

    // Ask for RGB frames closest to what we asked for.
    let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

    // This fails if no device exists or permission is denied.
    let mut cam = Camera::new(CameraIndex::Index(req.index), requested)
        .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;

    cam.open_stream()
        .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

    Ok(cam)
}

/// Grab one frame from the camera and convert it to 0x00RRGGBB pixels.
fn grab_frame(cam: &mut Camera) -> Result<FrameBuffer, Error> {
    // Blocks until a new frame is ready.
    let frame = cam
        .frame()
        .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

    let rgb = frame
        .decode_image::<RgbFormat>()
        .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

    let (w, h) = rgb.dimensions();
    Ok(FrameBuffer::from_rgb8(w as usize, h as usize, rgb.as_raw()))
}

/// Print every camera the platform backend can see.
pub fn list_cameras() -> Result<(), Error> {
    let cameras = nokhwa::query(ApiBackend::Auto)
        .map_err(|e| Error::CameraInit(format!("Query cameras: {e}")))?;
    println!("{:<5} | {:<30} | {}", "Index", "Name", "Description");
    println!("{}", "-".repeat(60));
    for cam in cameras {
        println!("{:<5} | {:<30} | {}", cam.index(), cam.human_name(), cam.description());
    }
    Ok(())
}
