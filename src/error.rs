// One error type for the whole app.
// Every variant states *where* things went wrong.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Creating the window failed.
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Updating the window buffer failed.
    #[error("Window update error: {0}")]
    WindowUpdate(String),

    /// Opening/starting the camera failed (no device, no permission).
    #[error("Camera init error: {0}")]
    CameraInit(String),

    /// Grabbing/decoding a single frame failed.
    #[error("Camera frame error: {0}")]
    CameraFrame(String),

    /// The drawing surface was gone before the render loop could start.
    #[error("Drawing surface unavailable")]
    SurfaceUnavailable,

    /// The executor refused to take the render loop task.
    #[error("Could not schedule render loop: {0}")]
    Spawn(#[from] futures::task::SpawnError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failing_stage() {
        let e = Error::CameraInit("Open stream: busy".into());
        assert_eq!(e.to_string(), "Camera init error: Open stream: busy");
        assert_eq!(Error::SurfaceUnavailable.to_string(), "Drawing surface unavailable");
    }
}
