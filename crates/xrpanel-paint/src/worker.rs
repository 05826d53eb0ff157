use crate::{Bitmap, PaintRequest, PaintTarget, PanelPainter};
use thiserror::Error;
use tokio::sync::mpsc;
use xrpanel_config::PanelConfig;

#[derive(Debug, Error)]
pub enum RepaintError {
    #[error("Repaint worker has stopped")]
    WorkerStopped,
}

/// A finished repaint.
#[derive(Debug, Clone)]
pub struct PaintedBitmap {
    pub target: PaintTarget,
    pub bitmap: Bitmap,
}

/// Newest finished bitmap per panel, as drained by `RepaintWorker::poll`.
#[derive(Debug, Default)]
pub struct Repainted {
    pub main: Option<Bitmap>,
    pub control: Option<Bitmap>,
}

impl Repainted {
    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.control.is_none()
    }
}

/// Runs the panel painters off the frame loop.
///
/// Requests are queued without blocking; results are picked up with
/// `poll` on a later frame. Until then the renderer keeps showing the
/// previous texture.
pub struct RepaintWorker {
    request_tx: mpsc::UnboundedSender<PaintRequest>,
    result_rx: mpsc::UnboundedReceiver<PaintedBitmap>,
    _task: tokio::task::JoinHandle<()>,
}

impl RepaintWorker {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(main: Box<dyn PanelPainter>, control: Box<dyn PanelPainter>) -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(repaint_loop(request_rx, result_tx, main, control));
        Self {
            request_tx,
            result_rx,
            _task: task,
        }
    }

    pub fn request(&self, target: PaintTarget, config: PanelConfig) -> Result<(), RepaintError> {
        self.request_tx
            .send(PaintRequest { target, config })
            .map_err(|_| RepaintError::WorkerStopped)
    }

    /// Ask for both panels to be repainted.
    pub fn request_all(&self, config: PanelConfig) -> Result<(), RepaintError> {
        self.request(PaintTarget::Main, config)?;
        self.request(PaintTarget::Control, config)
    }

    /// Drain finished repaints without blocking. Later results replace
    /// earlier ones for the same panel.
    pub fn poll(&mut self) -> Repainted {
        let mut repainted = Repainted::default();
        while let Ok(painted) = self.result_rx.try_recv() {
            match painted.target {
                PaintTarget::Main => repainted.main = Some(painted.bitmap),
                PaintTarget::Control => repainted.control = Some(painted.bitmap),
            }
        }
        repainted
    }

    /// Wait for the next finished repaint.
    pub async fn recv(&mut self) -> Option<PaintedBitmap> {
        self.result_rx.recv().await
    }
}

/// Background task: paint requests in order, skipping requests that a
/// newer one for the same panel already supersedes. Painting runs on the
/// blocking pool; the painter is handed over for the call and returned.
async fn repaint_loop(
    mut request_rx: mpsc::UnboundedReceiver<PaintRequest>,
    result_tx: mpsc::UnboundedSender<PaintedBitmap>,
    main: Box<dyn PanelPainter>,
    control: Box<dyn PanelPainter>,
) {
    let mut main = Some(main);
    let mut control = Some(control);

    while let Some(first) = request_rx.recv().await {
        let mut batch = vec![first];
        while let Ok(next) = request_rx.try_recv() {
            batch.retain(|r| r.target != next.target);
            batch.push(next);
        }

        for request in batch {
            let slot = match request.target {
                PaintTarget::Main => &mut main,
                PaintTarget::Control => &mut control,
            };
            let Some(mut painter) = slot.take() else {
                continue;
            };
            let config = request.config;
            let joined = tokio::task::spawn_blocking(move || {
                let result = painter.paint(&config);
                (painter, result)
            })
            .await;

            let result = match joined {
                Ok((painter, result)) => {
                    *slot = Some(painter);
                    result
                }
                Err(e) => {
                    tracing::error!(
                        ?e,
                        target_panel = ?request.target,
                        "Painter panicked, panel no longer repaints"
                    );
                    continue;
                }
            };

            match result {
                Ok(bitmap) => {
                    tracing::debug!(
                        target_panel = ?request.target,
                        width = bitmap.width,
                        height = bitmap.height,
                        "Repaint finished"
                    );
                    let painted = PaintedBitmap {
                        target: request.target,
                        bitmap,
                    };
                    if result_tx.send(painted).is_err() {
                        tracing::debug!("Repaint receiver dropped, stopping worker");
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(?e, target_panel = ?request.target, "Repaint failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    /// Paints a 1x1 bitmap whose red channel encodes the requested width.
    struct WidthPainter;

    impl PanelPainter for WidthPainter {
        fn paint(&mut self, config: &PanelConfig) -> Result<Bitmap> {
            Ok(Bitmap::filled(1, 1, [(config.width * 10.0).round() as u8, 0, 0, 255]))
        }
    }

    struct Failing;

    impl PanelPainter for Failing {
        fn paint(&mut self, _config: &PanelConfig) -> Result<Bitmap> {
            anyhow::bail!("no content")
        }
    }

    #[tokio::test]
    async fn repaint_arrives_asynchronously() {
        let mut worker = RepaintWorker::spawn(Box::new(WidthPainter), Box::new(WidthPainter));
        worker
            .request(PaintTarget::Control, PanelConfig::new(2.5, 3.0, false))
            .unwrap();
        let painted = worker.recv().await.unwrap();
        assert_eq!(painted.target, PaintTarget::Control);
        assert_eq!(painted.bitmap.pixel(0, 0)[0], 30);
    }

    #[tokio::test]
    async fn poll_keeps_latest_per_panel() {
        let mut worker = RepaintWorker::spawn(Box::new(WidthPainter), Box::new(WidthPainter));
        worker.request_all(PanelConfig::new(2.5, 2.0, false)).unwrap();
        worker.request_all(PanelConfig::new(2.5, 4.0, false)).unwrap();

        // Wait until the newest control repaint has landed, then check that
        // nothing older is reported after it.
        let mut latest_control = None;
        while latest_control != Some(40) {
            let painted = worker.recv().await.unwrap();
            if painted.target == PaintTarget::Control {
                latest_control = Some(painted.bitmap.pixel(0, 0)[0]);
            }
        }
        let rest = worker.poll();
        if let Some(control) = rest.control {
            assert_eq!(control.pixel(0, 0)[0], 40);
        }
    }

    #[tokio::test]
    async fn failing_painter_does_not_stop_worker() {
        let mut worker = RepaintWorker::spawn(Box::new(Failing), Box::new(WidthPainter));
        worker.request_all(PanelConfig::default()).unwrap();
        let painted = worker.recv().await.unwrap();
        assert_eq!(painted.target, PaintTarget::Control);
    }

    /// Takes a while, like painting a full-size bitmap.
    struct SlowPainter;

    impl PanelPainter for SlowPainter {
        fn paint(&mut self, _config: &PanelConfig) -> Result<Bitmap> {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(Bitmap::filled(1, 1, [0, 0, 0, 255]))
        }
    }

    struct Panicking;

    impl PanelPainter for Panicking {
        fn paint(&mut self, _config: &PanelConfig) -> Result<Bitmap> {
            panic!("painter bug")
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn slow_paint_leaves_runtime_responsive() {
        let mut worker = RepaintWorker::spawn(Box::new(SlowPainter), Box::new(SlowPainter));
        worker.request(PaintTarget::Main, PanelConfig::default()).unwrap();

        // A single runtime thread still wakes on time while the paint runs.
        let started = std::time::Instant::now();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(started.elapsed() < std::time::Duration::from_millis(150));
        assert!(worker.poll().is_empty());

        let painted = worker.recv().await.unwrap();
        assert_eq!(painted.target, PaintTarget::Main);
    }

    #[tokio::test]
    async fn panicking_painter_leaves_other_panel_working() {
        let mut worker = RepaintWorker::spawn(Box::new(Panicking), Box::new(WidthPainter));
        worker.request_all(PanelConfig::default()).unwrap();
        let painted = worker.recv().await.unwrap();
        assert_eq!(painted.target, PaintTarget::Control);

        worker.request_all(PanelConfig::new(2.5, 3.0, false)).unwrap();
        let painted = worker.recv().await.unwrap();
        assert_eq!(painted.target, PaintTarget::Control);
        assert_eq!(painted.bitmap.pixel(0, 0)[0], 30);
    }

    #[tokio::test]
    async fn empty_poll_is_empty() {
        let mut worker = RepaintWorker::spawn(Box::new(WidthPainter), Box::new(WidthPainter));
        assert!(worker.poll().is_empty());
    }
}
