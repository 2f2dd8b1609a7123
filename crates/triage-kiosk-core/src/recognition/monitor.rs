//! The live triage monitor loop.

use chrono::NaiveDateTime;
use triage_kiosk_vision::{CameraGuard, FaceDetector, Frame, FrameSource, VisionResult};

use super::{correlate_frame, render_panel, resolve_panel, FrameView, PanelData, PanelView};
use super::{RecognitionResult, VectorStore};
use crate::config::KioskConfig;
use crate::db::Database;

/// What the operator asked for after a frame was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    Continue,
    Quit,
}

/// Surface that shows the feed with labelled boxes next to the panel.
pub trait TriageDisplay {
    fn present(
        &mut self,
        frame: &Frame,
        view: &FrameView,
        panel: &PanelView,
    ) -> VisionResult<DisplayEvent>;
}

/// One fully processed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TriageFrame {
    pub view: FrameView,
    pub data: PanelData,
    pub panel: PanelView,
}

/// Match, correlate and lay out a single frame.
pub fn process_frame<D: FaceDetector + ?Sized>(
    frame: &Frame,
    detector: &mut D,
    store: &VectorStore,
    db: &Database,
    config: &KioskConfig,
    now: NaiveDateTime,
) -> RecognitionResult<TriageFrame> {
    let view = correlate_frame(frame, detector, store, &config.recognition)?;
    let data = resolve_panel(db, &view.subject_identity(), now.date())?;
    let panel = render_panel(&data, &config.panel, now);
    Ok(TriageFrame { view, data, panel })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    ReadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub frames: usize,
    pub stop: StopReason,
}

/// Run until the operator quits or a frame cannot be read.
///
/// The camera stays owned by the caller's guard and is released when that
/// guard drops, whichever way this returns.
pub fn run_monitor<S, D, T, C>(
    camera: &mut CameraGuard<S>,
    detector: &mut D,
    display: &mut T,
    store: &VectorStore,
    db: &Database,
    config: &KioskConfig,
    mut clock: C,
) -> RecognitionResult<MonitorSummary>
where
    S: FrameSource,
    D: FaceDetector + ?Sized,
    T: TriageDisplay + ?Sized,
    C: FnMut() -> NaiveDateTime,
{
    log::info!("Triage monitor started");
    let mut frames = 0;

    loop {
        let frame = match camera.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::error!("Failed to grab frame.");
                return Ok(MonitorSummary {
                    frames,
                    stop: StopReason::ReadFailed,
                });
            }
            Err(e) => {
                log::error!("Failed to grab frame: {}", e);
                return Ok(MonitorSummary {
                    frames,
                    stop: StopReason::ReadFailed,
                });
            }
        };

        let triage = process_frame(&frame, detector, store, db, config, clock())?;
        frames += 1;

        if display.present(&frame, &triage.view, &triage.panel)? == DisplayEvent::Quit {
            log::info!("Triage monitor stopped after {} frames", frames);
            return Ok(MonitorSummary {
                frames,
                stop: StopReason::Quit,
            });
        }
    }
}
