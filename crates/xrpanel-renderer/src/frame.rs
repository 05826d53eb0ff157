use crate::overlay::OverlayBatch;
use crate::scene::PanelScene;
use glam::Mat4;
use std::ops::Range;
use thiserror::Error;
use tracing::{debug, info, trace};
use xrpanel_config::{ButtonAction, PanelConfig};
use xrpanel_input::controller::{InteractionController, SelectOutcome};
use xrpanel_input::{PointerEvent, TrackedPointer};

/// Lifecycle of an interactive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session running, panels not placed yet.
    AwaitingPose,
    /// Panels placed and drawn every frame.
    Rendering,
    /// Terminal. Geometry and anchor are gone.
    SessionEnded,
}

/// Why a frame draws nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameSkip {
    #[error("No viewer pose this frame")]
    PoseUnavailable,
    #[error("Waiting for tracking to settle ({seen}/{needed} poses)")]
    Settling { seen: u32, needed: u32 },
    #[error("Session has ended")]
    SessionEnded,
}

/// A frame that will be drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStart {
    pub viewer: Mat4,
    /// Panels were (re)anchored to `viewer` this frame.
    pub placed: bool,
    /// Panel geometry changed this frame and must be re-uploaded.
    pub rebuilt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Main,
    Control,
}

/// One step of an eye's draw sequence, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Clear color and depth.
    Clear,
    Panel { kind: PanelKind, depth_write: bool },
    /// Overlay line list, depth test off.
    Ray { vertices: Range<u32> },
    /// Overlay closed line strip, depth test off.
    Cursor { vertices: Range<u32> },
}

/// Per-session context: panel config, placed scene, pointer interaction and
/// the flags that carry requests from input handling to the next frame.
pub struct FrameOrchestrator {
    state: SessionState,
    config: PanelConfig,
    /// Config the session started with. Restored when it ends.
    initial_config: PanelConfig,
    settle_frames: u32,
    poses_seen: u32,
    scene: PanelScene,
    controller: InteractionController,
    overlay: OverlayBatch,
    /// The last `begin_frame` produced a frame to draw.
    frame_active: bool,
    recenter_pending: bool,
    rebuild_pending: bool,
    repaint_pending: bool,
}

impl FrameOrchestrator {
    pub fn new(config: PanelConfig, settle_frames: u32, controller: InteractionController) -> Self {
        let config = config.normalized();
        Self {
            state: SessionState::AwaitingPose,
            config,
            initial_config: config,
            settle_frames: settle_frames.max(1),
            poses_seen: 0,
            scene: PanelScene::new(),
            controller,
            overlay: OverlayBatch::default(),
            frame_active: false,
            recenter_pending: false,
            rebuild_pending: false,
            repaint_pending: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn scene(&self) -> &PanelScene {
        &self.scene
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn overlay(&self) -> &OverlayBatch {
        &self.overlay
    }

    /// Start a frame with the host's viewer pose.
    ///
    /// The first placement waits for `settle_frames` posed frames. Once
    /// rendering, a pending recenter re-anchors the panels to this pose and
    /// a pending config change rebuilds them, both before anything is drawn.
    /// A skipped frame leaves pointer state alone until the next drawn one.
    pub fn begin_frame(&mut self, viewer: Option<Mat4>) -> Result<FrameStart, FrameSkip> {
        let start = self.start_frame(viewer);
        self.frame_active = start.is_ok();
        start
    }

    fn start_frame(&mut self, viewer: Option<Mat4>) -> Result<FrameStart, FrameSkip> {
        if self.state == SessionState::SessionEnded {
            return Err(FrameSkip::SessionEnded);
        }
        let Some(viewer) = viewer else {
            trace!(state = ?self.state, "No viewer pose");
            return Err(FrameSkip::PoseUnavailable);
        };

        match self.state {
            SessionState::AwaitingPose => {
                self.poses_seen += 1;
                if self.poses_seen < self.settle_frames {
                    return Err(FrameSkip::Settling {
                        seen: self.poses_seen,
                        needed: self.settle_frames,
                    });
                }

                self.scene.place(viewer, &self.config);
                self.state = SessionState::Rendering;
                self.recenter_pending = false;
                self.rebuild_pending = false;
                self.repaint_pending = true;
                info!(
                    distance = self.config.distance,
                    width = self.config.width,
                    curved = self.config.curved,
                    "Panels placed"
                );
                Ok(FrameStart {
                    viewer,
                    placed: true,
                    rebuilt: true,
                })
            }
            SessionState::Rendering => {
                let mut start = FrameStart {
                    viewer,
                    placed: false,
                    rebuilt: false,
                };
                if self.recenter_pending {
                    self.scene.place(viewer, &self.config);
                    self.recenter_pending = false;
                    self.rebuild_pending = false;
                    start.placed = true;
                    start.rebuilt = true;
                    info!("Panels recentered");
                } else if self.rebuild_pending {
                    start.rebuilt = self.scene.rebuild(&self.config);
                    self.rebuild_pending = false;
                }
                Ok(start)
            }
            SessionState::SessionEnded => Err(FrameSkip::SessionEnded),
        }
    }

    /// Cast this frame's pointers against the control panel and rebuild the
    /// ray and cursor geometry.
    pub fn update_pointers(&mut self, pointers: &[TrackedPointer]) -> &OverlayBatch {
        if self.state != SessionState::Rendering {
            self.overlay = OverlayBatch::default();
            return &self.overlay;
        }
        if !self.frame_active {
            return &self.overlay;
        }
        let control = self.scene.control_bounds();
        let visuals = self.controller.update(pointers, control);
        self.overlay = OverlayBatch::build(&visuals, control);
        &self.overlay
    }

    /// Route a pointer event. Only a confirmed select during a drawn frame
    /// does anything.
    pub fn handle_event(&mut self, event: PointerEvent) -> Option<SelectOutcome> {
        match event {
            PointerEvent::SelectStart(id) => {
                trace!(pointer = id.0, "Select started");
                None
            }
            PointerEvent::Select(id) => {
                if self.state != SessionState::Rendering || !self.frame_active {
                    return None;
                }
                let outcome = self.controller.select(id, &mut self.config);
                match outcome {
                    SelectOutcome::Applied(ButtonAction::Recenter) => self.request_recenter(),
                    SelectOutcome::Applied(_) => self.request_rebuild(),
                    SelectOutcome::NoIntersection | SelectOutcome::Missed => {}
                }
                Some(outcome)
            }
        }
    }

    /// Change the panel config from outside the control panel (hotkeys,
    /// reloaded settings). Takes the same rebuild path as button presses.
    pub fn update_config(&mut self, update: impl FnOnce(&mut PanelConfig)) {
        let before = self.config;
        update(&mut self.config);
        self.config = self.config.normalized();
        if self.config != before {
            debug!(?before, after = ?self.config, "Panel config changed");
            self.request_rebuild();
        }
    }

    /// Re-anchor the panels to the next frame's viewer pose.
    pub fn request_recenter(&mut self) {
        self.recenter_pending = true;
    }

    /// Rebuild geometry on the next frame and repaint both bitmaps.
    pub fn request_rebuild(&mut self) {
        self.rebuild_pending = true;
        self.repaint_pending = true;
    }

    /// Config to repaint the panel bitmaps with, once per change.
    pub fn take_repaint(&mut self) -> Option<PanelConfig> {
        if !self.repaint_pending || self.state != SessionState::Rendering {
            return None;
        }
        self.repaint_pending = false;
        Some(self.config)
    }

    /// Draw sequence for one eye: clear, opaque main panel, transparent
    /// control panel, then each pointer's ray and cursor on top.
    pub fn plan_eye(&self) -> Vec<DrawCommand> {
        let mut commands = vec![DrawCommand::Clear];
        if self.state != SessionState::Rendering || !self.scene.is_placed() {
            return commands;
        }

        commands.push(DrawCommand::Panel {
            kind: PanelKind::Main,
            depth_write: true,
        });
        commands.push(DrawCommand::Panel {
            kind: PanelKind::Control,
            depth_write: false,
        });
        for draw in &self.overlay.draws {
            commands.push(DrawCommand::Ray {
                vertices: draw.ray.clone(),
            });
            if let Some(cursor) = &draw.cursor {
                commands.push(DrawCommand::Cursor {
                    vertices: cursor.clone(),
                });
            }
        }
        commands
    }

    /// End the session. Drops geometry, anchor and config edits; no later
    /// frame renders.
    pub fn end_session(&mut self) {
        if self.state == SessionState::SessionEnded {
            return;
        }
        self.scene.clear();
        self.controller.update(&[], None);
        self.overlay = OverlayBatch::default();
        self.config = self.initial_config;
        self.poses_seen = 0;
        self.frame_active = false;
        self.recenter_pending = false;
        self.rebuild_pending = false;
        self.repaint_pending = false;
        self.state = SessionState::SessionEnded;
        info!("Session ended");
    }
}
