//! Time-sliced layer-by-layer reveal of a voxel field
//!
//! [`ScanlineRevealer`] is a pollable state machine: the host calls
//! [`step`](ScanlineRevealer::step) once per tick with the elapsed time and
//! the state of its hold control, and gets back what happened. At most one
//! layer is revealed per call; leftover time is not carried into the next
//! layer.
//!
//! Holding the control pauses a running reveal for up to the pause budget.
//! The budget is spent once per run and only refilled when a run completes
//! or on [`reset_pause_budget`](ScanlineRevealer::reset_pause_budget).

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::ScanlineConfig;
use crate::field::VoxelField;
use crate::types::GridSize;

/// Rotations smaller than this (degrees) are treated as none
const ROTATION_EPSILON: f32 = 0.001;

/// Remaining wait below this (seconds) counts as elapsed
const WAIT_EPSILON: f32 = 1e-4;

/// Cross-section painted into each layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanlineShape {
    /// Binary fill inside the rotated half extents
    Rectangle,
    /// Radial falloff reaching 0 at the rim
    #[default]
    Ellipse,
}

impl ScanlineShape {
    /// The other shape
    pub fn toggled(self) -> Self {
        match self {
            ScanlineShape::Rectangle => ScanlineShape::Ellipse,
            ScanlineShape::Ellipse => ScanlineShape::Rectangle,
        }
    }
}

/// Revealer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanlineState {
    /// Not revealing
    Idle,
    /// Revealing layers
    Running,
}

/// Outcome of one [`ScanlineRevealer::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanlineStep {
    /// Nothing to do
    Idle,
    /// Held before start; the budget is draining toward an automatic start
    Armed,
    /// Running, the hold control froze the wait
    Paused,
    /// Running, waiting for the next layer
    Waiting,
    /// Layer `y` was written; the mesh needs a rebuild
    LayerRevealed(usize),
    /// Every layer has been revealed; back to idle
    Completed,
}

/// What a renderer needs to draw the scanline indicator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanlinePreview {
    /// Active cross-section
    pub shape: ScanlineShape,
    /// Layer the indicator sits on
    pub layer: usize,
    /// Center of the indicator in the field's local space
    pub position: Vec3,
    /// Rotation about the layer's up axis, in degrees
    pub rotation_degrees: f32,
    /// Half extents along local X and Z
    pub extents: Vec2,
}

/// Layer-by-layer reveal driven by [`step`](Self::step)
#[derive(Debug, Clone)]
pub struct ScanlineRevealer {
    config: ScanlineConfig,
    state: ScanlineState,
    next_layer: usize,
    wait: f32,
    pause_budget: f32,
    pending_start: bool,
    held: bool,
}

impl Default for ScanlineRevealer {
    fn default() -> Self {
        Self::new(ScanlineConfig::default())
    }
}

impl ScanlineRevealer {
    /// Idle revealer with a full pause budget
    pub fn new(config: ScanlineConfig) -> Self {
        ScanlineRevealer {
            config,
            state: ScanlineState::Idle,
            next_layer: 0,
            wait: 0.0,
            pause_budget: config.pause_budget_seconds.max(0.0),
            pending_start: false,
            held: false,
        }
    }

    /// Current settings, including scale/shape changes made by input
    pub fn config(&self) -> &ScanlineConfig {
        &self.config
    }

    /// Replace the settings; progress of a running reveal is kept
    pub fn set_config(&mut self, config: ScanlineConfig) {
        self.config = config;
        if !self.is_running() {
            self.pause_budget = config.pause_budget_seconds.max(0.0);
        }
    }

    /// Lifecycle state
    pub fn state(&self) -> ScanlineState {
        self.state
    }

    /// `true` while revealing
    pub fn is_running(&self) -> bool {
        self.state == ScanlineState::Running
    }

    /// Held before start, waiting for release or budget exhaustion
    pub fn is_armed(&self) -> bool {
        self.pending_start
    }

    /// Next layer to be revealed
    pub fn next_layer(&self) -> usize {
        self.next_layer
    }

    /// Remaining pause budget in seconds
    pub fn pause_budget(&self) -> f32 {
        self.pause_budget
    }

    /// Refill the pause budget
    pub fn reset_pause_budget(&mut self) {
        self.pause_budget = self.config.pause_budget_seconds.max(0.0);
    }

    /// Active cross-section
    pub fn shape(&self) -> ScanlineShape {
        self.config.shape
    }

    /// Cross-section scale along X and Z
    pub fn scale(&self) -> Vec2 {
        Vec2::new(self.config.scale_x, self.config.scale_z)
    }

    /// Begin revealing from layer 0
    ///
    /// Returns `false`, changing nothing, when already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.state = ScanlineState::Running;
        self.next_layer = 0;
        self.wait = 0.0;
        self.pending_start = false;
        log::debug!("scanline reveal started at {} layers/s", self.layers_per_second());
        true
    }

    #[inline]
    fn layers_per_second(&self) -> f32 {
        self.config.layers_per_second.max(0.01)
    }

    /// Advance by `dt` seconds
    ///
    /// `held` is the current state of the hold control. Press edges while
    /// idle arm a pending start; see the module docs for the pause rules.
    pub fn step(&mut self, dt: f32, held: bool, field: &mut VoxelField) -> ScanlineStep {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        let pressed = held && !self.held;
        self.held = held;

        if !self.is_running() {
            if pressed && !self.pending_start {
                self.pending_start = true;
                self.reset_pause_budget();
            }
            if !self.pending_start {
                return ScanlineStep::Idle;
            }
            if held {
                self.pause_budget -= dt;
                if self.pause_budget > 0.0 {
                    return ScanlineStep::Armed;
                }
                self.pause_budget = 0.0;
            }
            self.start();
        }

        if self.wait > 0.0 {
            if held && self.pause_budget > 0.0 {
                self.pause_budget = (self.pause_budget - dt).max(0.0);
                return ScanlineStep::Paused;
            }
            self.wait -= dt;
            if self.wait > WAIT_EPSILON {
                return ScanlineStep::Waiting;
            }
        }

        if self.next_layer >= field.size().y() {
            self.state = ScanlineState::Idle;
            self.wait = 0.0;
            self.reset_pause_budget();
            log::info!("scanline reveal completed: {} layers", self.next_layer);
            return ScanlineStep::Completed;
        }

        let y = self.next_layer;
        self.reveal_layer(field, y);
        self.next_layer += 1;
        self.wait = 1.0 / self.layers_per_second();
        log::trace!("scanline revealed layer {}", y);
        ScanlineStep::LayerRevealed(y)
    }

    /// Paint layer `y` with the current cross-section and fill color
    pub fn reveal_layer(&self, field: &mut VoxelField, y: usize) {
        let size = field.size();
        if y >= size.y() {
            return;
        }
        let color = field.fill_color();
        let grid = field.grid_mut();
        for x in 0..size.x() {
            for z in 0..size.z() {
                let value = self.cross_section(size, x, z);
                grid.set(x as i32, y as i32, z as i32, value, color);
            }
        }
    }

    /// Half extents of the cross-section in cells
    fn half_extents(&self, size: GridSize) -> Vec2 {
        Vec2::new(
            ((size.x() as f32 - 1.0) * 0.5 * self.config.scale_x).max(0.5),
            ((size.z() as f32 - 1.0) * 0.5 * self.config.scale_z).max(0.5),
        )
    }

    /// Density of cell column `(x, z)` under the current cross-section
    pub fn cross_section(&self, size: GridSize, x: usize, z: usize) -> f32 {
        if self.config.scale_x <= 0.0 || self.config.scale_z <= 0.0 {
            return 0.0;
        }

        let half = self.half_extents(size);
        let center = Vec2::new((size.x() as f32 - 1.0) * 0.5, (size.z() as f32 - 1.0) * 0.5);
        let d = Vec2::new(x as f32, z as f32) - center;

        let degrees = self.config.rotation_degrees;
        let r = if degrees.abs() > ROTATION_EPSILON {
            let (sin, cos) = degrees.to_radians().sin_cos();
            Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos)
        } else {
            d
        };

        match self.config.shape {
            ScanlineShape::Rectangle => {
                if r.x.abs() <= half.x && r.y.abs() <= half.y {
                    1.0
                } else {
                    0.0
                }
            }
            ScanlineShape::Ellipse => (1.0 - (r / half).length()).clamp(0.0, 1.0),
        }
    }

    /// Shape controls are live while held or running
    fn accepts_input(&self) -> bool {
        self.held || self.is_running()
    }

    /// Rescale the cross-section from pointer and scroll deltas
    ///
    /// Pointer X/Y scale X/Z; scroll scales both. Ignored unless held or
    /// running. Returns whether the input was applied.
    pub fn apply_scale_input(&mut self, pointer_delta: Vec2, scroll_delta: f32) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let c = &mut self.config;
        let scroll = scroll_delta * c.scroll_scale_sensitivity;
        c.scale_x = (c.scale_x + pointer_delta.x * c.pointer_scale_sensitivity + scroll).clamp(0.0, 1.0);
        c.scale_z = (c.scale_z + pointer_delta.y * c.pointer_scale_sensitivity + scroll).clamp(0.0, 1.0);
        true
    }

    /// Switch between rectangle and ellipse while held or running
    pub fn toggle_shape(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.config.shape = self.config.shape.toggled();
        true
    }

    /// Indicator placement, `None` while hidden (idle and not held)
    pub fn preview(&self, field: &VoxelField) -> Option<ScanlinePreview> {
        if !self.accepts_input() {
            return None;
        }
        let size = field.size();
        let layer = if self.is_running() {
            self.next_layer.saturating_sub(1)
        } else {
            0
        }
        .min(size.y() - 1);
        let center = size.center();
        let position = field.cell_to_local(Vec3::new(center.x, layer as f32, center.z));

        let mut extents = self.half_extents(size) * field.voxel_size();
        if self.config.shape == ScanlineShape::Ellipse {
            extents *= 1.0 - field.iso_level();
        }

        Some(ScanlinePreview {
            shape: self.config.shape,
            layer,
            position,
            rotation_degrees: self.config.rotation_degrees,
            extents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    fn config() -> ScanlineConfig {
        ScanlineConfig {
            layers_per_second: 2.0,
            pause_budget_seconds: 1.0,
            ..ScanlineConfig::default()
        }
    }

    fn column(n: i32) -> VoxelField {
        VoxelField::new(GridSize::new(1, n, 1), 1.0, 0.5)
    }

    #[test]
    fn test_reveal_timeline() {
        let mut field = column(4);
        let mut scan = ScanlineRevealer::new(config());

        assert!(scan.start());
        assert_eq!(scan.step(0.0, false, &mut field), ScanlineStep::LayerRevealed(0));
        assert_eq!(scan.step(0.25, false, &mut field), ScanlineStep::Waiting);
        assert_eq!(scan.step(0.25, false, &mut field), ScanlineStep::LayerRevealed(1));
        assert_eq!(scan.step(0.5, false, &mut field), ScanlineStep::LayerRevealed(2));
        assert_eq!(scan.step(0.5, false, &mut field), ScanlineStep::LayerRevealed(3));
        assert!(scan.is_running());
        assert_eq!(scan.step(0.5, false, &mut field), ScanlineStep::Completed);
        assert_eq!(scan.state(), ScanlineState::Idle);
        assert_eq!(scan.step(0.5, false, &mut field), ScanlineStep::Idle);
    }

    #[test]
    fn test_one_layer_per_step() {
        let mut field = column(4);
        let mut scan = ScanlineRevealer::new(config());
        scan.start();
        scan.step(0.0, false, &mut field);
        // a long frame still reveals a single layer
        assert_eq!(scan.step(10.0, false, &mut field), ScanlineStep::LayerRevealed(1));
        assert_eq!(scan.step(0.1, false, &mut field), ScanlineStep::Waiting);
    }

    #[test]
    fn test_start_while_running() {
        let mut field = column(4);
        let mut scan = ScanlineRevealer::new(config());
        assert!(scan.start());
        scan.step(0.0, false, &mut field);
        assert!(!scan.start());
        assert_eq!(scan.next_layer(), 1);
    }

    #[test]
    fn test_column_filled() {
        let mut field = column(3);
        field.set_fill_color(Color::rgb(0.1, 0.9, 0.3));
        let mut scan = ScanlineRevealer::new(config());
        scan.start();
        while scan.step(0.5, false, &mut field) != ScanlineStep::Completed {}
        for y in 0..3 {
            // 1x1 cross-section: the single column is the ellipse center
            assert_eq!(field.density(0, y, 0), 1.0);
            assert_eq!(field.color(0, y, 0), Color::rgb(0.1, 0.9, 0.3));
        }
    }

    #[test]
    fn test_hold_pauses_until_budget_spent() {
        let mut field = column(4);
        let mut scan = ScanlineRevealer::new(config());
        scan.start();
        assert_eq!(scan.step(0.0, false, &mut field), ScanlineStep::LayerRevealed(0));

        assert_eq!(scan.step(0.5, true, &mut field), ScanlineStep::Paused);
        assert_eq!(scan.step(0.5, true, &mut field), ScanlineStep::Paused);
        assert_eq!(scan.pause_budget(), 0.0);
        // budget gone: holding no longer freezes the wait
        assert_eq!(scan.step(0.5, true, &mut field), ScanlineStep::LayerRevealed(1));
        assert_eq!(scan.next_layer(), 2);
    }

    #[test]
    fn test_budget_refilled_on_completion() {
        let mut field = column(1);
        let mut scan = ScanlineRevealer::new(config());
        scan.start();
        scan.step(0.0, false, &mut field);
        scan.step(0.4, true, &mut field);
        assert!((scan.pause_budget() - 0.6).abs() < 1e-6);
        assert_eq!(scan.step(0.5, false, &mut field), ScanlineStep::Completed);
        assert_eq!(scan.pause_budget(), 1.0);
    }

    #[test]
    fn test_hold_before_start_release() {
        let mut field = column(4);
        let mut scan = ScanlineRevealer::new(config());

        assert_eq!(scan.step(0.2, true, &mut field), ScanlineStep::Armed);
        assert!(scan.is_armed());
        assert!(!scan.is_running());
        assert_eq!(scan.step(0.0, false, &mut field), ScanlineStep::LayerRevealed(0));
        assert!(scan.is_running());
        assert!(!scan.is_armed());
    }

    #[test]
    fn test_hold_before_start_exhausts() {
        let mut field = column(4);
        let mut scan = ScanlineRevealer::new(config());

        assert_eq!(scan.step(0.6, true, &mut field), ScanlineStep::Armed);
        assert_eq!(scan.step(0.6, true, &mut field), ScanlineStep::LayerRevealed(0));
        // still held with nothing left to spend
        assert_eq!(scan.step(0.5, true, &mut field), ScanlineStep::LayerRevealed(1));
    }

    #[test]
    fn test_shrink_mid_run_completes() {
        let mut field = column(6);
        let mut scan = ScanlineRevealer::new(config());
        scan.start();
        scan.step(0.0, false, &mut field);
        scan.step(0.5, false, &mut field);
        scan.step(0.5, false, &mut field);
        field.resize(GridSize::new(1, 2, 1), true);
        assert_eq!(scan.step(0.5, false, &mut field), ScanlineStep::Completed);
    }

    #[test]
    fn test_rectangle_cross_section() {
        let size = GridSize::new(5, 1, 5);
        let mut scan = ScanlineRevealer::new(ScanlineConfig {
            shape: ScanlineShape::Rectangle,
            scale_x: 0.5,
            ..config()
        });
        // half extents (1, 2) around center (2, 2)
        assert_eq!(scan.cross_section(size, 2, 2), 1.0);
        assert_eq!(scan.cross_section(size, 3, 4), 1.0);
        assert_eq!(scan.cross_section(size, 4, 2), 0.0);

        scan.config.rotation_degrees = 90.0;
        // the long axis now lies along X
        assert_eq!(scan.cross_section(size, 4, 2), 1.0);
        assert_eq!(scan.cross_section(size, 2, 4), 0.0);
    }

    #[test]
    fn test_ellipse_cross_section() {
        let size = GridSize::new(5, 1, 5);
        let scan = ScanlineRevealer::new(config());
        assert_eq!(scan.cross_section(size, 2, 2), 1.0);
        assert!((scan.cross_section(size, 3, 2) - 0.5).abs() < 1e-6);
        assert_eq!(scan.cross_section(size, 4, 2), 0.0);
        assert_eq!(scan.cross_section(size, 0, 0), 0.0);
    }

    #[test]
    fn test_zero_scale_writes_nothing() {
        let size = GridSize::new(5, 1, 5);
        let scan = ScanlineRevealer::new(ScanlineConfig {
            scale_z: 0.0,
            ..config()
        });
        assert_eq!(scan.cross_section(size, 2, 2), 0.0);
    }

    #[test]
    fn test_scale_input_gated() {
        let mut field = column(4);
        let mut scan = ScanlineRevealer::new(ScanlineConfig {
            scale_x: 0.5,
            scale_z: 0.5,
            pointer_scale_sensitivity: 0.01,
            scroll_scale_sensitivity: 0.1,
            ..config()
        });

        assert!(!scan.apply_scale_input(Vec2::new(10.0, 0.0), 0.0));
        assert!(!scan.toggle_shape());
        assert_eq!(scan.scale(), Vec2::splat(0.5));

        scan.start();
        scan.step(0.0, false, &mut field);
        assert!(scan.apply_scale_input(Vec2::new(10.0, -20.0), 0.0));
        assert!((scan.scale() - Vec2::new(0.6, 0.3)).abs().max_element() < 1e-6);
        assert!(scan.apply_scale_input(Vec2::ZERO, 10.0));
        assert_eq!(scan.scale(), Vec2::new(1.0, 1.0));

        assert!(scan.toggle_shape());
        assert_eq!(scan.shape(), ScanlineShape::Rectangle);
    }

    #[test]
    fn test_preview_visibility() {
        let mut field = VoxelField::new(GridSize::new(5, 4, 5), 2.0, 0.25);
        let mut scan = ScanlineRevealer::new(config());
        assert!(scan.preview(&field).is_none());

        // held while idle: bottom layer
        assert_eq!(scan.step(0.1, true, &mut field), ScanlineStep::Armed);
        assert_eq!(scan.preview(&field).unwrap().layer, 0);
        scan.step(0.0, false, &mut field);

        // running: the layer just written
        assert_eq!(scan.step(0.5, false, &mut field), ScanlineStep::LayerRevealed(1));
        let preview = scan.preview(&field).unwrap();
        assert_eq!(preview.layer, 1);
        assert_eq!(preview.shape, ScanlineShape::Ellipse);
        // layer 1 of 4 sits half a cell (one unit) below center
        assert!((preview.position - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
        // half extents 2 cells * 2 units * (1 - 0.25)
        assert!((preview.extents - Vec2::splat(3.0)).length() < 1e-6);

        assert_eq!(scan.step(0.1, false, &mut field), ScanlineStep::Waiting);
        assert_eq!(scan.preview(&field).unwrap().layer, 1);

        while scan.step(0.5, false, &mut field) != ScanlineStep::Completed {}
        assert!(scan.preview(&field).is_none());
    }
}
