//! The blob: one editable voxel field and everything that works on it
//!
//! [`Blob`] owns the field, its mesh, the scan buffer, the scanner, the
//! scanline revealer and the configuration. It is a single-owner object:
//! grid edits, scanline steps and rebuilds all go through `&mut self`.
//!
//! Grid edits do not rebuild the mesh on their own; call
//! [`rebuild_mesh`](Blob::rebuild_mesh) once a batch of edits is done.
//! The exceptions mirror the operations that replace the whole grid:
//! [`resize`](Blob::resize) with `clear`, [`apply_config`](Blob::apply_config),
//! [`apply_scan_grid_to_mesh`](Blob::apply_scan_grid_to_mesh) and every
//! revealed scanline layer.

use glam::Vec2;

use crate::config::BlobConfig;
use crate::field::{ScanBuffer, VoxelField};
use crate::mesh::{MarchingCubesMesher, Mesh};
use crate::scan::{ScanStrategy, ScanTarget, Scanner};
use crate::scanline::{ScanlinePreview, ScanlineRevealer, ScanlineShape, ScanlineStep};
use crate::similarity::{self, Assimilation, SimilarityOptions, SimilarityResult};
use crate::types::{Color, GridSize, Transform};

/// Per-tick input for [`Blob::step`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BlobInput {
    /// Hold control state (pauses a running reveal, arms one when idle)
    pub hold: bool,
    /// Pointer movement this tick
    pub pointer_delta: Vec2,
    /// Scroll movement this tick
    pub scroll_delta: f32,
    /// Switch the scanline shape this tick
    pub toggle_shape: bool,
}

#[inline]
fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-6 * a.abs().max(b.abs()).max(1.0)
}

/// An editable voxel blob
#[derive(Debug)]
pub struct Blob {
    config: BlobConfig,
    transform: Transform,
    field: VoxelField,
    scan_buffer: ScanBuffer,
    mesher: MarchingCubesMesher,
    mesh: Mesh,
    scanner: Scanner,
    revealer: ScanlineRevealer,
}

impl Default for Blob {
    fn default() -> Self {
        Self::new(BlobConfig::default())
    }
}

impl Blob {
    /// Create a blob and run the start-up generation
    ///
    /// With `generate_on_start`, the field is filled with a sphere (when
    /// `fill_on_start`) and meshed. The configuration is sanitized first.
    pub fn new(config: BlobConfig) -> Self {
        let config = config.sanitized();
        let size = config.grid.grid_size();
        let mut field = VoxelField::new(size, config.grid.voxel_size, config.grid.iso_level);
        field.set_fill_color(config.generation.fill_color);

        let mut blob = Blob {
            config,
            transform: Transform::IDENTITY,
            field,
            scan_buffer: ScanBuffer::new(size),
            mesher: MarchingCubesMesher::new(config.generation.mesher),
            mesh: Mesh::new(),
            scanner: Scanner::new(),
            revealer: ScanlineRevealer::new(config.scanline),
        };

        if config.generation.generate_on_start {
            if config.generation.fill_on_start {
                blob.field.fill_sphere(1.0);
            }
            blob.rebuild_mesh();
        }
        blob
    }

    /// Active configuration
    ///
    /// Scanline scale and shape reflect changes made through input.
    pub fn config(&self) -> BlobConfig {
        BlobConfig {
            scanline: *self.revealer.config(),
            ..self.config
        }
    }

    /// Re-validate and adopt a new configuration
    ///
    /// A changed size reallocates the grid, keeping the overlap unless both
    /// `regenerate_on_validate` and `generate_on_start` are set, in which case
    /// it is cleared and refilled per `fill_on_start`. A changed
    /// size, voxel size, iso level or mesher setting rebuilds the mesh.
    /// Returns whether the mesh was rebuilt.
    pub fn apply_config(&mut self, config: BlobConfig) -> bool {
        let config = config.sanitized();
        let old = self.config;
        let size = config.grid.grid_size();

        let size_changed = size != self.field.size();
        let mesh_affecting = size_changed
            || !approx_eq(config.grid.voxel_size, old.grid.voxel_size)
            || !approx_eq(config.grid.iso_level, old.grid.iso_level)
            || config.generation.mesher != old.generation.mesher;

        self.config = config;
        self.field.set_voxel_size(config.grid.voxel_size);
        self.field.set_iso_level(config.grid.iso_level);
        self.field.set_fill_color(config.generation.fill_color);
        self.mesher.set_config(config.generation.mesher);
        self.revealer.set_config(config.scanline);
        if config.scan != old.scan {
            self.scanner.invalidate();
        }

        if !mesh_affecting {
            return false;
        }

        if size_changed {
            let gen = &config.generation;
            let regenerate = gen.regenerate_on_validate && gen.generate_on_start;
            self.field.resize(size, regenerate);
            if regenerate && gen.fill_on_start {
                self.field.fill_sphere(1.0);
            }
        }
        self.rebuild_mesh();
        true
    }

    /// World placement of the blob
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Move the blob
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// The voxel field
    pub fn field(&self) -> &VoxelField {
        &self.field
    }

    /// The voxel field, for direct edits
    pub fn field_mut(&mut self) -> &mut VoxelField {
        &mut self.field
    }

    /// Mesh from the last rebuild
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Result of the last scan
    pub fn scan_buffer(&self) -> &ScanBuffer {
        &self.scan_buffer
    }

    /// Re-triangulate the field, replacing the mesh wholesale
    pub fn rebuild_mesh(&mut self) -> &Mesh {
        self.mesher.extract_into(&self.field, &mut self.mesh);
        log::trace!(
            "blob mesh rebuilt: {} vertices, {} triangles",
            self.mesh.vertex_count(),
            self.mesh.triangle_count()
        );
        &self.mesh
    }

    /// Reallocate the grid; with `clear` it is emptied and re-meshed
    pub fn resize(&mut self, size: GridSize, clear: bool) {
        self.field.resize(size, clear);
        let size = self.field.size();
        self.config.grid.size = [size.x() as i32, size.y() as i32, size.z() as i32];
        if clear {
            self.rebuild_mesh();
        }
    }

    /// Zero density and black color everywhere
    pub fn clear(&mut self) {
        self.field.clear();
    }

    /// Set every cell to `value` in the fill color
    pub fn fill_solid(&mut self, value: f32) {
        self.field.fill_uniform(value);
    }

    /// Fill the inscribed sphere with radial falloff scaled by `value`
    pub fn fill_sphere(&mut self, value: f32) {
        self.field.fill_sphere(value);
    }

    /// Whether a cell holds any density
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> bool {
        self.field.get_voxel(x, y, z)
    }

    /// Fill or empty one cell
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, filled: bool) -> bool {
        self.field.set_voxel(x, y, z, filled)
    }

    /// Write density and color to one cell
    pub fn set_voxel_value(&mut self, x: i32, y: i32, z: i32, value: f32, color: Color) -> bool {
        self.field.set_voxel_value(x, y, z, value, color)
    }

    /// Begin the scanline reveal; `false` if one is already running
    pub fn start_scanline(&mut self) -> bool {
        self.revealer.start()
    }

    /// Whether a reveal is running
    pub fn is_scanline_active(&self) -> bool {
        self.revealer.is_running()
    }

    /// Set the cross-section shape and X/Z scale (clamped to `[0, 1]`)
    pub fn set_scanline_shape(&mut self, shape: ScanlineShape, scale: Vec2) {
        let mut scanline = *self.revealer.config();
        scanline.shape = shape;
        scanline.scale_x = scale.x.clamp(0.0, 1.0);
        scanline.scale_z = scale.y.clamp(0.0, 1.0);
        self.revealer.set_config(scanline);
    }

    /// Advance the blob by one host tick
    ///
    /// Steps the revealer, rebuilding the mesh when a layer was revealed,
    /// then applies the shape controls.
    pub fn step(&mut self, dt: f32, input: &BlobInput) -> ScanlineStep {
        let step = self.revealer.step(dt, input.hold, &mut self.field);
        if let ScanlineStep::LayerRevealed(_) = step {
            self.rebuild_mesh();
        }

        if input.toggle_shape {
            self.revealer.toggle_shape();
        }
        if input.pointer_delta != Vec2::ZERO || input.scroll_delta != 0.0 {
            self.revealer.apply_scale_input(input.pointer_delta, input.scroll_delta);
        }
        step
    }

    /// Scanline indicator, `None` while hidden
    pub fn scanline_preview(&self) -> Option<ScanlinePreview> {
        self.revealer.preview(&self.field)
    }

    /// Sample `target` into the scan buffer
    ///
    /// Returns the strategy used, or `None` (buffer untouched) when the
    /// target offers no usable geometry.
    pub fn scan_object_to_grid(&mut self, target: &ScanTarget<'_>) -> Option<ScanStrategy> {
        self.scanner.scan(
            &self.field,
            &self.transform,
            target,
            &self.config.scan,
            &mut self.scan_buffer,
        )
    }

    /// Copy only the scanned colors into the field
    ///
    /// Returns `false` when the scan buffer does not match the field's size.
    pub fn apply_scan_colors_to_grid(&mut self) -> bool {
        self.field.grid_mut().copy_colors_from(&self.scan_buffer)
    }

    /// Replace the field with the scan and rebuild the mesh
    ///
    /// Returns `false`, changing nothing, when the sizes differ.
    pub fn apply_scan_grid_to_mesh(&mut self) -> bool {
        if !self.field.grid_mut().copy_from(&self.scan_buffer) {
            return false;
        }
        self.rebuild_mesh();
        true
    }

    /// Score the scan buffer against the field with the configured options
    pub fn compare_to_scan_grid(&self) -> SimilarityResult {
        self.compare_to_scan_grid_with(&self.config.similarity)
    }

    /// Score the scan buffer against the field with explicit options
    pub fn compare_to_scan_grid_with(&self, options: &SimilarityOptions) -> SimilarityResult {
        similarity::compare(
            self.field.grid(),
            &self.scan_buffer,
            self.field.iso_level(),
            options,
        )
    }

    /// Scan `target`, compare it and decide whether it is assimilable
    ///
    /// `None` when the target could not be scanned.
    pub fn assess_target(&mut self, target: &ScanTarget<'_>) -> Option<Assimilation> {
        self.scan_object_to_grid(target)?;
        let result = self.compare_to_scan_grid();
        let bounds = target.world_bounds();
        let check = similarity::assess(
            result.score,
            bounds.as_ref(),
            self.config.similarity.assimilation_threshold,
        );
        log::debug!(
            "assimilation check: score {:.3}, volume {:.3}, qualifies {}",
            check.score,
            check.volume,
            check.qualifies
        );
        Some(check)
    }
}
