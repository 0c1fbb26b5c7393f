//! Stroke renderer.
//!
//! `BrushEngine` turns pointer samples into stamps on a bound
//! [`RasterSurface`]. Raw positions are stabilised with an exponential
//! moving average, stamps are interpolated at a fixed spacing so fast
//! motion leaves no gaps, and pressure / velocity modulate stamp size and
//! alpha.
//!
//! A stroke whose brush texture is still being decoded is held as a
//! deferred stroke: its samples are buffered in order and replayed once the
//! host calls [`BrushEngine::resolve_texture`].

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::basics::{PointD, RectD};
use crate::color::Rgba8;
use crate::comp_op::BlendMode;
use crate::error::TextureError;
use crate::math::lerp;
use crate::perspective::{snap_to_grid, PerspectiveGrid};
use crate::rendering_buffer::RenderingBuffer;
use crate::stamp::{
    SmudgeSource, StampBuffer, StampCache, StampContext, StampEngine, StampKey,
    DEFAULT_BINARY_PAYLOAD,
};
use crate::surface::{transformed_bounds, RasterSurface};
use crate::texture::{Texture, TextureCache, TextureSlot};

/// EMA weight of the newest raw position.
pub const SMOOTHING_FACTOR: f64 = 0.3;
/// Smallest distance between interpolated stamps.
pub const MIN_STEP: f64 = 0.5;
/// Capacity of the colour history.
pub const COLOR_HISTORY_LIMIT: usize = 10;
/// Brightness below which a colour counts as dark.
pub const DARK_BRIGHTNESS: f64 = 60.0;

// ============================================================================
// Configuration
// ============================================================================

/// Per-stroke brush settings. Fields a given engine does not use are
/// ignored. `size > 0` and `spacing > 0` are caller preconditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrushConfig {
    pub engine: StampEngine,
    pub size: f64,
    pub opacity: f64,
    pub flow: f64,
    pub hardness: f64,
    /// Distance between stamps as a fraction of `size`.
    pub spacing: f64,
    /// Stamp rotation in radians.
    pub rotation: f64,
    pub pressure_affects_size: bool,
    pub pressure_affects_opacity: bool,
    pub velocity_affects_size: bool,
    pub velocity_affects_opacity: bool,
    /// Texture id resolved through the engine's texture cache.
    pub shape_texture: Option<String>,
    pub bristle_count: u32,
    pub binary_payload: String,
    pub blend_mode: BlendMode,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            engine: StampEngine::Standard,
            size: 10.0,
            opacity: 1.0,
            flow: 1.0,
            hardness: 0.8,
            spacing: 0.1,
            rotation: 0.0,
            pressure_affects_size: false,
            pressure_affects_opacity: false,
            velocity_affects_size: false,
            velocity_affects_opacity: false,
            shape_texture: None,
            bristle_count: 15,
            binary_payload: DEFAULT_BINARY_PAYLOAD.to_string(),
            blend_mode: BlendMode::Normal,
        }
    }
}

impl BrushConfig {
    /// Distance between interpolated stamps.
    pub fn step_size(&self) -> f64 {
        (self.size * self.spacing).max(MIN_STEP)
    }

    /// `(size multiplier, alpha multiplier)` for a stamp.
    pub fn dynamics(&self, pressure: f64, velocity: f64) -> (f64, f64) {
        let mut size = 1.0;
        let mut alpha = 1.0;
        if self.pressure_affects_size {
            size *= 0.2 + pressure * 0.8;
        }
        if self.velocity_affects_size {
            size *= (1.0 - velocity / 500.0).max(0.1);
        }
        if self.pressure_affects_opacity {
            alpha *= 0.1 + pressure * 0.9;
        }
        if self.velocity_affects_opacity {
            alpha *= (1.0 - velocity / 1000.0).max(0.1);
        }
        (size, alpha)
    }

    /// Texture id when this brush actually draws with it.
    fn texture_id(&self) -> Option<&str> {
        match self.engine {
            StampEngine::Standard => self.shape_texture.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Stamp buffer pixels per canvas pixel.
    pub device_pixel_scale: f64,
    /// Transparent border around every stamp buffer.
    pub stamp_padding: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            device_pixel_scale: 1.0,
            stamp_padding: 2,
        }
    }
}

// ============================================================================
// Input
// ============================================================================

/// One pointer event. `timestamp` is in milliseconds and must be monotonic
/// within a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
    pub timestamp: f64,
}

impl PointerSample {
    pub fn new(x: f64, y: f64, pressure: f64, timestamp: f64) -> Self {
        Self {
            x,
            y,
            pressure,
            timestamp,
        }
    }

    pub fn point(&self) -> PointD {
        PointD::new(self.x, self.y)
    }
}

/// Samples buffered between animation frames, drained in arrival order.
#[derive(Debug, Clone, Default)]
pub struct SampleQueue {
    samples: VecDeque<PointerSample>,
}

impl SampleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: PointerSample) {
        self.samples.push_back(sample);
    }

    pub fn pop(&mut self) -> Option<PointerSample> {
        self.samples.pop_front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ============================================================================
// Colour history
// ============================================================================

/// Qualitative reading of the recent palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorMood {
    FreshStart,
    Mysterious,
    Joyful,
    Calm,
    Balanced,
}

impl ColorMood {
    pub fn label(self) -> &'static str {
        match self {
            ColorMood::FreshStart => "Fresh start",
            ColorMood::Mysterious => "Mysterious and deep",
            ColorMood::Joyful => "Joyful and vibrant",
            ColorMood::Calm => "Calm and serene",
            ColorMood::Balanced => "Balanced and colorful",
        }
    }
}

/// Most-recent-first, duplicate-free, at most [`COLOR_HISTORY_LIMIT`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorHistory {
    colors: VecDeque<Rgba8>,
}

impl ColorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, color: Rgba8) {
        self.colors.retain(|c| *c != color);
        self.colors.push_front(color);
        self.colors.truncate(COLOR_HISTORY_LIMIT);
    }

    pub fn colors(&self) -> impl Iterator<Item = &Rgba8> {
        self.colors.iter()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Classify the palette. Depends only on the set of colours, not on
    /// their order.
    pub fn mood(&self) -> ColorMood {
        let n = self.colors.len();
        if n == 0 {
            return ColorMood::FreshStart;
        }
        let dark = self
            .colors
            .iter()
            .filter(|c| c.brightness() < DARK_BRIGHTNESS)
            .count();
        let warm = self.colors.iter().filter(|c| c.r > c.b).count();
        let cool = n - warm;
        if dark * 2 > n {
            ColorMood::Mysterious
        } else if warm > cool {
            ColorMood::Joyful
        } else if cool > warm {
            ColorMood::Calm
        } else {
            ColorMood::Balanced
        }
    }
}

// ============================================================================
// Stroke state
// ============================================================================

/// Motion state of the stroke being painted.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeState {
    pub last_raw: PointD,
    pub last_smoothed: PointD,
    pub last_pressure: f64,
    pub last_velocity: f64,
    pub last_timestamp: f64,
    pub stamps: usize,
    pub bounds: Option<RectD>,
}

impl StrokeState {
    fn begin(sample: &PointerSample) -> Self {
        Self {
            last_raw: sample.point(),
            last_smoothed: sample.point(),
            last_pressure: sample.pressure,
            last_velocity: 0.0,
            last_timestamp: sample.timestamp,
            stamps: 0,
            bounds: None,
        }
    }
}

/// A stroke waiting for its texture.
#[derive(Debug, Clone)]
struct DeferredStroke {
    texture: String,
    start: PointerSample,
    config: BrushConfig,
    samples: Vec<(PointerSample, BrushConfig)>,
    ending: bool,
}

#[derive(Debug, Clone)]
enum ActiveStroke {
    Awaiting(DeferredStroke),
    Painting(StrokeState),
}

/// Outcome of [`BrushEngine::start_stroke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrokeStart {
    /// The first stamp has been painted.
    Painting,
    /// Painting waits for the named texture to be resolved.
    AwaitingTexture(String),
}

/// What a finished stroke touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSummary {
    pub stamps: usize,
    /// Painted region on the target, `None` when nothing was drawn.
    pub bounds: Option<RectD>,
}

/// Result of resuming a deferred stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resumed {
    /// Buffered samples replayed after the first stamp.
    pub replayed: usize,
    /// Set when the stroke had already been ended while it waited.
    pub finished: Option<StrokeSummary>,
}

// ============================================================================
// BrushEngine
// ============================================================================

pub struct BrushEngine<S = RenderingBuffer, R = StdRng> {
    target: Option<S>,
    color: Rgba8,
    history: ColorHistory,
    grid: Option<PerspectiveGrid>,
    settings: EngineSettings,
    textures: TextureCache,
    stamps: StampCache,
    stroke: Option<ActiveStroke>,
    rng: R,
}

impl<S: RasterSurface> BrushEngine<S, StdRng> {
    /// Engine with an OS-seeded random source.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }
}

impl<S: RasterSurface> Default for BrushEngine<S, StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RasterSurface, R: RngCore> BrushEngine<S, R> {
    /// Engine drawing randomness from `rng`; seed it for reproducible
    /// Hairy and Binary strokes.
    pub fn with_rng(rng: R) -> Self {
        Self {
            target: None,
            color: Rgba8::BLACK,
            history: ColorHistory::new(),
            grid: None,
            settings: EngineSettings::default(),
            textures: TextureCache::new(),
            stamps: StampCache::new(),
            stroke: None,
            rng,
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self.stamps.invalidate();
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Target
    // ------------------------------------------------------------------

    /// Bind the drawing surface, returning the previous one.
    pub fn set_target(&mut self, surface: S) -> Option<S> {
        self.target.replace(surface)
    }

    pub fn take_target(&mut self) -> Option<S> {
        self.target.take()
    }

    pub fn target(&self) -> Option<&S> {
        self.target.as_ref()
    }

    pub fn target_mut(&mut self) -> Option<&mut S> {
        self.target.as_mut()
    }

    // ------------------------------------------------------------------
    // Colour
    // ------------------------------------------------------------------

    pub fn set_color(&mut self, color: Rgba8) {
        self.color = color;
        self.history.push(color);
    }

    pub fn color(&self) -> Rgba8 {
        self.color
    }

    pub fn color_history(&self) -> &ColorHistory {
        &self.history
    }

    pub fn color_mood(&self) -> ColorMood {
        self.history.mood()
    }

    // ------------------------------------------------------------------
    // Perspective
    // ------------------------------------------------------------------

    /// Activate (`Some`) or clear (`None`) snapping while drawing.
    pub fn set_perspective_grid(&mut self, grid: Option<PerspectiveGrid>) {
        self.grid = grid;
    }

    pub fn perspective_grid(&self) -> Option<&PerspectiveGrid> {
        self.grid.as_ref()
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    /// Texture ids the host still has to decode.
    pub fn pending_textures(&self) -> Vec<String> {
        self.textures.pending_ids().map(str::to_string).collect()
    }

    /// Deliver a decode result. A stroke deferred on `id` starts painting
    /// and replays its buffered samples; on failure it paints with the
    /// gradient tip instead.
    pub fn resolve_texture(
        &mut self,
        id: &str,
        result: Result<Texture, TextureError>,
    ) -> Option<Resumed> {
        self.textures.resolve(id, result);
        match self.stroke.take() {
            Some(ActiveStroke::Awaiting(deferred)) if deferred.texture == id => {
                debug!(texture = id, buffered = deferred.samples.len(), "resuming deferred stroke");
                self.begin_painting(&deferred.start, &deferred.config);
                let replayed = deferred.samples.len();
                for (sample, config) in &deferred.samples {
                    self.draw_stroke(sample, config);
                }
                let finished = if deferred.ending {
                    self.end_stroke()
                } else {
                    None
                };
                Some(Resumed { replayed, finished })
            }
            other => {
                self.stroke = other;
                None
            }
        }
    }

    /// Number of times the cached tip has been re-rendered.
    pub fn stamp_rebuilds(&self) -> u64 {
        self.stamps.rebuilds()
    }

    // ------------------------------------------------------------------
    // Strokes
    // ------------------------------------------------------------------

    pub fn is_stroking(&self) -> bool {
        self.stroke.is_some()
    }

    /// Motion state of the stroke being painted, if any.
    pub fn stroke_state(&self) -> Option<&StrokeState> {
        match &self.stroke {
            Some(ActiveStroke::Painting(state)) => Some(state),
            _ => None,
        }
    }

    /// Begin a stroke at `sample` and paint its first stamp, unless the
    /// brush texture is not resolved yet.
    pub fn start_stroke(&mut self, sample: &PointerSample, config: &BrushConfig) -> StrokeStart {
        if self.stroke.is_some() {
            debug!("starting a stroke over an active one");
            self.end_stroke();
            self.stroke = None;
        }

        if let Some(id) = config.texture_id() {
            if matches!(self.textures.request(id), TextureSlot::Pending) {
                debug!(texture = id, engine = ?config.engine, size = config.size, "stroke deferred");
                self.stroke = Some(ActiveStroke::Awaiting(DeferredStroke {
                    texture: id.to_string(),
                    start: *sample,
                    config: config.clone(),
                    samples: Vec::new(),
                    ending: false,
                }));
                return StrokeStart::AwaitingTexture(id.to_string());
            }
        }

        self.begin_painting(sample, config);
        StrokeStart::Painting
    }

    /// Feed one sample. Returns the number of stamps painted.
    pub fn draw_stroke(&mut self, sample: &PointerSample, config: &BrushConfig) -> usize {
        match self.stroke.take() {
            None => 0,
            Some(ActiveStroke::Awaiting(mut deferred)) => {
                deferred.samples.push((*sample, config.clone()));
                self.stroke = Some(ActiveStroke::Awaiting(deferred));
                0
            }
            Some(ActiveStroke::Painting(mut state)) => {
                let painted = self.advance(&mut state, sample, config);
                self.stroke = Some(ActiveStroke::Painting(state));
                painted
            }
        }
    }

    /// Finish the stroke. Idempotent: returns `None` when no stroke is being
    /// painted. A deferred stroke is marked to finish as soon as its texture
    /// resolves.
    pub fn end_stroke(&mut self) -> Option<StrokeSummary> {
        match self.stroke.take() {
            None => None,
            Some(ActiveStroke::Awaiting(mut deferred)) => {
                deferred.ending = true;
                self.stroke = Some(ActiveStroke::Awaiting(deferred));
                None
            }
            Some(ActiveStroke::Painting(state)) => {
                debug!(stamps = state.stamps, bounds = ?state.bounds, "stroke end");
                Some(StrokeSummary {
                    stamps: state.stamps,
                    bounds: state.bounds,
                })
            }
        }
    }

    /// Drop the current stroke, deferred or not, without painting more.
    pub fn cancel_stroke(&mut self) {
        if self.stroke.take().is_some() {
            debug!("stroke cancelled");
        }
    }

    /// Apply every queued sample in arrival order. Returns the number of
    /// stamps painted.
    pub fn drain(&mut self, queue: &mut SampleQueue, config: &BrushConfig) -> usize {
        let samples = queue.len();
        let mut painted = 0;
        while let Some(sample) = queue.pop() {
            painted += self.draw_stroke(&sample, config);
        }
        trace!(samples, painted, "drained sample queue");
        painted
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn begin_painting(&mut self, sample: &PointerSample, config: &BrushConfig) {
        debug!(engine = ?config.engine, size = config.size, x = sample.x, y = sample.y, "stroke start");
        let mut state = StrokeState::begin(sample);
        self.paint_stamp(&mut state, sample.point(), sample.pressure, 0.0, config);
        self.stroke = Some(ActiveStroke::Painting(state));
    }

    /// Stabilise, interpolate and paint. State is only committed when at
    /// least one stamp step was covered.
    fn advance(&mut self, state: &mut StrokeState, sample: &PointerSample, config: &BrushConfig) -> usize {
        let dt = (sample.timestamp - state.last_timestamp).max(1.0);
        let raw = sample.point();
        state.last_raw = raw;

        let from = state.last_smoothed;
        let smoothed = from + (raw - from) * SMOOTHING_FACTOR;
        let distance = from.distance(smoothed);
        let velocity = distance / dt * 1000.0;

        let steps = (distance / config.step_size()).floor() as usize;
        if steps == 0 {
            return 0;
        }

        let mut painted = 0;
        for i in 1..=steps {
            let k = i as f64 / steps as f64;
            let at = from.lerp(smoothed, k);
            let pressure = lerp(state.last_pressure, sample.pressure, k);
            let v = lerp(state.last_velocity, velocity, k);
            if self.paint_stamp(state, at, pressure, v, config) {
                painted += 1;
            }
        }

        state.last_smoothed = smoothed;
        state.last_pressure = sample.pressure;
        state.last_velocity = velocity;
        state.last_timestamp = sample.timestamp;
        painted
    }

    /// Composite one stamp. Returns `false` when no target is bound.
    fn paint_stamp(
        &mut self,
        state: &mut StrokeState,
        at: PointD,
        pressure: f64,
        velocity: f64,
        config: &BrushConfig,
    ) -> bool {
        let Some(target) = self.target.as_mut() else {
            return false;
        };
        let (size_mult, alpha_mult) = config.dynamics(pressure, velocity);
        let at = match &self.grid {
            Some(grid) => snap_to_grid(at, grid),
            None => at,
        };
        let size = config.size * size_mult;

        let strategy = config.engine.strategy();
        let texture_id = config.texture_id();
        let texture = texture_id.and_then(|id| self.textures.texture(id));
        let smudge = config.engine == StampEngine::Smudge;
        let (render_size, pixel_scale) = if smudge {
            (size, 1.0)
        } else {
            (config.size, self.settings.device_pixel_scale)
        };

        let fresh: StampBuffer;
        let stamp: &StampBuffer = if strategy.per_stamp() {
            let surface: &dyn RasterSurface = &*target;
            let mut ctx = StampContext {
                size: render_size,
                hardness: config.hardness,
                color: self.color,
                pixel_scale,
                padding: self.settings.stamp_padding,
                bristle_count: config.bristle_count,
                payload: &config.binary_payload,
                texture: None,
                smudge: smudge.then_some(SmudgeSource { surface, at }),
                rng: &mut self.rng,
            };
            fresh = strategy.render(&mut ctx);
            &fresh
        } else {
            let key = StampKey {
                engine: config.engine,
                size: render_size,
                hardness: config.hardness,
                color: self.color,
                texture: texture_id.map(str::to_string),
                texture_ready: texture.is_some(),
                pixel_scale,
            };
            let mut ctx = StampContext {
                size: render_size,
                hardness: config.hardness,
                color: self.color,
                pixel_scale,
                padding: self.settings.stamp_padding,
                bristle_count: config.bristle_count,
                payload: &config.binary_payload,
                texture,
                smudge: None,
                rng: &mut self.rng,
            };
            self.stamps.get_or_rebuild(key, || strategy.render(&mut ctx))
        };

        let mtx = stamp.placement(at, size, config.rotation);
        let alpha = config.opacity * config.flow * alpha_mult;
        target.draw_image(&stamp.image, &mtx, alpha, config.blend_mode);

        let painted = transformed_bounds(&stamp.image, &mtx);
        state.bounds = Some(state.bounds.map_or(painted, |b| b.unite(&painted)));
        state.stamps += 1;
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
