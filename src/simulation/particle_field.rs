//! # Falling Donut Field
//!
//! A fixed-size pool of animated entities. Every entity carries its own
//! timers: a staggered spawn delay that gates the scale-in animation and a
//! fall delay that gates its descent. Each frame the pool runs independent
//! passes (rotation, fall activation, falling, wraparound, entry scale), each
//! with its own switch in [`SimulationParams`].
//!
//! ## Usage
//!
//! ```no_run
//! use donut_field::simulation::{particle_field::ParticlePool, params::SimulationParams};
//!
//! let mut pool = ParticlePool::builder()
//!     .with_count(100)
//!     .with_stagger(0.05)
//!     .with_entry_rate(2.0)
//!     .build();
//!
//! let params = SimulationParams::default();
//! pool.update(0.016, &params);
//! ```
//!
//! Motion is integrated per call, not per second: the field assumes a
//! roughly constant frame rate.

use cgmath::{Vector2, Vector3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f32::consts::PI;

use super::params::SimulationParams;
use super::traits::Simulation;
use crate::gfx::scene::{DrawableHandle, GeometryId, SceneBackend, SharedMaterial, Transform};

/// Spread of the random placement volume, centred on the origin
///
/// Each axis is drawn independently as `(u - 0.5) * spread`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBounds {
    pub horizontal: f32,
    pub vertical: f32,
    pub depth: f32,
}

impl Default for FieldBounds {
    fn default() -> Self {
        Self {
            horizontal: 15.0,
            vertical: 15.0,
            depth: 10.0,
        }
    }
}

impl FieldBounds {
    fn sample(&self, rng: &mut impl Rng) -> Vector3<f32> {
        Vector3::new(
            (rng.random::<f32>() - 0.5) * self.horizontal,
            (rng.random::<f32>() - 0.5) * self.vertical,
            (rng.random::<f32>() - 0.5) * self.depth,
        )
    }

    /// Horizontal and depth coordinates only
    fn sample_plane(&self, rng: &mut impl Rng) -> (f32, f32) {
        (
            (rng.random::<f32>() - 0.5) * self.horizontal,
            (rng.random::<f32>() - 0.5) * self.depth,
        )
    }
}

/// Construction-time configuration of the field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSettings {
    pub count: usize,
    pub bounds: FieldBounds,
    /// Seconds between consecutive entities starting their entry animation
    pub stagger_interval: f32,
    /// Scale gained per second during the entry animation
    pub entry_rate: f32,
    /// Upper bound of the first fall delay, measured from time zero
    pub max_initial_fall_delay: f32,
    /// Upper bound of the fall delay after a wraparound, measured from the wrap
    pub max_repeat_fall_delay: f32,
    /// Radians per frame at unit rotation speed
    pub base_rotation_rate: f32,
    /// Units per frame at unit falling speed
    pub base_fall_rate: f32,
    /// Height below which an entity wraps to `-lower_bound`
    pub lower_bound: f32,
    pub seed: Option<u64>,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            count: 100,
            bounds: FieldBounds::default(),
            stagger_interval: 0.05,
            entry_rate: 2.0,
            max_initial_fall_delay: 10.0,
            max_repeat_fall_delay: 5.0,
            base_rotation_rate: 0.01,
            base_fall_rate: 0.02,
            lower_bound: -15.0,
            seed: None,
        }
    }
}

impl FieldSettings {
    /// Height an entity is teleported to when it wraps
    pub fn upper_bound(&self) -> f32 {
        -self.lower_bound
    }
}

/// One donut
#[derive(Debug, Clone)]
pub struct Entity {
    pub position: Vector3<f32>,
    /// Euler angles in radians, XYZ order
    pub rotation: Vector3<f32>,
    rotation_speed: Vector2<f32>,
    scale: f32,
    spawn_delay: f64,
    fall_delay: f64,
    is_falling: bool,
    drawable: Option<DrawableHandle>,
}

impl Entity {
    pub fn rotation_speed(&self) -> Vector2<f32> {
        self.rotation_speed
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn spawn_delay(&self) -> f64 {
        self.spawn_delay
    }

    /// Absolute time at which falling starts (or resumes after a wrap)
    pub fn fall_delay(&self) -> f64 {
        self.fall_delay
    }

    pub fn is_falling(&self) -> bool {
        self.is_falling
    }

    pub fn drawable(&self) -> Option<DrawableHandle> {
        self.drawable
    }

    /// Transform with the entry scale applied to all three axes
    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation,
            scale: Vector3::new(self.scale, self.scale, self.scale),
        }
    }

    fn entry_scale(&self, elapsed: f64, entry_rate: f32) -> f32 {
        ((elapsed - self.spawn_delay) * f64::from(entry_rate)).clamp(0.0, 1.0) as f32
    }
}

/// Fixed-size pool of donuts and their timers
pub struct ParticlePool {
    entities: Vec<Entity>,
    settings: FieldSettings,
    rng: StdRng,
    last_elapsed: Option<f64>,
}

impl ParticlePool {
    /// Creates a new pool builder
    pub fn builder() -> ParticlePoolBuilder {
        ParticlePoolBuilder::default()
    }

    /// Creates `settings.count` entities with randomized placement
    pub fn new(settings: FieldSettings) -> Self {
        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let entities = (0..settings.count)
            .map(|index| Entity {
                position: settings.bounds.sample(&mut rng),
                rotation: Vector3::new(rng.random::<f32>() * PI, rng.random::<f32>() * PI, 0.0),
                rotation_speed: Vector2::new(
                    (rng.random::<f32>() - 0.5) * 2.0,
                    (rng.random::<f32>() - 0.5) * 2.0,
                ),
                scale: 0.0,
                spawn_delay: f64::from(index as f32 * settings.stagger_interval),
                fall_delay: f64::from(rng.random::<f32>() * settings.max_initial_fall_delay),
                is_falling: false,
                drawable: None,
            })
            .collect();

        Self {
            entities,
            settings,
            rng,
            last_elapsed: None,
        }
    }

    /// Advances every entity to `elapsed`
    ///
    /// Rotation is a per-call delta and advances on every call. Falling is a
    /// per-frame delta and only advances when `elapsed` moved forward since
    /// the previous call. Scale is a pure function of `elapsed`.
    pub fn update(&mut self, elapsed: f64, params: &SimulationParams) {
        let time_advanced = self.last_elapsed.map_or(true, |last| elapsed > last);
        self.last_elapsed = Some(elapsed);

        let Self {
            entities,
            settings,
            rng,
            ..
        } = self;

        for entity in entities.iter_mut() {
            if params.rotation_enabled {
                let step = settings.base_rotation_rate * params.rotation_speed;
                entity.rotation.x += entity.rotation_speed.x * step;
                entity.rotation.y += entity.rotation_speed.y * step;
            }

            if params.falling_enabled && !entity.is_falling && elapsed > entity.fall_delay {
                entity.is_falling = true;
            }

            if params.falling_enabled && entity.is_falling && time_advanced {
                entity.position.y -= settings.base_fall_rate * params.falling_speed;
            }

            if entity.position.y < settings.lower_bound {
                let (x, z) = settings.bounds.sample_plane(rng);
                entity.position = Vector3::new(x, settings.upper_bound(), z);
                entity.is_falling = false;
                // (0, max] so the new delay always lies after `elapsed`
                let delay = settings.max_repeat_fall_delay * (1.0 - rng.random::<f32>());
                let delay = f64::from(delay);
                entity.fall_delay = strictly_after(elapsed, elapsed + delay);
                log::trace!("Entity wrapped, falls again at {:.2}s", entity.fall_delay);
            }

            entity.scale = entity.entry_scale(elapsed, settings.entry_rate);
        }
    }

    /// Scatters every entity to a fresh random position
    ///
    /// Timers, scale and fall state are left as they are: an entity that was
    /// falling keeps falling from its new position.
    pub fn reset_positions(&mut self) {
        let Self {
            entities,
            settings,
            rng,
            ..
        } = self;

        for entity in entities.iter_mut() {
            entity.position = settings.bounds.sample(rng);
        }
        log::debug!("Reset positions of {} entities", entities.len());
    }

    /// Creates and adds one drawable per entity that doesn't have one yet
    ///
    /// Returns the number of drawables created.
    pub fn spawn_into<S: SceneBackend + ?Sized>(
        &mut self,
        scene: &mut S,
        geometry: GeometryId,
        material: &SharedMaterial,
    ) -> usize {
        let mut created = 0;
        for entity in self.entities.iter_mut().filter(|e| e.drawable.is_none()) {
            let handle = scene.create_drawable(geometry, material);
            scene.set_transform(handle, entity.transform());
            scene.add_to_scene(handle);
            entity.drawable = Some(handle);
            created += 1;
        }
        created
    }

    /// Writes every entity's transform to its drawable
    pub fn sync_to_scene<S: SceneBackend + ?Sized>(&self, scene: &mut S) {
        for entity in &self.entities {
            if let Some(handle) = entity.drawable {
                scene.set_transform(handle, entity.transform());
            }
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Mutable access for placing entities by hand. Timers stay private.
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn falling_count(&self) -> usize {
        self.entities.iter().filter(|e| e.is_falling).count()
    }

    pub fn settings(&self) -> &FieldSettings {
        &self.settings
    }
}

impl Simulation for ParticlePool {
    fn update(&mut self, elapsed: f64, params: &SimulationParams) {
        ParticlePool::update(self, elapsed, params);
    }

    fn sync_to_scene(&self, scene: &mut dyn SceneBackend) {
        ParticlePool::sync_to_scene(self, scene);
    }

    fn reset_positions(&mut self) {
        ParticlePool::reset_positions(self);
    }

    fn name(&self) -> &str {
        "Donuts"
    }

    fn entity_count(&self) -> usize {
        self.len()
    }

    fn falling_count(&self) -> usize {
        ParticlePool::falling_count(self)
    }
}

/// Smallest value strictly greater than `now` if `candidate` rounded onto it
fn strictly_after(now: f64, candidate: f64) -> f64 {
    if candidate > now {
        candidate
    } else if now >= 0.0 {
        f64::from_bits(now.to_bits() + 1)
    } else {
        // negative floats grow towards zero as their bit pattern shrinks
        f64::from_bits(now.to_bits() - 1)
    }
}

/// Builder for creating particle pools
#[derive(Default)]
pub struct ParticlePoolBuilder {
    settings: FieldSettings,
}

impl ParticlePoolBuilder {
    /// Sets the number of entities
    pub fn with_count(mut self, count: usize) -> Self {
        self.settings.count = count;
        self
    }

    /// Sets the placement volume spreads
    pub fn with_bounds(mut self, horizontal: f32, vertical: f32, depth: f32) -> Self {
        self.settings.bounds = FieldBounds {
            horizontal,
            vertical,
            depth,
        };
        self
    }

    /// Sets the delay between consecutive entry animations
    pub fn with_stagger(mut self, interval: f32) -> Self {
        self.settings.stagger_interval = interval;
        self
    }

    /// Sets how fast entities scale in
    pub fn with_entry_rate(mut self, rate: f32) -> Self {
        self.settings.entry_rate = rate;
        self
    }

    /// Sets the maximum initial and post-wrap fall delays
    pub fn with_fall_delays(mut self, initial: f32, repeat: f32) -> Self {
        self.settings.max_initial_fall_delay = initial;
        self.settings.max_repeat_fall_delay = repeat;
        self
    }

    /// Sets the per-frame rotation and fall increments
    pub fn with_base_rates(mut self, rotation: f32, fall: f32) -> Self {
        self.settings.base_rotation_rate = rotation;
        self.settings.base_fall_rate = fall;
        self
    }

    /// Sets the wraparound height
    pub fn with_lower_bound(mut self, lower_bound: f32) -> Self {
        self.settings.lower_bound = lower_bound;
        self
    }

    /// Makes placement and delays reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.settings.seed = Some(seed);
        self
    }

    /// Replaces all settings at once
    pub fn with_settings(mut self, settings: FieldSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the pool
    pub fn build(self) -> ParticlePool {
        ParticlePool::new(self.settings)
    }
}
