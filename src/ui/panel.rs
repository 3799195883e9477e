//! Donut parameter panel
//!
//! Owns the live [`SimulationParams`] and the shared matcap material. Every
//! control is bounded and stepped, so out-of-range values can't be stored.
//! Changes take effect on the next frame and are pushed synchronously to
//! subscribers.

use imgui::{Condition, Ui};

use crate::gfx::scene::{SharedMaterial, VariantHandle};
use crate::simulation::{params::SimulationParams, traits::Simulation};

/// Bounded, stepped scalar control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderSpec {
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SliderSpec {
    /// Clamps into range and rounds to the nearest step from `min`
    pub fn snap(&self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.min;
        }
        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }
}

/// Bounded, stepped integer control
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperSpec {
    pub label: &'static str,
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl StepperSpec {
    pub fn snap(&self, value: u32) -> u32 {
        let clamped = value.clamp(self.min, self.max);
        let step = self.step.max(1);
        let offset = clamped - self.min;
        let lower = self.min + offset / step * step;
        let upper = lower + step;
        if offset % step * 2 >= step && upper <= self.max {
            upper
        } else {
            lower
        }
    }
}

pub const ROTATION_SPEED: SliderSpec = SliderSpec {
    label: "Rotation Speed",
    min: 0.1,
    max: 5.0,
    step: 0.1,
};

pub const FALLING_SPEED: SliderSpec = SliderSpec {
    label: "Falling Speed",
    min: 0.1,
    max: 5.0,
    step: 0.1,
};

/// A change that was applied by the panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamChange {
    ActiveVariant(u32),
    RotationEnabled(bool),
    RotationSpeed(f32),
    FallingEnabled(bool),
    FallingSpeed(f32),
    ResetPositions,
}

type Listener = Box<dyn FnMut(&ParamChange)>;

/// Live parameter panel for the donut field
pub struct ParameterPanel {
    params: SimulationParams,
    variant_spec: StepperSpec,
    variants: Vec<VariantHandle>,
    material: SharedMaterial,
    listeners: Vec<Listener>,
}

impl ParameterPanel {
    /// Creates the panel and points the shared material at the default variant
    ///
    /// # Arguments
    /// * `variants` - One handle per selectable matcap, in selector order
    /// * `material` - Material shared by every donut
    pub fn new(variants: Vec<VariantHandle>, material: SharedMaterial) -> Self {
        let variant_spec = StepperSpec {
            label: "Textures",
            min: 1,
            max: (variants.len() as u32).max(1),
            step: 1,
        };

        let mut params = SimulationParams::default();
        params.active_variant = variant_spec.snap(params.active_variant);

        let panel = Self {
            params,
            variant_spec,
            variants,
            material,
            listeners: Vec::new(),
        };
        panel.apply_variant();
        panel
    }

    /// Current parameters, read by the simulation every frame
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn material(&self) -> &SharedMaterial {
        &self.material
    }

    pub fn variant_spec(&self) -> StepperSpec {
        self.variant_spec
    }

    /// Replaces the variant handles once the textures are on the GPU
    ///
    /// The active variant is clamped to the new range and re-applied to the
    /// shared material.
    pub fn set_variants(&mut self, variants: Vec<VariantHandle>) {
        self.variant_spec.max = (variants.len() as u32).max(1);
        self.variants = variants;
        self.params.active_variant = self.variant_spec.snap(self.params.active_variant);
        self.apply_variant();
    }

    /// Registers a callback invoked after every applied change
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ParamChange) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Selects a matcap variant (1-based) for all donuts at once
    pub fn set_active_variant(&mut self, variant: u32) {
        let variant = self.variant_spec.snap(variant);
        if variant == self.params.active_variant {
            return;
        }
        self.params.active_variant = variant;
        self.apply_variant();
        self.notify(ParamChange::ActiveVariant(variant));
    }

    pub fn set_rotation_enabled(&mut self, enabled: bool) {
        if enabled != self.params.rotation_enabled {
            self.params.rotation_enabled = enabled;
            self.notify(ParamChange::RotationEnabled(enabled));
        }
    }

    pub fn set_rotation_speed(&mut self, speed: f32) {
        let speed = ROTATION_SPEED.snap(speed);
        if speed != self.params.rotation_speed {
            self.params.rotation_speed = speed;
            self.notify(ParamChange::RotationSpeed(speed));
        }
    }

    pub fn set_falling_enabled(&mut self, enabled: bool) {
        if enabled != self.params.falling_enabled {
            self.params.falling_enabled = enabled;
            self.notify(ParamChange::FallingEnabled(enabled));
        }
    }

    pub fn set_falling_speed(&mut self, speed: f32) {
        let speed = FALLING_SPEED.snap(speed);
        if speed != self.params.falling_speed {
            self.params.falling_speed = speed;
            self.notify(ParamChange::FallingSpeed(speed));
        }
    }

    /// "Reset Positions" action
    pub fn reset_positions(&mut self, simulation: &mut dyn Simulation) {
        simulation.reset_positions();
        self.notify(ParamChange::ResetPositions);
    }

    fn apply_variant(&self) {
        let index = (self.params.active_variant - 1) as usize;
        if let Some(handle) = self.variants.get(index) {
            self.material.borrow_mut().matcap = *handle;
        }
    }

    fn notify(&mut self, change: ParamChange) {
        log::debug!("Parameter changed: {:?}", change);
        for listener in self.listeners.iter_mut() {
            listener(&change);
        }
    }

    /// Renders the panel window
    ///
    /// Returns true when "Reset Positions" was clicked; the caller applies it
    /// with [`reset_positions`](Self::reset_positions) once the simulation is
    /// free to borrow.
    ///
    /// # Arguments
    /// * `ui` - ImGui UI context
    /// * `status` - Read-only values shown under the controls
    pub fn render_ui(&mut self, ui: &Ui, status: &PanelStatus) -> bool {
        let display_size = ui.io().display_size;
        let panel_width = 320.0;
        let panel_x = display_size[0] - panel_width - 20.0; // Position on right side
        let mut reset_requested = false;

        ui.window(status.title)
            .size([panel_width, 300.0], Condition::FirstUseEver)
            .position([panel_x.max(0.0), 20.0], Condition::FirstUseEver)
            .build(|| {
                let spec = self.variant_spec;
                let mut variant = self.params.active_variant as i32;
                if ui.slider(spec.label, spec.min as i32, spec.max as i32, &mut variant) {
                    self.set_active_variant(variant.max(0) as u32);
                }

                ui.separator();

                let mut rotation_enabled = self.params.rotation_enabled;
                if ui.checkbox("Enable Rotation", &mut rotation_enabled) {
                    self.set_rotation_enabled(rotation_enabled);
                }
                let mut rotation_speed = self.params.rotation_speed;
                if ui.slider(
                    ROTATION_SPEED.label,
                    ROTATION_SPEED.min,
                    ROTATION_SPEED.max,
                    &mut rotation_speed,
                ) {
                    self.set_rotation_speed(rotation_speed);
                }

                let mut falling_enabled = self.params.falling_enabled;
                if ui.checkbox("Enable Falling", &mut falling_enabled) {
                    self.set_falling_enabled(falling_enabled);
                }
                let mut falling_speed = self.params.falling_speed;
                if ui.slider(
                    FALLING_SPEED.label,
                    FALLING_SPEED.min,
                    FALLING_SPEED.max,
                    &mut falling_speed,
                ) {
                    self.set_falling_speed(falling_speed);
                }

                ui.separator();

                if ui.button("Reset Positions") {
                    reset_requested = true;
                }

                ui.separator();

                ui.text(format!("Time: {:.2}s", status.elapsed));
                ui.text(format!("Donuts: {}", status.entity_count));
                ui.text(format!("Falling: {}", status.falling_count));
            });

        reset_requested
    }
}

/// Read-only values for the panel's status block
#[derive(Debug, Clone, Copy)]
pub struct PanelStatus<'a> {
    pub title: &'a str,
    pub elapsed: f64,
    pub entity_count: usize,
    pub falling_count: usize,
}

impl<'a> PanelStatus<'a> {
    pub fn of(simulation: &'a dyn Simulation, elapsed: f64) -> Self {
        Self {
            title: simulation.name(),
            elapsed,
            entity_count: simulation.entity_count(),
            falling_count: simulation.falling_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::shared_material;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn panel() -> ParameterPanel {
        let variants = (0..8).map(VariantHandle).collect();
        ParameterPanel::new(variants, shared_material("matcap", VariantHandle(0)))
    }

    #[test]
    fn test_defaults() {
        let panel = panel();
        let params = panel.params();
        assert!(params.rotation_enabled);
        assert!(params.falling_enabled);
        assert_eq!(params.rotation_speed, 3.0);
        assert_eq!(params.falling_speed, 2.0);
        assert_eq!(params.active_variant, 8);
        assert_eq!(panel.material().borrow().matcap, VariantHandle(7));
    }

    #[test]
    fn test_slider_snap() {
        assert_eq!(ROTATION_SPEED.snap(9.0), 5.0);
        assert_eq!(ROTATION_SPEED.snap(-1.0), 0.1);
        assert_eq!(ROTATION_SPEED.snap(f32::NAN), 0.1);
        assert!((ROTATION_SPEED.snap(2.34) - 2.3).abs() < 1e-5);
        assert!((FALLING_SPEED.snap(2.36) - 2.4).abs() < 1e-5);
    }

    #[test]
    fn test_stepper_snap() {
        let spec = StepperSpec {
            label: "n",
            min: 1,
            max: 9,
            step: 2,
        };
        assert_eq!(spec.snap(0), 1);
        assert_eq!(spec.snap(4), 5);
        assert_eq!(spec.snap(3), 3);
        assert_eq!(spec.snap(100), 9);
    }

    #[test]
    fn test_variant_clamped_to_available() {
        let mut panel = panel();
        panel.set_active_variant(42);
        assert_eq!(panel.params().active_variant, 8);
        panel.set_active_variant(0);
        assert_eq!(panel.params().active_variant, 1);
        assert_eq!(panel.material().borrow().matcap, VariantHandle(0));
    }

    #[test]
    fn test_fewer_variants_than_default() {
        let panel = ParameterPanel::new(
            vec![VariantHandle(0), VariantHandle(1), VariantHandle(2)],
            shared_material("matcap", VariantHandle(0)),
        );
        assert_eq!(panel.params().active_variant, 3);
        assert_eq!(panel.material().borrow().matcap, VariantHandle(2));
    }

    #[test]
    fn test_set_variants_reapplies_material() {
        let mut panel = panel();
        panel.set_variants(vec![VariantHandle(10), VariantHandle(11)]);
        assert_eq!(panel.params().active_variant, 2);
        assert_eq!(panel.variant_spec().max, 2);
        assert_eq!(panel.material().borrow().matcap, VariantHandle(11));
    }

    #[test]
    fn test_subscribers_see_changes_once() {
        let mut panel = panel();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        panel.subscribe(move |change| sink.borrow_mut().push(*change));

        panel.set_rotation_enabled(false);
        panel.set_rotation_enabled(false);
        panel.set_falling_speed(4.0);
        panel.set_active_variant(2);

        assert_eq!(
            *seen.borrow(),
            vec![
                ParamChange::RotationEnabled(false),
                ParamChange::FallingSpeed(FALLING_SPEED.snap(4.0)),
                ParamChange::ActiveVariant(2),
            ]
        );
    }

    #[test]
    fn test_reset_notifies_and_moves_entities() {
        use crate::simulation::ParticlePool;

        let mut panel = panel();
        let mut pool = ParticlePool::builder().with_count(4).with_seed(11).build();
        let before: Vec<_> = pool.entities().iter().map(|e| e.position).collect();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        panel.subscribe(move |change| sink.borrow_mut().push(*change));

        panel.reset_positions(&mut pool);

        assert_eq!(*seen.borrow(), vec![ParamChange::ResetPositions]);
        assert!(pool
            .entities()
            .iter()
            .zip(&before)
            .any(|(e, b)| e.position != *b));
    }

    #[test]
    fn test_status_reads_simulation() {
        use crate::simulation::ParticlePool;

        let pool = ParticlePool::builder().with_count(6).with_seed(2).build();
        let status = PanelStatus::of(&pool, 1.5);
        assert_eq!(status.title, "Donuts");
        assert_eq!(status.entity_count, 6);
        assert_eq!(status.falling_count, 0);
    }

    #[test]
    fn test_speed_setters_snap() {
        let mut panel = panel();
        panel.set_rotation_speed(7.5);
        panel.set_falling_speed(0.0);
        assert_eq!(panel.params().rotation_speed, 5.0);
        assert_eq!(panel.params().falling_speed, 0.1);
    }
}
