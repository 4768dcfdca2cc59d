//! Navigation transition controller
//!
//! Owns the navigation stacks and the lifecycle of the one in-flight
//! transition. Every push, pop and swipe-back goes through here:
//!
//! 1. the coordinator lock is taken and a fresh progress signal created;
//! 2. an animation driver (or the finger) writes the signal every frame
//!    while the parallax driver derives layer styles from it;
//! 3. once the signal reaches its target the stack is updated and exactly
//!    one settle event is delivered, which drains deferred work and opens
//!    hydration gates.
//!
//! A new navigation request while a transition is in flight first
//! interrupts it: the running transition jumps to its resolved end and
//! settles before the next lock cycle begins.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::config::TransitionConfig;
use super::driver::{AnimationDriver, DriverStatus};
use super::interpolator::{progress_for_translation, progress_velocity, Interpolator, ReleaseDecision};
use super::parallax::ParallaxDriver;
use super::progress::{signal, COMPLETE, START};
use crate::navigation::{NavigationState, NavigationTab, Route};
use app_state::{
    HydrationGate, SettleOutcome, SettleReport, TransitionCoordinator, TransitionDescriptor,
    TransitionError, TransitionId,
};

/// Navigation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    /// Back navigation requested at the root of the stack
    #[error("Nothing to pop: already at the root screen")]
    NothingToPop,

    /// Gesture update with no transition in flight
    #[error("No transition is in flight")]
    NoActiveTransition,

    /// Gesture update for a programmatic transition
    #[error("Transition {0} is not driven by a gesture")]
    NotGestureDriven(TransitionId),

    /// Lock lifecycle error
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Result type for navigation operations
pub type Result<T> = std::result::Result<T, NavigationError>;

/// What the in-flight transition does to the stack when it commits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Push,
    Pop,
    BackGesture,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Finger down, progress follows the gesture
    Tracking,
    /// Animating towards a fixed endpoint
    Settling { target: f64 },
}

struct Active {
    id: TransitionId,
    descriptor: TransitionDescriptor,
    kind: Kind,
    phase: Phase,
    driver: AnimationDriver,
    parallax: ParallaxDriver,
}

/// Drives screen transitions for the navigation stacks
pub struct TransitionController {
    coordinator: Arc<TransitionCoordinator>,
    navigation: NavigationState,
    config: TransitionConfig,
    interpolator: Interpolator,
    active: Option<Active>,
    gates: HashMap<String, HydrationGate>,
}

impl TransitionController {
    /// Create a controller; the initial screen's gate opens at once
    pub fn new(coordinator: Arc<TransitionCoordinator>, config: TransitionConfig) -> Self {
        let interpolator = Interpolator::new(config.interpolator.clone());
        let mut controller = Self {
            coordinator,
            navigation: NavigationState::new(),
            config,
            interpolator,
            active: None,
            gates: HashMap::new(),
        };
        controller.ensure_gate();
        controller
    }

    /// Coordinator shared with the rest of the app
    pub fn coordinator(&self) -> &Arc<TransitionCoordinator> {
        &self.coordinator
    }

    /// Navigation stacks
    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    /// Transition configuration
    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    /// Whether a transition is in flight
    pub fn is_transitioning(&self) -> bool {
        self.active.is_some()
    }

    /// Identifier of the in-flight transition
    pub fn active_id(&self) -> Option<TransitionId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Progress of the in-flight transition
    pub fn progress(&self) -> Option<f64> {
        self.active.as_ref().map(|a| a.driver.progress())
    }

    /// Layer styles provider for the in-flight transition
    pub fn parallax(&self) -> Option<&ParallaxDriver> {
        self.active.as_ref().map(|a| &a.parallax)
    }

    /// Whether the in-flight transition closes the top screen
    pub fn is_closing(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.descriptor.is_closing())
    }

    /// Hydration gate of a screen instance
    pub fn gate(&self, key: &str) -> Option<&HydrationGate> {
        self.gates.get(key)
    }

    /// Whether a screen instance may mount its heavy children
    pub fn is_hydrated(&self, key: &str) -> bool {
        self.gates.get(key).is_some_and(HydrationGate::is_ready)
    }

    /// Push a screen. Programmatic pushes always complete; returns the new
    /// screen instance's key.
    pub fn push(&mut self, route: Route) -> Result<String> {
        self.interrupt()?;

        let descriptor = TransitionDescriptor::push(self.config.screen_width);
        let id = self.coordinator.begin(descriptor)?;

        tracing::debug!(transition_id = %id, route = route.title(), "push");
        let key = self.navigation.navigate(route);
        // armed while locked, so it opens on settle
        self.gates.insert(key.clone(), HydrationGate::arm(&self.coordinator, key.clone()));

        let mut driver = AnimationDriver::new(signal(START));
        driver.animate_to(COMPLETE, self.config.push(), self.config.easing);
        self.start(id, descriptor, Kind::Push, Phase::Settling { target: COMPLETE }, driver);
        Ok(key)
    }

    /// Dismiss the top screen with a programmatic animation
    pub fn go_back(&mut self) -> Result<TransitionId> {
        self.interrupt()?;
        if !self.navigation.can_go_back() {
            return Err(NavigationError::NothingToPop);
        }

        let descriptor = TransitionDescriptor::pop(self.config.screen_width);
        let id = self.coordinator.begin(descriptor)?;
        tracing::debug!(transition_id = %id, "pop");

        let mut driver = AnimationDriver::new(signal(START));
        driver.animate_to(COMPLETE, self.config.push(), self.config.easing);
        self.start(id, descriptor, Kind::Pop, Phase::Settling { target: COMPLETE }, driver);
        Ok(id)
    }

    /// Finger down on the left edge. A non-positive width falls back to the
    /// configured one.
    pub fn begin_back_gesture(&mut self, screen_width: f64) -> Result<TransitionId> {
        self.interrupt()?;
        if !self.navigation.can_go_back() {
            return Err(NavigationError::NothingToPop);
        }

        let width = if screen_width > 0.0 && screen_width.is_finite() {
            screen_width
        } else {
            self.config.screen_width
        };
        let descriptor = TransitionDescriptor::back_gesture(width);
        let id = self.coordinator.begin(descriptor)?;
        tracing::debug!(transition_id = %id, width, "back gesture started");

        let driver = AnimationDriver::new(signal(START));
        self.start(id, descriptor, Kind::BackGesture, Phase::Tracking, driver);
        Ok(id)
    }

    /// Finger moved: `translation` points to the right of where it went down.
    /// Returns the progress now held by the signal.
    pub fn update_gesture(&mut self, translation: f64) -> Result<f64> {
        let active = self.tracking_gesture()?;
        let progress = progress_for_translation(translation, active.descriptor.screen_width);
        Ok(active.driver.track(progress))
    }

    /// Finger up with a horizontal velocity in points per second (rightward
    /// positive). Starts the release animation towards the decided endpoint:
    /// the pop completes only if the projected progress reaches the commit
    /// threshold.
    pub fn release_gesture(&mut self, velocity: f64) -> Result<ReleaseDecision> {
        let config = self.config.clone();
        let interpolator = self.interpolator.clone();
        let active = self.tracking_gesture()?;

        let velocity = progress_velocity(velocity, active.descriptor.screen_width);
        let decision = interpolator.release(active.driver.progress(), velocity);
        let target = decision.target.progress();

        active
            .driver
            .animate_to(target, config.settle_for(decision.remaining()), config.easing);
        active.phase = Phase::Settling { target };

        tracing::debug!(
            transition_id = %active.id,
            progress = decision.progress,
            projected = decision.projected,
            target = ?decision.target,
            "back gesture released"
        );
        Ok(decision)
    }

    /// Advance the in-flight animation by one frame. Returns the settle
    /// report on the frame the transition finishes.
    pub fn tick(&mut self, dt: Duration) -> Result<Option<SettleReport>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        if active.phase == Phase::Tracking {
            return Ok(None);
        }

        match active.driver.tick(dt) {
            DriverStatus::Finished => self.finish().map(Some),
            DriverStatus::Animating | DriverStatus::Tracking => Ok(None),
        }
    }

    /// Run the in-flight animation to completion, `frame` at a time
    pub fn run_to_settle(&mut self, frame: Duration) -> Result<Option<SettleReport>> {
        if self.active.as_ref().is_some_and(|a| a.phase == Phase::Tracking) {
            return Ok(None);
        }
        while self.active.is_some() {
            if let Some(report) = self.tick(frame)? {
                return Ok(Some(report));
            }
            if frame.is_zero() {
                return self.interrupt();
            }
        }
        Ok(None)
    }

    /// End the in-flight transition now, delivering its one settle event.
    /// A gesture still under the finger resolves as a release without
    /// velocity.
    pub fn interrupt(&mut self) -> Result<Option<SettleReport>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };

        let target = match active.phase {
            Phase::Settling { target } => target,
            Phase::Tracking => self.interpolator.release(active.driver.progress(), 0.0).target.progress(),
        };
        tracing::debug!(transition_id = %active.id, target, "transition interrupted");
        active.driver.jump_to(target);
        self.finish().map(Some)
    }

    /// Focus a tab. Interrupts any transition in flight.
    pub fn switch_tab(&mut self, tab: NavigationTab) -> Result<()> {
        self.interrupt()?;
        self.navigation.switch_tab(tab);
        self.ensure_gate();
        Ok(())
    }

    fn start(
        &mut self,
        id: TransitionId,
        descriptor: TransitionDescriptor,
        kind: Kind,
        phase: Phase,
        driver: AnimationDriver,
    ) {
        let parallax = ParallaxDriver::new(driver.reader(), descriptor.screen_width, self.interpolator.clone());
        self.active = Some(Active { id, descriptor, kind, phase, driver, parallax });
    }

    fn tracking_gesture(&mut self) -> Result<&mut Active> {
        let active = self.active.as_mut().ok_or(NavigationError::NoActiveTransition)?;
        if active.kind != Kind::BackGesture || !active.descriptor.gesture_driven {
            return Err(NavigationError::NotGestureDriven(active.id));
        }
        if active.phase != Phase::Tracking {
            // already released; the finger is no longer driving progress
            return Err(NavigationError::NotGestureDriven(active.id));
        }
        Ok(active)
    }

    fn finish(&mut self) -> Result<SettleReport> {
        let active = self.active.take().ok_or(NavigationError::NoActiveTransition)?;
        let progress = active.driver.progress();

        let outcome = match active.kind {
            Kind::Push => SettleOutcome::Commit,
            Kind::Pop | Kind::BackGesture if progress >= COMPLETE => {
                if let Some(entry) = self.navigation.go_back() {
                    // dropping the gate cancels anything it still had scheduled
                    self.gates.remove(&entry.key);
                }
                SettleOutcome::Commit
            }
            Kind::Pop | Kind::BackGesture => SettleOutcome::Cancel,
        };

        let report = self.coordinator.settle(active.id, outcome)?;
        self.ensure_gate();

        tracing::debug!(
            transition_id = %report.id,
            outcome = ?report.outcome,
            drained = report.drain.ran(),
            hydrated = report.hydrated,
            "transition finished"
        );
        Ok(report)
    }

    /// Give the focused screen a gate if it has none (tab roots)
    fn ensure_gate(&mut self) {
        let key = self.navigation.current_key().to_string();
        if !self.gates.contains_key(&key) {
            let gate = HydrationGate::arm(&self.coordinator, key.clone());
            self.gates.insert(key, gate);
        }
    }
}

impl std::fmt::Debug for TransitionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionController")
            .field("route", self.navigation.current_route())
            .field("active", &self.active_id())
            .field("gates", &self.gates.len())
            .finish()
    }
}
