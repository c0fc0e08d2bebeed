//! Static timing plan: the ordered, circular phase sequence and the
//! signal-to-phase bindings.
//!
//! A [`TimingPlan`] is validated once at construction and immutable
//! afterwards. Every configuration variant of the controller (simple
//! rotation, dedicated pre-green phases, the two-axis NS/EW scheme) is an
//! instance of this one type, selected by the preset constructors.
//!
//! # Design Principles
//!
//! - Phase durations live in a `Vec` indexed by [`PhaseIndex`]. Only the
//!   plan mints indices, so an out-of-range lookup cannot be written by
//!   callers.
//! - Light derivation matches exhaustively on [`PhaseStage`] and
//!   [`LightPolicy`]. There is no default branch.

use std::collections::BTreeSet;

use intersection_types::{LightState, PhaseStage, Position, SignalId};
use serde::{Deserialize, Serialize};

/// Errors detected while validating a timing plan.
///
/// Any of these at startup is fatal: the controller never runs with an
/// invalid plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// The phase list is empty.
    #[error("timing plan must contain at least one phase")]
    NoPhases,

    /// A phase was configured with a zero-second duration.
    #[error("phase {phase} has zero duration")]
    ZeroDuration {
        /// Identifier of the offending phase.
        phase: String,
    },

    /// Two phases share an identifier.
    #[error("duplicate phase id: {phase}")]
    DuplicatePhase {
        /// The repeated identifier.
        phase: String,
    },

    /// The signal list is empty.
    #[error("timing plan must contain at least one signal")]
    NoSignals,

    /// Two signals share an identifier.
    #[error("duplicate signal id: {signal}")]
    DuplicateSignal {
        /// The repeated identifier.
        signal: SignalId,
    },

    /// A signal references a phase index past the end of the sequence.
    #[error("signal {signal} references phase index {index}, but the plan has {count} phases")]
    PhaseOutOfRange {
        /// The signal holding the bad reference.
        signal: SignalId,
        /// The referenced index.
        index: usize,
        /// Number of phases in the plan.
        count: usize,
    },

    /// A signal binds its green (or pre-green) window to a phase of the
    /// other stage.
    #[error("signal {signal} expects a {expected:?} phase but {phase} is {actual:?}")]
    StageMismatch {
        /// The signal holding the bad reference.
        signal: SignalId,
        /// Identifier of the referenced phase.
        phase: String,
        /// Stage the binding requires.
        expected: PhaseStage,
        /// Stage the phase actually has.
        actual: PhaseStage,
    },

    /// The yellow window is zero or not shorter than every green phase.
    #[error("invalid yellow window: {reason}")]
    InvalidWindow {
        /// Explanation of what is wrong with the window.
        reason: String,
    },

    /// A lookup named a signal the plan does not define.
    #[error("unknown signal: {signal}")]
    UnknownSignal {
        /// The identifier that was looked up.
        signal: SignalId,
    },
}

/// Position of a phase within its plan's sequence.
///
/// Minted only by [`TimingPlan`], so it is always in range for the plan
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PhaseIndex(usize);

impl PhaseIndex {
    /// The raw zero-based index.
    pub const fn get(self) -> usize {
        self.0
    }
}

/// One step of the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    /// Identifier reported in snapshots (e.g. `L2_PreGreen`).
    pub id: String,
    /// Fixed duration in seconds; always at least 1.
    pub duration_seconds: u32,
    /// What the phase does for the signals bound to it.
    pub stage: PhaseStage,
}

impl Phase {
    /// Create a phase.
    pub fn new(id: impl Into<String>, duration_seconds: u32, stage: PhaseStage) -> Self {
        Self {
            id: id.into(),
            duration_seconds,
            stage,
        }
    }
}

/// Descriptive metadata of one signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct SignalSpec {
    /// Stable identifier.
    pub id: SignalId,
    /// Human-readable lane or direction label.
    pub lane_name: String,
    /// Compass approach.
    pub position: Position,
}

impl SignalSpec {
    /// Create a signal description.
    pub fn new(id: impl Into<SignalId>, lane_name: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            lane_name: lane_name.into(),
            position,
        }
    }
}

/// Unvalidated signal binding passed to [`TimingPlan::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalBinding {
    /// Signal metadata.
    pub spec: SignalSpec,
    /// Index of the phase during which the signal shows green.
    pub green_phase: usize,
    /// Index of the signal's dedicated pre-green phase, if any.
    pub pre_green_phase: Option<usize>,
}

/// Validated signal binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPlan {
    /// Signal metadata.
    #[serde(flatten)]
    pub spec: SignalSpec,
    /// Phase during which the signal shows green.
    pub green_phase: PhaseIndex,
    /// Dedicated pre-green phase, if the plan has one for this signal.
    pub pre_green_phase: Option<PhaseIndex>,
}

impl SignalPlan {
    /// The phase whose start ends this signal's wait: its pre-green phase
    /// if it has one, otherwise its green phase.
    pub const fn target_phase(&self) -> PhaseIndex {
        match self.pre_green_phase {
            Some(phase) => phase,
            None => self.green_phase,
        }
    }
}

/// How yellow is shown around green phases, beyond dedicated pre-green
/// phases (which are always yellow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LightPolicy {
    /// Green for the full green phase; no yellow outside pre-green phases.
    Plain,
    /// The green signal shows yellow for the last `window_seconds` of its
    /// green phase.
    TrailingYellow {
        /// Length of the trailing window.
        window_seconds: u32,
    },
    /// The signal scheduled next shows yellow during the last
    /// `window_seconds` of the current green phase.
    Overlap {
        /// Length of the overlap window.
        window_seconds: u32,
    },
}

/// Light shown by one signal at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalLight {
    /// The aspect shown.
    pub light: LightState,
    /// True while the signal is in an advance-warning interval.
    pub is_pre_green: bool,
}

impl SignalLight {
    const RED: Self = Self {
        light: LightState::Red,
        is_pre_green: false,
    };

    const WARNING: Self = Self {
        light: LightState::Yellow,
        is_pre_green: true,
    };

    /// Green, pre-green, or inside a yellow window.
    pub const fn is_active(self) -> bool {
        self.light.is_lit()
    }
}

/// Validated, immutable phase sequence and signal bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingPlan {
    phases: Vec<Phase>,
    signals: Vec<SignalPlan>,
    policy: LightPolicy,
}

impl TimingPlan {
    /// Build and validate a plan from explicit phases and bindings.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] describing the first violated rule: empty
    /// phase or signal list, zero duration, duplicate identifiers, a
    /// binding out of range or pointing at a phase of the wrong stage, or
    /// a yellow window that is zero or not shorter than every green phase.
    pub fn new(
        phases: Vec<Phase>,
        bindings: Vec<SignalBinding>,
        policy: LightPolicy,
    ) -> Result<Self, PlanError> {
        if phases.is_empty() {
            return Err(PlanError::NoPhases);
        }

        if bindings.is_empty() {
            return Err(PlanError::NoSignals);
        }
        let mut signal_ids = BTreeSet::new();
        for binding in &bindings {
            if !signal_ids.insert(binding.spec.id.as_str()) {
                return Err(PlanError::DuplicateSignal {
                    signal: binding.spec.id.clone(),
                });
            }
        }

        let mut phase_ids = BTreeSet::new();
        for phase in &phases {
            if phase.duration_seconds == 0 {
                return Err(PlanError::ZeroDuration {
                    phase: phase.id.clone(),
                });
            }
            if !phase_ids.insert(phase.id.as_str()) {
                return Err(PlanError::DuplicatePhase {
                    phase: phase.id.clone(),
                });
            }
        }

        let mut signals = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let green_phase =
                resolve_binding(&phases, &binding.spec.id, binding.green_phase, PhaseStage::Green)?;
            let pre_green_phase = binding
                .pre_green_phase
                .map(|index| {
                    resolve_binding(&phases, &binding.spec.id, index, PhaseStage::PreGreen)
                })
                .transpose()?;
            signals.push(SignalPlan {
                spec: binding.spec,
                green_phase,
                pre_green_phase,
            });
        }

        validate_window(&phases, policy)?;

        Ok(Self {
            phases,
            signals,
            policy,
        })
    }

    /// Simple rotation: one green phase per signal, in the given order.
    ///
    /// A `yellow_window_seconds` of 0 means no yellow at all; otherwise the
    /// green signal shows yellow for that many trailing seconds.
    ///
    /// # Errors
    ///
    /// See [`TimingPlan::new`].
    pub fn rotation(
        signals: Vec<SignalSpec>,
        green_seconds: u32,
        yellow_window_seconds: u32,
    ) -> Result<Self, PlanError> {
        let mut phases = Vec::with_capacity(signals.len());
        let mut bindings = Vec::with_capacity(signals.len());
        for spec in signals {
            let green = phases.len();
            phases.push(Phase::new(
                format!("{}_Green", spec.id),
                green_seconds,
                PhaseStage::Green,
            ));
            bindings.push(SignalBinding {
                spec,
                green_phase: green,
                pre_green_phase: None,
            });
        }

        let policy = if yellow_window_seconds == 0 {
            LightPolicy::Plain
        } else {
            LightPolicy::TrailingYellow {
                window_seconds: yellow_window_seconds,
            }
        };

        Self::new(phases, bindings, policy)
    }

    /// Dedicated pre-green: `[PreGreen(s), Green(s)]` for each signal in turn.
    ///
    /// With `overlap`, the signal scheduled next also shows yellow during
    /// the last `pre_green_seconds` of the preceding green phase.
    ///
    /// # Errors
    ///
    /// See [`TimingPlan::new`].
    pub fn pre_green(
        signals: Vec<SignalSpec>,
        green_seconds: u32,
        pre_green_seconds: u32,
        overlap: bool,
    ) -> Result<Self, PlanError> {
        let mut phases = Vec::with_capacity(signals.len().saturating_mul(2));
        let mut bindings = Vec::with_capacity(signals.len());
        for spec in signals {
            let pre = phases.len();
            phases.push(Phase::new(
                format!("{}_PreGreen", spec.id),
                pre_green_seconds,
                PhaseStage::PreGreen,
            ));
            let green = phases.len();
            phases.push(Phase::new(
                format!("{}_Green", spec.id),
                green_seconds,
                PhaseStage::Green,
            ));
            bindings.push(SignalBinding {
                spec,
                green_phase: green,
                pre_green_phase: Some(pre),
            });
        }

        let policy = if overlap {
            LightPolicy::Overlap {
                window_seconds: pre_green_seconds,
            }
        } else {
            LightPolicy::Plain
        };

        Self::new(phases, bindings, policy)
    }

    /// Two-axis scheme: North/South and East/West movements share phases.
    ///
    /// Sequence: `NS_Green`, `EW_PreGreen`, `EW_Green`, `NS_PreGreen`.
    ///
    /// # Errors
    ///
    /// See [`TimingPlan::new`].
    pub fn axis(green_seconds: u32, pre_green_seconds: u32) -> Result<Self, PlanError> {
        let phases = vec![
            Phase::new("NS_Green", green_seconds, PhaseStage::Green),
            Phase::new("EW_PreGreen", pre_green_seconds, PhaseStage::PreGreen),
            Phase::new("EW_Green", green_seconds, PhaseStage::Green),
            Phase::new("NS_PreGreen", pre_green_seconds, PhaseStage::PreGreen),
        ];
        let north_south = |spec| SignalBinding {
            spec,
            green_phase: 0,
            pre_green_phase: Some(3),
        };
        let east_west = |spec| SignalBinding {
            spec,
            green_phase: 2,
            pre_green_phase: Some(1),
        };
        let bindings = vec![
            north_south(SignalSpec::new("N", "Northbound", Position::North)),
            north_south(SignalSpec::new("S", "Southbound", Position::South)),
            east_west(SignalSpec::new("E", "Eastbound", Position::East)),
            east_west(SignalSpec::new("W", "Westbound", Position::West)),
        ];

        Self::new(phases, bindings, LightPolicy::Plain)
    }

    /// Number of phases in one cycle.
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// The phase every cycle starts with.
    #[allow(clippy::unused_self)]
    pub const fn first_phase(&self) -> PhaseIndex {
        PhaseIndex(0)
    }

    /// The phase after `phase`, wrapping from the last back to the first.
    pub fn next_phase(&self, phase: PhaseIndex) -> PhaseIndex {
        let next = phase.0.saturating_add(1);
        if next >= self.phases.len() {
            self.first_phase()
        } else {
            PhaseIndex(next)
        }
    }

    /// Convert a raw index into a [`PhaseIndex`] if it is in range.
    pub fn phase_index(&self, index: usize) -> Option<PhaseIndex> {
        (index < self.phases.len()).then_some(PhaseIndex(index))
    }

    /// The phase at `phase`.
    ///
    /// # Panics
    ///
    /// Panics if `phase` was minted by a different, shorter plan. Indices
    /// are only produced by a plan for itself, so this is a programming
    /// error rather than a runtime condition.
    #[allow(clippy::indexing_slicing)]
    pub fn phase(&self, phase: PhaseIndex) -> &Phase {
        &self.phases[phase.0]
    }

    /// Duration in seconds of the phase at `phase`.
    pub fn duration_of(&self, phase: PhaseIndex) -> u32 {
        self.phase(phase).duration_seconds
    }

    /// All phases in cycle order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// All signals in configuration order.
    pub fn signals(&self) -> &[SignalPlan] {
        &self.signals
    }

    /// Look up a signal by identifier.
    pub fn signal(&self, id: &SignalId) -> Option<&SignalPlan> {
        self.signals.iter().find(|s| &s.spec.id == id)
    }

    /// The yellow-window policy.
    pub const fn policy(&self) -> LightPolicy {
        self.policy
    }

    /// Length of one full cycle in seconds.
    pub fn cycle_duration(&self) -> u32 {
        self.phases
            .iter()
            .fold(0u32, |acc, p| acc.saturating_add(p.duration_seconds))
    }

    /// Seconds from the start of the cycle to the start of `phase`.
    pub fn offset_of(&self, phase: PhaseIndex) -> u32 {
        self.phases
            .iter()
            .take(phase.0)
            .fold(0u32, |acc, p| acc.saturating_add(p.duration_seconds))
    }

    /// Static light of `signal` during `phase`, ignoring yellow windows:
    /// green in its green phase, yellow in its pre-green phase, red
    /// otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownSignal`] if the plan has no such signal.
    pub fn signal_light_state(
        &self,
        signal: &SignalId,
        phase: PhaseIndex,
    ) -> Result<LightState, PlanError> {
        let binding = self.signal(signal).ok_or_else(|| PlanError::UnknownSignal {
            signal: signal.clone(),
        })?;
        let light = if phase == binding.green_phase {
            LightState::Green
        } else if binding.pre_green_phase == Some(phase) {
            LightState::Yellow
        } else {
            LightState::Red
        };
        Ok(light)
    }

    /// Light of `signal` during `phase` with `seconds_remaining` left in
    /// it, applying the plan's yellow-window policy.
    pub fn light_at(
        &self,
        signal: &SignalPlan,
        phase: PhaseIndex,
        seconds_remaining: u32,
    ) -> SignalLight {
        if phase == signal.green_phase {
            let light = match self.policy {
                LightPolicy::TrailingYellow { window_seconds }
                    if seconds_remaining <= window_seconds =>
                {
                    LightState::Yellow
                }
                LightPolicy::Plain
                | LightPolicy::TrailingYellow { .. }
                | LightPolicy::Overlap { .. } => LightState::Green,
            };
            return SignalLight {
                light,
                is_pre_green: false,
            };
        }

        if signal.pre_green_phase == Some(phase) {
            return SignalLight::WARNING;
        }

        let in_overlap = match self.policy {
            LightPolicy::Overlap { window_seconds } => {
                let is_green_phase = match self.phase(phase).stage {
                    PhaseStage::Green => true,
                    PhaseStage::PreGreen => false,
                };
                is_green_phase
                    && seconds_remaining <= window_seconds
                    && self.next_phase(phase) == signal.target_phase()
            }
            LightPolicy::Plain | LightPolicy::TrailingYellow { .. } => false,
        };

        if in_overlap {
            SignalLight::WARNING
        } else {
            SignalLight::RED
        }
    }
}

/// Check that `index` is in range and refers to a phase of `expected` stage.
fn resolve_binding(
    phases: &[Phase],
    signal: &SignalId,
    index: usize,
    expected: PhaseStage,
) -> Result<PhaseIndex, PlanError> {
    let phase = phases.get(index).ok_or_else(|| PlanError::PhaseOutOfRange {
        signal: signal.clone(),
        index,
        count: phases.len(),
    })?;
    if phase.stage != expected {
        return Err(PlanError::StageMismatch {
            signal: signal.clone(),
            phase: phase.id.clone(),
            expected,
            actual: phase.stage,
        });
    }
    Ok(PhaseIndex(index))
}

/// A yellow window must be non-zero and leave every green phase at least
/// one second of plain green.
fn validate_window(phases: &[Phase], policy: LightPolicy) -> Result<(), PlanError> {
    let window = match policy {
        LightPolicy::Plain => return Ok(()),
        LightPolicy::TrailingYellow { window_seconds } | LightPolicy::Overlap { window_seconds } => {
            window_seconds
        }
    };

    if window == 0 {
        return Err(PlanError::InvalidWindow {
            reason: "window must be at least 1 second".to_owned(),
        });
    }

    let too_short = phases.iter().find(|p| match p.stage {
        PhaseStage::Green => p.duration_seconds <= window,
        PhaseStage::PreGreen => false,
    });
    if let Some(phase) = too_short {
        return Err(PlanError::InvalidWindow {
            reason: format!(
                "{window}s window is not shorter than green phase {} ({}s)",
                phase.id, phase.duration_seconds
            ),
        });
    }

    Ok(())
}
