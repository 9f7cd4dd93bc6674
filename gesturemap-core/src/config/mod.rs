use std::{str::FromStr, time::Duration};

use gesturemap_types::{
    ActionId, Button, Direction, GestureEvent, GestureState, MalformedGestureError, Phase,
};
use log::{debug, warn};
use thiserror::Error;

use crate::{
    axis::{
        Activation, ActivationMode, Axis, FilteredAxisMapping, MoveHandler, Sensitivity,
        StepOutput, ThrottledAxisMapping,
    },
    binding::Binding,
    binding_set::BindingSet,
    capability::CapabilityRegistry,
    filter::FilterKind,
};

pub mod serial_profile;

use serial_profile::{Entry, FilterNode, Profile, SensitivityNode};

/// Profiles shipped with the engine
pub static DEFAULT_PROFILES: &str = include_str!("profiles.kdl");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Parse(#[from] knuffel::Error),
    #[error("Unknown {kind} `{name}` in profile `{profile}`")]
    UnknownName {
        profile: String,
        kind: &'static str,
        name: String,
    },
    #[error("Malformed gesture in profile `{profile}`: {source}")]
    MalformedGesture {
        profile: String,
        #[source]
        source: MalformedGestureError,
    },
    #[error("No move handler for continuous mapping `{mapping}` in profile `{profile}`")]
    MissingMoveHandler { profile: String, mapping: String },
    #[error("Profile `{0}` is defined more than once")]
    DuplicateProfile(String),
}

/// A decoded profile document
#[derive(Debug)]
pub struct ProfileConfig {
    pub profiles: Vec<Profile>,
}

impl ProfileConfig {
    pub fn parse(file_name: &str, text: &str) -> Result<Self, ConfigError> {
        let profiles = knuffel::parse::<Vec<Profile>>(file_name, text)?;
        Ok(Self { profiles })
    }

    pub fn default_profiles() -> Result<Self, ConfigError> {
        Self::parse("profiles.kdl", DEFAULT_PROFILES)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(|profile| profile.name.as_str())
    }
}

/**
 * Builds one binding per profile
 *
 * Every profile gets its own registry from `registry_factory`, called with the profile name. Continuous mappings
 * get their output from `move_handler_factory`, called with the profile and mapping names.
 */
pub fn build_binding_set<R, M>(
    config: &ProfileConfig,
    mut registry_factory: R,
    mut move_handler_factory: M,
) -> Result<BindingSet, ConfigError>
where
    R: FnMut(&str) -> CapabilityRegistry,
    M: FnMut(&str, &str) -> Option<MoveHandler>,
{
    let mut set = BindingSet::new();

    for profile in config.profiles.iter() {
        if set.position(&profile.name).is_some() {
            return Err(ConfigError::DuplicateProfile(profile.name.clone()));
        }

        let binding = build_binding(
            profile,
            registry_factory(&profile.name),
            &mut move_handler_factory,
        )?;
        set.add_if_absent(binding);

        if profile.default {
            match set.default_name() {
                Some(existing) => warn!(
                    "Profile {} is marked default but {existing} already is, ignoring",
                    profile.name
                ),
                None => set.set_default(profile.name.as_str()),
            }
        }
    }

    debug!("Built bindings {:?}", set.names());
    Ok(set)
}

fn build_binding<M>(
    profile: &Profile,
    registry: CapabilityRegistry,
    move_handler_factory: &mut M,
) -> Result<Binding, ConfigError>
where
    M: FnMut(&str, &str) -> Option<MoveHandler>,
{
    let names = Names(&profile.name);
    let mut binding = Binding::new(profile.name.as_str(), registry);

    for entry in profile.entries.iter() {
        match entry {
            Entry::Map(map) => {
                let button = names.parse("button", &map.button)?;
                let phase: Phase = names.parse("phase", &map.phase)?;
                let state = match &map.state {
                    Some(state) => names.parse("gesture state", state)?,
                    None => GestureState::None,
                };

                let event = GestureEvent::try_new(button, phase, Direction::None, state)
                    .map_err(|source| ConfigError::MalformedGesture {
                        profile: profile.name.clone(),
                        source,
                    })?;
                binding.add_mapping(event, names.parse::<ActionId>("action", &map.action)?);
            }
            Entry::Direction(map) => {
                let direction = names.parse("direction", &map.direction)?;
                binding.add_mapping(
                    GestureEvent::on_direction(direction),
                    names.parse::<ActionId>("action", &map.action)?,
                );
            }
            Entry::Continuous(continuous) => {
                let activation = Activation::new(
                    names.parse::<Button>("button", &continuous.button)?,
                    names.parse::<ActivationMode>("activation mode", &continuous.mode)?,
                );
                let filter = match &continuous.filter {
                    Some(filter) => filter_kind(&names, filter)?,
                    None => FilterKind::default(),
                };
                let on_move = move_handler_factory(&profile.name, &continuous.name).ok_or_else(
                    || ConfigError::MissingMoveHandler {
                        profile: profile.name.clone(),
                        mapping: continuous.name.clone(),
                    },
                )?;

                let mapping = FilteredAxisMapping::new(
                    continuous.name.as_str(),
                    activation,
                    Duration::from_millis(continuous.interval_ms),
                    filter.build(),
                    on_move,
                )
                .with_sensitivity(sensitivity(continuous.sensitivity.as_ref()));
                binding.add_axis_mapping(Box::new(mapping));
            }
            Entry::Steps(steps) => {
                let activation = Activation::new(
                    names.parse::<Button>("button", &steps.button)?,
                    names.parse::<ActivationMode>("activation mode", &steps.mode)?,
                );
                let output = StepOutput::Actions {
                    increment: names.parse("action", &steps.increment)?,
                    decrement: names.parse("action", &steps.decrement)?,
                };

                let mapping = ThrottledAxisMapping::new(
                    steps.name.as_str(),
                    activation,
                    names.parse::<Axis>("axis", &steps.axis)?,
                    steps.factor,
                    Duration::from_millis(steps.interval_ms),
                    output,
                )
                .with_sensitivity(sensitivity(steps.sensitivity.as_ref()));
                binding.add_axis_mapping(Box::new(mapping));
            }
        }
    }

    Ok(binding)
}

fn filter_kind(names: &Names, node: &FilterNode) -> Result<FilterKind, ConfigError> {
    let kind = match node.kind.as_str() {
        "one_euro" => FilterKind::OneEuro {
            min_cutoff: node.min_cutoff.unwrap_or(1.),
            beta: node.beta.unwrap_or(0.007),
            derivative_cutoff: node.derivative_cutoff.unwrap_or(1.),
        },
        "kalman" => FilterKind::Kalman {
            process_noise: node.process_noise.unwrap_or(0.01),
            measurement_noise: node.measurement_noise.unwrap_or(0.1),
        },
        "exponential" => FilterKind::Exponential {
            alpha: node.alpha.unwrap_or(0.5),
        },
        "double_exponential" => FilterKind::DoubleExponential {
            alpha: node.alpha.unwrap_or(0.5),
            beta: node.beta.unwrap_or(0.5),
        },
        "predictive" => FilterKind::Predictive {
            lookahead: node.lookahead.unwrap_or(0.05),
        },
        "mute" => FilterKind::Mute,
        "passthrough" => FilterKind::Passthrough,
        other => return Err(names.unknown("filter", other)),
    };

    Ok(kind)
}

fn sensitivity(node: Option<&SensitivityNode>) -> Sensitivity {
    let defaults = Sensitivity::default();
    match node {
        Some(node) => Sensitivity {
            horizontal: node.horizontal.unwrap_or(defaults.horizontal),
            vertical: node.vertical.unwrap_or(defaults.vertical),
            global: node.global.unwrap_or(defaults.global),
            invert_x: node.invert_x,
            invert_y: node.invert_y,
            invert_z: node.invert_z,
        },
        None => defaults,
    }
}

/// Name lookups scoped to one profile, for error reporting
struct Names<'a>(&'a str);

impl Names<'_> {
    fn parse<T: FromStr>(&self, kind: &'static str, name: &str) -> Result<T, ConfigError> {
        name.parse().map_err(|_| self.unknown(kind, name))
    }

    fn unknown(&self, kind: &'static str, name: &str) -> ConfigError {
        ConfigError::UnknownName {
            profile: self.0.to_owned(),
            kind,
            name: name.to_owned(),
        }
    }
}
