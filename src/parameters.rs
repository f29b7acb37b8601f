//! Simulation parameters.
//!
//! Parameters are read once before the simulation starts and never change
//! afterwards. They can come from three places:
//! * `Parameters::default()` plus field overrides in code,
//! * a JSON file (`ContextParametersExt::load_parameters_from_json`),
//! * the raw text of a settings form (`ParameterForm::parse`), where every
//!   malformed field is reported by name instead of aborting.
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::OutbreakError;
use crate::{debug, define_data_plugin};

/// Days an infected agent lives with the disease before becoming immune.
pub const DEFAULT_INCUBATION_PERIOD: u32 = 5;
/// Radius used when looking for a walkable point near a target.
pub const DEFAULT_SEARCH_RADIUS: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    pub population_size: u32,
    pub initial_infected: u32,
    pub transmission_rate: f64,
    pub num_days: u32,
    pub tasks_per_day: u32,
    /// Simulated time units each errand takes once the agent has arrived.
    pub task_duration: u32,
    pub incubation_period: u32,
    /// Chance that an agent has each underlying condition.
    pub condition_prevalence: f64,
    pub search_radius: f64,
    pub walk_speed: f64,
    /// How often a travelling agent checks whether it has arrived.
    pub arrival_poll_interval: f64,
    pub seed: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            population_size: 50,
            initial_infected: 3,
            transmission_rate: 0.1,
            num_days: 3,
            tasks_per_day: 6,
            task_duration: 5,
            incubation_period: DEFAULT_INCUBATION_PERIOD,
            condition_prevalence: 0.1,
            search_radius: DEFAULT_SEARCH_RADIUS,
            walk_speed: 5.0,
            arrival_poll_interval: 1.0,
            seed: 0,
        }
    }
}

impl Parameters {
    /// Checks every range constraint and names the first field that fails.
    ///
    /// # Errors
    ///
    /// Returns `OutbreakError::ConfigError` for the offending field.
    pub fn validate(&self) -> Result<(), OutbreakError> {
        if self.population_size == 0 {
            return Err(OutbreakError::config(
                "population_size",
                "must be greater than zero",
            ));
        }
        if self.initial_infected > self.population_size {
            return Err(OutbreakError::config(
                "initial_infected",
                format!(
                    "{} exceeds the population size {}",
                    self.initial_infected, self.population_size
                ),
            ));
        }
        check_probability("transmission_rate", self.transmission_rate)?;
        check_nonzero("num_days", self.num_days)?;
        check_nonzero("tasks_per_day", self.tasks_per_day)?;
        check_nonzero("task_duration", self.task_duration)?;
        check_nonzero("incubation_period", self.incubation_period)?;
        check_probability("condition_prevalence", self.condition_prevalence)?;
        check_positive("search_radius", self.search_radius)?;
        check_positive("walk_speed", self.walk_speed)?;
        check_positive("arrival_poll_interval", self.arrival_poll_interval)?;
        Ok(())
    }

    /// Reads and validates parameters from a JSON file. Missing fields take
    /// their default values.
    ///
    /// # Errors
    ///
    /// I/O and JSON errors, or a `ConfigError` from validation.
    pub fn from_json_file(path: &Path) -> Result<Parameters, OutbreakError> {
        let text = fs::read_to_string(path)?;
        let parameters: Parameters = serde_json::from_str(&text)?;
        parameters.validate()?;
        Ok(parameters)
    }
}

fn check_nonzero(field: &'static str, value: u32) -> Result<(), OutbreakError> {
    if value == 0 {
        return Err(OutbreakError::config(field, "must be greater than zero"));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<(), OutbreakError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(OutbreakError::config(
            field,
            format!("{value} is not a positive number"),
        ));
    }
    Ok(())
}

fn check_probability(field: &'static str, value: f64) -> Result<(), OutbreakError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(OutbreakError::config(
            field,
            format!("{value} is not between 0 and 1"),
        ));
    }
    Ok(())
}

/// Raw text of the settings form, one string per input box.
#[derive(Debug, Clone, Default)]
pub struct ParameterForm {
    pub population_size: String,
    pub initial_infected: String,
    pub transmission_rate: String,
    pub num_days: String,
    pub tasks_per_day: String,
    pub task_duration: String,
}

impl ParameterForm {
    /// Parses every box on top of `Parameters::default()` and validates the
    /// result.
    ///
    /// # Errors
    ///
    /// `OutbreakError::ConfigError` naming the first field that is not a
    /// number of the right kind or is out of range.
    pub fn parse(&self) -> Result<Parameters, OutbreakError> {
        let parameters = Parameters {
            population_size: parse_field("population_size", &self.population_size)?,
            initial_infected: parse_field("initial_infected", &self.initial_infected)?,
            transmission_rate: parse_field("transmission_rate", &self.transmission_rate)?,
            num_days: parse_field("num_days", &self.num_days)?,
            tasks_per_day: parse_field("tasks_per_day", &self.tasks_per_day)?,
            task_duration: parse_field("task_duration", &self.task_duration)?,
            ..Parameters::default()
        };
        parameters.validate()?;
        Ok(parameters)
    }
}

fn parse_field<T: FromStr>(field: &'static str, text: &str) -> Result<T, OutbreakError> {
    text.trim()
        .parse()
        .map_err(|_| OutbreakError::config(field, format!("`{text}` is not a valid number")))
}

define_data_plugin!(ParametersPlugin, Option<Parameters>, None);

pub trait ContextParametersExt {
    /// Stores validated parameters. They can only be set once.
    ///
    /// # Errors
    ///
    /// `ConfigError` if validation fails, `StateError` if parameters were
    /// already set.
    fn init_parameters(&mut self, parameters: Parameters) -> Result<(), OutbreakError>;

    /// Loads parameters from a JSON file and stores them.
    ///
    /// # Errors
    ///
    /// Any error from reading, parsing, validating, or storing.
    fn load_parameters_from_json(&mut self, path: &Path) -> Result<(), OutbreakError>;

    /// # Panics
    ///
    /// Panics if parameters have not been set.
    fn get_parameters(&self) -> &Parameters;

    fn try_get_parameters(&self) -> Option<&Parameters>;
}

impl ContextParametersExt for Context {
    fn init_parameters(&mut self, parameters: Parameters) -> Result<(), OutbreakError> {
        parameters.validate()?;
        let slot = self.get_data_mut(ParametersPlugin);
        if slot.is_some() {
            return Err(OutbreakError::StateError(
                "parameters have already been set".to_string(),
            ));
        }
        debug!("parameters: {parameters:?}");
        *slot = Some(parameters);
        Ok(())
    }

    fn load_parameters_from_json(&mut self, path: &Path) -> Result<(), OutbreakError> {
        let parameters = Parameters::from_json_file(path)?;
        self.init_parameters(parameters)
    }

    fn get_parameters(&self) -> &Parameters {
        self.try_get_parameters()
            .expect("parameters must be set before the simulation starts")
    }

    fn try_get_parameters(&self) -> Option<&Parameters> {
        self.get_data(ParametersPlugin).and_then(Option::as_ref)
    }
}
