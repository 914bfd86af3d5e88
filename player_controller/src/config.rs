use std::fmt;

use character_motor_fps::{DriveMode, FpsMotorConfig};
use ground_contact::GroundProfile;
use rapier3d::prelude::Real;
use serde::{Deserialize, Serialize};

use crate::input::InputSettings;

/// Controller tunables. Angles are degrees here and radians everywhere else.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub input_enabled: bool,
    pub normalize_input: bool,
    pub speed: Real,
    pub slope_limit_deg: Real,
    /// Air resistance, applied only while airborne.
    pub air_drag: Real,
    pub can_jump: bool,
    pub jump_height: Real,
    pub can_run: bool,
    pub run_multiplier: Real,
    pub air_control: bool,
    pub airborne_sensitivity: Real,
    /// Degrees of turn per unit of look input.
    pub look_sensitivity_deg: Real,
    pub drive_mode: DriveMode,
    /// Full capsule height, caps included.
    pub capsule_height: Real,
    pub capsule_radius: Real,
    pub eye_height: Real,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let motor = FpsMotorConfig::default();
        Self {
            input_enabled: true,
            normalize_input: true,
            speed: motor.speed,
            slope_limit_deg: 45.0,
            air_drag: motor.air_drag,
            can_jump: true,
            jump_height: motor.jump_height,
            can_run: true,
            run_multiplier: motor.run_multiplier,
            air_control: motor.air_control,
            airborne_sensitivity: motor.airborne_sensitivity,
            look_sensitivity_deg: 1.0,
            drive_mode: DriveMode::default(),
            capsule_height: 2.0,
            capsule_radius: 0.5,
            eye_height: 0.8,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(String),
    Invalid(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(message) => write!(f, "controller config parse failed: {}", message),
            ConfigError::Invalid(errors) => {
                write!(f, "controller config invalid: {}", errors.join("; "))
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ControllerConfig {
    pub fn parse_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Parses and rejects configurations that fail validation.
    pub fn load_toml(text: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_toml(text)?;
        let validation = config.validate();
        if !validation.is_ok() {
            return Err(ConfigError::Invalid(validation.errors));
        }
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn validate(&self) -> ConfigValidation {
        let mut validation = ConfigValidation::default();
        let non_negative = [
            ("speed", self.speed),
            ("air_drag", self.air_drag),
            ("jump_height", self.jump_height),
            ("airborne_sensitivity", self.airborne_sensitivity),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                validation.errors.push(format!("{} must be >= 0", name));
            }
        }
        if !self.slope_limit_deg.is_finite() || !(0.0..=90.0).contains(&self.slope_limit_deg) {
            validation
                .errors
                .push("slope_limit_deg must be between 0 and 90".to_string());
        }
        if !self.run_multiplier.is_finite() || self.run_multiplier < 1.0 {
            validation
                .errors
                .push("run_multiplier must be >= 1".to_string());
        }
        if !self.look_sensitivity_deg.is_finite() {
            validation
                .errors
                .push("look_sensitivity_deg must be finite".to_string());
        } else if self.look_sensitivity_deg < 0.0 {
            validation
                .warnings
                .push("negative look_sensitivity_deg inverts both look axes".to_string());
        }
        if !self.capsule_radius.is_finite() || self.capsule_radius <= 0.0 {
            validation
                .errors
                .push("capsule_radius must be > 0".to_string());
        }
        if !self.capsule_height.is_finite() || self.capsule_height < self.capsule_radius * 2.0 {
            validation
                .errors
                .push("capsule_height must be at least twice capsule_radius".to_string());
        }
        if !self.eye_height.is_finite() {
            validation
                .errors
                .push("eye_height must be finite".to_string());
        } else if self.eye_height > self.capsule_height * 0.5 {
            validation
                .warnings
                .push("eye_height is above the top of the capsule".to_string());
        }
        if !self.input_enabled {
            validation
                .warnings
                .push("input is disabled; the character only falls and slides".to_string());
        }
        validation
    }

    pub fn slope_limit(&self) -> Real {
        self.slope_limit_deg.to_radians()
    }

    pub fn look_sensitivity(&self) -> Real {
        self.look_sensitivity_deg.to_radians()
    }

    pub fn motor_config(&self) -> FpsMotorConfig {
        FpsMotorConfig {
            speed: self.speed,
            air_drag: self.air_drag,
            jump_height: self.jump_height,
            run_multiplier: self.run_multiplier,
            air_control: self.air_control,
            airborne_sensitivity: self.airborne_sensitivity,
        }
    }

    pub fn ground_profile(&self) -> GroundProfile {
        GroundProfile {
            capsule_height: self.capsule_height,
            capsule_radius: self.capsule_radius,
            slope_limit: self.slope_limit(),
            classification: self.drive_mode.classification(),
        }
    }

    pub fn input_settings(&self) -> InputSettings {
        InputSettings {
            enabled: self.input_enabled,
            normalize: self.normalize_input,
            can_jump: self.can_jump,
            can_run: self.can_run,
        }
    }
}
