//! Run configuration for Surge.
//!
//! Supports layered sources with precedence:
//! 1. Environment variables (highest priority)
//! 2. Config file specified by the `SURGE_CONFIG` env var
//! 3. `./config/surge.yaml`
//! 4. Built-in defaults (the classic 10s/30s/10s ramp profile)

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::schedule::{RampMode, RateSchedule, Stage};

/// HTTP method issued on each virtual-user iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    /// Plain GET, the default.
    #[default]
    Get,
    /// POST with an empty body.
    Post,
    /// HEAD, for targets where the body is irrelevant.
    Head,
}

impl HttpMethod {
    /// Returns the canonical lowercase string used in configuration files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Head => "head",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "head" => Ok(Self::Head),
            _ => Err(()),
        }
    }
}

/// One stage entry as written in configuration files.
///
/// `target` is signed so that negative values reach `validate` and produce a
/// proper error instead of a deserialization failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage length in seconds.
    pub duration_secs: f64,
    /// Target virtual-user count during the stage.
    pub target: i64,
}

fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig {
            duration_secs: 10.0,
            target: 10,
        },
        StageConfig {
            duration_secs: 30.0,
            target: 10,
        },
        StageConfig {
            duration_secs: 10.0,
            target: 0,
        },
    ]
}

/// Root run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Target URL hit by every virtual user.
    pub target_url: String,

    /// HTTP method for each request.
    #[serde(default)]
    pub method: HttpMethod,

    /// Pause between a virtual user's requests, in seconds.
    pub think_time_secs: f64,

    /// Per-request deadline, in seconds.
    pub request_timeout_secs: f64,

    /// Orchestrator reconciliation interval, in seconds.
    pub tick_interval_secs: f64,

    /// Interpolation between stage targets.
    #[serde(default)]
    pub ramp: RampMode,

    /// Ordered load stages.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:8180/test".to_string(),
            method: HttpMethod::Get,
            think_time_secs: 0.1,
            request_timeout_secs: 30.0,
            tick_interval_secs: 1.0,
            ramp: RampMode::Step,
            stages: default_stages(),
        }
    }
}

impl RunConfig {
    /// Loads configuration from all layered sources.
    ///
    /// # Errors
    ///
    /// Returns `Config` when a source fails to load or parse, and
    /// `InvalidSchedule` when the merged configuration fails validation.
    pub fn load() -> EngineResult<Self> {
        let mut builder = Config::builder();

        builder = Self::set_defaults(builder)?;

        if let Ok(config_path) = std::env::var("SURGE_CONFIG") {
            builder = builder.add_source(File::with_name(&config_path).required(false));
        }

        builder = builder.add_source(File::with_name("./config/surge").required(false));

        // Example: SURGE__THINK_TIME_SECS=0.5
        builder = builder.add_source(
            Environment::with_prefix("SURGE")
                .separator("__")
                .try_parsing(true),
        );

        let config: RunConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a specific file path, with defaults filled in.
    ///
    /// # Errors
    ///
    /// Returns `Config` when the file fails to load or parse, and
    /// `InvalidSchedule` when the result fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let mut builder = Config::builder();
        builder = Self::set_defaults(builder)?;
        let config: RunConfig = builder
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn set_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> EngineResult<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(builder
            .set_default("target_url", "http://localhost:8180/test")?
            .set_default("method", "get")?
            .set_default("think_time_secs", 0.1)?
            .set_default("request_timeout_secs", 30.0)?
            .set_default("tick_interval_secs", 1.0)?
            .set_default("ramp", "step")?)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` on any malformed field; nothing is spawned
    /// before this passes.
    pub fn validate(&self) -> EngineResult<()> {
        if self.target_url.is_empty() {
            return Err(EngineError::invalid_schedule("target_url must be set"));
        }
        if !self.target_url.starts_with("http://") && !self.target_url.starts_with("https://") {
            return Err(EngineError::invalid_schedule(format!(
                "target_url `{}` must use http or https",
                self.target_url
            )));
        }
        if self.stages.is_empty() {
            return Err(EngineError::invalid_schedule("stages must not be empty"));
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            if !stage.duration_secs.is_finite() || stage.duration_secs <= 0.0 {
                return Err(EngineError::invalid_schedule(format!(
                    "stage {idx} duration_secs must be > 0 (got {})",
                    stage.duration_secs
                )));
            }
            if stage.target < 0 {
                return Err(EngineError::invalid_schedule(format!(
                    "stage {idx} target must be >= 0 (got {})",
                    stage.target
                )));
            }
        }
        if !self.think_time_secs.is_finite() || self.think_time_secs < 0.0 {
            return Err(EngineError::invalid_schedule(format!(
                "think_time_secs must be >= 0 (got {})",
                self.think_time_secs
            )));
        }
        if !self.request_timeout_secs.is_finite() || self.request_timeout_secs <= 0.0 {
            return Err(EngineError::invalid_schedule(format!(
                "request_timeout_secs must be > 0 (got {})",
                self.request_timeout_secs
            )));
        }
        if !self.tick_interval_secs.is_finite() || self.tick_interval_secs <= 0.0 {
            return Err(EngineError::invalid_schedule(format!(
                "tick_interval_secs must be > 0 (got {})",
                self.tick_interval_secs
            )));
        }
        Ok(())
    }

    /// Builds the validated rate schedule.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` when validation fails.
    pub fn schedule(&self) -> EngineResult<RateSchedule> {
        self.validate()?;
        let stages = self
            .stages
            .iter()
            .map(|stage| {
                Stage::new(
                    Duration::from_secs_f64(stage.duration_secs),
                    stage.target as u32,
                )
            })
            .collect();
        RateSchedule::with_ramp(stages, self.ramp)
    }

    /// Think-time as a `Duration`.
    #[must_use]
    pub fn think_time(&self) -> Duration {
        Duration::from_secs_f64(self.think_time_secs)
    }

    /// Per-request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }

    /// Reconciliation tick interval as a `Duration`.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(self.tick_interval_secs)
    }
}
