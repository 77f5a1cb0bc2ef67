use crate::{
    analysis::phase::{DEFAULT_DISPLAY_RATE, DEFAULT_TAU},
    cycle::{CycleModel, PulseParams, PulseWave},
    grid::{SampleGrid, DEFAULT_SAMPLE_RATE},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// One `[[waves]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveConfig {
    pub name: String,
    pub amplitude: f64,
    pub mean: f64,
    pub left_spread: f64,
    pub right_spread: f64,
}

impl WaveConfig {
    fn to_wave(&self) -> PulseWave {
        PulseWave::new(
            self.name.clone(),
            PulseParams::new(
                self.amplitude,
                self.mean,
                self.left_spread,
                self.right_spread,
            ),
        )
    }
}

impl From<&PulseWave> for WaveConfig {
    fn from(wave: &PulseWave) -> Self {
        Self {
            name: wave.name.clone(),
            amplitude: wave.params.amplitude,
            mean: wave.params.mean,
            left_spread: wave.params.left_spread,
            right_spread: wave.params.right_spread,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub cycles: usize,
    /// Extra T-wave height (mV) added on alternate beats.
    pub alternans: f64,
    /// Noise level as a fraction of the peak amplitude.
    pub noise: f64,
    pub seed: Option<u64>,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            cycles: 30,
            alternans: 0.0,
            noise: 0.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rate assumed for loaded recordings (Hz).
    pub display_rate: f64,
    /// Pseudophase lag in samples.
    pub tau: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            display_rate: DEFAULT_DISPLAY_RATE,
            tau: DEFAULT_TAU,
        }
    }
}

/// Everything needed to rebuild a session: the cycle, the sequence settings
/// and the analysis settings. Every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardioConfig {
    pub heart_rate: f64,
    pub sample_rate: f64,
    pub waves: Vec<WaveConfig>,
    pub sequence: SequenceConfig,
    pub analysis: AnalysisConfig,
}

impl Default for CardioConfig {
    fn default() -> Self {
        Self {
            heart_rate: 60.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            waves: CycleModel::default_waves().iter().map(WaveConfig::from).collect(),
            sequence: SequenceConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl CardioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn grid(&self) -> Result<SampleGrid> {
        Ok(SampleGrid::new(self.sample_rate)?)
    }

    pub fn display_grid(&self) -> Result<SampleGrid> {
        Ok(SampleGrid::new(self.analysis.display_rate)?)
    }

    pub fn build_model(&self) -> Result<CycleModel> {
        let waves = self.waves.iter().map(WaveConfig::to_wave).collect();
        let model = CycleModel::new(self.heart_rate, self.grid()?, waves)
            .context("building cycle model from config")?;
        Ok(model)
    }
}
