//! Configuration schema types
//!
//! A run configuration has a `manager` section, tagged by `kind`, and an
//! optional `workload` section describing a scripted milestone trace for
//! dry runs. Instruction counts are kept signed here so that validation can
//! report negative values instead of failing deserialization.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;

use crate::sim::{ExecutionModel, MilestoneKind};

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct RunConfig {
    /// Event manager selection and its intervals (required)
    pub manager: ManagerConfig,

    /// Scripted workload used by `run` (optional for `validate`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload: Option<WorkloadScript>,
}

// ============================================================================
// Instruction Counts
// ============================================================================

/// An instruction count as written in configuration.
///
/// Accepts plain integers (`2000000`) or strings with a decimal suffix
/// (`"2M"`, `"500K"`, `"1G"`). Negative values survive parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct InstructionCount(pub i64);

impl InstructionCount {
    /// Returns the raw signed value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Returns the count as `u64`, or `None` when negative.
    #[must_use]
    pub fn to_count(self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }
}

impl From<i64> for InstructionCount {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for InstructionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for InstructionCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for InstructionCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CountVisitor;

        impl serde::de::Visitor<'_> for CountVisitor {
            type Value = InstructionCount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an instruction count such as 2000000, \"2M\", or \"500K\"")
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(InstructionCount(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(InstructionCount)
                    .map_err(|_| E::custom(format!("instruction count {v} is too large")))
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                parse_instruction_count(v).map(InstructionCount).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(CountVisitor)
    }
}

/// Parses an instruction count like `"10M"`, `"-5K"`, `"1G"`, or `"12345"`.
///
/// Suffixes are decimal multipliers (K = 10^3, M = 10^6, G = 10^9) and
/// are case-insensitive. Underscores are accepted as digit separators.
///
/// # Errors
///
/// Returns a description of the problem if the string is not a valid count
/// or overflows `i64`.
pub fn parse_instruction_count(s: &str) -> Result<i64, String> {
    let trimmed = s.trim();
    let (digits, multiplier) = match trimmed.chars().last() {
        Some('k' | 'K') => (&trimmed[..trimmed.len() - 1], 1_000),
        Some('m' | 'M') => (&trimmed[..trimmed.len() - 1], 1_000_000),
        Some('g' | 'G') => (&trimmed[..trimmed.len() - 1], 1_000_000_000),
        _ => (trimmed, 1),
    };

    let cleaned: String = digits.trim().chars().filter(|c| *c != '_').collect();
    let base: i64 = cleaned
        .parse()
        .map_err(|_| format!("invalid instruction count: '{s}'"))?;

    base.checked_mul(multiplier)
        .ok_or_else(|| format!("instruction count overflows: '{s}'"))
}

// ============================================================================
// Manager Configuration
// ============================================================================

/// Which event manager drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerKind {
    /// Periodic fast-forward / warmup / ROI sampling
    Sampling,
    /// One ROI bracketed by workload begin/end
    SimpleRoi,
    /// Periodic checkpoint creation inside the workload ROI
    TakeCheckpoints,
    /// Warmup + ROI after restoring a checkpoint
    RestoreCheckpoint,
    /// Single checkpoint after OS boot
    PostBootCheckpoint,
}

impl ManagerKind {
    /// All manager kinds, in documentation order.
    pub const ALL: [Self; 5] = [
        Self::Sampling,
        Self::SimpleRoi,
        Self::TakeCheckpoints,
        Self::RestoreCheckpoint,
        Self::PostBootCheckpoint,
    ];

    /// Returns the configuration name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sampling => "sampling",
            Self::SimpleRoi => "simple_roi",
            Self::TakeCheckpoints => "take_checkpoints",
            Self::RestoreCheckpoint => "restore_checkpoint",
            Self::PostBootCheckpoint => "post_boot_checkpoint",
        }
    }

    /// Whether managers of this kind switch execution models.
    #[must_use]
    pub const fn switches_models(self) -> bool {
        matches!(self, Self::Sampling | Self::SimpleRoi)
    }
}

impl fmt::Display for ManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suggests the closest manager kind name for a misspelled `kind`.
///
/// Returns a match only if its Damerau-Levenshtein distance is at most 3.
#[must_use]
pub fn suggest_manager_kind(input: &str) -> Option<&'static str> {
    ManagerKind::ALL
        .iter()
        .map(|k| (k.as_str(), strsim::damerau_levenshtein(input, k.as_str())))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name)
}

/// Manager section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ManagerConfig {
    /// Periodic sampling
    Sampling(SamplingConfig),
    /// Simple ROI bracketing
    SimpleRoi,
    /// Periodic checkpoint creation
    TakeCheckpoints(TakeCheckpointsConfig),
    /// Checkpoint restore with warmup and ROI
    RestoreCheckpoint(RestoreCheckpointConfig),
    /// Post-boot checkpoint
    PostBootCheckpoint(PostBootCheckpointConfig),
}

impl ManagerConfig {
    /// Returns the manager kind this section configures.
    #[must_use]
    pub const fn kind(&self) -> ManagerKind {
        match self {
            Self::Sampling(_) => ManagerKind::Sampling,
            Self::SimpleRoi => ManagerKind::SimpleRoi,
            Self::TakeCheckpoints(_) => ManagerKind::TakeCheckpoints,
            Self::RestoreCheckpoint(_) => ManagerKind::RestoreCheckpoint,
            Self::PostBootCheckpoint(_) => ManagerKind::PostBootCheckpoint,
        }
    }
}

/// Periodic sampling intervals.
///
/// Field aliases accept the short option names used by simulator run
/// scripts (`ff`, `init_ff`, `max_rois`, `continue`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplingConfig {
    /// Fast-forward interval between regions
    #[serde(alias = "ff")]
    pub fast_forward: InstructionCount,

    /// Warmup interval before each region
    pub warmup: InstructionCount,

    /// Region-of-interest length
    pub roi: InstructionCount,

    /// Fast-forward length right after workload begin
    #[serde(default, alias = "init_ff", skip_serializing_if = "Option::is_none")]
    pub initial_fast_forward: Option<InstructionCount>,

    /// Stop sampling after this many regions
    #[serde(default, alias = "max_rois", skip_serializing_if = "Option::is_none")]
    pub max_regions: Option<i64>,

    /// Keep fast-forwarding after `max_regions` instead of terminating
    #[serde(default, alias = "continue")]
    pub continue_after_max: bool,
}

/// Periodic checkpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TakeCheckpointsConfig {
    /// Instructions between checkpoints
    pub interval: InstructionCount,

    /// Enclosing directory for `chkpt.<tick>` directories
    #[serde(default = "default_checkpoints_dir")]
    pub checkpoints_dir: PathBuf,

    /// Stop after this many checkpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_checkpoints: Option<i64>,
}

/// Restore-run settings. Zero `roi` runs the region until workload end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestoreCheckpointConfig {
    /// Warmup instructions after restore
    #[serde(default)]
    pub warmup: InstructionCount,

    /// ROI instructions after warmup
    #[serde(default)]
    pub roi: InstructionCount,
}

/// Post-boot checkpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostBootCheckpointConfig {
    /// Checkpoint directory
    #[serde(default = "default_boot_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
}

impl Default for PostBootCheckpointConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_boot_checkpoint_dir(),
        }
    }
}

fn default_checkpoints_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_boot_checkpoint_dir() -> PathBuf {
    PathBuf::from("boot_checkpoint")
}

// ============================================================================
// Workload Script
// ============================================================================

/// Scripted workload trace consumed by the scripted simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkloadScript {
    /// Instructions retired on core 0 before the workload exits
    pub total_instructions: InstructionCount,

    /// Processor flavour
    #[serde(default)]
    pub processor: ProcessorKind,

    /// Model active when the simulation starts
    #[serde(default)]
    pub initial_model: ExecutionModel,

    /// Simulated ticks per instruction for each model
    #[serde(default)]
    pub ticks_per_instruction: TickCosts,

    /// Workload milestones, positioned by retired instruction count
    #[serde(default)]
    pub milestones: Vec<ScriptedMilestone>,
}

/// Whether the processor can swap execution models mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorKind {
    /// Fast and detailed cores, swappable
    #[default]
    Switchable,
    /// A single core type
    Fixed,
}

/// Ticks per retired instruction for each execution model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TickCosts {
    /// Fast (functional) model
    #[serde(default = "default_fast_cost")]
    pub fast: u64,
    /// Detailed (timing) model
    #[serde(default = "default_detailed_cost")]
    pub detailed: u64,
}

impl Default for TickCosts {
    fn default() -> Self {
        Self {
            fast: default_fast_cost(),
            detailed: default_detailed_cost(),
        }
    }
}

const fn default_fast_cost() -> u64 {
    250
}

const fn default_detailed_cost() -> u64 {
    1000
}

/// A workload milestone at a fixed instruction position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedMilestone {
    /// Retired-instruction position
    pub at: InstructionCount,
    /// Milestone raised at that position
    pub kind: MilestoneKind,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_count() {
        assert_eq!(parse_instruction_count("12345"), Ok(12_345));
        assert_eq!(parse_instruction_count(" 1_000 "), Ok(1_000));
    }

    #[test]
    fn test_parse_suffixed_counts() {
        assert_eq!(parse_instruction_count("10M"), Ok(10_000_000));
        assert_eq!(parse_instruction_count("500k"), Ok(500_000));
        assert_eq!(parse_instruction_count("2G"), Ok(2_000_000_000));
    }

    #[test]
    fn test_parse_negative_count() {
        assert_eq!(parse_instruction_count("-5M"), Ok(-5_000_000));
    }

    #[test]
    fn test_parse_invalid_count() {
        assert!(parse_instruction_count("ten").is_err());
        assert!(parse_instruction_count("M").is_err());
        assert!(parse_instruction_count("99999999999G").is_err());
    }

    #[test]
    fn test_sampling_section_deserializes_with_suffixes() {
        let yaml = r"
kind: sampling
fast_forward: 100M
warmup: 10M
roi: 2000000
max_regions: 4
";
        let config: ManagerConfig = serde_yaml::from_str(yaml).unwrap();
        let ManagerConfig::Sampling(sampling) = config else {
            panic!("expected sampling config");
        };
        assert_eq!(sampling.fast_forward, InstructionCount(100_000_000));
        assert_eq!(sampling.warmup, InstructionCount(10_000_000));
        assert_eq!(sampling.roi, InstructionCount(2_000_000));
        assert_eq!(sampling.max_regions, Some(4));
        assert!(!sampling.continue_after_max);
        assert!(sampling.initial_fast_forward.is_none());
    }

    #[test]
    fn test_sampling_short_aliases() {
        let yaml = r"
kind: sampling
ff: 1M
warmup: 1M
roi: 1M
init_ff: 5M
max_rois: 2
continue: true
";
        let config: ManagerConfig = serde_yaml::from_str(yaml).unwrap();
        let ManagerConfig::Sampling(sampling) = config else {
            panic!("expected sampling config");
        };
        assert_eq!(sampling.initial_fast_forward, Some(InstructionCount(5_000_000)));
        assert_eq!(sampling.max_regions, Some(2));
        assert!(sampling.continue_after_max);
    }

    #[test]
    fn test_negative_interval_survives_parsing() {
        let yaml = "kind: sampling\nfast_forward: -1\nwarmup: 0\nroi: 1M\n";
        let config: ManagerConfig = serde_yaml::from_str(yaml).unwrap();
        let ManagerConfig::Sampling(sampling) = config else {
            panic!("expected sampling config");
        };
        assert_eq!(sampling.fast_forward.to_count(), None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "kind: sampling\nfast_forward: 1M\nwarmup: 1M\nroi: 1M\nwarmpu: 3\n";
        let result: Result<ManagerConfig, _> = serde_yaml::from_str(yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_for_checkpoint_dirs() {
        let take: ManagerConfig =
            serde_yaml::from_str("kind: take_checkpoints\ninterval: 5M\n").unwrap();
        let ManagerConfig::TakeCheckpoints(take) = take else {
            panic!("expected take_checkpoints");
        };
        assert_eq!(take.checkpoints_dir, PathBuf::from("checkpoints"));

        let boot: ManagerConfig = serde_yaml::from_str("kind: post_boot_checkpoint\n").unwrap();
        let ManagerConfig::PostBootCheckpoint(boot) = boot else {
            panic!("expected post_boot_checkpoint");
        };
        assert_eq!(boot.checkpoint_dir, PathBuf::from("boot_checkpoint"));
    }

    #[test]
    fn test_simple_roi_has_no_fields() {
        let config: ManagerConfig = serde_yaml::from_str("kind: simple_roi\n").unwrap();
        assert_eq!(config.kind(), ManagerKind::SimpleRoi);
    }

    #[test]
    fn test_restore_defaults_to_zero() {
        let config: ManagerConfig =
            serde_yaml::from_str("kind: restore_checkpoint\nroi: 10\n").unwrap();
        let ManagerConfig::RestoreCheckpoint(restore) = config else {
            panic!("expected restore_checkpoint");
        };
        assert_eq!(restore.warmup, InstructionCount(0));
        assert_eq!(restore.roi, InstructionCount(10));
    }

    #[test]
    fn test_workload_script_defaults() {
        let yaml = r"
total_instructions: 50M
milestones:
  - { at: 0, kind: work_begin }
  - { at: 40M, kind: work_end }
";
        let script: WorkloadScript = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(script.processor, ProcessorKind::Switchable);
        assert_eq!(script.initial_model, ExecutionModel::Fast);
        assert_eq!(script.ticks_per_instruction, TickCosts::default());
        assert_eq!(script.milestones.len(), 2);
        assert_eq!(script.milestones[1].kind, MilestoneKind::WorkEnd);
    }

    #[test]
    fn test_suggest_manager_kind() {
        assert_eq!(suggest_manager_kind("samplng"), Some("sampling"));
        assert_eq!(suggest_manager_kind("simple-roi"), Some("simple_roi"));
        assert_eq!(suggest_manager_kind("completely-different"), None);
    }

    #[test]
    fn test_switching_kinds() {
        assert!(ManagerKind::Sampling.switches_models());
        assert!(ManagerKind::SimpleRoi.switches_models());
        assert!(!ManagerKind::RestoreCheckpoint.switches_models());
    }
}
