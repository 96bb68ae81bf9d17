//! Engine configuration

use casework_types::Department;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tunables for the case engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Business days allowed per department
    #[serde(default)]
    pub deadlines: DeadlineConfig,

    /// Non-working dates skipped by the business calendar
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,

    /// Whether new cases must settle a licence fee before approval
    #[serde(default = "default_true")]
    pub payment_required: bool,

    /// Prefix of issued case numbers
    #[serde(default = "default_case_number_prefix")]
    pub case_number_prefix: String,

    /// Deadline sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            deadlines: DeadlineConfig::default(),
            holidays: Vec::new(),
            payment_required: true,
            case_number_prefix: default_case_number_prefix(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Per-department service levels, in business days
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineConfig {
    #[serde(default = "default_intake_days")]
    pub intake_days: u32,
    #[serde(default = "default_technical_review_days")]
    pub technical_review_days: u32,
    #[serde(default = "default_inspection_days")]
    pub inspection_days: u32,
    #[serde(default = "default_management_days")]
    pub management_days: u32,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            intake_days: default_intake_days(),
            technical_review_days: default_technical_review_days(),
            inspection_days: default_inspection_days(),
            management_days: default_management_days(),
        }
    }
}

impl DeadlineConfig {
    pub fn business_days(&self, department: Department) -> u32 {
        match department {
            Department::Intake => self.intake_days,
            Department::TechnicalReview => self.technical_review_days,
            Department::Inspection => self.inspection_days,
            Department::Management => self.management_days,
            Department::Finalized | Department::Archived => 0,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_case_number_prefix() -> String {
    "EXP".to_string()
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_intake_days() -> u32 {
    2
}

fn default_technical_review_days() -> u32 {
    5
}

fn default_inspection_days() -> u32 {
    3
}

fn default_management_days() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.payment_required);
        assert_eq!(config.case_number_prefix, "EXP");
        assert_eq!(config.sweep_interval_secs, 300);
        assert!(config.holidays.is_empty());
    }

    #[test]
    fn test_default_business_days() {
        let d = DeadlineConfig::default();
        assert_eq!(d.business_days(Department::Intake), 2);
        assert_eq!(d.business_days(Department::TechnicalReview), 5);
        assert_eq!(d.business_days(Department::Inspection), 3);
        assert_eq!(d.business_days(Department::Management), 2);
        assert_eq!(d.business_days(Department::Archived), 0);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{ "deadlines": { "inspection_days": 4 }, "holidays": ["2026-07-28"] }"#,
        )
        .unwrap();
        assert_eq!(config.deadlines.inspection_days, 4);
        assert_eq!(config.deadlines.intake_days, 2);
        assert_eq!(config.holidays.len(), 1);
        assert!(config.payment_required);
    }
}
