use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Metered capabilities, each with its own independent monthly quota.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    sqlx::Type,
)]
#[sqlx(type_name = "resource_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResourceType {
    ResumeCreation,
    PdfExport,
    AiCareerCoaching,
    AiInterviewPrep,
    AiMockInterview,
    SkillGapAnalysis,
    AtsScan,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::ResumeCreation => "resume_creation",
            ResourceType::PdfExport => "pdf_export",
            ResourceType::AiCareerCoaching => "ai_career_coaching",
            ResourceType::AiInterviewPrep => "ai_interview_prep",
            ResourceType::AiMockInterview => "ai_mock_interview",
            ResourceType::SkillGapAnalysis => "skill_gap_analysis",
            ResourceType::AtsScan => "ats_scan",
        }
    }
}
