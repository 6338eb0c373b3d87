//! Static table of what each plan tier is entitled to.
//!
//! The catalog is total by construction: every tier has a slot and every
//! resource type and feature flag is a named field, so a missing entry is a
//! deserialization error rather than a silent default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{
    feature_flag::FeatureFlag, plan_tier::PlanTier, resource_type::ResourceType,
    usage_limit::UsageLimit,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureLimits {
    pub resume_creation: UsageLimit,
    pub pdf_export: UsageLimit,
    pub ai_career_coaching: UsageLimit,
    pub ai_interview_prep: UsageLimit,
    pub ai_mock_interview: UsageLimit,
    pub skill_gap_analysis: UsageLimit,
    pub ats_scan: UsageLimit,
}

impl FeatureLimits {
    pub fn limit(&self, resource: ResourceType) -> UsageLimit {
        match resource {
            ResourceType::ResumeCreation => self.resume_creation,
            ResourceType::PdfExport => self.pdf_export,
            ResourceType::AiCareerCoaching => self.ai_career_coaching,
            ResourceType::AiInterviewPrep => self.ai_interview_prep,
            ResourceType::AiMockInterview => self.ai_mock_interview,
            ResourceType::SkillGapAnalysis => self.skill_gap_analysis,
            ResourceType::AtsScan => self.ats_scan,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanFeatures {
    pub template_access: bool,
    pub priority_support: bool,
    pub advanced_analytics: bool,
    pub whatsapp_export: bool,
}

impl PlanFeatures {
    pub fn enabled(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::TemplateAccess => self.template_access,
            FeatureFlag::PrioritySupport => self.priority_support,
            FeatureFlag::AdvancedAnalytics => self.advanced_analytics,
            FeatureFlag::WhatsappExport => self.whatsapp_export,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub display_name: String,
    pub limits: FeatureLimits,
    pub features: PlanFeatures,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read plan catalog {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Plan catalog is malformed")]
    Parse(#[from] serde_json::Error),

    #[error("Plan {tier} has an empty display name")]
    EmptyDisplayName { tier: PlanTier },
}

/// Immutable plan table, loaded once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanCatalog {
    free: Plan,
    starter: Plan,
    professional: Plan,
}

impl PlanCatalog {
    pub fn new(free: Plan, starter: Plan, professional: Plan) -> Result<Self, CatalogError> {
        let catalog = Self {
            free,
            starter,
            professional,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog shipped with the service.
    pub fn builtin() -> Self {
        use UsageLimit::{Capped, Unlimited};

        Self {
            free: Plan {
                display_name: "Free".to_string(),
                limits: FeatureLimits {
                    resume_creation: Capped(2),
                    pdf_export: Capped(3),
                    ai_career_coaching: Capped(5),
                    ai_interview_prep: Capped(0),
                    ai_mock_interview: Capped(0),
                    skill_gap_analysis: Capped(1),
                    ats_scan: Capped(1),
                },
                features: PlanFeatures {
                    template_access: false,
                    priority_support: false,
                    advanced_analytics: false,
                    whatsapp_export: false,
                },
            },
            starter: Plan {
                display_name: "Starter".to_string(),
                limits: FeatureLimits {
                    resume_creation: Capped(10),
                    pdf_export: Capped(25),
                    ai_career_coaching: Capped(50),
                    ai_interview_prep: Capped(10),
                    ai_mock_interview: Capped(3),
                    skill_gap_analysis: Capped(5),
                    ats_scan: Capped(10),
                },
                features: PlanFeatures {
                    template_access: true,
                    priority_support: false,
                    advanced_analytics: false,
                    whatsapp_export: true,
                },
            },
            professional: Plan {
                display_name: "Professional".to_string(),
                limits: FeatureLimits {
                    resume_creation: Unlimited,
                    pdf_export: Unlimited,
                    ai_career_coaching: Unlimited,
                    ai_interview_prep: Unlimited,
                    ai_mock_interview: Capped(20),
                    skill_gap_analysis: Unlimited,
                    ats_scan: Unlimited,
                },
                features: PlanFeatures {
                    template_access: true,
                    priority_support: true,
                    advanced_analytics: true,
                    whatsapp_export: true,
                },
            },
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let catalog: PlanCatalog = serde_json::from_str(raw)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn plan(&self, tier: PlanTier) -> &Plan {
        match tier {
            PlanTier::Free => &self.free,
            PlanTier::Starter => &self.starter,
            PlanTier::Professional => &self.professional,
        }
    }

    pub fn limits_for(&self, tier: PlanTier) -> &FeatureLimits {
        &self.plan(tier).limits
    }

    pub fn limit(&self, tier: PlanTier, resource: ResourceType) -> UsageLimit {
        self.limits_for(tier).limit(resource)
    }

    pub fn features_for(&self, tier: PlanTier) -> &PlanFeatures {
        &self.plan(tier).features
    }

    pub fn display_name(&self, tier: PlanTier) -> &str {
        &self.plan(tier).display_name
    }

    fn validate(&self) -> Result<(), CatalogError> {
        use strum::IntoEnumIterator;

        for tier in PlanTier::iter() {
            if self.display_name(tier).trim().is_empty() {
                return Err(CatalogError::EmptyDisplayName { tier });
            }
        }
        Ok(())
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
