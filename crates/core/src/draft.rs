//! Ad draft domain types — versioned creative proposals.
//!
//! Drafts belong to one conversation and form a revision chain via
//! `parent_draft_id`. A published draft is terminal for its lineage: any
//! further change creates a new variant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ConversationId;
use crate::error::DraftError;

/// Platform character limits for ad creative fields.
pub const PRIMARY_TEXT_LIMIT: usize = 300;
pub const HEADLINE_LIMIT: usize = 40;
pub const DESCRIPTION_LIMIT: usize = 90;

/// Call-to-action button shown on the ad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallToAction {
    LearnMore,
    ShopNow,
    SignUp,
    ContactUs,
    BookNow,
    Download,
    GetOffer,
}

impl CallToAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LearnMore => "learn_more",
            Self::ShopNow => "shop_now",
            Self::SignUp => "sign_up",
            Self::ContactUs => "contact_us",
            Self::BookNow => "book_now",
            Self::Download => "download",
            Self::GetOffer => "get_offer",
        }
    }
}

impl Default for CallToAction {
    fn default() -> Self {
        Self::LearnMore
    }
}

/// Audience targeting attached to a draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetAudience {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default = "default_age_min")]
    pub age_min: u8,
    #[serde(default = "default_age_max")]
    pub age_max: u8,
    #[serde(default)]
    pub interests: Vec<String>,
}

fn default_age_min() -> u8 {
    18
}
fn default_age_max() -> u8 {
    65
}

/// Draft lifecycle status. `Published` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Draft,
    Approved,
    Published,
    Rejected,
}

impl DraftStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }
}

/// A versioned creative proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdDraft {
    pub id: String,
    pub conversation_id: ConversationId,

    // Campaign structure
    pub campaign_name: String,
    pub ad_name: String,

    // Creative
    pub primary_text: String,
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cta: CallToAction,

    // Media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    // Targeting & budget
    #[serde(default)]
    pub target_audience: TargetAudience,
    pub daily_budget: f64,

    // Status & lineage
    pub status: DraftStatus,
    pub variant_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_draft_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AdDraft {
    /// Create the first draft of a new lineage.
    pub fn new(
        conversation_id: ConversationId,
        campaign_name: impl Into<String>,
        ad_name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id,
            campaign_name: campaign_name.into(),
            ad_name: ad_name.into(),
            primary_text: String::new(),
            headline: String::new(),
            description: String::new(),
            cta: CallToAction::default(),
            media_url: None,
            target_audience: TargetAudience::default(),
            daily_budget: 0.0,
            status: DraftStatus::Draft,
            variant_number: 1,
            parent_draft_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create the next revision in this draft's lineage.
    ///
    /// Used both for user-requested changes and for revising a published
    /// draft — published drafts themselves are never mutated.
    pub fn new_variant(&self) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            status: DraftStatus::Draft,
            variant_number: self.variant_number + 1,
            parent_draft_id: Some(self.id.clone()),
            created_at: now,
            updated_at: now,
            ..self.clone()
        }
    }

    /// All creative text joined, for policy scanning.
    pub fn copy_text(&self) -> String {
        format!("{} {} {}", self.primary_text, self.headline, self.description)
    }

    /// Creative fields that exceed the platform character limits.
    pub fn limit_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let checks = [
            ("primary text", self.primary_text.len(), PRIMARY_TEXT_LIMIT),
            ("headline", self.headline.len(), HEADLINE_LIMIT),
            ("description", self.description.len(), DESCRIPTION_LIMIT),
        ];
        for (field, len, limit) in checks {
            if len > limit {
                violations.push(format!("{field} exceeds limit ({len}/{limit} characters)"));
            }
        }
        violations
    }

    pub fn approve(&mut self) -> std::result::Result<(), DraftError> {
        self.change_status(DraftStatus::Approved)
    }

    pub fn reject(&mut self) -> std::result::Result<(), DraftError> {
        self.change_status(DraftStatus::Rejected)
    }

    /// Terminal transition: once published, the draft can never change again.
    pub fn mark_published(&mut self) -> std::result::Result<(), DraftError> {
        self.change_status(DraftStatus::Published)
    }

    fn change_status(&mut self, to: DraftStatus) -> std::result::Result<(), DraftError> {
        if self.status == DraftStatus::Published {
            return Err(DraftError::AlreadyPublished(self.id.clone()));
        }
        let valid = matches!(
            (self.status, to),
            (DraftStatus::Draft, DraftStatus::Approved)
                | (DraftStatus::Draft, DraftStatus::Rejected)
                | (DraftStatus::Approved, DraftStatus::Published)
                | (DraftStatus::Approved, DraftStatus::Rejected)
        );
        if !valid {
            return Err(DraftError::InvalidStatus {
                draft_id: self.id.clone(),
                from: self.status.as_str().into(),
                to: to.as_str().into(),
            });
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AdDraft {
        let mut d = AdDraft::new(ConversationId::new(), "Winter Sale", "Red Hoodie");
        d.primary_text = "Stay warm this winter with our best-selling hoodie.".into();
        d.headline = "Red Hoodie — Winter Sale".into();
        d.daily_budget = 50.0;
        d
    }

    #[test]
    fn variant_chain_links_parent() {
        let first = draft();
        let second = first.new_variant();
        assert_eq!(second.variant_number, 2);
        assert_eq!(second.parent_draft_id.as_deref(), Some(first.id.as_str()));
        assert_ne!(second.id, first.id);
        assert_eq!(second.status, DraftStatus::Draft);
    }

    #[test]
    fn published_is_terminal() {
        let mut d = draft();
        d.approve().unwrap();
        d.mark_published().unwrap();
        assert_eq!(d.status, DraftStatus::Published);

        let err = d.approve().unwrap_err();
        assert!(matches!(err, DraftError::AlreadyPublished(_)));
        assert!(d.mark_published().is_err());
        assert!(d.reject().is_err());
    }

    #[test]
    fn publish_requires_approval_first() {
        let mut d = draft();
        let err = d.mark_published().unwrap_err();
        assert!(matches!(err, DraftError::InvalidStatus { .. }));
    }

    #[test]
    fn revising_published_draft_creates_variant() {
        let mut d = draft();
        d.approve().unwrap();
        d.mark_published().unwrap();

        let revision = d.new_variant();
        assert_eq!(revision.status, DraftStatus::Draft);
        assert_eq!(revision.variant_number, 2);
        // the published original is untouched
        assert_eq!(d.status, DraftStatus::Published);
    }

    #[test]
    fn limit_violations_flag_long_fields() {
        let mut d = draft();
        d.headline = "x".repeat(HEADLINE_LIMIT + 1);
        let violations = d.limit_violations();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("headline"));

        d.headline = "Short".into();
        assert!(d.limit_violations().is_empty());
    }

    #[test]
    fn copy_text_joins_creative_fields() {
        let mut d = draft();
        d.description = "Free shipping".into();
        let copy = d.copy_text();
        assert!(copy.contains("hoodie"));
        assert!(copy.contains("Free shipping"));
    }
}
