//! Domain types for grievances and questionnaire responses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a stored or submitted enum value is unknown.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` over a fixed list of wire names.
macro_rules! wire_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            /// The stored / wire representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($ty::$variant => $name),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    other => Err(UnknownVariant { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

/// Closed set of grievance categories offered by the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrievanceType {
    Harassment,
    DomesticViolence,
    WorkplaceDiscrimination,
    SexualAssault,
    ChildAbuse,
    EconomicAbuse,
    Stalking,
    ForcedMarriage,
    HonorViolence,
    Other,
}

wire_enum!(GrievanceType, "grievance type", {
    Harassment => "harassment",
    DomesticViolence => "domestic_violence",
    WorkplaceDiscrimination => "workplace_discrimination",
    SexualAssault => "sexual_assault",
    ChildAbuse => "child_abuse",
    EconomicAbuse => "economic_abuse",
    Stalking => "stalking",
    ForcedMarriage => "forced_marriage",
    HonorViolence => "honor_violence",
    Other => "other",
});

/// Case handling status, mutated only by administrators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrievanceStatus {
    #[default]
    Submitted,
    UnderReview,
    InProgress,
    Resolved,
    Closed,
}

wire_enum!(GrievanceStatus, "grievance status", {
    Submitted => "submitted",
    UnderReview => "under_review",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
});

/// Interface language the complainant used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    Ar,
    En,
    Fr,
}

wire_enum!(Locale, "locale", {
    Ar => "ar",
    En => "en",
    Fr => "fr",
});

/// A grievance ready to be written.
///
/// Identity fields must already be `None` when `is_anonymous` is set; use
/// [`NewGrievance::anonymized`] at the edge. The store does not re-check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGrievance {
    pub tracking_code: String,
    pub complainant_name: Option<String>,
    pub complainant_email: Option<String>,
    pub complainant_phone: Option<String>,
    pub is_anonymous: bool,
    pub village_id: Option<String>,
    pub custom_location: Option<String>,
    pub grievance_type: GrievanceType,
    pub description: String,
    pub incident_date: Option<String>,
    pub preferred_language: Locale,
}

impl NewGrievance {
    /// Clear identity fields if the complainant asked for anonymity.
    #[must_use]
    pub fn anonymized(mut self) -> Self {
        if self.is_anonymous {
            self.complainant_name = None;
            self.complainant_email = None;
            self.complainant_phone = None;
        }
        self
    }
}

/// Full grievance row as seen by administrators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrievanceRecord {
    pub id: i64,
    pub tracking_code: String,
    pub complainant_name: Option<String>,
    pub complainant_email: Option<String>,
    pub complainant_phone: Option<String>,
    pub is_anonymous: bool,
    pub village_id: Option<String>,
    pub custom_location: Option<String>,
    pub grievance_type: GrievanceType,
    pub description: String,
    pub incident_date: Option<String>,
    pub preferred_language: Locale,
    pub status: GrievanceStatus,
    pub admin_notes: Option<String>,
    pub status_updated_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The public projection returned to a complainant checking their code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackedGrievance {
    pub id: i64,
    pub tracking_code: String,
    pub grievance_type: GrievanceType,
    pub status: GrievanceStatus,
    pub status_updated_at: Option<String>,
    pub created_at: String,
    pub is_anonymous: bool,
}

/// Dashboard summary row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentGrievance {
    pub id: i64,
    pub tracking_code: String,
    pub grievance_type: GrievanceType,
    pub status: GrievanceStatus,
    pub created_at: String,
}

/// Administrative change to a grievance. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GrievanceUpdate {
    pub status: Option<GrievanceStatus>,
    pub admin_notes: Option<String>,
}

impl GrievanceUpdate {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.admin_notes.is_none()
    }
}

/// A stored questionnaire submission. The payload shape is owned by the survey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionnaireRecord {
    pub id: i64,
    pub response_data: serde_json::Value,
    pub submitted_at: String,
}

/// Counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: u64,
    pub pending: u64,
    pub under_review: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub closed: u64,
    pub questionnaires: u64,
}

impl Stats {
    /// Add `count` rows with the given status to the breakdown.
    pub fn add_status(&mut self, status: GrievanceStatus, count: u64) {
        let slot = match status {
            GrievanceStatus::Submitted => &mut self.pending,
            GrievanceStatus::UnderReview => &mut self.under_review,
            GrievanceStatus::InProgress => &mut self.in_progress,
            GrievanceStatus::Resolved => &mut self.resolved,
            GrievanceStatus::Closed => &mut self.closed,
        };
        *slot += count;
        self.total += count;
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for ty in GrievanceType::ALL {
            assert_eq!(ty.as_str().parse::<GrievanceType>().unwrap(), *ty);
        }
        for status in GrievanceStatus::ALL {
            assert_eq!(status.as_str().parse::<GrievanceStatus>().unwrap(), *status);
        }
    }

    #[test]
    fn test_unknown_variant() {
        let err = "teleportation".parse::<GrievanceType>().unwrap_err();
        assert_eq!(err.kind, "grievance type");
        assert_eq!(err.to_string(), "unknown grievance type: teleportation");
    }

    #[test]
    fn test_serde_matches_wire_names() {
        let json = serde_json::to_string(&GrievanceStatus::UnderReview).unwrap();
        assert_eq!(json, "\"under_review\"");
        let ty: GrievanceType = serde_json::from_str("\"forced_marriage\"").unwrap();
        assert_eq!(ty, GrievanceType::ForcedMarriage);
    }

    #[test]
    fn test_anonymized_clears_identity() {
        let grievance = NewGrievance {
            tracking_code: "ABCDEFGHJKLM".into(),
            complainant_name: Some("Rana".into()),
            complainant_email: Some("r@example.org".into()),
            complainant_phone: Some("+961".into()),
            is_anonymous: true,
            village_id: Some("3".into()),
            custom_location: None,
            grievance_type: GrievanceType::Harassment,
            description: "x".into(),
            incident_date: None,
            preferred_language: Locale::Ar,
        }
        .anonymized();

        assert!(grievance.complainant_name.is_none());
        assert!(grievance.complainant_email.is_none());
        assert!(grievance.complainant_phone.is_none());
        assert_eq!(grievance.village_id.as_deref(), Some("3"));
    }

    #[test]
    fn test_page_total_pages() {
        let page = Page::new(vec![0u8; 10], 25, 2, 10);
        assert_eq!(page.total_pages, 3);
        assert_eq!(Page::<u8>::new(vec![], 0, 1, 20).total_pages, 0);
        assert_eq!(Page::<u8>::new(vec![], 20, 1, 20).total_pages, 1);
    }

    #[test]
    fn test_stats_breakdown() {
        let mut stats = Stats::default();
        stats.add_status(GrievanceStatus::Submitted, 4);
        stats.add_status(GrievanceStatus::Closed, 1);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.pending, 4);
        assert_eq!(stats.closed, 1);
    }
}
