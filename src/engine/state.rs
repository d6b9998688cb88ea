//! Conversation state machine vocabulary.

use serde::{Deserialize, Serialize};

/// Where a conversation is in the data-collection flow.
///
/// Stored as a string column; unknown stored values are treated as
/// unrecognized and restart the flow rather than trapping the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStatus {
    /// Waiting for the user's CPF.
    CollectingDocument,
    /// Waiting for the birth date (DD/MM/YYYY).
    CollectingBirthDate,
    /// Waiting for the sex code (M/F).
    CollectingSex,
    /// Waiting for the benefit-status option (1/2/3).
    CollectingEmploymentStatus,
    /// The quote pipeline is running.
    Processing,
    /// The flow finished; any further input restarts it.
    Completed,
}

impl ConversationStatus {
    /// DB string for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectingDocument => "collecting_document",
            Self::CollectingBirthDate => "collecting_birthdate",
            Self::CollectingSex => "collecting_sex",
            Self::CollectingEmploymentStatus => "collecting_employment_status",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    /// Parse a stored status string. `None` means unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "collecting_document" => Some(Self::CollectingDocument),
            "collecting_birthdate" => Some(Self::CollectingBirthDate),
            "collecting_sex" => Some(Self::CollectingSex),
            "collecting_employment_status" => Some(Self::CollectingEmploymentStatus),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Fields collected turn by turn after the CPF.
///
/// The field set is fixed, so this is a typed struct rather than an
/// open key-value bag. Serialized to a JSON column under the partner
/// API's field names, which is also the shape the simulation payload
/// wants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedFields {
    /// Birth date as `YYYY-MM-DDT00:00:00`.
    #[serde(rename = "dtNascimento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    /// Sex code, `M` or `F`.
    #[serde(rename = "idSexo", skip_serializing_if = "Option::is_none")]
    pub sex: Option<String>,
    /// Benefit status: 1 active, 2 retired, 3 pensioner.
    #[serde(rename = "idSituacaoEmpregado", skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<i32>,
}

impl CollectedFields {
    /// True when no field has been collected yet.
    pub fn is_empty(&self) -> bool {
        self.birth_date.is_none() && self.sex.is_none() && self.employment_status.is_none()
    }
}
