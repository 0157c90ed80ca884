//! User documents: organisation details, roles, invitations, and the request
//! and response shapes built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::FieldError;

/// Role a user can hold within an organisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserRole {
    RegulatoryContact,
    ThirdParty,
    Contributor,
}

impl UserRole {
    /// Friendly display name used in user summaries.
    pub fn description(&self) -> &'static str {
        match self {
            UserRole::RegulatoryContact => "Regulatory Contact",
            UserRole::ThirdParty => "Third Party",
            UserRole::Contributor => "Contributor",
        }
    }
}

/// Account status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    Active,
    InActive,
    InvitationSent,
    InvitationAccepted,
    InvitationDeclined,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::InActive => "InActive",
            UserStatus::InvitationSent => "InvitationSent",
            UserStatus::InvitationAccepted => "InvitationAccepted",
            UserStatus::InvitationDeclined => "InvitationDeclined",
        }
    }
}

/// Which contact number an organisation contact prefers to be reached on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferredContactType {
    Landline,
    Mobile,
}

/// Registered address of an organisation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgRegisteredAddress {
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    pub postcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl OrgRegisteredAddress {
    /// Join the non-empty address components with ", " in the order
    /// line1, line2, town, county, country, postcode.
    pub fn formatted(&self) -> String {
        let parts = [
            Some(self.address_line1.as_str()),
            self.address_line2.as_deref(),
            self.town.as_deref(),
            self.county.as_deref(),
            self.country.as_deref(),
            Some(self.postcode.as_str()),
        ];

        parts
            .into_iter()
            .flatten()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Organisation profile embedded in a user document once registration
/// completes. `org_id` is assigned exactly once and stable thereafter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    #[serde(default)]
    pub org_type: String,
    #[serde(default)]
    pub companies_house_number: String,
    #[serde(default)]
    pub org_name: String,
    #[serde(default)]
    pub org_registered_address: OrgRegisteredAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_contact_type: Option<PreferredContactType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landline_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_number_extension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl OrgDetails {
    /// Overwrite the editable fields from an incoming payload. This is a full
    /// overwrite, not a merge: absent payload fields clear the stored ones.
    /// `org_id` is never taken from the payload.
    pub fn apply(&mut self, incoming: &OrgDetails) {
        self.org_type = incoming.org_type.clone();
        self.companies_house_number = incoming.companies_house_number.clone();
        self.org_name = incoming.org_name.clone();
        self.org_registered_address = incoming.org_registered_address.clone();
        self.preferred_contact_type = incoming.preferred_contact_type;
        self.landline_number = incoming.landline_number.clone();
        self.contact_number_extension = incoming.contact_number_extension.clone();
        self.mobile_number = incoming.mobile_number.clone();
        self.job_title = incoming.job_title.clone();
        self.first_name = incoming.first_name.clone();
        self.last_name = incoming.last_name.clone();
    }

    /// Enforce the contact-number invariant: exactly the number selected by
    /// the preferred contact type survives, the others are cleared. Returns
    /// the field errors for a missing required number.
    pub fn reconcile_contact(&mut self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        match self.preferred_contact_type {
            Some(PreferredContactType::Landline) => {
                self.mobile_number = None;
                if is_blank(&self.landline_number) {
                    errors.push(FieldError::new(
                        "landlineNumber",
                        "Enter your landline number.",
                    ));
                }
            }
            Some(PreferredContactType::Mobile) => {
                self.landline_number = None;
                self.contact_number_extension = None;
                if is_blank(&self.mobile_number) {
                    errors.push(FieldError::new("mobileNumber", "Enter your mobile number."));
                }
            }
            None => {
                self.landline_number = None;
                self.contact_number_extension = None;
                self.mobile_number = None;
            }
        }

        errors
    }

    /// Title-cased first and last name joined by a space.
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            title_case_word(&self.first_name),
            title_case_word(&self.last_name)
        )
        .trim()
        .to_string()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Uppercase the first character of a single word and lowercase the rest.
pub fn title_case_word(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Pending invitation embedded in a user document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub permissions: Vec<String>,
    pub invited_email: String,
    pub invited_at: DateTime<Utc>,
    pub status: String,
}

/// A registered user. Created with an external login id and email only; the
/// organisation profile is attached later through the org-details update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub external_login_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_details: Option<OrgDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<UserRole>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hn_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invitations: Option<Vec<Invitation>>,
}

impl User {
    /// Add a role with set semantics: no duplicates, insertion order kept.
    pub fn add_role(&mut self, role: UserRole) {
        match &mut self.roles {
            None => self.roles = Some(vec![role]),
            Some(roles) => {
                if !roles.contains(&role) {
                    roles.push(role);
                }
            }
        }
    }
}

/// Request body for registering a user on first login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialRegistrationRequest {
    pub external_login_id: String,
    pub email: String,
    pub status: UserStatus,
}

/// Request body for the organisation-details update: a full organisation
/// payload plus a single role to add.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrgDetailsRequest {
    pub org_details: OrgDetails,
    pub role: UserRole,
}

/// Organisation summary embedded in a user summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganisationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub companies_house_number: String,
}

/// Read shape for user listings and lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email_address: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation: Option<OrganisationSummary>,
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        let organisation = user.org_details.as_ref().map(|details| OrganisationSummary {
            id: details.org_id.clone(),
            name: details.org_name.clone(),
            companies_house_number: details.companies_house_number.clone(),
        });

        Self {
            id: user.id.clone(),
            email_address: user.email.clone(),
            full_name: user
                .org_details
                .as_ref()
                .map(OrgDetails::full_name)
                .unwrap_or_default(),
            organisation,
            roles: user
                .roles
                .as_ref()
                .map(|roles| roles.iter().map(|r| r.description().to_string()).collect())
                .unwrap_or_default(),
            status: user.status.map(|s| s.as_str().to_string()),
        }
    }
}
