use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The canonical account record from the `user_auth` table. The two boolean
/// flags are the source of truth for the derived role: staff beats
/// subscriber, subscriber beats plain user. The password hash is kept off
/// this struct entirely; login reads it through [`UserCredentials`].
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    // How the account was created: 'email' or 'google'.
    pub auth_type: Option<String>,
    pub is_staff: bool,
    pub is_subscriber: bool,
    // Deactivated accounts fail authentication even with a valid token.
    pub is_active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// UserCredentials
///
/// Internal login-path projection of `user_auth`. Never serialized into a
/// response.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub password_hash: Option<String>,
    pub is_active: bool,
}

/// NewUser
///
/// Insert payload for account creation (email signup or first Google
/// sign-in).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub auth_type: String,
    pub is_subscriber: bool,
}

/// NewHomeImage
///
/// Insert payload for an appended home image: the stored object's URL and
/// key. The priority is assigned by the repository, never by the caller.
#[derive(Debug, Clone)]
pub struct NewHomeImage {
    pub image_url: String,
    pub image_key: String,
}

/// HomeImage
///
/// One entry of a priority-ordered home-page image collection. `section`
/// names the collection (e.g. "books", "blogs"); sections never interact.
/// `image_key` is the stable S3 key used to address the item independently
/// of its position; `priority` is dense and unique within the section.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct HomeImage {
    pub id: Uuid,
    pub section: String,
    pub image_url: String,
    pub image_key: String,
    pub priority: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Career
///
/// A job posting. `priority` drives manual display ordering on the public
/// careers page (lower number first).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Career {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    // 'remote', 'in_office', or 'hybrid'.
    pub work_mode: String,
    // Link to the external application form.
    pub form_link: String,
    pub priority: i32,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Magazine
///
/// A magazine issue. The cover is public once published; the full-issue PDF
/// reference is released only to subscribers. `show_on_home` plus
/// `on_home_priority` drive the home-page carousel ordering.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Magazine {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[ts(type = "string")]
    pub published_date: DateTime<Utc>,
    // S3 references for the cover image and the full-issue PDF.
    pub cover_image_url: Option<String>,
    pub cover_image_key: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_key: Option<String>,
    pub is_published: bool,
    pub show_on_home: bool,
    pub on_home_priority: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// --- Request Payloads (Input Schemas) ---

/// SignupRequest
///
/// Input for POST /auth/signup. The password is hashed before it reaches the
/// repository and is never persisted or logged in the clear.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_subscriber: bool,
}

/// LoginRequest
///
/// Input for POST /auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// GoogleSigninRequest
///
/// Input for POST /auth/google: the Google OAuth access token the client
/// obtained, which the server exchanges for the user's verified profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GoogleSigninRequest {
    pub token: String,
}

/// CreateCareerRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCareerRequest {
    pub title: String,
    pub description: String,
    pub work_mode: String,
    pub form_link: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub is_published: bool,
}

/// UpdateCareerRequest
///
/// Partial update: only fields present in the payload are written, via
/// COALESCE in the repository query.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCareerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_link: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

/// CreateMagazineRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateMagazineRequest {
    pub name: String,
    pub description: String,
    #[ts(type = "string")]
    pub published_date: DateTime<Utc>,
    pub cover_image_url: Option<String>,
    pub cover_image_key: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_key: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub show_on_home: bool,
    #[serde(default)]
    pub on_home_priority: i32,
}

/// UpdateMagazineRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMagazineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub published_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_on_home: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_home_priority: Option<i32>,
}

/// ReorderImageRequest
///
/// Input for PATCH /admin/home-images/{section}: move the image identified
/// by its stable key to a new position. Every other image between the old
/// and new position shifts by exactly one slot.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReorderImageRequest {
    pub image_key: String,
    pub priority: i32,
}

/// --- Output Schemas ---

/// AuthResponse
///
/// Returned by all three sign-in flows. The token's embedded role claim
/// mirrors `role` at issuance; authorization always re-derives the role from
/// the live account flags instead.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub role: String,
    pub access_token: String,
}

/// UploadResponse
///
/// One stored object: the public URL plus the stable key used for later
/// deletion or reordering.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
}

/// MagazineIssueResponse
///
/// The subscriber-gated full-issue PDF reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MagazineIssueResponse {
    pub magazine_id: Uuid,
    pub pdf_url: String,
    pub pdf_key: String,
}
