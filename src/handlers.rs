use crate::{
    AppState,
    auth::{Principal, RequiredRole, issue_token},
    error::ApiError,
    models::{
        AuthResponse, Career, CreateCareerRequest, CreateMagazineRequest, GoogleSigninRequest,
        HomeImage, LoginRequest, Magazine, MagazineIssueResponse, NewHomeImage, NewUser,
        ReorderImageRequest, SignupRequest, UpdateCareerRequest, UpdateMagazineRequest,
        UploadResponse, User,
    },
};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

const AUTH_TYPE_EMAIL: &str = "email";
const AUTH_TYPE_GOOGLE: &str = "google";

const WORK_MODES: [&str; 3] = ["remote", "in_office", "hybrid"];

// --- Query / Upstream Structs ---

/// DeleteKeyQuery
///
/// Query parameters for delete-by-key endpoints (`?key=folder/file.ext`).
#[derive(Deserialize, utoipa::IntoParams)]
pub struct DeleteKeyQuery {
    pub key: String,
}

/// GoogleUserInfo
///
/// Minimal deserialization of Google's OAuth2 userinfo response.
#[derive(Deserialize)]
struct GoogleUserInfo {
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| ApiError::Internal("password hashing failed"))
}

fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn auth_response(user: &User, token: String) -> AuthResponse {
    let principal = Principal::from_user(user);
    AuthResponse {
        user_id: user.id,
        email: user.email.clone(),
        role: principal.role.as_str().to_string(),
        access_token: token,
    }
}

// --- Auth Handlers ---

/// signup
///
/// [Public Route] Creates an email/password account and returns a freshly
/// minted access token. The password is argon2-hashed before it reaches the
/// repository.
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "email and password are required".to_string(),
        ));
    }

    if state.repo.get_user_by_email(&payload.email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered"));
    }

    let user = state
        .repo
        .create_user(NewUser {
            email: payload.email,
            password_hash: Some(hash_password(&payload.password)?),
            auth_type: AUTH_TYPE_EMAIL.to_string(),
            is_subscriber: payload.is_subscriber,
        })
        .await?;

    let token = issue_token(&user, &state.config.jwt_secret, state.config.token_ttl_secs)?;
    Ok((StatusCode::CREATED, Json(auth_response(&user, token))))
}

/// login
///
/// [Public Route] Email/password login. The token's role claim mirrors the
/// role derived at this instant; resolution on later requests re-reads the
/// live account flags, so a stale claim never escalates access.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let creds = state
        .repo
        .get_credentials(&payload.email)
        .await?
        .filter(|c| c.is_active)
        .ok_or(ApiError::InvalidCredential)?;

    let hash = creds.password_hash.ok_or(ApiError::InvalidCredential)?;
    if !verify_password(&payload.password, &hash) {
        return Err(ApiError::InvalidCredential);
    }

    let user = state
        .repo
        .get_user(creds.id)
        .await?
        .ok_or(ApiError::PrincipalNotFound)?;

    let token = issue_token(&user, &state.config.jwt_secret, state.config.token_ttl_secs)?;
    Ok(Json(auth_response(&user, token)))
}

/// google_signin
///
/// [Public Route] Exchanges a Google OAuth access token for our own access
/// token, creating the account on first sign-in. Only verified Google emails
/// are accepted.
#[utoipa::path(
    post,
    path = "/auth/google",
    request_body = GoogleSigninRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 503, description = "Google unreachable")
    )
)]
pub async fn google_signin(
    State(state): State<AppState>,
    Json(payload): Json<GoogleSigninRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    if payload.token.trim().is_empty() {
        return Err(ApiError::Validation("google token is required".to_string()));
    }

    let client = reqwest::Client::new();
    let response = client
        .get("https://www.googleapis.com/oauth2/v2/userinfo")
        .bearer_auth(&payload.token)
        .send()
        .await
        .map_err(|_| ApiError::Upstream)?;

    if !response.status().is_success() {
        return Err(ApiError::Validation(
            "failed to fetch user info from google".to_string(),
        ));
    }

    let info: GoogleUserInfo = response.json().await.map_err(|_| ApiError::Upstream)?;
    if !info.verified_email {
        return Err(ApiError::Validation(
            "email not verified by google".to_string(),
        ));
    }
    let email = info
        .email
        .ok_or_else(|| ApiError::Validation("google account has no email".to_string()))?;

    let user = match state.repo.get_user_by_email(&email).await? {
        Some(existing) => existing,
        None => {
            state
                .repo
                .create_user(NewUser {
                    email,
                    password_hash: None,
                    auth_type: AUTH_TYPE_GOOGLE.to_string(),
                    is_subscriber: false,
                })
                .await?
        }
    };

    if !user.is_active {
        return Err(ApiError::PrincipalNotFound);
    }

    let token = issue_token(&user, &state.config.jwt_secret, state.config.token_ttl_secs)?;
    Ok(Json(auth_response(&user, token)))
}

/// get_me
///
/// [Authenticated Route] Returns the resolved Principal: the live account
/// flags plus the role derived from them.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Resolved identity", body = Principal))
)]
pub async fn get_me(principal: Principal) -> Json<Principal> {
    Json(principal)
}

// --- Career Handlers ---

/// get_published_careers
///
/// [Public Route] Published job postings in manual priority order.
#[utoipa::path(
    get,
    path = "/careers",
    responses((status = 200, description = "Published careers", body = [Career]))
)]
pub async fn get_published_careers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Career>>, ApiError> {
    Ok(Json(state.repo.list_published_careers().await?))
}

/// get_admin_careers
///
/// [Admin Route] All postings, published or not.
#[utoipa::path(
    get,
    path = "/admin/careers",
    responses((status = 200, description = "All careers", body = [Career]))
)]
pub async fn get_admin_careers(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Career>>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    Ok(Json(state.repo.list_careers().await?))
}

/// create_career
///
/// [Admin Route] Creates a job posting.
#[utoipa::path(
    post,
    path = "/admin/careers",
    request_body = CreateCareerRequest,
    responses((status = 201, description = "Created", body = Career))
)]
pub async fn create_career(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateCareerRequest>,
) -> Result<(StatusCode, Json<Career>), ApiError> {
    principal.authorize(RequiredRole::Admin)?;

    if !WORK_MODES.contains(&payload.work_mode.as_str()) {
        return Err(ApiError::Validation(format!(
            "work_mode must be one of {WORK_MODES:?}"
        )));
    }

    let career = state.repo.create_career(payload).await?;
    Ok((StatusCode::CREATED, Json(career)))
}

/// get_career
///
/// [Admin Route] Single posting detail.
#[utoipa::path(
    get,
    path = "/admin/careers/{id}",
    params(("id" = Uuid, Path, description = "Career ID")),
    responses((status = 200, description = "Found", body = Career))
)]
pub async fn get_career(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Career>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    state
        .repo
        .get_career(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("career"))
}

/// update_career
///
/// [Admin Route] Partial update; only fields present in the payload change.
#[utoipa::path(
    put,
    path = "/admin/careers/{id}",
    params(("id" = Uuid, Path, description = "Career ID")),
    request_body = UpdateCareerRequest,
    responses((status = 200, description = "Updated", body = Career))
)]
pub async fn update_career(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCareerRequest>,
) -> Result<Json<Career>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;

    if let Some(mode) = &payload.work_mode {
        if !WORK_MODES.contains(&mode.as_str()) {
            return Err(ApiError::Validation(format!(
                "work_mode must be one of {WORK_MODES:?}"
            )));
        }
    }

    state
        .repo
        .update_career(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("career"))
}

/// delete_career
///
/// [Admin Route] Deletes a posting.
#[utoipa::path(
    delete,
    path = "/admin/careers/{id}",
    params(("id" = Uuid, Path, description = "Career ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_career(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    if state.repo.delete_career(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("career"))
    }
}

// --- Magazine Handlers ---

/// get_admin_magazines
///
/// [Admin Route] All issues regardless of publication state.
#[utoipa::path(
    get,
    path = "/admin/magazines",
    responses((status = 200, description = "All magazines", body = [Magazine]))
)]
pub async fn get_admin_magazines(
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Vec<Magazine>>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    Ok(Json(state.repo.list_magazines().await?))
}

/// create_magazine
#[utoipa::path(
    post,
    path = "/admin/magazines",
    request_body = CreateMagazineRequest,
    responses((status = 201, description = "Created", body = Magazine))
)]
pub async fn create_magazine(
    principal: Principal,
    State(state): State<AppState>,
    Json(payload): Json<CreateMagazineRequest>,
) -> Result<(StatusCode, Json<Magazine>), ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    let magazine = state.repo.create_magazine(payload).await?;
    Ok((StatusCode::CREATED, Json(magazine)))
}

/// get_admin_magazine
#[utoipa::path(
    get,
    path = "/admin/magazines/{id}",
    params(("id" = Uuid, Path, description = "Magazine ID")),
    responses((status = 200, description = "Found", body = Magazine))
)]
pub async fn get_admin_magazine(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Magazine>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    state
        .repo
        .get_magazine(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("magazine"))
}

/// update_magazine
#[utoipa::path(
    put,
    path = "/admin/magazines/{id}",
    params(("id" = Uuid, Path, description = "Magazine ID")),
    request_body = UpdateMagazineRequest,
    responses((status = 200, description = "Updated", body = Magazine))
)]
pub async fn update_magazine(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMagazineRequest>,
) -> Result<Json<Magazine>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    state
        .repo
        .update_magazine(id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("magazine"))
}

/// delete_magazine
#[utoipa::path(
    delete,
    path = "/admin/magazines/{id}",
    params(("id" = Uuid, Path, description = "Magazine ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_magazine(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    if state.repo.delete_magazine(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("magazine"))
    }
}

/// get_magazines_for_home
///
/// [Public Route] Home-page carousel issues in manual priority order.
#[utoipa::path(
    get,
    path = "/magazines/home",
    responses((status = 200, description = "Home carousel", body = [Magazine]))
)]
pub async fn get_magazines_for_home(
    State(state): State<AppState>,
) -> Result<Json<Vec<Magazine>>, ApiError> {
    Ok(Json(state.repo.magazines_for_home().await?))
}

/// get_current_magazine
///
/// [Public Route] The most recently published issue.
#[utoipa::path(
    get,
    path = "/magazines/current",
    responses((status = 200, description = "Current issue", body = Magazine))
)]
pub async fn get_current_magazine(
    State(state): State<AppState>,
) -> Result<Json<Magazine>, ApiError> {
    state
        .repo
        .current_magazine()
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("magazine"))
}

/// get_magazine_years
///
/// [Public Route] Distinct publication years, newest first.
#[utoipa::path(
    get,
    path = "/magazines/years",
    responses((status = 200, description = "Years", body = [i32]))
)]
pub async fn get_magazine_years(State(state): State<AppState>) -> Result<Json<Vec<i32>>, ApiError> {
    Ok(Json(state.repo.magazine_years().await?))
}

/// get_magazines_by_year
///
/// [Public Route] Published issues of one year.
#[utoipa::path(
    get,
    path = "/magazines/year/{year}",
    params(("year" = i32, Path, description = "Publication year")),
    responses((status = 200, description = "Issues of the year", body = [Magazine]))
)]
pub async fn get_magazines_by_year(
    State(state): State<AppState>,
    Path(year): Path<i32>,
) -> Result<Json<Vec<Magazine>>, ApiError> {
    Ok(Json(state.repo.magazines_by_year(year).await?))
}

/// get_magazine_details
///
/// [Public Route] Published issue detail (the subscriber-gated PDF reference
/// is served by `get_magazine_issue`, not here).
#[utoipa::path(
    get,
    path = "/magazines/{id}",
    params(("id" = Uuid, Path, description = "Magazine ID")),
    responses((status = 200, description = "Found", body = Magazine))
)]
pub async fn get_magazine_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Magazine>, ApiError> {
    state
        .repo
        .get_published_magazine(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("magazine"))
}

/// get_magazine_issue
///
/// [Subscriber Route] The full-issue PDF reference. The subscriber check is
/// strict: admins do not implicitly pass it.
#[utoipa::path(
    get,
    path = "/magazines/{id}/issue",
    params(("id" = Uuid, Path, description = "Magazine ID")),
    responses(
        (status = 200, description = "Issue file reference", body = MagazineIssueResponse),
        (status = 403, description = "Not a subscriber")
    )
)]
pub async fn get_magazine_issue(
    principal: Principal,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MagazineIssueResponse>, ApiError> {
    principal.authorize(RequiredRole::Subscriber)?;

    let magazine = state
        .repo
        .get_published_magazine(id)
        .await?
        .ok_or(ApiError::NotFound("magazine"))?;

    match (magazine.pdf_url, magazine.pdf_key) {
        (Some(pdf_url), Some(pdf_key)) => Ok(Json(MagazineIssueResponse {
            magazine_id: magazine.id,
            pdf_url,
            pdf_key,
        })),
        _ => Err(ApiError::NotFound("issue file")),
    }
}

// --- Home-Image Collection Handlers ---

/// get_home_images
///
/// [Public Route] One section's images in priority order.
#[utoipa::path(
    get,
    path = "/home-images/{section}",
    params(("section" = String, Path, description = "Collection name, e.g. 'books'")),
    responses((status = 200, description = "Section images", body = [HomeImage]))
)]
pub async fn get_home_images(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Json<Vec<HomeImage>>, ApiError> {
    Ok(Json(state.repo.list_home_images(&section).await?))
}

/// get_admin_home_images
///
/// [Admin Route] Same listing, behind the admin gate for the management UI.
#[utoipa::path(
    get,
    path = "/admin/home-images/{section}",
    params(("section" = String, Path, description = "Collection name")),
    responses((status = 200, description = "Section images", body = [HomeImage]))
)]
pub async fn get_admin_home_images(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<Json<Vec<HomeImage>>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    Ok(Json(state.repo.list_home_images(&section).await?))
}

/// upload_home_images
///
/// [Admin Route] Multipart multi-file upload. Each file goes to object
/// storage first; the returned keys are then appended to the section with
/// consecutive priorities in upload order.
#[utoipa::path(
    post,
    path = "/admin/home-images/{section}",
    params(("section" = String, Path, description = "Collection name")),
    responses((status = 201, description = "Appended images", body = [HomeImage]))
)]
pub async fn upload_home_images(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<HomeImage>>), ApiError> {
    principal.authorize(RequiredRole::Admin)?;

    let mut stored = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.bin").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|_| ApiError::Validation("unreadable file field".to_string()))?
            .to_vec();

        let object = state
            .storage
            .put(bytes, &section, &filename, &content_type)
            .await?;
        stored.push(NewHomeImage {
            image_url: object.url,
            image_key: object.key,
        });
    }

    if stored.is_empty() {
        return Err(ApiError::Validation("no files provided".to_string()));
    }

    let images = state.repo.append_home_images(&section, stored).await?;
    Ok((StatusCode::CREATED, Json(images)))
}

/// reorder_home_image
///
/// [Admin Route] Moves one image to a new position. The shift of every
/// displaced image plus the target's placement land in a single transaction;
/// a failed move leaves every priority exactly as it was.
#[utoipa::path(
    patch,
    path = "/admin/home-images/{section}",
    params(("section" = String, Path, description = "Collection name")),
    request_body = ReorderImageRequest,
    responses(
        (status = 200, description = "Moved", body = HomeImage),
        (status = 400, description = "Priority out of range"),
        (status = 404, description = "No image with that key")
    )
)]
pub async fn reorder_home_image(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<String>,
    Json(payload): Json<ReorderImageRequest>,
) -> Result<Json<HomeImage>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;

    let image = state
        .repo
        .reorder_home_image(&section, &payload.image_key, payload.priority)
        .await?;
    Ok(Json(image))
}

/// delete_home_image
///
/// [Admin Route] Removes the row (compacting the section's priorities), then
/// deletes the stored object. An unknown key is a plain 404 and touches
/// nothing in storage.
#[utoipa::path(
    delete,
    path = "/admin/home-images/{section}",
    params(
        ("section" = String, Path, description = "Collection name"),
        DeleteKeyQuery
    ),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No image with that key")
    )
)]
pub async fn delete_home_image(
    principal: Principal,
    State(state): State<AppState>,
    Path(section): Path<String>,
    Query(query): Query<DeleteKeyQuery>,
) -> Result<StatusCode, ApiError> {
    principal.authorize(RequiredRole::Admin)?;

    state.repo.remove_home_image(&section, &query.key).await?;
    state.storage.delete(&query.key).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Generic Upload Handlers ---

/// upload_file
///
/// [Admin Route] Generic media upload (covers, issue PDFs): single multipart
/// `file` field plus an optional `folder` field, defaulting to 'misc'.
#[utoipa::path(
    post,
    path = "/admin/uploads",
    responses((status = 200, description = "Stored object", body = UploadResponse))
)]
pub async fn upload_file(
    principal: Principal,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    principal.authorize(RequiredRole::Admin)?;

    let mut folder = "misc".to_string();
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?
    {
        match field.name() {
            Some("folder") => {
                folder = field
                    .text()
                    .await
                    .map_err(|_| ApiError::Validation("unreadable folder field".to_string()))?;
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::Validation("unreadable file field".to_string()))?
                    .to_vec();
                file = Some((filename, content_type, bytes));
            }
            _ => {}
        }
    }

    let (filename, content_type, bytes) =
        file.ok_or_else(|| ApiError::Validation("no file provided".to_string()))?;

    let object = state
        .storage
        .put(bytes, &folder, &filename, &content_type)
        .await?;
    Ok(Json(UploadResponse {
        url: object.url,
        key: object.key,
    }))
}

/// delete_file
///
/// [Admin Route] Deletes a stored object by key.
#[utoipa::path(
    delete,
    path = "/admin/uploads",
    params(DeleteKeyQuery),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_file(
    principal: Principal,
    State(state): State<AppState>,
    Query(query): Query<DeleteKeyQuery>,
) -> Result<StatusCode, ApiError> {
    principal.authorize(RequiredRole::Admin)?;
    state.storage.delete(&query.key).await?;
    Ok(StatusCode::NO_CONTENT)
}
