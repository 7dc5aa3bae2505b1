use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use editorial_portal::{
    AppState,
    auth::{Principal, Role},
    config::AppConfig,
    error::ApiError,
    handlers,
    models::{
        Career, CreateCareerRequest, CreateMagazineRequest, HomeImage, LoginRequest, Magazine,
        NewHomeImage, NewUser, SignupRequest, UpdateCareerRequest, UpdateMagazineRequest, User,
        UserCredentials,
    },
    repository::Repository,
    storage::MockStorageService,
};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- MOCK REPOSITORY IMPLEMENTATION ---

// Central control point for handler tests: pre-canned outputs per operation,
// so each test states exactly the data layer it runs against.
pub struct MockRepoControl {
    pub user_to_return: Option<User>,
    pub user_by_email: Option<User>,
    pub credentials_to_return: Option<UserCredentials>,
    pub careers_to_return: Vec<Career>,
    pub career_to_return: Option<Career>,
    pub magazine_to_return: Option<Magazine>,
    pub delete_result: bool,
}

impl Default for MockRepoControl {
    fn default() -> Self {
        MockRepoControl {
            user_to_return: None,
            user_by_email: None,
            credentials_to_return: None,
            careers_to_return: vec![],
            career_to_return: None,
            magazine_to_return: None,
            delete_result: false,
        }
    }
}

#[async_trait]
impl Repository for MockRepoControl {
    async fn get_user(&self, _id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.user_to_return.clone())
    }
    async fn get_user_by_email(&self, _email: &str) -> Result<Option<User>, ApiError> {
        Ok(self.user_by_email.clone())
    }
    async fn get_credentials(&self, _email: &str) -> Result<Option<UserCredentials>, ApiError> {
        Ok(self.credentials_to_return.clone())
    }
    async fn create_user(&self, new: NewUser) -> Result<User, ApiError> {
        // Echo the insert the way the RETURNING clause would.
        Ok(User {
            id: Uuid::new_v4(),
            email: Some(new.email),
            auth_type: Some(new.auth_type),
            is_staff: false,
            is_subscriber: new.is_subscriber,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    async fn list_careers(&self) -> Result<Vec<Career>, ApiError> {
        Ok(self.careers_to_return.clone())
    }
    async fn list_published_careers(&self) -> Result<Vec<Career>, ApiError> {
        Ok(self
            .careers_to_return
            .iter()
            .filter(|c| c.is_published)
            .cloned()
            .collect())
    }
    async fn get_career(&self, _id: Uuid) -> Result<Option<Career>, ApiError> {
        Ok(self.career_to_return.clone())
    }
    async fn create_career(&self, req: CreateCareerRequest) -> Result<Career, ApiError> {
        Ok(Career {
            id: Uuid::new_v4(),
            title: req.title,
            description: req.description,
            work_mode: req.work_mode,
            form_link: req.form_link,
            priority: req.priority,
            is_published: req.is_published,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }
    async fn update_career(
        &self,
        _id: Uuid,
        _req: UpdateCareerRequest,
    ) -> Result<Option<Career>, ApiError> {
        Ok(self.career_to_return.clone())
    }
    async fn delete_career(&self, _id: Uuid) -> Result<bool, ApiError> {
        Ok(self.delete_result)
    }

    async fn list_magazines(&self) -> Result<Vec<Magazine>, ApiError> {
        Ok(self.magazine_to_return.clone().into_iter().collect())
    }
    async fn get_magazine(&self, _id: Uuid) -> Result<Option<Magazine>, ApiError> {
        Ok(self.magazine_to_return.clone())
    }
    async fn get_published_magazine(&self, _id: Uuid) -> Result<Option<Magazine>, ApiError> {
        Ok(self.magazine_to_return.clone().filter(|m| m.is_published))
    }
    async fn create_magazine(&self, _req: CreateMagazineRequest) -> Result<Magazine, ApiError> {
        Ok(Magazine::default())
    }
    async fn update_magazine(
        &self,
        _id: Uuid,
        _req: UpdateMagazineRequest,
    ) -> Result<Option<Magazine>, ApiError> {
        Ok(self.magazine_to_return.clone())
    }
    async fn delete_magazine(&self, _id: Uuid) -> Result<bool, ApiError> {
        Ok(self.delete_result)
    }
    async fn magazines_for_home(&self) -> Result<Vec<Magazine>, ApiError> {
        Ok(vec![])
    }
    async fn current_magazine(&self) -> Result<Option<Magazine>, ApiError> {
        Ok(self.magazine_to_return.clone())
    }
    async fn magazines_by_year(&self, _year: i32) -> Result<Vec<Magazine>, ApiError> {
        Ok(vec![])
    }
    async fn magazine_years(&self) -> Result<Vec<i32>, ApiError> {
        Ok(vec![])
    }

    async fn list_home_images(&self, _section: &str) -> Result<Vec<HomeImage>, ApiError> {
        Ok(vec![])
    }
    async fn append_home_images(
        &self,
        _section: &str,
        _images: Vec<NewHomeImage>,
    ) -> Result<Vec<HomeImage>, ApiError> {
        Ok(vec![])
    }
    async fn reorder_home_image(
        &self,
        _section: &str,
        _image_key: &str,
        _new_priority: i32,
    ) -> Result<HomeImage, ApiError> {
        Err(ApiError::ItemNotFound)
    }
    async fn remove_home_image(&self, _section: &str, _image_key: &str) -> Result<(), ApiError> {
        Err(ApiError::ItemNotFound)
    }
}

// --- TEST UTILITIES ---

const TEST_ID: Uuid = Uuid::from_u128(123);

fn create_test_state(repo_control: MockRepoControl) -> AppState {
    AppState {
        repo: Arc::new(repo_control),
        storage: Arc::new(MockStorageService::new()),
        config: AppConfig::default(),
    }
}

fn principal_with(role: Role) -> Principal {
    Principal {
        id: Uuid::from_u128(456),
        email: Some("someone@example.com".to_string()),
        is_staff: role == Role::Admin,
        is_subscriber: role == Role::Subscriber,
        role,
    }
}

fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

fn published_magazine_with_pdf() -> Magazine {
    Magazine {
        id: TEST_ID,
        name: "Issue 12".to_string(),
        is_published: true,
        pdf_url: Some("http://localhost:9000/media/issues/12.pdf".to_string()),
        pdf_key: Some("issues/12.pdf".to_string()),
        ..Magazine::default()
    }
}

// --- AUTH HANDLER TESTS ---

#[test]
async fn test_signup_success_reports_the_derived_role() {
    let state = create_test_state(MockRepoControl::default());

    let payload = SignupRequest {
        email: "new@example.com".to_string(),
        password: "hunter22".to_string(),
        is_subscriber: true,
    };

    let (status, Json(body)) = handlers::signup(State(state), Json(payload)).await.unwrap();

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body.role, "subscriber");
    assert!(!body.access_token.is_empty());
}

#[test]
async fn test_signup_conflict_on_registered_email() {
    let state = create_test_state(MockRepoControl {
        user_by_email: Some(User::default()),
        ..MockRepoControl::default()
    });

    let payload = SignupRequest {
        email: "taken@example.com".to_string(),
        password: "hunter22".to_string(),
        is_subscriber: false,
    };

    let result = handlers::signup(State(state), Json(payload)).await;
    assert!(matches!(result, Err(ApiError::Conflict(_))));
}

#[test]
async fn test_login_success() {
    let user_id = Uuid::new_v4();
    let state = create_test_state(MockRepoControl {
        credentials_to_return: Some(UserCredentials {
            id: user_id,
            password_hash: Some(hash("correct-password")),
            is_active: true,
        }),
        user_to_return: Some(User {
            id: user_id,
            email: Some("reader@example.com".to_string()),
            is_active: true,
            ..User::default()
        }),
        ..MockRepoControl::default()
    });

    let payload = LoginRequest {
        email: "reader@example.com".to_string(),
        password: "correct-password".to_string(),
    };

    let Json(body) = handlers::login(State(state), Json(payload)).await.unwrap();
    assert_eq!(body.user_id, user_id);
    assert_eq!(body.role, "user");
}

#[test]
async fn test_login_rejects_a_wrong_password() {
    let state = create_test_state(MockRepoControl {
        credentials_to_return: Some(UserCredentials {
            id: Uuid::new_v4(),
            password_hash: Some(hash("correct-password")),
            is_active: true,
        }),
        ..MockRepoControl::default()
    });

    let payload = LoginRequest {
        email: "reader@example.com".to_string(),
        password: "wrong-password".to_string(),
    };

    let result = handlers::login(State(state), Json(payload)).await;
    assert!(matches!(result, Err(ApiError::InvalidCredential)));
}

#[test]
async fn test_login_rejects_a_deactivated_account() {
    let state = create_test_state(MockRepoControl {
        credentials_to_return: Some(UserCredentials {
            id: Uuid::new_v4(),
            password_hash: Some(hash("correct-password")),
            is_active: false,
        }),
        ..MockRepoControl::default()
    });

    let payload = LoginRequest {
        email: "gone@example.com".to_string(),
        password: "correct-password".to_string(),
    };

    let result = handlers::login(State(state), Json(payload)).await;
    assert!(matches!(result, Err(ApiError::InvalidCredential)));
}

// --- ADMIN GATE TESTS ---

#[test]
async fn test_admin_careers_forbidden_for_plain_users() {
    let state = create_test_state(MockRepoControl::default());

    let result = handlers::get_admin_careers(principal_with(Role::User), State(state)).await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
}

#[test]
async fn test_admin_careers_forbidden_for_subscribers() {
    let state = create_test_state(MockRepoControl::default());

    let result = handlers::get_admin_careers(principal_with(Role::Subscriber), State(state)).await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
}

#[test]
async fn test_admin_careers_success() {
    let state = create_test_state(MockRepoControl {
        careers_to_return: vec![Career::default()],
        ..MockRepoControl::default()
    });

    let result = handlers::get_admin_careers(principal_with(Role::Admin), State(state)).await;
    let Json(careers) = result.unwrap();
    assert_eq!(careers.len(), 1);
}

#[test]
async fn test_create_career_rejects_unknown_work_modes() {
    let state = create_test_state(MockRepoControl::default());

    let payload = CreateCareerRequest {
        title: "Editor".to_string(),
        description: "Copy editing".to_string(),
        work_mode: "telepathic".to_string(),
        form_link: "https://forms.example.com/editor".to_string(),
        priority: 0,
        is_published: true,
    };

    let result = handlers::create_career(principal_with(Role::Admin), State(state), Json(payload)).await;
    assert!(matches!(result, Err(ApiError::Validation(_))));
}

#[test]
async fn test_create_career_success() {
    let state = create_test_state(MockRepoControl::default());

    let payload = CreateCareerRequest {
        title: "Editor".to_string(),
        description: "Copy editing".to_string(),
        work_mode: "hybrid".to_string(),
        form_link: "https://forms.example.com/editor".to_string(),
        priority: 0,
        is_published: true,
    };

    let (status, Json(career)) =
        handlers::create_career(principal_with(Role::Admin), State(state), Json(payload))
            .await
            .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(career.title, "Editor");
}

#[test]
async fn test_delete_career_not_found() {
    let state = create_test_state(MockRepoControl {
        delete_result: false,
        ..MockRepoControl::default()
    });

    let result =
        handlers::delete_career(principal_with(Role::Admin), State(state), Path(TEST_ID)).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[test]
async fn test_delete_career_success() {
    let state = create_test_state(MockRepoControl {
        delete_result: true,
        ..MockRepoControl::default()
    });

    let status = handlers::delete_career(principal_with(Role::Admin), State(state), Path(TEST_ID))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);
}

// --- SUBSCRIBER GATE TESTS ---

#[test]
async fn test_magazine_issue_released_to_subscribers() {
    let state = create_test_state(MockRepoControl {
        magazine_to_return: Some(published_magazine_with_pdf()),
        ..MockRepoControl::default()
    });

    let result =
        handlers::get_magazine_issue(principal_with(Role::Subscriber), State(state), Path(TEST_ID))
            .await;

    let Json(issue) = result.unwrap();
    assert_eq!(issue.magazine_id, TEST_ID);
    assert_eq!(issue.pdf_key, "issues/12.pdf");
}

#[test]
async fn test_magazine_issue_denied_to_admins() {
    // The subscriber check is strict: staff status does not imply a
    // subscription.
    let state = create_test_state(MockRepoControl {
        magazine_to_return: Some(published_magazine_with_pdf()),
        ..MockRepoControl::default()
    });

    let result =
        handlers::get_magazine_issue(principal_with(Role::Admin), State(state), Path(TEST_ID))
            .await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
}

#[test]
async fn test_magazine_issue_denied_to_plain_users() {
    let state = create_test_state(MockRepoControl {
        magazine_to_return: Some(published_magazine_with_pdf()),
        ..MockRepoControl::default()
    });

    let result =
        handlers::get_magazine_issue(principal_with(Role::User), State(state), Path(TEST_ID))
            .await;
    assert!(matches!(result, Err(ApiError::Forbidden)));
}

#[test]
async fn test_magazine_issue_missing_pdf_is_not_found() {
    let mut magazine = published_magazine_with_pdf();
    magazine.pdf_url = None;
    magazine.pdf_key = None;

    let state = create_test_state(MockRepoControl {
        magazine_to_return: Some(magazine),
        ..MockRepoControl::default()
    });

    let result =
        handlers::get_magazine_issue(principal_with(Role::Subscriber), State(state), Path(TEST_ID))
            .await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

// --- PUBLICATION FILTER TESTS ---

#[test]
async fn test_public_career_listing_hides_unpublished_postings() {
    let published = Career {
        is_published: true,
        title: "Visible".to_string(),
        ..Career::default()
    };
    let draft = Career {
        is_published: false,
        title: "Hidden".to_string(),
        ..Career::default()
    };

    let state = create_test_state(MockRepoControl {
        careers_to_return: vec![published, draft],
        ..MockRepoControl::default()
    });

    let Json(careers) = handlers::get_published_careers(State(state)).await.unwrap();
    assert_eq!(careers.len(), 1);
    assert_eq!(careers[0].title, "Visible");
}

#[test]
async fn test_public_magazine_detail_hides_drafts() {
    let mut magazine = published_magazine_with_pdf();
    magazine.is_published = false;

    let state = create_test_state(MockRepoControl {
        magazine_to_return: Some(magazine),
        ..MockRepoControl::default()
    });

    let result = handlers::get_magazine_details(State(state), Path(TEST_ID)).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}
