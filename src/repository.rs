use crate::error::ApiError;
use crate::models::{
    Career, CreateCareerRequest, CreateMagazineRequest, HomeImage, Magazine, NewHomeImage,
    NewUser, UpdateCareerRequest, UpdateMagazineRequest, User, UserCredentials,
};
use crate::reindex;
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, auth_type, is_staff, is_subscriber, is_active, created_at";

const CAREER_COLUMNS: &str =
    "id, title, description, work_mode, form_link, priority, is_published, created_at, updated_at";

const MAGAZINE_COLUMNS: &str = "id, name, description, published_date, cover_image_url, \
     cover_image_key, pdf_url, pdf_key, is_published, show_on_home, on_home_priority, \
     created_at, updated_at";

const HOME_IMAGE_COLUMNS: &str = "id, section, image_url, image_key, priority, created_at";

/// Repository Trait
///
/// The abstract contract for all persistence operations, letting handlers
/// talk to the data layer without knowing the implementation (Postgres in
/// production, an in-memory mock in tests). Every operation surfaces its
/// failure directly as an `ApiError`; nothing is retried or swallowed here.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    // Account lookup backing every credential resolution.
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError>;
    // Login-path projection carrying the password hash. Never serialized.
    async fn get_credentials(&self, email: &str) -> Result<Option<UserCredentials>, ApiError>;
    async fn create_user(&self, new: NewUser) -> Result<User, ApiError>;

    // --- Careers ---
    async fn list_careers(&self) -> Result<Vec<Career>, ApiError>;
    // Public listing: published only, manual priority order.
    async fn list_published_careers(&self) -> Result<Vec<Career>, ApiError>;
    async fn get_career(&self, id: Uuid) -> Result<Option<Career>, ApiError>;
    async fn create_career(&self, req: CreateCareerRequest) -> Result<Career, ApiError>;
    // Partial update via COALESCE; None when the row does not exist.
    async fn update_career(
        &self,
        id: Uuid,
        req: UpdateCareerRequest,
    ) -> Result<Option<Career>, ApiError>;
    async fn delete_career(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Magazines ---
    async fn list_magazines(&self) -> Result<Vec<Magazine>, ApiError>;
    async fn get_magazine(&self, id: Uuid) -> Result<Option<Magazine>, ApiError>;
    // Public detail: published issues only.
    async fn get_published_magazine(&self, id: Uuid) -> Result<Option<Magazine>, ApiError>;
    async fn create_magazine(&self, req: CreateMagazineRequest) -> Result<Magazine, ApiError>;
    async fn update_magazine(
        &self,
        id: Uuid,
        req: UpdateMagazineRequest,
    ) -> Result<Option<Magazine>, ApiError>;
    async fn delete_magazine(&self, id: Uuid) -> Result<bool, ApiError>;
    // Home-page carousel: show_on_home issues by on_home_priority.
    async fn magazines_for_home(&self) -> Result<Vec<Magazine>, ApiError>;
    // The most recently published issue.
    async fn current_magazine(&self) -> Result<Option<Magazine>, ApiError>;
    async fn magazines_by_year(&self, year: i32) -> Result<Vec<Magazine>, ApiError>;
    // Distinct publication years, newest first.
    async fn magazine_years(&self) -> Result<Vec<i32>, ApiError>;

    // --- Ordered home-image collections ---
    // One collection per section; sections never interact.
    async fn list_home_images(&self, section: &str) -> Result<Vec<HomeImage>, ApiError>;
    // Appends a batch at the end of the section, consecutive priorities in
    // caller order, starting at max+1 (0 for an empty section).
    async fn append_home_images(
        &self,
        section: &str,
        images: Vec<NewHomeImage>,
    ) -> Result<Vec<HomeImage>, ApiError>;
    // Moves one image to a new position, shifting the displaced window by
    // one slot each, all inside a single transaction. Concurrent mutations
    // of the same section serialize on a per-section lock.
    async fn reorder_home_image(
        &self,
        section: &str,
        image_key: &str,
        new_priority: i32,
    ) -> Result<HomeImage, ApiError>;
    // Deletes one image and compacts the priorities above it, same
    // transaction.
    async fn remove_home_image(&self, section: &str, image_key: &str) -> Result<(), ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The production implementation, backed by a sqlx connection pool.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Takes a transaction-scoped advisory lock on the section name. Row locks
/// alone cannot serialize appends: an empty section has no rows to lock, and
/// a blocked transaction's snapshot would not see the winner's inserts, so
/// two appends could both start at the same priority. The advisory lock makes
/// every append/reorder/remove on one section fully sequential while leaving
/// other sections untouched.
async fn lock_section(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    section: &str,
) -> Result<(), ApiError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(section)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Accounts ---

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM user_auth WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM user_auth WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_credentials(&self, email: &str) -> Result<Option<UserCredentials>, ApiError> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, password_hash, is_active FROM user_auth WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(creds)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO user_auth \
                 (id, email, password_hash, auth_type, is_staff, is_subscriber, is_active, created_at) \
             VALUES ($1, $2, $3, $4, false, $5, true, NOW()) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.auth_type)
        .bind(new.is_subscriber)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    // --- Careers ---

    async fn list_careers(&self) -> Result<Vec<Career>, ApiError> {
        let careers = sqlx::query_as::<_, Career>(&format!(
            "SELECT {CAREER_COLUMNS} FROM careers ORDER BY priority ASC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(careers)
    }

    async fn list_published_careers(&self) -> Result<Vec<Career>, ApiError> {
        let careers = sqlx::query_as::<_, Career>(&format!(
            "SELECT {CAREER_COLUMNS} FROM careers WHERE is_published = true \
             ORDER BY priority ASC, created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(careers)
    }

    async fn get_career(&self, id: Uuid) -> Result<Option<Career>, ApiError> {
        let career = sqlx::query_as::<_, Career>(&format!(
            "SELECT {CAREER_COLUMNS} FROM careers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(career)
    }

    async fn create_career(&self, req: CreateCareerRequest) -> Result<Career, ApiError> {
        let career = sqlx::query_as::<_, Career>(&format!(
            "INSERT INTO careers \
                 (id, title, description, work_mode, form_link, priority, is_published, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
             RETURNING {CAREER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.title)
        .bind(req.description)
        .bind(req.work_mode)
        .bind(req.form_link)
        .bind(req.priority)
        .bind(req.is_published)
        .fetch_one(&self.pool)
        .await?;
        Ok(career)
    }

    async fn update_career(
        &self,
        id: Uuid,
        req: UpdateCareerRequest,
    ) -> Result<Option<Career>, ApiError> {
        let career = sqlx::query_as::<_, Career>(&format!(
            "UPDATE careers \
             SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 work_mode = COALESCE($4, work_mode), \
                 form_link = COALESCE($5, form_link), \
                 priority = COALESCE($6, priority), \
                 is_published = COALESCE($7, is_published), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {CAREER_COLUMNS}"
        ))
        .bind(id)
        .bind(req.title)
        .bind(req.description)
        .bind(req.work_mode)
        .bind(req.form_link)
        .bind(req.priority)
        .bind(req.is_published)
        .fetch_optional(&self.pool)
        .await?;
        Ok(career)
    }

    async fn delete_career(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM careers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- Magazines ---

    async fn list_magazines(&self) -> Result<Vec<Magazine>, ApiError> {
        let magazines = sqlx::query_as::<_, Magazine>(&format!(
            "SELECT {MAGAZINE_COLUMNS} FROM magazines ORDER BY published_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(magazines)
    }

    async fn get_magazine(&self, id: Uuid) -> Result<Option<Magazine>, ApiError> {
        let magazine = sqlx::query_as::<_, Magazine>(&format!(
            "SELECT {MAGAZINE_COLUMNS} FROM magazines WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(magazine)
    }

    async fn get_published_magazine(&self, id: Uuid) -> Result<Option<Magazine>, ApiError> {
        let magazine = sqlx::query_as::<_, Magazine>(&format!(
            "SELECT {MAGAZINE_COLUMNS} FROM magazines WHERE id = $1 AND is_published = true"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(magazine)
    }

    async fn create_magazine(&self, req: CreateMagazineRequest) -> Result<Magazine, ApiError> {
        let magazine = sqlx::query_as::<_, Magazine>(&format!(
            "INSERT INTO magazines \
                 (id, name, description, published_date, cover_image_url, cover_image_key, \
                  pdf_url, pdf_key, is_published, show_on_home, on_home_priority, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW()) \
             RETURNING {MAGAZINE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.name)
        .bind(req.description)
        .bind(req.published_date)
        .bind(req.cover_image_url)
        .bind(req.cover_image_key)
        .bind(req.pdf_url)
        .bind(req.pdf_key)
        .bind(req.is_published)
        .bind(req.show_on_home)
        .bind(req.on_home_priority)
        .fetch_one(&self.pool)
        .await?;
        Ok(magazine)
    }

    async fn update_magazine(
        &self,
        id: Uuid,
        req: UpdateMagazineRequest,
    ) -> Result<Option<Magazine>, ApiError> {
        let magazine = sqlx::query_as::<_, Magazine>(&format!(
            "UPDATE magazines \
             SET name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 published_date = COALESCE($4, published_date), \
                 cover_image_url = COALESCE($5, cover_image_url), \
                 cover_image_key = COALESCE($6, cover_image_key), \
                 pdf_url = COALESCE($7, pdf_url), \
                 pdf_key = COALESCE($8, pdf_key), \
                 is_published = COALESCE($9, is_published), \
                 show_on_home = COALESCE($10, show_on_home), \
                 on_home_priority = COALESCE($11, on_home_priority), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {MAGAZINE_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.published_date)
        .bind(req.cover_image_url)
        .bind(req.cover_image_key)
        .bind(req.pdf_url)
        .bind(req.pdf_key)
        .bind(req.is_published)
        .bind(req.show_on_home)
        .bind(req.on_home_priority)
        .fetch_optional(&self.pool)
        .await?;
        Ok(magazine)
    }

    async fn delete_magazine(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM magazines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn magazines_for_home(&self) -> Result<Vec<Magazine>, ApiError> {
        let magazines = sqlx::query_as::<_, Magazine>(&format!(
            "SELECT {MAGAZINE_COLUMNS} FROM magazines WHERE show_on_home = true \
             ORDER BY on_home_priority ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(magazines)
    }

    async fn current_magazine(&self) -> Result<Option<Magazine>, ApiError> {
        let magazine = sqlx::query_as::<_, Magazine>(&format!(
            "SELECT {MAGAZINE_COLUMNS} FROM magazines WHERE is_published = true \
             ORDER BY published_date DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(magazine)
    }

    async fn magazines_by_year(&self, year: i32) -> Result<Vec<Magazine>, ApiError> {
        let magazines = sqlx::query_as::<_, Magazine>(&format!(
            "SELECT {MAGAZINE_COLUMNS} FROM magazines \
             WHERE is_published = true AND EXTRACT(YEAR FROM published_date)::int = $1 \
             ORDER BY published_date DESC"
        ))
        .bind(year)
        .fetch_all(&self.pool)
        .await?;
        Ok(magazines)
    }

    async fn magazine_years(&self) -> Result<Vec<i32>, ApiError> {
        let years = sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT EXTRACT(YEAR FROM published_date)::int AS year \
             FROM magazines WHERE is_published = true ORDER BY year DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(years)
    }

    // --- Ordered home-image collections ---

    async fn list_home_images(&self, section: &str) -> Result<Vec<HomeImage>, ApiError> {
        let images = sqlx::query_as::<_, HomeImage>(&format!(
            "SELECT {HOME_IMAGE_COLUMNS} FROM home_images WHERE section = $1 \
             ORDER BY priority ASC"
        ))
        .bind(section)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    /// Appends a batch at the tail of the section. The section lock holds for
    /// the whole transaction, so two concurrent appends cannot hand out the
    /// same priority even on an empty section.
    async fn append_home_images(
        &self,
        section: &str,
        images: Vec<NewHomeImage>,
    ) -> Result<Vec<HomeImage>, ApiError> {
        let mut tx = self.pool.begin().await?;
        lock_section(&mut tx, section).await?;

        let priorities =
            sqlx::query_scalar::<_, i32>("SELECT priority FROM home_images WHERE section = $1")
                .bind(section)
                .fetch_all(&mut *tx)
                .await?;

        let mut next = reindex::next_priority(priorities);
        let mut inserted = Vec::with_capacity(images.len());
        for image in images {
            let row = sqlx::query_as::<_, HomeImage>(&format!(
                "INSERT INTO home_images (id, section, image_url, image_key, priority, created_at) \
                 VALUES ($1, $2, $3, $4, $5, NOW()) \
                 RETURNING {HOME_IMAGE_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(section)
            .bind(image.image_url)
            .bind(image.image_key)
            .bind(next)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
            next += 1;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// One atomic transaction: lock the section, validate the target, shift
    /// the displaced window per [`reindex::plan_move`], place the item. Any
    /// failure drops the transaction, rolling back every shift; partial
    /// application is never observable.
    async fn reorder_home_image(
        &self,
        section: &str,
        image_key: &str,
        new_priority: i32,
    ) -> Result<HomeImage, ApiError> {
        let mut tx = self.pool.begin().await?;
        lock_section(&mut tx, section).await?;

        let rows = sqlx::query_as::<_, (String, i32)>(
            "SELECT image_key, priority FROM home_images WHERE section = $1",
        )
        .bind(section)
        .fetch_all(&mut *tx)
        .await?;

        let len = rows.len();
        if new_priority < 0 || new_priority as usize >= len {
            return Err(ApiError::InvalidPriority {
                given: new_priority,
                len,
            });
        }

        let old = rows
            .iter()
            .find(|(key, _)| key == image_key)
            .map(|(_, priority)| *priority)
            .ok_or(ApiError::ItemNotFound)?;

        if let Some(window) = reindex::plan_move(old, new_priority) {
            sqlx::query(
                "UPDATE home_images SET priority = priority + $1 \
                 WHERE section = $2 AND image_key <> $3 AND priority BETWEEN $4 AND $5",
            )
            .bind(window.delta)
            .bind(section)
            .bind(image_key)
            .bind(window.lo)
            .bind(window.hi)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE home_images SET priority = $1 WHERE section = $2 AND image_key = $3",
            )
            .bind(new_priority)
            .bind(section)
            .bind(image_key)
            .execute(&mut *tx)
            .await?;
        }

        let image = sqlx::query_as::<_, HomeImage>(&format!(
            "SELECT {HOME_IMAGE_COLUMNS} FROM home_images WHERE section = $1 AND image_key = $2"
        ))
        .bind(section)
        .bind(image_key)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }

    /// Deletes one image and closes the gap: everything above the removed
    /// priority moves down one slot, keeping the section dense.
    async fn remove_home_image(&self, section: &str, image_key: &str) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        lock_section(&mut tx, section).await?;

        let old = sqlx::query_scalar::<_, i32>(
            "SELECT priority FROM home_images WHERE section = $1 AND image_key = $2",
        )
        .bind(section)
        .bind(image_key)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ApiError::ItemNotFound)?;

        sqlx::query("DELETE FROM home_images WHERE section = $1 AND image_key = $2")
            .bind(section)
            .bind(image_key)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE home_images SET priority = priority - 1 WHERE section = $1 AND priority > $2",
        )
        .bind(section)
        .bind(old)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
