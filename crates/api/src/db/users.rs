//! User repository.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use olfong_core::{Email, UserId, UserRole};

use super::{RepositoryError, conflict_on_foreign_key, conflict_on_unique};
use crate::models::user::{ProfileUpdate, StaffFilter, StaffUpdate, User};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    full_name: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<NaiveDate>,
    role: UserRole,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            full_name: row.full_name,
            phone: row.phone,
            date_of_birth: row.date_of_birth,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserWithPasswordRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// A user row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Email,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub role: UserRole,
}

const USER_COLUMNS: &str =
    "id, email, full_name, phone, date_of_birth, role, created_at, updated_at";

/// Returned when a change would leave the shop without an admin.
pub const LAST_ADMIN: &str = "Cannot remove the last admin user";

fn push_staff_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &StaffFilter) {
    qb.push(" WHERE role IN ('admin', 'delivery')");
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{search}%");
        qb.push(" AND (email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR full_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR phone ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role);
    }
}

// =============================================================================
// Repository
// =============================================================================

pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered.
    pub async fn create(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO users (email, password_hash, full_name, phone, date_of_birth, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.date_of_birth)
        .bind(user.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "User already exists"))?;

        tracing::info!(user_id = %row.id, role = %row.role, "Created user");
        row.try_into()
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// User and stored password hash for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithPasswordRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(|row| Ok((row.user.try_into()?, row.password_hash)))
            .transpose()
    }

    /// Update a user's own profile fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                date_of_birth = COALESCE($4, date_of_birth),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.full_name)
        .bind(&update.phone)
        .bind(update.date_of_birth)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Users with the delivery role, for the driver picker.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_role(&self, role: UserRole) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role = $1 ORDER BY full_name NULLS LAST, id"
        ))
        .bind(role)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Admin and delivery accounts matching `filter`, with the total.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_staff(
        &self,
        filter: &StaffFilter,
    ) -> Result<(Vec<User>, i64), RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_staff_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut query = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_staff_filters(&mut query, filter);
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.page.limit())
            .push(" OFFSET ")
            .push_bind(filter.page.offset());
        let rows: Vec<UserRow> = query.build_query_as().fetch_all(self.pool).await?;

        let users = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((users, total))
    }

    /// Update a staff account. `password_hash` replaces the stored one.
    ///
    /// Demoting the only admin is refused in the same statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no staff account has this id.
    /// Returns `RepositoryError::Conflict` if the last admin would be demoted.
    pub async fn update_staff(
        &self,
        id: UserId,
        update: &StaffUpdate,
        password_hash: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                phone = COALESCE($3, phone),
                role = COALESCE($4, role),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
              AND role IN ('admin', 'delivery')
              AND NOT (
                  role = 'admin'
                  AND COALESCE($4, role) <> 'admin'
                  AND (SELECT COUNT(*) FROM users WHERE role = 'admin') <= 1
              )
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.full_name.as_deref().map(str::trim))
        .bind(update.phone.as_deref().map(str::trim))
        .bind(update.role)
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.staff_miss(id).await?),
        }
    }

    /// Delete a staff account unless it is the last admin.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no staff account has this id.
    /// Returns `RepositoryError::Conflict` for the last admin, or an account
    /// that has placed orders.
    pub async fn delete_staff(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM users
            WHERE id = $1
              AND role IN ('admin', 'delivery')
              AND NOT (
                  role = 'admin'
                  AND (SELECT COUNT(*) FROM users WHERE role = 'admin') <= 1
              )
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| conflict_on_foreign_key(e, "Staff member has orders and cannot be deleted"))?;

        if result.rows_affected() == 0 {
            return Err(self.staff_miss(id).await?);
        }
        tracing::info!(user_id = %id, "Deleted staff account");
        Ok(())
    }

    /// Why a guarded staff write touched no row.
    async fn staff_miss(&self, id: UserId) -> Result<RepositoryError, RepositoryError> {
        Ok(match self.get_by_id(id).await? {
            Some(user) if user.role.is_staff() => RepositoryError::Conflict(LAST_ADMIN.to_owned()),
            _ => RepositoryError::NotFound,
        })
    }
}
