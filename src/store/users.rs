use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Employee,
    Manager,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "employee" => Ok(Role::Employee),
            "manager" => Ok(Role::Manager),
            other => Err(AppError::Validation(format!("Invalid role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub role: Role,
    pub google_id: Option<String>,
    pub created_at: String,
}

impl User {
    /// Name, then username, then email.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.email)
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password: Option<String>,
    name: Option<String>,
    username: Option<String>,
    role: String,
    google_id: Option<String>,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            email: row.email,
            password: row.password,
            name: row.name,
            username: row.username,
            role: row.role.parse()?,
            google_id: row.google_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct EmployeeSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub password: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
    pub role: Role,
}

/// Identity returned by Google after sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleProfile {
    /// Google's stable subject id
    pub google_id: String,
    pub email: String,
    pub name: Option<String>,
}

const USER_COLUMNS: &str =
    "id, email, password, name, username, role, google_id, created_at";

pub struct UserStore {
    pool: SqlitePool,
    hash_cost: u32,
}

impl UserStore {
    pub fn new(pool: SqlitePool, hash_cost: u32) -> Self {
        Self { pool, hash_cost }
    }

    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let hashed = match &new_user.password {
            Some(password) => Some(bcrypt::hash(password, self.hash_cost)?),
            None => None,
        };

        let result = sqlx::query(
            "INSERT INTO users (email, password, name, role, username)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(new_user.email.trim())
        .bind(hashed)
        .bind(&new_user.name)
        .bind(new_user.role.as_str())
        .bind(&new_user.username)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(user_id = id, role = %new_user.role, "User created");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} vanished after insert", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS))
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE google_id = ?1", USER_COLUMNS))
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Resolves a Google sign-in to an account.
    ///
    /// Looks up the Google id first, then the email. An account found by
    /// email without a Google id gets this one linked. With no match a new
    /// password-less employee is created.
    pub async fn find_or_link_google(&self, profile: &GoogleProfile) -> Result<User> {
        if let Some(user) = self.find_by_google_id(&profile.google_id).await? {
            return Ok(user);
        }

        if let Some(user) = self.find_by_email(&profile.email).await? {
            if user.google_id.is_some() {
                return Ok(user);
            }
            sqlx::query("UPDATE users SET google_id = ?1 WHERE id = ?2")
                .bind(&profile.google_id)
                .bind(user.id)
                .execute(&self.pool)
                .await?;
            tracing::info!(user_id = user.id, "Linked Google account");
            return self
                .find_by_id(user.id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User {} vanished after linking", user.id)));
        }

        let result = sqlx::query(
            "INSERT INTO users (email, name, role, google_id)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(profile.email.trim())
        .bind(&profile.name)
        .bind(Role::Employee.as_str())
        .bind(&profile.google_id)
        .execute(&self.pool)
        .await?;
        let id = result.last_insert_rowid();
        tracing::info!(user_id = id, "User created from Google sign-in");

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} vanished after insert", id)))
    }

    pub async fn list_employees(&self) -> Result<Vec<EmployeeSummary>> {
        let employees = sqlx::query_as::<_, EmployeeSummary>(
            "SELECT id, COALESCE(name, username, email) AS name
             FROM users WHERE role = 'employee' ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    /// Checks a login attempt. Bcrypt hashes are verified; legacy unhashed
    /// passwords are compared directly.
    pub fn verify_password(&self, user: &User, password: &str) -> Result<bool> {
        let Some(stored) = user.password.as_deref() else {
            tracing::info!(user_id = user.id, "User has no password set");
            return Ok(false);
        };

        if is_bcrypt_hash(stored) {
            Ok(bcrypt::verify(password, stored)?)
        } else {
            tracing::warn!(user_id = user.id, "Stored password is not hashed");
            Ok(stored == password)
        }
    }
}

fn is_bcrypt_hash(stored: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| stored.starts_with(prefix))
}
