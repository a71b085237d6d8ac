use async_trait::async_trait;
use chrono::Utc;
use sqlx::{FromRow, PgPool, Row};
use uuid::Uuid;
use validator::Validate;

use super::{map_sqlx_error, StoreError};
use crate::models::employee::{Employee, EmployeeChanges, NewEmployee};

pub const DUPLICATE_EMAIL: &str = "Email already exists";

/// Result of a merge: the stored record and the image path it held before
/// the write.
#[derive(Debug, Clone)]
pub struct UpdatedEmployee {
    pub employee: Employee,
    pub previous_image: Option<String>,
}

/// Persistence for employee records. Every operation works on a single
/// record and is all-or-nothing.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    async fn create(&self, new_employee: NewEmployee) -> Result<Employee, StoreError>;

    /// All employees, oldest first.
    async fn get_all(&self) -> Result<Vec<Employee>, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Employee, StoreError>;

    /// Merges `changes` into the stored record. `created_at` is never touched.
    /// The previous image is read in the same operation as the write.
    async fn update(
        &self,
        id: Uuid,
        changes: EmployeeChanges,
    ) -> Result<UpdatedEmployee, StoreError>;

    /// Removes the record and hands it back.
    async fn delete(&self, id: Uuid) -> Result<Employee, StoreError>;
}

#[derive(Clone)]
pub struct PgEmployeeStore {
    pool: PgPool,
}

impl PgEmployeeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployeeStore for PgEmployeeStore {
    async fn create(&self, new_employee: NewEmployee) -> Result<Employee, StoreError> {
        new_employee.validate()?;

        let now = Utc::now();
        sqlx::query_as::<_, Employee>(
            r#"
            INSERT INTO employees
                (id, name, email, mobile, designation, gender, courses, image, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_employee.name)
        .bind(&new_employee.email)
        .bind(&new_employee.mobile)
        .bind(&new_employee.designation)
        .bind(&new_employee.gender)
        .bind(&new_employee.courses)
        .bind(&new_employee.image)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(err, DUPLICATE_EMAIL))
    }

    async fn get_all(&self) -> Result<Vec<Employee>, StoreError> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Unavailable)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Employee, StoreError> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?
            .ok_or(StoreError::NotFound("Employee"))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: EmployeeChanges,
    ) -> Result<UpdatedEmployee, StoreError> {
        changes.validate()?;

        // The row lock taken in `old` serialises concurrent merges of one
        // record, so each one sees the image the previous writer left.
        let row = sqlx::query(
            r#"
            WITH old AS (
                SELECT id, image FROM employees WHERE id = $1 FOR UPDATE
            )
            UPDATE employees SET
                name = COALESCE($2, employees.name),
                email = COALESCE($3, employees.email),
                mobile = COALESCE($4, employees.mobile),
                designation = COALESCE($5, employees.designation),
                gender = COALESCE($6, employees.gender),
                courses = COALESCE($7, employees.courses),
                image = COALESCE($8, employees.image),
                updated_at = $9
            FROM old
            WHERE employees.id = old.id
            RETURNING employees.*, old.image AS previous_image
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.mobile)
        .bind(&changes.designation)
        .bind(&changes.gender)
        .bind(&changes.courses)
        .bind(&changes.image)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| map_sqlx_error(err, DUPLICATE_EMAIL))?
        .ok_or(StoreError::NotFound("Employee"))?;

        Ok(UpdatedEmployee {
            employee: Employee::from_row(&row).map_err(StoreError::Unavailable)?,
            previous_image: row
                .try_get("previous_image")
                .map_err(StoreError::Unavailable)?,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<Employee, StoreError> {
        sqlx::query_as::<_, Employee>("DELETE FROM employees WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::Unavailable)?
            .ok_or(StoreError::NotFound("Employee"))
    }
}
