//! In-process stores used by the HTTP tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::employee::DUPLICATE_EMAIL;
use super::user::DUPLICATE_USER_EMAIL;
use super::{EmployeeStore, StoreError, UpdatedEmployee, UserStore};
use crate::models::employee::{Employee, EmployeeChanges, NewEmployee};
use crate::models::user::User;

#[derive(Default)]
pub struct MemoryEmployeeStore {
    employees: Mutex<Vec<Employee>>,
}

fn email_taken(employees: &[Employee], email: &str, except: Option<Uuid>) -> bool {
    employees
        .iter()
        .any(|e| Some(e.id) != except && e.email.eq_ignore_ascii_case(email))
}

#[async_trait]
impl EmployeeStore for MemoryEmployeeStore {
    async fn create(&self, new_employee: NewEmployee) -> Result<Employee, StoreError> {
        new_employee.validate()?;

        let mut employees = self.employees.lock().unwrap();
        if email_taken(&employees, &new_employee.email, None) {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            name: new_employee.name,
            email: new_employee.email,
            mobile: new_employee.mobile,
            designation: new_employee.designation,
            gender: new_employee.gender,
            courses: new_employee.courses,
            image: new_employee.image,
            created_at: now,
            updated_at: now,
        };
        employees.push(employee.clone());
        Ok(employee)
    }

    async fn get_all(&self) -> Result<Vec<Employee>, StoreError> {
        Ok(self.employees.lock().unwrap().clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Employee, StoreError> {
        self.employees
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(StoreError::NotFound("Employee"))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: EmployeeChanges,
    ) -> Result<UpdatedEmployee, StoreError> {
        changes.validate()?;

        let mut employees = self.employees.lock().unwrap();
        let index = employees
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound("Employee"))?;
        if let Some(email) = &changes.email {
            if email_taken(&employees, email, Some(id)) {
                return Err(StoreError::Conflict(DUPLICATE_EMAIL.to_string()));
            }
        }

        let employee = &mut employees[index];
        let previous_image = employee.image.clone();

        if let Some(name) = changes.name {
            employee.name = name;
        }
        if let Some(email) = changes.email {
            employee.email = email;
        }
        if let Some(mobile) = changes.mobile {
            employee.mobile = mobile;
        }
        if let Some(designation) = changes.designation {
            employee.designation = designation;
        }
        if let Some(gender) = changes.gender {
            employee.gender = gender;
        }
        if let Some(courses) = changes.courses {
            employee.courses = courses;
        }
        if let Some(image) = changes.image {
            employee.image = Some(image);
        }
        employee.updated_at = Utc::now();

        Ok(UpdatedEmployee {
            employee: employee.clone(),
            previous_image,
        })
    }

    async fn delete(&self, id: Uuid) -> Result<Employee, StoreError> {
        let mut employees = self.employees.lock().unwrap();
        let index = employees
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound("Employee"))?;
        Ok(employees.remove(index))
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(StoreError::Conflict(DUPLICATE_USER_EMAIL.to_string()));
        }

        let now = Utc::now();
        let user = User {
            user_id: Uuid::new_v4(),
            email: email.to_string(),
            password: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ann() -> NewEmployee {
        NewEmployee {
            name: "Ann".into(),
            email: "ann@x.com".into(),
            mobile: "555".into(),
            designation: "Eng".into(),
            gender: "F".into(),
            courses: vec!["CS101".into()],
            image: None,
        }
    }

    #[actix_web::test]
    async fn created_record_is_retrievable() {
        let store = MemoryEmployeeStore::default();
        let created = store.create(ann()).await.unwrap();
        assert_eq!(store.get_by_id(created.id).await.unwrap(), created);
    }

    #[actix_web::test]
    async fn invalid_record_is_not_persisted() {
        let store = MemoryEmployeeStore::default();
        let mut bad = ann();
        bad.email = "nope".into();

        assert!(matches!(store.create(bad).await, Err(StoreError::Validation(_))));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn partial_update_keeps_other_fields_and_created_at() {
        let store = MemoryEmployeeStore::default();
        let created = store.create(ann()).await.unwrap();

        let updated = store
            .update(
                created.id,
                EmployeeChanges {
                    designation: Some("SrEng".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .employee;

        assert_eq!(updated.designation, "SrEng");
        assert_eq!(updated.name, created.name);
        assert_eq!(updated.courses, created.courses);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[actix_web::test]
    async fn deleted_record_is_gone() {
        let store = MemoryEmployeeStore::default();
        let created = store.create(ann()).await.unwrap();

        store.delete(created.id).await.unwrap();
        assert!(matches!(
            store.get_by_id(created.id).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(created.id).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn duplicate_email_conflicts_case_insensitively() {
        let store = MemoryEmployeeStore::default();
        store.create(ann()).await.unwrap();

        let mut twin = ann();
        twin.email = "ANN@x.com".into();
        assert!(matches!(store.create(twin).await, Err(StoreError::Conflict(_))));
    }

    #[actix_web::test]
    async fn update_of_unknown_id_is_not_found_even_with_taken_email() {
        let store = MemoryEmployeeStore::default();
        store.create(ann()).await.unwrap();

        let changes = EmployeeChanges {
            email: Some("ANN@x.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(Uuid::new_v4(), changes).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn update_reports_the_image_it_replaced() {
        let store = MemoryEmployeeStore::default();
        let mut with_image = ann();
        with_image.image = Some("uploads/a.png".into());
        let created = store.create(with_image).await.unwrap();

        let replaced = store
            .update(
                created.id,
                EmployeeChanges {
                    image: Some("uploads/b.png".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(replaced.previous_image.as_deref(), Some("uploads/a.png"));
        assert_eq!(replaced.employee.image.as_deref(), Some("uploads/b.png"));

        let kept = store
            .update(created.id, EmployeeChanges::default())
            .await
            .unwrap();
        assert_eq!(kept.previous_image.as_deref(), Some("uploads/b.png"));
        assert_eq!(kept.employee.image, kept.previous_image);
    }
}
