use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use serde_json::json;
use uuid::Uuid;

use crate::db::{EmployeeStore, UpdatedEmployee};
use crate::errors::AppError;
use crate::handlers::payload::decode_employee;
use crate::models::employee::{Employee, EmployeeChanges};
use crate::utils::upload::UploadStore;
use crate::utils::validation::validate_payload;

fn parse_employee_id(raw: &str) -> Result<Uuid, AppError> {
    // A malformed id can never match a record.
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Employee not found".to_string()))
}

pub async fn create_employee(
    req: HttpRequest,
    payload: web::Payload,
    store: web::Data<dyn EmployeeStore>,
    uploads: web::Data<UploadStore>,
) -> Result<HttpResponse, AppError> {
    let changes = decode_employee(&req, payload, &uploads).await?;
    let image = changes.image.clone();

    match insert(&**store, changes).await {
        Ok(employee) => {
            info!("Created employee {}", employee.id);
            Ok(HttpResponse::Created().json(employee))
        }
        Err(err) => {
            if let Some(image) = image {
                uploads.remove(&image).await;
            }
            Err(err)
        }
    }
}

async fn insert(store: &dyn EmployeeStore, changes: EmployeeChanges) -> Result<Employee, AppError> {
    let new_employee = changes.into_new_employee().map_err(|missing| {
        AppError::BadRequest(format!(
            "All fields are required, missing: {}",
            missing.join(", ")
        ))
    })?;
    validate_payload(&new_employee)?;
    Ok(store.create(new_employee).await?)
}

pub async fn get_employees(
    store: web::Data<dyn EmployeeStore>,
) -> Result<HttpResponse, AppError> {
    let employees = store.get_all().await?;
    Ok(HttpResponse::Ok().json(employees))
}

pub async fn get_employee(
    store: web::Data<dyn EmployeeStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let employee_id = parse_employee_id(&employee_id)?;
    let employee = store.get_by_id(employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

pub async fn update_employee(
    req: HttpRequest,
    payload: web::Payload,
    store: web::Data<dyn EmployeeStore>,
    uploads: web::Data<UploadStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let employee_id = parse_employee_id(&employee_id)?;
    let changes = decode_employee(&req, payload, &uploads).await?;
    let new_image = changes.image.clone();

    match merge(&**store, employee_id, changes).await {
        Ok(UpdatedEmployee {
            employee,
            previous_image,
        }) => {
            // Only an uploaded image replaces the stored one.
            if new_image.is_some() {
                if let Some(previous) = previous_image.filter(|p| Some(p) != new_image.as_ref()) {
                    uploads.remove(&previous).await;
                }
            }
            Ok(HttpResponse::Ok().json(employee))
        }
        Err(err) => {
            if let Some(image) = new_image {
                uploads.remove(&image).await;
            }
            Err(err)
        }
    }
}

async fn merge(
    store: &dyn EmployeeStore,
    employee_id: Uuid,
    changes: EmployeeChanges,
) -> Result<UpdatedEmployee, AppError> {
    validate_payload(&changes)?;
    Ok(store.update(employee_id, changes).await?)
}

pub async fn delete_employee(
    store: web::Data<dyn EmployeeStore>,
    uploads: web::Data<UploadStore>,
    employee_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let employee_id = parse_employee_id(&employee_id)?;
    let removed = store.delete(employee_id).await?;

    if let Some(image) = removed.image {
        uploads.remove(&image).await;
    }
    info!("Deleted employee {}", employee_id);

    Ok(HttpResponse::Ok().json(json!({
        "message": "Employee deleted successfully",
    })))
}
