use actix_web::{web, HttpRequest, HttpResponse};
use argon2::{password_hash::PasswordHasher, password_hash::SaltString, Argon2, PasswordVerifier};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::JwtSettings;
use crate::db::UserStore;
use crate::errors::AppError;
use crate::models::user::User;
use crate::utils::{jwt, validation::validate_payload};

#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8, max = 32))]
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
}

fn issue_token(user: &User, settings: &JwtSettings) -> Result<String, AppError> {
    jwt::generate_token(user.user_id, settings)
        .map_err(|_| AppError::InternalServerError("Token generation error".to_string()))
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

pub async fn register(
    req: web::Json<Credentials>,
    users: web::Data<dyn UserStore>,
    settings: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&req.0)?;

    let salt = SaltString::generate(&mut rand::thread_rng());
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| AppError::InternalServerError("Hashing error".to_string()))?
        .to_string();

    let user = users.create(&req.email, &password_hash).await?;
    let token = issue_token(&user, &settings)?;
    info!("Registered user {}", user.user_id);

    Ok(HttpResponse::Created().json(AuthResponse {
        email: user.email,
        token,
    }))
}

pub async fn login(
    req: web::Json<Credentials>,
    users: web::Data<dyn UserStore>,
    settings: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    validate_payload(&req.0)?;

    let user = users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let parsed_hash = argon2::PasswordHash::new(&user.password)
        .map_err(|_| AppError::InternalServerError("Invalid password hash".to_string()))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid_credentials())?;

    let token = issue_token(&user, &settings)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        email: user.email,
        token,
    }))
}

pub async fn me(
    req: HttpRequest,
    users: web::Data<dyn UserStore>,
    settings: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|auth| auth.to_str().ok())
        .and_then(jwt::bearer_token)
        .ok_or_else(|| AppError::Unauthorized("Missing token".to_string()))?;

    let claims = jwt::validate_token(token, &settings)
        .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user ID in token".to_string()))?;

    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found or unauthorized".to_string()))?;

    Ok(HttpResponse::Ok().json(ProfileResponse {
        id: user.user_id,
        email: user.email,
    }))
}
