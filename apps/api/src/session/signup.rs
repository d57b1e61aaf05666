use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::access::can_self_register;
use crate::auth_client::{AuthError, AuthProvider, AuthSession};
use crate::errors::AppError;
use crate::models::profile::{ProfileRow, UserRole};
use crate::store::{NewAlumniProfile, NewProfile, NewStudentProfile, PortalStore, RoleDetails};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_GRADUATION_YEAR: i32 = 1950;
const MAX_GRADUATION_YEAR: i32 = 2100;

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    // Student
    pub enrollment_number: Option<String>,
    pub semester: Option<i32>,
    // Student and alumni
    pub department: Option<String>,
    // Alumni
    pub graduation_year: Option<i32>,
    pub current_company: Option<String>,
    pub current_position: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub profile: ProfileRow,
    pub session: Option<AuthSession>,
    pub email_confirmation_required: bool,
}

/// Sign-up input after validation, ready to be written.
#[derive(Debug, Clone)]
pub struct ValidatedSignUp {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub phone: Option<String>,
    pub details: RoleDetails,
}

fn role_not_allowed(role: UserRole) -> AppError {
    AppError::Forbidden(format!("Cannot sign up with role '{role}'"))
}

fn required(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn required_opt(value: Option<&String>, field: &str) -> Result<String, AppError> {
    required(value.map(String::as_str).unwrap_or(""), field)
}

fn optional(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Checks every field before anything is sent to the auth service.
pub fn validate_sign_up(request: &SignUpRequest) -> Result<ValidatedSignUp, AppError> {
    let email = required(&request.email, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(AppError::Validation("email is not valid".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let first_name = required(&request.first_name, "first_name")?;
    let last_name = required(&request.last_name, "last_name")?;

    if !can_self_register(request.role) {
        return Err(role_not_allowed(request.role));
    }

    let department = required_opt(request.department.as_ref(), "department")?;
    let details = match request.role {
        UserRole::Student => {
            let semester = request
                .semester
                .ok_or_else(|| AppError::Validation("semester is required".to_string()))?;
            if !(1..=12).contains(&semester) {
                return Err(AppError::Validation(
                    "semester must be between 1 and 12".to_string(),
                ));
            }
            RoleDetails::Student(NewStudentProfile {
                enrollment_number: required_opt(
                    request.enrollment_number.as_ref(),
                    "enrollment_number",
                )?,
                department,
                semester,
            })
        }
        UserRole::Alumni => {
            let graduation_year = request
                .graduation_year
                .ok_or_else(|| AppError::Validation("graduation_year is required".to_string()))?;
            if !(MIN_GRADUATION_YEAR..=MAX_GRADUATION_YEAR).contains(&graduation_year) {
                return Err(AppError::Validation(format!(
                    "graduation_year must be between {MIN_GRADUATION_YEAR} and {MAX_GRADUATION_YEAR}"
                )));
            }
            RoleDetails::Alumni(NewAlumniProfile {
                graduation_year,
                department,
                current_company: optional(request.current_company.as_ref()),
                current_position: optional(request.current_position.as_ref()),
            })
        }
        UserRole::Admin => return Err(role_not_allowed(request.role)),
    };

    Ok(ValidatedSignUp {
        email,
        first_name,
        last_name,
        role: request.role,
        phone: optional(request.phone.as_ref()),
        details,
    })
}

/// Creates the auth account, then the profile and role rows in one
/// transaction. If the profile write fails the auth account is deleted again.
pub async fn sign_up(
    auth: &dyn AuthProvider,
    store: &dyn PortalStore,
    request: &SignUpRequest,
) -> Result<SignUpResponse, AppError> {
    let validated = validate_sign_up(request)?;

    let metadata = json!({
        "first_name": validated.first_name,
        "last_name": validated.last_name,
        "role": validated.role,
    });
    let account = auth
        .sign_up(&validated.email, &request.password, &metadata)
        .await?;
    let user_id = account.user.id;

    let new_profile = NewProfile {
        user_id,
        email: validated.email.clone(),
        first_name: validated.first_name.clone(),
        last_name: validated.last_name.clone(),
        role: validated.role,
        phone: validated.phone.clone(),
    };

    let profile = match store
        .create_account_profile(&new_profile, &validated.details)
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            error!("Profile setup failed for auth user {user_id}: {e}");
            match auth.delete_user(user_id).await {
                Ok(()) => info!("Rolled back auth user {user_id} after failed profile setup"),
                Err(AuthError::AdminKeyMissing) => warn!(
                    "Auth user {user_id} left without a profile: no service role key to roll back"
                ),
                Err(cleanup) => error!("Failed to roll back auth user {user_id}: {cleanup}"),
            }
            return Err(e);
        }
    };

    info!(
        "Signed up {} ({}) as {}",
        profile.display_name(),
        profile.id,
        profile.role
    );
    Ok(SignUpResponse {
        email_confirmation_required: account.session.is_none(),
        profile,
        session: account.session,
    })
}
