use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use super::{
    password, token,
    repo_types::{NewUser, User, UserChanges},
};
use crate::{
    db::{Store, StoreError},
    error::{ApiError, ApiResult, FieldErrors, NON_FIELD_ERRORS},
};

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_NULL: &str = "This field may not be null.";
pub const MSG_BAD_EMAIL: &str = "Enter a valid email address.";
pub const MSG_EMAIL_TAKEN: &str = "user with this email already exists.";
pub const MSG_BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";
pub const NAME_MAX_LEN: usize = 255;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and lower-cases the domain part; the local part is kept as typed.
pub fn normalize_email(raw: &str) -> String {
    let raw = raw.trim();
    match raw.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => raw.to_string(),
    }
}

pub fn min_length_message(min: usize) -> String {
    format!("Ensure this field has at least {min} characters.")
}

/// Required, non-blank text. Returns the trimmed value when present.
pub(crate) fn required_text<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value.map(str::trim) {
        None => {
            errors.add(field, MSG_REQUIRED);
            None
        }
        Some("") => {
            errors.add(field, MSG_BLANK);
            None
        }
        Some(v) => Some(v),
    }
}

pub(crate) fn check_name(errors: &mut FieldErrors, field: &str, name: &str) {
    if name.chars().count() > NAME_MAX_LEN {
        errors.add(field, format!("Ensure this field has no more than {NAME_MAX_LEN} characters."));
    }
}

pub(crate) fn check_email(errors: &mut FieldErrors, email: &str) -> Option<String> {
    let email = normalize_email(email);
    if is_valid_email(&email) {
        Some(email)
    } else {
        errors.add("email", MSG_BAD_EMAIL);
        None
    }
}

fn check_password(errors: &mut FieldErrors, field: &str, password: &str, min: usize) {
    if password.chars().count() < min {
        errors.add(field, min_length_message(min));
    }
}

/// A new password: present, not whitespace only, long enough. Never trimmed.
fn new_password<'a>(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&'a str>,
    min: usize,
) -> Option<&'a str> {
    match value {
        None => {
            errors.add(field, MSG_REQUIRED);
            None
        }
        Some(p) if p.trim().is_empty() => {
            errors.add(field, MSG_BLANK);
            None
        }
        Some(p) => {
            check_password(errors, field, p, min);
            Some(p)
        }
    }
}

/// Fields accepted when an account is created, before validation.
#[derive(Debug, Default)]
pub struct AccountInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub is_staff: bool,
}

/// An account that passed validation and can be stored.
#[derive(Debug)]
pub struct ValidAccount {
    email: String,
    password: String,
    name: String,
    is_staff: bool,
}

/// Adds every problem with `input` to `errors`. Returns the account only when
/// `input` itself contributed no errors.
pub async fn check_account(
    store: &dyn Store,
    min_password: usize,
    input: AccountInput,
    require_name: bool,
    errors: &mut FieldErrors,
) -> ApiResult<Option<ValidAccount>> {
    let mut own = FieldErrors::new();

    let email = required_text(&mut own, "email", input.email.as_deref())
        .and_then(|e| check_email(&mut own, e));
    let password =
        new_password(&mut own, "password", input.password.as_deref(), min_password).map(str::to_string);

    let name = if require_name {
        required_text(&mut own, "name", input.name.as_deref()).map(str::to_string)
    } else {
        Some(input.name.as_deref().map(str::trim).unwrap_or_default().to_string())
    };
    if let Some(name) = &name {
        check_name(&mut own, "name", name);
    }

    if let Some(email) = &email {
        if store.find_user_by_email(email).await?.is_some() {
            own.add("email", MSG_EMAIL_TAKEN);
        }
    }

    let valid = match (email, password, name) {
        (Some(email), Some(password), Some(name)) if own.is_empty() => Some(ValidAccount {
            email,
            password,
            name,
            is_staff: input.is_staff,
        }),
        _ => None,
    };
    errors.merge(own);
    Ok(valid)
}

/// Hashes the password and stores the account.
pub async fn insert_account(store: &dyn Store, account: ValidAccount) -> ApiResult<User> {
    let password_hash = password::hash(&account.password)?;
    let user = store
        .insert_user(NewUser {
            email: account.email,
            name: account.name,
            password_hash,
            is_staff: account.is_staff,
        })
        .await
        .map_err(email_conflict)?;

    info!(user_id = %user.id, is_staff = user.is_staff, "user created");
    Ok(user)
}

/// Validates and stores a new account. All field problems are reported together.
pub async fn create_account(
    store: &dyn Store,
    min_password: usize,
    input: AccountInput,
    require_name: bool,
) -> ApiResult<User> {
    let mut errors = FieldErrors::new();
    let valid = check_account(store, min_password, input, require_name, &mut errors).await?;
    match valid {
        Some(account) if errors.is_empty() => insert_account(store, account).await,
        _ => {
            warn!(fields = ?errors, "account rejected");
            Err(ApiError::Validation(errors))
        }
    }
}

pub(crate) fn email_conflict(e: StoreError) -> ApiError {
    match e {
        StoreError::Conflict("email") => {
            ApiError::Validation(FieldErrors::single("email", MSG_EMAIL_TAKEN))
        }
        other => other.into(),
    }
}

/// Checks credentials and returns the caller's token, creating it on first login.
pub async fn obtain_token(
    store: &dyn Store,
    email: Option<&str>,
    password: Option<&str>,
) -> ApiResult<String> {
    let mut errors = FieldErrors::new();
    let email = required_text(&mut errors, "email", email);
    let password = match password {
        None => {
            errors.add("password", MSG_REQUIRED);
            None
        }
        Some("") => {
            errors.add("password", MSG_BLANK);
            None
        }
        Some(p) => Some(p),
    };
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::Validation(errors));
    };

    let email = normalize_email(email);
    let user = match store.find_user_by_email(&email).await? {
        Some(user) if password::verify(password, &user.password_hash) && user.is_active => user,
        Some(user) => {
            warn!(user_id = %user.id, "login rejected");
            return Err(bad_credentials());
        }
        None => {
            password::verify_dummy(password);
            warn!("login rejected for unknown email");
            return Err(bad_credentials());
        }
    };

    let key = store
        .get_or_create_token(user.id, &token::generate_key())
        .await?;
    store
        .touch_last_login(user.id, OffsetDateTime::now_utc())
        .await?;

    info!(user_id = %user.id, "token issued");
    Ok(key)
}

fn bad_credentials() -> ApiError {
    ApiError::Validation(FieldErrors::single(NON_FIELD_ERRORS, MSG_BAD_CREDENTIALS))
}

/// Resolves a presented token key to an active user.
pub async fn authenticate(store: &dyn Store, key: &str) -> ApiResult<User> {
    match store.find_user_by_token(key).await? {
        Some(user) if user.is_active => Ok(user),
        Some(_) => Err(ApiError::Unauthorized("User inactive or deleted.")),
        None => Err(ApiError::Unauthorized("Invalid token.")),
    }
}

/// Self-service profile edit. Absent fields stay as they are.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

pub async fn update_profile(
    store: &dyn Store,
    min_password: usize,
    user: &User,
    input: ProfileInput,
) -> ApiResult<User> {
    let mut errors = FieldErrors::new();
    let mut changes = UserChanges::default();

    if let Some(raw) = input.email.as_deref() {
        if let Some(email) = required_text(&mut errors, "email", Some(raw))
            .and_then(|e| check_email(&mut errors, e))
        {
            if email != user.email && store.find_user_by_email(&email).await?.is_some() {
                errors.add("email", MSG_EMAIL_TAKEN);
            }
            changes.email = Some(email);
        }
    }
    if let Some(raw) = input.name.as_deref() {
        if let Some(name) = required_text(&mut errors, "name", Some(raw)) {
            check_name(&mut errors, "name", name);
            changes.name = Some(name.to_string());
        }
    }
    if input.password.is_some() {
        new_password(&mut errors, "password", input.password.as_deref(), min_password);
    }
    errors.into_result()?;

    if let Some(p) = input.password.as_deref() {
        changes.password_hash = Some(password::hash(p)?);
    }
    if changes.is_empty() {
        return Ok(user.clone());
    }

    let updated = store
        .update_user(user.id, changes)
        .await
        .map_err(email_conflict)?
        .ok_or(ApiError::NotFound)?;
    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}
