use super::contracts::{ConfirmEmailRequest, LoginRequest, RegisterRequest};

const MAX_NAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 8;

/// Structural email check: `local@domain.tld`, no whitespace, one `@`.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn check_email(email: &str, errors: &mut Vec<String>) {
    if email.trim().is_empty() {
        errors.push("Email is required.".to_string());
    } else if !is_valid_email(email) {
        errors.push("A valid email address is required.".to_string());
    }
}

fn check_name(value: &str, label: &str, errors: &mut Vec<String>) {
    let value = value.trim();
    if value.is_empty() {
        errors.push(format!("{label} is required."));
    } else if value.chars().count() > MAX_NAME_LEN {
        errors.push(format!("{label} cannot exceed {MAX_NAME_LEN} characters."));
    }
}

pub(super) fn register(req: &RegisterRequest) -> Vec<String> {
    let mut errors = Vec::new();
    check_name(&req.first_name, "First name", &mut errors);
    check_name(&req.last_name, "Last name", &mut errors);
    check_email(&req.email, &mut errors);

    let password = req.password.as_str();
    if password.is_empty() {
        errors.push("Password is required.".to_string());
    } else {
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long."
            ));
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one digit.".to_string());
        }
        if !password.chars().any(char::is_uppercase) {
            errors.push("Password must contain at least one uppercase letter.".to_string());
        }
        if !password.chars().any(char::is_lowercase) {
            errors.push("Password must contain at least one lowercase letter.".to_string());
        }
    }
    errors
}

pub(super) fn login(req: &LoginRequest) -> Vec<String> {
    let mut errors = Vec::new();
    check_email(&req.email, &mut errors);
    if req.password.is_empty() {
        errors.push("Password is required.".to_string());
    }
    errors
}

pub(super) fn confirm_email(req: &ConfirmEmailRequest) -> Vec<String> {
    let mut errors = Vec::new();
    if req.user_id.trim().is_empty() {
        errors.push("User ID is required.".to_string());
    }
    if req.code.trim().is_empty() {
        errors.push("Confirmation code is required.".to_string());
    }
    errors
}
