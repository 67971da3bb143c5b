//! Validation utilities for the Municipal Weather Monitoring service

use crate::types::GpsCoordinates;

// ============================================================================
// Account Validations
// ============================================================================

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err("Invalid email format");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Invalid email format");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err("Password must be at least 8 characters");
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err("Password cannot be entirely numeric");
    }
    Ok(())
}

/// Validate that the password confirmation matches
pub fn validate_passwords_match(password: &str, confirmation: &str) -> Result<(), &'static str> {
    if password != confirmation {
        return Err("Passwords didn't match.");
    }
    Ok(())
}

/// Validate the optional sex field
pub fn validate_sex(sex: Option<&str>) -> Result<(), &'static str> {
    match sex {
        None | Some("male") | Some("female") => Ok(()),
        Some(_) => Err("Sex must be either 'male' or 'female'"),
    }
}

/// Validate a contact number: digits with optional `+`, spaces and dashes
pub fn validate_contact_number(contact: &str) -> Result<(), &'static str> {
    let digits = contact.chars().filter(|c| c.is_ascii_digit()).count();
    if !contact
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' '))
    {
        return Err("Contact number may only contain digits, '+', '-' and spaces");
    }
    if !(7..=15).contains(&digits) || contact.len() > 20 {
        return Err("Contact number must contain 7 to 15 digits");
    }
    Ok(())
}

// ============================================================================
// Geographic Validations
// ============================================================================

/// Validate latitude/longitude ranges
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), &'static str> {
    if !latitude.is_finite() || !longitude.is_finite() {
        return Err("Coordinates must be finite numbers");
    }
    if !GpsCoordinates::new(latitude, longitude).is_valid() {
        return Err("Latitude must be within [-90, 90] and longitude within [-180, 180]");
    }
    Ok(())
}
