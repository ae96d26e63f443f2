//! Pre-submit checks. A failure here means no request is sent.

use thiserror::Error;

use crate::types::PaymentDetails;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Pincode must be 6 digits")]
    InvalidPincode,

    #[error("IFSC must look like ABCD0123456")]
    InvalidIfsc,

    #[error("Rating must be between 1 and 5")]
    InvalidRating(u8),

    #[error("Add a review link or review text")]
    EmptyReview,

    #[error("Select at least one {0}")]
    EmptySelection(&'static str),
}

fn require(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    require(email, "Email")?;
    match email.trim().split_once('@') {
        Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::InvalidEmail),
    }
}

pub fn validate_signup(email: &str, password: &str, confirm: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    require(password, "Password")?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

/// Indian bank IFSC: four letters, a zero, six alphanumerics.
fn is_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4] == b'0'
        && bytes[5..].iter().all(u8::is_ascii_alphanumeric)
}

pub fn validate_payment_details(details: &PaymentDetails) -> Result<(), ValidationError> {
    require(&details.address_line1, "Address line 1")?;
    require(&details.city, "City")?;
    require(&details.state, "State")?;
    require(&details.pincode, "Pincode")?;
    require(&details.bank_account_number, "Bank account number")?;
    require(&details.ifsc, "IFSC")?;

    let pincode = details.pincode.trim();
    if pincode.len() != 6 || !pincode.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::InvalidPincode);
    }
    if !is_ifsc(details.ifsc.trim()) {
        return Err(ValidationError::InvalidIfsc);
    }
    Ok(())
}

/// Applying requires a selection and complete shipping/bank details.
pub fn validate_application(
    product_ids: &[String],
    details: Option<&PaymentDetails>,
) -> Result<(), ValidationError> {
    if product_ids.is_empty() {
        return Err(ValidationError::EmptySelection("product"));
    }
    let details = details.ok_or(ValidationError::MissingField("Shipping and bank details"))?;
    validate_payment_details(details)
}

pub fn validate_review(url: Option<&str>, text: Option<&str>) -> Result<(), ValidationError> {
    let filled = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
    if filled(url) || filled(text) {
        Ok(())
    } else {
        Err(ValidationError::EmptyReview)
    }
}

pub fn validate_feedback(rating: u8, text: &str) -> Result<(), ValidationError> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::InvalidRating(rating));
    }
    require(text, "Feedback")
}
