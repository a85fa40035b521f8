//! Client-side form validation for login, signup and checkout.
//!
//! Validation runs before any request is sent. Checkout card details are
//! checked for shape only and are never transmitted.

use secrecy::{ExposeSecret, SecretString};
use shopfront_core::{Email, EmailError};
use thiserror::Error;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("Please fill all fields")]
    MissingFields,

    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error(transparent)]
    InvalidEmail(#[from] EmailError),

    #[error("{field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

// =============================================================================
// Login / Signup
// =============================================================================

#[derive(Debug)]
pub struct LoginForm {
    pub username: String,
    pub password: SecretString,
}

impl LoginForm {
    /// # Errors
    ///
    /// `FormError::MissingFields` if either field is empty.
    pub fn validate(&self) -> Result<(), FormError> {
        if blank(&self.username) || self.password.expose_secret().is_empty() {
            return Err(FormError::MissingFields);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: SecretString,
}

impl SignupForm {
    /// Check the form and return the normalized email.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<Email, FormError> {
        if blank(&self.username) {
            return Err(FormError::Required { field: "Username" });
        }
        let email = Email::parse(&self.email)?;
        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(FormError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(email)
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Shipping and payment details collected at checkout.
#[derive(Debug)]
pub struct CheckoutForm {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    pub card_number: SecretString,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: SecretString,
}

/// The non-secret part of a validated checkout form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingDetails {
    pub name: String,
    pub email: Email,
    pub address: String,
    pub city: String,
    pub zip_code: String,
    /// Last four digits, for the confirmation screen.
    pub card_last4: String,
}

impl CheckoutForm {
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<ShippingDetails, FormError> {
        let required = [
            ("Full name", self.name.as_str()),
            ("Email", self.email.as_str()),
            ("Address", self.address.as_str()),
            ("City", self.city.as_str()),
            ("ZIP code", self.zip_code.as_str()),
            ("Card number", self.card_number.expose_secret()),
            ("Expiry date", self.expiry.as_str()),
            ("CVV", self.cvv.expose_secret()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| blank(v)) {
            return Err(FormError::Required { field });
        }

        let email = Email::parse(&self.email)?;

        let digits: String = self
            .card_number
            .expose_secret()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-'))
            .collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) || !(12..=19).contains(&digits.len()) {
            return Err(FormError::Invalid {
                field: "Card number",
                reason: "must be 12 to 19 digits",
            });
        }

        validate_expiry(&self.expiry)?;

        let cvv = self.cvv.expose_secret().trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
            return Err(FormError::Invalid {
                field: "CVV",
                reason: "must be 3 or 4 digits",
            });
        }

        Ok(ShippingDetails {
            name: self.name.trim().to_string(),
            email,
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            zip_code: self.zip_code.trim().to_string(),
            card_last4: digits.chars().skip(digits.len() - 4).collect(),
        })
    }
}

fn validate_expiry(raw: &str) -> Result<(), FormError> {
    const BAD: FormError = FormError::Invalid {
        field: "Expiry date",
        reason: "must be MM/YY",
    };
    let Some((month, year)) = raw.trim().split_once('/') else {
        return Err(BAD);
    };
    let (month, year) = (month.trim(), year.trim());
    if month.len() != 2 || year.len() != 2 {
        return Err(BAD);
    }
    match (month.parse::<u8>(), year.parse::<u8>()) {
        (Ok(1..=12), Ok(_)) => Ok(()),
        _ => Err(BAD),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn checkout() -> CheckoutForm {
        CheckoutForm {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            address: "12 Analytical Row".into(),
            city: "London".into(),
            zip_code: "560001".into(),
            card_number: SecretString::from("4111 1111 1111 1111"),
            expiry: "09/27".into(),
            cvv: SecretString::from("123"),
        }
    }

    #[test]
    fn test_login_requires_both_fields() {
        let form = LoginForm {
            username: "ada".into(),
            password: SecretString::from(""),
        };
        assert_eq!(form.validate(), Err(FormError::MissingFields));
        assert_eq!(FormError::MissingFields.to_string(), "Please fill all fields");
    }

    #[test]
    fn test_signup_password_length() {
        let form = SignupForm {
            username: "ada".into(),
            email: "ada@example.com".into(),
            password: SecretString::from("short"),
        };
        let err = form.validate().unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters long");
    }

    #[test]
    fn test_signup_checks_email() {
        let form = SignupForm {
            username: "ada".into(),
            email: "ada-at-example".into(),
            password: SecretString::from("long enough"),
        };
        assert!(matches!(form.validate(), Err(FormError::InvalidEmail(_))));
    }

    #[test]
    fn test_checkout_valid() {
        let details = checkout().validate().unwrap();
        assert_eq!(details.card_last4, "1111");
        assert_eq!(details.city, "London");
    }

    #[test]
    fn test_checkout_reports_first_missing_field() {
        let mut form = checkout();
        form.city = "  ".into();
        assert_eq!(form.validate(), Err(FormError::Required { field: "City" }));
    }

    #[test]
    fn test_checkout_card_rules() {
        let mut form = checkout();
        form.card_number = SecretString::from("4111-abcd");
        assert!(matches!(form.validate(), Err(FormError::Invalid { field: "Card number", .. })));

        let mut form = checkout();
        form.expiry = "13/27".into();
        assert!(matches!(form.validate(), Err(FormError::Invalid { field: "Expiry date", .. })));

        let mut form = checkout();
        form.cvv = SecretString::from("12");
        assert!(matches!(form.validate(), Err(FormError::Invalid { field: "CVV", .. })));
    }
}
