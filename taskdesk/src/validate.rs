//! Local form validation.
//!
//! Every check here runs before any request is built; a failing form never
//! reaches the network. Errors are keyed by [`Field`] so a front end can
//! show each message next to its input.

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use taskdesk_proto::task::TaskBody;

/// Image MIME types accepted for avatars.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Special characters a password may (and must) contain.
const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// A form input that can carry a validation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Task title.
    Title,
    /// Login identifier (email, phone or username).
    Identifier,
    /// Password.
    Password,
    /// Password confirmation.
    ConfirmPassword,
    /// Display name.
    Name,
    /// Login handle.
    Username,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Avatar upload.
    ProfileImage,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Identifier => "identifier",
            Self::Password => "password",
            Self::ConfirmPassword => "confirm_password",
            Self::Name => "name",
            Self::Username => "username",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::ProfileImage => "profile_image",
        };
        f.write_str(name)
    }
}

/// Per-field validation messages for one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Records a message for a field, replacing any previous one.
    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Drops the message for a field, as when the user edits that input.
    pub fn clear_field(&mut self, field: Field) {
        self.0.remove(&field);
    }

    /// The message for a field, if any.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    /// Whether the form passed validation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates failing fields in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    /// `Ok(value)` when no field failed, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns the collected errors if any field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Validates a task form and builds the request body.
///
/// The title must contain something other than whitespace; a blank
/// description is sent as absent.
///
/// # Errors
///
/// Returns a [`Field::Title`] error for an empty title.
pub fn task_body(title: &str, description: &str) -> Result<TaskBody, FieldErrors> {
    let mut errors = FieldErrors::new();
    let title = title.trim();
    if title.is_empty() {
        errors.insert(Field::Title, "Title is required!");
    }
    let description = description.trim();
    errors.into_result(TaskBody {
        title: title.to_string(),
        description: (!description.is_empty()).then(|| description.to_string()),
    })
}

/// Email on one of the accepted providers, not starting with `.` or `-`.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    !value.starts_with(['.', '-'])
        && matches(r"^[a-zA-Z0-9.-]+@(gmail|yahoo|hotmail)\.com$", value)
}

/// Exactly ten ASCII digits.
#[must_use]
pub fn is_valid_phone(value: &str) -> bool {
    value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
}

/// 3–20 letters, digits or underscores.
#[must_use]
pub fn is_valid_username(value: &str) -> bool {
    matches(r"^[a-zA-Z0-9_]{3,20}$", value)
}

/// Checks a display name, returning the message to show when it fails.
#[must_use]
pub fn name_problem(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("Name field is required!");
    }
    let len = trimmed.chars().count();
    if !(3..=20).contains(&len) {
        return Some("Name must be between 3 and 20 characters long!");
    }
    if !matches(r"^[a-zA-Z\s'-]+$", trimmed) {
        return Some("Name can only contain letters, spaces, apostrophes, or hyphens!");
    }
    None
}

/// At least eight characters drawn from letters, digits and `@$!%*?&`,
/// with at least one lowercase, uppercase, digit and special character.
#[must_use]
pub fn is_strong_password(value: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c);
    value.chars().count() >= 8
        && value.chars().all(allowed)
        && value.chars().any(|c| c.is_ascii_lowercase())
        && value.chars().any(|c| c.is_ascii_uppercase())
        && value.chars().any(|c| c.is_ascii_digit())
        && value.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// Whether an avatar MIME type is accepted.
#[must_use]
pub fn is_allowed_image_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type.to_ascii_lowercase().as_str())
}

fn matches(pattern: &str, value: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(value),
        Err(e) => {
            tracing::error!(error = %e, pattern, "validation pattern failed to compile");
            false
        }
    }
}
