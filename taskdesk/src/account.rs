//! Sign-up, login, logout and profile management.
//!
//! Session-establishing and session-ending operations here are the only
//! writers of the credential store.

use std::sync::Arc;

use taskdesk_proto::user::{LoginRequest, User};

use crate::backend::{Backend, ImageUpload, ProfileUpdate, SignupRequest};
use crate::error::ClientError;
use crate::session::store::{CredentialStore, Credentials};
use crate::validate::{self, Field, FieldErrors};

/// Login form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Email, ten-digit phone number or username.
    pub identifier: String,
    /// Password, sent as typed.
    pub password: String,
}

impl LoginForm {
    /// Validates the form and builds the login body.
    ///
    /// # Errors
    ///
    /// Returns per-field messages for a missing or malformed identifier and
    /// a missing password.
    pub fn validate(&self) -> Result<LoginRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        let identifier = self.identifier.trim();
        if identifier.is_empty() {
            errors.insert(Field::Identifier, "Email or phone no. is required!");
        } else if !(validate::is_valid_email(identifier)
            || validate::is_valid_phone(identifier)
            || validate::is_valid_username(identifier))
        {
            errors.insert(
                Field::Identifier,
                "Enter a valid email, phone number, or username.",
            );
        }
        if self.password.is_empty() {
            errors.insert(Field::Password, "Password is required!");
        }
        errors.into_result(LoginRequest {
            identifier: identifier.to_string(),
            password: self.password.clone(),
        })
    }
}

/// Registration form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    /// Display name.
    pub name: String,
    /// Login handle.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Phone number.
    pub phone: String,
    /// Password.
    pub password: String,
    /// Password typed again.
    pub confirm_password: String,
    /// Avatar image; required.
    pub profile_image: Option<ImageUpload>,
}

impl SignupForm {
    /// Validates every field and builds the multipart request.
    ///
    /// # Errors
    ///
    /// Returns one message per invalid field.
    pub fn validate(&self) -> Result<SignupRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(problem) = validate::name_problem(&self.name) {
            errors.insert(Field::Name, problem);
        }

        let username = self.username.trim();
        if username.is_empty() {
            errors.insert(Field::Username, "Username is required!");
        } else if !validate::is_valid_username(username) {
            errors.insert(
                Field::Username,
                "Username must be 3-20 characters and only contain letters, numbers, or underscores.",
            );
        }

        let email = self.email.trim();
        if email.is_empty() {
            errors.insert(Field::Email, "Email fields are required!");
        } else if !validate::is_valid_email(email) {
            errors.insert(Field::Email, "Invalid email format!");
        }

        let phone = self.phone.trim();
        if phone.is_empty() {
            errors.insert(Field::Phone, "Phone number is required!");
        } else if !validate::is_valid_phone(phone) {
            errors.insert(
                Field::Phone,
                "Invalid phone number. Must be a 10-digit number.",
            );
        }

        if self.password.is_empty() {
            errors.insert(Field::Password, "Password fields are required!");
        } else if !validate::is_strong_password(&self.password) {
            errors.insert(
                Field::Password,
                "Password must be at least 8 characters long and include uppercase, lowercase, number, and special character.",
            );
        }

        if self.confirm_password.is_empty() {
            errors.insert(Field::ConfirmPassword, "Please confirm your password!");
        } else if self.confirm_password != self.password {
            errors.insert(Field::ConfirmPassword, "Passwords do not match!");
        }

        let image = match &self.profile_image {
            None => {
                errors.insert(Field::ProfileImage, "Please upload a profile image!");
                None
            }
            Some(image) if !validate::is_allowed_image_type(&image.content_type) => {
                errors.insert(
                    Field::ProfileImage,
                    "Only JPG, JPEG, PNG, or WEBP images are allowed!",
                );
                None
            }
            Some(image) => Some(image.clone()),
        };

        match image {
            Some(profile_image) if errors.is_empty() => Ok(SignupRequest {
                name: self.name.trim().to_string(),
                username: username.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                password: self.password.clone(),
                profile_image,
            }),
            _ => Err(errors),
        }
    }
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    /// Display name.
    pub name: String,
    /// Phone number.
    pub phone: String,
    /// Replacement avatar, if one was picked.
    pub profile_image: Option<ImageUpload>,
}

impl ProfileForm {
    /// Seeds the form from the stored profile.
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            phone: user.phone.clone(),
            profile_image: None,
        }
    }

    /// Whether submitting would change anything relative to `current`.
    #[must_use]
    pub fn is_changed(&self, current: &User) -> bool {
        self.name != current.name || self.phone != current.phone || self.profile_image.is_some()
    }

    /// Validates the form and builds the multipart update.
    ///
    /// # Errors
    ///
    /// Returns messages for an invalid name, phone or image type.
    pub fn validate(&self) -> Result<ProfileUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(problem) = validate::name_problem(&self.name) {
            errors.insert(Field::Name, problem);
        }
        if !validate::is_valid_phone(self.phone.trim()) {
            errors.insert(
                Field::Phone,
                "Invalid phone number. Must be a 10-digit number.",
            );
        }
        if let Some(image) = &self.profile_image
            && !validate::is_allowed_image_type(&image.content_type)
        {
            errors.insert(
                Field::ProfileImage,
                "Only JPG, JPEG, PNG, or WEBP images are allowed!",
            );
        }
        errors.into_result(ProfileUpdate {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            profile_image: self.profile_image.clone(),
        })
    }
}

/// Account operations against the backend and the credential store.
pub struct Accounts<B> {
    backend: Arc<B>,
    credentials: Arc<dyn CredentialStore>,
}

impl<B: Backend> Accounts<B> {
    /// Creates the account controller.
    pub fn new(backend: Arc<B>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            backend,
            credentials,
        }
    }

    /// The stored session, if any.
    #[must_use]
    pub fn session(&self) -> Option<Credentials> {
        self.credentials.read()
    }

    fn token(&self) -> Result<String, ClientError> {
        self.credentials.token().ok_or(ClientError::AuthRequired)
    }

    /// Logs in and stores the returned token and user.
    ///
    /// # Errors
    ///
    /// Field errors for an invalid form (nothing is sent), the backend
    /// error, or a store write failure.
    pub async fn login(&self, form: &LoginForm) -> Result<User, ClientError> {
        let request = form.validate()?;
        let response = self.backend.login(&request).await?;
        self.credentials.save(&response.jwt_token, &response.user)?;
        tracing::info!(user_id = response.user.id, "signed in");
        Ok(response.user)
    }

    /// Registers an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Field errors for an invalid form (nothing is sent), or the backend
    /// error.
    pub async fn signup(&self, form: &SignupForm) -> Result<String, ClientError> {
        let request = form.validate()?;
        let response = self.backend.signup(&request).await?;
        tracing::info!(username = %request.username, "account registered");
        Ok(response.message)
    }

    /// Clears the stored session.
    ///
    /// # Errors
    ///
    /// Returns the store error if the session file cannot be removed.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.credentials.clear()?;
        tracing::info!("signed out");
        Ok(())
    }

    /// Fetches the profile and refreshes the cached user.
    ///
    /// # Errors
    ///
    /// [`ClientError::AuthRequired`] without a token, the backend error, or
    /// a store write failure.
    pub async fn fetch_profile(&self) -> Result<User, ClientError> {
        let token = self.token()?;
        let user = self.backend.fetch_profile(&token).await?;
        self.credentials.save(&token, &user)?;
        Ok(user)
    }

    /// Submits profile changes, returning `None` when nothing changed.
    ///
    /// # Errors
    ///
    /// Field errors for an invalid form, [`ClientError::AuthRequired`]
    /// without a token, the backend error, or a store write failure.
    pub async fn update_profile(
        &self,
        form: &ProfileForm,
        current: &User,
    ) -> Result<Option<User>, ClientError> {
        let update = form.validate()?;
        if !form.is_changed(current) {
            tracing::debug!("profile unchanged; not submitting");
            return Ok(None);
        }
        let token = self.token()?;
        let user = self.backend.update_profile(&token, &update).await?;
        self.credentials.save(&token, &user)?;
        tracing::info!(user_id = user.id, "profile updated");
        Ok(Some(user))
    }

    /// Deletes the account and clears the session. Callers confirm first.
    ///
    /// Once the server has deleted the account this succeeds even if the
    /// stored session cannot be removed; that failure is only logged.
    ///
    /// # Errors
    ///
    /// [`ClientError::AuthRequired`] without a token, or the backend error.
    pub async fn delete_account(&self) -> Result<String, ClientError> {
        let token = self.token()?;
        let response = self.backend.delete_account(&token).await?;
        if let Err(e) = self.credentials.clear() {
            tracing::error!(error = %e, "account deleted but the stored session was not removed");
        }
        tracing::info!("account deleted");
        Ok(response.message)
    }
}
