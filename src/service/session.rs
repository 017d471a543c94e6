//! Session issuance: signup, login and refresh-token rotation

use std::sync::Arc;

use crate::auth::{generate_refresh_token, PasswordHasher, TokenSigner};
use crate::configuration::AuthConfig;
use crate::domain::{LoginIdentity, NewUser, Signup, SubjectId, TokenPair, TokenValidation, User};
use crate::error::AuthError;
use crate::service::{bounded, hash_password, verify_password};
use crate::store::{RefreshTokenStore, StoreError, UserStore};
use crate::validators::{is_valid_email, is_valid_password, is_valid_username};

#[derive(Clone)]
pub struct SessionIssuer {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn RefreshTokenStore>,
    hasher: Arc<dyn PasswordHasher>,
    signer: Arc<dyn TokenSigner>,
    config: AuthConfig,
}

impl SessionIssuer {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn RefreshTokenStore>,
        hasher: Arc<dyn PasswordHasher>,
        signer: Arc<dyn TokenSigner>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            hasher,
            signer,
            config,
        }
    }

    /// Create an account. No tokens are issued; the caller logs in separately.
    #[tracing::instrument(name = "Signup", skip(self, signup), fields(username = %signup.username))]
    pub async fn signup(&self, signup: Signup) -> Result<User, AuthError> {
        let username = is_valid_username(&signup.username)?;
        let email = is_valid_email(&signup.email)?;
        is_valid_password(&signup.password)?;

        let password_hash = hash_password(&self.hasher, &signup.password).await?;

        let id = bounded(
            self.config.store_timeout,
            "add_user",
            self.users.add_user(NewUser {
                username,
                email,
                password_hash,
            }),
        )
        .await?;

        let user = bounded(
            self.config.store_timeout,
            "get_user_by_id",
            self.users.get_user_by_id(id),
        )
        .await?;

        tracing::info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Exchange an identity (email or username) and password for a token pair.
    ///
    /// An unknown identity and a wrong password fail identically with
    /// `InvalidCredentials`. A deleted account fails with `AlreadyDeleted`.
    #[tracing::instrument(name = "Login", skip_all)]
    pub async fn login(&self, identity: &str, password: &str) -> Result<TokenPair, AuthError> {
        let lookup = match LoginIdentity::parse(identity) {
            LoginIdentity::Email(email) => {
                bounded(
                    self.config.store_timeout,
                    "get_user_by_email",
                    self.users.get_user_by_email(&email),
                )
                .await
            }
            LoginIdentity::Username(username) => {
                bounded(
                    self.config.store_timeout,
                    "get_user_by_username",
                    self.users.get_user_by_username(&username),
                )
                .await
            }
        };

        let user = match lookup {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };

        if user.is_deleted {
            return Err(AuthError::AlreadyDeleted);
        }

        if !verify_password(&self.hasher, password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let pair = self.issue_pair(user.id).await?;
        tracing::info!(user_id = %user.id, "Login succeeded");
        Ok(pair)
    }

    /// Consume a refresh token and issue a new pair.
    ///
    /// The presented token is removed before anything new is issued. If a later
    /// step fails the caller is left without a usable refresh token.
    #[tracing::instrument(name = "Refresh token", skip_all)]
    pub async fn refresh_token(&self, token: &str) -> Result<TokenPair, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::TokenNotValid);
        }

        let subject = match bounded(
            self.config.store_timeout,
            "take_refresh_token",
            self.tokens.take(token),
        )
        .await
        {
            Ok(subject) => subject,
            Err(StoreError::NotFound) => return Err(AuthError::TokenNotValid),
            Err(e) => return Err(e.into()),
        };

        // deleted status is not re-checked here
        let user = bounded(
            self.config.store_timeout,
            "get_user_by_id",
            self.users.get_user_by_id(subject),
        )
        .await?;

        let pair = self.issue_pair(user.id).await?;
        tracing::info!(user_id = %user.id, "Refresh token rotated");
        Ok(pair)
    }

    /// Probe an access token without failing on an invalid one
    pub fn validate_token(&self, token: &str) -> TokenValidation {
        match self.signer.verify(token.trim()) {
            Ok(subject) => TokenValidation {
                valid: true,
                user_id: Some(subject),
            },
            Err(_) => TokenValidation {
                valid: false,
                user_id: None,
            },
        }
    }

    async fn issue_pair(&self, subject: SubjectId) -> Result<TokenPair, AuthError> {
        let access_token = self.signer.issue(subject, self.config.access_token_ttl)?;
        let refresh_token = generate_refresh_token();

        bounded(
            self.config.store_timeout,
            "put_refresh_token",
            self.tokens
                .put(subject, &refresh_token, self.config.refresh_token_ttl),
        )
        .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.as_secs(),
        })
    }
}
