//! Auth error taxonomy, plus the sealed marker trait the HTTP layer uses to
//! pick 401 vs 403 vs 500 without string-matching (Design Note in the
//! error-handling section): any error implementing [`IsAuthError`] is known
//! at compile time to be an authorization failure.

use thiserror::Error;

mod sealed {
    pub trait Sealed {}
}

/// Implemented only by [`AuthError`]. Lets `tsdb-server`'s error mapper
/// recognize "this is an auth failure" via the type system rather than by
/// inspecting a message string.
pub trait IsAuthError: sealed::Sealed {
    fn is_forbidden(&self) -> bool;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authentication credentials were not provided")]
    CredentialsRequired,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user does not have write access to this database")]
    WriteForbidden,
    #[error("user does not have read access to this database")]
    ReadForbidden,
    #[error("this operation requires cluster admin privileges")]
    AdminRequired,
}

impl sealed::Sealed for AuthError {}

impl IsAuthError for AuthError {
    fn is_forbidden(&self) -> bool {
        !matches!(
            self,
            AuthError::CredentialsRequired | AuthError::InvalidCredentials
        )
    }
}

impl AuthError {
    /// 401 for a missing/bad credential, 403 once the caller is known but
    /// lacks the privilege, decided via [`IsAuthError`] rather than a second
    /// match over the variants.
    pub fn status_code(&self) -> http::StatusCode {
        if self.is_forbidden() {
            http::StatusCode::FORBIDDEN
        } else {
            http::StatusCode::UNAUTHORIZED
        }
    }
}
