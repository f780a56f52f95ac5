use http_types::auth::BasicAuth;
use http_types::Headers;
use log::warn;
use subtle::ConstantTimeEq;

/// Something that can decide whether a username and password belong to an operator.
pub trait Authenticator {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// The operator credentials configured on the server.
///
/// Without a password nobody can log in, so the admin pages stay closed until
/// one is configured.
pub struct AdminCredentials {
    username: String,
    password: Option<String>,
}

impl AdminCredentials {
    pub fn new(username: String, password: Option<String>) -> AdminCredentials {
        AdminCredentials { username, password }
    }

    /// Whether any login can succeed at all.
    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }
}

impl Authenticator for AdminCredentials {
    /// Compares both fields in constant time.
    fn verify(&self, username: &str, password: &str) -> bool {
        let expected = match &self.password {
            Some(expected) => expected,
            None => return false,
        };

        let username_matches = username.as_bytes().ct_eq(self.username.as_bytes());
        let password_matches = password.as_bytes().ct_eq(expected.as_bytes());

        (username_matches & password_matches).into()
    }
}

/// Checks the `Authorization: Basic` header on a request against `auth`.
pub fn is_authorized(auth: &impl Authenticator, headers: impl AsRef<Headers>) -> bool {
    match BasicAuth::from_headers(headers) {
        Ok(Some(credentials)) => {
            let accepted = auth.verify(credentials.username(), credentials.password());
            if !accepted {
                warn!("Rejected admin login for {}", credentials.username());
            }
            accepted
        }
        Ok(None) => false,
        Err(err) => {
            warn!("Malformed authorization header: {}", err);
            false
        }
    }
}
