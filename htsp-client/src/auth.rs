//! Credential hashing boundary.
//!
//! The digest algorithm is supplied by the caller. Tvheadend servers expect
//! `SHA1(password || challenge)`; any function with the right shape works:
//!
//! ```rust
//! use htsp_client::auth::CredentialHasher;
//!
//! let hasher = |_user: &str, password: &str, challenge: &[u8]| {
//!     let mut out = password.as_bytes().to_vec();
//!     out.extend_from_slice(challenge);
//!     out
//! };
//! assert_eq!(hasher.digest("user", "pw", b"!"), b"pw!".to_vec());
//! ```

/// Computes the `digest` sent with `authenticate`.
pub trait CredentialHasher: Send + Sync {
    fn digest(&self, username: &str, password: &str, challenge: &[u8]) -> Vec<u8>;
}

impl<F> CredentialHasher for F
where
    F: Fn(&str, &str, &[u8]) -> Vec<u8> + Send + Sync,
{
    fn digest(&self, username: &str, password: &str, challenge: &[u8]) -> Vec<u8> {
        self(username, password, challenge)
    }
}

/// Username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl CredentialHasher for Fixed {
        fn digest(&self, _: &str, _: &str, _: &[u8]) -> Vec<u8> {
            vec![0xAB; 20]
        }
    }

    #[test]
    fn test_hasher_sees_challenge() {
        let hasher = |user: &str, password: &str, challenge: &[u8]| {
            let mut out = user.as_bytes().to_vec();
            out.extend_from_slice(password.as_bytes());
            out.extend_from_slice(challenge);
            out
        };
        assert_eq!(hasher.digest("a", "b", &[1, 2]), vec![b'a', b'b', 1, 2]);

        let boxed: Box<dyn CredentialHasher> = Box::new(Fixed);
        assert_eq!(boxed.digest("a", "b", &[]).len(), 20);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("admin", "secret");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("admin"));
        assert!(!shown.contains("secret"));
    }
}
