use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Password held for a single username-password exchange.
///
/// The buffer is wiped when the value is dropped. The flow acquirer copies the
/// request's password into a fresh `SecretPassword` for each attempt and drops it
/// as soon as that attempt returns, whether it succeeded or not.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretPassword(String);

impl SecretPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// Reveals the password to the identity client performing the exchange.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wipes the password in place.
    pub fn clear(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecretPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretPassword(<redacted>)")
    }
}

impl From<String> for SecretPassword {
    fn from(password: String) -> Self {
        Self(password)
    }
}

impl From<&str> for SecretPassword {
    fn from(password: &str) -> Self {
        Self(password.to_string())
    }
}
