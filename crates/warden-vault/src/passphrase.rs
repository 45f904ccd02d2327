//! Where the vault passphrase comes from.

use zeroize::Zeroizing;

/// Source of the vault passphrase.
///
/// The environment is read on every call to [`read`](Self::read), once per
/// vault operation, so a passphrase set or cleared at runtime takes effect
/// on the next operation and is never cached by the vault.
#[derive(Clone, Default)]
pub enum PassphraseSource {
    /// Read from this environment variable.
    Env(String),
    /// A fixed passphrase (tests, embedding applications).
    Static(Zeroizing<String>),
    /// No passphrase: secrets stay in plaintext.
    #[default]
    None,
}

impl std::fmt::Debug for PassphraseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env(var) => f.debug_tuple("Env").field(var).finish(),
            Self::Static(_) => f.write_str("Static(<redacted>)"),
            Self::None => f.write_str("None"),
        }
    }
}

impl PassphraseSource {
    /// Read from environment variable `var`.
    #[must_use]
    pub fn env(var: impl Into<String>) -> Self {
        Self::Env(var.into())
    }

    /// Use a fixed passphrase.
    #[must_use]
    pub fn fixed(passphrase: impl Into<String>) -> Self {
        Self::Static(Zeroizing::new(passphrase.into()))
    }

    /// The current passphrase. Empty values count as unset.
    #[must_use]
    pub fn read(&self) -> Option<Zeroizing<String>> {
        let value = match self {
            Self::Env(var) => Zeroizing::new(std::env::var(var).ok()?),
            Self::Static(value) => value.clone(),
            Self::None => return None,
        };
        if value.is_empty() { None } else { Some(value) }
    }
}
