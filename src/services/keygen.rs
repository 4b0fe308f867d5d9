use crate::db::UrlStore;
use crate::error::{AppError, AppResult};

/// Symbols a key may contain: digits and uppercase ASCII letters.
pub const KEY_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M',
    'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];

/// Longest key the `urls` table can hold
pub const MAX_KEY_LENGTH: usize = 16;

/// Generate a random key of `length` symbols from [`KEY_ALPHABET`].
///
/// `nanoid` draws from an OS-seeded CSPRNG and masks without modulo bias, so
/// keys are safe to use as access tokens. Uniqueness is not checked here.
pub fn generate_key(length: usize) -> String {
    nanoid::nanoid!(length, &KEY_ALPHABET)
}

/// Whether `candidate` could have been produced by [`generate_key`] with the
/// given `length`.
pub fn is_well_formed_key(candidate: &str, length: usize) -> bool {
    candidate.len() == length && candidate.chars().all(|c| KEY_ALPHABET.contains(&c))
}

/// Generate a public key no active record currently uses, as key or secret.
///
/// # Errors
///
/// Returns `AppError::KeyGenerationExhausted` if every one of `max_attempts`
/// candidates collided. Store failures are returned as-is.
pub async fn generate_unique_key(
    store: &dyn UrlStore,
    length: usize,
    max_attempts: u32,
) -> AppResult<String> {
    generate_unique(store, length, max_attempts, None).await
}

/// Generate an admin secret no active record currently uses and that differs
/// from `key`, the public key it will be paired with.
pub async fn generate_unique_secret_key(
    store: &dyn UrlStore,
    key: &str,
    length: usize,
    max_attempts: u32,
) -> AppResult<String> {
    generate_unique(store, length, max_attempts, Some(key)).await
}

async fn generate_unique(
    store: &dyn UrlStore,
    length: usize,
    max_attempts: u32,
    paired_with: Option<&str>,
) -> AppResult<String> {
    for attempt in 1..=max_attempts {
        let candidate = generate_key(length);

        if paired_with != Some(candidate.as_str()) && !store.is_taken(&candidate).await? {
            return Ok(candidate);
        }

        tracing::debug!(attempt, "Generated key already in use, retrying");
    }

    Err(AppError::KeyGenerationExhausted(max_attempts))
}
