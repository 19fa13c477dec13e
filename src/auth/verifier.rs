use argon2::Argon2;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::AppError;
use crate::models::Instructor;

/// Salt of last resort for rows with neither a salt column nor an employee id.
pub const DEFAULT_SALT: &str = "instructor-portal-default";

const STRONG_HASH_LEN: usize = 32;

/// Salt precedence: explicit column, else derived from the employee id, else
/// the fixed default.
pub fn derive_salt(explicit: Option<&str>, employee_id: &str) -> String {
    if let Some(salt) = explicit {
        let salt = salt.trim();
        if !salt.is_empty() {
            return salt.to_string();
        }
    }

    if !employee_id.is_empty() {
        return format!("instructor-{}", employee_id);
    }

    DEFAULT_SALT.to_string()
}

fn strong_hash_bytes(code: &str, salt: &str) -> Result<[u8; STRONG_HASH_LEN], argon2::Error> {
    let mut output = [0u8; STRONG_HASH_LEN];
    Argon2::default().hash_password_into(code.as_bytes(), salt.as_bytes(), &mut output)?;
    Ok(output)
}

/// Current-scheme hash of a code, as stored in the `PasswordHash` column.
pub fn strong_hash_hex(code: &str, salt: &str) -> Result<String, AppError> {
    let bytes = strong_hash_bytes(code, salt)
        .map_err(|e| AppError::Internal(format!("password derivation failed: {}", e)))?;
    Ok(hex::encode(bytes))
}

/// Legacy fast digest, hex-encoded.
pub fn fast_hash_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Layered verification policy, first applicable scheme wins:
/// current salted hash, then salted legacy digest, then (opt-in) bare legacy
/// digest. A record with no usable material always rejects.
pub fn verify(record: &Instructor, submitted: &str, allow_legacy_sha: bool) -> bool {
    let creds = &record.credentials;

    if let Some(stored) = &creds.strong_hash {
        return verify_strong(record, stored, submitted);
    }

    if let Some(stored) = &creds.legacy_salted_hash {
        let computed = fast_hash_hex(&format!("{}{}", creds.salt, submitted));
        return stored.trim().eq_ignore_ascii_case(&computed);
    }

    if allow_legacy_sha {
        if let Some(stored) = &creds.legacy_hash {
            return stored.trim().eq_ignore_ascii_case(&fast_hash_hex(submitted));
        }
    }

    false
}

fn verify_strong(record: &Instructor, stored_hex: &str, submitted: &str) -> bool {
    let stored = match hex::decode(stored_hex.trim()) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(
                employee_id = %record.employee_id,
                "Stored password hash is not valid hex"
            );
            return false;
        }
    };

    let computed = match strong_hash_bytes(submitted, &record.credentials.salt) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                employee_id = %record.employee_id,
                error = %e,
                "Password derivation failed during verification"
            );
            return false;
        }
    };

    stored.len() == computed.len() && bool::from(stored.as_slice().ct_eq(&computed))
}
