use std::path::Path;

use jwt_simple::prelude::*;

/// Signs a key-pair JWT the way Snowflake expects it: issuer
/// `ACCOUNT.USER.SHA256:<fingerprint>`, subject `ACCOUNT.USER`.
pub fn create_token(
    public_key: &str,
    private_key: &str,
    account_identifier: &str,
    user: &str,
) -> Result<String, KeyPairError> {
    let fingerprint = public_key_fingerprint(public_key)?;
    let qualified_username = format!(
        "{}.{}",
        account_identifier.to_ascii_uppercase(),
        user.to_ascii_uppercase()
    );
    let issuer = format!("{qualified_username}.SHA256:{fingerprint}");
    let claims = Claims::create(Duration::from_hours(1))
        .with_issuer(issuer)
        .with_subject(qualified_username);
    let key_pair = RS256KeyPair::from_pem(private_key).map_err(KeyPairError::KeyPairGeneration)?;
    key_pair
        .sign(claims)
        .map_err(KeyPairError::KeyPairGeneration)
}

pub fn create_token_from_file<P: AsRef<Path>>(
    public_key_path: P,
    private_key_path: P,
    account_identifier: &str,
    user: &str,
) -> Result<String, TokenFromFileError> {
    let public_key = read_key(public_key_path, KeyKind::Public)?;
    let private_key = read_key(private_key_path, KeyKind::Private)?;
    Ok(create_token(
        &public_key,
        &private_key,
        account_identifier,
        user,
    )?)
}

/// Standard, padded base64 of the SHA-256 digest of the public key.
fn public_key_fingerprint(public_key: &str) -> Result<String, KeyPairError> {
    let mut fingerprint = RS256PublicKey::from_pem(public_key)
        .map_err(KeyPairError::FingerprintGeneration)?
        .sha256_thumbprint()
        .replace('-', "+")
        .replace('_', "/");
    while fingerprint.len() % 4 != 0 {
        fingerprint.push('=');
    }
    Ok(fingerprint)
}

enum KeyKind {
    Public,
    Private,
}

fn read_key<P: AsRef<Path>>(path: P, kind: KeyKind) -> Result<String, KeyFileReadError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|error| {
        let path = path.display().to_string();
        match kind {
            KeyKind::Public => KeyFileReadError::PublicKeyRead { error, path },
            KeyKind::Private => KeyFileReadError::PrivateKeyRead { error, path },
        }
    })
}

#[derive(thiserror::Error, Debug)]
pub enum TokenFromFileError {
    #[error(transparent)]
    KeyPair(#[from] KeyPairError),
    #[error(transparent)]
    KeyFileRead(#[from] KeyFileReadError),
}

#[derive(thiserror::Error, Debug)]
pub enum KeyFileReadError {
    #[error("failed to read public key at {path}—{error}")]
    PublicKeyRead { error: std::io::Error, path: String },
    #[error("failed to read private key at {path}—{error}")]
    PrivateKeyRead { error: std::io::Error, path: String },
}

#[derive(thiserror::Error, Debug)]
pub enum KeyPairError {
    #[error("failed to generate fingerprint from public key—{0}")]
    FingerprintGeneration(anyhow::Error),
    #[error("failed to generate key pair from private key—{0}")]
    KeyPairGeneration(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pem_pair() -> Result<(String, String, RS256KeyPair), anyhow::Error> {
        let key_pair = RS256KeyPair::generate(2048)?;
        let public = key_pair.public_key().to_pem()?;
        let private = key_pair.to_pem()?;
        Ok((public, private, key_pair))
    }

    #[test]
    fn verify_jwt() -> Result<(), anyhow::Error> {
        let (public, private, key_pair) = pem_pair()?;
        let token = create_token(&public, &private, "test_account", "test_user")?;
        let claims = key_pair
            .public_key()
            .verify_token::<NoCustomClaims>(&token, None)?;
        assert_eq!(claims.subject.as_deref(), Some("TEST_ACCOUNT.TEST_USER"));
        let issuer = claims.issuer.unwrap_or_default();
        assert!(issuer.starts_with("TEST_ACCOUNT.TEST_USER.SHA256:"));
        Ok(())
    }

    #[test]
    fn fingerprint_is_padded_standard_base64() -> Result<(), anyhow::Error> {
        let (public, _, _) = pem_pair()?;
        let fingerprint = public_key_fingerprint(&public)?;
        assert_eq!(fingerprint.len(), 44);
        assert!(fingerprint.ends_with('='));
        assert!(!fingerprint.contains('-') && !fingerprint.contains('_'));
        Ok(())
    }

    #[test]
    fn missing_key_file_names_the_path() {
        let error = create_token_from_file(
            "./does-not-exist/rsa_key.pub",
            "./does-not-exist/rsa_key.p8",
            "ACCOUNT",
            "USER",
        )
        .unwrap_err();
        assert!(matches!(
            error,
            TokenFromFileError::KeyFileRead(KeyFileReadError::PublicKeyRead { .. })
        ));
        assert!(error.to_string().contains("rsa_key.pub"));
    }

    #[test]
    fn garbage_private_key_is_rejected() -> Result<(), anyhow::Error> {
        let (public, _, _) = pem_pair()?;
        let error = create_token(&public, "not a pem", "ACCOUNT", "USER").unwrap_err();
        assert!(matches!(error, KeyPairError::KeyPairGeneration(_)));
        Ok(())
    }
}
