//! Hachage et vérification des codes à usage unique

use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHashString, PasswordVerifier, SaltString},
    Argon2, PasswordHasher,
};
use derive_more::derive::Display;
use std::sync::LazyLock;

static DEFAULT_HASHER: LazyLock<Argon2<'static>> = LazyLock::new(Argon2::default);

/// Le hash d'un code vide, à utiliser quand aucun code n'a été émis
/// pour éviter une attaque par canal auxiliaire
static EMPTY_HASH: LazyLock<Option<CodeHash>> = LazyLock::new(|| hash("").ok());

/// Un code haché, seule forme sous laquelle un code est conservé
#[derive(Clone, Debug, Display)]
pub struct CodeHash(PasswordHashString);

/// Calcule un haché à partir d'un code en clair, en choisissant un sel au hasard
pub fn hash(code: &str) -> Result<CodeHash, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = DEFAULT_HASHER
        .hash_password(code.as_bytes(), &salt)?
        .serialize();

    Ok(CodeHash(hash))
}

/// Vérifie si le code correspond au hash stocké.
///
/// Sans hash, on teste quand même le code avec un faux hash pour que
/// la durée de la réponse ne révèle rien.
pub fn verify(code: &str, maybe_hash: Option<&CodeHash>) -> bool {
    let Some(hash) = maybe_hash.or(EMPTY_HASH.as_ref()) else {
        return false;
    };

    let matches = DEFAULT_HASHER
        .verify_password(code.as_bytes(), &hash.0.password_hash())
        .is_ok();

    matches && maybe_hash.is_some()
}
