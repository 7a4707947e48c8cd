//! Codes à usage unique envoyés par e-mail pour la connexion et
//! l'inscription.
//!
//! Un code est à usage unique, remplacé par toute nouvelle demande pour la
//! même adresse, et invalidé après trop d'essais manqués.

use std::collections::HashMap;

use log::{info, warn};
use rand_core::{OsRng, RngCore};
use thiserror::Error;

use crate::consts::{OTP_LENGTH, OTP_MAX_ATTEMPTS};
use crate::utils::code_hash::{self, CodeHash};
use crate::utils::input_validation::{EmailAddress, OtpCode};

/// Usage auquel un code est destiné
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodePurpose {
    Login,
    Registration,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtpError {
    #[error("Aucun code en cours pour cette adresse")]
    NoPendingCode,
    #[error("Code invalide, {attempts_left} essai(s) restant(s)")]
    Mismatch { attempts_left: u8 },
    #[error("Trop d'essais, demandez un nouveau code")]
    TooManyAttempts,
    #[error("Impossible de générer le code")]
    Generation,
}

#[derive(Debug)]
struct IssuedCode {
    hash: CodeHash,
    purpose: CodePurpose,
    attempts_left: u8,
}

#[derive(Debug, Default)]
pub struct OtpStore {
    codes: HashMap<EmailAddress, IssuedCode>,
}

fn generate_code() -> String {
    let modulus = 10u32.pow(OTP_LENGTH as u32);
    format!("{:0width$}", OsRng.next_u32() % modulus, width = OTP_LENGTH)
}

impl OtpStore {
    /// Émet un nouveau code pour l'adresse et renvoie sa valeur en clair,
    /// à transmettre à l'utilisateur. Seul son haché est conservé.
    pub fn issue(&mut self, email: &EmailAddress, purpose: CodePurpose) -> Result<String, OtpError> {
        let code = generate_code();
        let hash = code_hash::hash(&code).map_err(|_| OtpError::Generation)?;

        self.codes.insert(
            email.clone(),
            IssuedCode {
                hash,
                purpose,
                attempts_left: OTP_MAX_ATTEMPTS,
            },
        );
        info!("One-time code issued for {email} ({purpose:?})");
        Ok(code)
    }

    /// Vérifie un code. Un code accepté est consommé.
    pub fn verify(
        &mut self,
        email: &EmailAddress,
        purpose: CodePurpose,
        code: &OtpCode,
    ) -> Result<(), OtpError> {
        let issued = self
            .codes
            .get_mut(email)
            .filter(|issued| issued.purpose == purpose);

        let Some(issued) = issued else {
            // Même coût qu'une vérification réelle
            code_hash::verify(code.as_ref(), None);
            return Err(OtpError::NoPendingCode);
        };

        if code_hash::verify(code.as_ref(), Some(&issued.hash)) {
            self.codes.remove(email);
            info!("One-time code accepted for {email}");
            return Ok(());
        }

        issued.attempts_left = issued.attempts_left.saturating_sub(1);
        let attempts_left = issued.attempts_left;
        warn!("Wrong one-time code for {email}, {attempts_left} attempt(s) left");

        if attempts_left == 0 {
            self.codes.remove(email);
            return Err(OtpError::TooManyAttempts);
        }
        Err(OtpError::Mismatch { attempts_left })
    }

    pub fn has_pending(&self, email: &EmailAddress) -> bool {
        self.codes.contains_key(email)
    }
}
