//! Contexte de session explicite, possédé par le service.
//!
//! La session est ouverte à la connexion et détruite à la déconnexion.
//! L'indicateur de chargement refuse une requête lancée pendant qu'une
//! autre est encore en cours.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::MemberID;

/// Le membre connecté
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub member: MemberID,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Une requête est déjà en cours, veuillez patienter")]
pub struct Busy;

#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<Session>,
    loading: bool,
}

impl SessionContext {
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn member(&self) -> Option<MemberID> {
        self.current.as_ref().map(|session| session.member)
    }

    pub fn open(&mut self, member: MemberID) {
        self.current = Some(Session {
            member,
            started_at: Utc::now(),
        });
    }

    /// Détruit la session courante et la renvoie
    pub fn close(&mut self) -> Option<Session> {
        self.current.take()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marque le début d'une requête
    pub fn begin(&mut self) -> Result<(), Busy> {
        if self.loading {
            return Err(Busy);
        }
        self.loading = true;
        Ok(())
    }

    pub fn finish(&mut self) {
        self.loading = false;
    }
}
