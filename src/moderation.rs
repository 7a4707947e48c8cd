//! Machines à états de l'approbation des membres et de la modération
//! des contenus signalés.
//!
//! Les deux cycles de vie n'ont qu'une transition possible depuis l'état
//! initial et des états finaux. Seule une action explicite d'un
//! administrateur les fait avancer.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;
use thiserror::Error;

/// État d'inscription d'un membre
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, EnumIter, Display,
)]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Décision d'un modérateur sur un contenu signalé
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum Resolution {
    /// Le contenu est conservé
    Approved,
    /// Le contenu est retiré du portail
    Removed,
}

/// État d'un signalement
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum FlagStatus {
    #[default]
    Pending,
    #[display("Resolved ({_0})")]
    Resolved(Resolution),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transition impossible depuis l'état {from}")]
pub struct TransitionError {
    pub from: String,
}

impl TransitionError {
    fn from_state(state: impl std::fmt::Display) -> Self {
        Self {
            from: state.to_string(),
        }
    }
}

impl ApprovalStatus {
    pub fn is_terminal(self) -> bool {
        self != ApprovalStatus::Pending
    }

    pub fn approve(self) -> Result<Self, TransitionError> {
        match self {
            ApprovalStatus::Pending => Ok(ApprovalStatus::Approved),
            other => Err(TransitionError::from_state(other)),
        }
    }

    pub fn reject(self) -> Result<Self, TransitionError> {
        match self {
            ApprovalStatus::Pending => Ok(ApprovalStatus::Rejected),
            other => Err(TransitionError::from_state(other)),
        }
    }
}

impl FlagStatus {
    pub fn is_pending(self) -> bool {
        self == FlagStatus::Pending
    }

    pub fn resolve(self, resolution: Resolution) -> Result<Self, TransitionError> {
        match self {
            FlagStatus::Pending => Ok(FlagStatus::Resolved(resolution)),
            other => Err(TransitionError::from_state(other)),
        }
    }
}
