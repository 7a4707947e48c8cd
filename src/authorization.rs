//! Wrapper d'appel à Casbin pour la vérification statique
//! des conventions sujet-objet-action

use casbin::CoreApi;
use log::{error, info};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::models::{CaseRecord, Conversation, Member};

const CONFIG: &str = "access_control/model.conf";
const POLICY: &str = "access_control/policy.csv";

/// Objet des actions qui ne portent pas sur un enregistrement précis
const PORTAL: &str = "portal";

/// Un enforcer Casbin
pub struct Enforcer(casbin::Enforcer);

type CasbinResult = Result<(), AccessDenied>;

/// Une erreur sans détails en cas d'accès refusé
#[derive(Debug, Error)]
#[error("Accès refusé.")]
pub struct AccessDenied;

/// Un contexte contenant une référence à un enforcer et à un sujet.
pub struct Context<'ctx> {
    enforcer: &'ctx Enforcer,
    subject: &'ctx Member,
}

impl Enforcer {
    pub fn load() -> Result<Self, casbin::Error> {
        let mut enforcer = futures::executor::block_on(casbin::Enforcer::new(CONFIG, POLICY))?;
        futures::executor::block_on(enforcer.load_policy())?;
        Ok(Enforcer(enforcer))
    }

    pub fn with_subject<'ctx>(&'ctx self, subject: &'ctx Member) -> Context<'ctx> {
        Context {
            enforcer: self,
            subject,
        }
    }
}

impl Context<'_> {
    fn enforce<O>(&self, object: O, action: &str) -> CasbinResult
    where
        O: Serialize + std::fmt::Debug + std::hash::Hash,
    {
        let subject = self.subject;

        info!(
            "Enforcing {}",
            json!({ "sub": subject.id, "obj": &object, "act": action })
        );

        match self.enforcer.0.enforce((subject, &object, action)) {
            Err(e) => {
                error!("Casbin error: {e:?}");
                Err(AccessDenied)
            }
            Ok(r) => {
                info!("Granted: {r}");
                if r {
                    Ok(())
                } else {
                    Err(AccessDenied)
                }
            }
        }
    }

    /// Consulter l'annuaire, les cas et les articles
    pub fn browse(&self) -> CasbinResult {
        self.enforce(PORTAL, "browse")
    }

    pub fn submit_content(&self) -> CasbinResult {
        self.enforce(PORTAL, "submit-content")
    }

    pub fn flag_content(&self) -> CasbinResult {
        self.enforce(PORTAL, "flag-content")
    }

    pub fn update_case(&self, case: &CaseRecord) -> CasbinResult {
        self.enforce(case, "update-case")
    }

    pub fn update_profile(&self, target: &Member) -> CasbinResult {
        self.enforce(target, "update-profile")
    }

    pub fn read_conversation(&self, conversation: &Conversation) -> CasbinResult {
        self.enforce(conversation, "read-conversation")
    }

    pub fn post_message(&self, conversation: &Conversation) -> CasbinResult {
        self.enforce(conversation, "post-message")
    }

    pub fn moderate_member(&self, target: &Member) -> CasbinResult {
        self.enforce(target, "moderate-member")
    }

    pub fn resolve_flag(&self) -> CasbinResult {
        self.enforce(PORTAL, "resolve-flag")
    }

    /// Statistiques, recherche d'utilisateurs et exports
    pub fn admin_panel(&self) -> CasbinResult {
        self.enforce(PORTAL, "admin-panel")
    }
}
