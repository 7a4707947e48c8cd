//! Modèle de données

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;
use uuid::Uuid;

use crate::moderation::{ApprovalStatus, FlagStatus};
use crate::utils::input_validation::{EmailAddress, IsaNumber};

/// Déclare un identifiant unique opaque, tiré au hasard
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord, Display,
        )]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

id_type!(
    /// Un identifiant unique de membre.
    MemberID
);
id_type!(
    /// Un identifiant unique de cas clinique
    CaseID
);
id_type!(
    /// Un identifiant unique d'article de recherche
    PaperID
);
id_type!(
    /// Un identifiant unique de signalement
    FlagID
);
id_type!(
    /// Un identifiant unique de conversation
    ConversationID
);

/// Rôle d'un membre: simple membre ou administrateur
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum Role {
    Member,
    Admin,
}

/// Localisation d'un cabinet
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

impl Location {
    /// Libellé utilisé par l'annuaire, par ex. "New York, NY"
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

/// Le profil d'un professionnel de santé inscrit.
///
/// Un membre est créé en attente lors de l'inscription, et n'a accès
/// au portail qu'une fois approuvé par un administrateur.
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Display)]
#[display("{full_name}")]
pub struct Member {
    pub id: MemberID,
    pub role: Role,
    pub status: ApprovalStatus,
    pub full_name: String,
    pub email: EmailAddress,
    pub gender: String,
    pub date_of_birth: Option<NaiveDate>,
    pub specialization: Vec<String>,
    pub qualifications: String,
    pub contact_number: String,
    pub clinic: String,
    pub location: Location,
    pub years_of_experience: u32,
    pub registration_number: String,
    pub isa_number: IsaNumber,
    pub online: bool,
    pub registered_on: NaiveDate,
}

impl Member {
    pub fn is_approved(&self) -> bool {
        self.status == ApprovalStatus::Approved
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Nature d'un cas présenté à la communauté
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum CaseType {
    Clinical,
    #[display("Medico-Legal")]
    MedicoLegal,
}

/// Un cas clinique ou médico-légal soumis à discussion
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Display)]
#[display("{title}")]
pub struct CaseRecord {
    pub id: CaseID,
    pub title: String,
    pub description: String,
    pub author: MemberID,
    pub author_name: String,
    pub specialty: String,
    pub case_type: CaseType,
    pub diagnosis: String,
    pub outcome: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub published_on: NaiveDate,
    pub views: u32,
    pub solved: bool,
}

/// Catégorie d'un article de recherche
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum PaperCategory {
    #[display("Clinical Research")]
    ClinicalResearch,
    #[display("Case Study")]
    CaseStudy,
    Guidelines,
    #[display("Review Article")]
    ReviewArticle,
}

/// Un article de recherche partagé (lecture seule une fois publié)
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Display)]
#[display("{title}")]
pub struct ResearchPaper {
    pub id: PaperID,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub category: PaperCategory,
    pub specialty: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub pdf_url: String,
    pub published_on: NaiveDate,
    pub downloads: u32,
    pub submitted_by: MemberID,
}

/// Référence vers un contenu pouvant être signalé
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ContentRef {
    #[display("Case Discussion")]
    Case(CaseID),
    #[display("Research Paper")]
    Paper(PaperID),
}

/// Un signalement de contenu, en attente de modération
#[derive(Debug, Serialize, Deserialize, Clone, Hash, Display)]
#[display("{title}")]
pub struct FlaggedItem {
    pub id: FlagID,
    pub content: ContentRef,
    pub title: String,
    pub author: String,
    pub reported_by: MemberID,
    pub reason: String,
    pub date: NaiveDate,
    pub status: FlagStatus,
}

/// Sujet d'une conversation: échange direct, ou discussion rattachée
/// à un cas ou à un article
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Direct,
    Case(CaseID),
    Paper(PaperID),
}

/// Contenu d'un message: texte ou référence vers un fichier
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Display)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    #[display("{text}")]
    Text { text: String },
    #[display("[fichier] {name}")]
    File { name: String, url: String },
}

/// Un message d'une conversation. Son identifiant est sa position (1, 2, ...)
#[derive(Debug, Serialize, Deserialize, Clone, Hash)]
pub struct Message {
    pub id: u32,
    pub sender: MemberID,
    pub body: MessageBody,
    pub sent_at: DateTime<Utc>,
    pub delivered: bool,
    /// Lu par tous les autres participants
    pub seen: bool,
    #[serde(default)]
    pub seen_by: BTreeSet<MemberID>,
}

/// Une conversation entre membres, quel que soit son sujet
#[derive(Debug, Serialize, Deserialize, Clone, Hash)]
pub struct Conversation {
    pub id: ConversationID,
    pub topic: Topic,
    pub participants: Vec<MemberID>,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(topic: Topic, participants: Vec<MemberID>) -> Self {
        Self {
            id: ConversationID::new(),
            topic,
            participants,
            messages: Vec::new(),
        }
    }

    pub fn has_participant(&self, member: MemberID) -> bool {
        self.participants.contains(&member)
    }

    /// Pour une conversation directe, l'autre participant
    pub fn peer_of(&self, member: MemberID) -> Option<MemberID> {
        self.participants.iter().copied().find(|&id| id != member)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
