//! Stockage des données en mémoire, avec sauvegarde en JSON
//!
//! Chaque entité vit dans une [`Table`] ordonnée derrière l'interface
//! [`Repository`]. L'ordre d'insertion est conservé: c'est l'ordre dans
//! lequel les écrans présentent les collections.

use crate::models::{
    CaseID, CaseRecord, ContentRef, Conversation, ConversationID, FlagID, FlaggedItem, Member,
    MemberID, PaperID, ResearchPaper, Topic,
};
use crate::utils::input_validation::{EmailAddress, IsaNumber};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fmt::Display,
    fs::File,
    io::{self, ErrorKind::NotFound},
    path::PathBuf,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DBError {
    #[error("{kind} inexistant: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} déjà présent: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("Adresse déjà inscrite: {0}")]
    EmailAlreadyRegistered(EmailAddress),
    #[error("Numéro ISA déjà inscrit: {0}")]
    IsaAlreadyRegistered(IsaNumber),
}

/// Un enregistrement identifié de manière unique dans sa table
pub trait Record: Serialize + DeserializeOwned {
    type Id: Copy + Eq + Display;

    /// Nom de l'entité, pour les messages d'erreur
    const KIND: &'static str;

    fn id(&self) -> Self::Id;
}

/// Accès CRUD à une collection d'entités
pub trait Repository<R: Record> {
    fn list(&self) -> &[R];

    fn get(&self, id: R::Id) -> Result<&R, DBError>;

    fn get_mut(&mut self, id: R::Id) -> Result<&mut R, DBError>;

    /// Ajoute un enregistrement. Un identifiant déjà présent est refusé.
    fn create(&mut self, record: R) -> Result<R::Id, DBError>;

    /// Applique une modification en place et renvoie l'enregistrement modifié
    fn update<F>(&mut self, id: R::Id, change: F) -> Result<&R, DBError>
    where
        F: FnOnce(&mut R);

    fn remove(&mut self, id: R::Id) -> Result<R, DBError>;
}

/// Une table ordonnée par ordre d'insertion
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent, bound = "R: Record")]
pub struct Table<R> {
    rows: Vec<R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R: Record> Table<R> {
    fn position(&self, id: R::Id) -> Result<usize, DBError> {
        self.rows
            .iter()
            .position(|row| row.id() == id)
            .ok_or_else(|| not_found::<R>(id))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn not_found<R: Record>(id: R::Id) -> DBError {
    DBError::NotFound {
        kind: R::KIND,
        id: id.to_string(),
    }
}

impl<R: Record> Repository<R> for Table<R> {
    fn list(&self) -> &[R] {
        &self.rows
    }

    fn get(&self, id: R::Id) -> Result<&R, DBError> {
        self.rows
            .iter()
            .find(|row| row.id() == id)
            .ok_or_else(|| not_found::<R>(id))
    }

    fn get_mut(&mut self, id: R::Id) -> Result<&mut R, DBError> {
        self.rows
            .iter_mut()
            .find(|row| row.id() == id)
            .ok_or_else(|| not_found::<R>(id))
    }

    fn create(&mut self, record: R) -> Result<R::Id, DBError> {
        let id = record.id();
        if self.rows.iter().any(|row| row.id() == id) {
            return Err(DBError::DuplicateId {
                kind: R::KIND,
                id: id.to_string(),
            });
        }
        self.rows.push(record);
        Ok(id)
    }

    fn update<F>(&mut self, id: R::Id, change: F) -> Result<&R, DBError>
    where
        F: FnOnce(&mut R),
    {
        let row = self.get_mut(id)?;
        change(&mut *row);
        Ok(&*row)
    }

    fn remove(&mut self, id: R::Id) -> Result<R, DBError> {
        let index = self.position(id)?;
        Ok(self.rows.remove(index))
    }
}

impl Record for Member {
    type Id = MemberID;
    const KIND: &'static str = "Membre";

    fn id(&self) -> MemberID {
        self.id
    }
}

impl Record for CaseRecord {
    type Id = CaseID;
    const KIND: &'static str = "Cas";

    fn id(&self) -> CaseID {
        self.id
    }
}

impl Record for ResearchPaper {
    type Id = PaperID;
    const KIND: &'static str = "Article";

    fn id(&self) -> PaperID {
        self.id
    }
}

impl Record for FlaggedItem {
    type Id = FlagID;
    const KIND: &'static str = "Signalement";

    fn id(&self) -> FlagID {
        self.id
    }
}

impl Record for Conversation {
    type Id = ConversationID;
    const KIND: &'static str = "Conversation";

    fn id(&self) -> ConversationID {
        self.id
    }
}

#[derive(Serialize, Deserialize, Default)]
pub struct Database {
    #[serde(skip)]
    path: Option<PathBuf>,
    pub members: Table<Member>,
    pub cases: Table<CaseRecord>,
    pub papers: Table<ResearchPaper>,
    pub flags: Table<FlaggedItem>,
    pub conversations: Table<Conversation>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self, io::Error> {
        match File::open(&path) {
            // Fichier ouvert avec succès
            Ok(f) => {
                let mut db: Self = serde_json::from_reader(f)?;
                db.path = Some(path);
                Ok(db)
            }

            // Fichier non existant, on le crée
            Err(not_found) if not_found.kind() == NotFound => {
                info!("DB file not found, creating new empty DB");
                let mut new_db = Database::default();
                new_db.path = Some(path);

                // On vérifie la sauvegarde immédiatement pour diminuer le risque de perte de données
                new_db.save()?;
                Ok(new_db)
            }

            // Autre erreur d'IO, on s'arrête
            Err(other) => Err(other),
        }
    }

    pub fn save(&self) -> Result<(), io::Error> {
        if let Some(path) = &self.path {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, self)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
            && self.cases.is_empty()
            && self.papers.is_empty()
            && self.conversations.is_empty()
    }

    /// Remplace le contenu (par ex. par les données de démonstration)
    /// en conservant le fichier de sauvegarde
    pub fn replace_with(&mut self, other: Database) {
        let path = self.path.take();
        *self = other;
        self.path = path;
    }

    pub fn lookup_email(&self, email: &EmailAddress) -> Option<&Member> {
        self.members.list().iter().find(|member| &member.email == email)
    }

    pub fn lookup_isa(&self, isa: &IsaNumber) -> Option<&Member> {
        self.members.list().iter().find(|member| &member.isa_number == isa)
    }

    /// Ajoute un membre, en refusant une adresse ou un numéro ISA déjà utilisés
    pub fn store_member(&mut self, member: Member) -> Result<MemberID, DBError> {
        if self.lookup_email(&member.email).is_some() {
            return Err(DBError::EmailAlreadyRegistered(member.email));
        }
        if self.lookup_isa(&member.isa_number).is_some() {
            return Err(DBError::IsaAlreadyRegistered(member.isa_number));
        }
        self.members.create(member)
    }

    /// Conversation directe entre deux membres, si elle existe
    pub fn find_direct(&self, a: MemberID, b: MemberID) -> Option<&Conversation> {
        self.conversations.list().iter().find(|conversation| {
            conversation.topic == Topic::Direct
                && conversation.has_participant(a)
                && conversation.has_participant(b)
        })
    }

    /// Reporte le nouveau nom d'un membre sur les contenus qu'il a publiés
    /// et sur leurs signalements
    pub fn rename_author(&mut self, id: MemberID, old_name: &str, new_name: &str) {
        let mut authored = Vec::new();

        for case in self.cases.rows.iter_mut().filter(|case| case.author == id) {
            case.author_name = new_name.to_string();
            authored.push(ContentRef::Case(case.id));
        }
        for paper in self.papers.rows.iter_mut().filter(|paper| paper.submitted_by == id) {
            for author in paper.authors.iter_mut().filter(|author| *author == old_name) {
                *author = new_name.to_string();
            }
            authored.push(ContentRef::Paper(paper.id));
        }
        for flag in self
            .flags
            .rows
            .iter_mut()
            .filter(|flag| authored.contains(&flag.content) && flag.author == old_name)
        {
            flag.author = new_name.to_string();
        }
    }

    /// Supprime le contenu et ses conversations. Les signalements restent,
    /// c'est à la modération de les clore.
    pub fn remove_content(&mut self, content: ContentRef) -> Result<(), DBError> {
        let topic = match content {
            ContentRef::Case(id) => {
                self.cases.remove(id)?;
                Topic::Case(id)
            }
            ContentRef::Paper(id) => {
                self.papers.remove(id)?;
                Topic::Paper(id)
            }
        };
        self.conversations.rows.retain(|conversation| conversation.topic != topic);
        Ok(())
    }
}
