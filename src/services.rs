//! API du portail, et point d'entrée unique pour le contrôle d'accès.
//!
use std::io::Write;

use chrono::Utc;
use derive_more::Display;
use log::{info, warn};
use serde::Serialize;
use strum_macros::EnumIter;
use thiserror::Error;

use crate::authorization::{AccessDenied, Context, Enforcer};
use crate::db::{DBError, Database, Repository};
use crate::email::Outbox;
use crate::filter::{
    distinct_specialties, CaseFilter, ContactFilter, DirectoryFacets, DirectoryFilter, Filter,
    MemberSearch, PaperFilter,
};
use crate::forms::{self, CaseForm, CaseUpdate, PaperForm, ProfileUpdate, RegistrationForm};
use crate::guard::{self, Decision, Route};
use crate::models::{
    CaseID, CaseRecord, ContentRef, Conversation, ConversationID, FlagID, FlaggedItem, Member,
    MemberID, MessageBody, PaperID, ResearchPaper, Topic,
};
use crate::moderation::{ApprovalStatus, FlagStatus, Resolution, TransitionError};
use crate::otp::{CodePurpose, OtpError, OtpStore};
use crate::session::{Busy, SessionContext};
use crate::utils::input_validation::{short_text, EmailAddress, InvalidInput, IsaNumber, OtpCode};

pub struct Service {
    db: Database,
    enforcer: Enforcer,
    session: SessionContext,
    codes: OtpStore,
    outbox: Outbox,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    DBError(#[from] DBError),

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Code(#[from] OtpError),

    #[error(transparent)]
    Busy(#[from] Busy),

    #[error("Impossible d'ouvrir une conversation avec ce membre")]
    InvalidPeer,

    #[error("Une conversation directe s'ouvre avec un membre, pas un sujet")]
    NotATopic,

    #[error("Export impossible: {0}")]
    Export(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Code invalide ou utilisateur inconnu")]
    InvalidCredentials,

    #[error("Code invalide, {attempts_left} essai(s) restant(s)")]
    WrongCode { attempts_left: u8 },

    #[error("Trop d'essais, demandez un nouveau code")]
    TooManyAttempts,

    #[error("Votre inscription a été refusée")]
    Rejected,

    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    #[error(transparent)]
    Busy(#[from] Busy),
}

impl From<OtpError> for LoginError {
    fn from(error: OtpError) -> Self {
        match error {
            OtpError::Mismatch { attempts_left } => LoginError::WrongCode { attempts_left },
            OtpError::TooManyAttempts => LoginError::TooManyAttempts,
            OtpError::NoPendingCode | OtpError::Generation => LoginError::InvalidCredentials,
        }
    }
}

/// Les collections exportables depuis le panneau d'administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum ExportKind {
    #[display("Membres")]
    Members,
    #[display("Articles de recherche")]
    Papers,
    #[display("Cas")]
    Cases,
}

/// Statistiques du panneau d'administration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortalStats {
    pub total_members: usize,
    pub pending_approvals: usize,
    pub active_discussions: usize,
    pub research_papers: usize,
    pub pending_flags: usize,
    pub members_online: usize,
}

/// Membres listés par l'annuaire et la messagerie
fn is_listed(member: &Member) -> bool {
    member.is_approved() && !member.is_admin()
}

impl Service {
    pub fn new(db: Database, enforcer: Enforcer) -> Self {
        Self {
            db,
            enforcer,
            session: SessionContext::default(),
            codes: OtpStore::default(),
            outbox: Outbox::default(),
        }
    }

    pub fn save(&self) -> Result<(), std::io::Error> {
        self.db.save()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Les e-mails envoyés (codes à usage unique)
    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Obtient les données courantes de l'utilisateur connecté
    pub fn current_member(&self) -> Option<&Member> {
        self.db.members.get(self.session.member()?).ok()
    }

    /// Évalue la garde d'un écran pour l'utilisateur connecté
    pub fn guard(&self, route: Route) -> Decision {
        guard::guard(route, self.current_member())
    }

    fn current_id(&self) -> Result<MemberID, ServiceError> {
        self.session
            .member()
            .ok_or(ServiceError::AccessDenied(AccessDenied))
    }

    /// Crée un contexte d'autorisation ayant l'utilisateur connecté comme sujet
    fn enforce(&self) -> Result<Context<'_>, ServiceError> {
        let subject = self
            .current_member()
            .ok_or(ServiceError::AccessDenied(AccessDenied))?;

        Ok(self.enforcer.with_subject(subject))
    }

    /// Exécute une requête en levant l'indicateur de chargement. Une requête
    /// lancée pendant qu'une autre est en cours est refusée.
    fn with_loading<T, E>(
        &mut self,
        request: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<Busy>,
    {
        self.session.begin()?;
        let result = request(self);
        self.session.finish();
        result
    }

    // ------------------------------------------------------------------
    // Authentification

    /// Envoie un code de connexion. Une adresse inconnue ne reçoit rien,
    /// mais la demande réussit quand même.
    pub fn request_login_code(&mut self, email: &str) -> Result<(), ServiceError> {
        let email = EmailAddress::try_from(email)?;

        self.with_loading(|service| {
            if service.db.lookup_email(&email).is_none() {
                warn!("Login code requested for unknown address {email}");
                return Ok(());
            }

            let code = service.codes.issue(&email, CodePurpose::Login)?;
            service.outbox.send(
                &email,
                "Votre code de connexion",
                &format!("Votre code de connexion MedPortal est {code}"),
            );
            Ok(())
        })
    }

    /// Envoie un code de confirmation d'inscription, une fois l'adresse et
    /// le numéro ISA validés
    pub fn request_registration_code(&mut self, email: &str, isa: &str) -> Result<(), ServiceError> {
        let email = EmailAddress::try_from(email)?;
        let isa = IsaNumber::try_from(isa)?;

        self.with_loading(|service| {
            if service.db.lookup_email(&email).is_some() {
                return Err(DBError::EmailAlreadyRegistered(email.clone()).into());
            }
            if service.db.lookup_isa(&isa).is_some() {
                return Err(DBError::IsaAlreadyRegistered(isa.clone()).into());
            }

            let code = service.codes.issue(&email, CodePurpose::Registration)?;
            service.outbox.send(
                &email,
                "Confirmez votre inscription",
                &format!("Votre code d'inscription MedPortal est {code}"),
            );
            Ok(())
        })
    }

    /// Vérifie le code, et si il est correct, ouvre la session du membre.
    pub fn login(&mut self, email: &str, code: &str) -> Result<MemberID, LoginError> {
        let email = EmailAddress::try_from(email)?;
        let code = OtpCode::try_from(code)?;

        self.with_loading(|service| {
            service.codes.verify(&email, CodePurpose::Login, &code)?;

            let member = service
                .db
                .lookup_email(&email)
                .ok_or(LoginError::InvalidCredentials)?;

            if member.status == ApprovalStatus::Rejected {
                warn!("Rejected member {email} tried to log in");
                return Err(LoginError::Rejected);
            }

            let id = member.id;
            service
                .db
                .members
                .update(id, |member| member.online = true)
                .map_err(|_| LoginError::InvalidCredentials)?;
            service.session.open(id);

            info!("{email} logged in");
            Ok(id)
        })
    }

    /// Ferme la session
    pub fn logout(&mut self) {
        if let Some(session) = self.session.close() {
            if let Ok(member) = self.db.members.get_mut(session.member) {
                member.online = false;
            }
            info!("Member {} logged out", session.member);
        }
    }

    // ------------------------------------------------------------------
    // Inscription et profil

    /// Enregistre une demande d'inscription, en attente d'approbation.
    /// Aucune session n'est ouverte.
    pub fn register(&mut self, form: RegistrationForm, code: &str) -> Result<MemberID, ServiceError> {
        let code = OtpCode::try_from(code)?;

        self.with_loading(|service| {
            let member = form.into_member(Utc::now().date_naive())?;

            if service.db.lookup_email(&member.email).is_some() {
                return Err(DBError::EmailAlreadyRegistered(member.email).into());
            }

            service
                .codes
                .verify(&member.email, CodePurpose::Registration, &code)?;

            info!(
                "Registration of {} ({}) waiting for approval",
                member.full_name, member.email
            );
            Ok(service.db.store_member(member)?)
        })
    }

    /// Récupère le profil d'un membre
    pub fn member(&self, id: MemberID) -> Result<&Member, ServiceError> {
        let member = self.db.members.get(id)?;

        // Chacun voit son propre profil, même en attente d'approbation
        if self.current_id()? != id {
            self.enforce()?.browse()?;
        }
        Ok(member)
    }

    pub fn update_profile(&mut self, id: MemberID, update: ProfileUpdate) -> Result<(), ServiceError> {
        self.with_loading(|service| {
            let target = service.db.members.get(id)?;
            service.enforce()?.update_profile(target)?;

            let updated = update.apply_to(target)?;
            let old_name = target.full_name.clone();
            let new_name = updated.full_name.clone();
            service.db.members.update(id, |member| *member = updated)?;
            if old_name != new_name {
                service.db.rename_author(id, &old_name, &new_name);
            }

            info!("Profile of {id} updated");
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Annuaire, cas et articles

    pub fn directory(&self, filter: &DirectoryFilter) -> Result<Vec<&Member>, ServiceError> {
        self.enforce()?.browse()?;
        Ok(filter.apply(self.db.members.list().iter().filter(|m| is_listed(m))))
    }

    pub fn directory_facets(&self) -> Result<DirectoryFacets, ServiceError> {
        self.enforce()?.browse()?;
        Ok(DirectoryFacets::collect(
            self.db.members.list().iter().filter(|m| is_listed(m)),
        ))
    }

    pub fn cases(&self, filter: &CaseFilter) -> Result<Vec<&CaseRecord>, ServiceError> {
        self.enforce()?.browse()?;
        Ok(filter.apply(self.db.cases.list()))
    }

    /// Spécialités proposées par le sélecteur des discussions de cas
    pub fn case_specialties(&self) -> Result<Vec<String>, ServiceError> {
        self.enforce()?.browse()?;
        Ok(distinct_specialties(
            self.db.cases.list().iter().map(|case| case.specialty.as_str()),
        ))
    }

    pub fn case(&self, id: CaseID) -> Result<&CaseRecord, ServiceError> {
        self.enforce()?.browse()?;
        Ok(self.db.cases.get(id)?)
    }

    pub fn papers(&self, filter: &PaperFilter) -> Result<Vec<&ResearchPaper>, ServiceError> {
        self.enforce()?.browse()?;
        Ok(filter.apply(self.db.papers.list()))
    }

    pub fn paper_specialties(&self) -> Result<Vec<String>, ServiceError> {
        self.enforce()?.browse()?;
        Ok(distinct_specialties(
            self.db.papers.list().iter().map(|paper| paper.specialty.as_str()),
        ))
    }

    pub fn paper(&self, id: PaperID) -> Result<&ResearchPaper, ServiceError> {
        self.enforce()?.browse()?;
        Ok(self.db.papers.get(id)?)
    }

    // ------------------------------------------------------------------
    // Publication

    pub fn submit_case(&mut self, form: CaseForm) -> Result<CaseID, ServiceError> {
        self.enforce()?.submit_content()?;
        let author = self
            .current_member()
            .ok_or(ServiceError::AccessDenied(AccessDenied))?;

        let case = form.into_case(author, Utc::now().date_naive())?;
        info!("Case '{}' submitted by {}", case.title, case.author_name);
        Ok(self.db.cases.create(case)?)
    }

    /// Modifie un cas; réservé à son auteur et aux administrateurs
    pub fn update_case(&mut self, id: CaseID, update: CaseUpdate) -> Result<(), ServiceError> {
        let case = self.db.cases.get(id)?;
        self.enforce()?.update_case(case)?;

        let updated = update.apply_to(case)?;
        self.db.cases.update(id, |case| *case = updated)?;

        info!("Case {id} updated");
        Ok(())
    }

    pub fn add_case_images(&mut self, id: CaseID, images: &[String]) -> Result<(), ServiceError> {
        let case = self.db.cases.get(id)?;
        self.enforce()?.update_case(case)?;

        let mut images = forms::case_images(images)?;
        self.db.cases.update(id, |case| case.images.append(&mut images))?;

        info!("Images added to case {id}");
        Ok(())
    }

    /// Marque un cas comme résolu. Un cas résolu le reste.
    pub fn mark_case_solved(&mut self, id: CaseID) -> Result<(), ServiceError> {
        let case = self.db.cases.get(id)?;
        self.enforce()?.update_case(case)?;

        self.db.cases.update(id, |case| case.solved = true)?;
        info!("Case {id} marked as solved");
        Ok(())
    }

    pub fn record_case_view(&mut self, id: CaseID) -> Result<u32, ServiceError> {
        self.enforce()?.browse()?;
        let case = self
            .db
            .cases
            .update(id, |case| case.views = case.views.saturating_add(1))?;
        Ok(case.views)
    }

    pub fn submit_paper(&mut self, form: PaperForm) -> Result<PaperID, ServiceError> {
        self.enforce()?.submit_content()?;
        let submitter = self.current_id()?;

        let paper = form.into_paper(submitter, Utc::now().date_naive())?;
        info!("Paper '{}' submitted by {submitter}", paper.title);
        Ok(self.db.papers.create(paper)?)
    }

    /// Compte un téléchargement et renvoie le lien du document
    pub fn record_paper_download(&mut self, id: PaperID) -> Result<String, ServiceError> {
        self.enforce()?.browse()?;
        let paper = self
            .db
            .papers
            .update(id, |paper| paper.downloads = paper.downloads.saturating_add(1))?;
        Ok(paper.pdf_url.clone())
    }

    // ------------------------------------------------------------------
    // Signalements

    fn own_pending_flag(&self, content: ContentRef, reporter: MemberID) -> Option<FlagID> {
        self.db
            .flags
            .list()
            .iter()
            .find(|flag| {
                flag.content == content && flag.reported_by == reporter && flag.status.is_pending()
            })
            .map(|flag| flag.id)
    }

    /// Vrai si l'utilisateur connecté a un signalement en attente sur ce contenu
    pub fn has_flagged(&self, content: ContentRef) -> bool {
        self.session
            .member()
            .and_then(|me| self.own_pending_flag(content, me))
            .is_some()
    }

    /// Signale un contenu, ou retire son propre signalement encore en
    /// attente. Renvoie vrai si le contenu est maintenant signalé.
    pub fn toggle_flag(&mut self, content: ContentRef, reason: &str) -> Result<bool, ServiceError> {
        self.enforce()?.flag_content()?;
        let reporter = self.current_id()?;

        if let Some(flag) = self.own_pending_flag(content, reporter) {
            self.db.flags.remove(flag)?;
            info!("Flag on {content} withdrawn by {reporter}");
            return Ok(false);
        }

        let (title, author) = match content {
            ContentRef::Case(id) => {
                let case = self.db.cases.get(id)?;
                (case.title.clone(), case.author_name.clone())
            }
            ContentRef::Paper(id) => {
                let paper = self.db.papers.get(id)?;
                (paper.title.clone(), paper.authors.join(", "))
            }
        };

        let flag = FlaggedItem {
            id: FlagID::new(),
            content,
            title,
            author,
            reported_by: reporter,
            reason: short_text("reason", reason)?,
            date: Utc::now().date_naive(),
            status: FlagStatus::Pending,
        };
        info!("{content} '{}' flagged by {reporter}", flag.title);
        self.db.flags.create(flag)?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Messagerie

    /// Les conversations de l'utilisateur connecté
    pub fn conversations(&self) -> Result<Vec<&Conversation>, ServiceError> {
        let me = self.current_id()?;
        self.enforce()?.browse()?;
        Ok(self
            .db
            .conversations
            .list()
            .iter()
            .filter(|conversation| conversation.has_participant(me))
            .collect())
    }

    /// Les membres avec qui ouvrir une conversation
    pub fn contacts(&self, filter: &ContactFilter) -> Result<Vec<&Member>, ServiceError> {
        let me = self.current_id()?;
        self.enforce()?.browse()?;
        Ok(filter.apply(
            self.db
                .members
                .list()
                .iter()
                .filter(|member| member.id != me && is_listed(member)),
        ))
    }

    /// Retrouve ou crée la conversation directe avec un membre
    pub fn open_direct(&mut self, peer: MemberID) -> Result<ConversationID, ServiceError> {
        self.enforce()?.browse()?;
        let me = self.current_id()?;

        let peer_member = self.db.members.get(peer)?;
        if peer == me || !peer_member.is_approved() {
            return Err(ServiceError::InvalidPeer);
        }

        if let Some(conversation) = self.db.find_direct(me, peer) {
            return Ok(conversation.id);
        }

        let id = self
            .db
            .conversations
            .create(Conversation::new(Topic::Direct, vec![me, peer]))?;
        info!("Direct conversation {id} opened between {me} and {peer}");
        Ok(id)
    }

    /// Retrouve ou crée la discussion d'un cas ou d'un article, et y ajoute
    /// l'utilisateur connecté
    pub fn open_topic(&mut self, topic: Topic) -> Result<ConversationID, ServiceError> {
        self.enforce()?.browse()?;
        let me = self.current_id()?;

        match topic {
            Topic::Direct => return Err(ServiceError::NotATopic),
            Topic::Case(id) => {
                self.db.cases.get(id)?;
            }
            Topic::Paper(id) => {
                self.db.papers.get(id)?;
            }
        }

        let existing = self
            .db
            .conversations
            .list()
            .iter()
            .find(|conversation| conversation.topic == topic)
            .map(|conversation| conversation.id);

        let id = match existing {
            Some(id) => {
                self.db.conversations.update(id, |conversation| {
                    conversation.join(me);
                })?;
                id
            }
            None => {
                let id = self
                    .db
                    .conversations
                    .create(Conversation::new(topic, vec![me]))?;
                info!("Topic conversation {id} opened for {topic:?}");
                id
            }
        };
        Ok(id)
    }

    pub fn conversation(&self, id: ConversationID) -> Result<&Conversation, ServiceError> {
        let conversation = self.db.conversations.get(id)?;
        self.enforce()?.read_conversation(conversation)?;
        Ok(conversation)
    }

    fn send(&mut self, id: ConversationID, body: MessageBody) -> Result<u32, ServiceError> {
        let sender = self.current_id()?;
        let conversation = self.db.conversations.get(id)?;
        self.enforce()?.post_message(conversation)?;

        Ok(self.db.conversations.get_mut(id)?.post(sender, body))
    }

    pub fn send_text(&mut self, id: ConversationID, text: &str) -> Result<u32, ServiceError> {
        let body = MessageBody::text(text)?;
        self.send(id, body)
    }

    pub fn send_file(
        &mut self,
        id: ConversationID,
        name: &str,
        link: &str,
    ) -> Result<u32, ServiceError> {
        let body = MessageBody::file(name, link)?;
        self.send(id, body)
    }

    /// Accuse réception des messages des autres participants
    pub fn mark_seen(&mut self, id: ConversationID) -> Result<usize, ServiceError> {
        let me = self.current_id()?;
        let conversation = self.db.conversations.get(id)?;
        self.enforce()?.read_conversation(conversation)?;

        Ok(self.db.conversations.get_mut(id)?.mark_seen(me))
    }

    pub fn unread_count(&self, id: ConversationID) -> Result<usize, ServiceError> {
        let me = self.current_id()?;
        Ok(self.conversation(id)?.unread_count(me))
    }

    // ------------------------------------------------------------------
    // Administration

    pub fn pending_members(&self) -> Result<Vec<&Member>, ServiceError> {
        self.enforce()?.admin_panel()?;
        Ok(self
            .db
            .members
            .list()
            .iter()
            .filter(|member| member.status == ApprovalStatus::Pending)
            .collect())
    }

    fn moderate(
        &mut self,
        id: MemberID,
        transition: fn(ApprovalStatus) -> Result<ApprovalStatus, TransitionError>,
    ) -> Result<ApprovalStatus, ServiceError> {
        let target = self.db.members.get(id)?;
        self.enforce()?.moderate_member(target)?;

        let status = transition(target.status)?;
        self.db.members.update(id, |member| member.status = status)?;
        Ok(status)
    }

    pub fn approve_member(&mut self, id: MemberID) -> Result<(), ServiceError> {
        self.moderate(id, ApprovalStatus::approve)?;
        info!("Member {id} approved");
        Ok(())
    }

    pub fn reject_member(&mut self, id: MemberID) -> Result<(), ServiceError> {
        self.moderate(id, ApprovalStatus::reject)?;
        info!("Member {id} rejected");
        Ok(())
    }

    pub fn pending_flags(&self) -> Result<Vec<&FlaggedItem>, ServiceError> {
        self.enforce()?.admin_panel()?;
        Ok(self
            .db
            .flags
            .list()
            .iter()
            .filter(|flag| flag.status.is_pending())
            .collect())
    }

    /// Traite un signalement. Un contenu retiré est supprimé, et les autres
    /// signalements en attente sur ce contenu sont clos avec lui.
    pub fn resolve_flag(&mut self, id: FlagID, resolution: Resolution) -> Result<(), ServiceError> {
        self.enforce()?.resolve_flag()?;

        let flag = self.db.flags.get(id)?;
        let content = flag.content;
        let status = flag.status.resolve(resolution)?;
        self.db.flags.update(id, |flag| flag.status = status)?;
        info!("Flag {id} on {content} resolved: {resolution:?}");

        if resolution == Resolution::Removed {
            if let Err(error) = self.db.remove_content(content) {
                warn!("Flagged content already gone: {error}");
            }

            let siblings: Vec<FlagID> = self
                .db
                .flags
                .list()
                .iter()
                .filter(|flag| flag.content == content && flag.status.is_pending())
                .map(|flag| flag.id)
                .collect();
            for sibling in siblings {
                self.db.flags.update(sibling, |flag| flag.status = status)?;
            }
        }
        Ok(())
    }

    pub fn search_members(&self, search: &MemberSearch) -> Result<Vec<&Member>, ServiceError> {
        self.enforce()?.admin_panel()?;
        Ok(search.apply(self.db.members.list()))
    }

    pub fn stats(&self) -> Result<PortalStats, ServiceError> {
        self.enforce()?.admin_panel()?;
        let members = self.db.members.list();

        Ok(PortalStats {
            total_members: members.len(),
            pending_approvals: members
                .iter()
                .filter(|member| member.status == ApprovalStatus::Pending)
                .count(),
            active_discussions: self
                .db
                .conversations
                .list()
                .iter()
                .filter(|conversation| !conversation.messages.is_empty())
                .count(),
            research_papers: self.db.papers.len(),
            pending_flags: self
                .db
                .flags
                .list()
                .iter()
                .filter(|flag| flag.status.is_pending())
                .count(),
            members_online: members.iter().filter(|member| member.online).count(),
        })
    }

    /// Exporte une collection en JSON
    pub fn export<W: Write>(&self, kind: ExportKind, writer: W) -> Result<(), ServiceError> {
        self.enforce()?.admin_panel()?;

        match kind {
            ExportKind::Members => serde_json::to_writer_pretty(writer, self.db.members.list())?,
            ExportKind::Papers => serde_json::to_writer_pretty(writer, self.db.papers.list())?,
            ExportKind::Cases => serde_json::to_writer_pretty(writer, self.db.cases.list())?,
        }
        info!("{kind} exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Selection, TextQuery};
    use crate::models::{CaseType, Location, PaperCategory};
    use crate::seed::{self, ADMIN_EMAIL, DEMO_MEMBER_EMAIL};

    const SARAH: &str = "sarah.johnson@email.com";
    const MICHAEL: &str = "michael.chen@email.com";
    const PENDING: &str = "amanda.foster@email.com";

    fn service() -> Service {
        let enforcer = Enforcer::load().expect("Error in loading Enforcer");
        Service::new(seed::demo_database(), enforcer)
    }

    /// The code carried by the last e-mail sent to `email`
    fn last_code(service: &Service, email: &str) -> String {
        let address = EmailAddress::try_from(email).unwrap();
        let message = service.outbox().last_to(&address).expect("No e-mail sent");
        message.body.split_whitespace().last().unwrap().to_string()
    }

    fn login_as(service: &mut Service, email: &str) -> MemberID {
        service.request_login_code(email).unwrap();
        let code = last_code(service, email);
        service.login(email, &code).unwrap()
    }

    fn member_id(service: &Service, email: &str) -> MemberID {
        let address = EmailAddress::try_from(email).unwrap();
        service.db.lookup_email(&address).unwrap().id
    }

    fn registration_form(email: &str) -> RegistrationForm {
        RegistrationForm {
            full_name: "Dr. Nadia Haddad".to_string(),
            email: EmailAddress::try_from(email).unwrap(),
            gender: "Female".to_string(),
            date_of_birth: None,
            specialization: vec!["Endocrinology".to_string()],
            qualifications: "MD".to_string(),
            contact_number: "+1-555-0199".to_string(),
            clinic: "Lakeside Diabetes Center".to_string(),
            location: Location {
                city: "Seattle".to_string(),
                state: "WA".to_string(),
                country: "USA".to_string(),
            },
            years_of_experience: 9,
            registration_number: "WA556677".to_string(),
            isa_number: IsaNumber::try_from("N4821").unwrap(),
        }
    }

    fn case_form() -> CaseForm {
        CaseForm {
            title: "Resistant hypertension in a young athlete".to_string(),
            description: "Blood pressure above target despite three agents.".to_string(),
            specialty: "Cardiology".to_string(),
            case_type: CaseType::Clinical,
            diagnosis: String::new(),
            outcome: String::new(),
            tags: vec!["hypertension".to_string()],
            images: vec![],
        }
    }

    mod authentication {
        use super::*;

        #[test]
        fn test_login_with_emailed_code() {
            let mut service = service();
            let id = login_as(&mut service, DEMO_MEMBER_EMAIL);

            assert_eq!(service.session().member(), Some(id));
            assert!(service.current_member().unwrap().online);
            assert!(!service.session().is_loading());
        }

        #[test]
        fn test_unknown_email_gets_no_code() {
            let mut service = service();

            assert!(service.request_login_code("nobody@email.com").is_ok());
            assert!(service.outbox().is_empty());
            assert!(matches!(
                service.login("nobody@email.com", "123456"),
                Err(LoginError::InvalidCredentials)
            ));
        }

        #[test]
        fn test_code_format_checked_first() {
            let mut service = service();
            service.request_login_code(DEMO_MEMBER_EMAIL).unwrap();

            assert!(matches!(
                service.login(DEMO_MEMBER_EMAIL, "12ab56"),
                Err(LoginError::InvalidInput(InvalidInput::OtpCode))
            ));
            // Un code mal formé ne consomme pas d'essai
            let code = last_code(&service, DEMO_MEMBER_EMAIL);
            assert!(service.login(DEMO_MEMBER_EMAIL, &code).is_ok());
        }

        #[test]
        fn test_code_is_single_use() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let code = last_code(&service, DEMO_MEMBER_EMAIL);
            service.logout();

            assert!(matches!(
                service.login(DEMO_MEMBER_EMAIL, &code),
                Err(LoginError::InvalidCredentials)
            ));
        }

        #[test]
        fn test_three_wrong_codes_kill_the_code() {
            let mut service = service();
            service.request_login_code(DEMO_MEMBER_EMAIL).unwrap();
            let code = last_code(&service, DEMO_MEMBER_EMAIL);
            let wrong = if code == "000000" { "111111" } else { "000000" };

            assert!(matches!(
                service.login(DEMO_MEMBER_EMAIL, wrong),
                Err(LoginError::WrongCode { attempts_left: 2 })
            ));
            assert!(matches!(
                service.login(DEMO_MEMBER_EMAIL, wrong),
                Err(LoginError::WrongCode { attempts_left: 1 })
            ));
            assert!(matches!(
                service.login(DEMO_MEMBER_EMAIL, wrong),
                Err(LoginError::TooManyAttempts)
            ));
            assert!(service.login(DEMO_MEMBER_EMAIL, &code).is_err());
        }

        #[test]
        fn test_rejected_member_cannot_log_in() {
            let mut service = service();
            let pending = member_id(&service, PENDING);
            login_as(&mut service, ADMIN_EMAIL);
            service.reject_member(pending).unwrap();
            service.logout();

            service.request_login_code(PENDING).unwrap();
            let code = last_code(&service, PENDING);
            assert!(matches!(service.login(PENDING, &code), Err(LoginError::Rejected)));
            assert!(service.session().current().is_none());
        }

        #[test]
        fn test_logout_tears_down_session() {
            let mut service = service();
            let id = login_as(&mut service, DEMO_MEMBER_EMAIL);
            service.logout();

            assert!(service.session().current().is_none());
            assert!(!service.db.members.get(id).unwrap().online);
            assert_eq!(service.guard(Route::Dashboard), Decision::Redirect(Route::Login));
        }

        #[test]
        fn test_reentrant_request_is_refused() {
            let mut service = service();
            service.request_login_code(DEMO_MEMBER_EMAIL).unwrap();
            let code = last_code(&service, DEMO_MEMBER_EMAIL);

            let nested = service.with_loading(|service| {
                Ok::<_, LoginError>(service.login(DEMO_MEMBER_EMAIL, &code))
            });
            assert!(matches!(nested, Ok(Err(LoginError::Busy(Busy)))));

            // Le drapeau est retombé, et le code n'a pas été consommé
            assert!(!service.session().is_loading());
            assert!(service.login(DEMO_MEMBER_EMAIL, &code).is_ok());
        }
    }

    mod registration {
        use super::*;

        const NEW: &str = "nadia.haddad@email.com";

        #[test]
        fn test_register_creates_pending_member() {
            let mut service = service();
            service.request_registration_code(NEW, "N4821").unwrap();
            let code = last_code(&service, NEW);

            let id = service.register(registration_form(NEW), &code).unwrap();

            let member = service.db.members.get(id).unwrap();
            assert_eq!(member.status, ApprovalStatus::Pending);
            assert!(service.session().current().is_none());

            // Le membre en attente est dirigé vers l'écran d'attente
            login_as(&mut service, NEW);
            assert_eq!(
                service.guard(Route::Dashboard),
                Decision::Redirect(Route::WaitingApproval)
            );
            assert!(service.directory(&DirectoryFilter::default()).is_err());
        }

        #[test]
        fn test_registration_code_needs_valid_identifiers() {
            let mut service = service();

            assert!(matches!(
                service.request_registration_code(NEW, "AB123"),
                Err(ServiceError::InvalidInput(InvalidInput::IsaNumber))
            ));
            assert!(matches!(
                service.request_registration_code("not-an-email", "N4821"),
                Err(ServiceError::InvalidInput(InvalidInput::Email))
            ));
            assert!(service.outbox().is_empty());
        }

        #[test]
        fn test_known_email_cannot_register() {
            let mut service = service();
            assert!(matches!(
                service.request_registration_code(SARAH, "S1234"),
                Err(ServiceError::DBError(DBError::EmailAlreadyRegistered(_)))
            ));
        }

        #[test]
        fn test_known_isa_number_cannot_register() {
            let mut service = service();
            let taken = service
                .db
                .lookup_email(&EmailAddress::try_from(DEMO_MEMBER_EMAIL).unwrap())
                .unwrap()
                .isa_number
                .to_string();

            assert!(matches!(
                service.request_registration_code(NEW, &taken),
                Err(ServiceError::DBError(DBError::IsaAlreadyRegistered(_)))
            ));
            assert!(service.outbox().is_empty());
        }

        #[test]
        fn test_login_code_cannot_register() {
            let mut service = service();
            service.request_registration_code(NEW, "N4821").unwrap();
            assert!(matches!(
                service.register(registration_form(NEW), "12345"),
                Err(ServiceError::InvalidInput(InvalidInput::OtpCode))
            ));

            // Un code d'un autre usage est refusé
            service.request_login_code(DEMO_MEMBER_EMAIL).unwrap();
            let code = last_code(&service, DEMO_MEMBER_EMAIL);
            assert!(matches!(
                service.register(registration_form(NEW), &code),
                Err(ServiceError::Code(_))
            ));
        }
    }

    mod profile {
        use super::*;

        #[test]
        fn test_update_own_profile() {
            let mut service = service();
            let me = login_as(&mut service, DEMO_MEMBER_EMAIL);

            let update = ProfileUpdate {
                clinic: Some("Riverside Clinic".to_string()),
                ..Default::default()
            };
            service.update_profile(me, update).unwrap();

            assert_eq!(service.member(me).unwrap().clinic, "Riverside Clinic");
            assert!(!service.session().is_loading());
        }

        #[test]
        fn test_cannot_update_someone_else() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let sarah = member_id(&service, SARAH);

            let update = ProfileUpdate {
                clinic: Some("Elsewhere".to_string()),
                ..Default::default()
            };
            assert!(matches!(
                service.update_profile(sarah, update.clone()),
                Err(ServiceError::AccessDenied(_))
            ));

            service.logout();
            login_as(&mut service, ADMIN_EMAIL);
            assert!(service.update_profile(sarah, update).is_ok());
        }

        #[test]
        fn test_new_name_shows_on_own_cases() {
            let mut service = service();
            let me = login_as(&mut service, DEMO_MEMBER_EMAIL);

            let update = ProfileUpdate {
                full_name: Some("Dr. John A. Doe".to_string()),
                ..Default::default()
            };
            service.update_profile(me, update).unwrap();

            let mine: Vec<&CaseRecord> = service
                .cases(&CaseFilter::default())
                .unwrap()
                .into_iter()
                .filter(|case| case.author == me)
                .collect();
            assert!(!mine.is_empty());
            assert!(mine.iter().all(|case| case.author_name == "Dr. John A. Doe"));
        }

        #[test]
        fn test_failed_update_changes_nothing() {
            let mut service = service();
            let me = login_as(&mut service, DEMO_MEMBER_EMAIL);
            let before = service.member(me).unwrap().clone();

            let update = ProfileUpdate {
                clinic: Some("New Clinic".to_string()),
                full_name: Some("  ".to_string()),
                ..Default::default()
            };
            assert!(service.update_profile(me, update).is_err());
            assert_eq!(service.member(me).unwrap().clinic, before.clinic);
        }
    }

    mod browsing {
        use super::*;

        #[test]
        fn test_anonymous_cannot_browse() {
            let service = service();
            assert!(matches!(
                service.directory(&DirectoryFilter::default()),
                Err(ServiceError::AccessDenied(_))
            ));
            assert!(service.cases(&CaseFilter::default()).is_err());
        }

        #[test]
        fn test_directory_lists_approved_members() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);

            let listed = service.directory(&DirectoryFilter::default()).unwrap();
            // Le membre de démonstration et les cinq médecins, sans l'administrateur
            assert_eq!(listed.len(), 6);
            assert!(listed.iter().all(|member| is_listed(member)));

            let filter = DirectoryFilter {
                specialty: Selection::Only("Neurology".to_string()),
                ..Default::default()
            };
            let neurologists = service.directory(&filter).unwrap();
            assert_eq!(neurologists.len(), 1);
            assert_eq!(neurologists[0].full_name, "Dr. Michael Chen");
        }

        #[test]
        fn test_facets() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);

            let facets = service.directory_facets().unwrap();
            assert!(facets.specialties.contains(&"Cardiology".to_string()));
            assert!(facets.locations.contains(&"Houston, TX".to_string()));

            assert_eq!(
                service.case_specialties().unwrap(),
                vec!["Cardiology", "Surgery", "Pediatrics", "Internal Medicine"]
            );
            assert_eq!(
                service.paper_specialties().unwrap(),
                vec!["Cardiology", "Neurology", "Pediatrics", "Oncology"]
            );
        }

        #[test]
        fn test_case_and_paper_filters() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);

            let filter = CaseFilter {
                case_type: Selection::Only(CaseType::MedicoLegal),
                ..Default::default()
            };
            let cases = service.cases(&filter).unwrap();
            assert_eq!(cases.len(), 1);
            assert!(cases[0].title.contains("Informed Consent"));

            let filter = PaperFilter {
                category: Selection::Only(PaperCategory::ReviewArticle),
                query: TextQuery::new("oncology"),
                ..Default::default()
            };
            let papers = service.papers(&filter).unwrap();
            assert_eq!(papers.len(), 1);
        }

        #[test]
        fn test_views_and_downloads_are_counted() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);

            let case = service.cases(&CaseFilter::default()).unwrap()[0].clone();
            assert_eq!(service.record_case_view(case.id).unwrap(), case.views + 1);

            let paper = service.papers(&PaperFilter::default()).unwrap()[0].clone();
            assert_eq!(service.record_paper_download(paper.id).unwrap(), paper.pdf_url);
            assert_eq!(service.paper(paper.id).unwrap().downloads, paper.downloads + 1);
        }
    }

    mod content {
        use super::*;

        #[test]
        fn test_submit_and_edit_case() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);

            let id = service.submit_case(case_form()).unwrap();
            assert_eq!(service.case(id).unwrap().author_name, "Dr. John Doe");

            let update = CaseUpdate {
                diagnosis: Some("Primary aldosteronism".to_string()),
                ..Default::default()
            };
            service.update_case(id, update).unwrap();
            service
                .add_case_images(id, &["https://images.example.com/ct.png".to_string()])
                .unwrap();
            service.mark_case_solved(id).unwrap();
            service.mark_case_solved(id).unwrap();

            let case = service.case(id).unwrap();
            assert_eq!(case.diagnosis, "Primary aldosteronism");
            assert_eq!(case.images.len(), 1);
            assert!(case.solved);
        }

        #[test]
        fn test_only_author_edits_case() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let id = service.submit_case(case_form()).unwrap();
            service.logout();

            login_as(&mut service, SARAH);
            assert!(matches!(
                service.mark_case_solved(id),
                Err(ServiceError::AccessDenied(_))
            ));
            assert!(!service.case(id).unwrap().solved);
        }

        #[test]
        fn test_submit_paper() {
            let mut service = service();
            let me = login_as(&mut service, SARAH);
            let before = service.papers(&PaperFilter::default()).unwrap().len();

            let id = service
                .submit_paper(PaperForm {
                    title: "Wearables and atrial fibrillation screening".to_string(),
                    authors: vec!["Dr. Sarah Johnson".to_string()],
                    summary: "Prospective cohort of smartwatch users.".to_string(),
                    category: PaperCategory::ClinicalResearch,
                    specialty: "Cardiology".to_string(),
                    tags: vec![],
                    images: vec![],
                    pdf_url: "https://papers.example.com/wearables.pdf".to_string(),
                })
                .unwrap();

            assert_eq!(service.paper(id).unwrap().submitted_by, me);
            assert_eq!(service.papers(&PaperFilter::default()).unwrap().len(), before + 1);
        }

        #[test]
        fn test_flag_toggle_round_trip() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let case = ContentRef::Case(service.cases(&CaseFilter::default()).unwrap()[0].id);
            let flags_before = service.db.flags.len();

            assert!(service.toggle_flag(case, "Missing consent").unwrap());
            assert!(service.has_flagged(case));
            assert_eq!(service.db.flags.len(), flags_before + 1);

            assert!(!service.toggle_flag(case, "").unwrap());
            assert!(!service.has_flagged(case));
            assert_eq!(service.db.flags.len(), flags_before);
        }
    }

    mod messaging {
        use super::*;

        #[test]
        fn test_direct_conversation_is_reused() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let sarah = member_id(&service, SARAH);

            let first = service.open_direct(sarah).unwrap();
            let second = service.open_direct(sarah).unwrap();
            assert_eq!(first, second);
            assert_eq!(service.conversations().unwrap().len(), 1);
        }

        #[test]
        fn test_case_discussion_receipts_are_per_reader() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let case = service.cases(&CaseFilter::default()).unwrap()[0].id;
            let id = service.open_topic(Topic::Case(case)).unwrap();
            service.send_text(id, "Any thoughts on the ECG?").unwrap();
            service.logout();

            login_as(&mut service, SARAH);
            assert_eq!(service.open_topic(Topic::Case(case)).unwrap(), id);
            assert_eq!(service.mark_seen(id).unwrap(), 1);
            service.logout();

            login_as(&mut service, MICHAEL);
            service.open_topic(Topic::Case(case)).unwrap();
            assert_eq!(service.unread_count(id).unwrap(), 1, "Michael has not read it yet");
            assert!(!service.conversation(id).unwrap().last_message().unwrap().seen);

            service.mark_seen(id).unwrap();
            assert!(service.conversation(id).unwrap().last_message().unwrap().seen);
        }

        #[test]
        fn test_send_and_acknowledge() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let sarah = member_id(&service, SARAH);
            let id = service.open_direct(sarah).unwrap();

            // Le dernier message de Sarah n'a pas encore été lu
            assert_eq!(service.unread_count(id).unwrap(), 1);
            assert_eq!(service.mark_seen(id).unwrap(), 1);
            assert_eq!(service.unread_count(id).unwrap(), 0);

            assert_eq!(service.send_text(id, "See you at the conference").unwrap(), 4);
            assert_eq!(
                service
                    .send_file(id, "guidelines.pdf", "https://files.example.com/g.pdf")
                    .unwrap(),
                5
            );
            assert!(matches!(
                service.send_text(id, "   "),
                Err(ServiceError::InvalidInput(InvalidInput::Missing("message")))
            ));

            let last = service.conversation(id).unwrap().last_message().unwrap();
            assert!(last.delivered);
            assert!(!last.seen);

            service.logout();
            login_as(&mut service, SARAH);
            assert_eq!(service.unread_count(id).unwrap(), 2);
        }

        #[test]
        fn test_outsider_cannot_read() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let sarah = member_id(&service, SARAH);
            let id = service.open_direct(sarah).unwrap();
            service.logout();

            login_as(&mut service, MICHAEL);
            assert!(matches!(
                service.conversation(id),
                Err(ServiceError::AccessDenied(_))
            ));
            assert!(service.send_text(id, "Hello").is_err());
        }

        #[test]
        fn test_invalid_peers() {
            let mut service = service();
            let me = login_as(&mut service, DEMO_MEMBER_EMAIL);
            let pending = member_id(&service, PENDING);

            assert!(matches!(service.open_direct(me), Err(ServiceError::InvalidPeer)));
            assert!(matches!(service.open_direct(pending), Err(ServiceError::InvalidPeer)));
            assert!(matches!(
                service.open_topic(Topic::Direct),
                Err(ServiceError::NotATopic)
            ));
        }

        #[test]
        fn test_topic_conversation_gathers_posters() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let case = service.cases(&CaseFilter::default()).unwrap()[0].id;
            let id = service.open_topic(Topic::Case(case)).unwrap();
            service.send_text(id, "Was an ablation considered?").unwrap();
            service.logout();

            login_as(&mut service, SARAH);
            assert!(service.conversation(id).is_err());
            assert_eq!(service.open_topic(Topic::Case(case)).unwrap(), id);
            assert_eq!(service.unread_count(id).unwrap(), 1);
            assert_eq!(service.conversation(id).unwrap().participants.len(), 2);
        }

        #[test]
        fn test_contacts_search() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);

            let everyone = service.contacts(&ContactFilter::default()).unwrap();
            assert_eq!(everyone.len(), 5);

            let filter = ContactFilter {
                query: TextQuery::new("dermatology"),
            };
            let found = service.contacts(&filter).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].full_name, "Dr. Lisa Park");
        }
    }

    mod admin {
        use super::*;

        #[test]
        fn test_member_cannot_moderate() {
            let mut service = service();
            login_as(&mut service, DEMO_MEMBER_EMAIL);
            let pending = member_id(&service, PENDING);

            assert!(matches!(
                service.approve_member(pending),
                Err(ServiceError::AccessDenied(_))
            ));
            assert!(service.pending_members().is_err());
            assert!(service.stats().is_err());
            assert_eq!(service.guard(Route::Admin), Decision::Redirect(Route::Dashboard));
        }

        #[test]
        fn test_approval_is_terminal() {
            let mut service = service();
            login_as(&mut service, ADMIN_EMAIL);
            let pending = member_id(&service, PENDING);
            assert_eq!(service.pending_members().unwrap().len(), 2);

            service.approve_member(pending).unwrap();
            assert_eq!(service.pending_members().unwrap().len(), 1);
            assert!(matches!(
                service.reject_member(pending),
                Err(ServiceError::Transition(_))
            ));
            assert!(service.db.members.get(pending).unwrap().is_approved());
        }

        #[test]
        fn test_removed_flag_deletes_content() {
            let mut service = service();
            login_as(&mut service, ADMIN_EMAIL);

            let flag = service.pending_flags().unwrap()[0].clone();
            service.resolve_flag(flag.id, Resolution::Removed).unwrap();

            match flag.content {
                ContentRef::Case(id) => assert!(service.db.cases.get(id).is_err()),
                ContentRef::Paper(id) => assert!(service.db.papers.get(id).is_err()),
            }
            assert_eq!(service.pending_flags().unwrap().len(), 1);
            assert!(matches!(
                service.resolve_flag(flag.id, Resolution::Approved),
                Err(ServiceError::Transition(_))
            ));
        }

        #[test]
        fn test_approved_flag_keeps_content() {
            let mut service = service();
            login_as(&mut service, ADMIN_EMAIL);
            let papers = service.db.papers.len();
            let cases = service.db.cases.len();

            let pending: Vec<FlagID> = service
                .pending_flags()
                .unwrap()
                .into_iter()
                .map(|flag| flag.id)
                .collect();
            for flag in pending {
                service.resolve_flag(flag, Resolution::Approved).unwrap();
            }

            assert!(service.pending_flags().unwrap().is_empty());
            assert_eq!(service.db.papers.len(), papers);
            assert_eq!(service.db.cases.len(), cases);
        }

        #[test]
        fn test_search_members() {
            let mut service = service();
            login_as(&mut service, ADMIN_EMAIL);

            let search = MemberSearch {
                query: TextQuery::new("CA789012"),
            };
            let found = service.search_members(&search).unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].full_name, "Dr. Michael Chen");
        }

        #[test]
        fn test_stats() {
            let mut service = service();
            login_as(&mut service, ADMIN_EMAIL);

            let stats = service.stats().unwrap();
            assert_eq!(stats.total_members, 9);
            assert_eq!(stats.pending_approvals, 2);
            assert_eq!(stats.active_discussions, 1);
            assert_eq!(stats.research_papers, 4);
            assert_eq!(stats.pending_flags, 2);
            assert_eq!(
                stats.members_online,
                service.db.members.list().iter().filter(|m| m.online).count()
            );
        }

        #[test]
        fn test_export_members() {
            let mut service = service();
            login_as(&mut service, ADMIN_EMAIL);

            let mut buffer = Vec::new();
            service.export(ExportKind::Members, &mut buffer).unwrap();

            let exported: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
            assert_eq!(exported.as_array().unwrap().len(), 9);
        }
    }
}
