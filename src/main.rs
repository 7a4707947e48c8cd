use std::fmt;
use std::fs::File;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use derive_more::derive::Display;
use inquire::{Confirm, CustomType, Select, Text};
use log::info;
use medportal::authorization::Enforcer;
use medportal::consts::Config;
use medportal::db::Database;
use medportal::filter::{
    CaseFilter, ContactFilter, DirectoryFilter, ExperienceBracket, MemberSearch, PaperFilter,
    Selection, TextQuery,
};
use medportal::forms::{CaseForm, CaseUpdate, PaperForm, ProfileUpdate, RegistrationForm};
use medportal::guard::{Decision, Route};
use medportal::models::*;
use medportal::moderation::Resolution;
use medportal::seed;
use medportal::services::{ExportKind, Service};
use medportal::utils::input_validation::{parse_list, EmailAddress, IsaNumber};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

type MenuExit = Option<()>;
const MENU_EXIT: MenuExit = None;
const MENU_LOOP: MenuExit = Some(());

/// Représente un menu texte
trait Menu {
    /// Implémente le contenu du menu. La valeur de retour
    /// doit être None si le menu souhaite terminer,
    /// ou Some(()) s'il faut le relancer.
    fn enter(&mut self) -> Result<Option<()>>;

    /// Lance le menu en boucle, en interceptant les erreurs,
    /// sauf si le menu souhaite quitter.
    fn enter_loop(&mut self) {
        while let Some(result) = self.enter().transpose() {
            if let Err(error) = result {
                eprintln!("Erreur: {error}");
            }
        }
    }
}

/// Une valeur présentée dans une liste sous un libellé
struct Labeled<T> {
    value: T,
    label: String,
}

impl<T> fmt::Display for Labeled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

const ALL: &str = "Tous";

/// Sélecteur avec une première entrée « Tous »
fn select_or_all<T: fmt::Display + Clone>(prompt: &str, options: Vec<T>) -> Result<Selection<T>> {
    let mut labels = vec![ALL.to_string()];
    labels.extend(options.iter().map(ToString::to_string));

    let index = Select::new(prompt, labels).raw_prompt()?.index;
    Ok(index
        .checked_sub(1)
        .and_then(|i| options.get(i).cloned())
        .into())
}

fn text_query(prompt: &str) -> Result<TextQuery> {
    let query = Text::new(prompt)
        .with_help_message("Laisser vide pour tout afficher")
        .prompt()?;
    Ok(TextQuery::new(&query))
}

fn list_input(prompt: &str) -> Result<Vec<String>> {
    Ok(parse_list(
        &Text::new(prompt)
            .with_help_message("Valeurs séparées par des virgules")
            .prompt()?,
    ))
}

/// Affiche le courriel simulé contenant le code
fn show_last_email(service: &Service, email: &str) {
    let Ok(address) = EmailAddress::try_from(email) else {
        return;
    };
    if let Some(message) = service.outbox().last_to(&address) {
        println!("[courriel simulé à {}] {}", message.to, message.body);
    }
}

/// Applique la garde d'un écran. Renvoie vrai si l'accès est accordé.
fn allowed(service: &Service, route: Route) -> bool {
    match service.guard(route) {
        Decision::Allow => true,
        Decision::Redirect(target) => {
            info!("Access to {} redirected to {}", route.path(), target.path());
            println!("[!] Accès à « {route} » impossible, redirection vers « {target} »");
            if target == Route::WaitingApproval {
                println!("Votre inscription est en cours de validation par un administrateur.");
            }
            false
        }
    }
}

pub struct App {
    service: Service,
}

impl App {
    pub fn new(service: Service) -> Self {
        App { service }
    }

    pub fn start(&mut self) -> Result<()> {
        println!("Bienvenue sur MedPortal, le portail des membres de l'association.");
        self.enter_loop();
        self.service.logout();
        self.service.save()?;
        Ok(())
    }

    fn login(&mut self) -> Result<()> {
        let email = Text::new("Adresse e-mail:").prompt()?;
        self.service.request_login_code(&email)?;
        println!("Si cette adresse est inscrite, un code à 6 chiffres vient d'y être envoyé.");
        show_last_email(&self.service, &email);

        let code = Text::new("Code reçu:").prompt()?;
        let member = self.service.login(&email, &code)?;
        info!("Member {member} entered the portal");

        if allowed(&self.service, Route::Dashboard) {
            if let Some(me) = self.service.current_member() {
                println!("[*] Bienvenue, {me}.");
            }
            Dashboard {
                service: &mut self.service,
            }
            .enter_loop();
        }
        self.service.logout();
        Ok(())
    }

    fn register(&mut self) -> Result<()> {
        let email = Text::new("Adresse e-mail:").prompt()?;
        let isa = Text::new("Numéro ISA (une lettre et 4 chiffres):").prompt()?;
        self.service.request_registration_code(&email, &isa)?;
        show_last_email(&self.service, &email);

        let form = RegistrationForm {
            full_name: Text::new("Nom complet:").prompt()?,
            email: EmailAddress::try_from(email.as_str())?,
            gender: Text::new("Genre:").prompt()?,
            date_of_birth: CustomType::<NaiveDate>::new("Date de naissance (AAAA-MM-JJ):")
                .prompt_skippable()?,
            specialization: list_input("Spécialités:")?,
            qualifications: Text::new("Diplômes:").prompt()?,
            contact_number: Text::new("Téléphone:").prompt()?,
            clinic: Text::new("Cabinet ou hôpital:").prompt()?,
            location: Location {
                city: Text::new("Ville:").prompt()?,
                state: Text::new("État ou région:").prompt()?,
                country: Text::new("Pays:").prompt()?,
            },
            years_of_experience: CustomType::<u32>::new("Années d'expérience:").prompt()?,
            registration_number: Text::new("Numéro d'enregistrement médical:").prompt()?,
            isa_number: IsaNumber::try_from(isa.as_str())?,
        };

        let code = Text::new("Code reçu:").prompt()?;
        self.service.register(form, &code)?;

        println!("[*] Inscription enregistrée. Elle doit être validée par un administrateur.");
        Ok(())
    }
}

impl Menu for App {
    fn enter(&mut self) -> Result<MenuExit> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Se connecter")]
            Login,
            #[display("Créer un compte")]
            Register,
            #[display("Quitter")]
            Exit,
        }

        let choice = Select::new("Que voulez-vous faire ?", Choice::iter().collect()).prompt()?;

        match choice {
            Choice::Login => self.login()?,
            Choice::Register => self.register()?,
            Choice::Exit => return Ok(MENU_EXIT),
        }
        Ok(MENU_LOOP)
    }
}

struct Dashboard<'srv> {
    service: &'srv mut Service,
}

impl Menu for Dashboard<'_> {
    fn enter(&mut self) -> Result<Option<()>> {
        #[derive(EnumIter, Display, Clone, Copy)]
        enum Choice {
            #[display("Annuaire")]
            Directory,
            #[display("Discussions de cas")]
            Cases,
            #[display("Articles de recherche")]
            Papers,
            #[display("Messagerie")]
            Chat,
            #[display("Mon profil")]
            Profile,
            #[display("Modifier mon profil")]
            EditProfile,
            #[display("Soumettre un cas")]
            SubmitCase,
            #[display("Soumettre un article")]
            SubmitPaper,
            #[display("Administration")]
            Admin,
            #[display("Se déconnecter")]
            Logout,
        }

        let choice = Select::new("Tableau de bord", Choice::iter().collect()).prompt()?;
        let route = match choice {
            Choice::Directory => Route::Directory,
            Choice::Cases => Route::CaseDiscussions,
            Choice::Papers => Route::ResearchPapers,
            Choice::Chat => Route::Chat,
            Choice::Profile => Route::Profile,
            Choice::EditProfile => Route::EditProfile,
            Choice::SubmitCase => Route::SubmitCase,
            Choice::SubmitPaper => Route::SubmitPaper,
            Choice::Admin => Route::Admin,
            Choice::Logout => return Ok(MENU_EXIT),
        };

        if !allowed(self.service, route) {
            return Ok(MENU_LOOP);
        }

        let service = &mut *self.service;
        match choice {
            Choice::Directory => DirectoryMenu::browse(service)?,
            Choice::Cases => CasesMenu { service }.enter_loop(),
            Choice::Papers => PapersMenu { service }.enter_loop(),
            Choice::Chat => ChatMenu { service }.enter_loop(),
            Choice::Profile => {
                let me = service
                    .current_member()
                    .ok_or(anyhow!("Session expirée"))?;
                show_member(me);
            }
            Choice::EditProfile => edit_profile(service)?,
            Choice::SubmitCase => submit_case(service)?,
            Choice::SubmitPaper => submit_paper(service)?,
            Choice::Admin => AdminMenu { service }.enter_loop(),
            Choice::Logout => {}
        }
        Ok(MENU_LOOP)
    }
}

fn show_member(member: &Member) {
    let Member {
        full_name,
        email,
        specialization,
        qualifications,
        clinic,
        location,
        years_of_experience,
        registration_number,
        isa_number,
        contact_number,
        status,
        online,
        ..
    } = member;
    let presence = if *online { "en ligne" } else { "hors ligne" };

    println!(
        "\n{full_name} ({presence})\nSpécialités: {}\nDiplômes: {qualifications}\n\
        Cabinet: {clinic}, {}\nExpérience: {years_of_experience} ans\n\
        Enregistrement: {registration_number} / ISA {isa_number}\n\
        Contact: {email} / {contact_number}\nStatut: {status}\n===============",
        specialization.join(", "),
        location.label(),
    );
}

fn edit_profile(service: &mut Service) -> Result<()> {
    let me = service
        .current_member()
        .ok_or(anyhow!("Session expirée"))?
        .clone();

    let update = ProfileUpdate {
        full_name: Some(Text::new("Nom complet:").with_initial_value(&me.full_name).prompt()?),
        specialization: Some(list_input("Spécialités:")?).filter(|list| !list.is_empty()),
        qualifications: Some(
            Text::new("Diplômes:")
                .with_initial_value(&me.qualifications)
                .prompt()?,
        ),
        contact_number: Some(
            Text::new("Téléphone:")
                .with_initial_value(&me.contact_number)
                .prompt()?,
        ),
        clinic: Some(Text::new("Cabinet:").with_initial_value(&me.clinic).prompt()?),
        years_of_experience: Some(
            CustomType::<u32>::new("Années d'expérience:")
                .with_default(me.years_of_experience)
                .prompt()?,
        ),
        ..Default::default()
    };

    service.update_profile(me.id, update)?;
    println!("[*] Profil mis à jour");
    Ok(())
}

fn submit_case(service: &mut Service) -> Result<()> {
    let form = CaseForm {
        title: Text::new("Titre:").prompt()?,
        description: inquire::Editor::new("Description du cas:").prompt()?,
        specialty: Text::new("Spécialité:").prompt()?,
        case_type: Select::new("Type de cas:", CaseType::iter().collect()).prompt()?,
        diagnosis: Text::new("Diagnostic (facultatif):").prompt()?,
        outcome: Text::new("Évolution (facultatif):").prompt()?,
        tags: list_input("Mots-clés:")?,
        images: list_input("Liens des images:")?,
    };
    let id = service.submit_case(form)?;
    println!("[*] Cas publié ({id})");
    Ok(())
}

fn submit_paper(service: &mut Service) -> Result<()> {
    let form = PaperForm {
        title: Text::new("Titre:").prompt()?,
        authors: list_input("Auteurs:")?,
        summary: inquire::Editor::new("Résumé:").prompt()?,
        category: Select::new("Catégorie:", PaperCategory::iter().collect()).prompt()?,
        specialty: Text::new("Spécialité:").prompt()?,
        tags: list_input("Mots-clés:")?,
        images: list_input("Liens des images:")?,
        pdf_url: Text::new("Lien du PDF:").prompt()?,
    };
    let id = service.submit_paper(form)?;
    println!("[*] Article publié ({id})");
    Ok(())
}

struct DirectoryMenu;

impl DirectoryMenu {
    fn browse(service: &mut Service) -> Result<()> {
        let facets = service.directory_facets()?;
        let filter = DirectoryFilter {
            query: text_query("Rechercher (nom, spécialité, cabinet, ville):")?,
            specialty: select_or_all("Spécialité:", facets.specialties)?,
            location: select_or_all("Lieu:", facets.locations)?,
            experience: select_or_all("Expérience:", ExperienceBracket::iter().collect())?,
        };

        let found: Vec<Labeled<MemberID>> = service
            .directory(&filter)?
            .into_iter()
            .map(|member| Labeled {
                value: member.id,
                label: format!(
                    "{} - {} - {}",
                    member.full_name,
                    member.specialization.join(", "),
                    member.location.label()
                ),
            })
            .collect();

        if found.is_empty() {
            println!("[*] Aucun membre ne correspond à ces critères");
            return Ok(());
        }

        let Some(choice) = Select::new("Membres:", found).prompt_skippable()? else {
            return Ok(());
        };
        if !allowed(service, Route::MemberProfile) {
            return Ok(());
        }
        show_member(service.member(choice.value)?);

        if allowed(service, Route::Chat) && Confirm::new("Envoyer un message ?").prompt()? {
            let conversation = service.open_direct(choice.value)?;
            ConversationMenu {
                service,
                conversation,
            }
            .enter_loop();
        }
        Ok(())
    }
}

struct CasesMenu<'srv> {
    service: &'srv mut Service,
}

impl Menu for CasesMenu<'_> {
    fn enter(&mut self) -> Result<Option<()>> {
        let filter = CaseFilter {
            query: text_query("Rechercher (titre, description, mots-clés):")?,
            case_type: select_or_all("Type:", CaseType::iter().collect())?,
            specialty: select_or_all("Spécialité:", self.service.case_specialties()?)?,
        };

        let cases: Vec<Labeled<CaseID>> = self
            .service
            .cases(&filter)?
            .into_iter()
            .map(|case| Labeled {
                value: case.id,
                label: format!(
                    "{}{} [{} / {}] par {}",
                    if case.solved { "[résolu] " } else { "" },
                    case.title,
                    case.case_type,
                    case.specialty,
                    case.author_name
                ),
            })
            .collect();

        if cases.is_empty() {
            println!("[*] Aucun cas ne correspond à ces critères");
            return Ok(MENU_EXIT);
        }

        let Some(choice) = Select::new("Cas:", cases).prompt_skippable()? else {
            return Ok(MENU_EXIT);
        };
        if allowed(self.service, Route::CaseDetail) {
            self.case_detail(choice.value)?;
        }
        Ok(MENU_LOOP)
    }
}

impl CasesMenu<'_> {
    fn case_detail(&mut self, id: CaseID) -> Result<()> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Participer à la discussion")]
            Discuss,
            #[display("Signaler / retirer mon signalement")]
            Flag,
            #[display("Modifier le diagnostic et l'évolution")]
            Edit,
            #[display("Ajouter des images")]
            AddImages,
            #[display("Marquer comme résolu")]
            Solve,
            #[display("Retour")]
            Back,
        }

        let views = self.service.record_case_view(id)?;
        let case = self.service.case(id)?;
        println!(
            "\n{}\nAuteur: {} - {}\n{}\nDiagnostic: {}\nÉvolution: {}\nMots-clés: {}\nImages: {}\nVues: {views}\n===============",
            case.title,
            case.author_name,
            case.published_on,
            case.description,
            case.diagnosis,
            case.outcome,
            case.tags.join(", "),
            case.images.len(),
        );

        match Select::new("Action:", Choice::iter().collect()).prompt()? {
            Choice::Discuss => {
                if allowed(self.service, Route::CaseChat) {
                    let conversation = self.service.open_topic(Topic::Case(id))?;
                    ConversationMenu {
                        service: self.service,
                        conversation,
                    }
                    .enter_loop();
                }
            }
            Choice::Flag => flag(self.service, ContentRef::Case(id))?,
            Choice::Edit => {
                let update = CaseUpdate {
                    diagnosis: Some(Text::new("Diagnostic:").prompt()?),
                    outcome: Some(Text::new("Évolution:").prompt()?),
                    ..Default::default()
                };
                self.service.update_case(id, update)?;
            }
            Choice::AddImages => {
                let images = list_input("Liens des images:")?;
                self.service.add_case_images(id, &images)?;
            }
            Choice::Solve => self.service.mark_case_solved(id)?,
            Choice::Back => {}
        }
        Ok(())
    }
}

fn flag(service: &mut Service, content: ContentRef) -> Result<()> {
    let reason = if service.has_flagged(content) {
        String::new()
    } else {
        Text::new("Motif du signalement:").prompt()?
    };

    if service.toggle_flag(content, &reason)? {
        println!("[*] Contenu signalé aux modérateurs");
    } else {
        println!("[*] Signalement retiré");
    }
    Ok(())
}

struct PapersMenu<'srv> {
    service: &'srv mut Service,
}

impl Menu for PapersMenu<'_> {
    fn enter(&mut self) -> Result<Option<()>> {
        let filter = PaperFilter {
            query: text_query("Rechercher (titre, résumé, auteurs, mots-clés):")?,
            category: select_or_all("Catégorie:", PaperCategory::iter().collect())?,
            specialty: select_or_all("Spécialité:", self.service.paper_specialties()?)?,
        };

        let papers: Vec<Labeled<PaperID>> = self
            .service
            .papers(&filter)?
            .into_iter()
            .map(|paper| Labeled {
                value: paper.id,
                label: format!(
                    "{} [{} / {}] - {}",
                    paper.title,
                    paper.category,
                    paper.specialty,
                    paper.authors.join(", ")
                ),
            })
            .collect();

        if papers.is_empty() {
            println!("[*] Aucun article ne correspond à ces critères");
            return Ok(MENU_EXIT);
        }

        let Some(choice) = Select::new("Articles:", papers).prompt_skippable()? else {
            return Ok(MENU_EXIT);
        };
        if allowed(self.service, Route::PaperDetail) {
            self.paper_detail(choice.value)?;
        }
        Ok(MENU_LOOP)
    }
}

impl PapersMenu<'_> {
    fn paper_detail(&mut self, id: PaperID) -> Result<()> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Télécharger le PDF")]
            Download,
            #[display("Participer à la discussion")]
            Discuss,
            #[display("Signaler / retirer mon signalement")]
            Flag,
            #[display("Retour")]
            Back,
        }

        let paper = self.service.paper(id)?;
        println!(
            "\n{}\n{}\nPublié le {} - {} téléchargements\n\n{}\n===============",
            paper.title,
            paper.authors.join(", "),
            paper.published_on,
            paper.downloads,
            paper.summary
        );

        match Select::new("Action:", Choice::iter().collect()).prompt()? {
            Choice::Download => {
                let link = self.service.record_paper_download(id)?;
                println!("[*] Document disponible: {link}");
            }
            Choice::Discuss => {
                if allowed(self.service, Route::PaperChat) {
                    let conversation = self.service.open_topic(Topic::Paper(id))?;
                    ConversationMenu {
                        service: self.service,
                        conversation,
                    }
                    .enter_loop();
                }
            }
            Choice::Flag => flag(self.service, ContentRef::Paper(id))?,
            Choice::Back => {}
        }
        Ok(())
    }
}

struct ChatMenu<'srv> {
    service: &'srv mut Service,
}

impl ChatMenu<'_> {
    fn conversation_label(&self, conversation: &Conversation, me: MemberID) -> String {
        let title = match conversation.topic {
            Topic::Direct => conversation
                .peer_of(me)
                .and_then(|peer| self.service.member(peer).ok())
                .map_or_else(|| "Membre inconnu".to_string(), |peer| peer.full_name.clone()),
            Topic::Case(id) => self
                .service
                .case(id)
                .map_or_else(|_| "Cas".to_string(), |case| format!("Cas: {}", case.title)),
            Topic::Paper(id) => self
                .service
                .paper(id)
                .map_or_else(|_| "Article".to_string(), |paper| format!("Article: {}", paper.title)),
        };
        let last = conversation
            .last_message()
            .map(|message| format!(" - {}", message.body))
            .unwrap_or_default();

        match conversation.unread_count(me) {
            0 => format!("{title}{last}"),
            unread => format!("{title} ({unread} non lu(s)){last}"),
        }
    }

    fn new_conversation(&mut self) -> Result<()> {
        let filter = ContactFilter {
            query: text_query("Rechercher un contact (nom, spécialité):")?,
        };
        let contacts: Vec<Labeled<MemberID>> = self
            .service
            .contacts(&filter)?
            .into_iter()
            .map(|member| Labeled {
                value: member.id,
                label: format!("{} - {}", member.full_name, member.specialization.join(", ")),
            })
            .collect();

        let Some(contact) = Select::new("Contacts:", contacts).prompt_skippable()? else {
            return Ok(());
        };
        let conversation = self.service.open_direct(contact.value)?;
        ConversationMenu {
            service: self.service,
            conversation,
        }
        .enter_loop();
        Ok(())
    }
}

impl Menu for ChatMenu<'_> {
    fn enter(&mut self) -> Result<Option<()>> {
        let me = self
            .service
            .current_member()
            .ok_or(anyhow!("Session expirée"))?
            .id;

        let mut entries: Vec<Labeled<Option<ConversationID>>> = vec![Labeled {
            value: None,
            label: "Nouvelle conversation".to_string(),
        }];
        entries.extend(self.service.conversations()?.into_iter().map(|conversation| {
            Labeled {
                value: Some(conversation.id),
                label: self.conversation_label(conversation, me),
            }
        }));

        let Some(choice) = Select::new("Conversations:", entries).prompt_skippable()? else {
            return Ok(MENU_EXIT);
        };

        match choice.value {
            None => self.new_conversation()?,
            Some(conversation) => ConversationMenu {
                service: self.service,
                conversation,
            }
            .enter_loop(),
        }
        Ok(MENU_LOOP)
    }
}

struct ConversationMenu<'srv> {
    service: &'srv mut Service,
    conversation: ConversationID,
}

impl ConversationMenu<'_> {
    fn show(&mut self) -> Result<()> {
        self.service.mark_seen(self.conversation)?;
        let conversation = self.service.conversation(self.conversation)?;

        for message in &conversation.messages {
            let sender = self
                .service
                .member(message.sender)
                .map_or_else(|_| "?".to_string(), |member| member.full_name.clone());
            let status = if message.seen {
                "lu"
            } else if message.delivered {
                "remis"
            } else {
                "envoyé"
            };
            println!(
                "[{}] {sender}: {} ({status})",
                message.sent_at.format("%d.%m %H:%M"),
                message.body
            );
        }
        Ok(())
    }
}

impl Menu for ConversationMenu<'_> {
    fn enter(&mut self) -> Result<Option<()>> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Écrire un message")]
            Text,
            #[display("Joindre un fichier")]
            File,
            #[display("Retour")]
            Back,
        }

        self.show()?;

        match Select::new("Action:", Choice::iter().collect()).prompt()? {
            Choice::Text => {
                let text = Text::new("Message:").prompt()?;
                self.service.send_text(self.conversation, &text)?;
            }
            Choice::File => {
                let name = Text::new("Nom du fichier:").prompt()?;
                let link = Text::new("Lien du fichier:").prompt()?;
                self.service.send_file(self.conversation, &name, &link)?;
            }
            Choice::Back => return Ok(MENU_EXIT),
        }
        Ok(MENU_LOOP)
    }
}

struct AdminMenu<'srv> {
    service: &'srv mut Service,
}

impl AdminMenu<'_> {
    fn review_members(&mut self) -> Result<()> {
        let pending: Vec<Labeled<MemberID>> = self
            .service
            .pending_members()?
            .into_iter()
            .map(|member| Labeled {
                value: member.id,
                label: format!(
                    "{} <{}> - {} - ISA {} - inscrit le {}",
                    member.full_name,
                    member.email,
                    member.specialization.join(", "),
                    member.isa_number,
                    member.registered_on
                ),
            })
            .collect();

        if pending.is_empty() {
            println!("[*] Aucune inscription en attente");
            return Ok(());
        }

        let Some(choice) = Select::new("Inscriptions en attente:", pending).prompt_skippable()?
        else {
            return Ok(());
        };

        if Confirm::new(&format!("Approuver {} ?", choice.label))
            .with_help_message("Non refuse définitivement l'inscription")
            .prompt()?
        {
            self.service.approve_member(choice.value)?;
            println!("[*] Membre approuvé");
        } else {
            self.service.reject_member(choice.value)?;
            println!("[*] Inscription refusée");
        }
        Ok(())
    }

    fn review_flags(&mut self) -> Result<()> {
        let flags: Vec<Labeled<FlagID>> = self
            .service
            .pending_flags()?
            .into_iter()
            .map(|flag| Labeled {
                value: flag.id,
                label: format!(
                    "{} « {} » par {} - motif: {} ({})",
                    flag.content, flag.title, flag.author, flag.reason, flag.date
                ),
            })
            .collect();

        if flags.is_empty() {
            println!("[*] Aucun signalement en attente");
            return Ok(());
        }

        let Some(choice) = Select::new("Signalements:", flags).prompt_skippable()? else {
            return Ok(());
        };
        let resolution = Select::new("Décision:", Resolution::iter().collect()).prompt()?;
        self.service.resolve_flag(choice.value, resolution)?;
        Ok(())
    }

    fn search(&self) -> Result<()> {
        let search = MemberSearch {
            query: text_query("Rechercher (nom, e-mail, numéro d'enregistrement):")?,
        };
        for member in self.service.search_members(&search)? {
            println!(
                "{} <{}> - {} - {} - {}",
                member.full_name, member.email, member.registration_number, member.role, member.status
            );
        }
        Ok(())
    }

    fn export(&self) -> Result<()> {
        let kind = Select::new("Données à exporter:", ExportKind::iter().collect()).prompt()?;
        let path = Text::new("Fichier de destination:")
            .with_default("export.json")
            .prompt()?;

        self.service.export(kind, File::create(&path)?)?;
        println!("[*] Export écrit dans {path}");
        Ok(())
    }
}

impl Menu for AdminMenu<'_> {
    fn enter(&mut self) -> Result<Option<()>> {
        #[derive(EnumIter, Display)]
        enum Choice {
            #[display("Statistiques")]
            Stats,
            #[display("Inscriptions en attente")]
            Members,
            #[display("Contenus signalés")]
            Flags,
            #[display("Rechercher un membre")]
            Search,
            #[display("Exporter des données")]
            Export,
            #[display("Retour")]
            Back,
        }

        match Select::new("Administration", Choice::iter().collect()).prompt()? {
            Choice::Stats => {
                let stats = self.service.stats()?;
                println!(
                    "Membres: {}\nInscriptions en attente: {}\nDiscussions actives: {}\n\
                    Articles: {}\nSignalements en attente: {}\nMembres en ligne: {}",
                    stats.total_members,
                    stats.pending_approvals,
                    stats.active_discussions,
                    stats.research_papers,
                    stats.pending_flags,
                    stats.members_online
                );
            }
            Choice::Members => self.review_members()?,
            Choice::Flags => self.review_flags()?,
            Choice::Search => self.search()?,
            Choice::Export => self.export()?,
            Choice::Back => return Ok(MENU_EXIT),
        }
        Ok(MENU_LOOP)
    }
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    simple_logging::log_to_file(&config.log_file, config.log_level)?;

    let mut db = Database::open(config.db_file.clone())?;
    if db.is_empty() && config.seed_demo {
        info!("Empty database, loading the demo data set");
        db.replace_with(seed::demo_database());
        db.save()?;
        println!(
            "[*] Données de démonstration chargées. Connectez-vous avec {} ou {}.",
            seed::DEMO_MEMBER_EMAIL,
            seed::ADMIN_EMAIL
        );
    }

    let enforcer = Enforcer::load()?;
    App::new(Service::new(db, enforcer)).start()
}
