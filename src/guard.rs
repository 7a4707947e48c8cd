//! Garde des écrans, évaluée avant d'entrer dans un écran.
//!
//! La garde ne navigue pas elle-même: elle renvoie une [`Decision`] que
//! l'appelant applique.

use derive_more::Display;
use strum_macros::EnumIter;

use crate::models::Member;

/// Les écrans du portail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum Route {
    #[display("Accueil")]
    Home,
    #[display("Connexion")]
    Login,
    #[display("Inscription")]
    Register,
    #[display("Inscription en attente de validation")]
    WaitingApproval,
    #[display("Page introuvable")]
    NotFound,
    #[display("Tableau de bord")]
    Dashboard,
    #[display("Mon profil")]
    Profile,
    #[display("Modifier mon profil")]
    EditProfile,
    #[display("Profil d'un membre")]
    MemberProfile,
    #[display("Messagerie")]
    Chat,
    #[display("Discussion de cas")]
    CaseChat,
    #[display("Discussion d'article")]
    PaperChat,
    #[display("Articles de recherche")]
    ResearchPapers,
    #[display("Détail d'un article")]
    PaperDetail,
    #[display("Soumettre un article")]
    SubmitPaper,
    #[display("Discussions de cas")]
    CaseDiscussions,
    #[display("Détail d'un cas")]
    CaseDetail,
    #[display("Soumettre un cas")]
    SubmitCase,
    #[display("Annuaire")]
    Directory,
    #[display("Administration")]
    Admin,
}

/// Niveau d'accès requis par un écran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Member,
    Admin,
}

/// Résultat de la garde
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
}

impl Route {
    pub fn access(self) -> Access {
        match self {
            Route::Home
            | Route::Login
            | Route::Register
            | Route::WaitingApproval
            | Route::NotFound => Access::Public,
            Route::Admin => Access::Admin,
            _ => Access::Member,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::WaitingApproval => "/successful-registration",
            Route::NotFound => "/not-found",
            Route::Dashboard => "/dashboard",
            Route::Profile => "/profile",
            Route::EditProfile => "/edit-profile",
            Route::MemberProfile => "/doctor-profile",
            Route::Chat => "/chat",
            Route::CaseChat => "/group-chat",
            Route::PaperChat => "/research-chat",
            Route::ResearchPapers => "/research-papers",
            Route::PaperDetail => "/research-paper-detail",
            Route::SubmitPaper => "/submit-paper",
            Route::CaseDiscussions => "/case-discussions",
            Route::CaseDetail => "/case-detail",
            Route::SubmitCase => "/submit-case",
            Route::Directory => "/directory",
            Route::Admin => "/admin",
        }
    }

    /// Écran correspondant à un chemin; un chemin inconnu mène à `NotFound`
    pub fn from_path(path: &str) -> Route {
        use strum::IntoEnumIterator;

        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Route::iter()
            .find(|route| route.path() == path)
            .unwrap_or(Route::NotFound)
    }
}

/// Décide si `viewer` (le membre connecté, s'il y en a un) peut entrer
/// dans `route`, ou vers quel écran le rediriger.
pub fn guard(route: Route, viewer: Option<&Member>) -> Decision {
    let access = route.access();
    if access == Access::Public {
        return Decision::Allow;
    }

    let Some(viewer) = viewer else {
        return Decision::Redirect(Route::Login);
    };

    if !viewer.is_approved() {
        return Decision::Redirect(Route::WaitingApproval);
    }

    if access == Access::Admin && !viewer.is_admin() {
        return Decision::Redirect(Route::Dashboard);
    }

    Decision::Allow
}
