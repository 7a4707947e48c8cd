//! Formulaires saisis par les membres. Chaque formulaire est validé en
//! entier avant de toucher à la base: une erreur laisse l'état inchangé.

use chrono::NaiveDate;

use crate::models::{
    CaseID, CaseRecord, CaseType, Location, Member, MemberID, PaperCategory, PaperID,
    ResearchPaper, Role,
};
use crate::moderation::ApprovalStatus;
use crate::utils::input_validation::{
    long_text, optional_list, optional_text, short_text, text_list, url, EmailAddress,
    InvalidInput, IsaNumber,
};

fn location(location: &Location) -> Result<Location, InvalidInput> {
    Ok(Location {
        city: short_text("city", &location.city)?,
        state: short_text("state", &location.state)?,
        country: short_text("country", &location.country)?,
    })
}

fn links(field: &'static str, values: &[String]) -> Result<Vec<String>, InvalidInput> {
    values.iter().map(|value| url(field, value)).collect()
}

/// Demande d'inscription d'un professionnel de santé
#[derive(Debug, Clone)]
pub struct RegistrationForm {
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
}

impl RegistrationForm {
    /// Le membre en attente d'approbation décrit par le formulaire
    pub fn into_member(self, today: NaiveDate) -> Result<Member, InvalidInput> {
        Ok(Member {
            id: MemberID::new(),
            role: Role::Member,
            status: ApprovalStatus::Pending,
            full_name: short_text("full name", &self.full_name)?,
            email: self.email,
            gender: optional_text("gender", &self.gender)?,
            date_of_birth: self.date_of_birth,
            specialization: text_list("specialization", &self.specialization)?,
            qualifications: short_text("qualifications", &self.qualifications)?,
            contact_number: short_text("contact number", &self.contact_number)?,
            clinic: short_text("clinic", &self.clinic)?,
            location: location(&self.location)?,
            years_of_experience: self.years_of_experience,
            registration_number: short_text("registration number", &self.registration_number)?,
            isa_number: self.isa_number,
            online: false,
            registered_on: today,
        })
    }
}

/// Modification partielle d'un profil: seuls les champs renseignés changent.
/// L'adresse e-mail et le numéro ISA identifient le membre et ne changent pas.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub specialization: Option<Vec<String>>,
    pub qualifications: Option<String>,
    pub contact_number: Option<String>,
    pub clinic: Option<String>,
    pub location: Option<Location>,
    pub years_of_experience: Option<u32>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.gender.is_none()
            && self.date_of_birth.is_none()
            && self.specialization.is_none()
            && self.qualifications.is_none()
            && self.contact_number.is_none()
            && self.clinic.is_none()
            && self.location.is_none()
            && self.years_of_experience.is_none()
    }

    /// Le profil modifié, sans toucher à l'original
    pub fn apply_to(self, member: &Member) -> Result<Member, InvalidInput> {
        let mut updated = member.clone();

        if let Some(full_name) = self.full_name {
            updated.full_name = short_text("full name", &full_name)?;
        }
        if let Some(gender) = self.gender {
            updated.gender = optional_text("gender", &gender)?;
        }
        if let Some(date_of_birth) = self.date_of_birth {
            updated.date_of_birth = Some(date_of_birth);
        }
        if let Some(specialization) = self.specialization {
            updated.specialization = text_list("specialization", &specialization)?;
        }
        if let Some(qualifications) = self.qualifications {
            updated.qualifications = short_text("qualifications", &qualifications)?;
        }
        if let Some(contact_number) = self.contact_number {
            updated.contact_number = short_text("contact number", &contact_number)?;
        }
        if let Some(clinic) = self.clinic {
            updated.clinic = short_text("clinic", &clinic)?;
        }
        if let Some(new_location) = self.location {
            updated.location = location(&new_location)?;
        }
        if let Some(years) = self.years_of_experience {
            updated.years_of_experience = years;
        }

        Ok(updated)
    }
}

/// Soumission d'un cas à la communauté
#[derive(Debug, Clone)]
pub struct CaseForm {
    pub title: String,
    pub description: String,
    pub specialty: String,
    pub case_type: CaseType,
    pub diagnosis: String,
    pub outcome: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
}

impl CaseForm {
    pub fn into_case(self, author: &Member, today: NaiveDate) -> Result<CaseRecord, InvalidInput> {
        Ok(CaseRecord {
            id: CaseID::new(),
            title: short_text("title", &self.title)?,
            description: long_text("description", &self.description)?,
            author: author.id,
            author_name: author.full_name.clone(),
            specialty: short_text("specialty", &self.specialty)?,
            case_type: self.case_type,
            diagnosis: optional_text("diagnosis", &self.diagnosis)?,
            outcome: optional_text("outcome", &self.outcome)?,
            tags: optional_list("tags", &self.tags)?,
            images: links("images", &self.images)?,
            published_on: today,
            views: 0,
            solved: false,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub specialty: Option<String>,
    pub case_type: Option<CaseType>,
    pub diagnosis: Option<String>,
    pub outcome: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl CaseUpdate {
    pub fn apply_to(self, case: &CaseRecord) -> Result<CaseRecord, InvalidInput> {
        let mut updated = case.clone();

        if let Some(title) = self.title {
            updated.title = short_text("title", &title)?;
        }
        if let Some(description) = self.description {
            updated.description = long_text("description", &description)?;
        }
        if let Some(specialty) = self.specialty {
            updated.specialty = short_text("specialty", &specialty)?;
        }
        if let Some(case_type) = self.case_type {
            updated.case_type = case_type;
        }
        if let Some(diagnosis) = self.diagnosis {
            updated.diagnosis = optional_text("diagnosis", &diagnosis)?;
        }
        if let Some(outcome) = self.outcome {
            updated.outcome = optional_text("outcome", &outcome)?;
        }
        if let Some(tags) = self.tags {
            updated.tags = optional_list("tags", &tags)?;
        }

        Ok(updated)
    }
}

/// Images ajoutées à un cas existant
pub fn case_images(images: &[String]) -> Result<Vec<String>, InvalidInput> {
    if images.is_empty() {
        return Err(InvalidInput::Missing("images"));
    }
    links("images", images)
}

/// Soumission d'un article de recherche
#[derive(Debug, Clone)]
pub struct PaperForm {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub category: PaperCategory,
    pub specialty: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub pdf_url: String,
}

impl PaperForm {
    pub fn into_paper(
        self,
        submitted_by: MemberID,
        today: NaiveDate,
    ) -> Result<ResearchPaper, InvalidInput> {
        Ok(ResearchPaper {
            id: PaperID::new(),
            title: short_text("title", &self.title)?,
            authors: text_list("authors", &self.authors)?,
            summary: long_text("abstract", &self.summary)?,
            category: self.category,
            specialty: short_text("specialty", &self.specialty)?,
            tags: optional_list("tags", &self.tags)?,
            images: links("images", &self.images)?,
            pdf_url: url("pdf", &self.pdf_url)?,
            published_on: today,
            downloads: 0,
            submitted_by,
        })
    }
}
