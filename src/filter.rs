//! Composition de filtres pour l'annuaire, les cas, les articles et les
//! conversations.
//!
//! Un filtre combine une recherche textuelle et des sélections
//! catégorielles. Un élément est retenu si tous les critères actifs
//! sont satisfaits; le résultat garde l'ordre de la collection source.

use std::collections::BTreeSet;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::models::{CaseRecord, CaseType, Member, PaperCategory, ResearchPaper};

/// Valeur d'un sélecteur: `All` désactive le critère
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection<T> {
    #[default]
    All,
    Only(T),
}

impl<T: PartialEq> Selection<T> {
    pub fn admits(&self, value: &T) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }

    /// Vrai si la sélection est `All` ou si une des valeurs correspond
    pub fn admits_any<'a, I>(&self, values: I) -> bool
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        match self {
            Selection::All => true,
            Selection::Only(expected) => values.into_iter().any(|value| value == expected),
        }
    }
}

impl<T> From<Option<T>> for Selection<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Selection::All, Selection::Only)
    }
}

/// Recherche insensible à la casse. La requête vide accepte tout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextQuery(String);

impl TextQuery {
    pub fn new(query: &str) -> Self {
        Self(query.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, field: &str) -> bool {
        self.is_empty() || field.to_lowercase().contains(&self.0)
    }

    /// Vrai si au moins un des champs contient la requête
    pub fn matches_any<'a, I>(&self, fields: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.is_empty() || fields.into_iter().any(|field| self.matches(field))
    }
}

/// Tranche d'expérience utilisée par l'annuaire
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum ExperienceBracket {
    #[display("0-5 years")]
    UpToFive,
    #[display("6-10 years")]
    SixToTen,
    #[display("11-15 years")]
    ElevenToFifteen,
    #[display("16+ years")]
    SixteenPlus,
}

impl ExperienceBracket {
    pub fn from_years(years: u32) -> Self {
        match years {
            0..=5 => ExperienceBracket::UpToFive,
            6..=10 => ExperienceBracket::SixToTen,
            11..=15 => ExperienceBracket::ElevenToFifteen,
            _ => ExperienceBracket::SixteenPlus,
        }
    }
}

/// Un prédicat sur les éléments d'une collection
pub trait Filter<T> {
    fn matches(&self, item: &T) -> bool;

    /// Sous-suite des éléments retenus, sans toucher à la source
    fn apply<'a, I>(&self, items: I) -> Vec<&'a T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

/// Critères de l'annuaire des membres
#[derive(Debug, Clone, Default)]
pub struct DirectoryFilter {
    pub query: TextQuery,
    pub specialty: Selection<String>,
    pub location: Selection<String>,
    pub experience: Selection<ExperienceBracket>,
}

impl Filter<Member> for DirectoryFilter {
    fn matches(&self, member: &Member) -> bool {
        let location = member.location.label();

        let matches_search = self.query.matches_any(
            [member.full_name.as_str(), member.clinic.as_str(), location.as_str()]
                .into_iter()
                .chain(member.specialization.iter().map(String::as_str)),
        );

        matches_search
            && self.specialty.admits_any(&member.specialization)
            && self.location.admits(&location)
            && self
                .experience
                .admits(&ExperienceBracket::from_years(member.years_of_experience))
    }
}

/// Critères des discussions de cas
#[derive(Debug, Clone, Default)]
pub struct CaseFilter {
    pub query: TextQuery,
    pub case_type: Selection<CaseType>,
    pub specialty: Selection<String>,
}

impl Filter<CaseRecord> for CaseFilter {
    fn matches(&self, case: &CaseRecord) -> bool {
        let matches_search = self.query.matches_any(
            [case.title.as_str(), case.description.as_str()]
                .into_iter()
                .chain(case.tags.iter().map(String::as_str)),
        );

        matches_search && self.case_type.admits(&case.case_type) && self.specialty.admits(&case.specialty)
    }
}

/// Critères des articles de recherche
#[derive(Debug, Clone, Default)]
pub struct PaperFilter {
    pub query: TextQuery,
    pub category: Selection<PaperCategory>,
    pub specialty: Selection<String>,
}

impl Filter<ResearchPaper> for PaperFilter {
    fn matches(&self, paper: &ResearchPaper) -> bool {
        let matches_search = self.query.matches_any(
            [paper.title.as_str(), paper.summary.as_str()]
                .into_iter()
                .chain(paper.authors.iter().map(String::as_str))
                .chain(paper.tags.iter().map(String::as_str)),
        );

        matches_search && self.category.admits(&paper.category) && self.specialty.admits(&paper.specialty)
    }
}

/// Recherche dans la liste des contacts de la messagerie
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    pub query: TextQuery,
}

impl Filter<Member> for ContactFilter {
    fn matches(&self, member: &Member) -> bool {
        self.query.matches_any(
            std::iter::once(member.full_name.as_str())
                .chain(member.specialization.iter().map(String::as_str)),
        )
    }
}

/// Recherche d'utilisateurs du panneau d'administration
#[derive(Debug, Clone, Default)]
pub struct MemberSearch {
    pub query: TextQuery,
}

impl Filter<Member> for MemberSearch {
    fn matches(&self, member: &Member) -> bool {
        self.query.matches_any([
            member.full_name.as_str(),
            member.email.as_ref(),
            member.registration_number.as_str(),
        ])
    }
}

/// Valeurs distinctes proposées par les sélecteurs de l'annuaire,
/// dans l'ordre de première apparition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFacets {
    pub specialties: Vec<String>,
    pub locations: Vec<String>,
}

impl DirectoryFacets {
    pub fn collect<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = &'a Member>,
    {
        let mut facets = Self::default();
        let mut seen_specialties = BTreeSet::new();
        let mut seen_locations = BTreeSet::new();

        for member in members {
            for specialty in &member.specialization {
                if seen_specialties.insert(specialty.clone()) {
                    facets.specialties.push(specialty.clone());
                }
            }

            let location = member.location.label();
            if seen_locations.insert(location.clone()) {
                facets.locations.push(location);
            }
        }
        facets
    }
}

/// Spécialités distinctes, dans l'ordre de première apparition
pub fn distinct_specialties<'a, I>(specialties: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = BTreeSet::new();
    specialties
        .into_iter()
        .filter(|specialty| seen.insert(*specialty))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn directory() -> Vec<Member> {
        seed::directory_members()
    }

    fn names<'a>(members: &[&'a Member]) -> Vec<&'a str> {
        members.iter().map(|m| m.full_name.as_str()).collect()
    }

    mod experience_tests {
        use super::*;

        #[test]
        fn test_bracket_boundaries_are_lower_inclusive() {
            let cases = [
                (0, ExperienceBracket::UpToFive),
                (5, ExperienceBracket::UpToFive),
                (6, ExperienceBracket::SixToTen),
                (10, ExperienceBracket::SixToTen),
                (11, ExperienceBracket::ElevenToFifteen),
                (15, ExperienceBracket::ElevenToFifteen),
                (16, ExperienceBracket::SixteenPlus),
                (40, ExperienceBracket::SixteenPlus),
            ];

            for (years, expected) in cases {
                assert_eq!(ExperienceBracket::from_years(years), expected, "{years} years");
            }
        }

        #[test]
        fn test_bracket_labels() {
            assert_eq!(ExperienceBracket::UpToFive.to_string(), "0-5 years");
            assert_eq!(ExperienceBracket::SixteenPlus.to_string(), "16+ years");
        }
    }

    mod directory_tests {
        use super::*;

        #[test]
        fn test_default_filter_returns_everything_in_order() {
            let members = directory();
            let result = DirectoryFilter::default().apply(&members);

            assert_eq!(result.len(), members.len());
            for (kept, source) in result.iter().zip(&members) {
                assert_eq!(kept.id, source.id);
            }
        }

        #[test]
        fn test_text_search_is_case_insensitive_over_all_fields() {
            let members = directory();
            let search = |query: &str| {
                let filter = DirectoryFilter {
                    query: TextQuery::new(query),
                    ..Default::default()
                };
                names(&filter.apply(&members))
            };

            // Name
            assert_eq!(search("sarah"), vec!["Dr. Sarah Johnson"]);
            // Second specialization
            assert_eq!(search("NEONATO"), vec!["Dr. Emily Rodriguez"]);
            // Clinic
            assert_eq!(search("orthopedic specialists"), vec!["Dr. James Wilson"]);
            // "City, State"
            assert_eq!(search("miami, fl"), vec!["Dr. Lisa Park"]);
            assert!(search("no such doctor").is_empty());
        }

        #[test]
        fn test_specialty_matches_any_entry_of_the_list() {
            let members = directory();
            let filter = DirectoryFilter {
                specialty: Selection::Only("Internal Medicine".to_string()),
                ..Default::default()
            };

            assert_eq!(names(&filter.apply(&members)), vec!["Dr. Sarah Johnson"]);
        }

        #[test]
        fn test_location_and_experience_selections() {
            let members = directory();

            let by_location = DirectoryFilter {
                location: Selection::Only("Chicago, IL".to_string()),
                ..Default::default()
            };
            assert_eq!(names(&by_location.apply(&members)), vec!["Dr. Emily Rodriguez"]);

            let by_experience = DirectoryFilter {
                experience: Selection::Only(ExperienceBracket::ElevenToFifteen),
                ..Default::default()
            };
            assert_eq!(
                names(&by_experience.apply(&members)),
                vec!["Dr. Sarah Johnson", "Dr. Michael Chen"]
            );
        }

        #[test]
        fn test_all_active_criteria_must_match() {
            let members = directory();

            // Cardiology matches Sarah, but she is not in the 16+ bracket
            let filter = DirectoryFilter {
                specialty: Selection::Only("Cardiology".to_string()),
                experience: Selection::Only(ExperienceBracket::SixteenPlus),
                ..Default::default()
            };
            assert!(filter.apply(&members).is_empty());

            // Text matches Sarah and Emily by clinic name, location only keeps Emily
            let filter = DirectoryFilter {
                query: TextQuery::new("center"),
                location: Selection::Only("Chicago, IL".to_string()),
                ..Default::default()
            };
            assert_eq!(names(&filter.apply(&members)), vec!["Dr. Emily Rodriguez"]);
        }

        #[test]
        fn test_result_is_a_subset_and_source_is_untouched() {
            let members = directory();
            let before: Vec<_> = members.iter().map(|m| m.id).collect();

            let filter = DirectoryFilter {
                query: TextQuery::new("dr."),
                specialty: Selection::Only("Neurology".to_string()),
                ..Default::default()
            };
            let result = filter.apply(&members);

            assert!(result.len() <= members.len());
            assert!(result.iter().all(|kept| before.contains(&kept.id)));
            assert_eq!(members.iter().map(|m| m.id).collect::<Vec<_>>(), before);
        }

        #[test]
        fn test_facets_follow_first_appearance() {
            let members = directory();
            let facets = DirectoryFacets::collect(&members);

            assert_eq!(
                facets.specialties,
                vec![
                    "Cardiology",
                    "Internal Medicine",
                    "Neurology",
                    "Pediatrics",
                    "Neonatology",
                    "Orthopedic Surgery",
                    "Dermatology",
                ]
            );
            assert_eq!(facets.locations.first().map(String::as_str), Some("New York, NY"));
            assert_eq!(facets.locations.len(), 5);
        }
    }

    mod case_and_paper_tests {
        use super::*;

        #[test]
        fn test_case_filter() {
            let cases = seed::case_records(&seed::directory_members());

            let all = CaseFilter::default().apply(&cases);
            assert_eq!(all.len(), cases.len());

            let clinical_pediatrics = CaseFilter {
                case_type: Selection::Only(CaseType::Clinical),
                specialty: Selection::Only("Pediatrics".to_string()),
                ..Default::default()
            };
            let result = clinical_pediatrics.apply(&cases);
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].specialty, "Pediatrics");

            // Tag match, but wrong type
            let filter = CaseFilter {
                query: TextQuery::new("Informed Consent"),
                case_type: Selection::Only(CaseType::Clinical),
                ..Default::default()
            };
            assert!(filter.apply(&cases).is_empty());
        }

        #[test]
        fn test_paper_filter_searches_authors_and_tags() {
            let papers = seed::research_papers(&seed::directory_members());

            let by_author = PaperFilter {
                query: TextQuery::new("lisa park"),
                ..Default::default()
            };
            let result = by_author.apply(&papers);
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].specialty, "Neurology");

            let by_tag_and_category = PaperFilter {
                query: TextQuery::new("guidelines"),
                category: Selection::Only(PaperCategory::Guidelines),
                ..Default::default()
            };
            assert_eq!(by_tag_and_category.apply(&papers).len(), 1);
        }

        #[test]
        fn test_paper_filter_by_specialty() {
            let papers = seed::research_papers(&seed::directory_members());

            let neurology = PaperFilter {
                specialty: Selection::Only("Neurology".to_string()),
                ..Default::default()
            };
            let result = neurology.apply(&papers);
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].title, "Neurological Implications of Post-COVID Syndrome");

            // Bonne catégorie, mauvaise spécialité
            let guidelines_in_cardiology = PaperFilter {
                category: Selection::Only(PaperCategory::Guidelines),
                specialty: Selection::Only("Cardiology".to_string()),
                ..Default::default()
            };
            assert!(guidelines_in_cardiology.apply(&papers).is_empty());
        }

        #[test]
        fn test_distinct_specialties_keep_first_appearance() {
            let papers = seed::research_papers(&seed::directory_members());
            let mut specialties: Vec<&str> = papers.iter().map(|p| p.specialty.as_str()).collect();
            specialties.push("Neurology");

            assert_eq!(
                distinct_specialties(specialties),
                vec!["Cardiology", "Neurology", "Pediatrics", "Oncology"]
            );
        }
    }

    mod search_tests {
        use super::*;

        #[test]
        fn test_contact_and_member_search() {
            let members = directory();

            let contacts = ContactFilter {
                query: TextQuery::new("dermatology"),
            };
            assert_eq!(names(&contacts.apply(&members)), vec!["Dr. Lisa Park"]);

            let by_registration = MemberSearch {
                query: TextQuery::new("ca789"),
            };
            assert_eq!(names(&by_registration.apply(&members)), vec!["Dr. Michael Chen"]);
        }

        #[test]
        fn test_selection_from_option() {
            assert_eq!(Selection::<u8>::from(None), Selection::All);
            assert_eq!(Selection::from(Some(3)), Selection::Only(3));
            assert!(Selection::<u8>::All.admits_any(&[]));
            assert!(!Selection::Only(1).admits_any(&[]));
        }
    }
}
