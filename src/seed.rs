//! Données de démonstration
//!
//! Sert à remplir une base vide au premier lancement, et de jeu de
//! données pour les tests.

use std::collections::BTreeSet;

use chrono::{NaiveDate, TimeZone, Utc};

use crate::db::{Database, Repository};
use crate::models::*;
use crate::moderation::{ApprovalStatus, FlagStatus};
use crate::utils::input_validation::{EmailAddress, IsaNumber};

pub const ADMIN_EMAIL: &str = "admin@medportal.org";
pub const DEMO_MEMBER_EMAIL: &str = "john.doe@email.com";

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

struct Profile<'a> {
    name: &'a str,
    email: &'a str,
    gender: &'a str,
    specialization: &'a [&'a str],
    qualifications: &'a str,
    clinic: &'a str,
    location: (&'a str, &'a str, &'a str),
    years: u32,
    registration: &'a str,
    isa: &'a str,
    contact: &'a str,
    online: bool,
}

impl Profile<'_> {
    fn build(&self, role: Role, status: ApprovalStatus, registered_on: NaiveDate) -> Member {
        let (city, state, country) = self.location;
        Member {
            id: MemberID::new(),
            role,
            status,
            full_name: self.name.to_string(),
            email: EmailAddress::try_from(self.email).expect("Invalid demo e-mail"),
            gender: self.gender.to_string(),
            date_of_birth: None,
            specialization: strings(self.specialization),
            qualifications: self.qualifications.to_string(),
            contact_number: self.contact.to_string(),
            clinic: self.clinic.to_string(),
            location: Location {
                city: city.to_string(),
                state: state.to_string(),
                country: country.to_string(),
            },
            years_of_experience: self.years,
            registration_number: self.registration.to_string(),
            isa_number: IsaNumber::try_from(self.isa).expect("Invalid demo ISA number"),
            online: self.online,
            registered_on,
        }
    }
}

/// Les membres approuvés de l'annuaire
pub fn directory_members() -> Vec<Member> {
    let profiles = [
        Profile {
            name: "Dr. Sarah Johnson",
            email: "sarah.johnson@email.com",
            gender: "Female",
            specialization: &["Cardiology", "Internal Medicine"],
            qualifications: "MBBS, MD, FACC",
            clinic: "Manhattan Heart Center",
            location: ("New York", "NY", "USA"),
            years: 15,
            registration: "NY123456",
            isa: "S1001",
            contact: "+1-555-0123",
            online: true,
        },
        Profile {
            name: "Dr. Michael Chen",
            email: "michael.chen@email.com",
            gender: "Male",
            specialization: &["Neurology"],
            qualifications: "MBBS, MD, DM (Neurology)",
            clinic: "Pacific Neurology Institute",
            location: ("Los Angeles", "CA", "USA"),
            years: 12,
            registration: "CA789012",
            isa: "M1002",
            contact: "+1-555-0124",
            online: false,
        },
        Profile {
            name: "Dr. Emily Rodriguez",
            email: "emily.rodriguez@email.com",
            gender: "Female",
            specialization: &["Pediatrics", "Neonatology"],
            qualifications: "MBBS, MD (Pediatrics), Fellowship in Neonatology",
            clinic: "Children's Medical Center",
            location: ("Chicago", "IL", "USA"),
            years: 8,
            registration: "IL345678",
            isa: "E1003",
            contact: "+1-555-0125",
            online: true,
        },
        Profile {
            name: "Dr. James Wilson",
            email: "james.wilson@email.com",
            gender: "Male",
            specialization: &["Orthopedic Surgery"],
            qualifications: "MBBS, MS (Orthopedics)",
            clinic: "Texas Orthopedic Specialists",
            location: ("Houston", "TX", "USA"),
            years: 20,
            registration: "TX901234",
            isa: "J1004",
            contact: "+1-555-0126",
            online: false,
        },
        Profile {
            name: "Dr. Lisa Park",
            email: "lisa.park@email.com",
            gender: "Female",
            specialization: &["Dermatology"],
            qualifications: "MBBS, MD (Dermatology)",
            clinic: "Sunshine Dermatology Clinic",
            location: ("Miami", "FL", "USA"),
            years: 6,
            registration: "FL567890",
            isa: "L1005",
            contact: "+1-555-0127",
            online: true,
        },
    ];

    profiles
        .iter()
        .map(|profile| profile.build(Role::Member, ApprovalStatus::Approved, date(2023, 11, 2)))
        .collect()
}

/// Le membre de démonstration utilisé pour se connecter
pub fn demo_member() -> Member {
    let mut member = Profile {
        name: "Dr. John Doe",
        email: DEMO_MEMBER_EMAIL,
        gender: "Male",
        specialization: &["Cardiology"],
        qualifications: "MBBS, MD",
        clinic: "City Hospital",
        location: ("New York", "NY", "USA"),
        years: 15,
        registration: "MED123456",
        isa: "D7890",
        contact: "+1234567890",
        online: true,
    }
    .build(Role::Member, ApprovalStatus::Approved, date(2023, 10, 1));
    member.date_of_birth = Some(date(1980, 1, 1));
    member
}

pub fn admin_member() -> Member {
    Profile {
        name: "Portal Administrator",
        email: ADMIN_EMAIL,
        gender: "",
        specialization: &["Administration"],
        qualifications: "",
        clinic: "",
        location: ("New York", "NY", "USA"),
        years: 0,
        registration: "ADMIN0001",
        isa: "A0001",
        contact: "",
        online: true,
    }
    .build(Role::Admin, ApprovalStatus::Approved, date(2023, 1, 1))
}

/// Les inscriptions en attente de validation
pub fn pending_members() -> Vec<Member> {
    let amanda = Profile {
        name: "Dr. Amanda Foster",
        email: "amanda.foster@email.com",
        gender: "Female",
        specialization: &["Dermatology"],
        qualifications: "MBBS, MD (Dermatology)",
        clinic: "Boston Skin Care Center",
        location: ("Boston", "MA", "USA"),
        years: 7,
        registration: "MA123789",
        isa: "F5678",
        contact: "+1-555-0128",
        online: false,
    }
    .build(Role::Member, ApprovalStatus::Pending, date(2024, 1, 16));

    let robert = Profile {
        name: "Dr. Robert Kim",
        email: "robert.kim@email.com",
        gender: "Male",
        specialization: &["Psychiatry"],
        qualifications: "MBBS, MD (Psychiatry)",
        clinic: "Pacific Mental Health",
        location: ("Seattle", "WA", "USA"),
        years: 10,
        registration: "WA456123",
        isa: "K2345",
        contact: "+1-555-0129",
        online: false,
    }
    .build(Role::Member, ApprovalStatus::Pending, date(2024, 1, 15));

    vec![amanda, robert]
}

fn author_named(authors: &[Member], name: &str) -> (MemberID, String) {
    authors
        .iter()
        .find(|member| member.full_name == name)
        .or_else(|| authors.first())
        .map(|member| (member.id, member.full_name.clone()))
        .unwrap_or_else(|| (MemberID::new(), name.to_string()))
}

/// Les cas en discussion. Les auteurs sont retrouvés par leur nom
/// parmi `authors`.
pub fn case_records(authors: &[Member]) -> Vec<CaseRecord> {
    let case = |title: &str,
                description: &str,
                author: &str,
                specialty: &str,
                case_type: CaseType,
                diagnosis: &str,
                outcome: &str,
                tags: &[&str],
                published_on: NaiveDate,
                views: u32| {
        let (author, author_name) = author_named(authors, author);
        CaseRecord {
            id: CaseID::new(),
            title: title.to_string(),
            description: description.to_string(),
            author,
            author_name,
            specialty: specialty.to_string(),
            case_type,
            diagnosis: diagnosis.to_string(),
            outcome: outcome.to_string(),
            tags: strings(tags),
            images: Vec::new(),
            published_on,
            views,
            solved: false,
        }
    };

    vec![
        case(
            "Complex Cardiac Arrhythmia in 45-year-old Patient",
            "Patient presents with recurrent episodes of palpitations and dizziness. ECG shows irregular rhythm with variable R-R intervals.",
            "Dr. Sarah Johnson",
            "Cardiology",
            CaseType::Clinical,
            "Atrial Fibrillation with Rapid Ventricular Response",
            "Patient stabilized with rate control medication",
            &["arrhythmia", "atrial fibrillation", "emergency"],
            date(2024, 1, 15),
            156,
        ),
        case(
            "Medico-legal Case: Informed Consent in Emergency Surgery",
            "Discussion on the challenges of obtaining proper informed consent during emergency surgical procedures.",
            "Dr. Michael Chen",
            "Surgery",
            CaseType::MedicoLegal,
            "Legal/Ethical Consultation",
            "Case study for medical ethics guidelines",
            &["informed consent", "emergency surgery", "medical ethics"],
            date(2024, 1, 12),
            89,
        ),
        case(
            "Pediatric Seizure Management in Resource-Limited Setting",
            "Managing febrile seizures in a 3-year-old child in a clinic with limited diagnostic resources.",
            "Dr. Emily Rodriguez",
            "Pediatrics",
            CaseType::Clinical,
            "Febrile Seizure",
            "Successfully managed with supportive care",
            &["pediatric", "seizure", "resource-limited"],
            date(2024, 1, 10),
            201,
        ),
        case(
            "Patient Privacy Concerns in Case Study",
            "Shared imaging of a rare presentation, identifying details were visible on the scans.",
            "Dr. John Doe",
            "Internal Medicine",
            CaseType::Clinical,
            "Under review",
            "Pending moderation",
            &["privacy", "imaging"],
            date(2024, 1, 13),
            12,
        ),
    ]
}

/// Les articles de recherche publiés
pub fn research_papers(submitters: &[Member]) -> Vec<ResearchPaper> {
    let paper = |title: &str,
                 summary: &str,
                 authors: &[&str],
                 category: PaperCategory,
                 specialty: &str,
                 tags: &[&str],
                 published_on: NaiveDate,
                 downloads: u32,
                 pdf_url: &str| {
        let (submitted_by, _) = author_named(submitters, authors.first().copied().unwrap_or_default());
        ResearchPaper {
            id: PaperID::new(),
            title: title.to_string(),
            authors: strings(authors),
            summary: summary.to_string(),
            category,
            specialty: specialty.to_string(),
            tags: strings(tags),
            images: Vec::new(),
            pdf_url: pdf_url.to_string(),
            published_on,
            downloads,
            submitted_by,
        }
    };

    vec![
        paper(
            "Novel Approaches in Cardiovascular Therapy: A Comprehensive Review",
            "This research explores innovative therapeutic approaches for cardiovascular diseases, focusing on precision medicine and personalized treatment protocols.",
            &["Dr. Sarah Johnson", "Dr. Michael Chen", "Dr. Emily Rodriguez"],
            PaperCategory::ClinicalResearch,
            "Cardiology",
            &["cardiovascular", "therapy", "precision medicine"],
            date(2024, 1, 15),
            234,
            "/research/paper1.pdf",
        ),
        paper(
            "Neurological Implications of Post-COVID Syndrome",
            "An in-depth analysis of neurological symptoms and long-term effects observed in post-COVID patients, with recommendations for treatment protocols.",
            &["Dr. James Wilson", "Dr. Lisa Park"],
            PaperCategory::CaseStudy,
            "Neurology",
            &["neurology", "COVID-19", "post-viral syndrome"],
            date(2024, 1, 10),
            189,
            "/research/paper2.pdf",
        ),
        paper(
            "Pediatric Emergency Medicine: New Guidelines and Protocols",
            "Updated guidelines for pediatric emergency care, including new protocols for common pediatric emergencies and trauma management.",
            &["Dr. Emily Rodriguez", "Dr. David Kim"],
            PaperCategory::Guidelines,
            "Pediatrics",
            &["pediatrics", "emergency medicine", "guidelines"],
            date(2024, 1, 8),
            156,
            "/research/paper3.pdf",
        ),
        paper(
            "Controversial Treatment Methods in Oncology",
            "A survey of alternative oncology treatments reported by practitioners.",
            &["Dr. John Doe"],
            PaperCategory::ReviewArticle,
            "Oncology",
            &["oncology", "alternative treatment"],
            date(2024, 1, 5),
            41,
            "/research/paper4.pdf",
        ),
    ]
}

fn flag_for(
    content: ContentRef,
    title: &str,
    author: &str,
    reporter: MemberID,
    reason: &str,
    date: NaiveDate,
) -> FlaggedItem {
    FlaggedItem {
        id: FlagID::new(),
        content,
        title: title.to_string(),
        author: author.to_string(),
        reported_by: reporter,
        reason: reason.to_string(),
        date,
        status: FlagStatus::Pending,
    }
}

/// La base complète de démonstration
pub fn demo_database() -> Database {
    let mut db = Database::default();

    let admin = admin_member();
    let demo = demo_member();
    let directory = directory_members();

    let mut everyone = vec![admin.clone(), demo.clone()];
    everyone.extend(directory.iter().cloned());

    let cases = case_records(&everyone);
    let papers = research_papers(&everyone);

    let sarah = &directory[0];
    let michael = &directory[1];

    let mut flags = Vec::new();
    if let Some(paper) = papers.iter().find(|p| p.title.starts_with("Controversial")) {
        flags.push(flag_for(
            ContentRef::Paper(paper.id),
            &paper.title,
            "Dr. John Doe",
            sarah.id,
            "Unsubstantiated claims",
            date(2024, 1, 14),
        ));
    }
    if let Some(case) = cases.iter().find(|c| c.title.starts_with("Patient Privacy")) {
        flags.push(flag_for(
            ContentRef::Case(case.id),
            &case.title,
            &case.author_name,
            michael.id,
            "Privacy violation",
            date(2024, 1, 13),
        ));
    }

    let mut with_sarah = Conversation::new(Topic::Direct, vec![demo.id, sarah.id]);
    let sent_at = |hour, minute| {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0)
            .single()
            .unwrap_or_default()
    };
    with_sarah.messages = vec![
        Message {
            id: 1,
            sender: sarah.id,
            body: MessageBody::Text {
                text: "Hi! I wanted to discuss the latest cardiology guidelines.".to_string(),
            },
            sent_at: sent_at(10, 30),
            delivered: true,
            seen: true,
            seen_by: BTreeSet::from([demo.id]),
        },
        Message {
            id: 2,
            sender: demo.id,
            body: MessageBody::Text {
                text: "Absolutely! I found some interesting points in the recent ACC/AHA guidelines."
                    .to_string(),
            },
            sent_at: sent_at(10, 32),
            delivered: true,
            seen: true,
            seen_by: BTreeSet::from([sarah.id]),
        },
        Message {
            id: 3,
            sender: sarah.id,
            body: MessageBody::Text {
                text: "Thanks for sharing that research paper!".to_string(),
            },
            sent_at: sent_at(11, 5),
            delivered: true,
            seen: false,
            seen_by: BTreeSet::new(),
        },
    ];

    for member in everyone.into_iter().chain(pending_members()) {
        db.store_member(member).expect("Duplicate demo member");
    }
    for case in cases {
        db.cases.create(case).expect("Duplicate demo case");
    }
    for paper in papers {
        db.papers.create(paper).expect("Duplicate demo paper");
    }
    for flag in flags {
        db.flags.create(flag).expect("Duplicate demo flag");
    }
    db.conversations
        .create(with_sarah)
        .expect("Duplicate demo conversation");

    db
}
