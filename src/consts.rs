//! Constantes globales et configuration de l'application.

use std::{env, path::PathBuf};

use log::LevelFilter;

pub const DB_FILE: &str = "database.json"; // Fichier JSON de la base de données.
pub const LOG_FILE: &str = "./medportal.log"; // Fichier de journalisation.

pub const OTP_LENGTH: usize = 6; // Nombre de chiffres d'un code à usage unique.
pub const OTP_MAX_ATTEMPTS: u8 = 3; // Essais avant invalidation du code.

pub const MAX_SHORT_TEXT_LENGTH: usize = 250;
pub const MAX_LONG_TEXT_LENGTH: usize = 5_000;

/// Configuration du binaire, lue depuis l'environnement (et un éventuel `.env`)
#[derive(Debug, Clone)]
pub struct Config {
    pub db_file: PathBuf,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
    /// Remplit une base vide avec les données de démonstration
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_file: DB_FILE.into(),
            log_file: LOG_FILE.into(),
            log_level: LevelFilter::Info,
            seed_demo: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let default = Self::default();

        Self {
            db_file: env::var("MEDPORTAL_DB").map_or(default.db_file, PathBuf::from),
            log_file: env::var("MEDPORTAL_LOG").map_or(default.log_file, PathBuf::from),
            log_level: env::var("MEDPORTAL_LOG_LEVEL")
                .ok()
                .and_then(|level| level.parse().ok())
                .unwrap_or(default.log_level),
            seed_demo: env::var("MEDPORTAL_SEED")
                .map(|value| value != "0" && !value.eq_ignore_ascii_case("false"))
                .unwrap_or(default.seed_demo),
        }
    }
}
