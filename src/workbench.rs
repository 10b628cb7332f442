//! Page-level state: the dataset catalog, the shared dataset/language selection,
//! both session controllers and the leaderboard.
//!
//! This module owns:
//!   - the dataset catalog (fetched once, read-only afterwards)
//!   - the current dataset and target language, mirrored into both controllers
//!   - the practice and test `TurnSessionController`s
//!   - the `Leaderboard`
//!
//! Changing the dataset resets both sessions, the way the page does when the
//! dataset dropdown changes.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::api::{DatasetCatalogApi, HttpBackend, LeaderboardApi, ScoringApi};
use crate::config::ClientConfig;
use crate::controller::TurnSessionController;
use crate::domain::{language_name, DatasetKind, Mode, LANGUAGES};
use crate::error::{ApiError, SessionError};
use crate::leaderboard::Leaderboard;
use crate::protocol::{ComplexExample, DatasetCatalog, DatasetExample};

const NO_LANGUAGE: &str = "Please select a language";

/// Instructions panel for the selected dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstructionsView {
    pub dataset: DatasetKind,
    pub description: String,
    pub instructions: Vec<String>,
    pub scoring: String,
    pub example: Option<ExampleView>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExampleView {
    pub input: String,
    pub output: String,
}

/// What changed after a dataset switch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetSelection {
    pub instructions: Option<InstructionsView>,
    pub practice_example: Option<ComplexExample>,
    pub test_example: Option<ComplexExample>,
}

pub struct Workbench {
    catalog_api: Arc<dyn DatasetCatalogApi>,
    catalog: Option<DatasetCatalog>,
    dataset: Option<DatasetKind>,
    target_language: Option<String>,
    practice: TurnSessionController,
    test: TurnSessionController,
    leaderboard: Leaderboard,
}

impl Workbench {
    pub fn new(
        cfg: &ClientConfig,
        catalog_api: Arc<dyn DatasetCatalogApi>,
        scoring: Arc<dyn ScoringApi>,
        board: Arc<dyn LeaderboardApi>,
    ) -> Self {
        let default_category = cfg
            .leaderboard
            .default_category
            .parse::<DatasetKind>()
            .unwrap_or_else(|e| {
                warn!(target: "promptlab", error = %e, "Invalid default leaderboard category; using text_summarization");
                DatasetKind::TextSummarization
            });
        Self {
            catalog_api,
            catalog: None,
            dataset: None,
            target_language: None,
            practice: TurnSessionController::new(Mode::Practice, scoring.clone(), cfg),
            test: TurnSessionController::new(Mode::Test, scoring, cfg),
            leaderboard: Leaderboard::new(board, default_category),
        }
    }

    /// Wire every collaborator to one HTTP backend.
    pub fn with_backend(cfg: &ClientConfig, backend: Arc<HttpBackend>) -> Self {
        Self::new(cfg, backend.clone(), backend.clone(), backend)
    }

    /// Fetch the dataset catalog. Only the first successful load hits the backend.
    #[instrument(level = "info", skip(self))]
    pub async fn load_catalog(&mut self) -> Result<usize, ApiError> {
        if let Some(catalog) = &self.catalog {
            return Ok(catalog.len());
        }
        match self.catalog_api.dataset_catalog().await {
            Ok(catalog) => {
                let n = catalog.len();
                for key in catalog.keys() {
                    if key.parse::<DatasetKind>().is_err() {
                        warn!(target: "promptlab", %key, "Catalog lists a dataset this client does not know");
                    }
                }
                self.catalog = Some(catalog);
                Ok(n)
            }
            Err(e) => {
                error!(target: "promptlab", error = %e, "Error loading dataset config");
                Err(e)
            }
        }
    }

    pub fn dataset(&self) -> Option<DatasetKind> {
        self.dataset
    }

    pub fn target_language(&self) -> Option<&str> {
        self.target_language.as_deref()
    }

    pub fn practice(&self) -> &TurnSessionController {
        &self.practice
    }

    pub fn test(&self) -> &TurnSessionController {
        &self.test
    }

    pub fn controller(&self, mode: Mode) -> &TurnSessionController {
        match mode {
            Mode::Practice => &self.practice,
            Mode::Test => &self.test,
        }
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn leaderboard_mut(&mut self) -> &mut Leaderboard {
        &mut self.leaderboard
    }

    /// Switch dataset on both sessions and refresh the instructions.
    #[instrument(level = "info", skip(self))]
    pub async fn select_dataset(&mut self, dataset: Option<DatasetKind>) -> DatasetSelection {
        self.dataset = dataset;
        if dataset.map(DatasetKind::requires_target_language) != Some(true) {
            self.target_language = None;
            tokio::join!(self.practice.set_target_language(None), self.test.set_target_language(None));
        }

        let (practice_example, test_example) =
            tokio::join!(self.practice.select_dataset(dataset), self.test.select_dataset(dataset));
        info!(target: "promptlab", dataset = ?dataset, "Dataset selected");

        DatasetSelection { instructions: self.instructions(), practice_example, test_example }
    }

    /// Pick the translation target language for both sessions.
    pub async fn set_target_language(&mut self, code: &str) -> Result<Option<InstructionsView>, SessionError> {
        let code = code.trim();
        if !LANGUAGES.iter().any(|(c, _)| *c == code) {
            let known: Vec<&str> = LANGUAGES.iter().map(|(c, _)| *c).collect();
            return Err(SessionError::Validation(format!(
                "Unknown target language '{}' (choose one of {})",
                code,
                known.join(", ")
            )));
        }
        self.target_language = Some(code.to_string());
        tokio::join!(self.practice.set_target_language(Some(code)), self.test.set_target_language(Some(code)));
        info!(target: "promptlab", %code, language = language_name(code), "Target language selected");
        Ok(self.instructions())
    }

    pub async fn set_name(&self, name: &str) {
        self.test.set_name(name).await;
    }

    /// Instructions for the current dataset, if the catalog has an entry for it.
    pub fn instructions(&self) -> Option<InstructionsView> {
        let dataset = self.dataset?;
        let info = match self.catalog.as_ref().and_then(|c| c.get(dataset.key())) {
            Some(info) => info,
            None => {
                warn!(target: "promptlab", %dataset, "No catalog entry for dataset; instructions not shown");
                return None;
            }
        };

        let example = info.example.as_ref().map(|ex| match ex {
            DatasetExample::Plain { input, output } => ExampleView { input: input.clone(), output: output.clone() },
            DatasetExample::Translations { input, translations } => ExampleView {
                input: input.clone(),
                output: self
                    .target_language
                    .as_deref()
                    .and_then(|code| translations.get(code))
                    .cloned()
                    .unwrap_or_else(|| NO_LANGUAGE.to_string()),
            },
        });

        Some(InstructionsView {
            dataset,
            description: info.description.clone(),
            instructions: info.instructions.clone(),
            scoring: info.scoring.clone(),
            example,
        })
    }
}
