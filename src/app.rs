//! Application facade for sqlcoach.
//!
//! Wires the lifecycle manager, query engine, question catalog, and answer
//! verifier together behind one object that front ends can hold.

use std::sync::Arc;

use crate::config::Config;
use crate::db::{
    introspect, BundledScripts, DatabaseKind, DatabaseManager, DirectoryScripts, Schema,
    ScriptSource, TabularResult,
};
use crate::error::Result;
use crate::grading::{
    AnswerVerifier, NoopProgress, ProgressSink, QuestionCatalog, ValidationOutcome,
};
use crate::query::{ExecuteOptions, QueryEngine, SyntaxCheck};
use tracing::info;

/// A running sqlcoach instance.
pub struct App {
    manager: Arc<DatabaseManager>,
    engine: QueryEngine,
    verifier: AnswerVerifier,
    catalog: Arc<QuestionCatalog>,
}

impl App {
    /// Opens both stores and loads the question catalog.
    pub async fn start(config: &Config) -> Result<Self> {
        Self::start_with_progress(config, Arc::new(NoopProgress)).await
    }

    /// Like [`App::start`], reporting grading progress to `progress`.
    pub async fn start_with_progress(
        config: &Config,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Self> {
        let scripts: Arc<dyn ScriptSource> = match &config.database.scripts_dir {
            Some(dir) => {
                info!("Loading database scripts from {}", dir.display());
                Arc::new(DirectoryScripts::new(dir))
            }
            None => Arc::new(BundledScripts),
        };

        let catalog = match &config.questions.catalog_path {
            Some(path) => {
                info!("Loading question catalog from {}", path.display());
                QuestionCatalog::load_from_file(path)?
            }
            None => QuestionCatalog::builtin(),
        };
        let catalog = Arc::new(catalog);

        let manager = Arc::new(DatabaseManager::new(
            config.database.main_path.clone(),
            scripts,
        ));
        manager.open().await?;

        let engine = QueryEngine::new(config.execution.options());
        let verifier = AnswerVerifier::new(manager.clone(), catalog.clone(), engine.clone())
            .with_progress(progress);

        info!("Loaded {} practice questions", catalog.len());
        Ok(Self {
            manager,
            engine,
            verifier,
            catalog,
        })
    }

    /// Executes a statement with the configured bounds.
    pub async fn execute(&self, sql: &str, kind: DatabaseKind) -> Result<TabularResult> {
        let options = *self.engine.options();
        self.execute_with(sql, kind, &options).await
    }

    /// Executes a statement with explicit bounds.
    ///
    /// `Err` only when the store is not open; statement faults come back as
    /// a failed result.
    pub async fn execute_with(
        &self,
        sql: &str,
        kind: DatabaseKind,
        options: &ExecuteOptions,
    ) -> Result<TabularResult> {
        let handle = self.manager.handle(kind)?;
        Ok(self.engine.execute_with(sql, &handle, options).await)
    }

    pub async fn validate_syntax(&self, sql: &str, kind: DatabaseKind) -> Result<SyntaxCheck> {
        let handle = self.manager.handle(kind)?;
        Ok(self.engine.validate_syntax(sql, &handle).await)
    }

    /// Grades a submission against a question's reference solution.
    pub async fn validate(&self, question_id: &str, sql: &str) -> Result<ValidationOutcome> {
        self.verifier.validate(question_id, sql).await
    }

    /// Restores the Practice store to its seed state.
    pub async fn reset(&self) -> Result<()> {
        self.manager.reset().await
    }

    pub async fn introspect(&self, kind: DatabaseKind) -> Result<Schema> {
        let handle = self.manager.handle(kind)?;
        introspect(&handle).await
    }

    pub fn questions(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn manager(&self) -> &Arc<DatabaseManager> {
        &self.manager
    }

    /// Closes both stores.
    pub async fn shutdown(&self) {
        self.manager.close().await;
    }
}
