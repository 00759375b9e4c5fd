//! Pipeline orchestrator
//!
//! Drives one run through its states, one unit at a time in configuration
//! order. The orchestrator owns the namespace and the diagnostics collector;
//! agents, the validator and the coercer only ever borrow them.
//!
//! Every sheet and paragraph ends in a [`UnitOutcome`] that is recorded under
//! its `PHASE:id` label, so nothing an agent, resolver or coercer raises can
//! escape the unit it belongs to.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use sheetdoc_agents::{AgentRegistry, ExtractorInit, GeneratorInit, ProviderRegistry};
use sheetdoc_core::{
    resolve_reference, ConfigValidator, Counts, DiagnosticRecord, Diagnostics, ExtractedNamespace,
    FieldPath, Injection, ParagraphMode, ParagraphTask, Phase, SheetTask, SkipPlan, TaskConfig,
    TypeCoercer, UnitOutcome, ValidationContext,
};

use crate::error::{PipelineError, RenderError};
use crate::render::{DocumentRenderer, HandlebarsRenderer, RenderContextBuilder};
use crate::settings::PipelineSettings;
use crate::state::{validate_transition, RunState};
use crate::workbook::Workbook;

/// What a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Final state, `Summarized` for every run that started
    pub state: RunState,
    /// Units excluded by validation
    pub skipped: SkipPlan,
    /// Context handed to the renderer
    pub context: Map<String, Value>,
    /// Generated paragraph text by id
    pub generated: IndexMap<String, String>,
    /// Rendered document, if rendering succeeded
    pub output: Option<PathBuf>,
    /// Diagnostics artifact, if it was written
    pub diagnostics_path: Option<PathBuf>,
    /// Aggregate counts
    pub counts: Counts,
    /// Every record, in order
    pub diagnostics: Vec<DiagnosticRecord>,
}

impl RunReport {
    /// Check if the document was written
    #[inline]
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.output.is_some()
    }
}

/// Result of resolving one paragraph
enum Resolved {
    /// Narrative text to store under the paragraph id
    Text(String),
    /// Values projected into the namespace; nothing to store
    Filled,
}

/// One pipeline run
pub struct Pipeline {
    settings: PipelineSettings,
    agents: AgentRegistry,
    providers: ProviderRegistry,
    renderer: Box<dyn DocumentRenderer>,
    coercer: TypeCoercer,
    state: RunState,
    diagnostics: Diagnostics,
    namespace: ExtractedNamespace,
    /// Present null leaves a fill paragraph defaulted
    null_defaults: Vec<FieldPath>,
    generated: IndexMap<String, String>,
    aliases: Vec<(String, String)>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("settings", &self.settings)
            .field("agents", &self.agents)
            .field("providers", &self.providers)
            .field("state", &self.state)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Create a run with the built-in agents, no providers and the
    /// Handlebars renderer
    #[must_use]
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            coercer: TypeCoercer::new(settings.percent_as_fraction),
            settings,
            agents: AgentRegistry::with_defaults(),
            providers: ProviderRegistry::new(),
            renderer: Box::new(HandlebarsRenderer::new()),
            state: RunState::ConfigLoaded,
            diagnostics: Diagnostics::new(),
            namespace: ExtractedNamespace::new(),
            null_defaults: Vec::new(),
            generated: IndexMap::new(),
            aliases: Vec::new(),
        }
    }

    /// With agent registry
    #[inline]
    #[must_use]
    pub fn with_agents(mut self, agents: AgentRegistry) -> Self {
        self.agents = agents;
        self
    }

    /// With provider registry
    #[inline]
    #[must_use]
    pub fn with_providers(mut self, providers: ProviderRegistry) -> Self {
        self.providers = providers;
        self
    }

    /// With document renderer
    #[inline]
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl DocumentRenderer + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Run every phase and summarize
    ///
    /// Never fails: anything that goes wrong after configuration and source
    /// loading is a diagnostic in the returned report.
    #[tracing::instrument(skip_all, fields(sheets = tasks.sheets.len(), paragraphs = tasks.paragraphs.len()))]
    pub async fn run(mut self, tasks: &TaskConfig, workbook: &dyn Workbook) -> RunReport {
        let skipped = self.validate(tasks, workbook);
        self.extract_all(tasks, workbook, &skipped).await;
        self.resolve_all(tasks, &skipped).await;
        let (context, output) = self.render();
        let diagnostics_path = self.summarize();

        RunReport {
            state: self.state,
            skipped,
            context,
            generated: self.generated,
            output,
            diagnostics_path,
            counts: self.diagnostics.counts(),
            diagnostics: self.diagnostics.items().to_vec(),
        }
    }

    fn advance(&mut self, to: RunState) {
        if let Err(err) = validate_transition(self.state, to) {
            tracing::error!(%err, "run state machine violated");
        }
        tracing::debug!(from = ?self.state, ?to, "state transition");
        self.state = to;
    }

    // ------------------------------------------------------------------
    // Validate
    // ------------------------------------------------------------------

    fn validate(&mut self, tasks: &TaskConfig, workbook: &dyn Workbook) -> SkipPlan {
        let mut context = ValidationContext::new(self.settings.prompt_root());
        if let Some(template) = &self.settings.template {
            context = context.with_template(template);
        }
        let plan = ConfigValidator::with_context(context).validate(
            tasks,
            &workbook.sheet_names(),
            &mut self.diagnostics,
        );
        self.advance(RunState::Validated);
        plan
    }

    // ------------------------------------------------------------------
    // Extract
    // ------------------------------------------------------------------

    async fn extract_all(&mut self, tasks: &TaskConfig, workbook: &dyn Workbook, plan: &SkipPlan) {
        self.advance(RunState::Extracting);
        for (sheet, task) in tasks.sheets.parsed() {
            if plan.is_sheet_skipped(sheet) {
                continue;
            }
            let outcome = UnitOutcome::from(self.extract_sheet(sheet, task, workbook).await);
            if outcome.record(&Phase::Extract.at(sheet), &mut self.diagnostics).is_some() {
                tracing::info!(sheet, "sheet extracted");
            }
        }
    }

    async fn extract_sheet(
        &mut self,
        sheet: &str,
        task: &SheetTask,
        workbook: &dyn Workbook,
    ) -> Result<(), PipelineError> {
        let table = workbook.sheet(sheet)?;
        let provider = task
            .provider
            .as_deref()
            .unwrap_or(&self.settings.default_provider);
        let service = self.providers.get(provider)?;
        let agent = task.agent.as_deref().unwrap_or(&self.settings.extractor);
        let extractor = self.agents.build_extractor(
            agent,
            ExtractorInit {
                table,
                fields: task.fields.clone(),
                prompt_path: resolve_reference(self.settings.prompt_root(), &task.prompt),
                service,
            },
        )?;

        let raw = extractor.extract().await?;
        let record = self
            .coercer
            .coerce(sheet, &raw, &task.fields, &mut self.diagnostics);
        self.namespace.insert_sheet(sheet, record)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Resolve
    // ------------------------------------------------------------------

    async fn resolve_all(&mut self, tasks: &TaskConfig, plan: &SkipPlan) {
        self.advance(RunState::Resolving);
        for (id, task) in tasks.paragraphs.parsed() {
            if plan.is_paragraph_skipped(id) {
                continue;
            }
            let location = Phase::Para.at(id);
            let outcome = self.resolve_paragraph(id, task, &location).await;
            match outcome.record(&location, &mut self.diagnostics) {
                Some(Resolved::Text(text)) => {
                    tracing::info!(paragraph = id, chars = text.len(), "paragraph generated");
                    if let Some(alias) = task.placeholder.as_deref().filter(|a| !a.is_empty()) {
                        self.aliases.push((alias.to_string(), text.clone()));
                    }
                    self.generated.insert(id.to_string(), text);
                }
                Some(Resolved::Filled) => tracing::info!(paragraph = id, "paragraph filled"),
                None => {}
            }
        }
    }

    async fn resolve_paragraph(
        &mut self,
        id: &str,
        task: &ParagraphTask,
        location: &str,
    ) -> UnitOutcome<Resolved> {
        let paths = task.dependency_paths();
        match task.mode() {
            ParagraphMode::Fill => self.fill(&paths, location).into(),
            ParagraphMode::Generate => {
                let view = self.view();
                let missing: Vec<String> = paths
                    .iter()
                    .filter(|p| view.resolve(p).is_null())
                    .map(ToString::to_string)
                    .collect();
                if !missing.is_empty() {
                    return UnitOutcome::skipped(format!(
                        "unresolved dependencies {}; generation skipped",
                        missing.join(", ")
                    ));
                }
                self.generate(id, task).await.into()
            }
        }
    }

    /// Default every qualified dependency that resolves to null
    ///
    /// Missing leaves get the placeholder injected into the namespace. A
    /// present null leaf stays null there and is defaulted in [`Self::view`].
    fn fill(&mut self, paths: &[FieldPath], location: &str) -> Result<Resolved, PipelineError> {
        let placeholder = Value::String(self.settings.fill_placeholder.clone());
        for path in paths {
            if !path.is_qualified() || !self.view().resolve(path).is_null() {
                continue;
            }
            let injection = self.namespace.inject_default(path, placeholder.clone())?;
            if injection == Injection::AlreadyPresent {
                self.null_defaults.push(path.clone());
            }
            self.diagnostics.warn(
                location,
                format!(
                    "dependency {path} unresolved; default '{}' used",
                    self.settings.fill_placeholder
                ),
            );
        }
        Ok(Resolved::Filled)
    }

    /// Namespace as later paragraphs and the renderer see it
    fn view(&self) -> ExtractedNamespace {
        let placeholder = Value::String(self.settings.fill_placeholder.clone());
        self.namespace.with_null_defaults(&self.null_defaults, &placeholder)
    }

    async fn generate(&self, id: &str, task: &ParagraphTask) -> Result<Resolved, PipelineError> {
        let reference = task.prompt_ref().unwrap_or_default();
        let provider = task
            .provider
            .as_deref()
            .unwrap_or(&self.settings.default_provider);
        let service = self.providers.get(provider)?;
        let agent = task.agent.as_deref().unwrap_or(&self.settings.generator);
        let generator = self.agents.build_generator(
            agent,
            GeneratorInit {
                paragraph: id.to_string(),
                prompt_path: resolve_reference(self.settings.prompt_root(), reference),
                context: self
                    .view()
                    .as_value()
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                service,
            },
        )?;
        Ok(Resolved::Text(generator.generate().await?))
    }

    // ------------------------------------------------------------------
    // Render and summarize
    // ------------------------------------------------------------------

    fn render(&mut self) -> (Map<String, Value>, Option<PathBuf>) {
        let mut builder =
            RenderContextBuilder::new(&self.view()).with_paragraphs(&self.generated);
        for (alias, text) in &self.aliases {
            builder = builder.with_alias(alias, text);
        }
        let context = builder.build();

        let output_path = self.settings.output_path();
        let result = match &self.settings.template {
            Some(template) => self.renderer.render(template, &context, &output_path),
            None => Err(RenderError::NoTemplate),
        };
        let output = UnitOutcome::from(result).record(
            &Phase::Render.at(output_path.display()),
            &mut self.diagnostics,
        );

        self.advance(RunState::Rendered);
        (context, output)
    }

    fn summarize(&mut self) -> Option<PathBuf> {
        self.advance(RunState::Summarized);
        let path = self.settings.diagnostics_path();
        match self.diagnostics.persist(&path) {
            Ok(report) => {
                tracing::info!(
                    errors = report.counts.errors,
                    warnings = report.counts.warnings,
                    "run summarized"
                );
                Some(path)
            }
            Err(err) => {
                tracing::error!(%err, "diagnostics could not be written");
                None
            }
        }
    }
}
