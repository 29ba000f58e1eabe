use crate::app::agents::{make_schema, merge_columns, sanitize_column, AgentDraft, AgentRegistry};
use crate::app::emission::{
    calculate_emission, generate_report, save_report, submit_prompts, upload_dataset,
};
use crate::app::presenter::{self, Presented};
use crate::app::processing::{build_destinations, collect_submission, ProcessingEngine};
use crate::app::session::Session;
use crate::app::verification::{parse_cell_ref, SaveOutcome, VerificationService};
use crate::core::render::{render_processing_summary, render_raw};
use crate::utils::error::{ConsoleError, Result};
use async_trait::async_trait;
use clap::Parser;
use std::collections::BTreeMap;

/// 一個具名動作
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn about(&self) -> &'static str;

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String>;
}

/// 以 clap 解析單一動作的參數
fn parse_args<A: Parser>(action: &str, args: &[String]) -> Result<A> {
    A::try_parse_from(std::iter::once(action.to_string()).chain(args.iter().cloned())).map_err(
        |e| ConsoleError::UsageError {
            message: e.to_string().trim_end().to_string(),
        },
    )
}

fn parse_key_val(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))
}

/// 依空白切開一行輸入，支援單引號與雙引號
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(ConsoleError::UsageError {
            message: "Unterminated quote in input".to_string(),
        });
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// 動作名稱對應處理器的分派表
pub struct ActionRouter {
    handlers: BTreeMap<&'static str, Box<dyn ActionHandler>>,
}

impl Default for ActionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRouter {
    pub fn new() -> Self {
        let mut router = Self {
            handlers: BTreeMap::new(),
        };
        router.register(Box::new(SubmitAction));
        router.register(Box::new(ResultsAction));
        router.register(Box::new(AgentsAction));
        router.register(Box::new(SelectAction));
        router.register(Box::new(ContextAction));
        router.register(Box::new(CreateAgentAction));
        router.register(Box::new(ColumnsAction));
        router.register(Box::new(LoadAction));
        router.register(Box::new(PageAction));
        router.register(Box::new(FilterAction));
        router.register(Box::new(EditAction));
        router.register(Box::new(PreviewAction));
        router.register(Box::new(OpenAction));
        router.register(Box::new(DownloadAction));
        router.register(Box::new(CopyAction));
        router.register(Box::new(DatasetAction));
        router.register(Box::new(CalculateAction));
        router.register(Box::new(PromptsAction));
        router.register(Box::new(ReportAction));

        let mut text = String::from("Available actions:\n");
        for handler in router.handlers.values() {
            text.push_str(&format!("  {:<14}{}\n", handler.name(), handler.about()));
        }
        text.push_str(&format!("  {:<14}{}\n", "help", "Show this list"));
        router.register(Box::new(HelpAction { text }));
        router
    }

    pub fn register(&mut self, handler: Box<dyn ActionHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    pub async fn invoke(
        &self,
        session: &mut Session,
        action: &str,
        args: Vec<String>,
    ) -> Result<String> {
        let handler = self
            .handlers
            .get(action)
            .ok_or_else(|| ConsoleError::UnknownActionError {
                name: action.to_string(),
                available: self.names().join(", "),
            })?;
        tracing::debug!("Dispatching action '{}' with {} arg(s)", action, args.len());
        handler.run(session, args).await
    }

    /// 空白行回傳 None
    pub async fn dispatch(&self, session: &mut Session, line: &str) -> Result<Option<String>> {
        let mut words = split_line(line)?;
        if words.is_empty() {
            return Ok(None);
        }
        let action = words.remove(0);
        self.invoke(session, &action, words).await.map(Some)
    }
}

struct HelpAction {
    text: String,
}

#[async_trait]
impl ActionHandler for HelpAction {
    fn name(&self) -> &'static str {
        "help"
    }

    fn about(&self) -> &'static str {
        "Show this list"
    }

    async fn run(&self, _session: &mut Session, _args: Vec<String>) -> Result<String> {
        Ok(self.text.clone())
    }
}

#[derive(Debug, Parser)]
struct SubmitArgs {
    /// Files to upload
    #[arg(short, long = "file", required = true, num_args = 1..)]
    files: Vec<String>,

    /// Category text field, e.g. -c energy="grid electricity"
    #[arg(short, long = "category", value_parser = parse_key_val)]
    categories: Vec<(String, String)>,

    /// Print the raw JSON instead of the summary
    #[arg(long)]
    raw: bool,
}

struct SubmitAction;

#[async_trait]
impl ActionHandler for SubmitAction {
    fn name(&self) -> &'static str {
        "submit"
    }

    fn about(&self) -> &'static str {
        "Upload files to every processing webhook and selected agent"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: SubmitArgs = parse_args(self.name(), &args)?;

        let context = collect_submission(&session.inputs, &args.files, &args.categories).await?;
        let destinations = build_destinations(
            &session.config.webhooks.processing,
            &session.selected(),
            &session.agent_contexts,
        );
        let engine = ProcessingEngine::new(
            session.transport.clone(),
            session.status.clone(),
            session.config.webhooks.extraction.clone(),
        );

        let report = engine.run(&context, &destinations).await;
        let mut output = if args.raw {
            render_raw(&report)
        } else {
            render_processing_summary(&report)
        };

        if let Some(body) = report.html_source().filter(|_| session.config.output.auto_open) {
            let note = match presenter::open_or_preview(
                session.launcher.as_ref(),
                body,
                &session.temp_dir,
            )
            .await
            {
                Ok(Presented::Opened(path)) => format!("HTML report opened: {}", path.display()),
                Ok(Presented::Preview(html)) => format!("HTML preview:\n{}", html),
                Err(e) => {
                    tracing::warn!("Could not present extraction result: {}", e);
                    String::new()
                }
            };
            // --raw 的輸出維持純 JSON
            if !args.raw && !note.is_empty() {
                output.push_str("\n\n");
                output.push_str(&note);
            }
        }

        session.last_report = Some(report);
        Ok(output)
    }
}

#[derive(Debug, Parser)]
struct ResultsArgs {
    #[arg(long)]
    raw: bool,
}

struct ResultsAction;

#[async_trait]
impl ActionHandler for ResultsAction {
    fn name(&self) -> &'static str {
        "results"
    }

    fn about(&self) -> &'static str {
        "Show the last submission results"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: ResultsArgs = parse_args(self.name(), &args)?;
        let report = session
            .last_report
            .as_ref()
            .ok_or_else(|| ConsoleError::validation("No results yet. Run 'submit' first."))?;
        Ok(if args.raw {
            render_raw(report)
        } else {
            render_processing_summary(report)
        })
    }
}

struct AgentsAction;

#[async_trait]
impl ActionHandler for AgentsAction {
    fn name(&self) -> &'static str {
        "agents"
    }

    fn about(&self) -> &'static str {
        "Reload custom agents from the registry"
    }

    async fn run(&self, session: &mut Session, _args: Vec<String>) -> Result<String> {
        let registry = AgentRegistry::new(session.transport.as_ref(), &session.config.registry);
        let agents = registry.list().await;

        session.selected_agents.retain(|slug| agents.iter().any(|agent| &agent.slug == slug));
        session.agents = agents;

        if session.agents.is_empty() {
            return Ok("No custom agents available".to_string());
        }
        let lines: Vec<String> = session
            .agents
            .iter()
            .map(|agent| {
                let mark = if session.selected_agents.contains(&agent.slug) { "x" } else { " " };
                format!("[{}] {} (/py-agents/{})", mark, agent.name, agent.slug)
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

#[derive(Debug, Parser)]
struct SelectArgs {
    /// Agent slugs; an empty list clears the selection
    slugs: Vec<String>,
}

struct SelectAction;

#[async_trait]
impl ActionHandler for SelectAction {
    fn name(&self) -> &'static str {
        "select"
    }

    fn about(&self) -> &'static str {
        "Choose which custom agents receive the next submission"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: SelectArgs = parse_args(self.name(), &args)?;
        session.select_agents(&args.slugs)?;
        Ok(format!("{} custom agent(s) selected", session.selected_agents.len()))
    }
}

#[derive(Debug, Parser)]
struct ContextArgs {
    slug: String,
    /// Extra instructions sent as custom_context; empty clears it
    text: Vec<String>,
}

struct ContextAction;

#[async_trait]
impl ActionHandler for ContextAction {
    fn name(&self) -> &'static str {
        "context"
    }

    fn about(&self) -> &'static str {
        "Set the custom context text for one agent"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: ContextArgs = parse_args(self.name(), &args)?;
        let text = args.text.join(" ");
        if text.trim().is_empty() {
            session.agent_contexts.remove(&args.slug);
            Ok(format!("Context cleared for {}", args.slug))
        } else {
            session.agent_contexts.insert(args.slug.clone(), text);
            Ok(format!("Context set for {}", args.slug))
        }
    }
}

#[derive(Debug, Parser)]
struct CreateAgentArgs {
    #[arg(long)]
    name: String,

    /// Defaults to custom-agents/<slug of name>
    #[arg(long)]
    path: Option<String>,

    #[arg(long, default_value = "")]
    document_prompt: String,

    #[arg(long, default_value = "")]
    system_message: String,

    #[arg(long, default_value = "")]
    user_message: String,

    /// Extra output column, repeatable
    #[arg(long = "column")]
    columns: Vec<String>,

    /// Do not insert extracted rows into the database
    #[arg(long)]
    no_insert: bool,
}

struct CreateAgentAction;

#[async_trait]
impl ActionHandler for CreateAgentAction {
    fn name(&self) -> &'static str {
        "create-agent"
    }

    fn about(&self) -> &'static str {
        "Register a new custom agent"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: CreateAgentArgs = parse_args(self.name(), &args)?;
        let draft = AgentDraft {
            name: args.name,
            path: args.path,
            document_prompt: args.document_prompt,
            system_message: args.system_message,
            user_message: args.user_message,
            new_columns: args.columns,
            insert_to_db: !args.no_insert,
        };

        let registry = AgentRegistry::new(session.transport.as_ref(), &session.config.registry);
        let endpoint = registry.create(&draft).await?;
        Ok(format!("Python Agent Endpoint: {}", endpoint))
    }
}

#[derive(Debug, Parser)]
struct ColumnsArgs {
    /// Custom column to add to the output schema, repeatable
    #[arg(long = "add")]
    extra: Vec<String>,
}

struct ColumnsAction;

#[async_trait]
impl ActionHandler for ColumnsAction {
    fn name(&self) -> &'static str {
        "columns"
    }

    fn about(&self) -> &'static str {
        "Show the output JSON schema built from the table columns"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: ColumnsArgs = parse_args(self.name(), &args)?;
        let registry = AgentRegistry::new(session.transport.as_ref(), &session.config.registry);

        let extra: Vec<String> = args.extra.iter().map(|column| sanitize_column(column)).collect();
        let columns = merge_columns(&registry.table_columns().await, &extra);
        Ok(serde_json::to_string_pretty(&make_schema(&columns))?)
    }
}

fn render_page(session: &mut Session) -> Result<String> {
    let table = session.table_mut()?;
    Ok(format!(
        "{}\n{}\nPage {}",
        table.records_info(),
        table.page_as_tsv(),
        table.page_indicator()
    ))
}

struct LoadAction;

#[async_trait]
impl ActionHandler for LoadAction {
    fn name(&self) -> &'static str {
        "load"
    }

    fn about(&self) -> &'static str {
        "Load the verification records"
    }

    async fn run(&self, session: &mut Session, _args: Vec<String>) -> Result<String> {
        let service =
            VerificationService::new(session.transport.as_ref(), &session.config.verification);
        let view = service.load().await?;
        session.table = Some(view);
        render_page(session)
    }
}

#[derive(Debug, Parser)]
struct PageArgs {
    /// first, prev, next or last
    target: Option<String>,

    /// Records per page
    #[arg(long)]
    size: Option<String>,
}

struct PageAction;

#[async_trait]
impl ActionHandler for PageAction {
    fn name(&self) -> &'static str {
        "page"
    }

    fn about(&self) -> &'static str {
        "Move between pages or change the page size"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: PageArgs = parse_args(self.name(), &args)?;
        let table = session.table_mut()?;

        if let Some(size) = &args.size {
            table.set_page_size(size);
        }
        match args.target.as_deref() {
            None => {}
            Some("first") => table.first_page(),
            Some("prev") | Some("previous") => table.previous_page(),
            Some("next") => table.next_page(),
            Some("last") => table.last_page(),
            Some(other) => {
                return Err(ConsoleError::UsageError {
                    message: format!(
                        "Unknown page target '{}': use first, prev, next or last",
                        other
                    ),
                })
            }
        }
        render_page(session)
    }
}

#[derive(Debug, Parser)]
struct FilterArgs {
    /// Search text; empty shows every record
    query: Vec<String>,
}

struct FilterAction;

#[async_trait]
impl ActionHandler for FilterAction {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn about(&self) -> &'static str {
        "Filter the loaded records"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: FilterArgs = parse_args(self.name(), &args)?;
        session.table_mut()?.apply_filter(&args.query.join(" "));
        render_page(session)
    }
}

#[derive(Debug, Parser)]
struct EditArgs {
    /// Cell as <id>:<column>
    cell: String,

    /// New value
    #[arg(allow_hyphen_values = true)]
    value: Vec<String>,
}

struct EditAction;

#[async_trait]
impl ActionHandler for EditAction {
    fn name(&self) -> &'static str {
        "edit"
    }

    fn about(&self) -> &'static str {
        "Edit one cell: edit <id>:<column> <value>"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: EditArgs = parse_args(self.name(), &args)?;
        let (id, column) = parse_cell_ref(&args.cell).ok_or_else(|| ConsoleError::UsageError {
            message: format!("Expected <id>:<column>, got '{}'", args.cell),
        })?;

        let service =
            VerificationService::new(session.transport.as_ref(), &session.config.verification);
        let table = session
            .table
            .as_mut()
            .ok_or_else(|| ConsoleError::validation("No records loaded. Run 'load' first."))?;

        let mut edit = service.begin_edit(table, &id, &column)?;
        match service.commit(table, &mut edit, &args.value.join(" ")).await {
            Ok(SaveOutcome::Unchanged) => {
                Ok(format!("{}:{} unchanged ({})", id, column, edit.original()))
            }
            Ok(SaveOutcome::Saved { display }) => {
                Ok(format!("{}:{} saved as {}", id, column, display))
            }
            Err(e) => {
                tracing::debug!("{}:{} restored to '{}'", id, column, edit.original());
                Err(e)
            }
        }
    }
}

struct PreviewAction;

#[async_trait]
impl ActionHandler for PreviewAction {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn about(&self) -> &'static str {
        "Print the extraction HTML"
    }

    async fn run(&self, session: &mut Session, _args: Vec<String>) -> Result<String> {
        let body = presenter::html_source(session.last_report.as_ref())?;
        Ok(presenter::preview(body))
    }
}

struct OpenAction;

#[async_trait]
impl ActionHandler for OpenAction {
    fn name(&self) -> &'static str {
        "open"
    }

    fn about(&self) -> &'static str {
        "Open the extraction HTML in the system browser"
    }

    async fn run(&self, session: &mut Session, _args: Vec<String>) -> Result<String> {
        let body = presenter::html_source(session.last_report.as_ref())?;
        let presented =
            presenter::open_or_preview(session.launcher.as_ref(), body, &session.temp_dir).await?;
        match presented {
            Presented::Opened(path) => Ok(format!("HTML report opened: {}", path.display())),
            Presented::Preview(html) => Ok(html),
        }
    }
}

struct DownloadAction;

#[async_trait]
impl ActionHandler for DownloadAction {
    fn name(&self) -> &'static str {
        "download"
    }

    fn about(&self) -> &'static str {
        "Save the extraction HTML to the download directory"
    }

    async fn run(&self, session: &mut Session, _args: Vec<String>) -> Result<String> {
        let body = presenter::html_source(session.last_report.as_ref())?;
        let path = presenter::download(&session.downloads, body).await?;
        Ok(format!("HTML file downloaded: {}", path))
    }
}

struct CopyAction;

#[async_trait]
impl ActionHandler for CopyAction {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn about(&self) -> &'static str {
        "Copy the extraction HTML to the clipboard"
    }

    async fn run(&self, session: &mut Session, _args: Vec<String>) -> Result<String> {
        let body = presenter::html_source(session.last_report.as_ref())?;
        presenter::copy(session.clipboard.as_ref(), body)?;
        Ok("HTML content copied to clipboard!".to_string())
    }
}

#[derive(Debug, Parser)]
struct DatasetArgs {
    file: String,
}

struct DatasetAction;

#[async_trait]
impl ActionHandler for DatasetAction {
    fn name(&self) -> &'static str {
        "dataset"
    }

    fn about(&self) -> &'static str {
        "Upload an emission dataset"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: DatasetArgs = parse_args(self.name(), &args)?;
        let url = session
            .config
            .webhooks
            .dataset
            .clone()
            .ok_or_else(|| ConsoleError::MissingConfigError {
                field: "webhooks.dataset".to_string(),
            })?;

        session.dataset_stem = None;
        let upload = upload_dataset(
            &session.inputs,
            session.transport.as_ref(),
            &url,
            &args.file,
        )
        .await?;
        session.dataset_stem = upload.stem;
        Ok(upload.response.render())
    }
}

#[derive(Debug, Parser)]
struct CalculateArgs {
    /// Dataset name; defaults to the last uploaded dataset
    #[arg(long)]
    input: Option<String>,
}

struct CalculateAction;

#[async_trait]
impl ActionHandler for CalculateAction {
    fn name(&self) -> &'static str {
        "calculate"
    }

    fn about(&self) -> &'static str {
        "Calculate emission factors for the uploaded dataset"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: CalculateArgs = parse_args(self.name(), &args)?;
        let stem = args.input.or_else(|| session.dataset_stem.clone());
        let response = calculate_emission(
            session.transport.as_ref(),
            &session.config.webhooks.calculation,
            stem.as_deref(),
        )
        .await?;
        Ok(response.render())
    }
}

#[derive(Debug, Parser)]
struct PromptsArgs {
    prompts: Vec<String>,
}

struct PromptsAction;

#[async_trait]
impl ActionHandler for PromptsAction {
    fn name(&self) -> &'static str {
        "prompts"
    }

    fn about(&self) -> &'static str {
        "Send emission prompts"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: PromptsArgs = parse_args(self.name(), &args)?;
        let url = session
            .config
            .webhooks
            .emission_prompts
            .clone()
            .ok_or_else(|| ConsoleError::MissingConfigError {
                field: "webhooks.emission_prompts".to_string(),
            })?;
        let prompts = args.prompts.join(" ");
        let response = submit_prompts(session.transport.as_ref(), &url, &prompts).await?;
        Ok(response.render())
    }
}

#[derive(Debug, Parser)]
struct ReportArgs {
    /// Overrides the configured report webhook
    #[arg(long)]
    url: Option<String>,
}

struct ReportAction;

#[async_trait]
impl ActionHandler for ReportAction {
    fn name(&self) -> &'static str {
        "report"
    }

    fn about(&self) -> &'static str {
        "Generate the sustainability report and save it"
    }

    async fn run(&self, session: &mut Session, args: Vec<String>) -> Result<String> {
        let args: ReportArgs = parse_args(self.name(), &args)?;
        let url = args
            .url
            .unwrap_or_else(|| session.config.webhooks.report.clone());
        let report = generate_report(session.transport.as_ref(), &url).await?;
        let path = save_report(&session.downloads, &report).await?;
        Ok(format!("Report generated successfully: {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_line() {
        assert_eq!(
            split_line(r#"submit -f "my bill.pdf" -c energy='grid power'"#).unwrap(),
            vec!["submit", "-f", "my bill.pdf", "-c", "energy=grid power"]
        );
        assert_eq!(split_line("   ").unwrap(), Vec::<String>::new());
        assert_eq!(split_line(r#"context fleet """#).unwrap(), vec!["context", "fleet", ""]);
        assert!(split_line(r#"prompts "open"#).is_err());
    }

    #[test]
    fn test_key_val() {
        assert_eq!(
            parse_key_val("energy=grid=mix").unwrap(),
            ("energy".to_string(), "grid=mix".to_string())
        );
        assert!(parse_key_val("energy").is_err());
    }

    #[test]
    fn test_every_action_is_registered() {
        let router = ActionRouter::new();
        let names = router.names();
        for expected in [
            "help", "submit", "agents", "select", "context", "create-agent", "columns", "load",
            "page", "filter", "edit", "preview", "open", "download", "copy", "dataset",
            "calculate", "prompts", "report", "results",
        ] {
            assert!(names.contains(&expected), "missing action {}", expected);
        }
    }

    #[test]
    fn test_clap_usage_errors() {
        let err = parse_args::<SubmitArgs>("submit", &[]).unwrap_err();
        assert!(matches!(err, ConsoleError::UsageError { .. }));

        let args: SubmitArgs = parse_args(
            "submit",
            &["-f".into(), "a.pdf".into(), "b.csv".into(), "-c".into(), "water=well".into()],
        )
        .unwrap();
        assert_eq!(args.files, vec!["a.pdf", "b.csv"]);
        assert_eq!(args.categories, vec![("water".to_string(), "well".to_string())]);
    }
}
