use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use outliner_core::{
    CollapseStatus, Document, EditAction, EditOutcome, EditorState, NodeAction, NodeId, NodeProps,
};
use outliner_project::{BackupStore, OutlineStore, WorkspaceLayout};
use outliner_settings::{Preferences, PreferencesStore};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "OUTLINER_LOG";

#[derive(Parser)]
#[command(
    name = "outliner-cli",
    about = "Edit a hierarchical outline from the command line",
    author,
    version
)]
struct Cli {
    /// 指定工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 於標準錯誤輸出除錯紀錄。 / Print debug logs to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 建立初始大綱資料檔。 / Create the outline data file if it does not exist.
    Init,
    /// 匯入/匯出偏好設定。 / Import or export preferences.
    #[command(subcommand)]
    Preferences(PreferencesCommand),
    #[command(flatten)]
    Outline(OutlineCommand),
}

/// Commands that operate on the loaded outline.
#[derive(Subcommand)]
enum OutlineCommand {
    /// 顯示大綱。 / Print the outline.
    Show(ShowArgs),
    /// 新增節點並輸出其代號。 / Add a node and print its identifier.
    Add(AddArgs),
    /// 修改節點文字。 / Replace the text of a node.
    Edit(EditArgs),
    /// 將節點移入前一個兄弟節點之下。 / Move a node under its previous sibling.
    Indent(NodeArgs),
    /// 將節點提升一層並收養其後的兄弟節點。 / Move a node up one level, adopting its trailing siblings.
    Outdent(NodeArgs),
    /// 刪除節點及其子樹。 / Delete a node and its subtree.
    Delete(NodeArgs),
    /// 折疊節點。 / Collapse a node.
    Collapse(NodeArgs),
    /// 展開節點。 / Expand a node.
    Expand(NodeArgs),
    /// 切換折疊狀態。 / Toggle the collapse state of a node.
    Toggle(NodeArgs),
    /// 加入我的最愛。 / Add a node to the favorites.
    Favorite(NodeArgs),
    /// 自我的最愛移除。 / Remove a node from the favorites.
    Unfavorite(NodeArgs),
    /// 列出我的最愛。 / List favorite nodes.
    Favorites,
    /// 以大綱文字檔取代目前文件。 / Replace the outline with an outline-text file.
    Import(ImportArgs),
    /// 輸出大綱文字。 / Write the outline as indented text.
    Export(ExportArgs),
    /// 立即建立備份。 / Write a backup now.
    Backup,
    /// 列出備份（新到舊）。 / List backups, newest first.
    Backups,
}

#[derive(Args)]
struct ShowArgs {
    /// 只顯示此節點的子樹。 / Only show the subtree below this node.
    #[arg(long, value_name = "ID")]
    focus: Option<String>,
    /// 同時輸出節點代號。 / Print node identifiers.
    #[arg(long)]
    ids: bool,
}

#[derive(Args)]
struct AddArgs {
    /// 節點文字。 / Text of the new node.
    text: String,
    /// 作為此節點的最後一個子節點。 / Append as the last child of this node.
    #[arg(long, value_name = "ID", conflicts_with = "after")]
    parent: Option<String>,
    /// 插入於此節點之後。 / Insert right after this node.
    #[arg(long, value_name = "ID")]
    after: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    /// 節點代號或唯一前綴。 / Node identifier or unique prefix.
    id: String,
    /// 新的文字。 / New text.
    text: String,
}

#[derive(Args)]
struct NodeArgs {
    /// 節點代號或唯一前綴。 / Node identifier or unique prefix.
    id: String,
}

#[derive(Args)]
struct ImportArgs {
    /// 大綱文字檔。 / Outline-text file to import.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

#[derive(Args)]
struct ExportArgs {
    /// 輸出檔案；預設輸出至標準輸出。 / Output file; defaults to stdout.
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum PreferencesCommand {
    /// 匯出偏好設定。 / Export preferences to a file.
    Export(PreferencesExportArgs),
    /// 匯入偏好設定。 / Import preferences from a file.
    Import(PreferencesImportArgs),
}

#[derive(Args)]
struct PreferencesExportArgs {
    /// 匯出的目標路徑。 / Destination path.
    #[arg(long, value_name = "FILE")]
    output: PathBuf,
}

#[derive(Args)]
struct PreferencesImportArgs {
    /// 欲匯入的偏好設定檔。 / Preferences file to import.
    #[arg(value_name = "FILE")]
    input: PathBuf,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        verbose,
        command,
    } = Cli::parse();
    init_tracing(verbose);

    let workspace_root = resolve_workspace(workspace)?;
    let layout = WorkspaceLayout::new(&workspace_root);
    match command {
        Commands::Init => execute_init(&layout),
        Commands::Preferences(subcommand) => execute_preferences_command(subcommand, &layout),
        Commands::Outline(command) => {
            let mut session = Session::open(layout)?;
            execute_outline_command(command, &mut session)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // a subscriber may already be installed when embedded; logging is best effort
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loaded workspace: preferences, the outline and where it is stored.
struct Session {
    layout: WorkspaceLayout,
    prefs: Preferences,
    store: OutlineStore,
    editor: EditorState,
}

impl Session {
    fn open(layout: WorkspaceLayout) -> Result<Self> {
        let prefs = load_preferences(&layout)?.preferences().clone();
        let store = layout.outline_store(&prefs.storage);
        let document = match store
            .load()
            .with_context(|| format!("failed to load outline from {}", store.path().display()))?
        {
            Some(loaded) => loaded.document,
            None => {
                tracing::debug!(
                    path = %store.path().display(),
                    "starting from the initial outline"
                );
                Document::with_initial_text(prefs.outline.initial_text.clone())
            }
        };
        Ok(Self {
            layout,
            prefs,
            store,
            editor: EditorState::new(document),
        })
    }

    fn document(&self) -> &Document {
        &self.editor.document
    }

    fn apply(&mut self, action: EditAction) -> Result<EditOutcome> {
        let outcome = self.editor.apply(action)?;
        if outcome != EditOutcome::Unchanged {
            self.commit()?;
        }
        Ok(outcome)
    }

    /// Saves the outline and writes a backup when the newest one is old enough.
    fn commit(&self) -> Result<()> {
        self.store
            .save(self.document())
            .with_context(|| format!("failed to save outline to {}", self.store.path().display()))?;

        let storage = &self.prefs.storage;
        if !storage.backups_enabled {
            return Ok(());
        }
        let backups = self.layout.backup_store();
        let now = Utc::now();
        if backups
            .is_due(storage.backup_interval(), now)
            .context("failed to inspect backups")?
        {
            write_backup(&backups, self.document(), storage.backup_retention)?;
        }
        Ok(())
    }

    /// Accepts a full identifier or a unique, case-insensitive prefix of one.
    fn resolve(&self, input: &str) -> Result<NodeId> {
        if let Some(id) = NodeId::parse(input) {
            if self.document().contains(id) {
                return Ok(id);
            }
            bail!("no node with id {id}");
        }

        let prefix = input.trim().to_uppercase();
        if prefix.is_empty() {
            bail!("node id must not be empty");
        }
        let mut matches = self
            .document()
            .nodes()
            .ids()
            .filter(|id| id.to_string().starts_with(&prefix));
        let first = matches
            .next()
            .ok_or_else(|| anyhow!("no node id starts with '{input}'"))?;
        if matches.next().is_some() {
            bail!("node id prefix '{input}' is ambiguous");
        }
        Ok(first)
    }
}

fn execute_init(layout: &WorkspaceLayout) -> Result<()> {
    layout
        .ensure()
        .with_context(|| format!("failed to create {}", layout.data_dir().display()))?;
    let prefs_store = load_preferences(layout)?;
    if !prefs_store.path().exists() {
        prefs_store.save().with_context(|| {
            format!("failed to write preferences to {}", prefs_store.path().display())
        })?;
    }

    let prefs = prefs_store.preferences();
    let store = layout.outline_store(&prefs.storage);
    if store.path().exists() {
        println!("Outline already exists at {}", store.path().display());
        return Ok(());
    }
    let document = Document::with_initial_text(prefs.outline.initial_text.clone());
    store
        .save(&document)
        .with_context(|| format!("failed to save outline to {}", store.path().display()))?;
    println!("Created outline at {}", store.path().display());
    Ok(())
}

fn execute_outline_command(command: OutlineCommand, session: &mut Session) -> Result<()> {
    match command {
        OutlineCommand::Show(args) => show(args, session),
        OutlineCommand::Add(args) => add(args, session),
        OutlineCommand::Edit(args) => {
            let id = session.resolve(&args.id)?;
            session.apply(EditAction::Node(id, NodeAction::SetText(args.text)))?;
            Ok(())
        }
        OutlineCommand::Indent(args) => node_action(session, &args.id, NodeAction::IncreaseLevel),
        OutlineCommand::Outdent(args) => node_action(session, &args.id, NodeAction::DecreaseLevel),
        OutlineCommand::Delete(args) => {
            let id = session.resolve(&args.id)?;
            if let EditOutcome::Removed(removed) =
                session.apply(EditAction::Node(id, NodeAction::Delete))?
            {
                println!("Deleted {} node(s)", removed.len());
            }
            Ok(())
        }
        OutlineCommand::Collapse(args) => set_collapsed(session, &args.id, true),
        OutlineCommand::Expand(args) => set_collapsed(session, &args.id, false),
        OutlineCommand::Toggle(args) => node_action(session, &args.id, NodeAction::ToggleCollapse),
        OutlineCommand::Favorite(args) => {
            let id = session.resolve(&args.id)?;
            if session.document().favorites().contains(&id) {
                println!("{id} is already a favorite");
                return Ok(());
            }
            session.apply(EditAction::Favorite(id))?;
            Ok(())
        }
        OutlineCommand::Unfavorite(args) => {
            let id = session.resolve(&args.id)?;
            if session.apply(EditAction::Unfavorite(id))? == EditOutcome::Unchanged {
                println!("{id} is not a favorite");
            }
            Ok(())
        }
        OutlineCommand::Favorites => {
            for (id, text) in session.document().favorite_list() {
                println!("{id} {text}");
            }
            Ok(())
        }
        OutlineCommand::Import(args) => import_outline(args, session),
        OutlineCommand::Export(args) => export_outline(args, session),
        OutlineCommand::Backup => {
            let storage = &session.prefs.storage;
            let backups = session.layout.backup_store();
            let path = write_backup(&backups, session.document(), storage.backup_retention)?;
            println!("Wrote backup {}", path.display());
            Ok(())
        }
        OutlineCommand::Backups => {
            let backups = session.layout.backup_store();
            for entry in backups.list().context("failed to list backups")? {
                println!(
                    "{} {}",
                    entry.taken_at.format("%Y-%m-%d %H:%M"),
                    entry.path.display()
                );
            }
            Ok(())
        }
    }
}

fn show(args: ShowArgs, session: &Session) -> Result<()> {
    let focus = args
        .focus
        .as_deref()
        .map(|input| session.resolve(input))
        .transpose()?;
    let indent = " ".repeat(session.prefs.outline.indent_width);
    for row in session.document().visible_nodes(focus)? {
        let marker = match row.collapse_status {
            CollapseStatus::Collapsed => '+',
            CollapseStatus::Expanded => '-',
            CollapseStatus::Leaf => '*',
        };
        let padding = indent.repeat(row.level);
        if args.ids {
            println!("{padding}{marker} {} {}", row.id(), row.props.text);
        } else {
            println!("{padding}{marker} {}", row.props.text);
        }
    }
    Ok(())
}

fn add(args: AddArgs, session: &mut Session) -> Result<()> {
    let node = NodeProps::new(args.text);
    let added = match (args.parent, args.after) {
        (_, Some(after)) => {
            let sibling = session.resolve(&after)?;
            session.editor.document.append_after(node, sibling)?
        }
        (Some(parent), None) => {
            let parent = session.resolve(&parent)?;
            session.editor.document.append_to(node, parent)?
        }
        (None, None) => session.editor.document.append_to(node, NodeId::ROOT)?,
    };
    session.commit()?;
    println!("{added}");
    Ok(())
}

fn node_action(session: &mut Session, input: &str, action: NodeAction) -> Result<()> {
    let id = session.resolve(input)?;
    session.apply(EditAction::Node(id, action))?;
    Ok(())
}

fn set_collapsed(session: &mut Session, input: &str, collapsed: bool) -> Result<()> {
    let id = session.resolve(input)?;
    let document = &mut session.editor.document;
    let changed = if collapsed {
        document.collapse(id)
    } else {
        document.expand(id)
    };
    if changed {
        session.commit()?;
    }
    Ok(())
}

fn import_outline(args: ImportArgs, session: &mut Session) -> Result<()> {
    let input = resolve_input_path(&args.input)?;
    if !input.exists() {
        bail!("outline file '{}' does not exist", input.display());
    }
    let text = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let document = Document::from_outline_text(&text, session.prefs.outline.indent_width)
        .with_context(|| format!("failed to parse outline text {}", input.display()))?;
    let count = document.len();
    session.editor = EditorState::new(document);
    session.commit()?;
    println!("Imported {count} node(s) from {}", input.display());
    Ok(())
}

fn export_outline(args: ExportArgs, session: &Session) -> Result<()> {
    let text = session
        .document()
        .to_outline_text(session.prefs.outline.indent_width);
    match args.output {
        Some(path) => {
            let output = resolve_input_path(&path)?;
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&output, text)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Exported outline to {}", output.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

fn write_backup(backups: &BackupStore, document: &Document, retention: usize) -> Result<PathBuf> {
    let path = backups
        .write(document, Utc::now())
        .with_context(|| format!("failed to write backup under {}", backups.root().display()))?;
    if retention > 0 {
        backups.prune(retention).context("failed to prune backups")?;
    }
    tracing::debug!(path = %path.display(), "backup written");
    Ok(path)
}

fn execute_preferences_command(
    command: PreferencesCommand,
    layout: &WorkspaceLayout,
) -> Result<()> {
    match command {
        PreferencesCommand::Export(args) => export_preferences(args, layout),
        PreferencesCommand::Import(args) => import_preferences(args, layout),
    }
}

fn export_preferences(args: PreferencesExportArgs, layout: &WorkspaceLayout) -> Result<()> {
    let store = load_preferences(layout)?;
    let output = resolve_input_path(&args.output)?;
    store
        .export_to(&output)
        .with_context(|| format!("failed to export preferences to {}", output.display()))?;
    println!("Exported preferences to {}", output.display());
    Ok(())
}

fn import_preferences(args: PreferencesImportArgs, layout: &WorkspaceLayout) -> Result<()> {
    let mut store = load_preferences(layout)?;
    let input = resolve_input_path(&args.input)?;
    if !input.exists() {
        bail!("preferences file '{}' does not exist", input.display());
    }
    store
        .import_from(&input)
        .with_context(|| format!("failed to import preferences from {}", input.display()))?;
    println!("Imported preferences from {}", input.display());
    Ok(())
}

fn load_preferences(layout: &WorkspaceLayout) -> Result<PreferencesStore> {
    let prefs_path = layout.preferences_path();
    PreferencesStore::load(&prefs_path)
        .with_context(|| format!("failed to load preferences from {}", prefs_path.display()))
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    match workspace {
        Some(path) => {
            if path.is_absolute() {
                Ok(path)
            } else {
                Ok(std::env::current_dir()
                    .context("determine current directory")?
                    .join(path))
            }
        }
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
