use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use notepin::config::NotepinConfig;
use notepin::core::{
    NewNote, NewTask, Note, NotePatch, Priority, Scope, SearchFiltersPatch, StatusFilter, Task,
    TaskPatch, Theme, ThemeMode,
};
use notepin::session::{self, DEMO_USER_ID, Provider};
use notepin::util::{format_date, format_time, truncate_text};
use notepin::{FileStorage, Store, SystemClock};

const PREVIEW_CHARS: usize = 60;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding the saved notes and tasks
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Log at debug level
    #[arg(long)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, list and edit notes
    #[command(subcommand)]
    Note(NoteCommand),
    /// Create, list and edit tasks
    #[command(subcommand)]
    Task(TaskCommand),
    /// Save a search and show matching notes and tasks
    Search {
        query: String,
        #[arg(long)]
        scope: Option<Scope>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<StatusFilter>,
    },
    /// Show or reset the saved search
    #[command(subcommand)]
    Filters(FiltersCommand),
    /// Quick-access counts and tag shortcuts
    Overview,
    /// Show or set the theme
    Theme { mode: Option<ThemeMode> },
    /// Sign in with a locally created account
    #[command(subcommand)]
    Signin(SigninCommand),
    /// Forget the signed-in account
    Signout,
    /// Show the signed-in account
    Whoami,
    /// Delete every saved note, task and setting
    ClearData {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum NoteCommand {
    Add {
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        pin: bool,
    },
    List {
        #[arg(long, value_enum, default_value_t = NoteView::Filtered)]
        view: NoteView,
    },
    /// Print a note in full and count the visit
    Show { id: String },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Replace the tags (repeat for several)
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        #[arg(long, conflicts_with = "no_color")]
        color: Option<String>,
        #[arg(long)]
        no_color: bool,
    },
    /// Toggle the pinned flag
    Pin { id: String },
    /// Toggle the archived flag
    Archive { id: String },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TaskCommand {
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Due date as YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        pin: bool,
    },
    List {
        #[arg(long, value_enum, default_value_t = TaskView::Filtered)]
        view: TaskView,
    },
    /// Toggle completion
    Done { id: String },
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "no_description")]
        description: Option<String>,
        #[arg(long)]
        no_description: bool,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long, conflicts_with = "no_due")]
        due: Option<NaiveDate>,
        #[arg(long)]
        no_due: bool,
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
    },
    /// Toggle the pinned flag
    Pin { id: String },
    Delete {
        id: String,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum FiltersCommand {
    Show,
    Clear,
}

#[derive(Subcommand, Debug)]
enum SigninCommand {
    Demo,
    Email {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: Option<String>,
    },
    Social { provider: Provider },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NoteView {
    Filtered,
    Pinned,
    Recent,
    MostUsed,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TaskView {
    Filtered,
    Pinned,
    Pending,
    Completed,
}

fn init_logging(debug: bool) {
    // Journal logger (`journalctl --user -t notepin -f`): this crate at info/debug, everything else at warn.
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("notepin") {
                let max = if notepin::debug_logging() { log::LevelFilter::Debug } else { log::LevelFilter::Info };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    notepin::set_debug_logging(debug);

    // No journal (containers, non-systemd hosts) means no logging rather than a failed command.
    let Ok(journal) = systemd_journal_logger::JournalLog::new() else {
        return;
    };
    let journal = journal.with_syslog_identifier("notepin".to_string());
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        log::set_max_level(log::LevelFilter::Debug);
    }
}

fn main() -> CliResult {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(NotepinConfig::default_path);
    let mut config = NotepinConfig::load(&config_path);
    if let Some(dir) = args.data_dir.clone() {
        config.data_directory = dir;
    }
    init_logging(args.debug || config.debug_logging);

    let mut store = Store::open_with(config.storage(), config.storage_key.clone(), Box::new(SystemClock));
    run(&mut store, &config, args.command)
}

fn run(store: &mut Store<FileStorage>, config: &NotepinConfig, command: Command) -> CliResult {
    match command {
        Command::Note(cmd) => run_note(store, cmd),
        Command::Task(cmd) => run_task(store, cmd),
        Command::Search { query, scope, tags, priority, status } => {
            store.set_search_filters(SearchFiltersPatch {
                query: Some(query),
                scope,
                tags: (!tags.is_empty()).then_some(tags),
                priority: priority.map(Some),
                status: status.map(Some),
                ..SearchFiltersPatch::default()
            });
            print_search(store);
            Ok(())
        }
        Command::Filters(FiltersCommand::Show) => {
            print_filters(store);
            Ok(())
        }
        Command::Filters(FiltersCommand::Clear) => {
            store.clear_search_filters();
            println!("Search cleared.");
            Ok(())
        }
        Command::Overview => {
            print_overview(store);
            Ok(())
        }
        Command::Theme { mode: None } => {
            println!("{}", store.theme().mode.as_str());
            Ok(())
        }
        Command::Theme { mode: Some(mode) } => {
            store.set_theme(Theme::new(mode));
            println!("Theme set to {}.", mode.as_str());
            Ok(())
        }
        Command::Signin(cmd) => {
            let now = store.now();
            let user = match cmd {
                SigninCommand::Demo => session::demo_user(now),
                SigninCommand::Email { email, password, name } => {
                    session::sign_in_with_email(&email, &password, name.as_deref(), now)
                        .ok_or("email and password are required")?
                }
                SigninCommand::Social { provider } => session::sign_in_with_provider(provider, now),
            };
            println!("Signed in as {} <{}>.", user.name, user.email);
            store.set_user(Some(user));
            Ok(())
        }
        Command::Signout => {
            store.set_user(None);
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => {
            match store.user() {
                Some(user) => println!(
                    "{} <{}>  id {}  since {}",
                    user.name,
                    user.email,
                    user.id,
                    format_date(&user.created_at)
                ),
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Command::ClearData { yes } => {
            if !yes {
                return Err(format!(
                    "this deletes {} notes and {} tasks in {}; pass --yes to confirm",
                    store.notes().len(),
                    store.tasks().len(),
                    config.state_path().display()
                )
                .into());
            }
            store.clear_all_data();
            println!("All data cleared.");
            Ok(())
        }
    }
}

fn run_note(store: &mut Store<FileStorage>, cmd: NoteCommand) -> CliResult {
    match cmd {
        NoteCommand::Add { title, content, tags, color, pin } => {
            let title = required_title(title)?;
            let user_id = current_user_id(store);
            let id = store.add_note(NewNote {
                title,
                content,
                user_id,
                tags,
                is_pinned: pin,
                is_archived: false,
                color,
            });
            println!("Created note {id}.");
        }
        NoteCommand::List { view } => {
            let notes = match view {
                NoteView::Filtered => store.filtered_notes(),
                NoteView::Pinned => store.pinned_notes(),
                NoteView::Recent => store.recent_notes(),
                NoteView::MostUsed => store.most_used_notes(),
            };
            print_notes(&notes);
        }
        NoteCommand::Show { id } => {
            let id = store.find_note_id(&id)?;
            store.increment_access_count(&id);
            if let Some(note) = store.note(&id) {
                print_note_detail(note);
            }
        }
        NoteCommand::Edit { id, title, content, tags, color, no_color } => {
            let id = store.find_note_id(&id)?;
            let title = title.map(required_title).transpose()?;
            let color = clearable(color, no_color);
            store.update_note(&id, NotePatch { title, content, tags, color, ..NotePatch::default() });
            println!("Updated note {id}.");
        }
        NoteCommand::Pin { id } => {
            let id = store.find_note_id(&id)?;
            store.pin_note(&id);
            let pinned = store.note(&id).is_some_and(|n| n.is_pinned);
            println!("{} note {id}.", if pinned { "Pinned" } else { "Unpinned" });
        }
        NoteCommand::Archive { id } => {
            let id = store.find_note_id(&id)?;
            store.archive_note(&id);
            let archived = store.note(&id).is_some_and(|n| n.is_archived);
            println!("{} note {id}.", if archived { "Archived" } else { "Restored" });
        }
        NoteCommand::Delete { id, yes } => {
            let id = store.find_note_id(&id)?;
            if !yes {
                return Err(format!("pass --yes to delete note {id}").into());
            }
            store.delete_note(&id);
            println!("Deleted note {id}.");
        }
    }
    Ok(())
}

fn run_task(store: &mut Store<FileStorage>, cmd: TaskCommand) -> CliResult {
    match cmd {
        TaskCommand::Add { title, description, priority, due, tags, pin } => {
            let title = required_title(title)?;
            let user_id = current_user_id(store);
            let id = store.add_task(NewTask {
                title,
                description,
                user_id,
                is_completed: false,
                priority,
                due_date: due,
                tags,
                is_pinned: pin,
            });
            println!("Created task {id}.");
        }
        TaskCommand::List { view } => {
            let tasks = match view {
                TaskView::Filtered => store.filtered_tasks(),
                TaskView::Pinned => store.pinned_tasks(),
                TaskView::Pending => store.pending_tasks(),
                TaskView::Completed => store.completed_tasks(),
            };
            print_tasks(&tasks);
        }
        TaskCommand::Done { id } => {
            let id = store.find_task_id(&id)?;
            store.toggle_task_complete(&id);
            let done = store.task(&id).is_some_and(|t| t.is_completed);
            println!("{} task {id}.", if done { "Completed" } else { "Reopened" });
        }
        TaskCommand::Edit {
            id,
            title,
            description,
            no_description,
            priority,
            due,
            no_due,
            tags,
        } => {
            let id = store.find_task_id(&id)?;
            let title = title.map(required_title).transpose()?;
            store.update_task(
                &id,
                TaskPatch {
                    title,
                    description: clearable(description, no_description),
                    priority,
                    due_date: clearable(due, no_due),
                    tags,
                    ..TaskPatch::default()
                },
            );
            println!("Updated task {id}.");
        }
        TaskCommand::Pin { id } => {
            let id = store.find_task_id(&id)?;
            store.pin_task(&id);
            let pinned = store.task(&id).is_some_and(|t| t.is_pinned);
            println!("{} task {id}.", if pinned { "Pinned" } else { "Unpinned" });
        }
        TaskCommand::Delete { id, yes } => {
            let id = store.find_task_id(&id)?;
            if !yes {
                return Err(format!("pass --yes to delete task {id}").into());
            }
            store.delete_task(&id);
            println!("Deleted task {id}.");
        }
    }
    Ok(())
}

/// A `--no-<field>` flag clears the field; otherwise a given value replaces it.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn required_title(title: String) -> Result<String, Box<dyn Error>> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err("title must not be empty".into());
    }
    Ok(title)
}

fn current_user_id(store: &Store<FileStorage>) -> String {
    store
        .user()
        .map(|u| u.id.clone())
        .unwrap_or_else(|| DEMO_USER_ID.to_string())
}

fn tag_list(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!("  #{}", tags.join(" #"))
    }
}

fn print_notes(notes: &[&Note]) {
    if notes.is_empty() {
        println!("No notes.");
        return;
    }
    for note in notes {
        let marker = match (note.is_pinned, note.is_archived) {
            (_, true) => "a",
            (true, false) => "*",
            _ => " ",
        };
        println!(
            "{} {}  {}  ({}){}",
            note.id,
            marker,
            note.title,
            format_date(&note.updated_at),
            tag_list(&note.tags)
        );
        if !note.content.is_empty() {
            println!("            {}", truncate_text(note.content.lines().next().unwrap_or(""), PREVIEW_CHARS));
        }
    }
}

fn print_note_detail(note: &Note) {
    println!("{}{}", note.title, tag_list(&note.tags));
    println!(
        "id {}  created {} {}  updated {}  opened {} times",
        note.id,
        format_date(&note.created_at),
        format_time(&note.created_at),
        format_date(&note.updated_at),
        note.access_count
    );
    if let Some(color) = &note.color {
        println!("color {color}");
    }
    if note.is_pinned || note.is_archived {
        println!(
            "{}{}",
            if note.is_pinned { "[pinned] " } else { "" },
            if note.is_archived { "[archived]" } else { "" }
        );
    }
    println!();
    println!("{}", note.content);
}

fn print_tasks(tasks: &[&Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    for task in tasks {
        let due = task
            .due_date
            .map(|d| format!("  due {}", d.format("%b %-d, %Y")))
            .unwrap_or_default();
        println!(
            "{} [{}]{} {}  ({}){}{}",
            task.id,
            if task.is_completed { "x" } else { " " },
            if task.is_pinned { "*" } else { " " },
            task.title,
            task.priority.as_str(),
            due,
            tag_list(&task.tags)
        );
        if let Some(description) = task.description.as_deref().filter(|d| !d.is_empty()) {
            println!("              {}", truncate_text(description, PREVIEW_CHARS));
        }
    }
}

fn print_filters(store: &Store<FileStorage>) {
    let filters = store.search_filters();
    if filters.is_default() {
        println!("No active search.");
        return;
    }
    println!("query:    {:?}", filters.query);
    println!("scope:    {}", filters.scope.as_str());
    if !filters.tags.is_empty() {
        println!("tags:     {}", filters.tags.join(", "));
    }
    if let Some(priority) = filters.priority {
        println!("priority: {}", priority.as_str());
    }
    if let Some(status) = filters.status {
        println!("status:   {}", status.as_str());
    }
}

fn print_search(store: &Store<FileStorage>) {
    let filters = store.search_filters();
    if filters.scope.includes_notes() {
        println!("Notes:");
        print_notes(&store.filtered_notes());
    }
    if filters.scope.includes_tasks() {
        if filters.scope.includes_notes() {
            println!();
        }
        println!("Tasks:");
        print_tasks(&store.filtered_tasks());
    }
}

fn print_overview(store: &Store<FileStorage>) {
    match store.user() {
        Some(user) => println!("{} <{}>", user.name, user.email),
        None => println!("Not signed in."),
    }
    println!("Theme: {}", store.theme().mode.as_str());
    println!();
    println!(
        "Notes  {} total  {} pinned  {} recent  {} most used",
        store.notes().len(),
        store.pinned_notes().len(),
        store.recent_notes().len(),
        store.most_used_notes().len()
    );
    println!(
        "Tasks  {} total  {} pinned  {} pending  {} completed",
        store.tasks().len(),
        store.pinned_tasks().len(),
        store.pending_tasks().len(),
        store.completed_tasks().len()
    );
    let tags = store.tag_counts();
    if !tags.is_empty() {
        let shortcuts: Vec<String> = tags.iter().map(|(tag, n)| format!("#{tag} ({n})")).collect();
        println!("Tags   {}", shortcuts.join("  "));
    }
}
