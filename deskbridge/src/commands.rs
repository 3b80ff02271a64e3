//! Typed subcommands for each suite area
//!
//! Every action maps to one remote operation. Local option names are
//! renamed to the field names the remote side expects (`--max` becomes
//! `page_size`, `--from` becomes `time_min`, and so on).

use clap::Subcommand;
use deskbridge_core::Params;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("{what} is not valid JSON: {source}")]
    InvalidJson {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("parameters must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("unknown shell command :{0} (try :help)")]
    UnknownMeta(String),

    #[error("{0}")]
    Usage(String),
}

/// One remote call ready to dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub operation: String,
    pub params: Params,
}

impl Request {
    pub fn new(operation: impl Into<String>, params: Params) -> Self {
        Self {
            operation: operation.into(),
            params,
        }
    }
}

/// Accumulates renamed parameters, skipping options that were not given
#[derive(Debug, Default)]
struct ParamsBuilder(Params);

impl ParamsBuilder {
    fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    fn opt<T: Into<Value>>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(name, value),
            None => self,
        }
    }

    fn list(self, name: &str, values: Vec<String>) -> Self {
        if values.is_empty() {
            self
        } else {
            self.set(name, values)
        }
    }

    fn request(self, operation: &str) -> Request {
        Request::new(operation, self.0)
    }
}

fn with() -> ParamsBuilder {
    ParamsBuilder::default()
}

/// Parse an optional JSON object argument into a parameter bag
pub fn parse_params(json: Option<&str>) -> Result<Params, CommandError> {
    let Some(json) = json.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Params::new());
    };
    match serde_json::from_str(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(CommandError::NotAnObject(json_kind(&other))),
        Err(source) => Err(CommandError::InvalidJson {
            what: "parameters",
            source,
        }),
    }
}

fn parse_rows(raw: &str) -> Result<Value, CommandError> {
    let value: Value = serde_json::from_str(raw).map_err(|source| CommandError::InvalidJson {
        what: "--values",
        source,
    })?;
    match value {
        Value::Array(_) => Ok(value),
        other => Err(CommandError::Usage(format!(
            "--values must be a JSON array of rows, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Subcommand, Debug)]
pub enum MailAction {
    /// Search messages with a mail query
    Search {
        query: String,
        /// Maximum number of messages
        #[arg(long)]
        max: Option<u32>,
    },
    /// Show one message
    Read { message_id: String },
    /// Show a whole thread
    Thread { thread_id: String },
    /// List labels
    Labels,
    /// Send a message
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        cc: Option<String>,
        #[arg(long)]
        bcc: Option<String>,
    },
    /// Save a draft
    Draft {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        to: Option<String>,
    },
    /// Add or remove labels on a message
    Label {
        message_id: String,
        #[arg(long = "add")]
        add: Vec<String>,
        #[arg(long = "remove")]
        remove: Vec<String>,
    },
    /// Move a message to trash
    Trash { message_id: String },
}

impl MailAction {
    pub fn into_request(self) -> Result<Request, CommandError> {
        let request = match self {
            MailAction::Search { query, max } => with()
                .set("query", query)
                .opt("page_size", max)
                .request("search_gmail_messages"),
            MailAction::Read { message_id } => with()
                .set("message_id", message_id)
                .request("get_gmail_message_content"),
            MailAction::Thread { thread_id } => with()
                .set("thread_id", thread_id)
                .request("get_gmail_thread_content"),
            MailAction::Labels => with().request("list_gmail_labels"),
            MailAction::Send {
                to,
                subject,
                body,
                cc,
                bcc,
            } => with()
                .set("to", to)
                .set("subject", subject)
                .set("body", body)
                .opt("cc", cc)
                .opt("bcc", bcc)
                .request("send_gmail_message"),
            MailAction::Draft { subject, body, to } => with()
                .set("subject", subject)
                .set("body", body)
                .opt("to", to)
                .request("draft_gmail_message"),
            MailAction::Label {
                message_id,
                add,
                remove,
            } => {
                if add.is_empty() && remove.is_empty() {
                    return Err(CommandError::Usage(
                        "give at least one --add or --remove label".to_string(),
                    ));
                }
                with()
                    .set("message_id", message_id)
                    .list("add_label_ids", add)
                    .list("remove_label_ids", remove)
                    .request("modify_gmail_message_labels")
            }
            MailAction::Trash { message_id } => with()
                .set("message_id", message_id)
                .request("trash_gmail_message"),
        };
        Ok(request)
    }
}

#[derive(Subcommand, Debug)]
pub enum CalendarAction {
    /// List calendars
    List,
    /// List events in a time window
    Events {
        #[arg(long, default_value = "primary")]
        calendar: String,
        /// Start of the window (RFC 3339)
        #[arg(long)]
        from: Option<String>,
        /// End of the window (RFC 3339)
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        max: Option<u32>,
    },
    /// Show one event
    Event {
        event_id: String,
        #[arg(long, default_value = "primary")]
        calendar: String,
    },
    /// Create an event
    Create {
        summary: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "primary")]
        calendar: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long = "attendee")]
        attendees: Vec<String>,
    },
    /// Update an event
    Update {
        event_id: String,
        #[arg(long, default_value = "primary")]
        calendar: String,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        location: Option<String>,
    },
    /// Delete an event
    Delete {
        event_id: String,
        #[arg(long, default_value = "primary")]
        calendar: String,
    },
}

impl CalendarAction {
    pub fn into_request(self) -> Result<Request, CommandError> {
        let request = match self {
            CalendarAction::List => with().request("list_calendars"),
            CalendarAction::Events {
                calendar,
                from,
                to,
                max,
            } => with()
                .set("calendar_id", calendar)
                .opt("time_min", from)
                .opt("time_max", to)
                .opt("max_results", max)
                .request("get_events"),
            CalendarAction::Event { event_id, calendar } => with()
                .set("calendar_id", calendar)
                .set("event_id", event_id)
                .request("get_event"),
            CalendarAction::Create {
                summary,
                start,
                end,
                calendar,
                description,
                location,
                attendees,
            } => with()
                .set("calendar_id", calendar)
                .set("summary", summary)
                .set("start_time", start)
                .set("end_time", end)
                .opt("description", description)
                .opt("location", location)
                .list("attendees", attendees)
                .request("create_event"),
            CalendarAction::Update {
                event_id,
                calendar,
                summary,
                start,
                end,
                description,
                location,
            } => with()
                .set("calendar_id", calendar)
                .set("event_id", event_id)
                .opt("summary", summary)
                .opt("start_time", start)
                .opt("end_time", end)
                .opt("description", description)
                .opt("location", location)
                .request("modify_event"),
            CalendarAction::Delete { event_id, calendar } => with()
                .set("calendar_id", calendar)
                .set("event_id", event_id)
                .request("delete_event"),
        };
        Ok(request)
    }
}

#[derive(Subcommand, Debug)]
pub enum DriveAction {
    /// Search files
    Search {
        query: String,
        #[arg(long)]
        max: Option<u32>,
    },
    /// List a folder
    Ls {
        #[arg(long, default_value = "root")]
        folder: String,
        #[arg(long)]
        max: Option<u32>,
    },
    /// Print file content
    Cat { file_id: String },
    /// Create a file
    Create {
        name: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, default_value = "root")]
        folder: String,
        #[arg(long)]
        mime: Option<String>,
    },
}

impl DriveAction {
    pub fn into_request(self) -> Result<Request, CommandError> {
        let request = match self {
            DriveAction::Search { query, max } => with()
                .set("query", query)
                .opt("page_size", max)
                .request("search_drive_files"),
            DriveAction::Ls { folder, max } => with()
                .set("folder_id", folder)
                .opt("page_size", max)
                .request("list_drive_items"),
            DriveAction::Cat { file_id } => with()
                .set("file_id", file_id)
                .request("get_drive_file_content"),
            DriveAction::Create {
                name,
                content,
                folder,
                mime,
            } => with()
                .set("file_name", name)
                .set("folder_id", folder)
                .opt("content", content)
                .opt("mime_type", mime)
                .request("create_drive_file"),
        };
        Ok(request)
    }
}

#[derive(Subcommand, Debug)]
pub enum DocsAction {
    /// Search documents by name
    Search {
        query: String,
        #[arg(long)]
        max: Option<u32>,
    },
    /// List documents in a folder
    Ls {
        #[arg(default_value = "root")]
        folder: String,
    },
    /// Print document text
    Read { document_id: String },
    /// Create a document
    Create {
        title: String,
        #[arg(long)]
        content: Option<String>,
    },
    /// Insert or replace text
    Edit {
        document_id: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        start_index: u64,
        #[arg(long)]
        end_index: Option<u64>,
    },
}

impl DocsAction {
    pub fn into_request(self) -> Result<Request, CommandError> {
        let request = match self {
            DocsAction::Search { query, max } => with()
                .set("query", query)
                .opt("page_size", max)
                .request("search_docs"),
            DocsAction::Ls { folder } => with()
                .set("folder_id", folder)
                .request("list_docs_in_folder"),
            DocsAction::Read { document_id } => with()
                .set("document_id", document_id)
                .request("get_doc_content"),
            DocsAction::Create { title, content } => with()
                .set("title", title)
                .opt("content", content)
                .request("create_doc"),
            DocsAction::Edit {
                document_id,
                text,
                start_index,
                end_index,
            } => with()
                .set("document_id", document_id)
                .set("text", text)
                .set("start_index", start_index)
                .opt("end_index", end_index)
                .request("modify_doc_text"),
        };
        Ok(request)
    }
}

#[derive(Subcommand, Debug)]
pub enum SheetsAction {
    /// List spreadsheets
    List {
        #[arg(long)]
        max: Option<u32>,
    },
    /// Show spreadsheet metadata
    Info { spreadsheet_id: String },
    /// Read a range
    Read {
        spreadsheet_id: String,
        #[arg(long, default_value = "A1:Z1000")]
        range: String,
    },
    /// Write a range
    Write {
        spreadsheet_id: String,
        #[arg(long)]
        range: String,
        /// Rows as a JSON array of arrays
        #[arg(long)]
        values: String,
    },
    /// Append rows after a range
    Append {
        spreadsheet_id: String,
        #[arg(long)]
        range: String,
        #[arg(long)]
        values: String,
    },
    /// Clear a range
    Clear {
        spreadsheet_id: String,
        #[arg(long)]
        range: String,
    },
    /// Create a spreadsheet
    Create {
        title: String,
        #[arg(long = "sheet")]
        sheets: Vec<String>,
    },
    /// Add a sheet to a spreadsheet
    AddSheet { spreadsheet_id: String, name: String },
}

impl SheetsAction {
    pub fn into_request(self) -> Result<Request, CommandError> {
        let request = match self {
            SheetsAction::List { max } => with()
                .opt("max_results", max)
                .request("list_spreadsheets"),
            SheetsAction::Info { spreadsheet_id } => with()
                .set("spreadsheet_id", spreadsheet_id)
                .request("get_spreadsheet_info"),
            SheetsAction::Read {
                spreadsheet_id,
                range,
            } => with()
                .set("spreadsheet_id", spreadsheet_id)
                .set("range_name", range)
                .request("read_sheet_values"),
            SheetsAction::Write {
                spreadsheet_id,
                range,
                values,
            } => with()
                .set("spreadsheet_id", spreadsheet_id)
                .set("range_name", range)
                .set("values", parse_rows(&values)?)
                .request("modify_sheet_values"),
            SheetsAction::Append {
                spreadsheet_id,
                range,
                values,
            } => with()
                .set("spreadsheet_id", spreadsheet_id)
                .set("range_name", range)
                .set("values", parse_rows(&values)?)
                .request("append_sheet_values"),
            SheetsAction::Clear {
                spreadsheet_id,
                range,
            } => with()
                .set("spreadsheet_id", spreadsheet_id)
                .set("range_name", range)
                .request("clear_sheet_values"),
            SheetsAction::Create { title, sheets } => with()
                .set("title", title)
                .list("sheet_names", sheets)
                .request("create_spreadsheet"),
            SheetsAction::AddSheet {
                spreadsheet_id,
                name,
            } => with()
                .set("spreadsheet_id", spreadsheet_id)
                .set("sheet_name", name)
                .request("create_sheet"),
        };
        Ok(request)
    }
}

#[derive(Subcommand, Debug)]
pub enum TasksAction {
    /// List task lists
    Lists,
    /// Show one task list
    Show { task_list_id: String },
    /// List tasks in a list
    Ls {
        task_list_id: String,
        /// Include completed tasks
        #[arg(long)]
        completed: bool,
    },
    /// Show one task
    Get { task_list_id: String, task_id: String },
    /// Create a task list
    NewList { title: String },
    /// Delete a task list
    DropList { task_list_id: String },
    /// Add a task
    Add {
        task_list_id: String,
        title: String,
        #[arg(long)]
        notes: Option<String>,
        /// Due date (RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
    /// Update a task
    Update {
        task_list_id: String,
        task_id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        due: Option<String>,
    },
    /// Mark a task completed
    Done { task_list_id: String, task_id: String },
    /// Delete a task
    Delete { task_list_id: String, task_id: String },
    /// Hide completed tasks in a list
    ClearCompleted { task_list_id: String },
}

impl TasksAction {
    pub fn into_request(self) -> Result<Request, CommandError> {
        let request = match self {
            TasksAction::Lists => with().request("list_task_lists"),
            TasksAction::Show { task_list_id } => with()
                .set("task_list_id", task_list_id)
                .request("get_task_list"),
            TasksAction::Ls {
                task_list_id,
                completed,
            } => with()
                .set("task_list_id", task_list_id)
                .opt("show_completed", completed.then_some(true))
                .request("list_tasks"),
            TasksAction::Get {
                task_list_id,
                task_id,
            } => with()
                .set("task_list_id", task_list_id)
                .set("task_id", task_id)
                .request("get_task"),
            TasksAction::NewList { title } => with().set("title", title).request("create_task_list"),
            TasksAction::DropList { task_list_id } => with()
                .set("task_list_id", task_list_id)
                .request("delete_task_list"),
            TasksAction::Add {
                task_list_id,
                title,
                notes,
                due,
            } => with()
                .set("task_list_id", task_list_id)
                .set("title", title)
                .opt("notes", notes)
                .opt("due", due)
                .request("create_task"),
            TasksAction::Update {
                task_list_id,
                task_id,
                title,
                notes,
                due,
            } => with()
                .set("task_list_id", task_list_id)
                .set("task_id", task_id)
                .opt("title", title)
                .opt("notes", notes)
                .opt("due", due)
                .request("update_task"),
            TasksAction::Done {
                task_list_id,
                task_id,
            } => with()
                .set("task_list_id", task_list_id)
                .set("task_id", task_id)
                .set("status", "completed")
                .request("update_task"),
            TasksAction::Delete {
                task_list_id,
                task_id,
            } => with()
                .set("task_list_id", task_list_id)
                .set("task_id", task_id)
                .request("delete_task"),
            TasksAction::ClearCompleted { task_list_id } => with()
                .set("task_list_id", task_list_id)
                .request("clear_completed_tasks"),
        };
        Ok(request)
    }
}

#[derive(Subcommand, Debug)]
pub enum CommentsAction {
    /// List comments on a file
    Ls { file_id: String },
    /// Comment on a file
    Add { file_id: String, content: String },
    /// Reply to a comment
    Reply {
        file_id: String,
        comment_id: String,
        content: String,
    },
    /// Resolve a comment
    Resolve { file_id: String, comment_id: String },
}

impl CommentsAction {
    pub fn into_request(self) -> Result<Request, CommandError> {
        let request = match self {
            CommentsAction::Ls { file_id } => with().set("file_id", file_id).request("read_comments"),
            CommentsAction::Add { file_id, content } => with()
                .set("file_id", file_id)
                .set("comment_content", content)
                .request("create_comment"),
            CommentsAction::Reply {
                file_id,
                comment_id,
                content,
            } => with()
                .set("file_id", file_id)
                .set("comment_id", comment_id)
                .set("reply_content", content)
                .request("reply_to_comment"),
            CommentsAction::Resolve {
                file_id,
                comment_id,
            } => with()
                .set("file_id", file_id)
                .set("comment_id", comment_id)
                .request("resolve_comment"),
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskbridge_core::catalog;
    use serde_json::json;

    fn assert_known(request: &Request) {
        assert!(
            catalog::lookup(&request.operation).is_some(),
            "{} is not in the catalog",
            request.operation
        );
    }

    #[test]
    fn test_parse_params() {
        assert!(parse_params(None).unwrap().is_empty());
        assert!(parse_params(Some("   ")).unwrap().is_empty());

        let params = parse_params(Some(r#"{"query": "invoice"}"#)).unwrap();
        assert_eq!(params["query"], json!("invoice"));

        assert!(matches!(parse_params(Some("[1, 2]")), Err(CommandError::NotAnObject("an array"))));
        assert!(matches!(parse_params(Some("{oops")), Err(CommandError::InvalidJson { .. })));
    }

    #[test]
    fn test_mail_search_renames_max() {
        let request = MailAction::Search {
            query: "invoice".into(),
            max: Some(5),
        }
        .into_request()
        .unwrap();

        assert_eq!(request.operation, "search_gmail_messages");
        assert_eq!(request.params["page_size"], json!(5));
        assert!(!request.params.contains_key("max"));
        assert_known(&request);
    }

    #[test]
    fn test_omitted_options_are_not_sent() {
        let request = CalendarAction::Events {
            calendar: "primary".into(),
            from: Some("2024-05-01T00:00:00Z".into()),
            to: None,
            max: None,
        }
        .into_request()
        .unwrap();

        assert_eq!(request.params.len(), 2);
        assert_eq!(request.params["time_min"], json!("2024-05-01T00:00:00Z"));
    }

    #[test]
    fn test_label_requires_a_change() {
        let result = MailAction::Label {
            message_id: "m1".into(),
            add: vec![],
            remove: vec![],
        }
        .into_request();
        assert!(matches!(result, Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_sheet_values_must_be_rows() {
        let request = SheetsAction::Write {
            spreadsheet_id: "s1".into(),
            range: "A1:B1".into(),
            values: r#"[["a", 1]]"#.into(),
        }
        .into_request()
        .unwrap();
        assert_eq!(request.params["values"], json!([["a", 1]]));
        assert_eq!(request.params["range_name"], json!("A1:B1"));
        assert_known(&request);

        let bad = SheetsAction::Append {
            spreadsheet_id: "s1".into(),
            range: "A1".into(),
            values: r#"{"a": 1}"#.into(),
        }
        .into_request();
        assert!(matches!(bad, Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_task_done_is_an_update() {
        let request = TasksAction::Done {
            task_list_id: "l1".into(),
            task_id: "t1".into(),
        }
        .into_request()
        .unwrap();
        assert_eq!(request.operation, "update_task");
        assert_eq!(request.params["status"], json!("completed"));
    }

    #[test]
    fn test_every_action_targets_the_catalog() {
        let requests = vec![
            MailAction::Labels.into_request(),
            MailAction::Trash { message_id: "m".into() }.into_request(),
            CalendarAction::List.into_request(),
            CalendarAction::Delete {
                event_id: "e".into(),
                calendar: "primary".into(),
            }
            .into_request(),
            DriveAction::Cat { file_id: "f".into() }.into_request(),
            DocsAction::Read { document_id: "d".into() }.into_request(),
            SheetsAction::Clear {
                spreadsheet_id: "s".into(),
                range: "A1".into(),
            }
            .into_request(),
            SheetsAction::AddSheet {
                spreadsheet_id: "s".into(),
                name: "Q3".into(),
            }
            .into_request(),
            TasksAction::ClearCompleted { task_list_id: "l".into() }.into_request(),
            CommentsAction::Resolve {
                file_id: "f".into(),
                comment_id: "c".into(),
            }
            .into_request(),
        ];

        for request in requests {
            assert_known(&request.unwrap());
        }
    }
}
