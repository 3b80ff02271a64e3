//! Static table of every operation the remote facade serves
//!
//! Reads carry the TTL tier their responses are cached for. Mutations carry
//! the cached reads they make stale.

use crate::cache::{InvalidationRule, InvalidationTarget, TtlTier};
use serde::Serialize;
use std::fmt;

/// Suite area an operation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Mail,
    Calendar,
    Drive,
    Docs,
    Sheets,
    Tasks,
    Comments,
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Area::Mail => "mail",
            Area::Calendar => "calendar",
            Area::Drive => "drive",
            Area::Docs => "docs",
            Area::Sheets => "sheets",
            Area::Tasks => "tasks",
            Area::Comments => "comments",
        };
        f.write_str(name)
    }
}

/// How the call orchestrator treats an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Cacheable read with its TTL tier
    Read(TtlTier),
    /// State-changing call and the reads it invalidates
    Mutation(&'static [InvalidationTarget]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub area: Area,
    pub kind: OperationKind,
    pub summary: &'static str,
}

impl OperationSpec {
    pub fn is_read(&self) -> bool {
        matches!(self.kind, OperationKind::Read(_))
    }

    pub fn ttl(&self) -> Option<TtlTier> {
        match self.kind {
            OperationKind::Read(tier) => Some(tier),
            OperationKind::Mutation(_) => None,
        }
    }

    /// Invalidation rule for a mutation; `None` for reads
    pub fn rule(&self) -> Option<InvalidationRule> {
        match self.kind {
            OperationKind::Read(_) => None,
            OperationKind::Mutation(targets) => Some(InvalidationRule {
                operation: self.name,
                targets,
            }),
        }
    }
}

use InvalidationTarget::{Exact, Operation, RenamedParam, SharedParam};
use OperationKind::{Mutation, Read};
use TtlTier::{Long, Medium, Short};

const fn read(name: &'static str, area: Area, tier: TtlTier, summary: &'static str) -> OperationSpec {
    OperationSpec {
        name,
        area,
        kind: Read(tier),
        summary,
    }
}

const fn mutation(
    name: &'static str,
    area: Area,
    targets: &'static [InvalidationTarget],
    summary: &'static str,
) -> OperationSpec {
    OperationSpec {
        name,
        area,
        kind: Mutation(targets),
        summary,
    }
}

const MAIL_MESSAGE_READS: &[InvalidationTarget] = &[
    Operation("search_gmail_messages"),
    Operation("get_gmail_thread_content"),
    Exact {
        operation: "get_gmail_message_content",
        params: &["message_id"],
    },
    Operation("get_gmail_messages_content_batch"),
];

const EVENT_READS: &[InvalidationTarget] = &[
    SharedParam {
        operation: "get_events",
        param: "calendar_id",
    },
    SharedParam {
        operation: "get_event",
        param: "event_id",
    },
];

const SHEET_VALUE_READS: &[InvalidationTarget] = &[
    SharedParam {
        operation: "read_sheet_values",
        param: "spreadsheet_id",
    },
    SharedParam {
        operation: "get_spreadsheet_info",
        param: "spreadsheet_id",
    },
    SPREADSHEET_FILE_CONTENT,
];

const SPREADSHEET_FILE_CONTENT: InvalidationTarget = RenamedParam {
    operation: "get_drive_file_content",
    param: "file_id",
    from: "spreadsheet_id",
};

const TASK_READS: &[InvalidationTarget] = &[
    SharedParam {
        operation: "list_tasks",
        param: "task_list_id",
    },
    Exact {
        operation: "get_task",
        params: &["task_list_id", "task_id"],
    },
];

const COMMENT_READS: &[InvalidationTarget] = &[SharedParam {
    operation: "read_comments",
    param: "file_id",
}];

const FILE_LISTINGS: &[InvalidationTarget] = &[
    Operation("search_drive_files"),
    Operation("list_drive_items"),
];

const DOC_LISTINGS: &[InvalidationTarget] = &[
    Operation("search_docs"),
    Operation("list_docs_in_folder"),
    Operation("search_drive_files"),
    Operation("list_drive_items"),
];

static OPERATIONS: &[OperationSpec] = &[
    // Mail
    read("search_gmail_messages", Area::Mail, Medium, "Search messages with a mail query"),
    read("get_gmail_message_content", Area::Mail, Medium, "Fetch one message"),
    read("get_gmail_messages_content_batch", Area::Mail, Medium, "Fetch several messages"),
    read("get_gmail_thread_content", Area::Mail, Short, "Fetch a whole thread"),
    read("list_gmail_labels", Area::Mail, Long, "List labels"),
    mutation(
        "send_gmail_message",
        Area::Mail,
        &[Operation("search_gmail_messages"), Operation("get_gmail_thread_content")],
        "Send a message",
    ),
    mutation(
        "draft_gmail_message",
        Area::Mail,
        &[Operation("search_gmail_messages")],
        "Save a draft",
    ),
    mutation(
        "modify_gmail_message_labels",
        Area::Mail,
        &[
            Operation("list_gmail_labels"),
            Operation("search_gmail_messages"),
            Operation("get_gmail_thread_content"),
            Exact {
                operation: "get_gmail_message_content",
                params: &["message_id"],
            },
            Operation("get_gmail_messages_content_batch"),
        ],
        "Add or remove labels on a message",
    ),
    mutation(
        "manage_gmail_label",
        Area::Mail,
        &[Operation("list_gmail_labels")],
        "Create, rename or delete a label",
    ),
    mutation("trash_gmail_message", Area::Mail, MAIL_MESSAGE_READS, "Move a message to trash"),
    // Calendar
    read("list_calendars", Area::Calendar, Long, "List calendars"),
    read("get_events", Area::Calendar, Short, "List events in a time window"),
    read("get_event", Area::Calendar, Short, "Fetch one event"),
    mutation("create_event", Area::Calendar, EVENT_READS, "Create an event"),
    mutation("modify_event", Area::Calendar, EVENT_READS, "Update an event"),
    mutation("delete_event", Area::Calendar, EVENT_READS, "Delete an event"),
    // Drive
    read("search_drive_files", Area::Drive, Medium, "Search files"),
    read("list_drive_items", Area::Drive, Medium, "List a folder"),
    read("get_drive_file_content", Area::Drive, Medium, "Fetch file content"),
    mutation("create_drive_file", Area::Drive, FILE_LISTINGS, "Create a file"),
    // Docs
    read("search_docs", Area::Docs, Medium, "Search documents by name"),
    read("list_docs_in_folder", Area::Docs, Medium, "List documents in a folder"),
    read("get_doc_content", Area::Docs, Medium, "Fetch document text"),
    mutation("create_doc", Area::Docs, DOC_LISTINGS, "Create a document"),
    mutation(
        "modify_doc_text",
        Area::Docs,
        &[
            SharedParam {
                operation: "get_doc_content",
                param: "document_id",
            },
            RenamedParam {
                operation: "get_drive_file_content",
                param: "file_id",
                from: "document_id",
            },
        ],
        "Insert or replace document text",
    ),
    // Sheets
    read("list_spreadsheets", Area::Sheets, Medium, "List spreadsheets"),
    read("get_spreadsheet_info", Area::Sheets, Medium, "Fetch spreadsheet metadata"),
    read("read_sheet_values", Area::Sheets, Short, "Read a range"),
    mutation("modify_sheet_values", Area::Sheets, SHEET_VALUE_READS, "Write a range"),
    mutation("append_sheet_values", Area::Sheets, SHEET_VALUE_READS, "Append rows after a range"),
    mutation("clear_sheet_values", Area::Sheets, SHEET_VALUE_READS, "Clear a range"),
    mutation(
        "create_spreadsheet",
        Area::Sheets,
        &[
            Operation("list_spreadsheets"),
            Operation("search_drive_files"),
            Operation("list_drive_items"),
        ],
        "Create a spreadsheet",
    ),
    mutation(
        "create_sheet",
        Area::Sheets,
        &[
            SharedParam {
                operation: "get_spreadsheet_info",
                param: "spreadsheet_id",
            },
            SPREADSHEET_FILE_CONTENT,
        ],
        "Add a sheet to a spreadsheet",
    ),
    // Tasks
    read("list_task_lists", Area::Tasks, Long, "List task lists"),
    read("get_task_list", Area::Tasks, Long, "Fetch one task list"),
    read("list_tasks", Area::Tasks, Short, "List tasks in a list"),
    read("get_task", Area::Tasks, Short, "Fetch one task"),
    mutation(
        "create_task_list",
        Area::Tasks,
        &[Operation("list_task_lists")],
        "Create a task list",
    ),
    mutation(
        "delete_task_list",
        Area::Tasks,
        &[
            Operation("list_task_lists"),
            SharedParam {
                operation: "get_task_list",
                param: "task_list_id",
            },
            SharedParam {
                operation: "list_tasks",
                param: "task_list_id",
            },
            SharedParam {
                operation: "get_task",
                param: "task_list_id",
            },
        ],
        "Delete a task list",
    ),
    mutation("create_task", Area::Tasks, TASK_READS, "Create a task"),
    mutation("update_task", Area::Tasks, TASK_READS, "Update a task"),
    mutation("delete_task", Area::Tasks, TASK_READS, "Delete a task"),
    mutation(
        "clear_completed_tasks",
        Area::Tasks,
        &[
            SharedParam {
                operation: "list_tasks",
                param: "task_list_id",
            },
            SharedParam {
                operation: "get_task",
                param: "task_list_id",
            },
        ],
        "Hide completed tasks in a list",
    ),
    // Comments
    read("read_comments", Area::Comments, Short, "List comments on a file"),
    mutation("create_comment", Area::Comments, COMMENT_READS, "Comment on a file"),
    mutation("reply_to_comment", Area::Comments, COMMENT_READS, "Reply to a comment"),
    mutation("resolve_comment", Area::Comments, COMMENT_READS, "Resolve a comment"),
];

/// Find an operation by its remote name
pub fn lookup(name: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|spec| spec.name == name)
}

/// Every known operation, grouped by area
pub fn operations() -> &'static [OperationSpec] {
    OPERATIONS
}

/// Operations of one area
pub fn area_operations(area: Area) -> impl Iterator<Item = &'static OperationSpec> {
    OPERATIONS.iter().filter(move |spec| spec.area == area)
}
