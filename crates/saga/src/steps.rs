//! Operation and step names used in logs, metrics and errors.

/// Operation name: create a document with its lines.
pub const OP_CREATE: &str = "create";

/// Operation name: replace a document's header and lines.
pub const OP_UPDATE: &str = "update";

/// Operation name: move a document to another status.
pub const OP_CHANGE_STATUS: &str = "change_status";

/// Operation name: delete a document and its lines.
pub const OP_DELETE: &str = "delete";

pub const STEP_LOAD_CATALOG: &str = "load_catalog";
pub const STEP_LOAD_DOCUMENT: &str = "load_document";
pub const STEP_LOAD_ITEMS: &str = "load_items";
pub const STEP_INSERT_HEADER: &str = "insert_header";
pub const STEP_UPDATE_HEADER: &str = "update_header";
pub const STEP_INSERT_ITEMS: &str = "insert_items";
pub const STEP_DELETE_ITEMS: &str = "delete_items";
pub const STEP_SET_STATUS: &str = "set_status";
pub const STEP_APPLY_MOVEMENT: &str = "apply_movement";
pub const STEP_REVERSE_MOVEMENTS: &str = "reverse_movements";
pub const STEP_DELETE_HEADER: &str = "delete_header";
