//! The method catalog: the two static name tables that pin down which side
//! handles which inbound methods, plus the protocol version constant. This
//! mirrors the teacher's method-name constants in `mcp/protocol.rs`, scaled
//! up to a two-role table instead of a single server's method list.

/// The ACP protocol version this crate tracks, per the upstream meta table.
pub const PROTOCOL_VERSION: u32 = 1;

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_AUTHENTICATE: &str = "authenticate";
pub const METHOD_SESSION_NEW: &str = "session/new";
pub const METHOD_SESSION_LOAD: &str = "session/load";
pub const METHOD_SESSION_SET_MODE: &str = "session/set_mode";
pub const METHOD_SESSION_PROMPT: &str = "session/prompt";
pub const METHOD_SESSION_CANCEL: &str = "session/cancel";

pub const METHOD_SESSION_UPDATE: &str = "session/update";
pub const METHOD_SESSION_REQUEST_PERMISSION: &str = "session/request_permission";
pub const METHOD_FS_READ_TEXT_FILE: &str = "fs/read_text_file";
pub const METHOD_FS_WRITE_TEXT_FILE: &str = "fs/write_text_file";

/// Whether a catalog entry is a request (expects a response) or a
/// fire-and-forget notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Request,
    Notification,
}

/// A single entry in a method catalog: just enough metadata for the
/// dispatcher to decide how to route and validate a call. The actual
/// params/result types are resolved by the role adapter that owns the
/// method, not by this table — Rust's type system already enforces the
/// params/result pairing at the call site, unlike the meta-specification's
/// dynamically-typed `{params_type, result_type}` table.
#[derive(Debug, Clone, Copy)]
pub struct MethodEntry {
    pub name: &'static str,
    pub kind: MethodKind,
}

/// Methods the agent side handles, i.e. calls the client may issue to the
/// agent.
pub const AGENT_METHODS: &[MethodEntry] = &[
    MethodEntry { name: METHOD_INITIALIZE, kind: MethodKind::Request },
    MethodEntry { name: METHOD_AUTHENTICATE, kind: MethodKind::Request },
    MethodEntry { name: METHOD_SESSION_NEW, kind: MethodKind::Request },
    MethodEntry { name: METHOD_SESSION_LOAD, kind: MethodKind::Request },
    MethodEntry { name: METHOD_SESSION_SET_MODE, kind: MethodKind::Request },
    MethodEntry { name: METHOD_SESSION_PROMPT, kind: MethodKind::Request },
    MethodEntry { name: METHOD_SESSION_CANCEL, kind: MethodKind::Notification },
];

/// Methods the client side handles, i.e. calls the agent may issue to the
/// client.
pub const CLIENT_METHODS: &[MethodEntry] = &[
    MethodEntry { name: METHOD_SESSION_UPDATE, kind: MethodKind::Notification },
    MethodEntry { name: METHOD_SESSION_REQUEST_PERMISSION, kind: MethodKind::Request },
    MethodEntry { name: METHOD_FS_READ_TEXT_FILE, kind: MethodKind::Request },
    MethodEntry { name: METHOD_FS_WRITE_TEXT_FILE, kind: MethodKind::Request },
];

pub fn agent_method(name: &str) -> Option<&'static MethodEntry> {
    AGENT_METHODS.iter().find(|entry| entry.name == name)
}

pub fn client_method(name: &str) -> Option<&'static MethodEntry> {
    CLIENT_METHODS.iter().find(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_registered_as_a_notification() {
        let entry = agent_method(METHOD_SESSION_CANCEL).unwrap();
        assert_eq!(entry.kind, MethodKind::Notification);
    }

    #[test]
    fn unknown_methods_are_absent_from_both_catalogs() {
        assert!(agent_method("x/custom").is_none());
        assert!(client_method("x/custom").is_none());
    }
}
