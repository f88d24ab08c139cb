//! Shared protocol types for the appliance command channel
//!
//! This crate provides the request/reply message types and the
//! length-prefixed codec used between the control daemon and its
//! local administration clients.

pub mod codec;

pub mod proto {
    use prost::Message;

    /// Administrative command types understood by the daemon.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum CommandType {
        Unknown = 0,
        Upgrade = 1,
        Reboot = 2,
        Shutdown = 3,
        NetworkConfig = 4,
        NtpConfig = 5,
        SyslogRestart = 6,
        ConfigRequest = 7,
        CommandStatus = 8,
        /// Reserved for test fakes registered at runtime.
        Test = 9,
    }

    /// A single administrative request.
    ///
    /// `string_arg` is overloaded: for most command types it carries the
    /// serialized command payload; for `CommandStatus` it carries the job ID
    /// returned by an earlier asynchronous submission.
    #[derive(Clone, PartialEq, Message)]
    pub struct CommandRequest {
        #[prost(enumeration = "CommandType", tag = "1")]
        pub r#type: i32,

        #[prost(bool, tag = "2")]
        pub r#async: bool,

        #[prost(string, tag = "3")]
        pub string_arg: String,
    }

    /// The reply to a single request.
    ///
    /// `completed` is tri-state: unset means "not applicable" (validation
    /// failure, malformed request), `false` means the job is still running,
    /// `true` marks a terminal reply.
    #[derive(Clone, PartialEq, Message)]
    pub struct CommandReply {
        #[prost(bool, tag = "1")]
        pub success: bool,

        #[prost(string, tag = "2")]
        pub result: String,

        #[prost(bool, optional, tag = "3")]
        pub completed: Option<bool>,
    }

    /// How an interface obtains its address.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ConfigMethod {
        Dhcp = 0,
        StaticIp = 1,
    }

    /// Payload of a NETWORK_CONFIG request.
    #[derive(Clone, PartialEq, Message)]
    pub struct NetInterface {
        #[prost(enumeration = "ConfigMethod", tag = "1")]
        pub method: i32,

        #[prost(string, tag = "2")]
        pub interface: String,

        #[prost(string, tag = "3")]
        pub ip_address: String,

        #[prost(string, tag = "4")]
        pub netmask: String,

        #[prost(string, tag = "5")]
        pub gateway: String,

        #[prost(string, repeated, tag = "6")]
        pub dns_servers: Vec<String>,

        #[prost(string, repeated, tag = "7")]
        pub search_domains: Vec<String>,
    }

    /// Payload of a SHUTDOWN request.
    #[derive(Clone, PartialEq, Message)]
    pub struct ShutdownRequest {
        #[prost(bool, tag = "1")]
        pub now: bool,
    }

    /// Payload of an NTP_CONFIG request.
    #[derive(Clone, PartialEq, Message)]
    pub struct NtpServers {
        #[prost(string, tag = "1")]
        pub primary: String,

        #[prost(string, tag = "2")]
        pub backup: String,
    }
}

pub use proto::*;

/// Literal reply strings that are part of the observable wire contract.
pub mod replies {
    pub const RUNNING: &str = "Command running";
    pub const ALREADY_SENT: &str = "Result Already Sent";
    pub const NOT_FOUND: &str = "Command Not Found";
    pub const STATUS_NO_ID: &str = "Invalid Status Request, No ID";
    pub const STATUS_NOT_ASYNC: &str = "Invalid Status Request, Cannot Process Asynchronously";
}

impl CommandRequest {
    /// Create a request for the given command type.
    pub fn new(cmd_type: CommandType) -> Self {
        Self {
            r#type: cmd_type.into(),
            r#async: false,
            string_arg: String::new(),
        }
    }

    /// The decoded command type, `Unknown` for out-of-range values.
    pub fn command_type(&self) -> CommandType {
        CommandType::try_from(self.r#type).unwrap_or(CommandType::Unknown)
    }

    /// Create a synchronous status query for the given job ID.
    pub fn status_query(job_id: impl Into<String>) -> Self {
        Self {
            r#type: CommandType::CommandStatus.into(),
            r#async: false,
            string_arg: job_id.into(),
        }
    }
}

/// Builder helpers for replies
impl CommandReply {
    /// A successful reply with the given result payload.
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: result.into(),
            completed: None,
        }
    }

    /// A failed reply with a human-readable reason.
    pub fn failure(result: impl Into<String>) -> Self {
        Self {
            success: false,
            result: result.into(),
            completed: None,
        }
    }

    /// Reply for a job that has been submitted but has not finished.
    pub fn running() -> Self {
        Self {
            success: true,
            result: replies::RUNNING.into(),
            completed: Some(false),
        }
    }

    /// Reply for a job whose result was already delivered.
    pub fn already_sent() -> Self {
        Self {
            success: true,
            result: replies::ALREADY_SENT.into(),
            completed: Some(true),
        }
    }

    /// Reply for an unknown or evicted job ID. Terminal for the client.
    pub fn not_found() -> Self {
        Self {
            success: false,
            result: replies::NOT_FOUND.into(),
            completed: Some(true),
        }
    }

    /// Acknowledgement of an accepted asynchronous submission; the result
    /// string is the job ID to poll with.
    pub fn job_accepted(job_id: impl Into<String>) -> Self {
        Self {
            success: true,
            result: job_id.into(),
            completed: None,
        }
    }

    /// True once the reply is terminal (claimed result, already-sent
    /// acknowledgement, or eviction notice).
    pub fn is_completed(&self) -> bool {
        self.completed.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_type_accessor() {
        let request = CommandRequest::new(CommandType::Reboot);
        assert_eq!(request.command_type(), CommandType::Reboot);

        let out_of_range = CommandRequest {
            r#type: 999,
            r#async: false,
            string_arg: String::new(),
        };
        assert_eq!(out_of_range.command_type(), CommandType::Unknown);
    }

    #[test]
    fn test_status_query_shape() {
        let query = CommandRequest::status_query("job-7");
        assert_eq!(query.command_type(), CommandType::CommandStatus);
        assert!(!query.r#async);
        assert_eq!(query.string_arg, "job-7");
    }

    #[test]
    fn test_reply_builders() {
        let running = CommandReply::running();
        assert!(running.success);
        assert_eq!(running.completed, Some(false));
        assert_eq!(running.result, replies::RUNNING);

        let sent = CommandReply::already_sent();
        assert!(sent.success);
        assert!(sent.is_completed());

        let missing = CommandReply::not_found();
        assert!(!missing.success);
        assert!(missing.is_completed());
        assert_eq!(missing.result, replies::NOT_FOUND);

        let accepted = CommandReply::job_accepted("job-1");
        assert!(accepted.success);
        assert_eq!(accepted.completed, None);
        assert_eq!(accepted.result, "job-1");
    }

    #[test]
    fn test_failure_leaves_completed_unset() {
        let reply = CommandReply::failure(replies::STATUS_NO_ID);
        assert!(!reply.success);
        assert_eq!(reply.completed, None);
        assert!(!reply.is_completed());
    }
}
