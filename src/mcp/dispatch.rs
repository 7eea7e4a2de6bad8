//! MCP method dispatch.
//!
//! String method names from the wire resolve into typed [`McpMethod`]
//! variants; unknown names are captured for error reporting instead of
//! falling through a string match.

use std::fmt;

/// MCP method identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum McpMethod {
    /// Initialize the MCP session.
    Initialize,
    /// Notification that the client finished initializing.
    Initialized,
    /// List available tools.
    ListTools,
    /// Call a specific tool.
    CallTool,
    /// Ping the server (health check).
    Ping,
    /// Unknown method (for error handling).
    Unknown(String),
}

impl McpMethod {
    /// Returns the MCP protocol method name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "notifications/initialized",
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::Ping => "ping",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Returns true if this is a known method.
    #[must_use]
    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Returns all known methods.
    #[must_use]
    pub const fn known_methods() -> &'static [Self] {
        &[
            Self::Initialize,
            Self::Initialized,
            Self::ListTools,
            Self::CallTool,
            Self::Ping,
        ]
    }
}

impl From<&str> for McpMethod {
    fn from(s: &str) -> Self {
        match s {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "ping" => Self::Ping,
            unknown => Self::Unknown(unknown.to_string()),
        }
    }
}

impl fmt::Display for McpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
