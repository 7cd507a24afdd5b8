//! Parsing of `--status-fd` lines emitted by gpg.

pub const STATUS_PREFIX: &str = "[GNUPG:] ";

pub const GET_LINE: &str = "GET_LINE";
pub const GET_BOOL: &str = "GET_BOOL";
pub const GET_HIDDEN: &str = "GET_HIDDEN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusKeyword {
    GetLine,
    GetBool,
    GetHidden,
    Other(String),
}

impl StatusKeyword {
    pub fn parse(s: &str) -> Self {
        match s {
            GET_LINE => StatusKeyword::GetLine,
            GET_BOOL => StatusKeyword::GetBool,
            GET_HIDDEN => StatusKeyword::GetHidden,
            other => StatusKeyword::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StatusKeyword::GetLine => GET_LINE,
            StatusKeyword::GetBool => GET_BOOL,
            StatusKeyword::GetHidden => GET_HIDDEN,
            StatusKeyword::Other(s) => s,
        }
    }

    /// The engine is blocked waiting for one line on the command fd.
    pub fn is_prompt(&self) -> bool {
        !matches!(self, StatusKeyword::Other(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub keyword: StatusKeyword,
    pub args: String,
}

impl StatusEvent {
    pub fn new(keyword: &str, args: &str) -> Self {
        Self {
            keyword: StatusKeyword::parse(keyword),
            args: args.to_string(),
        }
    }

    /// Parses `[GNUPG:] KEYWORD[ args]`. Returns `None` for anything that is
    /// not a status line.
    pub fn parse_line(line: &str) -> Option<Self> {
        let rest = line.strip_prefix(STATUS_PREFIX)?;
        let rest = rest.trim_end();
        let (keyword, args) = match rest.split_once(' ') {
            Some((k, a)) => (k, a.trim()),
            None => (rest, ""),
        };
        if keyword.is_empty() {
            return None;
        }
        Some(Self::new(keyword, args))
    }

    pub fn tokens(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }
}
