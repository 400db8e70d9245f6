/// Failure classes surfaced at the process boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network-level failure reaching an upstream source.
    Fetch,
    /// Upstream payload did not have the expected shape.
    Parse,
    /// Upstream named a region missing from the static lookup.
    UnknownRegion,
    /// A persisted row could not be mapped onto the column schema.
    MalformedRow,
    /// Local filesystem failure.
    Io,
    /// Invalid configuration (CLI or environment).
    Config,
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fetch, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn unknown_region(name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownRegion,
            format!("Unknown region '{name}': the region lookup needs updating."),
        )
    }

    pub fn malformed_row(line: usize, message: impl AsRef<str>) -> Self {
        Self::new(
            ErrorKind::MalformedRow,
            format!("Malformed row at line {line}: {}", message.as_ref()),
        )
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        match self.kind {
            ErrorKind::Io | ErrorKind::Config | ErrorKind::MalformedRow => 2,
            ErrorKind::Parse | ErrorKind::UnknownRegion => 3,
            ErrorKind::Fetch => 4,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::fetch("down").exit_code(), 4);
        assert_eq!(AppError::parse("bad").exit_code(), 3);
        assert_eq!(AppError::unknown_region("Bayern").exit_code(), 3);
        assert_eq!(AppError::malformed_row(3, "too many cells").exit_code(), 2);
        assert_eq!(AppError::config("nope").exit_code(), 2);
    }

    #[test]
    fn unknown_region_names_the_region() {
        let err = AppError::unknown_region("Bayern");
        assert_eq!(err.kind(), ErrorKind::UnknownRegion);
        assert!(err.to_string().contains("Bayern"));
    }
}
