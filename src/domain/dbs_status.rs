/// Stored DBS status. Other reminder flows write values of their own,
/// those are carried through untouched as `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbsStatus {
    NotStarted,
    Requested,
    Received,
    Other(String),
}

impl DbsStatus {
    pub fn parse(status: String) -> DbsStatus {
        match status.as_str() {
            "not_started" => DbsStatus::NotStarted,
            "requested" => DbsStatus::Requested,
            "received" => DbsStatus::Received,
            _ => DbsStatus::Other(status),
        }
    }
}

impl AsRef<str> for DbsStatus {
    fn as_ref(&self) -> &str {
        match self {
            DbsStatus::NotStarted => "not_started",
            DbsStatus::Requested => "requested",
            DbsStatus::Received => "received",
            DbsStatus::Other(status) => status,
        }
    }
}

impl serde::Serialize for DbsStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_ref())
    }
}
