use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod codec;

pub use codec::{decode, encode, read_message, write_message, CodecError, WireMessage};

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8080";

pub const NOT_FOUND_REASON: &str = "Concert with specified id not found";
pub const PROTOCOL_ERROR_REASON: &str = "Unexpected message received";
pub const SERVER_FULL_REASON: &str = "Server full";

/// Identifier the server assigns to a concert when it is created.
pub type ConcertId = u64;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Concert {
    id: Option<ConcertId>,
    title: String,
    date: DateTime<Utc>,
}

impl Concert {
    /// A concert that has not been stored yet and so carries no id.
    pub fn new(title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            title: title.into(),
            date,
        }
    }

    pub fn with_id(id: ConcertId, title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: Some(id),
            title: title.into(),
            date,
        }
    }

    pub fn id(&self) -> Option<ConcertId> {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.date = date;
    }
}

/// Raised when a request is built with arguments the protocol forbids.
/// These never reach the wire.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IllegalArgument {
    #[error("concert already has an id ({0})")]
    IdAlreadyAssigned(ConcertId),
    #[error("concert must have a non-null id value")]
    MissingConcertId,
    #[error("id must be non null")]
    MissingId,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Request {
    Hello,
    Goodbye,
    Create { concert: Concert },
    Retrieve { id: ConcertId },
    Update { concert: Concert },
    Delete { id: ConcertId },
    List,
    Clear,
}

impl Request {
    pub fn create(concert: Concert) -> Result<Self, IllegalArgument> {
        match concert.id {
            Some(id) => Err(IllegalArgument::IdAlreadyAssigned(id)),
            None => Ok(Request::Create { concert }),
        }
    }

    pub fn retrieve(id: Option<ConcertId>) -> Result<Self, IllegalArgument> {
        let id = id.ok_or(IllegalArgument::MissingId)?;
        Ok(Request::Retrieve { id })
    }

    pub fn update(concert: Concert) -> Result<Self, IllegalArgument> {
        if concert.id.is_none() {
            return Err(IllegalArgument::MissingConcertId);
        }
        Ok(Request::Update { concert })
    }

    pub fn delete(id: Option<ConcertId>) -> Result<Self, IllegalArgument> {
        let id = id.ok_or(IllegalArgument::MissingId)?;
        Ok(Request::Delete { id })
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Hello => "Hello",
            Request::Goodbye => "Goodbye",
            Request::Create { .. } => "Create",
            Request::Retrieve { .. } => "Retrieve",
            Request::Update { .. } => "Update",
            Request::Delete { .. } => "Delete",
            Request::List => "List",
            Request::Clear => "Clear",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Message received out of sequence.
    Protocol,
    /// Retrieve, Update or Delete named an unknown id.
    NotFound,
    /// Server refused the session because it is at capacity.
    ServerFull,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Response {
    Success,
    Created { id: ConcertId, concert: Concert },
    Retrieved { concert: Concert },
    Listed { concerts: Vec<Concert> },
    Failure { kind: FailureKind, reason: String },
}

impl Response {
    pub fn protocol_error() -> Self {
        Response::Failure {
            kind: FailureKind::Protocol,
            reason: PROTOCOL_ERROR_REASON.to_string(),
        }
    }

    pub fn not_found() -> Self {
        Response::Failure {
            kind: FailureKind::NotFound,
            reason: NOT_FOUND_REASON.to_string(),
        }
    }

    pub fn server_full() -> Self {
        Response::Failure {
            kind: FailureKind::ServerFull,
            reason: SERVER_FULL_REASON.to_string(),
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Response::Failure { .. } => Status::Failure,
            _ => Status::Success,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == Status::Success
    }

    pub fn id(&self) -> Option<ConcertId> {
        match self {
            Response::Created { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn concert(&self) -> Option<&Concert> {
        match self {
            Response::Created { concert, .. } | Response::Retrieved { concert } => Some(concert),
            _ => None,
        }
    }

    pub fn concerts(&self) -> Option<&[Concert]> {
        match self {
            Response::Listed { concerts } => Some(concerts),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Response::Failure { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn queen_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 8, 4, 20, 0, 0).unwrap()
    }

    #[test]
    fn test_concert_creation() {
        let concert = Concert::new("One Night of Queen", queen_date());
        assert_eq!(concert.id(), None);
        assert_eq!(concert.title(), "One Night of Queen");
        assert_eq!(concert.date(), queen_date());
    }

    #[test]
    fn test_concert_setters_keep_id() {
        let mut concert = Concert::with_id(7, "Spend the Night with Alice Cooper", queen_date());
        let new_date = Utc.with_ymd_and_hms(2017, 10, 28, 19, 0, 0).unwrap();

        concert.set_date(new_date);
        concert.set_title("Alice Cooper");

        assert_eq!(concert.id(), Some(7));
        assert_eq!(concert.date(), new_date);
        assert_eq!(concert.title(), "Alice Cooper");
    }

    #[test]
    fn test_create_rejects_assigned_id() {
        let concert = Concert::with_id(3, "The Selecter and the Beat", queen_date());
        assert_eq!(
            Request::create(concert),
            Err(IllegalArgument::IdAlreadyAssigned(3))
        );

        let request = Request::create(Concert::new("The Selecter and the Beat", queen_date()));
        assert!(matches!(request, Ok(Request::Create { .. })));
    }

    #[test]
    fn test_update_requires_id() {
        let concert = Concert::new("One Night of Queen", queen_date());
        assert_eq!(
            Request::update(concert),
            Err(IllegalArgument::MissingConcertId)
        );

        let concert = Concert::with_id(1, "One Night of Queen", queen_date());
        assert!(matches!(Request::update(concert), Ok(Request::Update { .. })));
    }

    #[test]
    fn test_retrieve_and_delete_require_id() {
        assert_eq!(Request::retrieve(None), Err(IllegalArgument::MissingId));
        assert_eq!(Request::delete(None), Err(IllegalArgument::MissingId));
        assert_eq!(Request::retrieve(Some(4)), Ok(Request::Retrieve { id: 4 }));
        assert_eq!(Request::delete(Some(9)), Ok(Request::Delete { id: 9 }));
    }

    #[test]
    fn test_request_kind_names() {
        assert_eq!(Request::Hello.kind(), "Hello");
        assert_eq!(Request::Delete { id: 1 }.kind(), "Delete");
        assert_eq!(Request::Clear.kind(), "Clear");
    }

    #[test]
    fn test_response_status() {
        assert_eq!(Response::Success.status(), Status::Success);
        assert_eq!(
            Response::Listed { concerts: vec![] }.status(),
            Status::Success
        );
        assert_eq!(Response::not_found().status(), Status::Failure);
        assert_eq!(Response::protocol_error().status(), Status::Failure);
        assert!(!Response::server_full().is_success());
    }

    #[test]
    fn test_response_accessors() {
        let concert = Concert::with_id(1, "One Night of Queen", queen_date());

        let created = Response::Created {
            id: 1,
            concert: concert.clone(),
        };
        assert_eq!(created.id(), Some(1));
        assert_eq!(created.concert(), Some(&concert));
        assert!(created.concerts().is_none());
        assert!(created.failure_message().is_none());

        let retrieved = Response::Retrieved {
            concert: concert.clone(),
        };
        assert_eq!(retrieved.id(), None);
        assert_eq!(retrieved.concert(), Some(&concert));

        let listed = Response::Listed {
            concerts: vec![concert],
        };
        assert_eq!(listed.concerts().map(|c| c.len()), Some(1));
        assert!(listed.concert().is_none());
    }

    #[test]
    fn test_failure_never_carries_entities() {
        let failure = Response::not_found();
        assert!(failure.concert().is_none());
        assert!(failure.concerts().is_none());
        assert!(failure.id().is_none());
        assert_eq!(failure.failure_message(), Some(NOT_FOUND_REASON));
    }
}
