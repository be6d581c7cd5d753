//! Maps active-session requests onto store operations

use crate::store::{SharedStore, StoreError};
use log::{debug, error, warn};
use shared::{Request, Response};

/// Executes requests against the shared store.
///
/// Cheap to clone; every connection task holds its own handle to the same
/// store. Each request takes the store lock exactly once, so no other
/// session observes a half-applied change.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    store: SharedStore,
}

impl Dispatcher {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::Create { concert } => {
                if let Some(id) = concert.id() {
                    debug!("Ignoring client-supplied id {} on create", id);
                }
                let created = {
                    let mut store = self.store.write().await;
                    store.create(concert.title(), concert.date())
                };
                let Some(id) = created.id() else {
                    error!("Store returned concert '{}' without an id", created.title());
                    return Response::protocol_error();
                };
                Response::Created {
                    id,
                    concert: created,
                }
            }

            Request::Retrieve { id } => {
                let store = self.store.read().await;
                match store.retrieve(id) {
                    Ok(concert) => Response::Retrieved { concert },
                    Err(e) => Self::failure(e),
                }
            }

            Request::Update { concert } => {
                let Some(id) = concert.id() else {
                    warn!("Update without an id");
                    return Response::not_found();
                };
                let mut store = self.store.write().await;
                match store.update(id, concert.title(), concert.date()) {
                    Ok(()) => Response::Success,
                    Err(e) => Self::failure(e),
                }
            }

            Request::Delete { id } => {
                let mut store = self.store.write().await;
                match store.delete(id) {
                    Ok(()) => Response::Success,
                    Err(e) => Self::failure(e),
                }
            }

            Request::List => {
                let concerts = self.store.read().await.list();
                Response::Listed { concerts }
            }

            Request::Clear => {
                self.store.write().await.clear();
                Response::Success
            }

            Request::Hello | Request::Goodbye => {
                warn!("{} is not a store operation", request.kind());
                Response::protocol_error()
            }
        }
    }

    fn failure(error: StoreError) -> Response {
        debug!("{}", error);
        match error {
            StoreError::NotFound(_) => Response::not_found(),
        }
    }
}
