//! Session client over a framed byte stream

use crate::error::ClientError;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use shared::{read_message, write_message, Concert, ConcertId, Request, Response};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// One open session with a concert server.
///
/// Requests are strictly sequential: each call writes one request and waits
/// for its response before returning.
pub struct ConcertClient<S = TcpStream> {
    stream: S,
}

impl ConcertClient<TcpStream> {
    /// Opens a TCP connection and performs the Hello handshake.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        info!("Connecting to {}", addr);
        let stream = TcpStream::connect(addr).await?;
        Self::handshake(stream).await
    }
}

impl<S> ConcertClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a session over an already connected stream.
    pub async fn handshake(stream: S) -> Result<Self, ClientError> {
        let mut client = Self { stream };
        client.expect_success(Request::Hello).await?;
        info!("Session established");
        Ok(client)
    }

    /// Sends a raw request and returns whatever the server answers,
    /// including failure responses.
    pub async fn send(&mut self, request: Request) -> Result<Response, ClientError> {
        debug!("Sending {}", request.kind());
        write_message(&mut self.stream, &request).await?;

        match read_message(&mut self.stream).await? {
            Some(response) => Ok(response),
            None => {
                warn!("Server closed the connection");
                Err(ClientError::Closed)
            }
        }
    }

    pub async fn create(
        &mut self,
        title: &str,
        date: DateTime<Utc>,
    ) -> Result<Concert, ClientError> {
        let request = Request::create(Concert::new(title, date))?;
        match self.call(request).await? {
            Response::Created { concert, .. } => Ok(concert),
            other => Err(unexpected("Create", other)),
        }
    }

    pub async fn retrieve(&mut self, id: ConcertId) -> Result<Concert, ClientError> {
        let request = Request::retrieve(Some(id))?;
        match self.call(request).await? {
            Response::Retrieved { concert } => Ok(concert),
            other => Err(unexpected("Retrieve", other)),
        }
    }

    /// Replaces the title and date of the concert with `concert`'s id.
    pub async fn update(&mut self, concert: &Concert) -> Result<(), ClientError> {
        let request = Request::update(concert.clone())?;
        self.expect_success(request).await
    }

    pub async fn delete(&mut self, id: ConcertId) -> Result<(), ClientError> {
        let request = Request::delete(Some(id))?;
        self.expect_success(request).await
    }

    pub async fn list(&mut self) -> Result<Vec<Concert>, ClientError> {
        match self.call(Request::List).await? {
            Response::Listed { concerts } => Ok(concerts),
            other => Err(unexpected("List", other)),
        }
    }

    pub async fn clear(&mut self) -> Result<(), ClientError> {
        self.expect_success(Request::Clear).await
    }

    /// Ends the session and closes the stream.
    pub async fn goodbye(mut self) -> Result<(), ClientError> {
        self.expect_success(Request::Goodbye).await?;
        self.stream.shutdown().await?;
        info!("Session closed");
        Ok(())
    }

    /// Sends a request and turns a failure response into an error.
    async fn call(&mut self, request: Request) -> Result<Response, ClientError> {
        match self.send(request).await? {
            Response::Failure { kind, reason } => Err(ClientError::Rejected { kind, reason }),
            response => Ok(response),
        }
    }

    async fn expect_success(&mut self, request: Request) -> Result<(), ClientError> {
        let kind = request.kind();
        match self.call(request).await? {
            Response::Success => Ok(()),
            other => Err(unexpected(kind, other)),
        }
    }
}

fn unexpected(request: &'static str, response: Response) -> ClientError {
    warn!("Unexpected response to {}: {:?}", request, response);
    ClientError::UnexpectedResponse { request, response }
}
