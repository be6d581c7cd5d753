//! Server network layer: TCP accept loop and per-connection session tasks

use crate::config::ServerConfig;
use crate::connection_manager::{ConnectionManager, RequestCounter};
use crate::dispatcher::Dispatcher;
use crate::session::{Action, Session};
use crate::store::{ConcertStore, SharedStore};
use log::{debug, error, info, warn};
use shared::{read_message, write_message, CodecError, Request};
use std::future::{poll_fn, Future};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, RwLock, Semaphore};
use tokio::time::timeout;

/// Source of accepted TCP connections.
pub trait Accept {
    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<(TcpStream, SocketAddr)>>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Accept for TcpListener {
    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<(TcpStream, SocketAddr)>> {
        TcpListener::poll_accept(self, cx)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// Stops a running server from outside its task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Stops accepting connections and tells every live session to close
    /// its transport.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Accepts connections and runs one session task per connection
pub struct Server<L = TcpListener> {
    listener: L,
    store: SharedStore,
    dispatcher: Dispatcher,
    connections: Arc<RwLock<ConnectionManager>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    /// Bounds how many over-capacity connections wait for their first frame
    rejections: Arc<Semaphore>,
    reject_timeout: Duration,
}

impl Server<TcpListener> {
    pub async fn bind(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(config.address()).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Self::with_listener(listener, config))
    }
}

impl<L: Accept> Server<L> {
    pub fn with_listener(listener: L, config: &ServerConfig) -> Self {
        let store = ConcertStore::shared();
        let (shutdown_tx, _) = watch::channel(false);

        Server {
            listener,
            dispatcher: Dispatcher::new(Arc::clone(&store)),
            store,
            connections: Arc::new(RwLock::new(ConnectionManager::new(
                config.max_connections,
            ))),
            shutdown_tx: Arc::new(shutdown_tx),
            rejections: Arc::new(Semaphore::new(config.max_connections.max(1))),
            reject_timeout: config.reject_timeout(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub fn connections(&self) -> Arc<RwLock<ConnectionManager>> {
        Arc::clone(&self.connections)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Accept loop. Returns when shut down or when accepting fails.
    ///
    /// An accept failure stops only the loop; sessions already running carry
    /// on until they end or shutdown is signalled.
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("Server started successfully");

        loop {
            if *shutdown_rx.borrow() {
                info!("Server shutting down");
                break;
            }

            tokio::select! {
                Ok(()) = shutdown_rx.changed() => {}
                result = poll_fn(|cx| self.listener.poll_accept(cx)) => {
                    match result {
                        Ok((stream, addr)) => self.spawn_connection(stream, addr).await,
                        Err(e) => {
                            error!("Failed to accept connection, stopping: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Runs the accept loop until `signal` resolves, then shuts down.
    pub async fn run_until<F>(self, signal: F)
    where
        F: Future<Output = ()>,
    {
        let handle = self.shutdown_handle();

        tokio::select! {
            _ = self.run() => {}
            _ = signal => {
                info!("Shutdown signal received");
            }
        }

        handle.shutdown();
    }

    async fn spawn_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let registered = {
            let mut connections = self.connections.write().await;
            match connections.add_connection(addr) {
                Some(id) => connections.counter(id).map(|counter| (id, counter)),
                None => None,
            }
        };

        let dispatcher = self.dispatcher.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let Some((connection_id, counter)) = registered else {
            self.reject_connection(stream, addr, dispatcher, shutdown_rx);
            return;
        };

        let connections = Arc::clone(&self.connections);
        tokio::spawn(async move {
            let session = Session::new();
            if let Err(e) =
                handle_connection(stream, session, &dispatcher, &mut shutdown_rx, &counter).await
            {
                warn!("Session with {} ended abnormally: {}", addr, e);
            }

            connections.write().await.remove_connection(connection_id);
        });
    }

    /// Answers the first message of an over-capacity connection with a
    /// server-full failure, giving up if it does not arrive in time.
    fn reject_connection(
        &self,
        stream: TcpStream,
        addr: SocketAddr,
        dispatcher: Dispatcher,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let Ok(permit) = Arc::clone(&self.rejections).try_acquire_owned() else {
            warn!("Dropping connection from {}: server full", addr);
            return;
        };

        warn!("Rejecting connection from {}: server full", addr);
        let wait = self.reject_timeout;

        tokio::spawn(async move {
            let _permit = permit;
            let requests = RequestCounter::default();
            let session = handle_connection(
                stream,
                Session::rejected(),
                &dispatcher,
                &mut shutdown_rx,
                &requests,
            );

            match timeout(wait, session).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => debug!("Rejected connection from {} failed: {}", addr, e),
                Err(_) => debug!("Connection from {} sent nothing within {:?}", addr, wait),
            }
        });
    }
}

/// Drives one session over a byte stream until it closes.
///
/// Requests are read and answered strictly one at a time, and `requests`
/// is bumped as each response is produced. Returns the number of responses
/// written. A transport or decode failure closes the session without a
/// reply and is returned as the error.
pub async fn handle_connection<S>(
    mut stream: S,
    mut session: Session,
    dispatcher: &Dispatcher,
    shutdown_rx: &mut watch::Receiver<bool>,
    requests: &RequestCounter,
) -> Result<u64, CodecError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut answered = 0;

    while !session.is_closed() {
        if *shutdown_rx.borrow() {
            debug!("Closing session for shutdown");
            session.abort();
            break;
        }

        // Shutdown wins over a request that arrives at the same time
        let request = tokio::select! {
            biased;
            Ok(()) = shutdown_rx.changed() => continue,
            result = read_message::<Request, _>(&mut stream) => match result {
                Ok(Some(request)) => request,
                Ok(None) => {
                    debug!("Peer closed the connection");
                    session.abort();
                    break;
                }
                Err(e) => {
                    session.abort();
                    return Err(e);
                }
            },
        };

        debug!("Received a new message: {}", request.kind());

        let response = match session.on_request(request) {
            Some(Action::Reply(response)) => response,
            Some(Action::Dispatch(request)) => dispatcher.dispatch(request).await,
            None => break,
        };
        requests.increment();

        if let Err(e) = write_message(&mut stream, &response).await {
            session.abort();
            return Err(e);
        }
        answered += 1;
    }

    if let Err(e) = stream.shutdown().await {
        debug!("Error closing stream: {}", e);
    }

    Ok(answered)
}
