use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::{relay::Relay, service, telegram::MessagingApi, Error};

/// HTTP/1.1 front of the relay. Every connection gets its own task and
/// every request on it goes through [`service::handle_request`].
pub struct RelayServer<A> {
    bind_addr: SocketAddr,
    relay: Arc<Relay<A>>,
}

impl<A> RelayServer<A>
where
    A: MessagingApi + 'static,
{
    pub fn new(bind_addr: SocketAddr, relay: Relay<A>) -> Self {
        Self {
            bind_addr,
            relay: Arc::new(relay),
        }
    }

    /// Binds and serves until `shutdown` flips.
    pub async fn serve(self, shutdown: watch::Receiver<bool>) -> Result<(), Error> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve_listener(listener, shutdown).await
    }

    pub async fn serve_listener(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), Error> {
        log::info!("Relay listening on {}", listener.local_addr()?);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer_addr) = accepted?;
                    let relay = self.relay.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let svc = service_fn(move |req: Request<Incoming>| {
                            let relay = relay.clone();
                            async move {
                                log::debug!("{} {} from {}", req.method(), req.uri().path(), peer_addr);
                                Ok::<_, hyper::Error>(service::handle_request(&relay, req).await)
                            }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, svc).await {
                            log::error!("Connection from {} failed: {}", peer_addr, e);
                        }
                    });
                }

                _ = shutdown.changed() => {
                    log::info!("Relay shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
