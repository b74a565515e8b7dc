//! Accept loops for the HTTP and gRPC listeners

use crate::shutdown::{InFlight, ShutdownSignal};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use mockwire_protocols::{GrpcDispatcher, HttpMockHandler};
use std::convert::Infallible;
use tokio::net::TcpListener;

/// Serve HTTP/1.1 mock connections until shutdown
pub async fn serve_http(
    listener: TcpListener,
    handler: HttpMockHandler,
    in_flight: InFlight,
    shutdown: ShutdownSignal,
) {
    let mut shutdown_rx = shutdown.subscribe();
    if shutdown.is_triggered() {
        return;
    }

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        tracing::trace!("Accepted HTTP connection from {}", addr);

                        let handler = handler.clone();
                        let in_flight = in_flight.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req: http::Request<Incoming>| {
                                let handler = handler.clone();
                                let guard = in_flight.start();
                                async move {
                                    let response = handler.handle(req).await;
                                    drop(guard);
                                    Ok::<_, Infallible>(response)
                                }
                            });

                            let io = TokioIo::new(stream);
                            if let Err(e) = hyper::server::conn::http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                tracing::debug!("HTTP connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                    }
                }
            }

            _ = shutdown_rx.recv() => {
                tracing::info!("HTTP listener stopping");
                break;
            }
        }
    }
}

/// Serve gRPC (HTTP/2) mock connections until shutdown
pub async fn serve_grpc(
    listener: TcpListener,
    dispatcher: GrpcDispatcher,
    in_flight: InFlight,
    shutdown: ShutdownSignal,
) {
    let mut shutdown_rx = shutdown.subscribe();
    if shutdown.is_triggered() {
        return;
    }

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        tracing::trace!("Accepted gRPC connection from {}", addr);

                        let dispatcher = dispatcher.clone();
                        let in_flight = in_flight.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req: http::Request<Incoming>| {
                                let dispatcher = dispatcher.clone();
                                let guard = in_flight.start();
                                async move {
                                    let response = dispatcher.handle(req.map(tonic::body::boxed)).await;
                                    drop(guard);
                                    Ok::<_, Infallible>(response)
                                }
                            });

                            let io = TokioIo::new(stream);
                            if let Err(e) = auto::Builder::new(TokioExecutor::new())
                                .serve_connection(io, service)
                                .await
                            {
                                tracing::debug!("gRPC connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                    }
                }
            }

            _ = shutdown_rx.recv() => {
                tracing::info!("gRPC listener stopping");
                break;
            }
        }
    }
}
