//! `RpcServer`: accepts connections, decodes one request, dispatches,
//! writes a response. Generalizes `rpc/tcp.go`'s `TcpRpcServer`
//! (`Register`/`Run`/`Stop`, the `readHandle`/`writeHandle` goroutine
//! pair per connection) onto `std::net::TcpListener` plus the
//! `crpc_pool::Pool` worker scheduler.

use std::any::Any;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Duration;

use hashbrown::HashMap;
use slog::{debug, o, warn, Logger};

use crpc_codec::{
    CompressType, Frame, GobResponse, Header, JsonResponse, MessageType, RequestPayload,
    ResponsePayload,
};
use crpc_codec::wire;
use crpc_limiter::RateLimiter;
use crpc_pool::Pool;

use crate::error::Result;
use crate::service::Service;

/// How long the accept loop sleeps between nonblocking poll attempts so
/// that `stop()` is noticed promptly without busy-spinning.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Default wait for the rate limiter when one is configured but no
/// explicit timeout was set.
const DEFAULT_LIMITER_TIMEOUT: Duration = Duration::from_secs(1);

enum Envelope {
    Response(CompressType, ResponsePayload),
    /// The frame layer itself failed (bad magic, truncated read) before a
    /// request id could even be recovered; nothing well-formed can be
    /// sent back, so the writer just closes the socket.
    CloseWithoutReply,
}

pub struct RpcServer {
    registry: RwLock<HashMap<String, Arc<dyn Service>>>,
    pool: Pool,
    limiter: Mutex<Option<Arc<RateLimiter>>>,
    limiter_timeout: Mutex<Duration>,
    logger: Logger,
    stopped: AtomicBool,
    listener: Mutex<Option<TcpListener>>,
    active: (Mutex<usize>, Condvar),
}

impl RpcServer {
    /// Binds `addr` and constructs a server backed by `pool`. The
    /// registry starts empty; callers must finish `register`-ing every
    /// service before calling `run()`.
    pub fn bind(addr: &str, pool: Pool, logger: Logger) -> Result<Arc<RpcServer>> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let logger = logger.new(o!("component" => "rpc-server", "addr" => addr.to_owned()));
        Ok(Arc::new(RpcServer {
            registry: RwLock::new(HashMap::new()),
            pool,
            limiter: Mutex::new(None),
            limiter_timeout: Mutex::new(DEFAULT_LIMITER_TIMEOUT),
            logger,
            stopped: AtomicBool::new(false),
            listener: Mutex::new(Some(listener)),
            active: (Mutex::new(0), Condvar::new()),
        }))
    }

    /// Stores `service` under `name`. Rejects non-reference values at the
    /// type level: `service` is already an `Arc<dyn Service>`, so method
    /// dispatch always observes the same mutable state a caller's own
    /// handle does. Duplicate names overwrite (last writer wins).
    pub fn register(&self, name: impl Into<String>, service: Arc<dyn Service>) {
        self.registry.write().unwrap().insert(name.into(), service);
    }

    /// Configures admission: `rate` tokens/sec, `capacity` burst.
    pub fn set_limiter(&self, rate: f64, capacity: f64) {
        *self.limiter.lock().unwrap() = Some(Arc::new(RateLimiter::new(rate, capacity)));
    }

    pub fn set_limiter_timeout(&self, timeout: Duration) {
        *self.limiter_timeout.lock().unwrap() = timeout;
    }

    /// The bound local address, for callers (tests, dynamic port setups)
    /// that didn't pick a fixed port.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        let guard = self.listener.lock().unwrap();
        match guard.as_ref() {
            Some(listener) => listener.local_addr(),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "server has been stopped",
            )),
        }
    }

    /// Accept loop. Blocks the calling thread until `stop()` is called
    /// from another thread (or the listener itself errors out). Every
    /// accepted connection is handed to the worker pool as a reader task
    /// and a writer task.
    pub fn run(self: &Arc<Self>) {
        loop {
            if self.stopped.load(Ordering::Acquire) {
                break;
            }

            let accepted = {
                let guard = self.listener.lock().unwrap();
                match guard.as_ref() {
                    Some(listener) => listener.accept(),
                    None => break,
                }
            };

            match accepted {
                Ok((stream, peer)) => {
                    debug!(self.logger, "accepted connection"; "peer" => %peer);
                    self.dispatch_connection(stream);
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    warn!(self.logger, "accept failed"; "error" => %e);
                    break;
                }
            }
        }
    }

    /// Closes the listener and blocks until every in-flight connection
    /// handler has finished draining.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        *self.listener.lock().unwrap() = None;

        let (lock, cvar) = &self.active;
        let mut active = lock.lock().unwrap();
        while *active > 0 {
            active = cvar.wait(active).unwrap();
        }
    }

    fn connection_started(&self) {
        *self.active.0.lock().unwrap() += 1;
    }

    fn connection_done(&self) {
        let mut active = self.active.0.lock().unwrap();
        *active -= 1;
        if *active == 0 {
            self.active.1.notify_all();
        }
    }

    fn dispatch_connection(self: &Arc<Self>, stream: TcpStream) {
        self.connection_started();

        let write_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(e) => {
                warn!(self.logger, "failed to clone connection for writer"; "error" => %e);
                self.connection_done();
                return;
            }
        };

        let (tx, rx) = mpsc::sync_channel::<Envelope>(1);

        let reader = Arc::clone(self);
        if let Err(e) = self.pool.submit(move || reader.reader_task(stream, tx)) {
            warn!(self.logger, "worker pool rejected reader task; dropping connection"; "error" => %e);
            let _ = write_stream.shutdown(Shutdown::Both);
            self.connection_done();
            return;
        }

        let writer = Arc::clone(self);
        if let Err(e) = self.pool.submit(move || writer.writer_task(write_stream, rx)) {
            warn!(self.logger, "worker pool rejected writer task; dropping connection"; "error" => %e);
            self.connection_done();
        }
    }

    fn reader_task(self: Arc<Self>, mut stream: TcpStream, tx: SyncSender<Envelope>) {
        let frame = match Frame::decode(&mut stream) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(self.logger, "frame decode failed"; "error" => %e);
                let _ = tx.send(Envelope::CloseWithoutReply);
                return;
            }
        };

        if frame.header.message_type != MessageType::Request {
            warn!(self.logger, "ignoring non-request frame"; "message_type" => ?frame.header.message_type);
            let _ = tx.send(Envelope::CloseWithoutReply);
            return;
        }

        let header = frame.header;
        let payload = match wire::decode_request(&frame) {
            Ok(payload) => payload,
            Err(e) => {
                let response = codec_error_response(&header, &e.to_string());
                let _ = tx.send(Envelope::Response(header.compress_type, response));
                return;
            }
        };

        // ADMITTING
        let limiter = self.limiter.lock().unwrap().clone();
        if let Some(limiter) = limiter {
            let timeout = *self.limiter_timeout.lock().unwrap();
            if limiter.acquire(timeout).is_err() {
                let response = failure_response(&payload, "rate limited");
                let _ = tx.send(Envelope::Response(header.compress_type, response));
                return;
            }
        }

        // DISPATCHING
        let service = {
            let registry = self.registry.read().unwrap();
            registry.get(payload.service_name()).cloned()
        };

        let response = match service {
            None => {
                let msg = crate::service::no_such_service(payload.service_name());
                failure_response(&payload, msg)
            }
            Some(service) => self.invoke(service, &payload),
        };

        let _ = tx.send(Envelope::Response(header.compress_type, response));
    }

    /// Runs the resolved service's method, recovering a panic into a
    /// 500 response so a single bad request never kills the worker
    /// thread.
    fn invoke(&self, service: Arc<dyn Service>, payload: &RequestPayload) -> ResponsePayload {
        match payload {
            RequestPayload::Json(req) => {
                let method = req.method_name.clone();
                let args = req.args.clone();
                let outcome = catch_unwind(AssertUnwindSafe(|| service.call(&method, &args)));
                match outcome {
                    Ok(Ok(value)) => ResponsePayload::Json(JsonResponse::success(req.request_id, value)),
                    Ok(Err(msg)) => ResponsePayload::Json(JsonResponse::failure(req.request_id, msg)),
                    Err(panic) => {
                        ResponsePayload::Json(JsonResponse::failure(req.request_id, panic_message(panic)))
                    }
                }
            }
            RequestPayload::Gob(req) => {
                let method = req.method_name.clone();
                let args = req.args.clone();
                let outcome = catch_unwind(AssertUnwindSafe(|| service.call_gob(&method, &args)));
                match outcome {
                    Ok(Ok(bytes)) => ResponsePayload::Gob(GobResponse::success(req.request_id, bytes)),
                    Ok(Err(msg)) => ResponsePayload::Gob(GobResponse::failure(req.request_id, msg)),
                    Err(panic) => {
                        ResponsePayload::Gob(GobResponse::failure(req.request_id, panic_message(panic)))
                    }
                }
            }
        }
    }

    fn writer_task(self: Arc<Self>, mut stream: TcpStream, rx: Receiver<Envelope>) {
        if let Ok(envelope) = rx.recv() {
            if let Envelope::Response(compress_type, response) = envelope {
                if let Err(e) = wire::encode_response(&mut stream, compress_type, &response) {
                    warn!(self.logger, "failed to write response frame"; "error" => %e);
                }
            }
        }
        let _ = stream.shutdown(Shutdown::Both);
        self.connection_done();
    }
}

fn failure_response(payload: &RequestPayload, msg: impl Into<String>) -> ResponsePayload {
    match payload {
        RequestPayload::Gob(req) => ResponsePayload::Gob(GobResponse::failure(req.request_id, msg)),
        RequestPayload::Json(req) => ResponsePayload::Json(JsonResponse::failure(req.request_id, msg)),
    }
}

/// Builds a failure response directly from the frame header when the
/// body itself failed to deserialize, so the response at least honours
/// invariant (ii): the same serializer/compressor the request arrived
/// with.
fn codec_error_response(header: &Header, msg: &str) -> ResponsePayload {
    use crpc_codec::SerializerType;
    match header.serializer_type {
        SerializerType::Gob => ResponsePayload::Gob(GobResponse::failure(header.request_id, msg)),
        SerializerType::Protobuf => {
            ResponsePayload::Json(JsonResponse::failure(header.request_id, msg))
        }
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic in service method".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::no_such_method;
    use crpc_codec::{DynamicValue, JsonRequest, SerializerType};
    use std::net::TcpStream as ClientStream;
    use std::time::Duration as StdDuration;

    struct Goods;

    impl Service for Goods {
        fn call(&self, method: &str, args: &[DynamicValue]) -> std::result::Result<DynamicValue, String> {
            match method {
                "Find" => {
                    let id = args
                        .get(0)
                        .ok_or_else(|| "missing argument [id]".to_owned())?
                        .as_i64()
                        .map_err(|e| e.to_string())?;
                    Ok(DynamicValue::Map(vec![
                        ("id".to_owned(), DynamicValue::Int(id)),
                        ("name".to_owned(), DynamicValue::String("widget".to_owned())),
                    ]))
                }
                other => Err(no_such_method(other)),
            }
        }
    }

    fn spawn_server(pool_cap: u32) -> (Arc<RpcServer>, std::net::SocketAddr) {
        let pool = Pool::with_default_expire(pool_cap).unwrap();
        let logger = crpc_log::init_default();
        let server = RpcServer::bind("127.0.0.1:0", pool, logger).unwrap();
        let addr = server.local_addr().unwrap();
        server.register("goods", Arc::new(Goods));

        let run_server = Arc::clone(&server);
        std::thread::spawn(move || run_server.run());
        // give the accept loop a moment to start polling
        std::thread::sleep(StdDuration::from_millis(30));
        (server, addr)
    }

    fn call(addr: std::net::SocketAddr, service_name: &str, method: &str, args: Vec<DynamicValue>) -> ResponsePayload {
        let mut stream = ClientStream::connect(addr).unwrap();
        let req = RequestPayload::Json(JsonRequest {
            request_id: 1,
            service_name: service_name.to_owned(),
            method_name: method.to_owned(),
            args,
        });
        wire::encode_request(&mut stream, CompressType::Gzip, &req).unwrap();
        let frame = Frame::decode(&mut stream).unwrap();
        assert_eq!(frame.header.serializer_type, SerializerType::Protobuf);
        wire::decode_response(&frame).unwrap()
    }

    #[test]
    fn happy_path_returns_success_response() {
        let (server, addr) = spawn_server(4);
        let response = call(addr, "goods", "Find", vec![DynamicValue::Int(1001)]);
        assert_eq!(response.code(), 200);
        assert_eq!(response.msg(), "success");
        server.stop();
    }

    #[test]
    fn unknown_service_reports_not_registered() {
        let (server, addr) = spawn_server(4);
        let response = call(addr, "orders", "Find", vec![]);
        assert_eq!(response.code(), 500);
        assert!(response.msg().contains("not been registered"), "{}", response.msg());
        server.stop();
    }

    #[test]
    fn unknown_method_reports_no_method() {
        let (server, addr) = spawn_server(4);
        let response = call(addr, "goods", "Delete", vec![]);
        assert_eq!(response.code(), 500);
        assert!(response.msg().contains("no method"), "{}", response.msg());
        server.stop();
    }

    #[test]
    fn rate_limited_second_request_fails() {
        let (server, addr) = spawn_server(4);
        server.set_limiter(1.0, 1.0);
        server.set_limiter_timeout(StdDuration::from_millis(50));

        let first = call(addr, "goods", "Find", vec![DynamicValue::Int(1)]);
        assert_eq!(first.code(), 200);
        let second = call(addr, "goods", "Find", vec![DynamicValue::Int(2)]);
        assert_eq!(second.code(), 500);
        assert!(second.msg().contains("rate limited"), "{}", second.msg());
        server.stop();
    }
}
