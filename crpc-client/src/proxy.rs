//! `ClientProxy`: a thin per-call retry wrapper around [`RpcClient`].
//! Each attempt dials a fresh connection, invokes once, and closes it,
//! since the server closes a connection after a single exchange.

use std::time::Duration;

use slog::{o, warn, Logger};

use crpc_codec::{CompressType, DynamicValue, SerializerType};

use crate::client::RpcClient;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ClientProxyOptions {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Total number of attempts, not additional retries on top of a
    /// first try; at least one attempt always runs even if
    /// `retries == 0`.
    pub retries: u32,
    pub serializer_type: SerializerType,
    pub compress_type: CompressType,
}

impl Default for ClientProxyOptions {
    fn default() -> Self {
        ClientProxyOptions {
            host: "127.0.0.1".to_owned(),
            port: 9000,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
            retries: 3,
            serializer_type: SerializerType::Gob,
            compress_type: CompressType::Gzip,
        }
    }
}

pub struct ClientProxy {
    options: ClientProxyOptions,
    logger: Logger,
}

impl ClientProxy {
    pub fn new(options: ClientProxyOptions, logger: Logger) -> ClientProxy {
        let logger = logger.new(o!("component" => "client-proxy"));
        ClientProxy { options, logger }
    }

    /// Calls `serviceName.methodName(args)` over the `PROTOBUF`/JSON
    /// transport, retrying up to `retries` total attempts on any error
    /// and preserving the last error when the budget is exhausted.
    pub fn call(
        &self,
        service_name: &str,
        method: &str,
        args: Vec<DynamicValue>,
    ) -> Result<DynamicValue> {
        let attempts = self.options.retries.max(1);
        let mut last_err: Option<Error> = None;

        for attempt_no in 0..attempts {
            match self.attempt(service_name, method, args.clone()) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(self.logger, "attempt failed"; "attempt" => attempt_no + 1, "error" => %e);
                    last_err = Some(e);
                }
            }
        }

        Err(Error::RetryExhausted(
            last_err.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    fn attempt(
        &self,
        service_name: &str,
        method: &str,
        args: Vec<DynamicValue>,
    ) -> Result<DynamicValue> {
        let mut client = RpcClient::connect(
            &self.options.host,
            self.options.port,
            self.options.connect_timeout,
            self.options.read_timeout,
            self.options.serializer_type,
            self.options.compress_type,
            self.logger.clone(),
        )?;
        let result = client.invoke(service_name, method, args);
        let _ = client.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crpc_server::{no_such_method, RpcServer, Service};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Flaky {
        calls: AtomicUsize,
    }

    impl Service for Flaky {
        fn call(&self, method: &str, _args: &[DynamicValue]) -> std::result::Result<DynamicValue, String> {
            match method {
                "Find" => {
                    let n = self.calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        Err("simulated transient failure".to_owned())
                    } else {
                        Ok(DynamicValue::Int(42))
                    }
                }
                other => Err(no_such_method(other)),
            }
        }
    }

    fn spawn_server(service: Arc<dyn Service>) -> (Arc<RpcServer>, std::net::SocketAddr) {
        let pool = crpc_pool::Pool::with_default_expire(4).unwrap();
        let logger = crpc_log::init_default();
        let server = RpcServer::bind("127.0.0.1:0", pool, logger).unwrap();
        server.register("goods", service);
        let addr = server.local_addr().unwrap();
        let run_server = Arc::clone(&server);
        std::thread::spawn(move || run_server.run());
        std::thread::sleep(Duration::from_millis(30));
        (server, addr)
    }

    #[test]
    fn retries_past_a_transient_remote_failure() {
        let flaky = Arc::new(Flaky { calls: AtomicUsize::new(0) });
        let (server, addr) = spawn_server(flaky);

        let proxy = ClientProxy::new(
            ClientProxyOptions {
                host: addr.ip().to_string(),
                port: addr.port(),
                retries: 3,
                serializer_type: SerializerType::Protobuf,
                ..ClientProxyOptions::default()
            },
            crpc_log::init_default(),
        );

        let value = proxy.call("goods", "Find", vec![]).unwrap();
        assert_eq!(value, DynamicValue::Int(42));
        server.stop();
    }

    #[test]
    fn exhausting_retries_reports_retry_exhausted() {
        let (server, _addr) = spawn_server(Arc::new(Flaky { calls: AtomicUsize::new(0) }));
        server.stop();

        let proxy = ClientProxy::new(
            ClientProxyOptions {
                host: "127.0.0.1".to_owned(),
                port: 1, // nothing listens on a privileged port in test sandboxes
                retries: 2,
                connect_timeout: Duration::from_millis(100),
                serializer_type: SerializerType::Protobuf,
                ..ClientProxyOptions::default()
            },
            crpc_log::init_default(),
        );

        match proxy.call("goods", "Find", vec![]) {
            Err(Error::RetryExhausted(_)) => {}
            other => panic!("expected retry exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn circuit_breaker_trips_after_proxy_exhausts_retries() {
        use crpc_breaker::{CircuitBreaker, Settings};

        let (server, _addr) = spawn_server(Arc::new(Flaky { calls: AtomicUsize::new(0) }));
        server.stop();

        let proxy = ClientProxy::new(
            ClientProxyOptions {
                host: "127.0.0.1".to_owned(),
                port: 1,
                retries: 1,
                connect_timeout: Duration::from_millis(100),
                serializer_type: SerializerType::Protobuf,
                ..ClientProxyOptions::default()
            },
            crpc_log::init_default(),
        );

        let settings: Settings<DynamicValue, Error> = Settings {
            ready_to_trip: Box::new(|c| c.consecutive_failures > 0),
            ..Settings::default()
        };
        let breaker = CircuitBreaker::new(settings);

        assert!(breaker
            .execute(|| proxy.call("goods", "Find", vec![]))
            .is_err());
        assert_eq!(breaker.state(), crpc_breaker::State::Open);

        match breaker.execute(|| proxy.call("goods", "Find", vec![])) {
            Err(Error::Breaker(crpc_breaker::Error::BreakerOpen)) => {}
            other => panic!("expected breaker-open refusal, got {:?}", other),
        }
    }
}
