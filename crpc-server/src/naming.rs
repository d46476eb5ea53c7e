//! The registry seam a gateway in front of this server would use to
//! publish and discover instances. `RpcServer` itself never calls this
//! trait — the gateway that load-balances across servers does — but the
//! contract is named here so a future gateway crate has a type to
//! implement against instead of inventing its own.

/// A minimal service-registry client: publish an instance, then resolve
/// a healthy one by service name.
pub trait NamingClient: Send + Sync {
    fn register(&self, service_name: &str, host: &str, port: u16, metadata: &[(String, String)]);

    fn select_healthy(&self, service_name: &str) -> Option<(String, u16)>;
}
