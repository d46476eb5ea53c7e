//! The registered-service contract. Rust has no runtime reflection, so
//! "mapping from method name to a typed callable" is expressed directly
//! as a trait every registered service implements by hand — the same
//! way the game netcode's `System`/`Replicator` traits in `neutronium`
//! are hand-implemented rather than derived.

use crpc_codec::DynamicValue;

/// A named, callable service. `call` backs the `PROTOBUF` transport:
/// arguments and the result cross the wire as [`DynamicValue`]. `call_gob`
/// backs `GOB`: both sides pre-agree on the concrete argument/result
/// shapes out of band, so the frame layer only ever sees opaque bincode
/// bytes (see `crpc_codec::envelope::GobRequest`).
///
/// Implementations are responsible for their own method-name dispatch;
/// use [`no_such_method`] for the "unknown method" error so its wording
/// is consistent across every registered service.
pub trait Service: Send + Sync {
    fn call(&self, method: &str, args: &[DynamicValue]) -> Result<DynamicValue, String>;

    /// Default: a service that never opts into `GOB` dispatch refuses it
    /// uniformly rather than requiring every implementor to stub this out.
    fn call_gob(&self, method: &str, _args: &[u8]) -> Result<Vec<u8>, String> {
        Err(no_such_method(method))
    }
}

/// The "unknown method" error text, shared so every [`Service`]
/// implementation reports it identically.
pub fn no_such_method(method: &str) -> String {
    format!("no method found by this name [{}]", method)
}

/// The "unknown service" error text.
pub fn no_such_service(name: &str) -> String {
    format!("service [{}] has not been registered", name)
}
