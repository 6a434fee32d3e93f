//! Read-only policy enforcement.
//!
//! One switch ([`PolicyState`]) is enforced at three interception points:
//!
//! - **Invocation** ([`InvocationGuard`]): every `tools/call`. Mutating tools
//!   are short-circuited before the tool handler runs.
//! - **Discovery** ([`DiscoveryFilter`]): the `tools/list` result. Mutating
//!   tools are hidden. This point fails open and returns the unfiltered
//!   listing whenever it cannot introspect or rebuild it.
//! - **Transport** ([`TransportGuard`]): raw HTTP requests towards Druid.
//!   Only `GET` and `POST /druid/v2/sql` pass.
//!
//! All three share the same [`OperationClassifier`] rules and consult the
//! state independently. None of them log; the server layer records outcomes.

pub mod classifier;
pub mod discovery;
pub mod invocation;
pub mod state;
pub mod transport;

pub use classifier::{Classification, OperationClassifier};
pub use discovery::{DiscoveryFilter, ToolListing};
pub use invocation::{DENIAL_ERROR_CODE, Denial, InvocationGuard};
pub use state::PolicyState;
pub use transport::{SQL_QUERY_PATH, TransportDenied, TransportGuard};
