/* src/lib.rs */
//! # Real IP Resolver
//!
//! Resolve the originating client IP address of an HTTP request that may have
//! passed through proxies, load balancers and CDNs.
//!
//! ## Resolution order
//!
//! 1. No forwarding header at all: the transport remote address, port removed.
//! 2. The first public address of `X-Forwarded-For`, across every occurrence
//!    of the header, left to right.
//! 3. The first public `for=` address of the RFC 7239 `Forwarded` header.
//! 4. `X-Real-IP`, verbatim. This may be empty.
//!
//! An address is public when it parses and lies outside the loopback, private
//! and link-local blocks in [`RESERVED_BLOCKS`]. Unparseable candidates are
//! skipped; resolution itself never fails.
//!
//! The `axum` feature adds a tower layer and an extractor.
//!
//! ## Examples
//!
//! ```rust
//! use realip::{HeaderSnapshot, resolve};
//!
//! let headers = HeaderSnapshot::new()
//!     .with_x_forwarded_for("127.0.0.0")
//!     .with_x_forwarded_for("144.12.54.87, 119.14.55.11");
//! assert_eq!(resolve("10.0.0.2:5000", &headers), "144.12.54.87");
//!
//! let headers = HeaderSnapshot::new().with_forwarded("for=127.0.0.0, for=119.14.55.11");
//! assert_eq!(resolve("10.0.0.2:5000", &headers), "119.14.55.11");
//! ```

pub mod error;
pub mod reserved;
pub mod resolver;

#[cfg(feature = "axum")]
pub mod middleware;

pub use error::{RealIpError, Result};
pub use reserved::{RESERVED_BLOCKS, is_private_address, is_reserved_ip};
pub use resolver::{
    ForwardedKeyMatch, HeaderMap, HeaderSnapshot, Resolver, resolve, strip_port,
};

#[cfg(feature = "axum")]
pub use middleware::{RealIp, RealIpLayer, RealIpService};
