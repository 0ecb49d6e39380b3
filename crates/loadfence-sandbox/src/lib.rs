//! loadfence-sandbox: load-time dependency containment.
//!
//! A [`ContainmentContext`] loads one entry unit through a [`ModuleHost`].
//! Every dependency request the unit makes goes through a
//! [`RequireInterceptor`](interceptor::RequireInterceptor), which classifies
//! it against the tree's [`Boundary`] (root directory and blacklist), lets the
//! optional [`Middleware`] decide or substitute, and then either hands bare
//! names to the host unchanged or loads path-like requests in a nested context
//! sharing the same boundary.
//!
//! ```no_run
//! use loadfence_sandbox::{ContainmentContext, FsHost, SandboxOptions};
//!
//! let options = SandboxOptions::new().root("./app").blacklist(["fs"]);
//! let mut ctx = ContainmentContext::new(FsHost::new(), "./app/index", options)?;
//! ctx.on_error(|failure| eprintln!("{}", failure));
//! if let Some(exports) = ctx.run() {
//!     println!("{}", exports);
//! }
//! # Ok::<(), loadfence_sandbox::LoadError>(())
//! ```

#[macro_use]
pub mod log;

pub mod context;
pub mod error;
pub mod failure;
pub mod host;
pub mod interceptor;
pub mod middleware;
pub mod policy;
pub mod wrapper;

pub use context::{ContainmentContext, RunState, SandboxOptions};
pub use error::{FailureKind, LoadError, ViolationReason};
pub use failure::{FailureChannel, FailureReport, LoadFailure};
pub use host::fs::{ManifestUnit, Requirement, UnitManifest};
pub use host::{FsHost, LoaderUnit, ModuleHost, ParentLink, RequireFn};
pub use interceptor::RequireInterceptor;
pub use middleware::{FnMiddleware, Middleware};
pub use policy::{is_path_like, Boundary, Classification, Decision, RequestInfo};
pub use wrapper::{wrap, WrapScope};
