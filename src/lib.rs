//! # isolay
//!
//! Batch multi-rendition image optimizer. Submit images, pick widths, a format
//! and a quality, and get one optimized rendition per width for every image.
//!
//! # Architecture: Plan → Execute → Orchestrate
//!
//! ```text
//! submit      (name, bytes)      →  registry: idle jobs     (validation)
//! plan        settings + source  →  [RenditionSpec]         (pure, ascending widths)
//! execute     spec + source      →  RenditionResult         (via ImageCodec)
//! orchestrate registry           →  complete | error | nothing_planned
//! ```
//!
//! The planner is a pure function, the executor delegates all pixel work to
//! an [`imaging::ImageCodec`], and the orchestrator is the only writer of job
//! state. That split means unit tests exercise the whole pipeline against a
//! recording mock codec, without encoding a single image.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Codec adapter: identify, resize, encode (pure Rust, `image` crate) |
//! | [`settings`] | User settings (`OptimizeSettings`) and the shared `SettingsHandle` |
//! | [`source`] | Submitted images, validation, `submit_images` |
//! | [`plan`] | Rendition planner |
//! | [`execute`] | Rendition executor |
//! | [`registry`] | Job registry and lifecycle state machine |
//! | [`orchestrate`] | Batch runner, progress events |
//! | [`wire`] | Single-rendition request/response format with base64 data URLs |
//! | [`naming`] | Download file names |
//! | [`export`] | Collision-free download list, writing it to disk |
//! | [`config`] | `isolay.toml` loading, validation, merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Settings Are Read When a Job Starts
//!
//! The front end may keep editing settings while a batch runs. Each job takes
//! its own snapshot at the moment it starts, so a change never affects a job
//! already encoding but does reach every job after it.
//!
//! ## Failures Stay Inside Their Job
//!
//! A rendition that fails to decode or encode is recorded on its job and the
//! job moves on to the next width. A job with at least one success is
//! complete; one where everything failed is in error. Either way, the next job
//! runs.
//!
//! ## Zero Widths Is Not Success
//!
//! With no widths selected a job plans nothing. It ends as `nothing_planned`,
//! distinct from both `complete` and `error`.
//!
//! ## Self-Contained Imaging
//!
//! Decoding, Lanczos3 resampling and most encoders (including AVIF via
//! `rav1e`) come from the `image` crate. Lossy WebP goes through `webp`, which
//! builds libwebp from source, and metadata moves between containers with
//! `img-parts`. No system libraries, no external processes.

pub mod config;
pub mod execute;
pub mod export;
pub mod imaging;
pub mod naming;
pub mod orchestrate;
pub mod output;
pub mod plan;
pub mod registry;
pub mod settings;
pub mod source;
pub mod wire;
