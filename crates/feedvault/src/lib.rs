//! Feedvault media resolution engine.
//!
//! Given a profile's post list and a browser page, resolves every post to
//! direct CDN media links by watching the page's network traffic,
//! deduplicated across the session and kept in feed order.

pub mod capability;
pub mod capture;
pub mod carousel;
pub mod config;
pub mod extractor;
pub mod orchestrator;
pub mod persistence;
pub mod probe;
pub mod registry;
pub mod single;
pub mod types;

pub use capability::{Browser, BrowserCookie, BrowserPage, CapabilityError, RequestStream, WaitCondition};
pub use capture::CaptureWindow;
pub use carousel::{walk_carousel, CarouselWalk, WalkEnd};
pub use config::ResolverConfig;
pub use extractor::{classify, filename_signature, Rejection};
pub use orchestrator::{HarvestReport, Orchestrator};
pub use persistence::MediaStore;
pub use registry::DedupRegistry;
pub use single::resolve_single;
pub use types::*;
