//! The extraction pipeline.
//!
//! - `locator`: finds the element carrying a server name
//! - `interaction`: activates it and waits for the detail dialog
//! - `detail`: reads the dialog text and closes the dialog
//! - `orchestrator`: runs the steps above plus parsing in a retry loop
//!
//! Every step works against a `BrowserSession` and takes its bounds from
//! `ExtractionSettings`.

pub mod detail;
pub mod interaction;
pub mod locator;
pub mod orchestrator;

pub use detail::{close_surface, dismiss_overlays, extract_text, CloseMethod, DetailText};
pub use interaction::{find_open_dialog, reveal_detail, RevealOutcome, RevealedDetail, DIALOG_SELECTORS};
pub use locator::{locate, xpath_literal, LocatedElement, LocatorStrategy, LOCATOR_STRATEGIES};
pub use orchestrator::{Orchestrator, ServerExtractor};
