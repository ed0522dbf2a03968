//! Route shorthand expansion for air traffic flow management.
//!
//! The crate turns free-form route text (fixes, airways, departure and arrival
//! procedures, coded departure routes, playbook plays, coordinate shorthand and
//! advisory route tables) into ordered waypoints and styled route segments.
//!
//! Reference tables are loaded once into an immutable
//! [`ReferenceContext`](data::context::ReferenceContext), which is then shared by
//! every expansion call:
//!
//! ```no_run
//! use reroute::data::context::{ExpansionConfig, ReferenceContext};
//! use reroute::data::reference::ReferenceTables;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tables = ReferenceTables::from_directory(std::path::Path::new("data"))?;
//! let context = ReferenceContext::build(tables, ExpansionConfig::default());
//!
//! let expansion = context.expand("KDFW >BOOVE3 J80 SPS< KLAX;#00FF00");
//! println!("{}", serde_json::to_string(&expansion)?);
//! # Ok(())
//! # }
//! ```

pub mod data;
pub mod error;
