//! HEALPix Multi-Order Coverage (MOC) maps.
//!
//! Decodes IVOA MOC FITS files (NUNIQ-encoded binary tables) into a compact
//! range representation and answers point-in-region queries. The coverage
//! file is memory-mapped on open and decoded once; the resulting [`Moc`] is
//! immutable and can be shared freely between threads.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`healpix`] | Nested pixel indexing ([`ang2pix_nest`](healpix::ang2pix_nest)), [`Cell`] and NUNIQ packing |
//! | [`ranges`] | Sorted range sets at the deepest order |
//! | [`fits`] | Header cards, HDU splitting and writing |
//! | [`moc`] | [`Moc`] decoding, queries and encoding |
//! | [`header_fix`] | [`fix_header`]: copy `HPXMOC` into `MOCORDER` |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_moc::Moc;
//!
//! let moc = Moc::open("las-J-DR11.fits")?;
//! if moc.contains(150.1, 2.2) {
//!     println!("covered at order {}", moc.depth());
//! }
//! ```

pub mod error;
pub mod fits;
pub mod header_fix;
pub mod healpix;
pub mod moc;
pub mod ranges;

pub use error::{MocError, MocResult};
pub use header_fix::fix_header;
pub use healpix::{Cell, MAX_ORDER};
pub use moc::Moc;
