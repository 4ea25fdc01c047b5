//! filigrane-export: Output serializers (sans-IO)
//!
//! Turns rendered rasters into encoded bytes and decides where they go:
//! JPEG/PNG encoding, the output file naming rule, and the check that
//! keeps exports out of their sources' directories.

pub mod encode;
pub mod naming;
pub mod validate;

pub use encode::{EncodeError, encode};
pub use naming::{output_file_name, output_path};
pub use validate::{ExportError, validate_output_dir};
