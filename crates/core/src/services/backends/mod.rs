pub mod ildasm;
pub mod process;
pub mod provision;

pub use ildasm::IldasmBackend;
pub use provision::{BundleEntry, ToolBundle, ToolProvisioner, TOOL_FILE_NAME};
