pub mod disassemble;
pub mod normalize;
pub mod provision;
pub mod util;

pub use disassemble::*;
pub use normalize::*;
pub use provision::*;
pub use util::*;
