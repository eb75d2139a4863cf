pub mod pe;

pub use pe::PeHeader;
