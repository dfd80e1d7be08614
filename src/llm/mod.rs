mod kimi;

pub use kimi::KimiEngine;
