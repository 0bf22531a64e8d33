pub mod bundle;
pub mod serve;
